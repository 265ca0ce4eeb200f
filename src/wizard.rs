//! Interactive forms for creating and editing documents.

use chrono::{Datelike, Local, NaiveDate};
use inquire::{Confirm, CustomType, DateSelect, Select, Text};
use serde_json::Value;
use tracing::warn;

use crate::client::ApiClient;
use crate::error::{AppError, AppResult};
use crate::model::{
    CompanySetting, Customer, DocCopyType, Document, DocumentKind, LineItem, Party, Product, RecipientType,
    WithholdingCertificate, WithholdingItem, non_empty,
};
use crate::numbering;
use crate::withholding::{self, INCOME_TYPES};

const TYPE_MANUALLY_OPT: &str = "✏️  พิมพ์ข้อมูลเอง";
const ADD_PRODUCT_OPT: &str = "➕ เพิ่มสินค้าจากรายการ";
const ADD_MANUAL_OPT: &str = "✏️  เพิ่มรายการเอง";
const REMOVE_ITEM_OPT: &str = "🗑️  ลบรายการ";
const DONE_OPT: &str = "✅ เสร็จสิ้น";

const DEFAULT_NOTES: &str = "1. การชำระเงินภายในเวลาที่กำหนด 7 วัน ตั้งแต่วันที่ได้รับสินค้า\n\
2. การส่งมอบสินค้าต้องเป็นไปตามเงื่อนไขที่ระบุไว้ในเอกสารนี้เท่านั้น\n\
3. ค่าบริการจัดส่งคิดตามระยะทางจริงรวมภาษีมูลค่าเพิ่ม";

// ==========================================
// Prompt helpers
// ==========================================

/// Free text where an empty answer means "not set". `\n` typed literally becomes a line break.
fn prompt_optional(label: &str, current: Option<&str>) -> AppResult<Option<String>> {
    let shown = current.unwrap_or_default().replace('\n', "\\n");
    let answer = Text::new(label).with_initial_value(&shown).prompt()?;
    Ok(non_empty(&answer.replace("\\n", "\n")))
}

fn prompt_required(label: &str, current: &str) -> AppResult<String> {
    loop {
        let answer = Text::new(label).with_initial_value(current).prompt()?;
        if let Some(value) = non_empty(&answer) {
            return Ok(value);
        }
        println!("❌ ต้องระบุข้อมูลนี้");
    }
}

fn prompt_number(label: &str, default: f64) -> AppResult<f64> {
    Ok(CustomType::<f64>::new(label)
        .with_default(default)
        .with_error_message("กรุณากรอกตัวเลข")
        .prompt()?)
}

fn prompt_date(label: &str, current: Option<NaiveDate>) -> AppResult<NaiveDate> {
    Ok(DateSelect::new(label)
        .with_default(current.unwrap_or_else(|| Local::now().date_naive()))
        .prompt()?)
}

fn customer_label(customer: &Customer) -> String {
    match customer.branch_name.as_deref() {
        Some(branch) if !branch.is_empty() => format!("{} | {} ({})", customer.code, customer.name, branch),
        _ => format!("{} | {}", customer.code, customer.name),
    }
}

/// Active customers, or an empty list when they cannot be loaded.
fn load_customers(client: &ApiClient) -> Vec<Customer> {
    client.active_customers().unwrap_or_else(|e| {
        warn!(error = %e, "could not load customers");
        println!("⚠️  โหลดรายชื่อลูกค้าไม่สำเร็จ พิมพ์ข้อมูลเองได้");
        Vec::new()
    })
}

/// Picks a customer, or `None` when the user chooses to type the details.
fn select_customer<'a>(label: &str, customers: &'a [Customer]) -> AppResult<Option<&'a Customer>> {
    if customers.is_empty() {
        return Ok(None);
    }
    let mut options = vec![TYPE_MANUALLY_OPT.to_string()];
    options.extend(customers.iter().map(customer_label));
    let choice = Select::new(&format!("เลือก{} (พิมพ์เพื่อค้นหา):", label), options).raw_prompt()?;
    Ok(choice.index.checked_sub(1).map(|idx| &customers[idx]))
}

fn type_party(label: &str, current: &Party) -> AppResult<Party> {
    Ok(Party {
        code: current.code.clone(),
        name: prompt_required(&format!("ชื่อ{}:", label), &current.name)?,
        address: prompt_optional("ที่อยู่:", current.address.as_deref())?,
        tax_id: prompt_optional("เลขประจำตัวผู้เสียภาษี:", current.tax_id.as_deref())?,
        phone: prompt_optional("โทรศัพท์:", current.phone.as_deref())?,
        email: prompt_optional("อีเมล:", current.email.as_deref())?,
        branch: prompt_optional("สาขา:", current.branch.as_deref())?,
    })
}

// ==========================================
// Quotation / purchase order / invoice / receipt
// ==========================================

/// Walks through every field of a document. Editing keeps the stored number and status.
pub fn compose_document(client: &ApiClient, kind: DocumentKind, existing: Option<Document>) -> AppResult<Document> {
    if kind.is_withholding() {
        return Err(AppError::validation("หนังสือรับรองหัก ณ ที่จ่ายใช้แบบฟอร์มแยก"));
    }
    let is_new = existing.is_none();
    let mut doc = existing.unwrap_or_else(|| Document::new(kind));
    let label = kind.counterparty_label();

    println!("\n--- {} ---", if is_new { format!("สร้าง{}", kind.title_th()) } else { format!("แก้ไข {}", doc.number) });

    let change_party = is_new
        || doc.party.name.is_empty()
        || Confirm::new(&format!("เปลี่ยน{} ({})?", label, doc.party.name))
            .with_default(false)
            .prompt()?;
    if change_party {
        let customers = load_customers(client);
        doc.party = match select_customer(label, &customers)? {
            Some(customer) => Party::from(customer),
            None => type_party(label, &doc.party)?,
        };
        println!("✅ {}: {}", label, doc.party.name);
    }

    let date = prompt_date("วันที่เอกสาร:", doc.date)?;
    doc.date = Some(date);
    doc.reference = prompt_optional(
        if kind == DocumentKind::Receipt { "อ้างอิงใบแจ้งหนี้:" } else { "อ้างอิงเอกสาร:" },
        doc.reference.as_deref(),
    )?;
    doc.salesperson = prompt_optional(
        if kind == DocumentKind::PurchaseOrder { "ผู้สั่งซื้อ:" } else { "พนักงานขาย:" },
        doc.salesperson.as_deref(),
    )?;
    if matches!(kind, DocumentKind::Invoice | DocumentKind::PurchaseOrder) {
        doc.shipping_address = prompt_optional("สถานที่จัดส่ง:", doc.shipping_address.as_deref())?;
        doc.shipping_phone = prompt_optional("เบอร์โทรผู้รับสินค้า:", doc.shipping_phone.as_deref())?;
    }
    if kind == DocumentKind::Receipt {
        doc.description = prompt_optional("รายละเอียดการรับเงิน:", doc.description.as_deref())?;
    }

    let edit_items = is_new
        || Confirm::new(&format!("แก้ไขรายการสินค้า ({} รายการ)?", doc.items.len()))
            .with_default(false)
            .prompt()?;
    if edit_items {
        edit_line_items(client, &mut doc.items)?;
    }

    doc.discount = prompt_number("ส่วนลด (%):", doc.discount)?;
    doc.vat_rate = prompt_number("ภาษีมูลค่าเพิ่ม (%):", doc.vat_rate)?;

    let copy = Select::new("ประเภทเอกสาร:", COPY_TYPES.iter().map(|t| t.label()).collect())
        .with_starting_cursor(copy_type_cursor(doc.doc_type))
        .raw_prompt()?;
    doc.doc_type = COPY_TYPES[copy.index];

    if is_new {
        doc.notes = Some(DEFAULT_NOTES.to_string());
        assign_number(&mut doc, client.list(kind), Local::now().date_naive());
        println!("🔢 เลขที่เอกสาร: {}", doc.number);
    }
    doc.notes = prompt_optional("หมายเหตุ (ใช้ \\n ขึ้นบรรทัดใหม่):", doc.notes.as_deref())?;

    let totals = doc.totals();
    println!(
        "💰 รวม {} | ส่วนลด {} | VAT {} | สุทธิ {}",
        crate::locale::format_amount(totals.subtotal),
        crate::locale::format_amount(totals.discount_amount),
        crate::locale::format_amount(totals.vat),
        crate::locale::format_amount(totals.grand_total),
    );
    Ok(doc)
}

const COPY_TYPES: [DocCopyType; 2] = [DocCopyType::Original, DocCopyType::Copy];

fn copy_type_cursor(doc_type: DocCopyType) -> usize {
    COPY_TYPES.iter().position(|t| *t == doc_type).unwrap_or(0)
}

/// Numbers follow the year the document is issued in, not its document date.
fn assign_number(doc: &mut Document, fetched: AppResult<Vec<Value>>, today: NaiveDate) {
    let number = numbering::resolve_next_number(doc.kind, today.year(), fetched);
    doc.number = numbering::apply_copy_type(&number, doc.doc_type);
}

fn assign_certificate_number(cert: &mut WithholdingCertificate, fetched: AppResult<Vec<Value>>, today: NaiveDate) {
    cert.doc_number = numbering::resolve_next_number(DocumentKind::WithholdingTax, today.year(), fetched);
}

fn next_item_id(items: &[LineItem]) -> String {
    let max = items.iter().filter_map(|i| i.id.parse::<u64>().ok()).max().unwrap_or(0);
    max.saturating_add(1).to_string()
}

fn edit_line_items(client: &ApiClient, items: &mut Vec<LineItem>) -> AppResult<()> {
    let mut products: Option<Vec<Product>> = None;

    loop {
        for (idx, item) in items.iter().enumerate() {
            println!(
                "  {}. {} x{} = {}",
                idx + 1,
                item.description,
                crate::locale::format_number(item.qty.unwrap_or(1.0)),
                crate::locale::format_amount(item.amount)
            );
        }

        let mut options = vec![ADD_PRODUCT_OPT, ADD_MANUAL_OPT];
        if !items.is_empty() {
            options.push(REMOVE_ITEM_OPT);
        }
        options.push(DONE_OPT);

        match Select::new("รายการสินค้า:", options).prompt()? {
            ADD_PRODUCT_OPT => {
                let catalogue: &[Product] = products.get_or_insert_with(|| {
                    client.products().unwrap_or_else(|e| {
                        warn!(error = %e, "could not load products");
                        Vec::new()
                    })
                });
                if catalogue.is_empty() {
                    println!("⚠️  ไม่มีรายการสินค้าในระบบ");
                    continue;
                }
                let labels: Vec<String> = catalogue
                    .iter()
                    .map(|p| {
                        format!(
                            "{} | {} ({} บาท)",
                            p.code.as_deref().unwrap_or("-"),
                            p.name,
                            crate::locale::format_amount(p.sale_price)
                        )
                    })
                    .collect();
                let choice = Select::new("เลือกสินค้า:", labels).raw_prompt()?;
                let mut item = LineItem::new(next_item_id(items), "");
                item.apply_product(&catalogue[choice.index]);
                item.set_qty(prompt_number("จำนวน:", 1.0)?);
                item.set_price(prompt_number("ราคาต่อหน่วย:", item.price.unwrap_or(0.0))?);
                items.push(item);
            }
            ADD_MANUAL_OPT => {
                let mut item = LineItem::new(next_item_id(items), prompt_required("รายละเอียด:", "")?);
                item.unit = prompt_optional("หน่วย:", None)?;
                item.set_qty(prompt_number("จำนวน:", 1.0)?);
                item.set_price(prompt_number("ราคาต่อหน่วย:", 0.0)?);
                let amount = prompt_number("จำนวนเงิน:", item.amount)?;
                item.set_amount(amount);
                items.push(item);
            }
            REMOVE_ITEM_OPT => {
                let labels: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(idx, i)| format!("{}. {}", idx + 1, i.description))
                    .collect();
                let choice = Select::new("ลบรายการ:", labels).raw_prompt()?;
                items.remove(choice.index);
            }
            _ => return Ok(()),
        }
    }
}

// ==========================================
// Withholding tax certificate
// ==========================================

fn recipient_type_from_index(idx: usize) -> RecipientType {
    match idx {
        0 => RecipientType::Individual,
        1 => RecipientType::Juristic,
        2 => RecipientType::Partnership,
        _ => RecipientType::Other,
    }
}

fn select_code(label: &str, table: &[(&'static str, &'static str)], current: Option<&str>) -> AppResult<String> {
    let labels: Vec<&str> = table.iter().map(|(_, l)| *l).collect();
    let start = current
        .and_then(|c| table.iter().position(|(v, _)| *v == c))
        .unwrap_or(0);
    let choice = Select::new(label, labels).with_starting_cursor(start).raw_prompt()?;
    Ok(table[choice.index].0.to_string())
}

pub fn compose_certificate(
    client: &ApiClient,
    existing: Option<WithholdingCertificate>,
) -> AppResult<WithholdingCertificate> {
    let is_new = existing.is_none();
    let mut cert = existing.unwrap_or_default();

    println!(
        "\n--- {} ---",
        if is_new { "สร้างหนังสือรับรองการหักภาษี ณ ที่จ่าย".to_string() } else { format!("แก้ไข {}", cert.doc_number) }
    );

    let date = prompt_date(
        "วันที่ออกหนังสือรับรอง:",
        cert.doc_date.as_deref().and_then(crate::locale::parse_date),
    )?;
    cert.doc_date = Some(date.format("%Y-%m-%d").to_string());

    if is_new {
        match client.company_setting() {
            Ok(company) => {
                cert.payer_name = company.company_name.unwrap_or_default();
                cert.payer_tax_id = company.tax_id.unwrap_or_default();
                cert.payer_address = company.address.unwrap_or_default();
            }
            Err(e) => warn!(error = %e, "could not load company settings for payer"),
        }
        assign_certificate_number(&mut cert, client.list(DocumentKind::WithholdingTax), Local::now().date_naive());
        println!("🔢 เลขที่เอกสาร: {}", cert.doc_number);
    }

    cert.sequence_number = prompt_optional("เล่มที่:", cert.sequence_number.as_deref())?;

    println!("\n--- ผู้มีหน้าที่หักภาษี ณ ที่จ่าย ---");
    cert.payer_tax_id = prompt_required("เลขประจำตัวผู้เสียภาษี:", &cert.payer_tax_id)?;
    cert.payer_name = prompt_required("ชื่อ:", &cert.payer_name)?;
    cert.payer_address = prompt_optional("ที่อยู่:", Some(cert.payer_address.as_str()))?.unwrap_or_default();

    let has_representative = Confirm::new("มีผู้กระทำแทนหรือไม่?")
        .with_default(cert.representative_name.is_some())
        .prompt()?;
    if has_representative {
        cert.representative_tax_id = prompt_optional("เลขประจำตัวผู้เสียภาษี (ผู้กระทำแทน):", cert.representative_tax_id.as_deref())?;
        cert.representative_name = prompt_optional("ชื่อ (ผู้กระทำแทน):", cert.representative_name.as_deref())?;
        cert.representative_address = prompt_optional("ที่อยู่ (ผู้กระทำแทน):", cert.representative_address.as_deref())?;
    } else {
        cert.representative_tax_id = None;
        cert.representative_name = None;
        cert.representative_address = None;
    }

    println!("\n--- ผู้ถูกหักภาษี ณ ที่จ่าย ---");
    let customers = if is_new { load_customers(client) } else { Vec::new() };
    if let Some(customer) = select_customer("ผู้ถูกหักภาษี", &customers)? {
        cert.recipient_name = customer.name.clone();
        cert.recipient_tax_id = customer.tax_id.clone().unwrap_or_default();
        cert.recipient_address = customer.address.clone().unwrap_or_default();
    }
    cert.recipient_tax_id = prompt_required("เลขประจำตัวผู้เสียภาษี:", &cert.recipient_tax_id)?;
    cert.recipient_name = prompt_required("ชื่อ:", &cert.recipient_name)?;
    cert.recipient_address = prompt_optional("ที่อยู่:", Some(cert.recipient_address.as_str()))?.unwrap_or_default();

    let types = [
        RecipientType::Individual,
        RecipientType::Juristic,
        RecipientType::Partnership,
        RecipientType::Other,
    ];
    let start = types.iter().position(|t| *t == cert.recipient_type).unwrap_or(1);
    let choice = Select::new("ประเภทผู้ถูกหักภาษี:", types.iter().map(|t| t.label()).collect())
        .with_starting_cursor(start)
        .raw_prompt()?;
    cert.recipient_type = recipient_type_from_index(choice.index);
    cert.company_type = if cert.recipient_type == RecipientType::Juristic {
        Some(select_code("ประเภทนิติบุคคล:", &withholding::COMPANY_TYPES, cert.company_type.as_deref())?)
    } else {
        None
    };

    println!("\n--- รายการเงินได้ ---");
    edit_withholding_items(&mut cert.items, date)?;
    cert.refresh_totals();

    cert.deduction_order = prompt_optional("ลำดับที่ในแบบ:", cert.deduction_order.as_deref())?;
    cert.deduction_format = Some(select_code(
        "แบบยื่นรายการ (ภ.ง.ด.):",
        &withholding::DEDUCTION_FORMATS,
        cert.deduction_format.as_deref(),
    )?);
    let mode = select_code("รูปแบบการหัก:", &withholding::DEDUCTION_MODES, cert.deduction_mode.as_deref())?;
    cert.deduction_other = if mode == "other" {
        prompt_optional("ระบุ:", cert.deduction_other.as_deref())?
    } else {
        None
    };
    cert.deduction_mode = Some(mode);
    cert.notes = prompt_optional("หมายเหตุ:", cert.notes.as_deref())?;

    let totals = withholding::WithholdingTotals::compute(&cert.items);
    println!(
        "💰 เงินได้ {} | ภาษีที่หัก {} | จ่ายสุทธิ {}",
        crate::locale::format_amount(totals.amount),
        crate::locale::format_amount(totals.tax),
        crate::locale::format_amount(totals.net()),
    );
    Ok(cert)
}

fn edit_withholding_items(items: &mut Vec<WithholdingItem>, default_date: NaiveDate) -> AppResult<()> {
    loop {
        for (idx, item) in items.iter().enumerate() {
            println!(
                "  {}. [{}] {} {} ภาษี {}% = {}",
                idx + 1,
                item.income_type,
                item.description,
                crate::locale::format_amount(item.amount),
                crate::locale::format_number(item.tax_rate),
                crate::locale::format_amount(item.tax_amount)
            );
        }

        let mut options = vec![ADD_MANUAL_OPT];
        if !items.is_empty() {
            options.push(REMOVE_ITEM_OPT);
        }
        options.push(DONE_OPT);

        match Select::new("รายการ:", options).prompt()? {
            ADD_MANUAL_OPT => {
                let labels: Vec<String> = INCOME_TYPES
                    .iter()
                    .map(|t| format!("{} {} ({}%)", t.code, t.description, crate::locale::format_number(t.default_rate)))
                    .collect();
                let choice = Select::new("ประเภทเงินได้:", labels).raw_prompt()?;
                let income = &INCOME_TYPES[choice.index];

                let date = prompt_date("วันที่จ่าย:", Some(default_date))?;
                let mut item = WithholdingItem::for_income_type(income, date.format("%Y-%m-%d").to_string());
                if let Some(description) = prompt_optional("รายละเอียด:", Some(income.description))? {
                    item.description = description;
                }
                item.set_amount(prompt_number("จำนวนเงินที่จ่าย:", 0.0)?);
                item.set_tax_rate(prompt_number("อัตราภาษี (%):", income.default_rate)?);
                items.push(item);
            }
            REMOVE_ITEM_OPT => {
                let labels: Vec<String> = items
                    .iter()
                    .enumerate()
                    .map(|(idx, i)| format!("{}. [{}] {}", idx + 1, i.income_type, i.description))
                    .collect();
                let choice = Select::new("ลบรายการ:", labels).raw_prompt()?;
                items.remove(choice.index);
            }
            _ => return Ok(()),
        }
    }
}

// ==========================================
// Company settings
// ==========================================

/// Edits the issuing company shown on every printed header.
pub fn edit_company_setting(current: &CompanySetting) -> AppResult<CompanySetting> {
    println!("\n🏢 --- ข้อมูลบริษัท ---");
    Ok(CompanySetting {
        company_name: Some(prompt_required("ชื่อบริษัท:", current.company_name.as_deref().unwrap_or_default())?),
        branch_name: prompt_optional("สาขา:", current.branch_name.as_deref())?,
        address: prompt_optional("ที่อยู่:", current.address.as_deref())?,
        tax_id: prompt_optional("เลขประจำตัวผู้เสียภาษี:", current.tax_id.as_deref())?,
        phone: prompt_optional("โทรศัพท์:", current.phone.as_deref())?,
        email: prompt_optional("อีเมล:", current.email.as_deref())?,
        logo: prompt_optional("โลโก้ (URL หรือ path):", current.logo.as_deref())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn item_ids_continue_after_the_largest() {
        let items = vec![
            LineItem::lump_sum("3", "a", 1.0),
            LineItem::lump_sum("1700000000000", "b", 1.0),
            LineItem::lump_sum("x", "c", 1.0),
        ];
        assert_eq!(next_item_id(&items), "1700000000001");
        assert_eq!(next_item_id(&[]), "1");
    }

    #[test]
    fn recipient_type_order_matches_prompt() {
        assert_eq!(recipient_type_from_index(0), RecipientType::Individual);
        assert_eq!(recipient_type_from_index(1), RecipientType::Juristic);
        assert_eq!(recipient_type_from_index(9), RecipientType::Other);
    }

    #[test]
    fn customer_labels_show_branch_when_present() {
        let customer = Customer {
            code: "C001".into(),
            name: "บริษัท ABC จำกัด".into(),
            branch_name: Some("สาขา 1".into()),
            ..Customer::default()
        };
        assert_eq!(customer_label(&customer), "C001 | บริษัท ABC จำกัด (สาขา 1)");
    }

    #[test]
    fn default_notes_have_three_terms() {
        assert_eq!(DEFAULT_NOTES.lines().count(), 3);
    }

    #[test]
    fn item_id_saturates_at_the_largest_value() {
        let items = vec![LineItem::lump_sum(u64::MAX.to_string(), "a", 1.0)];
        assert_eq!(next_item_id(&items), u64::MAX.to_string());
    }

    #[test]
    fn backdated_document_is_numbered_in_the_issuing_year() {
        let mut doc = Document::new(DocumentKind::Invoice);
        doc.date = NaiveDate::from_ymd_opt(2024, 12, 28);
        let today = NaiveDate::from_ymd_opt(2025, 1, 3).unwrap();
        let stored = Ok(vec![
            serde_json::json!({"invoice_no": "INV20250007"}),
            serde_json::json!({"invoice_no": "INV20240031"}),
        ]);
        assign_number(&mut doc, stored, today);
        assert_eq!(doc.number, "INV20250008");

        let mut copy = Document::new(DocumentKind::Quotation);
        copy.doc_type = DocCopyType::Copy;
        assign_number(&mut copy, Ok(Vec::new()), today);
        assert_eq!(copy.number, "QT20250001-1");
    }

    #[test]
    fn certificate_is_numbered_in_the_issuing_year() {
        let mut cert = WithholdingCertificate::new();
        cert.doc_date = Some("2024-12-30".into());
        let today = NaiveDate::from_ymd_opt(2025, 1, 2).unwrap();
        let stored = Ok(vec![serde_json::json!({"doc_number": "WHT20250002", "doc_date": "2025-01-01"})]);
        assign_certificate_number(&mut cert, stored, today);
        assert_eq!(cert.doc_number, "WHT20250003");
    }

    #[test]
    fn copy_type_prompt_starts_at_the_stored_value() {
        assert_eq!(COPY_TYPES[copy_type_cursor(DocCopyType::Original)], DocCopyType::Original);
        assert_eq!(COPY_TYPES[copy_type_cursor(DocCopyType::Copy)], DocCopyType::Copy);
    }
}
