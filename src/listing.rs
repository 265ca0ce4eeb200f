//! List screens: filtering, per-stage counts and terminal tables.

use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};

use crate::locale;
use crate::model::{Customer, DocCopyType, Document, DocumentKind, Stage, WithholdingCertificate};
use crate::withholding::WithholdingTotals;

const GREEN: Color = Color::Rgb { r: 4, g: 120, b: 87 };
const RED: Color = Color::Rgb { r: 185, g: 28, b: 28 };
const AMBER: Color = Color::Rgb { r: 180, g: 83, b: 9 };
const GREY: Color = Color::Rgb { r: 107, g: 114, b: 128 };

#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    pub search: Option<String>,
    pub stage: Option<Stage>,
    pub doc_type: Option<DocCopyType>,
}

impl DocumentFilter {
    /// Search matches the number or the counterparty name, ignoring case.
    pub fn matches(&self, doc: &Document) -> bool {
        if let Some(term) = self.term() {
            let hit = doc.number.to_lowercase().contains(&term)
                || doc.party.name.to_lowercase().contains(&term);
            if !hit {
                return false;
            }
        }
        if let Some(stage) = self.stage {
            if doc.stage() != Some(stage) {
                return false;
            }
        }
        match self.doc_type {
            Some(doc_type) => doc.doc_type == doc_type,
            None => true,
        }
    }

    pub fn matches_certificate(&self, cert: &WithholdingCertificate) -> bool {
        if let Some(term) = self.term() {
            let hit = cert.doc_number.to_lowercase().contains(&term)
                || cert.recipient_name.to_lowercase().contains(&term)
                || cert.recipient_tax_id.contains(&term);
            if !hit {
                return false;
            }
        }
        match self.stage {
            Some(stage) => DocumentKind::WithholdingTax.stage_of(&cert.status) == Some(stage),
            None => true,
        }
    }

    pub fn apply<'a>(&self, docs: &'a [Document]) -> Vec<&'a Document> {
        docs.iter().filter(|d| self.matches(d)).collect()
    }

    fn term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_lowercase)
    }
}

/// Number of documents per stage, in `Stage::ALL` order. Unknown statuses are not counted.
pub fn status_counts<'a, I>(kind: DocumentKind, statuses: I) -> Vec<(Stage, usize)>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut counts: Vec<(Stage, usize)> = Stage::ALL.iter().map(|s| (*s, 0)).collect();
    for status in statuses {
        if let Some(stage) = kind.stage_of(status) {
            if let Some(entry) = counts.iter_mut().find(|(s, _)| *s == stage) {
                entry.1 += 1;
            }
        }
    }
    counts
}

/// Fills a missing branch from the customer list, matching by code first and then by name.
/// Returns how many documents were filled.
pub fn fill_missing_branches(docs: &mut [Document], customers: &[Customer]) -> usize {
    let mut filled = 0;
    for doc in docs.iter_mut().filter(|d| d.party.branch.is_none()) {
        let by_code = doc
            .party
            .code
            .as_deref()
            .and_then(|code| customers.iter().find(|c| !c.code.is_empty() && c.code == code));
        let customer = by_code.or_else(|| {
            customers
                .iter()
                .find(|c| !doc.party.name.is_empty() && c.name == doc.party.name)
        });
        if let Some(branch) = customer.and_then(|c| c.branch_name.clone()) {
            doc.party.branch = Some(branch);
            filled += 1;
        }
    }
    filled
}

pub fn stage_color(stage: Option<Stage>) -> Color {
    match stage {
        Some(Stage::Completed) => GREEN,
        Some(Stage::Pending) => AMBER,
        Some(Stage::Cancelled) => RED,
        Some(Stage::Draft) | None => GREY,
    }
}

fn status_cell(kind: DocumentKind, status: &str) -> Cell {
    let stage = kind.stage_of(status);
    Cell::new(kind.describe_status(status)).fg(stage_color(stage))
}

fn money_cell(value: f64) -> Cell {
    Cell::new(locale::format_amount(value)).set_alignment(CellAlignment::Right)
}

pub fn document_table(kind: DocumentKind, docs: &[&Document]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("เลขที่"),
        Cell::new("วันที่"),
        Cell::new(kind.counterparty_label()),
        Cell::new("สาขา"),
        Cell::new("ยอดรวม"),
        Cell::new("สถานะ"),
        Cell::new("ประเภท"),
    ]);

    let mut total = 0.0;
    for doc in docs {
        let grand_total = doc.totals().grand_total;
        total += grand_total;
        table.add_row(vec![
            Cell::new(doc.id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(&doc.number),
            Cell::new(doc.date.map(locale::thai_date).unwrap_or_else(|| "-".into())),
            Cell::new(&doc.party.name),
            Cell::new(doc.party.branch.as_deref().unwrap_or("-")),
            money_cell(grand_total),
            status_cell(kind, &doc.status),
            Cell::new(doc.doc_type.label()),
        ]);
    }

    table.add_row(vec![
        Cell::new(""),
        Cell::new(format!("รวม {} รายการ", docs.len())).add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        money_cell(total).add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
    ]);
    table
}

pub fn certificate_table(certs: &[&WithholdingCertificate]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ID"),
        Cell::new("เลขที่"),
        Cell::new("วันที่"),
        Cell::new("ผู้ถูกหักภาษี"),
        Cell::new("เลขประจำตัวผู้เสียภาษี"),
        Cell::new("จำนวนเงิน"),
        Cell::new("ภาษีที่หัก"),
        Cell::new("สถานะ"),
    ]);

    for cert in certs {
        let totals = WithholdingTotals::compute(&cert.items);
        let date = cert
            .doc_date
            .as_deref()
            .and_then(locale::parse_date)
            .map(locale::thai_date)
            .unwrap_or_else(|| "-".into());
        table.add_row(vec![
            Cell::new(cert.id.map(|id| id.to_string()).unwrap_or_default()),
            Cell::new(&cert.doc_number),
            Cell::new(date),
            Cell::new(&cert.recipient_name),
            Cell::new(locale::format_tax_id(&cert.recipient_tax_id)),
            money_cell(totals.amount),
            money_cell(totals.tax),
            status_cell(DocumentKind::WithholdingTax, &cert.status),
        ]);
    }
    table
}

/// The dashboard cards as a single row.
pub fn counts_table(kind: DocumentKind, counts: &[(Stage, usize)]) -> Table {
    let mut table = Table::new();
    let total: usize = counts.iter().map(|(_, n)| n).sum();
    let mut header = vec![Cell::new("ทั้งหมด")];
    let mut row = vec![Cell::new(total).add_attribute(Attribute::Bold)];
    for (stage, count) in counts {
        header.push(Cell::new(kind.status_label(*stage)));
        row.push(Cell::new(count).fg(stage_color(Some(*stage))));
    }
    table.set_header(header);
    table.add_row(row);
    table
}

/// Line items and totals of one document, for `show`.
pub fn item_table(doc: &Document) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#"),
        Cell::new("รายการ"),
        Cell::new("จำนวน"),
        Cell::new("หน่วย"),
        Cell::new("ราคา/หน่วย"),
        Cell::new("จำนวนเงิน"),
    ]);
    for (idx, item) in doc.items.iter().enumerate() {
        table.add_row(vec![
            Cell::new(idx + 1),
            Cell::new(&item.description),
            Cell::new(item.qty.map(locale::format_number).unwrap_or_default()),
            Cell::new(item.unit.as_deref().unwrap_or("")),
            item.price.map(money_cell).unwrap_or_else(|| Cell::new("")),
            money_cell(item.amount),
        ]);
    }

    let totals = doc.totals();
    let mut summary = vec![("รวมเงิน", totals.subtotal)];
    if doc.discount > 0.0 {
        summary.push(("ส่วนลด", totals.discount_amount));
        summary.push(("หลังหักส่วนลด", totals.after_discount));
    }
    summary.push(("ภาษีมูลค่าเพิ่ม", totals.vat));
    for (label, value) in summary {
        table.add_row(vec![
            Cell::new(""),
            Cell::new(label),
            Cell::new(""),
            Cell::new(""),
            Cell::new(""),
            money_cell(value),
        ]);
    }
    table.add_row(vec![
        Cell::new(""),
        Cell::new("จำนวนเงินรวมทั้งสิ้น").add_attribute(Attribute::Bold),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        money_cell(totals.grand_total).add_attribute(Attribute::Bold),
    ]);
    table
}

/// Certificate lines with the withheld and net amounts.
pub fn withholding_item_table(cert: &WithholdingCertificate) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("ประเภท"),
        Cell::new("รายละเอียด"),
        Cell::new("วันที่จ่าย"),
        Cell::new("จำนวนเงิน"),
        Cell::new("อัตรา"),
        Cell::new("ภาษี"),
    ]);
    for item in &cert.items {
        let date = locale::parse_date(&item.date)
            .map(locale::thai_date_short)
            .unwrap_or_else(|| item.date.clone());
        table.add_row(vec![
            Cell::new(&item.income_type),
            Cell::new(&item.description),
            Cell::new(date),
            money_cell(item.amount),
            Cell::new(format!("{}%", locale::format_number(item.tax_rate))),
            money_cell(item.tax_amount),
        ]);
    }

    let totals = WithholdingTotals::compute(&cert.items);
    for (label, amount, tax) in [("รวม", totals.amount, totals.tax), ("ยอดสุทธิที่จ่าย", totals.net(), 0.0)] {
        table.add_row(vec![
            Cell::new(""),
            Cell::new(label).add_attribute(Attribute::Bold),
            Cell::new(""),
            money_cell(amount).add_attribute(Attribute::Bold),
            Cell::new(""),
            if tax > 0.0 { money_cell(tax) } else { Cell::new("") },
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;

    fn doc(number: &str, name: &str, status: &str) -> Document {
        let mut doc = Document::new(DocumentKind::Invoice);
        doc.number = number.into();
        doc.party.name = name.into();
        doc.status = status.into();
        doc.items.push(LineItem::lump_sum("1", "x", 100.0));
        doc
    }

    #[test]
    fn search_is_case_insensitive_on_number_and_name() {
        let docs = vec![
            doc("INV20250001", "บริษัท ABC จำกัด", "draft"),
            doc("INV20250002", "Acme Trading", "paid"),
        ];
        let filter = DocumentFilter { search: Some("acme".into()), ..Default::default() };
        assert_eq!(filter.apply(&docs).len(), 1);
        let filter = DocumentFilter { search: Some("inv2025".into()), ..Default::default() };
        assert_eq!(filter.apply(&docs).len(), 2);
        let filter = DocumentFilter { search: Some("  ".into()), ..Default::default() };
        assert_eq!(filter.apply(&docs).len(), 2);
    }

    #[test]
    fn stage_and_doc_type_filters() {
        let mut copy = doc("INV20250003-1", "X", "pending");
        copy.doc_type = DocCopyType::Copy;
        let docs = vec![doc("INV20250001", "A", "paid"), copy];

        let paid = DocumentFilter { stage: Some(Stage::Completed), ..Default::default() };
        assert_eq!(paid.apply(&docs)[0].number, "INV20250001");

        let originals = DocumentFilter { doc_type: Some(DocCopyType::Original), ..Default::default() };
        assert_eq!(originals.apply(&docs).len(), 1);
        let copies = DocumentFilter { doc_type: Some(DocCopyType::Copy), ..Default::default() };
        assert_eq!(copies.apply(&docs)[0].number, "INV20250003-1");
    }

    #[test]
    fn counts_skip_unknown_statuses() {
        let counts = status_counts(DocumentKind::Receipt, ["ร่าง", "ออกแล้ว", "ออกแล้ว", "archived"]);
        assert_eq!(counts[0], (Stage::Draft, 1));
        assert_eq!(counts[2], (Stage::Completed, 2));
        assert_eq!(counts.iter().map(|(_, n)| n).sum::<usize>(), 3);
    }

    #[test]
    fn branches_match_by_code_then_name() {
        let customers = vec![
            Customer {
                code: "C001".into(),
                name: "บริษัท ABC จำกัด".into(),
                branch_name: Some("สำนักงานใหญ่".into()),
                ..Customer::default()
            },
            Customer {
                code: "C002".into(),
                name: "ร้าน DEF".into(),
                branch_name: Some("สาขา 2".into()),
                ..Customer::default()
            },
        ];
        let mut by_code = doc("INV1", "ชื่อเก่า", "draft");
        by_code.party.code = Some("C002".into());
        let by_name = doc("INV2", "บริษัท ABC จำกัด", "draft");
        let unknown = doc("INV3", "ไม่มีในระบบ", "draft");
        let mut has_branch = doc("INV4", "ร้าน DEF", "draft");
        has_branch.party.branch = Some("เดิม".into());

        let mut docs = vec![by_code, by_name, unknown, has_branch];
        assert_eq!(fill_missing_branches(&mut docs, &customers), 2);
        assert_eq!(docs[0].party.branch.as_deref(), Some("สาขา 2"));
        assert_eq!(docs[1].party.branch.as_deref(), Some("สำนักงานใหญ่"));
        assert_eq!(docs[2].party.branch, None);
        assert_eq!(docs[3].party.branch.as_deref(), Some("เดิม"));
    }

    #[test]
    fn certificate_filter_uses_recipient() {
        let mut cert = WithholdingCertificate::new();
        cert.doc_number = "WHT20250001".into();
        cert.recipient_name = "นาย สมชาย".into();
        let filter = DocumentFilter { search: Some("สมชาย".into()), stage: Some(Stage::Draft), ..Default::default() };
        assert!(filter.matches_certificate(&cert));
        let filter = DocumentFilter { stage: Some(Stage::Completed), ..Default::default() };
        assert!(!filter.matches_certificate(&cert));
    }

    #[test]
    fn tables_have_a_row_per_document_plus_total() {
        let docs = vec![doc("INV1", "A", "draft"), doc("INV2", "B", "paid")];
        let refs: Vec<&Document> = docs.iter().collect();
        let table = document_table(DocumentKind::Invoice, &refs);
        assert_eq!(table.row_iter().count(), 3);
        assert!(table.to_string().contains("ชำระแล้ว"));
    }

    #[test]
    fn withholding_lines_end_with_total_and_net() {
        let mut cert = WithholdingCertificate::new();
        let mut item = crate::model::WithholdingItem::for_income_type(&crate::withholding::INCOME_TYPES[2], "2025-01-05");
        item.set_amount(1000.0);
        cert.items.push(item);
        let table = withholding_item_table(&cert);
        assert_eq!(table.row_iter().count(), 3);
        let text = table.to_string();
        assert!(text.contains("30.00"));
        assert!(text.contains("970.00"));
    }
}
