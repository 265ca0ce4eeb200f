use chrono::NaiveDate;
use clap::ValueEnum;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::totals::Totals;

// ==========================================
// Document kinds & lifecycle
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum DocumentKind {
    #[value(alias = "inv")]
    Invoice,
    #[value(alias = "qt")]
    Quotation,
    #[value(alias = "po")]
    PurchaseOrder,
    #[value(alias = "rec")]
    Receipt,
    #[value(alias = "wht")]
    WithholdingTax,
}

impl DocumentKind {
    /// REST collection name under the API base URL.
    pub fn resource(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "invoices",
            DocumentKind::Quotation => "quotations",
            DocumentKind::PurchaseOrder => "purchase-orders",
            DocumentKind::Receipt => "receipts",
            DocumentKind::WithholdingTax => "withholding-taxes",
        }
    }

    pub fn prefix(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "INV",
            DocumentKind::Quotation => "QT",
            DocumentKind::PurchaseOrder => "PO",
            DocumentKind::Receipt => "REC",
            DocumentKind::WithholdingTax => "WHT",
        }
    }

    /// Prefix used when the existing numbers could not be fetched.
    pub fn fallback_prefix(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "TINV",
            other => other.prefix(),
        }
    }

    /// Item rows per printed A4 page.
    pub fn page_capacity(self) -> usize {
        match self {
            DocumentKind::Invoice => 13,
            DocumentKind::Quotation => 16,
            DocumentKind::PurchaseOrder => 14,
            DocumentKind::Receipt => 10,
            DocumentKind::WithholdingTax => 10,
        }
    }

    pub fn title_th(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "ใบส่งสินค้า/ใบแจ้งหนี้",
            DocumentKind::Quotation => "ใบเสนอราคา",
            DocumentKind::PurchaseOrder => "ใบสั่งซื้อ",
            DocumentKind::Receipt => "ใบเสร็จรับเงิน/ใบกำกับภาษี",
            DocumentKind::WithholdingTax => "หนังสือรับรองการหักภาษี ณ ที่จ่าย",
        }
    }

    pub fn title_en(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "Delivery Note/Invoice",
            DocumentKind::Quotation => "Quotation",
            DocumentKind::PurchaseOrder => "Purchase Order",
            DocumentKind::Receipt => "Receipt/Tax Invoice",
            DocumentKind::WithholdingTax => "Withholding Tax Certificate",
        }
    }

    /// Short name used in notifications ("บันทึกใบแจ้งหนี้สำเร็จ").
    pub fn short_name(self) -> &'static str {
        match self {
            DocumentKind::Invoice => "ใบแจ้งหนี้",
            DocumentKind::Quotation => "ใบเสนอราคา",
            DocumentKind::PurchaseOrder => "ใบสั่งซื้อ",
            DocumentKind::Receipt => "ใบเสร็จรับเงิน",
            DocumentKind::WithholdingTax => "หัก ณ ที่จ่าย",
        }
    }

    /// Purchase orders are addressed to a supplier, everything else to a customer.
    pub fn counterparty_label(self) -> &'static str {
        match self {
            DocumentKind::PurchaseOrder => "ผู้จำหน่าย",
            DocumentKind::WithholdingTax => "ผู้ถูกหักภาษี ณ ที่จ่าย",
            _ => "ลูกค้า",
        }
    }

    pub fn signatures(self) -> Signatures {
        match self {
            DocumentKind::Invoice => Signatures {
                left_caption: "ได้รับสินค้า/บริการเรียบร้อยครบถ้วน",
                left_role: "ลูกค้า",
                right_role: "ผู้ส่งสินค้า",
            },
            DocumentKind::Quotation => Signatures {
                left_caption: "ยืนยันการสั่งซื้อตามใบเสนอราคานี้",
                left_role: "ผู้สั่งซื้อ",
                right_role: "ผู้เสนอราคา",
            },
            DocumentKind::PurchaseOrder => Signatures {
                left_caption: "ผู้จำหน่ายรับทราบคำสั่งซื้อ",
                left_role: "ผู้จำหน่าย",
                right_role: "ผู้อนุมัติสั่งซื้อ",
            },
            DocumentKind::Receipt | DocumentKind::WithholdingTax => Signatures {
                left_caption: "ได้ชำระเงินตามรายการข้างต้นแล้ว",
                left_role: "ผู้จ่ายเงิน",
                right_role: "ผู้รับเงิน",
            },
        }
    }

    /// Wire value stored by the backend for a lifecycle stage.
    pub fn status_wire(self, stage: Stage) -> &'static str {
        match (self, stage) {
            (DocumentKind::Invoice, Stage::Draft) => "draft",
            (DocumentKind::Invoice, Stage::Pending) => "pending",
            (DocumentKind::Invoice, Stage::Completed) => "paid",
            (DocumentKind::Invoice, Stage::Cancelled) => "cancelled",
            (_, Stage::Draft) => "ร่าง",
            (_, Stage::Cancelled) => "ยกเลิก",
            (DocumentKind::PurchaseOrder, Stage::Pending) => "รอจัดส่ง",
            (DocumentKind::PurchaseOrder, Stage::Completed) => "จัดส่งแล้ว",
            (DocumentKind::Receipt, Stage::Pending) => "รอออก",
            (DocumentKind::Receipt, Stage::Completed) => "ออกแล้ว",
            (_, Stage::Pending) => "รออนุมัติ",
            (_, Stage::Completed) => "อนุมัติแล้ว",
        }
    }

    pub fn status_label(self, stage: Stage) -> &'static str {
        match (self, stage) {
            (DocumentKind::Invoice, Stage::Draft) => "ร่าง",
            (DocumentKind::Invoice, Stage::Pending) => "รอชำระ",
            (DocumentKind::Invoice, Stage::Completed) => "ชำระแล้ว",
            (DocumentKind::Invoice, Stage::Cancelled) => "ยกเลิก",
            (other, stage) => other.status_wire(stage),
        }
    }

    /// Accepts either the wire value or the Thai label.
    pub fn stage_of(self, status: &str) -> Option<Stage> {
        let status = status.trim();
        Stage::ALL
            .into_iter()
            .find(|s| self.status_wire(*s) == status || self.status_label(*s) == status)
    }

    /// Label for a raw status, falling back to the raw text for unknown values.
    pub fn describe_status(self, status: &str) -> String {
        match self.stage_of(status) {
            Some(stage) => self.status_label(stage).to_string(),
            None if status.is_empty() => "-".to_string(),
            None => status.to_string(),
        }
    }

    pub fn is_withholding(self) -> bool {
        self == DocumentKind::WithholdingTax
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Signatures {
    pub left_caption: &'static str,
    pub left_role: &'static str,
    pub right_role: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Stage {
    Draft,
    Pending,
    Completed,
    Cancelled,
}

impl Stage {
    pub const ALL: [Stage; 4] = [Stage::Draft, Stage::Pending, Stage::Completed, Stage::Cancelled];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DocCopyType {
    #[default]
    Original,
    Copy,
}

impl DocCopyType {
    pub fn as_str(self) -> &'static str {
        match self {
            DocCopyType::Original => "original",
            DocCopyType::Copy => "copy",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DocCopyType::Original => "ต้นฉบับ",
            DocCopyType::Copy => "สำเนา",
        }
    }

    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("copy") => DocCopyType::Copy,
            _ => DocCopyType::Original,
        }
    }
}

// ==========================================
// Line items
// ==========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(
        rename = "productId",
        default,
        deserialize_with = "lenient_opt_u64",
        skip_serializing_if = "Option::is_none"
    )]
    pub product_id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub qty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_f64", skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
}

impl LineItem {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        LineItem {
            id: id.into(),
            product_id: None,
            description: description.into(),
            qty: Some(1.0),
            unit: None,
            price: Some(0.0),
            amount: 0.0,
        }
    }

    /// A line with only an amount, as receipts created from a single payment carry.
    pub fn lump_sum(id: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        LineItem {
            id: id.into(),
            product_id: None,
            description: description.into(),
            qty: None,
            unit: None,
            price: None,
            amount,
        }
    }

    /// Fills description, unit and price from a catalogue product.
    pub fn apply_product(&mut self, product: &Product) {
        self.product_id = product.id;
        self.description = product.name.clone();
        if product.unit.is_some() {
            self.unit = product.unit.clone();
        }
        if self.qty.is_none() {
            self.qty = Some(1.0);
        }
        self.set_price(product.sale_price);
    }

    pub fn set_qty(&mut self, qty: f64) {
        self.qty = Some(qty);
        self.recompute_amount();
    }

    pub fn set_price(&mut self, price: f64) {
        self.price = Some(price);
        self.recompute_amount();
    }

    /// Overrides the amount directly; it is not forced back to `qty * price`.
    pub fn set_amount(&mut self, amount: f64) {
        self.amount = amount;
    }

    fn recompute_amount(&mut self) {
        self.amount = self.qty.unwrap_or(1.0) * self.price.unwrap_or(0.0);
    }
}

// ==========================================
// Counterparties & reference data
// ==========================================

/// Counterparty snapshot copied onto a document when it is saved.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Party {
    pub code: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub tax_id: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub branch: Option<String>,
}

impl From<&Customer> for Party {
    fn from(customer: &Customer) -> Self {
        Party {
            code: non_empty(&customer.code),
            name: customer.name.clone(),
            address: customer.address.clone(),
            tax_id: customer.tax_id.clone(),
            phone: customer.phone.clone(),
            email: customer.email.clone(),
            branch: customer.branch_name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Customer {
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub code: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub branch_name: Option<String>,
    #[serde(default)]
    pub tax_id: Option<String>,
    #[serde(default)]
    pub contact_person: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Customer {
    pub fn is_active(&self) -> bool {
        self.status.as_deref().map_or(true, |s| s == "active")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Product {
    #[serde(default, deserialize_with = "lenient_opt_u64")]
    pub id: Option<u64>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub sale_price: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompanySetting {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
}

// ==========================================
// Commercial documents
// ==========================================

/// Quotation, purchase order, invoice or receipt.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: Option<u64>,
    pub kind: DocumentKind,
    pub number: String,
    pub date: Option<NaiveDate>,
    pub party: Party,
    pub reference: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_phone: Option<String>,
    pub salesperson: Option<String>,
    pub items: Vec<LineItem>,
    pub notes: Option<String>,
    pub discount: f64,
    pub vat_rate: f64,
    /// Totals as stored by the backend; `None` when the record carried none.
    pub stored_totals: Option<Totals>,
    pub status: String,
    pub doc_type: DocCopyType,
    pub description: Option<String>,
}

impl Document {
    pub fn new(kind: DocumentKind) -> Self {
        Document {
            id: None,
            kind,
            number: String::new(),
            date: None,
            party: Party::default(),
            reference: None,
            shipping_address: None,
            shipping_phone: None,
            salesperson: None,
            items: Vec::new(),
            notes: None,
            discount: 0.0,
            vat_rate: 7.0,
            stored_totals: None,
            status: kind.status_wire(Stage::Draft).to_string(),
            doc_type: DocCopyType::Original,
            description: None,
        }
    }

    /// Totals recomputed from the items, discount and VAT rate.
    pub fn totals(&self) -> Totals {
        Totals::compute(&self.items, self.discount, self.vat_rate)
    }

    pub fn stage(&self) -> Option<Stage> {
        self.kind.stage_of(&self.status)
    }

    pub fn is_copy(&self) -> bool {
        self.doc_type == DocCopyType::Copy
    }
}

// ==========================================
// Withholding tax certificates
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RecipientType {
    Individual,
    #[default]
    Juristic,
    Partnership,
    #[serde(other)]
    Other,
}

impl RecipientType {
    pub fn label(self) -> &'static str {
        match self {
            RecipientType::Individual => "บุคคลธรรมดา",
            RecipientType::Juristic => "นิติบุคคล",
            RecipientType::Partnership => "ห้างหุ้นส่วน",
            RecipientType::Other => "อื่นๆ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingItem {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub income_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: String,
    #[serde(alias = "taxRate", default, deserialize_with = "lenient_f64")]
    pub tax_rate: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub amount: f64,
    #[serde(alias = "taxAmount", default, deserialize_with = "lenient_f64")]
    pub tax_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WithholdingCertificate {
    #[serde(default, deserialize_with = "lenient_opt_u64", skip_serializing)]
    pub id: Option<u64>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub doc_number: String,
    #[serde(default)]
    pub doc_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub sequence_number: Option<String>,
    #[serde(default)]
    pub deduction_order: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payer_tax_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payer_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub payer_address: String,
    #[serde(default)]
    pub representative_tax_id: Option<String>,
    #[serde(default)]
    pub representative_name: Option<String>,
    #[serde(default)]
    pub representative_address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_tax_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recipient_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub recipient_type: RecipientType,
    #[serde(default)]
    pub company_type: Option<String>,
    #[serde(default)]
    pub deduction_mode: Option<String>,
    #[serde(default)]
    pub deduction_other: Option<String>,
    #[serde(default)]
    pub deduction_format: Option<String>,
    #[serde(default, deserialize_with = "json_list")]
    pub items: Vec<WithholdingItem>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_amount: f64,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_tax: f64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl WithholdingCertificate {
    pub fn new() -> Self {
        WithholdingCertificate {
            id: None,
            doc_number: String::new(),
            doc_date: None,
            sequence_number: Some("1".to_string()),
            deduction_order: None,
            payer_tax_id: String::new(),
            payer_name: String::new(),
            payer_address: String::new(),
            representative_tax_id: None,
            representative_name: None,
            representative_address: None,
            recipient_tax_id: String::new(),
            recipient_name: String::new(),
            recipient_address: String::new(),
            recipient_type: RecipientType::Juristic,
            company_type: Some("2".to_string()),
            deduction_mode: None,
            deduction_other: None,
            deduction_format: None,
            items: Vec::new(),
            total_amount: 0.0,
            total_tax: 0.0,
            status: DocumentKind::WithholdingTax.status_wire(Stage::Draft).to_string(),
            created_by: None,
            notes: None,
        }
    }
}

impl Default for WithholdingCertificate {
    fn default() -> Self {
        Self::new()
    }
}

// ==========================================
// Lenient decoding helpers
// ==========================================

/// Reads a number that may have been serialized as a JSON string.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

pub fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Decodes a list that is either a JSON array or a JSON-encoded string.
pub fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, serde_json::Error> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        Value::String(s) => serde_json::from_str(&s),
        other => serde_json::from_value(other),
    }
}

pub(crate) fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() { None } else { Some(trimmed.to_string()) }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_f64(&value).unwrap_or(0.0))
}

fn lenient_opt_f64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<f64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_f64(&value))
}

fn lenient_opt_u64<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_string(&value).unwrap_or_default())
}

fn lenient_opt_string<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(value_to_string(&value))
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Option::<T>::deserialize(d).map(Option::unwrap_or_default)
}

fn json_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(d)?;
    decode_list(value).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn stage_round_trips_through_wire_and_label() {
        assert_eq!(DocumentKind::Invoice.stage_of("paid"), Some(Stage::Completed));
        assert_eq!(DocumentKind::Invoice.stage_of("ชำระแล้ว"), Some(Stage::Completed));
        assert_eq!(DocumentKind::PurchaseOrder.stage_of("รอจัดส่ง"), Some(Stage::Pending));
        assert_eq!(DocumentKind::Receipt.stage_of("ออกแล้ว"), Some(Stage::Completed));
        assert_eq!(DocumentKind::Quotation.stage_of("paid"), None);
    }

    #[test]
    fn unknown_status_is_described_verbatim() {
        assert_eq!(DocumentKind::Quotation.describe_status("archived"), "archived");
        assert_eq!(DocumentKind::Invoice.describe_status("pending"), "รอชำระ");
    }

    #[test]
    fn qty_and_price_recompute_amount_but_amount_stays_editable() {
        let mut item = LineItem::new("1", "งานติดตั้ง");
        item.set_qty(3.0);
        item.set_price(250.0);
        assert_eq!(item.amount, 750.0);

        item.set_amount(700.0);
        assert_eq!(item.amount, 700.0);
        assert_eq!(item.qty, Some(3.0));
    }

    #[test]
    fn product_fills_line() {
        let product = Product {
            id: Some(9),
            code: Some("P-9".into()),
            name: "กระดาษ A4".into(),
            unit: Some("รีม".into()),
            sale_price: 120.0,
        };
        let mut item = LineItem::new("1", "");
        item.set_qty(2.0);
        item.apply_product(&product);
        assert_eq!(item.description, "กระดาษ A4");
        assert_eq!(item.unit.as_deref(), Some("รีม"));
        assert_eq!(item.amount, 240.0);
        assert_eq!(item.product_id, Some(9));
    }

    #[test]
    fn line_items_accept_string_numbers() {
        let item: LineItem = serde_json::from_value(json!({
            "id": 1700000000000u64,
            "description": null,
            "qty": "2",
            "price": "10.50",
            "amount": "21.00"
        }))
        .unwrap();
        assert_eq!(item.id, "1700000000000");
        assert_eq!(item.description, "");
        assert_eq!(item.qty, Some(2.0));
        assert_eq!(item.amount, 21.0);
    }

    #[test]
    fn decode_list_accepts_encoded_string() {
        let encoded = json!("[{\"id\":\"a\",\"description\":\"x\",\"amount\":5}]");
        let items: Vec<LineItem> = decode_list(encoded).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount, 5.0);

        let empty: Vec<LineItem> = decode_list(json!("")).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn certificate_decodes_with_nulls_and_camel_case_items() {
        let cert: WithholdingCertificate = serde_json::from_value(json!({
            "id": "12",
            "doc_number": "WHT20250003",
            "sequence_number": 3,
            "recipient_type": null,
            "items": [{"type": "2. ", "description": "ค่านายหน้า", "date": "2025-01-05",
                       "taxRate": 3, "amount": "1000", "taxAmount": 30}],
            "total_amount": "1000.00",
            "total_tax": 30,
            "status": "ร่าง"
        }))
        .unwrap();
        assert_eq!(cert.id, Some(12));
        assert_eq!(cert.sequence_number.as_deref(), Some("3"));
        assert_eq!(cert.recipient_type, RecipientType::Juristic);
        assert_eq!(cert.items[0].tax_amount, 30.0);
        assert_eq!(cert.total_amount, 1000.0);
    }

    #[test]
    fn inactive_customers_are_detected() {
        let active = Customer { status: Some("active".into()), ..Customer::default() };
        let inactive = Customer { status: Some("inactive".into()), ..Customer::default() };
        assert!(active.is_active());
        assert!(!inactive.is_active());
    }
}
