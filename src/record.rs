//! Mapping between backend records and [`Document`].
//!
//! Each document type stores the same information under its own field names
//! (`invoice_no` vs `po_number`, `customer_*` vs `supplier_*`), so records are
//! read through ordered fallback lists rather than a fixed serde shape.

use serde_json::{Map, Value, json};
use tracing::warn;

use crate::error::{AppError, AppResult};
use crate::locale;
use crate::model::{DocCopyType, Document, DocumentKind, LineItem, Party, decode_list, value_to_f64, value_to_string};
use crate::numbering::NUMBER_FIELDS;
use crate::totals::Totals;

/// Collection responses arrive either as a bare array or as `{ "data": [...] }`.
pub fn extract_records(body: Value) -> AppResult<Vec<Value>> {
    match body {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(Value::Null) | None => Ok(Vec::new()),
            Some(other) => Err(AppError::unexpected(format!("data is not a list: {}", other))),
        },
        other => Err(AppError::unexpected(format!("expected a list, got {}", other))),
    }
}

/// Single-record responses may also be wrapped in `data`.
pub fn extract_record(body: Value) -> AppResult<Value> {
    match body {
        Value::Object(mut map) => match map.remove("data") {
            Some(inner @ Value::Object(_)) => Ok(inner),
            Some(other) => {
                map.insert("data".to_string(), other);
                Ok(Value::Object(map))
            }
            None => Ok(Value::Object(map)),
        },
        other => Err(AppError::unexpected(format!("expected an object, got {}", other))),
    }
}

fn text(record: &Value, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| record.get(*f).and_then(value_to_string))
        .map(|s| s.trim().to_string())
        .find(|s| !s.is_empty())
}

fn number(record: &Value, field: &str) -> Option<f64> {
    record.get(field).and_then(value_to_f64)
}

fn party_prefix(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::PurchaseOrder => "supplier",
        _ => "customer",
    }
}

fn number_field(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::Invoice => "invoice_no",
        DocumentKind::Quotation => "quotation_number",
        DocumentKind::PurchaseOrder => "po_number",
        DocumentKind::Receipt => "receipt_no",
        DocumentKind::WithholdingTax => "doc_number",
    }
}

impl Document {
    pub fn from_record(kind: DocumentKind, record: &Value) -> Document {
        let p = party_prefix(kind);
        let field = |suffix: &str| format!("{}_{}", p, suffix);

        let party = Party {
            code: text(record, &[field("code").as_str()]),
            name: text(record, &[field("name").as_str(), "customer"]).unwrap_or_default(),
            address: text(record, &[field("address").as_str()]),
            tax_id: text(record, &[field("tax_id").as_str()]),
            phone: text(record, &[field("phone").as_str()]),
            email: text(record, &[field("email").as_str()]),
            branch: text(record, &[field("branch_name").as_str(), "branch_name"]),
        };

        let mut items: Vec<LineItem> = match record.get("items").cloned().map(decode_list) {
            Some(Ok(items)) => items,
            Some(Err(e)) => {
                warn!(error = %e, "could not decode document items");
                Vec::new()
            }
            None => Vec::new(),
        };

        let reference = text(record, &["reference_doc", "invoice_ref"]);
        let description = text(record, &["description"]);

        if kind == DocumentKind::Receipt && items.is_empty() {
            if let Some(amount) = number(record, "amount") {
                let label = description.clone().or_else(|| reference.clone()).unwrap_or_default();
                items.push(LineItem::lump_sum("1", label, amount));
            }
        }

        let stored_totals = number(record, "grand_total").map(|grand_total| Totals {
            subtotal: number(record, "subtotal").unwrap_or(0.0),
            discount_amount: number(record, "discount_amount").unwrap_or(0.0),
            after_discount: number(record, "after_discount").unwrap_or(0.0),
            vat: number(record, "vat").unwrap_or(0.0),
            grand_total,
        });

        let mut number_fields = vec![number_field(kind)];
        number_fields.extend(NUMBER_FIELDS.iter().copied());

        Document {
            id: record.get("id").and_then(|v| match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.parse().ok(),
                _ => None,
            }),
            kind,
            number: text(record, &number_fields).unwrap_or_default(),
            date: text(record, &["invoice_date", "date", "receipt_date"])
                .as_deref()
                .and_then(locale::parse_date),
            party,
            reference,
            shipping_address: text(record, &["shipping_address"]),
            shipping_phone: text(record, &["shipping_phone"]),
            salesperson: text(record, &["salesperson", "seller_name", "buyer_name"]),
            items,
            notes: text(record, &["notes"]),
            discount: number(record, "discount").unwrap_or(0.0),
            vat_rate: number(record, "vat_rate").unwrap_or(7.0),
            stored_totals,
            status: text(record, &["status"]).unwrap_or_default(),
            doc_type: DocCopyType::parse(record.get("doc_type").and_then(Value::as_str)),
            description,
        }
    }

    /// Request body for POST/PUT. Totals are always recomputed from the items.
    pub fn to_payload(&self) -> AppResult<Value> {
        let totals = self.totals();
        let items = serde_json::to_string(&self.items)?;
        let date = self.date.map(|d| d.format("%Y-%m-%d").to_string());
        let branch = self.party.branch.clone();
        let status = if self.status.is_empty() {
            self.kind.status_wire(crate::model::Stage::Draft).to_string()
        } else {
            self.status.clone()
        };

        let mut body = Map::new();
        let mut put = |key: &str, value: Value| {
            body.insert(key.to_string(), value);
        };

        let p = party_prefix(self.kind);
        put(number_field(self.kind), json!(self.number));
        match self.kind {
            DocumentKind::Invoice => {
                put("invoice_date", json!(date));
                put("due_date", Value::Null);
            }
            DocumentKind::Quotation => {
                put("date", json!(date));
                put("valid_until", Value::Null);
            }
            DocumentKind::PurchaseOrder => {
                put("date", json!(date));
                put("expected_delivery_date", Value::Null);
            }
            DocumentKind::Receipt => {
                put("date", json!(date));
            }
            DocumentKind::WithholdingTax => {
                return Err(AppError::validation("หนังสือรับรองหัก ณ ที่จ่ายใช้แบบฟอร์มแยก"));
            }
        }

        if self.kind == DocumentKind::Receipt {
            put("customer", json!(self.party.name));
        } else {
            put(&format!("{}_name", p), json!(self.party.name));
        }
        put(&format!("{}_code", p), json!(self.party.code));
        put(&format!("{}_address", p), json!(self.party.address));
        put(&format!("{}_tax_id", p), json!(self.party.tax_id));
        put(&format!("{}_phone", p), json!(self.party.phone));
        put(&format!("{}_email", p), json!(self.party.email));
        put(&format!("{}_branch_name", p), json!(branch));
        if matches!(self.kind, DocumentKind::Quotation | DocumentKind::Receipt) {
            put("branch_name", json!(branch));
        }

        let reference_key = if self.kind == DocumentKind::Receipt { "invoice_ref" } else { "reference_doc" };
        put(reference_key, json!(self.reference.clone().unwrap_or_default()));
        put("shipping_address", json!(self.shipping_address.clone().unwrap_or_default()));
        put("shipping_phone", json!(self.shipping_phone.clone().unwrap_or_default()));

        let salesperson = json!(self.salesperson.clone().unwrap_or_default());
        if self.kind == DocumentKind::PurchaseOrder {
            put("buyer_name", salesperson);
        } else {
            put("seller_name", salesperson.clone());
            put("salesperson", salesperson);
        }

        put("items", json!(items));
        put("notes", json!(self.notes.clone().unwrap_or_default()));
        put("discount", json!(self.discount));
        put("vat_rate", json!(self.vat_rate));
        put("subtotal", json!(totals.subtotal));
        put("discount_amount", json!(totals.discount_amount));
        put("after_discount", json!(totals.after_discount));
        put("vat", json!(totals.vat));
        put("grand_total", json!(totals.grand_total));
        if self.kind == DocumentKind::Receipt {
            put("amount", json!(totals.grand_total));
            if let Some(description) = &self.description {
                put("description", json!(description));
            }
        }
        put("status", json!(status));
        put("doc_type", json!(self.doc_type.as_str()));

        Ok(Value::Object(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn collections_accept_both_shapes() {
        let bare = extract_records(json!([{"id": 1}, {"id": 2}])).unwrap();
        assert_eq!(bare.len(), 2);
        let wrapped = extract_records(json!({"data": [{"id": 1}]})).unwrap();
        assert_eq!(wrapped.len(), 1);
        let empty = extract_records(json!({"message": "ok"})).unwrap();
        assert!(empty.is_empty());
        assert!(extract_records(json!("nope")).is_err());
    }

    #[test]
    fn single_records_unwrap_data() {
        let inner = extract_record(json!({"data": {"id": 4}})).unwrap();
        assert_eq!(inner["id"], 4);
        let bare = extract_record(json!({"id": 5})).unwrap();
        assert_eq!(bare["id"], 5);
    }

    #[test]
    fn reads_purchase_order_supplier_fields() {
        let record = json!({
            "id": 7,
            "po_number": "PO20250002",
            "date": "2025-04-01T00:00:00.000000Z",
            "supplier_name": "บริษัท XYZ จำกัด",
            "supplier_code": "S001",
            "supplier_branch_name": "สำนักงานใหญ่",
            "buyer_name": "สมชาย",
            "items": "[{\"id\":\"1\",\"description\":\"กระดาษ\",\"qty\":2,\"price\":100,\"amount\":200}]",
            "discount": "0",
            "vat_rate": "7.00",
            "subtotal": "200.00",
            "vat": "14.00",
            "after_discount": "200.00",
            "discount_amount": "0.00",
            "grand_total": "214.00",
            "status": "รอจัดส่ง",
            "doc_type": "copy"
        });
        let doc = Document::from_record(DocumentKind::PurchaseOrder, &record);
        assert_eq!(doc.id, Some(7));
        assert_eq!(doc.number, "PO20250002");
        assert_eq!(doc.date, NaiveDate::from_ymd_opt(2025, 4, 1));
        assert_eq!(doc.party.name, "บริษัท XYZ จำกัด");
        assert_eq!(doc.party.branch.as_deref(), Some("สำนักงานใหญ่"));
        assert_eq!(doc.salesperson.as_deref(), Some("สมชาย"));
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.stored_totals.unwrap().grand_total, 214.0);
        assert_eq!(doc.stage(), Some(crate::model::Stage::Pending));
        assert!(doc.is_copy());
        assert!(!doc.totals().differs_from(&doc.stored_totals.unwrap(), 0.005));
    }

    #[test]
    fn legacy_receipt_amount_becomes_a_line() {
        let record = json!({
            "id": 3,
            "receipt_no": "REC20250001",
            "customer": "ร้าน DEF การค้า",
            "invoice_ref": "INV20250004",
            "amount": 1070
        });
        let doc = Document::from_record(DocumentKind::Receipt, &record);
        assert_eq!(doc.party.name, "ร้าน DEF การค้า");
        assert_eq!(doc.items.len(), 1);
        assert_eq!(doc.items[0].description, "INV20250004");
        assert_eq!(doc.items[0].amount, 1070.0);
        assert_eq!(doc.doc_type, DocCopyType::Original);
    }

    #[test]
    fn invoice_payload_recomputes_totals() {
        let mut doc = Document::new(DocumentKind::Invoice);
        doc.number = "INV20250001".into();
        doc.party.name = "บริษัท ABC จำกัด".into();
        doc.discount = 10.0;
        doc.items = vec![
            LineItem::lump_sum("1", "a", 1000.0),
            LineItem::lump_sum("2", "b", 500.0),
        ];
        doc.stored_totals = Some(Totals::default());

        let body = doc.to_payload().unwrap();
        assert_eq!(body["invoice_no"], "INV20250001");
        assert_eq!(body["customer_name"], "บริษัท ABC จำกัด");
        assert_eq!(body["grand_total"], 1444.5);
        assert_eq!(body["status"], "draft");
        assert_eq!(body["doc_type"], "original");
        assert!(body["items"].is_string());
    }

    #[test]
    fn receipt_payload_uses_receipt_field_names() {
        let mut doc = Document::new(DocumentKind::Receipt);
        doc.number = "REC20250002".into();
        doc.party.name = "ลูกค้า".into();
        doc.reference = Some("INV20250001".into());
        doc.vat_rate = 0.0;
        doc.items = vec![LineItem::lump_sum("1", "ชำระเงิน", 300.0)];

        let body = doc.to_payload().unwrap();
        assert_eq!(body["receipt_no"], "REC20250002");
        assert_eq!(body["customer"], "ลูกค้า");
        assert_eq!(body["invoice_ref"], "INV20250001");
        assert_eq!(body["amount"], 300.0);
        assert_eq!(body["status"], "ร่าง");
        assert!(body.get("customer_name").is_none());
    }
}
