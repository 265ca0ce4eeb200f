//! Sequential document numbers: `PREFIX` + year + four-digit sequence.

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AppResult;
use crate::locale;
use crate::model::{DocCopyType, DocumentKind};

/// Fields that may hold a commercial document's number, in lookup order.
pub const NUMBER_FIELDS: [&str; 4] = ["invoice_no", "quotation_number", "po_number", "receipt_no"];

const COPY_SUFFIX: &str = "-1";

const MAX_SEQUENCE: u32 = 9999;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocNumberFormat {
    /// `INV20250001`
    #[default]
    Plain,
    /// `INV{2025}{0001}`
    Braces,
    /// `INV-2025-0001`
    Dash,
}

/// Sequences past 9999 get five digits and no longer match the four-digit scan.
pub fn format_doc_number(prefix: &str, year: i32, last_seq: u32, format: DocNumberFormat) -> String {
    let next = last_seq.saturating_add(1);
    if next > MAX_SEQUENCE {
        warn!(prefix, year, sequence = next, "yearly document sequence exhausted");
    }
    let seq = format!("{:04}", next);
    match format {
        DocNumberFormat::Plain => format!("{}{}{}", prefix, year, seq),
        DocNumberFormat::Braces => format!("{}{{{}}}{{{}}}", prefix, year, seq),
        DocNumberFormat::Dash => format!("{}-{}-{}", prefix, year, seq),
    }
}

/// Largest sequence already used for `kind` in `year`, or 0.
pub fn max_sequence(records: &[Value], kind: DocumentKind, year: i32) -> u32 {
    let pattern = format!(r"^{}{}(\d{{4}})$", regex::escape(kind.prefix()), year);
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(e) => {
            warn!(error = %e, "invalid numbering pattern");
            return 0;
        }
    };

    let from_numbers = records
        .iter()
        .filter_map(|record| record_number(record, kind))
        .filter_map(|number| {
            re.captures(number)
                .and_then(|caps| caps[1].parse::<u32>().ok())
        })
        .max()
        .unwrap_or(0);

    if from_numbers > 0 || !kind.is_withholding() {
        return from_numbers;
    }

    // Older certificates only carried a per-year sequence_number.
    records
        .iter()
        .filter(|record| {
            record
                .get("doc_date")
                .and_then(Value::as_str)
                .and_then(locale::parse_date)
                .is_some_and(|d| chrono::Datelike::year(&d) == year)
        })
        .filter_map(|record| record.get("sequence_number"))
        .filter_map(|seq| match seq {
            Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

fn record_number(record: &Value, kind: DocumentKind) -> Option<&str> {
    if kind.is_withholding() {
        return record.get("doc_number").and_then(Value::as_str);
    }
    NUMBER_FIELDS
        .iter()
        .filter_map(|field| record.get(*field).and_then(Value::as_str))
        .find(|s| !s.is_empty())
}

pub fn next_doc_number(records: &[Value], kind: DocumentKind, year: i32) -> String {
    let last = max_sequence(records, kind, year);
    format_doc_number(kind.prefix(), year, last, DocNumberFormat::Plain)
}

/// Next number from a fetch result. A failed fetch degrades to the first
/// sequence under the fallback prefix instead of surfacing an error.
pub fn resolve_next_number(kind: DocumentKind, year: i32, fetched: AppResult<Vec<Value>>) -> String {
    match fetched {
        Ok(records) => {
            let number = next_doc_number(&records, kind, year);
            debug!(kind = kind.prefix(), scanned = records.len(), %number, "next document number");
            number
        }
        Err(e) => {
            warn!(error = %e, kind = kind.prefix(), "could not fetch existing documents, using fallback number");
            format_doc_number(kind.fallback_prefix(), year, 0, DocNumberFormat::Plain)
        }
    }
}

/// Copies carry a `-1` suffix; switching back to original strips it.
pub fn apply_copy_type(number: &str, copy: DocCopyType) -> String {
    match copy {
        DocCopyType::Copy if number.ends_with(COPY_SUFFIX) => number.to_string(),
        DocCopyType::Copy => format!("{}{}", number, COPY_SUFFIX),
        DocCopyType::Original => number
            .strip_suffix(COPY_SUFFIX)
            .unwrap_or(number)
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn formats() {
        assert_eq!(format_doc_number("INV", 2025, 0, DocNumberFormat::Plain), "INV20250001");
        assert_eq!(format_doc_number("INV", 2025, 41, DocNumberFormat::Braces), "INV{2025}{0042}");
        assert_eq!(format_doc_number("QT", 2025, 9, DocNumberFormat::Dash), "QT-2025-0010");
    }

    #[test]
    fn scans_every_number_field_for_the_year() {
        let records = vec![
            json!({"invoice_no": "INV20250007"}),
            json!({"invoice_no": "INV20250012"}),
            json!({"invoice_no": "INV20240099"}),
            json!({"invoice_no": "INV20250013-1"}),
            json!({"invoice_no": "QT20250050"}),
            json!({"quotation_number": "INV20250003"}),
        ];
        assert_eq!(max_sequence(&records, DocumentKind::Invoice, 2025), 12);
        assert_eq!(next_doc_number(&records, DocumentKind::Invoice, 2025), "INV20250013");
    }

    #[test]
    fn no_match_starts_at_one() {
        let records = vec![json!({"po_number": "PO-2025-0001"}), json!({"id": 3})];
        assert_eq!(next_doc_number(&records, DocumentKind::PurchaseOrder, 2025), "PO20250001");
    }

    #[test]
    fn withholding_falls_back_to_sequence_number() {
        let records = vec![
            json!({"doc_number": "legacy-1", "doc_date": "2025-03-01", "sequence_number": "4"}),
            json!({"doc_number": "legacy-2", "doc_date": "2024-03-01", "sequence_number": 9}),
        ];
        assert_eq!(next_doc_number(&records, DocumentKind::WithholdingTax, 2025), "WHT20250005");

        let with_numbers = vec![
            json!({"doc_number": "WHT20250002", "doc_date": "2025-03-01", "sequence_number": "8"}),
        ];
        assert_eq!(next_doc_number(&with_numbers, DocumentKind::WithholdingTax, 2025), "WHT20250003");
    }

    #[test]
    fn oversized_sequence_numbers_are_ignored() {
        let records = vec![
            json!({"doc_number": "legacy-1", "doc_date": "2025-03-01", "sequence_number": 4_294_967_396u64}),
            json!({"doc_number": "legacy-2", "doc_date": "2025-03-02", "sequence_number": 6}),
        ];
        assert_eq!(max_sequence(&records, DocumentKind::WithholdingTax, 2025), 6);
    }

    #[test]
    fn sequence_past_9999_widens_and_is_not_rescanned() {
        assert_eq!(format_doc_number("INV", 2025, MAX_SEQUENCE, DocNumberFormat::Plain), "INV202510000");
        let records = vec![json!({"invoice_no": "INV202510000"}), json!({"invoice_no": "INV20259999"})];
        assert_eq!(max_sequence(&records, DocumentKind::Invoice, 2025), MAX_SEQUENCE);
    }

    #[test]
    fn failed_fetch_uses_fallback_prefix() {
        let failed = Err(AppError::unexpected("boom"));
        assert_eq!(resolve_next_number(DocumentKind::Invoice, 2025, failed), "TINV20250001");
        let failed = Err(AppError::unexpected("boom"));
        assert_eq!(resolve_next_number(DocumentKind::Receipt, 2025, failed), "REC20250001");
    }

    #[test]
    fn copy_suffix_toggles() {
        assert_eq!(apply_copy_type("INV20250001", DocCopyType::Copy), "INV20250001-1");
        assert_eq!(apply_copy_type("INV20250001-1", DocCopyType::Copy), "INV20250001-1");
        assert_eq!(apply_copy_type("INV20250001-1", DocCopyType::Original), "INV20250001");
        assert_eq!(apply_copy_type("INV20250001", DocCopyType::Original), "INV20250001");
    }

    proptest! {
        #[test]
        fn next_number_follows_given_sequence(n in 0u32..9999, year in 2000i32..2100) {
            let expected = format!("QT{}{:04}", year, n + 1);
            prop_assert_eq!(format_doc_number("QT", year, n, DocNumberFormat::Plain), expected);
        }

        #[test]
        fn next_sequence_is_one_past_the_max(seqs in prop::collection::vec(1u32..9999, 0..30)) {
            let records: Vec<Value> = seqs
                .iter()
                .map(|s| json!({"receipt_no": format!("REC2025{:04}", s)}))
                .collect();
            let expected = seqs.iter().copied().max().unwrap_or(0);
            prop_assert_eq!(max_sequence(&records, DocumentKind::Receipt, 2025), expected);
        }
    }
}
