//! Withholding-tax lines and the fixed rows of the 50 ทวิ certificate.

use crate::locale;
use crate::model::{WithholdingCertificate, WithholdingItem};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncomeType {
    pub code: &'static str,
    pub description: &'static str,
    pub default_rate: f64,
}

pub const INCOME_TYPES: [IncomeType; 10] = [
    IncomeType {
        code: "1.",
        description: "เงินเดือน ค่าจ้าง เบี้ยเลี้ยง โบนัส ฯลฯ ตามมาตรา 40(1)",
        default_rate: 0.0,
    },
    IncomeType {
        code: "2.",
        description: "ค่าธรรมเนียม ค่านายหน้า ค่าโฆษณา ฯลฯ ตามมาตรา 40(2)",
        default_rate: 3.0,
    },
    IncomeType {
        code: "3.",
        description: "ค่าแห่งลิขสิทธิ์ ค่าจ้างทำของ ค่าบริการ ฯลฯ ตามมาตรา 40(3)",
        default_rate: 3.0,
    },
    IncomeType {
        code: "4. (ก)",
        description: "ดอกเบี้ย เงินปันผล เงินส่วนแบ่งกำไร ฯลฯ ตามมาตรา 40(4)(ก)",
        default_rate: 1.0,
    },
    IncomeType {
        code: "4. (ข)",
        description: "เงินปันผล เงินส่วนแบ่งกำไร ฯลฯ ตามมาตรา 40(4)(ข)",
        default_rate: 10.0,
    },
    IncomeType {
        code: "4. (ข)(1)",
        description: "ผู้ได้รับเงินปันผลได้รับเครดิตภาษี โดยหัก ณ ที่จ่าย 10%",
        default_rate: 10.0,
    },
    IncomeType {
        code: "4. (ข)(2)",
        description: "ผู้ได้รับเงินปันผลได้รับเครดิตภาษีร้อยละของเงินปันผลที่จ่าย",
        default_rate: 0.0,
    },
    IncomeType {
        code: "4. (ข)(3)",
        description: "กรณีอื่นๆ (ระบุ)",
        default_rate: 10.0,
    },
    IncomeType {
        code: "5.",
        description: "การจ่ายเงินได้ที่ต้องหักภาษี ณ ที่จ่าย อื่นๆ",
        default_rate: 5.0,
    },
    IncomeType {
        code: "6.",
        description: "อื่นๆ (ระบุ)",
        default_rate: 1.0,
    },
];

/// Return forms the deduction is filed under, keyed by their wire value.
pub const DEDUCTION_FORMATS: [(&str, &str); 7] = [
    ("1", "(1) ภ.ง.ด.1ก."),
    ("2", "(2) ภ.ง.ด.1ก. พิเศษ"),
    ("3", "(3) ภ.ง.ด.2"),
    ("4", "(4) ภ.ง.ด.3"),
    ("5", "(5) ภ.ง.ด.2ก."),
    ("6", "(6) ภ.ง.ด.3ก."),
    ("7", "(7) ภ.ง.ด.53"),
];

pub const DEDUCTION_MODES: [(&str, &str); 4] = [
    ("wht", "หักภาษี ณ ที่จ่าย"),
    ("always", "ออกภาษีให้ตลอดไป"),
    ("once", "ออกภาษีให้ครั้งเดียว"),
    ("other", "อื่นๆ"),
];

/// Only meaningful for juristic recipients.
pub const COMPANY_TYPES: [(&str, &str); 6] = [
    ("1", "1. บุคคลธรรมดา"),
    ("2", "2. บริษัทจำกัด"),
    ("3", "3. ห้างหุ้นส่วนสามัญ"),
    ("4", "4. ห้างหุ้นส่วนจำกัด"),
    ("5", "5. กิจการร่วมค้า"),
    ("other", "อื่นๆ"),
];

/// A checkbox on the printed form.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Choice {
    pub label: &'static str,
    pub checked: bool,
}

pub fn choices(table: &[(&'static str, &'static str)], selected: Option<&str>) -> Vec<Choice> {
    let selected = selected.map(str::trim);
    table
        .iter()
        .map(|(value, label)| Choice {
            label: *label,
            checked: selected == Some(*value),
        })
        .collect()
}

/// Codes are compared trimmed, so `"2. "` and `"2."` are the same type.
pub fn income_type(code: &str) -> Option<&'static IncomeType> {
    let code = code.trim();
    INCOME_TYPES.iter().find(|t| t.code == code)
}

impl WithholdingItem {
    /// New line pre-filled from the income type's description and default rate.
    pub fn for_income_type(income: &IncomeType, date: impl Into<String>) -> Self {
        WithholdingItem {
            income_type: income.code.to_string(),
            description: income.description.to_string(),
            date: date.into(),
            tax_rate: income.default_rate,
            amount: 0.0,
            tax_amount: 0.0,
        }
    }

    /// Switching type resets description and rate; unknown codes only change the code.
    pub fn set_income_type(&mut self, code: &str) {
        self.income_type = code.trim().to_string();
        if let Some(income) = income_type(code) {
            self.description = income.description.to_string();
            self.tax_rate = income.default_rate;
        }
        self.recompute_tax();
    }

    pub fn set_amount(&mut self, amount: f64) {
        self.amount = amount;
        self.recompute_tax();
    }

    pub fn set_tax_rate(&mut self, rate: f64) {
        self.tax_rate = rate;
        self.recompute_tax();
    }

    fn recompute_tax(&mut self) {
        self.tax_amount = self.amount * self.tax_rate / 100.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WithholdingTotals {
    pub amount: f64,
    pub tax: f64,
}

impl WithholdingTotals {
    pub fn compute(items: &[WithholdingItem]) -> Self {
        WithholdingTotals {
            amount: items.iter().map(|i| i.amount).sum(),
            tax: items.iter().map(|i| i.tax_amount).sum(),
        }
    }

    /// What the recipient actually receives.
    pub fn net(&self) -> f64 {
        self.amount - self.tax
    }
}

impl WithholdingCertificate {
    pub fn refresh_totals(&mut self) {
        let totals = WithholdingTotals::compute(&self.items);
        self.total_amount = totals.amount;
        self.total_tax = totals.tax;
    }
}

/// One printed line of the certificate's income table.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct CertificateRow {
    pub code: &'static str,
    pub label: &'static str,
    /// Sub-rows of 4. (ข) are indented on the form.
    pub indent: bool,
    pub date: String,
    pub amount: String,
    pub tax: String,
    pub filled: bool,
}

/// Every income type gets a row; items with the same code are summed and the
/// earliest date is shown. Empty rows print `-`.
pub fn certificate_rows(items: &[WithholdingItem]) -> Vec<CertificateRow> {
    INCOME_TYPES
        .iter()
        .map(|income| {
            let matching: Vec<&WithholdingItem> = items
                .iter()
                .filter(|i| i.income_type.trim() == income.code)
                .collect();
            let indent = income.code.starts_with("4. (ข)(");

            if matching.is_empty() {
                return CertificateRow {
                    code: income.code,
                    label: income.description,
                    indent,
                    date: "-".to_string(),
                    amount: "-".to_string(),
                    tax: "-".to_string(),
                    filled: false,
                };
            }

            let amount: f64 = matching.iter().map(|i| i.amount).sum();
            let tax: f64 = matching.iter().map(|i| i.tax_amount).sum();
            let date = matching
                .iter()
                .filter_map(|i| locale::parse_date(&i.date))
                .min()
                .map(locale::thai_date_short)
                .unwrap_or_else(|| "-".to_string());

            CertificateRow {
                code: income.code,
                label: income.description,
                indent,
                date,
                amount: locale::format_amount(amount),
                tax: locale::format_amount(tax),
                filled: true,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(code: &str, amount: f64, date: &str) -> WithholdingItem {
        let mut item = WithholdingItem::for_income_type(income_type(code).unwrap(), date);
        item.set_amount(amount);
        item
    }

    #[test]
    fn only_the_selected_choice_is_checked() {
        let boxes = choices(&DEDUCTION_FORMATS, Some("7"));
        assert_eq!(boxes.len(), 7);
        assert_eq!(boxes.iter().filter(|c| c.checked).count(), 1);
        assert!(boxes[6].checked);
        assert!(choices(&DEDUCTION_MODES, None).iter().all(|c| !c.checked));
    }

    #[test]
    fn income_type_lookup_ignores_padding() {
        assert_eq!(income_type("2. ").unwrap().default_rate, 3.0);
        assert_eq!(income_type("4. (ข)(2) ").unwrap().default_rate, 0.0);
        assert!(income_type("40(2)").is_none());
    }

    #[test]
    fn tax_follows_amount_and_rate() {
        let mut item = line("3.", 10_000.0, "2025-01-05");
        assert_eq!(item.tax_amount, 300.0);
        item.set_tax_rate(5.0);
        assert_eq!(item.tax_amount, 500.0);
        item.set_income_type("4. (ก)");
        assert_eq!(item.tax_rate, 1.0);
        assert_eq!(item.tax_amount, 100.0);
        assert!(item.description.contains("40(4)(ก)"));
    }

    #[test]
    fn unknown_code_keeps_manual_rate() {
        let mut item = line("2.", 1000.0, "2025-01-05");
        item.set_tax_rate(2.0);
        item.set_income_type("7.");
        assert_eq!(item.income_type, "7.");
        assert_eq!(item.tax_rate, 2.0);
        assert_eq!(item.tax_amount, 20.0);
    }

    #[test]
    fn totals_and_net() {
        let items = vec![line("2.", 1000.0, "2025-01-05"), line("5.", 2000.0, "2025-01-06")];
        let totals = WithholdingTotals::compute(&items);
        assert_eq!(totals.amount, 3000.0);
        assert_eq!(totals.tax, 130.0);
        assert_eq!(totals.net(), 2870.0);

        let mut cert = WithholdingCertificate::new();
        cert.items = items;
        cert.refresh_totals();
        assert_eq!(cert.total_tax, 130.0);
    }

    #[test]
    fn rows_sum_same_code_and_keep_sub_rows_apart() {
        let items = vec![
            line("2.", 1000.0, "2025-02-10"),
            line("2.", 500.0, "2025-02-01"),
            line("4. (ข)(1)", 100.0, "2025-03-01"),
        ];
        let rows = certificate_rows(&items);
        assert_eq!(rows.len(), INCOME_TYPES.len());

        let row2 = rows.iter().find(|r| r.code == "2.").unwrap();
        assert_eq!(row2.amount, "1,500.00");
        assert_eq!(row2.tax, "45.00");
        assert_eq!(row2.date, "01/02/68");

        let row4b = rows.iter().find(|r| r.code == "4. (ข)").unwrap();
        assert!(!row4b.filled);
        assert_eq!(row4b.amount, "-");

        let row4b1 = rows.iter().find(|r| r.code == "4. (ข)(1)").unwrap();
        assert!(row4b1.filled && row4b1.indent);
    }
}
