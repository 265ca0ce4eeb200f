//! Thai-locale display helpers: money, Buddhist-era dates, amounts in words.

use chrono::{Datelike, NaiveDate};

const BUDDHIST_ERA_OFFSET: i32 = 543;

const DIGITS: [&str; 10] = [
    "ศูนย์", "หนึ่ง", "สอง", "สาม", "สี่", "ห้า", "หก", "เจ็ด", "แปด", "เก้า",
];
const PLACES: [&str; 6] = ["", "สิบ", "ร้อย", "พัน", "หมื่น", "แสน"];

/// `1444.5` -> `"1,444.50"`
pub fn format_amount(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{}.{:02}", sign, group_thousands(cents / 100), cents % 100)
}

/// Grouped number with up to three decimals, trailing zeros dropped: `1000` -> `"1,000"`, `12.5` -> `"12.5"`.
pub fn format_number(value: f64) -> String {
    let scaled = (value.abs() * 1000.0).round() as u64;
    let sign = if value < 0.0 && scaled > 0 { "-" } else { "" };
    let whole = group_thousands(scaled / 1000);
    let frac = scaled % 1000;
    if frac == 0 {
        return format!("{}{}", sign, whole);
    }
    let frac = format!("{:03}", frac);
    format!("{}{}.{}", sign, whole, frac.trim_end_matches('0'))
}

fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Accepts `YYYY-MM-DD` optionally followed by a time part.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

/// `2025-10-19` -> `"19/10/2568"`
pub fn thai_date(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year() + BUDDHIST_ERA_OFFSET)
}

/// `2025-01-05` -> `"05/01/68"`
pub fn thai_date_short(date: NaiveDate) -> String {
    format!(
        "{:02}/{:02}/{:02}",
        date.day(),
        date.month(),
        (date.year() + BUDDHIST_ERA_OFFSET).rem_euclid(100)
    )
}

/// 13-digit tax ids are grouped as `1-2345-67890-12-3`; anything else is returned as is.
pub fn format_tax_id(raw: &str) -> String {
    let raw = raw.trim();
    if raw.len() != 13 || !raw.chars().all(|c| c.is_ascii_digit()) {
        return raw.to_string();
    }
    format!("{}-{}-{}-{}-{}", &raw[..1], &raw[1..5], &raw[5..10], &raw[10..12], &raw[12..])
}

/// Amount in Thai words, e.g. `หนึ่งพันสี่ร้อยสี่สิบสี่บาทห้าสิบสตางค์`.
pub fn baht_text(amount: f64) -> String {
    if !amount.is_finite() {
        return String::new();
    }
    let total_satang = (amount.abs() * 100.0).round() as u64;
    let baht = total_satang / 100;
    let satang = total_satang % 100;

    let mut out = String::new();
    if amount < 0.0 && total_satang > 0 {
        out.push_str("ลบ");
    }
    if baht > 0 {
        out.push_str(&read_number(baht));
        out.push_str("บาท");
    }
    if satang == 0 {
        if baht == 0 {
            out.push_str("ศูนย์บาท");
        }
        out.push_str("ถ้วน");
    } else {
        out.push_str(&read_number(satang));
        out.push_str("สตางค์");
    }
    out
}

fn read_number(n: u64) -> String {
    if n == 0 {
        return DIGITS[0].to_string();
    }
    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push(rest % 1_000_000);
        rest /= 1_000_000;
    }

    let mut out = String::new();
    for (idx, group) in groups.iter().enumerate().rev() {
        if *group > 0 {
            out.push_str(&read_group(*group, idx + 1 < groups.len()));
        }
        if idx > 0 {
            out.push_str("ล้าน");
        }
    }
    out
}

/// Reads 0..=999_999. `after_millions` selects เอ็ด for a trailing one.
fn read_group(group: u64, after_millions: bool) -> String {
    let mut out = String::new();
    for place in (0..PLACES.len()).rev() {
        let digit = ((group / 10u64.pow(place as u32)) % 10) as usize;
        if digit == 0 {
            continue;
        }
        let word = match (place, digit) {
            (0, 1) if group >= 10 || after_millions => "เอ็ด",
            (1, 1) => "",
            (1, 2) => "ยี่",
            _ => DIGITS[digit],
        };
        out.push_str(word);
        out.push_str(PLACES[place]);
    }
    out
}
