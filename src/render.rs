//! Printable A4 HTML for documents and withholding certificates.
//!
//! Templates ship inside the binary and are copied into the user's templates
//! folder on first use, so the layout can be edited without rebuilding.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{Datelike, Local, NaiveDate};
use clap::ValueEnum;
use serde::Serialize;
use tera::{Context, Tera, Value};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::locale;
use crate::model::{CompanySetting, Document, DocumentKind, LineItem, WithholdingCertificate, value_to_f64};
use crate::pagination::{PageRow, paginate};
use crate::totals::Totals;
use crate::withholding::{self, CertificateRow, Choice, WithholdingTotals};

pub const DOCUMENT_TEMPLATE: &str = "document.html";
pub const WITHHOLDING_TEMPLATE: &str = "withholding.html";

const DEFAULT_DOCUMENT: &str = include_str!("../templates/document.html");
const DEFAULT_WITHHOLDING: &str = include_str!("../templates/withholding.html");

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum PrintMode {
    /// Opens the print dialog as soon as the page loads.
    #[default]
    Print,
    /// On-screen preview with a print button.
    View,
}

impl PrintMode {
    fn as_str(self) -> &'static str {
        match self {
            PrintMode::Print => "print",
            PrintMode::View => "view",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub mode: PrintMode,
    /// Forces the grayscale copy layout even for an original.
    pub force_copy: bool,
    /// Used to resolve relative logo paths.
    pub api_origin: String,
}

pub struct Renderer {
    tera: Tera,
}

impl Renderer {
    /// Only the built-in templates.
    pub fn embedded() -> AppResult<Self> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            (DOCUMENT_TEMPLATE, DEFAULT_DOCUMENT),
            (WITHHOLDING_TEMPLATE, DEFAULT_WITHHOLDING),
        ])?;
        Ok(Self::with_filters(tera))
    }

    /// Loads every `*.html` in `dir`, writing the built-in templates first if missing.
    pub fn from_dir(dir: &Path) -> AppResult<Self> {
        init_templates(dir)?;
        let pattern = dir.join("*.html");
        let pattern = pattern
            .to_str()
            .ok_or_else(|| AppError::Config(format!("template path is not UTF-8: {}", dir.display())))?;
        let tera = Tera::new(pattern)?;
        Ok(Self::with_filters(tera))
    }

    fn with_filters(mut tera: Tera) -> Self {
        tera.register_filter("baht", baht_filter);
        tera.register_filter("number", number_filter);
        tera.register_filter("baht_text", baht_text_filter);
        tera.register_filter("thai_date", thai_date_filter);
        tera.register_filter("thai_date_short", thai_date_short_filter);
        tera.register_filter("tax_id", tax_id_filter);
        Renderer { tera }
    }

    pub fn render_document(
        &self,
        doc: &Document,
        company: &CompanySetting,
        options: &RenderOptions,
    ) -> AppResult<String> {
        let view = DocumentView::build(doc, company, options);
        let context = Context::from_serialize(&view)?;
        debug!(number = %doc.number, pages = view.page_count, "rendering document");
        Ok(self.tera.render(DOCUMENT_TEMPLATE, &context)?)
    }

    pub fn render_certificate(&self, cert: &WithholdingCertificate, options: &RenderOptions) -> AppResult<String> {
        let view = CertificateView::build(cert, options.mode);
        let context = Context::from_serialize(&view)?;
        debug!(number = %cert.doc_number, "rendering withholding certificate");
        Ok(self.tera.render(WITHHOLDING_TEMPLATE, &context)?)
    }
}

pub fn init_templates(dir: &Path) -> AppResult<()> {
    fs::create_dir_all(dir)?;
    for (name, content) in [(DOCUMENT_TEMPLATE, DEFAULT_DOCUMENT), (WITHHOLDING_TEMPLATE, DEFAULT_WITHHOLDING)] {
        let path = dir.join(name);
        if !path.exists() {
            println!("✨ Initializing default template {}...", name);
            fs::write(&path, content)?;
        }
    }
    Ok(())
}

// ==========================================
// Filters
// ==========================================

fn number_arg(value: &Value, filter: &str) -> tera::Result<f64> {
    value_to_f64(value)
        .ok_or_else(|| tera::Error::msg(format!("filter `{}` expects a number, got {}", filter, value)))
}

fn baht_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(locale::format_amount(number_arg(value, "baht")?)))
}

fn number_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(locale::format_number(number_arg(value, "number")?)))
}

fn baht_text_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(locale::baht_text(number_arg(value, "baht_text")?)))
}

fn date_arg(value: &Value) -> Option<NaiveDate> {
    value.as_str().and_then(locale::parse_date)
}

/// Anything that is not a date renders as `-`.
fn thai_date_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(date_arg(value).map(locale::thai_date).unwrap_or_else(|| "-".into())))
}

fn thai_date_short_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(date_arg(value).map(locale::thai_date_short).unwrap_or_else(|| "-".into())))
}

fn tax_id_filter(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    Ok(Value::String(value.as_str().map(locale::format_tax_id).unwrap_or_default()))
}

// ==========================================
// Template contexts
// ==========================================

fn or_dash(value: Option<&str>) -> String {
    match value.map(str::trim) {
        Some(s) if !s.is_empty() => s.to_string(),
        _ => "-".to_string(),
    }
}

fn or_empty(value: Option<&str>) -> String {
    value.map(|s| s.trim().to_string()).unwrap_or_default()
}

/// `data:` and absolute URLs are kept; paths are resolved against the API origin.
pub fn resolve_logo_url(logo: Option<&str>, api_origin: &str) -> Option<String> {
    let logo = logo.map(str::trim).filter(|s| !s.is_empty())?;
    if logo.starts_with("data:") || logo.starts_with("http://") || logo.starts_with("https://") {
        return Some(logo.to_string());
    }
    let origin = api_origin.trim_end_matches('/');
    if logo.starts_with('/') {
        Some(format!("{}{}", origin, logo))
    } else {
        Some(format!("{}/{}", origin, logo))
    }
}

#[derive(Serialize)]
struct CompanyView {
    name: String,
    branch: String,
    address: String,
    tax_id: String,
    phone: String,
    email: String,
    logo_url: Option<String>,
}

impl CompanyView {
    fn build(company: &CompanySetting, api_origin: &str) -> Self {
        CompanyView {
            name: company
                .company_name
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or("บริษัท")
                .to_string(),
            branch: or_empty(company.branch_name.as_deref()),
            address: or_empty(company.address.as_deref()),
            tax_id: or_dash(company.tax_id.as_deref()),
            phone: or_dash(company.phone.as_deref()),
            email: or_dash(company.email.as_deref()),
            logo_url: resolve_logo_url(company.logo.as_deref(), api_origin),
        }
    }
}

#[derive(Serialize)]
struct PartyView {
    code: String,
    name: String,
    address: String,
    tax_id: String,
    phone: String,
    email: String,
    branch: String,
}

#[derive(Serialize)]
struct HeaderView {
    number: String,
    /// ISO date; formatted by the `thai_date` filter.
    date: String,
    reference_label: &'static str,
    reference: String,
    salesperson_label: &'static str,
    salesperson: String,
    shipping_address: String,
    shipping_phone: String,
    notes: String,
    discount: f64,
    vat_rate: f64,
}

#[derive(Debug, Serialize)]
struct RowView {
    blank: bool,
    number: usize,
    description: String,
    qty: String,
    unit: String,
    price: String,
    amount: String,
}

#[derive(Serialize)]
struct PageView {
    number: usize,
    is_first: bool,
    is_last: bool,
    rows: Vec<RowView>,
}

#[derive(Serialize)]
struct SignatureView {
    left_caption: &'static str,
    left_role: &'static str,
    right_role: &'static str,
}

#[derive(Serialize)]
struct DocumentView {
    mode: &'static str,
    is_copy: bool,
    copy_label: &'static str,
    title_th: &'static str,
    title_en: &'static str,
    company: CompanyView,
    party_label: &'static str,
    party: PartyView,
    doc: HeaderView,
    pages: Vec<PageView>,
    page_count: usize,
    totals: Totals,
    has_discount: bool,
    signatures: SignatureView,
}

impl DocumentView {
    fn build(doc: &Document, company: &CompanySetting, options: &RenderOptions) -> Self {
        let kind = doc.kind;
        let is_copy = doc.is_copy() || options.force_copy;
        let reference = doc.reference.as_deref().map(str::trim).unwrap_or_default();

        let pages: Vec<PageView> = paginate(&doc.items, kind.page_capacity())
            .into_iter()
            .map(|page| PageView {
                number: page.number,
                is_first: page.number == 1,
                is_last: page.is_last,
                rows: page.rows.into_iter().map(|row| row_view(kind, row, reference)).collect(),
            })
            .collect();

        let (reference_label, salesperson_label) = match kind {
            DocumentKind::Receipt => ("อ้างอิงใบแจ้งหนี้", "ผู้รับเงิน"),
            DocumentKind::PurchaseOrder => ("อ้างอิงเอกสาร", "ผู้สั่งซื้อ"),
            _ => ("อ้างอิงเอกสาร", "พนักงานขาย"),
        };
        let signatures = kind.signatures();

        DocumentView {
            mode: options.mode.as_str(),
            is_copy,
            copy_label: if is_copy { "สำเนา" } else { "ต้นฉบับ" },
            title_th: kind.title_th(),
            title_en: kind.title_en(),
            company: CompanyView::build(company, &options.api_origin),
            party_label: kind.counterparty_label(),
            party: PartyView {
                code: or_empty(doc.party.code.as_deref()),
                name: or_dash(Some(&doc.party.name)),
                address: or_dash(doc.party.address.as_deref()),
                tax_id: or_dash(doc.party.tax_id.as_deref()),
                phone: or_dash(doc.party.phone.as_deref()),
                email: or_dash(doc.party.email.as_deref()),
                branch: or_empty(doc.party.branch.as_deref()),
            },
            doc: HeaderView {
                number: doc.number.clone(),
                date: doc.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default(),
                reference_label,
                reference: or_dash(Some(reference)),
                salesperson_label,
                salesperson: or_dash(doc.salesperson.as_deref()),
                shipping_address: or_empty(doc.shipping_address.as_deref()),
                shipping_phone: or_empty(doc.shipping_phone.as_deref()),
                notes: or_empty(doc.notes.as_deref()),
                discount: doc.discount,
                vat_rate: doc.vat_rate,
            },
            page_count: pages.len(),
            pages,
            totals: doc.totals(),
            has_discount: doc.discount > 0.0,
            signatures: SignatureView {
                left_caption: signatures.left_caption,
                left_role: signatures.left_role,
                right_role: signatures.right_role,
            },
        }
    }
}

fn row_view(kind: DocumentKind, row: PageRow<'_, LineItem>, reference: &str) -> RowView {
    let (number, item) = match row {
        PageRow::Blank => {
            return RowView {
                blank: true,
                number: 0,
                description: String::new(),
                qty: String::new(),
                unit: String::new(),
                price: String::new(),
                amount: String::new(),
            };
        }
        PageRow::Item { number, item } => (number, item),
    };

    let description = match item.description.trim() {
        "" if kind == DocumentKind::Receipt && !reference.is_empty() => {
            format!("รับชำระเงินตามใบแจ้งหนี้เลขที่ {}", reference)
        }
        "" => "-".to_string(),
        text => text.to_string(),
    };

    RowView {
        blank: false,
        number,
        description,
        qty: locale::format_number(item.qty.unwrap_or(1.0)),
        unit: or_dash(item.unit.as_deref()),
        price: locale::format_amount(item.price.unwrap_or(item.amount)),
        amount: locale::format_amount(item.amount),
    }
}

#[derive(Serialize)]
struct CertificateFields {
    doc_number: String,
    doc_date: String,
    sequence_number: String,
    deduction_order: String,
    payer_tax_id: String,
    payer_name: String,
    payer_address: String,
    representative_tax_id: String,
    representative_name: String,
    representative_address: String,
    recipient_tax_id: String,
    recipient_name: String,
    recipient_address: String,
    deduction_other: String,
    notes: String,
}

#[derive(Serialize)]
struct CertificateTotalsView {
    amount: f64,
    tax: f64,
}

#[derive(Serialize)]
struct CertificateView {
    mode: &'static str,
    cert: CertificateFields,
    has_representative: bool,
    recipient_type: &'static str,
    company_types: Vec<Choice>,
    deduction_formats: Vec<Choice>,
    deduction_modes: Vec<Choice>,
    rows: Vec<CertificateRow>,
    totals: CertificateTotalsView,
}

impl CertificateView {
    fn build(cert: &WithholdingCertificate, mode: PrintMode) -> Self {
        let totals = WithholdingTotals::compute(&cert.items);
        let has_representative = cert
            .representative_name
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty());
        let company_types = if cert.recipient_type == crate::model::RecipientType::Juristic {
            withholding::choices(&withholding::COMPANY_TYPES, cert.company_type.as_deref())
        } else {
            Vec::new()
        };
        let deduction_other = if cert.deduction_mode.as_deref() == Some("other") {
            or_empty(cert.deduction_other.as_deref())
        } else {
            String::new()
        };

        CertificateView {
            mode: mode.as_str(),
            cert: CertificateFields {
                doc_number: cert.doc_number.clone(),
                doc_date: or_empty(cert.doc_date.as_deref()),
                sequence_number: or_empty(cert.sequence_number.as_deref()),
                deduction_order: cert
                    .deduction_order
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or("1")
                    .to_string(),
                payer_tax_id: cert.payer_tax_id.clone(),
                payer_name: cert.payer_name.clone(),
                payer_address: cert.payer_address.clone(),
                representative_tax_id: or_empty(cert.representative_tax_id.as_deref()),
                representative_name: or_empty(cert.representative_name.as_deref()),
                representative_address: or_empty(cert.representative_address.as_deref()),
                recipient_tax_id: cert.recipient_tax_id.clone(),
                recipient_name: cert.recipient_name.clone(),
                recipient_address: cert.recipient_address.clone(),
                deduction_other,
                notes: or_empty(cert.notes.as_deref()),
            },
            has_representative,
            recipient_type: cert.recipient_type.label(),
            company_types,
            deduction_formats: withholding::choices(&withholding::DEDUCTION_FORMATS, cert.deduction_format.as_deref()),
            deduction_modes: withholding::choices(&withholding::DEDUCTION_MODES, cert.deduction_mode.as_deref()),
            rows: withholding::certificate_rows(&cert.items),
            totals: CertificateTotalsView {
                amount: totals.amount,
                tax: totals.tax,
            },
        }
    }
}

// ==========================================
// Output files
// ==========================================

/// `{root}/output/{year}/{resource}/{number}[_copy].html`; the year comes from the
/// document date, or today when the document has none.
pub fn output_path(root: &Path, kind: DocumentKind, number: &str, date: Option<NaiveDate>, copy: bool) -> PathBuf {
    let year = date.unwrap_or_else(|| Local::now().date_naive()).year();
    let mut stem: String = number
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if stem.is_empty() {
        stem = "untitled".to_string();
    }
    if copy {
        stem.push_str("_copy");
    }
    root.join("output")
        .join(year.to_string())
        .join(kind.resource())
        .join(format!("{}.html", stem))
}

pub fn write_output(path: &Path, html: &str) -> AppResult<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    fs::write(path, html)?;
    info!(path = %path.display(), "printable document written");
    Ok(())
}

/// Hands the file to the system browser. Failure only logs; the file is already on disk.
pub fn open_in_browser(path: &Path) {
    #[cfg(target_os = "macos")]
    let result = Command::new("open").arg(path).spawn();

    #[cfg(target_os = "windows")]
    let result = Command::new("explorer").arg(path).spawn();

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = Command::new("xdg-open").arg(path).spawn();

    if let Err(e) = result {
        warn!(path = %path.display(), error = %e, "could not open the printable document");
    }
}
