mod client;
mod config;
mod error;
mod listing;
mod locale;
mod logging;
mod model;
mod numbering;
mod pagination;
mod record;
mod render;
mod totals;
mod validation;
mod withholding;
mod wizard;

use std::path::PathBuf;

use chrono::{Datelike, Local};
use clap::{CommandFactory, Parser, Subcommand};
use inquire::{Confirm, Select, Text};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::client::ApiClient;
use crate::config::AppSettings;
use crate::error::{AppError, AppResult};
use crate::listing::DocumentFilter;
use crate::model::{CompanySetting, DocCopyType, Document, DocumentKind, Stage, WithholdingCertificate};
use crate::render::{PrintMode, RenderOptions, Renderer};
use crate::withholding::WithholdingTotals;

const TOTALS_TOLERANCE: f64 = 0.005;

// ==========================================
// CLI
// ==========================================

#[derive(Parser)]
#[command(name = "docdesk", version, about = "ออกใบเสนอราคา ใบสั่งซื้อ ใบแจ้งหนี้ ใบเสร็จ และหนังสือรับรองหัก ณ ที่จ่าย")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a document
    New {
        #[arg(value_enum)]
        kind: DocumentKind,
    },
    /// Edit a stored document (pick from a list when no id is given)
    Edit {
        #[arg(value_enum)]
        kind: DocumentKind,
        id: Option<u64>,
    },
    /// List documents with per-status counts
    List {
        #[arg(value_enum)]
        kind: DocumentKind,
        /// Matches the number or the counterparty name
        #[arg(short, long)]
        search: Option<String>,
        #[arg(long, value_enum)]
        stage: Option<Stage>,
        #[arg(long, value_enum)]
        doc_type: Option<DocCopyType>,
    },
    /// Show one document with its items and totals
    Show {
        #[arg(value_enum)]
        kind: DocumentKind,
        id: Option<u64>,
    },
    /// Write the printable A4 page and open it in the browser
    Print {
        #[arg(value_enum)]
        kind: DocumentKind,
        id: Option<u64>,
        #[arg(long, value_enum, default_value_t = PrintMode::Print)]
        mode: PrintMode,
        /// Print the grayscale copy layout
        #[arg(long)]
        copy: bool,
        /// Only write the file
        #[arg(long)]
        no_open: bool,
    },
    /// Change the lifecycle status
    Status {
        #[arg(value_enum)]
        kind: DocumentKind,
        id: Option<u64>,
        #[arg(long = "to", value_enum)]
        stage: Option<Stage>,
    },
    /// Delete a document
    Delete {
        #[arg(value_enum)]
        kind: DocumentKind,
        id: Option<u64>,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Ask the backend to email the document
    Email {
        #[arg(value_enum)]
        kind: DocumentKind,
        id: Option<u64>,
        #[arg(long)]
        to: Option<String>,
    },
    /// Preview the next document number
    NextNumber {
        #[arg(value_enum)]
        kind: DocumentKind,
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
    },
    /// Show or edit the issuing company
    Company {
        #[arg(long)]
        edit: bool,
    },
    /// Configure the API URL and data folder
    Config,
}

// ==========================================
// Main Function
// ==========================================

fn main() {
    logging::init();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        if let Err(e) = Cli::command().print_help() {
            eprintln!("❌ {}", e);
        }
        return;
    };

    match run(command) {
        Ok(()) => {}
        Err(AppError::Cancelled) => println!("{}", AppError::Cancelled.user_message()),
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("❌ {}", e.user_message());
            std::process::exit(1);
        }
    }
}

fn run(command: Commands) -> AppResult<()> {
    if let Commands::Config = command {
        config::setup_config_wizard()?;
        return Ok(());
    }

    let settings = config::load();
    let client = ApiClient::new(&settings.api_base_url)?;
    debug!(api = client.base_url(), "using backend");

    match command {
        Commands::New { kind } => create(&client, kind),
        Commands::Edit { kind, id } => {
            let id = pick_id(&client, kind, id)?;
            edit(&client, kind, id)
        }
        Commands::List { kind, search, stage, doc_type } => {
            let filter = DocumentFilter { search, stage, doc_type };
            list(&client, kind, &filter);
            Ok(())
        }
        Commands::Show { kind, id } => {
            let id = pick_id(&client, kind, id)?;
            show(&client, kind, id)
        }
        Commands::Print { kind, id, mode, copy, no_open } => {
            let id = pick_id(&client, kind, id)?;
            let options = RenderOptions {
                mode,
                force_copy: copy,
                api_origin: settings.api_origin(),
            };
            print(&client, &settings, kind, id, &options, !no_open)
        }
        Commands::Status { kind, id, stage } => {
            let id = pick_id(&client, kind, id)?;
            change_status(&client, kind, id, stage)
        }
        Commands::Delete { kind, id, yes } => {
            let id = pick_id(&client, kind, id)?;
            delete(&client, kind, id, yes)
        }
        Commands::Email { kind, id, to } => {
            let id = pick_id(&client, kind, id)?;
            email(&client, kind, id, to)
        }
        Commands::NextNumber { kind, year } => {
            let year = year.unwrap_or_else(|| Local::now().year());
            let number = numbering::resolve_next_number(kind, year, client.list(kind));
            println!("🔢 เลขที่ถัดไป: {}", number);
            Ok(())
        }
        Commands::Company { edit } => company(&client, edit),
        Commands::Config => Ok(()),
    }
}

// ==========================================
// Fetching
// ==========================================

fn fetch_document(client: &ApiClient, kind: DocumentKind, id: u64) -> AppResult<Document> {
    Ok(Document::from_record(kind, &client.get(kind, id)?))
}

fn fetch_certificate(client: &ApiClient, id: u64) -> AppResult<WithholdingCertificate> {
    Ok(serde_json::from_value(client.get(DocumentKind::WithholdingTax, id)?)?)
}

fn fetch_documents(client: &ApiClient, kind: DocumentKind) -> AppResult<Vec<Document>> {
    Ok(client
        .list(kind)?
        .iter()
        .map(|record| Document::from_record(kind, record))
        .collect())
}

/// Records that do not decode are skipped with a warning.
fn fetch_certificates(client: &ApiClient) -> AppResult<Vec<WithholdingCertificate>> {
    let records = client.list(DocumentKind::WithholdingTax)?;
    Ok(records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(cert) => Some(cert),
            Err(e) => {
                warn!(error = %e, "skipping unreadable withholding record");
                None
            }
        })
        .collect())
}

/// Uses the given id, or lets the user pick one from the stored documents.
fn pick_id(client: &ApiClient, kind: DocumentKind, id: Option<u64>) -> AppResult<u64> {
    if let Some(id) = id {
        return Ok(id);
    }

    let entries: Vec<(u64, String)> = if kind.is_withholding() {
        fetch_certificates(client)?
            .iter()
            .filter_map(|c| {
                c.id.map(|id| (id, format!("{} {} ({})", c.doc_number, c.recipient_name, kind.describe_status(&c.status))))
            })
            .collect()
    } else {
        fetch_documents(client, kind)?
            .iter()
            .filter_map(|d| {
                d.id.map(|id| (id, format!("{} {} ({})", d.number, d.party.name, kind.describe_status(&d.status))))
            })
            .collect()
    };

    if entries.is_empty() {
        return Err(AppError::validation(format!("ไม่พบ{}", kind.short_name())));
    }
    let labels: Vec<String> = entries.iter().map(|(_, label)| label.clone()).collect();
    let choice = Select::new(&format!("เลือก{}:", kind.short_name()), labels).raw_prompt()?;
    Ok(entries[choice.index].0)
}

fn saved_id(kind: DocumentKind, saved: &Value) -> Option<u64> {
    if kind.is_withholding() {
        serde_json::from_value::<WithholdingCertificate>(saved.clone()).ok().and_then(|c| c.id)
    } else {
        Document::from_record(kind, saved).id
    }
}

fn current_user() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .ok()
        .and_then(|u| model::non_empty(&u))
        .unwrap_or_else(|| "admin".to_string())
}

// ==========================================
// Commands
// ==========================================

fn create(client: &ApiClient, kind: DocumentKind) -> AppResult<()> {
    let saved = if kind.is_withholding() {
        let mut cert = wizard::compose_certificate(client, None)?;
        cert.refresh_totals();
        validation::validate_certificate(&cert)?;
        cert.created_by = Some(current_user());
        client.create(kind, &serde_json::to_value(&cert)?)?
    } else {
        let doc = wizard::compose_document(client, kind, None)?;
        validation::validate_document(&doc)?;
        client.create(kind, &doc.to_payload()?)?
    };
    println!("✅ สร้าง{}สำเร็จ", kind.short_name());

    match saved_id(kind, &saved) {
        Some(id) => {
            info!(kind = kind.resource(), id, "document created");
            show(client, kind, id)
        }
        None => {
            warn!(kind = kind.resource(), "create response carried no id");
            Ok(())
        }
    }
}

fn edit(client: &ApiClient, kind: DocumentKind, id: u64) -> AppResult<()> {
    if kind.is_withholding() {
        let mut cert = wizard::compose_certificate(client, Some(fetch_certificate(client, id)?))?;
        cert.refresh_totals();
        validation::validate_certificate(&cert)?;
        client.update(kind, id, &serde_json::to_value(&cert)?)?;
    } else {
        let doc = wizard::compose_document(client, kind, Some(fetch_document(client, kind, id)?))?;
        validation::validate_document(&doc)?;
        client.update(kind, id, &doc.to_payload()?)?;
    }
    println!("✅ บันทึก{}สำเร็จ", kind.short_name());
    info!(kind = kind.resource(), id, "document updated");
    show(client, kind, id)
}

fn list(client: &ApiClient, kind: DocumentKind, filter: &DocumentFilter) {
    if kind.is_withholding() {
        let certs = fetch_certificates(client).unwrap_or_else(|e| load_failed(&e));
        let counts = listing::status_counts(kind, certs.iter().map(|c| c.status.as_str()));
        let shown: Vec<&WithholdingCertificate> = certs.iter().filter(|c| filter.matches_certificate(c)).collect();

        println!("\n--- {} ---", kind.title_th());
        println!("{}", listing::counts_table(kind, &counts));
        if shown.is_empty() {
            println!("(ไม่พบข้อมูล)");
        } else {
            println!("{}", listing::certificate_table(&shown));
        }
        return;
    }

    let mut docs = fetch_documents(client, kind).unwrap_or_else(|e| load_failed(&e));
    if docs.iter().any(|d| d.party.branch.is_none()) {
        match client.customers() {
            Ok(customers) => {
                let filled = listing::fill_missing_branches(&mut docs, &customers);
                debug!(filled, "branch names filled from customers");
            }
            Err(e) => warn!(error = %e, "could not load customers for branch names"),
        }
    }

    let counts = listing::status_counts(kind, docs.iter().map(|d| d.status.as_str()));
    let shown = filter.apply(&docs);

    println!("\n--- {} ---", kind.title_th());
    println!("{}", listing::counts_table(kind, &counts));
    if shown.is_empty() {
        println!("(ไม่พบข้อมูล)");
    } else {
        println!("{}", listing::document_table(kind, &shown));
    }
}

fn load_failed<T>(e: &AppError) -> Vec<T> {
    warn!(error = %e, "list could not be loaded");
    println!("❌ โหลดข้อมูลไม่สำเร็จ: {}", e.user_message());
    Vec::new()
}

fn show(client: &ApiClient, kind: DocumentKind, id: u64) -> AppResult<()> {
    if kind.is_withholding() {
        show_certificate(&fetch_certificate(client, id)?);
    } else {
        show_document(&fetch_document(client, kind, id)?);
    }
    Ok(())
}

fn show_document(doc: &Document) {
    let kind = doc.kind;
    println!("\n📄 {} {} ({})", kind.title_th(), doc.number, doc.doc_type.label());
    println!("{}: {}", kind.counterparty_label(), doc.party.name);
    if let Some(branch) = &doc.party.branch {
        println!("สาขา: {}", branch);
    }
    println!("วันที่: {}", doc.date.map(locale::thai_date).unwrap_or_else(|| "-".into()));
    if let Some(reference) = &doc.reference {
        println!("อ้างอิง: {}", reference);
    }
    println!("สถานะ: {}", kind.describe_status(&doc.status));
    println!("{}", listing::item_table(doc));

    let totals = doc.totals();
    println!("💰 {} ({})", locale::format_amount(totals.grand_total), locale::baht_text(totals.grand_total));
    if let Some(stored) = doc.stored_totals {
        if stored.differs_from(&totals, TOTALS_TOLERANCE) {
            warn!(number = %doc.number, stored = stored.grand_total, computed = totals.grand_total, "stored totals differ");
            println!(
                "⚠️  ยอดที่บันทึกไว้ {} ไม่ตรงกับยอดที่คำนวณจากรายการ {}",
                locale::format_amount(stored.grand_total),
                locale::format_amount(totals.grand_total)
            );
        }
    }
    if let Some(notes) = &doc.notes {
        println!("หมายเหตุ:\n{}", notes);
    }
}

fn show_certificate(cert: &WithholdingCertificate) {
    let kind = DocumentKind::WithholdingTax;
    let date = cert
        .doc_date
        .as_deref()
        .and_then(locale::parse_date)
        .map(locale::thai_date)
        .unwrap_or_else(|| "-".into());
    println!("\n📄 {} {}", kind.title_th(), cert.doc_number);
    println!("ผู้หักภาษี: {} ({})", cert.payer_name, locale::format_tax_id(&cert.payer_tax_id));
    println!(
        "ผู้ถูกหักภาษี: {} ({}) {}",
        cert.recipient_name,
        locale::format_tax_id(&cert.recipient_tax_id),
        cert.recipient_type.label()
    );
    println!("วันที่: {}", date);
    println!("สถานะ: {}", kind.describe_status(&cert.status));
    println!("{}", listing::withholding_item_table(cert));

    let totals = WithholdingTotals::compute(&cert.items);
    println!("💰 ภาษีที่หัก {} ({})", locale::format_amount(totals.tax), locale::baht_text(totals.tax));
    if (cert.total_tax - totals.tax).abs() > TOTALS_TOLERANCE {
        warn!(number = %cert.doc_number, stored = cert.total_tax, computed = totals.tax, "stored tax differs");
        println!(
            "⚠️  ยอดภาษีที่บันทึกไว้ {} ไม่ตรงกับยอดที่คำนวณจากรายการ {}",
            locale::format_amount(cert.total_tax),
            locale::format_amount(totals.tax)
        );
    }
}

fn print(
    client: &ApiClient,
    settings: &AppSettings,
    kind: DocumentKind,
    id: u64,
    options: &RenderOptions,
    open: bool,
) -> AppResult<()> {
    let root = settings.data_root();
    let template_dir = root.join("templates");
    let renderer = match Renderer::from_dir(&template_dir) {
        Ok(renderer) => renderer,
        Err(e) => {
            warn!(dir = %template_dir.display(), error = %e, "user templates unusable, using built-in ones");
            println!("⚠️  ใช้แม่แบบมาตรฐานแทน: {}", e.user_message());
            Renderer::embedded()?
        }
    };

    let (html, path): (String, PathBuf) = if kind.is_withholding() {
        let cert = fetch_certificate(client, id)?;
        let date = cert.doc_date.as_deref().and_then(locale::parse_date);
        let html = renderer.render_certificate(&cert, options)?;
        (html, render::output_path(&root, kind, &cert.doc_number, date, false))
    } else {
        let doc = fetch_document(client, kind, id)?;
        let company = client.company_setting().unwrap_or_else(|e| {
            warn!(error = %e, "company settings unavailable, printing without them");
            CompanySetting::default()
        });
        let html = renderer.render_document(&doc, &company, options)?;
        let copy = options.force_copy || doc.is_copy();
        (html, render::output_path(&root, kind, &doc.number, doc.date, copy))
    };

    render::write_output(&path, &html)?;
    println!("✅ สร้างไฟล์สำหรับพิมพ์แล้ว: {}", path.display());
    if open {
        render::open_in_browser(&path);
    }
    Ok(())
}

fn change_status(client: &ApiClient, kind: DocumentKind, id: u64, stage: Option<Stage>) -> AppResult<()> {
    let stage = match stage {
        Some(stage) => stage,
        None => {
            let labels: Vec<&str> = Stage::ALL.iter().map(|s| kind.status_label(*s)).collect();
            let choice = Select::new("สถานะใหม่:", labels).raw_prompt()?;
            Stage::ALL[choice.index]
        }
    };

    client.patch_status(kind, id, kind.status_wire(stage))?;
    info!(kind = kind.resource(), id, status = kind.status_wire(stage), "status changed");
    println!("✅ เปลี่ยนสถานะเป็น {} แล้ว", kind.status_label(stage));
    show(client, kind, id)
}

fn delete(client: &ApiClient, kind: DocumentKind, id: u64, yes: bool) -> AppResult<()> {
    let number = if kind.is_withholding() {
        fetch_certificate(client, id)?.doc_number
    } else {
        fetch_document(client, kind, id)?.number
    };

    let confirmed = yes
        || Confirm::new(&format!("ลบ{} {}?", kind.short_name(), number))
            .with_default(false)
            .prompt()?;
    if !confirmed {
        return Err(AppError::Cancelled);
    }

    client.delete(kind, id)?;
    info!(kind = kind.resource(), id, %number, "document deleted");
    println!("✅ ลบ{} {} แล้ว", kind.short_name(), number);
    Ok(())
}

fn email(client: &ApiClient, kind: DocumentKind, id: u64, to: Option<String>) -> AppResult<()> {
    let address = match to {
        Some(address) => address,
        None => {
            let default = if kind.is_withholding() {
                String::new()
            } else {
                fetch_document(client, kind, id)?.party.email.unwrap_or_default()
            };
            Text::new("ส่งถึงอีเมล:").with_initial_value(&default).prompt()?
        }
    };
    let address = address.trim();
    validation::validate_email(address)?;

    let message = client.send_email(kind, id, address)?;
    info!(kind = kind.resource(), id, "email requested");
    println!("📧 {}", message);
    Ok(())
}

fn company(client: &ApiClient, edit: bool) -> AppResult<()> {
    let mut setting = client.company_setting()?;
    if edit {
        let updated = wizard::edit_company_setting(&setting)?;
        setting = client.update_company_setting(&updated)?;
        println!("✅ บันทึกข้อมูลบริษัทแล้ว");
    }

    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".into());
    println!("\n🏢 {}", field(&setting.company_name));
    println!("สาขา: {}", field(&setting.branch_name));
    println!("ที่อยู่: {}", field(&setting.address));
    println!(
        "เลขประจำตัวผู้เสียภาษี: {}",
        setting.tax_id.as_deref().map(locale::format_tax_id).unwrap_or_else(|| "-".into())
    );
    println!("โทร: {}  อีเมล: {}", field(&setting.phone), field(&setting.email));
    println!("โลโก้: {}", field(&setting.logo));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn cli_parses_aliases_and_flags() {
        let cli = Cli::try_parse_from(["docdesk", "list", "inv", "--stage", "completed", "-s", "abc"]).unwrap();
        match cli.command {
            Some(Commands::List { kind, search, stage, doc_type }) => {
                assert_eq!(kind, DocumentKind::Invoice);
                assert_eq!(search.as_deref(), Some("abc"));
                assert_eq!(stage, Some(Stage::Completed));
                assert_eq!(doc_type, None);
            }
            _ => panic!("expected list"),
        }

        let cli = Cli::try_parse_from(["docdesk", "print", "wht", "7", "--mode", "view", "--no-open"]).unwrap();
        match cli.command {
            Some(Commands::Print { kind, id, mode, copy, no_open }) => {
                assert_eq!(kind, DocumentKind::WithholdingTax);
                assert_eq!(id, Some(7));
                assert_eq!(mode, PrintMode::View);
                assert!(!copy && no_open);
            }
            _ => panic!("expected print"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn saved_id_reads_both_record_shapes() {
        let po = json!({ "id": 12, "po_number": "PO20250001" });
        assert_eq!(saved_id(DocumentKind::PurchaseOrder, &po), Some(12));
        let cert = json!({ "id": "5", "doc_number": "WHT20250001", "items": "[]" });
        assert_eq!(saved_id(DocumentKind::WithholdingTax, &cert), Some(5));
        assert_eq!(saved_id(DocumentKind::Invoice, &json!({})), None);
    }
}
