use anyhow::Context;
use chrono::{Local, NaiveDate};
use clap::Parser;
use vahan_sync::config::{DEFAULT_OUTPUT_FILE, DEFAULT_OUTPUT_PATH};
use vahan_sync::core::status::{
    write_status_csv, DocumentStatus, FleetSummary, VehicleStatus, EXPIRY_WARNING_DAYS,
};
use vahan_sync::domain::model::DocumentKind;
use vahan_sync::utils::logger;
use vahan_sync::{LocalStorage, OutputStore};

#[derive(Parser)]
#[command(name = "document-report")]
#[command(about = "Summarize document expiry status from the synced output")]
struct Args {
    /// Directory holding the synced output
    #[arg(long, default_value = DEFAULT_OUTPUT_PATH)]
    output_path: String,

    #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
    output_file: String,

    /// Reference date (YYYY-MM-DD); defaults to today
    #[arg(long)]
    today: Option<NaiveDate>,

    /// Write the full per-vehicle status table to this CSV file
    #[arg(long)]
    csv: Option<String>,

    /// Print only the fleet totals
    #[arg(long)]
    summary_only: bool,

    #[arg(short, long)]
    verbose: bool,
}

const STATUSES: [DocumentStatus; 5] = [
    DocumentStatus::Valid,
    DocumentStatus::Expiring,
    DocumentStatus::Expired,
    DocumentStatus::Missing,
    DocumentStatus::Unparseable,
];

fn print_summary(summary: &FleetSummary) {
    println!("📋 Document status for {} vehicles", summary.vehicles);
    print!("{:<10}", "document");
    for status in STATUSES {
        print!("{:>12}", status.to_string());
    }
    println!();
    for kind in DocumentKind::ALL {
        print!("{:<10}", kind.label());
        for status in STATUSES {
            print!("{:>12}", summary.count(kind, status));
        }
        println!();
    }
}

fn print_attention(statuses: &[VehicleStatus]) {
    let flagged: Vec<_> = statuses.iter().filter(|s| s.needs_attention()).collect();
    if flagged.is_empty() {
        println!("\n✅ Every document is valid for more than {} days", EXPIRY_WARNING_DAYS);
        return;
    }

    println!("\n⚠️ {} vehicle(s) need attention:", flagged.len());
    for status in flagged {
        let issues: Vec<String> = status
            .documents
            .iter()
            .filter(|(_, s)| s.needs_attention())
            .map(|(kind, s)| format!("{} {}", kind.label(), s))
            .collect();
        println!("  {:<14} {}", status.vehicle, issues.join(", "));
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logger::init_cli_logger(args.verbose);

    let store = OutputStore::new(
        LocalStorage::new(args.output_path.clone()),
        args.output_file.clone(),
    );
    let set = store
        .load()
        .await
        .with_context(|| format!("reading {}", store.location()))?;

    let today = args.today.unwrap_or_else(|| Local::now().date_naive());
    tracing::debug!("Classifying {} records against {}", set.len(), today);

    let statuses: Vec<VehicleStatus> = set
        .records()
        .iter()
        .map(|record| VehicleStatus::from_record(record, today))
        .collect();

    print_summary(&FleetSummary::from_statuses(&statuses));
    if !args.summary_only {
        print_attention(&statuses);
    }

    if let Some(path) = &args.csv {
        let file = std::fs::File::create(path).with_context(|| format!("creating {}", path))?;
        write_status_csv(&statuses, file)?;
        println!("\n📁 Status table saved to: {}", path);
    }

    Ok(())
}
