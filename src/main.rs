use clap::Parser;
use vahan_sync::core::{ConfigProvider, SyncReport};
use vahan_sync::utils::error::Result;
use vahan_sync::utils::monitor::RunMonitor;
use vahan_sync::utils::{logger, validation::Validate};
use vahan_sync::{
    CliConfig, FileInventory, LocalStorage, OutputStore, SyncOptions, SyncOrchestrator, TomlConfig,
    VahanClient,
};

async fn run_sync<C: ConfigProvider>(config: &C, monitor: RunMonitor) -> Result<SyncReport> {
    let client = VahanClient::new(config)?;
    let storage = LocalStorage::new(config.output_path().to_string());
    let store = OutputStore::new(storage, config.output_file());
    tracing::info!("📁 Output artifact: {}", store.location());

    let orchestrator = SyncOrchestrator::new(client, store)
        .with_options(SyncOptions {
            max_vehicles: config.max_vehicles(),
            dry_run: config.dry_run(),
        })
        .with_monitor(monitor);

    let mut inventory =
        FileInventory::open(config.inventory_path(), config.inventory_field()).await?;
    orchestrator.run(&mut inventory).await
}

fn print_summary(report: &SyncReport) {
    if report.dry_run {
        println!("\n🔍 Dry run: {} vehicle(s) would be fetched", report.pending.len());
        for vehicle in &report.pending {
            println!("  {}", vehicle);
        }
        println!("Already synced: {}", report.skipped);
        return;
    }

    println!("\nFinal Summary:");
    println!("Vehicles in inventory: {}", report.inventory_size);
    println!("Total vehicles processed: {}", report.counters.processed);
    println!("Successfully fetched: {}", report.counters.succeeded);
    println!("Errors encountered: {}", report.counters.failed);
    println!("Skipped (already synced): {}", report.skipped);
    println!("Total records in output: {}", report.records_total);
}

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    let toml_config = match &cli.config {
        Some(path) => match TomlConfig::from_file(path) {
            Ok(config) => Some(config),
            Err(e) => {
                eprintln!("❌ Failed to load config file '{}': {}", path, e);
                eprintln!("💡 Make sure the file exists and is valid TOML format");
                std::process::exit(1);
            }
        },
        None => None,
    };

    let json_logs = cli.log_json || toml_config.as_ref().is_some_and(|c| c.json_logs());
    if json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("🚀 Starting vahan-sync");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let validation = match &toml_config {
        Some(config) => config.validate(),
        None => cli.validate(),
    };
    if let Err(e) = validation {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    let monitor_enabled = cli.monitor || toml_config.as_ref().is_some_and(|c| c.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }
    let monitor = RunMonitor::new(monitor_enabled);

    let result = match &toml_config {
        Some(config) => run_sync(config, monitor).await,
        None => run_sync(&cli, monitor).await,
    };

    match result {
        Ok(report) => {
            tracing::info!("✅ Sync completed");
            print_summary(&report);
        }
        Err(e) => {
            tracing::error!(
                "❌ Sync failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

            let exit_code = e.exit_code();
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}
