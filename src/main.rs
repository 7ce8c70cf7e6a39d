//! CrimeWatch - report status notifications
//!
//! Command-line entry point: dispatches a status change through the
//! configured notification channels, or prints the effective configuration.

use anyhow::Result;
use clap::Parser;
use crimewatch::{
    cli::{Cli, Command, NotifyArgs},
    config::Config,
    core::StatusChange,
    services::build_notification_hub,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = Config::load(&cli).unwrap_or_else(|err| {
        tracing_subscriber::fmt().init();
        error!("Failed to load configuration: {}", err);
        std::process::exit(1);
    });

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    match cli.command {
        Some(Command::Notify(args)) => notify(&config, args).await,
        Some(Command::ShowConfig) => {
            println!("{}", serde_json::to_string_pretty(&config.redacted())?);
            Ok(())
        }
        None => {
            warn!("No command given. Run with --help for usage.");
            Ok(())
        }
    }
}

async fn notify(config: &Config, args: NotifyArgs) -> Result<()> {
    let hub = build_notification_hub(config)?;

    let mut change = StatusChange::new(args.report_id, args.old_status, args.new_status, args.updated_by);
    change.citizen_phone = args.phone;
    change.citizen_language = args.language;

    info!(report_id = %change.report_id, "Dispatching status change");
    let report = hub.dispatch(&change).await;

    print!("{}", report);
    if !report.all_succeeded() {
        warn!(failed = report.failure_count(), "Some listeners failed");
    }
    Ok(())
}
