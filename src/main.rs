use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ecbrates::config::{default_config_path, ResolvedConfig};
use ecbrates::duration::format_duration;
use ecbrates::output::{JsonlRecordSink, RecordSink};
use ecbrates::source::EcbRateSource;
use ecbrates::state::CheckpointStore;
use ecbrates::sync::{ExchangeRateSync, SyncSettings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "ecbrates")]
#[command(about = "Daily any-to-any exchange rates from ECB reference rates")]
struct Cli {
    /// Path to config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch rates, derive cross rates and emit records
    Sync {
        /// JSONL output file (overrides config; stdout when neither is set)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// First day to fetch (overrides config and any stored checkpoint)
        #[arg(long)]
        start_date: Option<NaiveDate>,

        /// Last day to fetch (overrides config, defaults to today)
        #[arg(long)]
        end_date: Option<NaiveDate>,

        /// Ignore the stored checkpoint
        #[arg(long)]
        full_refresh: bool,
    },
    /// Show current configuration
    Config,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(layer.json())
            .init();
    } else {
        tracing_subscriber::registry().with(filter).with(layer).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut resolved = ResolvedConfig::load_or_default(&config_path)
        .with_context(|| format!("Failed to load config: {}", config_path.display()))?;

    match cli.command {
        Some(Command::Sync {
            output,
            start_date,
            end_date,
            full_refresh,
        }) => {
            if let Some(output) = output {
                resolved.output_path = Some(output);
            }
            if let Some(start_date) = start_date {
                resolved.config.start_date = start_date;
            }
            if let Some(end_date) = end_date {
                resolved.config.end_date = Some(end_date);
            }
            resolved.config.validate()?;

            let source = EcbRateSource::with_timeout(resolved.config.source.timeout)?
                .with_base_url(resolved.config.source.base_url.clone())
                .with_retry_policy(resolved.config.retry.clone());

            let sink: Arc<dyn RecordSink> = match &resolved.output_path {
                Some(path) if resolved.config.output.append => Arc::new(JsonlRecordSink::append(path)),
                Some(path) => Arc::new(JsonlRecordSink::file(path)),
                None => Arc::new(JsonlRecordSink::stdout()),
            };

            let mut settings = SyncSettings::from(&resolved.config);
            if let Some(start_date) = start_date {
                settings = settings.with_start_date(start_date);
            }

            let sync = ExchangeRateSync::new(Arc::new(source), sink, settings)
            .with_checkpoints(Arc::new(CheckpointStore::new(&resolved.state_file)))
            .with_full_refresh(full_refresh);

            let report = sync.run().await?;
            eprintln!(
                "Emitted {} records for {}..{} ({} diagnostics)",
                report.records_emitted,
                report.window.start,
                report.window.end,
                report.diagnostics.len()
            );
        }
        Some(Command::Config) => {
            let config = &resolved.config;
            println!("Config file: {}", config_path.display());
            println!("Pivot currency: {}", config.pivot_currency);
            let currencies: Vec<_> = config.currencies.iter().map(|c| c.as_str()).collect();
            println!("Currencies: {}", currencies.join(", "));
            println!("Start date: {}", config.start_date);
            match config.end_date {
                Some(end_date) => println!("End date: {end_date}"),
                None => println!("End date: today"),
            }
            println!("Lookback: {}", format_duration(config.lookback));
            println!("State file: {}", resolved.state_file.display());
            match &resolved.output_path {
                Some(path) => println!("Output: {}", path.display()),
                None => println!("Output: stdout"),
            }
            println!("Source: {}", config.source.base_url);
        }
        None => {
            println!("ecbrates - ECB exchange rate tables");
            println!("===================================\n");
            println!("Config: {}\n", config_path.display());
            println!("Commands:");
            println!("  sync      Fetch rates and emit the full rate table");
            println!("  config    Show current configuration\n");
            println!("Run 'ecbrates --help' for more options.");
        }
    }

    Ok(())
}
