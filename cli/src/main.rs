use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tagguard_kernel::adapters::aws::AwsConnector;
use tagguard_kernel::adapters::config_history::HistoryRecord;
use tagguard_kernel::event::RuleEvent;
use tagguard_kernel::handler::{handle_event, EvaluationOutcome};
use tagguard_kernel::services::memory::{
    InMemoryCompute, InMemoryConfigService, InMemoryConnector, StaticCredentialExchange,
};
use tagguard_kernel::services::ServiceError;
use tagguard_kernel::settings::Settings;

/// Tagguard CLI
#[derive(Parser, Debug)]
#[command(name = "tagguard")]
#[command(about = "Instance tag compliance evaluator and remediator", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a rule event against AWS, remediating and reporting for real
    Evaluate {
        /// Path to rule event JSON
        #[arg(long)]
        event: PathBuf,

        /// Path to settings JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Assume the event's execution role (cross-account mode)
        #[arg(long)]
        assume_role: bool,

        /// AWS region override
        #[arg(long)]
        region: Option<String>,
    },

    /// Evaluate a rule event against in-memory services and print what
    /// would happen
    Plan {
        /// Path to rule event JSON
        #[arg(long)]
        event: PathBuf,

        /// Path to settings JSON
        #[arg(long)]
        config: Option<PathBuf>,

        /// Path to configuration history JSON (array of records), used
        /// for oversized notifications
        #[arg(long)]
        history: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    let outcome = match cli.command {
        Command::Evaluate {
            event,
            config,
            assume_role,
            region,
        } => {
            // ----------------------------
            // Load event and settings
            // ----------------------------
            let event = load_event(&event)?;
            let mut settings = load_settings(config.as_deref())?;
            settings.assume_role |= assume_role;
            if region.is_some() {
                settings.region = region;
            }

            // ----------------------------
            // Connect to AWS and evaluate
            // ----------------------------
            let connector = AwsConnector::load(settings.region.as_deref())?;
            handle_event(&event, &connector, &connector, &settings)?
        }
        Command::Plan {
            event,
            config,
            history,
        } => {
            // ----------------------------
            // Load event and settings
            // ----------------------------
            let event = load_event(&event)?;
            let mut settings = load_settings(config.as_deref())?;
            settings.assume_role = false;

            // ----------------------------
            // Seed in-memory services
            // ----------------------------
            let history = match history {
                Some(path) => read_json::<Vec<HistoryRecord>>(&path)?,
                None => Vec::new(),
            };
            let connector =
                InMemoryConnector::new(InMemoryConfigService::with_history(history), InMemoryCompute::new());
            let exchange =
                StaticCredentialExchange::failing(ServiceError::new("AssumeRole", "not available in plan mode"));

            // ----------------------------
            // Evaluate
            // ----------------------------
            handle_event(&event, &connector, &exchange, &settings)?
        }
    };

    print_outcome(&outcome)
}

fn init_tracing(verbose: u8, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    });

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.with_target(false).init();
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let data = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))
}

fn load_event(path: &Path) -> Result<RuleEvent> {
    read_json(path)
}

fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let settings = match path {
        Some(path) => read_json(path)?,
        None => Settings::default(),
    };
    tracing::debug!(?settings, "loaded settings");
    Ok(settings)
}

fn print_outcome(outcome: &EvaluationOutcome) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(outcome)?);
    Ok(())
}
