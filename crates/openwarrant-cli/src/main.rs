//! OpenWarrant CLI - Warrant checks from the command line
//!
//! # Quick Start
//!
//! ```bash
//! openwarrant check \
//!     --action read-patient-record --role attending_physician --data-type PHI \
//!     --warrant-dir ./warrants \
//!     --context '{"patient_consent": true, "recipient_verified": true}'
//!
//! openwarrant list --warrant-dir ./warrants
//! ```
//!
//! Logs go to stderr and are controlled with `RUST_LOG`.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;
mod display;

const DEFAULT_AGENT_ID: &str = "cli-agent";
const DEFAULT_LOG_LEVEL: &str = "warn";

/// OpenWarrant CLI - governance checks for AI agents
#[derive(Parser)]
#[command(name = "openwarrant")]
#[command(author = "OpenWarrant Contributors")]
#[command(version)]
#[command(about = "Check agent actions against pre-authenticated warrants", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a warrant request
    Check(CheckArgs),

    /// List the warrants in a catalog
    List {
        /// Directory (or single file) containing warrant YAML files
        #[arg(long, env = "OPENWARRANT_WARRANT_DIR")]
        warrant_dir: PathBuf,
    },
}

#[derive(clap::Args)]
pub struct CheckArgs {
    /// Action to check
    #[arg(long)]
    pub action: String,

    /// Role of the requester
    #[arg(long)]
    pub role: String,

    /// Data type classification
    #[arg(long)]
    pub data_type: String,

    /// Directory (or single file) containing warrant YAML files
    #[arg(long, env = "OPENWARRANT_WARRANT_DIR")]
    pub warrant_dir: PathBuf,

    /// Agent identifier
    #[arg(long, default_value = DEFAULT_AGENT_ID)]
    pub agent_id: String,

    /// JSON context object, e.g. '{"patient_consent": true}'
    #[arg(long, default_value = "{}")]
    pub context: String,

    /// Correlation id recorded in the audit record
    #[arg(long)]
    pub correlation_id: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Append the audit record to this JSON Lines file
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check(args) => commands::check::run(&args),
        Commands::List { warrant_dir } => commands::list::run(&warrant_dir),
    }
}

/// Initialize tracing on stderr so stdout stays machine-readable
fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}
