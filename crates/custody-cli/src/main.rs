//! custody - chain-of-custody case ledger
//!
//! CLI client that opens a local ledger and submits case transactions
//! under a configured organization identity.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use custody_core::config::CustodyConfig;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod commands;

use commands::Session;
use commands::case::EvidenceSource;

/// Configuration file picked up from the working directory when `--config`
/// is not given.
const DEFAULT_CONFIG_FILE: &str = "custody.toml";

/// custody - chain-of-custody case ledger
#[derive(Parser, Debug)]
#[command(name = "custody")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Path to the ledger database (overrides the configuration file)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Invoking organization (overrides the configuration file)
    #[arg(long, global = true)]
    org: Option<String>,

    /// Client identity within the organization
    #[arg(long, global = true)]
    client_id: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Output format (text or json)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create the ledger if needed and run the bootstrap hook
    Init,

    /// Open a new case held by the invoking organization
    CreateCase {
        /// Case identifier
        case_id: String,
        /// Free-text description
        description: String,
    },

    /// Attach an evidence identifier to a case
    AddEvidence {
        /// Case identifier
        case_id: String,
        /// Evidence identifier, recorded verbatim
        #[arg(required_unless_present = "file", conflicts_with = "file")]
        evidence_id: Option<String>,
        /// Hash this file and record `sha256:<hex>` instead
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Hand a case to another custodian
    TransferCustody {
        /// Case identifier
        case_id: String,
        /// New custodian
        custodian: String,
    },

    /// Check whether a case exists
    Exists {
        /// Case identifier
        case_id: String,
    },

    /// Show the latest snapshot of a case
    Show {
        /// Case identifier
        case_id: String,
    },

    /// Show every version of a case
    History {
        /// Case identifier
        case_id: String,
        /// List the most recent version first
        #[arg(long)]
        newest_first: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr; stdout carries command output only.
    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = load_config(&cli)?;
    let exit_code = {
        let session = Session::open(&config, cli.json).with_context(|| {
            format!("failed to open ledger {}", config.ledger.path.display())
        })?;
        dispatch(&session, &cli.command)
    };
    std::process::exit(i32::from(exit_code));
}

fn dispatch(session: &Session, command: &Commands) -> u8 {
    match command {
        Commands::Init => commands::case::init(session),
        Commands::CreateCase {
            case_id,
            description,
        } => commands::case::create(session, case_id, description),
        Commands::AddEvidence {
            case_id,
            evidence_id,
            file,
        } => {
            let source = match (evidence_id.as_deref(), file.as_deref()) {
                (_, Some(path)) => EvidenceSource::File(path),
                (Some(id), None) => EvidenceSource::Id(id),
                (None, None) => {
                    eprintln!("Error: an evidence id or --file is required");
                    return commands::exit_codes::ERROR;
                },
            };
            commands::case::add_evidence(session, case_id, source)
        },
        Commands::TransferCustody { case_id, custodian } => {
            commands::case::transfer(session, case_id, custodian)
        },
        Commands::Exists { case_id } => commands::case::exists(session, case_id),
        Commands::Show { case_id } => commands::case::show(session, case_id),
        Commands::History {
            case_id,
            newest_first,
        } => commands::history::run(session, case_id, *newest_first),
    }
}

/// Loads the configuration file, then applies command-line overrides.
fn load_config(cli: &Cli) -> Result<CustodyConfig> {
    let mut config = match &cli.config {
        Some(path) => read_config(path)?,
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            read_config(Path::new(DEFAULT_CONFIG_FILE))?
        },
        None => CustodyConfig::default(),
    };

    if let Some(ledger) = &cli.ledger {
        config.ledger.path.clone_from(ledger);
    }
    if let Some(org) = &cli.org {
        config.identity.org_id.clone_from(org);
    }
    if let Some(client_id) = &cli.client_id {
        config.identity.client_id.clone_from(client_id);
    }
    config
        .validate()
        .context("invalid command-line overrides")?;

    debug!(
        ledger = %config.ledger.path.display(),
        org_id = %config.identity.org_id,
        "configuration loaded"
    );
    Ok(config)
}

fn read_config(path: &Path) -> Result<CustodyConfig> {
    CustodyConfig::from_file(path)
        .with_context(|| format!("failed to load configuration from {}", path.display()))
}
