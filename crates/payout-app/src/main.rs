//! payout - commission dashboard CLI and proxy server.

use anyhow::{bail, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use payout_app::{AppConfig, Application, ConfigSource, Transport};
use payout_core::parse_wire_date;
use payout_dashboard::{RangePreset, RangeSelection, ViewState};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Commission dashboard for trading API accounts
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PAYOUT_CONFIG env var)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP proxy
    Serve {
        /// Listen port (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Verify an API token and remember it
    Login {
        /// API token; read from stdin when omitted
        #[arg(long, env = "PAYOUT_TOKEN", hide_env_values = true)]
        token: Option<String>,
    },
    /// Show commissions for a date range
    Report {
        /// Preset range: 7d, 30d or 90d
        #[arg(long, default_value = "30d", conflicts_with_all = ["from", "to"])]
        range: String,
        /// Custom range start (YYYY-MM-DD)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Custom range end (YYYY-MM-DD)
        #[arg(long, requires = "from")]
        to: Option<String>,
        /// socket or proxy (overrides config)
        #[arg(long)]
        transport: Option<String>,
    },
    /// Forget the stored token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize TLS crypto provider (must be before any WS connections)
    payout_session::init_crypto();

    let args = Args::parse();

    // Determine config path: CLI arg > PAYOUT_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("PAYOUT_CONFIG").ok())
        .unwrap_or_else(|| payout_app::config::DEFAULT_CONFIG_PATH.to_string());

    let (mut config, source) = AppConfig::load(&config_path)?;

    // The server logs at the configured level; one-shot commands stay quiet.
    let level = match args.command {
        Command::Serve { .. } => config.telemetry.log_level.clone(),
        _ => "warn".to_string(),
    };
    payout_telemetry::init_logging(&level)?;
    match source {
        ConfigSource::File => info!(config_path = %config_path, "Configuration loaded"),
        ConfigSource::Defaults => {
            warn!(config_path = %config_path, "Config file not found, using defaults")
        }
    }

    match args.command {
        Command::Serve { port } => {
            if let Some(port) = port {
                config.proxy.port = port;
            }
            info!("Starting payout v{}", env!("CARGO_PKG_VERSION"));
            Application::new(config).serve(CancellationToken::new()).await?;
        }
        Command::Login { token } => {
            let raw = match token {
                Some(token) => token,
                None => read_token().await?,
            };
            let session = Application::new(config).login(&raw).await?;
            println!(
                "Signed in ({} account, {})",
                session.account.account_type, session.account.currency
            );
        }
        Command::Report {
            range,
            from,
            to,
            transport,
        } => {
            let selection = match (from, to) {
                (Some(from), Some(to)) => custom_selection(&from, &to)?,
                _ => RangeSelection::Preset(range.parse::<RangePreset>()?),
            };
            let transport = transport.map(|t| t.parse::<Transport>()).transpose()?;

            let (state, text) = Application::new(config).report(selection, transport).await?;
            print!("{text}");
            if matches!(state, ViewState::Error { .. } | ViewState::SignedOut) {
                std::process::exit(1);
            }
        }
        Command::Logout => {
            Application::new(config).logout()?;
            println!("Signed out");
        }
    }

    Ok(())
}

fn custom_selection(from: &str, to: &str) -> Result<RangeSelection> {
    let start = parse_wire_date(from)?;
    let end = parse_wire_date(to)?;
    let today: NaiveDate = Local::now().date_naive();
    Ok(RangeSelection::custom(start, end, today)?)
}

async fn read_token() -> Result<String> {
    eprint!("API token: ");
    let mut line = String::new();
    BufReader::new(tokio::io::stdin()).read_line(&mut line).await?;
    if line.trim().is_empty() {
        bail!("Please enter a valid API token");
    }
    Ok(line)
}
