//! StockPulse CLI: list companies and watch a live stock dashboard.
//!
//! Commands:
//! - `companies`: print the companies the backend knows about
//! - `watch`: mount a dashboard for one company and stream chart payloads
//!   as JSON lines until the upstream simulation finishes

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use stockpulse_core::api::{DashboardApi, HttpDashboardApi, SimulatedBackend, SimulationSettings};
use stockpulse_core::render::{ChartFormatKind, JsonLinesSink};
use stockpulse_core::sync::{Clock, ManualClock, SyncState, SystemClock};
use stockpulse_core::{DashboardConfig, DashboardView, LogNotifier};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "stockpulse",
    about = "StockPulse CLI: incremental stock dashboard client"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the companies available on the backend.
    Companies {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the API base URL from the config.
        #[arg(long)]
        base_url: Option<String>,

        /// Print the list as JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Use the in-process simulated backend.
        #[arg(long, default_value_t = false)]
        simulate: bool,
    },
    /// Watch one company's dashboard, writing chart payloads to stdout.
    Watch {
        /// Company id. Defaults to the first listed company.
        #[arg(long)]
        company: Option<String>,

        /// Chart payload format: area or stock. Overrides the config.
        #[arg(long)]
        format: Option<ChartFormatKind>,

        /// Stop after this many timer-driven polls.
        #[arg(long)]
        max_polls: Option<u32>,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Override the API base URL from the config.
        #[arg(long)]
        base_url: Option<String>,

        /// Use the in-process simulated backend (no network, no waiting).
        #[arg(long, default_value_t = false)]
        simulate: bool,

        /// Simulated steps before the upstream status becomes COMPLETED.
        #[arg(long, default_value_t = 12)]
        ticks: u32,

        /// Seed for the simulated backend.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Companies {
            config,
            base_url,
            json,
            simulate,
        } => {
            let config = load_config(config.as_deref(), base_url)?;
            let api: Arc<dyn DashboardApi> = if simulate {
                Arc::new(SimulatedBackend::demo(0))
            } else {
                Arc::new(HttpDashboardApi::from_config(&config)?)
            };
            run_companies(api.as_ref(), json)
        }
        Commands::Watch {
            company,
            format,
            max_polls,
            config,
            base_url,
            simulate,
            ticks,
            seed,
        } => {
            let mut config = load_config(config.as_deref(), base_url)?;
            if let Some(format) = format {
                config.chart_format = format;
            }
            let (api, clock): (Arc<dyn DashboardApi>, Arc<dyn Clock>) = if simulate {
                if ticks == 0 {
                    bail!("--ticks must be at least 1");
                }
                let settings = SimulationSettings {
                    steps_until_complete: ticks,
                    ..SimulationSettings::default()
                };
                let backend = SimulatedBackend::new(
                    SimulatedBackend::demo(seed).list_companies()?,
                    settings,
                    seed,
                );
                (Arc::new(backend), Arc::new(ManualClock::new(Utc::now())))
            } else {
                (
                    Arc::new(HttpDashboardApi::from_config(&config)?),
                    Arc::new(SystemClock),
                )
            };
            run_watch(api, clock, &config, company.as_deref(), max_polls)
        }
    }
}

fn load_config(path: Option<&Path>, base_url: Option<String>) -> Result<DashboardConfig> {
    let mut config = match path {
        Some(path) => DashboardConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DashboardConfig::default(),
    };
    if let Some(base_url) = base_url {
        config.base_url = base_url;
    }
    config.validate()?;
    Ok(config)
}

fn run_companies(api: &dyn DashboardApi, json: bool) -> Result<()> {
    let companies = api.list_companies()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&companies)?);
        return Ok(());
    }

    if companies.is_empty() {
        println!("No companies available.");
        return Ok(());
    }

    println!("{:<16} {:<8} {}", "Id", "Code", "Name");
    println!("{}", "-".repeat(48));
    for company in &companies {
        println!(
            "{:<16} {:<8} {}",
            company.company_id, company.company_short_code, company.company_name
        );
    }
    Ok(())
}

fn run_watch(
    api: Arc<dyn DashboardApi>,
    clock: Arc<dyn Clock>,
    config: &DashboardConfig,
    company: Option<&str>,
    max_polls: Option<u32>,
) -> Result<()> {
    let sink = JsonLinesSink::new(config.chart_format.format(), std::io::stdout());
    let mut view = DashboardView::new(
        api,
        clock,
        Box::new(sink),
        Arc::new(LogNotifier),
        config,
    );

    view.mount(company)?;
    let polls = view.run_until_settled(max_polls);

    let (state, samples, error) = match view.session() {
        Some(session) => (
            session.state(),
            session.series().len(),
            session.last_error().map(str::to_string),
        ),
        None => bail!("dashboard has no active session"),
    };
    info!(state = %state, polls, samples, "watch finished");
    view.unmount();

    if state == SyncState::Failed {
        bail!(
            "sync failed: {}",
            error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
