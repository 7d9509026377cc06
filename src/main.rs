//! Service health monitor.
//!
//! # Architecture Overview
//!
//! ```text
//!   ┌───────────┐ tick  ┌────────────┐ 1 task/service ┌──────────┐
//!   │ scheduler │──────▶│ dispatcher │───────────────▶│ checker  │──▶ probe (HTTP, 10s cap)
//!   └─────┬─────┘       └────────────┘                └────┬─────┘
//!         │ list_services                                  │ concurrently
//!         ▼                                                ▼
//!   ┌───────────┐◀──────────── set_current_health ─────────┤
//!   │ directory │                                          │
//!   └───────────┘                               ┌──────────▼──┐
//!                                               │ health log  │──▶ uptime roll-up
//!                                               └─────────────┘
//! ```

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use clap::{Parser, Subcommand};

use service_monitor::config::{load_config, MonitorConfig, ObservabilityConfig};
use service_monitor::lifecycle::{signals, Monitor, Shutdown};
use service_monitor::monitor::{HttpProbe, Probe, ServiceId};
use service_monitor::observability::{logging, metrics};
use service_monitor::store::{uptime, JsonlHealthLog};

#[derive(Parser)]
#[command(name = "service-monitor")]
#[command(about = "Periodic reachability and latency monitor for registered services", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the monitor
    Run {
        /// Configuration file (TOML). Defaults apply when omitted.
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Run a single cycle, wait for it, and exit
        #[arg(long)]
        once: bool,
    },
    /// Probe a single URL and print the outcome
    Probe {
        url: String,

        #[arg(long, default_value_t = 10)]
        timeout_secs: u64,
    },
    /// Print hourly and daily uptime for a service from a health log
    Uptime {
        service_id: String,

        /// JSON-lines health log
        #[arg(short, long)]
        log: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, once } => {
            let config = match config {
                Some(path) => load_config(&path)?,
                None => MonitorConfig::default(),
            };
            logging::init_logging(&config.observability);
            tracing::info!("service-monitor v{} starting", env!("CARGO_PKG_VERSION"));
            run(config, once).await?;
        }
        Commands::Probe { url, timeout_secs } => {
            logging::init_logging(&ObservabilityConfig::default());
            let probe = HttpProbe::new(Duration::from_secs(timeout_secs), concat!(
                "service-monitor/",
                env!("CARGO_PKG_VERSION")
            ))?;
            let outcome = probe.probe(&url).await;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Commands::Uptime { service_id, log } => {
            logging::init_logging(&ObservabilityConfig::default());
            let id = ServiceId::new(service_id);
            let observations = JsonlHealthLog::read_service(&log, &id)?;
            let history = uptime::summarize(&id, &observations, Utc::now());
            println!("{}", serde_json::to_string_pretty(&history)?);
        }
    }

    Ok(())
}

async fn run(config: MonitorConfig, once: bool) -> Result<(), Box<dyn std::error::Error>> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let monitor = Monitor::build(&config).await?;

    if once {
        let observations = monitor.run_once().await;
        println!("{}", serde_json::to_string_pretty(&observations)?);
        return Ok(());
    }

    let status = monitor.status();
    let shutdown = Shutdown::new();
    let runner = monitor.run(shutdown.subscribe());
    tokio::pin!(runner);

    tokio::select! {
        _ = &mut runner => {}
        signal = signals::wait_for_signal() => {
            tracing::info!(signal, "Shutdown signal received");
            shutdown.trigger();
            runner.await;
        }
    }

    tracing::info!(
        cycles = status.cycles_started(),
        cycles_skipped = status.cycles_skipped(),
        checks = status.services_dispatched(),
        "Shutdown complete"
    );
    Ok(())
}
