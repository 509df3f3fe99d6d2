//! Livequeue Console - live view of the dashboard's admin queues
//!
//! Composition root: settings, logging, the RPC data source and the queue hub.

mod logging;
mod settings;
mod telemetry;
mod view;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use livequeue_core::application::constants::{ACTION_APPROVE, ACTION_REJECT};
use livequeue_core::application::QueueHub;
use livequeue_core::catalog;
use livequeue_core::port::{MutationRequest, SystemTimeProvider};
use livequeue_infra_rpc::RpcDataSource;
use settings::{Overrides, Settings};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

const VERSION: &str = env!("CARGO_PKG_VERSION");
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 5;

#[derive(Parser)]
#[command(name = "livequeue")]
#[command(about = "Live admin queue console", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Settings file (default: ~/.livequeue/console.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Backend WebSocket endpoint
    #[arg(long, global = true, env = "LIVEQUEUE_ENDPOINT")]
    endpoint: Option<String>,

    /// Admin session token
    #[arg(long, global = true, env = "LIVEQUEUE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Queue to watch (repeatable; default: all)
    #[arg(long = "queue", global = true)]
    queues: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch queues live and print a status table
    Watch {
        /// Seconds between status tables
        #[arg(long, default_value_t = DEFAULT_STATUS_INTERVAL_SECS)]
        status_interval_secs: u64,
    },

    /// List the queue catalog
    Queues,

    /// Approve an item
    Approve {
        queue: String,
        id: String,

        /// Extra JSON payload sent with the intent
        #[arg(long)]
        extra: Option<String>,
    },

    /// Reject an item
    Reject {
        queue: String,
        id: String,

        /// Extra JSON payload sent with the intent
        #[arg(long)]
        extra: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    logging::init_logging()?;
    info!("Livequeue console v{} starting...", VERSION);

    let settings = Settings::load(cli.config.as_deref())?.apply(Overrides {
        endpoint: cli.endpoint,
        token: cli.token,
        queues: cli.queues,
    });

    match cli.command.unwrap_or(Commands::Watch {
        status_interval_secs: DEFAULT_STATUS_INTERVAL_SECS,
    }) {
        Commands::Watch {
            status_interval_secs,
        } => watch(&settings, Duration::from_secs(status_interval_secs.max(1))).await,
        Commands::Queues => {
            println!("{}", view::catalog_table(&catalog::select(&settings.queues)?));
            Ok(())
        }
        Commands::Approve { queue, id, extra } => {
            send(&settings, MutationRequest::new(queue, ACTION_APPROVE, id), extra).await
        }
        Commands::Reject { queue, id, extra } => {
            send(&settings, MutationRequest::new(queue, ACTION_REJECT, id), extra).await
        }
    }
}

async fn connect(settings: &Settings) -> Result<(QueueHub, Arc<RpcDataSource>)> {
    let configs = catalog::select(&settings.queues)?;
    let auth = settings.auth();

    info!(endpoint = %settings.endpoint, "Connecting to dashboard backend...");
    let source = Arc::new(
        RpcDataSource::connect(&settings.rpc_config(), &auth)
            .await
            .context("Failed to connect to dashboard backend")?,
    );

    let hub = QueueHub::new(
        configs,
        source.clone(),
        auth,
        Arc::new(SystemTimeProvider),
        Some(Arc::new(view::LoggingObserver)),
        settings.ladder(),
    )?;
    Ok((hub, source))
}

async fn watch(settings: &Settings, interval: Duration) -> Result<()> {
    let (hub, source) = connect(settings).await?;
    hub.activate_all()?;

    info!(queues = ?hub.queue_names(), "Watching queues");
    info!("Press Ctrl+C to exit");

    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                println!("{}", view::status_table(&hub.snapshots()));
                if let Some(banner) = view::stream_banner(source.is_connected()) {
                    println!("{}", banner);
                }
            }
            signal = tokio::signal::ctrl_c() => {
                signal?;
                break;
            }
        }
    }

    info!("Shutdown signal received. Disposing queues...");
    hub.dispose_all();
    info!("Shutdown complete.");
    Ok(())
}

async fn send(settings: &Settings, request: MutationRequest, extra: Option<String>) -> Result<()> {
    let request = match extra {
        Some(raw) => {
            request.with_extra(serde_json::from_str(&raw).context("Invalid JSON for --extra")?)
        }
        None => request,
    };
    let label = format!("{} {} in {}", request.action, request.id, request.queue);

    let (hub, _source) = connect(settings).await?;
    match hub.mutate(request).await {
        Ok(reply) => {
            println!("{}", format!("✓ Sent {}", label).green().bold());
            println!("{}", serde_json::to_string_pretty(&reply)?);
            Ok(())
        }
        Err(e) => {
            println!("{}", format!("✗ Failed to {}", label).red().bold());
            Err(e.into())
        }
    }
}
