// Terminal rendering of queue states

use chrono::{TimeZone, Utc};
use colored::Colorize;
use livequeue_core::domain::{LoadStatus, QueueConfig, QueueState};
use livequeue_core::port::StateObserver;
use tabled::{Table, Tabled};
use tracing::{debug, info, warn};

/// Logs every state transition of every queue
pub struct LoggingObserver;

impl StateObserver for LoggingObserver {
    fn on_state_change(&self, queue: &str, state: &QueueState) {
        match state.load_status {
            LoadStatus::Error => warn!(
                queue = %queue,
                items = state.len(),
                error = state.last_error.as_deref().unwrap_or("unknown"),
                "Queue load failed"
            ),
            LoadStatus::Loaded => debug!(queue = %queue, items = state.len(), "Queue updated"),
            status => info!(queue = %queue, status = %status, "Queue status"),
        }
    }
}

#[derive(Tabled)]
pub struct StatusRow {
    #[tabled(rename = "QUEUE")]
    pub queue: String,
    #[tabled(rename = "STATUS")]
    pub status: String,
    #[tabled(rename = "ITEMS")]
    pub items: usize,
    #[tabled(rename = "SYNCED")]
    pub synced: String,
    #[tabled(rename = "ERROR")]
    pub error: String,
}

impl StatusRow {
    pub fn new(queue: &str, state: &QueueState) -> Self {
        Self {
            queue: queue.to_string(),
            status: paint(state.load_status),
            items: state.len(),
            synced: state
                .last_synced_at
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single())
                .map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string()),
            error: state.last_error.clone().unwrap_or_default(),
        }
    }
}

fn paint(status: LoadStatus) -> String {
    let label = status.to_string();
    match status {
        LoadStatus::Loaded => label.green().to_string(),
        LoadStatus::Loading => label.yellow().to_string(),
        LoadStatus::Error => label.red().bold().to_string(),
        LoadStatus::NotLoaded => label.dimmed().to_string(),
    }
}

pub fn status_table(states: &[(String, QueueState)]) -> String {
    let rows: Vec<StatusRow> = states
        .iter()
        .map(|(queue, state)| StatusRow::new(queue, state))
        .collect();
    Table::new(rows).to_string()
}

/// Warning printed under the status table once live events stop
pub fn stream_banner(connected: bool) -> Option<String> {
    if connected {
        return None;
    }
    Some(
        "⚠ Event stream closed: queues show the last known state. Restart to reconnect."
            .red()
            .bold()
            .to_string(),
    )
}

#[derive(Tabled)]
pub struct CatalogRow {
    #[tabled(rename = "QUEUE")]
    pub queue: String,
    #[tabled(rename = "ID FIELD")]
    pub id_field: String,
    #[tabled(rename = "INSERT")]
    pub insert: String,
    #[tabled(rename = "EVENTS")]
    pub events: String,
}

pub fn catalog_table(configs: &[QueueConfig]) -> String {
    let rows: Vec<CatalogRow> = configs
        .iter()
        .map(|config| CatalogRow {
            queue: config.name.clone(),
            id_field: config.rules.identity.field.clone(),
            insert: format!("{:?}", config.insert_position).to_lowercase(),
            events: config
                .rules
                .bindings
                .iter()
                .map(|b| format!("{} ({})", b.event, b.kind))
                .collect::<Vec<_>>()
                .join("\n"),
        })
        .collect();
    Table::new(rows).to_string()
}
