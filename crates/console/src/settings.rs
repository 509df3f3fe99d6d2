//! Console settings
//!
//! Layered like the rest of the stack: built-in defaults, then
//! `~/.livequeue/console.toml` (optional unless passed explicitly), then
//! `LIVEQUEUE_*` environment variables, then command-line flags.

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use livequeue_core::application::constants::DEFAULT_STAGGER_LADDER_MS;
use livequeue_core::application::StaggerLadder;
use livequeue_core::port::AuthContext;
use livequeue_infra_rpc::config::{DEFAULT_ENDPOINT, DEFAULT_REQUEST_TIMEOUT_SECS};
use livequeue_infra_rpc::RpcConfig;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "~/.livequeue/console.toml";
pub const ENV_PREFIX: &str = "LIVEQUEUE";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Settings {
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_ladder")]
    pub stagger_ladder_ms: Vec<u64>,
    /// Catalog queues to watch; empty means all
    #[serde(default)]
    pub queues: Vec<String>,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_string()
}

fn default_ladder() -> Vec<u64> {
    DEFAULT_STAGGER_LADDER_MS.to_vec()
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            token: None,
            stagger_ladder_ms: default_ladder(),
            queues: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Flag values that take precedence over file and environment
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub token: Option<String>,
    pub queues: Vec<String>,
}

/// `LIVEQUEUE_*` variables; list keys are comma separated
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("queues")
        .with_list_parse_key("stagger_ladder_ms")
}

impl Settings {
    /// Load settings from the config file and the process environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        Self::load_with(path, environment())
    }

    pub fn load_with(path: Option<&str>, env: Environment) -> Result<Self> {
        let required = path.is_some();
        let path = shellexpand::tilde(path.unwrap_or(DEFAULT_CONFIG_PATH)).into_owned();

        Config::builder()
            .add_source(File::new(&path, FileFormat::Toml).required(required))
            .add_source(env)
            .build()
            .with_context(|| format!("Failed to read settings from {}", path))?
            .try_deserialize()
            .context("Invalid settings")
    }

    pub fn apply(mut self, overrides: Overrides) -> Self {
        if let Some(endpoint) = overrides.endpoint {
            self.endpoint = endpoint;
        }
        if overrides.token.is_some() {
            self.token = overrides.token;
        }
        if !overrides.queues.is_empty() {
            self.queues = overrides.queues;
        }
        self
    }

    pub fn auth(&self) -> AuthContext {
        match &self.token {
            Some(token) if !token.is_empty() => AuthContext::bearer(token.clone()),
            _ => AuthContext::anonymous(),
        }
    }

    pub fn ladder(&self) -> StaggerLadder {
        StaggerLadder::new(self.stagger_ladder_ms.clone())
    }

    pub fn rpc_config(&self) -> RpcConfig {
        RpcConfig::new(self.endpoint.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
    }
}
