pub mod deploy;
pub mod error;
pub mod handlers;
pub mod signature;

use axum::{Router, routing};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::deploy::Deployer;
use crate::error::{DeployError, Result};
use crate::handlers::{handle_webhook, not_found};

/// The single endpoint GitHub is pointed at.
pub const WEBHOOK_PATH: &str = "/github-webhook";

/// Upper bound on a single deployment command before it counts as failed.
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Deserialize, Clone)]
pub struct DeployConfig {
    /// Path to the process-supervisor executable (e.g. "/usr/local/bin/pm2")
    pub supervisor_bin: String,
    pub step_timeout_secs: Option<u64>,
    pub target: Vec<TargetConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TargetConfig {
    pub name: String,
    /// Full git reference this target tracks, e.g. "refs/heads/main"
    #[serde(rename = "ref")]
    pub tracked_ref: String,
    /// Working directory for git pull and the build steps
    pub path: String,
    /// Ordered build commands, each an argv vector
    #[serde(default)]
    pub build: Vec<Vec<String>>,
}

impl DeployConfig {
    /// Startup-time sanity checks. A duplicate tracked ref would make
    /// resolution order-dependent, so it is rejected outright instead of
    /// silently resolved first-match.
    pub fn validate(&self) -> Result<()> {
        if self.supervisor_bin.is_empty() {
            return Err(DeployError::Config(
                "supervisor_bin must not be empty".to_string(),
            ));
        }

        let mut seen_refs = HashSet::new();
        for target in &self.target {
            if target.name.is_empty() {
                return Err(DeployError::Config(
                    "target with empty name in config".to_string(),
                ));
            }
            if target.path.is_empty() {
                return Err(DeployError::Config(format!(
                    "target '{}' has an empty working directory path",
                    target.name
                )));
            }
            if !seen_refs.insert(target.tracked_ref.as_str()) {
                return Err(DeployError::Config(format!(
                    "duplicate tracked ref '{}' (target '{}')",
                    target.tracked_ref, target.name
                )));
            }
            if target.build.iter().any(|argv| argv.is_empty()) {
                return Err(DeployError::Config(format!(
                    "target '{}' has an empty build command",
                    target.name
                )));
            }
        }
        Ok(())
    }

    /// Finds the first target tracking the pushed ref. Exact, case-sensitive
    /// match; no match just means no action is needed.
    pub fn find_target(&self, git_ref: &str) -> Option<&TargetConfig> {
        self.target.iter().find(|t| t.tracked_ref == git_ref)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs.unwrap_or(DEFAULT_STEP_TIMEOUT_SECS))
    }
}

pub struct AppState {
    pub config: DeployConfig,
    pub webhook_secret: String,
    pub deployer: Arc<dyn Deployer>,
    /// One lock per configured target. Deployments for the same target must
    /// not overlap in its working directory; distinct targets may.
    target_locks: HashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(config: DeployConfig, webhook_secret: String, deployer: Arc<dyn Deployer>) -> Self {
        let target_locks = config
            .target
            .iter()
            .map(|t| (t.name.clone(), Arc::new(Mutex::new(()))))
            .collect();
        Self {
            config,
            webhook_secret,
            deployer,
            target_locks,
        }
    }

    /// Lock guarding deployments of the named target. The config is immutable
    /// after startup, so every resolvable target has an entry.
    pub fn lock_for(&self, target_name: &str) -> Option<Arc<Mutex<()>>> {
        self.target_locks.get(target_name).cloned()
    }
}

pub type SharedState = Arc<AppState>;

pub fn router(state: SharedState) -> Router {
    Router::new()
        .route(WEBHOOK_PATH, routing::post(handle_webhook))
        .fallback(not_found)
        .with_state(state)
}
