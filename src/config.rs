//! Runner Configuration
//!
//! Knobs that apply to a whole run rather than to one task.
//!
//! ## Priority Order (highest to lowest)
//!
//! 1. Environment variables (`DAGRUN_MAX_CONCURRENCY`)
//! 2. Config file (TOML)
//! 3. Defaults (unbounded fan-out, lifecycle retry scope, no default policy)

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;

use crate::error::{DagError, Result};
use crate::retry::{RetryPolicy, RetryScope};

/// Environment variable overriding `max_concurrency`
pub const ENV_MAX_CONCURRENCY: &str = "DAGRUN_MAX_CONCURRENCY";

/// Run-wide configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "snake_case")]
pub struct RunnerConfig {
    /// Upper bound on simultaneously executing tasks (`None` = unbounded)
    pub max_concurrency: Option<usize>,

    /// Which stages a retry attempt re-runs
    pub retry_scope: RetryScope,

    /// Policy for tasks that do not declare their own
    pub default_retry: Option<RetryPolicy>,
}

impl RunnerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| DagError::Config {
            reason: format!("Failed to parse config: {}", e),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// Returns error if the file is missing or malformed.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| DagError::Config {
            reason: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    /// Merge with environment variables
    ///
    /// Environment variables take precedence over config file values.
    pub fn with_env(self) -> Result<Self> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Merge with values from an arbitrary lookup (env-like source)
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_MAX_CONCURRENCY) {
            let raw = raw.trim();
            if !raw.is_empty() {
                let limit = raw.parse::<usize>().map_err(|_| DagError::Config {
                    reason: format!("{} must be a positive integer, got '{}'", ENV_MAX_CONCURRENCY, raw),
                })?;
                self.max_concurrency = Some(limit);
            }
        }

        self.validate()?;
        Ok(self)
    }

    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    pub fn with_retry_scope(mut self, scope: RetryScope) -> Self {
        self.retry_scope = scope;
        self
    }

    pub fn with_default_retry(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = Some(policy);
        self
    }

    /// Reject values that would stall a run
    pub fn validate(&self) -> Result<()> {
        match self.max_concurrency {
            Some(0) => Err(DagError::Config {
                reason: "max_concurrency must be at least 1".to_string(),
            }),
            Some(n) if n > Semaphore::MAX_PERMITS => Err(DagError::Config {
                reason: format!(
                    "max_concurrency {} exceeds the limit of {}",
                    n,
                    Semaphore::MAX_PERMITS
                ),
            }),
            _ => Ok(()),
        }
    }
}
