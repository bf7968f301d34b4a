//! Runtime configuration for an orchestration run
//!
//! The iteration budget, per-call timeouts, and per-step retry limit are
//! required operator input; no defaults are assumed for them. Optional
//! knobs (retrieval timeout, analysis concurrency) fall back sensibly.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

fn default_analysis_concurrency() -> usize {
    4
}

/// Configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Maximum revision cycles after the initial build (>= 1)
    pub max_iterations: u32,
    /// Per-call timeout for image analysis, in milliseconds
    pub analysis_timeout_ms: u64,
    /// Per-call timeout for build and review, in milliseconds
    pub review_timeout_ms: u64,
    /// Immediate retries per external call on transport failure
    pub per_step_retry_limit: u32,
    /// Per-call timeout for retrieval queries; defaults to the review timeout
    #[serde(default)]
    pub retrieval_timeout_ms: Option<u64>,
    /// Concurrent image analysis calls
    #[serde(default = "default_analysis_concurrency")]
    pub analysis_concurrency: usize,
}

impl RunConfig {
    /// Create a configuration from the required parameters
    #[must_use]
    pub fn new(
        max_iterations: u32,
        analysis_timeout_ms: u64,
        review_timeout_ms: u64,
        per_step_retry_limit: u32,
    ) -> Self {
        Self {
            max_iterations,
            analysis_timeout_ms,
            review_timeout_ms,
            per_step_retry_limit,
            retrieval_timeout_ms: None,
            analysis_concurrency: default_analysis_concurrency(),
        }
    }

    /// With a retrieval timeout distinct from the review timeout
    #[inline]
    #[must_use]
    pub fn with_retrieval_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.retrieval_timeout_ms = Some(timeout_ms);
        self
    }

    /// With an analysis concurrency limit
    #[inline]
    #[must_use]
    pub fn with_analysis_concurrency(mut self, concurrency: usize) -> Self {
        self.analysis_concurrency = concurrency;
        self
    }

    /// Load and validate a TOML configuration file
    ///
    /// # Errors
    /// Returns [`ConfigError`] on read, parse, or validation failure
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = toml::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check configuration invariants
    ///
    /// # Errors
    /// Returns [`ConfigError`] when a required parameter is out of range
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::InvalidIterationBudget);
        }
        if self.analysis_timeout_ms == 0
            || self.review_timeout_ms == 0
            || self.retrieval_timeout_ms == Some(0)
        {
            return Err(ConfigError::InvalidTimeout);
        }
        if self.analysis_concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency);
        }
        Ok(())
    }

    /// Analysis timeout as a duration
    #[inline]
    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_millis(self.analysis_timeout_ms)
    }

    /// Build/review timeout as a duration
    #[inline]
    #[must_use]
    pub fn review_timeout(&self) -> Duration {
        Duration::from_millis(self.review_timeout_ms)
    }

    /// Retrieval timeout as a duration
    #[inline]
    #[must_use]
    pub fn retrieval_timeout(&self) -> Duration {
        Duration::from_millis(self.retrieval_timeout_ms.unwrap_or(self.review_timeout_ms))
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The iteration budget must allow at least one revision
    #[error("max_iterations must be >= 1")]
    InvalidIterationBudget,

    /// Timeouts must be nonzero
    #[error("timeouts must be nonzero")]
    InvalidTimeout,

    /// Analysis concurrency must be nonzero
    #[error("analysis_concurrency must be >= 1")]
    InvalidConcurrency,

    /// Config file could not be read
    #[error("cannot read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("malformed config: {0}")]
    Parse(#[from] toml::de::Error),
}
