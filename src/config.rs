//! Run configuration.
//!
//! All fields have defaults matching plant conventions (`ERROR` state,
//! one-hour noise threshold, 180 s duration for a series' last reading),
//! so an empty TOML file is a valid configuration.
//!
//! ```toml
//! error_state = "ERROR"
//! noise_threshold_secs = 3600.0
//! fallback_duration_secs = 180.0
//! workers = 4
//! validate = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::aggregation::{JamRules, DEFAULT_ERROR_STATE, DEFAULT_NOISE_THRESHOLD_SECS};
use crate::error::ConfigError;
use crate::models::DEFAULT_FALLBACK_DURATION_SECS;

/// Parameters of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// State name marking an error sample.
    pub error_state: String,
    /// Error runs totaling at least this many seconds are noise.
    pub noise_threshold_secs: f64,
    /// Duration (s) of the last reading of each machine series.
    pub fallback_duration_secs: f64,
    /// Worker threads for aggregation (1 = calling thread).
    pub workers: usize,
    /// Check sample stream integrity before running.
    pub validate: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            error_state: DEFAULT_ERROR_STATE.to_string(),
            noise_threshold_secs: DEFAULT_NOISE_THRESHOLD_SECS,
            fallback_duration_secs: DEFAULT_FALLBACK_DURATION_SECS,
            workers: 1,
            validate: true,
        }
    }
}

impl PipelineConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.check()?;
        Ok(config)
    }

    /// Loads a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Sets the error state name.
    pub fn with_error_state(mut self, state: impl Into<String>) -> Self {
        self.error_state = state.into();
        self
    }

    /// Sets the noise threshold (s).
    pub fn with_noise_threshold(mut self, secs: f64) -> Self {
        self.noise_threshold_secs = secs;
        self
    }

    /// Sets the last-reading duration (s).
    pub fn with_fallback_duration(mut self, secs: f64) -> Self {
        self.fallback_duration_secs = secs;
        self
    }

    /// Sets the worker count.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    /// Enables or disables input validation.
    pub fn with_validation(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    /// Jam classification rules derived from this configuration.
    pub fn jam_rules(&self) -> JamRules {
        JamRules {
            error_state: self.error_state.clone(),
            noise_threshold_secs: self.noise_threshold_secs,
        }
    }

    /// Rejects unusable values.
    pub fn check(&self) -> Result<(), ConfigError> {
        if self.error_state.trim().is_empty() {
            return Err(ConfigError::Invalid("error_state must not be empty".into()));
        }
        if !self.noise_threshold_secs.is_finite() || self.noise_threshold_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "noise_threshold_secs must be a non-negative number, got {}",
                self.noise_threshold_secs
            )));
        }
        if !self.fallback_duration_secs.is_finite() || self.fallback_duration_secs < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "fallback_duration_secs must be a non-negative number, got {}",
                self.fallback_duration_secs
            )));
        }
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be at least 1".into()));
        }
        Ok(())
    }
}
