//! Engine configuration
//!
//! Configuration is built in code through the `with_*` methods or loaded
//! from TOML:
//!
//! ```toml
//! [delimiters]
//! value = { prefix = "${", suffix = "}" }
//! processor = { prefix = "#{", suffix = "}" }
//!
//! [evaluation]
//! on_failure = "leave"
//! null_replacement = "-"
//!
//! [parts]
//! headers = true
//! footers = false
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::placeholder::Delimiters;
use crate::processor::FailurePolicy;

/// Errors that can occur when loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("failed to parse configuration TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("invalid {style} delimiters: {reason}")]
    InvalidDelimiters { style: &'static str, reason: String },
    #[error("invalid placeholder pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Delimiters of the two placeholder styles
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DelimiterConfig {
    pub value: Delimiters,
    pub processor: Delimiters,
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self {
            value: Delimiters::value(),
            processor: Delimiters::processor(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct EvaluationConfig {
    /// Handling of expressions that fail to evaluate
    pub on_failure: FailurePolicy,
    /// Text that replaces placeholders evaluating to null
    pub null_replacement: String,
}

/// Which parts besides the body get processed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PartsConfig {
    pub headers: bool,
    pub footers: bool,
}

impl Default for PartsConfig {
    fn default() -> Self {
        Self {
            headers: true,
            footers: true,
        }
    }
}

/// Configuration for the stamping engine
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct StampConfig {
    pub delimiters: DelimiterConfig,
    pub evaluation: EvaluationConfig,
    pub parts: PartsConfig,
}

impl StampConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Load configuration from a TOML string
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: StampConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Set the `${...}` style delimiters
    pub fn with_value_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters.value = delimiters;
        self
    }

    /// Set the `#{...}` style delimiters
    pub fn with_processor_delimiters(mut self, delimiters: Delimiters) -> Self {
        self.delimiters.processor = delimiters;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.evaluation.on_failure = policy;
        self
    }

    pub fn with_null_replacement(mut self, text: impl Into<String>) -> Self {
        self.evaluation.null_replacement = text.into();
        self
    }

    /// Enable or disable header processing
    pub fn with_headers(mut self, enabled: bool) -> Self {
        self.parts.headers = enabled;
        self
    }

    /// Enable or disable footer processing
    pub fn with_footers(mut self, enabled: bool) -> Self {
        self.parts.footers = enabled;
        self
    }

    /// Check that both delimiter pairs are usable and distinguishable
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_delimiters("value", &self.delimiters.value)?;
        check_delimiters("processor", &self.delimiters.processor)?;
        if self.delimiters.value == self.delimiters.processor {
            return Err(ConfigError::InvalidDelimiters {
                style: "processor",
                reason: "same as the value delimiters".to_string(),
            });
        }
        Ok(())
    }
}

fn check_delimiters(style: &'static str, delimiters: &Delimiters) -> Result<(), ConfigError> {
    let reason = if delimiters.prefix.is_empty() {
        "empty prefix"
    } else if delimiters.suffix.is_empty() {
        "empty suffix"
    } else {
        return Ok(());
    };
    Err(ConfigError::InvalidDelimiters {
        style,
        reason: reason.to_string(),
    })
}
