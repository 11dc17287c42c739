use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    #[error("Parse error for {field}: {value} - {source}")]
    Parse {
        field: String,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

pub const DEFAULT_MAX_VIEW_NESTING_DEPTH: u32 = 32;

/// View validation and compilation settings for a connection.
#[derive(Clone, Debug, Validate, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    /// Default for new sessions: whether the `$` / `$->Prop` extraction
    /// forms may be used in statements
    pub experimental_features: bool,

    /// How many view classes may be nested inside each other once
    /// substituted (1-256)
    #[validate(range(
        min = 1,
        max = 256,
        message = "Max view nesting depth must be between 1 and 256"
    ))]
    pub max_view_nesting_depth: u32,

    /// Whether validation issues are also written to the log
    pub log_issues: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            experimental_features: false,
            max_view_nesting_depth: DEFAULT_MAX_VIEW_NESTING_DEPTH,
            log_issues: true,
        }
    }
}

impl ViewConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            experimental_features: parse_env_var("ECVIEWS_EXPERIMENTAL_FEATURES", "false")?,
            max_view_nesting_depth: parse_env_var(
                "ECVIEWS_MAX_VIEW_NESTING_DEPTH",
                &DEFAULT_MAX_VIEW_NESTING_DEPTH.to_string(),
            )?,
            log_issues: parse_env_var("ECVIEWS_LOG_ISSUES", "true")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Parse {
            field: "yaml_file".to_string(),
            value: "file read failed".to_string(),
            source: Box::new(e),
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content.to_string(),
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn with_experimental_features(mut self, enabled: bool) -> Self {
        self.experimental_features = enabled;
        self
    }

    pub fn max_nesting_depth(&self) -> usize {
        self.max_view_nesting_depth as usize
    }
}

/// Parse an environment variable with a default value
fn parse_env_var<T: std::str::FromStr>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let value = env::var(key).unwrap_or_else(|_| default.to_string());
    value.parse().map_err(|e| ConfigError::Parse {
        field: key.to_string(),
        value,
        source: Box::new(e),
    })
}
