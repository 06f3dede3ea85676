use serde::{Deserialize, Serialize};
use std::env;
use thiserror::Error;
use validator::Validate;

use crate::registry::DEFAULT_TREE_ALIAS;

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

/// Engine configuration with validation
#[derive(Clone, Debug, Validate, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Path of the catalog YAML file
    #[validate(length(min = 1, message = "Schema path cannot be empty"))]
    pub schema_path: String,

    /// Tree alias used when none is given
    #[validate(length(min = 1, message = "Default tree alias cannot be empty"))]
    pub default_tree: String,

    /// Upper bound on tree depth, applied on top of per-tree limits
    #[validate(range(
        min = 1,
        max = 1024,
        message = "Max depth must be between 1 and 1024"
    ))]
    pub max_depth: usize,

    /// Whether self-referential relationships add self-join leaves
    pub self_joins: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            schema_path: "schema.yaml".to_string(),
            default_tree: DEFAULT_TREE_ALIAS.to_string(),
            max_depth: 64,
            self_joins: true,
        }
    }
}

impl EngineConfig {
    /// Create configuration from environment variables with validation
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self {
            schema_path: env::var("SCHEMATREE_SCHEMA").unwrap_or_else(|_| "schema.yaml".to_string()),
            default_tree: env::var("SCHEMATREE_DEFAULT_TREE")
                .unwrap_or_else(|_| DEFAULT_TREE_ALIAS.to_string()),
            max_depth: parse_env_var("SCHEMATREE_MAX_DEPTH", "64")?,
            self_joins: parse_env_var("SCHEMATREE_SELF_JOINS", "true")?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Create configuration from CLI arguments with validation
    pub fn from_cli(cli: CliConfig) -> Result<Self, ConfigError> {
        let config = Self {
            schema_path: cli.schema_path,
            default_tree: cli.default_tree,
            max_depth: cli.max_depth,
            self_joins: cli.self_joins,
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

        let config: Self = serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            field: "yaml_content".to_string(),
            value: content,
            source: Box::new(e),
        })?;

        config.validate()?;
        Ok(config)
    }
}

/// CLI configuration (parsed from command line arguments)
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub schema_path: String,
    pub default_tree: String,
    pub max_depth: usize,
    pub self_joins: bool,
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
