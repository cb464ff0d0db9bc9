//! Configuration file
//!
//! ```json
//! {
//!   "data_dir": "./data",
//!   "schema": { "name": "rooms", "fields": [ ... ] },
//!   "page_size": 50,
//!   "log_level": "info",
//!   "policy": { "kind": "lead_time", "field": "date", "lead_hours": 48 },
//!   "server": { "host": "127.0.0.1", "port": 54330 }
//! }
//! ```

use std::fs;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::errors::{CliError, CliResult};
use crate::observability::Severity;
use crate::policy::{ModificationPolicy, PolicyConfig};
use crate::schema::{Schema, SchemaLoader};
use crate::server::ServerConfig;
use crate::session::DEFAULT_PAGE_SIZE;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory (required)
    pub data_dir: String,

    /// Inline schema object (required)
    pub schema: Value,

    /// Records per `next_page` (optional, default 50)
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Minimum log severity (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Modification policy (optional, default unrestricted)
    #[serde(default)]
    pub policy: PolicyConfig,

    /// TCP server settings for `serve`
    #[serde(default)]
    pub server: ServerConfig,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;
        Self::parse(&content)
    }

    /// Parse and validate configuration JSON
    pub fn parse(content: &str) -> CliResult<Self> {
        let config: Config = serde_json::from_str(content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    fn validate(&self) -> CliResult<()> {
        if self.data_dir.trim().is_empty() {
            return Err(CliError::config_error("data_dir must not be empty"));
        }

        if self.page_size == 0 {
            return Err(CliError::config_error("page_size must be > 0"));
        }

        self.min_severity()?;

        let schema = self.schema()?;
        self.policy(&schema)?;

        Ok(())
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }

    pub fn schema(&self) -> CliResult<Schema> {
        Ok(SchemaLoader::from_value(&self.schema)?)
    }

    pub fn policy(&self, schema: &Schema) -> CliResult<Arc<dyn ModificationPolicy>> {
        Ok(self.policy.build(schema)?)
    }

    pub fn min_severity(&self) -> CliResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            CliError::config_error(format!(
                "Invalid log_level: '{}'. Expected trace, info, warn, error or fatal.",
                self.log_level
            ))
        })
    }
}
