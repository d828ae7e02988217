//! Configuration loaded from environment variables.

use std::env;

use anyhow::{Result, bail};

/// Default host table prefix.
const DEFAULT_TABLE_PREFIX: &str = "wp_";

/// Language code the language service reports in "show all languages" mode.
const DEFAULT_ALL_LANGUAGES_CODE: &str = "all";

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Prefix prepended to every host table name (default: "wp_").
    pub table_prefix: String,

    /// Sentinel language code meaning "all languages" (default: "all").
    pub all_languages_code: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            table_prefix: DEFAULT_TABLE_PREFIX.to_string(),
            all_languages_code: DEFAULT_ALL_LANGUAGES_CODE.to_string(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let table_prefix =
            env::var("RELATA_TABLE_PREFIX").unwrap_or_else(|_| DEFAULT_TABLE_PREFIX.to_string());
        validate_table_prefix(&table_prefix)?;

        let all_languages_code = env::var("RELATA_ALL_LANGUAGES_CODE")
            .unwrap_or_else(|_| DEFAULT_ALL_LANGUAGES_CODE.to_string());
        if all_languages_code.trim().is_empty() {
            bail!("RELATA_ALL_LANGUAGES_CODE must not be empty");
        }

        Ok(Self {
            table_prefix,
            all_languages_code,
        })
    }

    /// Override the table prefix.
    pub fn with_table_prefix(mut self, prefix: &str) -> Result<Self> {
        validate_table_prefix(prefix)?;
        self.table_prefix = prefix.to_string();
        Ok(self)
    }
}

/// Table prefixes are interpolated into identifiers, so only `[A-Za-z0-9_]` is allowed.
fn validate_table_prefix(prefix: &str) -> Result<()> {
    if prefix.len() > 32 {
        bail!("table prefix must be at most 32 characters, got {}", prefix.len());
    }
    if !prefix
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        bail!("table prefix '{prefix}' may only contain letters, digits and underscores");
    }
    Ok(())
}
