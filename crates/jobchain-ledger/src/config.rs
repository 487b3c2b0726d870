//! Ledger configuration
//!
//! Loaded from TOML, then overridden from the environment:
//!
//! | key            | env                 | default        |
//! |----------------|---------------------|----------------|
//! | `data_dir`     | `JOBCHAIN_DATA_DIR` | `.jobchain`    |
//! | `journal_file` | `JOBCHAIN_JOURNAL`  | `ledger.jsonl` |
//! | `log_filter`   | `JOBCHAIN_LOG`      | `info`         |

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable overriding `data_dir`.
pub const ENV_DATA_DIR: &str = "JOBCHAIN_DATA_DIR";
/// Environment variable overriding `journal_file`.
pub const ENV_JOURNAL_FILE: &str = "JOBCHAIN_JOURNAL";
/// Environment variable overriding `log_filter`.
pub const ENV_LOG_FILTER: &str = "JOBCHAIN_LOG";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File that failed
        path: PathBuf,
        /// Underlying I/O error
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`LedgerConfig`].
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value failed validation.
    #[error("invalid config value for {field}: {reason}")]
    Invalid {
        /// Offending key
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },
}

fn default_data_dir() -> PathBuf {
    PathBuf::from(".jobchain")
}

fn default_journal_file() -> String {
    "ledger.jsonl".to_string()
}

fn default_log_filter() -> String {
    "info".to_string()
}

/// Runtime configuration for a ledger instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Directory holding the journal
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Journal file name inside `data_dir`
    #[serde(default = "default_journal_file")]
    pub journal_file: String,
    /// `tracing` env-filter directive
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            journal_file: default_journal_file(),
            log_filter: default_log_filter(),
        }
    }
}

impl LedgerConfig {
    /// Parse from a TOML document. Missing keys take defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    /// Load from `path`.
    ///
    /// With `required == false` a missing file yields the defaults.
    pub fn load(path: &Path, required: bool) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(source) => Self::from_toml_str(&source),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    /// Apply overrides from a variable lookup.
    ///
    /// Takes the lookup as a function so tests need not touch the process
    /// environment.
    pub fn merge_with_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(file) = lookup(ENV_JOURNAL_FILE) {
            self.journal_file = file;
        }
        if let Some(filter) = lookup(ENV_LOG_FILTER) {
            self.log_filter = filter;
        }
    }

    /// Apply overrides from the process environment.
    pub fn merge_with_env(&mut self) {
        self.merge_with_env_from(|key| std::env::var(key).ok());
    }

    /// Validate field values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "data_dir",
                reason: "must not be empty".into(),
            });
        }
        if self.journal_file.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "journal_file",
                reason: "must not be empty".into(),
            });
        }
        if self.journal_file.contains(['/', '\\']) {
            return Err(ConfigError::Invalid {
                field: "journal_file",
                reason: format!("{:?} must be a file name, not a path", self.journal_file),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "log_filter",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Full path of the journal file.
    pub fn journal_path(&self) -> PathBuf {
        self.data_dir.join(&self.journal_file)
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.journal_path(), PathBuf::from(".jobchain/ledger.jsonl"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_document() {
        let config = LedgerConfig::from_toml_str("data_dir = \"/var/lib/jobchain\"\n").unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/jobchain"));
        assert_eq!(config.journal_file, "ledger.jsonl");
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = LedgerConfig::from_toml_str("listen = \"0.0.0.0:80\"\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [(ENV_DATA_DIR, "/tmp/ledger"), (ENV_LOG_FILTER, "debug")]
            .into_iter()
            .collect();
        let mut config = LedgerConfig::default();
        config.merge_with_env_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.data_dir, PathBuf::from("/tmp/ledger"));
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.journal_file, "ledger.jsonl");
    }

    #[test]
    fn test_validation() {
        let mut config = LedgerConfig {
            journal_file: "../escape.jsonl".into(),
            ..LedgerConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "journal_file",
                ..
            })
        ));

        config.journal_file = "ok.jsonl".into();
        config.log_filter = " ".into();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "log_filter",
                ..
            })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        assert_eq!(
            LedgerConfig::load(&path, false).unwrap(),
            LedgerConfig::default()
        );
        assert!(matches!(
            LedgerConfig::load(&path, true),
            Err(ConfigError::Read { .. })
        ));

        std::fs::write(&path, "journal_file = \"jobs.jsonl\"\n").unwrap();
        assert_eq!(
            LedgerConfig::load(&path, true).unwrap().journal_file,
            "jobs.jsonl"
        );
    }
}
