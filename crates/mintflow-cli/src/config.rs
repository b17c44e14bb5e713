//! `mintflow.toml` configuration
//!
//! Every section is optional; missing keys fall back to the defaults below.
//!
//! ```toml
//! [pipeline]
//! group = "<group address>"
//! default_symbol = "NFT"
//!
//! [storage]
//! backend = "fs"          # fs | memory | http
//! root = ".mintflow/blobs"
//!
//! [storage.http]
//! base_url = "https://gateway.example"
//!
//! [ledger]
//! state_path = ".mintflow/ledger.json"
//! authority_keypair = "wallet.json"
//!
//! [logging]
//! filter = "info"
//! format = "pretty"       # pretty | json
//! ```

use std::path::{Path, PathBuf};

use mintflow_core::{PipelineConfig, DEFAULT_SYMBOL};
use mintflow_storage::HttpStoreConfig;
use serde::{Deserialize, Serialize};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "mintflow.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("no group configured; set [pipeline].group or pass --group")]
    MissingGroup,

    #[error("unknown {field} `{value}`")]
    UnknownValue { field: &'static str, value: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub pipeline: PipelineSection,
    pub storage: StorageSection,
    pub ledger: LedgerSection,
    pub logging: LoggingSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSection {
    pub group: Option<String>,
    pub default_symbol: String,
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            group: None,
            default_symbol: DEFAULT_SYMBOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Fs,
    /// Blobs vanish when the process exits
    Memory,
    Http,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub backend: StorageBackend,
    pub root: PathBuf,
    /// Locator scheme of the fs backend
    pub scheme: String,
    pub http: HttpStoreConfig,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Fs,
            root: PathBuf::from(".mintflow/blobs"),
            scheme: "cas".to_string(),
            http: HttpStoreConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerSection {
    pub state_path: PathBuf,
    pub authority_keypair: PathBuf,
}

impl Default for LedgerSection {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(".mintflow/ledger.json"),
            authority_keypair: PathBuf::from("wallet.json"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::UnknownValue {
                field: "log format",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// `EnvFilter` directive, overridden by `RUST_LOG`
    pub filter: String,
    pub format: LogFormat,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl AppConfig {
    /// Load from `path`, or from `mintflow.toml` in the working directory
    /// when it exists, or fall back to defaults.
    ///
    /// # Errors
    /// An explicit path that cannot be read, or a file that does not parse
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
                if !fallback.exists() {
                    return Ok(Self::default());
                }
                fallback
            }
        };

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// # Errors
    /// Returns `Parse` on invalid TOML or unknown enum values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Pipeline settings, with `group` taking precedence over the file
    ///
    /// # Errors
    /// `MissingGroup` when neither supplies a group
    pub fn pipeline_config(&self, group: Option<&str>) -> Result<PipelineConfig, ConfigError> {
        let group = group
            .or(self.pipeline.group.as_deref())
            .filter(|g| !g.trim().is_empty())
            .ok_or(ConfigError::MissingGroup)?;
        Ok(PipelineConfig::new(group).with_default_symbol(self.pipeline.default_symbol.clone()))
    }
}
