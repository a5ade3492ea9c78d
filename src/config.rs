use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::assistant::context::ContextLimits;

/// Application-level constants
pub const APP_NAME: &str = "MedAssist";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// File name of the optional JSON configuration inside the data directory.
pub const CONFIG_FILE_NAME: &str = "assistant.json";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "medassist_lib=info,medassist=info,warn"
}

/// Get the application data directory
/// ~/MedAssist/ on all platforms. `None` when no home directory is known.
pub fn app_data_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(APP_NAME))
}

/// Location of the optional configuration file.
pub fn config_file_path() -> Option<PathBuf> {
    app_data_dir().map(|dir| dir.join(CONFIG_FILE_NAME))
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Runtime configuration of the assistant.
///
/// Resolution order: built-in defaults, then the JSON file (missing keys
/// keep their default), then command-line flags or their `MEDASSIST_*`
/// environment fallbacks (see [`crate::cli::Cli`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// Base URL of the remote assistant backend.
    pub backend_url: String,
    /// Opaque bearer token attached to every backend request.
    pub api_token: Option<String>,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Interval between two health probes.
    pub probe_interval_secs: u64,
    /// Cap on prior AI summaries sent per dispatch.
    pub max_prior_summaries: usize,
    /// Number of most recent turns sent per dispatch.
    pub recent_turn_window: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:8000".into(),
            api_token: None,
            request_timeout_secs: 60,
            connect_timeout_secs: 5,
            probe_interval_secs: 30,
            max_prior_summaries: 3,
            recent_turn_window: 10,
        }
    }
}

impl AssistantConfig {
    /// Defaults + config file. An explicit `path` must exist; the default
    /// location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::from_file(path),
            None => match config_file_path() {
                Some(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_secs(self.probe_interval_secs.max(1))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn context_limits(&self) -> ContextLimits {
        ContextLimits {
            max_prior_summaries: self.max_prior_summaries,
            recent_turn_window: self.recent_turn_window,
        }
    }
}
