//! Command-line arguments of the console host.
//!
//! Every flag falls back to a `MEDASSIST_*` environment variable and, when
//! both are absent, to the JSON config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{AssistantConfig, ConfigError};

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(
    name = "medassist",
    about = "Consultation assistant console for one patient record",
    version
)]
pub struct Cli {
    /// Patient record JSON (consultation plus prior AI summaries)
    #[arg(value_name = "PATH")]
    pub record: PathBuf,

    /// Config file used instead of ~/MedAssist/assistant.json
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Base URL of the assistant backend
    #[arg(long, env = "MEDASSIST_BACKEND_URL", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Bearer token sent with every backend request (empty clears it)
    #[arg(long, env = "MEDASSIST_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// Seconds between two health probes
    #[arg(
        long,
        env = "MEDASSIST_PROBE_INTERVAL_SECS",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub probe_interval_secs: Option<u64>,

    /// Per-request timeout in seconds
    #[arg(
        long,
        env = "MEDASSIST_REQUEST_TIMEOUT_SECS",
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub request_timeout_secs: Option<u64>,
}

impl Cli {
    /// Defaults, then the config file, then these arguments.
    pub fn resolve_config(&self) -> Result<AssistantConfig, ConfigError> {
        let mut config = AssistantConfig::load(self.config.as_deref())?;
        self.apply(&mut config);
        tracing::debug!(backend = %config.backend_url, "Assistant configuration resolved");
        Ok(config)
    }

    /// Layer the flags that were given over `config`.
    pub fn apply(&self, config: &mut AssistantConfig) {
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(token) = &self.api_token {
            config.api_token = Some(token.clone()).filter(|t| !t.is_empty());
        }
        if let Some(secs) = self.probe_interval_secs {
            config.probe_interval_secs = secs;
        }
        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout_secs = secs;
        }
    }
}
