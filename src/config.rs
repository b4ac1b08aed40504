use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

const ENV_PREFIX: &str = "URLSCAN";

/// Runtime settings, read from `URLSCAN_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// XGBoost JSON model artifact.
    pub model_path: PathBuf,
    /// Listen address for `serve`.
    pub bind: String,
    /// Outbound page fetch timeout. Unset means wait indefinitely.
    pub fetch_timeout_secs: Option<u64>,
    /// User-Agent for the page fetch. Unset keeps the client default.
    pub user_agent: Option<String>,
}

impl Settings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_env(Environment::with_prefix(ENV_PREFIX))
    }

    fn from_env(env: Environment) -> Result<Self, ConfigError> {
        Config::builder()
            .set_default("model_path", "model.json")?
            .set_default("bind", "0.0.0.0:5000")?
            .add_source(env.try_parsing(true))
            .build()?
            .try_deserialize()
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_secs.map(Duration::from_secs)
    }
}
