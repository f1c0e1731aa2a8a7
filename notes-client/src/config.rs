use std::{env, fs, path::Path, time::Duration};

use reqwest::Method;
use serde::Deserialize;

use crate::resilience::RetryPolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// Base URL of the notes API, including the `/api` prefix.
    pub api_url: String,
    pub timeouts: Timeouts,
    pub retry: RetryConfig,
    /// How long a success notice stays visible.
    #[serde(with = "humantime_serde")]
    pub notice_ttl: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeouts: Timeouts::default(),
            retry: RetryConfig::default(),
            notice_ttl: Duration::from_secs(3),
        }
    }
}

/// Per-verb request timeouts, used unless the caller passes its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Timeouts {
    #[serde(with = "humantime_serde")]
    pub read: Duration,
    #[serde(with = "humantime_serde")]
    pub write: Duration,
    #[serde(with = "humantime_serde")]
    pub delete: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            read: Duration::from_secs(30),
            write: Duration::from_secs(20),
            delete: Duration::from_secs(15),
        }
    }
}

impl Timeouts {
    pub fn for_method(&self, method: &Method) -> Duration {
        match *method {
            Method::GET => self.read,
            Method::POST | Method::PUT => self.write,
            _ => self.delete,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_retries: u32,
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            base_delay: policy.base_delay,
        }
    }
}

impl From<RetryConfig> for RetryPolicy {
    fn from(cfg: RetryConfig) -> Self {
        Self {
            max_retries: cfg.max_retries,
            base_delay: cfg.base_delay,
            ..Self::default()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config YAML: {0}")]
    Parse(#[from] serde_yaml::Error),
}

fn from_file(path: &Path) -> Result<ClientConfig, ConfigError> {
    let contents = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&contents)?)
}

/// Loads the client configuration.
///
/// Looks at `NOTES_CLIENT_CONFIG`, then `config.yaml`, then falls back to the
/// built-in defaults. `NOTES_API_URL` overrides the API URL in every case.
pub fn load_config() -> Result<ClientConfig, ConfigError> {
    let requested = env::var("NOTES_CLIENT_CONFIG").ok();

    let mut config = if let Some(path) = requested.as_deref().filter(|p| Path::new(p).exists()) {
        from_file(Path::new(path))?
    } else if Path::new("config.yaml").exists() {
        if let Some(path) = &requested {
            tracing::warn!(
                "Config file '{}' not found, falling back to 'config.yaml'",
                path
            );
        }
        from_file(Path::new("config.yaml"))?
    } else {
        tracing::debug!("No config file found, using built-in defaults");
        ClientConfig::default()
    };

    if let Ok(api_url) = env::var("NOTES_API_URL") {
        config.api_url = api_url;
    }

    Ok(config)
}
