use serde::Deserialize;

/// Server settings read from the environment: `PG_DSN`, `BIND_ADDR`,
/// `APP_DEBUG`.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Postgres connection string. Without it notes live in process memory.
    pub pg_dsn: Option<String>,
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Expose internal error messages in 500 responses.
    #[serde(default)]
    pub app_debug: bool,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

impl Config {
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env()
    }
}
