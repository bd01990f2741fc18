use crate::anomaly::Grouping;
use crate::errors::{Error, Result};
use std::env;
use std::time::Duration;

/// Load a `.env` file if one is present.
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub http_addr: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub grouping: Grouping,
}

impl Config {
    /// Reads the service configuration from the environment.
    ///
    /// `default_addr` differs per service. An unknown `ANOMALY_GROUPING` is
    /// a startup error rather than a silent fallback.
    pub fn from_env(default_addr: &str) -> Result<Self> {
        let grouping = match env::var("ANOMALY_GROUPING") {
            Ok(raw) if !raw.is_empty() => raw.parse().map_err(Error::Config)?,
            _ => Grouping::default(),
        };

        Ok(Config {
            database_url: env_or(
                "DATABASE_URL",
                "mysql://dashboard@localhost:3306/hydralytica_dashboard",
            ),
            http_addr: env_or("HTTP_ADDR", default_addr),
            max_connections: env_parse("DB_MAX_CONNECTIONS", 20),
            acquire_timeout: Duration::from_secs(env_parse("DB_ACQUIRE_TIMEOUT_SECS", 30)),
            grouping,
        })
    }

    /// Database URL with credentials stripped, for logging.
    pub fn database_display(&self) -> &str {
        self.database_url.split('@').last().unwrap_or("***")
    }
}
