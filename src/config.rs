//! Process configuration
//! Loaded once at startup from flags / environment and injected into components.

use crate::error::ConfigError;
use clap::Parser;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// bcrypt's accepted work factor range
const BCRYPT_COST_RANGE: std::ops::RangeInclusive<u32> = 4..=31;

#[derive(Parser, Debug, Clone)]
#[command(name = "product-api", version)]
#[command(about = "Authenticated product listing API")]
pub struct Config {
    /// SQLite database file (":memory:" for an ephemeral store)
    #[arg(long, env = "DATABASE_PATH", default_value = "product_api.db")]
    pub database_path: String,

    /// Token signing secret
    #[arg(long, env = "JWT_SECRET", hide_env_values = true)]
    pub jwt_secret: Option<String>,

    /// Listen address
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: String,

    /// bcrypt work factor for new password hashes
    #[arg(long, env = "BCRYPT_COST", default_value_t = 10)]
    pub bcrypt_cost: u32,

    /// Requests allowed per client per window on rate-limited routes
    #[arg(long, env = "RATE_LIMIT_MAX_REQUESTS", default_value_t = 100)]
    pub rate_limit_max_requests: u32,

    /// Rate limit window length in seconds
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 900)]
    pub rate_limit_window_secs: u64,
}

impl Config {
    /// Parse flags and environment, then validate.
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(std::env::args_os())
    }

    /// Like [`Config::load`] over an explicit argument list. `--help`,
    /// `--version` and malformed flags print through clap and exit.
    pub fn load_from<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let config = Self::try_parse_from(args).unwrap_or_else(|e| e.exit());
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the server must not start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.signing_secret()?;

        if !BCRYPT_COST_RANGE.contains(&self.bcrypt_cost) {
            return Err(ConfigError::InvalidBcryptCost(self.bcrypt_cost));
        }

        if self.rate_limit_window_secs == 0 {
            return Err(ConfigError::ZeroRateLimitWindow);
        }

        Ok(())
    }

    /// The token signing secret; blank counts as absent.
    pub fn signing_secret(&self) -> Result<&str, ConfigError> {
        self.jwt_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::MissingJwtSecret)
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }
}

/// Load `.env` files: the standard cwd search, then the crate directory.
pub fn load_env() {
    let _ = dotenv::dotenv();

    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}
