//! Runtime configuration read from the environment
//!
//! Values come from process environment variables, optionally seeded from a
//! `.env` file by `dotenvy` in `main`.

use std::env;
use std::time::Duration;

/// Service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Port the HTTP server listens on
    pub port: u16,

    /// Path to the redb database file
    pub database_url: String,

    /// Shared API key expected in the `Authorization` header.
    /// `None` disables the check.
    pub api_key: Option<String>,

    /// User ids granted admin rights at startup
    pub admin_users: Vec<String>,

    /// Interval between progress steps of a simulated download
    pub download_tick: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: "data.db".to_string(),
            api_key: None,
            admin_users: Vec::new(),
            download_tick: Duration::from_millis(200),
        }
    }
}

impl Config {
    /// Builds the configuration from environment variables
    ///
    /// # Environment Variables
    ///
    /// - `PORT` - Server port number (default: 8080)
    /// - `DATABASE_URL` - Path to database file (default: "data.db")
    /// - `AUTHORIZATION` - Shared API key, empty or unset disables it
    /// - `ADMIN_USERS` - Comma-separated admin user ids
    /// - `DOWNLOAD_TICK_MS` - Download simulation step (default: 200)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(defaults.port);

        let database_url = env::var("DATABASE_URL").unwrap_or(defaults.database_url);

        let api_key = env::var("AUTHORIZATION").ok().filter(|k| !k.is_empty());

        let admin_users = env::var("ADMIN_USERS")
            .map(|raw| parse_list(&raw))
            .unwrap_or_default();

        let download_tick = env::var("DOWNLOAD_TICK_MS")
            .ok()
            .and_then(|ms| ms.parse().ok())
            .map(Duration::from_millis)
            .unwrap_or(defaults.download_tick);

        Self {
            port,
            database_url,
            api_key,
            admin_users,
            download_tick,
        }
    }
}

fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
