//! Server configuration from environment variables.

use std::net::SocketAddr;
use std::time::Duration;

use mediavault_core::defaults;

/// Origin allowed when `ALLOWED_ORIGINS` is unset or empty.
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:3000";

/// Settings read at startup. Inference backends read their own variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// `None` selects the in-memory repository.
    pub database_url: Option<String>,
    /// Delay between an override being granted and the gate opening.
    pub unlock_delay: Duration,
    /// Views untouched for this long are discarded.
    pub view_idle_timeout: Duration,
    /// Origins allowed by CORS.
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: defaults::SERVER_PORT,
            database_url: None,
            unlock_delay: Duration::from_millis(defaults::UNLOCK_DELAY_MS),
            view_idle_timeout: Duration::from_secs(defaults::VIEW_IDLE_TIMEOUT_SECS),
            allowed_origins: vec![DEFAULT_ALLOWED_ORIGIN.to_string()],
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let fallback = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(fallback.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(fallback.port),
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            unlock_delay: std::env::var("MEDIAVAULT_UNLOCK_DELAY_MS")
                .ok()
                .and_then(|ms| ms.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback.unlock_delay),
            view_idle_timeout: std::env::var("MEDIAVAULT_VIEW_IDLE_SECS")
                .ok()
                .and_then(|secs| secs.parse().ok())
                .map(Duration::from_secs)
                .unwrap_or(fallback.view_idle_timeout),
            allowed_origins: std::env::var("ALLOWED_ORIGINS")
                .ok()
                .map(|v| parse_origins(&v))
                .filter(|origins| !origins.is_empty())
                .unwrap_or(fallback.allowed_origins),
        }
    }

    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        Ok(format!("{}:{}", self.host, self.port).parse()?)
    }
}

/// Split a comma-separated origin list, dropping blanks.
fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .map(String::from)
        .collect()
}
