//! Server configuration, read from the environment.

use serde::{Deserialize, Serialize};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Canteen server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// PostgreSQL configuration; in-memory storage when absent
    pub postgres: Option<PostgresConfig>,
    /// Engine tunables
    pub engine: EngineSettings,
}

/// HTTP server configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: IpAddr,
    /// API port
    pub port: u16,
    /// Default log filter level, used when `RUST_LOG` is unset
    pub log_level: String,
    /// Prometheus scrape port; metrics are off when absent
    pub metrics_port: Option<u16>,
    /// Seed the demo bearer tokens
    pub demo_tokens: bool,
}

/// PostgreSQL configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// Connection URL
    pub url: String,
    /// Pool size
    pub max_connections: u32,
}

// The URL usually carries a password.
impl std::fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("url", &"***")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// Engine tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Attempts per read-reduce-write cycle
    pub cas_attempts: usize,
}

fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn flag(name: &str, default: bool) -> bool {
    env::var(name).ok().map_or(default, |s| {
        matches!(s.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    })
}

impl Config {
    /// Load configuration from environment variables, with defaults.
    ///
    /// | Variable | Default |
    /// |---|---|
    /// | `CANTEEN_HOST` | `0.0.0.0` |
    /// | `CANTEEN_PORT` | `3000` |
    /// | `CANTEEN_LOG_LEVEL` | `info` |
    /// | `CANTEEN_METRICS_PORT` | unset |
    /// | `CANTEEN_DEMO_TOKENS` | `true` |
    /// | `DATABASE_URL` | unset |
    /// | `DATABASE_MAX_CONNECTIONS` | `10` |
    /// | `CANTEEN_CAS_ATTEMPTS` | `8` |
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: parsed("CANTEEN_HOST").unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
                port: parsed("CANTEEN_PORT").unwrap_or(3000),
                log_level: env::var("CANTEEN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                metrics_port: parsed("CANTEEN_METRICS_PORT"),
                demo_tokens: flag("CANTEEN_DEMO_TOKENS", true),
            },
            postgres: env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty())
                .map(|url| PostgresConfig {
                    url,
                    max_connections: parsed("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
                }),
            engine: EngineSettings {
                cas_attempts: parsed("CANTEEN_CAS_ATTEMPTS").unwrap_or(8),
            },
        }
    }

    /// API listen address.
    #[must_use]
    pub const fn server_addr(&self) -> SocketAddr {
        SocketAddr::new(self.server.host, self.server.port)
    }

    /// Metrics listen address, if metrics are enabled.
    #[must_use]
    pub fn metrics_addr(&self) -> Option<SocketAddr> {
        self.server
            .metrics_port
            .map(|port| SocketAddr::new(self.server.host, port))
    }

    /// Default tracing filter when `RUST_LOG` is unset.
    #[must_use]
    pub fn default_log_filter(&self) -> String {
        format!("canteen={},tower_http=debug", self.server.log_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_addresses() {
        let config = Config {
            server: ServerConfig {
                host: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 3000,
                log_level: "debug".into(),
                metrics_port: Some(9090),
                demo_tokens: true,
            },
            postgres: None,
            engine: EngineSettings { cas_attempts: 8 },
        };

        assert_eq!(config.server_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(
            config.metrics_addr().map(|a| a.to_string()),
            Some("127.0.0.1:9090".to_string())
        );
        assert_eq!(config.default_log_filter(), "canteen=debug,tower_http=debug");
    }

    #[test]
    fn test_database_url_is_not_logged() {
        let pg = PostgresConfig {
            url: "postgres://canteen:secret@db/canteen".into(),
            max_connections: 10,
        };
        assert!(!format!("{pg:?}").contains("secret"));
    }
}
