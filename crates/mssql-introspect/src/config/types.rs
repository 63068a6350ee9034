//! Configuration type definitions.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Loader configuration as supplied by the host at prepare time.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoaderConfig {
    /// Server address: `host`, `host:port`, `host,port` or `host\instance`.
    pub server: String,

    /// Database name.
    pub database_name: String,

    /// Login, optionally prefixed with a Windows domain (`DOMAIN\user`).
    pub user_name: String,

    /// Password.
    pub password: String,

    /// Connection pool bounds.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Encrypt the TDS stream (default: false).
    #[serde(default)]
    pub encrypt: bool,

    /// Trust the server certificate when encrypting (default: true).
    #[serde(default = "default_true")]
    pub trust_server_cert: bool,

    /// Application name reported to the server.
    #[serde(default = "default_app_name")]
    pub app_name: String,
}

impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("server", &self.server)
            .field("database_name", &self.database_name)
            .field("user_name", &self.user_name)
            .field("password", &"[REDACTED]")
            .field("pool", &self.pool)
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .field("app_name", &self.app_name)
            .finish()
    }
}

/// Connection pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
    /// Idle connections kept open (default: 10).
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Upper bound on live connections (default: 30).
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Seconds an acquire may wait before failing (default: 30).
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: default_min_connections(),
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

// Default value functions for serde
fn default_true() -> bool {
    true
}

fn default_app_name() -> String {
    env!("CARGO_PKG_NAME").to_string()
}

fn default_min_connections() -> u32 {
    10
}

fn default_max_connections() -> u32 {
    30
}

fn default_acquire_timeout_secs() -> u64 {
    30
}
