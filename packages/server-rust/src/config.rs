//! Server configuration types.

use std::time::Duration;

use minicached_core::CacheLimit;

/// The memcached default port.
pub const DEFAULT_PORT: u16 = 11211;

/// Top-level configuration for the TCP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address for the listener.
    pub host: String,
    /// Port to listen on. 0 means OS-assigned.
    pub port: u16,
    /// Leave Nagle's algorithm enabled on accepted sockets.
    pub delay: bool,
    /// Reply the literal `ERROR` to every incoming chunk without parsing.
    pub fast: bool,
    /// Capacity bound applied by the purge pass.
    pub limit: CacheLimit,
    /// Maximum time to wait for live connections to finish on shutdown.
    pub drain_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            delay: false,
            fast: false,
            limit: CacheLimit::Unbounded,
            drain_timeout: Duration::from_secs(30),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 11211);
        assert!(!config.delay);
        assert!(!config.fast);
        assert_eq!(config.limit, CacheLimit::Unbounded);
        assert_eq!(config.drain_timeout, Duration::from_secs(30));
    }
}
