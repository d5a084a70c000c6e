//! Server lifecycle with deferred startup.
//!
//! `new()` allocates shared state, `start()` binds the TCP listener, and
//! `serve()` accepts connections until the shutdown future resolves. The
//! separation lets callers learn the actual bound port (port 0 is
//! OS-assigned) and share the cache before any connection is accepted.

use std::future::Future;
use std::sync::Arc;

use minicached_core::Cache;
use tokio::net::TcpListener;
use tracing::{info, warn};

use super::connection::serve_connection;
use super::shutdown::ShutdownCoordinator;
use crate::config::ServerConfig;

/// Owns the listening socket, the shared cache, and the set of live
/// connection tasks.
pub struct Server {
    config: ServerConfig,
    cache: Arc<Cache>,
    listener: Option<TcpListener>,
}

impl Server {
    /// Creates a server without binding any port.
    #[must_use]
    pub fn new(config: ServerConfig, cache: Arc<Cache>) -> Self {
        Self {
            config,
            cache,
            listener: None,
        }
    }

    /// Returns a shared handle to the cache this server owns.
    #[must_use]
    pub fn cache(&self) -> Arc<Cache> {
        Arc::clone(&self.cache)
    }

    /// Binds the TCP listener to the configured host and port.
    ///
    /// Returns the actual bound port, which may differ from the configured
    /// port when port 0 is used. The port is also recorded on the cache for
    /// the `tcpport` stats key.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound (e.g. port in use).
    pub async fn start(&mut self) -> anyhow::Result<u16> {
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&addr).await?;
        let port = listener.local_addr()?.port();
        self.cache.set_port(port);

        info!("listening on {}:{}", self.config.host, port);

        self.listener = Some(listener);
        Ok(port)
    }

    /// Accepts connections until `shutdown` resolves, then drains.
    ///
    /// Consumes `self` because the listener moves into the accept loop.
    /// After the shutdown future fires:
    /// 1. live connection tasks are signalled to close
    /// 2. the listener is dropped, so no new connections are accepted
    /// 3. waits up to `drain_timeout` for every connection task to finish
    ///
    /// # Errors
    ///
    /// Returns an error on a fatal listener I/O failure.
    ///
    /// # Panics
    ///
    /// Panics if `start()` was not called before `serve()`.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let listener = self
            .listener
            .expect("start() must be called before serve()");
        let config = self.config;
        let cache = self.cache;
        let coordinator = ShutdownCoordinator::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    coordinator.signal();
                    break;
                }
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            if !config.delay {
                                if let Err(error) = stream.set_nodelay(true) {
                                    warn!(%addr, %error, "failed to disable Nagle");
                                }
                            }
                            let token = coordinator.subscribe();
                            let cache = Arc::clone(&cache);
                            let fast = config.fast;
                            tokio::spawn(serve_connection(stream, cache, fast, token));
                        }
                        Err(error) => {
                            warn!(%error, "accept failed");
                        }
                    }
                }
            }
        }

        // Dropping the listener closes the accepting socket immediately.
        drop(listener);

        if coordinator.drain(config.drain_timeout).await {
            info!("all connections drained");
        } else {
            warn!("drain timeout expired with connections still open");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use minicached_core::CacheLimit;

    use super::*;

    fn test_server() -> Server {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            ..ServerConfig::default()
        };
        let cache = Arc::new(Cache::new(CacheLimit::Unbounded));
        Server::new(config, cache)
    }

    #[test]
    fn new_creates_server_without_binding() {
        let server = test_server();
        assert!(server.listener.is_none());
    }

    #[test]
    fn cache_is_a_shared_arc() {
        let server = test_server();
        assert!(Arc::ptr_eq(&server.cache(), &server.cache()));
    }

    #[tokio::test]
    async fn start_binds_an_os_assigned_port() {
        let mut server = test_server();
        let port = server.start().await.expect("start should succeed");
        assert!(port > 0);
        assert!(server.listener.is_some());
    }

    #[tokio::test]
    async fn start_records_the_port_for_stats() {
        let mut server = test_server();
        let port = server.start().await.expect("start should succeed");
        let stats = server.cache().stats();
        let tcpport = stats
            .iter()
            .find(|(name, _)| *name == "tcpport")
            .map(|(_, value)| value.clone());
        assert_eq!(tcpport, Some(port.to_string()));
    }

    #[tokio::test]
    async fn start_fails_when_the_port_is_taken() {
        let mut first = test_server();
        let port = first.start().await.expect("first bind succeeds");

        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port,
            ..ServerConfig::default()
        };
        let cache = Arc::new(Cache::new(CacheLimit::Unbounded));
        let mut second = Server::new(config, cache);
        assert!(second.start().await.is_err());
    }

    #[tokio::test]
    #[should_panic(expected = "start() must be called before serve()")]
    async fn serve_panics_without_start() {
        let server = test_server();
        let _ = server.serve(std::future::pending::<()>()).await;
    }
}
