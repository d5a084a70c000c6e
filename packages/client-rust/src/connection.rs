//! One live TCP connection to one server endpoint.
//!
//! A [`ServerConnection`] encodes requests, writes them, and parses the
//! response -- the inverse of the server's interpreter. Exactly one request
//! is in flight at a time; the `&mut self` receivers make that structural
//! rather than a runtime error. Every exchange is bounded by the configured
//! timeout and fails with [`ClientError::Timeout`] when it expires.

use std::future::Future;
use std::time::Duration;

use minicached_core::protocol::command;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::debug;

use crate::endpoint::Endpoint;
use crate::error::{ClientError, Result};

/// Per-connection tunables.
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Bound on each request/response exchange (and the connect itself).
    pub timeout: Duration,
    /// Leave Nagle's algorithm enabled.
    pub delay: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            delay: false,
        }
    }
}

async fn timed<T>(limit: Duration, fut: impl Future<Output = Result<T>>) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Timeout),
    }
}

/// A single pipelined-one-at-a-time connection to one endpoint.
#[derive(Debug)]
pub struct ServerConnection {
    endpoint: Endpoint,
    stream: BufReader<TcpStream>,
    timeout: Duration,
}

impl ServerConnection {
    /// Opens a TCP connection to the endpoint.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Timeout`] when the connect does not
    /// complete in time, or [`ClientError::Io`] on a transport error.
    pub async fn connect(endpoint: Endpoint, options: &ConnectionOptions) -> Result<Self> {
        let connect = TcpStream::connect((endpoint.host.as_str(), endpoint.port));
        let stream = match tokio::time::timeout(options.timeout, connect).await {
            Ok(stream) => stream?,
            Err(_) => return Err(ClientError::Timeout),
        };
        if !options.delay {
            stream.set_nodelay(true)?;
        }
        debug!(address = %endpoint.address(), "connected");
        Ok(Self {
            endpoint,
            stream: BufReader::new(stream),
            timeout: options.timeout,
        })
    }

    /// The endpoint this connection talks to.
    #[must_use]
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Fetches the value bytes for `key`; `None` on a miss.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        timed(self.timeout, self.get_inner(key)).await
    }

    async fn get_inner(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        self.send(format!("get {key}\r\n").into_bytes()).await?;
        let line = self.read_line().await?;
        if line == command::END || line == command::ERROR {
            return Ok(None);
        }
        let Some(rest) = line.strip_prefix(command::VALUE_PREFIX) else {
            return Err(self.classify(line));
        };
        let length = rest
            .split_whitespace()
            .nth(2)
            .and_then(|token| token.parse::<usize>().ok())
            .ok_or_else(|| ClientError::Protocol(line.clone()))?;

        let mut data = vec![0_u8; length];
        self.stream.read_exact(&mut data).await?;
        let mut crlf = [0_u8; 2];
        self.stream.read_exact(&mut crlf).await?;

        let end = self.read_line().await?;
        if end == command::END {
            Ok(Some(data))
        } else {
            Err(ClientError::Protocol(end))
        }
    }

    /// `set`: stores unconditionally. Returns whether the server stored.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn set(&mut self, key: &str, value: &[u8], expiration_secs: i64) -> Result<bool> {
        timed(self.timeout, self.store_inner("set", key, value, expiration_secs)).await
    }

    /// `add`: stores only when absent.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn add(&mut self, key: &str, value: &[u8], expiration_secs: i64) -> Result<bool> {
        timed(self.timeout, self.store_inner("add", key, value, expiration_secs)).await
    }

    /// `replace`: stores only when present.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn replace(&mut self, key: &str, value: &[u8], expiration_secs: i64) -> Result<bool> {
        timed(
            self.timeout,
            self.store_inner("replace", key, value, expiration_secs),
        )
        .await
    }

    /// `append`: suffixes an existing value.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn append(&mut self, key: &str, value: &[u8]) -> Result<bool> {
        timed(self.timeout, self.store_inner("append", key, value, 0)).await
    }

    /// `prepend`: prefixes an existing value.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn prepend(&mut self, key: &str, value: &[u8]) -> Result<bool> {
        timed(self.timeout, self.store_inner("prepend", key, value, 0)).await
    }

    async fn store_inner(
        &mut self,
        verb: &str,
        key: &str,
        value: &[u8],
        expiration_secs: i64,
    ) -> Result<bool> {
        let mut request =
            format!("{verb} {key} 0 {expiration_secs} {}\r\n", value.len()).into_bytes();
        request.extend_from_slice(value);
        request.extend_from_slice(b"\r\n");
        self.send(request).await?;

        match self.read_line().await?.as_str() {
            command::STORED => Ok(true),
            command::NOT_STORED => Ok(false),
            other => Err(self.classify(other.to_string())),
        }
    }

    /// `delete`: removes a key. Returns whether a record was deleted.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn delete(&mut self, key: &str) -> Result<bool> {
        timed(self.timeout, async {
            self.send(format!("delete {key}\r\n").into_bytes()).await?;
            match self.read_line().await?.as_str() {
                command::DELETED => Ok(true),
                command::NOT_FOUND => Ok(false),
                other => Err(self.classify(other.to_string())),
            }
        })
        .await
    }

    /// `incr`: adds to a numeric value. `None` when the key is missing.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or with the server's verbatim
    /// `CLIENT_ERROR` for non-numeric values.
    pub async fn incr(&mut self, key: &str, amount: i64) -> Result<Option<i64>> {
        timed(self.timeout, self.counter_inner("incr", key, amount)).await
    }

    /// `decr`: subtracts from a numeric value, clamping at zero on the
    /// server. `None` when the key is missing.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or with the server's verbatim
    /// `CLIENT_ERROR` for non-numeric values.
    pub async fn decr(&mut self, key: &str, amount: i64) -> Result<Option<i64>> {
        timed(self.timeout, self.counter_inner("decr", key, amount)).await
    }

    async fn counter_inner(&mut self, verb: &str, key: &str, amount: i64) -> Result<Option<i64>> {
        self.send(format!("{verb} {key} {amount}\r\n").into_bytes())
            .await?;
        let line = self.read_line().await?;
        if line == command::NOT_FOUND {
            return Ok(None);
        }
        match line.parse::<i64>() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(self.classify(line)),
        }
    }

    /// `touch`: replaces a key's expiration. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn touch(&mut self, key: &str, expiration_secs: i64) -> Result<bool> {
        timed(self.timeout, async {
            self.send(format!("touch {key} {expiration_secs}\r\n").into_bytes())
                .await?;
            match self.read_line().await?.as_str() {
                command::TOUCHED => Ok(true),
                command::NOT_FOUND => Ok(false),
                other => Err(self.classify(other.to_string())),
            }
        })
        .await
    }

    /// `stats`: collects `(name, value)` pairs until the terminator.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn stats(&mut self) -> Result<Vec<(String, String)>> {
        timed(self.timeout, async {
            self.send(b"stats\r\n".to_vec()).await?;
            let mut entries = Vec::new();
            loop {
                let line = self.read_line().await?;
                if line == command::END {
                    return Ok(entries);
                }
                let Some(rest) = line.strip_prefix(command::STATS_PREFIX) else {
                    return Err(self.classify(line));
                };
                match rest.split_once(' ') {
                    Some((name, value)) => {
                        entries.push((name.to_string(), value.to_string()));
                    }
                    None => entries.push((rest.to_string(), String::new())),
                }
            }
        })
        .await
    }

    /// `flush`: empties the remote cache.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn flush(&mut self) -> Result<()> {
        timed(self.timeout, async {
            self.send(b"flush\r\n".to_vec()).await?;
            match self.read_line().await?.as_str() {
                command::OK => Ok(()),
                other => Err(self.classify(other.to_string())),
            }
        })
        .await
    }

    /// `version`: the server's version string, prefix stripped.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn version(&mut self) -> Result<String> {
        timed(self.timeout, async {
            self.send(b"version\r\n".to_vec()).await?;
            let line = self.read_line().await?;
            match line.strip_prefix(command::VERSION_PREFIX) {
                Some(version) => Ok(version.to_string()),
                None => Err(self.classify(line)),
            }
        })
        .await
    }

    /// Closes the connection, flushing any buffered bytes.
    ///
    /// # Errors
    ///
    /// Returns the transport error from the shutdown, if any.
    pub async fn close(mut self) -> Result<()> {
        debug!(address = %self.endpoint.address(), "closing connection");
        self.stream.get_mut().shutdown().await?;
        Ok(())
    }

    async fn send(&mut self, request: Vec<u8>) -> Result<()> {
        self.stream.write_all(&request).await?;
        Ok(())
    }

    /// Reads one CRLF-terminated line, without the terminator.
    async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = self.stream.read_line(&mut line).await?;
        if read == 0 {
            return Err(ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )));
        }
        while line.ends_with('\n') || line.ends_with('\r') {
            line.pop();
        }
        Ok(line)
    }

    /// `ERROR` and `CLIENT_ERROR` lines surface verbatim; anything else is
    /// a protocol shape violation.
    fn classify(&self, line: String) -> ClientError {
        if line == command::ERROR || line.starts_with(command::CLIENT_ERROR_PREFIX) {
            ClientError::Server(line)
        } else {
            ClientError::Protocol(line)
        }
    }
}
