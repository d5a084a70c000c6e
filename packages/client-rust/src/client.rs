//! Multi-endpoint client with weighted random dispatch.
//!
//! The client opens one [`ServerConnection`] per resolved endpoint in
//! parallel and forwards each operation to a single endpoint chosen by
//! weighted random draw. There is no cross-endpoint retry: a failure
//! surfaces to the caller unchanged.

use futures_util::future::join_all;
use rand::Rng;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::connection::{ConnectionOptions, ServerConnection};
use crate::endpoint::{pick_weighted, Locations};
use crate::error::{ClientError, Result};

/// A client dispatching over one or more server endpoints.
#[derive(Debug)]
pub struct Client {
    connections: Vec<ServerConnection>,
    weights: Vec<f64>,
}

impl Client {
    /// Resolves `locations` and connects every endpoint in parallel.
    ///
    /// Construction completes once every connection has reported; any
    /// single failure fails the whole construction.
    ///
    /// # Errors
    ///
    /// Fails with the first endpoint's connect error, or
    /// [`ClientError::NoEndpoints`] when `locations` is empty.
    pub async fn connect(
        locations: impl Into<Locations>,
        options: ConnectionOptions,
    ) -> Result<Self> {
        let endpoints = locations.into().resolve()?;
        let connects = endpoints
            .into_iter()
            .map(|endpoint| ServerConnection::connect(endpoint, &options));
        let connections = join_all(connects)
            .await
            .into_iter()
            .collect::<Result<Vec<_>>>()?;
        if connections.is_empty() {
            return Err(ClientError::NoEndpoints);
        }
        let weights = connections
            .iter()
            .map(|connection| connection.endpoint().weight)
            .collect();
        debug!(endpoints = connections.len(), "client connected");
        Ok(Self {
            connections,
            weights,
        })
    }

    /// Picks an endpoint index by weighted random draw.
    fn pick(&self) -> usize {
        if self.connections.len() == 1 {
            return 0;
        }
        let total: f64 = self.weights.iter().sum();
        let draw = rand::rng().random_range(0.0..total);
        pick_weighted(&self.weights, draw)
    }

    /// Fetches the value bytes for `key` from one endpoint.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn get(&mut self, key: &str) -> Result<Option<Vec<u8>>> {
        let index = self.pick();
        self.connections[index].get(key).await
    }

    /// Stores raw bytes unconditionally on one endpoint.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn set(&mut self, key: &str, value: &[u8], expiration_secs: i64) -> Result<bool> {
        let index = self.pick();
        self.connections[index].set(key, value, expiration_secs).await
    }

    /// Stores only when absent.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn add(&mut self, key: &str, value: &[u8], expiration_secs: i64) -> Result<bool> {
        let index = self.pick();
        self.connections[index].add(key, value, expiration_secs).await
    }

    /// Stores only when present.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn replace(&mut self, key: &str, value: &[u8], expiration_secs: i64) -> Result<bool> {
        let index = self.pick();
        self.connections[index]
            .replace(key, value, expiration_secs)
            .await
    }

    /// Suffixes an existing value.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn append(&mut self, key: &str, value: &[u8]) -> Result<bool> {
        let index = self.pick();
        self.connections[index].append(key, value).await
    }

    /// Prefixes an existing value.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn prepend(&mut self, key: &str, value: &[u8]) -> Result<bool> {
        let index = self.pick();
        self.connections[index].prepend(key, value).await
    }

    /// Removes a key from one endpoint.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn delete(&mut self, key: &str) -> Result<bool> {
        let index = self.pick();
        self.connections[index].delete(key).await
    }

    /// Adds to a numeric value.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or with the server's verbatim
    /// `CLIENT_ERROR` for non-numeric values.
    pub async fn incr(&mut self, key: &str, amount: i64) -> Result<Option<i64>> {
        let index = self.pick();
        self.connections[index].incr(key, amount).await
    }

    /// Subtracts from a numeric value (clamped at zero server-side).
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or with the server's verbatim
    /// `CLIENT_ERROR` for non-numeric values.
    pub async fn decr(&mut self, key: &str, amount: i64) -> Result<Option<i64>> {
        let index = self.pick();
        self.connections[index].decr(key, amount).await
    }

    /// Replaces a key's expiration.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn touch(&mut self, key: &str, expiration_secs: i64) -> Result<bool> {
        let index = self.pick();
        self.connections[index].touch(key, expiration_secs).await
    }

    /// Reads the stats of one endpoint.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn stats(&mut self) -> Result<Vec<(String, String)>> {
        let index = self.pick();
        self.connections[index].stats().await
    }

    /// Empties one endpoint's cache.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn flush(&mut self) -> Result<()> {
        let index = self.pick();
        self.connections[index].flush().await
    }

    /// Reads the version string of one endpoint.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or a malformed response.
    pub async fn version(&mut self) -> Result<String> {
        let index = self.pick();
        self.connections[index].version().await
    }

    /// Stores a structured value as its JSON serialization.
    ///
    /// # Errors
    ///
    /// Fails on serialization, timeout, or transport errors.
    pub async fn set_item<T: Serialize>(
        &mut self,
        key: &str,
        value: &T,
        expiration_secs: i64,
    ) -> Result<bool> {
        let bytes = serde_json::to_vec(value)?;
        self.set(key, &bytes, expiration_secs).await
    }

    /// Fetches a value with opportunistic decoding: a payload shaped like a
    /// JSON object is parsed, and anything else (including a `{...}` payload
    /// that fails to parse) is surfaced as its raw text. Values written
    /// with raw [`Client::set`] therefore read back as text rather than a
    /// decode error.
    ///
    /// # Errors
    ///
    /// Fails on timeout, transport errors, or when the payload fits neither
    /// `T` nor raw text.
    pub async fn get_item<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>> {
        match self.get(key).await? {
            None => Ok(None),
            Some(bytes) => Ok(Some(minicached_core::decode_item(&bytes)?)),
        }
    }

    /// Closes every connection in parallel, reporting the first failure.
    ///
    /// # Errors
    ///
    /// Returns the first close error, after attempting every close.
    pub async fn end(self) -> Result<()> {
        let closes = self.connections.into_iter().map(ServerConnection::close);
        for result in join_all(closes).await {
            result?;
        }
        Ok(())
    }
}
