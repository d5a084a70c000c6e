//! `minicached` server -- TCP server speaking the memcached text protocol.
//!
//! The server owns one [`Cache`](minicached_core::Cache) and accepts
//! connections on a single listener; every accepted socket gets an isolated
//! parser + interpreter task. See [`network::Server`] for the lifecycle.

pub mod config;
pub mod network;

pub use config::{ServerConfig, DEFAULT_PORT};
pub use network::Server;
