//! `minicached` client -- multi-endpoint dispatcher for the memcached text
//! protocol.
//!
//! - [`endpoint`]: location parsing and weighted selection
//! - [`connection`]: one request-at-a-time protocol connection
//! - [`client`]: the multi-endpoint dispatcher with typed item adapters
//!
//! ```no_run
//! use minicached_client::{Client, ConnectionOptions};
//!
//! # async fn example() -> minicached_client::Result<()> {
//! let mut client = Client::connect("127.0.0.1:11211", ConnectionOptions::default()).await?;
//! client.set("greeting", b"hello", 0).await?;
//! assert_eq!(client.get("greeting").await?, Some(b"hello".to_vec()));
//! client.end().await
//! # }
//! ```

pub mod client;
pub mod connection;
pub mod endpoint;
pub mod error;

pub use client::Client;
pub use connection::{ConnectionOptions, ServerConnection};
pub use endpoint::{Endpoint, Locations, DEFAULT_PORT};
pub use error::{ClientError, Result};
