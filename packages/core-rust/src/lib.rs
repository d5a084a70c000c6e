//! `minicached` core -- cache engine, wire protocol, and embedded API.
//!
//! This crate provides the runtime-free foundation shared by the server and
//! the client:
//!
//! - **Clock** ([`clock`]): wall-clock seam driving expiration checks
//! - **Memory** ([`memory`]): resident-set-size seam for size-bounded eviction
//! - **Record** ([`record`]): value + flags + absolute expiration
//! - **Cache** ([`cache`]): keyed record store with atomic mutations and
//!   FIFO eviction
//! - **Protocol** ([`protocol`]): command syntax table, streaming line
//!   parser, and interpreter
//! - **Embedded** ([`embedded`]): process-wide default cache with typed
//!   item adapters

pub mod cache;
pub mod clock;
pub mod embedded;
pub mod memory;
pub mod protocol;
pub mod record;

// Cache
pub use cache::{Cache, CacheError, CacheLimit, APP_NAME};

// Embedded item decoding (shared with the client)
pub use embedded::decode_item;

// Clock and memory seams
pub use clock::{ClockSource, SystemClock};
pub use memory::{MemoryGauge, ProcessMemory};

// Record
pub use record::{Record, RELATIVE_EXPIRATION_LIMIT_SECS};

// Protocol
pub use protocol::command::{Argument, ParamKind, Request, Syntax, Verb};
pub use protocol::interpreter::{Interpreter, Reply};
pub use protocol::parser::{LineParser, ParserEvent, WireError};
