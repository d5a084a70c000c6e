//! TCP networking: listener lifecycle, per-connection loops, graceful
//! shutdown.

pub mod connection;
pub mod module;
pub mod shutdown;

pub use connection::serve_connection;
pub use module::Server;
pub use shutdown::{ConnectionToken, ShutdownCoordinator};
