//! Connection Handling Module
//!
//! Each accepted client is handled by its own async task running the
//! per-connection state machine: read one CRLF-terminated request line
//! under a deadline, validate it, dispatch it, send the reply, and loop
//! until a fatal status, a `quit`, a disconnect, or server shutdown.
//!
//! ## Features
//!
//! - **Async I/O**: Tokio streams, no blocking receive
//! - **Deadline framing**: one monotonic deadline per request line
//! - **Pipelining**: bytes after a delimiter are kept for the next request
//! - **Cancellation**: a watch channel signals server shutdown
//! - **Statistics**: shared counters for connections, commands, and bytes
//!
//! ## Example
//!
//! ```ignore
//! use fileslice::commands::CommandHandler;
//! use fileslice::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! let stats = Arc::new(ConnectionStats::new());
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! let handler = CommandHandler::new(root.clone());
//! tokio::spawn(handle_connection(stream, addr, handler, stats, shutdown_rx));
//! ```

pub mod handler;

// Re-export commonly used types
pub use handler::{
    handle_connection, ConnectionError, ConnectionHandler, ConnectionStats, ReadOutcome,
    LINE_DEADLINE,
};
