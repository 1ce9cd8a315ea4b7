//! # fileslice - A Minimal Read-Only File-Access Protocol Server
//!
//! fileslice serves a single shared directory over a line-oriented TCP text
//! protocol. Clients can list the directory, query a file's size, and fetch
//! arbitrary byte ranges of a file as base64 payloads. The server never
//! writes to the filesystem.
//!
//! ## Features
//!
//! - **Line-Oriented Protocol**: CRLF-delimited 7-bit text requests and replies
//! - **Read-Only**: listing, metadata, and byte-range reads; nothing else
//! - **Async I/O**: Built on Tokio, one task per connection with a bounded cap
//! - **Deadline Framing**: a single monotonic deadline bounds each request line
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                             fileslice                               │
//! │                                                                     │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐              │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │              │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │              │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘              │
//! │                            │                  │                     │
//! │                            ▼                  ▼                     │
//! │  ┌──────────────────────────────┐    ┌─────────────────────────┐    │
//! │  │          protocol            │    │    Shared Directory     │    │
//! │  │  Request parser / validator  │    │  (read-only, immutable  │    │
//! │  │  Status catalog / Response   │    │   root per connection)  │    │
//! │  └──────────────────────────────┘    └─────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use fileslice::commands::CommandHandler;
//! use fileslice::connection::{handle_connection, ConnectionStats};
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() {
//!     let root = std::fs::canonicalize("shared").unwrap();
//!     let stats = Arc::new(ConnectionStats::new());
//!     let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//!     let listener = TcpListener::bind("0.0.0.0:19500").await.unwrap();
//!     loop {
//!         let (stream, addr) = listener.accept().await.unwrap();
//!         let handler = CommandHandler::new(root.clone());
//!         tokio::spawn(handle_connection(
//!             stream,
//!             addr,
//!             handler,
//!             Arc::clone(&stats),
//!             shutdown_rx.clone(),
//!         ));
//!     }
//! }
//! ```
//!
//! ## Protocol
//!
//! Requests are single CRLF-terminated lines: a case-insensitive verb plus
//! whitespace-separated arguments, all drawn from the token alphabet
//! `{A-Z, a-z, 0-9, '.', '-', '_', '!'}`.
//!
//! | Command | Reply |
//! |---|---|
//! | `get_file_listing` | `0 OK` + one line per entry |
//! | `get_metadata <name>` | `0 OK` + file size in bytes |
//! | `get_slice <name> <offset> <size>` | `0 OK` + base64 payload line |
//! | `quit` | `0 OK`, then the connection closes |
//!
//! Replies start with `<code> <text>`. Codes in `[100, 200)` are fatal and
//! close the connection after the reply; all others leave it open:
//!
//! ```text
//! 0   OK
//! 100 BAD EOL
//! 101 BAD REQUEST
//! 199 INTERNAL SERVER ERROR
//! 200 NO SUCH COMMAND
//! 201 INVALID ARGUMENTS FOR COMMAND
//! 202 FILE NOT FOUND
//! 203 OFFSET EXCEEDS FILE SIZE
//! 204 WAITING TIME EXCEEDED
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: request parsing, token validation, status catalog,
//!   response serialization
//! - [`commands`]: the four command behaviors against the shared directory
//! - [`connection`]: per-connection state machine, line framing, deadlines
//!
//! ## Design Highlights
//!
//! ### One Reply per Request
//!
//! Every failure is reported to the peer before the connection closes; the
//! connection layer decides termination from explicit outcomes, never from
//! the absence of a value.
//!
//! ### Confined Path Resolution
//!
//! Client-supplied names are joined to the canonicalized root and the
//! result must stay under it. Escape attempts read as `FILE NOT FOUND`,
//! indistinguishable from a missing file.
//!
//! ### Probe-Resistant Slices
//!
//! A slice range past the end of the file is answered with a fatal
//! `BAD REQUEST`, so a client cannot bisect its way to the size of a file
//! it cannot otherwise inspect.

pub mod commands;
pub mod connection;
pub mod protocol;

// Re-export commonly used types for convenience
pub use commands::{CommandHandler, Flow};
pub use connection::{handle_connection, ConnectionHandler, ConnectionStats, ReadOutcome};
pub use protocol::{Request, Response, StatusCode};

/// The default port fileslice listens on
pub const DEFAULT_PORT: u16 = 19500;

/// The default host fileslice binds to (all IPv4 interfaces)
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// The default shared directory served to clients
pub const DEFAULT_DIR: &str = "shared";

/// Version of fileslice
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
