//! Command Handler Module
//!
//! This module implements the command processing layer. It receives parsed,
//! validated requests, executes them against the shared directory, and
//! returns the reply plus a connection-flow decision.
//!
//! ## Supported Commands
//!
//! - `get_file_listing` - list the shared directory, one entry per line
//! - `get_metadata <name>` - size of a file in bytes
//! - `get_slice <name> <offset> <size>` - base64-encoded byte range
//! - `quit` - acknowledge and close the connection
//!
//! Unknown verbs reply `NO SUCH COMMAND`; argument errors reply
//! `INVALID ARGUMENTS FOR COMMAND`. Both leave the connection open. The
//! slice bounds violation is the one command-level fatal path.

pub mod handler;

// Re-export the main command handler
pub use handler::{CommandHandler, Flow};
