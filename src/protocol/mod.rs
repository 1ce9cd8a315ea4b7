//! Wire Protocol Implementation
//!
//! This module implements the line-oriented text protocol spoken between
//! clients and the server.
//!
//! ## Overview
//!
//! Requests are single CRLF-terminated lines of 7-bit text: a verb followed
//! by whitespace-separated arguments. Replies start with a status line
//! (`<code> <text>`) and may append further payload lines.
//!
//! ## Modules
//!
//! - `types`: status catalog and the `Response` type with serialization
//! - `parser`: request-line tokenization and the token character validator
//!
//! ## Example
//!
//! ```
//! use fileslice::protocol::{Request, Response, StatusCode};
//!
//! let request = Request::parse("get_metadata notes.txt").unwrap();
//! assert!(request.is_valid());
//!
//! let reply = Response::with_line(StatusCode::Ok, "29");
//! assert_eq!(reply.serialize(), b"0 OK\r\n29\r\n");
//! ```

pub mod parser;
pub mod types;

// Re-export commonly used types for convenience
pub use parser::{is_valid_char, Request};
pub use types::{Response, StatusCode, CRLF, MAX_PATH_LEN};
