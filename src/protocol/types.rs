//! Protocol Status Catalog and Response Types
//!
//! This module defines the status codes of the wire protocol and the
//! `Response` type that carries a status line plus optional payload lines.
//!
//! ## Wire Format
//!
//! Every reply starts with a status line of the form `<code> <text>`,
//! terminated by CRLF. Some commands append further CRLF-terminated lines:
//!
//! ```text
//! get_metadata notes.txt          ->  0 OK
//!                                     29
//! get_slice notes.txt 5 20        ->  0 OK
//!                                     Y2Fsb3IgcXVlIGhhY2UgaG95LCA=
//! get_file_listing                ->  0 OK
//!                                     a.txt
//!                                     b.txt
//! frobnicate                      ->  200 NO SUCH COMMAND
//! ```
//!
//! ## Fatality
//!
//! Status codes partition into two severities. Codes in `[100, 200)` are
//! fatal: the connection closes right after the reply is sent. Every other
//! code leaves the connection open for further commands.

use std::fmt;

/// The CRLF terminator ending every protocol line
pub const CRLF: &[u8] = b"\r\n";

/// Longest file name `get_metadata` accepts, in bytes.
/// Longer names read as absent rather than as an argument error.
pub const MAX_PATH_LEN: usize = 255;

/// Status codes of the wire protocol.
///
/// Each code has a fixed numeric value and canonical text; `Display`
/// renders the full status line (`0 OK`, `202 FILE NOT FOUND`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The request was served
    Ok,
    /// A bare line feed appeared inside a request line
    BadEol,
    /// Malformed request: bad characters, undecodable bytes, a truncated
    /// line, or a slice range past the end of the file
    BadRequest,
    /// An unexpected server-side fault
    InternalError,
    /// The verb is not one of the recognized commands
    InvalidCommand,
    /// The argument count or format does not match the command
    InvalidArguments,
    /// The named file does not exist under the shared directory
    FileNotFound,
    /// Reserved for slice offsets past the end of the file
    BadOffset,
    /// The request line did not arrive before the deadline
    Timeout,
}

impl StatusCode {
    /// Every status code, in numeric order.
    pub const ALL: [StatusCode; 9] = [
        StatusCode::Ok,
        StatusCode::BadEol,
        StatusCode::BadRequest,
        StatusCode::InternalError,
        StatusCode::InvalidCommand,
        StatusCode::InvalidArguments,
        StatusCode::FileNotFound,
        StatusCode::BadOffset,
        StatusCode::Timeout,
    ];

    /// The numeric value sent on the wire.
    pub const fn code(self) -> u16 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::BadEol => 100,
            StatusCode::BadRequest => 101,
            StatusCode::InternalError => 199,
            StatusCode::InvalidCommand => 200,
            StatusCode::InvalidArguments => 201,
            StatusCode::FileNotFound => 202,
            StatusCode::BadOffset => 203,
            StatusCode::Timeout => 204,
        }
    }

    /// The canonical text sent after the numeric value.
    pub const fn text(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadEol => "BAD EOL",
            StatusCode::BadRequest => "BAD REQUEST",
            StatusCode::InternalError => "INTERNAL SERVER ERROR",
            StatusCode::InvalidCommand => "NO SUCH COMMAND",
            StatusCode::InvalidArguments => "INVALID ARGUMENTS FOR COMMAND",
            StatusCode::FileNotFound => "FILE NOT FOUND",
            StatusCode::BadOffset => "OFFSET EXCEEDS FILE SIZE",
            StatusCode::Timeout => "WAITING TIME EXCEEDED",
        }
    }

    /// True when the connection must close after this status is sent.
    pub const fn is_fatal(self) -> bool {
        let code = self.code();
        100 <= code && code < 200
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code(), self.text())
    }
}

/// A single protocol reply: a status line plus zero or more payload lines.
///
/// Commands build a `Response` and the connection layer serializes it onto
/// the socket in one write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: StatusCode,
    lines: Vec<String>,
}

impl Response {
    /// A reply holding only the status line.
    pub fn status(status: StatusCode) -> Self {
        Self {
            status,
            lines: Vec::new(),
        }
    }

    /// A reply with one payload line after the status line.
    pub fn with_line(status: StatusCode, line: impl Into<String>) -> Self {
        Self {
            status,
            lines: vec![line.into()],
        }
    }

    /// A reply with any number of payload lines after the status line.
    pub fn with_lines(status: StatusCode, lines: Vec<String>) -> Self {
        Self { status, lines }
    }

    /// Shorthand for a bare `0 OK` reply.
    pub fn ok() -> Self {
        Self::status(StatusCode::Ok)
    }

    /// The status this reply carries.
    pub fn code(&self) -> StatusCode {
        self.status
    }

    /// The payload lines following the status line.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Serializes the reply to bytes for sending over the wire.
    pub fn serialize(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        self.serialize_into(&mut buf);
        buf
    }

    /// Serializes the reply into an existing buffer.
    ///
    /// This is more efficient than `serialize()` when you want to reuse a
    /// buffer.
    pub fn serialize_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.status.to_string().as_bytes());
        buf.extend_from_slice(CRLF);
        for line in &self.lines {
            buf.extend_from_slice(line.as_bytes());
            buf.extend_from_slice(CRLF);
        }
    }
}
