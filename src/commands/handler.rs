//! Command Handler Module
//!
//! This module implements the four protocol commands. It receives parsed,
//! validated requests from the connection layer, executes them against the
//! shared directory, and returns the reply together with a connection-flow
//! decision.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Line Reader    │  (connection module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Dispatch     │
//! │  - Resolve path │
//! │  - Execute      │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │   Filesystem    │  (shared directory, read-only)
//! └─────────────────┘
//! ```
//!
//! ## Supported Commands
//!
//! - `get_file_listing` - one line per entry of the shared directory
//! - `get_metadata <name>` - the file's size in bytes
//! - `get_slice <name> <offset> <size>` - base64 payload of the byte range
//! - `quit` - acknowledge and close the connection
//!
//! ## Error Severities
//!
//! Argument errors, unknown verbs, and missing files reply with non-fatal
//! statuses and leave the connection open. A slice range past the end of
//! the file replies `BAD REQUEST` and forces the connection closed, so the
//! file size cannot be probed by bisection. Unexpected filesystem faults
//! bubble up as `io::Error` for the connection layer to report as
//! `INTERNAL SERVER ERROR`.

use crate::protocol::{Request, Response, StatusCode, MAX_PATH_LEN};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use std::io::{self, ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::warn;

/// Whether the connection remains usable after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Keep reading requests on this connection
    Continue,
    /// Close the connection once the reply is sent
    Close,
}

/// Executes protocol commands against the shared directory.
///
/// One handler is created per connection; it holds the canonicalized root
/// path, which is immutable for the connection's lifetime.
#[derive(Debug, Clone)]
pub struct CommandHandler {
    /// Canonicalized shared-directory root
    root: PathBuf,
}

impl CommandHandler {
    /// Creates a handler serving `root`.
    ///
    /// The caller canonicalizes the path once at startup; every file
    /// reference a client supplies is resolved under it and confined to it.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The shared directory this handler serves.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Executes one validated request.
    ///
    /// Returns the reply to send and whether the connection remains usable
    /// afterwards. Only protocol-level outcomes are encoded in the
    /// `Response`; unexpected filesystem faults are propagated with `?`.
    pub async fn execute(&self, request: &Request) -> io::Result<(Response, Flow)> {
        match request.verb().as_str() {
            "quit" => Ok(self.cmd_quit(request.args())),
            "get_metadata" => self.cmd_get_metadata(request.args()).await,
            "get_slice" => self.cmd_get_slice(request.args()).await,
            "get_file_listing" => self.cmd_get_file_listing().await,
            _ => Ok((
                Response::status(StatusCode::InvalidCommand),
                Flow::Continue,
            )),
        }
    }

    /// Resolves a client-supplied name under the root.
    ///
    /// Returns `None` when the file does not exist, or when the canonical
    /// path escapes the root (`..` components, symlinks pointing outside).
    /// Escapes read as absent, keeping the wire behavior of a plain missing
    /// file.
    async fn resolve(&self, name: &str) -> io::Result<Option<PathBuf>> {
        match tokio::fs::canonicalize(self.root.join(name)).await {
            Ok(path) if path.starts_with(&self.root) => Ok(Some(path)),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// `quit` - acknowledge and close.
    ///
    /// Extra arguments are rejected with `INVALID ARGUMENTS FOR COMMAND`
    /// but, unlike every other argument error, leave the connection open
    /// awaiting the next command.
    fn cmd_quit(&self, args: &[String]) -> (Response, Flow) {
        if !args.is_empty() {
            return (
                Response::status(StatusCode::InvalidArguments),
                Flow::Continue,
            );
        }
        (Response::ok(), Flow::Close)
    }

    /// `get_metadata <name>` - `0 OK` followed by the file size in bytes.
    async fn cmd_get_metadata(&self, args: &[String]) -> io::Result<(Response, Flow)> {
        if args.len() != 1 {
            return Ok((
                Response::status(StatusCode::InvalidArguments),
                Flow::Continue,
            ));
        }

        let name = &args[0];
        // Oversized names read as absent rather than as an argument error.
        if name.len() > MAX_PATH_LEN {
            return Ok((Response::status(StatusCode::FileNotFound), Flow::Continue));
        }

        let path = match self.resolve(name).await? {
            Some(path) => path,
            None => return Ok((Response::status(StatusCode::FileNotFound), Flow::Continue)),
        };

        let size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok((Response::status(StatusCode::FileNotFound), Flow::Continue));
            }
            Err(e) => return Err(e),
        };

        Ok((
            Response::with_line(StatusCode::Ok, size.to_string()),
            Flow::Continue,
        ))
    }

    /// `get_slice <name> <offset> <size>` - `0 OK` followed by the base64
    /// payload of bytes `[offset, offset + size)`.
    ///
    /// The range must lie entirely within the file when the size check
    /// runs; a range past the end replies `BAD REQUEST` and forces the
    /// connection closed. The size check and the read are not atomic with
    /// respect to concurrent external modification of the file, so a short
    /// read at end-of-file is served as-is rather than treated as an error.
    async fn cmd_get_slice(&self, args: &[String]) -> io::Result<(Response, Flow)> {
        if args.len() != 3 {
            return Ok((
                Response::status(StatusCode::InvalidArguments),
                Flow::Continue,
            ));
        }

        // Both numbers must parse and be non-negative before any
        // filesystem access happens.
        let (offset, size) = match (args[1].parse::<i64>(), args[2].parse::<i64>()) {
            (Ok(offset), Ok(size)) if offset >= 0 && size >= 0 => (offset as u64, size as u64),
            _ => {
                return Ok((
                    Response::status(StatusCode::InvalidArguments),
                    Flow::Continue,
                ));
            }
        };

        let path = match self.resolve(&args[0]).await? {
            Some(path) => path,
            None => return Ok((Response::status(StatusCode::FileNotFound), Flow::Continue)),
        };

        let file_size = match tokio::fs::metadata(&path).await {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok((Response::status(StatusCode::FileNotFound), Flow::Continue));
            }
            Err(e) => return Err(e),
        };

        // A range past the end looks like size probing; the reply is
        // fatal. Overflowing offset + size counts as out of range.
        match offset.checked_add(size) {
            Some(end) if end <= file_size => {}
            _ => return Ok((Response::status(StatusCode::BadRequest), Flow::Close)),
        }

        let mut file = match File::open(&path).await {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Ok((Response::status(StatusCode::FileNotFound), Flow::Continue));
            }
            Err(e) => return Err(e),
        };
        file.seek(SeekFrom::Start(offset)).await?;

        let mut payload = Vec::with_capacity(size as usize);
        file.take(size).read_to_end(&mut payload).await?;

        Ok((
            Response::with_line(StatusCode::Ok, STANDARD.encode(&payload)),
            Flow::Continue,
        ))
    }

    /// `get_file_listing` - `0 OK` followed by one line per directory
    /// entry, sorted by name. Arguments are ignored.
    ///
    /// Enumeration failure replies `INTERNAL SERVER ERROR` plus one
    /// explanatory line; the status is fatal, so the connection closes.
    async fn cmd_get_file_listing(&self) -> io::Result<(Response, Flow)> {
        match self.list_entries().await {
            Ok(names) => Ok((Response::with_lines(StatusCode::Ok, names), Flow::Continue)),
            Err(e) => {
                warn!(root = %self.root.display(), error = %e, "Directory listing failed");
                Ok((
                    Response::with_line(StatusCode::InternalError, "shared directory unavailable"),
                    Flow::Close,
                ))
            }
        }
    }

    /// Collects the entry names of the root, sorted for deterministic
    /// output.
    async fn list_entries(&self) -> io::Result<Vec<String>> {
        let mut dir = tokio::fs::read_dir(&self.root).await?;
        let mut names = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Creates a shared directory holding `files` and a handler serving it.
    fn handler_with_files(files: &[(&str, &[u8])]) -> (TempDir, CommandHandler) {
        let dir = TempDir::new().unwrap();
        for (name, contents) in files {
            std::fs::write(dir.path().join(name), contents).unwrap();
        }
        let root = dir.path().canonicalize().unwrap();
        (dir, CommandHandler::new(root))
    }

    async fn run(handler: &CommandHandler, line: &str) -> (Response, Flow) {
        let request = Request::parse(line).unwrap();
        handler.execute(&request).await.unwrap()
    }

    #[tokio::test]
    async fn test_metadata_reports_size() {
        let (_dir, handler) = handler_with_files(&[("notes.txt", b"hello world, 29 bytes in here")]);

        let (response, flow) = run(&handler, "get_metadata notes.txt").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert_eq!(response.lines(), ["29"]);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_metadata_missing_file() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "get_metadata missing.txt").await;
        assert_eq!(response.code(), StatusCode::FileNotFound);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_metadata_wrong_arity() {
        let (_dir, handler) = handler_with_files(&[("a.txt", b"x")]);

        let (response, _) = run(&handler, "get_metadata").await;
        assert_eq!(response.code(), StatusCode::InvalidArguments);

        let (response, flow) = run(&handler, "get_metadata a.txt b.txt").await;
        assert_eq!(response.code(), StatusCode::InvalidArguments);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_metadata_oversized_name_reads_as_absent() {
        let (_dir, handler) = handler_with_files(&[]);

        let name = "x".repeat(MAX_PATH_LEN + 1);
        let (response, flow) = run(&handler, &format!("get_metadata {name}")).await;
        assert_eq!(response.code(), StatusCode::FileNotFound);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_metadata_escape_reads_as_absent() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "get_metadata ..").await;
        assert_eq!(response.code(), StatusCode::FileNotFound);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_slice_returns_encoded_range() {
        let data = b"que calor que hace hoy, tomemos una birra";
        let (_dir, handler) = handler_with_files(&[("birra.txt", data)]);

        let (response, flow) = run(&handler, "get_slice birra.txt 4 9").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert_eq!(response.lines(), [STANDARD.encode(&data[4..13])]);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_slice_whole_file_and_empty_range() {
        let data = b"0123456789";
        let (_dir, handler) = handler_with_files(&[("digits.bin", data)]);

        let (response, _) = run(&handler, "get_slice digits.bin 0 10").await;
        assert_eq!(response.lines(), [STANDARD.encode(data)]);

        let (response, flow) = run(&handler, "get_slice digits.bin 10 0").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert_eq!(response.lines(), [String::new()]);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_slice_binary_payload_roundtrips() {
        let data: Vec<u8> = (0u8..=255).collect();
        let (_dir, handler) = handler_with_files(&[("all.bin", &data)]);

        let (response, _) = run(&handler, "get_slice all.bin 0 256").await;
        let decoded = STANDARD.decode(&response.lines()[0]).unwrap();
        assert_eq!(decoded, data);
    }

    #[tokio::test]
    async fn test_slice_out_of_bounds_forces_close() {
        let (_dir, handler) = handler_with_files(&[("short.txt", b"abc")]);

        let (response, flow) = run(&handler, "get_slice short.txt 2 5").await;
        assert_eq!(response.code(), StatusCode::BadRequest);
        assert_eq!(flow, Flow::Close);
    }

    #[tokio::test]
    async fn test_slice_huge_range_forces_close() {
        let (_dir, handler) = handler_with_files(&[("short.txt", b"abc")]);

        let line = format!("get_slice short.txt {} {}", i64::MAX, i64::MAX);
        let (response, flow) = run(&handler, &line).await;
        assert_eq!(response.code(), StatusCode::BadRequest);
        assert_eq!(flow, Flow::Close);
    }

    #[tokio::test]
    async fn test_slice_unparseable_magnitude_is_an_argument_error() {
        let (_dir, handler) = handler_with_files(&[("short.txt", b"abc")]);

        let line = format!("get_slice short.txt 0 {}0", i64::MAX);
        let (response, flow) = run(&handler, &line).await;
        assert_eq!(response.code(), StatusCode::InvalidArguments);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_slice_negative_arguments() {
        let (_dir, handler) = handler_with_files(&[("a.txt", b"abc")]);

        for line in ["get_slice a.txt -1 2", "get_slice a.txt 0 -2"] {
            let (response, flow) = run(&handler, line).await;
            assert_eq!(response.code(), StatusCode::InvalidArguments);
            assert_eq!(flow, Flow::Continue);
        }
    }

    #[tokio::test]
    async fn test_slice_non_numeric_arguments() {
        let (_dir, handler) = handler_with_files(&[("a.txt", b"abc")]);

        let (response, flow) = run(&handler, "get_slice a.txt zero 2").await;
        assert_eq!(response.code(), StatusCode::InvalidArguments);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_slice_wrong_arity() {
        let (_dir, handler) = handler_with_files(&[("a.txt", b"abc")]);

        let (response, flow) = run(&handler, "get_slice a.txt 0").await;
        assert_eq!(response.code(), StatusCode::InvalidArguments);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_slice_missing_file() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "get_slice missing.txt 0 1").await;
        assert_eq!(response.code(), StatusCode::FileNotFound);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_listing_is_sorted() {
        let (_dir, handler) =
            handler_with_files(&[("zeta.txt", b"z"), ("alpha.txt", b"a"), ("mid.txt", b"m")]);

        let (response, flow) = run(&handler, "get_file_listing").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert_eq!(response.lines(), ["alpha.txt", "mid.txt", "zeta.txt"]);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_listing_empty_directory() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "get_file_listing").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert!(response.lines().is_empty());
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_listing_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().canonicalize().unwrap();
        let handler = CommandHandler::new(root);
        drop(dir);

        let (response, flow) = run(&handler, "get_file_listing").await;
        assert_eq!(response.code(), StatusCode::InternalError);
        assert_eq!(response.lines().len(), 1);
        assert_eq!(flow, Flow::Close);
    }

    #[tokio::test]
    async fn test_quit_closes() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "quit").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert_eq!(flow, Flow::Close);
    }

    #[tokio::test]
    async fn test_quit_with_arguments_keeps_connection_open() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "quit now").await;
        assert_eq!(response.code(), StatusCode::InvalidArguments);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_unknown_verb() {
        let (_dir, handler) = handler_with_files(&[]);

        let (response, flow) = run(&handler, "frobnicate").await;
        assert_eq!(response.code(), StatusCode::InvalidCommand);
        assert_eq!(flow, Flow::Continue);
    }

    #[tokio::test]
    async fn test_dispatch_is_case_insensitive() {
        let (_dir, handler) = handler_with_files(&[("a.txt", b"abc")]);

        let (response, _) = run(&handler, "GET_METADATA a.txt").await;
        assert_eq!(response.code(), StatusCode::Ok);
        assert_eq!(response.lines(), ["3"]);
    }
}
