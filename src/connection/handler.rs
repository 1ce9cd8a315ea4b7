//! Connection Handler Module
//!
//! This module drives one client connection from accept to close. Each
//! client gets its own task running the per-connection state machine.
//!
//! ## Connection Lifecycle
//!
//! ```text
//!          ┌──────────────────────────────┐
//!          │           READING            │
//!          │  read one CRLF line under a  │
//!          │  deadline; buffer partials   │
//!          └───────────┬──────────────────┘
//!                      │ line
//!                      ▼
//!          ┌──────────────────────────────┐
//!          │         DISPATCHING          │
//!          │  validate charset, dispatch  │
//!          │  verb, send the reply        │
//!          └───────┬──────────────┬───────┘
//!          non-fatal│              │fatal / quit /
//!          reply    │              │disconnect / cancel
//!                   ▼              ▼
//!              [READING]     ┌────────────┐
//!                            │ TERMINATED │
//!                            └────────────┘
//! ```
//!
//! The socket is closed exactly once on every exit path: the handler owns
//! the stream and drops it when `run` returns. Internal faults never
//! propagate past `run`; they are reported to the peer as
//! `INTERNAL SERVER ERROR` (best-effort) and logged.
//!
//! ## Line Framing
//!
//! TCP is a stream, so a request line may arrive in fragments, or several
//! lines may arrive in one segment. Received bytes accumulate in a
//! `BytesMut`; bytes after a delimiter stay buffered for the next request.
//! A single deadline per line, computed once from a monotonic clock, bounds
//! how long a client may take to produce the delimiter.

use crate::commands::{CommandHandler, Flow};
use crate::protocol::{Request, Response, StatusCode, CRLF};
use bytes::BytesMut;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tokio::sync::watch;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// Deadline for receiving one complete request line
pub const LINE_DEADLINE: Duration = Duration::from_secs(60);

/// Maximum bytes buffered while waiting for a delimiter (64 KB)
const MAX_BUFFER_SIZE: usize = 64 * 1024;

/// Initial buffer capacity
const INITIAL_BUFFER_SIZE: usize = 4096;

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Outcome of reading one request line.
///
/// Fatal cases have already sent their reply to the peer; the caller only
/// decides to terminate. No cause is ever inferred from the absence of a
/// value.
#[derive(Debug, PartialEq, Eq)]
pub enum ReadOutcome {
    /// A complete, trimmed request line
    Line(String),
    /// The peer closed the connection with nothing buffered
    Disconnected,
    /// A fatal status was sent; the connection must close
    FatalAlreadyReported,
    /// Server shutdown was signalled while waiting
    Cancelled,
}

/// Errors that can end a connection without a normal close.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// Transport failure while reading or writing the socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unexpected filesystem fault, already reported to the peer as
    /// `INTERNAL SERVER ERROR`
    #[error("internal fault: {0}")]
    Internal(std::io::Error),
}

/// Handles a single client connection.
///
/// Owns the socket for the connection's lifetime, together with the read
/// buffer, the command handler bound to the shared directory, and the
/// shutdown signal receiver.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer for incoming data
    buffer: BytesMut,

    /// The command handler bound to the shared directory
    commands: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Flips to true when the server is shutting down
    shutdown: watch::Receiver<bool>,

    /// Deadline for one request line
    line_deadline: Duration,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `commands` - The command handler serving the shared directory
    /// * `stats` - Shared connection statistics
    /// * `shutdown` - Server shutdown signal
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        commands: CommandHandler,
        stats: Arc<ConnectionStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(INITIAL_BUFFER_SIZE),
            commands,
            stats,
            shutdown,
            line_deadline: LINE_DEADLINE,
        }
    }

    /// Overrides the per-line deadline.
    pub fn with_line_deadline(mut self, deadline: Duration) -> Self {
        self.line_deadline = deadline;
        self
    }

    /// Runs the connection to completion. Never propagates a fault.
    pub async fn run(mut self) {
        info!(client = %self.addr, "Client connected");

        match self.session_loop().await {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::Io(ref e)) if e.kind() == ErrorKind::ConnectionReset => {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e @ ConnectionError::Io(_)) => {
                debug!(client = %self.addr, error = %e, "Connection ended with transport error")
            }
            Err(e) => {
                warn!(client = %self.addr, error = %e, "Connection ended with internal fault")
            }
        }

        self.stats.connection_closed();
    }

    /// The read-validate-dispatch loop.
    ///
    /// Returns `Ok(())` on every protocol-level exit (quit, fatal reply
    /// already sent, peer gone, cancelled); `Err` only for transport
    /// failures and internal faults.
    async fn session_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            let line = match self.read_request_line().await? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Disconnected => return Ok(()),
                ReadOutcome::FatalAlreadyReported => return Ok(()),
                ReadOutcome::Cancelled => {
                    debug!(client = %self.addr, "Connection cancelled by shutdown");
                    return Ok(());
                }
            };
            debug!(client = %self.addr, line = %line, "Request");

            // An empty request line terminates silently.
            let request = match Request::parse(&line) {
                Some(request) => request,
                None => return Ok(()),
            };

            // A request is never dispatched until it passes the
            // character-set check; a violation is fatal.
            if !request.is_valid() {
                self.send_response(&Response::status(StatusCode::BadRequest))
                    .await?;
                return Ok(());
            }

            let (response, flow) = match self.commands.execute(&request).await {
                Ok(result) => result,
                Err(e) => {
                    let _ = self
                        .send_response(&Response::status(StatusCode::InternalError))
                        .await;
                    return Err(ConnectionError::Internal(e));
                }
            };

            self.send_response(&response).await?;
            self.stats.command_processed();

            if flow == Flow::Close {
                return Ok(());
            }
        }
    }

    /// Reads one request line, bounded by a single deadline computed when
    /// the read starts.
    ///
    /// Accumulates bytes until CRLF appears; bytes after the delimiter
    /// stay buffered for the next request. Every fatal outcome sends its
    /// reply here, so the caller only terminates.
    async fn read_request_line(&mut self) -> Result<ReadOutcome, ConnectionError> {
        let deadline = Instant::now() + self.line_deadline;

        loop {
            if let Some(pos) = find_crlf(&self.buffer) {
                let raw = self.buffer.split_to(pos + CRLF.len());

                let line = match std::str::from_utf8(&raw[..pos]) {
                    Ok(line) if line.is_ascii() => line.trim(),
                    // The protocol is 7-bit text; anything else is
                    // undecodable.
                    _ => {
                        self.send_response(&Response::status(StatusCode::BadRequest))
                            .await?;
                        return Ok(ReadOutcome::FatalAlreadyReported);
                    }
                };

                // A bare LF surviving the trim means malformed folding.
                if line.contains('\n') {
                    self.send_response(&Response::status(StatusCode::BadEol))
                        .await?;
                    return Ok(ReadOutcome::FatalAlreadyReported);
                }

                return Ok(ReadOutcome::Line(line.to_owned()));
            }

            // A peer that never sends the delimiter must not grow the
            // buffer without bound.
            if self.buffer.len() >= MAX_BUFFER_SIZE {
                self.send_response(&Response::status(StatusCode::BadRequest))
                    .await?;
                return Ok(ReadOutcome::FatalAlreadyReported);
            }

            // Ensure we have some capacity
            if self.buffer.capacity() - self.buffer.len() < 1024 {
                self.buffer.reserve(4096);
            }

            let read = tokio::select! {
                _ = self.shutdown.changed() => None,
                read = timeout_at(deadline, self.stream.get_mut().read_buf(&mut self.buffer)) => {
                    Some(read)
                }
            };

            match read {
                None => return Ok(ReadOutcome::Cancelled),
                Some(Err(_)) => {
                    self.send_response(&Response::status(StatusCode::Timeout))
                        .await?;
                    return Ok(ReadOutcome::FatalAlreadyReported);
                }
                Some(Ok(Ok(0))) => {
                    if self.buffer.is_empty() {
                        return Ok(ReadOutcome::Disconnected);
                    }
                    // The partial line can never be completed.
                    self.send_response(&Response::status(StatusCode::BadRequest))
                        .await?;
                    return Ok(ReadOutcome::FatalAlreadyReported);
                }
                Some(Ok(Ok(n))) => {
                    self.stats.bytes_read(n);
                }
                Some(Ok(Err(e))) => return Err(e.into()),
            }
        }
    }

    /// Sends one reply, flushing the buffered writer.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        Ok(())
    }
}

/// Finds the CRLF delimiter, returning the index of the `\r`.
#[inline]
fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|window| window == CRLF)
}

/// Handles a client connection to completion.
///
/// This is a convenience function that creates a `ConnectionHandler` and
/// runs it; faults are reported to the peer and logged, never returned.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `addr` - The client's socket address
/// * `commands` - The command handler serving the shared directory
/// * `stats` - Shared connection statistics
/// * `shutdown` - Server shutdown signal
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    commands: CommandHandler,
    stats: Arc<ConnectionStats>,
    shutdown: watch::Receiver<bool>,
) {
    ConnectionHandler::new(stream, addr, commands, stats, shutdown)
        .run()
        .await;
}
