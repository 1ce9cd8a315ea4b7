//! fileslice - A Minimal Read-Only File-Access Protocol Server
//!
//! This is the main entry point for the fileslice server.
//! It parses the command line, sets up logging, binds the TCP listener,
//! and accepts connections until a shutdown signal arrives.

use anyhow::Context;
use fileslice::commands::CommandHandler;
use fileslice::connection::{handle_connection, ConnectionStats};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::{watch, Semaphore};
use tracing::{error, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Cap on simultaneously served connections
const MAX_CONNECTIONS: usize = 1024;

/// How long shutdown waits for in-flight connections to drain
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Server configuration
struct Config {
    /// Host to bind to
    host: String,
    /// Port to listen on
    port: u16,
    /// Directory shared with clients
    directory: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: fileslice::DEFAULT_HOST.to_string(),
            port: fileslice::DEFAULT_PORT,
            directory: PathBuf::from(fileslice::DEFAULT_DIR),
        }
    }
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut config = Config::default();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        config.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        config.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--dir" | "-d" => {
                    if i + 1 < args.len() {
                        config.directory = PathBuf::from(&args[i + 1]);
                        i += 2;
                    } else {
                        eprintln!("Error: --dir requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("fileslice version {}", fileslice::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", args[i]);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    /// Returns the bind address as a string
    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn print_help() {
    println!(
        r#"
fileslice - A Minimal Read-Only File-Access Protocol Server

USAGE:
    fileslice [OPTIONS]

OPTIONS:
    -h, --host <HOST>    Host to bind to (default: 0.0.0.0)
    -p, --port <PORT>    Port to listen on (default: 19500)
    -d, --dir <DIR>      Directory shared with clients (default: shared)
    -v, --version        Print version information
        --help           Print this help message

EXAMPLES:
    fileslice                          # Serve ./shared on 0.0.0.0:19500
    fileslice --port 2121              # Serve on port 2121
    fileslice --dir /srv/public        # Serve another directory

CONNECTING:
    Lines are CRLF-terminated; telnet sends them as typed:
    $ telnet 127.0.0.1 19500
    get_file_listing
    0 OK
    notes.txt
    get_metadata notes.txt
    0 OK
    29
    quit
    0 OK
"#
    );
}

fn print_banner(config: &Config) {
    println!(
        r#"
fileslice v{} - Read-Only File-Access Protocol Server
──────────────────────────────────────────────────────
Serving {} on {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        fileslice::VERSION,
        config.directory.display(),
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::from_args();

    // Set up logging
    let _subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    // Print the banner
    print_banner(&config);

    // The shared root is canonicalized once at startup; every connection
    // resolves client-supplied names under this path.
    let root = std::fs::canonicalize(&config.directory).with_context(|| {
        format!(
            "shared directory {} is not accessible",
            config.directory.display()
        )
    })?;
    info!(root = %root.display(), "Shared directory ready");

    // Create connection statistics
    let stats = Arc::new(ConnectionStats::new());

    // Shutdown signal observed by every connection's line reader
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Admission cap: one permit per served connection
    let connection_limit = Arc::new(Semaphore::new(MAX_CONNECTIONS));

    // Bind the TCP listener
    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    // Set up graceful shutdown
    let shutdown = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Shutdown signal received, stopping server...");
    };

    // Main accept loop
    tokio::select! {
        _ = accept_loop(listener, root, Arc::clone(&stats), shutdown_rx, connection_limit) => {}
        _ = shutdown => {}
    }

    // Cancel in-flight connections and give them a bounded grace period.
    let _ = shutdown_tx.send(true);
    drain_connections(&stats).await;

    info!("Server shutdown complete");
    Ok(())
}

/// Main loop that accepts incoming connections
async fn accept_loop(
    listener: TcpListener,
    root: PathBuf,
    stats: Arc<ConnectionStats>,
    shutdown: watch::Receiver<bool>,
    connection_limit: Arc<Semaphore>,
) {
    loop {
        // Wait for a connection slot
        let permit = match Arc::clone(&connection_limit).acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => return,
        };

        match listener.accept().await {
            Ok((stream, addr)) => {
                // Create a command handler for this connection
                let handler = CommandHandler::new(root.clone());
                let stats = Arc::clone(&stats);
                let shutdown = shutdown.clone();

                // Spawn a task to handle this connection
                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats, shutdown).await;
                    drop(permit);
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Waits for active connections to finish, bounded by the grace period.
async fn drain_connections(stats: &ConnectionStats) {
    let deadline = tokio::time::Instant::now() + SHUTDOWN_GRACE;

    while stats.active_connections.load(Ordering::Relaxed) > 0 {
        if tokio::time::Instant::now() >= deadline {
            warn!(
                active = stats.active_connections.load(Ordering::Relaxed),
                "Grace period elapsed with connections still active"
            );
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
