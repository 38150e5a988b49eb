//! escape-cat - copy stdin to stdout through an SSH escape reader.
//!
//! Handy for trying escape sequences by hand: type `~?` after Enter to see the
//! help on stderr, `~.` to disconnect. Put the terminal in raw mode first
//! (`stty raw -echo; escape-cat; stty sane`) to get a `\r` for Enter.
//!
//! Environment:
//! - `RUST_LOG` overrides the log filter.
//! - `ESCAPE_CAT_DEBUG` enables trace logging.
//! - `ESCAPE_CAT_BUFFER_LIMIT` overrides the unread-buffer limit in bytes.

use anyhow::{Context, Result};
use ssh_escape::{EscapeReader, ReaderOptions, Termination};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing::{debug, info, warn};

/// Check if debug mode is enabled via environment variable.
fn is_debug_mode() -> bool {
    std::env::var("ESCAPE_CAT_DEBUG").is_ok()
}

/// Initialize the logging system. Logs go to stderr so stdout stays clean.
fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let default_filter = if is_debug_mode() {
        "escape_cat=trace,ssh_escape=trace,info"
    } else {
        "escape_cat=info,ssh_escape=info,warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_line_number(true),
        )
        .with(filter)
        .init();
}

fn reader_options() -> Result<ReaderOptions> {
    let mut options = ReaderOptions::default().thread_name("escape-cat-stdin");
    if let Ok(value) = std::env::var("ESCAPE_CAT_BUFFER_LIMIT") {
        let limit = value
            .parse()
            .with_context(|| format!("Invalid ESCAPE_CAT_BUFFER_LIMIT: {value:?}"))?;
        options = options.buffer_limit(limit);
    }
    Ok(options)
}

fn run() -> Result<Termination> {
    let options = reader_options()?;
    debug!(?options, "Starting escape reader on stdin");

    let on_disconnect = |termination: Termination| warn!(%termination, "Session disconnected");
    let reader = EscapeReader::with_options(io::stdin(), io::stderr(), on_disconnect, options)
        .context("Failed to start escape reader")?;

    let mut stdout = io::stdout().lock();
    let mut buf = [0u8; 4096];
    loop {
        let (n, termination) = reader.read_chunk(&mut buf);
        stdout
            .write_all(&buf[..n])
            .and_then(|()| stdout.flush())
            .context("Failed to write to stdout")?;
        if let (0, Some(termination)) = (n, termination) {
            return Ok(termination);
        }
    }
}

fn main() -> ExitCode {
    init_logging();
    info!("escape-cat v{} starting up", env!("CARGO_PKG_VERSION"));

    match run() {
        Ok(Termination::EndOfStream) => ExitCode::SUCCESS,
        Ok(Termination::Disconnect) => {
            info!("Disconnected by escape sequence");
            ExitCode::SUCCESS
        }
        Ok(termination) => {
            eprintln!("escape-cat: {termination}");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("escape-cat: {error:#}");
            ExitCode::FAILURE
        }
    }
}
