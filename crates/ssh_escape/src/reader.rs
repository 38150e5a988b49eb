//! Background escape-sequence reader.
//!
//! A dedicated OS thread drains upstream whether or not anyone is reading,
//! so an escape sequence is acted on even when the consumer is stuck (for
//! example blocked writing to a slow connection). Unread bytes pile up in a
//! bounded buffer that [`EscapeReader::read_chunk`] drains.

use crate::options::ReaderOptions;
use crate::sequence::{ScanWindow, Sequence, HELP_TEXT};
use crate::termination::Termination;
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::thread;

/// A [`Read`] wrapper that catches OpenSSH-like escape sequences in its input.
///
/// Two sequences are supported:
/// - `~?` prints [`HELP_TEXT`] to the help sink and keeps streaming.
/// - `~.` stops all further reads from upstream. Data read before the chunk
///   that completed the sequence can still be drained; after that every read
///   reports [`Termination::Disconnect`].
///
/// Both must follow a carriage return or be the first input of the stream.
/// The sequence bytes themselves are passed through, not stripped.
///
/// Upstream is consumed immediately in the background. If the consumer falls
/// more than [`ReaderOptions::buffer_limit`] bytes behind, the reader stops
/// permanently with [`Termination::BufferOverflow`].
///
/// `on_disconnect` is called once, from the background thread, for every
/// termination except a clean end of stream. It runs before the termination
/// becomes visible to readers and must not block for long.
///
/// Safe to read from several threads at once through `&EscapeReader`.
#[derive(Debug)]
pub struct EscapeReader {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<State>,
    /// Signalled on every append and on termination.
    ready: Condvar,
}

#[derive(Debug, Default)]
struct State {
    buffer: VecDeque<u8>,
    termination: Option<Termination>,
}

impl EscapeReader {
    /// Start reading `upstream` with [`ReaderOptions::default`].
    ///
    /// # Errors
    /// Returns an error if the background thread cannot be spawned.
    pub fn new<R, W, F>(upstream: R, help_sink: W, on_disconnect: F) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
        F: FnOnce(Termination) + Send + 'static,
    {
        Self::with_options(upstream, help_sink, on_disconnect, ReaderOptions::default())
    }

    /// Start reading `upstream` with custom options.
    ///
    /// # Errors
    /// Returns an error if the background thread cannot be spawned.
    pub fn with_options<R, W, F>(
        upstream: R,
        help_sink: W,
        on_disconnect: F,
        options: ReaderOptions,
    ) -> io::Result<Self>
    where
        R: Read + Send + 'static,
        W: Write + Send + 'static,
        F: FnOnce(Termination) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            state: Mutex::new(State::default()),
            ready: Condvar::new(),
        });

        let span = tracing::debug_span!("escape_reader", thread = %options.thread_name);
        let consumer = Consumer {
            upstream,
            help_sink,
            shared: shared.clone(),
            buffer_limit: options.buffer_limit,
            chunk_size: options.chunk_size.max(1),
        };

        // Detached: the thread exits on its own once upstream ends or a
        // termination is recorded. There is no way to interrupt a blocked read.
        thread::Builder::new()
            .name(options.thread_name)
            .spawn(move || {
                let _entered = span.enter();
                consumer.run(on_disconnect);
            })?;

        Ok(Self { shared })
    }

    /// Fill `dst` with buffered data, blocking while the buffer is empty and
    /// the reader is still running.
    ///
    /// Returns the number of bytes copied together with the termination, if
    /// one has been recorded. Both can be set at once: a termination means no
    /// data will follow what is already buffered, not that the returned bytes
    /// should be discarded. Once drained, every call returns `0` and the same
    /// termination.
    pub fn read_chunk(&self, dst: &mut [u8]) -> (usize, Option<Termination>) {
        let mut state = self.shared.state.lock();
        while state.buffer.is_empty() && state.termination.is_none() {
            self.shared.ready.wait(&mut state);
        }

        let n = state.buffer.len().min(dst.len());
        for (slot, byte) in dst.iter_mut().zip(state.buffer.drain(..n)) {
            *slot = byte;
        }

        (n, state.termination.clone())
    }

    /// The recorded termination, without blocking.
    pub fn termination(&self) -> Option<Termination> {
        self.shared.state.lock().termination.clone()
    }

    /// Bytes read from upstream and not yet consumed.
    pub fn buffered_len(&self) -> usize {
        self.shared.state.lock().buffer.len()
    }
}

impl Read for &EscapeReader {
    /// Buffered bytes first. Once drained, a clean end of stream reads as
    /// `Ok(0)` and any other termination as an error wrapping the
    /// [`Termination`] (see [`Termination::from_io_error`]).
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        match self.read_chunk(buf) {
            (0, Some(termination)) if termination.is_clean() => Ok(0),
            (0, Some(termination)) => Err(termination.into()),
            (n, _) => Ok(n),
        }
    }
}

impl Read for EscapeReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        (&*self).read(buf)
    }
}

/// State owned by the background thread.
struct Consumer<R, W> {
    upstream: R,
    help_sink: W,
    shared: Arc<Shared>,
    buffer_limit: usize,
    chunk_size: usize,
}

impl<R: Read, W: Write> Consumer<R, W> {
    fn run<F: FnOnce(Termination)>(mut self, on_disconnect: F) {
        let _unwind = TerminateOnUnwind(self.shared.clone());
        tracing::debug!(
            buffer_limit = self.buffer_limit,
            chunk_size = self.chunk_size,
            "escape reader started"
        );

        let termination = self.consume();

        // Notify before publishing so a reader that observes the termination
        // knows the callback has already run.
        if !termination.is_clean() {
            on_disconnect(termination.clone());
        }
        tracing::debug!(%termination, "escape reader stopped");
        self.shared.terminate(termination);
    }

    /// Read until something terminates the stream.
    fn consume(&mut self) -> Termination {
        let mut window = ScanWindow::new();
        let mut chunk = vec![0u8; self.chunk_size];

        loop {
            let n = match self.upstream.read(&mut chunk) {
                Ok(0) => return Termination::EndOfStream,
                Ok(n) => n,
                Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
                Err(error) => {
                    tracing::warn!(%error, "upstream read failed");
                    return Termination::from(error);
                }
            };
            let data = &chunk[..n];
            tracing::trace!(bytes = n, "read from upstream");

            match window.push(data) {
                Some(Sequence::Help) => {
                    tracing::info!("help escape sequence detected");
                    self.print_help();
                }
                Some(Sequence::Disconnect) => {
                    tracing::info!("disconnect escape sequence detected");
                    return Termination::Disconnect;
                }
                None => {}
            }

            if let Err(termination) = self.shared.append(data, self.buffer_limit) {
                return termination;
            }
        }
    }

    fn print_help(&mut self) {
        let result = self
            .help_sink
            .write_all(HELP_TEXT.as_bytes())
            .and_then(|()| self.help_sink.flush());
        if let Err(error) = result {
            tracing::warn!(%error, "failed to write escape sequence help");
        }
    }
}

/// Records a termination if the background thread unwinds before it could,
/// so blocked readers wake up instead of waiting forever.
struct TerminateOnUnwind(Arc<Shared>);

impl Drop for TerminateOnUnwind {
    fn drop(&mut self) {
        if !thread::panicking() {
            return;
        }
        let mut state = self.0.state.lock();
        if state.termination.is_none() {
            tracing::error!("escape reader thread panicked");
            state.termination = Some(Termination::Io(Arc::new(io::Error::other(
                "escape reader thread panicked",
            ))));
        }
        self.0.ready.notify_all();
    }
}

impl Shared {
    /// Append `data` and wake readers, or refuse if it would exceed `limit`.
    fn append(&self, data: &[u8], limit: usize) -> Result<(), Termination> {
        let mut state = self.state.lock();
        let buffered = state.buffer.len();
        if buffered + data.len() > limit {
            tracing::warn!(
                buffered,
                incoming = data.len(),
                limit,
                "escape reader buffer limit exceeded, consumer is not keeping up"
            );
            return Err(Termination::BufferOverflow { limit });
        }
        state.buffer.extend(data);
        self.ready.notify_all();
        Ok(())
    }

    fn terminate(&self, termination: Termination) {
        let mut state = self.state.lock();
        debug_assert!(state.termination.is_none(), "termination recorded twice");
        if state.termination.is_none() {
            state.termination = Some(termination);
        }
        self.ready.notify_all();
    }
}
