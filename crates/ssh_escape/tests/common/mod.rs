//! Shared helpers for the escape reader integration tests.

// Not every test binary uses every helper.
#![allow(dead_code)]

use parking_lot::Mutex;
use ssh_escape::{EscapeReader, ReaderOptions, Termination};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::sync::Arc;

/// Upstream that replays fixed chunks, then fails with `final_error` or
/// reports end of stream.
///
/// A chunk larger than the read buffer is handed out over several reads.
pub struct ScriptedUpstream {
    chunks: VecDeque<Vec<u8>>,
    final_error: Option<io::Error>,
}

impl ScriptedUpstream {
    pub fn new<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: AsRef<[u8]>,
    {
        Self {
            chunks: chunks.into_iter().map(|c| c.as_ref().to_vec()).collect(),
            final_error: None,
        }
    }

    pub fn failing_with(mut self, error: io::Error) -> Self {
        self.final_error = Some(error);
        self
    }
}

impl Read for ScriptedUpstream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(chunk) = self.chunks.front_mut() else {
            return match self.final_error.take() {
                Some(error) => Err(error),
                None => Ok(0),
            };
        };

        let n = chunk.len().min(buf.len());
        buf[..n].copy_from_slice(&chunk[..n]);
        chunk.drain(..n);
        if chunk.is_empty() {
            self.chunks.pop_front();
        }
        Ok(n)
    }
}

/// Cloneable in-memory help sink.
#[derive(Clone, Default)]
pub struct CapturedHelp(Arc<Mutex<Vec<u8>>>);

impl CapturedHelp {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for CapturedHelp {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Everything observable about one run of a reader over a scripted upstream.
pub struct Outcome {
    /// Bytes delivered to the consumer.
    pub output: Vec<u8>,
    /// Termination seen by the consumer after draining.
    pub termination: Termination,
    /// Every value the disconnect callback received.
    pub disconnects: Vec<Termination>,
    pub help: String,
}

impl Outcome {
    pub fn output_str(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

/// Run a reader over `upstream` and drain it to its termination.
pub fn drain(upstream: ScriptedUpstream, options: ReaderOptions) -> Outcome {
    let help = CapturedHelp::default();
    let disconnects = Arc::new(Mutex::new(Vec::new()));
    let recorded = disconnects.clone();

    let reader = EscapeReader::with_options(
        upstream,
        help.clone(),
        move |termination| recorded.lock().push(termination),
        options,
    )
    .expect("failed to start escape reader");

    let mut output = Vec::new();
    let mut buf = [0u8; 64];
    let termination = loop {
        let (n, termination) = reader.read_chunk(&mut buf);
        output.extend_from_slice(&buf[..n]);
        if let (0, Some(termination)) = (n, termination) {
            break termination;
        }
    };

    let disconnects = disconnects.lock().clone();
    Outcome {
        output,
        termination,
        disconnects,
        help: help.text(),
    }
}

/// [`drain`] with default options.
pub fn drain_chunks<I, C>(chunks: I) -> Outcome
where
    I: IntoIterator<Item = C>,
    C: AsRef<[u8]>,
{
    drain(ScriptedUpstream::new(chunks), ReaderOptions::default())
}
