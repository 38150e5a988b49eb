//! Why an [`EscapeReader`](crate::EscapeReader) stopped reading.

use std::io;
use std::sync::Arc;

/// Terminal condition of a reader. Recorded once and never replaced.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Termination {
    /// Upstream reached a clean end of stream.
    #[error("end of stream")]
    EndOfStream,

    /// The user typed the disconnect escape sequence.
    #[error("disconnect escape sequence detected")]
    Disconnect,

    /// The consumer fell behind or stopped reading.
    #[error("internal buffer has grown too big (limit {limit} bytes)")]
    BufferOverflow { limit: usize },

    /// Upstream read failed.
    #[error("upstream read failed: {0}")]
    Io(#[source] Arc<io::Error>),
}

impl Termination {
    /// True only for [`Termination::EndOfStream`]. Every other condition is
    /// reported to the disconnect callback.
    pub fn is_clean(&self) -> bool {
        matches!(self, Self::EndOfStream)
    }

    /// Recover the termination carried by an error produced by the
    /// [`std::io::Read`] adapter of [`EscapeReader`](crate::EscapeReader).
    pub fn from_io_error(error: &io::Error) -> Option<&Termination> {
        error.get_ref()?.downcast_ref::<Termination>()
    }
}

impl From<io::Error> for Termination {
    fn from(error: io::Error) -> Self {
        Self::Io(Arc::new(error))
    }
}

impl From<Termination> for io::Error {
    fn from(termination: Termination) -> Self {
        let kind = match &termination {
            Termination::EndOfStream => io::ErrorKind::UnexpectedEof,
            Termination::Disconnect => io::ErrorKind::ConnectionAborted,
            Termination::BufferOverflow { .. } => io::ErrorKind::OutOfMemory,
            Termination::Io(error) => error.kind(),
        };
        io::Error::new(kind, termination)
    }
}
