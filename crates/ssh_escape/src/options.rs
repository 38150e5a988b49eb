//! Construction options for [`EscapeReader`](crate::EscapeReader).

/// Maximum number of unread bytes held before the reader gives up.
///
/// This is 10 KiB. Keystrokes arrive slowly, so a consumer that falls this
/// far behind is treated as stuck.
pub const DEFAULT_BUFFER_LIMIT: usize = 10 * 1024;

/// Size of a single upstream read. Input is typed by a human, so reads are small.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Name given to the background reader thread.
pub const DEFAULT_THREAD_NAME: &str = "ssh-escape-reader";

/// Tunables for an [`EscapeReader`](crate::EscapeReader).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Unread bytes allowed in the internal buffer. Going over it terminates
    /// the reader with [`Termination::BufferOverflow`](crate::Termination::BufferOverflow).
    pub buffer_limit: usize,
    /// Upper bound on the bytes requested from upstream per read.
    pub chunk_size: usize,
    /// Background thread name.
    pub thread_name: String,
}

impl ReaderOptions {
    pub fn buffer_limit(mut self, limit: usize) -> Self {
        self.buffer_limit = limit;
        self
    }

    /// Set the upstream read size. Clamped to at least one byte.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            buffer_limit: DEFAULT_BUFFER_LIMIT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}
