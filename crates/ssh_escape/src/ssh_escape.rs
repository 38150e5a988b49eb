//! Client-side SSH escape sequences.
//!
//! Wraps the keyboard input stream of an interactive session and watches it
//! for OpenSSH-style escape sequences (`~?` and `~.` typed at the start of a
//! line) while passing every byte through to the consumer unchanged.
//! See [`EscapeReader`] for the details.

mod options;
mod reader;
pub mod sequence;
mod termination;

pub use options::{ReaderOptions, DEFAULT_BUFFER_LIMIT, DEFAULT_CHUNK_SIZE, DEFAULT_THREAD_NAME};
pub use reader::EscapeReader;
pub use sequence::{Sequence, HELP_TEXT};
pub use termination::Termination;
