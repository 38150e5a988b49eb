//! Escape sequence table and detection across read boundaries.
//!
//! Both sequences are three bytes: a carriage return (the user just pressed
//! Enter), a tilde, and the command character. A sequence can straddle up to
//! three upstream reads, so detection runs on the new chunk prefixed with the
//! last two bytes of the previous window.

/// Help text written to the help sink when [`Sequence::Help`] is detected.
///
/// On a raw terminal `\r\n` is needed to move the cursor to the start of the
/// next line.
pub const HELP_TEXT: &str = "\r\nssh escape sequences:\r\n  ~? - display a list of escape sequences\r\n  ~. - disconnect\r\n";

/// Bytes of context carried between windows.
const CONTEXT_LEN: usize = 2;

/// A recognised escape sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sequence {
    /// `\r~?`: print the help text and keep streaming.
    Help,
    /// `\r~.`: stop reading and terminate the session.
    Disconnect,
}

impl Sequence {
    /// In detection priority order.
    pub const ALL: [Sequence; 2] = [Sequence::Help, Sequence::Disconnect];

    pub fn bytes(self) -> &'static [u8; 3] {
        match self {
            Self::Help => b"\r~?",
            Self::Disconnect => b"\r~.",
        }
    }
}

/// Rolling detector over consecutive upstream chunks.
///
/// Owned by the background reader; holds at most two bytes between calls.
#[derive(Debug)]
pub struct ScanWindow {
    context: Vec<u8>,
    window: Vec<u8>,
}

impl ScanWindow {
    /// A window seeded with a carriage return, so a sequence typed as the very
    /// first input of a session is recognised without a preceding Enter.
    pub fn new() -> Self {
        Self {
            context: vec![b'\r'],
            window: Vec::new(),
        }
    }

    /// Scan `chunk` together with the carried context and return the first
    /// sequence found, in [`Sequence::ALL`] order.
    pub fn push(&mut self, chunk: &[u8]) -> Option<Sequence> {
        self.window.clear();
        self.window.extend_from_slice(&self.context);
        self.window.extend_from_slice(chunk);

        let found = Sequence::ALL
            .into_iter()
            .find(|sequence| contains(&self.window, sequence.bytes()));

        let keep = self.window.len().min(CONTEXT_LEN);
        self.context.clear();
        self.context
            .extend_from_slice(&self.window[self.window.len() - keep..]);

        found
    }

    #[cfg(test)]
    fn context(&self) -> &[u8] {
        &self.context
    }
}

impl Default for ScanWindow {
    fn default() -> Self {
        Self::new()
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
