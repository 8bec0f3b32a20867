//! Delimiter-based response framing
//!
//! Devices answer over a continuous character stream; the framer turns that
//! stream into discrete messages using a fixed delimiter string. Partial
//! messages carry over between chunks, so a delimiter split across two reads
//! or several messages coalesced into one read both come out right.

use avkit_core::Result;

/// A pre-processing stage the framer runs before delimiter scanning.
///
/// Protocol-specific byte handling (stripping Telnet option negotiation,
/// unstuffing escape sequences) composes with the generic framer through this
/// trait instead of wrapping or replacing it. A preprocessor receives each
/// raw chunk and returns the text that should enter the framing buffer.
///
/// A preprocessor error triggers the framer's failure policy: the entire
/// buffer is discarded, the error is traced, and the stream continues with
/// the next chunk.
pub trait MessagePreprocessor: Send {
    /// Transform one inbound chunk before it reaches the framing buffer.
    fn preprocess(&mut self, chunk: &str) -> Result<String>;
}

/// Splits an inbound character stream into delimiter-terminated messages.
///
/// An empty delimiter disables framing: every chunk is forwarded verbatim as
/// one message with no buffering. With a delimiter configured, each emitted
/// message *includes* its trailing delimiter and the unterminated remainder
/// stays buffered for the next chunk.
pub struct MessageFramer {
    delimiter: String,
    buffer: String,
    preprocessor: Option<Box<dyn MessagePreprocessor>>,
}

impl MessageFramer {
    /// Create a framer with the given delimiter. Empty disables framing.
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            buffer: String::new(),
            preprocessor: None,
        }
    }

    /// Attach a pre-processing stage that runs before delimiter scanning.
    pub fn with_preprocessor(mut self, preprocessor: Box<dyn MessagePreprocessor>) -> Self {
        self.preprocessor = Some(preprocessor);
        self
    }

    /// The configured delimiter.
    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// The buffered partial message awaiting its delimiter.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// Discard any buffered partial message.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Feed one inbound chunk, returning every complete message it unlocks.
    ///
    /// Empty chunks are ignored. Framing failures discard the buffer and are
    /// traced; they never produce an error for the caller.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let chunk = match self.preprocessor.as_mut() {
            Some(stage) => match stage.preprocess(chunk) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(
                        "preprocessor failed, discarding {} buffered bytes: {}",
                        self.buffer.len(),
                        e
                    );
                    self.buffer.clear();
                    return Vec::new();
                }
            },
            None => chunk.to_string(),
        };

        if chunk.is_empty() {
            return Vec::new();
        }

        if self.delimiter.is_empty() {
            return vec![chunk];
        }

        self.buffer.push_str(&chunk);

        let mut messages = Vec::new();
        while let Some(pos) = self.buffer.find(&self.delimiter) {
            let end = pos + self.delimiter.len();
            messages.push(self.buffer.drain(..end).collect());
        }
        messages
    }
}

impl std::fmt::Debug for MessageFramer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageFramer")
            .field("delimiter", &self.delimiter)
            .field("buffered", &self.buffer.len())
            .field("preprocessor", &self.preprocessor.is_some())
            .finish()
    }
}
