//! Stream state and per-stream counters shared by the encoder and decoder.

/// Where a codec stream is in its lifecycle.
///
/// ```text
/// Idle -> Accumulating -> (Emitting) -> Idle
///         Accumulating -> (Emitting escape) -> Terminated      at end of stream
///         any          -> Failed                               on a fatal error
/// ```
///
/// Emitting is not observable: a frame is always written completely
/// before control returns to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamState {
    /// No partial chunk or frame is buffered.
    Idle,
    /// Bytes of an unfinished chunk or frame are buffered.
    Accumulating,
    /// The stream ended cleanly.
    Terminated,
    /// The stream hit a fatal error; buffered state was discarded.
    Failed,
}

impl StreamState {
    /// Returns true once the stream accepts no more input.
    pub fn is_terminal(self) -> bool {
        matches!(self, StreamState::Terminated | StreamState::Failed)
    }
}

/// Number of frames of each kind produced or consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FrameCounts {
    /// Escape frames.
    pub escapes: u64,
    /// Declare frames.
    pub declarations: u64,
    /// Reference frames.
    pub references: u64,
}

impl FrameCounts {
    /// Total number of frames.
    pub fn total(&self) -> u64 {
        self.escapes + self.declarations + self.references
    }
}
