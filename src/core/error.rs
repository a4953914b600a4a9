//! Errors raised by the session engine.

/// Contract violations and lifecycle misuse of a [`SessionEngine`](crate::core::SessionEngine).
///
/// Numeric degeneracies (flat error windows, too-short sessions) are not
/// errors; they surface as sentinels on the emitted logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// `start` was called on a running session
    AlreadyRunning,
    /// `start` was called on a session that has already been stopped
    Finished,
    /// `tick` was called outside of a running session
    NotRunning,
    /// A coherence update ran before any sample was recorded
    EmptyHistory,
    /// The scoring window reaches past the recorded samples
    WindowOutOfRange { session_length: i64, samples: usize },
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::AlreadyRunning => write!(f, "Session is already running"),
            EngineError::Finished => {
                write!(f, "Session has ended; create a new session to start again")
            }
            EngineError::NotRunning => write!(f, "Session is not running"),
            EngineError::EmptyHistory => write!(f, "No pulse samples recorded yet"),
            EngineError::WindowOutOfRange {
                session_length,
                samples,
            } => write!(
                f,
                "Scoring window for second {session_length} exceeds {samples} recorded samples"
            ),
        }
    }
}

impl std::error::Error for EngineError {}
