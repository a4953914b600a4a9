//! Core functionality for the coherence simulator.
//!
//! This module contains:
//! - The windowed coherence scoring algorithm
//! - The session engine that drives it tick by tick
//! - The immutable logs a session emits

pub mod coherence;
pub mod error;
pub mod sample_log;
pub mod session;

// Re-export commonly used types
pub use coherence::{
    compute_coherence, thresholds_for, CoherenceLevel, CoherenceOutcome, Thresholds,
    CHALLENGE_THRESHOLDS, MAX_CHALLENGE_LEVEL, MIN_CHALLENGE_LEVEL, SCORE_INTERVAL_SECS,
    WINDOW_SECS,
};
pub use error::EngineError;
pub use sample_log::{DwellTimes, LogDetail, SampleLog};
pub use session::{EngineState, SessionEngine, UNSCORED};
