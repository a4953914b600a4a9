//! Pulse signal sources for the coherence simulator.
//!
//! The simulator never talks to a real sensor. Readings come from either the
//! synthetic [`SignalSource`] or a [`ScriptedSource`] replaying recorded data.

pub mod generator;
pub mod scripted;
pub mod types;

// Re-export commonly used types
pub use generator::{SignalSource, AMPLITUDE, VERTICAL_SHIFT};
pub use scripted::ScriptedSource;
pub use types::{PulseSource, SignalMode, DEFAULT_CYCLE_RATE, LOW_COHERENCE_CYCLE_RATE};
