//! Session history for the coherence simulator.
//!
//! The storage side of the device: summaries handed over at the end of a
//! session, kept on disk between runs.

pub mod store;

// Re-export commonly used types
pub use store::{HistoryError, SessionHistory};
