//! Playback source that replays a fixed sequence of readings.
//!
//! Used to re-score stored pulse histories and to drive the engine with
//! hand-picked samples. Elapsed time is ignored; readings are served in order.

use crate::signal::types::PulseSource;

/// Replays a recorded sequence of pulse readings.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    readings: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Create a source that serves `readings` in order.
    ///
    /// Once exhausted it keeps repeating the final reading (or 0.0 for an
    /// empty script).
    pub fn new(readings: Vec<f64>) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }

    /// Number of readings not yet served.
    pub fn remaining(&self) -> usize {
        self.readings.len().saturating_sub(self.cursor)
    }

    /// Check if every scripted reading has been served.
    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }
}

impl PulseSource for ScriptedSource {
    fn sample(&mut self, _elapsed_secs: f64) -> f64 {
        match self.readings.get(self.cursor) {
            Some(&reading) => {
                self.cursor += 1;
                reading
            }
            None => self.readings.last().copied().unwrap_or(0.0),
        }
    }
}
