//! Shared types for pulse sample producers.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Cycle rate (cycles per minute) used when the source imitates low coherence.
pub const LOW_COHERENCE_CYCLE_RATE: f64 = 25.0;

/// Cycle rate (cycles per minute) used for every other mode.
pub const DEFAULT_CYCLE_RATE: f64 = 10.0;

/// Waveform preset for the synthetic signal.
///
/// Only "low" is distinguished; any other name parses to [`SignalMode::Normal`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalMode {
    /// Fast, irregular breathing (25 cycles/min)
    Low,
    /// Default rhythm (10 cycles/min)
    #[default]
    Normal,
}

impl SignalMode {
    /// Cycle rate in cycles per minute for this mode.
    pub fn cycle_rate(self) -> f64 {
        match self {
            SignalMode::Low => LOW_COHERENCE_CYCLE_RATE,
            SignalMode::Normal => DEFAULT_CYCLE_RATE,
        }
    }
}

impl FromStr for SignalMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("low") {
            Ok(SignalMode::Low)
        } else {
            Ok(SignalMode::Normal)
        }
    }
}

impl fmt::Display for SignalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalMode::Low => write!(f, "low"),
            SignalMode::Normal => write!(f, "normal"),
        }
    }
}

/// Anything that can hand the session engine one pulse reading per tick.
pub trait PulseSource {
    /// Produce the reading observed `elapsed_secs` seconds into the session.
    fn sample(&mut self, elapsed_secs: f64) -> f64;
}

impl<P: PulseSource + ?Sized> PulseSource for &mut P {
    fn sample(&mut self, elapsed_secs: f64) -> f64 {
        (**self).sample(elapsed_secs)
    }
}

impl<P: PulseSource + ?Sized> PulseSource for Box<P> {
    fn sample(&mut self, elapsed_secs: f64) -> f64 {
        (**self).sample(elapsed_secs)
    }
}
