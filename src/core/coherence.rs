//! Coherence scoring over a sliding window of pulse samples.
//!
//! Every [`SCORE_INTERVAL_SECS`] seconds the session compares the most recent
//! ≤64 samples against an ideal sine wave and turns the fit into a 0–16
//! score. All functions here are pure; the session engine owns the state.

use crate::core::error::EngineError;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::f64::consts::PI;
use std::fmt;

/// A new score is computed every this many seconds.
pub const SCORE_INTERVAL_SECS: i64 = 5;

/// Longest span of samples considered by one computation.
pub const WINDOW_SECS: i64 = 64;

/// Score awarded to a perfect fit.
pub const MAX_SCORE: f64 = 16.0;

/// Breathing rates (cycles/min) that are not penalized.
pub const IDEAL_PERIOD_MIN: f64 = 3.0;
pub const IDEAL_PERIOD_MAX: f64 = 15.0;

/// How hard out-of-range periods push the error toward 1.
const PERIOD_PENALTY_RATE: f64 = 8.0;

/// Coherence classification of a score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CoherenceLevel {
    /// No score computed yet
    #[default]
    Unset,
    Low,
    Medium,
    High,
}

impl CoherenceLevel {
    /// Levels a score can be classified into.
    pub const SCORED: [CoherenceLevel; 3] =
        [CoherenceLevel::Low, CoherenceLevel::Medium, CoherenceLevel::High];

    pub fn is_set(self) -> bool {
        self != CoherenceLevel::Unset
    }
}

impl fmt::Display for CoherenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CoherenceLevel::Unset => "NA",
            CoherenceLevel::Low => "Low",
            CoherenceLevel::Medium => "Medium",
            CoherenceLevel::High => "High",
        };
        f.pad(name)
    }
}

/// Score bounds of the Medium band for one challenge level.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Scores strictly below this are Low
    pub low: f64,
    /// Scores strictly above this are High
    pub high: f64,
}

impl Thresholds {
    /// Classify a score against this band.
    pub fn classify(&self, score: f64) -> CoherenceLevel {
        if score < self.low {
            CoherenceLevel::Low
        } else if score > self.high {
            CoherenceLevel::High
        } else {
            CoherenceLevel::Medium
        }
    }
}

/// Medium-coherence bands for challenge levels 1 through 4.
pub const CHALLENGE_THRESHOLDS: [Thresholds; 4] = [
    Thresholds { low: 0.5, high: 0.9 },
    Thresholds { low: 0.6, high: 2.1 },
    Thresholds { low: 1.8, high: 4.0 },
    Thresholds { low: 4.0, high: 6.0 },
];

/// Lowest and highest supported challenge levels.
pub const MIN_CHALLENGE_LEVEL: u8 = 1;
pub const MAX_CHALLENGE_LEVEL: u8 = CHALLENGE_THRESHOLDS.len() as u8;

/// Threshold band for a challenge level.
///
/// Levels outside 1–4 are clamped to the nearest supported level. The device
/// itself falls back to a (0, 0) band for unknown levels, which classifies
/// every positive score as High; callers that need that behavior must range
/// check the level themselves.
pub fn thresholds_for(challenge_level: u8) -> Thresholds {
    let level = challenge_level.clamp(MIN_CHALLENGE_LEVEL, MAX_CHALLENGE_LEVEL);
    CHALLENGE_THRESHOLDS[usize::from(level - 1)]
}

/// The slice of history one coherence computation looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringWindow<'a> {
    /// Samples inside the window, oldest first
    pub samples: &'a [f64],
    /// Session second of `samples[0]`
    pub first_second: i64,
    /// Window length in seconds used for the period estimate
    pub span_secs: f64,
    /// First reading of the session; the fixed reference for every window
    pub baseline: f64,
}

/// Select the scoring window for a session that has reached `session_length`.
///
/// The session's very first sample is never part of a window; it is the
/// baseline every window is measured against.
pub fn select_window(history: &[f64], session_length: i64) -> Result<ScoringWindow<'_>, EngineError> {
    let baseline = *history.first().ok_or(EngineError::EmptyHistory)?;
    if session_length < 1 || session_length as usize >= history.len() {
        return Err(EngineError::WindowOutOfRange {
            session_length,
            samples: history.len(),
        });
    }

    let width = session_length.min(WINDOW_SECS);
    let first_second = session_length - width + 1;
    let samples = &history[first_second as usize..=session_length as usize];

    Ok(ScoringWindow {
        samples,
        first_second,
        span_secs: width as f64,
        baseline,
    })
}

/// Count samples exactly equal to the baseline.
///
/// This is an equality test, not a sign-change detector: with noisy readings
/// it is almost always zero. Scores on the device depend on this exact rule.
pub fn count_baseline_crossings(samples: &[f64], baseline: f64) -> usize {
    samples
        .iter()
        .filter(|s| s.to_bits() == baseline.to_bits())
        .count()
}

/// Estimate the breathing rate in cycles per minute.
pub fn estimate_period(crossings: usize, span_secs: f64) -> f64 {
    (crossings as f64 / 2.0) / (span_secs / 60.0)
}

/// Mean squared deviation of the window from an ideal sine, rescaled into
/// `[0, 1]` by the window's own min and max error.
///
/// Returns `None` when every sample deviates by the same amount, since the
/// rescaling is undefined for a flat error profile.
pub fn normalized_error(window: &ScoringWindow<'_>, period: f64) -> Option<f64> {
    let errors: Vec<f64> = window
        .samples
        .iter()
        .enumerate()
        .map(|(k, &sample)| {
            let second = (window.first_second + k as i64) as f64;
            let ideal = (2.0 * PI * period * second / 60.0).sin() + window.baseline;
            (sample - ideal).powi(2)
        })
        .collect();

    let min_err = Statistics::min(errors.iter());
    let max_err = Statistics::max(errors.iter());
    let mean_err = Statistics::mean(errors.iter());

    let spread = max_err - min_err;
    if spread.is_nan() || spread <= 0.0 {
        return None;
    }
    Some((mean_err - min_err) / spread)
}

/// Push the error toward 1 when the period leaves the ideal breathing range.
pub fn apply_period_penalty(normalized_error: f64, period: f64) -> f64 {
    if period < IDEAL_PERIOD_MIN {
        normalized_error.powf(1.0 / ((IDEAL_PERIOD_MIN - period) * PERIOD_PENALTY_RATE))
    } else if period > IDEAL_PERIOD_MAX {
        normalized_error.powf(1.0 / ((period - IDEAL_PERIOD_MAX) * PERIOD_PENALTY_RATE))
    } else {
        normalized_error
    }
}

/// Convert a (penalized) normalized error into a score. Not clamped.
pub fn score_from_error(normalized_error: f64) -> f64 {
    ((1.0 - normalized_error) * MAX_SCORE).ceil()
}

/// Result of one coherence computation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoherenceOutcome {
    Scored {
        score: f64,
        /// Estimated breathing rate (cycles/min)
        period: f64,
        /// Error after the period penalty
        normalized_error: f64,
    },
    /// All window errors were equal; no score could be derived.
    Degenerate { period: f64 },
}

/// Run a full coherence computation for a session at `session_length`.
pub fn compute_coherence(history: &[f64], session_length: i64) -> Result<CoherenceOutcome, EngineError> {
    let window = select_window(history, session_length)?;
    let crossings = count_baseline_crossings(window.samples, window.baseline);
    let period = estimate_period(crossings, window.span_secs);

    let outcome = match normalized_error(&window, period) {
        Some(raw) => {
            let normalized_error = apply_period_penalty(raw, period);
            CoherenceOutcome::Scored {
                score: score_from_error(normalized_error),
                period,
                normalized_error,
            }
        }
        None => CoherenceOutcome::Degenerate { period },
    };

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_table_is_ordered() {
        for level in MIN_CHALLENGE_LEVEL..=MAX_CHALLENGE_LEVEL {
            let t = thresholds_for(level);
            assert!(t.low < t.high, "level {level}: {t:?}");
        }
    }

    #[test]
    fn test_thresholds_clamp_out_of_range_levels() {
        assert_eq!(thresholds_for(0), CHALLENGE_THRESHOLDS[0]);
        assert_eq!(thresholds_for(9), CHALLENGE_THRESHOLDS[3]);
        assert_eq!(thresholds_for(2), Thresholds { low: 0.6, high: 2.1 });
    }

    #[test]
    fn test_classify_boundaries() {
        let t = thresholds_for(3);
        assert_eq!(t.classify(1.0), CoherenceLevel::Low);
        assert_eq!(t.classify(1.8), CoherenceLevel::Medium);
        assert_eq!(t.classify(4.0), CoherenceLevel::Medium);
        assert_eq!(t.classify(5.0), CoherenceLevel::High);
    }

    #[test]
    fn test_short_session_window_skips_baseline() {
        let history: Vec<f64> = (0..=10).map(|i| i as f64).collect();
        let window = select_window(&history, 10).unwrap();
        assert_eq!(window.first_second, 1);
        assert_eq!(window.samples.len(), 10);
        assert_eq!(window.samples[0], 1.0);
        assert_eq!(window.span_secs, 10.0);
        assert_eq!(window.baseline, 0.0);
    }

    #[test]
    fn test_long_session_window_is_last_64() {
        let history: Vec<f64> = (0..=70).map(|i| i as f64 + 100.0).collect();
        let window = select_window(&history, 70).unwrap();
        assert_eq!(window.first_second, 7);
        assert_eq!(window.samples.len(), 64);
        assert_eq!(window.samples[0], 107.0);
        assert_eq!(*window.samples.last().unwrap(), 170.0);
        assert_eq!(window.span_secs, 64.0);
        assert_eq!(window.baseline, 100.0);
    }

    #[test]
    fn test_window_at_exactly_64_seconds() {
        let history: Vec<f64> = (0..=64).map(|i| i as f64).collect();
        let window = select_window(&history, 64).unwrap();
        assert_eq!(window.first_second, 1);
        assert_eq!(window.samples.len(), 64);
    }

    #[test]
    fn test_window_on_empty_history_fails() {
        assert_eq!(select_window(&[], 5), Err(EngineError::EmptyHistory));
    }

    #[test]
    fn test_window_past_history_fails() {
        let history = vec![85.0; 3];
        assert_eq!(
            select_window(&history, 5),
            Err(EngineError::WindowOutOfRange {
                session_length: 5,
                samples: 3
            })
        );
        assert!(select_window(&history, 0).is_err());
    }

    #[test]
    fn test_crossings_use_exact_equality() {
        let samples = [85.0, 85.000001, 84.0, 85.0, 86.0];
        assert_eq!(count_baseline_crossings(&samples, 85.0), 2);
        assert_eq!(count_baseline_crossings(&samples, 10.0), 0);
    }

    #[test]
    fn test_period_estimate() {
        assert_eq!(estimate_period(0, 5.0), 0.0);
        // 2 crossings in 5 seconds: one cycle per 5s = 12 cycles/min
        assert!((estimate_period(2, 5.0) - 12.0).abs() < 1e-12);
        assert!((estimate_period(8, 15.0) - 16.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalized_error_against_flat_curve() {
        let history = [85.0, 86.0, 87.0, 85.5, 84.0, 88.0];
        let window = select_window(&history, 5).unwrap();
        // errors: 1, 4, 0.25, 1, 9 -> mean 3.05, min 0.25, max 9
        let err = normalized_error(&window, 0.0).unwrap();
        assert!((err - 0.32).abs() < 1e-9);
    }

    #[test]
    fn test_flat_error_profile_is_degenerate() {
        let history = [85.0, 86.0, 84.0, 86.0, 84.0, 86.0];
        let window = select_window(&history, 5).unwrap();
        assert_eq!(normalized_error(&window, 0.0), None);
        assert_eq!(
            compute_coherence(&history, 5),
            Ok(CoherenceOutcome::Degenerate { period: 0.0 })
        );
    }

    #[test]
    fn test_penalty_only_outside_ideal_range() {
        assert_eq!(apply_period_penalty(0.4, 3.0), 0.4);
        assert_eq!(apply_period_penalty(0.4, 10.0), 0.4);
        assert_eq!(apply_period_penalty(0.4, 15.0), 0.4);
        assert!(apply_period_penalty(0.4, 2.0) > 0.4);
        assert!(apply_period_penalty(0.4, 20.0) > 0.4);
    }

    #[test]
    fn test_penalty_just_above_range_uses_eighth_root() {
        let raw: f64 = 0.3;
        let penalized = apply_period_penalty(raw, 16.0);
        assert!((penalized - raw.powf(0.125)).abs() < 1e-12);
        assert!(penalized > raw && penalized < 1.0);
    }

    #[test]
    fn test_penalty_grows_with_distance() {
        let near = apply_period_penalty(0.3, 2.5);
        let far = apply_period_penalty(0.3, 0.0);
        assert!(far > near);
    }

    #[test]
    fn test_score_from_error() {
        assert_eq!(score_from_error(0.0), 16.0);
        assert_eq!(score_from_error(1.0), 0.0);
        assert_eq!(score_from_error(0.5), 8.0);
        assert_eq!(score_from_error(0.99), 1.0);
    }

    #[test]
    fn test_compute_coherence_hand_worked() {
        let history = [85.0, 86.0, 87.0, 85.5, 84.0, 88.0];
        let outcome = compute_coherence(&history, 5).unwrap();
        match outcome {
            CoherenceOutcome::Scored {
                score,
                period,
                normalized_error,
            } => {
                assert_eq!(period, 0.0);
                // 0.32^(1/24) = 0.95363...
                assert!((normalized_error - 0.32f64.powf(1.0 / 24.0)).abs() < 1e-9);
                assert_eq!(score, 1.0);
            }
            other => panic!("expected a score, got {other:?}"),
        }
    }

    #[test]
    fn test_compute_coherence_is_repeatable() {
        let history: Vec<f64> = (0..=40).map(|i| 85.0 + (i as f64 * 0.7).sin() * 6.0).collect();
        let first = compute_coherence(&history, 40).unwrap();
        let second = compute_coherence(&history, 40).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_level_display() {
        assert_eq!(CoherenceLevel::Unset.to_string(), "NA");
        assert_eq!(CoherenceLevel::Medium.to_string(), "Medium");
    }
}
