//! Immutable records emitted by a session.
//!
//! A running session emits one *live* log per tick for the display, and one
//! *summary* log when it ends. Summaries are what the session history keeps.

use crate::core::coherence::{CoherenceLevel, SCORE_INTERVAL_SECS};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Seconds spent at each coherence level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellTimes {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
}

impl DwellTimes {
    /// Credit `secs` seconds to `level`. [`CoherenceLevel::Unset`] is ignored.
    pub fn add(&mut self, level: CoherenceLevel, secs: u32) {
        match level {
            CoherenceLevel::Low => self.low += secs,
            CoherenceLevel::Medium => self.medium += secs,
            CoherenceLevel::High => self.high += secs,
            CoherenceLevel::Unset => {}
        }
    }

    pub fn get(&self, level: CoherenceLevel) -> u32 {
        match level {
            CoherenceLevel::Low => self.low,
            CoherenceLevel::Medium => self.medium,
            CoherenceLevel::High => self.high,
            CoherenceLevel::Unset => 0,
        }
    }

    /// Total seconds across all levels.
    pub fn total(&self) -> u32 {
        self.low + self.medium + self.high
    }

    /// Check if no time has been credited yet.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Share of time per level, in percent. Empty when nothing was credited.
    pub fn distribution(&self) -> BTreeMap<CoherenceLevel, f64> {
        let total = self.total();
        if total == 0 {
            return BTreeMap::new();
        }

        CoherenceLevel::SCORED
            .iter()
            .map(|&level| (level, self.get(level) as f64 / total as f64 * 100.0))
            .collect()
    }
}

/// Fields specific to each kind of log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum LogDetail {
    /// Per-tick snapshot for the display
    Live {
        /// Most recent score, or -1 before the first computation
        coherence_score: f64,
        coherence_level: CoherenceLevel,
        /// Set only on the tick where the level changed
        level_changed: bool,
        /// Breath pacer interval in seconds
        pacer_speed: u32,
        /// The scoring window this tick was degenerate; the score is carried over
        #[serde(default)]
        degraded: bool,
    },
    /// End-of-session record for storage
    Summary {
        challenge_level: u8,
        dwell_times: DwellTimes,
    },
}

/// Snapshot of a session's state at one point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleLog {
    session_id: Uuid,
    recorded_at: DateTime<Utc>,
    /// Seconds since the session started; -1 if it never ticked
    session_length: i64,
    achievement_score: f64,
    pulse_data: Vec<f64>,
    #[serde(flatten)]
    detail: LogDetail,
}

impl SampleLog {
    pub(crate) fn new(
        session_id: Uuid,
        session_length: i64,
        achievement_score: f64,
        pulse_data: Vec<f64>,
        detail: LogDetail,
    ) -> Self {
        Self {
            session_id,
            recorded_at: Utc::now(),
            session_length,
            achievement_score,
            pulse_data,
            detail,
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// When this log was created.
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }

    pub fn session_length(&self) -> i64 {
        self.session_length
    }

    pub fn achievement_score(&self) -> f64 {
        self.achievement_score
    }

    /// Pulse readings recorded up to this log, oldest first.
    pub fn pulse_data(&self) -> &[f64] {
        &self.pulse_data
    }

    pub fn detail(&self) -> &LogDetail {
        &self.detail
    }

    pub fn is_live(&self) -> bool {
        matches!(self.detail, LogDetail::Live { .. })
    }

    pub fn is_summary(&self) -> bool {
        matches!(self.detail, LogDetail::Summary { .. })
    }

    /// Current score of a live log, if one has been computed.
    pub fn coherence_score(&self) -> Option<f64> {
        match self.detail {
            LogDetail::Live {
                coherence_score,
                coherence_level,
                ..
            } if coherence_level.is_set() => Some(coherence_score),
            _ => None,
        }
    }

    /// Current level of a live log, if one has been computed.
    pub fn coherence_level(&self) -> Option<CoherenceLevel> {
        match self.detail {
            LogDetail::Live {
                coherence_level, ..
            } if coherence_level.is_set() => Some(coherence_level),
            _ => None,
        }
    }

    /// Whether the level changed on the tick that produced this log.
    pub fn level_changed(&self) -> bool {
        matches!(
            self.detail,
            LogDetail::Live {
                level_changed: true,
                ..
            }
        )
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self.detail, LogDetail::Live { degraded: true, .. })
    }

    pub fn pacer_speed(&self) -> Option<u32> {
        match self.detail {
            LogDetail::Live { pacer_speed, .. } => Some(pacer_speed),
            LogDetail::Summary { .. } => None,
        }
    }

    pub fn challenge_level(&self) -> Option<u8> {
        match self.detail {
            LogDetail::Summary {
                challenge_level, ..
            } => Some(challenge_level),
            LogDetail::Live { .. } => None,
        }
    }

    pub fn dwell_times(&self) -> Option<&DwellTimes> {
        match &self.detail {
            LogDetail::Summary { dwell_times, .. } => Some(dwell_times),
            LogDetail::Live { .. } => None,
        }
    }

    /// Mean score per computation: achievement ÷ floor(length / 5).
    ///
    /// `None` until at least one computation could have happened.
    pub fn average_coherence(&self) -> Option<f64> {
        let computations = self.session_length.div_euclid(SCORE_INTERVAL_SECS);
        if computations < 1 {
            return None;
        }
        Some(self.achievement_score / computations as f64)
    }

    /// Percentage of dwell time per level. Empty for live logs and for
    /// summaries of sessions that never scored.
    pub fn coherence_distribution(&self) -> BTreeMap<CoherenceLevel, f64> {
        self.dwell_times()
            .map(DwellTimes::distribution)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(session_length: i64, achievement_score: f64, dwell_times: DwellTimes) -> SampleLog {
        SampleLog::new(
            Uuid::new_v4(),
            session_length,
            achievement_score,
            Vec::new(),
            LogDetail::Summary {
                challenge_level: 2,
                dwell_times,
            },
        )
    }

    fn live(coherence_score: f64, coherence_level: CoherenceLevel) -> SampleLog {
        SampleLog::new(
            Uuid::new_v4(),
            3,
            0.0,
            vec![85.0, 86.0, 87.0, 88.0],
            LogDetail::Live {
                coherence_score,
                coherence_level,
                level_changed: false,
                pacer_speed: 10,
                degraded: false,
            },
        )
    }

    #[test]
    fn test_dwell_accounting() {
        let mut dwell = DwellTimes::default();
        assert!(dwell.is_empty());
        dwell.add(CoherenceLevel::Low, 5);
        dwell.add(CoherenceLevel::High, 5);
        dwell.add(CoherenceLevel::High, 5);
        dwell.add(CoherenceLevel::Unset, 5);
        assert_eq!(dwell.total(), 15);
        assert_eq!(dwell.get(CoherenceLevel::High), 10);
        assert_eq!(dwell.get(CoherenceLevel::Medium), 0);
    }

    #[test]
    fn test_distribution_percentages() {
        let log = summary(20, 30.0, DwellTimes { low: 5, medium: 5, high: 10 });
        let dist = log.coherence_distribution();
        assert_eq!(dist.len(), 3);
        assert!((dist[&CoherenceLevel::Low] - 25.0).abs() < 1e-9);
        assert!((dist[&CoherenceLevel::Medium] - 25.0).abs() < 1e-9);
        assert!((dist[&CoherenceLevel::High] - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_distribution_empty_without_dwell() {
        assert!(summary(3, 0.0, DwellTimes::default()).coherence_distribution().is_empty());
        assert!(live(4.0, CoherenceLevel::High).coherence_distribution().is_empty());
    }

    #[test]
    fn test_average_coherence() {
        let log = summary(23, 30.0, DwellTimes { low: 5, medium: 5, high: 10 });
        // floor(23 / 5) = 4 computations
        assert_eq!(log.average_coherence(), Some(7.5));
    }

    #[test]
    fn test_average_coherence_guarded_for_short_sessions() {
        assert_eq!(summary(4, 0.0, DwellTimes::default()).average_coherence(), None);
        assert_eq!(summary(-1, 0.0, DwellTimes::default()).average_coherence(), None);
    }

    #[test]
    fn test_live_accessors() {
        let log = live(6.0, CoherenceLevel::Medium);
        assert!(log.is_live());
        assert_eq!(log.coherence_score(), Some(6.0));
        assert_eq!(log.coherence_level(), Some(CoherenceLevel::Medium));
        assert_eq!(log.pacer_speed(), Some(10));
        assert_eq!(log.challenge_level(), None);
        assert!(log.dwell_times().is_none());
    }

    #[test]
    fn test_unscored_live_log_hides_sentinel() {
        let log = live(-1.0, CoherenceLevel::Unset);
        assert_eq!(log.coherence_score(), None);
        assert_eq!(log.coherence_level(), None);
    }

    #[test]
    fn test_summary_omits_live_fields() {
        let log = summary(10, 8.0, DwellTimes { low: 10, medium: 0, high: 0 });
        assert!(log.is_summary());
        assert_eq!(log.coherence_score(), None);
        assert_eq!(log.coherence_level(), None);
        assert!(!log.level_changed());
        assert_eq!(log.challenge_level(), Some(2));
    }

    #[test]
    fn test_json_shape() {
        let log = summary(10, 8.0, DwellTimes { low: 10, medium: 0, high: 0 });
        let json = serde_json::to_value(&log).unwrap();
        assert_eq!(json["mode"], "summary");
        assert_eq!(json["dwell_times"]["low"], 10);
        assert!(json.get("coherence_score").is_none());

        let back: SampleLog = serde_json::from_value(json).unwrap();
        assert_eq!(back, log);
    }
}
