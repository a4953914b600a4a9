//! The session engine: one scoring session from start to summary.
//!
//! The engine is driven by an external clock. Each tick pulls one reading
//! from a [`PulseSource`], and every fifth tick re-scores the recent window.
//! Sessions are never reset in place; start a new [`SessionEngine`] instead.

use crate::core::coherence::{
    compute_coherence, thresholds_for, CoherenceLevel, CoherenceOutcome, SCORE_INTERVAL_SECS,
};
use crate::core::error::EngineError;
use crate::core::sample_log::{DwellTimes, LogDetail, SampleLog};
use crate::signal::PulseSource;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Score reported before the first computation.
pub const UNSCORED: f64 = -1.0;

/// Challenge level a new session starts with unless told otherwise.
pub const DEFAULT_CHALLENGE_LEVEL: u8 = 1;

/// Breath pacer interval (seconds) a new session starts with unless told otherwise.
pub const DEFAULT_PACER_SPEED: u32 = 10;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Created, clock not started
    Idle,
    /// Ticking once per clock interval
    Running,
    /// Ended; the summary has been emitted
    Stopped,
}

/// Scores one biofeedback session.
#[derive(Debug, Clone)]
pub struct SessionEngine {
    session_id: Uuid,
    started_at: Option<DateTime<Utc>>,
    state: EngineState,
    /// 1–4, higher is harder
    challenge_level: u8,
    /// Seconds per breath, display only
    pacer_speed: u32,
    pulse_data: Vec<f64>,
    coherence_score: f64,
    coherence_level: CoherenceLevel,
    level_changed: bool,
    degraded: bool,
    achievement_score: f64,
    dwell_times: DwellTimes,
    /// -1 until the first tick
    session_length: i64,
}

impl SessionEngine {
    /// Create an idle session.
    ///
    /// Settings are taken as given; range checks belong to whoever adjusts them.
    pub fn new(challenge_level: u8, pacer_speed: u32) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            started_at: None,
            state: EngineState::Idle,
            challenge_level,
            pacer_speed,
            pulse_data: Vec::new(),
            coherence_score: UNSCORED,
            coherence_level: CoherenceLevel::Unset,
            level_changed: false,
            degraded: false,
            achievement_score: 0.0,
            dwell_times: DwellTimes::default(),
            session_length: -1,
        }
    }

    /// Start the session, recording the first (baseline) sample immediately.
    pub fn start<S: PulseSource + ?Sized>(&mut self, source: &mut S) -> Result<SampleLog, EngineError> {
        match self.state {
            EngineState::Idle => {}
            EngineState::Running => return Err(EngineError::AlreadyRunning),
            EngineState::Stopped => return Err(EngineError::Finished),
        }

        self.state = EngineState::Running;
        self.started_at = Some(Utc::now());
        info!(
            session_id = %self.session_id,
            challenge_level = self.challenge_level,
            pacer_speed = self.pacer_speed,
            "Session started"
        );

        self.advance(source)
    }

    /// Advance the session by one second.
    pub fn tick<S: PulseSource + ?Sized>(&mut self, source: &mut S) -> Result<SampleLog, EngineError> {
        if self.state != EngineState::Running {
            return Err(EngineError::NotRunning);
        }
        self.advance(source)
    }

    /// End the session and return its summary.
    ///
    /// A session that was never started still produces a (empty) summary.
    /// Returns `None` if the session already ended.
    pub fn stop(&mut self) -> Option<SampleLog> {
        if self.state == EngineState::Stopped {
            return None;
        }

        self.state = EngineState::Stopped;
        info!(
            session_id = %self.session_id,
            session_length = self.session_length,
            achievement_score = self.achievement_score,
            "Session ended"
        );

        Some(SampleLog::new(
            self.session_id,
            self.session_length,
            self.achievement_score,
            self.pulse_data.clone(),
            LogDetail::Summary {
                challenge_level: self.challenge_level,
                dwell_times: self.dwell_times,
            },
        ))
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// When `start` was called, if it has been.
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == EngineState::Running
    }

    pub fn challenge_level(&self) -> u8 {
        self.challenge_level
    }

    pub fn set_challenge_level(&mut self, level: u8) {
        self.challenge_level = level;
    }

    pub fn pacer_speed(&self) -> u32 {
        self.pacer_speed
    }

    pub fn set_pacer_speed(&mut self, speed: u32) {
        self.pacer_speed = speed;
    }

    pub fn pulse_data(&self) -> &[f64] {
        &self.pulse_data
    }

    /// Latest score, or [`UNSCORED`].
    pub fn coherence_score(&self) -> f64 {
        self.coherence_score
    }

    pub fn coherence_level(&self) -> CoherenceLevel {
        self.coherence_level
    }

    pub fn achievement_score(&self) -> f64 {
        self.achievement_score
    }

    pub fn dwell_times(&self) -> &DwellTimes {
        &self.dwell_times
    }

    pub fn session_length(&self) -> i64 {
        self.session_length
    }

    fn advance<S: PulseSource + ?Sized>(&mut self, source: &mut S) -> Result<SampleLog, EngineError> {
        self.session_length += 1;
        let reading = source.sample(self.session_length as f64);
        self.pulse_data.push(reading);

        if self.session_length > 0 && self.session_length % SCORE_INTERVAL_SECS == 0 {
            self.update_coherence()?;
        }

        let log = SampleLog::new(
            self.session_id,
            self.session_length,
            self.achievement_score,
            self.pulse_data.clone(),
            LogDetail::Live {
                coherence_score: self.coherence_score,
                coherence_level: self.coherence_level,
                level_changed: self.level_changed,
                pacer_speed: self.pacer_speed,
                degraded: self.degraded,
            },
        );

        // Both flags describe this tick only.
        self.level_changed = false;
        self.degraded = false;

        Ok(log)
    }

    fn update_coherence(&mut self) -> Result<(), EngineError> {
        match compute_coherence(&self.pulse_data, self.session_length)? {
            CoherenceOutcome::Scored {
                score,
                period,
                normalized_error,
            } => {
                let level = thresholds_for(self.challenge_level).classify(score);

                self.coherence_score = score;
                self.achievement_score += score;
                self.level_changed = level != self.coherence_level;
                self.coherence_level = level;
                self.dwell_times.add(level, SCORE_INTERVAL_SECS as u32);

                debug!(
                    second = self.session_length,
                    score,
                    period,
                    normalized_error,
                    level = %level,
                    changed = self.level_changed,
                    "Coherence updated"
                );
            }
            CoherenceOutcome::Degenerate { period } => {
                // The last valid score and level stand in for this window.
                // Before any score exists the window counts as Medium, worth 0.
                let carried_score = if self.coherence_level.is_set() {
                    self.coherence_score
                } else {
                    0.0
                };
                let credited_level = if self.coherence_level.is_set() {
                    self.coherence_level
                } else {
                    CoherenceLevel::Medium
                };

                self.achievement_score += carried_score;
                self.dwell_times.add(credited_level, SCORE_INTERVAL_SECS as u32);
                self.degraded = true;
                self.level_changed = false;
                warn!(
                    second = self.session_length,
                    period,
                    carried_score,
                    level = %credited_level,
                    "Flat error window, coherence score carried over"
                );
            }
        }
        Ok(())
    }
}

impl Default for SessionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_CHALLENGE_LEVEL, DEFAULT_PACER_SPEED)
    }
}
