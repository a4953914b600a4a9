//! Coherence Sim - biofeedback device simulator that scores heart-rhythm coherence.
//!
//! A synthetic pulse signal is sampled once per second. Every five seconds the
//! most recent window of up to 64 samples is compared against an idealized
//! breathing waveform and turned into a coherence score, which is classified
//! as Low, Medium or High according to the session's challenge level.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Coherence Sim                         │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐   ┌─────────────┐   ┌─────────────┐       │
//! │  │   Signal    │──▶│   Session   │──▶│  Sample     │       │
//! │  │   Source    │   │   Engine    │   │  Log (live) │       │
//! │  └─────────────┘   └─────────────┘   └─────────────┘       │
//! │                           ▲                                 │
//! │                           │ tick (1s)       stop            │
//! │                    ┌─────────────┐   ┌─────────────┐       │
//! │                    │   Session   │──▶│  Summary    │       │
//! │                    │   Clock     │   │  ─▶ History │       │
//! │                    └─────────────┘   └─────────────┘       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```
//! use coherence_sim::{SessionEngine, SignalMode, SignalSource};
//!
//! let mut source = SignalSource::with_seed(SignalMode::Normal, 7);
//! let mut engine = SessionEngine::new(2, 10);
//!
//! engine.start(&mut source).unwrap();
//! for _ in 0..10 {
//!     let log = engine.tick(&mut source).unwrap();
//!     println!("{}s: {:?}", log.session_length(), log.coherence_level());
//! }
//!
//! let summary = engine.stop().unwrap();
//! assert_eq!(summary.session_length(), 10);
//! ```

pub mod clock;
pub mod config;
pub mod core;
pub mod history;
pub mod signal;

// Re-export key types at crate root for convenience
pub use clock::{ClockError, ClockOutcome, SessionClock, SessionEvent};
pub use config::{Config, ConfigError};
pub use core::{
    CoherenceLevel, CoherenceOutcome, DwellTimes, EngineError, EngineState, LogDetail, SampleLog,
    SessionEngine,
};
pub use history::{HistoryError, SessionHistory};
pub use signal::{PulseSource, ScriptedSource, SignalMode, SignalSource};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
