//! Demonstration of a clock-driven coherence session.
//!
//! This example shows how to:
//! 1. Create a synthetic pulse source
//! 2. Run a session on the background clock
//! 3. Receive live logs as the session ticks
//! 4. Stop the session and read its summary
//! 5. Reuse the same source for a second, low-coherence session
//!
//! Run with: cargo run --example session_demo
//!
//! The clock runs at 20ms per session second, so each session takes about 1.5s.

use std::time::Duration;

use coherence_sim::{
    core::CoherenceLevel, SessionClock, SessionEngine, SessionEvent, SignalMode, SignalSource,
};

const SESSION_SECS: i64 = 75;

fn main() {
    println!("Coherence Sim - Session Demo");
    println!("===========================");
    println!();

    let source = SignalSource::with_seed(SignalMode::Normal, 42);
    let source = run_session("Normal rhythm", SessionEngine::new(2, 10), source);

    let mut source = match source {
        Some(source) => source,
        None => return,
    };
    source.reconfigure("low");
    run_session("Fast breathing", SessionEngine::new(2, 10), source);
}

fn run_session(title: &str, engine: SessionEngine, source: SignalSource) -> Option<SignalSource> {
    println!("{title} (cycle rate {}/min)", source.cycle_rate());
    println!("{}", "-".repeat(40));

    let clock = match SessionClock::start(engine, source, Duration::from_millis(20)) {
        Ok(clock) => clock,
        Err(e) => {
            eprintln!("Error starting session: {e}");
            return None;
        }
    };

    for event in clock.events().iter() {
        match event {
            SessionEvent::Live(log) => {
                if let (Some(score), Some(level)) = (log.coherence_score(), log.coherence_level())
                {
                    let marker = if log.level_changed() { "  <- level change" } else { "" };
                    println!("  {:>3}s  score {score:>4.0}  {level}{marker}", log.session_length());
                }
                if log.session_length() >= SESSION_SECS {
                    break;
                }
            }
            SessionEvent::Fault(e) => {
                eprintln!("Session aborted: {e}");
                break;
            }
            SessionEvent::Summary(_) => break,
        }
    }

    let outcome = match clock.stop() {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error stopping session: {e}");
            return None;
        }
    };

    if let Some(summary) = outcome.summary {
        println!();
        println!("  Length: {}s", summary.session_length());
        println!("  Achievement: {:.1}", summary.achievement_score());
        if let Some(avg) = summary.average_coherence() {
            println!("  Average coherence: {avg:.2}");
        }
        let distribution = summary.coherence_distribution();
        for level in CoherenceLevel::SCORED {
            let share = distribution.get(&level).copied().unwrap_or(0.0);
            println!("  {level:<7} {share:5.1}%");
        }
    }
    println!();

    Some(outcome.source)
}
