//! Fixed-rate clock that drives a session on a background thread.
//!
//! The clock owns the engine and its pulse source while the session runs and
//! publishes every log it produces on a channel. Stopping the clock hands the
//! engine and source back so the source can serve the next session.

use crate::core::{EngineError, SampleLog, SessionEngine};
use crate::signal::PulseSource;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender, TrySendError};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{error, warn};

/// Default tick interval: one sample per second.
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Capacity of the event channel.
const EVENT_BUFFER: usize = 10_000;

/// Something the running session has to report.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Per-tick snapshot
    Live(SampleLog),
    /// Final record, sent once when the clock stops
    Summary(SampleLog),
    /// The engine hit a contract violation and the session was aborted
    Fault(EngineError),
}

/// What a stopped clock hands back.
#[derive(Debug)]
pub struct ClockOutcome<S> {
    /// `None` if the session was aborted by a fault
    pub summary: Option<SampleLog>,
    pub engine: SessionEngine,
    pub source: S,
}

/// Errors from starting or stopping the clock.
#[derive(Debug)]
pub enum ClockError {
    InvalidInterval,
    Engine(EngineError),
    Spawn(std::io::Error),
    AlreadyStopped,
    WorkerPanicked,
}

impl std::fmt::Display for ClockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClockError::InvalidInterval => write!(f, "Tick interval must be greater than zero"),
            ClockError::Engine(e) => write!(f, "Session error: {e}"),
            ClockError::Spawn(e) => write!(f, "Could not start clock thread: {e}"),
            ClockError::AlreadyStopped => write!(f, "Clock is already stopped"),
            ClockError::WorkerPanicked => write!(f, "Clock thread panicked"),
        }
    }
}

impl std::error::Error for ClockError {}

/// Runs one session at a fixed tick rate.
pub struct SessionClock<S: PulseSource + Send + 'static> {
    events: Receiver<SessionEvent>,
    stop_tx: Option<Sender<()>>,
    thread_handle: Option<JoinHandle<ClockOutcome<S>>>,
}

impl<S: PulseSource + Send + 'static> SessionClock<S> {
    /// Start `engine` against `source`, ticking every `interval`.
    ///
    /// The first tick happens before this returns; its log is the first
    /// event on the channel.
    pub fn start(engine: SessionEngine, source: S, interval: Duration) -> Result<Self, ClockError> {
        Self::start_with_capacity(engine, source, interval, EVENT_BUFFER)
    }

    /// Like [`SessionClock::start`], with room for `capacity` unread events.
    ///
    /// One slot is always held back for the final summary (or fault), so a
    /// consumer that falls behind loses live logs, never the summary.
    pub fn start_with_capacity(
        engine: SessionEngine,
        source: S,
        interval: Duration,
        capacity: usize,
    ) -> Result<Self, ClockError> {
        if interval.is_zero() {
            return Err(ClockError::InvalidInterval);
        }

        let capacity = capacity.max(2);
        let (event_tx, events) = bounded(capacity);
        let (stop_tx, stop_rx) = bounded(1);
        let (ready_tx, ready_rx) = bounded(1);

        // The engine is only started once the worker exists to own it.
        let handle = thread::Builder::new()
            .name("session-clock".to_string())
            .spawn(move || run_clock(engine, source, interval, event_tx, stop_rx, ready_tx))
            .map_err(ClockError::Spawn)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(ClockError::Engine(e));
            }
            Err(_) => {
                let _ = handle.join();
                return Err(ClockError::WorkerPanicked);
            }
        }

        Ok(Self {
            events,
            stop_tx: Some(stop_tx),
            thread_handle: Some(handle),
        })
    }

    /// Get the receiver for session events.
    pub fn events(&self) -> &Receiver<SessionEvent> {
        &self.events
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }

    /// Check if the clock thread is still ticking.
    pub fn is_running(&self) -> bool {
        self.thread_handle
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    /// Stop ticking, end the session and return its summary.
    ///
    /// A tick already in progress completes first.
    pub fn stop(mut self) -> Result<ClockOutcome<S>, ClockError> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> Result<ClockOutcome<S>, ClockError> {
        if let Some(stop_tx) = self.stop_tx.take() {
            // The worker may already have exited after a fault.
            let _ = stop_tx.send(());
        }
        let handle = self.thread_handle.take().ok_or(ClockError::AlreadyStopped)?;
        handle.join().map_err(|_| ClockError::WorkerPanicked)
    }
}

impl<S: PulseSource + Send + 'static> Drop for SessionClock<S> {
    fn drop(&mut self) {
        let _ = self.shutdown();
    }
}

fn run_clock<S: PulseSource>(
    mut engine: SessionEngine,
    mut source: S,
    interval: Duration,
    events: Sender<SessionEvent>,
    stop: Receiver<()>,
    ready: Sender<Result<(), EngineError>>,
) -> ClockOutcome<S> {
    match engine.start(&mut source) {
        Ok(first) => {
            publish_live(&events, first);
            let _ = ready.send(Ok(()));
        }
        Err(e) => {
            let _ = ready.send(Err(e));
            return ClockOutcome {
                summary: None,
                engine,
                source,
            };
        }
    }

    let ticker = tick(interval);

    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => match engine.tick(&mut source) {
                Ok(log) => publish_live(&events, log),
                Err(e) => {
                    error!(session_id = %engine.session_id(), error = %e, "Session aborted");
                    publish_final(&events, SessionEvent::Fault(e));
                    return ClockOutcome {
                        summary: None,
                        engine,
                        source,
                    };
                }
            },
        }
    }

    let summary = engine.stop();
    if let Some(ref log) = summary {
        publish_final(&events, SessionEvent::Summary(log.clone()));
    }

    ClockOutcome {
        summary,
        engine,
        source,
    }
}

// Never block the tick on a slow consumer, and keep the last slot free.
fn publish_live(events: &Sender<SessionEvent>, log: SampleLog) {
    let reserved = events.capacity().map(|cap| events.len() + 1 >= cap).unwrap_or(false);
    if reserved {
        warn!(second = log.session_length(), "Event buffer full, dropping live log");
        return;
    }
    if let Err(TrySendError::Full(_)) = events.try_send(SessionEvent::Live(log)) {
        warn!("Event buffer full, dropping live log");
    }
}

// The clock is the only sender and live logs never take the last slot,
// so this cannot block. It only fails once the receiver is gone.
fn publish_final(events: &Sender<SessionEvent>, event: SessionEvent) {
    let _ = events.send(event);
}
