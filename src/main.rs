//! Coherence Sim CLI
//!
//! Runs simulated biofeedback sessions and manages the kept session history.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coherence_sim::{
    config::Config,
    core::{CoherenceLevel, SampleLog, SessionEngine},
    history::SessionHistory,
    signal::{ScriptedSource, SignalMode, SignalSource},
    SessionClock, SessionEvent, VERSION,
};
use crossbeam_channel::RecvTimeoutError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coherence-sim")]
#[command(version = VERSION)]
#[command(about = "Biofeedback session simulator with real-time coherence scoring", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a session until the duration elapses or Ctrl+C
    Run {
        /// Challenge level (1-4), overrides the saved setting
        #[arg(long)]
        challenge: Option<u8>,

        /// Breath pacer interval in seconds (1-30), overrides the saved setting
        #[arg(long)]
        pacer: Option<u32>,

        /// Signal mode (low or normal), overrides the saved setting
        #[arg(long)]
        mode: Option<SignalMode>,

        /// Stop after this many session seconds
        #[arg(long)]
        duration: Option<u64>,

        /// Wall-clock milliseconds per session second
        #[arg(long)]
        tick_ms: Option<u64>,

        /// Seed for the signal noise, for reproducible sessions
        #[arg(long)]
        seed: Option<u64>,

        /// Keep the summary in the session history
        #[arg(long)]
        keep: bool,
    },

    /// Inspect or edit kept sessions
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Re-score a kept session's recorded pulse data
    Replay {
        /// Index from `history list`
        index: usize,
    },

    /// Show or update the saved settings
    Config {
        /// Challenge level (1-4)
        #[arg(long)]
        challenge: Option<u8>,

        /// Breath pacer interval in seconds (1-30)
        #[arg(long)]
        pacer: Option<u32>,

        /// Signal mode (low or normal)
        #[arg(long)]
        mode: Option<SignalMode>,
    },
}

#[derive(Subcommand)]
enum HistoryAction {
    /// List kept sessions
    List,

    /// Show one kept session
    Show {
        index: usize,

        /// Print the stored record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Delete one kept session
    Remove { index: usize },

    /// Delete every kept session
    Clear,
}

/// Settings for `run` that override the saved configuration.
struct RunOptions {
    challenge: Option<u8>,
    pacer: Option<u32>,
    mode: Option<SignalMode>,
    duration: Option<u64>,
    tick_ms: Option<u64>,
    seed: Option<u64>,
    keep: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            challenge,
            pacer,
            mode,
            duration,
            tick_ms,
            seed,
            keep,
        } => cmd_run(RunOptions {
            challenge,
            pacer,
            mode,
            duration,
            tick_ms,
            seed,
            keep,
        }),
        Commands::History { action } => cmd_history(action),
        Commands::Replay { index } => cmd_replay(index),
        Commands::Config {
            challenge,
            pacer,
            mode,
        } => cmd_config(challenge, pacer, mode),
    }
}

/// Library diagnostics go to stderr; quiet unless RUST_LOG asks for more.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_run(opts: RunOptions) -> Result<()> {
    let mut config = Config::load().context("Could not load configuration")?;
    if let Some(level) = opts.challenge {
        config.challenge_level = level;
    }
    if let Some(speed) = opts.pacer {
        config.pacer_speed = speed;
    }
    if let Some(mode) = opts.mode {
        config.signal_mode = mode;
    }
    if let Some(ms) = opts.tick_ms {
        config.tick_interval = Duration::from_millis(ms);
    }
    config.validate().context("Invalid session settings")?;

    let source = match opts.seed {
        Some(seed) => SignalSource::with_seed(config.signal_mode, seed),
        None => SignalSource::new(config.signal_mode),
    };
    let engine = SessionEngine::new(config.challenge_level, config.pacer_speed);

    println!("Coherence Sim v{VERSION}");
    println!();
    println!("Starting session {}", engine.session_id());
    println!("  Challenge level: {}", config.challenge_level);
    println!("  Pacer: one breath every {}s", config.pacer_speed);
    println!("  Signal mode: {}", config.signal_mode);
    match opts.duration {
        Some(secs) => println!("  Duration: {}", format_length(secs as i64)),
        None => println!("  Duration: until stopped"),
    }
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })
    .context("Error setting Ctrl+C handler")?;

    let clock = SessionClock::start(engine, source, config.tick_interval)
        .context("Could not start session")?;

    while running.load(Ordering::SeqCst) {
        match clock.events().recv_timeout(Duration::from_millis(100)) {
            Ok(SessionEvent::Live(log)) => {
                print_live(&log);
                let finished = opts
                    .duration
                    .map(|secs| log.session_length() >= secs as i64)
                    .unwrap_or(false);
                if finished {
                    break;
                }
            }
            Ok(SessionEvent::Fault(e)) => {
                eprintln!("Session aborted: {e}");
                break;
            }
            Ok(SessionEvent::Summary(_)) => break,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                eprintln!("Session clock disconnected unexpectedly");
                break;
            }
        }
    }

    println!();
    println!("Stopping session...");
    let outcome = clock.stop().context("Could not stop session")?;
    let Some(summary) = outcome.summary else {
        bail!("Session ended without a summary");
    };

    println!();
    print_summary(&summary);

    if opts.keep {
        let mut history = open_history(&config)?;
        history.add(summary).context("Could not keep session")?;
        history.save().context("Could not save session history")?;
        println!();
        println!("Session kept as #{}", history.len() - 1);
    }

    Ok(())
}

fn cmd_history(action: HistoryAction) -> Result<()> {
    let config = Config::load().context("Could not load configuration")?;
    let mut history = open_history(&config)?;

    match action {
        HistoryAction::List => {
            if history.is_empty() {
                println!("No kept sessions.");
                println!("Run 'coherence-sim run --keep' to keep one.");
                return Ok(());
            }
            for (index, entry) in history.entries().iter().enumerate() {
                println!(
                    "#{index:<3} {}  level {}  {}  achievement {:.1}",
                    entry.recorded_at().format("%Y-%m-%d %H:%M:%S"),
                    entry
                        .challenge_level()
                        .map(|level| level.to_string())
                        .unwrap_or_else(|| "-".to_string()),
                    format_length(entry.session_length()),
                    entry.achievement_score()
                );
            }
        }
        HistoryAction::Show { index, json } => {
            let entry = history
                .get(index)
                .with_context(|| format!("No session at index {index}"))?;
            if json {
                println!("{}", serde_json::to_string_pretty(entry)?);
            } else {
                print_summary(entry);
            }
        }
        HistoryAction::Remove { index } => {
            let removed = history.remove(index)?;
            history.save().context("Could not save session history")?;
            println!("Removed session {}", removed.session_id());
        }
        HistoryAction::Clear => {
            let count = history.len();
            history.clear();
            history.save().context("Could not save session history")?;
            println!("Removed {count} session(s)");
        }
    }

    Ok(())
}

fn cmd_replay(index: usize) -> Result<()> {
    let config = Config::load().context("Could not load configuration")?;
    let history = open_history(&config)?;
    let entry = history
        .get(index)
        .with_context(|| format!("No session at index {index}"))?;

    let readings = entry.pulse_data().to_vec();
    if readings.is_empty() {
        bail!("Session #{index} has no recorded pulse data");
    }

    let challenge_level = entry.challenge_level().unwrap_or(config.challenge_level);
    let mut engine = SessionEngine::new(challenge_level, config.pacer_speed);
    let mut source = ScriptedSource::new(readings);

    println!(
        "Replaying session {} ({} samples) at challenge level {challenge_level}",
        entry.session_id(),
        entry.pulse_data().len()
    );
    println!();

    engine.start(&mut source)?;
    while !source.is_exhausted() {
        let log = engine.tick(&mut source)?;
        if log.level_changed() {
            print_live(&log);
        }
    }

    let summary = engine
        .stop()
        .context("Replayed session was already stopped")?;
    println!();
    print_summary(&summary);

    if summary.achievement_score() != entry.achievement_score() {
        println!();
        println!(
            "Note: stored achievement was {:.1}, replay gives {:.1}",
            entry.achievement_score(),
            summary.achievement_score()
        );
    }

    Ok(())
}

fn cmd_config(challenge: Option<u8>, pacer: Option<u32>, mode: Option<SignalMode>) -> Result<()> {
    let mut config = Config::load().context("Could not load configuration")?;

    if challenge.is_some() || pacer.is_some() || mode.is_some() {
        if let Some(level) = challenge {
            config.challenge_level = level;
        }
        if let Some(speed) = pacer {
            config.pacer_speed = speed;
        }
        if let Some(mode) = mode {
            config.signal_mode = mode;
        }
        config.validate()?;
        config.save().context("Could not save configuration")?;
        println!("Configuration saved.");
        println!();
    }

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!("{}", serde_json::to_string_pretty(&config)?);

    Ok(())
}

fn open_history(config: &Config) -> Result<SessionHistory> {
    config
        .ensure_directories()
        .context("Could not create data directory")?;
    SessionHistory::with_persistence(config.history_path()).context("Could not load session history")
}

fn print_live(log: &SampleLog) {
    let pulse = log
        .pulse_data()
        .last()
        .map(|p| format!("{p:6.2}"))
        .unwrap_or_else(|| "     -".to_string());
    let score = log
        .coherence_score()
        .map(|s| format!("{s:>4.0}"))
        .unwrap_or_else(|| "   -".to_string());
    let level = log
        .coherence_level()
        .unwrap_or(CoherenceLevel::Unset)
        .to_string();

    let mut line = format!(
        "[{}] pulse {pulse} | coherence {score} {level:<6} | achievement {:.1}",
        format_length(log.session_length()),
        log.achievement_score()
    );
    if log.level_changed() {
        line.push_str("  BEEP");
    }
    if log.is_degraded() {
        line.push_str("  (flat window, score carried over)");
    }
    println!("{line}");
}

fn print_summary(summary: &SampleLog) {
    println!("Session Summary");
    println!("===============");
    println!();
    println!("  Session: {}", summary.session_id());
    println!(
        "  Recorded: {}",
        summary.recorded_at().format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(level) = summary.challenge_level() {
        println!("  Challenge level: {level}");
    }
    println!("  Length: {}", format_length(summary.session_length()));
    println!("  Achievement score: {:.1}", summary.achievement_score());
    match summary.average_coherence() {
        Some(avg) => println!("  Average coherence: {avg:.2}"),
        None => println!("  Average coherence: n/a (under 5 seconds)"),
    }

    let distribution = summary.coherence_distribution();
    if let Some(dwell) = summary.dwell_times() {
        println!();
        println!("  Time at each level:");
        for level in CoherenceLevel::SCORED {
            let share = distribution.get(&level).copied().unwrap_or(0.0);
            println!(
                "    {:<7} {:>5}  ({share:5.1}%)",
                level.to_string(),
                format_length(dwell.get(level) as i64)
            );
        }
    }
}

/// Format a session length as mm:ss. Sessions that never ticked show 00:00.
fn format_length(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
