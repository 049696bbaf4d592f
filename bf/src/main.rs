//! Bruteforce - combination lock enumerator
//!
//! CLI entry point for running and inspecting enumeration sessions.

use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bruteforce::cli::{Cli, Command, OutputFormat};
use bruteforce::config::{Config, InputBackend, default_data_dir};
use bruteforce::console::{HELP, spawn_console};
use bruteforce::input::{CALIBRATION_TEST_PAUSE, calibration_targets, test_calibration};
use bruteforce::progress::{RateMeter, crossed_interval, progress_line};
use bruteforce::{
    RunControl, RunOutcome, RunState, Runner, RunnerOptions, Snapshot, create_detector, create_submitter, open_store,
};
use lockstore::{PersistedSession, ProgressStore};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<PathBuf> {
    let log_dir = default_data_dir().join("logs");
    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level = match cli_log_level.or(config_log_level).map(|s| s.to_uppercase()) {
        None => tracing::Level::INFO,
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
    };

    let log_path = log_dir.join("bruteforce.log");
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(log_path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    let log_path =
        setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    debug!(command = ?cli.command, log_path = %log_path.display(), "main: dispatching command");

    match cli.command {
        Command::Run {
            start,
            dry_run,
            no_console,
            countdown,
        } => cmd_run(config, start, dry_run, no_console, countdown).await,
        Command::Status { format } => cmd_status(&config, format),
        Command::Successes => cmd_successes(&config),
        Command::ClearSuccesses => cmd_clear_successes(&config),
        Command::Reset { start } => cmd_reset(&config, start),
        Command::Calibrate {
            input,
            submit,
            clear,
            test,
        } => cmd_calibrate(&config, input, submit, clear, test).await,
    }
}

async fn cmd_run(
    mut config: Config,
    start: Option<String>,
    dry_run: bool,
    no_console: bool,
    countdown: Option<u64>,
) -> Result<()> {
    if dry_run {
        config.input.backend = InputBackend::DryRun;
    }
    config.validate().context("Invalid configuration")?;

    let store = open_store(&config)?;
    if let Err(e) = store.try_load() {
        let backup = store.back_up().context("Failed to back up unusable progress file")?;
        println!(
            "{} {}\n  Moved it to {} and starting fresh.",
            "Warning:".yellow(),
            e,
            backup.display()
        );
    }
    let mut session = store.load();
    if let Some(start) = start {
        let combination = config.session.parse_combination(&start)?;
        info!(from = %session.state.combination, to = %combination, "Jumping to start combination");
        session.state.combination = combination;
        session.state.exhausted = false;
    }
    if session.state.exhausted {
        println!(
            "{} All {} combinations were already tried. Run `bf reset` to start over.",
            "✓".green(),
            session.state.combination.space()
        );
        return Ok(());
    }

    let timing = config.timing.resolve();
    let submitter = create_submitter(&config.input, &session.calibration, timing)?;
    let detector = create_detector(&config.detect)?;
    print_banner(&config, &session, submitter.name(), detector.name());

    let countdown = countdown.unwrap_or(config.timing.countdown_secs);
    for remaining in (1..=countdown).rev() {
        println!("Starting in {}... focus the combination input in the game", remaining);
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let space = session.state.combination.space();
    let runner = Runner::new(store, session, submitter, detector, RunnerOptions::from_config(&config));
    let snapshots = runner.subscribe();
    let (control, control_rx) = RunControl::channel();

    if !no_console {
        spawn_console(control.clone()).context("Failed to start console")?;
        println!("{}", HELP.dimmed());
    }
    let signals = spawn_signal_handler(control.clone())?;
    let display = tokio::spawn(display_loop(snapshots, config.runner.report_every, space));

    let outcome = runner.run(control_rx).await;

    signals.abort();
    drop(control);
    let _ = display.await;
    print_summary(&outcome);
    Ok(())
}

fn print_banner(config: &Config, session: &PersistedSession, submitter: &str, detector: &str) {
    let timing = config.timing.resolve();
    let state = &session.state;
    println!("{}", "Combination lock enumerator".bold());
    println!("  Progress file: {}", config.session.path.display());
    println!("  Current combination: {}", state.combination.to_string().cyan());
    println!("  Attempts made: {}", state.attempt_count);
    println!(
        "  Space: {} combinations, {:.2}% covered",
        state.combination.space(),
        state.progress_percent()
    );
    println!("  Input: {}  Detection: {}", submitter, detector);
    println!(
        "  Speed: {:?} (attempt {}ms, input {}ms, click {}ms, process {}ms)",
        config.timing.preset,
        timing.attempt.as_millis(),
        timing.input.as_millis(),
        timing.click.as_millis(),
        timing.process.as_millis()
    );
    if !session.successes.is_empty() {
        println!("  Known successes: {}", session.success_combinations().join(", ").green());
    }
}

/// Print state changes, successes and periodic progress lines
async fn display_loop(mut snapshots: watch::Receiver<Snapshot>, report_every: u64, space: u64) {
    let mut last = snapshots.borrow().clone();
    let mut meter = RateMeter::new(Duration::from_secs(1), Instant::now(), last.attempt_count);

    while snapshots.changed().await.is_ok() {
        let snap = snapshots.borrow_and_update().clone();
        let rate = meter.update(Instant::now(), snap.attempt_count);

        for found in snap.successes.iter().filter(|s| !last.successes.contains(s)) {
            println!("{} Working combination: {}", "SUCCESS!".green().bold(), found.green().bold());
        }
        if snap.state != last.state {
            match snap.state {
                RunState::Paused => println!(
                    "{} at {} (type r to resume, s to stop)",
                    "Paused".yellow(),
                    snap.combination
                ),
                RunState::Running if last.state == RunState::Paused => println!("{}", "Resumed".cyan()),
                _ => {}
            }
        }
        if crossed_interval(last.attempt_count, snap.attempt_count, report_every) {
            println!("{}", progress_line(&snap, rate, space));
        }
        if snap.state.is_terminal() {
            break;
        }
        last = snap;
    }
}

#[cfg(unix)]
fn spawn_signal_handler(control: RunControl) -> Result<JoinHandle<()>> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigusr1 = signal(SignalKind::user_defined1())?;
    let mut sigusr2 = signal(SignalKind::user_defined2())?;

    Ok(tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigint.recv() => {
                    warn!("SIGINT received");
                    control.stop();
                }
                _ = sigterm.recv() => {
                    warn!("SIGTERM received");
                    control.stop();
                }
                _ = sigusr1.recv() => {
                    info!("SIGUSR1 received - toggling pause");
                    control.toggle_pause();
                }
                _ = sigusr2.recv() => {
                    info!("SIGUSR2 received - marking last guess");
                    control.mark_success();
                }
            }
        }
    }))
}

#[cfg(not(unix))]
fn spawn_signal_handler(control: RunControl) -> Result<JoinHandle<()>> {
    Ok(tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl+C received");
            control.stop();
        }
    }))
}

fn print_summary(outcome: &RunOutcome) {
    let state = &outcome.session.state;
    match outcome.state {
        RunState::Exhausted => println!("{} All combinations tried.", "✓".green()),
        _ => println!("{} Stopped at {}.", "■".yellow(), state.combination.to_string().cyan()),
    }
    if let Some(error) = &outcome.last_error {
        println!("{} Input backend kept failing: {}", "✗".red(), error);
    }
    println!(
        "  Attempts this run: {}  Total: {}  Covered: {:.2}%",
        outcome.attempts,
        state.attempt_count,
        state.progress_percent()
    );
    if !outcome.found.is_empty() {
        println!("  Found this run: {}", outcome.found.join(", ").green().bold());
    }
}

fn cmd_status(config: &Config, format: OutputFormat) -> Result<()> {
    let store = open_store(config)?;
    let (session, stored) = match store.try_load() {
        Ok(Some(session)) => (session, true),
        Ok(None) => (store.defaults().fresh_session(), false),
        Err(e) => {
            eprintln!("{} {}", "Warning:".yellow(), e);
            (store.defaults().fresh_session(), false)
        }
    };
    let state = &session.state;

    match format {
        OutputFormat::Json => {
            let value = serde_json::json!({
                "path": store.path(),
                "saved": stored,
                "combination": state.combination.to_string(),
                "attempt_count": state.attempt_count,
                "exhausted": state.exhausted,
                "progress_percent": state.progress_percent(),
                "remaining": state.remaining(),
                "successes": session.success_combinations(),
                "input_field_pos": session.calibration.input_field_pos,
                "submit_button_pos": session.calibration.submit_button_pos,
                "last_updated": session.last_updated,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
        OutputFormat::Text => {
            println!("Progress file: {}", store.path().display());
            if !stored {
                println!("  {}", "No saved progress; showing where a new run would start".dimmed());
            }
            println!("  Combination: {}", state.combination.to_string().cyan());
            println!("  Attempts: {}", state.attempt_count);
            println!(
                "  Covered: {:.2}% ({} remaining)",
                state.progress_percent(),
                state.remaining()
            );
            if state.exhausted {
                println!("  {}", "Exhausted".green());
            }
            if session.successes.is_empty() {
                println!("  Successes: none");
            } else {
                println!("  Successes: {}", session.success_combinations().join(", ").green());
            }
            println!(
                "  Calibration: input {} submit {}",
                format_point(session.calibration.input_field_pos),
                format_point(session.calibration.submit_button_pos)
            );
            if let Some(updated) = &session.last_updated {
                println!("  Last updated: {}", updated);
            }
        }
    }
    Ok(())
}

fn format_point(point: Option<lockstore::Point>) -> String {
    match point {
        Some([x, y]) => format!("{},{}", x, y),
        None => "not set".to_string(),
    }
}

/// Load saved progress for commands that edit it in place
///
/// A missing file yields a fresh session; an unusable one is an error, so it
/// is never overwritten with defaults.
fn load_existing(store: &ProgressStore) -> Result<PersistedSession> {
    match store.try_load() {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Ok(store.defaults().fresh_session()),
        Err(e) => Err(e).context(format!(
            "Refusing to modify {}; fix the session settings or run `bf reset` to back it up and start over",
            store.path().display()
        )),
    }
}

fn cmd_successes(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let session = load_existing(&store)?;
    if session.successes.is_empty() {
        println!("No successful combinations recorded");
        return Ok(());
    }
    for record in &session.successes {
        let when = record
            .discovered_at
            .map(|at| at.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        println!("{}  {}", record.combination.green(), when.dimmed());
    }
    if let Some(log) = store.success_log() {
        println!("{}", format!("Log: {}", log.path().display()).dimmed());
    }
    Ok(())
}

fn cmd_clear_successes(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let mut session = load_existing(&store)?;
    let removed = session.clear_successes();
    if removed == 0 {
        println!("No successful combinations to clear");
        return Ok(());
    }
    store.save(&session).context("Failed to save progress")?;
    info!(removed, "Cleared successes");
    println!("{} Cleared {} combination(s)", "✓".green(), removed);
    Ok(())
}

fn cmd_reset(config: &Config, start: Option<String>) -> Result<()> {
    let store = open_store(config)?;
    let start = start.map(|s| config.session.parse_combination(&s)).transpose()?;
    if let Err(e) = store.try_load() {
        println!(
            "{} {}\n  It will be moved to {}.",
            "Warning:".yellow(),
            e,
            store.backup_path().display()
        );
    }
    let session = store.reset(start).context("Failed to reset progress")?;
    println!(
        "{} Progress reset; next run starts at {}",
        "✓".green(),
        session.state.combination.to_string().cyan()
    );
    Ok(())
}

async fn cmd_calibrate(
    config: &Config,
    input: Option<lockstore::Point>,
    submit: Option<lockstore::Point>,
    clear: bool,
    test: bool,
) -> Result<()> {
    let store = open_store(config)?;
    let mut session = load_existing(&store)?;

    if clear || input.is_some() || submit.is_some() {
        if clear {
            session.calibration = Default::default();
        }
        if input.is_some() {
            session.calibration.input_field_pos = input;
        }
        if submit.is_some() {
            session.calibration.submit_button_pos = submit;
        }
        store.save(&session).context("Failed to save calibration")?;
        info!(calibration = ?session.calibration, "Calibration saved");
        println!(
            "{} Input field: {}  Submit button: {}",
            "✓".green(),
            format_point(session.calibration.input_field_pos),
            format_point(session.calibration.submit_button_pos)
        );
    } else {
        println!(
            "Input field: {}\nSubmit button: {}",
            format_point(session.calibration.input_field_pos),
            format_point(session.calibration.submit_button_pos)
        );
    }

    if test {
        if calibration_targets(&session.calibration).is_empty() {
            println!("Nothing calibrated yet; set positions with --input X,Y and --submit X,Y");
            return Ok(());
        }
        println!("Clicking calibrated positions...");
        let clicked = test_calibration(&session.calibration, CALIBRATION_TEST_PAUSE)
            .await
            .context("Position test failed")?;
        println!("{} Clicked {}", "✓".green(), clicked.join(", "));
    }
    Ok(())
}
