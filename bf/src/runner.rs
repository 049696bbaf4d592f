//! Enumeration runner - the single worker that walks the combination space
//!
//! Each iteration: drain control commands, submit the current guess, count it
//! if delivered, ask the detector, advance, and save periodically. Undelivered
//! guesses are retried without counting or advancing, so no combination is
//! skipped.

use std::time::Duration;

use lockstore::{PersistedSession, ProgressStore};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::control::{ControlCommand, ControlReceiver, RunState, Snapshot};
use crate::detect::SuccessDetector;
use crate::input::GuessSubmitter;

/// Loop tuning, resolved from config
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    pub save_every: u64,
    pub report_every: u64,
    pub max_consecutive_failures: u32,
    pub pause_on_success: bool,
    pub attempt_delay: Duration,
    pub retry_delay: Duration,
}

impl RunnerOptions {
    pub fn from_config(config: &Config) -> Self {
        let timing = config.timing.resolve();
        Self {
            save_every: config.runner.save_every.max(1),
            report_every: config.runner.report_every,
            max_consecutive_failures: config.runner.max_consecutive_failures,
            pause_on_success: config.runner.pause_on_success,
            attempt_delay: timing.attempt,
            retry_delay: timing.retry,
        }
    }
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// How a run ended
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// `Exhausted` or `Stopped`
    pub state: RunState,
    /// Guesses delivered during this run
    pub attempts: u64,
    /// Successes newly recorded during this run
    pub found: Vec<String>,
    /// Last delivery error, set when the run gave up on a dead backend
    pub last_error: Option<String>,
    /// Final session, as last saved
    pub session: PersistedSession,
}

enum Flow {
    Continue,
    Stop,
}

pub struct Runner {
    store: ProgressStore,
    session: PersistedSession,
    submitter: Box<dyn GuessSubmitter>,
    detector: Box<dyn SuccessDetector>,
    options: RunnerOptions,
    snapshot_tx: watch::Sender<Snapshot>,
    paused: bool,
    consecutive_failures: u32,
    last_guess: Option<String>,
    found: Vec<String>,
    unsaved: u64,
}

impl Runner {
    pub fn new(
        store: ProgressStore,
        session: PersistedSession,
        submitter: Box<dyn GuessSubmitter>,
        detector: Box<dyn SuccessDetector>,
        options: RunnerOptions,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(Snapshot::default());
        let runner = Self {
            store,
            session,
            submitter,
            detector,
            options,
            snapshot_tx,
            paused: false,
            consecutive_failures: 0,
            last_guess: None,
            found: Vec::new(),
            unsaved: 0,
        };
        runner.publish(RunState::Idle);
        runner
    }

    /// Receive a snapshot after every state change
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    pub fn session(&self) -> &PersistedSession {
        &self.session
    }

    /// Run until the space is exhausted or a stop is requested
    pub async fn run(mut self, mut control: ControlReceiver) -> RunOutcome {
        let start_attempts = self.session.state.attempt_count;
        let mut last_error = None;
        info!(
            combination = %self.session.state.combination,
            attempt_count = start_attempts,
            submitter = self.submitter.name(),
            detector = self.detector.name(),
            "Starting enumeration"
        );

        let final_state = 'run: loop {
            if self.session.state.exhausted {
                break 'run RunState::Exhausted;
            }

            while let Some(command) = control.try_next() {
                if let Flow::Stop = self.apply(command) {
                    break 'run RunState::Stopped;
                }
            }

            if self.paused {
                self.save();
                self.publish(RunState::Paused);
                info!(combination = %self.session.state.combination, "Paused");
                while self.paused {
                    let command = control.next().await;
                    if let Flow::Stop = self.apply(command) {
                        break 'run RunState::Stopped;
                    }
                    self.publish(RunState::Paused);
                }
                info!(combination = %self.session.state.combination, "Resumed");
                continue;
            }
            self.publish(RunState::Running);

            let guess = self.session.state.combination.to_string();
            if let Err(e) = self.submitter.submit(&guess).await {
                self.consecutive_failures += 1;
                warn!(
                    error = %e,
                    %guess,
                    consecutive_failures = self.consecutive_failures,
                    "Guess not delivered, will retry"
                );
                last_error = Some(e.to_string());
                if self.options.max_consecutive_failures > 0
                    && self.consecutive_failures >= self.options.max_consecutive_failures
                {
                    error!(%guess, "Too many consecutive delivery failures, stopping");
                    break 'run RunState::Stopped;
                }
                self.publish(RunState::Running);
                tokio::time::sleep(self.options.retry_delay).await;
                continue;
            }
            self.consecutive_failures = 0;
            last_error = None;
            self.session.state = self.session.state.clone().record_attempt();
            self.unsaved += 1;
            self.last_guess = Some(guess.clone());

            let mut found = false;
            if self.detector.check(&guess).await {
                info!(%guess, "Detector reported success");
                found = self.record(&guess);
                if self.options.pause_on_success {
                    self.paused = true;
                }
            }

            // A saved success must already point past the winning guess
            self.session.state = self.session.state.clone().advance();

            if found || self.unsaved >= self.options.save_every {
                self.save();
            }
            let attempts = self.session.state.attempt_count;
            if self.options.report_every > 0 && attempts % self.options.report_every == 0 {
                info!(
                    attempts,
                    current = %self.session.state.combination,
                    percent = %format!("{:.2}", self.session.state.progress_percent()),
                    "Progress"
                );
            }
            self.publish(RunState::Running);

            if self.session.state.exhausted {
                info!(attempts, "All combinations tried");
                break 'run RunState::Exhausted;
            }
            if self.options.attempt_delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.options.attempt_delay).await;
            }
        };

        self.save();
        self.publish(final_state);
        let attempts = self.session.state.attempt_count - start_attempts;
        info!(state = %final_state, attempts, found = self.found.len(), "Enumeration finished");

        RunOutcome {
            state: final_state,
            attempts,
            found: self.found,
            last_error,
            session: self.session,
        }
    }

    fn apply(&mut self, command: ControlCommand) -> Flow {
        debug!(?command, paused = self.paused, "Runner::apply: called");
        match command {
            ControlCommand::Pause => self.paused = true,
            ControlCommand::Resume => self.paused = false,
            ControlCommand::TogglePause => self.paused = !self.paused,
            ControlCommand::MarkSuccess => match self.last_guess.clone() {
                Some(guess) => {
                    info!(%guess, "Operator marked success");
                    if self.record(&guess) {
                        self.save();
                    }
                    if self.options.pause_on_success {
                        self.paused = true;
                    }
                }
                None => warn!("Nothing delivered yet, nothing to mark"),
            },
            ControlCommand::Stop => {
                info!("Stop requested");
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Record a success in memory; returns true if it was new
    fn record(&mut self, guess: &str) -> bool {
        let new = self.store.record_success(&mut self.session, guess);
        if new {
            self.found.push(guess.to_string());
        }
        new
    }

    /// Save, logging rather than propagating failures
    fn save(&mut self) {
        match self.store.save(&self.session) {
            Ok(()) => {
                debug!(attempt_count = self.session.state.attempt_count, "Runner::save: saved");
                self.unsaved = 0;
            }
            Err(e) => warn!(error = %e, "Failed to save progress, continuing in memory"),
        }
    }

    fn publish(&self, state: RunState) {
        let st = &self.session.state;
        let snapshot = Snapshot {
            state,
            combination: st.combination.to_string(),
            attempt_count: st.attempt_count,
            exhausted: st.exhausted,
            progress_percent: st.progress_percent(),
            last_guess: self.last_guess.clone(),
            successes: self.session.successes.iter().map(|s| s.combination.clone()).collect(),
            consecutive_failures: self.consecutive_failures,
        };
        self.snapshot_tx.send_replace(snapshot);
    }
}
