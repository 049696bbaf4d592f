//! Bruteforce - drive a combination lock UI through every code
//!
//! A single worker walks the combination space in odometer order, handing
//! each guess to an input backend and asking a detection strategy whether the
//! lock opened. Progress is saved through [`lockstore`] so a run can be killed
//! and resumed at any point.
//!
//! # Modules
//!
//! - [`runner`] - the enumeration loop
//! - [`control`] - run state, operator commands, display snapshots
//! - [`input`] - guess delivery backends
//! - [`detect`] - success detection strategies
//! - [`console`] - stdin operator commands
//! - [`progress`] - rate and progress formatting
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod command;
pub mod config;
pub mod console;
pub mod control;
pub mod detect;
pub mod input;
pub mod progress;
pub mod runner;

pub use config::{Config, InputBackend, SpeedPreset, Timing};
pub use control::{ControlCommand, ControlReceiver, RunControl, RunState, Snapshot};
pub use detect::{CommandDetector, NeverDetector, SuccessDetector, create_detector};
pub use input::{CommandSubmitter, DryRunSubmitter, GuessSubmitter, SubmitError, create_submitter};
pub use runner::{RunOutcome, Runner, RunnerOptions};

/// Build the progress store described by the session config
pub fn open_store(config: &Config) -> eyre::Result<lockstore::ProgressStore> {
    let defaults = config.session.defaults()?;
    Ok(lockstore::ProgressStore::new(&config.session.path, defaults)
        .with_success_log(lockstore::SuccessLog::new(&config.session.success_log)))
}
