//! Run control: lifecycle state, operator commands and display snapshots
//!
//! The runner owns the session. Everyone else talks to it by sending
//! [`ControlCommand`]s through a [`RunControl`] handle and reads progress from
//! a `watch` channel of [`Snapshot`]s.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

/// Lifecycle of one enumeration run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunState {
    #[default]
    Idle,
    Running,
    Paused,
    Exhausted,
    Stopped,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Exhausted | Self::Stopped)
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Paused => "paused",
            Self::Exhausted => "exhausted",
            Self::Stopped => "stopped",
        };
        write!(f, "{}", s)
    }
}

/// Requests the runner handles between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Pause,
    Resume,
    TogglePause,
    /// Record the most recently delivered guess as a success
    MarkSuccess,
    Stop,
}

/// Cloneable sending side, held by the console, signal handlers and tests
#[derive(Debug, Clone)]
pub struct RunControl {
    tx: mpsc::UnboundedSender<ControlCommand>,
}

impl RunControl {
    /// Create a connected handle/receiver pair
    pub fn channel() -> (Self, ControlReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, ControlReceiver { rx, closed: false })
    }

    /// Send a command; false once the runner has gone away
    pub fn send(&self, command: ControlCommand) -> bool {
        debug!(?command, "RunControl::send: called");
        self.tx.send(command).is_ok()
    }

    pub fn pause(&self) -> bool {
        self.send(ControlCommand::Pause)
    }

    pub fn resume(&self) -> bool {
        self.send(ControlCommand::Resume)
    }

    pub fn toggle_pause(&self) -> bool {
        self.send(ControlCommand::TogglePause)
    }

    pub fn mark_success(&self) -> bool {
        self.send(ControlCommand::MarkSuccess)
    }

    pub fn stop(&self) -> bool {
        self.send(ControlCommand::Stop)
    }
}

/// Receiving side, owned by the runner
#[derive(Debug)]
pub struct ControlReceiver {
    rx: mpsc::UnboundedReceiver<ControlCommand>,
    closed: bool,
}

impl ControlReceiver {
    /// Next queued command without waiting
    pub fn try_next(&mut self) -> Option<ControlCommand> {
        match self.rx.try_recv() {
            Ok(command) => Some(command),
            Err(mpsc::error::TryRecvError::Empty) => None,
            Err(mpsc::error::TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }

    /// Wait for the next command
    ///
    /// With every handle dropped nobody can resume a paused run, so a closed
    /// channel reads as `Stop`.
    pub async fn next(&mut self) -> ControlCommand {
        match self.rx.recv().await {
            Some(command) => command,
            None => {
                self.closed = true;
                ControlCommand::Stop
            }
        }
    }

    /// True once every `RunControl` handle has been dropped
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Point-in-time view of the run for display
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub state: RunState,
    pub combination: String,
    pub attempt_count: u64,
    pub exhausted: bool,
    pub progress_percent: f64,
    pub last_guess: Option<String>,
    pub successes: Vec<String>,
    pub consecutive_failures: u32,
}
