//! Operator console - line commands on stdin drive the run
//!
//! Stands in for global hotkeys: the operator types a short command and
//! presses Enter while the run is going.

use std::io::BufRead;

use tracing::{debug, info};

use crate::control::{ControlCommand, RunControl};

/// Help shown for `h` / `help` and at startup
pub const HELP: &str = "commands: p=pause  r=resume  t=toggle pause  m=mark last guess correct  s/q=stop  h=help";

/// What a console line asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleInput {
    Command(ControlCommand),
    Help,
}

/// Parse one line; blank or unknown input yields None
pub fn parse_line(line: &str) -> Option<ConsoleInput> {
    let input = match line.trim().to_lowercase().as_str() {
        "p" | "pause" => ConsoleInput::Command(ControlCommand::Pause),
        "r" | "resume" | "c" | "continue" => ConsoleInput::Command(ControlCommand::Resume),
        "t" | "toggle" => ConsoleInput::Command(ControlCommand::TogglePause),
        "m" | "mark" | "ok" | "correct" => ConsoleInput::Command(ControlCommand::MarkSuccess),
        "s" | "stop" | "q" | "quit" | "exit" => ConsoleInput::Command(ControlCommand::Stop),
        "h" | "help" | "?" => ConsoleInput::Help,
        _ => return None,
    };
    Some(input)
}

/// Read stdin on a plain thread until EOF or until the runner goes away
///
/// The thread is detached so a blocked read never holds up process exit.
pub fn spawn_console(control: RunControl) -> std::io::Result<()> {
    std::thread::Builder::new().name("console".to_string()).spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    debug!(error = %e, "spawn_console: stdin read failed");
                    break;
                }
            };
            match parse_line(&line) {
                Some(ConsoleInput::Command(command)) => {
                    info!(?command, "Console command");
                    if !control.send(command) {
                        break;
                    }
                }
                Some(ConsoleInput::Help) => println!("{}", HELP),
                None if !line.trim().is_empty() => println!("unknown command '{}'; {}", line.trim(), HELP),
                None => {}
            }
        }
        debug!("spawn_console: stdin closed");
    })?;
    Ok(())
}
