//! command backend - hand each guess to an external program
//!
//! Useful with tools such as `xdotool` or `ydotool`, or a game-specific helper
//! script. Exit status 0 means the guess was delivered.

use async_trait::async_trait;
use tracing::debug;

use super::{GuessSubmitter, SubmitError};
use crate::command::TemplateCommand;

pub struct CommandSubmitter {
    command: TemplateCommand,
}

impl CommandSubmitter {
    pub fn new(command: TemplateCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl GuessSubmitter for CommandSubmitter {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn submit(&mut self, guess: &str) -> Result<(), SubmitError> {
        debug!(%guess, program = self.command.program(), "CommandSubmitter::submit: called");
        if self.command.run(guess).await? {
            Ok(())
        } else {
            Err(SubmitError::Rejected {
                program: self.command.program().to_string(),
                guess: guess.to_string(),
            })
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    fn submitter(args: &[&str]) -> CommandSubmitter {
        let argv = args.iter().map(|s| s.to_string()).collect();
        CommandSubmitter::new(TemplateCommand::new(argv, Duration::from_secs(5)).unwrap())
    }

    #[tokio::test]
    async fn test_zero_exit_is_delivered() {
        let mut s = submitter(&["true"]);
        assert!(s.submit("1234").await.is_ok());
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_rejected() {
        let mut s = submitter(&["false"]);
        assert!(matches!(s.submit("1234").await, Err(SubmitError::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_helper_receives_guess() {
        let temp = tempfile::TempDir::new().unwrap();
        let out = temp.path().join("typed.txt");
        let script = format!("printf '%s\\n' \"$0\" >> {}", out.display());
        let mut s = submitter(&["sh", "-c", &script, "{combination}"]);

        s.submit("0012").await.unwrap();
        s.submit("0013").await.unwrap();

        let typed = std::fs::read_to_string(&out).unwrap();
        assert_eq!(typed, "0012\n0013\n");
    }
}
