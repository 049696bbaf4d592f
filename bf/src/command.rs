//! Run an external helper program once per guess

use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

/// Placeholder substituted with the formatted guess
pub const PLACEHOLDER: &str = "{combination}";

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("No command configured")]
    Empty,

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} timed out after {timeout_ms}ms")]
    Timeout { program: String, timeout_ms: u128 },
}

/// A program plus argument template
#[derive(Debug, Clone)]
pub struct TemplateCommand {
    argv: Vec<String>,
    timeout: Duration,
}

impl TemplateCommand {
    pub fn new(argv: Vec<String>, timeout: Duration) -> Result<Self, CommandError> {
        if argv.is_empty() {
            return Err(CommandError::Empty);
        }
        Ok(Self { argv, timeout })
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Arguments with every placeholder replaced by `guess`
    pub fn render(&self, guess: &str) -> Vec<String> {
        self.argv.iter().map(|a| a.replace(PLACEHOLDER, guess)).collect()
    }

    /// Run to completion and report whether it exited with status 0
    ///
    /// The guess is also exported as `BF_COMBINATION`. Output is discarded.
    pub async fn run(&self, guess: &str) -> Result<bool, CommandError> {
        let argv = self.render(guess);
        debug!(?argv, "TemplateCommand::run: called");
        let mut command = tokio::process::Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .env("BF_COMBINATION", guess)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        match tokio::time::timeout(self.timeout, command.status()).await {
            Ok(Ok(status)) => {
                debug!(%status, "TemplateCommand::run: exited");
                Ok(status.success())
            }
            Ok(Err(source)) => Err(CommandError::Spawn {
                program: self.program().to_string(),
                source,
            }),
            Err(_) => Err(CommandError::Timeout {
                program: self.program().to_string(),
                timeout_ms: self.timeout.as_millis(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_render_substitutes_every_placeholder() {
        let cmd = TemplateCommand::new(argv(&["echo", "{combination}", "x{combination}y"]), Duration::from_secs(1))
            .unwrap();
        assert_eq!(cmd.render("0042"), argv(&["echo", "0042", "x0042y"]));
    }

    #[test]
    fn test_empty_command_rejected() {
        assert!(matches!(
            TemplateCommand::new(Vec::new(), Duration::from_secs(1)),
            Err(CommandError::Empty)
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_reports_exit_status() {
        let ok = TemplateCommand::new(argv(&["true"]), Duration::from_secs(5)).unwrap();
        assert!(ok.run("0000").await.unwrap());

        let fail = TemplateCommand::new(argv(&["false"]), Duration::from_secs(5)).unwrap();
        assert!(!fail.run("0000").await.unwrap());

        let check = TemplateCommand::new(
            argv(&["sh", "-c", "test \"$0\" = 0042 && test \"$BF_COMBINATION\" = 0042", "{combination}"]),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(check.run("0042").await.unwrap());
        assert!(!check.run("0041").await.unwrap());
    }

    #[tokio::test]
    async fn test_run_missing_program() {
        let cmd = TemplateCommand::new(argv(&["definitely-not-a-real-program-bf"]), Duration::from_secs(5)).unwrap();
        assert!(matches!(cmd.run("0000").await, Err(CommandError::Spawn { .. })));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_timeout() {
        let cmd = TemplateCommand::new(argv(&["sleep", "5"]), Duration::from_millis(50)).unwrap();
        assert!(matches!(cmd.run("0000").await, Err(CommandError::Timeout { .. })));
    }
}
