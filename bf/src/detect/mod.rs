//! Success detection strategies
//!
//! Detection is a swappable capability with no accuracy contract: a strategy
//! only answers "did the last guess open the lock?".

use std::time::Duration;

use async_trait::async_trait;
use eyre::Result;
use tracing::{debug, info, warn};

use crate::command::TemplateCommand;
use crate::config::{DetectConfig, DetectStrategy};

#[async_trait]
pub trait SuccessDetector: Send {
    fn name(&self) -> &'static str;

    /// Called once after each delivered guess
    async fn check(&mut self, guess: &str) -> bool;
}

/// Never detects anything; successes are marked by the operator
#[derive(Debug, Default)]
pub struct NeverDetector;

#[async_trait]
impl SuccessDetector for NeverDetector {
    fn name(&self) -> &'static str {
        "never"
    }

    async fn check(&mut self, _guess: &str) -> bool {
        false
    }
}

/// Asks an external program; exit status 0 means the lock opened
///
/// Spawn failures and timeouts count as "not opened".
pub struct CommandDetector {
    command: TemplateCommand,
}

impl CommandDetector {
    pub fn new(command: TemplateCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl SuccessDetector for CommandDetector {
    fn name(&self) -> &'static str {
        "command"
    }

    async fn check(&mut self, guess: &str) -> bool {
        match self.command.run(guess).await {
            Ok(opened) => {
                debug!(%guess, opened, "CommandDetector::check: completed");
                opened
            }
            Err(e) => {
                warn!(error = %e, %guess, "Success check failed, assuming locked");
                false
            }
        }
    }
}

/// Build the configured strategy
pub fn create_detector(detect: &DetectConfig) -> Result<Box<dyn SuccessDetector>> {
    let detector: Box<dyn SuccessDetector> = match detect.strategy {
        DetectStrategy::Never => Box::new(NeverDetector),
        DetectStrategy::Command => {
            let command =
                TemplateCommand::new(detect.command.clone(), Duration::from_millis(detect.command_timeout_ms))?;
            Box::new(CommandDetector::new(command))
        }
    };
    info!(strategy = detector.name(), "Success detection ready");
    Ok(detector)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_never_detector() {
        let mut d = NeverDetector;
        assert!(!d.check("0000").await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_detector_matches_guess() {
        let argv = ["sh", "-c", "test \"$BF_COMBINATION\" = 0042"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut d = CommandDetector::new(TemplateCommand::new(argv, Duration::from_secs(5)).unwrap());
        assert!(!d.check("0041").await);
        assert!(d.check("0042").await);
    }

    #[tokio::test]
    async fn test_command_detector_spawn_failure_is_false() {
        let argv = vec!["no-such-detector-program-bf".to_string()];
        let mut d = CommandDetector::new(TemplateCommand::new(argv, Duration::from_secs(5)).unwrap());
        assert!(!d.check("0042").await);
    }

    #[test]
    fn test_create_detector() {
        let d = create_detector(&DetectConfig::default()).unwrap();
        assert_eq!(d.name(), "never");

        let cfg = DetectConfig {
            strategy: DetectStrategy::Command,
            ..Default::default()
        };
        assert!(create_detector(&cfg).is_err());
    }
}
