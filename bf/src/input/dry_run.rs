//! dry-run backend - log guesses without touching the desktop

use async_trait::async_trait;
use tracing::debug;

use super::{GuessSubmitter, SubmitError};

#[derive(Debug, Default)]
pub struct DryRunSubmitter {
    delivered: u64,
}

impl DryRunSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivered(&self) -> u64 {
        self.delivered
    }
}

#[async_trait]
impl GuessSubmitter for DryRunSubmitter {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn submit(&mut self, guess: &str) -> Result<(), SubmitError> {
        self.delivered += 1;
        debug!(%guess, delivered = self.delivered, "DryRunSubmitter::submit: called");
        Ok(())
    }
}
