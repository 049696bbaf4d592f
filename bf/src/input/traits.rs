//! Guess delivery trait

use async_trait::async_trait;
use thiserror::Error;

use crate::command::CommandError;

/// Why a guess did not reach the game
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("{program} rejected {guess} with a non-zero exit status")]
    Rejected { program: String, guess: String },

    #[error("Input injection failed: {0}")]
    Injection(String),
}

/// Delivers one formatted guess to the lock UI
///
/// `Ok` means the guess was delivered and counts as an attempt. On `Err` the
/// runner retries the same guess later.
#[async_trait]
pub trait GuessSubmitter: Send {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    async fn submit(&mut self, guess: &str) -> Result<(), SubmitError>;
}
