//! Input backends that deliver guesses to the game
//!
//! All backends implement [`GuessSubmitter`]; [`create_submitter`] picks one
//! from configuration.

mod command;
mod dry_run;
#[cfg(feature = "enigo")]
mod native;
mod traits;

use std::time::Duration;

use eyre::Result;
use lockstore::{Calibration, Point};
use tracing::info;

pub use command::CommandSubmitter;
pub use dry_run::DryRunSubmitter;
#[cfg(feature = "enigo")]
pub use native::EnigoSubmitter;
pub use traits::{GuessSubmitter, SubmitError};

use crate::command::TemplateCommand;
use crate::config::{InputBackend, InputConfig, Timing};

/// Build the configured backend
///
/// `calibration` comes from the loaded session and is only read by the
/// native backend.
pub fn create_submitter(
    input: &InputConfig,
    calibration: &Calibration,
    timing: Timing,
) -> Result<Box<dyn GuessSubmitter>> {
    let submitter: Box<dyn GuessSubmitter> = match input.backend {
        InputBackend::DryRun => Box::new(DryRunSubmitter::new()),
        InputBackend::Command => {
            let command =
                TemplateCommand::new(input.command.clone(), Duration::from_millis(input.command_timeout_ms))?;
            Box::new(CommandSubmitter::new(command))
        }
        #[cfg(feature = "enigo")]
        InputBackend::Enigo => Box::new(EnigoSubmitter::new(input, calibration.clone(), timing)?),
        #[cfg(not(feature = "enigo"))]
        InputBackend::Enigo => {
            let _ = (calibration, timing);
            return Err(eyre::eyre!(
                "input.backend 'enigo' requires building with `--features enigo`"
            ));
        }
    };
    info!(backend = submitter.name(), "Input backend ready");
    Ok(submitter)
}

/// Pause after each click when checking calibrated positions
pub const CALIBRATION_TEST_PAUSE: Duration = Duration::from_secs(1);

/// Calibrated screen positions in click order
pub fn calibration_targets(calibration: &Calibration) -> Vec<(&'static str, Point)> {
    [
        ("input field", calibration.input_field_pos),
        ("submit button", calibration.submit_button_pos),
    ]
    .into_iter()
    .filter_map(|(label, point)| point.map(|p| (label, p)))
    .collect()
}

/// Click every calibrated position once, pausing after each
///
/// Returns the labels of the positions clicked.
pub async fn test_calibration(calibration: &Calibration, pause: Duration) -> Result<Vec<&'static str>> {
    let targets = calibration_targets(calibration);
    click_targets(&targets, pause).await?;
    Ok(targets.into_iter().map(|(label, _)| label).collect())
}

#[cfg(feature = "enigo")]
async fn click_targets(targets: &[(&'static str, Point)], pause: Duration) -> Result<()> {
    native::click_points(targets, pause).await?;
    Ok(())
}

#[cfg(not(feature = "enigo"))]
async fn click_targets(targets: &[(&'static str, Point)], _pause: Duration) -> Result<()> {
    if targets.is_empty() {
        return Ok(());
    }
    Err(eyre::eyre!(
        "clicking calibrated positions requires building with `--features enigo`"
    ))
}
