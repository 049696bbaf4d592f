//! enigo backend - native keyboard and mouse injection
//!
//! Per guess: click the calibrated input field, clear it, type the digits,
//! then click the calibrated submit button or press the submit key.

use std::time::Duration;

use async_trait::async_trait;
use enigo::{Button, Coordinate, Direction, Enigo, Key, Keyboard, Mouse, Settings};
use lockstore::{Calibration, Point};
use tracing::{debug, info};

use super::{GuessSubmitter, SubmitError};
use crate::config::{InputConfig, Timing};

const CLEAR_DELAY: Duration = Duration::from_millis(5);

pub struct EnigoSubmitter {
    enigo: Enigo,
    calibration: Calibration,
    timing: Timing,
    submit_key: Key,
    clear_first: bool,
    auto_click: bool,
}

impl EnigoSubmitter {
    pub fn new(input: &InputConfig, calibration: Calibration, timing: Timing) -> Result<Self, SubmitError> {
        let enigo = Enigo::new(&Settings::default()).map_err(|e| SubmitError::Injection(e.to_string()))?;
        Ok(Self {
            enigo,
            calibration,
            timing,
            submit_key: parse_key(&input.submit_key)?,
            clear_first: input.clear_first,
            auto_click: input.auto_click,
        })
    }

    async fn click(&mut self, point: Point) -> Result<(), SubmitError> {
        self.enigo
            .move_mouse(point[0], point[1], Coordinate::Abs)
            .map_err(injection)?;
        self.enigo.button(Button::Left, Direction::Click).map_err(injection)?;
        tokio::time::sleep(self.timing.click).await;
        Ok(())
    }

    async fn clear_field(&mut self) -> Result<(), SubmitError> {
        self.enigo.key(Key::Control, Direction::Press).map_err(injection)?;
        let selected = self.enigo.key(Key::Unicode('a'), Direction::Click);
        self.enigo.key(Key::Control, Direction::Release).map_err(injection)?;
        selected.map_err(injection)?;
        tokio::time::sleep(CLEAR_DELAY).await;
        self.enigo.key(Key::Delete, Direction::Click).map_err(injection)?;
        tokio::time::sleep(CLEAR_DELAY).await;
        Ok(())
    }

    async fn type_guess(&mut self, guess: &str) -> Result<(), SubmitError> {
        if self.timing.input.is_zero() {
            return self.enigo.text(guess).map_err(injection);
        }
        for ch in guess.chars() {
            self.enigo.key(Key::Unicode(ch), Direction::Click).map_err(injection)?;
            tokio::time::sleep(self.timing.input).await;
        }
        Ok(())
    }
}

#[async_trait]
impl GuessSubmitter for EnigoSubmitter {
    fn name(&self) -> &'static str {
        "enigo"
    }

    async fn submit(&mut self, guess: &str) -> Result<(), SubmitError> {
        debug!(%guess, "EnigoSubmitter::submit: called");
        if self.auto_click
            && let Some(point) = self.calibration.input_field_pos
        {
            self.click(point).await?;
        }
        if self.clear_first {
            self.clear_field().await?;
        }
        self.type_guess(guess).await?;

        match self.calibration.submit_button_pos {
            Some(point) if self.auto_click => self.click(point).await?,
            _ => self.enigo.key(self.submit_key, Direction::Click).map_err(injection)?,
        }
        tokio::time::sleep(self.timing.process).await;
        Ok(())
    }
}

/// Move to and click each point, pausing after every click
pub async fn click_points(targets: &[(&'static str, Point)], pause: Duration) -> Result<(), SubmitError> {
    let mut enigo = Enigo::new(&Settings::default()).map_err(|e| SubmitError::Injection(e.to_string()))?;
    for (label, point) in targets {
        info!(position = *label, x = point[0], y = point[1], "Clicking calibrated position");
        enigo.move_mouse(point[0], point[1], Coordinate::Abs).map_err(injection)?;
        enigo.button(Button::Left, Direction::Click).map_err(injection)?;
        tokio::time::sleep(pause).await;
    }
    Ok(())
}

fn injection(e: enigo::InputError) -> SubmitError {
    SubmitError::Injection(e.to_string())
}

/// Map a config key name to an enigo key
fn parse_key(name: &str) -> Result<Key, SubmitError> {
    let key = match name.to_lowercase().as_str() {
        "enter" | "return" => Key::Return,
        "tab" => Key::Tab,
        "space" => Key::Space,
        other => {
            let mut chars = other.chars();
            match (chars.next(), chars.next()) {
                (Some(ch), None) => Key::Unicode(ch),
                _ => return Err(SubmitError::Injection(format!("Unknown submit key: {}", name))),
            }
        }
    };
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key() {
        assert_eq!(parse_key("Enter").unwrap(), Key::Return);
        assert_eq!(parse_key("tab").unwrap(), Key::Tab);
        assert_eq!(parse_key("c").unwrap(), Key::Unicode('c'));
        assert!(parse_key("f13-ish").is_err());
    }
}
