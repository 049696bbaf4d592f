//! Persisted session model and its on-disk JSON shape

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::combination::{Combination, CombinationError};
use crate::state::EnumerationState;

/// A screen coordinate recorded during calibration
pub type Point = [i32; 2];

/// A combination that opened the lock
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuccessRecord {
    pub combination: String,
    /// None for records from files that only kept the bare combination
    pub discovered_at: Option<DateTime<Utc>>,
}

/// Screen positions for the input field and submit button
///
/// Opaque to the store; written back exactly as loaded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calibration {
    #[serde(default)]
    pub input_field_pos: Option<Point>,
    #[serde(default)]
    pub submit_button_pos: Option<Point>,
}

/// Shape of the combination space and where a fresh session starts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDefaults {
    pub start: Combination,
}

impl SessionDefaults {
    pub fn new(start: Combination) -> Self {
        Self { start }
    }

    pub fn length(&self) -> usize {
        self.start.len()
    }

    pub fn base(&self) -> u8 {
        self.start.base()
    }

    /// A session with no attempts, no successes and no calibration
    pub fn fresh_session(&self) -> PersistedSession {
        PersistedSession::new(EnumerationState::new(self.start.clone()))
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            start: Combination::default(),
        }
    }
}

/// Everything that survives a restart
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub state: EnumerationState,
    pub successes: Vec<SuccessRecord>,
    pub calibration: Calibration,
    pub last_updated: Option<String>,
    /// Unrecognised top-level fields, kept for round-tripping
    pub extra: Map<String, Value>,
}

impl PersistedSession {
    pub fn new(state: EnumerationState) -> Self {
        Self {
            state,
            successes: Vec::new(),
            calibration: Calibration::default(),
            last_updated: None,
            extra: Map::new(),
        }
    }

    /// Append a success unless the exact combination string is already recorded
    ///
    /// Returns true if a record was appended.
    pub fn record_success(&mut self, combination: &str, at: DateTime<Utc>) -> bool {
        if self.has_success(combination) {
            debug!(%combination, "record_success: already recorded");
            return false;
        }
        self.successes.push(SuccessRecord {
            combination: combination.to_string(),
            discovered_at: Some(at),
        });
        true
    }

    pub fn has_success(&self, combination: &str) -> bool {
        self.successes.iter().any(|s| s.combination == combination)
    }

    /// Drop every recorded success, returning how many were removed
    pub fn clear_successes(&mut self) -> usize {
        let n = self.successes.len();
        self.successes.clear();
        n
    }

    /// Formatted combinations in discovery order
    pub fn success_combinations(&self) -> Vec<&str> {
        self.successes.iter().map(|s| s.combination.as_str()).collect()
    }
}

/// Errors converting the JSON document into a session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionFileError {
    #[error("Stored combination is invalid: {0}")]
    Combination(#[from] CombinationError),

    #[error("Stored combination has {actual} digits, expected {expected}")]
    Length { expected: usize, actual: usize },
}

/// JSON document as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SessionFile {
    current_combination: Vec<u8>,
    #[serde(default)]
    attempt_count: u64,
    #[serde(default)]
    successful_combinations: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    discovered_at: BTreeMap<String, DateTime<Utc>>,
    #[serde(default)]
    exhausted: bool,
    #[serde(flatten)]
    calibration: Calibration,
    #[serde(default)]
    last_updated: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SessionFile {
    pub(crate) fn from_session(session: &PersistedSession, written_at: DateTime<Utc>) -> Self {
        let discovered_at = session
            .successes
            .iter()
            .filter_map(|s| s.discovered_at.map(|at| (s.combination.clone(), at)))
            .collect();
        Self {
            current_combination: session.state.combination.digits().to_vec(),
            attempt_count: session.state.attempt_count,
            successful_combinations: session.successes.iter().map(|s| s.combination.clone()).collect(),
            discovered_at,
            exhausted: session.state.exhausted,
            calibration: session.calibration.clone(),
            last_updated: Some(written_at.to_rfc3339()),
            extra: session.extra.clone(),
        }
    }

    /// Validate against the expected shape and build the session
    pub(crate) fn into_session(self, defaults: &SessionDefaults) -> Result<PersistedSession, SessionFileError> {
        let actual = self.current_combination.len();
        if actual != defaults.length() {
            return Err(SessionFileError::Length {
                expected: defaults.length(),
                actual,
            });
        }
        let mut combination = Combination::new(self.current_combination, defaults.base())?;
        if self.exhausted {
            combination.reset_to_zero();
        }

        let mut successes: Vec<SuccessRecord> = Vec::with_capacity(self.successful_combinations.len());
        for formatted in self.successful_combinations {
            if successes.iter().any(|s| s.combination == formatted) {
                continue;
            }
            let discovered_at = self.discovered_at.get(&formatted).copied();
            successes.push(SuccessRecord {
                combination: formatted,
                discovered_at,
            });
        }

        Ok(PersistedSession {
            state: EnumerationState {
                combination,
                attempt_count: self.attempt_count,
                exhausted: self.exhausted,
            },
            successes,
            calibration: self.calibration,
            last_updated: self.last_updated,
            extra: self.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(start: &str) -> PersistedSession {
        SessionDefaults::new(Combination::parse(start, 10).unwrap()).fresh_session()
    }

    #[test]
    fn test_record_success_deduplicates() {
        let mut s = session("0000");
        let now = Utc::now();
        assert!(s.record_success("0042", now));
        assert!(!s.record_success("0042", now));
        assert_eq!(s.success_combinations(), vec!["0042"]);
    }

    #[test]
    fn test_record_success_keeps_order() {
        let mut s = session("0000");
        let now = Utc::now();
        s.record_success("0042", now);
        s.record_success("1234", now);
        s.record_success("0042", now);
        assert_eq!(s.success_combinations(), vec!["0042", "1234"]);
    }

    #[test]
    fn test_clear_successes() {
        let mut s = session("0000");
        s.record_success("0042", Utc::now());
        assert_eq!(s.clear_successes(), 1);
        assert!(s.successes.is_empty());
    }

    #[test]
    fn test_default_defaults_are_four_decimal_digits() {
        let d = SessionDefaults::default();
        assert_eq!(d.length(), 4);
        assert_eq!(d.base(), 10);
        assert_eq!(d.start.to_string(), "0000");
    }

    #[test]
    fn test_reads_legacy_document() {
        let json = r#"{
            "current_combination": [0, 0, 1, 2],
            "attempt_count": 7,
            "successful_combinations": ["0042", "0042"],
            "input_field_pos": [100, 200],
            "submit_button_pos": null,
            "last_updated": "2024-05-01T10:11:12.123456"
        }"#;
        let file: SessionFile = serde_json::from_str(json).unwrap();
        let s = file.into_session(&SessionDefaults::default()).unwrap();
        assert_eq!(s.state.combination.to_string(), "0012");
        assert_eq!(s.state.attempt_count, 7);
        assert!(!s.state.exhausted);
        assert_eq!(s.success_combinations(), vec!["0042"]);
        assert_eq!(s.successes[0].discovered_at, None);
        assert_eq!(s.calibration.input_field_pos, Some([100, 200]));
        assert_eq!(s.calibration.submit_button_pos, None);
        assert_eq!(s.last_updated.as_deref(), Some("2024-05-01T10:11:12.123456"));
        assert!(s.extra.is_empty());
    }

    #[test]
    fn test_unknown_fields_pass_through() {
        let json = r#"{"current_combination": [1, 2, 3, 4], "notes": {"vault": "east wing"}}"#;
        let file: SessionFile = serde_json::from_str(json).unwrap();
        let s = file.into_session(&SessionDefaults::default()).unwrap();
        assert_eq!(s.extra.get("notes"), Some(&serde_json::json!({"vault": "east wing"})));

        let written = serde_json::to_value(SessionFile::from_session(&s, Utc::now())).unwrap();
        assert_eq!(written["notes"]["vault"], "east wing");
        assert_eq!(written["current_combination"], serde_json::json!([1, 2, 3, 4]));
    }

    #[test]
    fn test_rejects_wrong_length_and_digits() {
        let file: SessionFile = serde_json::from_str(r#"{"current_combination": [1, 2, 3]}"#).unwrap();
        assert_eq!(
            file.into_session(&SessionDefaults::default()).unwrap_err(),
            SessionFileError::Length { expected: 4, actual: 3 }
        );

        let file: SessionFile = serde_json::from_str(r#"{"current_combination": [1, 2, 3, 12]}"#).unwrap();
        assert!(matches!(
            file.into_session(&SessionDefaults::default()),
            Err(SessionFileError::Combination(_))
        ));
    }
}
