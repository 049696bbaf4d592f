//! Crash-safe JSON progress store

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::combination::Combination;
use crate::session::{PersistedSession, SessionDefaults, SessionFile, SessionFileError};
use crate::success_log::SuccessLog;

/// Errors from reading or writing the progress file
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Failed to encode session: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid session in {path}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: SessionFileError,
    },
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Loads and saves a single session file
#[derive(Debug, Clone)]
pub struct ProgressStore {
    path: PathBuf,
    defaults: SessionDefaults,
    success_log: Option<SuccessLog>,
}

impl ProgressStore {
    pub fn new(path: impl AsRef<Path>, defaults: SessionDefaults) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            defaults,
            success_log: None,
        }
    }

    /// Also append every newly recorded success to a text log
    pub fn with_success_log(mut self, log: SuccessLog) -> Self {
        self.success_log = Some(log);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn defaults(&self) -> &SessionDefaults {
        &self.defaults
    }

    pub fn success_log(&self) -> Option<&SuccessLog> {
        self.success_log.as_ref()
    }

    /// Read the session, or None if no file exists yet
    pub fn try_load(&self) -> Result<Option<PersistedSession>, StoreError> {
        debug!(path = %self.path.display(), "try_load: called");
        let content = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let file: SessionFile = serde_json::from_str(&content).map_err(|source| StoreError::Parse {
            path: self.path.clone(),
            source,
        })?;
        let session = file.into_session(&self.defaults).map_err(|source| StoreError::Invalid {
            path: self.path.clone(),
            source,
        })?;
        Ok(Some(session))
    }

    /// Read the session, falling back to a fresh one when the file is
    /// missing or unusable
    pub fn load(&self) -> PersistedSession {
        match self.try_load() {
            Ok(Some(session)) => {
                info!(
                    path = %self.path.display(),
                    combination = %session.state.combination,
                    attempt_count = session.state.attempt_count,
                    successes = session.successes.len(),
                    "Loaded progress"
                );
                session
            }
            Ok(None) => {
                info!(path = %self.path.display(), start = %self.defaults.start, "No saved progress, starting fresh");
                self.defaults.fresh_session()
            }
            Err(e) => {
                warn!(error = %e, "Saved progress unusable, starting fresh");
                self.defaults.fresh_session()
            }
        }
    }

    /// Write the whole session atomically
    ///
    /// The document goes to a temp file in the same directory, is synced, and
    /// then renamed over the target. On failure the previous file is intact.
    pub fn save(&self, session: &PersistedSession) -> Result<(), StoreError> {
        debug!(
            path = %self.path.display(),
            attempt_count = session.state.attempt_count,
            "save: called"
        );
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir).map_err(|e| StoreError::io(&dir, e))?;

        let document = SessionFile::from_session(session, Utc::now());
        let json = serde_json::to_vec_pretty(&document).map_err(StoreError::Serialize)?;

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| StoreError::io(&dir, e))?;
        tmp.write_all(&json).map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.write_all(b"\n").map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.as_file().sync_all().map_err(|e| StoreError::io(tmp.path(), e))?;
        tmp.persist(&self.path).map_err(|e| StoreError::io(&self.path, e.error))?;
        Ok(())
    }

    /// Record a success with the current time
    ///
    /// Returns true if the combination was new. New successes are also
    /// appended to the success log; a log write failure is logged and does
    /// not undo the in-memory record.
    pub fn record_success(&self, session: &mut PersistedSession, combination: &str) -> bool {
        let at = Utc::now();
        if !session.record_success(combination, at) {
            return false;
        }
        info!(%combination, "Success recorded");
        if let Some(log) = &self.success_log
            && let Err(e) = log.append(combination, at)
        {
            warn!(error = %e, %combination, "Failed to append to success log");
        }
        true
    }

    /// Where `reset` moves a progress file it cannot read
    pub fn backup_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".bak");
        PathBuf::from(name)
    }

    /// Move the progress file to [`Self::backup_path`], replacing any older backup
    pub fn back_up(&self) -> Result<PathBuf, StoreError> {
        let backup = self.backup_path();
        fs::rename(&self.path, &backup).map_err(|e| StoreError::io(&backup, e))?;
        info!(path = %self.path.display(), backup = %backup.display(), "Progress file backed up");
        Ok(backup)
    }

    /// Replace the stored session with a fresh one starting at `start`,
    /// keeping calibration and unknown fields
    ///
    /// An unreadable file is renamed to [`Self::backup_path`] first, never
    /// overwritten.
    pub fn reset(&self, start: Option<Combination>) -> Result<PersistedSession, StoreError> {
        let previous = match self.try_load() {
            Ok(previous) => previous,
            Err(e) => {
                warn!(error = %e, "Saved progress unusable");
                self.back_up()?;
                None
            }
        };
        let start = start.unwrap_or_else(|| self.defaults.start.clone());
        let mut fresh = SessionDefaults::new(start).fresh_session();
        if let Some(previous) = previous {
            fresh.calibration = previous.calibration;
            fresh.extra = previous.extra;
        }
        self.save(&fresh)?;
        info!(path = %self.path.display(), start = %fresh.state.combination, "Progress reset");
        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::EnumerationState;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn store_in(temp: &TempDir, start: &str) -> ProgressStore {
        let defaults = SessionDefaults::new(Combination::parse(start, 10).unwrap());
        ProgressStore::new(temp.path().join("progress.json"), defaults)
    }

    #[test]
    fn test_load_missing_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0012");
        assert!(store.try_load().unwrap().is_none());

        let session = store.load();
        assert_eq!(session.state.combination.to_string(), "0012");
        assert_eq!(session.state.attempt_count, 0);
        assert!(session.successes.is_empty());
        assert_eq!(session.calibration, Default::default());
    }

    #[test]
    fn test_load_corrupt_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0000");
        fs::write(store.path(), "{ not json").unwrap();

        assert!(matches!(store.try_load(), Err(StoreError::Parse { .. })));
        let session = store.load();
        assert_eq!(session.state.combination.to_string(), "0000");
    }

    #[test]
    fn test_load_out_of_range_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0000");
        fs::write(store.path(), r#"{"current_combination": [0, 0, 0, 10]}"#).unwrap();

        assert!(matches!(store.try_load(), Err(StoreError::Invalid { .. })));
        assert!(store.load().state.combination.is_zero());
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0012");
        let mut session = store.load();
        for _ in 0..3 {
            session.state = session.state.clone().record_attempt().advance();
        }
        store.record_success(&mut session, "0042");
        session.calibration.input_field_pos = Some([640, 360]);
        store.save(&session).unwrap();

        let loaded = store.load();
        assert_eq!(loaded.state, session.state);
        assert_eq!(loaded.successes, session.successes);
        assert_eq!(loaded.calibration, session.calibration);
        assert_eq!(loaded.state.combination.to_string(), "0015");
        assert!(loaded.last_updated.is_some());
    }

    #[test]
    fn test_save_writes_documented_fields() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0012");
        let mut session = store.load();
        store.record_success(&mut session, "0042");
        store.save(&session).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(store.path()).unwrap()).unwrap();
        assert_eq!(raw["current_combination"], serde_json::json!([0, 0, 1, 2]));
        assert_eq!(raw["attempt_count"], 0);
        assert_eq!(raw["successful_combinations"], serde_json::json!(["0042"]));
        assert!(raw["discovered_at"]["0042"].is_string());
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0000");
        let session = store.load();
        store.save(&session).unwrap();
        store.save(&session).unwrap();

        let names: Vec<_> = fs::read_dir(temp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["progress.json".to_string()]);
    }

    #[test]
    fn test_save_failure_keeps_previous_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0000");
        let mut session = store.load();
        session.state = session.state.clone().record_attempt();
        store.save(&session).unwrap();

        // A directory squatting on the target path makes the rename fail
        let blocked = ProgressStore::new(temp.path().join("blocked"), store.defaults().clone());
        fs::create_dir_all(temp.path().join("blocked").join("child")).unwrap();
        assert!(blocked.save(&session).is_err());

        assert_eq!(store.load().state.attempt_count, 1);
    }

    #[test]
    fn test_record_success_twice_appends_once() {
        let temp = TempDir::new().unwrap();
        let log = SuccessLog::new(temp.path().join("successes.log"));
        let store = store_in(&temp, "0000").with_success_log(log.clone());
        let mut session = store.load();

        assert!(store.record_success(&mut session, "0042"));
        assert!(!store.record_success(&mut session, "0042"));

        assert_eq!(session.success_combinations(), vec!["0042"]);
        assert_eq!(log.entries().unwrap().len(), 1);
    }

    #[test]
    fn test_reset_keeps_calibration() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "0000");
        let mut session = store.load();
        session.state = session.state.clone().record_attempt().advance();
        session.calibration.submit_button_pos = Some([10, 20]);
        store.record_success(&mut session, "0000");
        store.save(&session).unwrap();

        let fresh = store.reset(Some(Combination::parse("5000", 10).unwrap())).unwrap();
        assert_eq!(fresh.state.combination.to_string(), "5000");
        assert_eq!(fresh.state.attempt_count, 0);
        assert!(fresh.successes.is_empty());

        let loaded = store.load();
        assert_eq!(loaded.calibration.submit_button_pos, Some([10, 20]));
        assert_eq!(loaded.state, EnumerationState::new(Combination::parse("5000", 10).unwrap()));
    }

    #[test]
    fn test_reset_backs_up_unusable_file() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "00000");
        let original = r#"{"current_combination":[1,2,3,4],"attempt_count":1234,"successful_combinations":["0042"]}"#;
        fs::write(store.path(), original).unwrap();
        assert!(matches!(store.try_load(), Err(StoreError::Invalid { .. })));

        let fresh = store.reset(None).unwrap();
        assert_eq!(fresh.state.combination.to_string(), "00000");
        assert_eq!(fs::read_to_string(store.backup_path()).unwrap(), original);
        assert_eq!(store.backup_path(), temp.path().join("progress.json.bak"));
        assert!(store.try_load().unwrap().is_some());
    }

    #[test]
    fn test_exhausted_state_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = store_in(&temp, "9999");
        let mut session = store.load();
        session.state = session.state.clone().record_attempt().advance();
        assert!(session.state.exhausted);
        store.save(&session).unwrap();

        let loaded = store.load();
        assert!(loaded.state.exhausted);
        assert!(loaded.state.combination.is_zero());
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_save_load_round_trip(start in 0u64..10_000, steps in 0usize..50, hit in proptest::option::of(0u64..10_000)) {
            let temp = TempDir::new().unwrap();
            let store = store_in(&temp, &format!("{start:04}"));
            let mut session = store.load();
            for _ in 0..steps {
                session.state = session.state.clone().record_attempt().advance();
            }
            if let Some(hit) = hit {
                store.record_success(&mut session, &format!("{hit:04}"));
            }
            store.save(&session).unwrap();

            let loaded = store.load();
            prop_assert_eq!(loaded.state, session.state);
            prop_assert_eq!(loaded.successes, session.successes);
        }
    }
}
