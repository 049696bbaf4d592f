//! Append-only text log of discovered combinations
//!
//! One line per success: `<RFC 3339 timestamp>: <combination>`.

use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::store::StoreError;

#[derive(Debug, Clone)]
pub struct SuccessLog {
    path: PathBuf,
}

impl SuccessLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one line and flush it to disk
    pub fn append(&self, combination: &str, at: DateTime<Utc>) -> Result<(), StoreError> {
        debug!(path = %self.path.display(), %combination, "SuccessLog::append: called");
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        writeln!(file, "{}: {}", at.to_rfc3339(), combination).map_err(|e| StoreError::io(&self.path, e))?;
        file.sync_data().map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }

    /// Read back every well-formed line; a missing log reads as empty
    pub fn entries(&self) -> Result<Vec<(DateTime<Utc>, String)>, StoreError> {
        let file = match fs::File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        let mut entries = Vec::new();
        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| StoreError::io(&self.path, e))?;
            // The timestamp itself contains ':' so split on the last separator
            if let Some((ts, combination)) = line.rsplit_once(": ")
                && let Ok(at) = DateTime::parse_from_rfc3339(ts)
            {
                entries.push((at.with_timezone(&Utc), combination.to_string()));
            }
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_append_and_read_back() {
        let temp = TempDir::new().unwrap();
        let log = SuccessLog::new(temp.path().join("logs").join("successes.log"));
        let at = Utc::now();

        log.append("0042", at).unwrap();
        log.append("1234", at).unwrap();

        let entries = log.entries().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].1, "0042");
        assert_eq!(entries[1].1, "1234");
        assert_eq!(entries[0].0.timestamp(), at.timestamp());

        let raw = fs::read_to_string(log.path()).unwrap();
        assert!(raw.lines().all(|l| l.contains(": ")));
    }

    #[test]
    fn test_missing_log_is_empty() {
        let temp = TempDir::new().unwrap();
        let log = SuccessLog::new(temp.path().join("none.log"));
        assert!(log.entries().unwrap().is_empty());
    }
}
