//! LockStore - combination sequencing and progress persistence
//!
//! Enumerates fixed-width digit combinations in odometer order and keeps the
//! enumeration's progress in a small JSON file that survives being killed at
//! any moment.
//!
//! # Layout on disk
//!
//! ```text
//! progress.json     # current combination, attempt count, successes, calibration
//! successes.log     # one "<timestamp>: <combination>" line per discovery
//! ```
//!
//! # Example
//!
//! ```ignore
//! use lockstore::{Combination, ProgressStore, SessionDefaults};
//!
//! let defaults = SessionDefaults::new(Combination::parse("0012", 10)?);
//! let store = ProgressStore::new("progress.json", defaults);
//! let mut session = store.load();
//! session.state = session.state.record_attempt().advance();
//! store.save(&session)?;
//! ```

pub mod combination;
pub mod session;
pub mod state;
pub mod store;
pub mod success_log;

pub use combination::{Combination, CombinationError, DEFAULT_BASE, DEFAULT_LENGTH, MAX_BASE};
pub use session::{Calibration, PersistedSession, Point, SessionDefaults, SessionFileError, SuccessRecord};
pub use state::EnumerationState;
pub use store::{ProgressStore, StoreError};
pub use success_log::SuccessLog;
