//! Enumeration state: the current guess, how many guesses were delivered,
//! and whether the combination space has been exhausted

use tracing::debug;

use crate::combination::Combination;

/// Progress of an enumeration over one combination space
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumerationState {
    pub combination: Combination,
    pub attempt_count: u64,
    pub exhausted: bool,
}

impl EnumerationState {
    /// Start a fresh enumeration at `start`
    pub fn new(start: Combination) -> Self {
        Self {
            combination: start,
            attempt_count: 0,
            exhausted: false,
        }
    }

    /// Move to the next combination in odometer order
    ///
    /// Wrapping past the maximal combination lands on all zeros and marks the
    /// state exhausted. Once exhausted this is a no-op.
    pub fn advance(mut self) -> Self {
        if self.exhausted {
            self.combination.reset_to_zero();
            return self;
        }
        if self.combination.increment() {
            debug!(attempt_count = self.attempt_count, "advance: combination space exhausted");
            self.exhausted = true;
        }
        self
    }

    /// Count one delivered guess; the combination is left alone
    pub fn record_attempt(mut self) -> Self {
        self.attempt_count = self.attempt_count.saturating_add(1);
        self
    }

    /// Share of the combination space already passed, as a percentage
    pub fn progress_percent(&self) -> f64 {
        if self.exhausted {
            return 100.0;
        }
        self.combination.position() as f64 / self.combination.space() as f64 * 100.0
    }

    /// Combinations left to try, counting the current one
    pub fn remaining(&self) -> u64 {
        if self.exhausted {
            0
        } else {
            self.combination.space() - self.combination.position()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(s: &str) -> EnumerationState {
        EnumerationState::new(Combination::parse(s, 10).unwrap())
    }

    #[test]
    fn test_advance_three_times_from_0012() {
        let mut st = state("0012");
        let mut seen = Vec::new();
        for _ in 0..3 {
            st = st.advance();
            seen.push(st.combination.to_string());
        }
        assert_eq!(seen, vec!["0013", "0014", "0015"]);
        assert!(!st.exhausted);
    }

    #[test]
    fn test_record_attempt_three_times() {
        let st = state("0012").record_attempt().record_attempt().record_attempt();
        assert_eq!(st.attempt_count, 3);
        assert_eq!(st.combination.to_string(), "0012");
    }

    #[test]
    fn test_advance_from_max_exhausts() {
        let st = state("9999").advance();
        assert_eq!(st.combination.digits(), &[0, 0, 0, 0]);
        assert!(st.exhausted);
    }

    #[test]
    fn test_advance_is_idempotent_once_exhausted() {
        let st = state("9999").advance().advance().advance();
        assert!(st.exhausted);
        assert!(st.combination.is_zero());
    }

    #[test]
    fn test_full_cycle_exhausts_exactly_once() {
        let mut st = state("0000");
        let space = st.combination.space();
        let mut exhausted_at = Vec::new();
        for i in 1..=space {
            let was = st.exhausted;
            st = st.advance();
            if st.exhausted && !was {
                exhausted_at.push(i);
            }
        }
        assert_eq!(exhausted_at, vec![space]);
        assert_eq!(st.combination.to_string(), "0000");
    }

    #[test]
    fn test_record_attempt_saturates() {
        let mut st = state("0000");
        st.attempt_count = u64::MAX;
        let st = st.record_attempt();
        assert_eq!(st.attempt_count, u64::MAX);
        assert_eq!(st.combination.to_string(), "0000");
    }

    #[test]
    fn test_advance_and_record_attempt_are_independent() {
        let st = state("0500").record_attempt();
        let advanced = st.clone().advance();
        assert_eq!(advanced.attempt_count, st.attempt_count);

        let counted = advanced.clone().record_attempt();
        assert_eq!(counted.combination, advanced.combination);
        assert_eq!(counted.exhausted, advanced.exhausted);
    }

    #[test]
    fn test_progress_and_remaining() {
        let st = state("2500");
        assert!((st.progress_percent() - 25.0).abs() < f64::EPSILON);
        assert_eq!(st.remaining(), 7500);

        let done = state("9999").advance();
        assert_eq!(done.remaining(), 0);
        assert!((done.progress_percent() - 100.0).abs() < f64::EPSILON);
    }
}
