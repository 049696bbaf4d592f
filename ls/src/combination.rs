//! Fixed-width digit sequences in a small numeral base

use std::fmt;

use thiserror::Error;

/// Default number of digits on a lock dial
pub const DEFAULT_LENGTH: usize = 4;

/// Default numeral base (decimal dials)
pub const DEFAULT_BASE: u8 = 10;

/// Largest supported base; every digit must render as a single ASCII character
pub const MAX_BASE: u8 = 10;

/// Errors from building or parsing a combination
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombinationError {
    #[error("Combination must have at least one digit")]
    Empty,

    #[error("Base {0} is out of range (2..=10)")]
    InvalidBase(u8),

    #[error("Digit {digit} at position {position} is not below base {base}")]
    DigitOutOfRange { position: usize, digit: u8, base: u8 },

    #[error("Character {ch:?} at position {position} is not a base-{base} digit")]
    InvalidCharacter { position: usize, ch: char, base: u8 },

    #[error("Expected {expected} digits, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },
}

/// An ordered sequence of digits, most significant first
///
/// The length and base are fixed at construction and every digit is kept
/// strictly below the base.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Combination {
    digits: Vec<u8>,
    base: u8,
}

impl Combination {
    /// Build a combination from raw digits, validating each against `base`
    pub fn new(digits: Vec<u8>, base: u8) -> Result<Self, CombinationError> {
        check_base(base)?;
        if digits.is_empty() {
            return Err(CombinationError::Empty);
        }
        if let Some((position, &digit)) = digits.iter().enumerate().find(|&(_, &d)| d >= base) {
            return Err(CombinationError::DigitOutOfRange { position, digit, base });
        }
        Ok(Self { digits, base })
    }

    /// The all-zero combination of the given length
    pub fn zero(length: usize, base: u8) -> Result<Self, CombinationError> {
        Self::new(vec![0; length], base)
    }

    /// Parse a string of digits such as `"0012"`
    ///
    /// The length of the result is the length of the input.
    pub fn parse(s: &str, base: u8) -> Result<Self, CombinationError> {
        check_base(base)?;
        let digits = s
            .chars()
            .enumerate()
            .map(|(position, ch)| match ch.to_digit(u32::from(base)) {
                Some(d) => Ok(d as u8),
                None => Err(CombinationError::InvalidCharacter { position, ch, base }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(digits, base)
    }

    /// Parse and additionally require an exact length
    pub fn parse_with_length(s: &str, length: usize, base: u8) -> Result<Self, CombinationError> {
        let combination = Self::parse(s, base)?;
        if combination.len() != length {
            return Err(CombinationError::LengthMismatch {
                expected: length,
                actual: combination.len(),
            });
        }
        Ok(combination)
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    pub fn base(&self) -> u8 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.digits.len()
    }

    /// Always false; construction rejects empty sequences
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    pub fn is_zero(&self) -> bool {
        self.digits.iter().all(|&d| d == 0)
    }

    /// True when every digit is `base - 1`
    pub fn is_max(&self) -> bool {
        self.digits.iter().all(|&d| d == self.base - 1)
    }

    /// Numeric value of the combination read as a base-B number
    pub fn position(&self) -> u64 {
        self.digits
            .iter()
            .fold(0u64, |acc, &d| acc.saturating_mul(u64::from(self.base)).saturating_add(u64::from(d)))
    }

    /// Number of distinct combinations of this length and base (B^L)
    pub fn space(&self) -> u64 {
        u64::from(self.base).saturating_pow(self.digits.len() as u32)
    }

    /// Add one, least significant digit last
    ///
    /// Returns true when the carry ran off the most significant digit, in
    /// which case the digits have wrapped to all zeros.
    pub(crate) fn increment(&mut self) -> bool {
        for digit in self.digits.iter_mut().rev() {
            *digit += 1;
            if *digit < self.base {
                return false;
            }
            *digit = 0;
        }
        true
    }

    pub(crate) fn reset_to_zero(&mut self) {
        self.digits.iter_mut().for_each(|d| *d = 0);
    }
}

impl Default for Combination {
    /// All zeros, `DEFAULT_LENGTH` digits in `DEFAULT_BASE`
    fn default() -> Self {
        Self {
            digits: vec![0; DEFAULT_LENGTH],
            base: DEFAULT_BASE,
        }
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &d in &self.digits {
            // base <= 10, so every digit maps to '0'..='9'
            write!(f, "{}", char::from(b'0' + d))?;
        }
        Ok(())
    }
}

fn check_base(base: u8) -> Result<(), CombinationError> {
    if (2..=MAX_BASE).contains(&base) {
        Ok(())
    } else {
        Err(CombinationError::InvalidBase(base))
    }
}
