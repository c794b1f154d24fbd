//! Number validation and guess scoring.
//!
//! Both are pure functions. Secrets and guesses share one type, [`Digits`],
//! which can only be built from text that passes the validator, so scoring
//! never sees an invalid number.

use std::fmt;

use crate::GameError;

/// How many digits a secret or guess has.
pub const NUMBER_LENGTH: usize = 4;

/// Four distinct decimal digits, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digits([u8; NUMBER_LENGTH]);

impl Digits {
    /// Parses the exact text form of a number.
    ///
    /// The text must be exactly four ASCII digits with no repeats. Nothing
    /// is trimmed and no numeric conversion happens, so `"123"` and
    /// `" 1234"` are both rejected.
    ///
    /// # Errors
    /// Returns [`GameError::InvalidNumber`] carrying the rejected text.
    pub fn parse(text: &str) -> Result<Self, GameError> {
        let invalid = || GameError::InvalidNumber(text.to_string());

        let bytes: [u8; NUMBER_LENGTH] =
            text.as_bytes().try_into().map_err(|_| invalid())?;

        let mut seen = [false; 10];
        let mut digits = [0u8; NUMBER_LENGTH];
        for (slot, byte) in digits.iter_mut().zip(bytes) {
            if !byte.is_ascii_digit() {
                return Err(invalid());
            }
            let d = byte - b'0';
            if seen[usize::from(d)] {
                return Err(invalid());
            }
            seen[usize::from(d)] = true;
            *slot = d;
        }
        Ok(Self(digits))
    }

    /// Returns the digit values (0–9) in order.
    pub fn digits(&self) -> [u8; NUMBER_LENGTH] {
        self.0
    }

    fn contains(&self, digit: u8) -> bool {
        self.0.contains(&digit)
    }
}

impl fmt::Display for Digits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for d in self.0 {
            write!(f, "{d}")?;
        }
        Ok(())
    }
}

/// Returns `true` if `text` is exactly four distinct ASCII digits.
pub fn is_valid_number(text: &str) -> bool {
    Digits::parse(text).is_ok()
}

/// Feedback for one guess.
///
/// Always `correct_positions <= correct_digits <= 4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    /// Guess digits present anywhere in the secret.
    pub correct_digits: u8,
    /// Guess digits equal to the secret digit at the same position.
    pub correct_positions: u8,
}

impl Score {
    /// `true` when the guess is the secret.
    pub fn is_exact(&self) -> bool {
        usize::from(self.correct_positions) == NUMBER_LENGTH
    }
}

/// Scores `guess` against `secret`.
///
/// Position matches count `guess[i] == secret[i]`. Digit matches are a
/// membership test per guess digit, which for unique-digit numbers equals
/// the size of the shared digit set.
pub fn score(guess: &Digits, secret: &Digits) -> Score {
    let mut correct_digits = 0;
    let mut correct_positions = 0;
    for (g, s) in guess.0.iter().zip(secret.0.iter()) {
        if g == s {
            correct_positions += 1;
        }
        if secret.contains(*g) {
            correct_digits += 1;
        }
    }
    Score {
        correct_digits,
        correct_positions,
    }
}
