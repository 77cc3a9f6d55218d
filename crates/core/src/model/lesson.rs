use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Number of lessons in the curriculum.
pub const TOTAL_LESSONS: u8 = 128;

//
// ─── LESSON NUMBER ─────────────────────────────────────────────────────────────
//

/// A validated lesson number in `[1, 128]`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LessonNumber(u8);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("lesson number must be in 1..=128, got {provided}")]
pub struct LessonNumberError {
    pub provided: u16,
}

impl LessonNumber {
    /// Creates a lesson number, rejecting values outside `1..=128`.
    ///
    /// # Errors
    ///
    /// Returns `LessonNumberError` if `n` is 0 or greater than 128.
    pub fn new(n: u8) -> Result<Self, LessonNumberError> {
        if n == 0 || n > TOTAL_LESSONS {
            return Err(LessonNumberError {
                provided: u16::from(n),
            });
        }
        Ok(Self(n))
    }

    /// Returns the underlying value.
    #[must_use]
    pub fn value(&self) -> u8 {
        self.0
    }

    /// Iterates every lesson number from `first` through `last`, inclusive.
    ///
    /// # Errors
    ///
    /// Returns `LessonNumberError` if either bound is out of range.
    pub fn range(first: u8, last: u8) -> Result<Vec<Self>, LessonNumberError> {
        let lo = Self::new(first)?;
        let hi = Self::new(last)?;
        Ok((lo.0..=hi.0).map(LessonNumber).collect())
    }
}

impl TryFrom<u8> for LessonNumber {
    type Error = LessonNumberError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<LessonNumber> for u8 {
    fn from(n: LessonNumber) -> Self {
        n.0
    }
}

impl fmt::Debug for LessonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LessonNumber({})", self.0)
    }
}

impl fmt::Display for LessonNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

//
// ─── LESSON STATUS ─────────────────────────────────────────────────────────────
//

/// A recorded outcome for one lesson: passed, not yet, absent, or
/// unenrolled at the time of entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LessonStatus {
    /// Passed.
    Y,
    /// Not yet / failed.
    N,
    /// Absent.
    A,
    /// Unenrolled at time of recording.
    U,
}

impl LessonStatus {
    /// One-letter code used in storage and imports.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            LessonStatus::Y => "Y",
            LessonStatus::N => "N",
            LessonStatus::A => "A",
            LessonStatus::U => "U",
        }
    }

    /// True only for `Y`.
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, LessonStatus::Y)
    }

    /// True if the lesson was attempted (`Y` or `N`).
    #[must_use]
    pub fn is_attempted(&self) -> bool {
        matches!(self, LessonStatus::Y | LessonStatus::N)
    }
}

impl fmt::Display for LessonStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("invalid lesson status code: {provided}")]
pub struct ParseStatusError {
    pub provided: String,
}

impl FromStr for LessonStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Y" => Ok(LessonStatus::Y),
            "N" => Ok(LessonStatus::N),
            "A" => Ok(LessonStatus::A),
            "U" => Ok(LessonStatus::U),
            other => Err(ParseStatusError {
                provided: other.to_string(),
            }),
        }
    }
}

//
// ─── LESSON ────────────────────────────────────────────────────────────────────
//

/// One numbered unit of the curriculum. Static reference data: created once
/// at catalog construction, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lesson {
    pub number: LessonNumber,
    pub section_id: u8,
    pub is_review: bool,
    pub name: String,
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lesson_number_rejects_zero_and_overflow() {
        assert!(LessonNumber::new(0).is_err());
        assert!(LessonNumber::new(129).is_err());
        assert!(LessonNumber::new(1).is_ok());
        assert!(LessonNumber::new(128).is_ok());
    }

    #[test]
    fn lesson_number_range_is_inclusive() {
        let r = LessonNumber::range(42, 53).unwrap();
        assert_eq!(r.len(), 12);
        assert_eq!(r[0].value(), 42);
        assert_eq!(r[11].value(), 53);
    }

    #[test]
    fn lesson_number_range_rejects_bad_bounds() {
        assert!(LessonNumber::range(0, 10).is_err());
        assert!(LessonNumber::range(1, 200).is_err());
    }

    #[test]
    fn status_codes_round_trip() {
        for status in [
            LessonStatus::Y,
            LessonStatus::N,
            LessonStatus::A,
            LessonStatus::U,
        ] {
            let parsed: LessonStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_rejects_unknown_code() {
        let err = "X".parse::<LessonStatus>().unwrap_err();
        assert_eq!(err.provided, "X");
    }

    #[test]
    fn only_y_counts_as_passed() {
        assert!(LessonStatus::Y.is_passed());
        assert!(!LessonStatus::N.is_passed());
        assert!(!LessonStatus::A.is_passed());
        assert!(!LessonStatus::U.is_passed());
    }

    #[test]
    fn attempted_is_y_or_n() {
        assert!(LessonStatus::Y.is_attempted());
        assert!(LessonStatus::N.is_attempted());
        assert!(!LessonStatus::A.is_attempted());
    }
}
