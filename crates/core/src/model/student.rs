use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::{GroupId, LessonNumber, StudentId};

//
// ─── GRADE LEVEL ───────────────────────────────────────────────────────────────
//

/// Grade levels that carry a requirement entry in the grade table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GradeLevel {
    PreK,
    KG,
    G1,
    G2,
    G3,
    G4,
    G5,
    G6,
    G7,
    G8,
}

impl GradeLevel {
    /// All grade levels in ascending order.
    pub const ALL: [GradeLevel; 10] = [
        GradeLevel::PreK,
        GradeLevel::KG,
        GradeLevel::G1,
        GradeLevel::G2,
        GradeLevel::G3,
        GradeLevel::G4,
        GradeLevel::G5,
        GradeLevel::G6,
        GradeLevel::G7,
        GradeLevel::G8,
    ];

    /// Short code used in storage and rosters.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            GradeLevel::PreK => "PreK",
            GradeLevel::KG => "KG",
            GradeLevel::G1 => "G1",
            GradeLevel::G2 => "G2",
            GradeLevel::G3 => "G3",
            GradeLevel::G4 => "G4",
            GradeLevel::G5 => "G5",
            GradeLevel::G6 => "G6",
            GradeLevel::G7 => "G7",
            GradeLevel::G8 => "G8",
        }
    }

    /// Human-readable name for reports.
    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            GradeLevel::PreK => "Pre-Kindergarten",
            GradeLevel::KG => "Kindergarten",
            GradeLevel::G1 => "1st Grade",
            GradeLevel::G2 => "2nd Grade",
            GradeLevel::G3 => "3rd Grade",
            GradeLevel::G4 => "4th Grade",
            GradeLevel::G5 => "5th Grade",
            GradeLevel::G6 => "6th Grade",
            GradeLevel::G7 => "7th Grade",
            GradeLevel::G8 => "8th Grade",
        }
    }
}

impl fmt::Display for GradeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown grade level: {provided}")]
pub struct ParseGradeError {
    pub provided: String,
}

impl FromStr for GradeLevel {
    type Err = ParseGradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GradeLevel::ALL
            .into_iter()
            .find(|g| g.as_str() == s)
            .ok_or_else(|| ParseGradeError {
                provided: s.to_string(),
            })
    }
}

//
// ─── STUDENT ───────────────────────────────────────────────────────────────────
//

/// Whether the student is currently on the active roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnrollmentStatus {
    Active,
    Unenrolled,
}

impl EnrollmentStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "active",
            EnrollmentStatus::Unenrolled => "unenrolled",
        }
    }
}

/// A student on the roster.
///
/// `current_lesson` is a derived view: the highest lesson with a passing
/// outcome, written back only by explicit progress recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub name: String,
    pub grade: GradeLevel,
    pub group_id: Option<GroupId>,
    pub enrollment: EnrollmentStatus,
    pub current_lesson: Option<LessonNumber>,
    pub created_at: DateTime<Utc>,
    pub unenrolled_at: Option<DateTime<Utc>>,
}

impl Student {
    /// Creates an active student with no recorded progress.
    #[must_use]
    pub fn new(
        id: StudentId,
        name: impl Into<String>,
        grade: GradeLevel,
        group_id: Option<GroupId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            grade,
            group_id,
            enrollment: EnrollmentStatus::Active,
            current_lesson: None,
            created_at,
            unenrolled_at: None,
        }
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.enrollment == EnrollmentStatus::Active
    }

    /// Marks the student unenrolled at the given time. Idempotent.
    pub fn unenroll(&mut self, at: DateTime<Utc>) {
        if self.enrollment == EnrollmentStatus::Active {
            self.enrollment = EnrollmentStatus::Unenrolled;
            self.unenrolled_at = Some(at);
        }
    }

    /// Returns the student to the active roster, clearing the unenrollment
    /// timestamp. Recorded outcomes are untouched.
    pub fn restore(&mut self) {
        self.enrollment = EnrollmentStatus::Active;
        self.unenrolled_at = None;
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn grade_codes_round_trip() {
        for grade in GradeLevel::ALL {
            let parsed: GradeLevel = grade.as_str().parse().unwrap();
            assert_eq!(parsed, grade);
        }
    }

    #[test]
    fn grade_rejects_unknown_code() {
        assert!("G9".parse::<GradeLevel>().is_err());
        assert!("kg".parse::<GradeLevel>().is_err());
    }

    #[test]
    fn new_student_is_active_with_no_progress() {
        let s = Student::new(StudentId::new(1), "Ada", GradeLevel::KG, None, fixed_now());
        assert!(s.is_active());
        assert_eq!(s.current_lesson, None);
        assert_eq!(s.unenrolled_at, None);
    }

    #[test]
    fn unenroll_then_restore_round_trips() {
        let mut s = Student::new(StudentId::new(1), "Ada", GradeLevel::KG, None, fixed_now());
        let at = fixed_now();

        s.unenroll(at);
        assert!(!s.is_active());
        assert_eq!(s.unenrolled_at, Some(at));

        // second unenroll keeps the original timestamp
        s.unenroll(at + chrono::Duration::days(1));
        assert_eq!(s.unenrolled_at, Some(at));

        s.restore();
        assert!(s.is_active());
        assert_eq!(s.unenrolled_at, None);
    }
}
