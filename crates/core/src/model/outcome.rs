use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{GroupId, LessonNumber, LessonStatus, StudentId, TeacherId};

//
// ─── LESSON OUTCOME ────────────────────────────────────────────────────────────
//

/// A student's recorded result for one lesson.
///
/// At most one current outcome exists per (student, lesson); outcomes taken
/// during the initial assessment are flagged and kept apart from current
/// progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonOutcome {
    pub student_id: StudentId,
    pub lesson: LessonNumber,
    pub status: LessonStatus,
    pub is_initial_assessment: bool,
    pub completed_on: Option<NaiveDate>,
    pub group_id: Option<GroupId>,
    pub teacher_id: Option<TeacherId>,
    pub recorded_at: DateTime<Utc>,
}

impl LessonOutcome {
    /// Creates a current-progress outcome with no completion date or
    /// attribution.
    #[must_use]
    pub fn new(
        student_id: StudentId,
        lesson: LessonNumber,
        status: LessonStatus,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            lesson,
            status,
            is_initial_assessment: false,
            completed_on: None,
            group_id: None,
            teacher_id: None,
            recorded_at,
        }
    }

    /// Flags this outcome as initial-assessment data.
    #[must_use]
    pub fn initial_assessment(mut self) -> Self {
        self.is_initial_assessment = true;
        self
    }

    /// Attributes this outcome to the group it was recorded in.
    #[must_use]
    pub fn with_group(mut self, group_id: GroupId) -> Self {
        self.group_id = Some(group_id);
        self
    }

    /// Attributes this outcome to the teacher who recorded it.
    #[must_use]
    pub fn with_teacher(mut self, teacher_id: TeacherId) -> Self {
        self.teacher_id = Some(teacher_id);
        self
    }

    /// Sets the calendar date the lesson was completed on.
    #[must_use]
    pub fn completed_on(mut self, date: NaiveDate) -> Self {
        self.completed_on = Some(date);
        self
    }
}

//
// ─── OUTCOME SET ───────────────────────────────────────────────────────────────
//

/// The calculator's input: a student's current statuses keyed by lesson
/// number. A lesson with no entry simply has no key; the calculator treats
/// that the same as a non-passing status.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutcomeSet {
    statuses: BTreeMap<LessonNumber, LessonStatus>,
}

impl OutcomeSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from outcomes, skipping initial-assessment rows. A later
    /// entry for the same lesson replaces an earlier one.
    pub fn from_outcomes<'a, I>(outcomes: I) -> Self
    where
        I: IntoIterator<Item = &'a LessonOutcome>,
    {
        let mut set = Self::new();
        for outcome in outcomes {
            if !outcome.is_initial_assessment {
                set.set(outcome.lesson, outcome.status);
            }
        }
        set
    }

    pub fn set(&mut self, lesson: LessonNumber, status: LessonStatus) {
        self.statuses.insert(lesson, status);
    }

    #[must_use]
    pub fn status(&self, lesson: LessonNumber) -> Option<LessonStatus> {
        self.statuses.get(&lesson).copied()
    }

    /// Missing entries count as not passed.
    #[must_use]
    pub fn is_passed(&self, lesson: LessonNumber) -> bool {
        self.status(lesson).is_some_and(|s| s.is_passed())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LessonNumber, LessonStatus)> + '_ {
        self.statuses.iter().map(|(n, s)| (*n, *s))
    }

    /// Highest lesson number with a passing status, if any.
    #[must_use]
    pub fn highest_passed(&self) -> Option<LessonNumber> {
        self.statuses
            .iter()
            .filter(|(_, s)| s.is_passed())
            .map(|(n, _)| *n)
            .next_back()
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
