use chrono::{DateTime, Utc};
use tracing::{debug, info};

use storage::repository::Storage;
use ufli_core::model::{
    LessonNumber, LessonOutcome, LessonStatus, Student, StudentId, TeacherId,
};
use ufli_core::time::Clock;
use ufli_core::LessonCatalog;

use crate::error::EntryServiceError;

/// Records lesson outcomes against the roster.
///
/// Recording is an upsert: one current outcome per (student, lesson), plus a
/// separate initial-assessment row per lesson. Marking a lesson `U` flips the
/// student off the active roster while keeping every recorded outcome.
pub struct EntryService {
    storage: Storage,
    catalog: LessonCatalog,
    clock: Clock,
}

impl EntryService {
    /// Creates a service over the standard lesson catalog.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            catalog: LessonCatalog::standard(),
            clock: Clock::default(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Override the lesson catalog.
    #[must_use]
    pub fn with_catalog(mut self, catalog: LessonCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Record a current-progress outcome for a student.
    ///
    /// A passing status stamps today's date as the completion date. Group and
    /// teacher attribution come from the student's roster entry. A `U`
    /// status additionally unenrolls the student.
    ///
    /// # Errors
    ///
    /// Returns `UnknownLesson` if the lesson is not in the catalog,
    /// `StorageError::NotFound` (wrapped) if the student is missing, and
    /// storage errors if persistence fails.
    pub async fn record_outcome(
        &self,
        student_id: StudentId,
        lesson: LessonNumber,
        status: LessonStatus,
        teacher_id: Option<TeacherId>,
    ) -> Result<LessonOutcome, EntryServiceError> {
        let outcome = self
            .record(student_id, lesson, status, teacher_id, false)
            .await?;

        if status == LessonStatus::U {
            self.unenroll_student(student_id).await?;
        }

        Ok(outcome)
    }

    /// Record an initial-assessment outcome. These rows sit apart from
    /// current progress and never feed the calculator or the roster status.
    ///
    /// # Errors
    ///
    /// Same failure modes as [`record_outcome`](Self::record_outcome).
    pub async fn record_initial_assessment(
        &self,
        student_id: StudentId,
        lesson: LessonNumber,
        status: LessonStatus,
        teacher_id: Option<TeacherId>,
    ) -> Result<LessonOutcome, EntryServiceError> {
        self.record(student_id, lesson, status, teacher_id, true)
            .await
    }

    async fn record(
        &self,
        student_id: StudentId,
        lesson: LessonNumber,
        status: LessonStatus,
        teacher_id: Option<TeacherId>,
        is_initial_assessment: bool,
    ) -> Result<LessonOutcome, EntryServiceError> {
        if !self.catalog.contains(lesson) {
            return Err(EntryServiceError::UnknownLesson {
                number: lesson.value(),
            });
        }

        let student = self.storage.students.get_student(student_id).await?;
        let now = self.clock.now();

        let mut outcome = LessonOutcome::new(student_id, lesson, status, now);
        if is_initial_assessment {
            outcome = outcome.initial_assessment();
        }
        if let Some(group_id) = student.group_id {
            outcome = outcome.with_group(group_id);
        }
        if let Some(teacher_id) = teacher_id {
            outcome = outcome.with_teacher(teacher_id);
        }
        if status.is_passed() && !is_initial_assessment {
            outcome = outcome.completed_on(now.date_naive());
        }

        self.storage.outcomes.upsert_outcome(&outcome).await?;

        debug!(
            student = student_id.value(),
            lesson = lesson.value(),
            status = status.as_str(),
            initial = is_initial_assessment,
            "recorded outcome"
        );

        Ok(outcome)
    }

    /// Take a student off the active roster. Idempotent; outcomes are kept.
    ///
    /// # Errors
    ///
    /// Returns storage errors if the student is missing or cannot be saved.
    pub async fn unenroll_student(&self, student_id: StudentId) -> Result<Student, EntryServiceError> {
        let mut student = self.storage.students.get_student(student_id).await?;
        if student.is_active() {
            student.unenroll(self.clock.now());
            self.storage.students.upsert_student(&student).await?;
            info!(student = student_id.value(), "unenrolled student");
        }
        Ok(student)
    }

    /// Return a previously unenrolled student to the active roster.
    ///
    /// # Errors
    ///
    /// Returns storage errors if the student is missing or cannot be saved.
    pub async fn restore_student(&self, student_id: StudentId) -> Result<Student, EntryServiceError> {
        let mut student = self.storage.students.get_student(student_id).await?;
        if !student.is_active() {
            student.restore();
            self.storage.students.upsert_student(&student).await?;
            info!(student = student_id.value(), "restored student");
        }
        Ok(student)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{OutcomeRepository, StudentRepository};
    use ufli_core::model::{GradeLevel, GroupId};
    use ufli_core::time::{fixed_clock, fixed_now};

    fn lesson(n: u8) -> LessonNumber {
        LessonNumber::new(n).unwrap()
    }

    async fn seeded() -> (Storage, Student) {
        let storage = Storage::in_memory();
        let student = Student::new(
            StudentId::new(1),
            "Ada",
            GradeLevel::KG,
            Some(GroupId::new(4)),
            fixed_now(),
        );
        storage.students.upsert_student(&student).await.unwrap();
        (storage, student)
    }

    #[tokio::test]
    async fn passing_outcome_gets_attribution_and_date() {
        let (storage, student) = seeded().await;
        let service = EntryService::new(storage.clone()).with_clock(fixed_clock());

        let outcome = service
            .record_outcome(student.id, lesson(3), LessonStatus::Y, Some(TeacherId::new(9)))
            .await
            .unwrap();

        assert_eq!(outcome.group_id, Some(GroupId::new(4)));
        assert_eq!(outcome.teacher_id, Some(TeacherId::new(9)));
        assert_eq!(outcome.completed_on, Some(fixed_now().date_naive()));

        let stored = storage.outcomes.outcomes_for_student(student.id, false).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0], outcome);
    }

    #[tokio::test]
    async fn non_passing_outcome_has_no_completion_date() {
        let (storage, student) = seeded().await;
        let service = EntryService::new(storage).with_clock(fixed_clock());

        let outcome = service
            .record_outcome(student.id, lesson(3), LessonStatus::A, None)
            .await
            .unwrap();
        assert_eq!(outcome.completed_on, None);
    }

    #[tokio::test]
    async fn unenrolled_status_flips_roster_entry() {
        let (storage, student) = seeded().await;
        let service = EntryService::new(storage.clone()).with_clock(fixed_clock());

        service
            .record_outcome(student.id, lesson(7), LessonStatus::U, None)
            .await
            .unwrap();

        let updated = storage.students.get_student(student.id).await.unwrap();
        assert!(!updated.is_active());
        assert_eq!(updated.unenrolled_at, Some(fixed_now()));

        // Outcomes survive unenrollment.
        let stored = storage.outcomes.outcomes_for_student(student.id, false).await.unwrap();
        assert_eq!(stored.len(), 1);

        let restored = service.restore_student(student.id).await.unwrap();
        assert!(restored.is_active());
        assert_eq!(restored.unenrolled_at, None);
    }

    #[tokio::test]
    async fn initial_assessment_does_not_unenroll() {
        let (storage, student) = seeded().await;
        let service = EntryService::new(storage.clone()).with_clock(fixed_clock());

        let outcome = service
            .record_initial_assessment(student.id, lesson(1), LessonStatus::U, None)
            .await
            .unwrap();
        assert!(outcome.is_initial_assessment);

        let updated = storage.students.get_student(student.id).await.unwrap();
        assert!(updated.is_active());
    }

    #[tokio::test]
    async fn unknown_lesson_is_rejected() {
        let (storage, student) = seeded().await;

        // A ten-lesson custom catalog rejects lesson 11.
        let small = LessonCatalog::new(
            (1..=10)
                .map(|n| ufli_core::model::Lesson {
                    number: lesson(n),
                    section_id: 1,
                    is_review: false,
                    name: format!("Lesson {n}"),
                })
                .collect(),
            vec![ufli_core::catalog::SkillSection {
                id: 1,
                name: "Alphabet".into(),
                lessons: (1..=10).map(lesson).collect(),
            }],
        )
        .unwrap();
        let service = EntryService::new(storage)
            .with_clock(fixed_clock())
            .with_catalog(small);

        let err = service
            .record_outcome(student.id, lesson(11), LessonStatus::Y, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EntryServiceError::UnknownLesson { number: 11 }));
    }
}
