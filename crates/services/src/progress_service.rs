use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use storage::repository::{ProgressRecord, Storage};
use ufli_core::model::{GradeLevel, GroupId, OutcomeSet, StudentId};
use ufli_core::time::Clock;
use ufli_core::{GradeConfig, LessonCatalog, ProgressCalculator};

use crate::error::ProgressServiceError;

//
// ─── RECALCULATE SUMMARY ───────────────────────────────────────────────────────
//

/// Outcome of a batch recalculation. One student failing does not stop the
/// batch; failures are collected here with their messages.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecalculateSummary {
    pub succeeded: u32,
    pub failed: u32,
    pub errors: Vec<(StudentId, String)>,
}

impl RecalculateSummary {
    #[must_use]
    pub fn processed(&self) -> u32 {
        self.succeeded + self.failed
    }
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Recomputes and persists progress summaries from recorded outcomes.
///
/// The stored summary row and the student's `current_lesson` are both derived
/// data; this service is the only writer for either, so a recalculation can
/// always rebuild them from the outcome log.
pub struct ProgressService {
    storage: Storage,
    catalog: LessonCatalog,
    config: GradeConfig,
    clock: Clock,
}

impl ProgressService {
    /// Creates a service over the standard curriculum tables and a real-time
    /// clock.
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            catalog: LessonCatalog::standard(),
            config: GradeConfig::standard(),
            clock: Clock::default(),
        }
    }

    /// Override the clock (usually for deterministic testing).
    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    /// Override the curriculum tables, e.g. with a reduced catalog in tests.
    #[must_use]
    pub fn with_tables(mut self, catalog: LessonCatalog, config: GradeConfig) -> Self {
        self.catalog = catalog;
        self.config = config;
        self
    }

    /// Current time according to the service's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Recalculate one student's progress from their current outcomes and
    /// persist the summary row. Updates the student's `current_lesson` when
    /// the derived value changed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) if the student is missing,
    /// calculation errors for unknown lessons or unconfigured grades, and
    /// storage errors if persistence fails.
    pub async fn recalculate_student(
        &self,
        student_id: StudentId,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let mut student = self.storage.students.get_student(student_id).await?;
        let rows = self
            .storage
            .outcomes
            .outcomes_for_student(student_id, false)
            .await?;
        let outcomes = OutcomeSet::from_outcomes(&rows);

        let calculator = ProgressCalculator::new(&self.catalog, &self.config);
        let report = calculator.calculate(student.grade, &outcomes)?;

        let record = ProgressRecord::from_report(student_id, &report, self.clock.now());
        self.storage.progress.upsert_progress(&record).await?;

        if student.current_lesson != report.current_lesson {
            student.current_lesson = report.current_lesson;
            self.storage.students.upsert_student(&student).await?;
        }

        debug!(
            student = student_id.value(),
            grade = %record.grade,
            benchmark_pct = record.benchmark_pct,
            "recalculated progress"
        );

        Ok(record)
    }

    /// Recalculate a batch of students, continuing past individual failures.
    pub async fn recalculate_students(&self, student_ids: &[StudentId]) -> RecalculateSummary {
        let mut summary = RecalculateSummary::default();
        for &student_id in student_ids {
            match self.recalculate_student(student_id).await {
                Ok(_) => summary.succeeded += 1,
                Err(err) => {
                    warn!(
                        student = student_id.value(),
                        error = %err,
                        "recalculation failed"
                    );
                    summary.failed += 1;
                    summary.errors.push((student_id, err.to_string()));
                }
            }
        }
        summary
    }

    /// Recalculate every active student in a group.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be listed; per-student
    /// failures are collected in the summary instead.
    pub async fn recalculate_group(
        &self,
        group_id: GroupId,
    ) -> Result<RecalculateSummary, ProgressServiceError> {
        let students = self.storage.students.students_in_group(group_id).await?;
        let ids: Vec<StudentId> = students.iter().map(|s| s.id).collect();
        Ok(self.recalculate_students(&ids).await)
    }

    /// Recalculate every active student at a grade level.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be listed.
    pub async fn recalculate_grade(
        &self,
        grade: GradeLevel,
    ) -> Result<RecalculateSummary, ProgressServiceError> {
        let students = self.storage.students.students_in_grade(grade).await?;
        let ids: Vec<StudentId> = students.iter().map(|s| s.id).collect();
        Ok(self.recalculate_students(&ids).await)
    }

    /// Recalculate the whole roster, unenrolled students included, so stale
    /// summary rows are refreshed after a config change.
    ///
    /// # Errors
    ///
    /// Returns a storage error if the roster cannot be listed.
    pub async fn recalculate_all(&self) -> Result<RecalculateSummary, ProgressServiceError> {
        let students = self.storage.students.list_students().await?;
        let ids: Vec<StudentId> = students.iter().map(|s| s.id).collect();
        Ok(self.recalculate_students(&ids).await)
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
