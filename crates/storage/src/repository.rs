use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use ufli_core::model::{
    GradeLevel, Group, GroupId, LessonNumber, LessonOutcome, Student, StudentId,
};
use ufli_core::progress::ProgressReport;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Persisted shape for a student's progress summary.
///
/// This mirrors the calculator's `ProgressReport` so repositories can store
/// one flat row per student without leaking storage concerns into the
/// domain layer. Section breakdowns are kept as the compact id-to-percentage
/// map.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    pub student_id: StudentId,
    pub grade: GradeLevel,
    pub current_lesson: Option<LessonNumber>,
    pub foundational_count: u32,
    pub foundational_pct: f64,
    pub min_grade_count: u32,
    pub min_grade_pct: f64,
    pub full_grade_count: u32,
    pub full_grade_pct: f64,
    pub benchmark_count: u32,
    pub benchmark_pct: f64,
    pub section_percentages: BTreeMap<u8, f64>,
    pub calculated_at: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn from_report(
        student_id: StudentId,
        report: &ProgressReport,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            student_id,
            grade: report.grade,
            current_lesson: report.current_lesson,
            foundational_count: report.foundational_count,
            foundational_pct: report.foundational_pct,
            min_grade_count: report.min_grade_count,
            min_grade_pct: report.min_grade_pct,
            full_grade_count: report.full_grade_count,
            full_grade_pct: report.full_grade_pct,
            benchmark_count: report.benchmark_count,
            benchmark_pct: report.benchmark_pct,
            section_percentages: report.section_percentages(),
            calculated_at,
        }
    }
}

/// Repository contract for students.
#[async_trait]
pub trait StudentRepository: Send + Sync {
    /// Persist or update a student.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the student cannot be stored.
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError>;

    /// Fetch a student by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError>;

    /// All students, active and unenrolled, ordered by id.
    async fn list_students(&self) -> Result<Vec<Student>, StorageError>;

    /// Active students in a group, ordered by id.
    async fn students_in_group(&self, group_id: GroupId) -> Result<Vec<Student>, StorageError>;

    /// Active students at a grade level, ordered by id.
    async fn students_in_grade(&self, grade: GradeLevel) -> Result<Vec<Student>, StorageError>;
}

/// Repository contract for groups.
#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing.
    async fn get_group(&self, id: GroupId) -> Result<Group, StorageError>;

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError>;
}

/// Repository contract for lesson outcomes.
#[async_trait]
pub trait OutcomeRepository: Send + Sync {
    /// Persist or replace the outcome for (student, lesson, assessment
    /// type). Recording twice for the same key overwrites the status.
    async fn upsert_outcome(&self, outcome: &LessonOutcome) -> Result<(), StorageError>;

    /// A student's outcomes for one assessment type, ordered by lesson.
    async fn outcomes_for_student(
        &self,
        student_id: StudentId,
        is_initial_assessment: bool,
    ) -> Result<Vec<LessonOutcome>, StorageError>;
}

/// Repository contract for progress summary rows.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError>;

    /// Returns `None` when progress has never been calculated.
    async fn get_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Progress rows for the given students; students without a row are
    /// simply absent from the result.
    async fn progress_for_students(
        &self,
        student_ids: &[StudentId],
    ) -> Result<Vec<ProgressRecord>, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    students: Arc<Mutex<HashMap<StudentId, Student>>>,
    groups: Arc<Mutex<HashMap<GroupId, Group>>>,
    outcomes: Arc<Mutex<HashMap<(StudentId, LessonNumber, bool), LessonOutcome>>>,
    progress: Arc<Mutex<HashMap<StudentId, ProgressRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock<'a, T>(
    mutex: &'a Mutex<T>,
) -> Result<std::sync::MutexGuard<'a, T>, StorageError> {
    mutex
        .lock()
        .map_err(|e| StorageError::Connection(e.to_string()))
}

#[async_trait]
impl StudentRepository for InMemoryRepository {
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError> {
        let mut guard = lock(&self.students)?;
        guard.insert(student.id, student.clone());
        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError> {
        let guard = lock(&self.students)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        let guard = lock(&self.students)?;
        let mut students: Vec<Student> = guard.values().cloned().collect();
        students.sort_by_key(|s| s.id);
        Ok(students)
    }

    async fn students_in_group(&self, group_id: GroupId) -> Result<Vec<Student>, StorageError> {
        let guard = lock(&self.students)?;
        let mut students: Vec<Student> = guard
            .values()
            .filter(|s| s.group_id == Some(group_id) && s.is_active())
            .cloned()
            .collect();
        students.sort_by_key(|s| s.id);
        Ok(students)
    }

    async fn students_in_grade(&self, grade: GradeLevel) -> Result<Vec<Student>, StorageError> {
        let guard = lock(&self.students)?;
        let mut students: Vec<Student> = guard
            .values()
            .filter(|s| s.grade == grade && s.is_active())
            .cloned()
            .collect();
        students.sort_by_key(|s| s.id);
        Ok(students)
    }
}

#[async_trait]
impl GroupRepository for InMemoryRepository {
    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError> {
        let mut guard = lock(&self.groups)?;
        guard.insert(group.id, group.clone());
        Ok(())
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, StorageError> {
        let guard = lock(&self.groups)?;
        guard.get(&id).cloned().ok_or(StorageError::NotFound)
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        let guard = lock(&self.groups)?;
        let mut groups: Vec<Group> = guard.values().cloned().collect();
        groups.sort_by_key(|g| g.id);
        Ok(groups)
    }
}

#[async_trait]
impl OutcomeRepository for InMemoryRepository {
    async fn upsert_outcome(&self, outcome: &LessonOutcome) -> Result<(), StorageError> {
        let mut guard = lock(&self.outcomes)?;
        guard.insert(
            (
                outcome.student_id,
                outcome.lesson,
                outcome.is_initial_assessment,
            ),
            outcome.clone(),
        );
        Ok(())
    }

    async fn outcomes_for_student(
        &self,
        student_id: StudentId,
        is_initial_assessment: bool,
    ) -> Result<Vec<LessonOutcome>, StorageError> {
        let guard = lock(&self.outcomes)?;
        let mut outcomes: Vec<LessonOutcome> = guard
            .values()
            .filter(|o| {
                o.student_id == student_id && o.is_initial_assessment == is_initial_assessment
            })
            .cloned()
            .collect();
        outcomes.sort_by_key(|o| o.lesson);
        Ok(outcomes)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        let mut guard = lock(&self.progress)?;
        guard.insert(record.student_id, record.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let guard = lock(&self.progress)?;
        Ok(guard.get(&student_id).cloned())
    }

    async fn progress_for_students(
        &self,
        student_ids: &[StudentId],
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = lock(&self.progress)?;
        let mut records: Vec<ProgressRecord> = student_ids
            .iter()
            .filter_map(|id| guard.get(id).cloned())
            .collect();
        records.sort_by_key(|r| r.student_id);
        Ok(records)
    }
}

/// Aggregates the repositories behind trait objects for easy backend
/// swapping.
#[derive(Clone)]
pub struct Storage {
    pub students: Arc<dyn StudentRepository>,
    pub groups: Arc<dyn GroupRepository>,
    pub outcomes: Arc<dyn OutcomeRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let students: Arc<dyn StudentRepository> = Arc::new(repo.clone());
        let groups: Arc<dyn GroupRepository> = Arc::new(repo.clone());
        let outcomes: Arc<dyn OutcomeRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self {
            students,
            groups,
            outcomes,
            progress,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ufli_core::model::{LessonStatus, OutcomeSet};
    use ufli_core::time::fixed_now;
    use ufli_core::{GradeConfig, LessonCatalog, ProgressCalculator};

    fn build_student(id: u64) -> Student {
        Student::new(
            StudentId::new(id),
            format!("Student {id}"),
            GradeLevel::KG,
            Some(GroupId::new(1)),
            fixed_now(),
        )
    }

    fn lesson(n: u8) -> LessonNumber {
        LessonNumber::new(n).unwrap()
    }

    #[tokio::test]
    async fn round_trips_student() {
        let repo = InMemoryRepository::new();
        let student = build_student(1);
        repo.upsert_student(&student).await.unwrap();

        let fetched = repo.get_student(student.id).await.unwrap();
        assert_eq!(fetched, student);
    }

    #[tokio::test]
    async fn missing_student_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo.get_student(StudentId::new(9)).await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn group_listing_excludes_unenrolled() {
        let repo = InMemoryRepository::new();
        let active = build_student(1);
        let mut gone = build_student(2);
        gone.unenroll(fixed_now());

        repo.upsert_student(&active).await.unwrap();
        repo.upsert_student(&gone).await.unwrap();

        let in_group = repo.students_in_group(GroupId::new(1)).await.unwrap();
        assert_eq!(in_group.len(), 1);
        assert_eq!(in_group[0].id, active.id);
    }

    #[tokio::test]
    async fn outcome_upsert_replaces_status() {
        let repo = InMemoryRepository::new();
        let student_id = StudentId::new(1);

        let first = LessonOutcome::new(student_id, lesson(5), LessonStatus::N, fixed_now());
        repo.upsert_outcome(&first).await.unwrap();

        let second = LessonOutcome::new(student_id, lesson(5), LessonStatus::Y, fixed_now());
        repo.upsert_outcome(&second).await.unwrap();

        let outcomes = repo.outcomes_for_student(student_id, false).await.unwrap();
        assert_eq!(outcomes.len(), 1);
        assert_eq!(outcomes[0].status, LessonStatus::Y);
    }

    #[tokio::test]
    async fn initial_assessment_rows_are_separate() {
        let repo = InMemoryRepository::new();
        let student_id = StudentId::new(1);

        let current = LessonOutcome::new(student_id, lesson(1), LessonStatus::Y, fixed_now());
        let initial = LessonOutcome::new(student_id, lesson(1), LessonStatus::N, fixed_now())
            .initial_assessment();
        repo.upsert_outcome(&current).await.unwrap();
        repo.upsert_outcome(&initial).await.unwrap();

        let current_rows = repo.outcomes_for_student(student_id, false).await.unwrap();
        let initial_rows = repo.outcomes_for_student(student_id, true).await.unwrap();
        assert_eq!(current_rows.len(), 1);
        assert_eq!(initial_rows.len(), 1);
        assert_eq!(current_rows[0].status, LessonStatus::Y);
        assert_eq!(initial_rows[0].status, LessonStatus::N);
    }

    #[tokio::test]
    async fn progress_record_round_trips_report() {
        let repo = InMemoryRepository::new();
        let catalog = LessonCatalog::standard();
        let config = GradeConfig::standard();
        let calc = ProgressCalculator::new(&catalog, &config);

        let mut outcomes = OutcomeSet::new();
        for n in 1..=30 {
            outcomes.set(lesson(n), LessonStatus::Y);
        }
        let report = calc.calculate(GradeLevel::KG, &outcomes).unwrap();
        let record = ProgressRecord::from_report(StudentId::new(1), &report, fixed_now());

        repo.upsert_progress(&record).await.unwrap();
        let fetched = repo.get_progress(StudentId::new(1)).await.unwrap().unwrap();
        assert_eq!(fetched, record);
        assert_eq!(fetched.min_grade_pct, 88.24);
        assert_eq!(fetched.section_percentages.len(), 17);
    }

    #[tokio::test]
    async fn progress_for_students_skips_missing_rows() {
        let repo = InMemoryRepository::new();
        let catalog = LessonCatalog::standard();
        let config = GradeConfig::standard();
        let calc = ProgressCalculator::new(&catalog, &config);
        let report = calc.calculate(GradeLevel::KG, &OutcomeSet::new()).unwrap();

        let record = ProgressRecord::from_report(StudentId::new(1), &report, fixed_now());
        repo.upsert_progress(&record).await.unwrap();

        let records = repo
            .progress_for_students(&[StudentId::new(1), StudentId::new(2)])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }
}
