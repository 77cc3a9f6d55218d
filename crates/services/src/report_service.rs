use serde::Serialize;

use storage::repository::{ProgressRecord, Storage};
use ufli_core::model::{GradeLevel, Group, GroupId, LessonNumber, Student};

use crate::error::ReportServiceError;

//
// ─── SUMMARY SHAPES ────────────────────────────────────────────────────────────
//

/// Aggregate progress figures for a set of students.
///
/// Averages cover only students with a calculated summary row; an empty
/// cohort reports zero averages and no lesson range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CohortStats {
    pub student_count: u32,
    pub with_progress: u32,
    pub avg_foundational_pct: f64,
    pub avg_min_grade_pct: f64,
    pub avg_benchmark_pct: f64,
    pub lowest_current_lesson: Option<LessonNumber>,
    pub highest_current_lesson: Option<LessonNumber>,
}

impl CohortStats {
    fn empty(student_count: u32) -> Self {
        Self {
            student_count,
            with_progress: 0,
            avg_foundational_pct: 0.0,
            avg_min_grade_pct: 0.0,
            avg_benchmark_pct: 0.0,
            lowest_current_lesson: None,
            highest_current_lesson: None,
        }
    }
}

/// One group's roster size and aggregate progress.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: Group,
    pub stats: CohortStats,
}

/// One grade level's aggregate progress across all groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeSummary {
    pub grade: GradeLevel,
    pub stats: CohortStats,
}

/// School-wide rollup: every grade level, populated or not.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolSummary {
    pub total_students: u32,
    pub grades: Vec<GradeSummary>,
}

//
// ─── SERVICE ───────────────────────────────────────────────────────────────────
//

/// Read-only rollups over stored progress summaries.
///
/// Reports never recalculate; they aggregate whatever `ProgressService` last
/// persisted, so a stale row shows up as stale numbers rather than hidden
/// recomputation.
pub struct ReportService {
    storage: Storage,
}

impl ReportService {
    #[must_use]
    pub fn new(storage: Storage) -> Self {
        Self { storage }
    }

    /// Aggregate progress for one group's active students.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` (wrapped) if the group is missing.
    pub async fn group_summary(&self, group_id: GroupId) -> Result<GroupSummary, ReportServiceError> {
        let group = self.storage.groups.get_group(group_id).await?;
        let students = self.storage.students.students_in_group(group_id).await?;
        let stats = self.cohort_stats(&students).await?;
        Ok(GroupSummary { group, stats })
    }

    /// Aggregate progress for one grade level's active students.
    ///
    /// # Errors
    ///
    /// Returns storage errors if the roster or summary rows cannot be read.
    pub async fn grade_summary(&self, grade: GradeLevel) -> Result<GradeSummary, ReportServiceError> {
        let students = self.storage.students.students_in_grade(grade).await?;
        let stats = self.cohort_stats(&students).await?;
        Ok(GradeSummary { grade, stats })
    }

    /// School-wide rollup across every grade level, including empty ones.
    ///
    /// # Errors
    ///
    /// Returns storage errors if any roster or summary rows cannot be read.
    pub async fn school_summary(&self) -> Result<SchoolSummary, ReportServiceError> {
        let mut grades = Vec::with_capacity(GradeLevel::ALL.len());
        let mut total_students = 0;
        for grade in GradeLevel::ALL {
            let summary = self.grade_summary(grade).await?;
            total_students += summary.stats.student_count;
            grades.push(summary);
        }
        Ok(SchoolSummary {
            total_students,
            grades,
        })
    }

    async fn cohort_stats(&self, students: &[Student]) -> Result<CohortStats, ReportServiceError> {
        let student_count =
            u32::try_from(students.len()).unwrap_or(u32::MAX);
        if students.is_empty() {
            return Ok(CohortStats::empty(0));
        }

        let ids: Vec<_> = students.iter().map(|s| s.id).collect();
        let records = self.storage.progress.progress_for_students(&ids).await?;
        if records.is_empty() {
            return Ok(CohortStats::empty(student_count));
        }

        let with_progress = u32::try_from(records.len()).unwrap_or(u32::MAX);
        let n = f64::from(with_progress);
        let sum = |f: fn(&ProgressRecord) -> f64| records.iter().map(f).sum::<f64>();

        Ok(CohortStats {
            student_count,
            with_progress,
            avg_foundational_pct: round2(sum(|r| r.foundational_pct) / n),
            avg_min_grade_pct: round2(sum(|r| r.min_grade_pct) / n),
            avg_benchmark_pct: round2(sum(|r| r.benchmark_pct) / n),
            lowest_current_lesson: records.iter().filter_map(|r| r.current_lesson).min(),
            highest_current_lesson: records.iter().filter_map(|r| r.current_lesson).max(),
        })
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//

#[cfg(test)]
mod tests {
    use super::*;
    use storage::repository::{GroupRepository, OutcomeRepository, StudentRepository};
    use ufli_core::model::{LessonOutcome, LessonStatus, StudentId};
    use ufli_core::time::{fixed_clock, fixed_now};

    use crate::progress_service::ProgressService;

    fn lesson(n: u8) -> LessonNumber {
        LessonNumber::new(n).unwrap()
    }

    async fn seed_cohort(storage: &Storage, group_id: GroupId, passed: &[u8]) {
        let group = Group::new(group_id, "KG Red", GradeLevel::KG, None, fixed_now());
        storage.groups.upsert_group(&group).await.unwrap();

        for (i, &highest) in passed.iter().enumerate() {
            let id = StudentId::new(i as u64 + 1);
            let student = Student::new(
                id,
                format!("Student {}", i + 1),
                GradeLevel::KG,
                Some(group_id),
                fixed_now(),
            );
            storage.students.upsert_student(&student).await.unwrap();

            for n in 1..=highest {
                let outcome = LessonOutcome::new(id, lesson(n), LessonStatus::Y, fixed_now());
                storage.outcomes.upsert_outcome(&outcome).await.unwrap();
            }
        }

        let progress = ProgressService::new(storage.clone()).with_clock(fixed_clock());
        let summary = progress.recalculate_group(group_id).await.unwrap();
        assert_eq!(summary.failed, 0);
    }

    #[tokio::test]
    async fn group_summary_averages_stored_rows() {
        let storage = Storage::in_memory();
        let group_id = GroupId::new(1);
        // Two KG students: 30 of 34 (88.24%) and 17 of 34 (50.0%).
        seed_cohort(&storage, group_id, &[30, 17]).await;

        let service = ReportService::new(storage);
        let summary = service.group_summary(group_id).await.unwrap();

        assert_eq!(summary.group.id, group_id);
        assert_eq!(summary.stats.student_count, 2);
        assert_eq!(summary.stats.with_progress, 2);
        assert_eq!(summary.stats.avg_min_grade_pct, 69.12);
        assert_eq!(summary.stats.lowest_current_lesson, Some(lesson(17)));
        assert_eq!(summary.stats.highest_current_lesson, Some(lesson(30)));
    }

    #[tokio::test]
    async fn missing_group_is_not_found() {
        let storage = Storage::in_memory();
        let service = ReportService::new(storage);
        let err = service.group_summary(GroupId::new(9)).await.unwrap_err();
        assert!(matches!(err, ReportServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn cohort_without_summary_rows_reports_zeroes() {
        let storage = Storage::in_memory();
        let student = Student::new(
            StudentId::new(1),
            "Ada",
            GradeLevel::G3,
            None,
            fixed_now(),
        );
        storage.students.upsert_student(&student).await.unwrap();

        let service = ReportService::new(storage);
        let summary = service.grade_summary(GradeLevel::G3).await.unwrap();

        assert_eq!(summary.stats.student_count, 1);
        assert_eq!(summary.stats.with_progress, 0);
        assert_eq!(summary.stats.avg_benchmark_pct, 0.0);
        assert_eq!(summary.stats.highest_current_lesson, None);
    }

    #[tokio::test]
    async fn school_summary_lists_every_grade() {
        let storage = Storage::in_memory();
        seed_cohort(&storage, GroupId::new(1), &[10]).await;

        let service = ReportService::new(storage);
        let summary = service.school_summary().await.unwrap();

        assert_eq!(summary.grades.len(), GradeLevel::ALL.len());
        assert_eq!(summary.total_students, 1);

        let kg = summary
            .grades
            .iter()
            .find(|g| g.grade == GradeLevel::KG)
            .unwrap();
        assert_eq!(kg.stats.student_count, 1);

        let g8 = summary
            .grades
            .iter()
            .find(|g| g.grade == GradeLevel::G8)
            .unwrap();
        assert_eq!(g8.stats.student_count, 0);
    }
}
