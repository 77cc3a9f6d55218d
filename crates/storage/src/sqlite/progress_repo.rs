use ufli_core::model::StudentId;

use super::SqliteRepository;
use super::mapping::{
    map_progress_row, opt_lesson_to_i64, sections_to_json, student_id_to_i64,
};
use crate::repository::{ProgressRecord, ProgressRepository, StorageError};

const PROGRESS_COLUMNS: &str = r"
    student_id, grade, current_lesson,
    foundational_count, foundational_pct,
    min_grade_count, min_grade_pct,
    full_grade_count, full_grade_pct,
    benchmark_count, benchmark_pct,
    section_percentages, calculated_at
";

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn upsert_progress(&self, record: &ProgressRecord) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress_records (
                student_id, grade, current_lesson,
                foundational_count, foundational_pct,
                min_grade_count, min_grade_pct,
                full_grade_count, full_grade_pct,
                benchmark_count, benchmark_pct,
                section_percentages, calculated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            ON CONFLICT(student_id) DO UPDATE SET
                grade = excluded.grade,
                current_lesson = excluded.current_lesson,
                foundational_count = excluded.foundational_count,
                foundational_pct = excluded.foundational_pct,
                min_grade_count = excluded.min_grade_count,
                min_grade_pct = excluded.min_grade_pct,
                full_grade_count = excluded.full_grade_count,
                full_grade_pct = excluded.full_grade_pct,
                benchmark_count = excluded.benchmark_count,
                benchmark_pct = excluded.benchmark_pct,
                section_percentages = excluded.section_percentages,
                calculated_at = excluded.calculated_at
            ",
        )
        .bind(student_id_to_i64(record.student_id)?)
        .bind(record.grade.as_str())
        .bind(opt_lesson_to_i64(record.current_lesson))
        .bind(i64::from(record.foundational_count))
        .bind(record.foundational_pct)
        .bind(i64::from(record.min_grade_count))
        .bind(record.min_grade_pct)
        .bind(i64::from(record.full_grade_count))
        .bind(record.full_grade_pct)
        .bind(i64::from(record.benchmark_count))
        .bind(record.benchmark_pct)
        .bind(sections_to_json(&record.section_percentages)?)
        .bind(record.calculated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_progress(
        &self,
        student_id: StudentId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_records WHERE student_id = ?1"
        ))
        .bind(student_id_to_i64(student_id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn progress_for_students(
        &self,
        student_ids: &[StudentId],
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        if student_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut sql = format!(
            "SELECT {PROGRESS_COLUMNS} FROM progress_records WHERE student_id IN ("
        );
        for i in 0..student_ids.len() {
            if i > 0 {
                sql.push_str(", ");
            }
            sql.push('?');
            sql.push_str(&(i + 1).to_string());
        }
        sql.push_str(") ORDER BY student_id ASC");

        let mut q = sqlx::query(&sql);
        for id in student_ids {
            q = q.bind(student_id_to_i64(*id)?);
        }

        let rows = q
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            records.push(map_progress_row(&row)?);
        }
        Ok(records)
    }
}
