use ufli_core::model::{LessonOutcome, StudentId};

use super::SqliteRepository;
use super::mapping::{
    lesson_to_i64, map_outcome_row, opt_group_id_to_i64, opt_teacher_id_to_i64, student_id_to_i64,
};
use crate::repository::{OutcomeRepository, StorageError};

#[async_trait::async_trait]
impl OutcomeRepository for SqliteRepository {
    async fn upsert_outcome(&self, outcome: &LessonOutcome) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO lesson_outcomes (
                student_id, lesson, is_initial, status, completed_on,
                group_id, teacher_id, recorded_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(student_id, lesson, is_initial) DO UPDATE SET
                status = excluded.status,
                completed_on = excluded.completed_on,
                group_id = excluded.group_id,
                teacher_id = excluded.teacher_id,
                recorded_at = excluded.recorded_at
            ",
        )
        .bind(student_id_to_i64(outcome.student_id)?)
        .bind(lesson_to_i64(outcome.lesson))
        .bind(i64::from(outcome.is_initial_assessment))
        .bind(outcome.status.as_str())
        .bind(outcome.completed_on)
        .bind(opt_group_id_to_i64(outcome.group_id)?)
        .bind(opt_teacher_id_to_i64(outcome.teacher_id)?)
        .bind(outcome.recorded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn outcomes_for_student(
        &self,
        student_id: StudentId,
        is_initial_assessment: bool,
    ) -> Result<Vec<LessonOutcome>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT
                student_id, lesson, is_initial, status, completed_on,
                group_id, teacher_id, recorded_at
            FROM lesson_outcomes
            WHERE student_id = ?1 AND is_initial = ?2
            ORDER BY lesson ASC
            ",
        )
        .bind(student_id_to_i64(student_id)?)
        .bind(i64::from(is_initial_assessment))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut outcomes = Vec::with_capacity(rows.len());
        for row in rows {
            outcomes.push(map_outcome_row(&row)?);
        }
        Ok(outcomes)
    }
}
