use ufli_core::model::{GradeLevel, GroupId, Student, StudentId};

use super::SqliteRepository;
use super::mapping::{map_student_row, opt_group_id_to_i64, opt_lesson_to_i64, student_id_to_i64};
use crate::repository::{StorageError, StudentRepository};

const STUDENT_COLUMNS: &str = r"
    id, name, grade, group_id, enrollment, current_lesson, created_at, unenrolled_at
";

#[async_trait::async_trait]
impl StudentRepository for SqliteRepository {
    async fn upsert_student(&self, student: &Student) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO students (
                id, name, grade, group_id, enrollment, current_lesson,
                created_at, unenrolled_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                -- keep created_at from the original insert; only update mutable fields
                name = excluded.name,
                grade = excluded.grade,
                group_id = excluded.group_id,
                enrollment = excluded.enrollment,
                current_lesson = excluded.current_lesson,
                unenrolled_at = excluded.unenrolled_at
            ",
        )
        .bind(student_id_to_i64(student.id)?)
        .bind(student.name.clone())
        .bind(student.grade.as_str())
        .bind(opt_group_id_to_i64(student.group_id)?)
        .bind(student.enrollment.as_str())
        .bind(opt_lesson_to_i64(student.current_lesson))
        .bind(student.created_at)
        .bind(student.unenrolled_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_student(&self, id: StudentId) -> Result<Student, StorageError> {
        let row = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students WHERE id = ?1"
        ))
        .bind(student_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_student_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_students(&self) -> Result<Vec<Student>, StorageError> {
        let rows = sqlx::query(&format!(
            "SELECT {STUDENT_COLUMNS} FROM students ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(map_student_row(&row)?);
        }
        Ok(students)
    }

    async fn students_in_group(&self, group_id: GroupId) -> Result<Vec<Student>, StorageError> {
        let gid = i64::try_from(group_id.value())
            .map_err(|_| StorageError::Serialization("group_id overflow".into()))?;

        let rows = sqlx::query(&format!(
            r"
            SELECT {STUDENT_COLUMNS}
            FROM students
            WHERE group_id = ?1 AND enrollment = 'active'
            ORDER BY id ASC
            "
        ))
        .bind(gid)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(map_student_row(&row)?);
        }
        Ok(students)
    }

    async fn students_in_grade(&self, grade: GradeLevel) -> Result<Vec<Student>, StorageError> {
        let rows = sqlx::query(&format!(
            r"
            SELECT {STUDENT_COLUMNS}
            FROM students
            WHERE grade = ?1 AND enrollment = 'active'
            ORDER BY id ASC
            "
        ))
        .bind(grade.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut students = Vec::with_capacity(rows.len());
        for row in rows {
            students.push(map_student_row(&row)?);
        }
        Ok(students)
    }
}
