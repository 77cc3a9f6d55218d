use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

/// Runs a single, consolidated migration for the current schema.
///
/// Creates the full schema (groups, students, lesson outcomes, progress
/// summary rows, and indexes).
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: full schema.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS groups (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    grade TEXT NOT NULL,
                    teacher_id INTEGER,
                    is_active INTEGER NOT NULL CHECK (is_active IN (0, 1)),
                    created_at TEXT NOT NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS students (
                    id INTEGER PRIMARY KEY,
                    name TEXT NOT NULL,
                    grade TEXT NOT NULL,
                    group_id INTEGER,
                    enrollment TEXT NOT NULL,
                    current_lesson INTEGER CHECK (current_lesson BETWEEN 1 AND 128),
                    created_at TEXT NOT NULL,
                    unenrolled_at TEXT,
                    FOREIGN KEY (group_id) REFERENCES groups(id) ON DELETE SET NULL
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS lesson_outcomes (
                    student_id INTEGER NOT NULL,
                    lesson INTEGER NOT NULL CHECK (lesson BETWEEN 1 AND 128),
                    is_initial INTEGER NOT NULL CHECK (is_initial IN (0, 1)),
                    status TEXT NOT NULL CHECK (status IN ('Y', 'N', 'A', 'U')),
                    completed_on TEXT,
                    group_id INTEGER,
                    teacher_id INTEGER,
                    recorded_at TEXT NOT NULL,
                    PRIMARY KEY (student_id, lesson, is_initial),
                    FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE TABLE IF NOT EXISTS progress_records (
                    student_id INTEGER PRIMARY KEY,
                    grade TEXT NOT NULL,
                    current_lesson INTEGER CHECK (current_lesson BETWEEN 1 AND 128),
                    foundational_count INTEGER NOT NULL CHECK (foundational_count >= 0),
                    foundational_pct REAL NOT NULL,
                    min_grade_count INTEGER NOT NULL CHECK (min_grade_count >= 0),
                    min_grade_pct REAL NOT NULL,
                    full_grade_count INTEGER NOT NULL CHECK (full_grade_count >= 0),
                    full_grade_pct REAL NOT NULL,
                    benchmark_count INTEGER NOT NULL CHECK (benchmark_count >= 0),
                    benchmark_pct REAL NOT NULL,
                    section_percentages TEXT NOT NULL,
                    calculated_at TEXT NOT NULL,
                    FOREIGN KEY (student_id) REFERENCES students(id) ON DELETE CASCADE
                );
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_students_group
                    ON students(group_id, enrollment);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_students_grade
                    ON students(grade, enrollment);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                CREATE INDEX IF NOT EXISTS idx_outcomes_student
                    ON lesson_outcomes(student_id, is_initial, lesson);
            ",
        )
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
    }

    Ok(())
}
