use std::collections::BTreeMap;

use sqlx::Row;
use ufli_core::model::{
    EnrollmentStatus, GradeLevel, Group, GroupId, LessonNumber, LessonOutcome, LessonStatus,
    Student, StudentId, TeacherId,
};

use crate::repository::{ProgressRecord, StorageError};

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

fn u64_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn student_id_from_i64(v: i64) -> Result<StudentId, StorageError> {
    Ok(StudentId::new(i64_to_u64("student_id", v)?))
}

pub(crate) fn student_id_to_i64(id: StudentId) -> Result<i64, StorageError> {
    u64_to_i64("student_id", id.value())
}

pub(crate) fn group_id_from_i64(v: i64) -> Result<GroupId, StorageError> {
    Ok(GroupId::new(i64_to_u64("group_id", v)?))
}

pub(crate) fn group_id_to_i64(id: GroupId) -> Result<i64, StorageError> {
    u64_to_i64("group_id", id.value())
}

pub(crate) fn opt_group_id_to_i64(id: Option<GroupId>) -> Result<Option<i64>, StorageError> {
    id.map(group_id_to_i64).transpose()
}

pub(crate) fn teacher_id_from_i64(v: i64) -> Result<TeacherId, StorageError> {
    Ok(TeacherId::new(i64_to_u64("teacher_id", v)?))
}

pub(crate) fn opt_teacher_id_to_i64(id: Option<TeacherId>) -> Result<Option<i64>, StorageError> {
    id.map(|t| u64_to_i64("teacher_id", t.value())).transpose()
}

pub(crate) fn lesson_from_i64(v: i64) -> Result<LessonNumber, StorageError> {
    let raw =
        u8::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid lesson: {v}")))?;
    LessonNumber::new(raw).map_err(ser)
}

pub(crate) fn lesson_to_i64(n: LessonNumber) -> i64 {
    i64::from(n.value())
}

pub(crate) fn opt_lesson_to_i64(n: Option<LessonNumber>) -> Option<i64> {
    n.map(lesson_to_i64)
}

pub(crate) fn parse_status(s: &str) -> Result<LessonStatus, StorageError> {
    s.parse::<LessonStatus>().map_err(ser)
}

pub(crate) fn parse_grade(s: &str) -> Result<GradeLevel, StorageError> {
    s.parse::<GradeLevel>().map_err(ser)
}

pub(crate) fn parse_enrollment(s: &str) -> Result<EnrollmentStatus, StorageError> {
    match s {
        "active" => Ok(EnrollmentStatus::Active),
        "unenrolled" => Ok(EnrollmentStatus::Unenrolled),
        other => Err(StorageError::Serialization(format!(
            "invalid enrollment: {other}"
        ))),
    }
}

pub(crate) fn map_student_row(row: &sqlx::sqlite::SqliteRow) -> Result<Student, StorageError> {
    let group_id = row
        .try_get::<Option<i64>, _>("group_id")
        .map_err(ser)?
        .map(group_id_from_i64)
        .transpose()?;

    let current_lesson = row
        .try_get::<Option<i64>, _>("current_lesson")
        .map_err(ser)?
        .map(lesson_from_i64)
        .transpose()?;

    let enrollment_str: String = row.try_get("enrollment").map_err(ser)?;
    let grade_str: String = row.try_get("grade").map_err(ser)?;

    Ok(Student {
        id: student_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        grade: parse_grade(&grade_str)?,
        group_id,
        enrollment: parse_enrollment(&enrollment_str)?,
        current_lesson,
        created_at: row.try_get("created_at").map_err(ser)?,
        unenrolled_at: row.try_get("unenrolled_at").map_err(ser)?,
    })
}

pub(crate) fn map_group_row(row: &sqlx::sqlite::SqliteRow) -> Result<Group, StorageError> {
    let teacher_id = row
        .try_get::<Option<i64>, _>("teacher_id")
        .map_err(ser)?
        .map(teacher_id_from_i64)
        .transpose()?;

    let grade_str: String = row.try_get("grade").map_err(ser)?;
    let is_active: i64 = row.try_get("is_active").map_err(ser)?;

    Ok(Group {
        id: group_id_from_i64(row.try_get::<i64, _>("id").map_err(ser)?)?,
        name: row.try_get("name").map_err(ser)?,
        grade: parse_grade(&grade_str)?,
        teacher_id,
        is_active: is_active != 0,
        created_at: row.try_get("created_at").map_err(ser)?,
    })
}

pub(crate) fn map_outcome_row(row: &sqlx::sqlite::SqliteRow) -> Result<LessonOutcome, StorageError> {
    let status_str: String = row.try_get("status").map_err(ser)?;
    let is_initial: i64 = row.try_get("is_initial").map_err(ser)?;

    let group_id = row
        .try_get::<Option<i64>, _>("group_id")
        .map_err(ser)?
        .map(group_id_from_i64)
        .transpose()?;
    let teacher_id = row
        .try_get::<Option<i64>, _>("teacher_id")
        .map_err(ser)?
        .map(teacher_id_from_i64)
        .transpose()?;

    Ok(LessonOutcome {
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        lesson: lesson_from_i64(row.try_get::<i64, _>("lesson").map_err(ser)?)?,
        status: parse_status(&status_str)?,
        is_initial_assessment: is_initial != 0,
        completed_on: row.try_get("completed_on").map_err(ser)?,
        group_id,
        teacher_id,
        recorded_at: row.try_get("recorded_at").map_err(ser)?,
    })
}

/// Section percentages are stored as a JSON object keyed by section id, the
/// same compact shape the calculator reports.
pub(crate) fn sections_to_json(sections: &BTreeMap<u8, f64>) -> Result<String, StorageError> {
    serde_json::to_string(sections).map_err(ser)
}

pub(crate) fn sections_from_json(raw: &str) -> Result<BTreeMap<u8, f64>, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

fn count_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn map_progress_row(
    row: &sqlx::sqlite::SqliteRow,
) -> Result<ProgressRecord, StorageError> {
    let grade_str: String = row.try_get("grade").map_err(ser)?;
    let sections_raw: String = row.try_get("section_percentages").map_err(ser)?;

    let current_lesson = row
        .try_get::<Option<i64>, _>("current_lesson")
        .map_err(ser)?
        .map(lesson_from_i64)
        .transpose()?;

    Ok(ProgressRecord {
        student_id: student_id_from_i64(row.try_get::<i64, _>("student_id").map_err(ser)?)?,
        grade: parse_grade(&grade_str)?,
        current_lesson,
        foundational_count: count_from_i64(
            "foundational_count",
            row.try_get::<i64, _>("foundational_count").map_err(ser)?,
        )?,
        foundational_pct: row.try_get("foundational_pct").map_err(ser)?,
        min_grade_count: count_from_i64(
            "min_grade_count",
            row.try_get::<i64, _>("min_grade_count").map_err(ser)?,
        )?,
        min_grade_pct: row.try_get("min_grade_pct").map_err(ser)?,
        full_grade_count: count_from_i64(
            "full_grade_count",
            row.try_get::<i64, _>("full_grade_count").map_err(ser)?,
        )?,
        full_grade_pct: row.try_get("full_grade_pct").map_err(ser)?,
        benchmark_count: count_from_i64(
            "benchmark_count",
            row.try_get::<i64, _>("benchmark_count").map_err(ser)?,
        )?,
        benchmark_pct: row.try_get("benchmark_pct").map_err(ser)?,
        section_percentages: sections_from_json(&sections_raw)?,
        calculated_at: row.try_get("calculated_at").map_err(ser)?,
    })
}
