use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{GradeLevel, GroupId, TeacherId};

/// A teaching group: a set of students working with one teacher at one
/// grade level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
    pub grade: GradeLevel,
    pub teacher_id: Option<TeacherId>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Group {
    #[must_use]
    pub fn new(
        id: GroupId,
        name: impl Into<String>,
        grade: GradeLevel,
        teacher_id: Option<TeacherId>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            grade,
            teacher_id,
            is_active: true,
            created_at,
        }
    }
}
