use ufli_core::model::{Group, GroupId};

use super::SqliteRepository;
use super::mapping::{group_id_to_i64, map_group_row, opt_teacher_id_to_i64};
use crate::repository::{GroupRepository, StorageError};

#[async_trait::async_trait]
impl GroupRepository for SqliteRepository {
    async fn upsert_group(&self, group: &Group) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO groups (id, name, grade, teacher_id, is_active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                grade = excluded.grade,
                teacher_id = excluded.teacher_id,
                is_active = excluded.is_active
            ",
        )
        .bind(group_id_to_i64(group.id)?)
        .bind(group.name.clone())
        .bind(group.grade.as_str())
        .bind(opt_teacher_id_to_i64(group.teacher_id)?)
        .bind(i64::from(group.is_active))
        .bind(group.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(())
    }

    async fn get_group(&self, id: GroupId) -> Result<Group, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, name, grade, teacher_id, is_active, created_at
            FROM groups
            WHERE id = ?1
            ",
        )
        .bind(group_id_to_i64(id)?)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        match row {
            Some(row) => map_group_row(&row),
            None => Err(StorageError::NotFound),
        }
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT id, name, grade, teacher_id, is_active, created_at
            FROM groups
            ORDER BY id ASC
            ",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut groups = Vec::with_capacity(rows.len());
        for row in rows {
            groups.push(map_group_row(&row)?);
        }
        Ok(groups)
    }
}
