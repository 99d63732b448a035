//! Append-only tree activity log.
//!
//! # Responsibility
//! - Persist activity entries posted by the side-effect queue.
//! - List a project's entries in insertion order.

use crate::model::activity::{ActivityAction, ActivityRecord, TreeEntity};
use crate::model::ProjectId;
use crate::repo::tree_repo::{ensure_connection_ready, parse_uuid, TreeRepoError, TreeRepoResult};
use rusqlite::{params, Connection};

/// Stored activity entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityEntry {
    pub activity_id: i64,
    pub record: ActivityRecord,
    pub created_at: i64,
}

/// SQLite-backed activity log.
pub struct SqliteActivityLog<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivityLog<'conn> {
    /// Creates the log from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TreeRepoResult<Self> {
        ensure_connection_ready(
            conn,
            "tree_activity",
            &[
                "activity_id",
                "project_uuid",
                "entity_kind",
                "entity_uuid",
                "action",
                "detail",
                "created_at",
            ],
        )?;
        Ok(Self { conn })
    }

    pub(crate) fn unchecked(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Appends one entry.
    pub fn append(&self, record: &ActivityRecord) -> TreeRepoResult<i64> {
        self.conn.execute(
            "INSERT INTO tree_activity (
                project_uuid,
                entity_kind,
                entity_uuid,
                action,
                detail
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                record.project_id.to_string(),
                record.entity.as_str(),
                record.entity_id.to_string(),
                record.action.as_str(),
                record.detail.as_str(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Lists one project's entries, oldest first.
    pub fn list(&self, project_id: ProjectId) -> TreeRepoResult<Vec<ActivityEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT activity_id, project_uuid, entity_kind, entity_uuid, action, detail, created_at
             FROM tree_activity
             WHERE project_uuid = ?1
             ORDER BY activity_id ASC;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let entity_text: String = row.get("entity_kind")?;
            let entity = match entity_text.as_str() {
                "feature_node" => TreeEntity::FeatureNode,
                "folder" => TreeEntity::Folder,
                other => {
                    return Err(TreeRepoError::InvalidData(format!(
                        "invalid entity kind `{other}` in tree_activity.entity_kind"
                    )))
                }
            };
            let action_text: String = row.get("action")?;
            let action = ActivityAction::parse(&action_text).ok_or_else(|| {
                TreeRepoError::InvalidData(format!(
                    "invalid action `{action_text}` in tree_activity.action"
                ))
            })?;
            let project_text: String = row.get("project_uuid")?;
            let entity_uuid_text: String = row.get("entity_uuid")?;

            entries.push(ActivityEntry {
                activity_id: row.get("activity_id")?,
                record: ActivityRecord {
                    project_id: parse_uuid(&project_text, "tree_activity.project_uuid")?,
                    entity,
                    entity_id: parse_uuid(&entity_uuid_text, "tree_activity.entity_uuid")?,
                    action,
                    detail: row.get("detail")?,
                },
                created_at: row.get("created_at")?,
            });
        }
        Ok(entries)
    }
}
