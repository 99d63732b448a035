//! Feature tree repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist typed feature nodes and their soft-delete tombstones.
//! - Execute write batches planned by the feature tree service atomically.
//!
//! # Invariants
//! - Only active (`deleted_at IS NULL`) nodes are returned unless asked.
//! - Child listing is deterministic: `position ASC, node_uuid ASC`.
//! - `apply` is all-or-nothing: any failing write rolls back the batch.

use crate::model::activity::ActivityRecord;
use crate::model::feature_node::{FeatureNode, FeatureNodeId, NewFeatureNode};
use crate::model::level::FeatureLevel;
use crate::model::ProjectId;
use crate::repo::activity_repo::SqliteActivityLog;
use crate::repo::tree_repo::{
    ensure_connection_ready, optional_uuid_param, parse_level, parse_optional_uuid, parse_uuid,
    TreeRepoError, TreeRepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use uuid::Uuid;

const FEATURE_SELECT_SQL: &str = "SELECT
    node_uuid,
    project_uuid,
    parent_uuid,
    level,
    title,
    description,
    position,
    deleted_at,
    created_at,
    updated_at
FROM feature_nodes";

/// One planned mutation of a feature node row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureWrite {
    /// Sets parent and position together.
    Place {
        id: FeatureNodeId,
        parent_id: Option<FeatureNodeId>,
        position: i64,
    },
    /// Sets position only.
    Reposition { id: FeatureNodeId, position: i64 },
    SetLevel {
        id: FeatureNodeId,
        level: FeatureLevel,
    },
    SetFields {
        id: FeatureNodeId,
        title: String,
        description: Option<String>,
    },
    /// Stamps `deleted_at`.
    SoftDelete { id: FeatureNodeId },
}

impl FeatureWrite {
    pub fn target(&self) -> FeatureNodeId {
        match self {
            Self::Place { id, .. }
            | Self::Reposition { id, .. }
            | Self::SetLevel { id, .. }
            | Self::SetFields { id, .. }
            | Self::SoftDelete { id } => *id,
        }
    }
}

/// Repository interface for the feature tree (the feature NodeStore).
pub trait FeatureRepository {
    /// Inserts one node at the end of its sibling list.
    fn create_node(&self, node: &NewFeatureNode) -> TreeRepoResult<FeatureNode>;
    /// Loads one node by id.
    fn get_node(
        &self,
        node_id: FeatureNodeId,
        include_deleted: bool,
    ) -> TreeRepoResult<Option<FeatureNode>>;
    /// Lists active children of `parent_id` (`None` = project root).
    fn list_children(
        &self,
        project_id: ProjectId,
        parent_id: Option<FeatureNodeId>,
    ) -> TreeRepoResult<Vec<FeatureNode>>;
    /// Lists every active node of a project.
    fn list_project_nodes(&self, project_id: ProjectId) -> TreeRepoResult<Vec<FeatureNode>>;
    /// Executes a write batch in one transaction. Returns rows written.
    fn apply(&self, writes: &[FeatureWrite]) -> TreeRepoResult<usize>;
    /// Appends one activity log entry.
    fn record_activity(&self, record: &ActivityRecord) -> TreeRepoResult<()>;
}

/// SQLite-backed feature tree repository.
pub struct SqliteFeatureRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeatureRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TreeRepoResult<Self> {
        ensure_connection_ready(
            conn,
            "feature_nodes",
            &[
                "node_uuid",
                "project_uuid",
                "parent_uuid",
                "level",
                "title",
                "description",
                "position",
                "deleted_at",
                "created_at",
                "updated_at",
            ],
        )?;
        Ok(Self { conn })
    }
}

impl FeatureRepository for SqliteFeatureRepository<'_> {
    fn create_node(&self, node: &NewFeatureNode) -> TreeRepoResult<FeatureNode> {
        let node_id = Uuid::new_v4();
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1
             FROM feature_nodes
             WHERE project_uuid = ?1
               AND parent_uuid IS ?2
               AND deleted_at IS NULL;",
            params![
                node.project_id.to_string(),
                optional_uuid_param(node.parent_id)
            ],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO feature_nodes (
                node_uuid,
                project_uuid,
                parent_uuid,
                level,
                title,
                description,
                position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                node_id.to_string(),
                node.project_id.to_string(),
                optional_uuid_param(node.parent_id),
                node.level.as_str(),
                node.title.as_str(),
                node.description.as_deref(),
                position,
            ],
        )?;

        self.get_node(node_id, false)?
            .ok_or(TreeRepoError::NodeNotFound(node_id))
    }

    fn get_node(
        &self,
        node_id: FeatureNodeId,
        include_deleted: bool,
    ) -> TreeRepoResult<Option<FeatureNode>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FEATURE_SELECT_SQL}
             WHERE node_uuid = ?1
               AND (?2 = 1 OR deleted_at IS NULL);"
        ))?;
        let mut rows = stmt.query(params![node_id.to_string(), i64::from(include_deleted)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_feature_row(row)?));
        }
        Ok(None)
    }

    fn list_children(
        &self,
        project_id: ProjectId,
        parent_id: Option<FeatureNodeId>,
    ) -> TreeRepoResult<Vec<FeatureNode>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FEATURE_SELECT_SQL}
             WHERE project_uuid = ?1
               AND parent_uuid IS ?2
               AND deleted_at IS NULL
             ORDER BY position ASC, node_uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            project_id.to_string(),
            optional_uuid_param(parent_id)
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_feature_row(row)?);
        }
        Ok(items)
    }

    fn list_project_nodes(&self, project_id: ProjectId) -> TreeRepoResult<Vec<FeatureNode>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FEATURE_SELECT_SQL}
             WHERE project_uuid = ?1
               AND deleted_at IS NULL;"
        ))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_feature_row(row)?);
        }
        Ok(items)
    }

    fn apply(&self, writes: &[FeatureWrite]) -> TreeRepoResult<usize> {
        if writes.is_empty() {
            return Ok(0);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for write in writes {
            let changed = execute_feature_write(&tx, write)?;
            if changed == 0 {
                return Err(TreeRepoError::NodeNotFound(write.target()));
            }
        }
        tx.commit()?;
        Ok(writes.len())
    }

    fn record_activity(&self, record: &ActivityRecord) -> TreeRepoResult<()> {
        SqliteActivityLog::unchecked(self.conn).append(record)?;
        Ok(())
    }
}

fn execute_feature_write(conn: &Connection, write: &FeatureWrite) -> TreeRepoResult<usize> {
    let changed = match write {
        FeatureWrite::Place {
            id,
            parent_id,
            position,
        } => conn.execute(
            "UPDATE feature_nodes
             SET parent_uuid = ?2,
                 position = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), optional_uuid_param(*parent_id), position],
        )?,
        FeatureWrite::Reposition { id, position } => conn.execute(
            "UPDATE feature_nodes
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), position],
        )?,
        FeatureWrite::SetLevel { id, level } => conn.execute(
            "UPDATE feature_nodes
             SET level = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), level.as_str()],
        )?,
        FeatureWrite::SetFields {
            id,
            title,
            description,
        } => conn.execute(
            "UPDATE feature_nodes
             SET title = ?2,
                 description = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1
               AND deleted_at IS NULL;",
            params![id.to_string(), title.as_str(), description.as_deref()],
        )?,
        FeatureWrite::SoftDelete { id } => conn.execute(
            "UPDATE feature_nodes
             SET deleted_at = (strftime('%s', 'now') * 1000),
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE node_uuid = ?1
               AND deleted_at IS NULL;",
            [id.to_string()],
        )?,
    };
    Ok(changed)
}

fn parse_feature_row(row: &Row<'_>) -> TreeRepoResult<FeatureNode> {
    let id_text: String = row.get("node_uuid")?;
    let project_text: String = row.get("project_uuid")?;
    let level_text: String = row.get("level")?;

    let position: i64 = row.get("position")?;
    if position < 0 {
        return Err(TreeRepoError::InvalidData(format!(
            "negative position `{position}` in feature_nodes.position"
        )));
    }

    Ok(FeatureNode {
        id: parse_uuid(&id_text, "feature_nodes.node_uuid")?,
        project_id: parse_uuid(&project_text, "feature_nodes.project_uuid")?,
        parent_id: parse_optional_uuid(row.get("parent_uuid")?, "feature_nodes.parent_uuid")?,
        level: parse_level(&level_text, "feature_nodes.level")?,
        title: row.get("title")?,
        description: row.get("description")?,
        position,
        deleted_at: row.get("deleted_at")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
