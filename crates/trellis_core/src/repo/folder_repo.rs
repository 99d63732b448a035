//! Folder tree repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Persist folders and the artifacts filed under them.
//! - Execute write batches planned by the folder tree service atomically.
//!
//! # Invariants
//! - Folder delete is physical; SQLite cascades to descendant folders and
//!   sets `artifacts.folder_uuid` to NULL (requires `foreign_keys=ON`).
//! - Child listing is deterministic: `position ASC, folder_uuid ASC`.

use crate::model::activity::ActivityRecord;
use crate::model::folder::{Artifact, Folder, FolderId};
use crate::model::ProjectId;
use crate::repo::activity_repo::SqliteActivityLog;
use crate::repo::tree_repo::{
    ensure_connection_ready, optional_uuid_param, parse_optional_uuid, parse_uuid,
    TreeRepoError, TreeRepoResult,
};
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::HashMap;
use uuid::Uuid;

const FOLDER_SELECT_SQL: &str = "SELECT
    folder_uuid,
    project_uuid,
    parent_uuid,
    name,
    position,
    created_at,
    updated_at
FROM folders";

/// One planned mutation of a folder row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderWrite {
    Place {
        id: FolderId,
        parent_id: Option<FolderId>,
        position: i64,
    },
    Reposition { id: FolderId, position: i64 },
    Rename { id: FolderId, name: String },
    /// Physical delete; cascades in the store.
    Delete { id: FolderId },
}

impl FolderWrite {
    pub fn target(&self) -> FolderId {
        match self {
            Self::Place { id, .. }
            | Self::Reposition { id, .. }
            | Self::Rename { id, .. }
            | Self::Delete { id } => *id,
        }
    }
}

/// Repository interface for the folder tree (the folder NodeStore).
pub trait FolderRepository {
    /// Inserts one folder at the end of its sibling list.
    fn create_folder(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> TreeRepoResult<Folder>;
    fn get_folder(&self, folder_id: FolderId) -> TreeRepoResult<Option<Folder>>;
    /// Lists children of `parent_id` (`None` = project root).
    fn list_children(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
    ) -> TreeRepoResult<Vec<Folder>>;
    fn list_project_folders(&self, project_id: ProjectId) -> TreeRepoResult<Vec<Folder>>;
    fn create_artifact(
        &self,
        project_id: ProjectId,
        folder_id: Option<FolderId>,
        title: &str,
    ) -> TreeRepoResult<Artifact>;
    /// Lists artifacts filed directly under `folder_id` (`None` = unfiled).
    fn list_artifacts(
        &self,
        project_id: ProjectId,
        folder_id: Option<FolderId>,
    ) -> TreeRepoResult<Vec<Artifact>>;
    /// Direct artifact count per folder for one project.
    fn artifact_counts(&self, project_id: ProjectId) -> TreeRepoResult<HashMap<FolderId, usize>>;
    /// Executes a write batch in one transaction. Returns rows written.
    fn apply(&self, writes: &[FolderWrite]) -> TreeRepoResult<usize>;
    fn record_activity(&self, record: &ActivityRecord) -> TreeRepoResult<()>;
}

/// SQLite-backed folder tree repository.
pub struct SqliteFolderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFolderRepository<'conn> {
    /// Creates repository from migrated connection.
    pub fn try_new(conn: &'conn Connection) -> TreeRepoResult<Self> {
        ensure_connection_ready(
            conn,
            "folders",
            &[
                "folder_uuid",
                "project_uuid",
                "parent_uuid",
                "name",
                "position",
                "created_at",
                "updated_at",
            ],
        )?;
        ensure_connection_ready(
            conn,
            "artifacts",
            &["artifact_uuid", "project_uuid", "folder_uuid", "title"],
        )?;
        Ok(Self { conn })
    }
}

impl FolderRepository for SqliteFolderRepository<'_> {
    fn create_folder(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> TreeRepoResult<Folder> {
        let folder_id = Uuid::new_v4();
        let position: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1
             FROM folders
             WHERE project_uuid = ?1
               AND parent_uuid IS ?2;",
            params![project_id.to_string(), optional_uuid_param(parent_id)],
            |row| row.get(0),
        )?;

        self.conn.execute(
            "INSERT INTO folders (folder_uuid, project_uuid, parent_uuid, name, position)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                folder_id.to_string(),
                project_id.to_string(),
                optional_uuid_param(parent_id),
                name,
                position,
            ],
        )?;

        self.get_folder(folder_id)?
            .ok_or(TreeRepoError::NodeNotFound(folder_id))
    }

    fn get_folder(&self, folder_id: FolderId) -> TreeRepoResult<Option<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE folder_uuid = ?1;"))?;
        let mut rows = stmt.query([folder_id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(row)?));
        }
        Ok(None)
    }

    fn list_children(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
    ) -> TreeRepoResult<Vec<Folder>> {
        let mut stmt = self.conn.prepare(&format!(
            "{FOLDER_SELECT_SQL}
             WHERE project_uuid = ?1
               AND parent_uuid IS ?2
             ORDER BY position ASC, folder_uuid ASC;"
        ))?;
        let mut rows = stmt.query(params![
            project_id.to_string(),
            optional_uuid_param(parent_id)
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_folder_row(row)?);
        }
        Ok(items)
    }

    fn list_project_folders(&self, project_id: ProjectId) -> TreeRepoResult<Vec<Folder>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{FOLDER_SELECT_SQL} WHERE project_uuid = ?1;"))?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_folder_row(row)?);
        }
        Ok(items)
    }

    fn create_artifact(
        &self,
        project_id: ProjectId,
        folder_id: Option<FolderId>,
        title: &str,
    ) -> TreeRepoResult<Artifact> {
        let artifact_id = Uuid::new_v4();
        self.conn.execute(
            "INSERT INTO artifacts (artifact_uuid, project_uuid, folder_uuid, title)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                artifact_id.to_string(),
                project_id.to_string(),
                optional_uuid_param(folder_id),
                title,
            ],
        )?;

        let created_at: i64 = self.conn.query_row(
            "SELECT created_at FROM artifacts WHERE artifact_uuid = ?1;",
            [artifact_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(Artifact {
            id: artifact_id,
            project_id,
            folder_id,
            title: title.to_string(),
            created_at,
        })
    }

    fn list_artifacts(
        &self,
        project_id: ProjectId,
        folder_id: Option<FolderId>,
    ) -> TreeRepoResult<Vec<Artifact>> {
        let mut stmt = self.conn.prepare(
            "SELECT artifact_uuid, project_uuid, folder_uuid, title, created_at
             FROM artifacts
             WHERE project_uuid = ?1
               AND folder_uuid IS ?2
             ORDER BY created_at ASC, artifact_uuid ASC;",
        )?;
        let mut rows = stmt.query(params![
            project_id.to_string(),
            optional_uuid_param(folder_id)
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_artifact_row(row)?);
        }
        Ok(items)
    }

    fn artifact_counts(&self, project_id: ProjectId) -> TreeRepoResult<HashMap<FolderId, usize>> {
        let mut stmt = self.conn.prepare(
            "SELECT folder_uuid, COUNT(*)
             FROM artifacts
             WHERE project_uuid = ?1
               AND folder_uuid IS NOT NULL
             GROUP BY folder_uuid;",
        )?;
        let mut rows = stmt.query([project_id.to_string()])?;
        let mut counts = HashMap::new();
        while let Some(row) = rows.next()? {
            let folder_text: String = row.get(0)?;
            let count: i64 = row.get(1)?;
            counts.insert(
                parse_uuid(&folder_text, "artifacts.folder_uuid")?,
                usize::try_from(count).unwrap_or_default(),
            );
        }
        Ok(counts)
    }

    fn apply(&self, writes: &[FolderWrite]) -> TreeRepoResult<usize> {
        if writes.is_empty() {
            return Ok(0);
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        for write in writes {
            let changed = execute_folder_write(&tx, write)?;
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

fn execute_folder_write(conn: &Connection, write: &FolderWrite) -> TreeRepoResult<usize> {
    let changed = match write {
        FolderWrite::Place {
            id,
            parent_id,
            position,
        } => conn.execute(
            "UPDATE folders
             SET parent_uuid = ?2,
                 position = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE folder_uuid = ?1;",
            params![id.to_string(), optional_uuid_param(*parent_id), position],
        )?,
        FolderWrite::Reposition { id, position } => conn.execute(
            "UPDATE folders
             SET position = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE folder_uuid = ?1;",
            params![id.to_string(), position],
        )?,
        FolderWrite::Rename { id, name } => conn.execute(
            "UPDATE folders
             SET name = ?2,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE folder_uuid = ?1;",
            params![id.to_string(), name.as_str()],
        )?,
        FolderWrite::Delete { id } => conn.execute(
            "DELETE FROM folders WHERE folder_uuid = ?1;",
            [id.to_string()],
        )?,
    };
    Ok(changed)
}

fn parse_folder_row(row: &Row<'_>) -> TreeRepoResult<Folder> {
    let id_text: String = row.get("folder_uuid")?;
    let project_text: String = row.get("project_uuid")?;
    Ok(Folder {
        id: parse_uuid(&id_text, "folders.folder_uuid")?,
        project_id: parse_uuid(&project_text, "folders.project_uuid")?,
        parent_id: parse_optional_uuid(row.get("parent_uuid")?, "folders.parent_uuid")?,
        name: row.get("name")?,
        position: row.get("position")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_artifact_row(row: &Row<'_>) -> TreeRepoResult<Artifact> {
    let id_text: String = row.get("artifact_uuid")?;
    let project_text: String = row.get("project_uuid")?;
    Ok(Artifact {
        id: parse_uuid(&id_text, "artifacts.artifact_uuid")?,
        project_id: parse_uuid(&project_text, "artifacts.project_uuid")?,
        folder_id: parse_optional_uuid(row.get("folder_uuid")?, "artifacts.folder_uuid")?,
        title: row.get("title")?,
        created_at: row.get("created_at")?,
    })
}
