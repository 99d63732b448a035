//! Folder tree and artifact models.
//!
//! # Responsibility
//! - Define the untyped folder node and the leaf artifact it contains.
//! - Define read models reported by folder detail and delete operations.
//!
//! # Invariants
//! - Folders are hard-deleted; the store cascades to descendant folders and
//!   nulls `folder_id` on contained artifacts.
//! - Sibling folder names are unique (case-sensitive).

use crate::hierarchy::TreeItem;
use crate::model::ProjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable folder identifier.
pub type FolderId = Uuid;

/// Stable artifact identifier.
pub type ArtifactId = Uuid;

/// Maximum folder chain length, root folder included.
pub const MAX_FOLDER_DEPTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Folder {
    pub id: FolderId,
    pub project_id: ProjectId,
    /// `None` means root-level folder.
    pub parent_id: Option<FolderId>,
    pub name: String,
    pub position: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

impl TreeItem for Folder {
    fn id(&self) -> Uuid {
        self.id
    }

    fn parent_id(&self) -> Option<Uuid> {
        self.parent_id
    }

    fn position(&self) -> i64 {
        self.position
    }
}

/// Leaf content item filed under at most one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: ArtifactId,
    pub project_id: ProjectId,
    /// `None` when unfiled or when its folder was deleted.
    pub folder_id: Option<FolderId>,
    pub title: String,
    pub created_at: i64,
}

/// Recursive content totals below one folder (the folder itself excluded).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderContents {
    pub folder_count: usize,
    pub artifact_count: usize,
}

/// Folder plus derived placement and content figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDetail {
    #[serde(flatten)]
    pub folder: Folder,
    /// 1 for a root-level folder.
    pub depth: usize,
    /// Folders anywhere below this one.
    pub child_folder_count: usize,
    /// Artifacts filed in this folder or any folder below it.
    pub artifact_count: usize,
}

/// Rename and/or move request for one folder.
///
/// `parent_id: Some(None)` moves the folder to the project root.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderPatch {
    pub name: Option<String>,
    pub parent_id: Option<Option<FolderId>>,
    /// Target sibling index. Without one, a move appends to the end.
    pub position: Option<i64>,
}
