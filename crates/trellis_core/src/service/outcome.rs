//! Operation inputs and results shared with collaborators.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// How a feature node delete treats the subtree below it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteStrategy {
    /// Tombstone every descendant, then the node.
    #[serde(rename = "delete_subtree")]
    Subtree,
    /// Lift direct children into the node's slot under its parent.
    ReparentChildren,
    /// Tombstone the node only; children follow the configured orphan policy.
    #[default]
    DeleteOnly,
}

impl DeleteStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Subtree => "delete_subtree",
            Self::ReparentChildren => "reparent_children",
            Self::DeleteOnly => "delete_only",
        }
    }
}

impl Display for DeleteStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown strategy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStrategy(pub String);

impl Display for UnknownStrategy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown delete strategy `{}`; expected delete_subtree|reparent_children|delete_only",
            self.0
        )
    }
}

impl std::error::Error for UnknownStrategy {}

impl FromStr for DeleteStrategy {
    type Err = UnknownStrategy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "delete_subtree" => Ok(Self::Subtree),
            "reparent_children" => Ok(Self::ReparentChildren),
            "delete_only" => Ok(Self::DeleteOnly),
            other => Err(UnknownStrategy(other.to_string())),
        }
    }
}

/// Placement after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveOutcome {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    pub position: i64,
    /// `false` when the request matched the current placement and nothing
    /// was written.
    pub changed: bool,
}

/// Result of a feature node delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOutcome {
    pub id: Uuid,
    pub deleted_at: i64,
    pub strategy: DeleteStrategy,
    /// Descendants tombstoned alongside the node.
    pub children_deleted: usize,
    /// Direct children moved to a new parent.
    pub children_reparented: usize,
    /// Direct children left pointing at the tombstoned node.
    pub children_orphaned: usize,
}

/// Result of a folder delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderDeleteOutcome {
    /// The folder plus every descendant folder.
    pub deleted_folder_count: usize,
    /// Artifacts that were filed anywhere in the removed subtree. They are
    /// detached (unfiled), not removed.
    pub deleted_artifact_count: usize,
}
