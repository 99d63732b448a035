//! Feature tree node model.
//!
//! # Responsibility
//! - Define the typed planning node (epic/feature/sub_feature/task).
//! - Provide soft-delete lifecycle helpers.
//!
//! # Invariants
//! - `id` is stable and never reused.
//! - `deleted_at` is the source of truth for tombstone state; feature nodes
//!   are never physically removed.
//! - `position` is zero-based and non-negative.

use crate::hierarchy::TreeItem;
use crate::model::level::FeatureLevel;
use crate::model::ProjectId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable feature node identifier.
pub type FeatureNodeId = Uuid;

/// Typed node of the planning tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureNode {
    pub id: FeatureNodeId,
    pub project_id: ProjectId,
    /// `None` means root-level node.
    pub parent_id: Option<FeatureNodeId>,
    pub level: FeatureLevel,
    pub title: String,
    pub description: Option<String>,
    pub position: i64,
    /// Epoch ms soft-delete timestamp.
    pub deleted_at: Option<i64>,
    /// Epoch ms creation timestamp.
    pub created_at: i64,
    /// Epoch ms update timestamp.
    pub updated_at: i64,
}

impl TreeItem for FeatureNode {
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

/// Insert payload for a new feature node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeatureNode {
    pub project_id: ProjectId,
    pub parent_id: Option<FeatureNodeId>,
    pub level: FeatureLevel,
    pub title: String,
    pub description: Option<String>,
}

/// Partial field update for one feature node.
///
/// `description: Some(None)` clears the description.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeatureNodePatch {
    pub title: Option<String>,
    #[serde(with = "double_option")]
    pub description: Option<Option<String>>,
    pub level: Option<FeatureLevel>,
}

impl FeatureNodePatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.level.is_none()
    }
}

/// Distinguishes an absent field from an explicit `null`.
mod double_option {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer).map(Some)
    }
}
