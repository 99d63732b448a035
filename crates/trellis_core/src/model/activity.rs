//! Tree activity log model.

use crate::model::ProjectId;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Which tree an activity entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreeEntity {
    FeatureNode,
    Folder,
}

impl TreeEntity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FeatureNode => "feature_node",
            Self::Folder => "folder",
        }
    }
}

impl Display for TreeEntity {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Moved,
    Updated,
    LevelChanged,
    Deleted,
}

impl ActivityAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Moved => "moved",
            Self::Updated => "updated",
            Self::LevelChanged => "level_changed",
            Self::Deleted => "deleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(Self::Created),
            "moved" => Some(Self::Moved),
            "updated" => Some(Self::Updated),
            "level_changed" => Some(Self::LevelChanged),
            "deleted" => Some(Self::Deleted),
            _ => None,
        }
    }
}

/// One append-only activity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityRecord {
    pub project_id: ProjectId,
    pub entity: TreeEntity,
    pub entity_id: Uuid,
    pub action: ActivityAction,
    /// Free-form `key=value` summary.
    pub detail: String,
}

impl ActivityRecord {
    pub fn new(
        project_id: ProjectId,
        entity: TreeEntity,
        entity_id: Uuid,
        action: ActivityAction,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            project_id,
            entity,
            entity_id,
            action,
            detail: detail.into(),
        }
    }
}
