//! Feature tree level model.
//!
//! # Responsibility
//! - Define the ordered level enum (`epic < feature < sub_feature < task`).
//! - Own the static parent compatibility table.
//!
//! # Invariants
//! - Ordinals are dense `0..=3` and follow declaration order.
//! - `epic` is only valid at the root; every other level needs a parent.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Ordered category constraining which feature nodes may parent which.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureLevel {
    Epic,
    Feature,
    SubFeature,
    Task,
}

impl FeatureLevel {
    /// Every level in ordinal order.
    pub const ALL: [FeatureLevel; 4] = [
        FeatureLevel::Epic,
        FeatureLevel::Feature,
        FeatureLevel::SubFeature,
        FeatureLevel::Task,
    ];

    /// Highest ordinal (the leaf level).
    pub const MAX_ORDINAL: u8 = 3;

    /// Zero-based rank of this level.
    pub fn ordinal(self) -> u8 {
        match self {
            Self::Epic => 0,
            Self::Feature => 1,
            Self::SubFeature => 2,
            Self::Task => 3,
        }
    }

    /// Maps an ordinal back to its level.
    pub fn from_ordinal(ordinal: u8) -> Option<Self> {
        match ordinal {
            0 => Some(Self::Epic),
            1 => Some(Self::Feature),
            2 => Some(Self::SubFeature),
            3 => Some(Self::Task),
            _ => None,
        }
    }

    /// Shifts the level by `delta` steps, saturating at `epic` and `task`.
    pub fn shifted(self, delta: i8) -> Self {
        let target = (i16::from(self.ordinal()) + i16::from(delta))
            .clamp(0, i16::from(Self::MAX_ORDINAL));
        // The clamp keeps `target` inside the ordinal range.
        Self::from_ordinal(target as u8).unwrap_or(self)
    }

    /// Whether this is the leaf level.
    pub fn is_leaf(self) -> bool {
        self == Self::Task
    }

    /// Levels allowed as direct parent. An empty slice means root only.
    pub fn allowed_parents(self) -> &'static [FeatureLevel] {
        match self {
            Self::Epic => &[],
            Self::Feature => &[Self::Epic],
            Self::SubFeature => &[Self::Epic, Self::Feature],
            Self::Task => &[Self::Feature, Self::SubFeature],
        }
    }

    /// Stable storage/wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Epic => "epic",
            Self::Feature => "feature",
            Self::SubFeature => "sub_feature",
            Self::Task => "task",
        }
    }
}

/// Checks whether `child` may sit under a parent of `parent` level.
///
/// `None` stands for the project root.
pub fn is_valid_parent(child: FeatureLevel, parent: Option<FeatureLevel>) -> bool {
    match parent {
        None => child.allowed_parents().is_empty(),
        Some(parent) => child.allowed_parents().contains(&parent),
    }
}

impl Display for FeatureLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown level name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLevel(pub String);

impl Display for UnknownLevel {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown feature level `{}`; expected epic|feature|sub_feature|task",
            self.0
        )
    }
}

impl std::error::Error for UnknownLevel {}

impl FromStr for FeatureLevel {
    type Err = UnknownLevel;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "epic" => Ok(Self::Epic),
            "feature" => Ok(Self::Feature),
            "sub_feature" => Ok(Self::SubFeature),
            "task" => Ok(Self::Task),
            other => Err(UnknownLevel(other.to_string())),
        }
    }
}
