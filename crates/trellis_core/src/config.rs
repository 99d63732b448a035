//! Tree service configuration.
//!
//! # Responsibility
//! - Hold the behaviour switches hosts may set per deployment.
//! - Deserialize from any serde source; missing keys fall back to defaults.
//!
//! # Invariants
//! - Defaults reproduce legacy behaviour: `delete_only` leaves children
//!   dangling and side effects run right after each operation.

use serde::{Deserialize, Serialize};

/// Where `delete_only` sends the direct children of the deleted node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrphanPolicy {
    /// Children keep pointing at the tombstoned parent and drop out of
    /// tree walks.
    #[default]
    LeaveDangling,
    /// Children are appended to the project root.
    MoveToRoot,
    /// Children take the deleted node's slot under its former parent.
    MoveToParent,
}

/// When queued side effects (origin renumbering, activity log) run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectMode {
    /// Drained at the end of every public operation.
    #[default]
    Immediate,
    /// Left queued until the host calls `flush_effects`.
    Deferred,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    pub delete_only_orphans: OrphanPolicy,
    pub effect_mode: EffectMode,
}

impl TreeConfig {
    pub fn with_orphan_policy(mut self, policy: OrphanPolicy) -> Self {
        self.delete_only_orphans = policy;
        self
    }

    pub fn with_effect_mode(mut self, mode: EffectMode) -> Self {
        self.effect_mode = mode;
        self
    }
}
