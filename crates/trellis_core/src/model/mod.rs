//! Domain model for the planning (feature) tree and the folder tree.
//!
//! # Responsibility
//! - Define the data structures both tree services operate on.
//! - Keep level typing and its compatibility table next to the data.
//!
//! # Invariants
//! - Every node is scoped to exactly one `ProjectId`.
//! - Parent references never cross project boundaries.

pub mod activity;
pub mod feature_node;
pub mod folder;
pub mod level;

/// Tenant scope key for every tree row.
pub type ProjectId = uuid::Uuid;
