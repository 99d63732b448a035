//! In-memory hierarchy primitives shared by both trees.
//!
//! # Responsibility
//! - Hold one project's active nodes as an arena keyed by id with a
//!   parent -> ordered-children adjacency map.
//! - Answer depth, height and ancestry questions without store round trips.
//! - Plan sibling renumbering as a minimal set of position changes.
//!
//! # Invariants
//! - Sibling order is `position ASC, id ASC`, matching repository listing.
//! - Walks terminate on corrupt (cyclic) persisted data.

mod index;
mod renumber;

pub use index::{TreeIndex, TreeItem};
pub use renumber::{
    plan_sibling_positions, positions_for_order, MovedSibling, PositionChange, SiblingPlan,
    SiblingSlot,
};
