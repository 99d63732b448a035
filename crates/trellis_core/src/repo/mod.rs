//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define store contracts the tree services plan against.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repositories never validate tree structure; services do.
//! - Multi-row writes go through `apply` batches, one transaction each.

pub mod activity_repo;
pub mod feature_repo;
pub mod folder_repo;
pub mod tree_repo;
