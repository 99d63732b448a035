//! Tree use-case services.
//!
//! # Responsibility
//! - Orchestrate validation, planning and repository batches into the public
//!   tree operations.
//! - Keep hosts decoupled from storage details and side-effect delivery.

pub mod error;
pub mod feature_tree_service;
pub mod folder_tree_service;
pub mod names;
pub mod outcome;
