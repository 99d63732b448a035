//! Core domain logic for Trellis project trees.
//! This crate is the single source of truth for tree invariants.

pub mod config;
pub mod db;
pub mod effects;
pub mod hierarchy;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{EffectMode, OrphanPolicy, TreeConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use effects::{EffectQueue, EffectReport, TreeEffect};
pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig, LoggingError};
pub use model::feature_node::{FeatureNode, FeatureNodeId, FeatureNodePatch, NewFeatureNode};
pub use model::folder::{
    Artifact, ArtifactId, Folder, FolderContents, FolderDetail, FolderId, FolderPatch,
    MAX_FOLDER_DEPTH,
};
pub use model::level::FeatureLevel;
pub use model::ProjectId;
pub use repo::activity_repo::{ActivityEntry, SqliteActivityLog};
pub use repo::feature_repo::{FeatureRepository, SqliteFeatureRepository};
pub use repo::folder_repo::{FolderRepository, SqliteFolderRepository};
pub use repo::tree_repo::{TreeRepoError, TreeRepoResult};
pub use service::error::{TransitionViolation, TreeServiceError, TreeServiceResult};
pub use service::feature_tree_service::FeatureTreeService;
pub use service::folder_tree_service::FolderTreeService;
pub use service::outcome::{DeleteOutcome, DeleteStrategy, FolderDeleteOutcome, MoveOutcome};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
