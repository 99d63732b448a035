//! Error kinds surfaced by the tree services.
//!
//! # Invariants
//! - Guard failures are raised before any write is issued.
//! - A repository `NodeNotFound` surfaces as `NotFound`; every other
//!   store failure surfaces as `WriteFailure`.

use crate::model::level::FeatureLevel;
use crate::repo::tree_repo::TreeRepoError;
use log::{debug, error};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Why a structural or level transition was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionViolation {
    /// Target parent is the node itself.
    MoveIntoSelf,
    /// Child level is not allowed under the parent level (`None` = root).
    IncompatibleParent {
        child: FeatureLevel,
        parent: Option<FeatureLevel>,
    },
    /// Level change spans more than one ordinal step.
    LevelJump {
        from: FeatureLevel,
        to: FeatureLevel,
    },
    /// Demotion to the leaf level while active children exist.
    DemoteWithChildren { child_count: usize },
}

impl Display for TransitionViolation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MoveIntoSelf => write!(f, "cannot move a node into itself"),
            Self::IncompatibleParent {
                child,
                parent: Some(parent),
            } => write!(f, "a {child} cannot be placed under a {parent}"),
            Self::IncompatibleParent {
                child,
                parent: None,
            } => write!(f, "a {child} cannot be placed at the root"),
            Self::LevelJump { from, to } => {
                write!(f, "level can change by one step only: {from} -> {to}")
            }
            Self::DemoteWithChildren { child_count } => write!(
                f,
                "remove children first: node has {child_count} active children"
            ),
        }
    }
}

/// Errors from tree service operations.
#[derive(Debug)]
pub enum TreeServiceError {
    /// Title or folder name is blank after normalization.
    InvalidName,
    /// Node, parent or folder is missing, soft-deleted or out of scope.
    NotFound(Uuid),
    InvalidTransition(TransitionViolation),
    /// Target parent sits inside the subtree being moved.
    CircularReference { node_id: Uuid, parent_id: Uuid },
    /// Resulting folder chain would exceed the depth limit.
    DepthExceeded {
        resulting_depth: usize,
        max_depth: usize,
    },
    /// Sibling folder with the same name already exists.
    DuplicateName {
        parent_id: Option<Uuid>,
        name: String,
    },
    /// Store round trip failed; not retried.
    WriteFailure(TreeRepoError),
}

impl TreeServiceError {
    /// Stable machine-readable kind for collaborators.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidName => "invalid_name",
            Self::NotFound(_) => "not_found",
            Self::InvalidTransition(_) => "invalid_transition",
            Self::CircularReference { .. } => "circular_reference",
            Self::DepthExceeded { .. } => "depth_exceeded",
            Self::DuplicateName { .. } => "duplicate_name",
            Self::WriteFailure(_) => "write_failure",
        }
    }
}

impl Display for TreeServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidName => write!(f, "name must not be blank"),
            Self::NotFound(id) => write!(f, "tree node not found: {id}"),
            Self::InvalidTransition(violation) => write!(f, "invalid transition: {violation}"),
            Self::CircularReference { node_id, parent_id } => write!(
                f,
                "move would create cycle: node {node_id} under descendant {parent_id}"
            ),
            Self::DepthExceeded {
                resulting_depth,
                max_depth,
            } => write!(
                f,
                "folder depth {resulting_depth} exceeds the limit of {max_depth}"
            ),
            Self::DuplicateName { name, .. } => {
                write!(f, "a sibling folder named `{name}` already exists")
            }
            Self::WriteFailure(err) => write!(f, "store failure: {err}"),
        }
    }
}

impl Error for TreeServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::WriteFailure(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TreeRepoError> for TreeServiceError {
    fn from(value: TreeRepoError) -> Self {
        match value {
            TreeRepoError::NodeNotFound(id) => Self::NotFound(id),
            other => Self::WriteFailure(other),
        }
    }
}

impl From<TransitionViolation> for TreeServiceError {
    fn from(value: TransitionViolation) -> Self {
        Self::InvalidTransition(value)
    }
}

pub type TreeServiceResult<T> = Result<T, TreeServiceError>;

/// Logs a failed operation: guard rejections at debug, store failures at error.
pub(crate) fn log_failure(module: &str, event: &str, subject: Uuid, err: &TreeServiceError) {
    match err {
        TreeServiceError::WriteFailure(_) => error!(
            "event={event} module={module} status=error subject={subject} error_code={} error={err}",
            err.kind()
        ),
        _ => debug!(
            "event={event} module={module} status=rejected subject={subject} error_code={}",
            err.kind()
        ),
    }
}
