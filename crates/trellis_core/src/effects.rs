//! Queued side effects of tree mutations.
//!
//! # Responsibility
//! - Carry best-effort follow-up work (origin sibling renumbering, activity
//!   log entries) as messages, separate from the primary mutation.
//! - Drain the queue through a handler, logging and counting failures.
//!
//! # Invariants
//! - A failing effect never changes the result of the operation that
//!   posted it. Positions touched by a failed renumber stay out of order
//!   until the next write to that sibling set.

use crate::model::activity::ActivityRecord;
use crate::model::ProjectId;
use crate::repo::tree_repo::TreeRepoResult;
use log::{debug, warn};
use std::sync::mpsc::{channel, Receiver, Sender};
use uuid::Uuid;

/// Follow-up work posted by a tree operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeEffect {
    /// Restore `0..n-1` positions under `parent_id` (`None` = root).
    RenumberSiblings {
        project_id: ProjectId,
        parent_id: Option<Uuid>,
    },
    RecordActivity(ActivityRecord),
}

impl TreeEffect {
    fn label(&self) -> &'static str {
        match self {
            Self::RenumberSiblings { .. } => "renumber_siblings",
            Self::RecordActivity(_) => "record_activity",
        }
    }
}

/// Outcome of one queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectReport {
    pub applied: usize,
    pub failed: usize,
}

impl EffectReport {
    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

/// In-process effect channel.
pub struct EffectQueue {
    sender: Sender<TreeEffect>,
    receiver: Receiver<TreeEffect>,
}

impl Default for EffectQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EffectQueue {
    pub fn new() -> Self {
        let (sender, receiver) = channel();
        Self { sender, receiver }
    }

    /// Producer handle for collaborators that post their own effects.
    pub fn sender(&self) -> Sender<TreeEffect> {
        self.sender.clone()
    }

    pub fn post(&self, effect: TreeEffect) {
        // The receiver lives as long as `self`, so send cannot fail here.
        let _ = self.sender.send(effect);
    }

    /// Drains every queued effect through `handler`.
    pub fn dispatch(&self, mut handler: impl FnMut(&TreeEffect) -> TreeRepoResult<()>) -> EffectReport {
        let mut report = EffectReport::default();
        for effect in self.receiver.try_iter() {
            match handler(&effect) {
                Ok(()) => {
                    report.applied += 1;
                    debug!("event=effect_applied module=effects effect={}", effect.label());
                }
                Err(err) => {
                    report.failed += 1;
                    warn!(
                        "event=effect_failed module=effects status=error effect={} error={}",
                        effect.label(),
                        err
                    );
                }
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::{EffectQueue, TreeEffect};
    use crate::repo::tree_repo::TreeRepoError;
    use uuid::Uuid;

    fn renumber() -> TreeEffect {
        TreeEffect::RenumberSiblings {
            project_id: Uuid::new_v4(),
            parent_id: None,
        }
    }

    #[test]
    fn dispatch_counts_failures_without_stopping() {
        let queue = EffectQueue::new();
        queue.post(renumber());
        queue.post(renumber());
        queue.post(renumber());

        let mut calls = 0;
        let report = queue.dispatch(|_| {
            calls += 1;
            if calls == 2 {
                Err(TreeRepoError::InvalidData("boom".to_string()))
            } else {
                Ok(())
            }
        });

        assert_eq!(calls, 3);
        assert_eq!(report.applied, 2);
        assert_eq!(report.failed, 1);
        assert!(!report.is_clean());
    }

    #[test]
    fn queue_is_empty_after_dispatch() {
        let queue = EffectQueue::new();
        queue.sender().send(renumber()).unwrap();
        assert_eq!(queue.dispatch(|_| Ok(())).applied, 1);
        assert_eq!(queue.dispatch(|_| Ok(())).applied, 0);
    }
}
