//! Feature tree use-case service.
//!
//! # Responsibility
//! - Validate level, cycle and scope invariants above the repository layer.
//! - Plan moves, deletes and level shifts against an in-memory snapshot of
//!   the project tree, then write each plan as one batch.
//! - Post origin renumbering and activity entries as queued side effects.
//!
//! # Invariants
//! - A node's level is compatible with its parent's level, with two
//!   exceptions: `reparent_children` lifts children without re-levelling
//!   them, and a level cascade saturates at `epic`/`task`, so demoting a
//!   chain that already reaches `task` leaves a `task` under a `task`.
//! - No node is its own ancestor.
//! - Sibling positions touched by a successful write form `0..n-1`.

use crate::config::{EffectMode, OrphanPolicy, TreeConfig};
use crate::effects::{EffectQueue, EffectReport, TreeEffect};
use crate::hierarchy::{
    plan_sibling_positions, positions_for_order, MovedSibling, SiblingSlot, TreeIndex,
};
use crate::model::activity::{ActivityAction, ActivityRecord, TreeEntity};
use crate::model::feature_node::{FeatureNode, FeatureNodeId, FeatureNodePatch, NewFeatureNode};
use crate::model::level::{is_valid_parent, FeatureLevel};
use crate::model::ProjectId;
use crate::repo::feature_repo::{FeatureRepository, FeatureWrite};
use crate::repo::tree_repo::TreeRepoResult;
use crate::service::error::{log_failure, TransitionViolation, TreeServiceError, TreeServiceResult};
use crate::service::names::{normalize_description, normalize_name};
use crate::service::outcome::{DeleteOutcome, DeleteStrategy, MoveOutcome};
use log::info;

const MODULE: &str = "feature_tree";

/// Feature tree service facade.
pub struct FeatureTreeService<R: FeatureRepository> {
    repo: R,
    config: TreeConfig,
    effects: EffectQueue,
}

impl<R: FeatureRepository> FeatureTreeService<R> {
    /// Creates service with default configuration.
    pub fn new(repo: R) -> Self {
        Self::with_config(repo, TreeConfig::default())
    }

    pub fn with_config(repo: R, config: TreeConfig) -> Self {
        Self {
            repo,
            config,
            effects: EffectQueue::new(),
        }
    }

    /// Queue handle for collaborators posting their own follow-up work.
    pub fn effects(&self) -> &EffectQueue {
        &self.effects
    }

    /// Loads one active node.
    pub fn get_node(&self, node_id: FeatureNodeId) -> TreeServiceResult<FeatureNode> {
        self.require_active(node_id)
    }

    /// Lists active children ordered by position.
    ///
    /// A soft-deleted parent is reported as `NotFound`, which is what makes
    /// `delete_only` orphans unreachable.
    pub fn list_children(
        &self,
        project_id: ProjectId,
        parent_id: Option<FeatureNodeId>,
    ) -> TreeServiceResult<Vec<FeatureNode>> {
        if let Some(parent_id) = parent_id {
            self.require_in_project(parent_id, project_id)?;
        }
        Ok(self.repo.list_children(project_id, parent_id)?)
    }

    /// Creates one node at the end of its sibling list.
    pub fn create_node(&self, request: NewFeatureNode) -> TreeServiceResult<FeatureNode> {
        let subject = request.parent_id.unwrap_or(request.project_id);
        self.create_node_inner(request)
            .inspect_err(|err| log_failure(MODULE, "feature_create", subject, err))
    }

    fn create_node_inner(&self, request: NewFeatureNode) -> TreeServiceResult<FeatureNode> {
        let title = normalize_name(&request.title)?;
        let parent_level = match request.parent_id {
            Some(parent_id) => Some(self.require_in_project(parent_id, request.project_id)?.level),
            None => None,
        };
        if !is_valid_parent(request.level, parent_level) {
            return Err(TransitionViolation::IncompatibleParent {
                child: request.level,
                parent: parent_level,
            }
            .into());
        }

        let node = self.repo.create_node(&NewFeatureNode {
            title,
            description: normalize_description(request.description),
            ..request
        })?;

        info!(
            "event=feature_create module={MODULE} status=ok node={} level={} position={}",
            node.id, node.level, node.position
        );
        self.post_activity(&node, ActivityAction::Created, format!("level={}", node.level));
        self.settle_effects();
        Ok(node)
    }

    /// Moves one node under `new_parent_id` (`None` = root) at
    /// `target_position`, clamped to the destination sibling count.
    pub fn move_node(
        &self,
        node_id: FeatureNodeId,
        new_parent_id: Option<FeatureNodeId>,
        target_position: i64,
    ) -> TreeServiceResult<MoveOutcome> {
        self.move_node_inner(node_id, new_parent_id, target_position)
            .inspect_err(|err| log_failure(MODULE, "feature_move", node_id, err))
    }

    fn move_node_inner(
        &self,
        node_id: FeatureNodeId,
        new_parent_id: Option<FeatureNodeId>,
        target_position: i64,
    ) -> TreeServiceResult<MoveOutcome> {
        let node = self.require_active(node_id)?;
        if new_parent_id == Some(node_id) {
            return Err(TransitionViolation::MoveIntoSelf.into());
        }

        let parent_level = match new_parent_id {
            Some(parent_id) => Some(self.require_in_project(parent_id, node.project_id)?.level),
            None => None,
        };

        let index = self.load_index(node.project_id)?;
        if let Some(parent_id) = new_parent_id {
            if index.is_descendant(node_id, parent_id) {
                return Err(TreeServiceError::CircularReference { node_id, parent_id });
            }
        }
        if !is_valid_parent(node.level, parent_level) {
            return Err(TransitionViolation::IncompatibleParent {
                child: node.level,
                parent: parent_level,
            }
            .into());
        }

        let plan = plan_sibling_positions(
            &index.sibling_slots(new_parent_id),
            Some(MovedSibling {
                id: node_id,
                target: target_position,
            }),
        );
        let position = plan.moved_position.unwrap_or_default();

        // The requested slot is the current one. A clamped target that lands
        // on the current slot of a gap-free set is treated the same way.
        let same_slot = node.position == target_position
            || (node.position == position && plan.changes.is_empty());
        if node.parent_id == new_parent_id && same_slot {
            return Ok(MoveOutcome {
                id: node_id,
                parent_id: node.parent_id,
                position: node.position,
                changed: false,
            });
        }

        let mut writes = vec![FeatureWrite::Place {
            id: node_id,
            parent_id: new_parent_id,
            position,
        }];
        writes.extend(plan.changes.into_iter().map(|change| FeatureWrite::Reposition {
            id: change.id,
            position: change.position,
        }));
        let written = self.repo.apply(&writes)?;

        info!(
            "event=feature_move module={MODULE} status=ok node={node_id} parent={} position={position} writes={written}",
            display_parent(new_parent_id)
        );

        if node.parent_id != new_parent_id {
            self.effects.post(TreeEffect::RenumberSiblings {
                project_id: node.project_id,
                parent_id: node.parent_id,
            });
        }
        self.post_activity(
            &node,
            ActivityAction::Moved,
            format!(
                "from={} to={} position={position}",
                display_parent(node.parent_id),
                display_parent(new_parent_id)
            ),
        );
        self.settle_effects();

        Ok(MoveOutcome {
            id: node_id,
            parent_id: new_parent_id,
            position,
            changed: true,
        })
    }

    /// Updates title/description/level. A level change shifts every
    /// descendant by the same step.
    pub fn update_node_fields(
        &self,
        node_id: FeatureNodeId,
        patch: FeatureNodePatch,
    ) -> TreeServiceResult<FeatureNode> {
        self.update_node_fields_inner(node_id, patch)
            .inspect_err(|err| log_failure(MODULE, "feature_update", node_id, err))
    }

    fn update_node_fields_inner(
        &self,
        node_id: FeatureNodeId,
        patch: FeatureNodePatch,
    ) -> TreeServiceResult<FeatureNode> {
        let node = self.require_active(node_id)?;
        if patch.is_empty() {
            return Ok(node);
        }

        let title = patch.title.as_deref().map(normalize_name).transpose()?;
        let description = patch.description.map(normalize_description);

        let mut writes = Vec::new();
        let next_title = title.unwrap_or_else(|| node.title.clone());
        let next_description = description.unwrap_or_else(|| node.description.clone());
        let fields_changed = next_title != node.title || next_description != node.description;
        if fields_changed {
            writes.push(FeatureWrite::SetFields {
                id: node_id,
                title: next_title,
                description: next_description,
            });
        }

        let mut cascaded = 0;
        let level_change = patch.level.filter(|level| *level != node.level);
        if let Some(level) = level_change {
            let index = self.load_index(node.project_id)?;
            cascaded = plan_level_change(&index, &node, level, &mut writes)?;
        }

        if writes.is_empty() {
            return Ok(node);
        }
        let written = self.repo.apply(&writes)?;
        info!(
            "event=feature_update module={MODULE} status=ok node={node_id} writes={written} cascaded={cascaded}"
        );

        if fields_changed {
            self.post_activity(&node, ActivityAction::Updated, "fields=title,description");
        }
        if let Some(level) = level_change {
            self.post_activity(
                &node,
                ActivityAction::LevelChanged,
                format!("from={} to={level} cascaded={cascaded}", node.level),
            );
        }
        self.settle_effects();

        self.require_active(node_id)
    }

    /// Deletes one node with the given strategy.
    pub fn delete_node(
        &self,
        node_id: FeatureNodeId,
        strategy: DeleteStrategy,
    ) -> TreeServiceResult<DeleteOutcome> {
        self.delete_node_inner(node_id, strategy)
            .inspect_err(|err| log_failure(MODULE, "feature_delete", node_id, err))
    }

    fn delete_node_inner(
        &self,
        node_id: FeatureNodeId,
        strategy: DeleteStrategy,
    ) -> TreeServiceResult<DeleteOutcome> {
        let node = self.require_active(node_id)?;
        let index = self.load_index(node.project_id)?;
        let children: Vec<FeatureNodeId> = index.child_ids(Some(node_id)).to_vec();
        let siblings = index.sibling_slots(node.parent_id);

        let mut writes = Vec::new();
        let mut outcome = DeleteOutcome {
            id: node_id,
            deleted_at: 0,
            strategy,
            children_deleted: 0,
            children_reparented: 0,
            children_orphaned: 0,
        };

        match strategy {
            DeleteStrategy::Subtree => {
                let descendants = index.descendants(node_id);
                writes.extend(
                    descendants
                        .iter()
                        .map(|id| FeatureWrite::SoftDelete { id: *id }),
                );
                writes.extend(close_gap(&siblings, node_id));
                outcome.children_deleted = descendants.len();
            }
            DeleteStrategy::ReparentChildren => {
                writes.extend(lift_children(&siblings, &node, &children));
                outcome.children_reparented = children.len();
            }
            DeleteStrategy::DeleteOnly => match self.config.delete_only_orphans {
                OrphanPolicy::LeaveDangling => {
                    writes.extend(close_gap(&siblings, node_id));
                    outcome.children_orphaned = children.len();
                }
                OrphanPolicy::MoveToParent => {
                    writes.extend(lift_children(&siblings, &node, &children));
                    outcome.children_reparented = children.len();
                }
                OrphanPolicy::MoveToRoot if node.parent_id.is_none() => {
                    writes.extend(lift_children(&siblings, &node, &children));
                    outcome.children_reparented = children.len();
                }
                OrphanPolicy::MoveToRoot => {
                    writes.extend(close_gap(&siblings, node_id));
                    let root_len = index.child_ids(None).len() as i64;
                    writes.extend(children.iter().enumerate().map(|(offset, id)| {
                        FeatureWrite::Place {
                            id: *id,
                            parent_id: None,
                            position: root_len + offset as i64,
                        }
                    }));
                    outcome.children_reparented = children.len();
                }
            },
        }
        writes.push(FeatureWrite::SoftDelete { id: node_id });

        let written = self.repo.apply(&writes)?;
        let tombstone = self
            .repo
            .get_node(node_id, true)?
            .ok_or(TreeServiceError::NotFound(node_id))?;
        outcome.deleted_at = tombstone.deleted_at.unwrap_or_default();

        info!(
            "event=feature_delete module={MODULE} status=ok node={node_id} strategy={strategy} writes={written} deleted={} reparented={} orphaned={}",
            outcome.children_deleted, outcome.children_reparented, outcome.children_orphaned
        );
        self.post_activity(
            &node,
            ActivityAction::Deleted,
            format!(
                "strategy={strategy} children_deleted={} children_reparented={}",
                outcome.children_deleted, outcome.children_reparented
            ),
        );
        self.settle_effects();
        Ok(outcome)
    }

    /// Drains queued side effects now. Failures are logged and counted only.
    pub fn flush_effects(&self) -> EffectReport {
        self.effects.dispatch(|effect| self.apply_effect(effect))
    }

    fn settle_effects(&self) {
        if self.config.effect_mode == EffectMode::Immediate {
            self.flush_effects();
        }
    }

    fn apply_effect(&self, effect: &TreeEffect) -> TreeRepoResult<()> {
        match effect {
            TreeEffect::RenumberSiblings {
                project_id,
                parent_id,
            } => {
                let siblings: Vec<SiblingSlot> = self
                    .repo
                    .list_children(*project_id, *parent_id)?
                    .iter()
                    .map(|node| SiblingSlot {
                        id: node.id,
                        position: node.position,
                    })
                    .collect();
                let plan = plan_sibling_positions(&siblings, None);
                let writes: Vec<FeatureWrite> = plan
                    .changes
                    .into_iter()
                    .map(|change| FeatureWrite::Reposition {
                        id: change.id,
                        position: change.position,
                    })
                    .collect();
                self.repo.apply(&writes)?;
                Ok(())
            }
            TreeEffect::RecordActivity(record) => self.repo.record_activity(record),
        }
    }

    fn post_activity(&self, node: &FeatureNode, action: ActivityAction, detail: impl Into<String>) {
        self.effects
            .post(TreeEffect::RecordActivity(ActivityRecord::new(
                node.project_id,
                TreeEntity::FeatureNode,
                node.id,
                action,
                detail,
            )));
    }

    fn load_index(&self, project_id: ProjectId) -> TreeServiceResult<TreeIndex<FeatureNode>> {
        Ok(TreeIndex::new(self.repo.list_project_nodes(project_id)?))
    }

    fn require_active(&self, node_id: FeatureNodeId) -> TreeServiceResult<FeatureNode> {
        self.repo
            .get_node(node_id, false)?
            .ok_or(TreeServiceError::NotFound(node_id))
    }

    fn require_in_project(
        &self,
        node_id: FeatureNodeId,
        project_id: ProjectId,
    ) -> TreeServiceResult<FeatureNode> {
        let node = self.require_active(node_id)?;
        if node.project_id != project_id {
            return Err(TreeServiceError::NotFound(node_id));
        }
        Ok(node)
    }
}

/// Validates a one-step level change and appends the level writes for the
/// node and every descendant it drags along. Returns the descendant count
/// whose level changed.
fn plan_level_change(
    index: &TreeIndex<FeatureNode>,
    node: &FeatureNode,
    level: FeatureLevel,
    writes: &mut Vec<FeatureWrite>,
) -> TreeServiceResult<usize> {
    let delta = level.ordinal() as i8 - node.level.ordinal() as i8;
    if delta.abs() > 1 {
        return Err(TransitionViolation::LevelJump {
            from: node.level,
            to: level,
        }
        .into());
    }

    let child_count = index.child_ids(Some(node.id)).len();
    if level.is_leaf() && child_count > 0 {
        return Err(TransitionViolation::DemoteWithChildren { child_count }.into());
    }

    // An orphan's parent is tombstoned and not indexed; nothing to check against.
    let parent_level = match node.parent_id {
        None => Some(None),
        Some(parent_id) => index.get(parent_id).map(|parent| Some(parent.level)),
    };
    if let Some(parent_level) = parent_level {
        if !is_valid_parent(level, parent_level) {
            return Err(TransitionViolation::IncompatibleParent {
                child: level,
                parent: parent_level,
            }
            .into());
        }
    }

    writes.push(FeatureWrite::SetLevel { id: node.id, level });
    let before = writes.len();
    cascade_level_shift(index, node.id, delta, writes);
    Ok(writes.len() - before)
}

fn cascade_level_shift(
    index: &TreeIndex<FeatureNode>,
    parent_id: FeatureNodeId,
    delta: i8,
    writes: &mut Vec<FeatureWrite>,
) {
    for child in index.children(Some(parent_id)) {
        let mapped = child.level.shifted(delta);
        if mapped != child.level {
            writes.push(FeatureWrite::SetLevel {
                id: child.id,
                level: mapped,
            });
            cascade_level_shift(index, child.id, delta, writes);
        }
    }
}

/// Renumbers `siblings` with `removed` taken out.
fn close_gap(siblings: &[SiblingSlot], removed: FeatureNodeId) -> Vec<FeatureWrite> {
    let order: Vec<FeatureNodeId> = siblings
        .iter()
        .map(|slot| slot.id)
        .filter(|id| *id != removed)
        .collect();
    positions_for_order(&order, siblings)
        .into_iter()
        .map(|change| FeatureWrite::Reposition {
            id: change.id,
            position: change.position,
        })
        .collect()
}

/// Replaces `node` in its sibling list with its direct children, in order.
fn lift_children(
    siblings: &[SiblingSlot],
    node: &FeatureNode,
    children: &[FeatureNodeId],
) -> Vec<FeatureWrite> {
    let mut order = Vec::with_capacity(siblings.len() + children.len());
    for slot in siblings {
        if slot.id == node.id {
            order.extend_from_slice(children);
        } else {
            order.push(slot.id);
        }
    }

    let mut writes: Vec<FeatureWrite> = children
        .iter()
        .filter_map(|child| {
            order
                .iter()
                .position(|id| id == child)
                .map(|index| FeatureWrite::Place {
                    id: *child,
                    parent_id: node.parent_id,
                    position: index as i64,
                })
        })
        .collect();
    writes.extend(
        positions_for_order(&order, siblings)
            .into_iter()
            .filter(|change| !children.contains(&change.id))
            .map(|change| FeatureWrite::Reposition {
                id: change.id,
                position: change.position,
            }),
    );
    writes
}

fn display_parent(parent_id: Option<FeatureNodeId>) -> String {
    parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
}
