//! Folder tree use-case service.
//!
//! # Responsibility
//! - Enforce the folder depth limit, acyclicity and sibling name uniqueness.
//! - Count recursive folder contents for detail views and delete previews.
//! - Plan folder moves/renames/deletes and write each as one batch.
//!
//! # Invariants
//! - No folder chain is longer than [`MAX_FOLDER_DEPTH`].
//! - Sibling folder names are unique, compared case-sensitively after
//!   whitespace normalization.
//! - Deleting a folder removes its whole subtree and detaches every artifact
//!   filed anywhere inside it.

use crate::config::{EffectMode, TreeConfig};
use crate::effects::{EffectQueue, EffectReport, TreeEffect};
use crate::hierarchy::{plan_sibling_positions, MovedSibling, SiblingSlot, TreeIndex};
use crate::model::activity::{ActivityAction, ActivityRecord, TreeEntity};
use crate::model::folder::{
    Artifact, Folder, FolderContents, FolderDetail, FolderId, FolderPatch, MAX_FOLDER_DEPTH,
};
use crate::model::ProjectId;
use crate::repo::folder_repo::{FolderRepository, FolderWrite};
use crate::repo::tree_repo::TreeRepoResult;
use crate::service::error::{log_failure, TransitionViolation, TreeServiceError, TreeServiceResult};
use crate::service::names::normalize_name;
use crate::service::outcome::{FolderDeleteOutcome, MoveOutcome};
use log::info;
use std::collections::HashMap;

const MODULE: &str = "folder_tree";

/// Folder tree service facade.
pub struct FolderTreeService<R: FolderRepository> {
    repo: R,
    config: TreeConfig,
    effects: EffectQueue,
}

impl<R: FolderRepository> FolderTreeService<R> {
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

    pub fn effects(&self) -> &EffectQueue {
        &self.effects
    }

    /// Loads one folder with its depth and recursive content counts.
    pub fn get_folder(&self, folder_id: FolderId) -> TreeServiceResult<FolderDetail> {
        let folder = self.require_folder(folder_id)?;
        let index = self.load_index(folder.project_id)?;
        let counts = self.repo.artifact_counts(folder.project_id)?;
        let contents = count_contents(&index, &counts, folder_id);

        Ok(FolderDetail {
            depth: index.ancestor_depth(folder_id),
            child_folder_count: contents.folder_count,
            artifact_count: contents.artifact_count,
            folder,
        })
    }

    /// Counts every folder below `folder_id` and every artifact filed in it
    /// or in any of those folders.
    pub fn count_folder_contents(&self, folder_id: FolderId) -> TreeServiceResult<FolderContents> {
        let folder = self.require_folder(folder_id)?;
        let index = self.load_index(folder.project_id)?;
        let counts = self.repo.artifact_counts(folder.project_id)?;
        Ok(count_contents(&index, &counts, folder_id))
    }

    pub fn list_children(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
    ) -> TreeServiceResult<Vec<Folder>> {
        if let Some(parent_id) = parent_id {
            self.require_in_project(parent_id, project_id)?;
        }
        Ok(self.repo.list_children(project_id, parent_id)?)
    }

    /// Creates one folder at the end of its sibling list.
    pub fn create_folder(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> TreeServiceResult<Folder> {
        self.create_folder_inner(project_id, parent_id, name)
            .inspect_err(|err| {
                log_failure(MODULE, "folder_create", parent_id.unwrap_or(project_id), err)
            })
    }

    fn create_folder_inner(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
        name: &str,
    ) -> TreeServiceResult<Folder> {
        let name = normalize_name(name)?;
        if let Some(parent_id) = parent_id {
            self.require_in_project(parent_id, project_id)?;
            let index = self.load_index(project_id)?;
            ensure_depth(index.ancestor_depth(parent_id) + 1)?;
        }
        self.ensure_unique_name(project_id, parent_id, &name, None)?;

        let folder = self.repo.create_folder(project_id, parent_id, &name)?;
        info!(
            "event=folder_create module={MODULE} status=ok folder={} position={}",
            folder.id, folder.position
        );
        self.post_activity(&folder, ActivityAction::Created, format!("name={}", folder.name));
        self.settle_effects();
        Ok(folder)
    }

    /// Files a new artifact under `folder_id` (`None` = unfiled).
    pub fn create_artifact(
        &self,
        project_id: ProjectId,
        folder_id: Option<FolderId>,
        title: &str,
    ) -> TreeServiceResult<Artifact> {
        let title = normalize_name(title)?;
        if let Some(folder_id) = folder_id {
            self.require_in_project(folder_id, project_id)?;
        }
        Ok(self.repo.create_artifact(project_id, folder_id, &title)?)
    }

    pub fn list_artifacts(
        &self,
        project_id: ProjectId,
        folder_id: Option<FolderId>,
    ) -> TreeServiceResult<Vec<Artifact>> {
        if let Some(folder_id) = folder_id {
            self.require_in_project(folder_id, project_id)?;
        }
        Ok(self.repo.list_artifacts(project_id, folder_id)?)
    }

    /// Moves one folder under `new_parent_id` at `target_position`.
    pub fn move_folder(
        &self,
        folder_id: FolderId,
        new_parent_id: Option<FolderId>,
        target_position: i64,
    ) -> TreeServiceResult<MoveOutcome> {
        self.move_folder_inner(folder_id, new_parent_id, target_position, None)
            .inspect_err(|err| log_failure(MODULE, "folder_move", folder_id, err))
    }

    /// Applies a rename and/or move in one batch.
    ///
    /// A move to a new parent without an explicit position appends to the new
    /// sibling list. Restating the current parent without a position keeps
    /// the folder's slot. A position alone reorders within the current parent.
    pub fn move_or_rename_folder(
        &self,
        folder_id: FolderId,
        patch: FolderPatch,
    ) -> TreeServiceResult<Folder> {
        self.move_or_rename_inner(folder_id, patch)
            .inspect_err(|err| log_failure(MODULE, "folder_update", folder_id, err))
    }

    fn move_or_rename_inner(
        &self,
        folder_id: FolderId,
        patch: FolderPatch,
    ) -> TreeServiceResult<Folder> {
        let folder = self.require_folder(folder_id)?;
        let name = patch.name.as_deref().map(normalize_name).transpose()?;
        let rename = name.filter(|name| *name != folder.name);

        match (patch.parent_id, patch.position) {
            (None, None) => {}
            (parent_id, position) => {
                let parent_id = parent_id.unwrap_or(folder.parent_id);
                let target = match position {
                    Some(position) => position,
                    None if parent_id == folder.parent_id => folder.position,
                    None => i64::MAX,
                };
                self.move_folder_inner(folder_id, parent_id, target, rename.as_deref())?;
                return self.require_folder(folder_id);
            }
        }

        let Some(name) = rename else {
            return Ok(folder);
        };
        self.ensure_unique_name(folder.project_id, folder.parent_id, &name, Some(folder_id))?;
        self.repo.apply(&[FolderWrite::Rename {
            id: folder_id,
            name: name.clone(),
        }])?;
        info!("event=folder_rename module={MODULE} status=ok folder={folder_id}");
        self.post_activity(&folder, ActivityAction::Updated, format!("name={name}"));
        self.settle_effects();
        self.require_folder(folder_id)
    }

    fn move_folder_inner(
        &self,
        folder_id: FolderId,
        new_parent_id: Option<FolderId>,
        target_position: i64,
        rename: Option<&str>,
    ) -> TreeServiceResult<MoveOutcome> {
        let folder = self.require_folder(folder_id)?;
        if new_parent_id == Some(folder_id) {
            return Err(TransitionViolation::MoveIntoSelf.into());
        }
        if let Some(parent_id) = new_parent_id {
            self.require_in_project(parent_id, folder.project_id)?;
        }

        let index = self.load_index(folder.project_id)?;
        if let Some(parent_id) = new_parent_id {
            if index.is_descendant(folder_id, parent_id) {
                return Err(TreeServiceError::CircularReference {
                    node_id: folder_id,
                    parent_id,
                });
            }
            ensure_depth(index.ancestor_depth(parent_id) + 1 + index.subtree_height(folder_id))?;
        }

        let name = rename.unwrap_or(folder.name.as_str());
        if new_parent_id != folder.parent_id || rename.is_some() {
            self.ensure_unique_name(folder.project_id, new_parent_id, name, Some(folder_id))?;
        }

        let plan = plan_sibling_positions(
            &index.sibling_slots(new_parent_id),
            Some(MovedSibling {
                id: folder_id,
                target: target_position,
            }),
        );
        let position = plan.moved_position.unwrap_or_default();
        let parent_changed = new_parent_id != folder.parent_id;

        if !parent_changed && rename.is_none() && position == folder.position && plan.changes.is_empty() {
            return Ok(MoveOutcome {
                id: folder_id,
                parent_id: folder.parent_id,
                position: folder.position,
                changed: false,
            });
        }

        let mut writes = vec![FolderWrite::Place {
            id: folder_id,
            parent_id: new_parent_id,
            position,
        }];
        writes.extend(plan.changes.into_iter().map(|change| FolderWrite::Reposition {
            id: change.id,
            position: change.position,
        }));
        if let Some(name) = rename {
            writes.push(FolderWrite::Rename {
                id: folder_id,
                name: name.to_string(),
            });
        }
        let written = self.repo.apply(&writes)?;

        info!(
            "event=folder_move module={MODULE} status=ok folder={folder_id} parent={} position={position} writes={written}",
            new_parent_id.map_or_else(|| "root".to_string(), |id| id.to_string())
        );

        if parent_changed {
            self.effects.post(TreeEffect::RenumberSiblings {
                project_id: folder.project_id,
                parent_id: folder.parent_id,
            });
        }
        self.post_activity(&folder, ActivityAction::Moved, format!("position={position}"));
        if let Some(name) = rename {
            self.post_activity(&folder, ActivityAction::Updated, format!("name={name}"));
        }
        self.settle_effects();

        Ok(MoveOutcome {
            id: folder_id,
            parent_id: new_parent_id,
            position,
            changed: true,
        })
    }

    /// Hard-deletes one folder and its subtree. Contained artifacts survive
    /// unfiled; the outcome reports what was removed or detached.
    pub fn delete_folder(&self, folder_id: FolderId) -> TreeServiceResult<FolderDeleteOutcome> {
        self.delete_folder_inner(folder_id)
            .inspect_err(|err| log_failure(MODULE, "folder_delete", folder_id, err))
    }

    fn delete_folder_inner(&self, folder_id: FolderId) -> TreeServiceResult<FolderDeleteOutcome> {
        let folder = self.require_folder(folder_id)?;
        let index = self.load_index(folder.project_id)?;
        let counts = self.repo.artifact_counts(folder.project_id)?;
        let contents = count_contents(&index, &counts, folder_id);

        let remaining: Vec<SiblingSlot> = index
            .sibling_slots(folder.parent_id)
            .into_iter()
            .filter(|slot| slot.id != folder_id)
            .collect();
        let mut writes = vec![FolderWrite::Delete { id: folder_id }];
        writes.extend(
            plan_sibling_positions(&remaining, None)
                .changes
                .into_iter()
                .map(|change| FolderWrite::Reposition {
                    id: change.id,
                    position: change.position,
                }),
        );
        let written = self.repo.apply(&writes)?;

        let outcome = FolderDeleteOutcome {
            deleted_folder_count: contents.folder_count + 1,
            deleted_artifact_count: contents.artifact_count,
        };
        info!(
            "event=folder_delete module={MODULE} status=ok folder={folder_id} writes={written} folders={} artifacts={}",
            outcome.deleted_folder_count, outcome.deleted_artifact_count
        );
        self.post_activity(
            &folder,
            ActivityAction::Deleted,
            format!(
                "folders={} artifacts={}",
                outcome.deleted_folder_count, outcome.deleted_artifact_count
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
                    .map(|folder| SiblingSlot {
                        id: folder.id,
                        position: folder.position,
                    })
                    .collect();
                let writes: Vec<FolderWrite> = plan_sibling_positions(&siblings, None)
                    .changes
                    .into_iter()
                    .map(|change| FolderWrite::Reposition {
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

    fn post_activity(&self, folder: &Folder, action: ActivityAction, detail: impl Into<String>) {
        self.effects
            .post(TreeEffect::RecordActivity(ActivityRecord::new(
                folder.project_id,
                TreeEntity::Folder,
                folder.id,
                action,
                detail,
            )));
    }

    fn ensure_unique_name(
        &self,
        project_id: ProjectId,
        parent_id: Option<FolderId>,
        name: &str,
        exclude: Option<FolderId>,
    ) -> TreeServiceResult<()> {
        let taken = self
            .repo
            .list_children(project_id, parent_id)?
            .iter()
            .any(|sibling| Some(sibling.id) != exclude && sibling.name == name);
        if taken {
            return Err(TreeServiceError::DuplicateName {
                parent_id,
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn load_index(&self, project_id: ProjectId) -> TreeServiceResult<TreeIndex<Folder>> {
        Ok(TreeIndex::new(self.repo.list_project_folders(project_id)?))
    }

    fn require_folder(&self, folder_id: FolderId) -> TreeServiceResult<Folder> {
        self.repo
            .get_folder(folder_id)?
            .ok_or(TreeServiceError::NotFound(folder_id))
    }

    fn require_in_project(
        &self,
        folder_id: FolderId,
        project_id: ProjectId,
    ) -> TreeServiceResult<Folder> {
        let folder = self.require_folder(folder_id)?;
        if folder.project_id != project_id {
            return Err(TreeServiceError::NotFound(folder_id));
        }
        Ok(folder)
    }
}

fn ensure_depth(resulting_depth: usize) -> TreeServiceResult<()> {
    if resulting_depth > MAX_FOLDER_DEPTH {
        return Err(TreeServiceError::DepthExceeded {
            resulting_depth,
            max_depth: MAX_FOLDER_DEPTH,
        });
    }
    Ok(())
}

fn count_contents(
    index: &TreeIndex<Folder>,
    artifact_counts: &HashMap<FolderId, usize>,
    folder_id: FolderId,
) -> FolderContents {
    let descendants = index.descendants(folder_id);
    let artifact_count = std::iter::once(folder_id)
        .chain(descendants.iter().copied())
        .map(|id| artifact_counts.get(&id).copied().unwrap_or(0))
        .sum();
    FolderContents {
        folder_count: descendants.len(),
        artifact_count,
    }
}
