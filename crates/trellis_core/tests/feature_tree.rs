use rusqlite::Connection;
use trellis_core::db::open_db_in_memory;
use trellis_core::{
    DeleteStrategy, EffectMode, FeatureLevel, FeatureNode, FeatureNodePatch, FeatureTreeService,
    NewFeatureNode, OrphanPolicy, SqliteActivityLog, SqliteFeatureRepository, TransitionViolation,
    TreeConfig, TreeServiceError,
};
use uuid::Uuid;

type Service<'conn> = FeatureTreeService<SqliteFeatureRepository<'conn>>;

fn service(conn: &Connection) -> Service<'_> {
    service_with(conn, TreeConfig::default())
}

fn service_with(conn: &Connection, config: TreeConfig) -> Service<'_> {
    FeatureTreeService::with_config(SqliteFeatureRepository::try_new(conn).unwrap(), config)
}

fn add(
    service: &Service<'_>,
    project_id: Uuid,
    parent: Option<&FeatureNode>,
    level: FeatureLevel,
    title: &str,
) -> FeatureNode {
    service
        .create_node(NewFeatureNode {
            project_id,
            parent_id: parent.map(|node| node.id),
            level,
            title: title.to_string(),
            description: None,
        })
        .unwrap()
}

fn child_titles(service: &Service<'_>, project_id: Uuid, parent: Option<Uuid>) -> Vec<String> {
    service
        .list_children(project_id, parent)
        .unwrap()
        .into_iter()
        .map(|node| node.title)
        .collect()
}

fn assert_contiguous(service: &Service<'_>, project_id: Uuid, parent: Option<Uuid>) {
    let positions: Vec<i64> = service
        .list_children(project_id, parent)
        .unwrap()
        .iter()
        .map(|node| node.position)
        .collect();
    let expected: Vec<i64> = (0..positions.len() as i64).collect();
    assert_eq!(positions, expected, "positions under {parent:?} are not contiguous");
}

fn install_write_counter(conn: &Connection) {
    conn.execute_batch(
        "CREATE TEMP TABLE write_log (node_uuid TEXT NOT NULL);
         CREATE TEMP TRIGGER count_feature_writes
         AFTER UPDATE ON feature_nodes
         BEGIN
             INSERT INTO write_log (node_uuid) VALUES (NEW.node_uuid);
         END;",
    )
    .unwrap();
}

fn write_count(conn: &Connection) -> i64 {
    conn.query_row("SELECT COUNT(*) FROM write_log;", [], |row| row.get(0))
        .unwrap()
}

fn activity_count(conn: &Connection, project_id: Uuid) -> usize {
    SqliteActivityLog::try_new(conn)
        .unwrap()
        .list(project_id)
        .unwrap()
        .len()
}

#[test]
fn reorder_within_parent_keeps_positions_contiguous() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "Epic");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "A");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "B");
    let c = add(&service, project, Some(&epic), FeatureLevel::Feature, "C");

    let outcome = service.move_node(c.id, Some(epic.id), 0).unwrap();

    assert!(outcome.changed);
    assert_eq!(outcome.position, 0);
    assert_eq!(child_titles(&service, project, Some(epic.id)), ["C", "A", "B"]);
    assert_contiguous(&service, project, Some(epic.id));
}

#[test]
fn cross_parent_move_clamps_target_and_renumbers_origin() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let left = add(&service, project, None, FeatureLevel::Epic, "Left");
    let right = add(&service, project, None, FeatureLevel::Epic, "Right");
    let a = add(&service, project, Some(&left), FeatureLevel::Feature, "A");
    add(&service, project, Some(&left), FeatureLevel::Feature, "B");
    add(&service, project, Some(&left), FeatureLevel::Feature, "C");
    add(&service, project, Some(&right), FeatureLevel::Feature, "D");

    let outcome = service.move_node(a.id, Some(right.id), 99).unwrap();

    assert_eq!(outcome.parent_id, Some(right.id));
    assert_eq!(outcome.position, 1);
    assert_eq!(child_titles(&service, project, Some(right.id)), ["D", "A"]);
    assert_eq!(child_titles(&service, project, Some(left.id)), ["B", "C"]);
    assert_contiguous(&service, project, Some(left.id));
    assert_contiguous(&service, project, Some(right.id));
}

#[test]
fn negative_target_lands_first() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    add(&service, project, None, FeatureLevel::Epic, "A");
    let b = add(&service, project, None, FeatureLevel::Epic, "B");

    let outcome = service.move_node(b.id, None, -5).unwrap();

    assert_eq!(outcome.position, 0);
    assert_eq!(child_titles(&service, project, None), ["B", "A"]);
}

#[test]
fn moving_node_under_itself_is_invalid_transition() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "Epic");

    let err = service.move_node(epic.id, Some(epic.id), 0).unwrap_err();

    assert!(matches!(
        err,
        TreeServiceError::InvalidTransition(TransitionViolation::MoveIntoSelf)
    ));
    assert_eq!(err.kind(), "invalid_transition");
}

#[test]
fn moving_ancestor_under_descendant_is_circular_reference() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    let sub = add(&service, project, Some(&feature), FeatureLevel::SubFeature, "S");

    let err = service.move_node(epic.id, Some(sub.id), 0).unwrap_err();

    match err {
        TreeServiceError::CircularReference { node_id, parent_id } => {
            assert_eq!(node_id, epic.id);
            assert_eq!(parent_id, sub.id);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(service.get_node(epic.id).unwrap().parent_id, None);
}

#[test]
fn feature_cannot_parent_feature() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let first = add(&service, project, Some(&epic), FeatureLevel::Feature, "F1");
    let second = add(&service, project, Some(&epic), FeatureLevel::Feature, "F1b");

    let err = service.move_node(first.id, Some(second.id), 0).unwrap_err();

    assert!(matches!(
        err,
        TreeServiceError::InvalidTransition(TransitionViolation::IncompatibleParent {
            child: FeatureLevel::Feature,
            parent: Some(FeatureLevel::Feature),
        })
    ));
}

#[test]
fn missing_deleted_or_foreign_parent_is_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let other_project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let gone = add(&service, project, None, FeatureLevel::Epic, "Gone");
    let foreign = add(&service, other_project, None, FeatureLevel::Epic, "Foreign");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    service.delete_node(gone.id, DeleteStrategy::DeleteOnly).unwrap();

    for parent in [Uuid::new_v4(), gone.id, foreign.id] {
        let err = service.move_node(feature.id, Some(parent), 0).unwrap_err();
        assert!(matches!(err, TreeServiceError::NotFound(id) if id == parent));
    }
    let err = service.move_node(gone.id, None, 0).unwrap_err();
    assert!(matches!(err, TreeServiceError::NotFound(_)));
}

#[test]
fn same_parent_same_position_move_performs_no_writes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "A");
    let b = add(&service, project, Some(&epic), FeatureLevel::Feature, "B");
    install_write_counter(&conn);
    let activity_before = activity_count(&conn, project);

    let outcome = service.move_node(b.id, Some(epic.id), 1).unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.position, 1);
    assert_eq!(write_count(&conn), 0);
    assert_eq!(activity_count(&conn, project), activity_before);
    assert_eq!(service.get_node(b.id).unwrap(), b);
}

#[test]
fn same_position_move_on_gapped_siblings_performs_no_writes() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "A");
    let b = add(&service, project, Some(&epic), FeatureLevel::Feature, "B");
    conn.execute(
        "UPDATE feature_nodes SET position = 5 WHERE node_uuid = ?1;",
        [b.id.to_string()],
    )
    .unwrap();
    install_write_counter(&conn);
    let activity_before = activity_count(&conn, project);

    let outcome = service.move_node(b.id, Some(epic.id), 5).unwrap();

    assert!(!outcome.changed);
    assert_eq!(outcome.position, 5);
    assert_eq!(write_count(&conn), 0);
    assert_eq!(activity_count(&conn, project), activity_before);
    assert_eq!(service.get_node(b.id).unwrap().position, 5);
}

#[test]
fn demoting_a_chain_that_reaches_task_saturates_at_task() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    let sub = add(&service, project, Some(&feature), FeatureLevel::SubFeature, "S");
    let task = add(&service, project, Some(&sub), FeatureLevel::Task, "T");

    service
        .update_node_fields(
            feature.id,
            FeatureNodePatch {
                level: Some(FeatureLevel::SubFeature),
                ..FeatureNodePatch::default()
            },
        )
        .unwrap();

    let sub = service.get_node(sub.id).unwrap();
    let task = service.get_node(task.id).unwrap();
    assert_eq!(sub.level, FeatureLevel::Task);
    assert_eq!(task.level, FeatureLevel::Task);
    assert_eq!(task.parent_id, Some(sub.id));
}

#[test]
fn promoting_sub_feature_cascades_to_children() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let sub = add(&service, project, Some(&epic), FeatureLevel::SubFeature, "S");
    let task = add(&service, project, Some(&sub), FeatureLevel::Task, "T");

    let updated = service
        .update_node_fields(
            sub.id,
            FeatureNodePatch {
                level: Some(FeatureLevel::Feature),
                ..FeatureNodePatch::default()
            },
        )
        .unwrap();

    assert_eq!(updated.level, FeatureLevel::Feature);
    assert_eq!(service.get_node(task.id).unwrap().level, FeatureLevel::SubFeature);
}

#[test]
fn demoting_feature_cascades_down_the_subtree() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    let sub = add(&service, project, Some(&feature), FeatureLevel::SubFeature, "S");

    service
        .update_node_fields(
            feature.id,
            FeatureNodePatch {
                level: Some(FeatureLevel::SubFeature),
                ..FeatureNodePatch::default()
            },
        )
        .unwrap();

    assert_eq!(service.get_node(feature.id).unwrap().level, FeatureLevel::SubFeature);
    assert_eq!(service.get_node(sub.id).unwrap().level, FeatureLevel::Task);
}

#[test]
fn level_changes_reject_jumps_demotion_with_children_and_bad_parent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    let sub = add(&service, project, Some(&feature), FeatureLevel::SubFeature, "S");
    add(&service, project, Some(&sub), FeatureLevel::Task, "T");

    let level = |level| FeatureNodePatch {
        level: Some(level),
        ..FeatureNodePatch::default()
    };

    let jump = service
        .update_node_fields(epic.id, level(FeatureLevel::SubFeature))
        .unwrap_err();
    assert!(matches!(
        jump,
        TreeServiceError::InvalidTransition(TransitionViolation::LevelJump { .. })
    ));

    let demote = service
        .update_node_fields(sub.id, level(FeatureLevel::Task))
        .unwrap_err();
    assert!(matches!(
        demote,
        TreeServiceError::InvalidTransition(TransitionViolation::DemoteWithChildren {
            child_count: 1
        })
    ));

    let promote = service
        .update_node_fields(feature.id, level(FeatureLevel::Epic))
        .unwrap_err();
    assert!(matches!(
        promote,
        TreeServiceError::InvalidTransition(TransitionViolation::IncompatibleParent { .. })
    ));
    assert_eq!(service.get_node(sub.id).unwrap().level, FeatureLevel::SubFeature);
}

#[test]
fn update_normalizes_title_and_clears_description() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let node = service
        .create_node(NewFeatureNode {
            project_id: project,
            parent_id: None,
            level: FeatureLevel::Epic,
            title: "  Release   train ".to_string(),
            description: Some("quarterly".to_string()),
        })
        .unwrap();
    assert_eq!(node.title, "Release train");

    let updated = service
        .update_node_fields(
            node.id,
            FeatureNodePatch {
                description: Some(None),
                ..FeatureNodePatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.description, None);

    let err = service
        .update_node_fields(
            node.id,
            FeatureNodePatch {
                title: Some("   ".to_string()),
                ..FeatureNodePatch::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::InvalidName));
}

#[test]
fn create_rejects_level_that_does_not_fit_parent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();

    let err = service
        .create_node(NewFeatureNode {
            project_id: project,
            parent_id: None,
            level: FeatureLevel::Task,
            title: "Loose task".to_string(),
            description: None,
        })
        .unwrap_err();

    assert!(matches!(
        err,
        TreeServiceError::InvalidTransition(TransitionViolation::IncompatibleParent {
            child: FeatureLevel::Task,
            parent: None,
        })
    ));
}

#[test]
fn delete_subtree_counts_every_descendant() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let keep = add(&service, project, Some(&epic), FeatureLevel::Feature, "Keep");
    let doomed = add(&service, project, Some(&epic), FeatureLevel::Feature, "Doomed");
    let tail = add(&service, project, Some(&epic), FeatureLevel::Feature, "Tail");
    let left = add(&service, project, Some(&doomed), FeatureLevel::SubFeature, "L");
    let right = add(&service, project, Some(&doomed), FeatureLevel::SubFeature, "R");
    add(&service, project, Some(&left), FeatureLevel::Task, "L1");
    add(&service, project, Some(&left), FeatureLevel::Task, "L2");
    add(&service, project, Some(&right), FeatureLevel::Task, "R1");

    let outcome = service.delete_node(doomed.id, DeleteStrategy::Subtree).unwrap();

    assert_eq!(outcome.children_deleted, 5);
    assert_eq!(outcome.children_reparented, 0);
    assert!(outcome.deleted_at > 0);
    assert!(matches!(
        service.get_node(left.id),
        Err(TreeServiceError::NotFound(_))
    ));
    assert_eq!(child_titles(&service, project, Some(epic.id)), ["Keep", "Tail"]);
    assert_eq!(service.get_node(keep.id).unwrap().position, 0);
    assert_eq!(service.get_node(tail.id).unwrap().position, 1);
}

#[test]
fn reparent_children_lifts_them_into_the_deleted_slot() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "Before");
    let middle = add(&service, project, Some(&epic), FeatureLevel::Feature, "Middle");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "After");
    add(&service, project, Some(&middle), FeatureLevel::SubFeature, "S1");
    add(&service, project, Some(&middle), FeatureLevel::SubFeature, "S2");

    let outcome = service
        .delete_node(middle.id, DeleteStrategy::ReparentChildren)
        .unwrap();

    assert_eq!(outcome.children_reparented, 2);
    assert_eq!(
        child_titles(&service, project, Some(epic.id)),
        ["Before", "S1", "S2", "After"]
    );
    assert_contiguous(&service, project, Some(epic.id));
}

#[test]
fn reparent_children_accepts_level_mismatch_with_new_parent() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    let task = add(&service, project, Some(&feature), FeatureLevel::Task, "T");

    service
        .delete_node(feature.id, DeleteStrategy::ReparentChildren)
        .unwrap();

    let lifted = service.get_node(task.id).unwrap();
    assert_eq!(lifted.parent_id, Some(epic.id));
    assert_eq!(lifted.level, FeatureLevel::Task);
}

#[test]
fn delete_only_leaves_children_dangling_by_default() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    add(&service, project, Some(&epic), FeatureLevel::Feature, "Sibling");
    let orphan = add(&service, project, Some(&feature), FeatureLevel::Task, "T");

    let outcome = service.delete_node(feature.id, DeleteStrategy::default()).unwrap();

    assert_eq!(outcome.strategy, DeleteStrategy::DeleteOnly);
    assert_eq!(outcome.children_orphaned, 1);
    assert_eq!(service.get_node(orphan.id).unwrap().parent_id, Some(feature.id));
    assert!(matches!(
        service.list_children(project, Some(feature.id)),
        Err(TreeServiceError::NotFound(_))
    ));
    assert_eq!(child_titles(&service, project, Some(epic.id)), ["Sibling"]);
    assert_contiguous(&service, project, Some(epic.id));
}

#[test]
fn delete_only_can_move_orphans_to_root() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(
        &conn,
        TreeConfig::default().with_orphan_policy(OrphanPolicy::MoveToRoot),
    );
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    add(&service, project, None, FeatureLevel::Epic, "Other");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    add(&service, project, Some(&feature), FeatureLevel::Task, "T");

    let outcome = service.delete_node(feature.id, DeleteStrategy::DeleteOnly).unwrap();

    assert_eq!(outcome.children_reparented, 1);
    assert_eq!(child_titles(&service, project, None), ["E", "Other", "T"]);
    assert_contiguous(&service, project, None);
    assert!(child_titles(&service, project, Some(epic.id)).is_empty());
}

#[test]
fn delete_only_can_move_orphans_to_former_parent() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(
        &conn,
        TreeConfig::default().with_orphan_policy(OrphanPolicy::MoveToParent),
    );
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    add(&service, project, Some(&feature), FeatureLevel::SubFeature, "S");

    let outcome = service.delete_node(feature.id, DeleteStrategy::DeleteOnly).unwrap();

    assert_eq!(outcome.children_reparented, 1);
    assert_eq!(child_titles(&service, project, Some(epic.id)), ["S"]);
}

#[test]
fn operations_append_activity_entries() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let other = add(&service, project, None, FeatureLevel::Epic, "Other");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    service.move_node(feature.id, Some(other.id), 0).unwrap();

    let entries = SqliteActivityLog::try_new(&conn).unwrap().list(project).unwrap();
    let actions: Vec<&str> = entries
        .iter()
        .map(|entry| entry.record.action.as_str())
        .collect();
    assert_eq!(actions, ["created", "created", "created", "moved"]);
    assert_eq!(entries[3].record.entity_id, feature.id);
}

#[test]
fn failing_activity_log_does_not_fail_the_move() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(
        &conn,
        TreeConfig::default().with_effect_mode(EffectMode::Deferred),
    );
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let other = add(&service, project, None, FeatureLevel::Epic, "Other");
    let feature = add(&service, project, Some(&epic), FeatureLevel::Feature, "F");
    let drained = service.flush_effects();
    assert!(drained.is_clean());
    assert_eq!(drained.applied, 3);

    conn.execute_batch(
        "CREATE TEMP TRIGGER reject_activity
         BEFORE INSERT ON tree_activity
         BEGIN
             SELECT RAISE(ABORT, 'activity log offline');
         END;",
    )
    .unwrap();

    let outcome = service.move_node(feature.id, Some(other.id), 0).unwrap();
    assert!(outcome.changed);
    assert_eq!(service.get_node(feature.id).unwrap().parent_id, Some(other.id));

    let report = service.flush_effects();
    assert_eq!(report.failed, 1);
    assert_eq!(report.applied, 1);
    assert!(!report.is_clean());
}

#[test]
fn deferred_renumbering_runs_on_flush() {
    let conn = open_db_in_memory().unwrap();
    let service = service_with(
        &conn,
        TreeConfig::default().with_effect_mode(EffectMode::Deferred),
    );
    let project = Uuid::new_v4();
    let left = add(&service, project, None, FeatureLevel::Epic, "Left");
    let right = add(&service, project, None, FeatureLevel::Epic, "Right");
    let a = add(&service, project, Some(&left), FeatureLevel::Feature, "A");
    let b = add(&service, project, Some(&left), FeatureLevel::Feature, "B");
    service.flush_effects();

    service.move_node(a.id, Some(right.id), 0).unwrap();
    assert_eq!(service.get_node(b.id).unwrap().position, 1);

    service.flush_effects();
    assert_eq!(service.get_node(b.id).unwrap().position, 0);
}

#[test]
fn store_failure_rolls_back_the_whole_batch() {
    let conn = open_db_in_memory().unwrap();
    let service = service(&conn);
    let project = Uuid::new_v4();
    let epic = add(&service, project, None, FeatureLevel::Epic, "E");
    let a = add(&service, project, Some(&epic), FeatureLevel::Feature, "A");
    let b = add(&service, project, Some(&epic), FeatureLevel::Feature, "B");

    conn.execute(
        &format!(
            "CREATE TEMP TRIGGER reject_sibling_write
             BEFORE UPDATE ON feature_nodes
             WHEN OLD.node_uuid = '{}'
             BEGIN
                 SELECT RAISE(ABORT, 'disk full');
             END;",
            a.id
        ),
        [],
    )
    .unwrap();

    let err = service.move_node(b.id, Some(epic.id), 0).unwrap_err();

    assert!(matches!(err, TreeServiceError::WriteFailure(_)));
    assert_eq!(err.kind(), "write_failure");
    assert_eq!(child_titles(&service, project, Some(epic.id)), ["A", "B"]);
    assert_eq!(service.get_node(b.id).unwrap().position, 1);
}
