use uuid::Uuid;

/// Current placement of one sibling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiblingSlot {
    pub id: Uuid,
    pub position: i64,
}

/// Node being spliced into a sibling list at a requested index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedSibling {
    pub id: Uuid,
    pub target: i64,
}

/// One position write required to restore contiguity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionChange {
    pub id: Uuid,
    pub position: i64,
}

/// Result of planning one sibling set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiblingPlan {
    /// Final order, `0..n-1`.
    pub order: Vec<Uuid>,
    /// Writes for siblings whose position changed. Never includes the moved node.
    pub changes: Vec<PositionChange>,
    /// Final index of the moved node, when one was supplied.
    pub moved_position: Option<i64>,
}

/// Plans contiguous positions for one sibling set.
///
/// `siblings` must be in display order. The moved node is removed from the
/// list if present, then re-inserted at `target` clamped to
/// `[0, remaining]`. Without a moved node the existing order is kept.
pub fn plan_sibling_positions(siblings: &[SiblingSlot], moved: Option<MovedSibling>) -> SiblingPlan {
    let mut order: Vec<Uuid> = siblings
        .iter()
        .map(|slot| slot.id)
        .filter(|id| moved.map_or(true, |moved| moved.id != *id))
        .collect();

    let moved_position = moved.map(|moved| {
        let index = moved.target.clamp(0, order.len() as i64);
        order.insert(index as usize, moved.id);
        index
    });

    let mut changes = positions_for_order(&order, siblings);
    if let Some(moved) = moved {
        changes.retain(|change| change.id != moved.id);
    }

    SiblingPlan {
        order,
        changes,
        moved_position,
    }
}

/// Emits a change for every id in `order` whose index differs from its
/// current slot. Ids without a current slot always get a change.
pub fn positions_for_order(order: &[Uuid], current: &[SiblingSlot]) -> Vec<PositionChange> {
    order
        .iter()
        .enumerate()
        .filter_map(|(index, id)| {
            let position = index as i64;
            let unchanged = current
                .iter()
                .any(|slot| slot.id == *id && slot.position == position);
            (!unchanged).then_some(PositionChange { id: *id, position })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{plan_sibling_positions, positions_for_order, MovedSibling, SiblingSlot};
    use uuid::Uuid;

    fn slots(positions: &[i64]) -> Vec<SiblingSlot> {
        positions
            .iter()
            .map(|position| SiblingSlot {
                id: Uuid::new_v4(),
                position: *position,
            })
            .collect()
    }

    #[test]
    fn closes_gaps_without_a_moved_node() {
        let siblings = slots(&[0, 2, 7]);
        let plan = plan_sibling_positions(&siblings, None);

        assert_eq!(plan.order.len(), 3);
        assert_eq!(plan.moved_position, None);
        assert_eq!(plan.changes.len(), 2);
        assert_eq!(plan.changes[0].id, siblings[1].id);
        assert_eq!(plan.changes[0].position, 1);
        assert_eq!(plan.changes[1].position, 2);
    }

    #[test]
    fn contiguous_set_needs_no_writes() {
        let siblings = slots(&[0, 1, 2]);
        let plan = plan_sibling_positions(&siblings, None);
        assert!(plan.changes.is_empty());
    }

    #[test]
    fn moving_within_set_reorders_and_excludes_moved_from_changes() {
        let siblings = slots(&[0, 1, 2]);
        let moved = MovedSibling {
            id: siblings[2].id,
            target: 0,
        };
        let plan = plan_sibling_positions(&siblings, Some(moved));

        assert_eq!(
            plan.order,
            vec![siblings[2].id, siblings[0].id, siblings[1].id]
        );
        assert_eq!(plan.moved_position, Some(0));
        assert_eq!(plan.changes.len(), 2);
        assert!(plan.changes.iter().all(|change| change.id != siblings[2].id));
    }

    #[test]
    fn target_is_clamped_to_list_bounds() {
        let siblings = slots(&[0, 1]);
        let newcomer = Uuid::new_v4();

        let far = plan_sibling_positions(
            &siblings,
            Some(MovedSibling {
                id: newcomer,
                target: 99,
            }),
        );
        assert_eq!(far.moved_position, Some(2));
        assert!(far.changes.is_empty());

        let negative = plan_sibling_positions(
            &siblings,
            Some(MovedSibling {
                id: newcomer,
                target: -4,
            }),
        );
        assert_eq!(negative.moved_position, Some(0));
        assert_eq!(negative.changes.len(), 2);
    }

    #[test]
    fn unknown_ids_always_get_a_write() {
        let current = slots(&[0]);
        let stranger = Uuid::new_v4();
        let changes = positions_for_order(&[current[0].id, stranger], &current);
        assert_eq!(changes.len(), 1);
        assert_eq!(changes[0].id, stranger);
        assert_eq!(changes[0].position, 1);
    }
}
