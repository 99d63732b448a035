use std::collections::{HashMap, HashSet};
use uuid::Uuid;

use super::renumber::SiblingSlot;

/// Minimal shape a node needs to live in a [`TreeIndex`].
pub trait TreeItem {
    fn id(&self) -> Uuid;
    fn parent_id(&self) -> Option<Uuid>;
    fn position(&self) -> i64;
}

/// Arena of one project's active nodes plus a children adjacency map.
#[derive(Debug, Clone)]
pub struct TreeIndex<T> {
    nodes: HashMap<Uuid, T>,
    children: HashMap<Option<Uuid>, Vec<Uuid>>,
}

impl<T: TreeItem> TreeIndex<T> {
    /// Builds the index from an unordered node set.
    pub fn new(items: impl IntoIterator<Item = T>) -> Self {
        let nodes: HashMap<Uuid, T> = items.into_iter().map(|item| (item.id(), item)).collect();

        let mut children: HashMap<Option<Uuid>, Vec<Uuid>> = HashMap::new();
        for node in nodes.values() {
            children.entry(node.parent_id()).or_default().push(node.id());
        }
        for ids in children.values_mut() {
            ids.sort_by_key(|id| (nodes[id].position(), *id));
        }

        Self { nodes, children }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: Uuid) -> Option<&T> {
        self.nodes.get(&id)
    }

    /// Ordered direct child ids of `parent` (`None` = root level).
    pub fn child_ids(&self, parent: Option<Uuid>) -> &[Uuid] {
        self.children.get(&parent).map_or(&[], Vec::as_slice)
    }

    /// Ordered direct children of `parent` (`None` = root level).
    pub fn children(&self, parent: Option<Uuid>) -> Vec<&T> {
        self.child_ids(parent)
            .iter()
            .filter_map(|id| self.nodes.get(id))
            .collect()
    }

    /// Sibling slots under `parent`, in display order.
    pub fn sibling_slots(&self, parent: Option<Uuid>) -> Vec<SiblingSlot> {
        self.children(parent)
            .into_iter()
            .map(|node| SiblingSlot {
                id: node.id(),
                position: node.position(),
            })
            .collect()
    }

    /// Number of nodes on the chain from `id` up to the root, `id` included.
    ///
    /// A root-level node has depth 1. A node missing from the index has
    /// depth 0. The walk stops at a parent that is not indexed (deleted or
    /// out of project scope).
    pub fn ancestor_depth(&self, id: Uuid) -> usize {
        let mut depth = 0;
        let mut visited = HashSet::new();
        let mut cursor = self.nodes.get(&id);
        while let Some(node) = cursor {
            if !visited.insert(node.id()) {
                break;
            }
            depth += 1;
            cursor = node.parent_id().and_then(|parent| self.nodes.get(&parent));
        }
        depth
    }

    /// Longest downward path from `id` to a leaf; 0 for a leaf.
    pub fn subtree_height(&self, id: Uuid) -> usize {
        let mut seen = HashSet::new();
        self.height_from(id, &mut seen)
    }

    fn height_from(&self, id: Uuid, seen: &mut HashSet<Uuid>) -> usize {
        if !seen.insert(id) {
            return 0;
        }
        let mut height = 0;
        for child in self.child_ids(Some(id)) {
            height = height.max(1 + self.height_from(*child, seen));
        }
        height
    }

    /// Whether `candidate` is `ancestor` or sits anywhere below it.
    pub fn is_descendant(&self, ancestor: Uuid, candidate: Uuid) -> bool {
        if ancestor == candidate {
            return true;
        }
        let mut visited = HashSet::new();
        let mut cursor = self.nodes.get(&candidate).and_then(|node| node.parent_id());
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            if !visited.insert(current) {
                return false;
            }
            cursor = self.nodes.get(&current).and_then(|node| node.parent_id());
        }
        false
    }

    /// Every descendant of `id` in post-order (children before parents).
    pub fn descendants(&self, id: Uuid) -> Vec<Uuid> {
        let mut out = Vec::new();
        let mut seen = HashSet::from([id]);
        self.collect_post_order(id, &mut seen, &mut out);
        out
    }

    fn collect_post_order(&self, id: Uuid, seen: &mut HashSet<Uuid>, out: &mut Vec<Uuid>) {
        for child in self.child_ids(Some(id)) {
            if seen.insert(*child) {
                self.collect_post_order(*child, seen, out);
                out.push(*child);
            }
        }
    }
}
