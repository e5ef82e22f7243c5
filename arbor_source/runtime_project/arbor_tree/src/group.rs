use ahash::{AHashMap, AHashSet};
use arbor_ids::NodeID;

/// Tag → node-set secondary index. The tree owns node lifetime; this only
/// tracks membership. A tag with no members does not exist — removal that
/// empties a set drops the tag entry with it.
#[derive(Default)]
pub struct GroupIndex {
    groups: AHashMap<String, AHashSet<NodeID>>,
}

impl GroupIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the node was newly added to the tag.
    pub fn insert(&mut self, tag: &str, node: NodeID) -> bool {
        if let Some(set) = self.groups.get_mut(tag) {
            set.insert(node)
        } else {
            let mut set = AHashSet::with_capacity(1);
            set.insert(node);
            self.groups.insert(tag.to_string(), set);
            true
        }
    }

    /// Returns true if the node was actually a member.
    pub fn remove(&mut self, tag: &str, node: NodeID) -> bool {
        let Some(set) = self.groups.get_mut(tag) else {
            return false;
        };
        let removed = set.remove(&node);
        if removed && set.is_empty() {
            self.groups.remove(tag);
        }
        removed
    }

    /// Snapshot of the tag's members, in arbitrary order.
    pub fn nodes(&self, tag: &str) -> Vec<NodeID> {
        self.groups
            .get(tag)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// One arbitrary member, or None for an unknown tag.
    pub fn first(&self, tag: &str) -> Option<NodeID> {
        self.groups.get(tag).and_then(|set| set.iter().next().copied())
    }

    pub fn has(&self, tag: &str) -> bool {
        self.groups.contains_key(tag)
    }

    pub fn tags(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }

    /// Remove the node from every tag it belongs to. Used when a node is
    /// destroyed, so no set ever holds a freed ID.
    pub fn strip_node(&mut self, node: NodeID) {
        self.groups.retain(|_, set| {
            set.remove(&node);
            !set.is_empty()
        });
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }
}
