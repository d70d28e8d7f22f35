use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::host::model::GeometryStamp;
use crate::scene::identity::IdentityHash;
use crate::scene::node::ExportableNode;

/// Arena of exportable nodes keyed by identity, plus geometry modification stamps.
///
/// Holds at most one node per identity. Nodes live until a walk pass completes without touching
/// them ([`NodeCache::retire_stale`]) or until [`NodeCache::clear`]; the walker only borrows them.
#[derive(Debug, Default)]
pub struct NodeCache {
    nodes: HashMap<IdentityHash, ExportableNode>,
    geometry: HashMap<String, GeometryStamp>,
    pass: u64,
}

impl NodeCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a walk pass. Nodes not looked up before the next [`NodeCache::retire_stale`] are
    /// retired by it.
    pub fn begin_pass(&mut self) -> u64 {
        self.pass += 1;
        self.pass
    }

    /// Borrow the node for `identity`, creating it with `make` when absent, and mark it as
    /// touched by the current pass.
    ///
    /// The flag is `true` when the node was created by this call.
    pub fn lookup_or_create(
        &mut self,
        identity: IdentityHash,
        make: impl FnOnce() -> ExportableNode,
    ) -> (&mut ExportableNode, bool) {
        let (node, is_new) = match self.nodes.entry(identity) {
            Entry::Occupied(e) => (e.into_mut(), false),
            Entry::Vacant(e) => (e.insert(make()), true),
        };
        node.pass = self.pass;
        (node, is_new)
    }

    /// Borrow a cached node.
    pub fn get(&self, identity: &IdentityHash) -> Option<&ExportableNode> {
        self.nodes.get(identity)
    }

    /// Remove and return the nodes the current pass did not touch, ordered by name.
    pub fn retire_stale(&mut self) -> Vec<ExportableNode> {
        let pass = self.pass;
        let mut stale: Vec<ExportableNode> = self
            .nodes
            .extract_if(|_, node| node.pass != pass)
            .map(|(_, node)| node)
            .collect();
        stale.sort_by(|a, b| a.name.cmp(&b.name));
        stale
    }

    /// Return `true` when geometry `name` was never exported or its stamp differs.
    pub fn geometry_changed(&self, name: &str, stamp: GeometryStamp) -> bool {
        self.geometry.get(name) != Some(&stamp)
    }

    /// Record that geometry `name` was exported at `stamp`.
    pub fn mark_geometry(&mut self, name: impl Into<String>, stamp: GeometryStamp) {
        self.geometry.insert(name.into(), stamp);
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Return `true` when no node is live.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Drop every node and geometry stamp.
    pub fn clear(&mut self) {
        if !self.nodes.is_empty() {
            tracing::debug!(nodes = self.nodes.len(), "node cache cleared");
        }
        self.nodes.clear();
        self.geometry.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/scene/cache.rs"]
mod tests;
