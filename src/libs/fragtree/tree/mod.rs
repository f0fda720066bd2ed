pub mod io;
pub mod ops;
#[cfg(test)]
pub mod tests;
pub mod traversal;

use super::error::TreeError;
use super::node::{FragNode, NodeId};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

fn next_uid() -> u64 {
    NEXT_UID.fetch_add(1, Ordering::Relaxed)
}

/// A rooted, ordered fragmentation tree stored as an arena.
///
/// Every tree carries a `uid` identifying its current structure. Clones share
/// the uid of their source until one of them is restructured, so per-tree
/// memos (self-alignment scores) stay valid across cheap copies.
#[derive(Debug, Clone)]
pub struct FragTree {
    /// Arena storage for all nodes
    pub(super) nodes: Vec<FragNode>,

    /// Optional root ID (a tree might be empty or in construction)
    pub(super) root: Option<NodeId>,

    uid: u64,
}

impl Default for FragTree {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            uid: next_uid(),
        }
    }
}

impl FragTree {
    /// Create a new empty tree
    pub fn new() -> Self {
        Self::default()
    }

    /// Structure identity of this tree
    pub fn uid(&self) -> u64 {
        self.uid
    }

    pub(super) fn touch(&mut self) {
        self.uid = next_uid();
    }

    /// Add a new node to the tree. Returns the new node's ID.
    pub fn add_node(&mut self) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(FragNode::new(id));
        self.touch();
        id
    }

    /// Get number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Get root ID
    pub fn get_root(&self) -> Option<NodeId> {
        self.root
    }

    /// Get a reference to a node by ID.
    pub fn get_node(&self, id: NodeId) -> Option<&FragNode> {
        self.nodes.get(id)
    }

    /// Get a mutable reference to a node by ID. Renews the uid.
    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut FragNode> {
        self.touch();
        self.nodes.get_mut(id)
    }

    /// Iterate all nodes in arena order
    pub fn nodes(&self) -> impl Iterator<Item = &FragNode> {
        self.nodes.iter()
    }

    /// Set a node as the root of the tree.
    pub fn set_root(&mut self, id: NodeId) {
        if self.get_node(id).is_some() {
            self.root = Some(id);
            self.touch();
        }
    }

    /// Name of the tree, taken from the root node
    pub fn name(&self) -> Option<&str> {
        self.root
            .and_then(|r| self.get_node(r))
            .and_then(|n| n.name.as_deref())
    }

    // --- Delegation to ops ---

    pub fn add_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), TreeError> {
        ops::add_child(self, parent_id, child_id)
    }

    pub fn pull_up(&mut self, id: NodeId) -> Result<NodeId, TreeError> {
        ops::pull_up(self, id)
    }

    pub fn shuffle_children<R: rand::Rng + ?Sized>(&mut self, rng: &mut R) {
        ops::shuffle_children(self, rng)
    }

    pub fn shuffled(&self, seed: u64) -> FragTree {
        ops::shuffled(self, seed)
    }

    pub fn random(num_nodes: usize, out_degree: usize, losses: &[crate::libs::formula::Formula]) -> FragTree {
        ops::random(num_nodes, out_degree, losses)
    }

    // --- Delegation to traversal ---

    pub fn preorder(&self, start_node: &NodeId) -> Vec<NodeId> {
        traversal::preorder(self, *start_node)
    }

    pub fn postorder(&self, start_node: &NodeId) -> Vec<NodeId> {
        traversal::postorder(self, *start_node)
    }

    pub fn get_leaves(&self) -> Vec<NodeId> {
        self.nodes.iter().filter(|n| n.is_leaf()).map(|n| n.id).collect()
    }

    pub fn max_degree(&self) -> usize {
        self.nodes.iter().map(|n| n.degree()).max().unwrap_or(0)
    }

    pub fn depth(&self) -> usize {
        traversal::depth(self)
    }

    // --- Delegation to io ---

    pub fn from_file(infile: &str) -> anyhow::Result<Vec<FragTree>> {
        io::from_file(infile)
    }

    pub fn to_newick(&self) -> String {
        io::to_newick(self)
    }
}
