use crate::libs::fragtree::{FragNode, FragTree, NodeId};

/// Position of a node in a post-order listing, 1-based. Slot 0 is the
/// virtual null node standing for a deleted subtree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Slot(usize);

impl Slot {
    pub const NULL: Slot = Slot(0);

    pub fn is_null(&self) -> bool {
        self.0 == 0
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

/// Post-order view of a tree: children precede their parent, slots are contiguous.
#[derive(Debug, Clone)]
pub struct PostOrder<'a> {
    tree: &'a FragTree,
    /// `ids[k - 1]` is the arena id in slot `k`
    ids: Vec<NodeId>,
    /// Child slots in child order, indexed by slot
    children: Vec<Vec<Slot>>,
    parents: Vec<Slot>,
}

impl<'a> PostOrder<'a> {
    pub fn new(tree: &'a FragTree) -> Self {
        let ids = match tree.get_root() {
            Some(root) => tree.postorder(&root),
            None => Vec::new(),
        };

        let mut slot_of = vec![Slot::NULL; tree.len()];
        for (k, &id) in ids.iter().enumerate() {
            slot_of[id] = Slot(k + 1);
        }

        let mut children = vec![Vec::new(); ids.len() + 1];
        let mut parents = vec![Slot::NULL; ids.len() + 1];
        for (k, &id) in ids.iter().enumerate() {
            if let Some(node) = tree.get_node(id) {
                children[k + 1] = node.children.iter().map(|&c| slot_of[c]).collect();
                parents[k + 1] = node.parent.map_or(Slot::NULL, |p| slot_of[p]);
            }
        }

        Self {
            tree,
            ids,
            children,
            parents,
        }
    }

    pub fn tree(&self) -> &'a FragTree {
        self.tree
    }

    /// Number of real nodes
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Every slot, the null slot first
    pub fn slots(&self) -> impl Iterator<Item = Slot> {
        (0..=self.ids.len()).map(Slot)
    }

    /// Root slot, null for an empty tree
    pub fn root(&self) -> Slot {
        Slot(self.ids.len())
    }

    pub fn node_id(&self, slot: Slot) -> Option<NodeId> {
        if slot.is_null() {
            None
        } else {
            self.ids.get(slot.0 - 1).copied()
        }
    }

    pub fn node(&self, slot: Slot) -> Option<&'a FragNode> {
        self.node_id(slot).and_then(|id| self.tree.get_node(id))
    }

    pub fn children(&self, slot: Slot) -> &[Slot] {
        &self.children[slot.0]
    }

    pub fn child(&self, slot: Slot, k: usize) -> Slot {
        self.children[slot.0][k]
    }

    pub fn degree(&self, slot: Slot) -> usize {
        self.children[slot.0].len()
    }

    pub fn parent(&self, slot: Slot) -> Slot {
        self.parents[slot.0]
    }

    pub fn max_degree(&self) -> usize {
        self.children.iter().map(|c| c.len()).max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postorder_slots() {
        let tree = FragTree::from_newick("((H2O,CO)CH4,(NH3)C2H2)root;").unwrap();
        let po = PostOrder::new(&tree);
        assert_eq!(po.len(), 6);
        assert_eq!(po.root().index(), 6);
        assert!(po.node(Slot::NULL).is_none());
        assert_eq!(po.degree(Slot::NULL), 0);

        // children always precede their parent
        for slot in po.slots().skip(1) {
            for child in po.children(slot) {
                assert!(child.index() < slot.index());
                assert_eq!(po.parent(*child), slot);
            }
        }
        assert_eq!(po.parent(po.root()), Slot::NULL);
        assert_eq!(po.node(Slot(1)).unwrap().loss_label(), "H2O");
        assert_eq!(po.degree(po.root()), 2);
        assert_eq!(po.max_degree(), 2);

        let empty = FragTree::new();
        let po = PostOrder::new(&empty);
        assert!(po.is_empty());
        assert_eq!(po.root(), Slot::NULL);
    }
}
