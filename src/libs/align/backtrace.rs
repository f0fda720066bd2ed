use crate::libs::align::config::AlignMode;
use crate::libs::align::engine::{CellRef, ForestAlignment, ForestTables, Step, FUSED_LEFT, PLAIN};
use crate::libs::fragtree::{FragTree, NodeId};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairKind {
    /// The two nodes the alignment is anchored at
    Root,
    Matched,
    /// A node aligned to nothing
    Gap,
    /// The node on `Side` was merged with its parent before matching
    Fused(Side),
    /// The node on `Side` dissolved into its parent
    Dissolved(Side),
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PairKind::Root => write!(f, "root"),
            PairKind::Matched => write!(f, "match"),
            PairKind::Gap => write!(f, "gap"),
            PairKind::Fused(Side::Left) => write!(f, "fused-left"),
            PairKind::Fused(Side::Right) => write!(f, "fused-right"),
            PairKind::Dissolved(Side::Left) => write!(f, "dissolved-left"),
            PairKind::Dissolved(Side::Right) => write!(f, "dissolved-right"),
        }
    }
}

/// One node of the correspondence tree.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedPair {
    pub left: Option<NodeId>,
    pub right: Option<NodeId>,
    /// Contribution of this step to the total score
    pub score: f32,
    pub kind: PairKind,
    pub children: Vec<usize>,
}

/// Correspondence tree rebuilt from the traceback, pair 0 is the root.
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentTree {
    pairs: Vec<AlignedPair>,
}

impl AlignmentTree {
    /// Replay the traceback from the winning cell. Reads the tables only.
    pub fn reconstruct(alignment: &ForestAlignment) -> Self {
        let tables = &alignment.tables;
        let best = alignment.best;
        let mut tree = AlignmentTree {
            pairs: vec![AlignedPair {
                left: tables.left.node_id(best.i),
                right: tables.right.node_id(best.j),
                score: alignment.anchor,
                kind: PairKind::Root,
                children: vec![],
            }],
        };
        tree.replay(tables, best, 0);
        tree
    }

    fn replay(&mut self, tables: &ForestTables, cell: CellRef, parent: usize) {
        let mut pending = vec![(cell, parent)];
        while let Some((cell, parent)) = pending.pop() {
            let value = tables.value(cell);
            if tables.mode() == AlignMode::Local && value <= 0.0 {
                continue;
            }
            let Some(split) = tables.split(cell) else {
                continue;
            };

            let kind = match split.step {
                Step::Match { .. } if cell.variant == PLAIN => PairKind::Matched,
                Step::Match { .. } if cell.variant == FUSED_LEFT => PairKind::Fused(Side::Left),
                Step::Match { .. } => PairKind::Fused(Side::Right),
                Step::DissolveLeft { .. } => PairKind::Dissolved(Side::Left),
                Step::DissolveRight { .. } => PairKind::Dissolved(Side::Right),
                _ => PairKind::Gap,
            };
            let score = value - tables.value(split.rest) - tables.value(split.below);

            let idx = self.pairs.len();
            self.pairs.push(AlignedPair {
                left: tables.left.node_id(split.left),
                right: tables.right.node_id(split.right),
                score,
                kind,
                children: vec![],
            });
            self.pairs[parent].children.push(idx);

            // siblings are replayed after the subtree below the new pair
            pending.push((split.rest, parent));
            pending.push((split.below, idx));
        }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn root(&self) -> &AlignedPair {
        &self.pairs[0]
    }

    pub fn get(&self, idx: usize) -> Option<&AlignedPair> {
        self.pairs.get(idx)
    }

    pub fn pairs(&self) -> &[AlignedPair] {
        &self.pairs
    }

    /// Pairs with a node on both sides, the root pair included
    pub fn matched(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| p.left.is_some() && p.right.is_some())
            .count()
    }

    pub fn gaps(&self) -> usize {
        self.pairs.iter().filter(|p| p.kind == PairKind::Gap).count()
    }

    /// Fused and dissolved nodes
    pub fn unions(&self) -> usize {
        self.pairs
            .iter()
            .filter(|p| matches!(p.kind, PairKind::Fused(_) | PairKind::Dissolved(_)))
            .count()
    }

    /// Sum of all contributions
    pub fn total(&self) -> f32 {
        self.pairs.iter().map(|p| p.score).sum()
    }

    /// Indented text rendering, one pair per line
    pub fn render(&self, left: &FragTree, right: &FragTree) -> Vec<String> {
        let label = |tree: &FragTree, id: Option<NodeId>| -> String {
            match id.and_then(|id| tree.get_node(id)) {
                Some(node) if node.is_root() => node.name.clone().unwrap_or("root".to_string()),
                Some(node) => node.loss_label(),
                None => "-".to_string(),
            }
        };

        let mut lines = vec![];
        let mut stack = vec![(0usize, 0usize)];
        while let Some((idx, depth)) = stack.pop() {
            let pair = &self.pairs[idx];
            lines.push(format!(
                "{}{} <-> {}\t{}\t{}",
                "  ".repeat(depth),
                label(left, pair.left),
                label(right, pair.right),
                pair.score,
                pair.kind
            ));
            for &child in pair.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        lines
    }
}
