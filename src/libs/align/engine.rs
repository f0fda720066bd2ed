use crate::libs::align::config::{AlignConfig, AlignMode};
use crate::libs::align::error::AlignError;
use crate::libs::align::postorder::{PostOrder, Slot};
use crate::libs::align::scoring::ScoringModel;
use crate::libs::align::subset::{ChildSubset, SubsetCache};
use crate::libs::fragtree::{FragNode, FragTree};
use fxhash::FxHashMap;
use petgraph::graph::{DiGraph, NodeIndex};

/// Plain alignment of two child sets
pub const PLAIN: usize = 0;
/// Children of the left node are fused with it before matching
pub const FUSED_LEFT: usize = 1;
/// Children of the right node are fused with it before matching
pub const FUSED_RIGHT: usize = 2;

/// Which recurrence case produced a forest value.
///
/// Child positions index the children of the cell's own nodes, subsets are
/// the part of the other side's children handed down to the removed child.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    /// Both child sets empty
    #[default]
    Empty,
    /// Nothing beats the floor; the value is 0 or unreachable
    Stop,
    /// Left set empty, the first right child is deleted
    GapRight,
    /// Right set empty, the first left child is deleted
    GapLeft,
    Match { c1: usize, c2: usize },
    DeleteLeft { c1: usize, sub: ChildSubset },
    DeleteRight { sub: ChildSubset, c2: usize },
    /// The left child dissolves into its parent, its children join the parent's
    DissolveLeft { c1: usize, sub: ChildSubset },
    DissolveRight { sub: ChildSubset, c2: usize },
}

/// Address of one forest value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellRef {
    pub i: Slot,
    pub j: Slot,
    pub s1: ChildSubset,
    pub s2: ChildSubset,
    pub variant: usize,
}

impl CellRef {
    pub fn new(i: Slot, j: Slot, s1: ChildSubset, s2: ChildSubset, variant: usize) -> Self {
        Self {
            i,
            j,
            s1,
            s2,
            variant,
        }
    }
}

/// The two sub-problems a step splits a cell into.
#[derive(Debug, Clone, Copy)]
pub struct Split {
    pub step: Step,
    /// Alignment below the removed child (or children)
    pub below: CellRef,
    /// Remaining siblings, still under the same pair of nodes
    pub rest: CellRef,
    /// Node removed from the left side, if any
    pub left: Slot,
    /// Node removed from the right side, if any
    pub right: Slot,
}

#[derive(Debug, Clone)]
struct Cell {
    w2: usize,
    values: Vec<[f32; 3]>,
    steps: Vec<[Step; 3]>,
}

impl Cell {
    fn new(deg1: usize, deg2: usize) -> Self {
        let w2 = 1usize << deg2;
        let size = (1usize << deg1) * w2;
        Self {
            w2,
            values: vec![[f32::NEG_INFINITY; 3]; size],
            steps: vec![[Step::Stop; 3]; size],
        }
    }

    fn at(&self, s1: ChildSubset, s2: ChildSubset) -> usize {
        s1.0 as usize * self.w2 + s2.0 as usize
    }
}

/// Score and traceback tables of one alignment call.
#[derive(Debug, Clone)]
pub struct ForestTables<'a> {
    pub left: PostOrder<'a>,
    pub right: PostOrder<'a>,
    mode: AlignMode,
    node_union: bool,
    union_score: f32,
    n2: usize,
    pair: Vec<f32>,
    union: Vec<[f32; 2]>,
    cells: Vec<Cell>,
}

/// Outcome of the engine.
#[derive(Debug, Clone)]
pub enum EngineOutcome<'a> {
    Aligned(ForestAlignment<'a>),
    /// The best attainable score is below the threshold; nothing was filled
    BelowThreshold,
}

/// Filled tables and the winning cell.
#[derive(Debug, Clone)]
pub struct ForestAlignment<'a> {
    pub tables: ForestTables<'a>,
    pub best: CellRef,
    /// Root contribution added on top of the forest value
    pub anchor: f32,
    pub score: f32,
}

/// Fail fast on trees whose branching exceeds the configured bound.
pub fn check_degree(tree: &FragTree, config: &AlignConfig) -> Result<(), AlignError> {
    let degree = tree.max_degree();
    let limit = config.degree_limit();
    if degree > limit {
        return Err(AlignError::TooBushy { degree, limit });
    }
    Ok(())
}

/// Run the forest alignment of `t1` against `t2`.
pub fn align_forests<'a>(
    scoring: &dyn ScoringModel,
    config: &AlignConfig,
    t1: &'a FragTree,
    t2: &'a FragTree,
) -> Result<EngineOutcome<'a>, AlignError> {
    check_degree(t1, config)?;
    check_degree(t2, config)?;

    let mut tables = ForestTables::new(scoring, config, t1, t2);
    if let Some(threshold) = config.threshold {
        let (sum1, sum2) = tables.best_attainable();
        if sum1.min(sum2) < threshold {
            log::info!(
                "Best attainable score {} below threshold {}",
                sum1.min(sum2),
                threshold
            );
            return Ok(EngineOutcome::BelowThreshold);
        }
    }

    tables.fill(SubsetCache::global())?;
    let (best, anchor) = tables.select(scoring, config);
    let score = tables.value(best) + anchor;
    Ok(EngineOutcome::Aligned(ForestAlignment {
        tables,
        best,
        anchor,
        score,
    }))
}

impl<'a> ForestTables<'a> {
    fn new(
        scoring: &dyn ScoringModel,
        config: &AlignConfig,
        t1: &'a FragTree,
        t2: &'a FragTree,
    ) -> Self {
        let left = PostOrder::new(t1);
        let right = PostOrder::new(t2);
        let n1 = left.len() + 1;
        let n2 = right.len() + 1;

        let mut pair = vec![0.0; n1 * n2];
        let mut union = vec![[f32::NEG_INFINITY; 2]; n1 * n2];
        for i in left.slots() {
            let a = left.node(i);
            for j in right.slots() {
                let b = right.node(j);
                let idx = i.index() * n2 + j.index();
                pair[idx] = scoring.score(a, b);
                if config.node_union {
                    if let (Some(a), Some(pa)) = (a, left.node(left.parent(i))) {
                        union[idx][0] = scoring.score_union(a, pa, b);
                    }
                    if let (Some(b), Some(pb)) = (b, right.node(right.parent(j))) {
                        union[idx][1] = scoring.score_union(b, pb, a);
                    }
                }
            }
        }
        log::debug!(
            "Score tables {} x {}, max degree {} / {}",
            n1,
            n2,
            left.max_degree(),
            right.max_degree()
        );

        Self {
            left,
            right,
            mode: config.mode,
            node_union: config.node_union,
            union_score: scoring.union_score(),
            n2,
            pair,
            union,
            cells: Vec::with_capacity(n1 * n2),
        }
    }

    pub fn mode(&self) -> AlignMode {
        self.mode
    }

    pub fn pair(&self, i: Slot, j: Slot) -> f32 {
        self.pair[i.index() * self.n2 + j.index()]
    }

    /// `side` 0: left node fused with its parent, 1: right node fused with its parent
    pub fn union(&self, i: Slot, j: Slot, side: usize) -> f32 {
        self.union[i.index() * self.n2 + j.index()][side]
    }

    pub fn value(&self, c: CellRef) -> f32 {
        let cell = &self.cells[c.i.index() * self.n2 + c.j.index()];
        cell.values[cell.at(c.s1, c.s2)][c.variant]
    }

    pub fn step(&self, c: CellRef) -> Step {
        let cell = &self.cells[c.i.index() * self.n2 + c.j.index()];
        cell.steps[cell.at(c.s1, c.s2)][c.variant]
    }

    fn full1(&self, i: Slot) -> ChildSubset {
        ChildSubset::full(self.left.degree(i))
    }

    fn full2(&self, j: Slot) -> ChildSubset {
        ChildSubset::full(self.right.degree(j))
    }

    /// Sums over both trees of each node's best pair score
    fn best_attainable(&self) -> (f32, f32) {
        let start = if self.mode == AlignMode::Local {
            0.0
        } else {
            f32::NEG_INFINITY
        };
        let mut max1 = vec![start; self.left.len() + 1];
        let mut max2 = vec![start; self.right.len() + 1];
        for i in self.left.slots() {
            for j in self.right.slots() {
                let mut s = self.pair(i, j);
                if self.node_union {
                    if !i.is_null() {
                        s = s.max(self.union(i, j, 0));
                    }
                    if !j.is_null() {
                        s = s.max(self.union(i, j, 1));
                    }
                }
                max1[i.index()] = max1[i.index()].max(s);
                max2[j.index()] = max2[j.index()].max(s);
            }
        }
        (max1[1..].iter().sum(), max2[1..].iter().sum())
    }

    /// Fill every cell: nodes in post-order, subsets by ascending size
    fn fill(&mut self, cache: &SubsetCache) -> Result<(), AlignError> {
        let left_slots: Vec<Slot> = self.left.slots().collect();
        let right_slots: Vec<Slot> = self.right.slots().collect();
        for &i in &left_slots {
            let deg1 = self.left.degree(i);
            let order1 = cache.get(deg1)?;
            for &j in &right_slots {
                let deg2 = self.right.degree(j);
                let order2 = cache.get(deg2)?;
                self.cells.push(Cell::new(deg1, deg2));
                for &s1 in order1.order() {
                    for &s2 in order2.order() {
                        let computed = self.recur(i, j, s1, s2);
                        if let Some(cell) = self.cells.last_mut() {
                            let at = cell.at(s1, s2);
                            cell.values[at] = computed.0;
                            cell.steps[at] = computed.1;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn variants(&self) -> usize {
        if self.node_union {
            3
        } else {
            1
        }
    }

    /// Clamp a value of a gap-only case; raised values stop the traceback
    fn clamp(&self, value: f32, step: Step) -> (f32, Step) {
        if self.mode != AlignMode::Global && value < 0.0 {
            (0.0, Step::Stop)
        } else if value == f32::NEG_INFINITY {
            (value, Step::Stop)
        } else {
            (value, step)
        }
    }

    fn recur(&self, i: Slot, j: Slot, s1: ChildSubset, s2: ChildSubset) -> ([f32; 3], [Step; 3]) {
        let mut values = [f32::NEG_INFINITY; 3];
        let mut steps = [Step::Stop; 3];

        if s1.is_empty() && s2.is_empty() {
            let nn = self.pair(Slot::NULL, Slot::NULL);
            for v in 0..self.variants() {
                (values[v], steps[v]) = self.clamp(nn, Step::Empty);
            }
            return (values, steps);
        }

        if s1.is_empty() {
            let (split, below) = self.gap_right(j, s2);
            let rest = s2.without(ChildSubset::singleton(split));
            let child = self.right.child(j, split);
            let rest_cell = |v| CellRef::new(Slot::NULL, j, ChildSubset::EMPTY, rest, v);
            let v0 = self.pair(Slot::NULL, child) + below + self.value(rest_cell(PLAIN));
            (values[PLAIN], steps[PLAIN]) = self.clamp(v0, Step::GapRight);
            if self.node_union {
                (values[FUSED_LEFT], steps[FUSED_LEFT]) =
                    self.clamp(f32::NEG_INFINITY, Step::GapRight);
                let v2 = self.union(Slot::NULL, child, 1)
                    + below
                    + self.value(rest_cell(FUSED_RIGHT));
                (values[FUSED_RIGHT], steps[FUSED_RIGHT]) = self.clamp(v2, Step::GapRight);
            }
            return (values, steps);
        }

        if s2.is_empty() {
            let (split, below) = self.gap_left(i, s1);
            let rest = s1.without(ChildSubset::singleton(split));
            let child = self.left.child(i, split);
            let rest_cell = |v| CellRef::new(i, Slot::NULL, rest, ChildSubset::EMPTY, v);
            let v0 = self.pair(child, Slot::NULL) + below + self.value(rest_cell(PLAIN));
            (values[PLAIN], steps[PLAIN]) = self.clamp(v0, Step::GapLeft);
            if self.node_union {
                let v1 = self.union(child, Slot::NULL, 0)
                    + below
                    + self.value(rest_cell(FUSED_LEFT));
                (values[FUSED_LEFT], steps[FUSED_LEFT]) = self.clamp(v1, Step::GapLeft);
                (values[FUSED_RIGHT], steps[FUSED_RIGHT]) =
                    self.clamp(f32::NEG_INFINITY, Step::GapLeft);
            }
            return (values, steps);
        }

        let floor = if self.mode == AlignMode::Local {
            0.0
        } else {
            f32::NEG_INFINITY
        };
        values = [floor; 3];
        let mut offer = |v: usize, score: f32, step: Step| {
            if score > values[v] {
                values[v] = score;
                steps[v] = step;
            }
        };

        // matched children
        for c1 in s1.singletons() {
            let a = self.left.child(i, c1);
            let r1 = s1.without(ChildSubset::singleton(c1));
            for c2 in s2.singletons() {
                let b = self.right.child(j, c2);
                let r2 = s2.without(ChildSubset::singleton(c2));
                let below = self.value(CellRef::new(a, b, self.full1(a), self.full2(b), PLAIN));
                let rest = |v| self.value(CellRef::new(i, j, r1, r2, v));
                let step = Step::Match { c1, c2 };
                offer(PLAIN, self.pair(a, b) + below + rest(PLAIN), step);
                if self.node_union {
                    offer(FUSED_LEFT, self.union(a, b, 0) + below + rest(FUSED_LEFT), step);
                    offer(FUSED_RIGHT, self.union(a, b, 1) + below + rest(FUSED_RIGHT), step);
                }
            }
        }

        // left child deleted, part of the right children moves below it
        for c1 in s1.singletons() {
            let a = self.left.child(i, c1);
            let f1 = self.full1(a);
            let r1 = s1.without(ChildSubset::singleton(c1));
            for sub in s2.sub_masks() {
                let r2 = s2.without(sub);
                let below = self.value(CellRef::new(a, j, f1, sub, PLAIN));
                let gap = self.pair(a, Slot::NULL) + below;
                for v in 0..self.variants() {
                    let rest = self.value(CellRef::new(i, j, r1, r2, v));
                    offer(v, gap + rest, Step::DeleteLeft { c1, sub });
                }
                if self.node_union && !f1.is_empty() {
                    let dissolved = self.union_score
                        + self.value(CellRef::new(a, j, f1, sub, FUSED_LEFT))
                        + self.value(CellRef::new(i, j, r1, r2, PLAIN));
                    offer(PLAIN, dissolved, Step::DissolveLeft { c1, sub });
                }
            }
        }

        // right child deleted
        for c2 in s2.singletons() {
            let b = self.right.child(j, c2);
            let f2 = self.full2(b);
            let r2 = s2.without(ChildSubset::singleton(c2));
            for sub in s1.sub_masks() {
                let r1 = s1.without(sub);
                let below = self.value(CellRef::new(i, b, sub, f2, PLAIN));
                let gap = self.pair(Slot::NULL, b) + below;
                for v in 0..self.variants() {
                    let rest = self.value(CellRef::new(i, j, r1, r2, v));
                    offer(v, gap + rest, Step::DeleteRight { sub, c2 });
                }
                if self.node_union && !f2.is_empty() {
                    let dissolved = self.union_score
                        + self.value(CellRef::new(i, b, sub, f2, FUSED_RIGHT))
                        + self.value(CellRef::new(i, j, r1, r2, PLAIN));
                    offer(PLAIN, dissolved, Step::DissolveRight { sub, c2 });
                }
            }
        }

        if !self.node_union {
            values[FUSED_LEFT] = f32::NEG_INFINITY;
            values[FUSED_RIGHT] = f32::NEG_INFINITY;
            steps[FUSED_LEFT] = Step::Stop;
            steps[FUSED_RIGHT] = Step::Stop;
        }
        (values, steps)
    }

    /// First right child of `s2` and the value of deleting its subtree
    fn gap_right(&self, j: Slot, s2: ChildSubset) -> (usize, f32) {
        let split = s2.first().unwrap_or(0);
        let b = self.right.child(j, split);
        let below = self.value(CellRef::new(
            Slot::NULL,
            b,
            ChildSubset::EMPTY,
            self.full2(b),
            PLAIN,
        ));
        (split, below)
    }

    fn gap_left(&self, i: Slot, s1: ChildSubset) -> (usize, f32) {
        let split = s1.first().unwrap_or(0);
        let a = self.left.child(i, split);
        let below = self.value(CellRef::new(
            a,
            Slot::NULL,
            self.full1(a),
            ChildSubset::EMPTY,
            PLAIN,
        ));
        (split, below)
    }

    /// Root contribution for a cell rooted at `(i, j)`
    fn anchor(&self, scoring: &dyn ScoringModel, config: &AlignConfig, i: Slot, j: Slot) -> f32 {
        match (config.score_root, self.left.node(i), self.right.node(j)) {
            (true, Some(a), Some(b)) => scoring.root_score(a, b),
            _ => 0.0,
        }
    }

    /// The winning cell and its root contribution
    fn select(&self, scoring: &dyn ScoringModel, config: &AlignConfig) -> (CellRef, f32) {
        let root1 = self.left.root();
        let root2 = self.right.root();
        if self.mode == AlignMode::Global {
            let best = CellRef::new(root1, root2, self.full1(root1), self.full2(root2), PLAIN);
            return (best, self.anchor(scoring, config, root1, root2));
        }

        let mut best = CellRef::new(root1, root2, self.full1(root1), self.full2(root2), PLAIN);
        let mut best_anchor = self.anchor(scoring, config, root1, root2);
        let mut best_score = f32::NEG_INFINITY;
        for i in self.left.slots() {
            let full1 = self.full1(i);
            for j in self.right.slots() {
                let full2 = self.full2(j);
                let anchor = self.anchor(scoring, config, i, j);
                for m1 in 0..=full1.0 {
                    let s1 = ChildSubset(m1);
                    for m2 in 0..=full2.0 {
                        let s2 = ChildSubset(m2);
                        if self.mode == AlignMode::EndGapFree
                            && !((i == root1 && s1 == full1) || (j == root2 && s2 == full2))
                        {
                            continue;
                        }
                        let cell = CellRef::new(i, j, s1, s2, PLAIN);
                        let score = self.value(cell) + anchor;
                        if score > best_score {
                            best_score = score;
                            best = cell;
                            best_anchor = anchor;
                        }
                    }
                }
            }
        }
        (best, best_anchor)
    }

    /// How the value of `c` decomposes, `None` for terminal steps
    pub fn split(&self, c: CellRef) -> Option<Split> {
        let step = self.step(c);
        let (i, j, s1, s2, v) = (c.i, c.j, c.s1, c.s2, c.variant);
        let split = match step {
            Step::Empty | Step::Stop => return None,
            Step::GapRight => {
                let k = s2.first()?;
                let b = self.right.child(j, k);
                Split {
                    step,
                    below: CellRef::new(Slot::NULL, b, ChildSubset::EMPTY, self.full2(b), PLAIN),
                    rest: CellRef::new(
                        Slot::NULL,
                        j,
                        ChildSubset::EMPTY,
                        s2.without(ChildSubset::singleton(k)),
                        v,
                    ),
                    left: Slot::NULL,
                    right: b,
                }
            }
            Step::GapLeft => {
                let k = s1.first()?;
                let a = self.left.child(i, k);
                Split {
                    step,
                    below: CellRef::new(a, Slot::NULL, self.full1(a), ChildSubset::EMPTY, PLAIN),
                    rest: CellRef::new(
                        i,
                        Slot::NULL,
                        s1.without(ChildSubset::singleton(k)),
                        ChildSubset::EMPTY,
                        v,
                    ),
                    left: a,
                    right: Slot::NULL,
                }
            }
            Step::Match { c1, c2 } => {
                let a = self.left.child(i, c1);
                let b = self.right.child(j, c2);
                Split {
                    step,
                    below: CellRef::new(a, b, self.full1(a), self.full2(b), PLAIN),
                    rest: CellRef::new(
                        i,
                        j,
                        s1.without(ChildSubset::singleton(c1)),
                        s2.without(ChildSubset::singleton(c2)),
                        v,
                    ),
                    left: a,
                    right: b,
                }
            }
            Step::DeleteLeft { c1, sub } | Step::DissolveLeft { c1, sub } => {
                let a = self.left.child(i, c1);
                let (below_v, rest_v) = match step {
                    Step::DissolveLeft { .. } => (FUSED_LEFT, PLAIN),
                    _ => (PLAIN, v),
                };
                Split {
                    step,
                    below: CellRef::new(a, j, self.full1(a), sub, below_v),
                    rest: CellRef::new(
                        i,
                        j,
                        s1.without(ChildSubset::singleton(c1)),
                        s2.without(sub),
                        rest_v,
                    ),
                    left: a,
                    right: Slot::NULL,
                }
            }
            Step::DeleteRight { sub, c2 } | Step::DissolveRight { sub, c2 } => {
                let b = self.right.child(j, c2);
                let (below_v, rest_v) = match step {
                    Step::DissolveRight { .. } => (FUSED_RIGHT, PLAIN),
                    _ => (PLAIN, v),
                };
                Split {
                    step,
                    below: CellRef::new(i, b, sub, self.full2(b), below_v),
                    rest: CellRef::new(
                        i,
                        j,
                        s1.without(sub),
                        s2.without(ChildSubset::singleton(c2)),
                        rest_v,
                    ),
                    left: Slot::NULL,
                    right: b,
                }
            }
        };
        Some(split)
    }

    /// Cells the value of `c` was computed from
    pub fn dependencies(&self, c: CellRef) -> Vec<CellRef> {
        match self.split(c) {
            Some(split) => vec![split.below, split.rest],
            None => vec![],
        }
    }

    /// Every filled value, each pointing at the values it was computed from
    pub fn dependency_graph(&self) -> DiGraph<CellRef, ()> {
        let mut graph = DiGraph::new();
        let mut index: FxHashMap<CellRef, NodeIndex> = FxHashMap::default();
        let mut node_of = |graph: &mut DiGraph<CellRef, ()>, c: CellRef| -> NodeIndex {
            *index.entry(c).or_insert_with(|| graph.add_node(c))
        };

        for i in self.left.slots() {
            for j in self.right.slots() {
                let (full1, full2) = (self.full1(i), self.full2(j));
                for m1 in 0..=full1.0 {
                    for m2 in 0..=full2.0 {
                        for v in 0..self.variants() {
                            let c = CellRef::new(i, j, ChildSubset(m1), ChildSubset(m2), v);
                            let from = node_of(&mut graph, c);
                            for dep in self.dependencies(c) {
                                let to = node_of(&mut graph, dep);
                                graph.add_edge(from, to, ());
                            }
                        }
                    }
                }
            }
        }
        graph
    }

    /// Node of the left tree in `slot`
    pub fn left_node(&self, slot: Slot) -> Option<&'a FragNode> {
        self.left.node(slot)
    }

    pub fn right_node(&self, slot: Slot) -> Option<&'a FragNode> {
        self.right.node(slot)
    }
}
