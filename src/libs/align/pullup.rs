use crate::libs::align::backtrace::Side;
use crate::libs::align::config::AlignConfig;
use crate::libs::align::engine::{align_forests, EngineOutcome};
use crate::libs::align::error::AlignError;
use crate::libs::align::scoring::ScoringModel;
use crate::libs::fragtree::{FragTree, NodeId};
use rayon::prelude::*;

/// A restructured tree: `node` reattached to the parent of `former_parent`.
#[derive(Debug, Clone)]
pub struct PullUp {
    pub side: Side,
    pub node: NodeId,
    pub former_parent: NodeId,
    pub tree: FragTree,
    pub score: f32,
}

#[derive(Debug, Clone)]
pub struct PullUpSearch {
    /// Score of the unmodified pair, `None` below the threshold
    pub baseline: Option<f32>,
    /// Best candidate strictly above the baseline
    pub best: Option<PullUp>,
    /// Candidates strictly above the baseline
    pub improved: usize,
    pub candidates: usize,
    /// Candidates rejected as too bushy or below the threshold
    pub skipped: usize,
}

/// Nodes that can move one level up: those whose parent is not the root.
pub fn candidates(tree: &FragTree) -> Vec<NodeId> {
    tree.nodes()
        .filter(|node| {
            node.parent
                .and_then(|p| tree.get_node(p))
                .is_some_and(|parent| !parent.is_root())
        })
        .map(|node| node.id)
        .collect()
}

fn raw_score(
    scoring: &dyn ScoringModel,
    config: &AlignConfig,
    t1: &FragTree,
    t2: &FragTree,
) -> Result<Option<f32>, AlignError> {
    match align_forests(scoring, config, t1, t2) {
        Ok(EngineOutcome::Aligned(a)) => Ok(Some(a.score)),
        Ok(EngineOutcome::BelowThreshold) | Err(AlignError::TooBushy { .. }) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Try every single pull-up in either tree against the other, unmodified tree.
///
/// Candidates are scored in parallel and reduced in order: left tree first,
/// then the right, each by node id. Ties keep the earlier candidate.
pub fn search(
    scoring: &dyn ScoringModel,
    config: &AlignConfig,
    t1: &FragTree,
    t2: &FragTree,
) -> Result<PullUpSearch, AlignError> {
    let raw = config.raw();
    let baseline = match align_forests(scoring, &raw, t1, t2)? {
        EngineOutcome::Aligned(a) => Some(a.score),
        EngineOutcome::BelowThreshold => None,
    };

    let mut moves: Vec<(Side, NodeId)> = vec![];
    moves.extend(candidates(t1).into_iter().map(|id| (Side::Left, id)));
    moves.extend(candidates(t2).into_iter().map(|id| (Side::Right, id)));

    let results: Vec<Option<PullUp>> = moves
        .par_iter()
        .map(|&(side, node)| -> Result<Option<PullUp>, AlignError> {
            let mut tree = match side {
                Side::Left => t1.clone(),
                Side::Right => t2.clone(),
            };
            let former_parent = tree.pull_up(node)?;
            let score = match side {
                Side::Left => raw_score(scoring, &raw, &tree, t2)?,
                Side::Right => raw_score(scoring, &raw, t1, &tree)?,
            };
            Ok(score.map(|score| PullUp {
                side,
                node,
                former_parent,
                tree,
                score,
            }))
        })
        .collect::<Result<_, AlignError>>()?;

    let floor = baseline.unwrap_or(f32::NEG_INFINITY);
    let mut search = PullUpSearch {
        baseline,
        best: None,
        improved: 0,
        candidates: moves.len(),
        skipped: 0,
    };
    for result in results {
        let Some(candidate) = result else {
            search.skipped += 1;
            continue;
        };
        if candidate.score <= floor {
            continue;
        }
        search.improved += 1;
        let better = match &search.best {
            Some(best) => candidate.score > best.score,
            None => true,
        };
        if better {
            search.best = Some(candidate);
        }
    }

    match &search.best {
        Some(best) => log::info!(
            "Pull-up of node {} ({:?} tree) raises {:?} to {}, {} of {} candidates improve",
            best.node,
            best.side,
            baseline,
            best.score,
            search.improved,
            search.candidates
        ),
        None => log::debug!("No pull-up among {} candidates improves", search.candidates),
    }
    Ok(search)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::align::scoring::SimpleScoring;
    use approx::assert_relative_eq;

    fn tree(newick: &str) -> FragTree {
        FragTree::from_newick(newick).unwrap()
    }

    fn node_with_loss(tree: &FragTree, loss: &str) -> NodeId {
        tree.nodes()
            .find(|n| n.loss_label() == loss)
            .map(|n| n.id)
            .unwrap()
    }

    #[test]
    fn test_pullup_candidates() {
        let t = tree("((H2O,(CH4)N2)CO,C2H2)root;");
        let found = candidates(&t);
        // H2O and N2 sit below CO, CH4 below N2
        assert_eq!(found.len(), 3);
        assert!(found.contains(&node_with_loss(&t, "H2O")));
        assert!(found.contains(&node_with_loss(&t, "CH4")));
        assert!(!found.contains(&node_with_loss(&t, "CO")));

        assert!(candidates(&tree("(CO,H2O)root;")).is_empty());
        assert!(candidates(&FragTree::new()).is_empty());
    }

    #[test]
    fn test_pullup_improves() {
        let t1 = tree("((H2O)CO)root;");
        let t2 = tree("(CO,H2O)root;");
        let search = search(&SimpleScoring::default(), &AlignConfig::default(), &t1, &t2).unwrap();

        assert_eq!(search.baseline, Some(4.0));
        assert_eq!(search.candidates, 1);
        assert_eq!(search.improved, 1);
        let best = search.best.unwrap();
        assert_eq!(best.side, Side::Left);
        assert_eq!(best.node, node_with_loss(&t1, "H2O"));
        assert_eq!(best.former_parent, node_with_loss(&t1, "CO"));
        assert_relative_eq!(best.score, 30.0);

        // the input trees are untouched
        assert_eq!(t1.to_newick(), "((H2O)CO)root;");
        let root = best.tree.get_root().unwrap();
        assert_eq!(best.tree.get_node(root).unwrap().children.len(), 2);
    }

    #[test]
    fn test_pullup_no_improvement() {
        let t1 = tree("((H2O)CO)root;");
        let t2 = tree("((H2O)CO)root;");
        let search = search(&SimpleScoring::default(), &AlignConfig::default(), &t1, &t2).unwrap();
        assert_eq!(search.candidates, 2);
        assert_eq!(search.improved, 0);
        assert!(search.best.is_none());
    }

    #[test]
    fn test_pullup_too_bushy_skipped() {
        let t1 = tree("((CO)N2,H2O,CH4)root;");
        let t2 = tree("(N2,H2O,CH4)root;");
        let config = AlignConfig {
            max_degree: 3,
            ..AlignConfig::default()
        };
        let search = search(&SimpleScoring::default(), &config, &t1, &t2).unwrap();
        assert_eq!(search.candidates, 1);
        assert_eq!(search.skipped, 1);
        assert!(search.best.is_none());
    }
}
