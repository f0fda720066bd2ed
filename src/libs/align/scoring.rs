use crate::libs::fragtree::FragNode;

/// Scoring strategy consumed by the alignment engine.
///
/// `None` stands for the virtual null node, i.e. a deleted subtree.
pub trait ScoringModel: Sync {
    /// Score of matching `a` against `b`; `(None, None)` is the baseline.
    fn score(&self, a: Option<&FragNode>, b: Option<&FragNode>) -> f32;

    /// Score of `child` fused with its `parent` (losses added) against `other`.
    /// `f32::NEG_INFINITY` when the fusion is not defined.
    fn score_union(&self, child: &FragNode, parent: &FragNode, other: Option<&FragNode>) -> f32;

    /// Constant paid whenever a node dissolves into its parent
    fn union_score(&self) -> f32;

    /// Score of the null node against itself
    fn null_null(&self) -> f32 {
        self.score(None, None)
    }

    /// Contribution of the two aligned roots, added on top of the forest score
    fn root_score(&self, a: &FragNode, b: &FragNode) -> f32 {
        self.score(Some(a), Some(b))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimpleParams {
    pub match_score: f32,
    pub mismatch_score: f32,
    pub gap_score: f32,
    pub null_null: f32,
    pub union_score: f32,
}

impl Default for SimpleParams {
    fn default() -> Self {
        Self {
            match_score: 10.0,
            mismatch_score: -7.0,
            gap_score: -8.0,
            null_null: 0.0,
            union_score: -5.0,
        }
    }
}

/// Identity-based scoring on loss labels.
#[derive(Debug, Clone, Default)]
pub struct SimpleScoring {
    pub params: SimpleParams,
}

impl SimpleScoring {
    pub fn new(params: SimpleParams) -> Self {
        Self { params }
    }
}

impl ScoringModel for SimpleScoring {
    fn score(&self, a: Option<&FragNode>, b: Option<&FragNode>) -> f32 {
        match (a, b) {
            (None, None) => self.params.null_null,
            (Some(_), None) | (None, Some(_)) => self.params.gap_score,
            (Some(a), Some(b)) => {
                if a.loss == b.loss {
                    self.params.match_score
                } else {
                    self.params.mismatch_score
                }
            }
        }
    }

    fn score_union(&self, child: &FragNode, parent: &FragNode, other: Option<&FragNode>) -> f32 {
        let (Some(cl), Some(pl)) = (&child.loss, &parent.loss) else {
            return f32::NEG_INFINITY;
        };
        let Some(other) = other else {
            return self.params.gap_score;
        };
        let fused = cl.add(pl);
        if other.loss.as_ref() == Some(&fused) {
            self.params.match_score
        } else {
            self.params.mismatch_score
        }
    }

    fn union_score(&self) -> f32 {
        self.params.union_score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::libs::formula::Formula;

    fn node(loss: &str) -> FragNode {
        FragNode::new(0).with_loss(Formula::parse(loss).unwrap())
    }

    #[test]
    fn test_simple_scoring() {
        let scoring = SimpleScoring::default();
        let a = node("H2O");
        let b = node("H2O");
        let c = node("CO");

        assert_eq!(scoring.score(Some(&a), Some(&b)), 10.0);
        assert_eq!(scoring.score(Some(&a), Some(&c)), -7.0);
        assert_eq!(scoring.score(Some(&a), None), -8.0);
        assert_eq!(scoring.score(None, Some(&c)), -8.0);
        assert_eq!(scoring.null_null(), 0.0);

        // roots carry no loss and match each other
        let r1 = FragNode::new(0);
        let r2 = FragNode::new(0);
        assert_eq!(scoring.root_score(&r1, &r2), 10.0);
    }

    #[test]
    fn test_simple_scoring_union() {
        let scoring = SimpleScoring::default();
        let child = node("H2O");
        let parent = node("CO");
        let fused = node("CH2O2");
        let other = node("CO2");

        assert_eq!(scoring.score_union(&child, &parent, Some(&fused)), 10.0);
        assert_eq!(scoring.score_union(&child, &parent, Some(&other)), -7.0);
        assert_eq!(scoring.score_union(&child, &parent, None), -8.0);

        let root = FragNode::new(1);
        assert_eq!(
            scoring.score_union(&child, &root, Some(&fused)),
            f32::NEG_INFINITY
        );
        assert_eq!(scoring.union_score(), -5.0);
    }
}
