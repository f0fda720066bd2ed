pub mod backtrace;
pub mod config;
pub mod engine;
pub mod error;
pub mod neutral_loss;
pub mod normalize;
pub mod postorder;
pub mod pullup;
pub mod scoring;
pub mod sink;
pub mod subset;

pub use backtrace::{AlignedPair, AlignmentTree, PairKind, Side};
pub use config::{AlignConfig, AlignMode, Normalization};
pub use error::AlignError;
pub use normalize::{GumbelTable, NormalizedScore, ScoreNormalizer, SelfScoreCache};
pub use pullup::PullUp;
pub use scoring::{ScoringModel, SimpleParams, SimpleScoring};
pub use sink::{ResultSink, TsvSink};

use crate::libs::fragtree::FragTree;
use engine::{align_forests, EngineOutcome};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    Aligned(f32),
    /// The best attainable score was below the threshold, nothing was aligned
    BelowThreshold,
}

impl Outcome {
    pub fn score(&self) -> Option<f32> {
        match self {
            Outcome::Aligned(s) => Some(*s),
            Outcome::BelowThreshold => None,
        }
    }
}

/// Everything computed for one tree pair.
#[derive(Debug, Clone)]
pub struct AlignReport {
    pub outcome: Outcome,
    /// Requested statistics, in `Normalization::variants` order
    pub normalized: Vec<NormalizedScore>,
    pub plike: Option<f64>,
    /// Winning restructuring, the report describes the restructured pair
    pub pull_up: Option<PullUp>,
    /// Pull-up candidates that beat the unmodified pair
    pub improved_pull_ups: usize,
    pub alignment: Option<AlignmentTree>,
}

impl AlignReport {
    fn below_threshold() -> Self {
        Self {
            outcome: Outcome::BelowThreshold,
            normalized: vec![],
            plike: None,
            pull_up: None,
            improved_pull_ups: 0,
            alignment: None,
        }
    }
}

/// Runs the whole pipeline: engine, traceback, normalization, pull-ups.
///
/// # Example
/// ```
/// use ftalign::libs::align::{AlignConfig, SimpleScoring, TreeAligner};
/// use ftalign::libs::fragtree::FragTree;
///
/// let t1 = FragTree::from_newick("(H2O,CO)root;").unwrap();
/// let t2 = FragTree::from_newick("(CO,H2O)root;").unwrap();
/// let aligner = TreeAligner::new(Box::new(SimpleScoring::default()), AlignConfig::default());
/// let report = aligner.align(&t1, &t2).unwrap();
/// assert_eq!(report.outcome.score(), Some(30.0));
/// ```
pub struct TreeAligner {
    scoring: Box<dyn ScoringModel>,
    config: AlignConfig,
    gumbel: Option<GumbelTable>,
    self_scores: SelfScoreCache,
}

impl TreeAligner {
    pub fn new(scoring: Box<dyn ScoringModel>, config: AlignConfig) -> Self {
        Self {
            scoring,
            config,
            gumbel: None,
            self_scores: SelfScoreCache::new(),
        }
    }

    pub fn with_gumbel(mut self, table: GumbelTable) -> Self {
        self.gumbel = Some(table);
        self
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    pub fn scoring(&self) -> &dyn ScoringModel {
        self.scoring.as_ref()
    }

    pub fn self_scores(&self) -> &SelfScoreCache {
        &self.self_scores
    }

    pub fn normalizer(&self) -> ScoreNormalizer<'_> {
        ScoreNormalizer::new(
            self.scoring.as_ref(),
            &self.config,
            self.gumbel.as_ref(),
            &self.self_scores,
        )
    }

    /// Raw score only, `None` below the threshold
    pub fn score(&self, t1: &FragTree, t2: &FragTree) -> Result<Option<f32>, AlignError> {
        match align_forests(self.scoring(), &self.config, t1, t2)? {
            EngineOutcome::Aligned(a) => Ok(Some(a.score)),
            EngineOutcome::BelowThreshold => Ok(None),
        }
    }

    pub fn align(&self, t1: &FragTree, t2: &FragTree) -> Result<AlignReport, AlignError> {
        if !self.config.pull_ups {
            return self.run(&self.config, t1, t2);
        }

        let search = pullup::search(self.scoring(), &self.config, t1, t2)?;
        let config = AlignConfig {
            pull_ups: false,
            ..self.config.clone()
        };
        let mut report = match &search.best {
            Some(best) if best.side == Side::Left => self.run(&config, &best.tree, t2)?,
            Some(best) => self.run(&config, t1, &best.tree)?,
            None => self.run(&config, t1, t2)?,
        };
        report.pull_up = search.best;
        report.improved_pull_ups = search.improved;
        Ok(report)
    }

    fn run(
        &self,
        config: &AlignConfig,
        t1: &FragTree,
        t2: &FragTree,
    ) -> Result<AlignReport, AlignError> {
        let forest = match align_forests(self.scoring(), config, t1, t2)? {
            EngineOutcome::Aligned(a) => a,
            EngineOutcome::BelowThreshold => return Ok(AlignReport::below_threshold()),
        };
        let score = forest.score;
        let alignment = if config.backtrace {
            Some(AlignmentTree::reconstruct(&forest))
        } else {
            None
        };

        let normalized =
            self.normalizer()
                .normalize_all(&config.normalization.variants(), score, t1, t2)?;
        let plike = normalize::plike(self.scoring(), config, t1, t2, score)?;

        Ok(AlignReport {
            outcome: Outcome::Aligned(score),
            normalized,
            plike,
            pull_up: None,
            improved_pull_ups: 0,
            alignment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn tree(newick: &str) -> FragTree {
        FragTree::from_newick(newick).unwrap()
    }

    #[test]
    fn test_aligner_report() {
        let config = AlignConfig {
            normalization: Normalization::All,
            plike_runs: 8,
            backtrace: true,
            ..AlignConfig::default()
        };
        let mut gumbel = GumbelTable::new();
        gumbel.insert(3, 3, 10.0, 2.0);
        let aligner =
            TreeAligner::new(Box::new(SimpleScoring::default()), config).with_gumbel(gumbel);

        let t1 = tree("(H2O,CO)root;");
        let t2 = tree("(H2O,CO)root;");
        let report = aligner.align(&t1, &t2).unwrap();
        assert_eq!(report.outcome, Outcome::Aligned(30.0));
        assert_eq!(report.normalized.len(), 6);
        // identical trees reach 100% of their self alignments
        assert_relative_eq!(report.normalized[0].value.unwrap(), 100.0, epsilon = 1e-6);
        assert_relative_eq!(report.normalized[2].value.unwrap(), 100.0, epsilon = 1e-6);
        assert!(report.normalized[5].value.is_some());
        assert_eq!(report.plike, Some(1.0));
        assert!(report.pull_up.is_none());

        let alignment = report.alignment.unwrap();
        assert_eq!(alignment.matched(), 3);
        assert_eq!(alignment.gaps(), 0);
        assert_eq!(aligner.self_scores().len(), 2);
    }

    #[test]
    fn test_aligner_threshold() {
        let config = AlignConfig {
            threshold: Some(1000.0),
            normalization: Normalization::TreeSizeArithmetic,
            ..AlignConfig::default()
        };
        let aligner = TreeAligner::new(Box::new(SimpleScoring::default()), config);
        let t1 = tree("(H2O,CO)root;");
        let report = aligner.align(&t1, &t1).unwrap();
        assert_eq!(report.outcome, Outcome::BelowThreshold);
        assert!(report.outcome.score().is_none());
        assert!(report.normalized.is_empty());
        assert_eq!(aligner.score(&t1, &t1).unwrap(), None);
    }

    #[test]
    fn test_aligner_pull_ups() {
        let config = AlignConfig {
            pull_ups: true,
            backtrace: true,
            ..AlignConfig::default()
        };
        let aligner = TreeAligner::new(Box::new(SimpleScoring::default()), config);
        let t1 = tree("((H2O)CO)root;");
        let t2 = tree("(CO,H2O)root;");

        let report = aligner.align(&t1, &t2).unwrap();
        assert_eq!(report.outcome, Outcome::Aligned(30.0));
        assert_eq!(report.improved_pull_ups, 1);
        let pull_up = report.pull_up.as_ref().unwrap();
        assert_eq!(pull_up.side, Side::Left);
        assert_eq!(report.alignment.as_ref().unwrap().matched(), 3);

        // the right tree is pulled when the arguments are swapped
        let report = aligner.align(&t2, &t1).unwrap();
        assert_eq!(report.pull_up.unwrap().side, Side::Right);
        assert_eq!(report.outcome.score(), Some(30.0));
    }

    #[test]
    fn test_aligner_too_bushy() {
        let config = AlignConfig {
            max_degree: 2,
            ..AlignConfig::default()
        };
        let aligner = TreeAligner::new(Box::new(SimpleScoring::default()), config);
        let t1 = tree("(H2O,CO,CH4)root;");
        let err = aligner.align(&t1, &t1).unwrap_err();
        assert!(matches!(err, AlignError::TooBushy { degree: 3, limit: 2 }));
    }
}
