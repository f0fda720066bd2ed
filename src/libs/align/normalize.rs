use crate::libs::align::config::{AlignConfig, AlignMode, Normalization};
use crate::libs::align::engine::{align_forests, EngineOutcome};
use crate::libs::align::error::AlignError;
use crate::libs::align::scoring::ScoringModel;
use crate::libs::fragtree::FragTree;
use rayon::prelude::*;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::RwLock;

/// One normalized statistic, `None` when undefined for the tree pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedScore {
    pub kind: Normalization,
    pub value: Option<f64>,
}

/// Gumbel location and scale per `(smaller tree size, larger tree size)`.
#[derive(Debug, Clone, Default)]
pub struct GumbelTable {
    params: HashMap<(usize, usize), (f64, f64)>,
}

impl GumbelTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, n1: usize, n2: usize, location: f64, scale: f64) {
        self.params
            .insert((n1.min(n2), n1.max(n2)), (location, scale));
    }

    /// Lines of `MINxMAX location scale confidence`; shorter lines are ignored
    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut table = Self::new();
        for (no, line) in reader.lines().enumerate() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 4 {
                continue;
            }
            let Some((min, max)) = fields[0].split_once('x') else {
                anyhow::bail!("Line {}: expected `MINxMAX`, got `{}`", no + 1, fields[0]);
            };
            let parse_err = |e: &dyn std::fmt::Display| anyhow::anyhow!("Line {}: {}", no + 1, e);
            let min = min.parse::<usize>().map_err(|e| parse_err(&e))?;
            let max = max.parse::<usize>().map_err(|e| parse_err(&e))?;
            let location = fields[1].parse::<f64>().map_err(|e| parse_err(&e))?;
            let scale = fields[2].parse::<f64>().map_err(|e| parse_err(&e))?;
            table.insert(min, max, location, scale);
        }
        Ok(table)
    }

    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        Self::from_reader(intspan::reader(infile))
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Order of the two sizes does not matter
    pub fn get(&self, n1: usize, n2: usize) -> Option<(f64, f64)> {
        self.params.get(&(n1.min(n2), n1.max(n2))).copied()
    }

    pub fn p_value(&self, score: f64, n1: usize, n2: usize) -> Option<f64> {
        let (location, scale) = self.get(n1, n2)?;
        gumbel_p_value(score, location, scale)
    }
}

/// `1 - e^x`, without cancellation near zero
pub fn one_minus_exp(x: f64) -> f64 {
    if x.abs() <= 1.0 {
        -x.exp_m1()
    } else {
        1.0 - x.exp()
    }
}

/// Negative log of the Gumbel upper tail at `score`.
pub fn gumbel_p_value(score: f64, location: f64, scale: f64) -> Option<f64> {
    if scale <= 0.0 {
        return None;
    }
    let tail = one_minus_exp(-((location - score) / scale).exp());
    if tail <= 0.0 || !tail.is_finite() {
        log::warn!(
            "Gumbel tail vanishes at score {} (location {}, scale {})",
            score,
            location,
            scale
        );
        return None;
    }
    Some(-tail.ln())
}

/// Self-alignment scores keyed by tree uid.
#[derive(Debug, Default)]
pub struct SelfScoreCache {
    scores: RwLock<HashMap<u64, f32>>,
}

impl SelfScoreCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, uid: u64) -> Option<f32> {
        self.scores.read().ok()?.get(&uid).copied()
    }

    /// Cached score of `tree`, computing it on a miss. Concurrent misses both
    /// compute; the first insert is kept.
    pub fn get_or_compute<F>(&self, tree: &FragTree, compute: F) -> Result<f32, AlignError>
    where
        F: FnOnce(&FragTree) -> Result<f32, AlignError>,
    {
        if let Some(score) = self.get(tree.uid()) {
            return Ok(score);
        }
        let score = compute(tree)?;
        let mut scores = self
            .scores
            .write()
            .map_err(|_| AlignError::Logic("self score cache poisoned".to_string()))?;
        Ok(*scores.entry(tree.uid()).or_insert(score))
    }

    pub fn len(&self) -> usize {
        self.scores.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Rescales raw scores against tree sizes, self alignments or a Gumbel fit.
pub struct ScoreNormalizer<'a> {
    scoring: &'a dyn ScoringModel,
    /// Settings for self alignments: global, nothing but the raw score
    config: AlignConfig,
    gumbel: Option<&'a GumbelTable>,
    cache: &'a SelfScoreCache,
}

impl<'a> ScoreNormalizer<'a> {
    pub fn new(
        scoring: &'a dyn ScoringModel,
        config: &AlignConfig,
        gumbel: Option<&'a GumbelTable>,
        cache: &'a SelfScoreCache,
    ) -> Self {
        let config = AlignConfig {
            mode: AlignMode::Global,
            threshold: None,
            ..config.raw()
        };
        Self {
            scoring,
            config,
            gumbel,
            cache,
        }
    }

    /// Score of `tree` against itself, `None` if empty or not positive
    pub fn self_score(&self, tree: &FragTree) -> Result<Option<f32>, AlignError> {
        if tree.get_root().is_none() {
            return Ok(None);
        }
        let score = self.cache.get_or_compute(tree, |t| {
            let score = match align_forests(self.scoring, &self.config, t, t)? {
                EngineOutcome::Aligned(a) => a.score,
                EngineOutcome::BelowThreshold => f32::NEG_INFINITY,
            };
            log::debug!("Self alignment of tree {}: {}", t.uid(), score);
            Ok(score)
        })?;
        Ok(if score > 0.0 { Some(score) } else { None })
    }

    pub fn normalize(
        &self,
        kind: Normalization,
        score: f32,
        t1: &FragTree,
        t2: &FragTree,
    ) -> Result<Option<f64>, AlignError> {
        let s = score as f64;
        let (n1, n2) = (t1.len() as f64, t2.len() as f64);
        let value = match kind {
            Normalization::None | Normalization::All => Some(s),
            Normalization::TreeSizeArithmetic => ratio(s, (n1 + n2) / 2.0).map(|v| v * 10.0),
            Normalization::TreeSizeGeometric => ratio(s, n1.sqrt() * n2.sqrt()).map(|v| v * 10.0),
            Normalization::SelfAlignArithmetic
            | Normalization::SelfAlignGeometric
            | Normalization::SelfAlignMin => {
                let (Some(a1), Some(a2)) = (self.self_score(t1)?, self.self_score(t2)?) else {
                    return Ok(None);
                };
                let (a1, a2) = (a1 as f64, a2 as f64);
                match kind {
                    Normalization::SelfAlignArithmetic => {
                        ratio(s, (a1 + a2) / 2.0).map(|v| v * 100.0)
                    }
                    Normalization::SelfAlignGeometric => {
                        ratio(s, a1.sqrt() * a2.sqrt()).map(|v| v * 100.0)
                    }
                    _ => ratio(s, a1.min(a2).sqrt()),
                }
            }
            Normalization::PValue => self
                .gumbel
                .and_then(|g| g.p_value(s, t1.len(), t2.len())),
        };
        Ok(value)
    }

    /// Every requested statistic, in the order given
    pub fn normalize_all(
        &self,
        kinds: &[Normalization],
        score: f32,
        t1: &FragTree,
        t2: &FragTree,
    ) -> Result<Vec<NormalizedScore>, AlignError> {
        kinds
            .iter()
            .map(|&kind| {
                Ok(NormalizedScore {
                    kind,
                    value: self.normalize(kind, score, t1, t2)?,
                })
            })
            .collect()
    }
}

fn ratio(s: f64, denominator: f64) -> Option<f64> {
    if denominator > 0.0 && denominator.is_finite() {
        Some(s / denominator)
    } else {
        None
    }
}

/// Fraction of child-shuffled tree pairs scoring at least `observed`.
///
/// Run `k` of `N` shuffles the left tree with `seed + k` and the right tree
/// with `seed + N + k`, so results do not depend on the thread schedule.
pub fn plike(
    scoring: &dyn ScoringModel,
    config: &AlignConfig,
    t1: &FragTree,
    t2: &FragTree,
    observed: f32,
) -> Result<Option<f64>, AlignError> {
    let runs = config.plike_runs;
    if runs == 0 {
        return Ok(None);
    }
    let raw = config.raw();
    let seed = config.seed;

    let hits: Vec<bool> = (0..runs as u64)
        .into_par_iter()
        .map(|k| -> Result<bool, AlignError> {
            let s1 = t1.shuffled(seed.wrapping_add(k));
            let s2 = t2.shuffled(seed.wrapping_add(runs as u64).wrapping_add(k));
            match align_forests(scoring, &raw, &s1, &s2)? {
                EngineOutcome::Aligned(a) => Ok(a.score >= observed),
                EngineOutcome::BelowThreshold => Ok(false),
            }
        })
        .collect::<Result<_, AlignError>>()?;

    let count = hits.iter().filter(|&&h| h).count();
    Ok(Some(count as f64 / runs as f64))
}
