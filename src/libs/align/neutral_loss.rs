use crate::libs::align::scoring::ScoringModel;
use crate::libs::formula::Formula;
use crate::libs::fragtree::{FragNode, FragTree};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::io::BufRead;
use std::sync::Arc;

lazy_static! {
    static ref H2: Formula = formula("H2");
    static ref FUNCTIONAL_GROUPS: Vec<Formula> = [
        "H4", "C2H2", "O", "H2O", "NH", "S", "ClH", "IH", "FH", "CO2", "SO2", "SO3", "HPO3",
    ]
    .iter()
    .map(|s| formula(s))
    .collect();
    static ref COMMON_LOSSES: Vec<Formula> = [
        "O", "C2H2", "C2H4", "C2H4O2", "C2H5O4P", "C3H2O3", "C3H4O4", "C3H6O2", "C3H9N", "C4H8",
        "C5H8", "C5H8O4", "C6H10O4", "C6H10O5", "C6H6", "C6H8O6", "CH2O", "CH2O2", "CH3", "CH3N",
        "CH4", "CH4N2O", "CH4O", "CH5N", "CHNO", "CO", "CO2", "H2", "H2O", "H2S", "H2SO4", "HPO3",
        "N2", "NH3", "S", "SO2", "SO3", "H", "OH", "CH3O", "C3H7", "C4H9", "C6H5O",
    ]
    .iter()
    .map(|s| formula(s))
    .collect();
    static ref FIRST_ORDER: HashMap<Formula, Vec<Substitution>> = build_first_order();
    static ref SECOND_ORDER: HashMap<Formula, Vec<Substitution>> = build_second_order(false);
    static ref SECOND_ORDER_H2: HashMap<Formula, Vec<Substitution>> = build_second_order(true);
}

fn formula(s: &str) -> Formula {
    Formula::parse(s).unwrap_or_default()
}

/// Common neutral losses, as listed in the scoring tables
pub fn common_losses() -> &'static [Formula] {
    &COMMON_LOSSES
}

pub fn is_common_loss(loss: &Formula) -> bool {
    COMMON_LOSSES.contains(loss)
}

/// One functional group replaced by another between two losses.
#[derive(Debug, Clone)]
struct Substitution {
    before: Formula,
    after: Formula,
    /// Key shifted by one double bond (±H2)
    shifted: bool,
}

fn insert(map: &mut HashMap<Formula, Vec<Substitution>>, key: Formula, sub: Substitution) {
    map.entry(key).or_default().push(sub);
}

fn build_first_order() -> HashMap<Formula, Vec<Substitution>> {
    let mut map = HashMap::new();
    for g in FUNCTIONAL_GROUPS.iter() {
        insert(
            &mut map,
            g.clone(),
            Substitution {
                before: g.clone(),
                after: Formula::new(),
                shifted: false,
            },
        );
        insert(
            &mut map,
            g.negate(),
            Substitution {
                before: Formula::new(),
                after: g.clone(),
                shifted: false,
            },
        );
    }
    map
}

fn build_second_order(with_h2: bool) -> HashMap<Formula, Vec<Substitution>> {
    let mut map = HashMap::new();
    for g1 in FUNCTIONAL_GROUPS.iter() {
        for g2 in FUNCTIONAL_GROUPS.iter() {
            let key = g1.diff(g2);
            let sub = |shifted| Substitution {
                before: g1.clone(),
                after: g2.clone(),
                shifted,
            };
            insert(&mut map, key.clone(), sub(false));
            if with_h2 {
                insert(&mut map, key.diff(&H2), sub(true));
                insert(&mut map, key.add(&H2), sub(true));
            }
        }
    }
    map
}

/// How two unequal losses relate chemically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LossDiff {
    SimilarMass,
    H2,
    FunctionalGroupFirstOrder,
    FunctionalGroupSecondOrder,
    FunctionalGroupPlusH2,
    NotCommon,
}

/// Which labels take part in the pair score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelMode {
    Losses,
    LossesAndFragments,
    FragmentsOnly,
}

impl LabelMode {
    fn uses_losses(&self) -> bool {
        *self != LabelMode::FragmentsOnly
    }

    fn uses_fragments(&self) -> bool {
        *self != LabelMode::Losses
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NeutralLossParams {
    pub equality: f32,
    pub equality_per_atom: f32,
    pub inequality: f32,
    pub inequality_per_atom: f32,
    pub node_equality: f32,
    pub node_equality_per_atom: f32,
    pub node_inequality: f32,
    pub node_inequality_per_atom: f32,
    pub gap: f32,
    pub cnl_cnl: f32,
    pub diff_common_first_order: f32,
    pub diff_common_second_order: f32,
    pub diff_common_per_atom: f32,
    pub diff_h2: f32,
    pub diff_h2_per_atom: f32,
    pub diff_common_plus_h2: f32,
    pub diff_common_plus_h2_per_atom: f32,
    pub similar_mass: f32,
    pub union: f32,
    pub null_null: f32,

    pub use_cnl: bool,
    pub cnl_size_dependent: bool,
    pub test_rdiff: bool,
    pub test_rdiff_h2: bool,
    pub test_h2: bool,
    /// Mass tolerance of the similar-mass test; `None` disables it
    pub similar_mass_ppm: Option<f64>,
    pub labels: LabelMode,
    pub only_node_bonus: bool,
    /// Add both node weights to the root anchor under node weighting
    pub one_node_penalty: bool,
}

impl Default for NeutralLossParams {
    fn default() -> Self {
        Self {
            equality: 5.0,
            equality_per_atom: 1.0,
            inequality: -5.0,
            inequality_per_atom: -1.0,
            node_equality: 5.0,
            node_equality_per_atom: 1.0,
            node_inequality: -5.0,
            node_inequality_per_atom: -1.0,
            gap: -8.0,
            cnl_cnl: 2.0,
            diff_common_first_order: 2.0,
            diff_common_second_order: 0.0,
            diff_common_per_atom: 0.5,
            diff_h2: 3.0,
            diff_h2_per_atom: 1.0,
            diff_common_plus_h2: 0.0,
            diff_common_plus_h2_per_atom: 0.1,
            similar_mass: 3.0,
            union: -5.0,
            null_null: 0.0,
            use_cnl: true,
            cnl_size_dependent: false,
            test_rdiff: true,
            test_rdiff_h2: false,
            test_h2: true,
            similar_mass_ppm: None,
            labels: LabelMode::Losses,
            only_node_bonus: false,
            one_node_penalty: false,
        }
    }
}

impl NeutralLossParams {
    /// Read `key = value` lines over the defaults. Blank lines and `#` comments are skipped.
    ///
    /// ```
    /// use ftalign::libs::align::neutral_loss::NeutralLossParams;
    /// let params = NeutralLossParams::from_reader("gap = -4\nlabels = fragments".as_bytes()).unwrap();
    /// assert_eq!(params.gap, -4.0);
    /// ```
    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut params = Self::default();
        for (no, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                anyhow::bail!("Line {}: expected `key = value`, got `{}`", no + 1, line);
            };
            params
                .set(key.trim(), value.trim())
                .map_err(|e| anyhow::anyhow!("Line {}: {}", no + 1, e))?;
        }
        Ok(params)
    }

    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        Self::from_reader(intspan::reader(infile))
    }

    fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        let num = || -> anyhow::Result<f32> {
            value
                .parse::<f32>()
                .map_err(|_| anyhow::anyhow!("`{}` expects a number, got `{}`", key, value))
        };
        let flag = || -> anyhow::Result<bool> {
            value
                .parse::<bool>()
                .map_err(|_| anyhow::anyhow!("`{}` expects true or false, got `{}`", key, value))
        };
        match key {
            "equality" => self.equality = num()?,
            "equality_per_atom" => self.equality_per_atom = num()?,
            "inequality" => self.inequality = num()?,
            "inequality_per_atom" => self.inequality_per_atom = num()?,
            "node_equality" => self.node_equality = num()?,
            "node_equality_per_atom" => self.node_equality_per_atom = num()?,
            "node_inequality" => self.node_inequality = num()?,
            "node_inequality_per_atom" => self.node_inequality_per_atom = num()?,
            "gap" => self.gap = num()?,
            "cnl_cnl" => self.cnl_cnl = num()?,
            "diff_common_first_order" => self.diff_common_first_order = num()?,
            "diff_common_second_order" => self.diff_common_second_order = num()?,
            "diff_common_per_atom" => self.diff_common_per_atom = num()?,
            "diff_h2" => self.diff_h2 = num()?,
            "diff_h2_per_atom" => self.diff_h2_per_atom = num()?,
            "diff_common_plus_h2" => self.diff_common_plus_h2 = num()?,
            "diff_common_plus_h2_per_atom" => self.diff_common_plus_h2_per_atom = num()?,
            "similar_mass" => self.similar_mass = num()?,
            "union" => self.union = num()?,
            "null_null" => self.null_null = num()?,
            "use_cnl" => self.use_cnl = flag()?,
            "cnl_size_dependent" => self.cnl_size_dependent = flag()?,
            "test_rdiff" => self.test_rdiff = flag()?,
            "test_rdiff_h2" => self.test_rdiff_h2 = flag()?,
            "test_h2" => self.test_h2 = flag()?,
            "similar_mass_ppm" => {
                self.similar_mass_ppm = if value == "none" {
                    None
                } else {
                    Some(num()? as f64)
                }
            }
            "labels" => {
                self.labels = match value {
                    "losses" => LabelMode::Losses,
                    "both" => LabelMode::LossesAndFragments,
                    "fragments" => LabelMode::FragmentsOnly,
                    _ => anyhow::bail!("Unknown label mode `{}`", value),
                }
            }
            "only_node_bonus" => self.only_node_bonus = flag()?,
            "one_node_penalty" => self.one_node_penalty = flag()?,
            _ => anyhow::bail!("Unknown parameter `{}`", key),
        }
        Ok(())
    }
}

/// Observed counts of each loss, for frequency weighting.
#[derive(Debug, Clone, Default)]
pub struct LossFrequencyTable {
    counts: HashMap<Formula, u64>,
    max: u64,
}

impl LossFrequencyTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, loss: Formula, count: u64) {
        let entry = self.counts.entry(loss).or_insert(0);
        *entry += count;
        self.max = self.max.max(*entry);
    }

    /// Count every non-root loss of the trees
    pub fn from_trees(trees: &[FragTree]) -> Self {
        let mut table = Self::new();
        for tree in trees {
            for node in tree.nodes() {
                if let (Some(loss), false) = (&node.loss, node.is_root()) {
                    table.insert(loss.clone(), 1);
                }
            }
        }
        table
    }

    /// Read `formula count` lines
    pub fn from_reader<R: BufRead>(reader: R) -> anyhow::Result<Self> {
        let mut table = Self::new();
        for line in reader.lines() {
            let line = line?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 2 {
                continue;
            }
            let loss = Formula::parse(fields[0])?;
            let count = fields[1].parse::<u64>()?;
            table.insert(loss, count);
        }
        Ok(table)
    }

    pub fn from_file(infile: &str) -> anyhow::Result<Self> {
        Self::from_reader(intspan::reader(infile))
    }

    pub fn count(&self, loss: Option<&Formula>) -> u64 {
        loss.and_then(|l| self.counts.get(l)).copied().unwrap_or(0)
    }

    /// `count / max · 3 + 1`, unseen losses counted once
    pub fn factor(&self, loss: Option<&Formula>) -> f64 {
        let count = self.count(loss).max(1) as f64;
        let max = self.max.max(1) as f64;
        count / max * 3.0 + 1.0
    }
}

#[derive(Debug, Clone, Default)]
pub enum Weighting {
    #[default]
    None,
    NodeWeight,
    LossFrequency(Arc<LossFrequencyTable>),
}

/// `signum` that maps zero to zero
fn sign(x: f32) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Chemistry-aware scoring on neutral losses, optionally on fragments too.
#[derive(Debug, Clone, Default)]
pub struct NeutralLossScoring {
    pub params: NeutralLossParams,
    pub weighting: Weighting,
}

impl NeutralLossScoring {
    pub fn new(params: NeutralLossParams, weighting: Weighting) -> Self {
        Self { params, weighting }
    }

    fn is_common(&self, loss: &Formula) -> bool {
        self.params.use_cnl && is_common_loss(loss)
    }

    /// Classify the difference of two unequal losses
    pub fn classify(&self, nl1: &Formula, nl2: &Formula) -> LossDiff {
        let p = &self.params;
        if let Some(ppm) = p.similar_mass_ppm {
            let (m1, m2) = (nl1.mass(), nl2.mass());
            if (m1 - m2).abs() < ((m1 + m2) * 1e-6 * ppm).abs() {
                return LossDiff::SimilarMass;
            }
        }

        let diff = nl1.diff(nl2);
        if p.test_h2 && (diff == *H2 || diff == H2.negate()) {
            return LossDiff::H2;
        }

        let matches = |s: &Substitution| nl1.contains(&s.before) && nl2.contains(&s.after);
        if let Some(subs) = FIRST_ORDER.get(&diff) {
            if p.test_rdiff && subs.iter().any(matches) {
                return LossDiff::FunctionalGroupFirstOrder;
            }
            return LossDiff::NotCommon;
        }

        let second = if p.test_rdiff_h2 {
            &*SECOND_ORDER_H2
        } else {
            &*SECOND_ORDER
        };
        if let Some(sub) = second.get(&diff).and_then(|subs| subs.iter().find(|s| matches(s))) {
            if sub.shifted {
                return LossDiff::FunctionalGroupPlusH2;
            }
            if p.test_rdiff {
                return LossDiff::FunctionalGroupSecondOrder;
            }
        }
        LossDiff::NotCommon
    }

    /// Score of two losses, either possibly absent
    pub fn loss_score(&self, nl1: Option<&Formula>, nl2: Option<&Formula>) -> f32 {
        let p = &self.params;
        let (nl1, nl2) = match (nl1, nl2) {
            (None, None) => return p.null_null,
            (Some(a), Some(b)) => (a, b),
            _ => return p.gap,
        };

        if nl1 == nl2 {
            let atoms = nl1.atom_count() as f32;
            if self.is_common(nl1) {
                return if p.cnl_size_dependent {
                    p.cnl_cnl + p.equality_per_atom * atoms
                } else {
                    p.cnl_cnl
                };
            }
            return p.equality + p.equality_per_atom * atoms;
        }

        let symdiff = nl1.symmetric_difference(nl2) as f32;
        match self.classify(nl1, nl2) {
            LossDiff::SimilarMass => p.similar_mass,
            LossDiff::H2 => p.diff_h2 + p.diff_h2_per_atom * symdiff,
            LossDiff::FunctionalGroupFirstOrder => {
                p.diff_common_first_order + p.diff_common_per_atom * symdiff
            }
            LossDiff::FunctionalGroupSecondOrder => {
                p.diff_common_second_order + p.diff_common_per_atom * symdiff
            }
            LossDiff::FunctionalGroupPlusH2 => {
                p.diff_common_plus_h2 + p.diff_common_plus_h2_per_atom * symdiff
            }
            LossDiff::NotCommon => p.inequality + p.inequality_per_atom * symdiff,
        }
    }

    /// Score of two fragment explanations, either possibly absent
    pub fn fragment_score(&self, f1: Option<&Formula>, f2: Option<&Formula>) -> f32 {
        let p = &self.params;
        match (f1, f2) {
            (None, None) => p.null_null,
            (Some(_), None) | (None, Some(_)) => {
                if p.only_node_bonus {
                    0.0
                } else {
                    p.gap
                }
            }
            (Some(a), Some(b)) if a == b => {
                p.node_equality + p.node_equality_per_atom * a.atom_count() as f32
            }
            (Some(a), Some(b)) => {
                if p.only_node_bonus {
                    0.0
                } else {
                    p.node_inequality + p.node_inequality_per_atom * a.symmetric_difference(b) as f32
                }
            }
        }
    }

    fn label_score(
        &self,
        nl1: Option<&Formula>,
        nl2: Option<&Formula>,
        f1: Option<&Formula>,
        f2: Option<&Formula>,
    ) -> f32 {
        let mut score = 0.0;
        if self.params.labels.uses_losses() {
            score += self.loss_score(nl1, nl2);
        }
        if self.params.labels.uses_fragments() {
            score += self.fragment_score(f1, f2);
        }
        score
    }

    /// Weighting of a plain pair; an absent node borrows the other's weight
    pub fn pair_weighting(&self, score: f32, a: Option<&FragNode>, b: Option<&FragNode>) -> f32 {
        match &self.weighting {
            Weighting::None => score,
            Weighting::NodeWeight => {
                let w1 = a.or(b).map_or(0.0, |n| n.weight);
                let w2 = b.or(a).map_or(0.0, |n| n.weight);
                (score as f64 + (w1 + w2) * sign(score)) as f32
            }
            Weighting::LossFrequency(table) => {
                let la = a.and_then(|n| n.loss.as_ref());
                let lb = b.and_then(|n| n.loss.as_ref());
                let w1 = 1.0 / table.factor(if a.is_some() { la } else { lb });
                let w2 = 1.0 / table.factor(if b.is_some() { lb } else { la });
                (w1 * w2 * score as f64) as f32
            }
        }
    }

    /// Weighting of a fused pair; an absent `other` mirrors the fused side
    pub fn union_weighting(
        &self,
        score: f32,
        child: &FragNode,
        parent: &FragNode,
        fused_loss: &Formula,
        other: Option<&FragNode>,
    ) -> f32 {
        match &self.weighting {
            Weighting::None => score,
            Weighting::NodeWeight => {
                let w1 = (child.weight + parent.weight) / 2.0;
                let w2 = other.map_or(w1, |n| n.weight);
                (score as f64 + (w1 + w2) * sign(score)) as f32
            }
            Weighting::LossFrequency(table) => {
                let w1 = 1.0 / table.factor(Some(fused_loss));
                let w2 = match other {
                    Some(n) => 1.0 / table.factor(n.loss.as_ref()),
                    None => w1,
                };
                (w1 * w2 * score as f64) as f32
            }
        }
    }
}

impl ScoringModel for NeutralLossScoring {
    fn score(&self, a: Option<&FragNode>, b: Option<&FragNode>) -> f32 {
        if a.is_none() && b.is_none() {
            return self.params.null_null;
        }
        let score = self.label_score(
            a.and_then(|n| n.loss.as_ref()),
            b.and_then(|n| n.loss.as_ref()),
            a.and_then(|n| n.fragment.as_ref()),
            b.and_then(|n| n.fragment.as_ref()),
        );
        self.pair_weighting(score, a, b)
    }

    fn score_union(&self, child: &FragNode, parent: &FragNode, other: Option<&FragNode>) -> f32 {
        let (Some(cl), Some(pl)) = (&child.loss, &parent.loss) else {
            return f32::NEG_INFINITY;
        };
        let fused_loss = cl.add(pl);
        let fused_fragment = match (&child.fragment, &parent.fragment) {
            (Some(cf), Some(pf)) => Some(cf.add(pf)),
            _ => None,
        };
        let score = self.label_score(
            Some(&fused_loss),
            other.and_then(|n| n.loss.as_ref()),
            fused_fragment.as_ref(),
            other.and_then(|n| n.fragment.as_ref()),
        );
        self.union_weighting(score, child, parent, &fused_loss, other)
    }

    fn union_score(&self) -> f32 {
        self.params.union
    }

    fn null_null(&self) -> f32 {
        self.params.null_null
    }

    fn root_score(&self, a: &FragNode, b: &FragNode) -> f32 {
        let mut score = 0.0;
        if self.params.labels.uses_fragments() {
            score += self.fragment_score(a.fragment.as_ref(), b.fragment.as_ref());
        }
        if self.params.one_node_penalty && matches!(self.weighting, Weighting::NodeWeight) {
            score += (a.weight + b.weight) as f32;
        }
        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn f(s: &str) -> Formula {
        Formula::parse(s).unwrap()
    }

    fn node(loss: &str, weight: f64) -> FragNode {
        FragNode::new(0).with_loss(f(loss)).with_weight(weight)
    }

    #[test]
    fn test_nl_classify() {
        let scoring = NeutralLossScoring::default();
        assert_eq!(scoring.classify(&f("C2H4"), &f("C2H2")), LossDiff::H2);
        // H2O lost on one side only
        assert_eq!(
            scoring.classify(&f("C2H6O"), &f("C2H4")),
            LossDiff::FunctionalGroupFirstOrder
        );
        // O replaced by S
        assert_eq!(
            scoring.classify(&f("CH2O"), &f("CH2S")),
            LossDiff::FunctionalGroupSecondOrder
        );
        assert_eq!(scoring.classify(&f("C6H6"), &f("N2")), LossDiff::NotCommon);

        let mut params = NeutralLossParams::default();
        params.test_rdiff = false;
        let plain = NeutralLossScoring::new(params, Weighting::None);
        assert_eq!(plain.classify(&f("CH2O"), &f("CH2S")), LossDiff::NotCommon);

        let mut params = NeutralLossParams::default();
        params.similar_mass_ppm = Some(50.0);
        let massy = NeutralLossScoring::new(params, Weighting::None);
        // CO and N2 differ by about 0.011 Da
        assert_eq!(massy.classify(&f("CO"), &f("N2")), LossDiff::NotCommon);
        assert_eq!(massy.classify(&f("C2H4"), &f("C2H4")), LossDiff::SimilarMass);
    }

    #[test]
    fn test_nl_classify_shifted() {
        let mut params = NeutralLossParams::default();
        params.test_rdiff_h2 = true;
        params.test_h2 = false;
        let scoring = NeutralLossScoring::new(params, Weighting::None);
        // O for S, plus one double bond
        assert_eq!(
            scoring.classify(&f("CH4O"), &f("CH2S")),
            LossDiff::FunctionalGroupPlusH2
        );
    }

    #[test]
    fn test_nl_loss_score() {
        let scoring = NeutralLossScoring::default();
        let p = &scoring.params;

        // common loss pair
        assert_eq!(scoring.loss_score(Some(&f("H2O")), Some(&f("H2O"))), p.cnl_cnl);
        // rare loss pair: 5 + 1 * 9
        assert_eq!(scoring.loss_score(Some(&f("C3H3N3")), Some(&f("C3H3N3"))), 14.0);
        assert_eq!(scoring.loss_score(Some(&f("CO")), None), -8.0);
        assert_eq!(scoring.loss_score(None, None), 0.0);
        // H2 difference: 3 + 1 * 2
        assert_eq!(scoring.loss_score(Some(&f("C2H4")), Some(&f("C2H2"))), 5.0);
        // unrelated: -5 - 1 * symdiff
        let symdiff = f("C6H6").symmetric_difference(&f("N2")) as f32;
        assert_eq!(
            scoring.loss_score(Some(&f("C6H6")), Some(&f("N2"))),
            -5.0 - symdiff
        );
    }

    #[test]
    fn test_nl_fragments() {
        let mut params = NeutralLossParams::default();
        params.labels = LabelMode::FragmentsOnly;
        let scoring = NeutralLossScoring::new(params, Weighting::None);

        let a = FragNode::new(0).with_fragment(f("C6H12O6"));
        let b = FragNode::new(1).with_fragment(f("C6H12O6"));
        let c = FragNode::new(2).with_fragment(f("C6H10O5"));
        assert_eq!(scoring.score(Some(&a), Some(&b)), 5.0 + 24.0);
        assert_eq!(scoring.score(Some(&a), Some(&c)), -5.0 - 3.0);
        assert_eq!(scoring.root_score(&a, &b), 29.0);

        let losses_only = NeutralLossScoring::default();
        assert_eq!(losses_only.root_score(&a, &b), 0.0);
    }

    #[test]
    fn test_nl_union() {
        let scoring = NeutralLossScoring::default();
        let child = node("H2O", 0.0);
        let parent = node("CO", 0.0);
        let other = node("CH2O2", 0.0);
        // fused CH2O2 is a common loss
        assert_eq!(scoring.score_union(&child, &parent, Some(&other)), 2.0);
        assert_eq!(scoring.score_union(&child, &parent, None), -8.0);
        assert_eq!(
            scoring.score_union(&child, &FragNode::new(3), Some(&other)),
            f32::NEG_INFINITY
        );
    }

    #[test]
    fn test_nl_node_weighting() {
        let scoring = NeutralLossScoring::new(NeutralLossParams::default(), Weighting::NodeWeight);
        let a = node("CO", 1.5);
        let b = node("CO", 0.5);
        // 2 + (1.5 + 0.5)
        assert_relative_eq!(scoring.score(Some(&a), Some(&b)), 4.0);
        // -8 - (1.5 + 1.5)
        assert_relative_eq!(scoring.score(Some(&a), None), -11.0);

        let child = node("H2O", 1.0);
        let parent = node("CO", 3.0);
        // fused CH2O2 against CO is a first order H2O difference: 2 + 0.5 * 3,
        // then (mean of 1 and 3) + 0.5
        assert_relative_eq!(scoring.score_union(&child, &parent, Some(&b)), 6.0);
        assert_relative_eq!(scoring.score_union(&child, &parent, None), -12.0);
    }

    #[test]
    fn test_nl_frequency_weighting() {
        let mut table = LossFrequencyTable::new();
        table.insert(f("CO"), 4);
        table.insert(f("H2O"), 2);
        assert_relative_eq!(table.factor(Some(&f("CO"))), 4.0);
        assert_relative_eq!(table.factor(Some(&f("H2O"))), 2.5);
        assert_relative_eq!(table.factor(Some(&f("N2"))), 1.75);
        assert_relative_eq!(table.factor(None), 1.75);

        let scoring = NeutralLossScoring::new(
            NeutralLossParams::default(),
            Weighting::LossFrequency(Arc::new(table)),
        );
        let a = node("CO", 0.0);
        let b = node("CO", 0.0);
        // cnl_cnl 2 / (4 * 4)
        assert_relative_eq!(scoring.score(Some(&a), Some(&b)), 0.125);
        // gap -8 / (4 * 4), both factors from the present node
        assert_relative_eq!(scoring.score(Some(&a), None), -0.5);
    }

    #[test]
    fn test_nl_params_reader() {
        let text = "# tuned\ngap = -4\nlabels = both\nsimilar_mass_ppm = 10\ntest_h2 = false\n";
        let params = NeutralLossParams::from_reader(text.as_bytes()).unwrap();
        assert_eq!(params.gap, -4.0);
        assert_eq!(params.labels, LabelMode::LossesAndFragments);
        assert_eq!(params.similar_mass_ppm, Some(10.0));
        assert!(!params.test_h2);

        assert!(NeutralLossParams::from_reader("bogus = 1".as_bytes()).is_err());
        assert!(NeutralLossParams::from_reader("gap: 1".as_bytes()).is_err());
        assert!(NeutralLossParams::from_reader("gap = x".as_bytes()).is_err());
    }

    #[test]
    fn test_loss_frequency_from_trees() {
        let trees =
            FragTree::from_newick_multi("(CO,CO,H2O)root;\n((CO)CO)root2;\n").unwrap();
        let table = LossFrequencyTable::from_trees(&trees);
        assert_eq!(table.count(Some(&f("CO"))), 4);
        assert_eq!(table.count(Some(&f("H2O"))), 1);
        assert_eq!(table.count(None), 0);

        let read = LossFrequencyTable::from_reader("CO 10\nH2O 3\n\n".as_bytes()).unwrap();
        assert_eq!(read.count(Some(&f("CO"))), 10);
        assert_relative_eq!(read.factor(Some(&f("CO"))), 4.0);
    }
}
