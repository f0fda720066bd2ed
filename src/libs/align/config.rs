use std::fmt;
use std::str::FromStr;

/// Largest child count the subset tables accept, whatever the configuration says.
pub const DEGREE_CEILING: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlignMode {
    /// Root against root, every node accounted for
    Global,
    /// Best scoring pair of subforests, negative partial scores clamped
    Local,
    /// Clamped like local, but one tree must be consumed completely
    EndGapFree,
}

impl FromStr for AlignMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "global" => Ok(AlignMode::Global),
            "local" => Ok(AlignMode::Local),
            "egf" | "end-gap-free" => Ok(AlignMode::EndGapFree),
            _ => Err(format!("Unknown alignment mode: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    None,
    TreeSizeArithmetic,
    TreeSizeGeometric,
    SelfAlignArithmetic,
    SelfAlignGeometric,
    SelfAlignMin,
    PValue,
    /// Every variant above, reported side by side
    All,
}

impl Normalization {
    /// The variants reported by `All`, in output order
    pub const ALL_VARIANTS: [Normalization; 6] = [
        Normalization::SelfAlignArithmetic,
        Normalization::SelfAlignGeometric,
        Normalization::TreeSizeArithmetic,
        Normalization::TreeSizeGeometric,
        Normalization::SelfAlignMin,
        Normalization::PValue,
    ];

    /// Variants computed for this setting
    pub fn variants(&self) -> Vec<Normalization> {
        match self {
            Normalization::None => vec![],
            Normalization::All => Self::ALL_VARIANTS.to_vec(),
            other => vec![*other],
        }
    }

    /// Column header
    pub fn header(&self) -> &'static str {
        match self {
            Normalization::None => "Raw",
            Normalization::TreeSizeArithmetic => "TreeArith",
            Normalization::TreeSizeGeometric => "TreeGeo",
            Normalization::SelfAlignArithmetic => "SelfArith",
            Normalization::SelfAlignGeometric => "SelfGeo",
            Normalization::SelfAlignMin => "SelfMin",
            Normalization::PValue => "PValue",
            Normalization::All => "All",
        }
    }
}

impl FromStr for Normalization {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Normalization::None),
            "tree-arith" => Ok(Normalization::TreeSizeArithmetic),
            "tree-geo" => Ok(Normalization::TreeSizeGeometric),
            "self-arith" => Ok(Normalization::SelfAlignArithmetic),
            "self-geo" => Ok(Normalization::SelfAlignGeometric),
            "self-min" => Ok(Normalization::SelfAlignMin),
            "p-value" => Ok(Normalization::PValue),
            "all" => Ok(Normalization::All),
            _ => Err(format!("Unknown normalization: {}", s)),
        }
    }
}

impl fmt::Display for Normalization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.header())
    }
}

/// Options fixed before an alignment call.
#[derive(Debug, Clone)]
pub struct AlignConfig {
    pub mode: AlignMode,
    /// Allow a node to be merged with its parent before matching
    pub node_union: bool,
    /// Add the scoring model's root anchor to the final score
    pub score_root: bool,
    /// Abandon the alignment if the best attainable score is lower
    pub threshold: Option<f32>,
    /// Reject nodes with more children than this
    pub max_degree: usize,
    pub normalization: Normalization,
    /// Number of shuffles for the p-like value, 0 disables it
    pub plike_runs: usize,
    /// Base seed of the shuffles
    pub seed: u64,
    /// Try reattaching every node to its grandparent
    pub pull_ups: bool,
    /// Build the correspondence tree
    pub backtrace: bool,
}

impl Default for AlignConfig {
    fn default() -> Self {
        Self {
            mode: AlignMode::Global,
            node_union: false,
            score_root: true,
            threshold: None,
            max_degree: 20,
            normalization: Normalization::None,
            plike_runs: 0,
            seed: 0,
            pull_ups: false,
            backtrace: false,
        }
    }
}

impl AlignConfig {
    /// The same engine settings with every post-processing step switched off
    pub fn raw(&self) -> AlignConfig {
        AlignConfig {
            normalization: Normalization::None,
            plike_runs: 0,
            pull_ups: false,
            backtrace: false,
            ..self.clone()
        }
    }

    /// Effective degree bound
    pub fn degree_limit(&self) -> usize {
        self.max_degree.min(DEGREE_CEILING)
    }
}
