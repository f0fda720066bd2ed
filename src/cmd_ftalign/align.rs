use clap::*;
use ftalign::libs::align::neutral_loss::{
    LossFrequencyTable, NeutralLossParams, NeutralLossScoring, Weighting,
};
use ftalign::libs::align::*;
use ftalign::libs::fragtree::FragTree;
use itertools::Itertools;
use rayon::prelude::*;
use std::sync::Arc;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("align")
        .about("Aligns fragmentation trees")
        .after_help(
            r###"
Aligns every pair of trees in <infile>, or every tree of <infile> against
every tree of <compare>.

Input format:
* Newick trees, one per `;`. Node labels are neutral loss formulas, the root
  label is the tree name. NHX tags: F=fragment formula, N=name, W=weight.

Output format (TSV):
  Tree1  Tree2  Score  [normalized scores...]  [PLike]  [PullUps]
* `NA` marks undefined values and pairs below the threshold
* With --backtrace, the correspondence tree follows each row as `#` lines

Modes:
* global - root against root
* local  - best scoring pair of subtrees
* egf    - end gaps free, one tree is consumed completely

Normalizations:
* none, tree-arith, tree-geo, self-arith, self-geo, self-min, p-value, all
* p-value needs --gumbel, a file of `MINxMAX location scale confidence` lines

Examples:
1. All-vs-all, simple scoring:
   ftalign align tests/ftalign/trees.nwk

2. Neutral loss scoring with node union and self-alignment normalization:
   ftalign align tests/ftalign/trees.nwk --scoring nl --union --normal self-arith

3. One tree against a library, with pull-up search:
   ftalign align query.nwk library.nwk --pull-ups --parallel 4
"###,
        )
        .arg(
            Arg::new("infile")
                .required(true)
                .num_args(1)
                .index(1)
                .help("Input filename. [stdin] for standard input"),
        )
        .arg(
            Arg::new("compare")
                .num_args(1)
                .index(2)
                .help("Trees to align against; all-vs-all within <infile> if absent"),
        )
        .arg(
            Arg::new("mode")
                .long("mode")
                .num_args(1)
                .value_parser(["global", "local", "egf"])
                .default_value("global")
                .help("Alignment mode"),
        )
        .arg(
            Arg::new("scoring")
                .long("scoring")
                .num_args(1)
                .value_parser(["simple", "nl"])
                .default_value("simple")
                .help("Scoring model: label identity or neutral loss chemistry"),
        )
        .arg(
            Arg::new("params")
                .long("params")
                .num_args(1)
                .help("`key = value` file of neutral loss scoring parameters"),
        )
        .arg(
            Arg::new("weighting")
                .long("weighting")
                .num_args(1)
                .value_parser(["none", "node", "frequency"])
                .default_value("none")
                .help("Neutral loss score weighting"),
        )
        .arg(
            Arg::new("frequency")
                .long("frequency")
                .num_args(1)
                .help("`formula count` file for frequency weighting; counted from the input if absent"),
        )
        .arg(
            Arg::new("union")
                .long("union")
                .action(ArgAction::SetTrue)
                .help("Allow a node to merge with its parent"),
        )
        .arg(
            Arg::new("normal")
                .long("normal")
                .num_args(1)
                .default_value("none")
                .value_parser([
                    "none",
                    "tree-arith",
                    "tree-geo",
                    "self-arith",
                    "self-geo",
                    "self-min",
                    "p-value",
                    "all",
                ])
                .help("Score normalization"),
        )
        .arg(
            Arg::new("gumbel")
                .long("gumbel")
                .num_args(1)
                .help("Gumbel parameters per tree size pair"),
        )
        .arg(
            Arg::new("plike")
                .long("plike")
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(usize))
                .help("Number of shuffles for the p-like value, 0 to skip"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .default_value("0")
                .value_parser(value_parser!(u64))
                .help("Seed of the shuffles"),
        )
        .arg(
            Arg::new("pull_ups")
                .long("pull-ups")
                .action(ArgAction::SetTrue)
                .help("Try reattaching each node to its grandparent"),
        )
        .arg(
            Arg::new("threshold")
                .long("threshold")
                .num_args(1)
                .value_parser(value_parser!(f32))
                .help("Skip pairs whose best attainable score is lower"),
        )
        .arg(
            Arg::new("max_degree")
                .long("max-degree")
                .num_args(1)
                .default_value("20")
                .value_parser(value_parser!(usize))
                .help("Reject trees with more children per node"),
        )
        .arg(
            Arg::new("no_root")
                .long("no-root")
                .action(ArgAction::SetTrue)
                .help("Do not score the two roots against each other"),
        )
        .arg(
            Arg::new("backtrace")
                .long("backtrace")
                .action(ArgAction::SetTrue)
                .help("Print the correspondence tree of each pair"),
        )
        .arg(
            Arg::new("parallel")
                .long("parallel")
                .short('p')
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of threads for parallel processing"),
        )
        .arg(
            Arg::new("outfile")
                .short('o')
                .long("outfile")
                .num_args(1)
                .default_value("stdout")
                .help("Output filename. [stdout] for screen"),
        )
}

// command implementation
pub fn execute(args: &ArgMatches) -> anyhow::Result<()> {
    //----------------------------
    // Args
    //----------------------------
    let infile = args.get_one::<String>("infile").unwrap();
    let writer = intspan::writer(args.get_one::<String>("outfile").unwrap());

    let opt_parallel = *args.get_one::<usize>("parallel").unwrap();
    rayon::ThreadPoolBuilder::new()
        .num_threads(opt_parallel)
        .build_global()?;

    let config = AlignConfig {
        mode: args
            .get_one::<String>("mode")
            .unwrap()
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?,
        node_union: args.get_flag("union"),
        score_root: !args.get_flag("no_root"),
        threshold: args.get_one::<f32>("threshold").copied(),
        max_degree: *args.get_one::<usize>("max_degree").unwrap(),
        normalization: args
            .get_one::<String>("normal")
            .unwrap()
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))?,
        plike_runs: *args.get_one::<usize>("plike").unwrap(),
        seed: *args.get_one::<u64>("seed").unwrap(),
        pull_ups: args.get_flag("pull_ups"),
        backtrace: args.get_flag("backtrace"),
    };

    //----------------------------
    // Trees
    //----------------------------
    let trees = FragTree::from_file(infile)?;
    let others = match args.get_one::<String>("compare") {
        Some(compare) => Some(FragTree::from_file(compare)?),
        None => None,
    };
    log::info!(
        "Read {} trees from {}{}",
        trees.len(),
        infile,
        others
            .as_ref()
            .map(|o| format!(", {} to compare against", o.len()))
            .unwrap_or_default()
    );

    let scoring: Box<dyn ScoringModel> = match args.get_one::<String>("scoring").unwrap().as_str() {
        "nl" => {
            let params = match args.get_one::<String>("params") {
                Some(file) => NeutralLossParams::from_file(file)?,
                None => NeutralLossParams::default(),
            };
            let weighting = match args.get_one::<String>("weighting").unwrap().as_str() {
                "node" => Weighting::NodeWeight,
                "frequency" => {
                    let table = match args.get_one::<String>("frequency") {
                        Some(file) => LossFrequencyTable::from_file(file)?,
                        None => {
                            let mut all = trees.clone();
                            all.extend(others.iter().flatten().cloned());
                            LossFrequencyTable::from_trees(&all)
                        }
                    };
                    Weighting::LossFrequency(Arc::new(table))
                }
                _ => Weighting::None,
            };
            Box::new(NeutralLossScoring::new(params, weighting))
        }
        _ => Box::new(SimpleScoring::default()),
    };

    let mut aligner = TreeAligner::new(scoring, config.clone());
    if let Some(file) = args.get_one::<String>("gumbel") {
        aligner = aligner.with_gumbel(GumbelTable::from_file(file)?);
    } else if config.normalization.variants().contains(&Normalization::PValue) {
        log::warn!("No --gumbel table given, p-values will be NA");
    }

    //----------------------------
    // Pairs
    //----------------------------
    let (left, right) = match &others {
        Some(others) => (&trees, others),
        None => (&trees, &trees),
    };
    let pairs: Vec<(usize, usize)> = match &others {
        Some(others) => (0..trees.len())
            .cartesian_product(0..others.len())
            .collect(),
        None => (0..trees.len()).tuple_combinations().collect(),
    };

    let reports: Vec<Result<AlignReport, AlignError>> = pairs
        .par_iter()
        .map(|&(i, j)| aligner.align(&left[i], &right[j]))
        .collect();

    //----------------------------
    // Output
    //----------------------------
    let mut sink = TsvSink::new(writer, &config);
    for (&(i, j), report) in pairs.iter().zip(reports) {
        let (t1, t2) = (&left[i], &right[j]);
        let (name1, name2) = (tree_name(t1, i), tree_name(t2, j));
        match report {
            Ok(report) => sink.accept(&name1, &name2, t1, t2, &report)?,
            Err(AlignError::TooBushy { degree, limit }) => {
                log::warn!(
                    "Skip {} vs {}: degree {} exceeds limit {}",
                    name1,
                    name2,
                    degree,
                    limit
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn tree_name(tree: &FragTree, idx: usize) -> String {
    match tree.name() {
        Some(name) => name.to_string(),
        None => format!("tree_{}", idx + 1),
    }
}
