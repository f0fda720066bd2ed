use clap::*;
use ftalign::libs::align::neutral_loss::common_losses;
use ftalign::libs::formula::Formula;
use ftalign::libs::fragtree::FragTree;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("random")
        .about("Generates random fragmentation trees")
        .after_help(
            r###"
Builds trees breadth-first: each parent takes --degree children before the
next node in line becomes a parent. Losses are assigned from --loss in order,
cycling when the list runs out; the common neutral losses are used by default.

With --seed, the children of every node are shuffled, tree k using seed + k.

Examples:
1. One tree of 10 nodes:
   ftalign random

2. Five binary trees of 7 nodes with two losses:
   ftalign random -n 5 --nodes 7 --degree 2 --loss H2O,CO
"###,
        )
        .arg(
            Arg::new("count")
                .short('n')
                .long("count")
                .num_args(1)
                .default_value("1")
                .value_parser(value_parser!(usize))
                .help("Number of trees"),
        )
        .arg(
            Arg::new("nodes")
                .long("nodes")
                .num_args(1)
                .default_value("10")
                .value_parser(value_parser!(usize))
                .help("Nodes per tree, the root included"),
        )
        .arg(
            Arg::new("degree")
                .long("degree")
                .num_args(1)
                .default_value("2")
                .value_parser(value_parser!(usize))
                .help("Children per inner node"),
        )
        .arg(
            Arg::new("loss")
                .long("loss")
                .num_args(1)
                .value_delimiter(',')
                .action(ArgAction::Append)
                .help("Loss formulas, comma separated"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .num_args(1)
                .value_parser(value_parser!(u64))
                .help("Shuffle children with this seed"),
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
    let mut writer = intspan::writer(args.get_one::<String>("outfile").unwrap());

    let opt_count = *args.get_one::<usize>("count").unwrap();
    let opt_nodes = *args.get_one::<usize>("nodes").unwrap();
    let opt_degree = *args.get_one::<usize>("degree").unwrap();
    let opt_seed = args.get_one::<u64>("seed").copied();

    let losses: Vec<Formula> = match args.get_many::<String>("loss") {
        Some(values) => values
            .map(|s| Formula::parse(s.trim()))
            .collect::<Result<_, _>>()?,
        None => common_losses().to_vec(),
    };

    for k in 0..opt_count {
        let mut tree = FragTree::random(opt_nodes, opt_degree, &losses);
        if let Some(root) = tree.get_root() {
            if let Some(node) = tree.get_node_mut(root) {
                node.name = Some(format!("random_{}", k + 1));
            }
        }
        if let Some(seed) = opt_seed {
            tree = tree.shuffled(seed.wrapping_add(k as u64));
        }
        writer.write_fmt(format_args!("{}\n", tree.to_newick()))?;
    }

    Ok(())
}
