use clap::*;
use ftalign::libs::fragtree::FragTree;
use std::io::Write;

// Create clap subcommand arguments
pub fn make_subcommand() -> Command {
    Command::new("stat")
        .about("Prints statistics about fragmentation trees")
        .after_help(
            r###"
Prints one line per tree.

Input format:
* Newick trees filename or 'stdin'

Output format (TSV):
  Tree  nodes  leaves  depth  max_degree

Examples:
1. Statistics of all trees:
   ftalign stat tests/ftalign/trees.nwk
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
    let infile = args.get_one::<String>("infile").unwrap();

    let trees = FragTree::from_file(infile)?;

    writer.write_fmt(format_args!("Tree\tnodes\tleaves\tdepth\tmax_degree\n"))?;
    for (i, tree) in trees.iter().enumerate() {
        let name = match tree.name() {
            Some(name) => name.to_string(),
            None => format!("tree_{}", i + 1),
        };
        writer.write_fmt(format_args!(
            "{}\t{}\t{}\t{}\t{}\n",
            name,
            tree.len(),
            tree.get_leaves().len(),
            tree.depth(),
            tree.max_degree()
        ))?;
    }

    Ok(())
}
