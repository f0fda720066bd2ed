extern crate clap;
use clap::*;

mod cmd_ftalign;

fn main() -> anyhow::Result<()> {
    let app = Command::new("ftalign")
        .version(crate_version!())
        .author(crate_authors!())
        .about("`ftalign` - Fragmentation Tree Alignment")
        .propagate_version(true)
        .arg_required_else_help(true)
        .color(ColorChoice::Auto)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::Count)
                .help("Log progress to stderr, -vv for debug output"),
        )
        .subcommand(cmd_ftalign::align::make_subcommand())
        .subcommand(cmd_ftalign::random::make_subcommand())
        .subcommand(cmd_ftalign::stat::make_subcommand())
        .after_help(
            r###"Subcommands:

* align  - Align fragmentation trees all-vs-all or against a second file
* random - Generate random fragmentation trees
* stat   - Size, depth and branching of trees

Set RUST_LOG for finer control over logging.

"###,
        );

    let matches = app.get_matches();

    let level = match matches.get_count("verbose") {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    match matches.subcommand() {
        Some(("align", sub_matches)) => cmd_ftalign::align::execute(sub_matches),
        Some(("random", sub_matches)) => cmd_ftalign::random::execute(sub_matches),
        Some(("stat", sub_matches)) => cmd_ftalign::stat::execute(sub_matches),
        _ => unreachable!(),
    }?;

    Ok(())
}
