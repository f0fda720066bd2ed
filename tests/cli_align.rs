use assert_cmd::Command;
use std::io::Write;
use tempfile::Builder;

// ================================================================================================
// ftalign align
// ================================================================================================

#[test]
fn command_align_all_vs_all() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/trees.nwk")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 4);
    assert_eq!(stdout.lines().next().unwrap(), "Tree1\tTree2\tScore");
    assert!(stdout.contains("a\tb\t30\n"));
    assert!(stdout.contains("a\tc\t5\n"));

    Ok(())
}

#[test]
fn command_align_compare_file() -> anyhow::Result<()> {
    let mut temp_file = Builder::new().suffix(".nwk").tempfile()?;
    writeln!(temp_file, "(CO,H2O)query;")?;
    let query = temp_file.path().to_str().unwrap();

    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg(query)
        .arg("tests/ftalign/trees.nwk")
        .arg("--normal")
        .arg("all")
        .arg("--gumbel")
        .arg("tests/ftalign/gumbel.txt")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout
        .lines()
        .next()
        .unwrap()
        .ends_with("SelfArith\tSelfGeo\tTreeArith\tTreeGeo\tSelfMin\tPValue"));
    assert!(stdout.contains("query\ta\t30\t100.0000\t100.0000\t100.0000\t100.0000\t"));
    // a 3x4 entry covers the larger tree
    let row_c = stdout.lines().find(|l| l.starts_with("query\tc\t")).unwrap();
    assert!(!row_c.ends_with("\tNA"));

    Ok(())
}

#[test]
fn command_align_backtrace() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/trees.nwk")
        .arg("--backtrace")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("# a <-> b\t10\troot\n"));
    assert!(stdout.contains("#   H2O <-> H2O\t10\tmatch\n"));
    assert!(stdout.contains("\tgap\n"));

    Ok(())
}

#[test]
fn command_align_local_union_nl() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/trees.nwk")
        .arg("--mode")
        .arg("local")
        .arg("--scoring")
        .arg("nl")
        .arg("--params")
        .arg("tests/ftalign/nl.params")
        .arg("--union")
        .arg("--parallel")
        .arg("2")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(output.status.success());
    assert_eq!(stdout.lines().count(), 4);
    for line in stdout.lines().skip(1) {
        let score: f32 = line.split('\t').nth(2).unwrap().parse()?;
        assert!(score >= 0.0);
    }

    Ok(())
}

#[test]
fn command_align_threshold() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/trees.nwk")
        .arg("--threshold")
        .arg("100")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("a\tb\tNA\n"));

    Ok(())
}

#[test]
fn command_align_too_bushy() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg("tests/ftalign/trees.nwk")
        .arg("--max-degree")
        .arg("1")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;
    let stderr = String::from_utf8(output.stderr)?;

    assert!(output.status.success());
    assert!(stdout.is_empty());
    assert!(stderr.contains("exceeds limit 1"));

    Ok(())
}

#[test]
fn command_align_pull_ups() -> anyhow::Result<()> {
    let mut temp_file = Builder::new().suffix(".nwk").tempfile()?;
    writeln!(temp_file, "((H2O)CO)x;")?;
    writeln!(temp_file, "(CO,H2O)y;")?;
    let infile = temp_file.path().to_str().unwrap();

    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("align")
        .arg(infile)
        .arg("--pull-ups")
        .arg("--plike")
        .arg("5")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(
        stdout.lines().next().unwrap(),
        "Tree1\tTree2\tScore\tPLike\tPullUps"
    );
    assert!(stdout.contains("x\ty\t30\t1.0000\t1\n"));
    assert!(stdout.contains("# pull-up: node"));

    Ok(())
}
