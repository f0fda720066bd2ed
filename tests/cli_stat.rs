use assert_cmd::Command;
use predicates::prelude::*;

// ================================================================================================
// ftalign stat
// ================================================================================================

#[test]
fn command_stat_basic() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd.arg("stat").arg("tests/ftalign/trees.nwk").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 4);
    assert!(stdout.contains("Tree\tnodes\tleaves\tdepth\tmax_degree\n"));
    assert!(stdout.contains("a\t3\t2\t1\t2\n"));
    assert!(stdout.contains("c\t4\t2\t2\t2\n"));

    Ok(())
}

#[test]
fn command_stat_invalid_label() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("stat")
        .arg("stdin")
        .write_stdin("(CO,Qz)root;\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid node label"));

    Ok(())
}
