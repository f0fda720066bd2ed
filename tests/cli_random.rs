use assert_cmd::Command;
use tempfile::Builder;

// ================================================================================================
// ftalign random
// ================================================================================================

#[test]
fn command_random_default() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd.arg("random").output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.trim_end().ends_with(")random_1;"));

    Ok(())
}

#[test]
fn command_random_losses() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd
        .arg("random")
        .arg("-n")
        .arg("3")
        .arg("--nodes")
        .arg("4")
        .arg("--degree")
        .arg("3")
        .arg("--loss")
        .arg("H2O,CO")
        .output()?;
    let stdout = String::from_utf8(output.stdout)?;

    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("(H2O:1[&&NHX:N=NL_1],CO:1[&&NHX:N=NL_2],H2O:1[&&NHX:N=NL_3])"));
    assert!(lines[2].ends_with("random_3;"));

    Ok(())
}

#[test]
fn command_random_then_stat() -> anyhow::Result<()> {
    let temp_file = Builder::new().suffix(".nwk").tempfile()?;
    let outfile = temp_file.path().to_str().unwrap();

    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("random")
        .arg("-n")
        .arg("2")
        .arg("--nodes")
        .arg("7")
        .arg("--seed")
        .arg("7")
        .arg("-o")
        .arg(outfile)
        .assert()
        .success();

    let mut cmd = Command::cargo_bin("ftalign")?;
    let output = cmd.arg("stat").arg(outfile).output()?;
    let stdout = String::from_utf8(output.stdout)?;

    assert!(stdout.contains("random_1\t7\t4\t2\t2\n"));
    assert!(stdout.contains("random_2\t7\t4\t2\t2\n"));

    Ok(())
}

#[test]
fn command_random_bad_loss() -> anyhow::Result<()> {
    let mut cmd = Command::cargo_bin("ftalign")?;
    cmd.arg("random").arg("--loss").arg("Qq").assert().failure();

    Ok(())
}
