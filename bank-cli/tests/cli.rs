use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::{BufRead, BufReader, Write};
use std::process::{Command, Stdio};

#[test]
fn bootstrap_creates_account() -> Result<(), Box<dyn std::error::Error>> {
    let user_id = "11111111-1111-1111-1111-111111111111";

    let mut bootstrap = Command::cargo_bin("bank-cli")?;
    bootstrap
        .arg("bootstrap-account")
        .arg("--user-id")
        .arg(user_id)
        .arg("--account-type")
        .arg("checking");
    bootstrap.assert().success().stdout(predicate::str::contains("account_id="));

    Ok(())
}

/// A piped-stdin session shares one in-memory store across every line, so
/// this is the only way to exercise bootstrap -> deposit -> reconcile
/// end to end against a single running process.
#[test]
fn bootstrap_deposit_and_reconcile_round_trip_in_one_session() -> Result<(), Box<dyn std::error::Error>> {
    let user_id = "11111111-1111-1111-1111-111111111111";

    let mut cmd = Command::cargo_bin("bank-cli")?;
    let mut child = cmd
        .arg("--non-interactive")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()?;

    let mut stdin = child.stdin.take().expect("piped stdin");
    let mut stdout = BufReader::new(child.stdout.take().expect("piped stdout"));

    writeln!(stdin, "bootstrap {user_id} checking")?;
    let mut bootstrap_line = String::new();
    stdout.read_line(&mut bootstrap_line)?;
    let account_id = bootstrap_line
        .trim()
        .strip_prefix("account_id=")
        .and_then(|rest| rest.split_whitespace().next())
        .expect("bootstrap prints account_id=<uuid> account_number=...");

    writeln!(stdin, "deposit {user_id} {account_id} 50.00")?;
    let mut deposit_line = String::new();
    stdout.read_line(&mut deposit_line)?;
    assert_eq!(deposit_line.trim(), "balance=50.00");

    writeln!(stdin, "reconcile {account_id}")?;
    let mut reconcile_line = String::new();
    stdout.read_line(&mut reconcile_line)?;
    assert_eq!(
        reconcile_line.trim(),
        "reconciled=true cached=50.00 ledger=50.00 entries=1"
    );

    drop(stdin);
    let status = child.wait()?;
    assert!(status.success());

    Ok(())
}

#[test]
fn unknown_subcommand_fails_with_usage() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("bank-cli")?;
    cmd.arg("not-a-real-command");
    cmd.assert().failure();

    Ok(())
}

#[test]
fn deposit_on_missing_account_reports_not_found() -> Result<(), Box<dyn std::error::Error>> {
    let user_id = "22222222-2222-2222-2222-222222222222";
    let account_id = "33333333-3333-3333-3333-333333333333";

    let mut cmd = Command::cargo_bin("bank-cli")?;
    cmd.arg("deposit")
        .arg("--user-id")
        .arg(user_id)
        .arg("--account-id")
        .arg(account_id)
        .arg("--amount")
        .arg("10.00");
    cmd.assert().failure();

    Ok(())
}
