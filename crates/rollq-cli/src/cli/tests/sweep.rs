//! Tests for the sweep subcommand.

use super::parse;
use crate::cli::{Cli, CliCommand};
use clap::Parser;

#[test]
fn cli_parse_sweep() {
    assert!(matches!(parse(&["rollq", "sweep"]), CliCommand::Sweep));
}

#[test]
fn cli_parse_sweep_takes_no_arguments() {
    assert!(Cli::try_parse_from(["rollq", "sweep", "extra"]).is_err());
}

#[test]
fn cli_parse_requires_subcommand() {
    assert!(Cli::try_parse_from(["rollq"]).is_err());
}

#[test]
fn sweep_only_touches_the_rollq_dir_under_spool_dir() {
    let dir = tempfile::tempdir().unwrap();
    let user = dir.path().join("2023");
    std::fs::create_dir_all(&user).unwrap();
    let stale = dir.path().join("rollq").join("2147483646");
    std::fs::create_dir_all(&stale).unwrap();
    let cfg = rollq_core::config::RollqConfig {
        spool_dir: Some(dir.path().to_path_buf()),
        ..Default::default()
    };
    crate::cli::commands::run_sweep(&cfg).unwrap();
    assert!(user.exists());
    assert!(!stale.exists());
}
