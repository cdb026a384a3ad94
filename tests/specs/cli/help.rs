//! CLI help output specs
//!
//! Verify help text displays for all commands.

use crate::prelude::*;

#[test]
fn ferry_no_args_shows_usage_and_exits_zero() {
    cli().passes().stdout_has("Usage:");
}

#[test]
fn ferry_help_lists_commands() {
    cli()
        .args(&["--help"])
        .passes()
        .stdout_has("run")
        .stdout_has("manifest")
        .stdout_has("pack")
        .stdout_has("script");
}

#[test]
fn ferry_run_help_shows_argument_flags() {
    cli()
        .args(&["run", "--help"])
        .passes()
        .stdout_has("Usage:")
        .stdout_has("--arg")
        .stdout_has("--kwarg")
        .stdout_has("--timeout");
}

#[test]
fn ferry_version_shows_version() {
    cli().args(&["--version"]).passes().stdout_has("0.1");
}

#[test]
fn unknown_subcommand_is_a_usage_error() {
    cli().args(&["launch"]).fails_with(exit::USAGE);
}
