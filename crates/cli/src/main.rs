// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `ferry`: run a registered function on a remote compute backend

mod color;
mod commands;
mod exit_error;
mod logging;
mod output;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{manifest, pack, run, script};
use crate::exit_error::ExitError;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("BUILD_GIT_HASH"), ")");

#[derive(Parser)]
#[command(name = "ferry", version = VERSION, about = "Ship a function to a remote scheduler and bring its result back")]
#[command(styles = color::styles())]
struct Cli {
    /// Write logs to a daily-rolled file in this directory instead of stderr
    #[arg(long, global = true, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a function remotely and print its result
    Run(run::RunArgs),
    /// Show the capture manifest for a function (no network)
    Manifest(manifest::ManifestArgs),
    /// Pack a function into a bundle archive
    Pack(pack::PackArgs),
    /// Print the submission script a run would use
    Script(script::ScriptArgs),
}

fn main() {
    let code = match execute() {
        Ok(()) => 0,
        Err(e) => report(&e),
    };
    std::process::exit(code);
}

fn execute() -> Result<()> {
    let cli = Cli::parse();
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    let _log_guard = logging::init(cli.log_dir.as_deref())?;

    match command {
        Commands::Run(args) => {
            let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
            runtime.block_on(run::handle(args))
        }
        Commands::Manifest(args) => manifest::handle(args),
        Commands::Pack(args) => pack::handle(args),
        Commands::Script(args) => script::handle(args),
    }
}

/// Print `e` and pick the exit code.
fn report(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<ExitError>() {
        Some(exit) => {
            if !exit.message.is_empty() {
                eprintln!("error: {}", exit.message);
            }
            exit.code
        }
        None => {
            eprintln!("error: {:#}", e);
            1
        }
    }
}
