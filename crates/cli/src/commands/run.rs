// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry run` - Run a registered function remotely and print its result

use anyhow::Result;
use clap::Args;
use ferry_capture::CallArguments;
use ferry_engine::{Ferry, WaitError};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use crate::exit_error::{code_for, codes, ExitError};
use crate::output::{print_result, OutputFormat};

#[derive(Args)]
pub struct RunArgs {
    /// Registered function to call
    pub target: String,

    /// Cluster config file (TOML or HCL)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Units file declaring capturable definitions
    #[arg(long, short = 'u')]
    pub units: PathBuf,

    /// Positional argument as JSON (repeatable, in order)
    #[arg(long = "arg", value_name = "JSON", value_parser = parse_json)]
    pub args: Vec<Value>,

    /// Keyword argument as NAME=JSON (repeatable)
    #[arg(long = "kwarg", value_name = "NAME=JSON", value_parser = parse_kwarg)]
    pub kwargs: Vec<(String, Value)>,

    /// Stop waiting after this long (e.g. "30m"); the job keeps running
    #[arg(long, value_parser = parse_timeout)]
    pub timeout: Option<Duration>,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

impl RunArgs {
    fn call_arguments(&self) -> CallArguments {
        CallArguments {
            args: self.args.clone(),
            kwargs: self.kwargs.iter().cloned().collect(),
        }
    }
}

pub(crate) fn parse_json(s: &str) -> Result<Value, String> {
    serde_json::from_str(s).map_err(|e| format!("not valid JSON ({}); quote strings as '\"text\"'", e))
}

pub(crate) fn parse_kwarg(s: &str) -> Result<(String, Value), String> {
    let (name, json) = s.split_once('=').ok_or_else(|| format!("expected NAME=JSON, got {:?}", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing argument name in {:?}", s));
    }
    Ok((name.to_string(), parse_json(json)?))
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    ferry_core::parse_duration(s)
}

pub async fn handle(args: RunArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let registry = super::load_units(&args.units)?;
    let ferry = Ferry::new(config, registry).map_err(ExitError::from)?;

    let future = ferry.spawn(&args.target, args.call_arguments()).map_err(ExitError::from)?;
    tracing::info!(job_id = %future.id(), target_fn = %args.target, "job submitted");

    let outcome = tokio::select! {
        outcome = future.await_result(args.timeout) => outcome,
        _ = tokio::signal::ctrl_c() => {
            future.cancel();
            future.await_result(None).await
        }
    };

    match outcome {
        Ok(result) => {
            print_result(future.id(), &result, args.format)?;
            match result.error_kind() {
                // Already reported on stderr
                Some(kind) => Err(ExitError::new(code_for(kind), String::new()).into()),
                None => Ok(()),
            }
        }
        Err(e @ WaitError::Timeout(_)) => Err(ExitError::new(
            codes::TIMEOUT,
            format!("{} (job {} is still {})", e, future.id(), future.state()),
        )
        .into()),
        Err(e @ WaitError::Abandoned) => Err(ExitError::new(codes::EXECUTION, e.to_string()).into()),
    }
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
