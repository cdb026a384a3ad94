// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry script` - Render the submission script without submitting

use anyhow::Result;
use clap::Args;
use ferry_engine::Ferry;
use std::path::PathBuf;

use crate::exit_error::ExitError;

#[derive(Args)]
pub struct ScriptArgs {
    /// Registered function the script would run
    pub target: String,

    /// Cluster config file (TOML or HCL)
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Units file declaring capturable definitions
    #[arg(long, short = 'u')]
    pub units: PathBuf,
}

pub fn handle(args: ScriptArgs) -> Result<()> {
    let config = super::load_config(args.config.as_deref())?;
    let registry = super::load_units(&args.units)?;
    let ferry = Ferry::new(config, registry).map_err(ExitError::from)?;
    let script = ferry.render_script(&args.target).map_err(ExitError::from)?;
    print!("{}", script);
    Ok(())
}
