// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry pack` - Write a target's bundle to disk

use anyhow::{Context, Result};
use clap::Args;
use ferry_engine::DispatchError;
use std::path::PathBuf;

use crate::exit_error::ExitError;
use crate::output::OutputFormat;

#[derive(Args)]
pub struct PackArgs {
    /// Registered function to pack
    pub target: String,

    /// Units file declaring capturable definitions
    #[arg(long, short = 'u')]
    pub units: PathBuf,

    /// Where to write the bundle archive
    #[arg(long, short = 'o')]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

pub fn handle(args: PackArgs) -> Result<()> {
    let registry = super::load_units(&args.units)?;
    let manifest = super::build_manifest(&registry, &args.target)?;
    let bundle = ferry_capture::pack(&manifest)
        .map_err(|e| ExitError::from(DispatchError::from(e)))?;
    bundle
        .write_to(&args.out)
        .with_context(|| format!("failed to write {}", args.out.display()))?;

    match args.format {
        OutputFormat::Text => println!("{}", bundle.id),
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "bundle_id": bundle.id,
                "size": bundle.size(),
                "path": args.out,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}
