// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ferry manifest` - Show what would be captured for a target

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use crate::output::{print_manifest, OutputFormat};

#[derive(Args)]
pub struct ManifestArgs {
    /// Registered function to analyse
    pub target: String,

    /// Units file declaring capturable definitions
    #[arg(long, short = 'u')]
    pub units: PathBuf,

    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

pub fn handle(args: ManifestArgs) -> Result<()> {
    let registry = super::load_units(&args.units)?;
    let manifest = super::build_manifest(&registry, &args.target)?;
    print_manifest(&manifest, args.format)
}
