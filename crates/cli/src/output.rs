// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use crate::color;
use clap::ValueEnum;
use ferry_capture::CaptureManifest;
use ferry_core::{JobId, JobResult, Outcome};

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;

#[derive(Clone, Copy, Debug, Default, PartialEq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Success prints the value on stdout; failure prints the error and its
/// diagnostic on stderr.
pub fn print_result(job_id: &JobId, result: &JobResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => match &result.outcome {
            Outcome::Success(value) => println!("{}", serde_json::to_string_pretty(value)?),
            Outcome::Failure(_) => eprint!("{}", failure_text(job_id, result)),
        },
        OutputFormat::Json => {
            let obj = serde_json::json!({ "job_id": job_id, "result": result });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}

/// Text block describing a failed job. Empty for a success.
pub fn failure_text(job_id: &JobId, result: &JobResult) -> String {
    let Some(error) = result.error() else {
        return String::new();
    };
    let mut out = format!("{} {}: {}\n", color::header("error"), error.kind, error.message);
    out.push_str(&format!("{} {}\n", color::context("job:"), job_id));
    if let Some(code) = result.exit_code {
        out.push_str(&format!("{} {}\n", color::context("exit code:"), code));
    }
    if let Some(diagnostic) = &error.diagnostic {
        for line in diagnostic.lines() {
            out.push_str(&color::muted(line));
            out.push('\n');
        }
    }
    out
}

pub fn print_manifest(manifest: &CaptureManifest, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Text => print!("{}", manifest_text(manifest)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(manifest)?),
    }
    Ok(())
}

pub fn manifest_text(manifest: &CaptureManifest) -> String {
    let mut out = format!("{} {}\n", color::header("entry:"), manifest.entry_reference);

    out.push_str(&format!("{}\n", color::header("definitions:")));
    for name in manifest.local_definitions.keys() {
        out.push_str(&format!("  {}\n", color::literal(name)));
    }

    if !manifest.imports.is_empty() {
        out.push_str(&format!("{}\n", color::header("imports:")));
        for statement in manifest.imports.values() {
            out.push_str(&format!("  {}\n", color::literal(statement)));
        }
    }

    let env = &manifest.environment_spec;
    let interpreter = if env.version.is_empty() {
        env.interpreter.clone()
    } else {
        format!("{} {}", env.interpreter, env.version)
    };
    out.push_str(&format!("{} {}\n", color::header("interpreter:"), interpreter));
    for requirement in &env.packages {
        out.push_str(&format!("  {}\n", color::context(&requirement.to_string())));
    }
    out
}
