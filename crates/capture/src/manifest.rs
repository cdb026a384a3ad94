// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capture manifest: the closed set of definitions a target needs.

use crate::builtins::{is_builtin, is_std_module};
use crate::definition::{Definition, DefinitionKind, Payload};
use crate::environment::EnvironmentSpec;
use crate::registry::Registry;
use crate::scan;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AnalysisError {
    #[error("{name} (referenced by {referenced_by}) is not a registered unit or known module")]
    UnresolvableReference { name: String, referenced_by: String },
    #[error("target {0} is not registered")]
    UnknownTarget(String),
    #[error("target {0} is not a function")]
    NotCallable(String),
    #[error("{0} has no retrievable source")]
    NoSource(String),
}

/// Everything needed to reconstruct a target function remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureManifest {
    pub entry_reference: String,
    /// Dependencies before dependents; the target comes last
    pub local_definitions: IndexMap<String, Payload>,
    /// Module name → import statement, in discovery order
    pub imports: IndexMap<String, String>,
    pub environment_spec: EnvironmentSpec,
}

/// Walks the reference graph of a target through a [`Registry`].
pub struct ManifestBuilder<'a> {
    registry: &'a Registry,
}

impl<'a> ManifestBuilder<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Build the manifest for `target`.
    pub fn build(&self, target: &str) -> Result<CaptureManifest, AnalysisError> {
        let def =
            self.registry.get(target).ok_or_else(|| AnalysisError::UnknownTarget(target.into()))?;
        if def.kind != DefinitionKind::Function {
            return Err(AnalysisError::NotCallable(target.to_string()));
        }

        let mut walk = Walk::default();
        self.visit(def, &mut walk)?;

        tracing::debug!(
            target,
            definitions = walk.definitions.len(),
            imports = walk.imports.len(),
            "built capture manifest"
        );
        Ok(CaptureManifest {
            entry_reference: target.to_string(),
            local_definitions: walk.definitions,
            imports: walk.imports,
            environment_spec: self.registry.environment().clone(),
        })
    }

    fn visit(&self, def: &Definition, walk: &mut Walk) -> Result<(), AnalysisError> {
        if !walk.visited.insert(def.name.clone()) {
            return Ok(());
        }
        let payload = def.payload.as_ref().ok_or_else(|| AnalysisError::NoSource(def.name.clone()))?;

        for (name, declared) in references(def, payload) {
            if name == def.name {
                continue;
            }
            match self.registry.get(&name) {
                Some(dep) if dep.kind == DefinitionKind::Import => {
                    walk.imports.entry(name).or_insert_with(|| dep.import_statement());
                }
                Some(dep) => self.visit(dep, walk)?,
                None if is_std_module(&name) => {
                    let stmt = format!("import {}", name);
                    walk.imports.entry(name).or_insert(stmt);
                }
                None if is_builtin(&name) => {}
                None if declared => {
                    return Err(AnalysisError::UnresolvableReference {
                        name,
                        referenced_by: def.name.clone(),
                    });
                }
                // Locally bound (parameter, loop variable, attribute target)
                None => {}
            }
        }

        walk.definitions.insert(def.name.clone(), payload.clone());
        Ok(())
    }
}

#[derive(Default)]
struct Walk {
    visited: HashSet<String>,
    definitions: IndexMap<String, Payload>,
    imports: IndexMap<String, String>,
}

/// Sorted references of a definition, flagged when explicitly declared.
fn references(def: &Definition, payload: &Payload) -> BTreeMap<String, bool> {
    let mut out: BTreeMap<String, bool> = match payload {
        Payload::Source(src) => scan::identifiers(src).into_iter().map(|n| (n, false)).collect(),
        Payload::Opaque(_) => BTreeMap::new(),
    };
    for name in &def.references {
        out.insert(name.clone(), true);
    }
    out
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
