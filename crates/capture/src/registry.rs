// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Registry of capturable units and the units file that declares them.
//!
//! TOML:
//!
//! ```toml
//! [environment]
//! interpreter = "python3"
//! packages = ["numpy>=1.24"]
//!
//! [[unit]]
//! name = "area"
//! kind = "function"
//! source = "def area(r):\n    return PI * r * r\n"
//! references = ["PI"]
//!
//! [[unit]]
//! name = "PI"
//! kind = "constant"
//! source_file = "consts.py"
//! ```
//!
//! HCL uses labeled blocks: `unit "area" { kind = "function" ... }`.

use crate::definition::{Capturable, Definition, DefinitionKind, Payload};
use crate::environment::EnvironmentSpec;
use ferry_core::{ConfigError, ConfigFormat};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("failed to read {path} for unit {name}: {source}")]
    UnitFile {
        name: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unit {0} is registered twice")]
    Duplicate(String),
    #[error("invalid unit {name}: {reason}")]
    InvalidUnit { name: String, reason: String },
}

#[derive(Debug, Deserialize)]
struct UnitsFile {
    #[serde(default)]
    environment: EnvironmentSpec,
    #[serde(default)]
    unit: Units,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Units {
    List(Vec<UnitEntry>),
    Named(IndexMap<String, UnitEntry>),
}

impl Default for Units {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
struct UnitEntry {
    #[serde(default)]
    name: Option<String>,
    #[serde(default = "default_kind")]
    kind: DefinitionKind,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    source_file: Option<PathBuf>,
    #[serde(default)]
    blob_file: Option<PathBuf>,
    #[serde(default)]
    references: Vec<String>,
}

fn default_kind() -> DefinitionKind {
    DefinitionKind::Function
}

impl UnitEntry {
    fn into_definition(self, name: String, base: &Path) -> Result<Definition, RegistryError> {
        let given = [self.source.is_some(), self.source_file.is_some(), self.blob_file.is_some()]
            .iter()
            .filter(|b| **b)
            .count();
        if given > 1 {
            return Err(RegistryError::InvalidUnit {
                name,
                reason: "at most one of source, source_file, blob_file".to_string(),
            });
        }
        let read = |rel: &Path| {
            let path = base.join(rel);
            std::fs::read(&path).map_err(|source| RegistryError::UnitFile {
                name: name.clone(),
                path,
                source,
            })
        };
        let payload = if let Some(src) = self.source {
            Some(Payload::Source(src))
        } else if let Some(rel) = &self.source_file {
            let bytes = read(rel)?;
            let text = String::from_utf8(bytes).map_err(|_| RegistryError::InvalidUnit {
                name: name.clone(),
                reason: format!("{} is not UTF-8", rel.display()),
            })?;
            Some(Payload::Source(text))
        } else if let Some(rel) = &self.blob_file {
            Some(Payload::Opaque(read(rel)?))
        } else {
            None
        };
        Ok(Definition { name, kind: self.kind, payload, references: self.references })
    }
}

/// Capturable units keyed by name, plus the declared runtime environment.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    definitions: BTreeMap<String, Definition>,
    environment: EnvironmentSpec,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_environment(mut self, environment: EnvironmentSpec) -> Self {
        self.environment = environment;
        self
    }

    pub fn environment(&self) -> &EnvironmentSpec {
        &self.environment
    }

    /// Add a definition. Names are unique.
    pub fn register(&mut self, definition: Definition) -> Result<(), RegistryError> {
        if definition.name.trim().is_empty() {
            return Err(RegistryError::InvalidUnit {
                name: definition.name,
                reason: "name must not be empty".to_string(),
            });
        }
        if self.definitions.contains_key(&definition.name) {
            return Err(RegistryError::Duplicate(definition.name));
        }
        self.definitions.insert(definition.name.clone(), definition);
        Ok(())
    }

    pub fn register_capturable(&mut self, unit: &impl Capturable) -> Result<(), RegistryError> {
        self.register(unit.definition())
    }

    pub fn get(&self, name: &str) -> Option<&Definition> {
        self.definitions.get(name)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Definitions in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.values()
    }

    /// Load a units file. Relative `source_file`/`blob_file` paths resolve
    /// against the file's directory.
    pub fn load(path: &Path) -> Result<Self, RegistryError> {
        let file: UnitsFile = ConfigFormat::load(path)?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_units(file, base)
    }

    /// Parse units from a string; relative paths resolve against `base`.
    pub fn parse(content: &str, format: ConfigFormat, base: &Path) -> Result<Self, RegistryError> {
        let file: UnitsFile = format.parse(content)?;
        Self::from_units(file, base)
    }

    fn from_units(file: UnitsFile, base: &Path) -> Result<Self, RegistryError> {
        let mut registry = Self::new().with_environment(file.environment);
        let entries: Vec<(Option<String>, UnitEntry)> = match file.unit {
            Units::List(list) => list.into_iter().map(|e| (None, e)).collect(),
            Units::Named(map) => map.into_iter().map(|(k, e)| (Some(k), e)).collect(),
        };
        for (label, mut entry) in entries {
            let Some(name) = label.or_else(|| entry.name.take()) else {
                return Err(RegistryError::InvalidUnit {
                    name: String::new(),
                    reason: "unit has no name".to_string(),
                });
            };
            registry.register(entry.into_definition(name, base)?)?;
        }
        tracing::debug!(units = registry.len(), "loaded capture units");
        Ok(registry)
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
