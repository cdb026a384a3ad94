// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capturable units.

use serde::{Deserialize, Serialize};

/// Serialized form of one local definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Payload {
    Source(String),
    /// Bytes with no source form (pickled objects, compiled artifacts).
    /// Recorded in manifests but rejected by the packager.
    Opaque(Vec<u8>),
}

impl Payload {
    pub fn as_source(&self) -> Option<&str> {
        match self {
            Self::Source(s) => Some(s),
            Self::Opaque(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DefinitionKind {
    Function,
    Constant,
    /// Standard or third-party module; only its import statement is shipped
    Import,
}

ferry_core::simple_display! {
    DefinitionKind {
        Function => "function",
        Constant => "constant",
        Import => "import",
    }
}

/// A named unit the manifest builder can resolve.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Definition {
    pub name: String,
    pub kind: DefinitionKind,
    /// `None` for ephemeral definitions whose source cannot be retrieved
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Payload>,
    /// Names this unit depends on in addition to those found by scanning
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<String>,
}

impl Definition {
    pub fn function(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Function, Some(Payload::Source(source.into())))
    }

    pub fn constant(name: impl Into<String>, source: impl Into<String>) -> Self {
        Self::new(name, DefinitionKind::Constant, Some(Payload::Source(source.into())))
    }

    /// An import unit. Without a statement, `import <name>` is emitted.
    pub fn import(name: impl Into<String>, statement: Option<String>) -> Self {
        Self::new(name, DefinitionKind::Import, statement.map(Payload::Source))
    }

    pub fn new(name: impl Into<String>, kind: DefinitionKind, payload: Option<Payload>) -> Self {
        Self { name: name.into(), kind, payload, references: Vec::new() }
    }

    pub fn references<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references.extend(names.into_iter().map(Into::into));
        self
    }

    /// Import statement for an import unit.
    pub fn import_statement(&self) -> String {
        match self.payload.as_ref().and_then(Payload::as_source) {
            Some(stmt) if !stmt.trim().is_empty() => stmt.trim().to_string(),
            _ => format!("import {}", self.name),
        }
    }
}

/// Implemented by host types that can describe themselves as a capture unit.
///
/// ```ignore
/// struct Train;
/// impl Capturable for Train {
///     fn definition(&self) -> Definition {
///         Definition::function("train", include_str!("train.py")).references(["load"])
///     }
/// }
/// ```
pub trait Capturable {
    fn definition(&self) -> Definition;
}

impl Capturable for Definition {
    fn definition(&self) -> Definition {
        self.clone()
    }
}
