// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime environment declaration: interpreter and package requirements.

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid requirement {input:?}: {reason}")]
pub struct RequirementError {
    pub input: String,
    pub reason: &'static str,
}

/// One package requirement, e.g. `numpy>=1.24,<2` or `requests[socks]==2.31`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Requirement {
    pub name: String,
    pub extras: Vec<String>,
    /// Version constraint exactly as written, whitespace removed (`>=1.24,<2`)
    pub constraint: Option<String>,
}

#[allow(clippy::expect_used)]
static REQUIREMENT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^([A-Za-z0-9](?:[A-Za-z0-9._-]*[A-Za-z0-9])?)\s*(?:\[([A-Za-z0-9._,\s-]*)\])?\s*((?:(?:==|!=|<=|>=|~=|<|>)\s*[A-Za-z0-9.*+!_-]+\s*,?\s*)*)$",
    )
    .expect("constant regex pattern is valid")
});

impl FromStr for Requirement {
    type Err = RequirementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let input = s.trim();
        if input.is_empty() {
            return Err(RequirementError { input: s.to_string(), reason: "empty" });
        }
        let caps = REQUIREMENT_PATTERN
            .captures(input)
            .ok_or(RequirementError { input: s.to_string(), reason: "unrecognised syntax" })?;
        let name = caps.get(1).map(|m| m.as_str().to_string()).unwrap_or_default();
        let extras = caps
            .get(2)
            .map(|m| {
                m.as_str()
                    .split(',')
                    .map(str::trim)
                    .filter(|e| !e.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        let constraint = caps
            .get(3)
            .map(|m| m.as_str().split_whitespace().collect::<String>())
            .map(|c| c.trim_end_matches(',').to_string())
            .filter(|c| !c.is_empty());
        Ok(Self { name, extras, constraint })
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        if !self.extras.is_empty() {
            write!(f, "[{}]", self.extras.join(","))?;
        }
        if let Some(c) = &self.constraint {
            f.write_str(c)?;
        }
        Ok(())
    }
}

impl Serialize for Requirement {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Requirement {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s = String::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Interpreter and packages the remote side must provide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentSpec {
    /// Interpreter executable, e.g. `python3`
    pub interpreter: String,
    /// Minimum `major.minor` version; informational when empty
    #[serde(skip_serializing_if = "String::is_empty")]
    pub version: String,
    pub packages: Vec<Requirement>,
}

impl Default for EnvironmentSpec {
    fn default() -> Self {
        Self { interpreter: "python3".to_string(), version: String::new(), packages: Vec::new() }
    }
}

impl EnvironmentSpec {
    /// Interpreter invocation, preferring a versioned binary when declared
    /// (`python3.11`).
    pub fn interpreter_command(&self) -> String {
        if self.version.is_empty() || self.interpreter.ends_with(&self.version) {
            return self.interpreter.clone();
        }
        let stem = self.interpreter.trim_end_matches(|c: char| c.is_ascii_digit() || c == '.');
        format!("{}{}", stem, self.version)
    }

    /// Contents of `requirements.txt`, one requirement per line.
    pub fn requirements_txt(&self) -> String {
        self.packages.iter().map(|r| format!("{}\n", r)).collect()
    }
}

#[cfg(test)]
#[path = "environment_tests.rs"]
mod tests;
