// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Resource requests: cores, memory, wall-clock limit.

use crate::time_fmt::serde_duration;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;
const TIB: u64 = 1024 * GIB;

/// A memory amount in bytes.
///
/// Parses `512M`, `4G`, `4GiB`, `1.5G`, `2048K`, `1T`. Units are binary. A
/// bare number is read as mebibytes, which is what batch schedulers assume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MemorySize(u64);

impl MemorySize {
    pub const fn from_bytes(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn from_mib(mib: u64) -> Self {
        Self(mib * MIB)
    }

    pub const fn from_gib(gib: u64) -> Self {
        Self(gib * GIB)
    }

    pub fn bytes(self) -> u64 {
        self.0
    }

    /// Whole mebibytes, rounded up so a request never shrinks.
    pub fn mib_ceil(self) -> u64 {
        self.0.div_ceil(MIB)
    }
}

impl FromStr for MemorySize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s.find(|c: char| !(c.is_ascii_digit() || c == '.')).unwrap_or(s.len());
        let (num, unit) = s.split_at(split);
        let value: f64 = num.parse().map_err(|_| format!("invalid memory size: {:?}", s))?;
        let multiplier = match unit.trim().to_ascii_uppercase().as_str() {
            "" | "M" | "MB" | "MI" | "MIB" => MIB,
            "B" => 1,
            "K" | "KB" | "KI" | "KIB" => KIB,
            "G" | "GB" | "GI" | "GIB" => GIB,
            "T" | "TB" | "TI" | "TIB" => TIB,
            other => return Err(format!("unknown memory unit: {:?}", other)),
        };
        if !value.is_finite() || value < 0.0 {
            return Err(format!("invalid memory size: {:?}", s));
        }
        Ok(Self((value * multiplier as f64).ceil() as u64))
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0;
        if b >= GIB && b % GIB == 0 {
            write!(f, "{}G", b / GIB)
        } else if b % MIB == 0 {
            write!(f, "{}M", b / MIB)
        } else if b % KIB == 0 {
            write!(f, "{}K", b / KIB)
        } else {
            write!(f, "{}B", b)
        }
    }
}

impl Serialize for MemorySize {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for MemorySize {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Mib(u64),
            Text(String),
        }
        match Raw::deserialize(d)? {
            Raw::Mib(n) => Ok(Self::from_mib(n)),
            Raw::Text(s) => s.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Compute resources requested for one job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceRequest {
    pub cores: u32,
    pub memory: MemorySize,
    #[serde(with = "serde_duration")]
    pub time_limit: Duration,
}

impl Default for ResourceRequest {
    fn default() -> Self {
        Self { cores: 1, memory: MemorySize::from_gib(1), time_limit: Duration::from_secs(3600) }
    }
}

impl ResourceRequest {
    pub fn new(cores: u32, memory: MemorySize, time_limit: Duration) -> Self {
        Self { cores, memory, time_limit }
    }

    crate::setters! {
        set {
            cores: u32,
            memory: MemorySize,
            time_limit: Duration,
        }
    }

    /// Reject requests no backend could satisfy.
    pub fn validate(&self) -> Result<(), String> {
        if self.cores == 0 {
            return Err("cores must be at least 1".to_string());
        }
        if self.memory.bytes() == 0 {
            return Err("memory must be non-zero".to_string());
        }
        if self.time_limit.is_zero() {
            return Err("time_limit must be non-zero".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "resources_tests.rs"]
mod tests;
