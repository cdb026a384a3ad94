// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ferry-capture: dependency capture and bundle packaging
//!
//! A [`Registry`] holds the units a caller has made capturable. The
//! [`ManifestBuilder`] walks the reference graph from a target function and
//! produces a [`CaptureManifest`], which [`pack`] turns into a deterministic,
//! fingerprinted [`Bundle`].

mod args;
mod builtins;
mod bundle;
mod definition;
mod entry;
mod environment;
mod manifest;
mod registry;
pub mod scan;

pub use args::CallArguments;
pub use bundle::{pack, Bundle, PackagingError, ARCHIVE_ENTRIES};
pub use definition::{Capturable, Definition, DefinitionKind, Payload};
pub use entry::render_entry;
pub use environment::{EnvironmentSpec, Requirement, RequirementError};
pub use manifest::{AnalysisError, CaptureManifest, ManifestBuilder};
pub use registry::{Registry, RegistryError};
