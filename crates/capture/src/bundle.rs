// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bundle packager.
//!
//! A bundle is a ustar archive with a fixed set of entries. Headers carry
//! zeroed mtime/uid/gid and mode 0644, so identical manifests always produce
//! identical bytes and therefore identical fingerprints.

use crate::entry::render_entry;
use crate::manifest::CaptureManifest;
use crate::definition::Payload;
use ferry_core::BundleId;
use sha2::{Digest, Sha256};
use std::io::Read;
use std::path::Path;
use thiserror::Error;

/// Archive entries, in archive order.
pub const ARCHIVE_ENTRIES: [&str; 4] = ["manifest.json", "captured.py", "entry.py", "requirements.txt"];

#[derive(Debug, Error)]
pub enum PackagingError {
    #[error("{name} has no source form and cannot be packaged")]
    OpaqueCaptureUnsupported { name: String },
    #[error("failed to encode manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("archive error: {0}")]
    Archive(#[from] std::io::Error),
}

/// A packed, fingerprinted bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bundle {
    pub id: BundleId,
    pub payload: Vec<u8>,
}

impl Bundle {
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Write the archive to `path`.
    pub fn write_to(&self, path: &Path) -> Result<(), std::io::Error> {
        std::fs::write(path, &self.payload)
    }

    /// Read back one archive entry as text.
    pub fn entry(&self, name: &str) -> Result<Option<String>, std::io::Error> {
        let mut archive = tar::Archive::new(self.payload.as_slice());
        for file in archive.entries()? {
            let mut file = file?;
            if file.path()?.as_os_str() == name {
                let mut text = String::new();
                file.read_to_string(&mut text)?;
                return Ok(Some(text));
            }
        }
        Ok(None)
    }
}

/// Package a manifest into a bundle.
pub fn pack(manifest: &CaptureManifest) -> Result<Bundle, PackagingError> {
    let captured = render_captured(manifest)?;
    let manifest_json = serde_json::to_vec_pretty(manifest)?;
    let entry = render_entry(&manifest.entry_reference);
    let requirements = manifest.environment_spec.requirements_txt();

    let contents: [&[u8]; 4] =
        [&manifest_json, captured.as_bytes(), entry.as_bytes(), requirements.as_bytes()];

    let mut builder = tar::Builder::new(Vec::new());
    for (name, data) in ARCHIVE_ENTRIES.iter().zip(contents) {
        let mut header = tar::Header::new_ustar();
        header.set_path(name)?;
        header.set_size(data.len() as u64);
        header.set_mode(0o644);
        header.set_mtime(0);
        header.set_uid(0);
        header.set_gid(0);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        builder.append(&header, data)?;
    }
    let payload = builder.into_inner()?;

    let id = BundleId::from_hex(format!("{:x}", Sha256::digest(&payload)));
    tracing::info!(bundle_id = %id.short(), size = payload.len(), entry = %manifest.entry_reference, "packed bundle");
    Ok(Bundle { id, payload })
}

/// `captured.py`: imports, then every definition in dependency order.
fn render_captured(manifest: &CaptureManifest) -> Result<String, PackagingError> {
    let mut out = String::from("# Generated by ferry. Do not edit.\n");
    for statement in manifest.imports.values() {
        out.push_str(statement);
        out.push('\n');
    }
    for (name, payload) in &manifest.local_definitions {
        let Payload::Source(source) = payload else {
            return Err(PackagingError::OpaqueCaptureUnsupported { name: name.clone() });
        };
        out.push_str("\n\n");
        out.push_str(source.trim_end());
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
#[path = "bundle_tests.rs"]
mod tests;
