//! Minimal-write policy for build outputs.
//!
//! Writes only happen when content actually differs from what is on disk.
//! This keeps external file-watchers (the host generator's `--watch`, live
//! reload servers) from spinning on byte-identical rewrites.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use crate::name::{HASH_TOKEN, content_digest};
use crate::{debug, log};

/// Whether `new_content` differs from what exists at `dest`.
///
/// A missing destination always writes; an existing one is compared by
/// content digest of the exact bytes about to be written.
pub fn should_write(dest: &Path, new_content: &[u8]) -> bool {
    let Ok(existing) = fs::read(dest) else {
        return true;
    };
    content_digest(&existing) != content_digest(new_content)
}

/// Write `content` to `dest` if it differs, creating parent directories.
///
/// Returns whether a write happened.
pub fn write_if_changed(dest: &Path, content: &[u8]) -> Result<bool> {
    if !should_write(dest, content) {
        debug!("write"; "unchanged: {}", dest.display());
        return Ok(false);
    }

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(dest, content).with_context(|| format!("Failed to write {}", dest.display()))?;
    log!("write"; "{}", dest.display());
    Ok(true)
}

/// Maintain a digest record file and delete the stale hash-stamped artifact
/// from a prior build when the digest changed.
///
/// `dest_template` is the absolute destination path still carrying the
/// `@hash` token; the old artifact's name is reconstructed from the
/// previously recorded digest.
pub fn update_hash_record(record: &Path, dest_template: &Path, digest: &str) -> Result<()> {
    if let Ok(old_digest) = fs::read_to_string(record) {
        let old_digest = old_digest.trim();
        if !old_digest.is_empty() && old_digest != digest {
            let template = dest_template.to_string_lossy();
            let stale = template.replace(HASH_TOKEN, old_digest);
            let stale = Path::new(&stale);
            if stale.is_file() {
                log!("write"; "deleting stale {}", stale.display());
                fs::remove_file(stale)
                    .with_context(|| format!("Failed to delete {}", stale.display()))?;
            }
        }
    } else if let Some(parent) = record.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    fs::write(record, digest).with_context(|| format!("Failed to write {}", record.display()))?;
    Ok(())
}
