//! Detects and clears a `CURRENT` snapshot left behind by an
//! interrupted prior run (spec §4.6).
//!
//! A pre-existing `CURRENT` is always treated as stale, whether or not
//! its `.boot-ready` sentinel is present: the live-subvolume swap in
//! `reset` is a snapshot overwrite, not an atomic rename, so a
//! `CURRENT` surviving to the next boot means the process was killed
//! somewhere between sentinel-write and swap, or before either. Redoing
//! the build is cheaper than determining which side is newer (spec §9
//! Open Question, resolved as "delete and proceed").

use std::path::Path;

use anyhow::Result;
use immutability_common::SENTINEL_FILE;

use crate::snapshot::delete;

/// If `current` exists, removes it and returns `true` so the caller
/// can log the recovery. A missing `current` is the common case and
/// returns `false` without touching anything.
pub fn recover_if_needed(current: &Path) -> Result<bool> {
    if !current.is_dir() {
        return Ok(false);
    }

    if current.join(SENTINEL_FILE).is_file() {
        log::warn!(
            "found completed but unswapped build at {} (sentinel present); redoing it",
            current.display()
        );
    } else {
        log::warn!(
            "incomplete boot detected at {} (missing {SENTINEL_FILE}); removing it",
            current.display()
        );
    }

    delete(current)?;
    Ok(true)
}
