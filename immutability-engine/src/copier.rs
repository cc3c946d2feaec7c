//! Applies a precomputed filter file to carry persistent state from
//! `PREVIOUS` into `CURRENT` (spec §4.5). Grounded on the original
//! implementation's `copy_persistent_files` for the exact flag set.

use std::path::Path;

use anyhow::{Context, Result};

use crate::process::run_checked;

/// Copies `previous` into `current`, keeping only the paths `filter_file`
/// includes. `previous` is anchored with a trailing slash so rsync
/// copies its *contents* into `current`, not `previous` itself as a
/// subdirectory.
pub fn copy_persistent_files(previous: &Path, current: &Path, filter_file: &Path) -> Result<()> {
    log::info!("preserving persistent paths (precomputed filter)");

    let previous_str: &str = &format!("{}/", previous.display());
    let current_str = current
        .to_str()
        .with_context(|| format!("path {} is not valid UTF-8", current.display()))?;
    let filter_arg: &str = &format!(
        ". {}",
        filter_file
            .to_str()
            .with_context(|| format!("path {} is not valid UTF-8", filter_file.display()))?
    );

    run_checked(
        "rsync",
        &[
            "-aHAX",
            "--numeric-ids",
            "--delete",
            "--filter",
            filter_arg,
            previous_str,
            current_str,
        ],
    )
    .context("rsync failed to copy persistent files")
}
