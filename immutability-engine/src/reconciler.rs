//! Per-subvolume state machine executing one mode against one
//! subvolume (spec §4.7). Grounded step-for-step on the original
//! implementation's `reset_subvolume` / `restore_subvolume` /
//! `snapshot_only` / `process_subvolume`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use immutability_common::{Label, Mode, SubvolumePair};

use crate::copier::copy_persistent_files;
use crate::filter::{build_filter_lines, write_filter_file};
use crate::recovery::recover_if_needed;
use crate::snapshot::{self, set_rw};

/// The filesystem locations one subvolume's reconciliation touches,
/// all rooted at the raw-volume mount point.
struct Paths {
    /// `<mount_point>/<name>` — the live subvolume.
    live: PathBuf,
    /// `<mount_point>/<snapshots_root_name>/<name>/<clean_label>`.
    clean: PathBuf,
    previous: PathBuf,
    penultimate: PathBuf,
    current: PathBuf,
}

impl Paths {
    fn new(raw_mount: &Path, name: &str, snapshots_root_name: &str, clean_label: &str) -> Self {
        let snapshots = raw_mount.join(snapshots_root_name).join(name);
        Paths {
            live: raw_mount.join(name),
            clean: snapshots.join(clean_label),
            previous: snapshots.join(Label::Previous.as_str()),
            penultimate: snapshots.join(Label::Penultimate.as_str()),
            current: snapshots.join(Label::Current.as_str()),
        }
    }

    fn labeled(&self, label: &str) -> PathBuf {
        self.current
            .parent()
            .expect("snapshots directory has a parent")
            .join(label)
    }
}

/// Reconciles one subvolume pair under `mode`. `raw_mount` is the raw
/// volume's mount point; `pair` carries the subvolume name, its live
/// mount prefix (used only for filter building), and its optional
/// filter file path.
pub fn reconcile(
    raw_mount: &Path,
    pair: &SubvolumePair,
    snapshots_root_name: &str,
    clean_label: &str,
    mode: Mode,
) -> Result<()> {
    let paths = Paths::new(raw_mount, &pair.name, snapshots_root_name, clean_label);

    match mode {
        Mode::Reset => reset(&paths, pair),
        Mode::SnapshotOnly => snapshot_only(&paths),
        Mode::RestorePrevious => restore(&paths, &pair.name, Label::Previous.as_str()),
        Mode::RestorePenultimate => restore(&paths, &pair.name, Label::Penultimate.as_str()),
        Mode::Disabled => Ok(()),
    }
}

fn ensure_rotation_baseline(paths: &Paths) -> Result<()> {
    if !paths.clean.is_dir() {
        bail!("CLEAN snapshot missing: {}", paths.clean.display());
    }
    if !paths.penultimate.is_dir() {
        snapshot::snapshot(&paths.clean, &paths.penultimate)?;
    }
    if !paths.previous.is_dir() {
        snapshot::snapshot(&paths.clean, &paths.previous)?;
    }
    Ok(())
}

fn rotate(paths: &Paths) -> Result<()> {
    snapshot::snapshot(&paths.previous, &paths.penultimate)?;
    snapshot::snapshot(&paths.live, &paths.previous)?;
    Ok(())
}

fn reset(paths: &Paths, pair: &SubvolumePair) -> Result<()> {
    let filter_path = pair
        .filter_path
        .as_deref()
        .context("reset mode requires a filter file path in the pair (name=mount:filter)")?;

    recover_if_needed(&paths.current)?;
    ensure_rotation_baseline(paths)?;
    rotate(paths)?;

    log::info!("resetting {} (mount_point={})", pair.name, pair.mount_point.display());
    snapshot::snapshot(&paths.clean, &paths.current)?;
    set_rw(&paths.current)?;
    copy_persistent_files(&paths.previous, &paths.current, filter_path)?;
    create_sentinel(&paths.current)?;
    snapshot::snapshot(&paths.current, &paths.live)?;
    snapshot::sync(&paths.live)?;
    Ok(())
}

fn snapshot_only(paths: &Paths) -> Result<()> {
    recover_if_needed(&paths.current)?;
    ensure_rotation_baseline(paths)?;
    rotate(paths)?;
    snapshot::sync(&paths.live)?;
    log::info!("snapshot-only complete (no wipe)");
    Ok(())
}

fn restore(paths: &Paths, name: &str, label: &str) -> Result<()> {
    let source = paths.labeled(label);
    if !source.is_dir() {
        bail!("cannot restore {name}: {} does not exist", source.display());
    }
    log::info!("restoring {name} from {label}");
    snapshot::snapshot(&source, &paths.live)?;
    snapshot::sync(&paths.live)?;
    log::info!("restored {name} from {label}");
    Ok(())
}

fn create_sentinel(current: &Path) -> Result<()> {
    std::fs::write(current.join(immutability_common::SENTINEL_FILE), b"")
        .with_context(|| format!("writing sentinel under {}", current.display()))
}

/// Builds a filter file at `dst` from persistent-path globs for one
/// subvolume, for collaborators that want the engine to compute it
/// rather than precompute it themselves (spec §4.4, last paragraph).
pub fn build_filter_for_subvolume(
    mount_prefix: &Path,
    persistent_paths: &[impl AsRef<Path>],
    previous_root: &Path,
    dst: &Path,
) -> Result<()> {
    let lines = build_filter_lines(mount_prefix, persistent_paths, previous_root);
    write_filter_file(&lines, dst)
}
