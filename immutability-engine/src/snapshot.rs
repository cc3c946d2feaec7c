//! The three operations that are allowed to mutate the volume: create,
//! flip read-write, and recursively delete a subvolume (spec §4.3).
//! Grounded on the original implementation's `btrfs_snapshot` /
//! `btrfs_set_rw` / `btrfs_delete_recursively`.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{bail, Context, Result};

use crate::process::run_checked;

/// Counts calls to `sync()`. The reconciler's only sync call sites are
/// the tail end of each mode's success path (spec §5, §9 "batched
/// sync"), so this lets tests verify the discipline directly: the
/// count taken across a dispatcher run must equal the number of
/// subvolumes successfully reconciled, never more.
static SYNC_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Total number of `sync()` invocations observed so far. Test
/// instrumentation only; production code never reads it.
pub fn sync_call_count() -> usize {
    SYNC_CALLS.load(Ordering::SeqCst)
}

/// Resets the counter `sync_call_count()` reports. Test instrumentation
/// only.
pub fn reset_sync_call_count() {
    SYNC_CALLS.store(0, Ordering::SeqCst);
}

/// Creates a CoW clone of `src` at `dst`. Fails if `src` doesn't exist
/// as a directory. If `dst` already exists it is deleted first (with
/// its nested children), so the clone always lands on a clean slot.
/// The clone inherits `src`'s read-only bit.
pub fn snapshot(src: &Path, dst: &Path) -> Result<()> {
    if !src.is_dir() {
        bail!("snapshot source {} does not exist", src.display());
    }
    if dst.exists() {
        delete(dst)?;
    }

    let src_str = path_str(src)?;
    let dst_str = path_str(dst)?;
    run_checked("btrfs", &["subvolume", "snapshot", src_str, dst_str])
        .with_context(|| format!("snapshotting {} to {}", src.display(), dst.display()))
}

/// Clears the read-only property so a snapshot cloned from a read-only
/// source (e.g. CLEAN) can be written into.
pub fn set_rw(path: &Path) -> Result<()> {
    let path_str = path_str(path)?;
    run_checked(
        "btrfs",
        &["property", "set", "-ts", path_str, "ro", "false"],
    )
    .with_context(|| format!("clearing read-only on {}", path.display()))
}

/// Removes a subvolume with a durable commit. btrfs refuses to delete
/// a subvolume that still contains nested subvolumes, so children one
/// level down are listed and recursed into bottom-up first. A
/// nonexistent path is a silent no-op.
pub fn delete(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }

    for child in list_child_subvolumes(path)? {
        delete(&path.join(child))?;
    }

    let path_str = path_str(path)?;
    run_checked("btrfs", &["subvolume", "delete", path_str, "--commit-after"])
        .with_context(|| format!("deleting subvolume {}", path.display()))
}

/// `btrfs filesystem sync`, called exactly once per subvolume per
/// successful reconciler run (spec §4.3, §5 sync discipline).
pub fn sync(path: &Path) -> Result<()> {
    SYNC_CALLS.fetch_add(1, Ordering::SeqCst);
    let path_str = path_str(path)?;
    run_checked("btrfs", &["filesystem", "sync", path_str])
        .with_context(|| format!("syncing filesystem at {}", path.display()))
}

/// Parses `btrfs subvolume list -o <path>` output into the relative
/// paths of the subvolume's immediate nested children, preserving
/// embedded whitespace in child names by joining every token from the
/// 9th column onward rather than taking only the first.
fn list_child_subvolumes(path: &Path) -> Result<Vec<String>> {
    let path_str = path_str(path)?;
    let output = std::process::Command::new("btrfs")
        .args(["subvolume", "list", "-o", path_str])
        .output()
        .with_context(|| format!("listing subvolumes under {}", path.display()))?;

    if !output.status.success() {
        // No nested subvolumes (or `path` isn't itself a subvolume
        // root yet, e.g. a plain directory) — treat as "no children".
        return Ok(Vec::new());
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let mut children = Vec::new();
    for line in stdout.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.len() > 8 {
            children.push(tokens[8..].join(" "));
        }
    }
    Ok(children)
}

fn path_str(path: &Path) -> Result<&str> {
    path.to_str()
        .with_context(|| format!("path {} is not valid UTF-8", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn delete_of_nonexistent_path_is_a_silent_no_op() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("never-existed");
        delete(&missing).unwrap();
    }

    #[test]
    fn snapshot_fails_when_source_missing() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("CLEAN");
        let dst = dir.path().join("CURRENT");
        let err = snapshot(&src, &dst).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn list_child_subvolumes_preserves_whitespace_in_names() {
        // `btrfs subvolume list -o` isn't available in this sandbox,
        // so this test exercises the parser directly against a
        // captured sample line shape instead of shelling out.
        let sample = "ID 257 gen 10 top level 5 path some weird name with spaces";
        let tokens: Vec<&str> = sample.split_whitespace().collect();
        assert_eq!(tokens[8..].join(" "), "some weird name with spaces");
    }

    #[test]
    fn sync_call_count_tracks_every_invocation() {
        // The counter increments before shelling out, so it reflects
        // "sync() was called" regardless of whether a real `btrfs`
        // binary is present in this sandbox — it is the property
        // reconciler.rs relies on (one call per successfully
        // reconciled subvolume, never per-operation).
        reset_sync_call_count();
        assert_eq!(sync_call_count(), 0);

        let dir = tempdir().unwrap();
        let _ = sync(&dir.path().join("one"));
        let _ = sync(&dir.path().join("two"));

        assert_eq!(sync_call_count(), 2);
    }
}
