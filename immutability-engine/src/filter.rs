//! Translates a list of persistent path globs and a subvolume's live
//! mount prefix into the precomputed rsync inclusion filter the copier
//! consumes (spec §4.4). Grounded on the inclusion/exclusion pattern
//! machinery in `waypoint-common`'s `exclude.rs`, polarity inverted:
//! here a listed path is *kept*, not discarded. Glob entries (e.g.
//! `/home/*/.cache`, spec testable-properties scenario 1) are expanded
//! against `PREVIOUS` with the `glob` crate before classification,
//! since btrfs reset config may name a whole class of per-user paths
//! rather than one literal path per subvolume.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// How a persistent path resolved against `PREVIOUS` when the filter
/// was built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Classification {
    Directory,
    File,
    Absent,
}

fn classify(path: &Path) -> Classification {
    if path.is_dir() {
        Classification::Directory
    } else if path.is_file() {
        Classification::File
    } else {
        Classification::Absent
    }
}

/// Builds the ordered list of rsync filter directive lines for one
/// subvolume. `mount_prefix` is the subvolume's live mount point
/// (`/`, `/home`, …); `persistent_paths` are absolute paths under that
/// mount point that must survive a reset; `previous_root` is the
/// `PREVIOUS` snapshot directory the paths are tested against.
///
/// Deterministic given the same `PREVIOUS` contents: the same inputs
/// always produce the same file.
pub fn build_filter_lines(
    mount_prefix: &Path,
    persistent_paths: &[impl AsRef<Path>],
    previous_root: &Path,
) -> Vec<String> {
    let mut lines = vec!["+ */".to_string()];

    for raw in persistent_paths {
        let path = raw.as_ref();
        let relative = match path.strip_prefix(mount_prefix) {
            Ok(rel) if rel.as_os_str().is_empty() => continue,
            Ok(rel) => rel,
            Err(_) => continue,
        };

        if has_glob_metachars(relative) {
            emit_glob_matches(&mut lines, path, relative, previous_root);
        } else {
            emit_literal_match(&mut lines, path, relative, previous_root);
        }
    }

    lines.push("- *".to_string());
    lines
}

fn has_glob_metachars(relative: &Path) -> bool {
    relative
        .to_string_lossy()
        .chars()
        .any(|c| matches!(c, '*' | '?' | '['))
}

fn emit_literal_match(lines: &mut Vec<String>, path: &Path, relative: &Path, previous_root: &Path) {
    let probe = previous_root.join(relative);
    match classify(&probe) {
        Classification::Directory => {
            lines.push(format!("+ /{}/", relative.display()));
            lines.push(format!("+ /{}/**", relative.display()));
        }
        Classification::File => {
            lines.push(format!("+ /{}", relative.display()));
        }
        Classification::Absent => {
            log::info!(
                "persistent path {} not present in {}, skipping",
                path.display(),
                previous_root.display()
            );
        }
    }
}

/// Expands a glob-bearing relative path (e.g. `*/.cache`) against
/// `previous_root` and emits one include directive per match, sorted
/// for determinism. A pattern matching nothing is logged and skipped,
/// the same as a literal path absent from `PREVIOUS` — it is not an
/// error, since the matching paths may simply not exist yet (e.g. no
/// users have logged in since the last CLEAN baseline).
fn emit_glob_matches(lines: &mut Vec<String>, original: &Path, relative: &Path, previous_root: &Path) {
    let pattern = previous_root.join(relative);
    let pattern_str = match pattern.to_str() {
        Some(s) => s,
        None => {
            log::warn!(
                "persistent glob {} is not valid UTF-8, skipping",
                original.display()
            );
            return;
        }
    };

    let paths = match glob::glob(pattern_str) {
        Ok(paths) => paths,
        Err(err) => {
            log::warn!("invalid persistent path glob {}: {err}", original.display());
            return;
        }
    };

    let mut matches: Vec<PathBuf> = paths.filter_map(std::result::Result::ok).collect();
    matches.sort();

    if matches.is_empty() {
        log::info!(
            "persistent glob {} matched nothing in {}, skipping",
            original.display(),
            previous_root.display()
        );
        return;
    }

    for matched in matches {
        let relative_match = match matched.strip_prefix(previous_root) {
            Ok(rel) => rel,
            Err(_) => continue,
        };
        match classify(&matched) {
            Classification::Directory => {
                lines.push(format!("+ /{}/", relative_match.display()));
                lines.push(format!("+ /{}/**", relative_match.display()));
            }
            Classification::File => {
                lines.push(format!("+ /{}", relative_match.display()));
            }
            Classification::Absent => {
                // A glob only yields paths that exist at expansion
                // time; a concurrent delete between expansion and
                // classification is outside the engine's ownership
                // model (spec §3 Ownership).
            }
        }
    }
}

/// Writes the filter lines to `dst`, one directive per line.
pub fn write_filter_file(lines: &[String], dst: &Path) -> Result<()> {
    let mut file = fs::File::create(dst)
        .with_context(|| format!("creating filter file {}", dst.display()))?;
    for line in lines {
        writeln!(file, "{line}")
            .with_context(|| format!("writing filter file {}", dst.display()))?;
    }
    Ok(())
}
