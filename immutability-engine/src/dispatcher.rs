//! Parses the CLI, mounts the raw volume, and fans reconciliation out
//! to one thread per subvolume (spec §4.8, §5). Grounded on the
//! original implementation's `main()` (`threading.Thread` / `t.join()`
//! / collected `errors` list), expressed with `std::thread` rather
//! than a pool, matching spec §5's "thread-start / thread-join plus a
//! result slot per thread".

use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{bail, Context, Result};
use immutability_common::{validate_name, Mode, SubvolumePair};

use crate::mount::MountHandle;
use crate::reconciler::reconcile;

/// Private mount point the engine brackets its whole run with. Fixed
/// rather than configurable: nothing outside this process is expected
/// to reach into it.
pub const RAW_MOUNT_POINT: &str = "/run/immutability/mnt";

pub struct Args {
    pub device: PathBuf,
    pub snapshots_root_name: String,
    pub clean_label: String,
    pub mode: Mode,
    pub pairs: Vec<SubvolumePair>,
}

impl Args {
    /// Parses `device snapshots_root_name clean_label mode pair...`
    /// (argv without the program name). Malformed input is a
    /// configuration error reported before any mutation.
    pub fn parse(argv: &[String]) -> Result<Self> {
        if argv.len() < 4 {
            bail!(
                "usage: immutability <device> <snapshots_root_name> <clean_label> <mode> <pair>..."
            );
        }

        let device = PathBuf::from(&argv[0]);
        let snapshots_root_name = argv[1].clone();
        let clean_label = argv[2].clone();
        let mode: Mode = argv[3].parse()?;

        validate_name("snapshots_root_name", &snapshots_root_name)?;
        validate_name("clean_label", &clean_label)?;

        let pairs = argv[4..]
            .iter()
            .map(|token| SubvolumePair::parse(token))
            .collect::<Result<Vec<_>>>()?;

        if pairs.is_empty() && mode != Mode::Disabled {
            bail!("at least one subvolume pair is required for mode '{mode}'");
        }

        if mode == Mode::Reset {
            for pair in &pairs {
                match &pair.filter_path {
                    None => bail!(
                        "pair '{}' is missing a filter file path, required for reset mode",
                        pair.name
                    ),
                    Some(filter_path) if !filter_path.is_file() => bail!(
                        "pair '{}' names a filter file that does not exist: {}",
                        pair.name,
                        filter_path.display()
                    ),
                    Some(_) => {}
                }
            }
        }

        Ok(Args {
            device,
            snapshots_root_name,
            clean_label,
            mode,
            pairs,
        })
    }
}

/// Runs the full dispatch: mount, reconcile every pair, unmount.
/// Returns the name of the first subvolume to fail, if any failed.
pub fn run(args: &Args) -> Result<()> {
    let subvolume_names: Vec<&str> = args.pairs.iter().map(|p| p.name.as_str()).collect();
    log::info!(
        "mode={} device={} subvolumes={}",
        args.mode,
        args.device.display(),
        subvolume_names.join(" ")
    );

    let mount = MountHandle::mount(&args.device, Path::new(RAW_MOUNT_POINT))
        .context("mounting raw volume")?;

    if args.mode == Mode::Disabled {
        log::info!("immutability disabled; skipping all operations");
        drop(mount);
        return Ok(());
    }

    let failures = if args.pairs.len() > 1 {
        run_parallel(mount.path(), args)
    } else {
        run_sequential(mount.path(), args)
    };

    drop(mount);

    if !failures.is_empty() {
        bail!("failed subvolumes: {}", failures.join(" "));
    }

    log::info!("immutability complete");
    Ok(())
}

fn run_sequential(raw_mount: &Path, args: &Args) -> Vec<String> {
    let mut failures = Vec::new();
    for pair in &args.pairs {
        if let Err(err) = reconcile(
            raw_mount,
            pair,
            &args.snapshots_root_name,
            &args.clean_label,
            args.mode,
        ) {
            log::error!("{} failed: {err}", pair.name);
            failures.push(pair.name.clone());
        }
    }
    failures
}

fn run_parallel(raw_mount: &Path, args: &Args) -> Vec<String> {
    let handles: Vec<_> = args
        .pairs
        .iter()
        .cloned()
        .map(|pair| {
            let raw_mount = raw_mount.to_path_buf();
            let snapshots_root_name = args.snapshots_root_name.clone();
            let clean_label = args.clean_label.clone();
            let mode = args.mode;
            thread::spawn(move || {
                let result = reconcile(&raw_mount, &pair, &snapshots_root_name, &clean_label, mode);
                (pair.name, result)
            })
        })
        .collect();

    let mut failures = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok((name, Ok(()))) => {
                log::info!("{name} reconciled successfully");
            }
            Ok((name, Err(err))) => {
                log::error!("{name} failed: {err}");
                failures.push(name);
            }
            Err(_) => {
                failures.push("<panicked thread>".to_string());
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn argv(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parses_a_full_reset_invocation() {
        let dir = tempdir().unwrap();
        let root_filter = dir.path().join("root.filter");
        let home_filter = dir.path().join("home.filter");
        std::fs::write(&root_filter, "+ */\n- *\n").unwrap();
        std::fs::write(&home_filter, "+ */\n- *\n").unwrap();

        let args = Args::parse(&argv(&[
            "/dev/sda2",
            "snapshots",
            "CLEAN",
            "reset",
            &format!("@root=/:{}", root_filter.display()),
            &format!("@home=/home:{}", home_filter.display()),
        ]))
        .unwrap();
        assert_eq!(args.mode, Mode::Reset);
        assert_eq!(args.pairs.len(), 2);
    }

    #[test]
    fn rejects_too_few_arguments() {
        assert!(Args::parse(&argv(&["/dev/sda2", "snapshots", "CLEAN"])).is_err());
    }

    #[test]
    fn rejects_unknown_mode() {
        assert!(Args::parse(&argv(&["/dev/sda2", "snapshots", "CLEAN", "rewind"])).is_err());
    }

    #[test]
    fn disabled_mode_accepts_zero_pairs() {
        let args = Args::parse(&argv(&["/dev/sda2", "snapshots", "CLEAN", "disabled"])).unwrap();
        assert!(args.pairs.is_empty());
    }

    #[test]
    fn reset_mode_requires_at_least_one_pair() {
        assert!(Args::parse(&argv(&["/dev/sda2", "snapshots", "CLEAN", "reset"])).is_err());
    }

    #[test]
    fn reset_mode_requires_filter_path_on_every_pair() {
        let err = Args::parse(&argv(&[
            "/dev/sda2",
            "snapshots",
            "CLEAN",
            "reset",
            "@root=/",
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("missing a filter file path"));
    }

    #[test]
    fn reset_mode_rejects_a_filter_path_that_does_not_exist_before_any_mutation() {
        let dir = tempdir().unwrap();
        let missing_filter = dir.path().join("never-written.filter");

        let err = Args::parse(&argv(&[
            "/dev/sda2",
            "snapshots",
            "CLEAN",
            "reset",
            &format!("@root=/:{}", missing_filter.display()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn reset_mode_rejects_a_filter_path_pointing_at_a_directory() {
        let dir = tempdir().unwrap();
        let filter_as_dir = dir.path().join("oops-a-directory");
        std::fs::create_dir_all(&filter_as_dir).unwrap();

        let err = Args::parse(&argv(&[
            "/dev/sda2",
            "snapshots",
            "CLEAN",
            "reset",
            &format!("@root=/:{}", filter_as_dir.display()),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn restore_previous_does_not_require_a_filter_path() {
        let args = Args::parse(&argv(&[
            "/dev/sda2",
            "snapshots",
            "CLEAN",
            "restore-previous",
            "@root=/",
        ]))
        .unwrap();
        assert_eq!(args.pairs[0].filter_path, None);
    }

    #[test]
    fn restore_previous_does_not_validate_a_filter_path_even_if_given() {
        // Filter suffix is ignored outside reset mode (spec §6); a
        // nonexistent path here must not be a configuration error.
        let args = Args::parse(&argv(&[
            "/dev/sda2",
            "snapshots",
            "CLEAN",
            "restore-previous",
            "@root=/:/does/not/exist",
        ]))
        .unwrap();
        assert_eq!(
            args.pairs[0].filter_path,
            Some(PathBuf::from("/does/not/exist"))
        );
    }
}
