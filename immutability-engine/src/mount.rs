//! Acquires the raw top of the btrfs volume (subvolume id 5) at a
//! fixed private mount point and guarantees its release on every exit
//! path, including panics (spec §4.2).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::process::run_checked;

/// RAII handle over the raw-volume mount. Dropping it unmounts
/// recursively and removes the mount point directory. Unmount failure
/// during drop can't propagate a `Result`; it is logged at `ERR` and
/// swallowed, which is the only sound behaviour for a destructor.
pub struct MountHandle {
    mount_point: PathBuf,
    released: bool,
}

impl MountHandle {
    /// Mounts `device`'s raw top-level volume at `mount_point` with
    /// `subvolid=5,user_subvol_rm_allowed`. Fails before any state is
    /// touched if the mount point is missing, already occupied, or the
    /// mount itself fails.
    pub fn mount(device: &Path, mount_point: &Path) -> Result<Self> {
        if mount_point.exists() {
            let occupied = fs::read_dir(mount_point)
                .with_context(|| format!("reading mount point {}", mount_point.display()))?
                .next()
                .is_some();
            if occupied {
                bail!(
                    "mount point {} already has contents; refusing to mount over it",
                    mount_point.display()
                );
            }
        } else {
            fs::create_dir_all(mount_point)
                .with_context(|| format!("creating mount point {}", mount_point.display()))?;
        }

        let device_str = device
            .to_str()
            .with_context(|| format!("device path {} is not valid UTF-8", device.display()))?;
        let mount_point_str = mount_point.to_str().with_context(|| {
            format!("mount point {} is not valid UTF-8", mount_point.display())
        })?;

        let mount_result = run_checked(
            "mount",
            &[
                "-t",
                "btrfs",
                "-o",
                "subvolid=5,user_subvol_rm_allowed",
                device_str,
                mount_point_str,
            ],
        );

        if let Err(err) = mount_result {
            // Nothing is mounted yet, but we may have just created the
            // mount point directory; leave it no worse than we found
            // it rather than abandoning an empty directory.
            let _ = fs::remove_dir(mount_point);
            return Err(err)
                .with_context(|| format!("mounting {} at {}", device.display(), mount_point.display()));
        }

        Ok(MountHandle {
            mount_point: mount_point.to_path_buf(),
            released: false,
        })
    }

    pub fn path(&self) -> &Path {
        &self.mount_point
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        let mount_point_str = match self.mount_point.to_str() {
            Some(s) => s,
            None => {
                log::error!(
                    "mount point {} is not valid UTF-8, cannot unmount",
                    self.mount_point.display()
                );
                return;
            }
        };

        if let Err(err) = run_checked("umount", &["-R", mount_point_str]) {
            log::error!("failed to unmount {}: {err}", self.mount_point.display());
            return;
        }

        if let Err(err) = fs::remove_dir(&self.mount_point) {
            log::error!(
                "failed to remove mount point {}: {err}",
                self.mount_point.display()
            );
        }
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        self.release();
    }
}
