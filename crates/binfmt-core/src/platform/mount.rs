//! Mount lifecycle for the binfmt_misc filesystem.
//!
//! [`ensure_mounted`] mounts the filesystem when its `status` marker is
//! missing and hands back a [`MountGuard`]. The guard unmounts on drop, but
//! only if this process performed the mount.

use crate::config::BinfmtConfig;
use crate::error::{BinfmtError, Result};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Whether the binfmt_misc filesystem is mounted at `path`.
pub fn is_mounted(path: &Path) -> bool {
    path.join(BinfmtConfig::STATUS_ENTRY).exists()
}

/// The mount and unmount system calls, behind a seam for tests.
pub trait MountOps: Send + Sync + std::fmt::Debug {
    fn mount(&self, path: &Path) -> io::Result<()>;
    fn unmount(&self, path: &Path) -> io::Result<()>;
}

/// The real `mount(2)` / `umount(2)` calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemMount;

impl MountOps for SystemMount {
    #[cfg(target_os = "linux")]
    fn mount(&self, path: &Path) -> io::Result<()> {
        use nix::mount::MsFlags;

        nix::mount::mount(
            Some(BinfmtConfig::FS_TYPE),
            path,
            Some(BinfmtConfig::FS_TYPE),
            MsFlags::empty(),
            None::<&str>,
        )
        .map_err(io::Error::from)
    }

    #[cfg(target_os = "linux")]
    fn unmount(&self, path: &Path) -> io::Result<()> {
        nix::mount::umount(path).map_err(io::Error::from)
    }

    #[cfg(not(target_os = "linux"))]
    fn mount(&self, _path: &Path) -> io::Result<()> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "binfmt_misc is only available on Linux",
        ))
    }

    #[cfg(not(target_os = "linux"))]
    fn unmount(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }
}

/// Scoped ownership of a binfmt_misc mount.
#[derive(Debug)]
#[must_use = "dropping the guard immediately unmounts a filesystem this process mounted"]
pub struct MountGuard {
    path: PathBuf,
    // Set only when this process performed the mount.
    owner: Option<Arc<dyn MountOps>>,
}

impl MountGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True if this process mounted the filesystem and will unmount it.
    pub fn mounted_by_us(&self) -> bool {
        self.owner.is_some()
    }
}

impl Drop for MountGuard {
    fn drop(&mut self) {
        let Some(ops) = self.owner.take() else {
            return;
        };
        match ops.unmount(&self.path) {
            Ok(()) => debug!("Unmounted binfmt_misc at {}", self.path.display()),
            Err(e) => warn!("Failed to unmount binfmt_misc at {}: {}", self.path.display(), e),
        }
    }
}

/// Make sure binfmt_misc is mounted at `path`.
///
/// A pre-existing mount is left alone and never unmounted by the guard.
///
/// # Errors
/// Returns [`BinfmtError::Mount`] wrapping the system error if the mount
/// call fails. There is no retry.
pub fn ensure_mounted(path: &Path) -> Result<MountGuard> {
    ensure_mounted_with(path, Arc::new(SystemMount))
}

/// [`ensure_mounted`] with explicit mount operations.
pub fn ensure_mounted_with(path: &Path, ops: Arc<dyn MountOps>) -> Result<MountGuard> {
    if is_mounted(path) {
        debug!("binfmt_misc already mounted at {}", path.display());
        return Ok(MountGuard {
            path: path.to_path_buf(),
            owner: None,
        });
    }

    ops.mount(path).map_err(|source| BinfmtError::Mount {
        path: path.to_path_buf(),
        source,
    })?;
    info!("Mounted binfmt_misc at {}", path.display());

    Ok(MountGuard {
        path: path.to_path_buf(),
        owner: Some(ops),
    })
}
