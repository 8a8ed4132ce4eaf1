//! Unix file ownership and permission bits.

use nix::unistd::{Gid, Uid, chown};
use std::fs::{self, Metadata, Permissions};
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::Path;

/// Attributes beyond the portable timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformMetadata {
    uid: u32,
    gid: u32,
    mode: u32,
}

impl PlatformMetadata {
    pub fn capture(metadata: &Metadata) -> Self {
        Self {
            uid: metadata.uid(),
            gid: metadata.gid(),
            mode: metadata.mode(),
        }
    }

    /// Give the file back its owner and group.
    ///
    /// Skipped when they already match, so unprivileged runs only fail when
    /// the original belonged to someone else.
    pub fn restore_owner(&self, path: &Path) -> io::Result<()> {
        let current = fs::metadata(path)?;
        if current.uid() == self.uid && current.gid() == self.gid {
            return Ok(());
        }
        chown(
            path,
            Some(Uid::from_raw(self.uid)),
            Some(Gid::from_raw(self.gid)),
        )
        .map_err(io::Error::from)
    }

    /// Birth time cannot be set on Unix
    pub fn restore_creation_time(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    pub fn restore_attributes(&self, path: &Path) -> io::Result<()> {
        fs::set_permissions(path, Permissions::from_mode(self.mode & 0o7777))
    }
}
