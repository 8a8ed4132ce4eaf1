//! Windows creation time and file attributes.

use filetime::FileTime;
use std::fs::{Metadata, OpenOptions};
use std::io;
use std::os::windows::ffi::OsStrExt;
use std::os::windows::fs::MetadataExt;
use std::os::windows::io::AsRawHandle;
use std::path::Path;
use winapi::shared::minwindef::FILETIME;
use winapi::um::fileapi::{SetFileAttributesW, SetFileTime};
use winapi::um::winnt::HANDLE;

/// Attributes beyond the portable timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformMetadata {
    created: Option<FileTime>,
    attributes: u32,
}

impl PlatformMetadata {
    pub fn capture(metadata: &Metadata) -> Self {
        Self {
            created: FileTime::from_creation_time(metadata),
            attributes: metadata.file_attributes(),
        }
    }

    /// Ownership and ACLs are left as inherited by the new file
    pub fn restore_owner(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    pub fn restore_creation_time(&self, path: &Path) -> io::Result<()> {
        let Some(created) = self.created else {
            return Ok(());
        };

        // filetime counts Windows timestamps from 1601, like FILETIME
        let intervals =
            created.seconds() as u64 * 10_000_000 + u64::from(created.nanoseconds()) / 100;
        let filetime = FILETIME {
            dwLowDateTime: intervals as u32,
            dwHighDateTime: (intervals >> 32) as u32,
        };

        let file = OpenOptions::new().write(true).open(path)?;
        let success = unsafe {
            SetFileTime(
                file.as_raw_handle() as HANDLE,
                &filetime,
                std::ptr::null(),
                std::ptr::null(),
            )
        };

        if success != 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }

    pub fn restore_attributes(&self, path: &Path) -> io::Result<()> {
        let wide: Vec<u16> = path
            .as_os_str()
            .encode_wide()
            .chain(std::iter::once(0))
            .collect();

        let success = unsafe { SetFileAttributesW(wide.as_ptr(), self.attributes) };

        if success != 0 {
            Ok(())
        } else {
            Err(io::Error::last_os_error())
        }
    }
}
