//! File metadata snapshot taken before a document is rewritten

use crate::error::Error;
use crate::os::PlatformMetadata;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use tracing::debug;

/// Timestamps and attributes of a document, restored onto its replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetadataSnapshot {
    accessed: FileTime,
    modified: FileTime,
    platform: PlatformMetadata,
}

impl MetadataSnapshot {
    pub fn capture(path: &Path) -> io::Result<Self> {
        let metadata = fs::metadata(path)?;
        Ok(Self {
            accessed: FileTime::from_last_access_time(&metadata),
            modified: FileTime::from_last_modification_time(&metadata),
            platform: PlatformMetadata::capture(&metadata),
        })
    }

    /// Apply the snapshot to `path`, returning one error per aspect that could not be restored.
    ///
    /// Attributes come last: a read-only attribute would block the other updates.
    pub fn restore(&self, path: &Path) -> Vec<Error> {
        let mut failures = Vec::new();
        let mut record = |what: &'static str, result: io::Result<()>| {
            if let Err(source) = result {
                debug!(path = %path.display(), what, error = %source, "Metadata not restored");
                failures.push(Error::MetadataRestoration {
                    path: path.to_path_buf(),
                    what,
                    source,
                });
            }
        };

        record("ownership", self.platform.restore_owner(path));
        record("creation time", self.platform.restore_creation_time(path));
        record(
            "timestamps",
            filetime::set_file_times(path, self.accessed, self.modified),
        );
        record("attributes", self.platform.restore_attributes(path));

        failures
    }
}
