//! Document package extraction and repackaging
//!
//! Word documents are zip packages. A document is unpacked into a scratch
//! directory, patched in place, then packed back into a fresh archive.

use crate::error::ArchiveError;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::trace;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

/// Package part listing the content types; Word expects it to come first
const CONTENT_TYPES_ENTRY: &str = "[Content_Types].xml";

/// Unpacks and repacks document packages
pub trait Archiver {
    /// Extract every entry of `archive` below `dest`
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError>;

    /// Create a new archive at `archive` from the contents of `source_dir`
    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<(), ArchiveError>;
}

/// [`Archiver`] backed by the `zip` crate
#[derive(Debug, Default, Clone, Copy)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
    /// Symbolic link entries are refused, so nothing written below `dest`
    /// can point outside of it.
    fn extract(&self, archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
        let reader = BufReader::new(File::open(archive)?);
        let mut zip = ZipArchive::new(reader)?;
        trace!(archive = %archive.display(), entries = zip.len(), "Extracting package");

        fs::create_dir_all(dest)?;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            if is_symlink_mode(entry.unix_mode()) {
                return Err(ArchiveError::SymbolicLink(entry.name().to_string()));
            }
            let Some(relative) = entry.enclosed_name() else {
                return Err(ArchiveError::UnsafeEntry(entry.name().to_string()));
            };

            let target = dest.join(relative);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut out = BufWriter::new(File::create(&target)?);
            io::copy(&mut entry, &mut out)?;
            out.flush()?;
        }
        Ok(())
    }

    fn pack(&self, source_dir: &Path, archive: &Path) -> Result<(), ArchiveError> {
        let file = File::options()
            .write(true)
            .create_new(true)
            .open(archive)?;
        let mut zip = ZipWriter::new(BufWriter::new(file));

        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let content_types = source_dir.join(CONTENT_TYPES_ENTRY);
        if fs::symlink_metadata(&content_types).is_ok_and(|m| m.file_type().is_file()) {
            zip.start_file(CONTENT_TYPES_ENTRY, options)?;
            copy_into(&content_types, &mut zip)?;
        }

        for entry in WalkDir::new(source_dir)
            .min_depth(1)
            .sort_by_file_name()
        {
            let entry = entry?;
            let path = entry.path();
            let name = entry_name(source_dir, path)?;

            if entry.file_type().is_symlink() {
                return Err(ArchiveError::SymbolicLink(name));
            }

            if entry.file_type().is_dir() {
                if fs::read_dir(path)?.next().is_none() {
                    zip.add_directory(name, options)?;
                }
                continue;
            }

            if name == CONTENT_TYPES_ENTRY {
                continue;
            }

            zip.start_file(name, options)?;
            copy_into(path, &mut zip)?;
        }

        let mut writer = zip.finish()?;
        writer.flush()?;
        writer
            .into_inner()
            .map_err(|e| e.into_error())?
            .sync_all()?;

        trace!(archive = %archive.display(), "Package written");
        Ok(())
    }
}

/// Unix file type bits of a symbolic link
fn is_symlink_mode(mode: Option<u32>) -> bool {
    mode.is_some_and(|mode| mode & 0o170000 == 0o120000)
}

/// Zip entry name of `path` relative to `root`, always with `/` separators
fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path
        .strip_prefix(root)
        .map_err(|_| ArchiveError::OutsideRoot(path.to_path_buf()))?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn copy_into<W: Write + io::Seek>(path: &Path, zip: &mut ZipWriter<W>) -> Result<(), ArchiveError> {
    let mut reader = BufReader::new(File::open(path)?);
    io::copy(&mut reader, zip)?;
    Ok(())
}
