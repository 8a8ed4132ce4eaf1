//! Per-document template path correction
//!
//! One document is handled as a small transaction:
//! 1. snapshot metadata (when preserving)
//! 2. unzip into a private scratch directory
//! 3. patch `word/_rels/settings.xml.rels`
//! 4. rename the original to `<name>.bak`, rezip into the original name,
//!    and put the backup back if rezipping fails
//! 5. remove the scratch directory
//!
//! Dry runs stop after deciding whether the descriptor would change.

use crate::archive::{Archiver, ZipArchiver};
use crate::config::Config;
use crate::error::{ArchiveError, Error, Result};
use crate::metadata::MetadataSnapshot;
use crate::substitute::{Substitution, template_target};
use serde::Serialize;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{Level, debug, span, warn};

/// Relationship descriptor holding the attached template reference
pub const SETTINGS_RELS_PATH: &str = "word/_rels/settings.xml.rels";

/// Suffix appended to the original file name for its backup
pub const BACKUP_SUFFIX: &str = ".bak";

/// Prefix of every scratch extraction directory
pub const SCRATCH_PREFIX: &str = "_wtc_";

/// Longest part of the document name carried into a scratch directory name, in bytes
const SCRATCH_NAME_MAX: usize = 64;

/// What happened to a document that was processed without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// No template reference, or the old path does not occur in it
    Unchanged,
    /// The document was rewritten
    Changed,
    /// Dry run: the document would be rewritten
    Affected,
}

/// Result of correcting one document
#[derive(Debug)]
pub struct Correction {
    pub verdict: Verdict,
    /// Attached template path found in the descriptor
    pub target: Option<String>,
    /// Problems that did not undo the rewrite
    pub warnings: Vec<Error>,
}

impl Correction {
    fn new(verdict: Verdict, target: Option<String>) -> Self {
        Self {
            verdict,
            target,
            warnings: Vec::new(),
        }
    }
}

/// `<original>.bak`, next to the original
pub fn backup_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

/// Scratch directory name prefix: the document name, cut to a bounded length
fn scratch_prefix(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut end = name.len().min(SCRATCH_NAME_MAX);
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{}_", SCRATCH_PREFIX, &name[..end])
}

/// Applies a [`Substitution`] to single documents
#[derive(Debug)]
pub struct DocumentTransactor<A: Archiver = ZipArchiver> {
    substitution: Substitution,
    scratch_root: PathBuf,
    dry_run: bool,
    no_backup: bool,
    preserve: bool,
    archiver: A,
}

impl DocumentTransactor<ZipArchiver> {
    pub fn new(config: &Config) -> Result<Self> {
        Self::with_archiver(config, ZipArchiver)
    }
}

impl<A: Archiver> DocumentTransactor<A> {
    /// Create a transactor that packs and unpacks documents with `archiver`
    pub fn with_archiver(config: &Config, archiver: A) -> Result<Self> {
        let substitution = Substitution::from_paths(&config.old, &config.new, config.case_sensitive)?;

        Ok(Self {
            substitution,
            scratch_root: config.scratch_root(),
            dry_run: config.dry_run,
            no_backup: config.no_backup,
            preserve: config.preserve,
            archiver,
        })
    }

    pub fn substitution(&self) -> &Substitution {
        &self.substitution
    }

    /// Correct the template path of one document.
    ///
    /// On error the original document is either untouched or has been
    /// restored from its backup, except for [`Error::BackupRestoration`].
    pub fn correct(&self, path: &Path) -> Result<Correction> {
        let _span = span!(Level::DEBUG, "correct_document", path = %path.display()).entered();

        let snapshot = if self.preserve && !self.dry_run {
            let snapshot = MetadataSnapshot::capture(path).map_err(|e| Error::Extraction {
                path: path.to_path_buf(),
                source: e.into(),
            })?;
            Some(snapshot)
        } else {
            None
        };

        let scratch = self.create_scratch(path)?;
        let scratch_path = scratch.path().to_path_buf();

        let result = self
            .archiver
            .extract(path, &scratch_path)
            .map_err(|source| Error::Extraction {
                path: path.to_path_buf(),
                source,
            })
            .and_then(|()| self.patch(path, &scratch_path, snapshot.as_ref()));

        match (result, scratch.close()) {
            (Ok(correction), Ok(())) => Ok(correction),
            (Ok(correction), Err(source)) => {
                warn!(
                    path = %path.display(),
                    verdict = ?correction.verdict,
                    scratch = %scratch_path.display(),
                    "Document processed but scratch directory remains"
                );
                Err(Error::ScratchCleanup {
                    path: scratch_path,
                    source,
                })
            }
            (Err(err), Ok(())) => Err(err),
            (Err(err), Err(cleanup)) => {
                warn!(
                    scratch = %scratch_path.display(),
                    error = %cleanup,
                    "Failed to remove scratch directory"
                );
                Err(err)
            }
        }
    }

    /// Scratch directories are unique per call, so same-named documents never share one
    fn create_scratch(&self, path: &Path) -> Result<TempDir> {
        tempfile::Builder::new()
            .prefix(&scratch_prefix(path))
            .tempdir_in(&self.scratch_root)
            .map_err(|e| Error::Extraction {
                path: path.to_path_buf(),
                source: e.into(),
            })
    }

    fn patch(
        &self,
        path: &Path,
        scratch: &Path,
        snapshot: Option<&MetadataSnapshot>,
    ) -> Result<Correction> {
        let descriptor = scratch.join(SETTINGS_RELS_PATH);
        let is_regular_file = fs::symlink_metadata(&descriptor)
            .map(|m| m.file_type().is_file())
            .unwrap_or(false);
        if !is_regular_file {
            debug!("Document has no attached template");
            return Ok(Correction::new(Verdict::Unchanged, None));
        }

        let content = fs::read_to_string(&descriptor).map_err(|e| Error::Extraction {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        let target = template_target(&content).map(str::to_string);
        if let Some(target) = &target {
            debug!(target = %target, "Attached template");
        }

        let Some(patched) = self.substitution.apply(&content) else {
            if target.is_some() {
                debug!(
                    old = self.substitution.old(),
                    "Template path does not contain the old path"
                );
            }
            return Ok(Correction::new(Verdict::Unchanged, target));
        };

        if self.dry_run {
            return Ok(Correction::new(Verdict::Affected, target));
        }

        fs::write(&descriptor, patched).map_err(|e| Error::Repackaging {
            path: path.to_path_buf(),
            source: e.into(),
        })?;

        let mut correction = Correction::new(Verdict::Changed, target);
        correction.warnings = self.write_back(path, scratch, snapshot)?;
        Ok(correction)
    }

    /// Swap the rezipped scratch tree in for the original document
    fn write_back(
        &self,
        path: &Path,
        scratch: &Path,
        snapshot: Option<&MetadataSnapshot>,
    ) -> Result<Vec<Error>> {
        let backup = backup_path(path);

        if fs::symlink_metadata(&backup).is_ok() {
            return Err(Error::BackupCreation {
                backup,
                source: io::Error::new(io::ErrorKind::AlreadyExists, "backup file already exists"),
            });
        }

        fs::rename(path, &backup).map_err(|source| Error::BackupCreation {
            backup: backup.clone(),
            source,
        })?;

        if let Err(source) = self.archiver.pack(scratch, path) {
            // AlreadyExists means another file took the original name; it is not ours to remove
            let name_taken = matches!(
                &source,
                ArchiveError::Io(e) if e.kind() == io::ErrorKind::AlreadyExists
            );
            let repackaging = Error::Repackaging {
                path: path.to_path_buf(),
                source,
            };

            let restored = if name_taken {
                Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "original file name is taken by another file",
                ))
            } else {
                // A partially written archive may occupy the original name
                if let Err(e) = fs::remove_file(path)
                    && e.kind() != io::ErrorKind::NotFound
                {
                    warn!(path = %path.display(), error = %e, "Failed to remove partial archive");
                }
                fs::rename(&backup, path)
            };

            return Err(match restored {
                Ok(()) => {
                    warn!(path = %path.display(), "Rezip failed, original restored from backup");
                    repackaging
                }
                Err(restore) => Error::BackupRestoration {
                    backup,
                    restore,
                    source: Box::new(repackaging),
                },
            });
        }

        let mut warnings = Vec::new();

        if let Some(snapshot) = snapshot {
            warnings.extend(snapshot.restore(path));
        }

        if self.no_backup
            && let Err(source) = fs::remove_file(&backup)
        {
            warnings.push(Error::BackupDeletion { backup, source });
        }

        Ok(warnings)
    }
}
