//! Error types for the template corrector

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for template corrector operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure category reported for a file, or for the whole run when it cannot start or continue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCategory {
    WorkingDirectoryMissing,
    ExtractionFailed,
    BackupCreationFailed,
    RepackagingFailed,
    BackupRestorationFailed,
    ScratchCleanupFailed,
    BackupDeletionFailed,
    MetadataRestorationFailed,
    TraversalFailed,
    InvalidPattern,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::WorkingDirectoryMissing => "working-directory-missing",
            ErrorCategory::ExtractionFailed => "extraction-failed",
            ErrorCategory::BackupCreationFailed => "backup-creation-failed",
            ErrorCategory::RepackagingFailed => "repackaging-failed",
            ErrorCategory::BackupRestorationFailed => "backup-restoration-failed",
            ErrorCategory::ScratchCleanupFailed => "scratch-cleanup-failed",
            ErrorCategory::BackupDeletionFailed => "backup-deletion-failed",
            ErrorCategory::MetadataRestorationFailed => "metadata-restoration-failed",
            ErrorCategory::TraversalFailed => "traversal-failed",
            ErrorCategory::InvalidPattern => "invalid-pattern",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised while reading or writing a document package
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Entry path is not inside the package root: {0}")]
    OutsideRoot(PathBuf),

    #[error("Package entry is a symbolic link: {0}")]
    SymbolicLink(String),

    #[error("Package entry name escapes the extraction directory: {0}")]
    UnsafeEntry(String),
}

/// Main error type for the template corrector
#[derive(Error, Debug)]
pub enum Error {
    #[error("Working directory does not exist: {}", .0.display())]
    WorkingDirectoryMissing(PathBuf),

    #[error("Failed to unzip document {}", path.display())]
    Extraction {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    #[error("Failed to create backup file {}", backup.display())]
    BackupCreation {
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to rezip document {}", path.display())]
    Repackaging {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },

    /// Restoring the backup after a failed repackaging failed too; `source` is the
    /// repackaging error so both stay visible in the cause chain.
    #[error("Failed to restore backup {}: {restore}", backup.display())]
    BackupRestoration {
        backup: PathBuf,
        restore: std::io::Error,
        #[source]
        source: Box<Error>,
    },

    #[error("Failed to remove temporary unzip directory {}", path.display())]
    ScratchCleanup {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove backup file {}", backup.display())]
    BackupDeletion {
        backup: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to restore {what} on {}", path.display())]
    MetadataRestoration {
        path: PathBuf,
        what: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Invalid search pattern: {0}")]
    Regex(#[from] regex::Error),
}

impl Error {
    /// Category used in reports
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::WorkingDirectoryMissing(_) => ErrorCategory::WorkingDirectoryMissing,
            Error::Extraction { .. } => ErrorCategory::ExtractionFailed,
            Error::BackupCreation { .. } => ErrorCategory::BackupCreationFailed,
            Error::Repackaging { .. } => ErrorCategory::RepackagingFailed,
            Error::BackupRestoration { .. } => ErrorCategory::BackupRestorationFailed,
            Error::ScratchCleanup { .. } => ErrorCategory::ScratchCleanupFailed,
            Error::BackupDeletion { .. } => ErrorCategory::BackupDeletionFailed,
            Error::MetadataRestoration { .. } => ErrorCategory::MetadataRestorationFailed,
            Error::WalkDir(_) => ErrorCategory::TraversalFailed,
            Error::Regex(_) => ErrorCategory::InvalidPattern,
        }
    }

    /// Messages of every error below this one, outermost first
    pub fn causes(&self) -> Vec<String> {
        let mut causes = Vec::new();
        let mut current = std::error::Error::source(self);
        while let Some(cause) = current {
            causes.push(cause.to_string());
            current = cause.source();
        }
        causes
    }

    /// The innermost cause, or this error itself when it wraps nothing
    pub fn root_cause(&self) -> String {
        self.causes().pop().unwrap_or_else(|| self.to_string())
    }
}
