//! Word Template Corrector - re-points the attached template of Word documents
//!
//! This library scans a directory for `.docx`, `.docm` and `.dotm` packages and
//! rewrites the template reference in `word/_rels/settings.xml.rels` with:
//! - Case-insensitive (or case-sensitive) literal path substitution
//! - A `.bak` copy of every rewritten document, restored if repackaging fails
//! - Optional preservation of timestamps, attributes and ownership
//! - Dry-run reporting of affected documents

pub mod archive;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod metadata;
pub mod os;
pub mod process;
pub mod report;
pub mod substitute;
pub mod walk;

pub use archive::{Archiver, ZipArchiver};
pub use cli::Cli;
pub use config::{Config, ConfigError};
pub use document::{Correction, DocumentTransactor, Verdict};
pub use error::{Error, ErrorCategory, Result};
pub use process::{
    FileResult, Outcome, ProcessingStats, ProcessingStatus, Processor, RunAborted, RunSummary,
};
pub use report::{ReportEntry, ReportFormatter, RunReport};
pub use substitute::Substitution;

/// Process exit code of a completed run, even with per-file failures
pub const EXIT_SUCCESS: u8 = 0;
/// Process exit code for argument, configuration or other fatal errors
pub const EXIT_FAILURE: u8 = 1;
/// Process exit code when the working directory does not exist
pub const EXIT_DIRECTORY_MISSING: u8 = 2;
