//! Batch processing of every candidate document below the working directory
//!
//! Documents are handled strictly one after another in discovery order. A
//! failing document is recorded and the batch moves on; only a fatal
//! traversal error ends the run early.

use crate::archive::{Archiver, ZipArchiver};
use crate::config::Config;
use crate::document::{Correction, DocumentTransactor, Verdict};
use crate::error::{Error, Result};
use crate::walk::DocumentWalker;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tracing::{Level, debug, error, info, span, warn};

/// Outcome of processing a single file
#[derive(Debug)]
pub enum Outcome {
    Unchanged,
    Changed,
    /// Dry run: the file would have been changed
    Affected,
    Failed(Error),
}

/// Status of file processing, without the failure details
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStatus {
    Unchanged,
    Changed,
    Affected,
    Failed,
}

/// Result of processing a single file
#[derive(Debug)]
pub struct FileResult {
    /// Document path
    pub path: PathBuf,
    pub outcome: Outcome,
    /// Attached template found in the document (if any)
    pub target: Option<String>,
    /// Non-fatal problems, such as a backup that could not be deleted
    pub warnings: Vec<Error>,
}

impl FileResult {
    fn from_correction(path: PathBuf, correction: Correction) -> Self {
        let outcome = match correction.verdict {
            Verdict::Unchanged => Outcome::Unchanged,
            Verdict::Changed => Outcome::Changed,
            Verdict::Affected => Outcome::Affected,
        };
        Self {
            path,
            outcome,
            target: correction.target,
            warnings: correction.warnings,
        }
    }

    fn failed(path: PathBuf, error: Error) -> Self {
        Self {
            path,
            outcome: Outcome::Failed(error),
            target: None,
            warnings: Vec::new(),
        }
    }

    pub fn status(&self) -> ProcessingStatus {
        match self.outcome {
            Outcome::Unchanged => ProcessingStatus::Unchanged,
            Outcome::Changed => ProcessingStatus::Changed,
            Outcome::Affected => ProcessingStatus::Affected,
            Outcome::Failed(_) => ProcessingStatus::Failed,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match &self.outcome {
            Outcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Processing statistics
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ProcessingStats {
    /// Every candidate document, whatever its outcome
    pub scanned: usize,
    /// Changed documents, or affected ones in a dry run
    pub changed: usize,
    /// Failed documents
    pub errors: usize,
    /// Non-fatal problems across all documents
    pub warnings: usize,
}

impl ProcessingStats {
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&mut self, result: &FileResult) {
        self.scanned += 1;
        match result.status() {
            ProcessingStatus::Changed | ProcessingStatus::Affected => self.changed += 1,
            ProcessingStatus::Failed => self.errors += 1,
            ProcessingStatus::Unchanged => {}
        }
        self.warnings += result.warnings.len();
    }

    pub fn summary(&self) -> String {
        format!(
            "Scanned: {}, Changed: {}, Errors: {}, Warnings: {}",
            self.scanned, self.changed, self.errors, self.warnings
        )
    }
}

/// Counters and timing of a finished run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub stats: ProcessingStats,
    pub elapsed: Duration,
    pub dry_run: bool,
}

/// A run ended early by a fatal traversal error, with the counters up to that point
#[derive(thiserror::Error, Debug)]
#[error("Run aborted after {} file(s): {error}", .summary.stats.scanned)]
pub struct RunAborted {
    pub summary: RunSummary,
    #[source]
    pub error: Error,
}

/// Runs the template correction over a directory tree
pub struct Processor<A: Archiver = ZipArchiver> {
    config: Config,
    walker: DocumentWalker,
    transactor: DocumentTransactor<A>,
    stats: ProcessingStats,
}

impl Processor<ZipArchiver> {
    /// Create a new processor with the given configuration
    pub fn new(config: Config) -> Result<Self> {
        Self::with_archiver(config, ZipArchiver)
    }
}

impl<A: Archiver> Processor<A> {
    /// Create a processor that reads and writes documents with `archiver`.
    ///
    /// Fails with [`Error::WorkingDirectoryMissing`] before anything is scanned.
    pub fn with_archiver(config: Config, archiver: A) -> Result<Self> {
        if !config.directory.is_dir() {
            return Err(Error::WorkingDirectoryMissing(config.directory.clone()));
        }

        let walker = DocumentWalker::new(&config.directory, config.recursive);
        let transactor = DocumentTransactor::with_archiver(&config, archiver)?;

        Ok(Self {
            config,
            walker,
            transactor,
            stats: ProcessingStats::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Old and new path as they are searched for and written
    pub fn search_and_replace(&self) -> (&str, &str) {
        let substitution = self.transactor.substitution();
        (substitution.old(), substitution.new_path())
    }

    /// Get processing statistics reference
    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Run the batch, returning every file result once the run is over
    pub fn run(&mut self) -> std::result::Result<(RunSummary, Vec<FileResult>), RunAborted> {
        let mut results = Vec::new();
        let summary = self.run_with(|result| results.push(result))?;
        Ok((summary, results))
    }

    /// Run the batch, handing each file result to `on_result` as soon as it is known.
    ///
    /// Files handled before a fatal traversal error are still counted in
    /// [`RunAborted::summary`].
    pub fn run_with<F>(&mut self, mut on_result: F) -> std::result::Result<RunSummary, RunAborted>
    where
        F: FnMut(FileResult),
    {
        let _span = span!(Level::INFO, "processor_run").entered();
        let started = Instant::now();
        self.stats = ProcessingStats::new();

        info!(
            directory = %self.walker.root().display(),
            recursive = self.config.recursive,
            dry_run = self.config.dry_run,
            "Scanning for documents"
        );

        for candidate in self.walker.candidates() {
            let path = match candidate {
                Ok(path) => path,
                Err(e) => {
                    error!(
                        error = %e,
                        scanned = self.stats.scanned,
                        "Directory traversal failed"
                    );
                    return Err(RunAborted {
                        summary: self.summary(started),
                        error: e,
                    });
                }
            };

            let result = match self.transactor.correct(&path) {
                Ok(correction) => FileResult::from_correction(path, correction),
                Err(e) => {
                    error!(
                        path = %path.display(),
                        category = %e.category(),
                        error = %e,
                        cause = %e.root_cause(),
                        "Failed to correct document"
                    );
                    FileResult::failed(path, e)
                }
            };

            for warning in &result.warnings {
                warn!(
                    path = %result.path.display(),
                    category = %warning.category(),
                    error = %warning,
                    "Document corrected with warnings"
                );
            }

            match result.status() {
                ProcessingStatus::Changed => info!(path = %result.path.display(), "Corrected document"),
                ProcessingStatus::Affected => info!(path = %result.path.display(), "Would correct document"),
                ProcessingStatus::Unchanged => debug!(path = %result.path.display(), "Document unchanged"),
                ProcessingStatus::Failed => {}
            }

            self.stats.record(&result);
            on_result(result);
        }

        info!("{}", self.stats.summary());
        Ok(self.summary(started))
    }

    fn summary(&self, started: Instant) -> RunSummary {
        RunSummary {
            stats: self.stats,
            elapsed: started.elapsed(),
            dry_run: self.config.dry_run,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::tests::{read_entry, write_docx};
    use crate::document::{SETTINGS_RELS_PATH, backup_path};
    use crate::error::{ArchiveError, ErrorCategory};
    use std::fs;
    use std::io;
    use std::path::Path;
    use tempfile::tempdir;

    const RELS: &str = r#"<Relationships><Relationship Id="rId1" Target="file:///C:\Templates\Normal.dotm" TargetMode="External"/></Relationships>"#;

    fn test_config(dir: &Path) -> Config {
        let scratch = dir.join("scratch");
        fs::create_dir_all(&scratch).unwrap();
        let docs = dir.join("docs");
        fs::create_dir_all(&docs).unwrap();
        Config {
            directory: docs,
            old: r"C:\Templates".to_string(),
            new: r"\\server\templates".to_string(),
            recursive: true,
            scratch_dir: Some(scratch),
            ..Config::default()
        }
    }

    /// Packs normally except for documents named `fail.docx`
    struct SelectiveFailure;

    impl Archiver for SelectiveFailure {
        fn extract(&self, archive: &Path, dest: &Path) -> std::result::Result<(), ArchiveError> {
            ZipArchiver.extract(archive, dest)
        }

        fn pack(&self, source_dir: &Path, archive: &Path) -> std::result::Result<(), ArchiveError> {
            if archive.ends_with("fail.docx") {
                return Err(ArchiveError::Io(io::Error::other("simulated rezip failure")));
            }
            ZipArchiver.pack(source_dir, archive)
        }
    }

    #[test]
    fn test_processing_stats() {
        let mut stats = ProcessingStats::new();
        stats.record(&FileResult::failed(
            PathBuf::from("a.docx"),
            Error::WorkingDirectoryMissing(PathBuf::from("x")),
        ));
        stats.record(&FileResult {
            path: PathBuf::from("b.docx"),
            outcome: Outcome::Affected,
            target: None,
            warnings: Vec::new(),
        });
        stats.record(&FileResult {
            path: PathBuf::from("c.docx"),
            outcome: Outcome::Unchanged,
            target: None,
            warnings: Vec::new(),
        });

        assert_eq!(stats.scanned, 3);
        assert_eq!(stats.changed, 1);
        assert_eq!(stats.errors, 1);
        let summary = stats.summary();
        assert!(summary.contains("Scanned: 3"));
        assert!(summary.contains("Errors: 1"));
    }

    #[test]
    fn test_missing_working_directory() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.directory = dir.path().join("nope");

        let err = Processor::new(config).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::WorkingDirectoryMissing);
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        let mut processor = Processor::new(test_config(dir.path())).unwrap();

        let (summary, results) = processor.run().unwrap();
        assert!(results.is_empty());
        assert_eq!(summary.stats, ProcessingStats::default());
    }

    #[test]
    fn test_batch_counts_and_continues_after_failure() {
        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        let docs = config.directory.clone();

        fs::create_dir_all(docs.join("nested")).unwrap();
        write_docx(&docs.join("one.docx"), Some(RELS));
        write_docx(&docs.join("nested/two.DOTM"), Some(RELS));
        write_docx(&docs.join("plain.docx"), None);
        write_docx(&docs.join("fail.docx"), Some(RELS));
        fs::write(docs.join("broken.docm"), b"garbage").unwrap();
        fs::write(docs.join("notes.txt"), b"ignored").unwrap();

        let original_fail = fs::read(docs.join("fail.docx")).unwrap();

        let mut processor = Processor::with_archiver(config, SelectiveFailure).unwrap();
        let (summary, results) = processor.run().unwrap();

        assert_eq!(summary.stats.scanned, 5);
        assert_eq!(summary.stats.changed, 2);
        assert_eq!(summary.stats.errors, 2);
        assert!(!summary.dry_run);
        assert_eq!(processor.stats(), &summary.stats);

        let status_of = |name: &str| {
            results
                .iter()
                .find(|r| r.path.ends_with(name))
                .map(|r| r.status())
                .unwrap()
        };
        assert_eq!(status_of("one.docx"), ProcessingStatus::Changed);
        assert_eq!(status_of("two.DOTM"), ProcessingStatus::Changed);
        assert_eq!(status_of("plain.docx"), ProcessingStatus::Unchanged);
        assert_eq!(status_of("fail.docx"), ProcessingStatus::Failed);
        assert_eq!(status_of("broken.docm"), ProcessingStatus::Failed);

        let failed = results.iter().find(|r| r.path.ends_with("fail.docx")).unwrap();
        assert_eq!(
            failed.error().unwrap().category(),
            ErrorCategory::RepackagingFailed
        );
        assert_eq!(fs::read(docs.join("fail.docx")).unwrap(), original_fail);

        let descriptor = read_entry(&docs.join("one.docx"), SETTINGS_RELS_PATH).unwrap();
        assert!(descriptor.contains(r"file:///\\server\templates\Normal.dotm"));
        assert!(backup_path(&docs.join("one.docx")).exists());
    }

    #[test]
    fn test_dry_run_counts_affected() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.dry_run = true;
        let doc = config.directory.join("one.docx");
        write_docx(&doc, Some(RELS));
        let original = fs::read(&doc).unwrap();

        let mut processor = Processor::new(config).unwrap();
        let (summary, results) = processor.run().unwrap();

        assert!(summary.dry_run);
        assert_eq!(summary.stats.changed, 1);
        assert_eq!(results[0].status(), ProcessingStatus::Affected);
        assert_eq!(fs::read(&doc).unwrap(), original);
        assert!(!backup_path(&doc).exists());
    }

    #[test]
    fn test_run_with_streams_results() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.no_backup = true;
        write_docx(&config.directory.join("a.docx"), Some(RELS));
        write_docx(&config.directory.join("b.docx"), Some(RELS));

        let mut seen = Vec::new();
        let mut processor = Processor::new(config).unwrap();
        let summary = processor
            .run_with(|result| seen.push(result.path.clone()))
            .unwrap();

        assert_eq!(seen.len(), 2);
        assert_eq!(summary.stats.changed, 2);
        assert_eq!(processor.search_and_replace(), (r"C:\Templates", r"\\server\templates"));
    }

    /// Removes the `vanishing` directory while packing, before the walk reaches it
    struct VanishingDirectory(PathBuf);

    impl Archiver for VanishingDirectory {
        fn extract(&self, archive: &Path, dest: &Path) -> std::result::Result<(), ArchiveError> {
            ZipArchiver.extract(archive, dest)
        }

        fn pack(&self, source_dir: &Path, archive: &Path) -> std::result::Result<(), ArchiveError> {
            if self.0.exists() {
                fs::remove_dir_all(&self.0)?;
            }
            ZipArchiver.pack(source_dir, archive)
        }
    }

    #[test]
    fn test_traversal_error_keeps_partial_summary() {
        let dir = tempdir().unwrap();
        let mut config = test_config(dir.path());
        config.no_backup = true;
        let vanishing = config.directory.join("vanishing");
        fs::create_dir(&vanishing).unwrap();
        write_docx(&vanishing.join("later.docx"), Some(RELS));
        write_docx(&config.directory.join("a.docx"), Some(RELS));

        let mut processor =
            Processor::with_archiver(config, VanishingDirectory(vanishing)).unwrap();
        let aborted = processor.run().unwrap_err();

        assert_eq!(aborted.error.category(), ErrorCategory::TraversalFailed);
        assert_eq!(aborted.summary.stats.scanned, 1);
        assert_eq!(aborted.summary.stats.changed, 1);
        assert!(aborted.to_string().starts_with("Run aborted after 1 file(s)"));
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_subdirectory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;

        if crate::os::has_admin_privileges() {
            return;
        }

        let dir = tempdir().unwrap();
        let config = test_config(dir.path());
        write_docx(&config.directory.join("a.docx"), Some(RELS));
        let locked = config.directory.join("locked");
        fs::create_dir(&locked).unwrap();
        write_docx(&locked.join("b.docx"), Some(RELS));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let mut processor = Processor::new(config).unwrap();
        let result = processor.run();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let (summary, _) = result.unwrap();
        assert_eq!(summary.stats.scanned, 1);
        assert_eq!(summary.stats.errors, 0);
    }
}
