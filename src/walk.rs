//! Candidate document discovery
//!
//! Directories the process may not read are left out of the listing instead of
//! ending the walk; any other traversal error is handed to the caller.

use crate::config::Config;
use crate::error::{Error, Result};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// Lists the documents below a working directory
#[derive(Debug, Clone)]
pub struct DocumentWalker {
    root: PathBuf,
    recursive: bool,
}

impl DocumentWalker {
    pub fn new(root: &Path, recursive: bool) -> Self {
        let root = std::path::absolute(root).unwrap_or_else(|_| root.to_path_buf());
        Self { root, recursive }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Start a fresh, lazy walk over the candidate documents
    pub fn candidates(&self) -> impl Iterator<Item = Result<PathBuf>> + use<> {
        let max_depth = if self.recursive { usize::MAX } else { 1 };

        // Sorting makes walkdir read each directory completely before yielding
        // from it, so a document rewritten in place is never listed twice.
        WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => {
                    if entry.path().is_file() && Config::is_document(entry.path()) {
                        Some(Ok(entry.into_path()))
                    } else {
                        None
                    }
                }
                Err(err) if is_access_denied(&err) => {
                    debug!(
                        path = ?err.path(),
                        "Skipping directory without read access"
                    );
                    None
                }
                Err(err) => Some(Err(Error::from(err))),
            })
    }
}

fn is_access_denied(err: &walkdir::Error) -> bool {
    is_skippable(err.io_error())
}

/// Only a refused directory read is skipped; loops and other I/O errors are fatal
fn is_skippable(err: Option<&io::Error>) -> bool {
    err.is_some_and(|e| e.kind() == io::ErrorKind::PermissionDenied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn collect(walker: &DocumentWalker) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = walker.candidates().map(|r| r.unwrap()).collect();
        files.sort();
        files
    }

    #[test]
    fn test_filters_extensions() {
        let dir = tempdir().unwrap();
        for name in ["a.docx", "b.DOCM", "c.dotm", "d.doc", "e.docx.bak", "f.txt"] {
            fs::write(dir.path().join(name), b"x").unwrap();
        }
        fs::create_dir(dir.path().join("folder.docx")).unwrap();

        let files = collect(&DocumentWalker::new(dir.path(), false));
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.docx", "b.DOCM", "c.dotm"]);
    }

    #[test]
    fn test_recursive_flag() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("top.docx"), b"x").unwrap();
        fs::create_dir_all(dir.path().join("sub/deeper")).unwrap();
        fs::write(dir.path().join("sub/mid.docx"), b"x").unwrap();
        fs::write(dir.path().join("sub/deeper/low.dotm"), b"x").unwrap();

        assert_eq!(collect(&DocumentWalker::new(dir.path(), false)).len(), 1);
        assert_eq!(collect(&DocumentWalker::new(dir.path(), true)).len(), 3);
    }

    #[test]
    fn test_candidates_restart_and_are_absolute() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.docx"), b"x").unwrap();

        let walker = DocumentWalker::new(dir.path(), true);
        let first = collect(&walker);
        let second = collect(&walker);
        assert_eq!(first, second);
        assert!(first.iter().all(|p| p.is_absolute()));
    }

    #[test]
    fn test_empty_directory() {
        let dir = tempdir().unwrap();
        assert!(collect(&DocumentWalker::new(dir.path(), true)).is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempdir().unwrap();
        let walker = DocumentWalker::new(&dir.path().join("missing"), true);
        let results: Vec<_> = walker.candidates().collect();
        assert_eq!(results.len(), 1);
        assert!(matches!(results[0], Err(Error::WalkDir(_))));
    }

    #[test]
    fn test_only_permission_denied_is_skipped() {
        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        let missing = io::Error::from(io::ErrorKind::NotFound);
        let other = io::Error::other("device error");

        assert!(is_skippable(Some(&denied)));
        assert!(!is_skippable(Some(&missing)));
        assert!(!is_skippable(Some(&other)));
        // Symlink loops carry no io::Error
        assert!(!is_skippable(None));
    }

    #[cfg(unix)]
    #[test]
    fn test_skips_unreadable_directory() {
        use std::os::unix::fs::PermissionsExt;

        if crate::os::has_admin_privileges() {
            // Permission bits are not enforced for root
            return;
        }

        let dir = tempdir().unwrap();
        fs::write(dir.path().join("visible.docx"), b"x").unwrap();
        let locked = dir.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::write(locked.join("hidden.docx"), b"x").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let files = collect(&DocumentWalker::new(dir.path(), true));

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("visible.docx"));
    }
}
