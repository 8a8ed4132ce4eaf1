//! Configuration types for the template corrector

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Document extensions that can carry an attached template (compared case-insensitively)
pub const DOCUMENT_EXTENSIONS: [&str; 3] = ["docx", "docm", "dotm"];

/// Run configuration, immutable once the processor owns it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Working directory to scan for documents
    pub directory: PathBuf,

    /// The old part of the template path to be replaced
    pub old: String,

    /// The new (replacement) part of the template path
    pub new: String,

    /// Recurse through subdirectories
    pub recursive: bool,

    /// Delete the `.bak` copy of each changed document after a successful rewrite
    pub no_backup: bool,

    /// Report affected documents without changing them
    pub dry_run: bool,

    /// Show template targets and the underlying cause of errors
    pub verbose: bool,

    /// Restore timestamps, attributes and ownership after rewriting
    pub preserve: bool,

    /// Match the old path case-sensitively
    pub case_sensitive: bool,

    /// Parent directory for scratch extraction directories (platform temp dir when unset)
    pub scratch_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directory: PathBuf::new(),
            old: String::new(),
            new: String::new(),
            recursive: false,
            no_backup: false,
            dry_run: false,
            verbose: false,
            preserve: false,
            case_sensitive: false,
            scratch_dir: None,
        }
    }
}

impl Config {
    /// Check if a path has one of the supported document extensions
    pub fn is_document(path: &Path) -> bool {
        path.extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                DOCUMENT_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Scratch parent directory, defaulting to the platform temp directory
    pub fn scratch_root(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    /// Check the settings that cannot be expressed by types alone
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.directory.as_os_str().is_empty() {
            return Err(ConfigError::Missing("directory"));
        }
        if self.old.is_empty() {
            return Err(ConfigError::Missing("old"));
        }
        Ok(())
    }

    /// Load configuration from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(config)
    }

    /// Generate a sample configuration file content
    pub fn sample_config() -> String {
        r#"# Word Template Corrector configuration file
# Every key is optional; command line arguments override these values.

# Working directory containing the documents
directory = '\\server\share\documents'

# Old part of the template path (backslashes are kept as-is, spaces become %20)
old = '\\oldserver\share\templates\'

# Replacement for the old part
new = '\\server\share\templates\'

# Recurse through subdirectories
recursive = true

# Delete the .bak copy of each changed document
no_backup = false

# Only report affected documents
dry_run = false

# Show template targets and root causes of errors
verbose = false

# Restore timestamps, attributes and ownership after rewriting
preserve = false

# Match the old path case-sensitively
case_sensitive = false

# Where scratch extraction directories are created (defaults to the temp dir)
# scratch_dir = 'D:\Temp'
"#
        .to_string()
    }
}

/// Errors that can occur when loading or checking configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read configuration file
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse configuration file
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A required setting is missing or empty
    Missing(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError { path, source } => {
                write!(f, "Failed to read config file '{}': {}", path.display(), source)
            }
            ConfigError::ParseError { path, source } => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), source)
            }
            ConfigError::Missing(key) => {
                write!(f, "Missing required setting '{}'", key)
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::ReadError { source, .. } => Some(source),
            ConfigError::ParseError { source, .. } => Some(source),
            ConfigError::Missing(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_is_document() {
        assert!(Config::is_document(Path::new("/a/report.docx")));
        assert!(Config::is_document(Path::new("/a/REPORT.DOCM")));
        assert!(Config::is_document(Path::new("template.DotM")));
        assert!(!Config::is_document(Path::new("/a/report.doc")));
        assert!(!Config::is_document(Path::new("/a/report.docx.bak")));
        assert!(!Config::is_document(Path::new("/a/docx")));
    }

    #[test]
    fn test_validate() {
        let mut config = Config::default();
        assert!(matches!(config.validate(), Err(ConfigError::Missing("directory"))));

        config.directory = PathBuf::from("/docs");
        assert!(matches!(config.validate(), Err(ConfigError::Missing("old"))));

        config.old = "x".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sample_config_parses() {
        let config: Config = toml::from_str(&Config::sample_config()).unwrap();
        assert_eq!(config.old, r"\\oldserver\share\templates\");
        assert!(config.recursive);
        assert!(config.scratch_dir.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("wtc.toml");
        fs::write(&path, "old = 'a'\nnew = 'b'\ndry_run = true\n").unwrap();

        let config = Config::load_from_file(&path).unwrap();
        assert_eq!(config.old, "a");
        assert_eq!(config.new, "b");
        assert!(config.dry_run);
        assert!(!config.recursive);

        let missing = Config::load_from_file(dir.path().join("missing.toml"));
        assert!(matches!(missing, Err(ConfigError::ReadError { .. })));
    }
}
