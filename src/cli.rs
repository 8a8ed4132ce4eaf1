//! CLI argument parsing with clap

use crate::config::{Config, ConfigError};
use clap::Parser;
use std::path::PathBuf;

/// Word Template Corrector - re-point attached templates of Word documents
///
/// Scans a directory for .docx, .docm and .dotm files and replaces the old
/// part of the attached template path with a new one, keeping a .bak copy
/// of every rewritten document unless told otherwise.
#[derive(Parser, Debug)]
#[command(name = "wtc")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (TOML format)
    ///
    /// Settings from the file are used as defaults; command line
    /// arguments override them.
    #[arg(short = 'C', long)]
    pub config: Option<PathBuf>,

    /// Working directory containing the documents
    #[arg(short, long)]
    pub directory: Option<PathBuf>,

    /// Old part of the template path
    #[arg(short, long, allow_hyphen_values = true)]
    pub old: Option<String>,

    /// New part of the template path
    #[arg(short, long, allow_hyphen_values = true)]
    pub new: Option<String>,

    /// Recurse through subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Do not keep the .bak copy of changed documents
    #[arg(short = 'b', long = "nobackup")]
    pub no_backup: bool,

    /// Only report affected documents, change nothing
    #[arg(short = 't', long)]
    pub dry_run: bool,

    /// Show template targets and root causes of errors
    #[arg(short, long)]
    pub verbose: bool,

    /// Preserve timestamps, attributes and ownership of rewritten documents
    #[arg(short, long)]
    pub preserve: bool,

    /// Match the old path case-sensitively
    #[arg(short = 'c', long = "casesensitive")]
    pub case_sensitive: bool,

    /// Write a log file into this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Output the log file as JSON
    #[arg(long)]
    pub json_log: bool,

    /// Write a JSON report of every document to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Parent directory for temporary extraction directories
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Print a commented sample configuration file and exit
    #[arg(long)]
    pub generate_config: bool,
}

impl Cli {
    /// Get config file name (without extension) for log naming
    pub fn config_name(&self) -> Option<String> {
        self.config.as_ref().and_then(|p| {
            p.file_stem()
                .and_then(|s| s.to_str())
                .map(|s| s.to_string())
        })
    }

    /// Merge CLI arguments with config from file
    /// CLI arguments take precedence over config file settings
    pub fn merge_with_config(&self, mut config: Config) -> Config {
        if let Some(ref directory) = self.directory {
            config.directory = directory.clone();
        }
        if let Some(ref old) = self.old {
            config.old = old.clone();
        }
        if let Some(ref new) = self.new {
            config.new = new.clone();
        }
        if let Some(ref scratch_dir) = self.scratch_dir {
            config.scratch_dir = Some(scratch_dir.clone());
        }
        if self.recursive {
            config.recursive = true;
        }
        if self.no_backup {
            config.no_backup = true;
        }
        if self.dry_run {
            config.dry_run = true;
        }
        if self.verbose {
            config.verbose = true;
        }
        if self.preserve {
            config.preserve = true;
        }
        if self.case_sensitive {
            config.case_sensitive = true;
        }

        config
    }

    /// Convert CLI arguments to Config (when no config file is used)
    pub fn to_config(&self) -> Config {
        self.merge_with_config(Config::default())
    }

    /// Build the run configuration from the optional file and the arguments.
    ///
    /// `new` counts as given when passed on the command line, even empty, or
    /// set to a non-empty value in the file.
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let config = match self.config {
            Some(ref path) => self.merge_with_config(Config::load_from_file(path)?),
            None => self.to_config(),
        };

        config.validate()?;
        if self.new.is_none() && config.new.is_empty() {
            return Err(ConfigError::Missing("new"));
        }

        Ok(config)
    }
}
