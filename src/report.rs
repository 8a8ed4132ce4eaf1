//! Console and JSON reporting of per-file outcomes and the run summary

use crate::config::Config;
use crate::error::{Error, ErrorCategory};
use crate::process::{FileResult, ProcessingStatus, RunSummary};
use crossterm::{
    ExecutableCommand,
    style::{Color, Print, Stylize, style},
};
use serde::Serialize;
use std::fs;
use std::io::{self, stdout};
use std::path::Path;
use std::time::Duration;

/// Width of the status column in front of each path
const STATUS_WIDTH: usize = 9;

const CASE_NOTE: &str = "Content has not been replaced; the old path may differ only in letter case \
while case-sensitive search is enabled";

/// Report colors
pub struct ReportTheme;

impl ReportTheme {
    pub const CHANGED: Color = Color::Green;
    pub const AFFECTED: Color = Color::Yellow;
    pub const FAILED: Color = Color::Red;
    pub const TARGET: Color = Color::DarkCyan;
    pub const NOTE: Color = Color::DarkYellow;
}

/// Format elapsed time as `HH:MM:SS.CC` (centiseconds)
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!(
        "{:02}:{:02}:{:02}.{:02}",
        total_secs / 3600,
        (total_secs / 60) % 60,
        total_secs % 60,
        elapsed.subsec_millis() / 10
    )
}

/// Renders per-file status lines and the final summary
#[derive(Debug, Clone, Copy)]
pub struct ReportFormatter {
    verbose: bool,
    dry_run: bool,
}

impl ReportFormatter {
    pub fn new(verbose: bool, dry_run: bool) -> Self {
        Self { verbose, dry_run }
    }

    /// Status token and its color; unchanged files get none
    pub fn status_token(&self, status: ProcessingStatus) -> Option<(&'static str, Color)> {
        match status {
            ProcessingStatus::Failed => Some(("FAILED", ReportTheme::FAILED)),
            ProcessingStatus::Changed if self.dry_run => Some(("AFFECTED", ReportTheme::AFFECTED)),
            ProcessingStatus::Changed => Some(("CHANGED", ReportTheme::CHANGED)),
            ProcessingStatus::Affected => Some(("AFFECTED", ReportTheme::AFFECTED)),
            ProcessingStatus::Unchanged => None,
        }
    }

    /// Error text shown after a failed path
    pub fn error_text(&self, error: &Error) -> String {
        let mut text = format!("error: {} [{}]", error, error.category());
        if self.verbose {
            let causes = error.causes();
            if !causes.is_empty() {
                text.push_str(&format!(" ({})", causes.join(": ")));
            }
        }
        text
    }

    /// Status column padded to a fixed width, with the color of its token
    fn status_column(&self, status: ProcessingStatus) -> (String, Option<Color>) {
        match self.status_token(status) {
            Some((token, color)) => (format!("{:<width$}", token, width = STATUS_WIDTH), Some(color)),
            None => (" ".repeat(STATUS_WIDTH), None),
        }
    }

    /// Path of a file, followed by the error if it failed
    fn file_text(&self, result: &FileResult) -> String {
        let mut text = result.path.display().to_string();
        if let Some(error) = result.error() {
            text.push_str(" - ");
            text.push_str(&self.error_text(error));
        }
        text
    }

    /// One line per file: status column, path, and the error if it failed
    pub fn file_line(&self, result: &FileResult) -> String {
        let (column, _) = self.status_column(result.status());
        column + &self.file_text(result)
    }

    /// Extra lines below a file: template target and case note (verbose), warnings (always)
    pub fn detail_lines(&self, result: &FileResult) -> Vec<(String, Color)> {
        let mut lines = Vec::new();
        let indent = " ".repeat(STATUS_WIDTH);

        if self.verbose
            && let Some(target) = &result.target
        {
            lines.push((format!("{} - Target: {}", indent, target), ReportTheme::TARGET));
            if result.status() == ProcessingStatus::Unchanged {
                lines.push((format!("{} - {}", indent, CASE_NOTE), ReportTheme::NOTE));
            }
        }

        for warning in &result.warnings {
            lines.push((
                format!("{} - warning: {} [{}]", indent, warning, warning.category()),
                ReportTheme::NOTE,
            ));
        }

        lines
    }

    /// Final counters and runtime
    pub fn summary_lines(&self, summary: &RunSummary) -> Vec<String> {
        let stats = &summary.stats;
        let changed_wording = if self.dry_run || summary.dry_run {
            "affected and need correction"
        } else {
            "corrected"
        };

        let mut lines = vec![
            format!("{} file(s) scanned", stats.scanned),
            format!("{} file(s) {}", stats.changed, changed_wording),
            format!("{} error(s) occurred", stats.errors),
        ];
        if stats.warnings > 0 {
            lines.push(format!("{} warning(s)", stats.warnings));
        }
        lines.push(format!("Runtime {}", format_elapsed(summary.elapsed)));
        lines
    }

    /// Echo of the effective configuration printed before the run
    pub fn configuration_lines(&self, config: &Config, search: &str, replace: &str) -> Vec<String> {
        vec![
            format!("Directory   : {}", config.directory.display()),
            format!("Search for  : {}", search),
            format!("Replace with: {}", replace),
            format!("no Backups  : {}", config.no_backup),
            format!("Recursive   : {}", config.recursive),
            format!("Preserve    : {}", config.preserve),
            format!("Dry run     : {}", config.dry_run),
            format!("Case        : {}", if config.case_sensitive { "sensitive" } else { "insensitive" }),
        ]
    }

    /// Print a file line with a colored status column
    pub fn print_file(&self, result: &FileResult) {
        let _ = self.write_file(&mut stdout(), result);
    }

    /// Write a file line and its detail lines; only the status token is colored
    pub fn write_file<W: io::Write>(&self, out: &mut W, result: &FileResult) -> io::Result<()> {
        let (column, color) = self.status_column(result.status());
        match color {
            Some(color) => out.execute(Print(style(column).with(color).bold()))?,
            None => out.execute(Print(column))?,
        };
        out.execute(Print(format!("{}\n", self.file_text(result))))?;

        for (line, color) in self.detail_lines(result) {
            out.execute(Print(style(format!("{}\n", line)).with(color)))?;
        }
        Ok(())
    }

    pub fn print_lines(&self, lines: &[String]) {
        let mut out = stdout();
        for line in lines {
            let _ = out.execute(Print(format!("{}\n", line)));
        }
    }

    /// Print the summary, followed by a recap of failed files
    pub fn print_summary(&self, summary: &RunSummary, failed: &[ReportEntry]) {
        self.print_lines(&self.summary_lines(summary));

        if !failed.is_empty() {
            let mut out = stdout();
            let _ = out.execute(Print(style(format!("\nFailed files ({}):\n", failed.len())).with(ReportTheme::FAILED).bold()));
            for entry in failed {
                let _ = out.execute(Print(format!(
                    "  {}: {}\n",
                    entry.path,
                    entry.message.as_deref().unwrap_or_default()
                )));
            }
        }
    }
}

/// Non-fatal problem of a file in the JSON report
#[derive(Debug, Clone, Serialize)]
pub struct ReportWarning {
    pub category: ErrorCategory,
    pub message: String,
}

/// One file in the JSON report
#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub path: String,
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<ErrorCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ReportWarning>,
}

impl ReportEntry {
    pub fn from_result(result: &FileResult) -> Self {
        let status = match result.status() {
            ProcessingStatus::Unchanged => "unchanged",
            ProcessingStatus::Changed => "changed",
            ProcessingStatus::Affected => "affected",
            ProcessingStatus::Failed => "failed",
        };
        let error = result.error();

        Self {
            path: result.path.display().to_string(),
            status,
            category: error.map(Error::category),
            message: error.map(Error::to_string),
            causes: error.map(Error::causes).unwrap_or_default(),
            target: result.target.clone(),
            warnings: result
                .warnings
                .iter()
                .map(|w| ReportWarning {
                    category: w.category(),
                    message: w.to_string(),
                })
                .collect(),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.category.is_some()
    }
}

/// Whole-run JSON report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub scanned: usize,
    pub changed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub dry_run: bool,
    pub elapsed: String,
    pub files: Vec<ReportEntry>,
}

impl RunReport {
    pub fn new(summary: &RunSummary, files: Vec<ReportEntry>) -> Self {
        Self {
            scanned: summary.stats.scanned,
            changed: summary.stats.changed,
            errors: summary.stats.errors,
            warnings: summary.stats.warnings,
            dry_run: summary.dry_run,
            elapsed: format_elapsed(summary.elapsed),
            files,
        }
    }

    pub fn save(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
    }
}
