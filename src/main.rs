//! Word Template Corrector - re-point attached templates of Word documents
//!
//! Scans a directory for Word documents and replaces the old part of the
//! attached template path with a new one.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{Level, error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use wtc::{
    Cli, Config, EXIT_DIRECTORY_MISSING, EXIT_FAILURE, EXIT_SUCCESS, Error, Processor,
    ReportEntry, ReportFormatter, RunReport,
};

// CLI Output Module
mod cli_output {
    //! Shared colors and framing for console output

    use crossterm::{
        ExecutableCommand,
        style::{Color, Print, Stylize, style},
    };
    use std::io::{stderr, stdout};

    /// CLI theme colors
    pub struct CliTheme;

    impl CliTheme {
        pub const WARNING: Color = Color::Yellow;
        pub const ERROR: Color = Color::Red;
        pub const HINT: Color = Color::DarkGrey;
        pub const ACCENT: Color = Color::Cyan;
    }

    pub fn print_separator() {
        let _ = stdout().execute(Print(&format!("{}\n", "─".repeat(60))));
    }

    pub fn print_title(title: &str) {
        let _ = stdout().execute(Print(style(format!("{}\n", title)).with(CliTheme::ACCENT).bold()));
    }

    pub fn print_warning(msg: &str) {
        let _ = stdout().execute(Print(style("⚠ ").with(CliTheme::WARNING).bold()));
        let _ = stdout().execute(Print(format!("{}\n", msg)));
    }

    /// Errors go to stderr so they never mix into the report
    pub fn print_error(msg: &str) {
        let _ = stderr().execute(Print(style("✗ ").with(CliTheme::ERROR).bold()));
        let _ = stderr().execute(Print(format!("{}\n", msg)));
    }

    pub fn print_log_path(path: &str) {
        let _ = stdout().execute(Print(style("Log file: ").with(CliTheme::HINT)));
        let _ = stdout().execute(Print(format!("{}\n", path)));
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are reported as errors by clap but are not failures
            let code = if e.use_stderr() { EXIT_FAILURE } else { EXIT_SUCCESS };
            let _ = e.print();
            return ExitCode::from(code);
        }
    };

    if cli.generate_config {
        print!("{}", Config::sample_config());
        return ExitCode::from(EXIT_SUCCESS);
    }

    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            cli_output::print_error(&e.to_string());
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    let (_guard, log_path) = match setup_logging(&cli, config.verbose) {
        Ok(logging) => logging,
        Err(e) => {
            cli_output::print_error(&format!("Failed to set up logging: {:#}", e));
            return ExitCode::from(EXIT_FAILURE);
        }
    };

    match run(&cli, config, log_path.as_deref()) {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(e) => {
            error!(error = %format!("{:#}", e), "Run aborted");
            cli_output::print_error(&format!("{:#}", e));
            let code = match e.downcast_ref::<Error>() {
                Some(Error::WorkingDirectoryMissing(_)) => EXIT_DIRECTORY_MISSING,
                _ => EXIT_FAILURE,
            };
            ExitCode::from(code)
        }
    }
}

/// Run the batch and print the report
fn run(cli: &Cli, config: Config, log_path: Option<&Path>) -> Result<()> {
    use cli_output::*;

    info!(version = env!("CARGO_PKG_VERSION"), "Word Template Corrector starting");
    if config.verbose {
        info!(?config, "Configuration loaded");
    }

    let formatter = ReportFormatter::new(config.verbose, config.dry_run);
    let mut processor = Processor::new(config)?;

    print_title(&format!("Word Template Corrector {}", env!("CARGO_PKG_VERSION")));
    let (search, replace) = processor.search_and_replace();
    formatter.print_lines(&formatter.configuration_lines(processor.config(), search, replace));
    print_separator();

    let mut entries: Vec<ReportEntry> = Vec::new();
    let outcome = processor.run_with(|result| {
        formatter.print_file(&result);
        entries.push(ReportEntry::from_result(&result));
    });

    print_separator();
    let failed: Vec<ReportEntry> = entries.iter().filter(|e| e.is_failed()).cloned().collect();
    let summary = match outcome {
        Ok(summary) => summary,
        Err(aborted) => {
            // Files rewritten before the abort are still reported
            formatter.print_summary(&aborted.summary, &failed);
            return Err(aborted.into());
        }
    };
    formatter.print_summary(&summary, &failed);

    if summary.dry_run {
        print_separator();
        print_warning("Dry run: no document has been changed");
    }

    if let Some(ref report_path) = cli.report {
        RunReport::new(&summary, entries)
            .save(report_path)
            .with_context(|| format!("Failed to write report {}", report_path.display()))?;
        info!(report = %report_path.display(), "Report written");
    }

    if let Some(log_path) = log_path {
        print_log_path(&log_path.display().to_string());
    }

    Ok(())
}

/// Log file path inside `log_dir`, named after the config file when one is used
fn get_log_path(log_dir: &Path, cli: &Cli) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let prefix = cli.config_name().unwrap_or_else(|| "wtc".to_string());
    log_dir.join(format!("{}_{}.log", prefix, timestamp))
}

/// Setup logging (console, plus a file when a log directory is given)
fn setup_logging(cli: &Cli, verbose: bool) -> Result<(Option<WorkerGuard>, Option<PathBuf>)> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::registry().with(env_filter);

    let Some(ref log_dir) = cli.log_dir else {
        subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
        return Ok((None, None));
    };

    let log_path = get_log_path(log_dir, cli);
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    if cli.json_log {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_ansi(false)
                    .with_writer(non_blocking),
            )
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    } else {
        subscriber
            .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    Ok((Some(guard), Some(log_path)))
}
