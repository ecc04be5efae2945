//! Logger setup.
//!
//! The TUI owns the terminal, so in that mode logs only go to a file. Headless
//! modes may additionally mirror them to stderr, keeping stdout clean for output.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use log::LevelFilter;
use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, SharedLogger, TermLogger, TerminalMode,
    WriteLogger,
};

pub enum LogDestination {
    /// Append to the given file.
    File(PathBuf),
    /// Append to the file and mirror to stderr.
    FileAndStderr(PathBuf),
}

/// `<data dir>/autoapply-dashboard/dashboard.log`, or `./dashboard.log` without a data dir.
pub fn default_log_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("autoapply-dashboard"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dashboard.log")
}

/// Install the global logger. Failing to open the log file only costs the file output.
pub fn initialize(destination: LogDestination, verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let config = build_config();

    let mut loggers: Vec<Box<dyn SharedLogger>> = Vec::new();
    let path = match destination {
        LogDestination::File(path) => path,
        LogDestination::FileAndStderr(path) => {
            loggers.push(TermLogger::new(
                level,
                config.clone(),
                TerminalMode::Stderr,
                ColorChoice::Auto,
            ));
            path
        }
    };
    if let Some(file_logger) = create_file_logger(&path, level, config) {
        loggers.push(file_logger);
    }
    if loggers.is_empty() {
        return;
    }
    let _ = CombinedLogger::init(loggers);
}

fn build_config() -> Config {
    ConfigBuilder::new()
        .set_time_format_rfc3339()
        .set_target_level(LevelFilter::Error)
        .add_filter_allow_str("autoapply_dashboard")
        .build()
}

fn create_file_logger(path: &Path, level: LevelFilter, config: Config) -> Option<Box<WriteLogger<File>>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Err(err) = std::fs::create_dir_all(parent) {
            eprintln!("Warning: could not create log directory {}: {err}", parent.display());
            return None;
        }
    }
    match OpenOptions::new().create(true).append(true).open(path) {
        Ok(file) => Some(WriteLogger::new(level, config, file)),
        Err(err) => {
            eprintln!("Warning: could not open log file {}: {err}", path.display());
            None
        }
    }
}

/// Stderr logger for tests. No-ops if a logger is already installed.
pub fn initialize_for_tests() {
    let _ = CombinedLogger::init(vec![TermLogger::new(
        LevelFilter::Debug,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Never,
    )]);
}
