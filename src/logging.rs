use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use indicatif::{ProgressBar, ProgressStyle};
use simplelog::{
    ColorChoice, CombinedLogger, ConfigBuilder, LevelFilter, TermLogger, TerminalMode, WriteLogger,
};
use time::macros::format_description;

use crate::error::{Error, Result};

pub const BAR_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})";

/// Log warnings (or everything from info up, when verbose) to stderr and
/// everything to `<log_dir>/<stem>_<timestamp>.log`. Returns the log file path.
pub fn init_logging(log_dir: &Path, stem: &str, verbose: bool) -> Result<PathBuf> {
    fs::create_dir_all(log_dir).map_err(|e| Error::io(log_dir, e))?;

    let timestamp = Local::now().format("%Y-%m-%d_%H-%M-%S").to_string();
    let log_path = log_dir.join(format!("{stem}_{timestamp}.log"));
    let log_file = fs::File::create(&log_path).map_err(|e| Error::io(&log_path, e))?;

    let config = ConfigBuilder::new()
        .set_time_format_custom(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))
        .build();
    let term_level = if verbose {
        LevelFilter::Info
    } else {
        LevelFilter::Warn
    };

    CombinedLogger::init(vec![
        TermLogger::new(term_level, config.clone(), TerminalMode::Stderr, ColorChoice::Auto),
        WriteLogger::new(LevelFilter::Debug, config, log_file),
    ])
    .map_err(|e| Error::Config(format!("failed to initialise logger: {e}")))?;

    log::info!("Program started, logging to {}", log_path.display());
    Ok(log_path)
}

/// Log file stem for a run: the output file's stem, or `fallback` when writing to stdout.
pub fn log_stem(output: Option<&Path>, fallback: &str) -> String {
    output
        .and_then(Path::file_stem)
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| fallback.to_owned())
}

pub fn progress_bar(len: u64) -> ProgressBar {
    let bar = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::with_template(BAR_TEMPLATE) {
        bar.set_style(style.progress_chars("=>-"));
    }
    bar
}
