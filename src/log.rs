//! Initialisation and configuration of the program's logging.
//!
//! All console output from the logger goes to stderr so that reports written to stdout can be
//! piped elsewhere. Messages can optionally also be written to log files.
use anyhow::{Result, bail};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// A flag indicating whether the logger has been initialised
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The environment variable used to override the log level
pub const LOG_LEVEL_ENV_VAR: &str = "BESS_APPRAISE_LOG_LEVEL";

/// The default log level for the program.
///
/// Used if the user hasn't specified something else with the environment variable or the
/// settings file.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Log file for ordinary progress messages
const LOG_INFO_FILE_NAME: &str = "bess_appraise_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "bess_appraise_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Parse a log level name (case insensitive)
pub fn parse_log_level(level: &str) -> Result<LevelFilter> {
    let level = match level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Initialise the program logger.
///
/// The log level is taken from the `BESS_APPRAISE_LOG_LEVEL` environment variable if set, then
/// from the settings file, falling back to `info`.
///
/// Calling this more than once is harmless: later calls do nothing.
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_dir`: Where to save log files (if `None`, no log files are written)
pub fn init(log_level_from_settings: Option<&str>, log_dir: Option<&Path>) -> Result<()> {
    if is_logger_initialised() {
        return Ok(());
    }

    let log_level = env::var(LOG_LEVEL_ENV_VAR).unwrap_or_else(|_| {
        log_level_from_settings
            .unwrap_or(DEFAULT_LOG_LEVEL)
            .to_string()
    });
    let log_level = parse_log_level(&log_level)?;

    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let use_colour = std::io::stderr().is_terminal();

    let mut dispatch = Dispatch::new().chain(
        Dispatch::new()
            .format(move |out, message, record| {
                write_log_colour(out, message, record, use_colour, &colours);
            })
            .level(log_level)
            .chain(std::io::stderr()),
    );

    if let Some(log_dir) = log_dir {
        let new_log_file = |file_name| {
            OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(log_dir.join(file_name))
        };

        dispatch = dispatch
            .chain(
                // Non-error messages
                Dispatch::new()
                    .filter(|metadata| metadata.level() > LevelFilter::Warn)
                    .format(write_log_plain)
                    .level(log_level.max(LevelFilter::Info))
                    .chain(new_log_file(LOG_INFO_FILE_NAME)?),
            )
            .chain(
                Dispatch::new()
                    .format(write_log_plain)
                    .level(LevelFilter::Warn)
                    .chain(new_log_file(LOG_ERROR_FILE_NAME)?),
            );
    }

    // Another logger may have been installed, e.g. by a test harness
    if dispatch.apply().is_ok() {
        let _ = LOGGER_INIT.set(());
    }

    Ok(())
}

fn write_log<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");

    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}

/// Write to the log with no colours
fn write_log_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    write_log(out, record.level(), record.target(), message);
}

/// Write to the log with optional colours
fn write_log_colour(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    use_colour: bool,
    colours: &ColoredLevelConfig,
) {
    if use_colour {
        write_log(out, colours.color(record.level()), record.target(), message);
    } else {
        write_log_plain(out, message, record);
    }
}
