//! Logging for the program.
//!
//! Messages are written to the console (coloured, with errors and warnings on stderr) and, when an
//! output directory is given, to a log file within it. The log level is taken from the program
//! settings but can be overridden with the `HEATCOMMIT_LOG_LEVEL` environment variable.
use anyhow::{Context, Result};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::Arguments;
use std::fs::OpenOptions;
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// The default log level for the program
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which overrides the configured log level
const LOG_LEVEL_ENV_VAR: &str = "HEATCOMMIT_LOG_LEVEL";

/// The name of the log file written to the output directory
const LOG_FILE_NAME: &str = "heatcommit.log";

/// Set once the logger has been initialised
static LOGGER_INITIALISED: OnceLock<()> = OnceLock::new();

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INITIALISED.get().is_some()
}

/// Parse a log level name (e.g. "info", "debug" or "off")
fn parse_log_level(level: &str) -> Result<LevelFilter> {
    level
        .parse()
        .with_context(|| format!("Unknown log level: {level}"))
}

/// Initialise the program logger.
///
/// # Arguments
///
/// * `log_level_from_settings` - The log level given in the settings file
/// * `log_file_dir` - The directory in which to write the log file, if any
pub fn init(log_level_from_settings: &str, log_file_dir: Option<&Path>) -> Result<()> {
    let log_level = env::var(LOG_LEVEL_ENV_VAR).unwrap_or_else(|_| log_level_from_settings.into());
    let level = parse_log_level(&log_level)?;

    let use_colour = std::io::stderr().is_terminal();
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);

    let console = Dispatch::new()
        .format(move |out, message, record| {
            if use_colour {
                out.finish(format_args!(
                    "[{} {}] {}",
                    timestamp(),
                    colours.color(record.level()),
                    message
                ));
            } else {
                write_plain(out, message, record);
            }
        })
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > log::Level::Warn)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() <= log::Level::Warn)
                .chain(std::io::stderr()),
        );

    let mut dispatch = Dispatch::new().level(level).chain(console);
    if let Some(log_file_dir) = log_file_dir {
        let log_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(log_file_dir.join(LOG_FILE_NAME))?;
        dispatch = dispatch.chain(Dispatch::new().format(write_plain).chain(log_file));
    }

    dispatch.apply()?;
    LOGGER_INITIALISED.get_or_init(|| ());

    Ok(())
}

fn timestamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn write_plain(out: FormatCallback, message: &Arguments, record: &Record) {
    out.finish(format_args!(
        "[{} {}] {}",
        timestamp(),
        record.level(),
        message
    ));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("off", LevelFilter::Off)]
    #[case("warn", LevelFilter::Warn)]
    #[case("INFO", LevelFilter::Info)]
    #[case("debug", LevelFilter::Debug)]
    fn parse_log_level_valid(#[case] level: &str, #[case] expected: LevelFilter) {
        assert_eq!(parse_log_level(level).unwrap(), expected);
    }

    #[test]
    fn parse_log_level_invalid() {
        assert_eq!(
            parse_log_level("loud").unwrap_err().to_string(),
            "Unknown log level: loud"
        );
    }
}
