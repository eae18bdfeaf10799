//! Logger installation
//!
//! Components log through the `log` facade. `init` installs an `env_logger`
//! backend that sends records at `debug` and above to the configured output
//! file and records at `error` to stderr, each line formatted as
//! `<timestamp> - <target> - <level> - <message>`. `RUST_LOG` replaces both
//! default levels.

use std::fs::OpenOptions;
use std::io::Write;

use env_logger::{Builder, Logger, Target};
use log::{LevelFilter, Log, Metadata, Record};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

const FILE_LEVEL: LevelFilter = LevelFilter::Debug;
const CONSOLE_LEVEL: LevelFilter = LevelFilter::Error;
const FILTER_ENV: &str = "RUST_LOG";

/// Console logger plus an optional file logger with its own filter
pub struct SplitLogger {
    console: Logger,
    file: Option<Logger>,
}

impl SplitLogger {
    /// Most verbose level accepted by either destination
    pub fn max_level(&self) -> LevelFilter {
        let file = self
            .file
            .as_ref()
            .map(Logger::filter)
            .unwrap_or(LevelFilter::Off);
        self.console.filter().max(file)
    }

    pub fn has_file(&self) -> bool {
        self.file.is_some()
    }
}

impl Log for SplitLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        self.console.enabled(metadata)
            || self
                .file
                .as_ref()
                .is_some_and(|file| file.enabled(metadata))
    }

    fn log(&self, record: &Record<'_>) {
        self.console.log(record);
        if let Some(file) = &self.file {
            file.log(record);
        }
    }

    fn flush(&self) {
        self.console.flush();
        if let Some(file) = &self.file {
            file.flush();
        }
    }
}

/// Build the logger described by `config`.
///
/// `filters` uses `RUST_LOG` syntax and overrides the default levels of
/// both destinations.
pub fn build_logger(config: &LoggingConfig, filters: Option<&str>) -> Result<SplitLogger> {
    let console = builder(CONSOLE_LEVEL, filters)
        .target(Target::Stderr)
        .build();

    let file = match &config.output_file {
        Some(path) => {
            let output = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|e| Error::Logging {
                    message: format!("cannot open log file {}: {}", path.display(), e),
                })?;
            Some(
                builder(FILE_LEVEL, filters)
                    .target(Target::Pipe(Box::new(output)))
                    .build(),
            )
        }
        None => None,
    };

    Ok(SplitLogger { console, file })
}

/// Install the logger described by `config` as the global `log` backend.
///
/// Fails with `Error::Logging` if the log file cannot be opened or a logger
/// is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let filters = std::env::var(FILTER_ENV).ok();
    let logger = build_logger(config, filters.as_deref())?;
    let max_level = logger.max_level();

    log::set_boxed_logger(Box::new(logger)).map_err(|e| Error::Logging {
        message: e.to_string(),
    })?;
    log::set_max_level(max_level);
    Ok(())
}

fn builder(level: LevelFilter, filters: Option<&str>) -> Builder {
    let mut builder = Builder::new();
    builder.filter_level(level);
    if let Some(filters) = filters {
        builder.parse_filters(filters);
    }
    builder.format(|buf, record| {
        writeln!(
            buf,
            "{} - {} - {} - {}",
            buf.timestamp(),
            record.target(),
            record.level(),
            record.args()
        )
    });
    builder
}
