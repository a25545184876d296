use std::{io::Write, sync::Mutex};

use chrono::Utc;
use eyre::Context;
use log::Log;

use crate::{
    config::{self, ColorMode, Config},
    error::{ConfigError, InitError},
    level::LogLevel,
    sanitize, utils,
};

use super::{
    formatters::TemplateFormatter,
    sinks::{ConsoleSink, FileSink, JournalSink, JournalWriter, LoggerCommand},
    LogFormatter, LogSink, Record, RecordKind,
};

/// Entry point of every log call: sanitizes the message once and fans the record
/// out to the console, file and journal sinks. A failing sink is reported on
/// stderr and never keeps the other sinks from being tried.
pub struct Logger {
    config: Config,
    console: ConsoleSink,
    file: Option<FileSink>,
    journal: JournalSink,
    journal_warned: bool,
}

impl Logger {
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn log(&mut self, level: LogLevel, message: &str) {
        self.dispatch(level, RecordKind::Standard, message);
    }

    pub fn emergency(&mut self, message: &str) {
        self.log(LogLevel::Emergency, message);
    }

    pub fn fatal(&mut self, message: &str) {
        self.log(LogLevel::FATAL, message);
    }

    pub fn alert(&mut self, message: &str) {
        self.log(LogLevel::Alert, message);
    }

    pub fn critical(&mut self, message: &str) {
        self.log(LogLevel::Critical, message);
    }

    pub fn error(&mut self, message: &str) {
        self.log(LogLevel::Error, message);
    }

    pub fn warn(&mut self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    pub fn notice(&mut self, message: &str) {
        self.log(LogLevel::Notice, message);
    }

    pub fn info(&mut self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    pub fn debug(&mut self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    /// Console only, whatever the configuration says.
    pub fn sensitive(&mut self, message: &str) {
        self.dispatch(LogLevel::Info, RecordKind::Sensitive, message);
    }

    /// Always shown on the console, written to the file, kept out of the journal.
    pub fn init_message(&mut self, message: &str) {
        self.dispatch(LogLevel::Info, RecordKind::Init, message);
    }

    fn audit(&mut self, message: &str) {
        tracing::debug!(target: "safelog", "runtime setting changed");
        self.dispatch(LogLevel::Info, RecordKind::Config, message);
    }

    fn dispatch(&mut self, level: LogLevel, kind: RecordKind, message: &str) {
        if !level.admitted_by(self.config.min_level) && !kind.always_console() {
            return;
        }

        let message = sanitize::sanitize(
            message,
            self.config.unsafe_allow_newlines,
            self.config.unsafe_allow_ansi,
        );

        let config = &self.config;
        let record = Record {
            level,
            kind,
            message: &message,
            timestamp: Utc::now(),
            script: &config.script_name,
        };

        let mut sinks: Vec<&mut dyn LogSink> = Vec::with_capacity(3);
        sinks.push(&mut self.console);
        if let Some(file) = self.file.as_mut() {
            sinks.push(file);
        }
        sinks.push(&mut self.journal);

        for sink in sinks {
            if !sink.accepts(&record, config) {
                continue;
            }
            if let Err(err) = sink.write_log(&record, config) {
                utils::warn(err);
            }
        }
    }

    pub fn set_min_level(&mut self, level: LogLevel) {
        self.audit(&format!(
            "Log level changed from {} to {}",
            self.config.min_level, level
        ));
        self.config.min_level = level;
    }

    pub fn set_format(&mut self, template: &str) -> Result<(), ConfigError> {
        if template.is_empty() {
            return Err(ConfigError::EmptyTemplate);
        }
        if template.chars().any(char::is_control) {
            return Err(ConfigError::UnsafeTemplate);
        }

        self.audit(&format!(
            "Log format changed from '{}' to '{}'",
            self.config.format, template
        ));
        self.config.format = template.to_string();
        Ok(())
    }

    pub fn set_utc(&mut self, utc: bool) {
        self.audit(&format!(
            "Timestamp zone changed from {} to {}",
            utils::zone_label(self.config.utc),
            utils::zone_label(utc)
        ));
        self.config.utc = utc;
    }

    pub fn set_journal_logging(&mut self, enabled: bool) {
        self.audit(&format!(
            "Journal logging changed from {} to {}",
            on_off(self.config.journal_enabled),
            on_off(enabled)
        ));
        self.config.journal_enabled = enabled;

        if enabled {
            self.warn_if_journal_unavailable();
        }
    }

    pub fn set_journal_tag(&mut self, tag: &str) -> Result<(), ConfigError> {
        let tag = config::validate_tag(tag).ok_or(ConfigError::InvalidTag)?;

        self.audit(&format!(
            "Journal tag changed from '{}' to '{}'",
            self.config.journal_tag, tag
        ));
        self.config.journal_tag = tag;
        Ok(())
    }

    pub fn set_color_mode(&mut self, mode: ColorMode) {
        self.audit(&format!(
            "Color mode changed from {} to {}",
            self.config.color_mode, mode
        ));
        self.config.color_mode = mode;
    }

    pub fn set_unsafe_allow_newlines(&mut self, allow: bool) {
        self.audit(&format!(
            "Unsafe newline passthrough changed from {} to {}",
            on_off(self.config.unsafe_allow_newlines),
            on_off(allow)
        ));
        self.config.unsafe_allow_newlines = allow;
    }

    pub fn set_unsafe_allow_ansi(&mut self, allow: bool) {
        self.audit(&format!(
            "Unsafe ANSI passthrough changed from {} to {}",
            on_off(self.config.unsafe_allow_ansi),
            on_off(allow)
        ));
        self.config.unsafe_allow_ansi = allow;
    }

    pub fn flush(&mut self) {
        self.console.flush();
        if let Some(file) = self.file.as_mut() {
            file.flush();
        }
        self.journal.flush();
    }

    fn warn_if_journal_unavailable(&mut self) {
        if self.journal.is_available() || self.journal_warned {
            return;
        }

        self.journal_warned = true;
        utils::warn(
            "journal logging requested but no system logger helper is installed; \
             journal logging disabled",
        );
    }

    /// Installs the logger as the backend of the `log` facade.
    pub fn init(self) -> eyre::Result<()> {
        log::set_max_level(self.config.min_level.to_level_filter());
        log::set_boxed_logger(Box::new(LogBridge {
            logger: Mutex::new(self),
        }))
        .context("Failed registering boxed logger")?;

        Ok(())
    }
}

fn on_off(value: bool) -> &'static str {
    if value {
        "on"
    } else {
        "off"
    }
}

struct LogBridge {
    logger: Mutex<Logger>,
}

impl Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.logger
            .lock()
            .map(|logger| LogLevel::from(metadata.level()).admitted_by(logger.config.min_level))
            .unwrap_or(false)
    }

    fn log(&self, record: &log::Record) {
        if let Ok(mut logger) = self.logger.lock() {
            logger.log(LogLevel::from(record.level()), &record.args().to_string());
        }
    }

    fn flush(&self) {
        if let Ok(mut logger) = self.logger.lock() {
            logger.flush();
        }
    }
}

pub struct Builder {
    config: Config,
    formatter_builder: Box<dyn Fn() -> Box<dyn LogFormatter + 'static>>,
    console_writers: Option<(Box<dyn Write + Send>, Box<dyn Write + Send>)>,
    journal_writer: Option<Box<dyn JournalWriter>>,
}

impl Builder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            formatter_builder: Box::new(|| Box::new(TemplateFormatter::new())),
            console_writers: None,
            journal_writer: None,
        }
    }

    pub fn with_config(self, config: Config) -> Self {
        Self { config, ..self }
    }

    pub fn with_formatter<F>(self, formatter_builder: F) -> Self
    where
        F: Fn() -> Box<dyn LogFormatter + 'static> + 'static,
    {
        Self {
            formatter_builder: Box::new(formatter_builder),
            ..self
        }
    }

    /// Replaces stdout/stderr, mostly for capturing output.
    pub fn with_console_writers(
        self,
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
    ) -> Self {
        Self {
            console_writers: Some((stdout, stderr)),
            ..self
        }
    }

    /// Replaces the `logger` helper lookup with a given writer.
    pub fn with_journal_writer(self, writer: Box<dyn JournalWriter>) -> Self {
        Self {
            journal_writer: Some(writer),
            ..self
        }
    }

    pub fn build(self) -> Result<Logger, InitError> {
        let config = self.config.validated();

        let file = match &config.log_file {
            Some(path) => Some(FileSink::new(path.clone(), (self.formatter_builder)())?),
            None => None,
        };

        let console = match self.console_writers {
            Some((stdout, stderr)) => {
                ConsoleSink::with_writers(stdout, stderr, (self.formatter_builder)())
            }
            None => ConsoleSink::new((self.formatter_builder)()),
        };

        let writer = self.journal_writer.or_else(|| {
            LoggerCommand::resolve().map(|cmd| Box::new(cmd) as Box<dyn JournalWriter>)
        });
        let journal = JournalSink::new(writer, (self.formatter_builder)());

        let mut logger = Logger {
            config,
            console,
            file,
            journal,
            journal_warned: false,
        };

        if logger.config.journal_enabled {
            logger.warn_if_journal_unavailable();
        }

        Ok(logger)
    }
}

impl Default for Builder {
    fn default() -> Self {
        Self::new()
    }
}
