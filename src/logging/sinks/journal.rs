use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    process::{Command, Stdio},
};

use crate::{
    config::Config,
    error::SinkError,
    logging::{LogFormatter, LogSink, Record},
    sanitize,
};

/// Standard install locations of the `logger(1)` helper. `PATH` is never searched.
pub const HELPER_CANDIDATES: &[&str] = &[
    "/usr/bin/logger",
    "/bin/logger",
    "/usr/local/bin/logger",
    "/usr/sbin/logger",
];

/// Hands one rendered line to the system log.
pub trait JournalWriter: Send {
    fn submit(&mut self, tag: &str, priority: &str, line: &str) -> std::io::Result<()>;
}

/// Runs the system `logger` helper once per record.
#[derive(Debug, Clone)]
pub struct LoggerCommand {
    helper: PathBuf,
}

impl LoggerCommand {
    pub fn resolve() -> Option<Self> {
        Self::resolve_from(HELPER_CANDIDATES.iter().map(Path::new))
    }

    /// First candidate that is an executable regular file.
    pub fn resolve_from<'a>(candidates: impl IntoIterator<Item = &'a Path>) -> Option<Self> {
        let helper = candidates.into_iter().find(|path| {
            path.is_absolute()
                && std::fs::metadata(path)
                    .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        })?;

        tracing::debug!(target: "safelog", "journal helper resolved");
        Some(Self {
            helper: helper.to_path_buf(),
        })
    }
}

impl JournalWriter for LoggerCommand {
    fn submit(&mut self, tag: &str, priority: &str, line: &str) -> std::io::Result<()> {
        let status = Command::new(&self.helper)
            .arg("-t")
            .arg(tag)
            .arg("-p")
            .arg(format!("user.{}", priority))
            .arg("--")
            .arg(line)
            .env_clear()
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;

        if !status.success() {
            return Err(std::io::Error::other(format!(
                "helper exited with {}",
                status
            )));
        }

        Ok(())
    }
}

pub struct JournalSink {
    writer: Option<Box<dyn JournalWriter>>,
    formatter: Box<dyn LogFormatter>,
    failed: bool,
}

impl JournalSink {
    pub fn new(writer: Option<Box<dyn JournalWriter>>, formatter: Box<dyn LogFormatter>) -> Self {
        Self {
            writer,
            formatter,
            failed: false,
        }
    }

    pub fn is_available(&self) -> bool {
        self.writer.is_some() && !self.failed
    }
}

impl LogSink for JournalSink {
    fn accepts(&self, record: &Record, config: &Config) -> bool {
        config.journal_enabled
            && self.is_available()
            && record.kind.reaches_journal()
            && record.level.admitted_by(config.min_level)
    }

    fn write_log(&mut self, record: &Record, config: &Config) -> Result<(), SinkError> {
        if self.failed || !record.kind.reaches_journal() {
            return Ok(());
        }
        let Some(writer) = self.writer.as_mut() else {
            return Ok(());
        };

        let message = sanitize::truncate(record.message, config.max_journal_length);
        let line = self.formatter.format(&record.with_message(&message), config);
        let line = sanitize::strip_color(&line);

        let priority = record.level.syslog_priority();
        if let Err(err) = writer.submit(&config.journal_tag, priority, &line) {
            self.failed = true;
            self.writer = None;
            return Err(SinkError::Journal(err));
        }

        Ok(())
    }

    fn flush(&mut self) {}
}
