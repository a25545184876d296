mod formatters;
mod logger;
pub mod sinks;

use chrono::{DateTime, Utc};

use crate::{config::Config, error::SinkError, level::LogLevel};

pub use formatters::{colorize, TemplateFormatter};
pub use logger::{Builder, Logger};

/// What a record is for. Decides which sinks may see it and whether it skips the
/// minimum severity gate on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Standard,
    /// Shown on the console only. Never written to the file or the journal.
    Sensitive,
    /// Startup messages.
    Init,
    /// Audit trail of a runtime setting change.
    Config,
}

impl RecordKind {
    pub fn always_console(self) -> bool {
        !matches!(self, RecordKind::Standard)
    }

    pub fn reaches_file(self) -> bool {
        !matches!(self, RecordKind::Sensitive)
    }

    pub fn reaches_journal(self) -> bool {
        matches!(self, RecordKind::Standard)
    }
}

/// One log call. Lives for the duration of a dispatch only.
#[derive(Debug, Clone, Copy)]
pub struct Record<'a> {
    pub level: LogLevel,
    pub kind: RecordKind,
    /// Already sanitized message text.
    pub message: &'a str,
    pub timestamp: DateTime<Utc>,
    pub script: &'a str,
}

impl<'a> Record<'a> {
    pub fn label(&self) -> &'static str {
        match self.kind {
            RecordKind::Standard => self.level.name(),
            RecordKind::Sensitive => "SENSITIVE",
            RecordKind::Init => "INIT",
            RecordKind::Config => "CONFIG",
        }
    }

    pub fn with_message<'b>(&self, message: &'b str) -> Record<'b>
    where
        'a: 'b,
    {
        Record {
            level: self.level,
            kind: self.kind,
            message,
            timestamp: self.timestamp,
            script: self.script,
        }
    }
}

pub trait LogFormatter: Sync + Send {
    /// Renders `record` through the configured template, without colour.
    fn format(&self, record: &Record, config: &Config) -> String;
}

pub trait LogSink: Send {
    /// Routing policy of the sink for this record.
    fn accepts(&self, record: &Record, config: &Config) -> bool;

    /// Writes `record`. A sink returns an error at most once; after that it has
    /// degraded itself and further writes are no-ops.
    fn write_log(&mut self, record: &Record, config: &Config) -> Result<(), SinkError>;

    fn flush(&mut self);
}
