use std::{fmt::Display, str::FromStr};

use crate::utils;

/// Severity of a record. Lower severity numbers are more severe, so the derived
/// ordering puts `Emergency` first and `Debug` last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum LogLevel {
    Emergency = 0,
    Alert = 1,
    Critical = 2,
    Error = 3,
    Warn = 4,
    Notice = 5,
    Info = 6,
    Debug = 7,
}

impl LogLevel {
    pub const ALL: [LogLevel; 8] = [
        LogLevel::Emergency,
        LogLevel::Alert,
        LogLevel::Critical,
        LogLevel::Error,
        LogLevel::Warn,
        LogLevel::Notice,
        LogLevel::Info,
        LogLevel::Debug,
    ];

    /// `FATAL` is accepted as a name but always maps here.
    pub const FATAL: LogLevel = LogLevel::Emergency;

    pub fn severity(self) -> u8 {
        self as u8
    }

    pub fn from_severity(severity: u8) -> Option<Self> {
        Self::ALL.get(usize::from(severity)).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            LogLevel::Emergency => "EMERGENCY",
            LogLevel::Alert => "ALERT",
            LogLevel::Critical => "CRITICAL",
            LogLevel::Error => "ERROR",
            LogLevel::Warn => "WARN",
            LogLevel::Notice => "NOTICE",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
        }
    }

    /// Priority keyword understood by syslog style helpers.
    pub fn syslog_priority(self) -> &'static str {
        match self {
            LogLevel::Emergency => "emerg",
            LogLevel::Alert => "alert",
            LogLevel::Critical => "crit",
            LogLevel::Error => "err",
            LogLevel::Warn => "warning",
            LogLevel::Notice => "notice",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
        }
    }

    pub fn color_code(self) -> &'static str {
        match self {
            LogLevel::Emergency => "\x1b[1;37;41m",
            LogLevel::Alert => "\x1b[37;41m",
            LogLevel::Critical => "\x1b[1;31m",
            LogLevel::Error => "\x1b[0;31m",
            LogLevel::Warn => "\x1b[0;33m",
            LogLevel::Notice => "\x1b[0;36m",
            LogLevel::Info => "\x1b[0;32m",
            LogLevel::Debug => "\x1b[0;34m",
        }
    }

    /// True when `self` is at least as severe as `threshold`.
    pub fn admitted_by(self, threshold: LogLevel) -> bool {
        self.severity() <= threshold.severity()
    }

    /// Lenient lookup: unknown input falls back to INFO with a warning and never fails.
    pub fn resolve(input: &str) -> Self {
        match input.parse() {
            Ok(level) => level,
            Err(err) => {
                utils::warn(format_args!("{}; falling back to INFO", err));
                LogLevel::Info
            }
        }
    }

    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Emergency | LogLevel::Alert | LogLevel::Critical | LogLevel::Error => {
                log::LevelFilter::Error
            }
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Notice | LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Trace,
        }
    }
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug | log::Level::Trace => LogLevel::Debug,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized log level (expected a level name or a number from 0 to 7)")]
pub struct ParseLevelError;

impl FromStr for LogLevel {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if let [digit @ b'0'..=b'9'] = s.as_bytes() {
            return Self::from_severity(digit - b'0').ok_or(ParseLevelError);
        }

        match s.to_ascii_uppercase().as_str() {
            "EMERGENCY" | "EMERG" | "FATAL" => Ok(LogLevel::Emergency),
            "ALERT" => Ok(LogLevel::Alert),
            "CRITICAL" | "CRIT" => Ok(LogLevel::Critical),
            "ERROR" | "ERR" => Ok(LogLevel::Error),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "NOTICE" => Ok(LogLevel::Notice),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            _ => Err(ParseLevelError),
        }
    }
}
