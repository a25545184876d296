use std::{fmt::Display, path::PathBuf, str::FromStr};

use crate::{level::LogLevel, sanitize};

pub const DEFAULT_FORMAT: &str = "%d [%l] [%s] %m";
pub const DEFAULT_SCRIPT_NAME: &str = "safelog";
pub const DEFAULT_MAX_LENGTH: usize = 4096;
pub const MAX_TAG_LENGTH: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl Display for ColorMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColorMode::Auto => write!(f, "auto"),
            ColorMode::Always => write!(f, "always"),
            ColorMode::Never => write!(f, "never"),
        }
    }
}

impl FromStr for ColorMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ColorMode::Auto),
            "always" | "force" => Ok(ColorMode::Always),
            "never" | "none" => Ok(ColorMode::Never),
            other => Err(format!("unknown color mode '{}'", other)),
        }
    }
}

/// Settings handed to the logger by whatever resolved command line and config file
/// input. Runtime setters on [`crate::Logger`] replace single fields afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub min_level: LogLevel,
    /// Records at least this severe go to stderr, the rest to stdout.
    pub stderr_level: LogLevel,
    pub format: String,
    pub color_mode: ColorMode,
    pub log_file: Option<PathBuf>,
    pub script_name: String,
    pub journal_enabled: bool,
    pub journal_tag: String,
    pub utc: bool,
    pub console_enabled: bool,
    pub unsafe_allow_newlines: bool,
    pub unsafe_allow_ansi: bool,
    /// Console and file message limit in characters, 0 for unlimited.
    pub max_line_length: usize,
    pub max_journal_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            stderr_level: LogLevel::Error,
            format: DEFAULT_FORMAT.to_string(),
            color_mode: ColorMode::Auto,
            log_file: None,
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            journal_enabled: false,
            journal_tag: DEFAULT_SCRIPT_NAME.to_string(),
            utc: false,
            console_enabled: true,
            unsafe_allow_newlines: false,
            unsafe_allow_ansi: false,
            max_line_length: DEFAULT_MAX_LENGTH,
            max_journal_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl Config {
    /// Re-checks every field that ends up in rendered text. Resolver output is not
    /// trusted for these.
    pub fn validated(mut self) -> Self {
        self.script_name = sanitize::sanitize_identity(self.script_name.trim());
        if self.script_name.is_empty() {
            self.script_name = "unknown".to_string();
        }

        self.journal_tag =
            validate_tag(&self.journal_tag).unwrap_or_else(|| self.script_name.clone());

        self.format = sanitize::sanitize(&self.format, false, false);
        if self.format.is_empty() {
            self.format = DEFAULT_FORMAT.to_string();
        }

        self
    }
}

/// Filters a journal tag to identity characters and caps its length. Returns `None`
/// when nothing usable is left.
pub fn validate_tag(tag: &str) -> Option<String> {
    let tag: String = sanitize::sanitize_identity(tag.trim())
        .chars()
        .take(MAX_TAG_LENGTH)
        .collect();

    if tag.chars().all(|c| c == '_') {
        return None;
    }

    Some(tag)
}
