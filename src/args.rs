use std::path::PathBuf;

use clap::Parser;
use safelog::{ColorMode, Config, LogLevel};

#[derive(Parser, Debug)]
#[command(version)]
#[command(about = "Write a leveled, sanitized log record to the console, a log file and the system journal.", long_about = None)]
pub struct Args {
    #[arg(required = true, help = "Message to log. Multiple words are joined with spaces.")]
    pub message: Vec<String>,

    #[arg(short, long, default_value = "info", help = "Level of this record, by name or number 0-7.")]
    pub level: String,

    #[arg(long, default_value = "info", help = "Least severe level that is emitted.")]
    pub min_level: String,

    #[arg(long, default_value = "error", help = "Records at least this severe go to stderr.")]
    pub stderr_level: String,

    #[arg(long, help = "Line template using %d %z %l %s %m.")]
    pub format: Option<String>,

    #[arg(long, value_enum, default_value_t = ColorMode::Auto)]
    pub color: ColorMode,

    #[arg(long, help = "Absolute path of the log file to append to.")]
    pub log_file: Option<PathBuf>,

    #[arg(long, default_value = safelog::config::DEFAULT_SCRIPT_NAME)]
    pub script_name: String,

    #[arg(short, long, help = "Also send records to the system journal.")]
    pub journal: bool,

    #[arg(short, long, help = "Journal tag, defaults to the script name.")]
    pub tag: Option<String>,

    #[arg(long, help = "Render timestamps in UTC.")]
    pub utc: bool,

    #[arg(short, long, help = "Disable console output.")]
    pub quiet: bool,

    #[arg(long, help = "Keep newlines in messages. Allows forged log lines.")]
    pub unsafe_allow_newlines: bool,

    #[arg(long, help = "Keep ANSI escape sequences in messages. Allows terminal injection.")]
    pub unsafe_allow_ansi: bool,

    #[arg(long, default_value_t = safelog::config::DEFAULT_MAX_LENGTH)]
    pub max_line_length: usize,

    #[arg(long, default_value_t = safelog::config::DEFAULT_MAX_LENGTH)]
    pub max_journal_length: usize,

    #[arg(long, conflicts_with = "init", help = "Console only record, never written to file or journal.")]
    pub sensitive: bool,

    #[arg(long, help = "Startup record, always shown on the console.")]
    pub init: bool,

    #[arg(
        long,
        short = 'v',
        action = clap::ArgAction::Count,
        help = "Write internal diagnostics to stderr."
    )]
    pub verbose: u8,
}

impl Args {
    pub fn message(&self) -> String {
        self.message.join(" ")
    }

    pub fn record_level(&self) -> LogLevel {
        LogLevel::resolve(&self.level)
    }

    pub fn to_config(&self) -> Config {
        let defaults = Config::default();

        Config {
            min_level: LogLevel::resolve(&self.min_level),
            stderr_level: LogLevel::resolve(&self.stderr_level),
            format: self.format.clone().unwrap_or(defaults.format),
            color_mode: self.color,
            log_file: self.log_file.clone(),
            script_name: self.script_name.clone(),
            journal_enabled: self.journal,
            journal_tag: self.tag.clone().unwrap_or_else(|| self.script_name.clone()),
            utc: self.utc,
            console_enabled: !self.quiet,
            unsafe_allow_newlines: self.unsafe_allow_newlines,
            unsafe_allow_ansi: self.unsafe_allow_ansi,
            max_line_length: self.max_line_length,
            max_journal_length: self.max_journal_length,
        }
    }
}
