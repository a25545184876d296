//! Leveled logging for scripts and small processes, with the message hardened
//! against log and terminal injection before it reaches any output.
//!
//! A [`Logger`] is built once from a [`Config`] and then fans every record out to
//! the console, an append-only log file and the system journal:
//!
//! ```no_run
//! use safelog::{Builder, Config, LogLevel};
//!
//! let config = Config {
//!     min_level: LogLevel::Warn,
//!     log_file: Some("/var/log/deploy.log".into()),
//!     script_name: "deploy".to_string(),
//!     ..Config::default()
//! };
//!
//! let mut logger = Builder::new().with_config(config).build()?;
//! logger.warn("disk usage above 80%");
//! logger.sensitive("token=abc123");
//! # Ok::<(), safelog::InitError>(())
//! ```

pub mod config;
pub mod error;
pub mod level;
pub mod logging;
pub mod sanitize;
pub mod utils;

pub use config::{ColorMode, Config};
pub use error::{ConfigError, InitError, SinkError};
pub use level::LogLevel;
pub use logging::{Builder, Logger, Record, RecordKind};
