use std::io::{IsTerminal, Write};

use crate::{
    config::{ColorMode, Config},
    error::SinkError,
    logging::{colorize, LogFormatter, LogSink, Record},
    sanitize,
};

/// Colour related environment signals, captured once when the sink is built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColorEnv {
    /// `NO_COLOR` is set and non-empty.
    pub no_color: bool,
    /// `FORCE_COLOR` or `CLICOLOR_FORCE` is set to something other than `0`.
    pub force_color: bool,
    pub term: Option<String>,
}

impl ColorEnv {
    pub fn from_env() -> Self {
        let set = |name: &str| std::env::var(name).is_ok_and(|v| !v.is_empty());
        let forced = |name: &str| std::env::var(name).is_ok_and(|v| !v.is_empty() && v != "0");

        Self {
            no_color: set("NO_COLOR"),
            force_color: forced("FORCE_COLOR") || forced("CLICOLOR_FORCE"),
            term: std::env::var("TERM").ok(),
        }
    }

    fn term_supports_color(&self) -> bool {
        match self.term.as_deref() {
            None | Some("") | Some("dumb") => false,
            Some(_) => true,
        }
    }
}

/// Decides whether a console stream gets colour. `always` and `never` win outright;
/// `auto` walks the disable signal, force signal, terminal check and terminal
/// capability in that order.
pub fn resolve_color(mode: ColorMode, env: &ColorEnv, is_terminal: bool) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => {
            if env.no_color {
                false
            } else if env.force_color {
                true
            } else if !is_terminal {
                false
            } else {
                env.term_supports_color()
            }
        }
    }
}

pub struct ConsoleSink {
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
    stdout_is_terminal: bool,
    stderr_is_terminal: bool,
    env: ColorEnv,
    formatter: Box<dyn LogFormatter>,
    failed: bool,
}

impl ConsoleSink {
    pub fn new(formatter: Box<dyn LogFormatter>) -> Self {
        Self {
            stdout_is_terminal: std::io::stdout().is_terminal(),
            stderr_is_terminal: std::io::stderr().is_terminal(),
            stdout: Box::new(std::io::stdout()),
            stderr: Box::new(std::io::stderr()),
            env: ColorEnv::from_env(),
            formatter,
            failed: false,
        }
    }

    /// Console sink over arbitrary writers. Neither is treated as a terminal.
    pub fn with_writers(
        stdout: Box<dyn Write + Send>,
        stderr: Box<dyn Write + Send>,
        formatter: Box<dyn LogFormatter>,
    ) -> Self {
        Self {
            stdout,
            stderr,
            stdout_is_terminal: false,
            stderr_is_terminal: false,
            env: ColorEnv::default(),
            formatter,
            failed: false,
        }
    }

    pub fn with_color_env(
        self,
        env: ColorEnv,
        stdout_is_terminal: bool,
        stderr_is_terminal: bool,
    ) -> Self {
        Self {
            env,
            stdout_is_terminal,
            stderr_is_terminal,
            ..self
        }
    }

    fn render(&self, record: &Record, config: &Config, to_stderr: bool) -> String {
        let message = sanitize::truncate(record.message, config.max_line_length);
        let line = self.formatter.format(&record.with_message(&message), config);

        let is_terminal = if to_stderr {
            self.stderr_is_terminal
        } else {
            self.stdout_is_terminal
        };

        if resolve_color(config.color_mode, &self.env, is_terminal) {
            colorize(record, &line)
        } else {
            line
        }
    }
}

impl LogSink for ConsoleSink {
    fn accepts(&self, record: &Record, config: &Config) -> bool {
        !self.failed
            && config.console_enabled
            && (record.level.admitted_by(config.min_level) || record.kind.always_console())
    }

    fn write_log(&mut self, record: &Record, config: &Config) -> Result<(), SinkError> {
        if self.failed {
            return Ok(());
        }

        let to_stderr = record.level.admitted_by(config.stderr_level);
        let line = self.render(record, config, to_stderr);

        let writer = if to_stderr {
            &mut self.stderr
        } else {
            &mut self.stdout
        };

        let result = writeln!(writer, "{}", line).and_then(|_| writer.flush());
        if let Err(err) = result {
            self.failed = true;
            return Err(SinkError::Console(err));
        }

        Ok(())
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
        let _ = self.stderr.flush();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use chrono::Utc;

    use super::*;
    use crate::{
        level::LogLevel,
        logging::{RecordKind, TemplateFormatter},
    };

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl Buffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl Write for Buffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sink() -> (ConsoleSink, Buffer, Buffer) {
        let out = Buffer::default();
        let err = Buffer::default();
        let sink = ConsoleSink::with_writers(
            Box::new(out.clone()),
            Box::new(err.clone()),
            Box::new(TemplateFormatter::new()),
        );
        (sink, out, err)
    }

    fn record(level: LogLevel, message: &str) -> Record<'_> {
        Record {
            level,
            kind: RecordKind::Standard,
            message,
            timestamp: Utc::now(),
            script: "test",
        }
    }

    fn config() -> Config {
        Config {
            format: "[%l] %m".to_string(),
            color_mode: ColorMode::Never,
            min_level: LogLevel::Debug,
            ..Config::default()
        }
    }

    #[test]
    fn routes_by_stderr_threshold_for_every_pair() {
        for threshold in LogLevel::ALL {
            for level in LogLevel::ALL {
                let (mut sink, out, err) = sink();
                let config = Config {
                    stderr_level: threshold,
                    ..config()
                };

                sink.write_log(&record(level, "x"), &config).unwrap();

                let expected = format!("[{}] x\n", level.name());
                if level.severity() <= threshold.severity() {
                    assert_eq!(err.contents(), expected);
                    assert_eq!(out.contents(), "");
                } else {
                    assert_eq!(out.contents(), expected);
                    assert_eq!(err.contents(), "");
                }
            }
        }
    }

    #[test]
    fn color_is_applied_only_when_resolved() {
        let (mut sink, out, _) = sink();
        let config = Config {
            color_mode: ColorMode::Always,
            ..config()
        };
        sink.write_log(&record(LogLevel::Info, "hi"), &config).unwrap();
        assert_eq!(out.contents(), "\x1b[0;32m[INFO] hi\x1b[0m\n");
    }

    #[test]
    fn color_resolution_order() {
        let env = ColorEnv {
            no_color: true,
            force_color: true,
            term: Some("xterm-256color".to_string()),
        };
        assert!(!resolve_color(ColorMode::Auto, &env, true));
        assert!(resolve_color(ColorMode::Always, &env, false));

        let forced = ColorEnv {
            no_color: false,
            ..env.clone()
        };
        assert!(resolve_color(ColorMode::Auto, &forced, false));

        let plain = ColorEnv {
            force_color: false,
            ..forced.clone()
        };
        assert!(!resolve_color(ColorMode::Auto, &plain, false));
        assert!(resolve_color(ColorMode::Auto, &plain, true));
        assert!(!resolve_color(ColorMode::Never, &plain, true));

        let dumb = ColorEnv {
            term: Some("dumb".to_string()),
            ..plain.clone()
        };
        assert!(!resolve_color(ColorMode::Auto, &dumb, true));
        assert!(!resolve_color(ColorMode::Auto, &ColorEnv::default(), true));
    }

    #[test]
    fn quiet_and_filtered_records_are_not_accepted() {
        let (sink, _, _) = sink();
        let quiet = Config {
            console_enabled: false,
            ..config()
        };
        assert!(!sink.accepts(&record(LogLevel::Error, "x"), &quiet));

        let strict = Config {
            min_level: LogLevel::Warn,
            ..config()
        };
        assert!(!sink.accepts(&record(LogLevel::Info, "x"), &strict));
        let sensitive = Record {
            kind: RecordKind::Sensitive,
            ..record(LogLevel::Info, "x")
        };
        assert!(sink.accepts(&sensitive, &strict));
    }

    #[test]
    fn message_is_truncated_to_line_limit() {
        let (mut sink, out, _) = sink();
        let config = Config {
            format: "%m".to_string(),
            max_line_length: 3,
            ..config()
        };
        sink.write_log(&record(LogLevel::Info, "abcdef"), &config).unwrap();
        assert_eq!(out.contents(), format!("abc{}\n", sanitize::TRUNCATION_MARKER));
    }

    #[test]
    fn write_failure_is_reported_once() {
        let mut sink = ConsoleSink::with_writers(
            Box::new(Broken),
            Box::new(Broken),
            Box::new(TemplateFormatter::new()),
        );
        let config = config();

        assert!(sink.write_log(&record(LogLevel::Info, "x"), &config).is_err());
        assert!(sink.write_log(&record(LogLevel::Info, "x"), &config).is_ok());
        assert!(!sink.accepts(&record(LogLevel::Info, "x"), &config));
    }
}
