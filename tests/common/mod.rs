#![allow(dead_code)]

use std::{
    io::Write,
    sync::{Arc, Mutex},
};

use safelog::{logging::sinks::JournalWriter, Builder, Config, Logger};

#[derive(Clone, Default)]
pub struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for Capture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub tag: String,
    pub priority: String,
    pub line: String,
}

#[derive(Clone, Default)]
pub struct JournalCapture(Arc<Mutex<Vec<Submission>>>);

impl JournalCapture {
    pub fn submissions(&self) -> Vec<Submission> {
        self.0.lock().unwrap().clone()
    }
}

impl JournalWriter for JournalCapture {
    fn submit(&mut self, tag: &str, priority: &str, line: &str) -> std::io::Result<()> {
        self.0.lock().unwrap().push(Submission {
            tag: tag.to_string(),
            priority: priority.to_string(),
            line: line.to_string(),
        });
        Ok(())
    }
}

pub struct Harness {
    pub logger: Logger,
    pub stdout: Capture,
    pub stderr: Capture,
    pub journal: JournalCapture,
}

pub fn harness(config: Config) -> Harness {
    let stdout = Capture::default();
    let stderr = Capture::default();
    let journal = JournalCapture::default();

    let logger = Builder::new()
        .with_config(config)
        .with_console_writers(Box::new(stdout.clone()), Box::new(stderr.clone()))
        .with_journal_writer(Box::new(journal.clone()))
        .build()
        .expect("logger builds");

    Harness {
        logger,
        stdout,
        stderr,
        journal,
    }
}

/// Console output from both streams, in no particular order.
pub fn console(h: &Harness) -> String {
    format!("{}{}", h.stdout.contents(), h.stderr.contents())
}
