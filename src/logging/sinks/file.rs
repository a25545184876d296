//! Append-only log file with race-free acquisition.
//!
//! Acquisition runs once, walking `DirEnsure -> AtomicCreate -> Validate -> Ready`.
//! A missing file is created with an exclusive open, which refuses to follow a
//! symlink planted at the path. An existing file is checked with `lstat`, reopened
//! with `O_NOFOLLOW`, and the opened handle must refer to the same inode that was
//! checked.
//!
//! Concurrent writers in other processes are only protected by append mode: every
//! record is handed to the kernel as one write of the complete line.

use std::{
    fs::{File, OpenOptions},
    io::{ErrorKind, Write},
    os::{
        fd::AsRawFd,
        unix::fs::{MetadataExt, OpenOptionsExt},
    },
    path::{Path, PathBuf},
};

use crate::{
    config::Config,
    error::{InitError, SinkError},
    logging::{LogFormatter, LogSink, Record},
    sanitize,
};

const FILE_MODE: u32 = 0o600;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileSinkState {
    Uninitialized,
    DirEnsure,
    AtomicCreate,
    Validate,
    Ready,
    Failed,
}

pub struct FileSink {
    state: FileSinkState,
    file: Option<File>,
    path: PathBuf,
    formatter: Box<dyn LogFormatter>,
}

impl FileSink {
    /// Acquires `path` for appending. On error nothing is kept open.
    pub fn new(
        path: impl Into<PathBuf>,
        formatter: Box<dyn LogFormatter>,
    ) -> Result<Self, InitError> {
        let mut sink = Self {
            state: FileSinkState::Uninitialized,
            file: None,
            path: path.into(),
            formatter,
        };

        match sink.acquire() {
            Ok(file) => {
                sink.file = Some(file);
                sink.transition(FileSinkState::Ready);
                Ok(sink)
            }
            Err(err) => {
                sink.transition(FileSinkState::Failed);
                Err(err)
            }
        }
    }

    pub fn state(&self) -> FileSinkState {
        self.state
    }

    fn transition(&mut self, next: FileSinkState) {
        tracing::debug!(target: "safelog", "file sink {:?} -> {:?}", self.state, next);
        self.state = next;
    }

    fn acquire(&mut self) -> Result<File, InitError> {
        if !self.path.is_absolute() {
            return Err(InitError::RelativePath);
        }

        self.transition(FileSinkState::DirEnsure);
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(InitError::DirectoryCreate)?;
            }
        }

        self.transition(FileSinkState::AtomicCreate);
        let created = OpenOptions::new()
            .append(true)
            .create_new(true)
            .mode(FILE_MODE)
            .open(&self.path);

        self.transition(FileSinkState::Validate);
        match created {
            Ok(file) => validate_handle(&file).map(|_| file),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => open_existing(&self.path),
            Err(err) => Err(classify_open_error(err)),
        }
    }

    fn append(&mut self, line: &str) -> std::io::Result<()> {
        let Some(file) = self.file.as_mut() else {
            return Ok(());
        };

        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        file.write_all(buf.as_bytes())
    }
}

fn open_existing(path: &Path) -> Result<File, InitError> {
    let checked = std::fs::symlink_metadata(path).map_err(classify_open_error)?;
    if checked.file_type().is_symlink() {
        return Err(InitError::Symlink);
    }
    if !checked.file_type().is_file() {
        return Err(InitError::NotRegularFile);
    }

    let file = open_nofollow(path)?;

    let opened = file.metadata().map_err(InitError::Open)?;
    if opened.dev() != checked.dev() || opened.ino() != checked.ino() {
        return Err(InitError::Replaced);
    }

    validate_handle(&file)?;
    Ok(file)
}

/// Opens without following a final symlink and without blocking, so a FIFO
/// swapped in after the `lstat` fails with `ENXIO` instead of hanging.
fn open_nofollow(path: &Path) -> Result<File, InitError> {
    let file = OpenOptions::new()
        .append(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_NONBLOCK)
        .open(path)
        .map_err(classify_open_error)?;

    clear_nonblocking(&file).map_err(InitError::Open)?;
    Ok(file)
}

fn clear_nonblocking(file: &File) -> std::io::Result<()> {
    let fd = file.as_raw_fd();

    // SAFETY: `fd` is owned by `file` and stays open for both calls.
    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }
    // SAFETY: as above.
    if unsafe { libc::fcntl(fd, libc::F_SETFL, flags & !libc::O_NONBLOCK) } < 0 {
        return Err(std::io::Error::last_os_error());
    }

    Ok(())
}

fn validate_handle(file: &File) -> Result<(), InitError> {
    let meta = file.metadata().map_err(InitError::Open)?;
    if !meta.file_type().is_file() {
        return Err(InitError::NotRegularFile);
    }
    Ok(())
}

fn classify_open_error(err: std::io::Error) -> InitError {
    // O_NOFOLLOW on a symlink fails with ELOOP.
    if err.raw_os_error() == Some(libc::ELOOP) {
        return InitError::Symlink;
    }

    match err.kind() {
        ErrorKind::PermissionDenied => InitError::NotWritable,
        _ => match err.raw_os_error() {
            Some(libc::EISDIR) | Some(libc::ENXIO) => InitError::NotRegularFile,
            Some(libc::EROFS) => InitError::NotWritable,
            _ => InitError::Open(err),
        },
    }
}

impl LogSink for FileSink {
    fn accepts(&self, record: &Record, config: &Config) -> bool {
        self.state == FileSinkState::Ready
            && record.kind.reaches_file()
            && record.level.admitted_by(config.min_level)
    }

    fn write_log(&mut self, record: &Record, config: &Config) -> Result<(), SinkError> {
        if self.state != FileSinkState::Ready || !record.kind.reaches_file() {
            return Ok(());
        }

        let message = sanitize::truncate(record.message, config.max_line_length);
        let line = self.formatter.format(&record.with_message(&message), config);
        let line = sanitize::strip_color(&line);

        if let Err(err) = self.append(&line) {
            self.file = None;
            self.transition(FileSinkState::Failed);
            return Err(SinkError::File(err));
        }

        Ok(())
    }

    fn flush(&mut self) {
        if let Some(file) = self.file.as_mut() {
            let _ = file.flush();
        }
    }
}
