mod console;
mod file;
mod journal;

pub use console::{resolve_color, ColorEnv, ConsoleSink};
pub use file::{FileSink, FileSinkState};
pub use journal::{JournalSink, JournalWriter, LoggerCommand, HELPER_CANDIDATES};
