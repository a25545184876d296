use std::{fmt::Display, io::Write};

use chrono::{DateTime, Local, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub fn format_timestamp(time: DateTime<Utc>, utc: bool) -> String {
    if utc {
        return time.format(TIMESTAMP_FORMAT).to_string();
    }

    time.with_timezone(&Local).format(TIMESTAMP_FORMAT).to_string()
}

pub fn zone_label(utc: bool) -> &'static str {
    if utc {
        "UTC"
    } else {
        "LOCAL"
    }
}

/// Writes a diagnostic line to stderr. Callers must keep paths and other environment
/// details out of `msg`.
pub fn warn(msg: impl Display) {
    let mut stderr = std::io::stderr().lock();
    // Nothing sensible is left to report to if stderr itself is gone.
    let _ = writeln!(stderr, "safelog: warning: {}", msg);
}
