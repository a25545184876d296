use crate::{config::Config, utils};

use super::{LogFormatter, Record, RecordKind};

const RESET: &str = "\x1b[0m";

/// Single pass `%` placeholder substitution. Text substituted for one placeholder
/// is never scanned again, so a message containing `%d` stays literal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TemplateFormatter;

impl TemplateFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, template: &str, record: &Record, utc: bool) -> String {
        let mut out = String::with_capacity(template.len() + record.message.len() + 32);
        let mut chars = template.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '%' {
                out.push(c);
                continue;
            }

            let expansion = match chars.peek() {
                Some('d') => utils::format_timestamp(record.timestamp, utc),
                Some('z') => utils::zone_label(utc).to_string(),
                Some('l') => record.label().to_string(),
                Some('s') => record.script.to_string(),
                Some('m') => record.message.to_string(),
                _ => {
                    out.push('%');
                    continue;
                }
            };

            chars.next();
            out.push_str(&expansion);
        }

        out
    }
}

impl LogFormatter for TemplateFormatter {
    fn format(&self, record: &Record, config: &Config) -> String {
        self.render(&config.format, record, config.utc)
    }
}

/// Wraps a console line in the colour of its level or record kind.
pub fn colorize(record: &Record, line: &str) -> String {
    let color = match record.kind {
        RecordKind::Standard => record.level.color_code(),
        RecordKind::Sensitive => "\x1b[0;35m",
        RecordKind::Init | RecordKind::Config => "\x1b[0;36m",
    };

    format!("{}{}{}", color, line, RESET)
}
