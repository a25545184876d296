//! Defenses applied to every untrusted string before it is rendered.
//!
//! Two independent passes exist:
//!
//! - the escape defense removes terminal control sequences (CSI, OSC, the other
//!   ESC-introduced families and their 8-bit C1 forms) together with any stray
//!   control character other than LF, CR and TAB;
//! - the newline defense turns LF, CR and TAB into a single space each.
//!
//! The character sets touched by the two passes are disjoint, so disabling one
//! of them never changes what the other one does. Neither pass can fail.

use std::borrow::Cow;

pub const TRUNCATION_MARKER: &str = "...[TRUNCATED]";

const ESC: char = '\x1b';
const BEL: char = '\x07';
const C1_CSI: char = '\u{9b}';
const C1_ST: char = '\u{9c}';
const C1_OSC: char = '\u{9d}';
const C1_DCS: char = '\u{90}';
const C1_SOS: char = '\u{98}';
const C1_PM: char = '\u{9e}';
const C1_APC: char = '\u{9f}';

/// Applies both defenses unless the matching opt-out flag is set.
pub fn sanitize(raw: &str, allow_newlines: bool, allow_ansi: bool) -> String {
    let mut safe = raw.to_string();

    if !allow_ansi {
        safe = strip_escape_sequences(&safe);
    }

    if !allow_newlines {
        safe = neutralize_newlines(&safe);
    }

    safe
}

pub fn neutralize_newlines(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c => c,
        })
        .collect()
}

/// Removes every escape sequence and stray control character. LF, CR and TAB are
/// left for [`neutralize_newlines`].
pub fn strip_escape_sequences(input: &str) -> String {
    EscapeScanner::new(Filter::All).run(input)
}

/// Removes SGR (colour) sequences only and leaves everything else untouched.
pub fn strip_color(input: &str) -> String {
    EscapeScanner::new(Filter::ColorOnly).run(input)
}

/// Cuts `input` to `max_chars` characters and appends [`TRUNCATION_MARKER`]. A limit
/// of zero means unlimited.
pub fn truncate(input: &str, max_chars: usize) -> Cow<'_, str> {
    if max_chars == 0 {
        return Cow::Borrowed(input);
    }

    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &input[..cut], TRUNCATION_MARKER)),
        None => Cow::Borrowed(input),
    }
}

/// Restricts an identity string (script name, journal tag) to `[A-Za-z0-9._-]`.
pub fn sanitize_identity(input: &str) -> String {
    input
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Filter {
    All,
    ColorOnly,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    /// Saw ESC (or a restarted ESC inside another sequence).
    Escape,
    /// ESC followed by one or more intermediate bytes (0x20..=0x2F).
    EscapeIntermediate,
    Csi,
    /// OSC, DCS, SOS, PM or APC payload, ended by BEL or ST.
    String,
    /// ESC seen inside a string sequence, possibly the first half of `ESC \`.
    StringEscape,
}

struct EscapeScanner {
    filter: Filter,
    state: State,
    out: String,
    /// Raw text of the sequence currently being scanned.
    pending: String,
}

impl EscapeScanner {
    fn new(filter: Filter) -> Self {
        Self {
            filter,
            state: State::Ground,
            out: String::new(),
            pending: String::new(),
        }
    }

    fn run(mut self, input: &str) -> String {
        self.out.reserve(input.len());
        for c in input.chars() {
            self.step(c);
        }

        // An unterminated sequence at the end of input is never emitted in All
        // mode; ColorOnly only removes complete SGR sequences.
        if self.filter == Filter::ColorOnly {
            self.out.push_str(&self.pending);
        }
        self.out
    }

    fn step(&mut self, c: char) {
        match self.state {
            State::Ground => self.ground(c),
            State::Escape => match c {
                '[' => self.enter(State::Csi, c),
                ']' | 'P' | 'X' | '^' | '_' => self.enter(State::String, c),
                ESC => self.restart(c),
                '\x20'..='\x2f' => self.enter(State::EscapeIntermediate, c),
                '\x30'..='\x7e' => self.finish(c, false),
                _ => self.abort(c),
            },
            State::EscapeIntermediate => match c {
                '\x20'..='\x2f' => self.pending.push(c),
                '\x30'..='\x7e' => self.finish(c, false),
                ESC => self.restart(c),
                _ => self.abort(c),
            },
            State::Csi => match c {
                '\x20'..='\x3f' => self.pending.push(c),
                '\x40'..='\x7e' => self.finish(c, c == 'm'),
                ESC => self.restart(c),
                _ => self.abort(c),
            },
            State::String => match c {
                BEL | C1_ST => self.finish(c, false),
                ESC => self.enter(State::StringEscape, c),
                _ => self.pending.push(c),
            },
            State::StringEscape => {
                if c == '\\' {
                    self.finish(c, false);
                } else {
                    // The ESC did not start a terminator: close the string and treat
                    // that ESC as the introducer of a new sequence.
                    self.pending.pop();
                    self.flush_pending();
                    self.pending.push(ESC);
                    self.state = State::Escape;
                    self.step(c);
                }
            }
        }
    }

    fn ground(&mut self, c: char) {
        match c {
            ESC => self.enter(State::Escape, c),
            C1_CSI => self.enter(State::Csi, c),
            C1_OSC | C1_DCS | C1_SOS | C1_PM | C1_APC => self.enter(State::String, c),
            '\n' | '\r' | '\t' => self.out.push(c),
            c if c.is_control() && self.filter == Filter::All => {}
            c => self.out.push(c),
        }
    }

    fn enter(&mut self, state: State, c: char) {
        self.pending.push(c);
        self.state = state;
    }

    /// Completes the pending sequence. It is dropped in All mode, and in ColorOnly
    /// mode only when it is an SGR sequence.
    fn finish(&mut self, c: char, is_sgr: bool) {
        self.pending.push(c);
        if self.filter == Filter::ColorOnly && is_sgr {
            self.pending.clear();
        }
        self.flush_pending();
        self.state = State::Ground;
    }

    /// Malformed sequence: discard what was collected and rescan `c` from ground.
    fn abort(&mut self, c: char) {
        self.flush_pending();
        self.state = State::Ground;
        self.ground(c);
    }

    /// ESC in the middle of a sequence starts a new one.
    fn restart(&mut self, c: char) {
        self.flush_pending();
        self.enter(State::Escape, c);
    }

    fn flush_pending(&mut self) {
        if self.filter == Filter::ColorOnly {
            self.out.push_str(&self.pending);
        }
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const SAMPLES: &[&str] = &[
        "plain text",
        "line1\nFAKE [CRITICAL] line2",
        "\x1b[2Jboom",
        "\x1b[1;31mred\x1b[0m and\tTabs\r\n",
        "\x1b]0;title\x07after",
        "\x1b]8;;http://evil\x1b\\link\x1b]8;;\x1b\\",
        "\x1b[31",
        "\x1b\x1b[31mdouble",
        "\x1b]unterminated osc",
        "\x1b]osc\x1b[31mnested",
        "\u{9b}31mc1 csi",
        "\x1b(Bcharset",
        "bell\x07 back\x08space del\x7f",
        "\x1b[3\n1m",
        "ünïcødé \x1b[4m🙂",
        "\x1b",
    ];

    #[test]
    fn newlines_become_single_spaces() {
        assert_eq!(
            sanitize("line1\nFAKE [CRITICAL] line2", false, false),
            "line1 FAKE [CRITICAL] line2"
        );
        assert_eq!(neutralize_newlines("a\r\nb\tc"), "a  b c");
    }

    #[test]
    fn csi_sequences_are_removed() {
        assert_eq!(sanitize("\x1b[2Jboom", false, false), "boom");
        assert_eq!(strip_escape_sequences("\x1b[1;31mred\x1b[0m"), "red");
        assert_eq!(strip_escape_sequences("\u{9b}31mc1 csi"), "c1 csi");
        assert_eq!(strip_escape_sequences("\x1b[?25lhidden"), "hidden");
    }

    #[test]
    fn osc_sequences_are_removed_with_either_terminator() {
        assert_eq!(strip_escape_sequences("\x1b]0;title\x07after"), "after");
        assert_eq!(
            strip_escape_sequences("\x1b]8;;http://evil\x1b\\link\x1b]8;;\x1b\\"),
            "link"
        );
        assert_eq!(strip_escape_sequences("\x1bPq#0;2;0;0;0\x1b\\x"), "x");
    }

    #[test]
    fn malformed_and_partial_sequences_are_handled() {
        assert_eq!(strip_escape_sequences("\x1b[31"), "");
        assert_eq!(strip_escape_sequences("\x1b"), "");
        assert_eq!(strip_escape_sequences("\x1b\x1b[31mdouble"), "double");
        assert_eq!(strip_escape_sequences("\x1b]unterminated osc"), "");
        assert_eq!(strip_escape_sequences("\x1b]osc\x1b[31mnested"), "nested");
        assert_eq!(strip_escape_sequences("\x1b(Bcharset"), "charset");
        // A newline inside a CSI aborts it; the newline is left for the other pass.
        assert_eq!(strip_escape_sequences("\x1b[3\n1m"), "\n1m");
    }

    #[test]
    fn stray_control_characters_are_removed() {
        assert_eq!(
            strip_escape_sequences("bell\x07 back\x08space del\x7f"),
            "bell backspace del"
        );
    }

    #[test]
    fn output_never_contains_escape_bytes() {
        for sample in SAMPLES {
            let safe = sanitize(sample, false, false);
            assert!(!safe.contains(ESC), "{:?} -> {:?}", sample, safe);
            assert!(!safe.contains('\n') && !safe.contains('\r'));
            assert!(!safe.chars().any(char::is_control), "{:?}", safe);
        }
    }

    #[test]
    fn sanitize_is_idempotent() {
        for sample in SAMPLES {
            for (newlines, ansi) in [(false, false), (true, false), (false, true), (true, true)] {
                let once = sanitize(sample, newlines, ansi);
                assert_eq!(sanitize(&once, newlines, ansi), once, "{:?}", sample);
            }
        }
    }

    #[test]
    fn defenses_are_independent() {
        for sample in SAMPLES {
            assert_eq!(
                sanitize(sample, true, false),
                strip_escape_sequences(sample),
                "{:?}",
                sample
            );
            assert_eq!(
                sanitize(sample, false, true),
                neutralize_newlines(sample),
                "{:?}",
                sample
            );
            assert_eq!(sanitize(sample, true, true), *sample);
        }
    }

    #[test]
    fn allow_newlines_keeps_newlines_but_still_strips_escapes() {
        assert_eq!(sanitize("a\n\x1b[31mb", true, false), "a\nb");
        assert_eq!(sanitize("a\n\x1b[31mb", false, true), "a \x1b[31mb");
    }

    #[test]
    fn truncate_counts_characters() {
        let message = "x".repeat(100);
        let cut = truncate(&message, 50);
        assert_eq!(cut, format!("{}{}", "x".repeat(50), TRUNCATION_MARKER));
        assert_eq!(truncate(&message, 0), message);
        assert_eq!(truncate(&message, 100), message);
        assert_eq!(truncate("ééé", 2), format!("éé{}", TRUNCATION_MARKER));
    }

    #[test]
    fn identity_is_restricted_to_safe_characters() {
        assert_eq!(sanitize_identity("deploy-v1.2_x"), "deploy-v1.2_x");
        assert_eq!(sanitize_identity("../evil name\n"), ".._evil_name_");
        assert_eq!(sanitize_identity("\x1b[31m"), "__31m");
    }

    #[test]
    fn strip_color_only_touches_sgr() {
        assert_eq!(strip_color("\x1b[0;31mERROR\x1b[0m done"), "ERROR done");
        assert_eq!(strip_color("\x1b[2Jkept"), "\x1b[2Jkept");
        assert_eq!(strip_color("\x1b]0;t\x07x"), "\x1b]0;t\x07x");
        assert_eq!(strip_color("tail \x1b[3"), "tail \x1b[3");
        assert_eq!(strip_color("a\nb"), "a\nb");
    }

    /// Characters that open, continue, terminate or break escape sequences, mixed
    /// with ordinary text.
    const HOSTILE: &[char] = &[
        'a', 'Z', '0', ' ', ';', 'm', 'J', 'P', 'X', '^', '_', '(', '?', 'é', '🙂', ESC, '[',
        ']', '\\', BEL, '\n', '\r', '\t', '\x08', '\x7f', C1_CSI, C1_ST, C1_OSC, C1_DCS,
        C1_SOS, C1_PM, C1_APC,
    ];

    fn hostile_text() -> impl Strategy<Value = String> {
        prop_oneof![
            3 => prop::collection::vec(prop::sample::select(HOSTILE), 0..64)
                .prop_map(|chars| chars.into_iter().collect::<String>()),
            1 => any::<String>(),
        ]
    }

    proptest! {
        #[test]
        fn sanitize_is_idempotent_for_any_input(
            raw in hostile_text(),
            newlines in any::<bool>(),
            ansi in any::<bool>(),
        ) {
            let once = sanitize(&raw, newlines, ansi);
            prop_assert_eq!(sanitize(&once, newlines, ansi), once);
        }

        #[test]
        fn defenses_are_independent_for_any_input(raw in hostile_text()) {
            prop_assert_eq!(sanitize(&raw, true, false), strip_escape_sequences(&raw));
            prop_assert_eq!(sanitize(&raw, false, true), neutralize_newlines(&raw));
            prop_assert_eq!(sanitize(&raw, true, true), raw.clone());
        }

        #[test]
        fn fully_sanitized_output_has_no_control_characters(raw in hostile_text()) {
            let safe = sanitize(&raw, false, false);
            prop_assert!(!safe.chars().any(char::is_control), "{:?} -> {:?}", raw, safe);
        }
    }
}
