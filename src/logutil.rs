//! Logging utilities for keeping chat-supplied text on a single log line.
//! Escapes control characters that otherwise break log readability.

/// Longest preview of user text kept in a log line.
const MAX_PREVIEW: usize = 200;

/// Escape a string for single-line logging:
/// - `\n` => `\\n`
/// - `\r` => `\\r`
/// - `\t` => `\\t`
/// - backslash => `\\\\`
///
/// Other control characters become `\xNN`. Long strings are cut with an ellipsis.
pub fn escape_log(s: &str) -> String {
    let mut out = String::with_capacity(s.len().min(MAX_PREVIEW) + 8);
    for (count, ch) in s.chars().enumerate() {
        if count >= MAX_PREVIEW {
            out.push('…');
            break;
        }
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                use std::fmt::Write;
                let _ = write!(&mut out, "\\x{:02X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

/// Board text collapsed to its first line, for log previews.
pub fn first_line(s: &str) -> String {
    let head = s.lines().next().unwrap_or_default();
    if s.lines().nth(1).is_some() {
        format!("{} (+{} lines)", escape_log(head), s.lines().count() - 1)
    } else {
        escape_log(head)
    }
}
