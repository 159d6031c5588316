//! JSON string escaping for hand-written records.
//!
//! Quotes, backslashes and the usual short escapes (`\b \f \n \r \t`) are
//! written in their two-character form. Every other non-printable byte
//! (below `0x20`, or `0x7f`) becomes a `\u00XX` escape. Non-ASCII text is
//! written as UTF-8 unchanged.

use std::fmt::Write;

/// Append `s` to `out` as the body of a JSON string (without the quotes).
pub fn write_escaped(out: &mut String, s: &str) {
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c < '\u{20}' || c == '\u{7f}' => {
                // Writing to a String cannot fail.
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
}

/// Escape `s` into a new string, without surrounding quotes.
#[must_use]
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    write_escaped(&mut out, s);
    out
}

/// Escape `s` and wrap it in double quotes.
#[must_use]
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    write_escaped(&mut out, s);
    out.push('"');
    out
}
