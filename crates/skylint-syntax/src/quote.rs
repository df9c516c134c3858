//! Quoting and unquoting of Starlark string literals.
//!
//! The decoded value and the raw token are both kept on string nodes, so an
//! unmodified string reprints byte for byte; [`quote`] is only used for
//! strings built programmatically after parsing.

use crate::tokenizer::LexErrorKind;
use std::fmt::Write;

/// Decodes a raw string token (quotes included) into its value, reporting
/// whether the token was triple quoted.
///
/// Supported escapes: `\a \b \f \n \r \t \v \\ \' \"`, hex `\xHH`, octal
/// `\OOO` (up to three digits) and an escaped newline (line continuation).
/// Any other escape is an error.
pub fn unquote(quoted: &str) -> Result<(String, bool), LexErrorKind> {
    let mut s = quoted;
    let q = match s.chars().next() {
        Some(c @ ('"' | '\'')) => c,
        _ => return Err(LexErrorKind::UnterminatedString),
    };
    let mut triple = false;
    let marker = if q == '"' { "\"\"\"" } else { "'''" };
    if s.starts_with(marker) && s.len() >= 6 && s.ends_with(marker) {
        triple = true;
        s = &s[3..s.len() - 3];
    } else if s.len() >= 2 && s.ends_with(q) {
        s = &s[1..s.len() - 1];
    } else {
        return Err(LexErrorKind::UnterminatedString);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let e = match chars.next() {
            Some(e) => e,
            None => return Err(LexErrorKind::UnterminatedString),
        };
        match e {
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\u{0b}'),
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            '\n' => {}
            'x' => {
                let hi = chars.next().and_then(|c| c.to_digit(16));
                let lo = chars.next().and_then(|c| c.to_digit(16));
                match (hi, lo) {
                    (Some(hi), Some(lo)) => out.push((hi * 16 + lo) as u8 as char),
                    _ => return Err(LexErrorKind::InvalidEscape('x')),
                }
            }
            '0'..='7' => {
                let mut v = e.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            chars.next();
                            v = v * 8 + d;
                        }
                        None => break,
                    }
                }
                out.push((v & 0xff) as u8 as char);
            }
            other => return Err(LexErrorKind::InvalidEscape(other)),
        }
    }
    Ok((out, triple))
}

/// Encodes a string value as a double-quoted Starlark literal.
pub fn quote(unquoted: &str, triple: bool) -> String {
    let q = if triple { "\"\"\"" } else { "\"" };
    let mut out = String::with_capacity(unquoted.len() + 2 * q.len());
    out.push_str(q);
    for c in unquoted.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' if triple => out.push('\n'),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                // Other control characters escape to hex.
                let _ = write!(out, "\\x{:02x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push_str(q);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unquote_plain() {
        assert_eq!(unquote("\"abc\""), Ok(("abc".to_owned(), false)));
        assert_eq!(unquote("'abc'"), Ok(("abc".to_owned(), false)));
        assert_eq!(unquote("\"\""), Ok((String::new(), false)));
    }

    #[test]
    fn unquote_escapes() {
        assert_eq!(unquote(r#""a\nb""#), Ok(("a\nb".to_owned(), false)));
        assert_eq!(unquote(r#""a\tb""#), Ok(("a\tb".to_owned(), false)));
        assert_eq!(unquote(r#""\x41""#), Ok(("A".to_owned(), false)));
        assert_eq!(unquote(r#""\101""#), Ok(("A".to_owned(), false)));
        assert_eq!(unquote(r#""\"""#), Ok(("\"".to_owned(), false)));
    }

    #[test]
    fn unquote_triple() {
        assert_eq!(unquote("'''a\nb'''"), Ok(("a\nb".to_owned(), true)));
        assert_eq!(unquote("\"\"\"x\"\"\""), Ok(("x".to_owned(), true)));
    }

    #[test]
    fn unquote_bad_escape() {
        assert_eq!(unquote(r#""\q""#), Err(LexErrorKind::InvalidEscape('q')));
    }

    #[test]
    fn quote_round() {
        assert_eq!(quote("abc", false), "\"abc\"");
        assert_eq!(quote("a\"b", false), "\"a\\\"b\"");
        assert_eq!(quote("a\nb", false), "\"a\\nb\"");
        assert_eq!(quote("a\nb", true), "\"\"\"a\nb\"\"\"");
    }
}
