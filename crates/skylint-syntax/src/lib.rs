//! A Starlark parser and concrete syntax tree library.
//!
//! This crate parses Starlark build files (`BUILD`, `WORKSPACE`, `*.bzl`)
//! into a concrete syntax tree that preserves exact formatting information:
//! comments, blank-line structure, quote style and layout decisions. The
//! tree can be printed back with [`format`], edited through
//! [`visitor::edit_file`], and re-laid-out with the pure functions in
//! [`layout`].
//!
//! # Quick Start
//!
//! ```
//! use skylint_syntax::{parse_default, format_string};
//!
//! let source = "x = [1, 2]\n";
//! let file = parse_default("example.star", source).expect("parse error");
//! assert_eq!(format_string(&file), source);
//! ```
//!
//! # Guarantees
//!
//! - Printing an unmodified tree of canonically formatted input reproduces
//!   the input byte for byte.
//! - Printing is idempotent for any valid input: formatting the formatted
//!   output changes nothing.
//! - A file that fails to parse produces a structured [`ParseError`] and no
//!   tree.

use std::cmp::min;

/// Layout flag computation (`force_compact`, `force_multi_line`).
pub mod layout;
/// Syntax tree node types.
pub mod nodes;
/// The recursive-descent parser.
pub mod parser;
/// The canonical printer.
pub mod printer;
/// String literal quoting and unquoting.
pub mod quote;
/// The tokenizer.
pub mod tokenizer;
/// Tree traversal and rewriting.
pub mod visitor;

pub use layout::{
    force_compact, force_multi_line, force_multi_line_comprehension, is_simple_expression,
};
pub use nodes::*;
pub use parser::{ParseError, SyntaxError};
pub use printer::{format, format_expr, format_string};
pub use tokenizer::{tokenize, LexError, LexErrorKind, Token, TokenKind};
pub use visitor::{
    contains_comment, edit_expr, edit_file, used_symbols, used_symbols_file, walk, walk_file,
    walk_file_mut, Rewrite,
};

/// Parses a file of the given kind.
///
/// A UTF-8 byte order mark is stripped before parsing. On failure every
/// detected syntax problem is reported in the [`ParseError`]; no tree is
/// produced.
pub fn parse(path: &str, source: &str, kind: FileKind) -> parser::Result<File> {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    parser::parse_file(path, source, kind)
}

/// Parses a `BUILD` file.
pub fn parse_build(path: &str, source: &str) -> parser::Result<File> {
    parse(path, source, FileKind::Build)
}

/// Parses a `.bzl` library or extension file.
pub fn parse_bzl(path: &str, source: &str) -> parser::Result<File> {
    parse(path, source, FileKind::Bzl)
}

/// Parses a `WORKSPACE` file.
pub fn parse_workspace(path: &str, source: &str) -> parser::Result<File> {
    parse(path, source, FileKind::Workspace)
}

/// Parses a generic Starlark file with source-faithful statement grouping.
pub fn parse_default(path: &str, source: &str) -> parser::Result<File> {
    parse(path, source, FileKind::Default)
}

/// Parses a single expression. `1, 2` yields a no-brackets tuple.
pub fn parse_expr(source: &str) -> parser::Result<Expr> {
    parser::parse_expr_text(source)
}

/// Returns the byte offset of the beginning of line `n` (1-indexed).
fn bol_offset(source: &str, n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    source
        .match_indices('\n')
        .nth(n - 2)
        .map(|(index, _)| index + 1)
        .unwrap_or(source.len())
}

/// Formats a parse error into a human-readable string with the offending
/// source line highlighted.
///
/// # Example
///
/// ```
/// use skylint_syntax::{parse_default, prettify_error};
///
/// let source = "x = )\n";
/// if let Err(e) = parse_default("example.star", source) {
///     let formatted = prettify_error(source, &e, "example.star");
///     assert!(formatted.contains("syntax error"));
/// }
/// ```
pub fn prettify_error(source: &str, err: &ParseError, label: &str) -> String {
    use annotate_snippets::{Level, Renderer, Snippet};

    let pos = err.position();
    let message = err.message();
    let context = 1usize;
    let line_start = pos.line.saturating_sub(context).max(1);
    let start_offset = bol_offset(source, line_start);
    let end_offset = bol_offset(source, pos.line + context + 1);
    let snippet = &source[start_offset..end_offset];
    if snippet.is_empty() {
        return format!("{}: {}", label, err);
    }
    let start = min(
        pos.byte.saturating_sub(start_offset),
        snippet.len().saturating_sub(1),
    );
    let end = min(start + 1, snippet.len());
    let rendered = Renderer::styled()
        .render(
            Level::Error.title(label).snippet(
                Snippet::source(snippet)
                    .line_start(line_start)
                    .fold(false)
                    .annotations(vec![Level::Error.span(start..end).label(&message)]),
            ),
        )
        .to_string();
    rendered
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_simple_roundtrip() {
        let source = "x = 1\n";
        let file = parse_default("t.star", source).expect("parse error");
        assert_eq!(format_string(&file), source);
    }

    #[test]
    fn test_bare_minimum_def() {
        parse_bzl("t.bzl", "def f():\n    pass\n").expect("parse error");
    }

    #[test]
    fn test_def_params() {
        parse_bzl("t.bzl", "def g(a, b):\n    return a\n").expect("parse error");
    }

    #[test]
    fn test_file_without_trailing_newline() {
        let file = parse_default("t.star", "x = 1").expect("parse error");
        assert_eq!(format_string(&file), "x = 1\n");
    }

    #[test]
    fn test_bom_stripped() {
        let file = parse_default("t.star", "\u{feff}x = 1\n").expect("parse error");
        assert_eq!(format_string(&file), "x = 1\n");
    }

    #[test]
    fn test_parse_expr() {
        let e = parse_expr("1 + 2").expect("parse error");
        assert!(matches!(e, Expr::Binary(ref b) if b.op == "+"));
        let t = parse_expr("1, 2").expect("parse error");
        assert!(matches!(t, Expr::Tuple(ref t) if t.no_brackets));
    }

    #[test]
    fn test_error_has_no_tree() {
        let err = parse_default("t.star", "def :\n").unwrap_err();
        assert!(err.message().contains("syntax error"));
    }

    #[test]
    fn test_prettify_error_mentions_label() {
        let source = "x = )\n";
        let err = parse_default("broken.star", source).unwrap_err();
        let pretty = prettify_error(source, &err, "broken.star");
        assert!(pretty.contains("broken.star"));
    }

    #[test]
    fn bol_offset_first_line() {
        assert_eq!(0, bol_offset("hello", 1));
        assert_eq!(0, bol_offset("hello", 0));
        assert_eq!(0, bol_offset("hello\nhello", 1));
    }

    #[test]
    fn bol_offset_second_line() {
        assert_eq!(6, bol_offset("hello\nhello", 2));
        assert_eq!(6, bol_offset("hello\nhello\nhello", 2));
    }

    #[test]
    fn bol_offset_past_last_line() {
        assert_eq!(5, bol_offset("hello", 3));
        assert_eq!(11, bol_offset("hello\nhello", 3));
    }
}
