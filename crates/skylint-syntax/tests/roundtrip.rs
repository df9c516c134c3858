//! Round-trip tests for the skylint-syntax parser and printer.
//!
//! Two invariants are checked:
//!
//! - `format(parse(code)) == code` for every canonical fixture in
//!   `tests/fixtures/`.
//! - `format(parse(format(parse(code)))) == format(parse(code))` for all
//!   inputs, canonical or not: one pass of the printer reaches a fixed
//!   point.
//!
//! To add a new fixture-based test, create a `.star`/`BUILD`/`.bzl` file in
//! `tests/fixtures/` and a `roundtrip_fixture_<name>` test function.

use difference::assert_diff;
use itertools::Itertools;
use rayon::prelude::*;
use skylint_syntax::{format_string, parse, prettify_error, FileKind};
use std::path::{Path, PathBuf};

/// Helper to visualize whitespace differences in test output.
fn visualize(s: &str) -> String {
    s.replace(' ', "▩").lines().join("↩\n")
}

fn kind_for(path: &Path) -> FileKind {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    if name.starts_with("build_") {
        FileKind::Build
    } else if name.starts_with("workspace_") {
        FileKind::Workspace
    } else if name.ends_with(".bzl") {
        FileKind::Bzl
    } else {
        FileKind::Default
    }
}

fn parse_or_die(path: &str, input: &str, kind: FileKind) -> skylint_syntax::File {
    match parse(path, input, kind) {
        Ok(f) => f,
        Err(e) => panic!("{}", prettify_error(input, &e, path)),
    }
}

/// Byte-exact round trip for canonical input.
fn assert_roundtrip(input: &str, label: &str, kind: FileKind) {
    let file = parse_or_die(label, input, kind);
    let generated = format_string(&file);
    if generated != input {
        let got = visualize(&generated);
        let expected = visualize(input);
        assert_diff!(expected.as_ref(), got.as_ref(), "", 0);
    }
}

/// Formatting reaches a fixed point after one pass.
fn assert_fixed_point(input: &str, label: &str, kind: FileKind) {
    let once = format_string(&parse_or_die(label, input, kind));
    let twice = format_string(&parse_or_die(label, &once, kind));
    if once != twice {
        let got = visualize(&twice);
        let expected = visualize(&once);
        assert_diff!(expected.as_ref(), got.as_ref(), "", 0);
    }
}

fn fixture_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path
}

fn assert_roundtrip_fixture(fixture_name: &str) {
    let path = fixture_dir().join(fixture_name);
    let contents = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", fixture_name, e));
    let kind = kind_for(&path);
    assert_roundtrip(&contents, fixture_name, kind);
    assert_fixed_point(&contents, fixture_name, kind);
}

// =============================================================================
// Fixture-based round-trip tests
// =============================================================================

#[test]
fn roundtrip_fixture_assignments() {
    assert_roundtrip_fixture("assignments.star");
}

#[test]
fn roundtrip_fixture_build_rules() {
    assert_roundtrip_fixture("build_rules.star");
}

#[test]
fn roundtrip_fixture_comments() {
    assert_roundtrip_fixture("comments.star");
}

#[test]
fn roundtrip_fixture_comprehensions() {
    assert_roundtrip_fixture("comprehensions.star");
}

#[test]
fn roundtrip_fixture_control_flow() {
    assert_roundtrip_fixture("control_flow.bzl");
}

#[test]
fn roundtrip_fixture_expressions() {
    assert_roundtrip_fixture("expressions.star");
}

#[test]
fn roundtrip_fixture_functions() {
    assert_roundtrip_fixture("functions.bzl");
}

#[test]
fn roundtrip_fixture_loads() {
    assert_roundtrip_fixture("loads.bzl");
}

#[test]
fn roundtrip_fixture_strings() {
    assert_roundtrip_fixture("strings.star");
}

#[test]
fn roundtrip_all_fixtures_in_parallel() {
    let entries: Vec<_> = fixture_dir()
        .read_dir()
        .expect("read_dir")
        .map(|e| e.expect("dir entry").path())
        .collect();
    assert!(!entries.is_empty(), "no fixtures found");
    entries.par_iter().for_each(|path| {
        let contents = std::fs::read_to_string(path).expect("reading fixture");
        let label = path.display().to_string();
        let kind = kind_for(path);
        assert_roundtrip(&contents, &label, kind);
        assert_fixed_point(&contents, &label, kind);
    });
}

// =============================================================================
// Inline round-trip tests
// =============================================================================

#[test]
fn roundtrip_empty_file() {
    assert_roundtrip("", "empty", FileKind::Default);
}

#[test]
fn roundtrip_single_statement() {
    assert_roundtrip("x = 1\n", "inline", FileKind::Default);
}

#[test]
fn roundtrip_tuple_vs_paren() {
    assert_roundtrip("a = (1)\nb = (1,)\nc = (1, 2)\nd = ()\n", "inline", FileKind::Default);
}

#[test]
fn roundtrip_nested_structures() {
    let src = "x = {\n    \"a\": [1, 2],\n    \"b\": {\"c\": (3, 4)},\n}\n";
    assert_roundtrip(src, "inline", FileKind::Default);
}

#[test]
fn roundtrip_slice_forms() {
    assert_roundtrip(
        "a = x[1]\nb = x[1:2]\nc = x[:2]\nd = x[1:]\ne = x[1:2:3]\nf = x[::2]\n",
        "inline",
        FileKind::Default,
    );
}

#[test]
fn roundtrip_operators() {
    assert_roundtrip(
        "a = 1 + 2 * 3 - 4 // 5 % 6\nb = x < 1 and y >= 2 or not z\nc = v in w\nd = v not in w\ne = v is not w\nf = x | y & z ^ w\ng = x << 2 >> 1\nh = -x + ~y\n",
        "inline",
        FileKind::Default,
    );
}

#[test]
fn roundtrip_conditional_and_lambda() {
    assert_roundtrip(
        "a = x if y else z\nf = lambda a, b = 1: a + b\n",
        "inline",
        FileKind::Default,
    );
}

#[test]
fn fixed_point_on_unformatted_input() {
    for src in &[
        "x=1\n",
        "f( 1,2 ,3 )\n",
        "def f(a,b=2):\n  return a+b\n",
        "x = [1,\n  2, 3]\n",
        "load(\":a.bzl\",  \"b\")\n",
        "if x :\n\n  pass\n",
        "y = {  }\n",
        "z = ( 1 , )\n",
    ] {
        assert_fixed_point(src, "inline", FileKind::Default);
        assert_fixed_point(src, "inline", FileKind::Build);
        assert_fixed_point(src, "inline", FileKind::Bzl);
    }
}

#[test]
fn positions_serialize_for_tooling() {
    let f = parse_or_die("inline", "x = 1\n", FileKind::Default);
    let (start, end) = f.stmts[0].span();
    let v = serde_json::to_value(start).expect("serializable position");
    assert_eq!(v["line"], 1);
    assert_eq!(v["line_rune"], 1);
    assert_eq!(v["byte"], 0);
    let v = serde_json::to_value(end).expect("serializable position");
    assert_eq!(v["byte"], 5);
}

#[test]
fn format_then_parse_preserves_statement_count() {
    let src = "a = 1\n\nb = 2\ndef f():\n    pass\nc = f()\n";
    let f1 = parse_or_die("inline", src, FileKind::Bzl);
    let printed = format_string(&f1);
    let f2 = parse_or_die("inline", &printed, FileKind::Bzl);
    assert_eq!(f1.stmts.len(), f2.stmts.len());
}
