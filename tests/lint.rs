//! Integration tests for the warning catalog: findings on minimal inputs
//! and the effect of automatic fixes on the reprinted output.

use skylint::warns::{all_warnings, file_warnings, fix_warnings, Finding};
use skylint::FileKind;
use skylint_syntax::{format_string, parse, File};

fn parse_kind(src: &str, kind: FileKind) -> File {
    let name = match kind {
        FileKind::Build => "pkg/BUILD",
        FileKind::Workspace => "WORKSPACE",
        FileKind::Bzl => "pkg/defs.bzl",
        FileKind::Default => "pkg/file.star",
    };
    parse(name, src, kind).expect("parse error")
}

fn warnings_for(src: &str, kind: FileKind, category: &str) -> Vec<Finding> {
    let mut f = parse_kind(src, kind);
    file_warnings(&mut f, "pkg", &[category.to_owned()], false)
}

fn fixed_output(src: &str, kind: FileKind, category: &str) -> String {
    let mut f = parse_kind(src, kind);
    fix_warnings(&mut f, "pkg", &[category.to_owned()]);
    format_string(&f)
}

#[test]
fn all_warnings_is_sorted_and_complete() {
    let all = all_warnings();
    let mut sorted = all.clone();
    sorted.sort_unstable();
    assert_eq!(all, sorted);
    assert!(all.contains(&"integer-division"));
    assert!(all.contains(&"positional-args"));
}

// ---------------------------------------------------------------------------
// integer-division
// ---------------------------------------------------------------------------

#[test]
fn integer_division_warns() {
    let ws = warnings_for("x = 4 / 2\n", FileKind::Bzl, "integer-division");
    assert_eq!(ws.len(), 1);
    assert_eq!(ws[0].category, "integer-division");
    assert_eq!(ws[0].start.line, 1);
}

#[test]
fn integer_division_fix_rewrites_operator() {
    assert_eq!(
        fixed_output("x = 4 / 2\ny /= 3\n", FileKind::Bzl, "integer-division"),
        "x = 4 // 2\ny //= 3\n"
    );
}

#[test]
fn integer_division_suppressed_by_comment() {
    let ws = warnings_for(
        "x = 4 / 2  # skylint: disable=integer-division\n",
        FileKind::Bzl,
        "integer-division",
    );
    assert!(ws.is_empty());
}

// ---------------------------------------------------------------------------
// load
// ---------------------------------------------------------------------------

#[test]
fn unused_load_warns() {
    let ws = warnings_for(
        "load(\":a.bzl\", \"used\", \"unused\")\n\nused()\n",
        FileKind::Bzl,
        "load",
    );
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("\"unused\" is unused"));
}

#[test]
fn unused_load_fix_removes_binding() {
    let out = fixed_output(
        "load(\":a.bzl\", \"used\", \"unused\")\n\nused()\n",
        FileKind::Bzl,
        "load",
    );
    assert_eq!(out, "load(\":a.bzl\", \"used\")\n\nused()\n");
}

#[test]
fn unused_load_fix_removes_empty_load() {
    let out = fixed_output(
        "load(\":a.bzl\", \"unused\")\n\nfoo()\n",
        FileKind::Bzl,
        "load",
    );
    assert_eq!(out, "foo()\n");
}

#[test]
fn duplicate_load_warns() {
    let ws = warnings_for(
        "load(\":a.bzl\", \"x\")\nload(\":b.bzl\", \"x\")\n\nx()\n",
        FileKind::Bzl,
        "load",
    );
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("already been loaded"));
}

#[test]
fn unused_load_opt_out_with_comment() {
    let ws = warnings_for(
        "load(\":a.bzl\", \"unused\")  # @unused\n",
        FileKind::Bzl,
        "load",
    );
    assert!(ws.is_empty());
}

#[test]
fn aliased_load_counts_local_name() {
    // `b` is the bound name; using it makes the binding used.
    let ws = warnings_for(
        "load(\":a.bzl\", b = \"c\")\n\nb()\n",
        FileKind::Bzl,
        "load",
    );
    assert!(ws.is_empty());
}

// ---------------------------------------------------------------------------
// load-on-top
// ---------------------------------------------------------------------------

#[test]
fn load_on_top_warns() {
    let ws = warnings_for(
        "x = 1\nload(\":a.bzl\", \"a\")\n\na(x)\n",
        FileKind::Bzl,
        "load-on-top",
    );
    assert_eq!(ws.len(), 1);
    assert_eq!(ws[0].start.line, 2);
}

#[test]
fn load_on_top_fix_reorders() {
    let out = fixed_output(
        "x = 1\nload(\":a.bzl\", \"a\")\n\na(x)\n",
        FileKind::Bzl,
        "load-on-top",
    );
    assert!(out.starts_with("load(\":a.bzl\", \"a\")\n"));
    assert!(out.contains("x = 1"));
}

#[test]
fn docstring_may_precede_load() {
    let ws = warnings_for(
        "\"\"\"Module docstring.\"\"\"\n\nload(\":a.bzl\", \"a\")\n\na()\n",
        FileKind::Bzl,
        "load-on-top",
    );
    assert!(ws.is_empty());
}

// ---------------------------------------------------------------------------
// package-on-top / redefined-variable / unused-variable
// ---------------------------------------------------------------------------

#[test]
fn package_on_top_warns_after_rule() {
    let ws = warnings_for(
        "foo(name = \"a\")\n\npackage(default_visibility = [\"//visibility:public\"])\n",
        FileKind::Build,
        "package-on-top",
    );
    assert_eq!(ws.len(), 1);
}

#[test]
fn package_on_top_ok_when_first() {
    let ws = warnings_for(
        "package(default_visibility = [\"//visibility:public\"])\n\nfoo(name = \"a\")\n",
        FileKind::Build,
        "package-on-top",
    );
    assert!(ws.is_empty());
}

#[test]
fn redefined_variable_warns() {
    let ws = warnings_for("x = 1\nx = 2\n", FileKind::Bzl, "redefined-variable");
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("already been defined"));
}

#[test]
fn unused_variable_warns_in_build_files() {
    let ws = warnings_for("x = 1\ny = x\n", FileKind::Build, "unused-variable");
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("\"y\" is unused"));
}

#[test]
fn unused_variable_silent_outside_build_files() {
    let ws = warnings_for("x = 1\n", FileKind::Bzl, "unused-variable");
    assert!(ws.is_empty());
}

#[test]
fn unused_variable_opt_out_with_comment() {
    let ws = warnings_for(
        "x = 1  # @unused\n",
        FileKind::Build,
        "unused-variable",
    );
    assert!(ws.is_empty());
}

// ---------------------------------------------------------------------------
// no-effect
// ---------------------------------------------------------------------------

#[test]
fn no_effect_warns_on_bare_expression() {
    let ws = warnings_for("1 + 2\n", FileKind::Bzl, "no-effect");
    assert_eq!(ws.len(), 1);
}

#[test]
fn no_effect_allows_docstring_and_calls() {
    let ws = warnings_for(
        "\"\"\"Docstring.\"\"\"\n\nfoo()\n\ndef f():\n    \"\"\"Doc.\"\"\"\n    return 1\n",
        FileKind::Bzl,
        "no-effect",
    );
    assert!(ws.is_empty());
}

#[test]
fn no_effect_flags_comprehension_in_function() {
    let ws = warnings_for(
        "def f(items):\n    [print(x) for x in items]\n",
        FileKind::Bzl,
        "no-effect",
    );
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("for-loop"));
}

// ---------------------------------------------------------------------------
// constant-glob / positional-args / duplicated-name
// ---------------------------------------------------------------------------

#[test]
fn constant_glob_warns() {
    let ws = warnings_for(
        "srcs = glob([\"file.cc\", \"*.h\"])\n",
        FileKind::Build,
        "constant-glob",
    );
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("file.cc"));
}

#[test]
fn wildcard_glob_is_fine() {
    let ws = warnings_for("srcs = glob([\"*.cc\"])\n", FileKind::Build, "constant-glob");
    assert!(ws.is_empty());
}

#[test]
fn positional_args_warns() {
    let ws = warnings_for(
        "cc_library(\"name\")\n",
        FileKind::Build,
        "positional-args",
    );
    assert_eq!(ws.len(), 1);
}

#[test]
fn positional_args_allows_keyword_calls_and_exceptions() {
    let ws = warnings_for(
        "cc_library(name = \"x\")\n\nexports_files([\"a\"])\n",
        FileKind::Build,
        "positional-args",
    );
    assert!(ws.is_empty());
}

#[test]
fn positional_args_only_in_build_files() {
    let ws = warnings_for("f(1)\n", FileKind::Bzl, "positional-args");
    assert!(ws.is_empty());
}

#[test]
fn duplicated_name_warns() {
    let ws = warnings_for(
        "foo(name = \"a\")\n\nbar(name = \"a\")\n",
        FileKind::Build,
        "duplicated-name",
    );
    assert_eq!(ws.len(), 1);
    assert!(ws[0].message.contains("already found on line 1"));
}

// ---------------------------------------------------------------------------
// dict-concatenation / string-iteration
// ---------------------------------------------------------------------------

#[test]
fn dict_concatenation_warns() {
    let ws = warnings_for(
        "d = {}\nx = d + {\"k\": 1}\n",
        FileKind::Bzl,
        "dict-concatenation",
    );
    assert_eq!(ws.len(), 1);
}

#[test]
fn list_concatenation_is_fine() {
    let ws = warnings_for("x = [] + [1]\n", FileKind::Bzl, "dict-concatenation");
    assert!(ws.is_empty());
}

#[test]
fn string_iteration_warns_in_for() {
    let ws = warnings_for(
        "s = \"abc\"\n\ndef f():\n    for c in s:\n        print(c)\n",
        FileKind::Bzl,
        "string-iteration",
    );
    assert_eq!(ws.len(), 1);
}

#[test]
fn string_iteration_warns_in_builtins() {
    let ws = warnings_for("x = reversed(\"abc\")\n", FileKind::Bzl, "string-iteration");
    assert_eq!(ws.len(), 1);
}

// ---------------------------------------------------------------------------
// fixes keep layout flags consistent
// ---------------------------------------------------------------------------

#[test]
fn fix_output_reparses_identically() {
    let srcs = [
        ("x = 4 / 2\n", "integer-division"),
        ("load(\":a.bzl\", \"u\", \"v\")\n\nu()\n", "load"),
        ("x = 1\nload(\":a.bzl\", \"a\")\n\na(x)\n", "load-on-top"),
    ];
    for (src, category) in srcs {
        let out = fixed_output(src, FileKind::Bzl, category);
        let f = parse("pkg/defs.bzl", &out, FileKind::Bzl).expect("fixed output parses");
        assert_eq!(format_string(&f), out, "fix output not stable for {}", category);
    }
}
