//! skylint: a linter and formatter for Starlark build files.
//!
//! The parsing core lives in the `skylint-syntax` crate; this crate adds
//! the warning catalog, diagnostic reporting and the `skylint` binary.

// Core infrastructure - re-exported from skylint-syntax
pub use skylint_syntax as syntax;
pub use skylint_syntax::{
    format, format_string, parse, parse_build, parse_bzl, parse_default, parse_workspace,
    prettify_error, File, FileKind, ParseError,
};

pub mod diagnostics;
pub mod error;
pub mod warns;

pub use diagnostics::{Diagnostics, FileDiagnostics};
pub use error::{Result, SkylintError};
pub use warns::{all_warnings, file_warnings, fix_warnings, Finding};

use std::path::Path;

/// Detects the file kind from a file name: `BUILD` and `BUILD.*` are build
/// files, `WORKSPACE` and `WORKSPACE.*` are workspace files, `*.bzl` are
/// library files, everything else is formatted with source-faithful
/// grouping.
pub fn detect_file_kind(path: &Path) -> FileKind {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    let base = name.strip_suffix(".bazel").unwrap_or(name);
    if base == "BUILD" || base.starts_with("BUILD.") {
        return FileKind::Build;
    }
    if base == "WORKSPACE" || base.starts_with("WORKSPACE.") {
        return FileKind::Workspace;
    }
    if name.ends_with(".bzl") {
        return FileKind::Bzl;
    }
    FileKind::Default
}

/// Whether a file name looks like a Starlark build file worth processing
/// during directory traversal.
pub fn is_starlark_file(path: &Path) -> bool {
    let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
    matches!(detect_file_kind(path), FileKind::Build | FileKind::Workspace)
        || name.ends_with(".bzl")
        || name.ends_with(".star")
        || name.ends_with(".sky")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_file_kinds() {
        assert_eq!(detect_file_kind(&PathBuf::from("pkg/BUILD")), FileKind::Build);
        assert_eq!(
            detect_file_kind(&PathBuf::from("pkg/BUILD.bazel")),
            FileKind::Build
        );
        assert_eq!(
            detect_file_kind(&PathBuf::from("WORKSPACE")),
            FileKind::Workspace
        );
        assert_eq!(
            detect_file_kind(&PathBuf::from("defs/rules.bzl")),
            FileKind::Bzl
        );
        assert_eq!(
            detect_file_kind(&PathBuf::from("script.star")),
            FileKind::Default
        );
    }

    #[test]
    fn starlark_file_filter() {
        assert!(is_starlark_file(&PathBuf::from("BUILD")));
        assert!(is_starlark_file(&PathBuf::from("a/b/defs.bzl")));
        assert!(is_starlark_file(&PathBuf::from("x.star")));
        assert!(!is_starlark_file(&PathBuf::from("main.cc")));
        assert!(!is_starlark_file(&PathBuf::from("Makefile")));
    }
}
