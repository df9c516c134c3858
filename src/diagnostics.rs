//! Diagnostic reporting for the formatter and linter.
//!
//! [`Diagnostics`] aggregates per-file results and renders them either as
//! plain text (one warning per line) or as JSON for tooling.

use crate::warns::Finding;
use serde::Serialize;
use skylint_syntax::Position;
use std::collections::BTreeMap;
use std::fmt::Write as _;

/// Diagnostic information returned by the formatter and linter.
#[derive(Debug, Serialize)]
pub struct Diagnostics {
    /// Overall success: all files parsed, are formatted and have no
    /// warnings.
    pub success: bool,
    /// Diagnostics per file.
    pub files: Vec<FileDiagnostics>,
}

impl Diagnostics {
    pub fn new(files: Vec<FileDiagnostics>) -> Diagnostics {
        let success = files
            .iter()
            .all(|f| f.valid && f.formatted && f.warnings.is_empty());
        Diagnostics { success, files }
    }

    /// Renders as plain text or JSON.
    pub fn format(&self, json: bool, verbose: bool) -> String {
        if json {
            let rendered = if verbose {
                serde_json::to_string_pretty(self)
            } else {
                serde_json::to_string(self)
            };
            let mut out = rendered.unwrap_or_else(|_| String::from("{}"));
            out.push('\n');
            return out;
        }
        let mut out = String::new();
        for f in &self.files {
            for w in &f.warnings {
                let (open, close) = if w.actionable { ("(", ")") } else { ("[", "]") };
                let _ = writeln!(
                    out,
                    "{}:{}: {}: {} {}{}{}",
                    f.filename, w.start.line, w.category, w.message, open, w.url, close
                );
            }
            if !f.formatted {
                let rewrites: Vec<&str> = f.rewrites.keys().map(String::as_str).collect();
                let log = if rewrites.is_empty() {
                    String::new()
                } else {
                    format!(" {}", rewrites.join(" "))
                };
                let _ = writeln!(out, "{} # reformat{}", f.filename, log);
            }
        }
        out
    }
}

/// Diagnostics for one file.
#[derive(Debug, Serialize)]
pub struct FileDiagnostics {
    pub filename: String,
    pub formatted: bool,
    pub valid: bool,
    pub warnings: Vec<Warning>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub rewrites: BTreeMap<String, usize>,
}

impl FileDiagnostics {
    pub fn new(filename: &str, warnings: &[Finding]) -> FileDiagnostics {
        FileDiagnostics {
            filename: display_name(filename),
            formatted: true,
            valid: true,
            warnings: warnings.iter().map(Warning::from_finding).collect(),
            rewrites: BTreeMap::new(),
        }
    }

    /// Diagnostics for a file that failed to parse.
    pub fn invalid(filename: &str) -> FileDiagnostics {
        FileDiagnostics {
            filename: display_name(filename),
            formatted: false,
            valid: false,
            warnings: Vec::new(),
            rewrites: BTreeMap::new(),
        }
    }

    /// Records categories of applied rewrites.
    pub fn set_rewrites(&mut self, categories: BTreeMap<String, usize>) {
        for (category, count) in categories {
            if count > 0 {
                self.rewrites.insert(category, count);
            }
        }
    }
}

fn display_name(filename: &str) -> String {
    if filename.is_empty() {
        String::from("<stdin>")
    } else {
        filename.to_owned()
    }
}

/// One reported warning with line/column positions.
#[derive(Debug, Serialize)]
pub struct Warning {
    pub start: WarningPosition,
    pub end: WarningPosition,
    pub category: String,
    pub actionable: bool,
    pub message: String,
    pub url: String,
}

impl Warning {
    fn from_finding(f: &Finding) -> Warning {
        Warning {
            start: WarningPosition::from_position(f.start),
            end: WarningPosition::from_position(f.end),
            category: f.category.clone(),
            actionable: f.actionable,
            message: f.message.clone(),
            url: f.url.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WarningPosition {
    pub line: usize,
    pub column: usize,
}

impl WarningPosition {
    fn from_position(p: Position) -> WarningPosition {
        WarningPosition {
            line: p.line,
            column: p.line_rune,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finding() -> Finding {
        Finding {
            path: "pkg/BUILD".to_owned(),
            start: Position {
                byte: 0,
                line: 3,
                line_rune: 1,
            },
            end: Position {
                byte: 10,
                line: 3,
                line_rune: 11,
            },
            category: "integer-division".to_owned(),
            message: "The \"/\" operator is deprecated.".to_owned(),
            url: "https://example.invalid/warnings#integer-division".to_owned(),
            actionable: true,
            replacement: None,
        }
    }

    #[test]
    fn text_output_lists_warnings() {
        let d = Diagnostics::new(vec![FileDiagnostics::new("pkg/BUILD", &[finding()])]);
        assert!(!d.success);
        let text = d.format(false, false);
        assert!(text.contains("pkg/BUILD:3: integer-division:"));
        assert!(text.contains("(https://"));
    }

    #[test]
    fn json_output_has_positions() {
        let d = Diagnostics::new(vec![FileDiagnostics::new("pkg/BUILD", &[finding()])]);
        let json = d.format(true, false);
        let v: serde_json::Value = serde_json::from_str(json.trim()).expect("valid json");
        assert_eq!(v["success"], false);
        assert_eq!(v["files"][0]["warnings"][0]["start"]["line"], 3);
    }

    #[test]
    fn unformatted_file_reported() {
        let mut fd = FileDiagnostics::new("pkg/BUILD", &[]);
        fd.formatted = false;
        let d = Diagnostics::new(vec![fd]);
        let text = d.format(false, false);
        assert!(text.contains("pkg/BUILD # reformat"));
    }

    #[test]
    fn empty_filename_becomes_stdin() {
        let fd = FileDiagnostics::invalid("");
        assert_eq!(fd.filename, "<stdin>");
    }

    #[test]
    fn success_requires_all_clean() {
        let d = Diagnostics::new(vec![FileDiagnostics::new("a", &[])]);
        assert!(d.success);
        let d = Diagnostics::new(vec![
            FileDiagnostics::new("a", &[]),
            FileDiagnostics::invalid("b"),
        ]);
        assert!(!d.success);
    }
}
