//! Lint warnings for Starlark build files.
//!
//! Each check inspects a parsed [`File`] and reports [`Finding`]s; checks
//! marked fixable rewrite the tree in place when run in fix mode, after
//! which the caller reprints the file. A warning can be suppressed for a
//! line with a comment containing `skylint: disable=<category>`.

mod checks;
mod types;

use skylint_syntax::{Expr, File, FileKind, Position};

/// A warning reported by the analyzer, with an optional suggested fix.
#[derive(Debug, Clone)]
pub struct Finding {
    pub path: String,
    pub start: Position,
    pub end: Position,
    pub category: String,
    pub message: String,
    pub url: String,
    /// Whether the user can act on the warning directly (as opposed to a
    /// purely informational note).
    pub actionable: bool,
    pub replacement: Option<Replacement>,
}

/// A suggested fix: replace the bytes between `start` and `end` with
/// `content`.
#[derive(Debug, Clone)]
pub struct Replacement {
    pub description: String,
    pub start: Position,
    pub end: Position,
    pub content: String,
}

fn doc_url(category: &str) -> String {
    format!(
        "https://github.com/skylint/skylint/blob/main/WARNINGS.md#{}",
        category
    )
}

fn make_finding(
    path: &str,
    start: Position,
    end: Position,
    category: &str,
    message: &str,
    actionable: bool,
    replacement: Option<Replacement>,
) -> Finding {
    Finding {
        path: path.to_owned(),
        start,
        end,
        category: category.to_owned(),
        url: doc_url(category),
        message: message.to_owned(),
        actionable,
        replacement,
    }
}

/// A check that runs over a whole file. In fix mode it may mutate the tree;
/// the findings returned are the problems that remain.
pub type FileWarningFn = fn(&mut File, bool) -> Vec<Finding>;

/// A check that runs on a single top-level rule of a BUILD file.
pub type RuleWarningFn = fn(&File, &str, &Expr) -> Option<Finding>;

/// The warnings that run on a whole file, by category.
pub const FILE_WARNINGS: &[(&str, FileWarningFn)] = &[
    ("constant-glob", checks::constant_glob),
    ("dict-concatenation", checks::dict_concatenation),
    ("duplicated-name", checks::duplicated_name),
    ("integer-division", checks::integer_division),
    ("load", checks::unused_load),
    ("load-on-top", checks::load_on_top),
    ("no-effect", checks::no_effect),
    ("package-on-top", checks::package_on_top),
    ("redefined-variable", checks::redefined_variable),
    ("string-iteration", checks::string_iteration),
    ("unused-variable", checks::unused_variable),
];

/// The warnings that run on a single rule. These apply to BUILD files only.
pub const RULE_WARNINGS: &[(&str, RuleWarningFn)] = &[("positional-args", checks::positional_args)];

/// All available warning categories, sorted.
pub fn all_warnings() -> Vec<&'static str> {
    let mut result: Vec<&'static str> = FILE_WARNINGS
        .iter()
        .map(|(name, _)| *name)
        .chain(RULE_WARNINGS.iter().map(|(name, _)| *name))
        .collect();
    result.sort_unstable();
    result
}

/// Reports whether any comment on `x` or a descendant matches `re`,
/// including comments hanging off load bindings.
fn comment_matches(x: &Expr, re: &regex::Regex) -> bool {
    let mut found = false;
    skylint_syntax::walk(x, &mut |node, _| {
        let c = node.comments();
        for com in c.before.iter().chain(&c.suffix).chain(&c.after) {
            if re.is_match(&com.token) {
                found = true;
            }
        }
        if let Expr::Load(l) = node {
            for id in l.from.iter().chain(&l.to) {
                let c = &id.comments;
                for com in c.before.iter().chain(&c.suffix).chain(&c.after) {
                    if re.is_match(&com.token) {
                        found = true;
                    }
                }
            }
        }
    });
    found
}

fn ident_comment_matches(id: &skylint_syntax::Ident, re: &regex::Regex) -> bool {
    id.comments
        .before
        .iter()
        .chain(&id.comments.suffix)
        .chain(&id.comments.after)
        .any(|c| re.is_match(&c.token))
}

/// Checks whether a warning was disabled with a comment of the form
/// `skylint: disable=<category>` on the warned line: on the statement
/// itself, inside the enclosing rule, or on a load binding.
pub fn disabled_warning(f: &File, finding: &Finding, category: &str) -> bool {
    let pattern = format!(r"skylint:\s*disable={}\b", regex::escape(category));
    let Ok(re) = regex::Regex::new(&pattern) else {
        return false;
    };
    let line = finding.start.line;

    for stmt in &f.stmts {
        if stmt.span().0.line == line && comment_matches(stmt, &re) {
            return true;
        }
        if let Expr::Call(rule) = stmt {
            for arg in &rule.list {
                if arg.span().0.line != line {
                    continue;
                }
                if comment_matches(stmt, &re) || comment_matches(arg, &re) {
                    return true;
                }
            }
        }
        if let Expr::Load(load) = stmt {
            let load_has_comment = comment_matches(stmt, &re);
            if load.module.start.line == line && load_has_comment {
                return true;
            }
            for (to, from) in load.to.iter().zip(load.from.iter()) {
                if to.name_pos.line == line || from.name_pos.line == line {
                    if load_has_comment
                        || ident_comment_matches(to, &re)
                        || ident_comment_matches(from, &re)
                    {
                        return true;
                    }
                }
            }
        }
    }
    false
}

/// Runs the enabled warnings over a file and returns the findings that are
/// not suppressed. In fix mode, fixable problems are repaired in the tree
/// and only the remaining findings come back.
pub fn file_warnings(f: &mut File, pkg: &str, enabled: &[String], fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    for warn in enabled {
        if let Some((_, check)) = FILE_WARNINGS.iter().find(|(name, _)| *name == warn.as_str()) {
            for w in check(f, fix) {
                if !disabled_warning(f, &w, warn) {
                    findings.push(w);
                }
            }
            continue;
        }
        if let Some((_, check)) = RULE_WARNINGS.iter().find(|(name, _)| *name == warn.as_str()) {
            if f.kind != FileKind::Build {
                continue;
            }
            for stmt in &f.stmts {
                if let Some(w) = check(f, pkg, stmt) {
                    if !disabled_warning(f, &w, warn) {
                        findings.push(w);
                    }
                }
            }
            continue;
        }
        tracing::warn!(warning = %warn, "unknown warning requested");
    }
    findings.sort_by_key(|w| (w.start.line, w.start.line_rune));
    findings
}

/// Fixes all warnings that can be fixed automatically; returns the
/// remaining findings.
pub fn fix_warnings(f: &mut File, pkg: &str, enabled: &[String]) -> Vec<Finding> {
    file_warnings(f, pkg, enabled, true)
}
