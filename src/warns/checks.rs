//! The warning catalog: one function per category.

use super::types::{LitType, TypeEnv};
use super::{make_finding, Finding};
use skylint_syntax::{
    contains_comment, used_symbols, used_symbols_file, walk_file, walk_file_mut, Expr, File,
    FileKind, Ident, Kind,
};
use std::collections::{HashMap, HashSet};

/// Functions whose calls traditionally take positional arguments.
const POSITIONAL_OK: &[&str] = &["distribs", "exports_files", "licenses", "print", "vardef"];

pub(crate) fn ident_comment_contains(id: &Ident, needle: &str) -> bool {
    id.comments
        .before
        .iter()
        .chain(&id.comments.suffix)
        .chain(&id.comments.after)
        .any(|c| c.token.contains(needle))
}

fn call_name(stmt: &Expr) -> Option<&str> {
    if let Expr::Call(c) = stmt {
        if let Expr::Ident(id) = c.x.as_ref() {
            return Some(&id.name);
        }
    }
    None
}

/// `positional-args`: all calls to rules or macros should pass arguments by
/// keyword.
pub(crate) fn positional_args(f: &File, _pkg: &str, stmt: &Expr) -> Option<Finding> {
    let msg = "All calls to rules or macros should pass arguments by keyword \
               (arg_name=value) syntax.";
    let name = call_name(stmt)?;
    if POSITIONAL_OK.contains(&name) {
        return None;
    }
    let Expr::Call(call) = stmt else {
        return None;
    };
    for arg in &call.list {
        if matches!(arg, Expr::Assign(a) if a.op == "=") {
            continue;
        }
        let (start, end) = arg.span();
        return Some(make_finding(
            &f.path,
            start,
            end,
            "positional-args",
            msg,
            true,
            None,
        ));
    }
    None
}

/// `constant-glob`: a glob pattern without a wildcard matches one file at
/// most and should be listed explicitly.
pub(crate) fn constant_glob(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    walk_file(f, &mut |expr, _| {
        let Expr::Call(call) = expr else {
            return;
        };
        if call_name(expr) != Some("glob") || call.list.is_empty() {
            return;
        }
        let Expr::List(patterns) = &call.list[0] else {
            return;
        };
        for pattern in &patterns.list {
            let Expr::String(s) = pattern else {
                continue;
            };
            if !s.value.contains('*') {
                let (start, end) = pattern.span();
                findings.push(make_finding(
                    &path,
                    start,
                    end,
                    "constant-glob",
                    &format!(
                        "Glob pattern `{}` has no wildcard ('*'). \
                         Constant patterns can be error-prone, move the file outside the glob.",
                        s.value
                    ),
                    true,
                    None,
                ));
                // At most one warning per glob.
                return;
            }
        }
    });
    findings
}

/// `integer-division`: `/` and `/=` are deprecated in favor of `//` and
/// `//=`. Fixable.
pub(crate) fn integer_division(f: &mut File, fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    walk_file_mut(f, &mut |expr| {
        let (start, end) = expr.span();
        match expr {
            Expr::Binary(b) if b.op == "/" => {
                if fix {
                    b.op = "//".to_owned();
                } else {
                    findings.push(make_finding(
                        &path,
                        start,
                        end,
                        "integer-division",
                        "The \"/\" operator for integer division is deprecated in favor of \"//\".",
                        true,
                        None,
                    ));
                }
            }
            Expr::Assign(a) if a.op == "/=" => {
                if fix {
                    a.op = "//=".to_owned();
                } else {
                    findings.push(make_finding(
                        &path,
                        start,
                        end,
                        "integer-division",
                        "The \"/=\" operator for integer division is deprecated in favor of \"//=\".",
                        true,
                        None,
                    ));
                }
            }
            _ => {}
        }
    });
    findings
}

/// `load`: a loaded symbol that is never used, or loaded twice. Fixable:
/// the binding is removed, and an empty load statement disappears. Disable
/// with a comment containing `@unused`.
pub(crate) fn unused_load(f: &mut File, fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    let used = used_symbols_file(f);
    let mut loaded: HashSet<String> = HashSet::new();

    let mut i = 0;
    while i < f.stmts.len() {
        if !matches!(f.stmts[i], Expr::Load(_)) {
            i += 1;
            continue;
        }
        let load_has_unused = contains_comment(&f.stmts[i], "@unused");
        let mut remove_stmt = false;
        if let Expr::Load(load) = &mut f.stmts[i] {
            let mut j = 0;
            while j < load.to.len() {
                let to_name = load.to[j].name.clone();
                let pair_unused = load_has_unused
                    || ident_comment_contains(&load.to[j], "@unused")
                    || ident_comment_contains(&load.from[j], "@unused");
                if loaded.contains(&to_name) {
                    // Already loaded earlier.
                    if fix {
                        load.to.remove(j);
                        load.from.remove(j);
                        continue;
                    }
                    let start = load.to[j].name_pos;
                    let end = start.add(&to_name);
                    findings.push(make_finding(
                        &path,
                        start,
                        end,
                        "load",
                        &format!(
                            "Symbol \"{}\" has already been loaded. Please remove it.",
                            to_name
                        ),
                        true,
                        None,
                    ));
                } else if !used.contains(&to_name) && !pair_unused {
                    if fix {
                        load.to.remove(j);
                        load.from.remove(j);
                        continue;
                    }
                    let start = load.to[j].name_pos;
                    let end = start.add(&to_name);
                    findings.push(make_finding(
                        &path,
                        start,
                        end,
                        "load",
                        &format!(
                            "Loaded symbol \"{}\" is unused. Please remove it.\n\
                             To disable the warning, add '@unused' in a comment.",
                            to_name
                        ),
                        true,
                        None,
                    ));
                }
                loaded.insert(to_name);
                j += 1;
            }
            remove_stmt = fix && load.to.is_empty();
        }
        if remove_stmt {
            f.stmts.remove(i);
        } else {
            i += 1;
        }
    }
    findings
}

/// `load-on-top`: load statements belong at the top of the file, after an
/// optional docstring. Fixable by reordering.
pub(crate) fn load_on_top(f: &mut File, fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    let mut first_stmt_index: Option<usize> = None;
    let mut i = 0;
    while i < f.stmts.len() {
        match f.stmts[i].kind() {
            Kind::String | Kind::CommentBlock => {
                // Docstrings and comment blocks may precede loads.
            }
            Kind::Load => {
                if let Some(first) = first_stmt_index {
                    if fix {
                        let load = f.stmts.remove(i);
                        f.stmts.insert(first, load);
                        first_stmt_index = Some(first + 1);
                    } else {
                        let (start, end) = f.stmts[i].span();
                        findings.push(make_finding(
                            &path,
                            start,
                            end,
                            "load-on-top",
                            "Load statements should be at the top of the file.",
                            true,
                            None,
                        ));
                    }
                }
            }
            _ => {
                if first_stmt_index.is_none() {
                    first_stmt_index = Some(i);
                }
            }
        }
        i += 1;
    }
    findings
}

/// `package-on-top`: the package declaration belongs before any rule call.
pub(crate) fn package_on_top(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut seen_rule = false;
    for stmt in &f.stmts {
        match stmt {
            Expr::String(_) | Expr::CommentBlock(_) | Expr::Assign(_) | Expr::Load(_) => continue,
            _ => {}
        }
        match call_name(stmt) {
            Some("package_group") | Some("licenses") => continue,
            Some("package") => {
                if !seen_rule {
                    return Vec::new();
                }
                let (start, end) = stmt.span();
                return vec![make_finding(
                    &f.path,
                    start,
                    end,
                    "package-on-top",
                    "Package declaration should be at the top of the file, after the load() \
                     statements, but before any call to a rule or a macro. \
                     package_group() and licenses() may be called before package().",
                    true,
                    None,
                )];
            }
            _ => {}
        }
        seen_rule = true;
    }
    Vec::new()
}

/// `redefined-variable`: reassigning a global is discouraged.
pub(crate) fn redefined_variable(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let mut defined: HashSet<String> = HashSet::new();
    for stmt in &f.stmts {
        let Expr::Assign(assign) = stmt else {
            continue;
        };
        if assign.op != "=" {
            continue;
        }
        let Expr::Ident(left) = assign.lhs.as_ref() else {
            continue;
        };
        if defined.contains(&left.name) {
            let (start, end) = assign.lhs.span();
            findings.push(make_finding(
                &f.path,
                start,
                end,
                "redefined-variable",
                &format!(
                    "Variable \"{}\" has already been defined. \
                     Redefining a global value is discouraged.\n\
                     Consider using a new variable instead.",
                    left.name
                ),
                true,
                None,
            ));
            continue;
        }
        defined.insert(left.name.clone());
    }
    findings
}

/// `unused-variable`: an assigned variable that is never read. BUILD files
/// only: in other files the symbol may be loaded elsewhere. Disable with a
/// comment containing `@unused`.
pub(crate) fn unused_variable(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    if f.kind != FileKind::Build {
        return findings;
    }
    let path = f.path.clone();
    unused_variable_check(&path, &f.stmts, &mut findings);
    findings
}

fn unused_variable_check(path: &str, stmts: &[Expr], findings: &mut Vec<Finding>) {
    let mut used: HashSet<String> = HashSet::new();
    for stmt in stmts {
        used.extend(used_symbols(stmt));
    }
    for stmt in stmts {
        if let Expr::Def(def) = stmt {
            unused_variable_check(path, &def.function.body, findings);
            continue;
        }
        let Expr::Assign(assign) = stmt else {
            continue;
        };
        if assign.op != "=" {
            continue;
        }
        let Expr::Ident(left) = assign.lhs.as_ref() else {
            continue;
        };
        if used.contains(&left.name) || contains_comment(stmt, "@unused") {
            continue;
        }
        let (start, end) = assign.lhs.span();
        findings.push(make_finding(
            path,
            start,
            end,
            "unused-variable",
            &format!(
                "Variable \"{}\" is unused. Please remove it.\n\
                 To disable the warning, add '@unused' in a comment.",
                left.name
            ),
            true,
            None,
        ));
    }
}

/// `no-effect`: an expression statement whose result is discarded.
pub(crate) fn no_effect(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    no_effect_statements(&path, &f.stmts, true, false, &mut findings);
    walk_file(f, &mut |expr, _| match expr {
        Expr::For(x) => no_effect_statements(&path, &x.body, false, false, &mut findings),
        Expr::Def(d) => no_effect_statements(&path, &d.function.body, false, true, &mut findings),
        Expr::If(i) => {
            no_effect_statements(&path, &i.true_body, false, false, &mut findings);
            no_effect_statements(&path, &i.false_body, false, false, &mut findings);
        }
        _ => {}
    });
    findings
}

fn no_effect_statements(
    path: &str,
    body: &[Expr],
    is_top_level: bool,
    is_func: bool,
    findings: &mut Vec<Finding>,
) {
    let mut seen_non_comment = false;
    for stmt in body {
        let (start, end) = stmt.span();
        if matches!(stmt, Expr::String(_)) && !seen_non_comment && (is_top_level || is_func) {
            // A docstring.
            seen_non_comment = true;
            continue;
        }
        if !matches!(stmt, Expr::CommentBlock(_)) {
            seen_non_comment = true;
        }
        match stmt {
            Expr::Def(_)
            | Expr::For(_)
            | Expr::If(_)
            | Expr::Load(_)
            | Expr::Return(_)
            | Expr::Call(_)
            | Expr::CommentBlock(_)
            | Expr::Branch(_)
            | Expr::Assign(_) => continue,
            Expr::Comprehension(comp) => {
                // List comprehensions are allowed at the top level.
                if !is_top_level || comp.curly {
                    findings.push(make_finding(
                        path,
                        start,
                        end,
                        "no-effect",
                        "Expression result is not used. \
                         Use a for-loop instead of a list comprehension.",
                        true,
                        None,
                    ));
                }
                continue;
            }
            _ => {}
        }
        findings.push(make_finding(
            path,
            start,
            end,
            "no-effect",
            "Expression result is not used.",
            true,
            None,
        ));
    }
}

/// `dict-concatenation`: `+` and `+=` on dictionaries are deprecated.
pub(crate) fn dict_concatenation(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    let types = TypeEnv::of_file(f);
    walk_file(f, &mut |expr, _| {
        let is_dict_concat = match expr {
            Expr::Binary(b) if b.op == "+" => {
                types.type_of(&b.x) == LitType::Dict || types.type_of(&b.y) == LitType::Dict
            }
            Expr::Assign(a) if a.op == "+=" => {
                types.type_of(&a.lhs) == LitType::Dict || types.type_of(&a.rhs) == LitType::Dict
            }
            _ => false,
        };
        if is_dict_concat {
            let (start, end) = expr.span();
            findings.push(make_finding(
                &path,
                start,
                end,
                "dict-concatenation",
                "Dictionary concatenation is deprecated.",
                true,
                None,
            ));
        }
    });
    findings
}

/// `string-iteration`: iterating over a string is deprecated.
pub(crate) fn string_iteration(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    let path = f.path.clone();
    let types = TypeEnv::of_file(f);
    let add = |findings: &mut Vec<Finding>, expr: &Expr| {
        let (start, end) = expr.span();
        findings.push(make_finding(
            &path,
            start,
            end,
            "string-iteration",
            "String iteration is deprecated.",
            true,
            None,
        ));
    };
    walk_file(f, &mut |expr, _| match expr {
        Expr::For(x) => {
            if types.type_of(&x.x) == LitType::Str {
                add(&mut findings, &x.x);
            }
        }
        Expr::ForClause(clause) => {
            if types.type_of(&clause.x) == LitType::Str {
                add(&mut findings, &clause.x);
            }
        }
        Expr::Call(call) => {
            let Some(name) = call_name(expr) else {
                return;
            };
            match name {
                "all" | "any" | "reversed" | "max" | "min" => {
                    if call.list.len() == 1 && types.type_of(&call.list[0]) == LitType::Str {
                        add(&mut findings, &call.list[0]);
                    }
                }
                "zip" => {
                    for arg in &call.list {
                        if types.type_of(arg) == LitType::Str {
                            add(&mut findings, arg);
                        }
                    }
                }
                _ => {}
            }
        }
        _ => {}
    });
    findings
}

/// `duplicated-name`: two rules in one BUILD file with the same name.
pub(crate) fn duplicated_name(f: &mut File, _fix: bool) -> Vec<Finding> {
    let mut findings = Vec::new();
    if f.kind != FileKind::Build {
        return findings;
    }
    let mut names: HashMap<String, usize> = HashMap::new();
    for stmt in &f.stmts {
        let Expr::Call(call) = stmt else {
            continue;
        };
        let mut name: Option<(String, &Expr)> = None;
        for arg in &call.list {
            if let Expr::Assign(a) = arg {
                if matches!(a.lhs.as_ref(), Expr::Ident(id) if id.name == "name") {
                    if let Expr::String(s) = a.rhs.as_ref() {
                        name = Some((s.value.clone(), arg));
                    }
                }
            }
        }
        let Some((name, name_node)) = name else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let (start, end) = name_node.span();
        if let Some(line) = names.get(&name) {
            findings.push(make_finding(
                &f.path,
                start,
                end,
                "duplicated-name",
                &format!(
                    "A rule with name `{}' was already found on line {}. \
                     Even if it's valid for the build system, this may confuse other tools. \
                     Please rename it and use different names.",
                    name, line
                ),
                true,
                None,
            ));
        } else {
            names.insert(name, start.line);
        }
    }
    findings
}
