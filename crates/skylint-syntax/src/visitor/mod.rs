//! Generic traversal and rewriting over the syntax tree.
//!
//! [`walk`] visits every node in source order with its ancestor stack;
//! [`edit_file`] additionally lets the callback replace a node or delete it
//! from its enclosing sequence. Lint checks are built on these two
//! operations plus the comment accessors on the nodes themselves.

use crate::nodes::{Expr, File, Kind};
use std::collections::HashSet;

/// Visits `x` and every node below it in a preorder traversal, passing each
/// node and its ancestor stack (outermost first).
pub fn walk<'a, F>(x: &'a Expr, f: &mut F)
where
    F: FnMut(&'a Expr, &[&'a Expr]),
{
    let mut stack: Vec<&'a Expr> = Vec::new();
    walk_rec(x, &mut stack, f);
}

/// Visits every node of every top-level statement of a file.
pub fn walk_file<'a, F>(file: &'a File, f: &mut F)
where
    F: FnMut(&'a Expr, &[&'a Expr]),
{
    let mut stack: Vec<&'a Expr> = Vec::new();
    for stmt in &file.stmts {
        walk_rec(stmt, &mut stack, f);
    }
}

fn walk_rec<'a, F>(x: &'a Expr, stack: &mut Vec<&'a Expr>, f: &mut F)
where
    F: FnMut(&'a Expr, &[&'a Expr]),
{
    f(x, stack);
    stack.push(x);
    for child in x.children() {
        walk_rec(child, stack, f);
    }
    stack.pop();
}

/// Visits every node of every statement mutably, in preorder. For
/// structural rewrites (replacing or deleting nodes) use [`edit_file`];
/// this is for in-place field updates such as renaming an operator.
pub fn walk_file_mut<F>(file: &mut File, f: &mut F)
where
    F: FnMut(&mut Expr),
{
    for stmt in &mut file.stmts {
        walk_mut_rec(stmt, f);
    }
}

fn walk_mut_rec<F>(x: &mut Expr, f: &mut F)
where
    F: FnMut(&mut Expr),
{
    f(x);
    for child in x.children_mut() {
        walk_mut_rec(child, f);
    }
}

/// The result of an [`edit_file`] callback for one node.
#[derive(Debug)]
pub enum Rewrite {
    /// Keep the node and edit its children.
    Descend,
    /// Substitute the node in place; its children are not edited.
    Replace(Expr),
    /// Delete the node from its enclosing sequence (statement lists,
    /// sequence elements, call arguments, parameters, clauses). In a
    /// position that is not a sequence the node is kept and its children
    /// are edited.
    Remove,
}

/// Edits the tree in a preorder traversal. The callback sees each node and
/// the kinds of its ancestors (outermost first) and returns what to do with
/// it. A replacement subtree is not itself edited.
pub fn edit_file<F>(file: &mut File, f: &mut F)
where
    F: FnMut(&Expr, &[Kind]) -> Rewrite,
{
    let mut stack: Vec<Kind> = Vec::new();
    edit_vec(&mut file.stmts, &mut stack, f);
}

/// Edits a single expression tree in place; `Remove` behaves like `Descend`
/// at the root.
pub fn edit_expr<F>(x: &mut Expr, f: &mut F)
where
    F: FnMut(&Expr, &[Kind]) -> Rewrite,
{
    let mut stack: Vec<Kind> = Vec::new();
    edit_slot(x, &mut stack, f);
}

fn edit_vec<F>(list: &mut Vec<Expr>, stack: &mut Vec<Kind>, f: &mut F)
where
    F: FnMut(&Expr, &[Kind]) -> Rewrite,
{
    let mut i = 0;
    while i < list.len() {
        match f(&list[i], stack) {
            Rewrite::Remove => {
                list.remove(i);
            }
            Rewrite::Replace(new) => {
                list[i] = new;
                i += 1;
            }
            Rewrite::Descend => {
                edit_children(&mut list[i], stack, f);
                i += 1;
            }
        }
    }
}

fn edit_slot<F>(slot: &mut Expr, stack: &mut Vec<Kind>, f: &mut F)
where
    F: FnMut(&Expr, &[Kind]) -> Rewrite,
{
    match f(slot, stack) {
        Rewrite::Replace(new) => *slot = new,
        Rewrite::Descend | Rewrite::Remove => edit_children(slot, stack, f),
    }
}

fn edit_children<F>(x: &mut Expr, stack: &mut Vec<Kind>, f: &mut F)
where
    F: FnMut(&Expr, &[Kind]) -> Rewrite,
{
    stack.push(x.kind());
    match x {
        Expr::Literal(_)
        | Expr::Ident(_)
        | Expr::String(_)
        | Expr::Branch(_)
        | Expr::Load(_)
        | Expr::CommentBlock(_) => {}
        Expr::Unary(u) => {
            if let Some(inner) = &mut u.x {
                edit_slot(inner, stack, f);
            }
        }
        Expr::Binary(b) => {
            edit_slot(&mut b.x, stack, f);
            edit_slot(&mut b.y, stack, f);
        }
        Expr::Assign(a) => {
            edit_slot(&mut a.lhs, stack, f);
            edit_slot(&mut a.rhs, stack, f);
        }
        Expr::Paren(p) => edit_slot(&mut p.x, stack, f),
        Expr::List(l) => edit_vec(&mut l.list, stack, f),
        Expr::Set(s) => edit_vec(&mut s.list, stack, f),
        Expr::Tuple(t) => edit_vec(&mut t.list, stack, f),
        Expr::Dict(d) => edit_vec(&mut d.list, stack, f),
        Expr::KeyValue(kv) => {
            edit_slot(&mut kv.key, stack, f);
            edit_slot(&mut kv.value, stack, f);
        }
        Expr::Comprehension(c) => {
            edit_slot(&mut c.body, stack, f);
            edit_vec(&mut c.clauses, stack, f);
        }
        Expr::ForClause(fc) => {
            edit_slot(&mut fc.vars, stack, f);
            edit_slot(&mut fc.x, stack, f);
        }
        Expr::IfClause(ic) => edit_slot(&mut ic.cond, stack, f),
        Expr::Call(c) => {
            edit_slot(&mut c.x, stack, f);
            edit_vec(&mut c.list, stack, f);
        }
        Expr::Index(ix) => {
            edit_slot(&mut ix.x, stack, f);
            edit_slot(&mut ix.y, stack, f);
        }
        Expr::Slice(s) => {
            edit_slot(&mut s.x, stack, f);
            if let Some(from) = &mut s.from {
                edit_slot(from, stack, f);
            }
            if let Some(to) = &mut s.to {
                edit_slot(to, stack, f);
            }
            if let Some(step) = &mut s.step {
                edit_slot(step, stack, f);
            }
        }
        Expr::Dot(d) => edit_slot(&mut d.x, stack, f),
        Expr::Conditional(c) => {
            edit_slot(&mut c.then, stack, f);
            edit_slot(&mut c.test, stack, f);
            edit_slot(&mut c.else_, stack, f);
        }
        Expr::Lambda(l) => {
            edit_vec(&mut l.function.params, stack, f);
            edit_vec(&mut l.function.body, stack, f);
        }
        Expr::Def(d) => {
            edit_vec(&mut d.function.params, stack, f);
            edit_vec(&mut d.function.body, stack, f);
        }
        Expr::For(fo) => {
            edit_slot(&mut fo.vars, stack, f);
            edit_slot(&mut fo.x, stack, f);
            edit_vec(&mut fo.body, stack, f);
        }
        Expr::If(i) => {
            edit_slot(&mut i.cond, stack, f);
            edit_vec(&mut i.true_body, stack, f);
            edit_vec(&mut i.false_body, stack, f);
        }
        Expr::Return(r) => {
            if let Some(result) = &mut r.result {
                edit_slot(result, stack, f);
            }
        }
    }
    stack.pop();
}

/// The set of identifier names an expression uses (reads or calls).
/// Identifiers that are the direct target of an assignment do not count,
/// so `x = f(y)` uses `f` and `y` but not `x`.
pub fn used_symbols(x: &Expr) -> HashSet<String> {
    let mut out = HashSet::new();
    walk(x, &mut |node, stack| {
        let Expr::Ident(id) = node else {
            return;
        };
        if let Some(Expr::Assign(a)) = stack.last() {
            if std::ptr::eq(a.lhs.as_ref() as *const Expr, node as *const Expr) {
                return;
            }
        }
        out.insert(id.name.clone());
    });
    out
}

/// The set of identifier names used anywhere in a file.
pub fn used_symbols_file(file: &File) -> HashSet<String> {
    let mut out = HashSet::new();
    for stmt in &file.stmts {
        out.extend(used_symbols(stmt));
    }
    out
}

/// Reports whether any comment attached to `x` or one of its descendants
/// contains `needle`. Load statement bindings are included.
pub fn contains_comment(x: &Expr, needle: &str) -> bool {
    let mut found = false;
    walk(x, &mut |node, _| {
        let mut check = |token: &str| {
            if token.contains(needle) {
                found = true;
            }
        };
        let c = node.comments();
        for com in c.before.iter().chain(&c.suffix).chain(&c.after) {
            check(&com.token);
        }
        if let Expr::Load(l) = node {
            let idents = l.from.iter().chain(&l.to);
            for id in idents {
                let c = &id.comments;
                for com in c.before.iter().chain(&c.suffix).chain(&c.after) {
                    check(&com.token);
                }
            }
            let c = &l.module.comments;
            for com in c.before.iter().chain(&c.suffix).chain(&c.after) {
                check(&com.token);
            }
        }
    });
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::FileKind;
    use crate::parser::parse_file;
    use crate::printer::format_string;

    fn parse(src: &str) -> File {
        parse_file("test.star", src, FileKind::Default).expect("parse error")
    }

    #[test]
    fn walk_visits_in_source_order() {
        let f = parse("x = foo(1, [2, 3])\n");
        let mut kinds = Vec::new();
        walk_file(&f, &mut |node, _| kinds.push(node.kind()));
        assert_eq!(
            kinds,
            vec![
                Kind::Assign,
                Kind::Ident,
                Kind::Call,
                Kind::Ident,
                Kind::Literal,
                Kind::List,
                Kind::Literal,
                Kind::Literal,
            ]
        );
    }

    #[test]
    fn walk_reports_ancestors() {
        let f = parse("f(g(x))\n");
        let mut deepest = 0;
        walk_file(&f, &mut |node, stack| {
            if matches!(node, Expr::Ident(id) if id.name == "x") {
                deepest = stack.len();
            }
        });
        // x sits under two calls: f(...) and g(...).
        assert_eq!(deepest, 2);
    }

    #[test]
    fn edit_replaces_and_skips_replacement() {
        let mut f = parse("x = 1 / 2\n");
        edit_file(&mut f, &mut |node, _| match node {
            Expr::Binary(b) if b.op == "/" => {
                let mut new = b.clone();
                new.op = "//".to_owned();
                Rewrite::Replace(Expr::Binary(new))
            }
            _ => Rewrite::Descend,
        });
        assert_eq!(format_string(&f), "x = 1 // 2\n");
    }

    #[test]
    fn edit_removes_from_sequences() {
        let mut f = parse("f(1, 2, 3)\n");
        edit_file(&mut f, &mut |node, _| match node {
            Expr::Literal(l) if l.token == "2" => Rewrite::Remove,
            _ => Rewrite::Descend,
        });
        assert_eq!(format_string(&f), "f(1, 3)\n");
    }

    #[test]
    fn edit_removes_statements() {
        let mut f = parse("a = 1\nb = 2\n");
        edit_file(&mut f, &mut |node, stack| {
            if stack.is_empty() {
                if let Expr::Assign(a) = node {
                    if matches!(a.lhs.as_ref(), Expr::Ident(id) if id.name == "a") {
                        return Rewrite::Remove;
                    }
                }
            }
            Rewrite::Descend
        });
        assert_eq!(format_string(&f), "b = 2\n");
    }

    #[test]
    fn layout_flags_recomputed_after_edit() {
        use crate::layout::{force_compact, force_multi_line};
        let mut f = parse("f(\"a\", \"b\", \"c\")\n");
        edit_file(&mut f, &mut |node, _| match node {
            Expr::String(s) if s.value == "b" => Rewrite::Remove,
            _ => Rewrite::Descend,
        });
        // A fix that changes the element count re-derives the layout flags
        // from the remaining spans so reprinting stays idempotent.
        if let Expr::Call(c) = &mut f.stmts[0] {
            c.force_compact = force_compact(c.list_start, &c.list, c.end.pos);
            c.force_multi_line = force_multi_line(c.list_start, &c.list, c.end.pos);
            assert!(c.force_compact);
        }
        let printed = format_string(&f);
        assert_eq!(printed, "f(\"a\", \"c\")\n");
        let reparsed = parse(&printed);
        assert_eq!(format_string(&reparsed), printed);
    }

    #[test]
    fn used_symbols_skips_assignment_targets() {
        let f = parse("x = f(y)\n");
        let used = used_symbols_file(&f);
        assert!(used.contains("f"));
        assert!(used.contains("y"));
        assert!(!used.contains("x"));
    }

    #[test]
    fn contains_comment_sees_nested_comments() {
        let f = parse("x = [\n    1,  # keep this\n]\n");
        assert!(contains_comment(&f.stmts[0], "keep this"));
        assert!(!contains_comment(&f.stmts[0], "missing"));
    }
}
