//! Layout flag computation for bracketed expressions.
//!
//! These are pure functions over already-built spans: no I/O, no mutation.
//! The parser calls them while reducing, and any pass that mutates a
//! sequence (a lint fix adding or removing elements) must call them again so
//! that reprinting stays idempotent.

use crate::nodes::{Expr, Position};

/// Reports whether an expression is simple enough to appear in the compact
/// form of a sequence: a literal, identifier or string, a unary operator
/// applied to a literal or identifier, or an empty sequence.
pub fn is_simple_expression(expr: &Expr) -> bool {
    match expr {
        Expr::Literal(_) | Expr::String(_) | Expr::Ident(_) => true,
        Expr::Unary(x) => matches!(
            x.x.as_deref(),
            Some(Expr::Literal(_)) | Some(Expr::Ident(_))
        ),
        Expr::List(x) => x.list.is_empty(),
        Expr::Tuple(x) => x.list.is_empty(),
        Expr::Dict(x) => x.list.is_empty(),
        Expr::Set(x) => x.list.is_empty(),
        _ => false,
    }
}

/// Computes the `force_compact` flag for a call or tuple.
///
/// The field is called force *compact*, not force single line, because it
/// only affects the formatting of the call or tuple syntax itself, not of
/// the arguments: `call([\n 1,\n])` is still a compact call.
///
/// Start/end being on one line is not a usable signal here: reformatting an
/// embedded sequence can move the end to a different line, which would read
/// back differently and break idempotence. Instead the test is over
/// properties printing preserves: the opening bracket and the first element
/// share a line, and each element starts on the line the previous one ended.
pub fn force_compact(start: Position, list: &[Expr], end: Position) -> bool {
    if list.len() <= 1 {
        // The call or tuple will probably be compact anyway; don't force it.
        return false;
    }

    let mut line = start.line;
    for x in list {
        let (xstart, xend) = x.span();
        if xstart.line != line {
            return false;
        }
        line = xend.line;
        if !is_simple_expression(x) {
            return false;
        }
    }
    end.line == line
}

/// Computes the `force_multi_line` flag for a bracketed sequence.
///
/// Sequences with two or more elements are multi-line anyway when needed, so
/// the flag is never forced for them. An empty sequence is forced multi-line
/// when its brackets sit on different lines; a one-element sequence when the
/// author put a line break between a bracket and the element.
pub fn force_multi_line(start: Position, list: &[Expr], end: Position) -> bool {
    if list.len() > 1 {
        return false;
    }

    if list.is_empty() {
        // Empty list: use the bracket positions.
        return start.line != end.line;
    }

    // Single-element list.
    let (elem_start, elem_end) = list[0].span();
    start.line != elem_start.line || end.line != elem_end.line
}

/// Computes the `force_multi_line` flag for a comprehension: true if there
/// is a line break anywhere between the open bracket, the body, each
/// successive clause, and the close bracket.
pub fn force_multi_line_comprehension(
    start: Position,
    body: &Expr,
    clauses: &[Expr],
    end: Position,
) -> bool {
    let (body_start, body_end) = body.span();
    if start.line != body_start.line {
        return true;
    }
    let mut previous_end = body_end;
    for clause in clauses {
        let (clause_start, clause_end) = clause.span();
        if previous_end.line != clause_start.line {
            return true;
        }
        previous_end = clause_end;
    }
    previous_end.line != end.line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{Ident, StringExpr};

    fn pos(line: usize, col: usize) -> Position {
        Position {
            byte: 0,
            line,
            line_rune: col,
        }
    }

    fn str_at(line: usize, col: usize, value: &str) -> Expr {
        let start = pos(line, col);
        let token = format!("\"{}\"", value);
        Expr::String(StringExpr {
            start,
            value: value.to_owned(),
            end: start.add(&token),
            token,
            ..StringExpr::default()
        })
    }

    fn ident_at(line: usize, col: usize, name: &str) -> Expr {
        Expr::Ident(Ident {
            name_pos: pos(line, col),
            name: name.to_owned(),
            ..Ident::default()
        })
    }

    #[test]
    fn compact_simple_args_one_line() {
        // f("a", "b", "c") with the closing paren on the same line.
        let list = vec![str_at(1, 3, "a"), str_at(1, 8, "b"), str_at(1, 13, "c")];
        assert!(force_compact(pos(1, 2), &list, pos(1, 17)));
    }

    #[test]
    fn compact_rejects_multi_line_args() {
        let list = vec![str_at(1, 3, "a"), str_at(2, 5, "b")];
        assert!(!force_compact(pos(1, 2), &list, pos(2, 9)));
    }

    #[test]
    fn compact_rejects_single_element() {
        let list = vec![str_at(1, 3, "a")];
        assert!(!force_compact(pos(1, 2), &list, pos(1, 7)));
    }

    #[test]
    fn compact_rejects_complex_element() {
        use crate::nodes::CallExpr;
        let call = Expr::Call(CallExpr {
            comments: Default::default(),
            x: Box::new(ident_at(1, 8, "g")),
            list_start: pos(1, 9),
            list: vec![],
            end: crate::nodes::End {
                comments: Default::default(),
                pos: pos(1, 10),
            },
            force_compact: false,
            force_multi_line: false,
        });
        let list = vec![str_at(1, 3, "a"), call];
        assert!(!force_compact(pos(1, 2), &list, pos(1, 12)));
    }

    #[test]
    fn multi_line_empty_brackets() {
        assert!(!force_multi_line(pos(1, 1), &[], pos(1, 2)));
        assert!(force_multi_line(pos(1, 1), &[], pos(2, 1)));
    }

    #[test]
    fn multi_line_single_element() {
        // Element on the same line as both brackets: not forced.
        let list = vec![str_at(1, 2, "a")];
        assert!(!force_multi_line(pos(1, 1), &list, pos(1, 6)));
        // Open bracket on its own line: forced.
        let list = vec![str_at(2, 5, "a")];
        assert!(force_multi_line(pos(1, 1), &list, pos(3, 1)));
    }

    #[test]
    fn multi_line_two_elements_never_forced() {
        let list = vec![str_at(2, 5, "a"), str_at(3, 5, "b")];
        assert!(!force_multi_line(pos(1, 1), &list, pos(4, 1)));
    }

    #[test]
    fn comprehension_break_anywhere_forces() {
        let body = str_at(1, 2, "x");
        let clauses = vec![Expr::IfClause(crate::nodes::IfClause {
            comments: Default::default(),
            if_pos: pos(2, 5),
            cond: Box::new(ident_at(2, 8, "c")),
        })];
        assert!(force_multi_line_comprehension(
            pos(1, 1),
            &body,
            &clauses,
            pos(3, 1)
        ));
        let clauses = vec![Expr::IfClause(crate::nodes::IfClause {
            comments: Default::default(),
            if_pos: pos(1, 7),
            cond: Box::new(ident_at(1, 10, "c")),
        })];
        assert!(!force_multi_line_comprehension(
            pos(1, 1),
            &body,
            &clauses,
            pos(1, 11)
        ));
    }
}
