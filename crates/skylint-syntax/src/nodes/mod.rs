//! The concrete syntax tree for Starlark build files.
//!
//! Every node records the exact source extent it was parsed from and carries
//! a [`Comments`] attachment, so an unmodified tree reprints faithfully.
//! Statements and expressions share one [`Expr`] enum: in this language a
//! statement position may hold any expression, and block statements nest
//! freely inside files and function bodies.
//!
//! Nodes are built once by the parser and are plain mutable data afterwards;
//! a lint fix may rewrite fields freely and recompute the layout flags with
//! the functions in [`crate::layout`].

use serde::Serialize;

pub use crate::tokenizer::Position;

/// A single comment line, including the leading `#`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub start: Position,
    pub token: String,
}

/// Comments attached to a node.
///
/// `before` comments print on their own lines above the node, `suffix`
/// comments at the end of the node's last line, and `after` comments on
/// their own lines below (statement positions only).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Comments {
    pub before: Vec<Comment>,
    pub suffix: Vec<Comment>,
    pub after: Vec<Comment>,
}

/// The closing bracket of a bracketed expression: a position plus a place to
/// hang comments that appear on their own lines just before it.
#[derive(Debug, Clone, Default)]
pub struct End {
    pub comments: Comments,
    pub pos: Position,
}

/// The kind of file being parsed, which selects top-level statement grouping
/// in the printer and which lint checks apply.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FileKind {
    /// A `BUILD` file: a list of rule calls; top-level rules are separated
    /// by blank lines.
    Build,
    /// A `.bzl` library or extension file.
    Bzl,
    /// A `WORKSPACE` file.
    Workspace,
    /// Anything else, formatted with source-faithful grouping.
    #[default]
    Default,
}

/// A parsed file: an ordered sequence of top-level statements.
#[derive(Debug, Clone, Default)]
pub struct File {
    pub path: String,
    pub kind: FileKind,
    pub stmts: Vec<Expr>,
    /// File-level comments: leftovers that could not attach to a statement.
    pub comments: Comments,
}

impl File {
    /// The source span covered by the statements.
    pub fn span(&self) -> (Position, Position) {
        match (self.stmts.first(), self.stmts.last()) {
            (Some(first), Some(last)) => (first.span().0, last.span().1),
            _ => (Position::start(), Position::start()),
        }
    }
}

/// A number or other bare literal token, kept as raw text for exact
/// reprinting.
#[derive(Debug, Clone, Default)]
pub struct LiteralExpr {
    pub comments: Comments,
    pub start: Position,
    pub token: String,
}

/// An identifier.
#[derive(Debug, Clone, Default)]
pub struct Ident {
    pub comments: Comments,
    pub name_pos: Position,
    pub name: String,
}

impl Ident {
    /// An identifier created programmatically (no source position).
    pub fn with_name(name: &str) -> Ident {
        Ident {
            name: name.to_owned(),
            ..Ident::default()
        }
    }
}

/// A string literal. `token` holds the raw source text (quote style
/// preserved); an empty token means the node was built after parsing and
/// prints via [`crate::quote::quote`].
#[derive(Debug, Clone, Default)]
pub struct StringExpr {
    pub comments: Comments,
    pub start: Position,
    pub value: String,
    pub triple_quote: bool,
    pub end: Position,
    pub token: String,
}

/// A unary operation. `x` is absent for a bare `*` parameter.
#[derive(Debug, Clone)]
pub struct UnaryExpr {
    pub comments: Comments,
    pub op_start: Position,
    pub op: String,
    pub x: Option<Box<Expr>>,
}

/// A binary operation, including comparison and logic operators.
/// `line_break` records that the source put the right operand on a new line.
#[derive(Debug, Clone)]
pub struct BinaryExpr {
    pub comments: Comments,
    pub x: Box<Expr>,
    pub op_start: Position,
    pub op: String,
    pub line_break: bool,
    pub y: Box<Expr>,
}

/// An assignment or augmented assignment (`=`, `+=`, ...). Assignments are
/// statements, but also appear as named arguments in calls and parameter
/// defaults.
#[derive(Debug, Clone)]
pub struct AssignExpr {
    pub comments: Comments,
    pub lhs: Box<Expr>,
    pub op_pos: Position,
    pub op: String,
    pub line_break: bool,
    pub rhs: Box<Expr>,
}

/// A parenthesized single expression. A trailing comma would make it a
/// one-element [`TupleExpr`] instead; the two are distinct node kinds.
#[derive(Debug, Clone)]
pub struct ParenExpr {
    pub comments: Comments,
    pub start: Position,
    pub x: Box<Expr>,
    pub end: End,
    pub force_multi_line: bool,
}

/// A list literal.
#[derive(Debug, Clone, Default)]
pub struct ListExpr {
    pub comments: Comments,
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_multi_line: bool,
}

/// A set literal.
#[derive(Debug, Clone, Default)]
pub struct SetExpr {
    pub comments: Comments,
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_multi_line: bool,
}

/// A tuple. `no_brackets` marks a bare comma list (`a, b = ...`), which
/// prints without parentheses.
#[derive(Debug, Clone, Default)]
pub struct TupleExpr {
    pub comments: Comments,
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub no_brackets: bool,
    pub force_compact: bool,
    pub force_multi_line: bool,
}

/// A dict literal; the elements are [`KeyValueExpr`] nodes.
#[derive(Debug, Clone, Default)]
pub struct DictExpr {
    pub comments: Comments,
    pub start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_multi_line: bool,
}

/// A `key: value` pair inside a dict literal or dict comprehension.
#[derive(Debug, Clone)]
pub struct KeyValueExpr {
    pub comments: Comments,
    pub key: Box<Expr>,
    pub colon: Position,
    pub value: Box<Expr>,
}

/// A list (`[x for ...]`) or dict/set (`{... for ...}`) comprehension.
/// `clauses` holds [`ForClause`] and [`IfClause`] nodes in source order.
#[derive(Debug, Clone)]
pub struct Comprehension {
    pub comments: Comments,
    pub curly: bool,
    pub lbrack: Position,
    pub body: Box<Expr>,
    pub clauses: Vec<Expr>,
    pub end: End,
    pub force_multi_line: bool,
}

/// A `for x in y` clause of a comprehension.
#[derive(Debug, Clone)]
pub struct ForClause {
    pub comments: Comments,
    pub for_pos: Position,
    pub vars: Box<Expr>,
    pub in_pos: Position,
    pub x: Box<Expr>,
}

/// An `if cond` clause of a comprehension.
#[derive(Debug, Clone)]
pub struct IfClause {
    pub comments: Comments,
    pub if_pos: Position,
    pub cond: Box<Expr>,
}

/// A function or macro call.
#[derive(Debug, Clone)]
pub struct CallExpr {
    pub comments: Comments,
    pub x: Box<Expr>,
    pub list_start: Position,
    pub list: Vec<Expr>,
    pub end: End,
    pub force_compact: bool,
    pub force_multi_line: bool,
}

/// An index expression `x[y]`.
#[derive(Debug, Clone)]
pub struct IndexExpr {
    pub comments: Comments,
    pub x: Box<Expr>,
    pub index_start: Position,
    pub y: Box<Expr>,
    pub end: Position,
}

/// A slice expression `x[from:to]` or `x[from:to:step]`.
#[derive(Debug, Clone)]
pub struct SliceExpr {
    pub comments: Comments,
    pub x: Box<Expr>,
    pub slice_start: Position,
    pub from: Option<Box<Expr>>,
    pub first_colon: Position,
    pub to: Option<Box<Expr>>,
    pub second_colon: Option<Position>,
    pub step: Option<Box<Expr>>,
    pub end: Position,
}

/// A dotted attribute access `x.name`.
#[derive(Debug, Clone)]
pub struct DotExpr {
    pub comments: Comments,
    pub x: Box<Expr>,
    pub dot: Position,
    pub name_pos: Position,
    pub name: String,
}

/// A conditional expression `then if test else other`.
#[derive(Debug, Clone)]
pub struct ConditionalExpr {
    pub comments: Comments,
    pub then: Box<Expr>,
    pub if_start: Position,
    pub test: Box<Expr>,
    pub else_start: Position,
    pub else_: Box<Expr>,
}

/// The common shape of `def` and `lambda`: parameters plus a body.
#[derive(Debug, Clone, Default)]
pub struct Function {
    pub start_pos: Position,
    pub params: Vec<Expr>,
    pub body: Vec<Expr>,
}

/// A `lambda params: body` expression; the body is a single expression.
#[derive(Debug, Clone, Default)]
pub struct LambdaExpr {
    pub comments: Comments,
    pub function: Function,
}

/// A function definition statement.
#[derive(Debug, Clone, Default)]
pub struct DefStmt {
    pub comments: Comments,
    pub function: Function,
    pub name: String,
    pub colon_pos: Position,
    pub force_compact: bool,
    pub force_multi_line: bool,
}

/// A `for` loop statement.
#[derive(Debug, Clone)]
pub struct ForStmt {
    pub comments: Comments,
    pub for_pos: Position,
    pub vars: Box<Expr>,
    pub x: Box<Expr>,
    pub body: Vec<Expr>,
}

/// An `if` statement. An `elif` chain is represented by nesting: the
/// `false_body` of the outer `if` holds exactly one element, the next `if`
/// in the chain; a final `else` fills the innermost `false_body` directly.
#[derive(Debug, Clone)]
pub struct IfStmt {
    pub comments: Comments,
    pub if_pos: Position,
    pub cond: Box<Expr>,
    pub true_body: Vec<Expr>,
    pub else_pos: End,
    pub false_body: Vec<Expr>,
}

/// A `return` statement with an optional result.
#[derive(Debug, Clone, Default)]
pub struct ReturnStmt {
    pub comments: Comments,
    pub return_pos: Position,
    pub result: Option<Box<Expr>>,
}

/// A `break`, `continue` or `pass` statement.
#[derive(Debug, Clone, Default)]
pub struct BranchStmt {
    pub comments: Comments,
    pub token: String,
    pub token_pos: Position,
}

/// A `load()` statement. `from` and `to` are parallel vectors paired by
/// index: `to[i]` is the local name bound to the exported symbol `from[i]`.
/// An aliased entry `to = "from"` binds a different local name.
#[derive(Debug, Clone, Default)]
pub struct LoadStmt {
    pub comments: Comments,
    pub load: Position,
    pub module: StringExpr,
    pub from: Vec<Ident>,
    pub to: Vec<Ident>,
    pub rparen: End,
    pub force_compact: bool,
}

/// A statement-position node holding only comment lines (in its `after`
/// list), with no executable content.
#[derive(Debug, Clone, Default)]
pub struct CommentBlock {
    pub comments: Comments,
    pub start: Position,
}

/// A syntax tree node: any statement or expression.
#[allow(clippy::large_enum_variant)]
#[derive(Debug, Clone)]
pub enum Expr {
    Literal(LiteralExpr),
    Ident(Ident),
    String(StringExpr),
    Unary(UnaryExpr),
    Binary(BinaryExpr),
    Assign(AssignExpr),
    Paren(ParenExpr),
    List(ListExpr),
    Set(SetExpr),
    Tuple(TupleExpr),
    Dict(DictExpr),
    KeyValue(KeyValueExpr),
    Comprehension(Comprehension),
    ForClause(ForClause),
    IfClause(IfClause),
    Call(CallExpr),
    Index(IndexExpr),
    Slice(SliceExpr),
    Dot(DotExpr),
    Conditional(ConditionalExpr),
    Lambda(LambdaExpr),
    Def(DefStmt),
    For(ForStmt),
    If(IfStmt),
    Return(ReturnStmt),
    Branch(BranchStmt),
    Load(LoadStmt),
    CommentBlock(CommentBlock),
}

/// A fieldless tag for [`Expr`] variants, used in ancestor paths during
/// editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Literal,
    Ident,
    String,
    Unary,
    Binary,
    Assign,
    Paren,
    List,
    Set,
    Tuple,
    Dict,
    KeyValue,
    Comprehension,
    ForClause,
    IfClause,
    Call,
    Index,
    Slice,
    Dot,
    Conditional,
    Lambda,
    Def,
    For,
    If,
    Return,
    Branch,
    Load,
    CommentBlock,
}

impl Expr {
    /// The variant tag of this node.
    pub fn kind(&self) -> Kind {
        match self {
            Expr::Literal(_) => Kind::Literal,
            Expr::Ident(_) => Kind::Ident,
            Expr::String(_) => Kind::String,
            Expr::Unary(_) => Kind::Unary,
            Expr::Binary(_) => Kind::Binary,
            Expr::Assign(_) => Kind::Assign,
            Expr::Paren(_) => Kind::Paren,
            Expr::List(_) => Kind::List,
            Expr::Set(_) => Kind::Set,
            Expr::Tuple(_) => Kind::Tuple,
            Expr::Dict(_) => Kind::Dict,
            Expr::KeyValue(_) => Kind::KeyValue,
            Expr::Comprehension(_) => Kind::Comprehension,
            Expr::ForClause(_) => Kind::ForClause,
            Expr::IfClause(_) => Kind::IfClause,
            Expr::Call(_) => Kind::Call,
            Expr::Index(_) => Kind::Index,
            Expr::Slice(_) => Kind::Slice,
            Expr::Dot(_) => Kind::Dot,
            Expr::Conditional(_) => Kind::Conditional,
            Expr::Lambda(_) => Kind::Lambda,
            Expr::Def(_) => Kind::Def,
            Expr::For(_) => Kind::For,
            Expr::If(_) => Kind::If,
            Expr::Return(_) => Kind::Return,
            Expr::Branch(_) => Kind::Branch,
            Expr::Load(_) => Kind::Load,
            Expr::CommentBlock(_) => Kind::CommentBlock,
        }
    }

    /// The comments attached to this node.
    pub fn comments(&self) -> &Comments {
        match self {
            Expr::Literal(x) => &x.comments,
            Expr::Ident(x) => &x.comments,
            Expr::String(x) => &x.comments,
            Expr::Unary(x) => &x.comments,
            Expr::Binary(x) => &x.comments,
            Expr::Assign(x) => &x.comments,
            Expr::Paren(x) => &x.comments,
            Expr::List(x) => &x.comments,
            Expr::Set(x) => &x.comments,
            Expr::Tuple(x) => &x.comments,
            Expr::Dict(x) => &x.comments,
            Expr::KeyValue(x) => &x.comments,
            Expr::Comprehension(x) => &x.comments,
            Expr::ForClause(x) => &x.comments,
            Expr::IfClause(x) => &x.comments,
            Expr::Call(x) => &x.comments,
            Expr::Index(x) => &x.comments,
            Expr::Slice(x) => &x.comments,
            Expr::Dot(x) => &x.comments,
            Expr::Conditional(x) => &x.comments,
            Expr::Lambda(x) => &x.comments,
            Expr::Def(x) => &x.comments,
            Expr::For(x) => &x.comments,
            Expr::If(x) => &x.comments,
            Expr::Return(x) => &x.comments,
            Expr::Branch(x) => &x.comments,
            Expr::Load(x) => &x.comments,
            Expr::CommentBlock(x) => &x.comments,
        }
    }

    /// Mutable access to the comments attached to this node.
    pub fn comments_mut(&mut self) -> &mut Comments {
        match self {
            Expr::Literal(x) => &mut x.comments,
            Expr::Ident(x) => &mut x.comments,
            Expr::String(x) => &mut x.comments,
            Expr::Unary(x) => &mut x.comments,
            Expr::Binary(x) => &mut x.comments,
            Expr::Assign(x) => &mut x.comments,
            Expr::Paren(x) => &mut x.comments,
            Expr::List(x) => &mut x.comments,
            Expr::Set(x) => &mut x.comments,
            Expr::Tuple(x) => &mut x.comments,
            Expr::Dict(x) => &mut x.comments,
            Expr::KeyValue(x) => &mut x.comments,
            Expr::Comprehension(x) => &mut x.comments,
            Expr::ForClause(x) => &mut x.comments,
            Expr::IfClause(x) => &mut x.comments,
            Expr::Call(x) => &mut x.comments,
            Expr::Index(x) => &mut x.comments,
            Expr::Slice(x) => &mut x.comments,
            Expr::Dot(x) => &mut x.comments,
            Expr::Conditional(x) => &mut x.comments,
            Expr::Lambda(x) => &mut x.comments,
            Expr::Def(x) => &mut x.comments,
            Expr::For(x) => &mut x.comments,
            Expr::If(x) => &mut x.comments,
            Expr::Return(x) => &mut x.comments,
            Expr::Branch(x) => &mut x.comments,
            Expr::Load(x) => &mut x.comments,
            Expr::CommentBlock(x) => &mut x.comments,
        }
    }

    /// The exact source extent of this node: start and end positions.
    /// The end position bounds all child spans.
    pub fn span(&self) -> (Position, Position) {
        match self {
            Expr::Literal(x) => (x.start, x.start.add(&x.token)),
            Expr::Ident(x) => (x.name_pos, x.name_pos.add(&x.name)),
            Expr::String(x) => (x.start, x.end),
            Expr::Unary(x) => match &x.x {
                Some(inner) => (x.op_start, inner.span().1),
                None => (x.op_start, x.op_start.add(&x.op)),
            },
            Expr::Binary(x) => (x.x.span().0, x.y.span().1),
            Expr::Assign(x) => (x.lhs.span().0, x.rhs.span().1),
            Expr::Paren(x) => (x.start, x.end.pos.add(")")),
            Expr::List(x) => (x.start, x.end.pos.add("]")),
            Expr::Set(x) => (x.start, x.end.pos.add("}")),
            Expr::Tuple(x) => {
                if x.no_brackets {
                    match (x.list.first(), x.list.last()) {
                        (Some(first), Some(last)) => (first.span().0, last.span().1),
                        _ => (x.start, x.start),
                    }
                } else {
                    (x.start, x.end.pos.add(")"))
                }
            }
            Expr::Dict(x) => (x.start, x.end.pos.add("}")),
            Expr::KeyValue(x) => (x.key.span().0, x.value.span().1),
            Expr::Comprehension(x) => (x.lbrack, x.end.pos.add("]")),
            Expr::ForClause(x) => (x.for_pos, x.x.span().1),
            Expr::IfClause(x) => (x.if_pos, x.cond.span().1),
            Expr::Call(x) => (x.x.span().0, x.end.pos.add(")")),
            Expr::Index(x) => (x.x.span().0, x.end.add("]")),
            Expr::Slice(x) => (x.x.span().0, x.end.add("]")),
            Expr::Dot(x) => (x.x.span().0, x.name_pos.add(&x.name)),
            Expr::Conditional(x) => (x.then.span().0, x.else_.span().1),
            Expr::Lambda(x) => {
                let end = match x.function.body.first() {
                    Some(body) => body.span().1,
                    None => x.function.start_pos.add("lambda"),
                };
                (x.function.start_pos, end)
            }
            Expr::Def(x) => {
                let end = match x.function.body.last() {
                    Some(last) => last.span().1,
                    None => x.colon_pos.add(":"),
                };
                (x.function.start_pos, end)
            }
            Expr::For(x) => {
                let end = match x.body.last() {
                    Some(last) => last.span().1,
                    None => x.x.span().1,
                };
                (x.for_pos, end)
            }
            Expr::If(x) => {
                let end = match (x.false_body.last(), x.true_body.last()) {
                    (Some(last), _) => last.span().1,
                    (None, Some(last)) => last.span().1,
                    (None, None) => x.cond.span().1,
                };
                (x.if_pos, end)
            }
            Expr::Return(x) => match &x.result {
                Some(result) => (x.return_pos, result.span().1),
                None => (x.return_pos, x.return_pos.add("return")),
            },
            Expr::Branch(x) => (x.token_pos, x.token_pos.add(&x.token)),
            Expr::Load(x) => (x.load, x.rparen.pos.add(")")),
            Expr::CommentBlock(x) => (x.start, x.start),
        }
    }

    /// The direct children of this node, in source order.
    pub fn children(&self) -> Vec<&Expr> {
        let mut out: Vec<&Expr> = Vec::new();
        match self {
            Expr::Literal(_)
            | Expr::Ident(_)
            | Expr::String(_)
            | Expr::Branch(_)
            | Expr::Load(_)
            | Expr::CommentBlock(_) => {}
            Expr::Unary(x) => {
                if let Some(inner) = &x.x {
                    out.push(inner);
                }
            }
            Expr::Binary(x) => {
                out.push(&x.x);
                out.push(&x.y);
            }
            Expr::Assign(x) => {
                out.push(&x.lhs);
                out.push(&x.rhs);
            }
            Expr::Paren(x) => out.push(&x.x),
            Expr::List(x) => out.extend(x.list.iter()),
            Expr::Set(x) => out.extend(x.list.iter()),
            Expr::Tuple(x) => out.extend(x.list.iter()),
            Expr::Dict(x) => out.extend(x.list.iter()),
            Expr::KeyValue(x) => {
                out.push(&x.key);
                out.push(&x.value);
            }
            Expr::Comprehension(x) => {
                out.push(&x.body);
                out.extend(x.clauses.iter());
            }
            Expr::ForClause(x) => {
                out.push(&x.vars);
                out.push(&x.x);
            }
            Expr::IfClause(x) => out.push(&x.cond),
            Expr::Call(x) => {
                out.push(&x.x);
                out.extend(x.list.iter());
            }
            Expr::Index(x) => {
                out.push(&x.x);
                out.push(&x.y);
            }
            Expr::Slice(x) => {
                out.push(&x.x);
                if let Some(from) = &x.from {
                    out.push(from);
                }
                if let Some(to) = &x.to {
                    out.push(to);
                }
                if let Some(step) = &x.step {
                    out.push(step);
                }
            }
            Expr::Dot(x) => out.push(&x.x),
            Expr::Conditional(x) => {
                out.push(&x.then);
                out.push(&x.test);
                out.push(&x.else_);
            }
            Expr::Lambda(x) => {
                out.extend(x.function.params.iter());
                out.extend(x.function.body.iter());
            }
            Expr::Def(x) => {
                out.extend(x.function.params.iter());
                out.extend(x.function.body.iter());
            }
            Expr::For(x) => {
                out.push(&x.vars);
                out.push(&x.x);
                out.extend(x.body.iter());
            }
            Expr::If(x) => {
                out.push(&x.cond);
                out.extend(x.true_body.iter());
                out.extend(x.false_body.iter());
            }
            Expr::Return(x) => {
                if let Some(result) = &x.result {
                    out.push(result);
                }
            }
        }
        out
    }

    /// The direct children of this node as mutable references, in source
    /// order.
    pub fn children_mut(&mut self) -> Vec<&mut Expr> {
        let mut out: Vec<&mut Expr> = Vec::new();
        match self {
            Expr::Literal(_)
            | Expr::Ident(_)
            | Expr::String(_)
            | Expr::Branch(_)
            | Expr::Load(_)
            | Expr::CommentBlock(_) => {}
            Expr::Unary(x) => {
                if let Some(inner) = &mut x.x {
                    out.push(inner);
                }
            }
            Expr::Binary(x) => {
                out.push(&mut x.x);
                out.push(&mut x.y);
            }
            Expr::Assign(x) => {
                out.push(&mut x.lhs);
                out.push(&mut x.rhs);
            }
            Expr::Paren(x) => out.push(&mut x.x),
            Expr::List(x) => out.extend(x.list.iter_mut()),
            Expr::Set(x) => out.extend(x.list.iter_mut()),
            Expr::Tuple(x) => out.extend(x.list.iter_mut()),
            Expr::Dict(x) => out.extend(x.list.iter_mut()),
            Expr::KeyValue(x) => {
                out.push(&mut x.key);
                out.push(&mut x.value);
            }
            Expr::Comprehension(x) => {
                out.push(&mut x.body);
                out.extend(x.clauses.iter_mut());
            }
            Expr::ForClause(x) => {
                out.push(&mut x.vars);
                out.push(&mut x.x);
            }
            Expr::IfClause(x) => out.push(&mut x.cond),
            Expr::Call(x) => {
                out.push(&mut x.x);
                out.extend(x.list.iter_mut());
            }
            Expr::Index(x) => {
                out.push(&mut x.x);
                out.push(&mut x.y);
            }
            Expr::Slice(x) => {
                out.push(&mut x.x);
                if let Some(from) = &mut x.from {
                    out.push(from);
                }
                if let Some(to) = &mut x.to {
                    out.push(to);
                }
                if let Some(step) = &mut x.step {
                    out.push(step);
                }
            }
            Expr::Dot(x) => out.push(&mut x.x),
            Expr::Conditional(x) => {
                out.push(&mut x.then);
                out.push(&mut x.test);
                out.push(&mut x.else_);
            }
            Expr::Lambda(x) => {
                out.extend(x.function.params.iter_mut());
                out.extend(x.function.body.iter_mut());
            }
            Expr::Def(x) => {
                out.extend(x.function.params.iter_mut());
                out.extend(x.function.body.iter_mut());
            }
            Expr::For(x) => {
                out.push(&mut x.vars);
                out.push(&mut x.x);
                out.extend(x.body.iter_mut());
            }
            Expr::If(x) => {
                out.push(&mut x.cond);
                out.extend(x.true_body.iter_mut());
                out.extend(x.false_body.iter_mut());
            }
            Expr::Return(x) => {
                if let Some(result) = &mut x.result {
                    out.push(result);
                }
            }
        }
        out
    }

    /// Mutable access to the closing-bracket record of a bracketed node,
    /// if it has one.
    pub fn end_mut(&mut self) -> Option<&mut End> {
        match self {
            Expr::Paren(x) => Some(&mut x.end),
            Expr::List(x) => Some(&mut x.end),
            Expr::Set(x) => Some(&mut x.end),
            Expr::Tuple(x) if !x.no_brackets => Some(&mut x.end),
            Expr::Dict(x) => Some(&mut x.end),
            Expr::Comprehension(x) => Some(&mut x.end),
            Expr::Call(x) => Some(&mut x.end),
            Expr::Load(x) => Some(&mut x.rparen),
            _ => None,
        }
    }
}
