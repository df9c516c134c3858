//! Recursive-descent parser for Starlark build files.
//!
//! The parser consumes the token stream from [`crate::tokenizer`] and builds
//! exactly one [`File`], or fails with a [`ParseError`] carrying every syntax
//! problem found. On an error it resynchronizes at the next statement
//! boundary to keep diagnosing, but a file with any error produces no tree.
//!
//! Comment redistribution happens in two places:
//!
//! - Whole-line comments at statement level are tokens; they flow through an
//!   explicit `(statements, last_statement)` accumulator ([`StmtAccum`])
//!   while statement lists are assembled. A comment directly below a
//!   statement lands in its `after` list; a comment separated by a blank
//!   line opens a standalone [`CommentBlock`]; a comment block directly
//!   above a statement merges into that statement's `before` list.
//! - End-of-line comments and comments inside brackets are collected by the
//!   scanner and reattached to the finished tree by position
//!   ([`assign_comments`]).

mod errors;

pub use errors::{ParseError, Result, SyntaxError};

use crate::layout::{force_compact, force_multi_line, force_multi_line_comprehension};
use crate::nodes::{
    AssignExpr, BinaryExpr, BranchStmt, CallExpr, Comment, CommentBlock, Comments, Comprehension,
    ConditionalExpr, DefStmt, DictExpr, DotExpr, End, Expr, File, FileKind, ForClause, ForStmt,
    Function, Ident, IfClause, IfStmt, IndexExpr, KeyValueExpr, LambdaExpr, ListExpr, LiteralExpr,
    LoadStmt, ParenExpr, Position, ReturnStmt, SetExpr, SliceExpr, StringExpr, TupleExpr,
    UnaryExpr,
};
use crate::tokenizer::{self, Token, TokenKind};

/// Give up on a file after this many syntax errors.
const MAX_ERRORS: usize = 20;

type PResult<T> = std::result::Result<T, SyntaxError>;

/// Parses a complete file.
pub fn parse_file(path: &str, src: &str, kind: FileKind) -> Result<File> {
    let scanned = tokenizer::scan(src)?;
    let mut p = Parser::new(scanned.tokens);
    let (stmts, _) = p.parse_stmts(true);
    if !p.errors.is_empty() {
        return Err(ParseError::Syntax(p.errors));
    }
    let mut file = File {
        path: path.to_owned(),
        kind,
        stmts,
        comments: Comments::default(),
    };
    assign_comments(&mut file, scanned.line_comments, scanned.suffix_comments);
    Ok(file)
}

/// Parses a single expression (comma lists allowed, so `1, 2` yields a
/// no-brackets tuple). Side comments are not attached.
pub fn parse_expr_text(src: &str) -> Result<Expr> {
    let scanned = tokenizer::scan(src)?;
    let mut p = Parser::new(scanned.tokens);
    let expr = p.parse_expr_list().map_err(|e| ParseError::Syntax(vec![e]))?;
    while p.at(TokenKind::Newline) {
        p.bump();
    }
    if !p.at(TokenKind::Eof) {
        let t = p.peek().clone();
        return Err(ParseError::Syntax(vec![SyntaxError::unexpected(
            t.pos,
            t.kind,
            &[TokenKind::Eof],
        )]));
    }
    Ok(expr)
}

// ============================================================================
// Statement accumulation
// ============================================================================

/// Whether a parsed statement group leaves the "last statement" reference
/// intact for future comment attachment, or severed (a blank line ended the
/// group).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NewLast {
    Normal,
    Severed,
}

/// The explicit `(statements, last_statement)` pair threaded through
/// statement-list assembly. `last` is always the index of the final element
/// when set.
#[derive(Default)]
struct StmtAccum {
    stmts: Vec<Expr>,
    last: Option<usize>,
}

impl StmtAccum {
    /// A comment line at statement level: append to the last statement's
    /// `after` list, opening a comment block first if attachment was severed.
    fn comment(&mut self, com: Comment) {
        if self.last.is_none() {
            self.stmts.push(Expr::CommentBlock(CommentBlock {
                comments: Comments::default(),
                start: com.start,
            }));
            self.last = Some(self.stmts.len() - 1);
        }
        let i = self.last.unwrap_or(0);
        self.stmts[i].comments_mut().after.push(com);
    }

    /// A blank line severs the last statement from future comments.
    fn blank(&mut self) {
        self.last = None;
    }

    /// Appends a parsed statement group.
    ///
    /// If the previous element is a comment block, its lines become `before`
    /// comments of the new statement; otherwise any `after` comments of the
    /// previous statement migrate to the new statement's `before` list
    /// (they sat directly above it in the source).
    fn push(&mut self, mut new_stmts: Vec<Expr>, new_last: NewLast) {
        if new_stmts.is_empty() {
            return;
        }
        if let Some(i) = self.last {
            if matches!(self.stmts[i], Expr::CommentBlock(_)) {
                if let Expr::CommentBlock(cb) = self.stmts.remove(i) {
                    new_stmts[0].comments_mut().before = cb.comments.after;
                }
            } else {
                let after = std::mem::take(&mut self.stmts[i].comments_mut().after);
                new_stmts[0].comments_mut().before = after;
            }
        }
        self.stmts.extend(new_stmts);
        self.last = match new_last {
            NewLast::Normal => Some(self.stmts.len() - 1),
            NewLast::Severed => None,
        };
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    errors: Vec<SyntaxError>,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Parser {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        ));
        Parser {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek2_kind(&self) -> TokenKind {
        self.tokens[(self.pos + 1).min(self.tokens.len() - 1)].kind
    }

    fn kind(&self) -> TokenKind {
        self.peek().kind
    }

    fn at(&self, kind: TokenKind) -> bool {
        self.kind() == kind
    }

    fn bump(&mut self) -> Token {
        let t = self.peek().clone();
        if t.kind != TokenKind::Eof {
            self.pos += 1;
        }
        t
    }

    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            let t = self.peek();
            Err(SyntaxError::unexpected(t.pos, t.kind, &[kind]))
        }
    }

    fn expect_newline(&mut self) -> PResult<()> {
        if self.at(TokenKind::Newline) {
            self.bump();
            Ok(())
        } else if self.at(TokenKind::Eof) {
            Ok(())
        } else {
            let t = self.peek();
            Err(SyntaxError::unexpected(
                t.pos,
                t.kind,
                &[TokenKind::Newline, TokenKind::Semi],
            ))
        }
    }

    /// Discards tokens until the next statement boundary, balancing any
    /// indented blocks passed over.
    fn recover(&mut self) {
        let mut depth = 0usize;
        loop {
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::Indent => {
                    depth += 1;
                    self.bump();
                }
                TokenKind::Unindent => {
                    if depth == 0 {
                        break;
                    }
                    depth -= 1;
                    self.bump();
                }
                TokenKind::Newline => {
                    self.bump();
                    if depth == 0 {
                        break;
                    }
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    /// Parses a statement list: the whole file (`top`) or an indented block
    /// (stops before the closing unindent). Returns the statements and
    /// whether the trailing comment attachment was severed.
    fn parse_stmts(&mut self, top: bool) -> (Vec<Expr>, bool) {
        let mut acc = StmtAccum::default();
        loop {
            if self.errors.len() >= MAX_ERRORS {
                break;
            }
            match self.kind() {
                TokenKind::Eof => break,
                TokenKind::Unindent => {
                    if top {
                        self.bump();
                    } else {
                        break;
                    }
                }
                TokenKind::Newline => {
                    self.bump();
                    acc.blank();
                }
                TokenKind::Comment => {
                    let t = self.bump();
                    if self.at(TokenKind::Newline) {
                        self.bump();
                    }
                    acc.comment(Comment {
                        start: t.pos,
                        token: t.text,
                    });
                }
                TokenKind::Indent => {
                    let t = self.peek().clone();
                    self.errors
                        .push(SyntaxError::unexpected(t.pos, t.kind, &[]));
                    self.bump();
                }
                _ => match self.parse_stmt_line() {
                    Ok((stmts, new_last)) => acc.push(stmts, new_last),
                    Err(e) => {
                        self.errors.push(e);
                        self.recover();
                    }
                },
            }
        }
        let severed = acc.last.is_none();
        (acc.stmts, severed)
    }

    /// Parses one source line's worth of statements: either a block
    /// statement (plus any comment blocks hoisted out of its body) or a
    /// semicolon-separated run of small statements.
    fn parse_stmt_line(&mut self) -> PResult<(Vec<Expr>, NewLast)> {
        match self.kind() {
            TokenKind::Def => {
                let (stmt, severed) = self.parse_def()?;
                Ok(self.finish_block(stmt, severed))
            }
            TokenKind::For => {
                let (stmt, severed) = self.parse_for()?;
                Ok(self.finish_block(stmt, severed))
            }
            TokenKind::If => {
                let (stmt, severed) = self.parse_if_chain()?;
                Ok(self.finish_block(stmt, severed))
            }
            _ => self.parse_simple_line(),
        }
    }

    /// Hoists dedented trailing comments out of a finished block statement.
    fn finish_block(&mut self, mut stmt: Expr, inner_severed: bool) -> (Vec<Expr>, NewLast) {
        let cbs = extract_trailing_comments(&mut stmt);
        let mut stmts = vec![stmt];
        if cbs.is_empty() {
            (stmts, NewLast::Normal)
        } else {
            stmts.extend(cbs);
            let last = if inner_severed {
                NewLast::Severed
            } else {
                NewLast::Normal
            };
            (stmts, last)
        }
    }

    fn parse_simple_line(&mut self) -> PResult<(Vec<Expr>, NewLast)> {
        let mut stmts = vec![self.parse_small_stmt()?];
        while self.at(TokenKind::Semi) {
            self.bump();
            if self.at(TokenKind::Newline) || self.at(TokenKind::Eof) {
                break;
            }
            stmts.push(self.parse_small_stmt()?);
        }
        self.expect_newline()?;
        Ok((stmts, NewLast::Normal))
    }

    fn parse_small_stmt(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Return => {
                let t = self.bump();
                let result = if starts_expr(self.kind()) {
                    Some(Box::new(self.parse_expr_list()?))
                } else {
                    None
                };
                Ok(Expr::Return(ReturnStmt {
                    comments: Comments::default(),
                    return_pos: t.pos,
                    result,
                }))
            }
            TokenKind::Break | TokenKind::Continue | TokenKind::Pass => {
                let t = self.bump();
                Ok(Expr::Branch(BranchStmt {
                    comments: Comments::default(),
                    token: t.text,
                    token_pos: t.pos,
                }))
            }
            _ => {
                let x = self.parse_expr_list()?;
                match self.kind() {
                    TokenKind::Assign => {
                        let t = self.bump();
                        let rhs = self.parse_expr_list()?;
                        Ok(binary(x, t.pos, "=", rhs))
                    }
                    TokenKind::AugAssign => {
                        let t = self.bump();
                        let rhs = self.parse_expr_list()?;
                        let op = t.text.clone();
                        Ok(binary(x, t.pos, &op, rhs))
                    }
                    _ => Ok(x),
                }
            }
        }
    }

    fn parse_def(&mut self) -> PResult<(Expr, bool)> {
        let def_tok = self.bump();
        let name = self.expect(TokenKind::Ident)?;
        let lparen = self.expect(TokenKind::LParen)?;
        let mut params = Vec::new();
        while !self.at(TokenKind::RParen) {
            params.push(self.parse_param()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        let rparen = self.expect(TokenKind::RParen)?;
        let colon = self.expect(TokenKind::Colon)?;
        let (body, severed) = self.parse_suite()?;
        let stmt = DefStmt {
            comments: Comments::default(),
            force_compact: force_compact(lparen.pos, &params, rparen.pos),
            force_multi_line: force_multi_line(lparen.pos, &params, rparen.pos),
            function: Function {
                start_pos: def_tok.pos,
                params,
                body,
            },
            name: name.text,
            colon_pos: colon.pos,
        };
        Ok((Expr::Def(stmt), severed))
    }

    fn parse_param(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Star => {
                let t = self.bump();
                if self.at(TokenKind::Ident) {
                    let id = self.bump();
                    Ok(unary(t.pos, "*", ident_expr(id)))
                } else {
                    Ok(Expr::Unary(UnaryExpr {
                        comments: Comments::default(),
                        op_start: t.pos,
                        op: "*".to_owned(),
                        x: None,
                    }))
                }
            }
            TokenKind::StarStar => {
                let t = self.bump();
                let id = self.expect(TokenKind::Ident)?;
                Ok(unary(t.pos, "**", ident_expr(id)))
            }
            _ => {
                let id = self.expect(TokenKind::Ident)?;
                let ident = ident_expr(id);
                if self.at(TokenKind::Assign) {
                    let t = self.bump();
                    let value = self.parse_test()?;
                    Ok(binary(ident, t.pos, "=", value))
                } else {
                    Ok(ident)
                }
            }
        }
    }

    fn parse_for(&mut self) -> PResult<(Expr, bool)> {
        let for_tok = self.bump();
        let vars = self.parse_loop_vars()?;
        self.expect(TokenKind::In)?;
        let x = self.parse_test()?;
        self.expect(TokenKind::Colon)?;
        let (body, severed) = self.parse_suite()?;
        let stmt = ForStmt {
            comments: Comments::default(),
            for_pos: for_tok.pos,
            vars: Box::new(vars),
            x: Box::new(x),
            body,
        };
        Ok((Expr::For(stmt), severed))
    }

    fn parse_if_chain(&mut self) -> PResult<(Expr, bool)> {
        let if_tok = self.bump();
        let cond = self.parse_test()?;
        self.expect(TokenKind::Colon)?;
        let (true_body, mut severed) = self.parse_suite()?;
        let mut stmt = IfStmt {
            comments: Comments::default(),
            if_pos: if_tok.pos,
            cond: Box::new(cond),
            true_body,
            else_pos: End::default(),
            false_body: Vec::new(),
        };
        loop {
            if self.at(TokenKind::Elif) {
                let elif_tok = self.bump();
                let cond = self.parse_test()?;
                self.expect(TokenKind::Colon)?;
                let (body, s) = self.parse_suite()?;
                severed = s;
                let inner = IfStmt {
                    comments: Comments::default(),
                    if_pos: elif_tok.pos,
                    cond: Box::new(cond),
                    true_body: body,
                    else_pos: End::default(),
                    false_body: Vec::new(),
                };
                append_to_chain(&mut stmt, elif_tok.pos, vec![Expr::If(inner)]);
            } else if self.at(TokenKind::Else) {
                let else_tok = self.bump();
                self.expect(TokenKind::Colon)?;
                let (body, s) = self.parse_suite()?;
                severed = s;
                append_to_chain(&mut stmt, else_tok.pos, body);
                break;
            } else {
                break;
            }
        }
        Ok((Expr::If(stmt), severed))
    }

    /// Parses the suite after a `:`: either statements on the same line, or
    /// a newline, optional comment lines, and an indented block.
    fn parse_suite(&mut self) -> PResult<(Vec<Expr>, bool)> {
        if !self.at(TokenKind::Newline) {
            let (stmts, _) = self.parse_simple_line()?;
            return Ok((stmts, false));
        }
        self.bump();

        // Comment lines between the header and the indented block. Runs
        // separated by blank lines become separate comment blocks.
        let mut cbs: Vec<CommentBlock> = Vec::new();
        let mut open = false;
        loop {
            match self.kind() {
                TokenKind::Comment => {
                    let t = self.bump();
                    if self.at(TokenKind::Newline) {
                        self.bump();
                    }
                    if !open {
                        cbs.push(CommentBlock {
                            comments: Comments::default(),
                            start: t.pos,
                        });
                        open = true;
                    }
                    if let Some(cb) = cbs.last_mut() {
                        cb.comments.after.push(Comment {
                            start: t.pos,
                            token: t.text,
                        });
                    }
                }
                TokenKind::Newline => {
                    self.bump();
                    open = false;
                }
                _ => break,
            }
        }

        self.expect(TokenKind::Indent)?;
        let (mut stmts, severed) = self.parse_stmts(false);
        self.expect(TokenKind::Unindent)?;

        if !cbs.is_empty() {
            // If the first statement starts on the line right after the
            // last comment, the comment run documents that statement.
            if let Some(first) = stmts.first_mut() {
                let attach = cbs
                    .last()
                    .and_then(|cb| cb.comments.after.last())
                    .map(|c| first.span().0.line == c.start.line + 1)
                    .unwrap_or(false);
                if attach {
                    if let Some(cb) = cbs.pop() {
                        first.comments_mut().before = cb.comments.after;
                    }
                }
            }
            let mut all: Vec<Expr> = cbs.into_iter().map(Expr::CommentBlock).collect();
            all.extend(stmts);
            stmts = all;
        }
        Ok((stmts, severed))
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Parses `test (',' test)*`; a bare comma list becomes a tuple with
    /// `no_brackets` set so printing omits the parentheses.
    fn parse_expr_list(&mut self) -> PResult<Expr> {
        let first = self.parse_test()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut tuple = TupleExpr {
            no_brackets: true,
            force_compact: true,
            force_multi_line: false,
            list: vec![first],
            ..TupleExpr::default()
        };
        while self.at(TokenKind::Comma) {
            self.bump();
            tuple.list.push(self.parse_test()?);
        }
        Ok(Expr::Tuple(tuple))
    }

    fn parse_test(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::Lambda) {
            return self.parse_lambda();
        }
        let then = self.parse_or()?;
        if self.at(TokenKind::If) {
            let if_start = self.bump().pos;
            let test = self.parse_or()?;
            let else_start = self.expect(TokenKind::Else)?.pos;
            let else_ = self.parse_test()?;
            return Ok(Expr::Conditional(ConditionalExpr {
                comments: Comments::default(),
                then: Box::new(then),
                if_start,
                test: Box::new(test),
                else_start,
                else_: Box::new(else_),
            }));
        }
        Ok(then)
    }

    fn parse_lambda(&mut self) -> PResult<Expr> {
        let lambda_tok = self.bump();
        let mut params = Vec::new();
        while !self.at(TokenKind::Colon) {
            params.push(self.parse_param()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        self.expect(TokenKind::Colon)?;
        let body = self.parse_test()?;
        Ok(Expr::Lambda(LambdaExpr {
            comments: Comments::default(),
            function: Function {
                start_pos: lambda_tok.pos,
                params,
                body: vec![body],
            },
        }))
    }

    fn parse_or(&mut self) -> PResult<Expr> {
        let mut x = self.parse_and()?;
        while self.at(TokenKind::Or) {
            let t = self.bump();
            let y = self.parse_and()?;
            x = binary(x, t.pos, "or", y);
        }
        Ok(x)
    }

    fn parse_and(&mut self) -> PResult<Expr> {
        let mut x = self.parse_not()?;
        while self.at(TokenKind::And) {
            let t = self.bump();
            let y = self.parse_not()?;
            x = binary(x, t.pos, "and", y);
        }
        Ok(x)
    }

    fn parse_not(&mut self) -> PResult<Expr> {
        if self.at(TokenKind::Not) && self.peek2_kind() != TokenKind::In {
            let t = self.bump();
            let x = self.parse_not()?;
            return Ok(unary(t.pos, "not", x));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> PResult<Expr> {
        let mut x = self.parse_bitor()?;
        loop {
            let (op, pos) = match self.kind() {
                TokenKind::In => (String::from("in"), self.bump().pos),
                TokenKind::EqEq => (String::from("=="), self.bump().pos),
                TokenKind::Ne => (String::from("!="), self.bump().pos),
                TokenKind::Lt => (String::from("<"), self.bump().pos),
                TokenKind::Gt => (String::from(">"), self.bump().pos),
                TokenKind::Le => (String::from("<="), self.bump().pos),
                TokenKind::Ge => (String::from(">="), self.bump().pos),
                TokenKind::Not if self.peek2_kind() == TokenKind::In => {
                    // `x not in y` is a single binary operator.
                    let t = self.bump();
                    self.bump();
                    (String::from("not in"), t.pos)
                }
                TokenKind::Is => {
                    // `x is not y` likewise.
                    let t = self.bump();
                    if self.at(TokenKind::Not) {
                        self.bump();
                        (String::from("is not"), t.pos)
                    } else {
                        (String::from("is"), t.pos)
                    }
                }
                _ => break,
            };
            let y = self.parse_bitor()?;
            x = binary(x, pos, &op, y);
        }
        Ok(x)
    }

    fn parse_bitor(&mut self) -> PResult<Expr> {
        let mut x = self.parse_bitxor()?;
        while self.at(TokenKind::Pipe) {
            let t = self.bump();
            let y = self.parse_bitxor()?;
            x = binary(x, t.pos, "|", y);
        }
        Ok(x)
    }

    fn parse_bitxor(&mut self) -> PResult<Expr> {
        let mut x = self.parse_bitand()?;
        while self.at(TokenKind::Caret) {
            let t = self.bump();
            let y = self.parse_bitand()?;
            x = binary(x, t.pos, "^", y);
        }
        Ok(x)
    }

    fn parse_bitand(&mut self) -> PResult<Expr> {
        let mut x = self.parse_shift()?;
        while self.at(TokenKind::Amp) {
            let t = self.bump();
            let y = self.parse_shift()?;
            x = binary(x, t.pos, "&", y);
        }
        Ok(x)
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        let mut x = self.parse_arith()?;
        loop {
            let op = match self.kind() {
                TokenKind::LtLt => "<<",
                TokenKind::GtGt => ">>",
                _ => break,
            };
            let t = self.bump();
            let y = self.parse_arith()?;
            x = binary(x, t.pos, op, y);
        }
        Ok(x)
    }

    fn parse_arith(&mut self) -> PResult<Expr> {
        let mut x = self.parse_term()?;
        loop {
            let op = match self.kind() {
                TokenKind::Plus => "+",
                TokenKind::Minus => "-",
                _ => break,
            };
            let t = self.bump();
            let y = self.parse_term()?;
            x = binary(x, t.pos, op, y);
        }
        Ok(x)
    }

    fn parse_term(&mut self) -> PResult<Expr> {
        let mut x = self.parse_factor()?;
        loop {
            let op = match self.kind() {
                TokenKind::Star => "*",
                TokenKind::Slash => "/",
                TokenKind::SlashSlash => "//",
                TokenKind::Percent => "%",
                _ => break,
            };
            let t = self.bump();
            let y = self.parse_factor()?;
            x = binary(x, t.pos, op, y);
        }
        Ok(x)
    }

    fn parse_factor(&mut self) -> PResult<Expr> {
        let op = match self.kind() {
            TokenKind::Minus => "-",
            TokenKind::Plus => "+",
            TokenKind::Tilde => "~",
            _ => return self.parse_primary(),
        };
        let t = self.bump();
        let x = self.parse_factor()?;
        Ok(unary(t.pos, op, x))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let mut x = self.parse_operand()?;
        loop {
            match self.kind() {
                TokenKind::Dot => {
                    let dot = self.bump().pos;
                    let name = self.expect(TokenKind::Ident)?;
                    x = Expr::Dot(DotExpr {
                        comments: Comments::default(),
                        x: Box::new(x),
                        dot,
                        name_pos: name.pos,
                        name: name.text,
                    });
                }
                TokenKind::LParen => {
                    x = self.parse_call(x)?;
                }
                TokenKind::LBracket => {
                    x = self.parse_index_or_slice(x)?;
                }
                _ => break,
            }
        }
        Ok(x)
    }

    fn parse_call(&mut self, x: Expr) -> PResult<Expr> {
        let list_start = self.bump().pos;
        let mut list = Vec::new();
        while !self.at(TokenKind::RParen) {
            list.push(self.parse_arg()?);
            if self.at(TokenKind::Comma) {
                self.bump();
            } else {
                break;
            }
        }
        let rparen = self.expect(TokenKind::RParen)?;
        Ok(Expr::Call(CallExpr {
            comments: Comments::default(),
            x: Box::new(x),
            list_start,
            force_compact: force_compact(list_start, &list, rparen.pos),
            force_multi_line: force_multi_line(list_start, &list, rparen.pos),
            list,
            end: End {
                comments: Comments::default(),
                pos: rparen.pos,
            },
        }))
    }

    fn parse_arg(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Star => {
                let t = self.bump();
                let inner = self.parse_test()?;
                Ok(unary(t.pos, "*", inner))
            }
            TokenKind::StarStar => {
                let t = self.bump();
                let inner = self.parse_test()?;
                Ok(unary(t.pos, "**", inner))
            }
            _ => {
                let e = self.parse_test()?;
                if self.at(TokenKind::Assign) {
                    let t = self.bump();
                    let value = self.parse_test()?;
                    Ok(binary(e, t.pos, "=", value))
                } else {
                    Ok(e)
                }
            }
        }
    }

    fn parse_index_or_slice(&mut self, x: Expr) -> PResult<Expr> {
        let lbracket = self.bump().pos;
        let from = if self.at(TokenKind::Colon) {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        if self.at(TokenKind::RBracket) {
            let rbracket = self.bump();
            let y = match from {
                Some(y) => y,
                None => {
                    return Err(SyntaxError::unexpected(
                        rbracket.pos,
                        TokenKind::RBracket,
                        &[TokenKind::Ident, TokenKind::Number, TokenKind::Str],
                    ));
                }
            };
            return Ok(Expr::Index(IndexExpr {
                comments: Comments::default(),
                x: Box::new(x),
                index_start: lbracket,
                y,
                end: rbracket.pos,
            }));
        }
        let first_colon = self.expect(TokenKind::Colon)?.pos;
        let to = if self.at(TokenKind::Colon) || self.at(TokenKind::RBracket) {
            None
        } else {
            Some(Box::new(self.parse_test()?))
        };
        let (second_colon, step) = if self.at(TokenKind::Colon) {
            let colon = self.bump().pos;
            let step = if self.at(TokenKind::RBracket) {
                None
            } else {
                Some(Box::new(self.parse_test()?))
            };
            (Some(colon), step)
        } else {
            (None, None)
        };
        let rbracket = self.expect(TokenKind::RBracket)?;
        Ok(Expr::Slice(SliceExpr {
            comments: Comments::default(),
            x: Box::new(x),
            slice_start: lbracket,
            from,
            first_colon,
            to,
            second_colon,
            step,
            end: rbracket.pos,
        }))
    }

    fn parse_operand(&mut self) -> PResult<Expr> {
        match self.kind() {
            TokenKind::Ident => {
                let t = self.bump();
                Ok(ident_expr(t))
            }
            TokenKind::Number => self.parse_number(),
            TokenKind::Str => self.parse_strings(),
            TokenKind::Dot => {
                // `.5` style literal.
                let t = self.bump();
                let n = self.expect(TokenKind::Number)?;
                Ok(Expr::Literal(LiteralExpr {
                    comments: Comments::default(),
                    start: t.pos,
                    token: format!(".{}", n.text),
                }))
            }
            TokenKind::LBracket => self.parse_list_or_comp(),
            TokenKind::LBrace => self.parse_dict_set_or_comp(),
            TokenKind::LParen => self.parse_paren_or_tuple(),
            TokenKind::Load => self.parse_load(),
            TokenKind::Lambda => self.parse_lambda(),
            other => {
                let t = self.peek();
                Err(SyntaxError::unexpected(
                    t.pos,
                    other,
                    &[
                        TokenKind::Ident,
                        TokenKind::Number,
                        TokenKind::Str,
                        TokenKind::LParen,
                    ],
                ))
            }
        }
    }

    fn parse_number(&mut self) -> PResult<Expr> {
        let t = self.bump();
        let mut token = t.text;
        if self.at(TokenKind::Dot) {
            // Float literal assembled from digits-dot-digits.
            self.bump();
            token.push('.');
            if self.at(TokenKind::Number) {
                let frac = self.bump();
                token.push_str(&frac.text);
            }
        }
        Ok(Expr::Literal(LiteralExpr {
            comments: Comments::default(),
            start: t.pos,
            token,
        }))
    }

    /// Parses one or more adjacent string literals; implicit concatenation
    /// is folded eagerly into a `+` chain.
    fn parse_strings(&mut self) -> PResult<Expr> {
        let t = self.bump();
        let mut x = Expr::String(string_expr(t));
        while self.at(TokenKind::Str) {
            let t = self.bump();
            let s = string_expr(t);
            let pos = s.start;
            x = binary(x, pos, "+", Expr::String(s));
        }
        Ok(x)
    }

    fn parse_list_or_comp(&mut self) -> PResult<Expr> {
        let lbracket = self.bump().pos;
        if self.at(TokenKind::RBracket) {
            let rbracket = self.bump();
            return Ok(Expr::List(ListExpr {
                comments: Comments::default(),
                start: lbracket,
                list: Vec::new(),
                force_multi_line: force_multi_line(lbracket, &[], rbracket.pos),
                end: End {
                    comments: Comments::default(),
                    pos: rbracket.pos,
                },
            }));
        }
        let first = self.parse_test()?;
        if self.at(TokenKind::For) {
            let clauses = self.parse_comp_clauses()?;
            let rbracket = self.expect(TokenKind::RBracket)?;
            return Ok(Expr::Comprehension(Comprehension {
                comments: Comments::default(),
                curly: false,
                lbrack: lbracket,
                force_multi_line: force_multi_line_comprehension(
                    lbracket,
                    &first,
                    &clauses,
                    rbracket.pos,
                ),
                body: Box::new(first),
                clauses,
                end: End {
                    comments: Comments::default(),
                    pos: rbracket.pos,
                },
            }));
        }
        let mut list = vec![first];
        while self.at(TokenKind::Comma) {
            self.bump();
            if self.at(TokenKind::RBracket) {
                break;
            }
            list.push(self.parse_test()?);
        }
        let rbracket = self.expect(TokenKind::RBracket)?;
        Ok(Expr::List(ListExpr {
            comments: Comments::default(),
            start: lbracket,
            force_multi_line: force_multi_line(lbracket, &list, rbracket.pos),
            list,
            end: End {
                comments: Comments::default(),
                pos: rbracket.pos,
            },
        }))
    }

    fn parse_comp_clauses(&mut self) -> PResult<Vec<Expr>> {
        let mut clauses = Vec::new();
        loop {
            if self.at(TokenKind::For) {
                let for_pos = self.bump().pos;
                let vars = self.parse_loop_vars()?;
                let in_pos = self.expect(TokenKind::In)?.pos;
                let x = self.parse_or()?;
                clauses.push(Expr::ForClause(ForClause {
                    comments: Comments::default(),
                    for_pos,
                    vars: Box::new(vars),
                    in_pos,
                    x: Box::new(x),
                }));
            } else if self.at(TokenKind::If) {
                let if_pos = self.bump().pos;
                let cond = self.parse_or()?;
                clauses.push(Expr::IfClause(IfClause {
                    comments: Comments::default(),
                    if_pos,
                    cond: Box::new(cond),
                }));
            } else {
                break;
            }
        }
        Ok(clauses)
    }

    /// Parses loop variables: a primary expression or a bare comma list of
    /// them (a no-brackets tuple).
    fn parse_loop_vars(&mut self) -> PResult<Expr> {
        let first = self.parse_primary()?;
        if !self.at(TokenKind::Comma) {
            return Ok(first);
        }
        let mut tuple = TupleExpr {
            no_brackets: true,
            force_compact: true,
            force_multi_line: false,
            list: vec![first],
            ..TupleExpr::default()
        };
        while self.at(TokenKind::Comma) {
            self.bump();
            tuple.list.push(self.parse_primary()?);
        }
        Ok(Expr::Tuple(tuple))
    }

    fn parse_dict_set_or_comp(&mut self) -> PResult<Expr> {
        let lbrace = self.bump().pos;
        if self.at(TokenKind::RBrace) {
            let rbrace = self.bump();
            return Ok(Expr::Dict(DictExpr {
                comments: Comments::default(),
                start: lbrace,
                list: Vec::new(),
                force_multi_line: force_multi_line(lbrace, &[], rbrace.pos),
                end: End {
                    comments: Comments::default(),
                    pos: rbrace.pos,
                },
            }));
        }
        let first = self.parse_test()?;
        if self.at(TokenKind::Colon) {
            // Dict literal or dict comprehension.
            let colon = self.bump().pos;
            let value = self.parse_test()?;
            let kv = Expr::KeyValue(KeyValueExpr {
                comments: Comments::default(),
                key: Box::new(first),
                colon,
                value: Box::new(value),
            });
            if self.at(TokenKind::For) {
                let clauses = self.parse_comp_clauses()?;
                let rbrace = self.expect(TokenKind::RBrace)?;
                return Ok(Expr::Comprehension(Comprehension {
                    comments: Comments::default(),
                    curly: true,
                    lbrack: lbrace,
                    force_multi_line: force_multi_line_comprehension(
                        lbrace,
                        &kv,
                        &clauses,
                        rbrace.pos,
                    ),
                    body: Box::new(kv),
                    clauses,
                    end: End {
                        comments: Comments::default(),
                        pos: rbrace.pos,
                    },
                }));
            }
            let mut list = vec![kv];
            while self.at(TokenKind::Comma) {
                self.bump();
                if self.at(TokenKind::RBrace) {
                    break;
                }
                let key = self.parse_test()?;
                let colon = self.expect(TokenKind::Colon)?.pos;
                let value = self.parse_test()?;
                list.push(Expr::KeyValue(KeyValueExpr {
                    comments: Comments::default(),
                    key: Box::new(key),
                    colon,
                    value: Box::new(value),
                }));
            }
            let rbrace = self.expect(TokenKind::RBrace)?;
            return Ok(Expr::Dict(DictExpr {
                comments: Comments::default(),
                start: lbrace,
                force_multi_line: force_multi_line(lbrace, &list, rbrace.pos),
                list,
                end: End {
                    comments: Comments::default(),
                    pos: rbrace.pos,
                },
            }));
        }
        // Set literal or set comprehension.
        if self.at(TokenKind::For) {
            let clauses = self.parse_comp_clauses()?;
            let rbrace = self.expect(TokenKind::RBrace)?;
            return Ok(Expr::Comprehension(Comprehension {
                comments: Comments::default(),
                curly: true,
                lbrack: lbrace,
                force_multi_line: force_multi_line_comprehension(
                    lbrace,
                    &first,
                    &clauses,
                    rbrace.pos,
                ),
                body: Box::new(first),
                clauses,
                end: End {
                    comments: Comments::default(),
                    pos: rbrace.pos,
                },
            }));
        }
        let mut list = vec![first];
        while self.at(TokenKind::Comma) {
            self.bump();
            if self.at(TokenKind::RBrace) {
                break;
            }
            list.push(self.parse_test()?);
        }
        let rbrace = self.expect(TokenKind::RBrace)?;
        Ok(Expr::Set(SetExpr {
            comments: Comments::default(),
            start: lbrace,
            force_multi_line: force_multi_line(lbrace, &list, rbrace.pos),
            list,
            end: End {
                comments: Comments::default(),
                pos: rbrace.pos,
            },
        }))
    }

    fn parse_paren_or_tuple(&mut self) -> PResult<Expr> {
        let lparen = self.bump().pos;
        if self.at(TokenKind::RParen) {
            let rparen = self.bump();
            return Ok(Expr::Tuple(TupleExpr {
                comments: Comments::default(),
                start: lparen,
                list: Vec::new(),
                no_brackets: false,
                force_compact: false,
                force_multi_line: force_multi_line(lparen, &[], rparen.pos),
                end: End {
                    comments: Comments::default(),
                    pos: rparen.pos,
                },
            }));
        }
        let mut list = Vec::new();
        let mut trailing_comma = false;
        loop {
            list.push(self.parse_test()?);
            if self.at(TokenKind::Comma) {
                self.bump();
                if self.at(TokenKind::RParen) {
                    trailing_comma = true;
                    break;
                }
            } else {
                break;
            }
        }
        let rparen = self.expect(TokenKind::RParen)?;
        if list.len() == 1 && !trailing_comma {
            // Just a parenthesized expression, not a tuple.
            let force = force_multi_line(lparen, &list, rparen.pos);
            let x = list.remove(0);
            return Ok(Expr::Paren(ParenExpr {
                comments: Comments::default(),
                start: lparen,
                x: Box::new(x),
                force_multi_line: force,
                end: End {
                    comments: Comments::default(),
                    pos: rparen.pos,
                },
            }));
        }
        Ok(Expr::Tuple(TupleExpr {
            comments: Comments::default(),
            start: lparen,
            no_brackets: false,
            force_compact: force_compact(lparen, &list, rparen.pos),
            force_multi_line: force_multi_line(lparen, &list, rparen.pos),
            list,
            end: End {
                comments: Comments::default(),
                pos: rparen.pos,
            },
        }))
    }

    fn parse_load(&mut self) -> PResult<Expr> {
        let load_tok = self.bump();
        self.expect(TokenKind::LParen)?;
        let module_tok = self.expect(TokenKind::Str)?;
        let module = string_expr(module_tok);
        let mut from = Vec::new();
        let mut to = Vec::new();
        while self.at(TokenKind::Comma) {
            self.bump();
            if self.at(TokenKind::RParen) {
                break;
            }
            if self.at(TokenKind::Str) {
                let s = string_expr(self.bump());
                let name_pos = load_symbol_pos(&s);
                let id = Ident {
                    comments: Comments::default(),
                    name_pos,
                    name: s.value,
                };
                from.push(id.clone());
                to.push(id);
            } else {
                let local = self.expect(TokenKind::Ident)?;
                self.expect(TokenKind::Assign)?;
                let s = string_expr(self.expect(TokenKind::Str)?);
                let name_pos = load_symbol_pos(&s);
                from.push(Ident {
                    comments: Comments::default(),
                    name_pos,
                    name: s.value,
                });
                to.push(Ident {
                    comments: Comments::default(),
                    name_pos: local.pos,
                    name: local.text,
                });
            }
        }
        let rparen = self.expect(TokenKind::RParen)?;
        Ok(Expr::Load(LoadStmt {
            comments: Comments::default(),
            load: load_tok.pos,
            module,
            from,
            to,
            force_compact: load_tok.pos.line == rparen.pos.line,
            rparen: End {
                comments: Comments::default(),
                pos: rparen.pos,
            },
        }))
    }
}

// ============================================================================
// Node construction helpers
// ============================================================================

fn starts_expr(kind: TokenKind) -> bool {
    use TokenKind::*;
    matches!(
        kind,
        Ident
            | Number
            | Str
            | LParen
            | LBracket
            | LBrace
            | Minus
            | Plus
            | Tilde
            | Not
            | Lambda
            | Load
            | Dot
    )
}

fn ident_expr(t: Token) -> Expr {
    Expr::Ident(Ident {
        comments: Comments::default(),
        name_pos: t.pos,
        name: t.text,
    })
}

fn string_expr(t: Token) -> StringExpr {
    StringExpr {
        comments: Comments::default(),
        start: t.pos,
        value: t.value,
        triple_quote: t.triple,
        end: t.pos.add(&t.text),
        token: t.text,
    }
}

/// The position of a symbol name inside a quoted load argument.
fn load_symbol_pos(s: &StringExpr) -> Position {
    let mut pos = s.start.add("'");
    if s.triple_quote {
        pos = pos.add("''");
    }
    pos
}

/// Builds a unary expression.
fn unary(pos: Position, op: &str, x: Expr) -> Expr {
    Expr::Unary(UnaryExpr {
        comments: Comments::default(),
        op_start: pos,
        op: op.to_owned(),
        x: Some(Box::new(x)),
    })
}

/// Builds a binary or assignment expression with the given operands,
/// position and operator, recording whether the source broke the line
/// before the right operand.
fn binary(x: Expr, pos: Position, op: &str, y: Expr) -> Expr {
    let xend = x.span().1;
    let ystart = y.span().0;
    let line_break = xend.line < ystart.line;
    match op {
        "=" | "+=" | "-=" | "*=" | "/=" | "//=" | "%=" | "|=" | "&=" | "^=" | "<<=" | ">>=" => {
            Expr::Assign(AssignExpr {
                comments: Comments::default(),
                lhs: Box::new(x),
                op_pos: pos,
                op: op.to_owned(),
                line_break,
                rhs: Box::new(y),
            })
        }
        _ => Expr::Binary(BinaryExpr {
            comments: Comments::default(),
            x: Box::new(x),
            op_start: pos,
            op: op.to_owned(),
            line_break,
            y: Box::new(y),
        }),
    }
}

/// Walks an if/elif chain to its innermost link and installs the next
/// `elif`/`else` branch there.
fn append_to_chain(stmt: &mut IfStmt, else_pos: Position, false_body: Vec<Expr>) {
    if stmt.false_body.len() == 1 {
        if let Expr::If(next) = &mut stmt.false_body[0] {
            append_to_chain(next, else_pos, false_body);
            return;
        }
    }
    stmt.else_pos = End {
        comments: Comments::default(),
        pos: else_pos,
    };
    stmt.false_body = false_body;
}

/// The last body of a block statement: the only body of a `def` or `for`,
/// or the last branch of an if/elif/else chain.
fn get_last_body_mut(stmt: &mut Expr) -> Option<&mut Vec<Expr>> {
    match stmt {
        Expr::Def(d) => Some(&mut d.function.body),
        Expr::For(f) => Some(&mut f.body),
        Expr::If(i) => {
            if i.false_body.is_empty() {
                Some(&mut i.true_body)
            } else if i.false_body.len() == 1 && matches!(i.false_body[0], Expr::If(_)) {
                get_last_body_mut(&mut i.false_body[0])
            } else {
                Some(&mut i.false_body)
            }
        }
        _ => None,
    }
}

/// Extracts trailing comments of an indented block, starting with the first
/// comment line indented less than the block body. The extracted lines come
/// back as comment-block statements to reattach in the enclosing sequence.
fn extract_trailing_comments(stmt: &mut Expr) -> Vec<Expr> {
    let mut comments: Vec<Expr> = Vec::new();
    let Some(body) = get_last_body_mut(stmt) else {
        return comments;
    };
    if body.is_empty() {
        return comments;
    }
    let indentation = body[0].span().0.line_rune;

    let mut last_non_comment = None;
    for (i, s) in body.iter().enumerate() {
        if !matches!(s, Expr::CommentBlock(_)) {
            last_non_comment = Some(i);
        }
    }
    let Some(lnc) = last_non_comment else {
        return comments;
    };

    let mut i = lnc;
    while i < body.len() {
        if let Some(cb) = extract_dedented_comment(&mut body[i], indentation) {
            comments.push(cb);
            comments.extend(body.drain(i + 1..));
            if i > lnc && body[i].comments().after.is_empty() {
                // A comment block left with no lines disappears.
                body.truncate(i);
            }
        }
        i += 1;
    }
    comments
}

/// Splits off the first `after` comment line of `stmt` whose indentation is
/// smaller than `indentation`, along with all following lines, into a new
/// comment block. A zero column marks a comment added programmatically and
/// never splits.
fn extract_dedented_comment(stmt: &mut Expr, indentation: usize) -> Option<Expr> {
    let after = &mut stmt.comments_mut().after;
    for i in 0..after.len() {
        let line = &after[i];
        if line.start.line_rune > 0 && line.start.line_rune < indentation {
            let rest = after.split_off(i);
            return Some(Expr::CommentBlock(CommentBlock {
                start: rest[0].start,
                comments: Comments {
                    after: rest,
                    ..Comments::default()
                },
            }));
        }
    }
    None
}

// ============================================================================
// Post-parse comment assignment
// ============================================================================

type CommentCursor = std::iter::Peekable<std::vec::IntoIter<Comment>>;

/// Attaches the scanner's side comments to the finished tree.
///
/// Whole-line comments inside brackets become `before` comments of the first
/// node starting at or after them (or of the closing bracket). End-of-line
/// comments become `suffix` comments of the last node that ends on their
/// line.
fn assign_comments(file: &mut File, line: Vec<Comment>, suffix: Vec<Comment>) {
    let mut cur: CommentCursor = line.into_iter().peekable();
    for stmt in &mut file.stmts {
        assign_before(stmt, &mut cur);
    }
    file.comments.after.extend(cur);

    let mut rev: Vec<Comment> = suffix;
    rev.reverse();
    let mut cur: CommentCursor = rev.into_iter().peekable();
    for stmt in file.stmts.iter_mut().rev() {
        assign_suffix(stmt, &mut cur);
    }
    let mut rest: Vec<Comment> = cur.collect();
    rest.reverse();
    file.comments.after.extend(rest);
}

fn assign_before(x: &mut Expr, cur: &mut CommentCursor) {
    let start = x.span().0;
    while cur
        .peek()
        .map(|c| start.byte >= c.start.byte)
        .unwrap_or(false)
    {
        if let Some(c) = cur.next() {
            x.comments_mut().before.push(c);
        }
    }
    for child in x.children_mut() {
        assign_before(child, cur);
    }
    if let Expr::Load(l) = x {
        while cur
            .peek()
            .map(|c| l.module.start.byte >= c.start.byte)
            .unwrap_or(false)
        {
            if let Some(c) = cur.next() {
                l.module.comments.before.push(c);
            }
        }
        for id in &mut l.to {
            let pos = id.name_pos;
            while cur
                .peek()
                .map(|c| pos.byte >= c.start.byte)
                .unwrap_or(false)
            {
                if let Some(c) = cur.next() {
                    id.comments.before.push(c);
                }
            }
        }
    }
    if let Some(end) = x.end_mut() {
        while cur
            .peek()
            .map(|c| end.pos.byte >= c.start.byte)
            .unwrap_or(false)
        {
            if let Some(c) = cur.next() {
                end.comments.before.push(c);
            }
        }
    }
}

/// True if a suffix comment at `c` belongs to a node ending at `end`: the
/// node ends at or before the comment, on the same line.
fn suffix_matches(end: Position, c: &Comment) -> bool {
    end.byte <= c.start.byte && end.line == c.start.line
}

fn assign_suffix(x: &mut Expr, cur: &mut CommentCursor) {
    // Block statements span several lines; a comment at the end of their
    // last line belongs to the innermost statement ending there, not to the
    // block itself.
    let is_block = matches!(x, Expr::Def(_) | Expr::For(_) | Expr::If(_));
    if !is_block {
        let end = x.span().1;
        while cur.peek().map(|c| suffix_matches(end, c)).unwrap_or(false) {
            if let Some(c) = cur.next() {
                x.comments_mut().suffix.insert(0, c);
            }
        }
    }
    match x {
        Expr::Def(d) => {
            for child in d.function.body.iter_mut().rev() {
                assign_suffix(child, cur);
            }
            // A comment on the header line hangs off the statement itself:
            // no expression ends there when the parameter list is empty.
            let line = d.colon_pos.line;
            while cur
                .peek()
                .map(|c| c.start.line == line && d.colon_pos.byte <= c.start.byte)
                .unwrap_or(false)
            {
                if let Some(c) = cur.next() {
                    d.comments.suffix.insert(0, c);
                }
            }
            for child in d.function.params.iter_mut().rev() {
                assign_suffix(child, cur);
            }
        }
        Expr::If(i) => {
            for child in i.false_body.iter_mut().rev() {
                assign_suffix(child, cur);
            }
            // A comment on the `else:` line.
            if i.else_pos.pos.line > 0 {
                let line = i.else_pos.pos.line;
                while cur
                    .peek()
                    .map(|c| c.start.line == line && i.else_pos.pos.byte <= c.start.byte)
                    .unwrap_or(false)
                {
                    if let Some(c) = cur.next() {
                        i.else_pos.comments.suffix.insert(0, c);
                    }
                }
            }
            for child in i.true_body.iter_mut().rev() {
                assign_suffix(child, cur);
            }
            assign_suffix(&mut i.cond, cur);
        }
        Expr::Load(l) => {
            for (to, from) in l.to.iter_mut().zip(l.from.iter()).rev() {
                let from_end = from.name_pos.add(&from.name);
                while cur
                    .peek()
                    .map(|c| suffix_matches(from_end, c))
                    .unwrap_or(false)
                {
                    if let Some(c) = cur.next() {
                        to.comments.suffix.insert(0, c);
                    }
                }
            }
            while cur
                .peek()
                .map(|c| suffix_matches(l.module.end, c))
                .unwrap_or(false)
            {
                if let Some(c) = cur.next() {
                    l.module.comments.suffix.insert(0, c);
                }
            }
        }
        _ => {
            for child in x.children_mut().into_iter().rev() {
                assign_suffix(child, cur);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(src: &str) -> File {
        parse_file("test.star", src, FileKind::Default)
            .unwrap_or_else(|e| panic!("parse failed: {}", e))
    }

    #[test]
    fn paren_vs_one_tuple() {
        let f = parse("(1)\n(1,)\n");
        assert!(matches!(&f.stmts[0], Expr::Paren(_)));
        match &f.stmts[1] {
            Expr::Tuple(t) => {
                assert_eq!(t.list.len(), 1);
                assert!(!t.no_brackets);
            }
            other => panic!("expected tuple, got {:?}", other.kind()),
        }
    }

    #[test]
    fn no_brackets_tuple_assignment() {
        let f = parse("a, b = 1, 2\n");
        match &f.stmts[0] {
            Expr::Assign(a) => {
                match a.lhs.as_ref() {
                    Expr::Tuple(t) => {
                        assert!(t.no_brackets);
                        assert_eq!(t.list.len(), 2);
                    }
                    other => panic!("expected tuple lhs, got {:?}", other.kind()),
                }
                assert!(matches!(a.rhs.as_ref(), Expr::Tuple(t) if t.no_brackets));
            }
            other => panic!("expected assign, got {:?}", other.kind()),
        }
    }

    #[test]
    fn implicit_string_concat_folds_to_plus() {
        let f = parse("\"a\" \"b\"\n");
        match &f.stmts[0] {
            Expr::Binary(b) => {
                assert_eq!(b.op, "+");
                assert!(matches!(b.x.as_ref(), Expr::String(_)));
                assert!(matches!(b.y.as_ref(), Expr::String(_)));
            }
            other => panic!("expected binary, got {:?}", other.kind()),
        }
    }

    #[test]
    fn is_not_and_not_in_are_single_operators() {
        let f = parse("x is not y\nx not in y\n");
        assert!(matches!(&f.stmts[0], Expr::Binary(b) if b.op == "is not"));
        assert!(matches!(&f.stmts[1], Expr::Binary(b) if b.op == "not in"));
    }

    #[test]
    fn elif_chain_nests() {
        let f = parse("if a:\n    1\nelif b:\n    2\nelse:\n    3\n");
        match &f.stmts[0] {
            Expr::If(outer) => {
                assert_eq!(outer.false_body.len(), 1);
                match &outer.false_body[0] {
                    Expr::If(inner) => {
                        assert_eq!(inner.true_body.len(), 1);
                        assert_eq!(inner.false_body.len(), 1);
                        assert!(!matches!(inner.false_body[0], Expr::If(_)));
                    }
                    other => panic!("expected nested if, got {:?}", other.kind()),
                }
            }
            other => panic!("expected if, got {:?}", other.kind()),
        }
    }

    #[test]
    fn load_aliasing() {
        let f = parse("load(\":x.bzl\", \"a\", b = \"c\")\n");
        match &f.stmts[0] {
            Expr::Load(l) => {
                assert_eq!(l.module.value, ":x.bzl");
                assert_eq!(l.from.len(), 2);
                assert_eq!(l.to.len(), 2);
                assert_eq!((l.from[0].name.as_str(), l.to[0].name.as_str()), ("a", "a"));
                assert_eq!((l.from[1].name.as_str(), l.to[1].name.as_str()), ("c", "b"));
            }
            other => panic!("expected load, got {:?}", other.kind()),
        }
    }

    #[test]
    fn comment_reattaches_to_following_statement() {
        let f = parse("foo()\n# bar\nbaz()\n");
        assert_eq!(f.stmts.len(), 2);
        assert!(f.stmts[0].comments().after.is_empty());
        let before = &f.stmts[1].comments().before;
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].token, "# bar");
    }

    #[test]
    fn blank_line_then_comment_merges_into_next_statement() {
        // The comment block opened after the blank line sits directly above
        // baz(), so it documents baz().
        let f = parse("foo()\n\n# bar\nbaz()\n");
        assert_eq!(f.stmts.len(), 2);
        assert!(f.stmts[0].comments().after.is_empty());
        assert_eq!(f.stmts[1].comments().before[0].token, "# bar");
    }

    #[test]
    fn blank_line_after_comment_leaves_standalone_block() {
        let f = parse("foo()\n\n# bar\n\nbaz()\n");
        assert_eq!(f.stmts.len(), 3);
        match &f.stmts[1] {
            Expr::CommentBlock(cb) => {
                assert_eq!(cb.comments.after.len(), 1);
                assert_eq!(cb.comments.after[0].token, "# bar");
            }
            other => panic!("expected comment block, got {:?}", other.kind()),
        }
    }

    #[test]
    fn trailing_comment_attaches_as_after() {
        let f = parse("foo()\n# tail\n");
        assert_eq!(f.stmts.len(), 1);
        assert_eq!(f.stmts[0].comments().after[0].token, "# tail");
    }

    #[test]
    fn dedented_comment_hoisted_out_of_block() {
        let f = parse("def f():\n    pass\n# tail\nfoo()\n");
        assert_eq!(f.stmts.len(), 2);
        match &f.stmts[0] {
            Expr::Def(d) => {
                assert_eq!(d.function.body.len(), 1);
                assert!(d.function.body[0].comments().after.is_empty());
            }
            other => panic!("expected def, got {:?}", other.kind()),
        }
        // The hoisted comment documents the following statement.
        assert_eq!(f.stmts[1].comments().before[0].token, "# tail");
    }

    #[test]
    fn suffix_comment_attaches_to_statement() {
        let f = parse("foo()  # note\n");
        assert_eq!(f.stmts[0].comments().suffix.len(), 1);
        assert_eq!(f.stmts[0].comments().suffix[0].token, "# note");
    }

    #[test]
    fn comment_inside_brackets_attaches_before_element() {
        let f = parse("x = [\n    # first\n    1,\n]\n");
        match &f.stmts[0] {
            Expr::Assign(a) => match a.rhs.as_ref() {
                Expr::List(l) => {
                    assert_eq!(l.list[0].comments().before[0].token, "# first");
                }
                other => panic!("expected list, got {:?}", other.kind()),
            },
            other => panic!("expected assign, got {:?}", other.kind()),
        }
    }

    #[test]
    fn error_reports_expected_tokens() {
        let err = parse_file("bad.star", "x = )\n", FileKind::Default).unwrap_err();
        let msg = err.message();
        assert!(msg.starts_with("syntax error: unexpected ')'"), "{}", msg);
        assert!(msg.contains("expecting"), "{}", msg);
    }

    #[test]
    fn error_recovery_reports_multiple_errors() {
        let err = parse_file("bad.star", "x = )\ny = ]\n", FileKind::Default).unwrap_err();
        match err {
            ParseError::Syntax(errors) => assert_eq!(errors.len(), 2),
            other => panic!("expected syntax errors, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_string_is_lex_error() {
        let err = parse_file("bad.star", "x = \"abc\n", FileKind::Default).unwrap_err();
        assert!(matches!(err, ParseError::Lex(_)));
    }

    #[test]
    fn spans_bound_children() {
        let f = parse("x = foo(1, [2, 3])\n");
        let (start, end) = f.stmts[0].span();
        fn check(x: &Expr, lo: Position, hi: Position) {
            let (s, e) = x.span();
            assert!(s.byte >= lo.byte && e.byte <= hi.byte, "{:?}", x.kind());
            assert!(s.byte <= e.byte);
            for c in x.children() {
                check(c, s, e);
            }
        }
        check(&f.stmts[0], start, end);
    }

    #[test]
    fn float_literal_composed() {
        let f = parse("x = 1.5\ny = .5\nz = 2.\n");
        assert!(matches!(&f.stmts[0], Expr::Assign(a)
            if matches!(a.rhs.as_ref(), Expr::Literal(l) if l.token == "1.5")));
        assert!(matches!(&f.stmts[1], Expr::Assign(a)
            if matches!(a.rhs.as_ref(), Expr::Literal(l) if l.token == ".5")));
        assert!(matches!(&f.stmts[2], Expr::Assign(a)
            if matches!(a.rhs.as_ref(), Expr::Literal(l) if l.token == "2.")));
    }

    #[test]
    fn single_element_multiline_comprehension_forced() {
        let f = parse("x = [\n    y\n    for y in z\n]\n");
        match &f.stmts[0] {
            Expr::Assign(a) => match a.rhs.as_ref() {
                Expr::Comprehension(c) => assert!(c.force_multi_line),
                other => panic!("expected comprehension, got {:?}", other.kind()),
            },
            other => panic!("expected assign, got {:?}", other.kind()),
        }
    }
}
