//! Tokenizer for Starlark build files.
//!
//! Converts raw source text into a stream of [`Token`]s with exact
//! [`Position`]s. The scanner tracks a logical indentation stack and
//! synthesizes [`TokenKind::Indent`] / [`TokenKind::Unindent`] tokens at
//! block boundaries, the way the parser wants to see them.
//!
//! Comment routing: a comment that starts its own line outside brackets is a
//! first-class [`TokenKind::Comment`] token (the parser attaches it to the
//! statement stream). All other comments (end-of-line comments, comments
//! inside brackets) cannot be expressed in the grammar; they are collected
//! into side lists and reattached to the syntax tree after parsing.

use crate::nodes::Comment;
use crate::quote;
use serde::Serialize;
use thiserror::Error;


/// A source position: byte offset, 1-based line, 1-based rune column.
///
/// Positions are the sole coordinate system for error reporting and for the
/// formatting decisions in [`crate::layout`]. A default (zeroed) position
/// marks a node that was created programmatically rather than parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Position {
    /// Byte offset into the source, starting at 0.
    pub byte: usize,
    /// Line number, starting at 1.
    pub line: usize,
    /// Rune column within the line, starting at 1.
    pub line_rune: usize,
}

impl Position {
    /// The position of the first byte of a file.
    pub fn start() -> Position {
        Position {
            byte: 0,
            line: 1,
            line_rune: 1,
        }
    }

    /// Returns the position advanced past the text `s`.
    pub fn add(self, s: &str) -> Position {
        let mut p = self;
        for c in s.chars() {
            p.byte += c.len_utf8();
            if c == '\n' {
                p.line += 1;
                p.line_rune = 1;
            } else {
                p.line_rune += 1;
            }
        }
        p
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.line_rune)
    }
}

/// The kind of a lexical token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Eof,
    Newline,
    Indent,
    Unindent,
    Comment,
    Ident,
    Number,
    Str,
    // Keywords.
    And,
    Or,
    Not,
    If,
    Elif,
    Else,
    For,
    In,
    Is,
    Def,
    Return,
    Break,
    Continue,
    Pass,
    Lambda,
    Load,
    // Punctuation and operators.
    Comma,
    Semi,
    Colon,
    Dot,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Assign,
    AugAssign,
    EqEq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Plus,
    Minus,
    Star,
    StarStar,
    Slash,
    SlashSlash,
    Percent,
    Pipe,
    Amp,
    Caret,
    Tilde,
    LtLt,
    GtGt,
}

impl TokenKind {
    /// Human-readable name used in "expecting ..." error messages.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Eof => "end of file",
            Newline => "newline",
            Indent => "indent",
            Unindent => "unindent",
            Comment => "comment",
            Ident => "identifier",
            Number => "number",
            Str => "string literal",
            And => "'and'",
            Or => "'or'",
            Not => "'not'",
            If => "'if'",
            Elif => "'elif'",
            Else => "'else'",
            For => "'for'",
            In => "'in'",
            Is => "'is'",
            Def => "'def'",
            Return => "'return'",
            Break => "'break'",
            Continue => "'continue'",
            Pass => "'pass'",
            Lambda => "'lambda'",
            Load => "'load'",
            Comma => "','",
            Semi => "';'",
            Colon => "':'",
            Dot => "'.'",
            LParen => "'('",
            RParen => "')'",
            LBracket => "'['",
            RBracket => "']'",
            LBrace => "'{'",
            RBrace => "'}'",
            Assign => "'='",
            AugAssign => "augmented assignment",
            EqEq => "'=='",
            Ne => "'!='",
            Lt => "'<'",
            Gt => "'>'",
            Le => "'<='",
            Ge => "'>='",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            StarStar => "'**'",
            Slash => "'/'",
            SlashSlash => "'//'",
            Percent => "'%'",
            Pipe => "'|'",
            Amp => "'&'",
            Caret => "'^'",
            Tilde => "'~'",
            LtLt => "'<<'",
            GtGt => "'>>'",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.describe())
    }
}

/// A lexical token with its raw text and source position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Raw source text of the token (the exact bytes, quotes included for
    /// strings). Empty for synthetic tokens.
    pub text: String,
    /// Decoded value for string tokens, empty otherwise.
    pub value: String,
    /// Whether a string token was triple quoted.
    pub triple: bool,
    /// Start position of the token.
    pub pos: Position,
}

impl Token {
    fn new(kind: TokenKind, text: &str, pos: Position) -> Token {
        Token {
            kind,
            text: text.to_owned(),
            value: String::new(),
            triple: false,
            pos,
        }
    }
}

/// The detailed reason for a [`LexError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexErrorKind {
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid escape sequence \\{0}")]
    InvalidEscape(char),
    #[error("unindent does not match any outer indentation level")]
    BadUnindent,
    #[error("invalid number literal `{0}`")]
    BadNumber(String),
    #[error("unexpected input character {0:?}")]
    UnexpectedChar(char),
}

/// A character-level scanning error. Always fatal for the file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{pos}: {kind}")]
pub struct LexError {
    pub pos: Position,
    pub kind: LexErrorKind,
}

/// The result of scanning a file: the token stream plus the comments that
/// are not representable as tokens and must be reattached after parsing.
#[derive(Debug)]
pub(crate) struct Scanned {
    pub tokens: Vec<Token>,
    /// Whole-line comments inside brackets, in source order.
    pub line_comments: Vec<Comment>,
    /// End-of-line comments following code, in source order.
    pub suffix_comments: Vec<Comment>,
}

/// Scans `src` into tokens, ending with an [`TokenKind::Eof`] token.
pub fn tokenize(src: &str) -> Result<Vec<Token>, LexError> {
    scan(src).map(|s| s.tokens)
}

pub(crate) fn scan(src: &str) -> Result<Scanned, LexError> {
    Scanner::new(src).run()
}

struct Scanner<'a> {
    src: &'a str,
    off: usize,
    pos: Position,
    /// Bracket nesting depth; newlines and indentation are ignored inside.
    depth: usize,
    /// Stack of indentation columns of enclosing blocks.
    indents: Vec<usize>,
    /// At the start of a physical line, nothing but whitespace seen yet.
    at_line_start: bool,
    /// A non-comment token has been produced on the current physical line.
    code_on_line: bool,
    tokens: Vec<Token>,
    line_comments: Vec<Comment>,
    suffix_comments: Vec<Comment>,
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn keyword(name: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match name {
        "and" => And,
        "or" => Or,
        "not" => Not,
        "if" => If,
        "elif" => Elif,
        "else" => Else,
        "for" => For,
        "in" => In,
        "is" => Is,
        "def" => Def,
        "return" => Return,
        "break" => Break,
        "continue" => Continue,
        "pass" => Pass,
        "lambda" => Lambda,
        "load" => Load,
        _ => return None,
    })
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Scanner<'a> {
        Scanner {
            src,
            off: 0,
            pos: Position::start(),
            depth: 0,
            indents: vec![0],
            at_line_start: true,
            code_on_line: false,
            tokens: Vec::new(),
            line_comments: Vec::new(),
            suffix_comments: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.off..].chars().next()
    }

    fn peek_at(&self, n: usize) -> Option<char> {
        self.src[self.off..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.off += c.len_utf8();
        if c == '\n' {
            self.pos.line += 1;
            self.pos.line_rune = 1;
        } else {
            self.pos.line_rune += 1;
        }
        self.pos.byte = self.off;
        Some(c)
    }

    fn err(&self, pos: Position, kind: LexErrorKind) -> LexError {
        debug_assert!(pos.byte <= self.src.len());
        LexError { pos, kind }
    }

    fn push(&mut self, kind: TokenKind, text: &str, pos: Position) {
        self.tokens.push(Token::new(kind, text, pos));
    }

    /// Consumes leading whitespace on a line and returns the indentation
    /// column (tab advances to the next multiple of 8).
    fn skip_indentation(&mut self) -> usize {
        let mut col = 0;
        while let Some(c) = self.peek() {
            match c {
                ' ' => col += 1,
                '\t' => col += 8 - col % 8,
                '\r' => {}
                _ => break,
            }
            self.bump();
        }
        col
    }

    /// Scans a comment starting at `#`, up to but excluding the newline.
    fn scan_comment(&mut self) -> Comment {
        let start = self.pos;
        let rest = &self.src.as_bytes()[self.off..];
        let end = memchr::memchr(b'\n', rest)
            .map(|i| self.off + i)
            .unwrap_or(self.src.len());
        let text = self.src[self.off..end].to_owned();
        while self.off < end {
            self.bump();
        }
        Comment { start, token: text }
    }

    fn scan_string(&mut self, q: char) -> Result<Token, LexError> {
        let start = self.pos;
        let start_off = self.off;
        self.bump();
        let triple = self.peek() == Some(q) && self.peek_at(1) == Some(q);
        if triple {
            self.bump();
            self.bump();
            loop {
                match self.peek() {
                    None => {
                        return Err(self.err(start, LexErrorKind::UnterminatedString));
                    }
                    Some('\\') => {
                        self.bump();
                        self.bump();
                    }
                    Some(c) if c == q => {
                        if self.peek_at(1) == Some(q) && self.peek_at(2) == Some(q) {
                            self.bump();
                            self.bump();
                            self.bump();
                            break;
                        }
                        self.bump();
                    }
                    Some(_) => {
                        self.bump();
                    }
                }
            }
        } else {
            loop {
                match self.peek() {
                    None | Some('\n') => {
                        return Err(self.err(start, LexErrorKind::UnterminatedString));
                    }
                    Some('\\') => {
                        self.bump();
                        self.bump();
                    }
                    Some(c) if c == q => {
                        self.bump();
                        break;
                    }
                    Some(_) => {
                        self.bump();
                    }
                }
            }
        }
        let raw = &self.src[start_off..self.off];
        let (value, _) = quote::unquote(raw).map_err(|kind| self.err(start, kind))?;
        Ok(Token {
            kind: TokenKind::Str,
            text: raw.to_owned(),
            value,
            triple,
            pos: start,
        })
    }

    fn scan_ident(&mut self) -> Token {
        let start = self.pos;
        let start_off = self.off;
        while let Some(c) = self.peek() {
            if !is_ident_continue(c) {
                break;
            }
            self.bump();
        }
        let text = &self.src[start_off..self.off];
        let kind = keyword(text).unwrap_or(TokenKind::Ident);
        Token::new(kind, text, start)
    }

    fn scan_number(&mut self) -> Result<Token, LexError> {
        let start = self.pos;
        let start_off = self.off;
        while let Some(c) = self.peek() {
            if !c.is_ascii_alphanumeric() {
                break;
            }
            self.bump();
        }
        let text = &self.src[start_off..self.off];
        let valid = if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X"))
        {
            !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit())
        } else if let Some(oct) = text.strip_prefix("0o").or_else(|| text.strip_prefix("0O")) {
            !oct.is_empty() && oct.bytes().all(|b| (b'0'..=b'7').contains(&b))
        } else if text.len() > 1 && text.starts_with('0') {
            // Legacy octal.
            text.bytes().all(|b| (b'0'..=b'7').contains(&b))
        } else {
            text.bytes().all(|b| b.is_ascii_digit())
        };
        if !valid {
            return Err(self.err(start, LexErrorKind::BadNumber(text.to_owned())));
        }
        Ok(Token::new(TokenKind::Number, text, start))
    }

    /// Scans an operator using longest match, maintaining bracket depth.
    fn scan_operator(&mut self, c: char) -> Result<(), LexError> {
        use TokenKind::*;
        let start = self.pos;
        self.bump();
        // Multi-character operators: match the longest prefix first.
        let next = self.peek();
        let (kind, text): (TokenKind, &str) = match (c, next) {
            ('(', _) => {
                self.depth += 1;
                (LParen, "(")
            }
            ('[', _) => {
                self.depth += 1;
                (LBracket, "[")
            }
            ('{', _) => {
                self.depth += 1;
                (LBrace, "{")
            }
            (')', _) => {
                self.depth = self.depth.saturating_sub(1);
                (RParen, ")")
            }
            (']', _) => {
                self.depth = self.depth.saturating_sub(1);
                (RBracket, "]")
            }
            ('}', _) => {
                self.depth = self.depth.saturating_sub(1);
                (RBrace, "}")
            }
            (',', _) => (Comma, ","),
            (';', _) => (Semi, ";"),
            (':', _) => (Colon, ":"),
            ('.', _) => (Dot, "."),
            ('+', Some('=')) => {
                self.bump();
                (AugAssign, "+=")
            }
            ('+', _) => (Plus, "+"),
            ('-', Some('=')) => {
                self.bump();
                (AugAssign, "-=")
            }
            ('-', _) => (Minus, "-"),
            ('*', Some('*')) => {
                self.bump();
                (StarStar, "**")
            }
            ('*', Some('=')) => {
                self.bump();
                (AugAssign, "*=")
            }
            ('*', _) => (Star, "*"),
            ('/', Some('/')) => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    (AugAssign, "//=")
                } else {
                    (SlashSlash, "//")
                }
            }
            ('/', Some('=')) => {
                self.bump();
                (AugAssign, "/=")
            }
            ('/', _) => (Slash, "/"),
            ('%', Some('=')) => {
                self.bump();
                (AugAssign, "%=")
            }
            ('%', _) => (Percent, "%"),
            ('=', Some('=')) => {
                self.bump();
                (EqEq, "==")
            }
            ('=', _) => (Assign, "="),
            ('!', Some('=')) => {
                self.bump();
                (Ne, "!=")
            }
            ('!', _) => {
                return Err(self.err(start, LexErrorKind::UnexpectedChar('!')));
            }
            ('<', Some('=')) => {
                self.bump();
                (Le, "<=")
            }
            ('<', Some('<')) => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    (AugAssign, "<<=")
                } else {
                    (LtLt, "<<")
                }
            }
            ('<', _) => (Lt, "<"),
            ('>', Some('=')) => {
                self.bump();
                (Ge, ">=")
            }
            ('>', Some('>')) => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    (AugAssign, ">>=")
                } else {
                    (GtGt, ">>")
                }
            }
            ('>', _) => (Gt, ">"),
            ('|', Some('=')) => {
                self.bump();
                (AugAssign, "|=")
            }
            ('|', _) => (Pipe, "|"),
            ('&', Some('=')) => {
                self.bump();
                (AugAssign, "&=")
            }
            ('&', _) => (Amp, "&"),
            ('^', Some('=')) => {
                self.bump();
                (AugAssign, "^=")
            }
            ('^', _) => (Caret, "^"),
            ('~', _) => (Tilde, "~"),
            _ => {
                return Err(self.err(start, LexErrorKind::UnexpectedChar(c)));
            }
        };
        self.push(kind, text, start);
        Ok(())
    }

    fn run(mut self) -> Result<Scanned, LexError> {
        loop {
            // Start of a line at top nesting level: handle blank lines,
            // whole-line comments and indentation changes.
            if self.at_line_start && self.depth == 0 {
                let col = self.skip_indentation();
                match self.peek() {
                    None => break,
                    Some('\n') => {
                        let pos = self.pos;
                        self.bump();
                        self.push(TokenKind::Newline, "\n", pos);
                        continue;
                    }
                    Some('#') => {
                        let com = self.scan_comment();
                        self.tokens
                            .push(Token::new(TokenKind::Comment, &com.token, com.start));
                        self.at_line_start = false;
                        continue;
                    }
                    Some(_) => {
                        let cur = *self.indents.last().unwrap_or(&0);
                        if col > cur {
                            self.indents.push(col);
                            self.push(TokenKind::Indent, "", self.pos);
                        } else if col < cur {
                            while col < *self.indents.last().unwrap_or(&0) {
                                self.indents.pop();
                                self.push(TokenKind::Unindent, "", self.pos);
                            }
                            if col != *self.indents.last().unwrap_or(&0) {
                                return Err(self.err(self.pos, LexErrorKind::BadUnindent));
                            }
                        }
                        self.at_line_start = false;
                        // Fall through to scan the first token of the line.
                    }
                }
            }

            let c = match self.peek() {
                None => break,
                Some(c) => c,
            };
            match c {
                '\n' => {
                    let pos = self.pos;
                    self.bump();
                    if self.depth == 0 {
                        self.push(TokenKind::Newline, "\n", pos);
                        self.at_line_start = true;
                    }
                    self.code_on_line = false;
                }
                ' ' | '\t' | '\r' => {
                    self.bump();
                }
                '\\' if self.peek_at(1) == Some('\n') => {
                    // Line continuation.
                    self.bump();
                    self.bump();
                }
                '#' => {
                    let com = self.scan_comment();
                    if self.code_on_line {
                        self.suffix_comments.push(com);
                    } else {
                        self.line_comments.push(com);
                    }
                }
                '"' | '\'' => {
                    let tok = self.scan_string(c)?;
                    self.tokens.push(tok);
                    self.code_on_line = true;
                }
                c if is_ident_start(c) => {
                    let tok = self.scan_ident();
                    self.tokens.push(tok);
                    self.code_on_line = true;
                }
                c if c.is_ascii_digit() => {
                    let tok = self.scan_number()?;
                    self.tokens.push(tok);
                    self.code_on_line = true;
                }
                c => {
                    self.scan_operator(c)?;
                    self.code_on_line = true;
                }
            }
        }

        // Close out the file: a synthetic newline if the last line is
        // unterminated, then one unindent per open block.
        if self.depth == 0 && !self.at_line_start {
            self.push(TokenKind::Newline, "", self.pos);
        }
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Unindent, "", self.pos);
        }
        self.push(TokenKind::Eof, "", self.pos);
        Ok(Scanned {
            tokens: self.tokens,
            line_comments: self.line_comments,
            suffix_comments: self.suffix_comments,
        })
    }
}
