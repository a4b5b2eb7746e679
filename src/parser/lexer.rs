//! Tokenizer for the SysMLv2 textual notation.

use crate::error::ParseError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Plain identifier or keyword.
    Ident(String),
    /// Unrestricted name written as `'some name'`.
    Name(String),
    Str(String),
    Number(String),
    Symbol(&'static str),
    /// `/* … */` comment body (also the text of `doc` and `comment`).
    BlockComment(String),
    Eof,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte range in the source text.
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl Token {
    /// Identifier text if this token is a keyword-capable identifier.
    pub fn ident(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) => Some(s),
            _ => None,
        }
    }

    /// Identifier or unrestricted name.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Ident(s) | TokenKind::Name(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_symbol(&self, sym: &str) -> bool {
        matches!(self.kind, TokenKind::Symbol(s) if s == sym)
    }

    pub fn is_keyword(&self, kw: &str) -> bool {
        self.ident() == Some(kw)
    }
}

// Longest first.
const SYMBOLS: &[&str] = &[
    "===", "!==", ":>>", "::>", "::", ":>", "==", "!=", "<=", ">=", "->", "..", "**", "{", "}",
    "(", ")", "[", "]", ";", ":", ",", ".", "=", "<", ">", "+", "-", "*", "/", "%", "^", "&",
    "|", "!", "~", "#", "@", "?", "$",
];

pub fn tokenize(text: &str, path: &str) -> Result<Vec<Token>, ParseError> {
    Lexer {
        text,
        path,
        pos: 0,
        line: 1,
        column: 1,
    }
    .run()
}

struct Lexer<'a> {
    text: &'a str,
    path: &'a str,
    pos: usize,
    line: u32,
    column: u32,
}

impl<'a> Lexer<'a> {
    fn run(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();
        loop {
            self.skip_whitespace_and_notes();
            let (start, line, column) = (self.pos, self.line, self.column);
            let Some(c) = self.peek_char() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    start,
                    end: start,
                    line,
                    column,
                });
                return Ok(tokens);
            };
            let kind = if self.rest().starts_with("/*") {
                self.block_comment()?
            } else if c == '\'' {
                TokenKind::Name(self.quoted('\'')?)
            } else if c == '"' {
                TokenKind::Str(self.quoted('"')?)
            } else if c.is_ascii_digit() {
                TokenKind::Number(self.take_while(|c| c.is_ascii_alphanumeric() || c == '.'))
            } else if c.is_alphabetic() || c == '_' {
                TokenKind::Ident(self.take_while(|c| c.is_alphanumeric() || c == '_'))
            } else if let Some(sym) = SYMBOLS.iter().find(|s| self.rest().starts_with(**s)) {
                self.advance_by(sym.len());
                TokenKind::Symbol(*sym)
            } else {
                return Err(self.error(line, column, format!("unexpected character '{}'", c)));
            };
            tokens.push(Token {
                kind,
                start,
                end: self.pos,
                line,
                column,
            });
        }
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn advance_by(&mut self, bytes: usize) {
        let target = self.pos + bytes;
        while self.pos < target {
            if self.bump().is_none() {
                break;
            }
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            self.bump();
        }
        self.text[start..self.pos].to_string()
    }

    /// Skips whitespace and `//` notes. A note ends at the line break.
    fn skip_whitespace_and_notes(&mut self) {
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.rest().starts_with("//") => {
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn block_comment(&mut self) -> Result<TokenKind, ParseError> {
        let (line, column) = (self.line, self.column);
        self.advance_by(2);
        let body_start = self.pos;
        match self.rest().find("*/") {
            Some(offset) => {
                let body = self.text[body_start..body_start + offset].to_string();
                self.advance_by(offset + 2);
                Ok(TokenKind::BlockComment(body))
            }
            None => Err(self.error(line, column, "unterminated comment".to_string())),
        }
    }

    fn quoted(&mut self, quote: char) -> Result<String, ParseError> {
        let (line, column) = (self.line, self.column);
        self.bump();
        let mut out = String::new();
        loop {
            match self.bump() {
                Some('\\') => match self.bump() {
                    Some(escaped) => out.push(escaped),
                    None => break,
                },
                Some(c) if c == quote => return Ok(out),
                Some(c) => out.push(c),
                None => break,
            }
        }
        Err(self.error(line, column, format!("unterminated {} literal", quote)))
    }

    fn error(&self, line: u32, column: u32, message: String) -> ParseError {
        ParseError {
            path: self.path.to_string(),
            line,
            column,
            message,
        }
    }
}
