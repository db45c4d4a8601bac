mod token;

pub use token::*;

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::error::ErrorState;

static KEYWORDS: Lazy<HashMap<&'static str, TokenKind>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("func", TokenKind::Func);
    m.insert("if", TokenKind::If);
    m.insert("else", TokenKind::Else);
    m.insert("while", TokenKind::While);
    m.insert("struct", TokenKind::Struct);
    m.insert("return", TokenKind::Return);
    m.insert("as", TokenKind::As);
    m.insert("true", TokenKind::LiteralBool);
    m.insert("false", TokenKind::LiteralBool);
    m
});

/// Single forward scan over the source buffer. Lexing errors are appended
/// to the shared error state; the token stream is always terminated with
/// an EOF token so the parser never has to deal with truncation.
pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    tokens: Vec<Token>,
    token_start: usize,
    current: usize,
    line: u32,
    line_start: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Lexer {
            source,
            bytes: source.as_bytes(),
            tokens: vec![],
            token_start: 0,
            current: 0,
            line: 1,
            line_start: 0,
        }
    }

    pub fn tokenize(mut self, errors: &mut ErrorState) -> Vec<Token> {
        while !self.is_at_end() {
            self.token_start = self.current;
            let c = self.advance();
            match c {
                b'(' => self.push(TokenKind::LeftParen),
                b')' => self.push(TokenKind::RightParen),
                b'[' => self.push(TokenKind::LeftBracket),
                b']' => self.push(TokenKind::RightBracket),
                b'{' => self.push(TokenKind::LeftBrace),
                b'}' => self.push(TokenKind::RightBrace),
                b':' => self.push(TokenKind::Colon),
                b';' => self.push(TokenKind::Semicolon),
                b',' => self.push(TokenKind::Comma),
                b'.' => self.push(TokenKind::Dot),
                b'+' => self.push(TokenKind::Plus),
                b'*' => self.push(TokenKind::Star),
                b'^' => self.push(TokenKind::Caret),
                b'-' => {
                    if self.matches(b'>') {
                        self.push(TokenKind::Arrow);
                    } else {
                        self.push(TokenKind::Minus);
                    }
                }
                b'&' => {
                    if self.matches(b'&') {
                        self.push(TokenKind::And);
                    } else {
                        self.push(TokenKind::Address);
                    }
                }
                b'|' => {
                    if self.matches(b'|') {
                        self.push(TokenKind::Or);
                    } else {
                        errors.push(self.span_here(), "Invalid character '|'".into());
                    }
                }
                b'>' => {
                    if self.matches(b'=') {
                        self.push(TokenKind::GreaterEqual);
                    } else {
                        self.push(TokenKind::Greater);
                    }
                }
                b'<' => {
                    if self.matches(b'=') {
                        self.push(TokenKind::LessEqual);
                    } else {
                        self.push(TokenKind::Less);
                    }
                }
                b'=' => {
                    if self.matches(b'=') {
                        self.push(TokenKind::EqualEqual);
                    } else {
                        self.push(TokenKind::Equal);
                    }
                }
                b'!' => {
                    if self.matches(b'=') {
                        self.push(TokenKind::BangEqual);
                    } else {
                        self.push(TokenKind::Bang);
                    }
                }
                b'/' => {
                    if self.matches(b'/') {
                        while self.peek() != b'\n' && !self.is_at_end() {
                            self.current += 1;
                        }
                    } else if self.matches(b'*') {
                        self.block_comment(errors);
                    } else {
                        self.push(TokenKind::Slash);
                    }
                }
                b' ' | b'\r' | b'\t' => {}
                b'\n' => self.newline(),
                b'"' => self.string(errors),
                c if c.is_ascii_digit() => self.number(),
                c if c.is_ascii_alphabetic() || c == b'_' => self.identifier(),
                _ => {
                    // Resynchronize on the next character boundary so the
                    // reported spelling stays valid UTF-8.
                    let ch = self.source[self.token_start..].chars().next().unwrap_or('?');
                    self.current = self.token_start + ch.len_utf8();
                    errors.push(self.span_here(), format!("Invalid character '{ch}'"));
                }
            }
        }

        self.token_start = self.current;
        self.push(TokenKind::EndOfFile);
        self.tokens
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.bytes.len()
    }

    fn advance(&mut self) -> u8 {
        let c = self.bytes[self.current];
        self.current += 1;
        c
    }

    fn peek(&self) -> u8 {
        self.bytes.get(self.current).copied().unwrap_or(0)
    }

    fn peek_next(&self) -> u8 {
        self.bytes.get(self.current + 1).copied().unwrap_or(0)
    }

    fn matches(&mut self, expected: u8) -> bool {
        if self.peek() == expected {
            self.current += 1;
            return true;
        }
        false
    }

    fn newline(&mut self) {
        self.line += 1;
        self.line_start = self.current;
    }

    fn span_here(&self) -> Span {
        Span {
            offset: self.token_start,
            line: self.line,
            line_start: self.line_start,
        }
    }

    fn push(&mut self, kind: TokenKind) {
        self.tokens.push(Token {
            kind,
            start: self.token_start,
            end: self.current,
            line: self.line,
            line_start: self.line_start,
        });
    }

    fn block_comment(&mut self, errors: &mut ErrorState) {
        // Block comments do not nest; the first `*/` terminates.
        while !(self.peek() == b'*' && self.peek_next() == b'/') && !self.is_at_end() {
            let c = self.advance();
            if c == b'\n' {
                self.newline();
            }
        }
        if self.is_at_end() {
            errors.push(self.span_here(), "Unterminated block comment".into());
            return;
        }
        self.current += 2;
    }

    fn string(&mut self, errors: &mut ErrorState) {
        while self.peek() != b'"' && !self.is_at_end() {
            let c = self.advance();
            if c == b'\n' {
                self.newline();
            }
        }
        if self.is_at_end() {
            errors.push(self.span_here(), "Unterminated string literal".into());
            return;
        }
        self.current += 1; // closing quote
        self.push(TokenKind::LiteralString);
    }

    fn number(&mut self) {
        while self.peek().is_ascii_digit() {
            self.current += 1;
        }
        if self.peek() == b'.' && self.peek_next().is_ascii_digit() {
            self.current += 1;
            while self.peek().is_ascii_digit() {
                self.current += 1;
            }
            self.push(TokenKind::LiteralFloat);
        } else {
            self.push(TokenKind::LiteralInteger);
        }
    }

    fn identifier(&mut self) {
        while self.peek().is_ascii_alphanumeric() || self.peek() == b'_' {
            self.current += 1;
        }
        let text = &self.source[self.token_start..self.current];
        match KEYWORDS.get(text) {
            Some(kind) => self.push(*kind),
            None => self.push(TokenKind::Identifier),
        }
    }
}
