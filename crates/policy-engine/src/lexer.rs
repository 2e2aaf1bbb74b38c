use crate::{
    error::{Error, ErrorKind},
    location::Location,
    token::{Token, TokenKind},
};

/// Scans UTF-8 source text into an ordered token list ending in `Eof`
/// (spec.md §4.1). Whitespace and `#` line comments are discarded; newlines
/// are preserved as `TokenKind::Newline` since the grammar uses them as
/// statement separators.
pub struct Lexer<'src> {
    source: &'src str,
    bytes: &'src [u8],
    pos: usize,
    line: u32,
    column: u32,
}

impl<'src> Lexer<'src> {
    pub fn new(source: &'src str) -> Self {
        Self { source, bytes: source.as_bytes(), pos: 0, line: 1, column: 1 }
    }

    pub fn tokenize(mut self) -> Result<Vec<Token>, Error> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.kind == TokenKind::Eof;
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.bytes.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<u8> {
        let c = self.peek()?;
        self.pos += 1;
        if c == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn here(&self) -> Location {
        Location::with_span(self.line, self.column, self.pos as u32, 0)
    }

    fn span_from(&self, start: Location) -> Location {
        let len = self.pos as u32 - start.offset.unwrap_or(self.pos as u32);
        Location::with_span(start.line, start.column, start.offset.unwrap_or(0), len)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    self.advance();
                }
                Some(b'#') => {
                    while let Some(c) = self.peek() {
                        if c == b'\n' {
                            break;
                        }
                        self.advance();
                    }
                }
                _ => break,
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, Error> {
        self.skip_trivia();
        let start = self.here();
        let Some(c) = self.peek() else {
            return Ok(Token::new(TokenKind::Eof, start));
        };

        if c == b'\n' {
            self.advance();
            return Ok(Token::new(TokenKind::Newline, self.span_from(start)));
        }
        if c.is_ascii_digit() {
            return self.lex_number(start);
        }
        if c == b'"' {
            return self.lex_string(start);
        }
        if c == b'`' {
            return self.lex_raw_string(start);
        }
        if c == b'_' && !self.is_ident_continue(self.peek_at(1)) {
            self.advance();
            return Ok(Token::new(TokenKind::Underscore, self.span_from(start)));
        }
        if c.is_ascii_alphabetic() || c == b'_' {
            return Ok(self.lex_ident(start));
        }

        self.lex_operator(start)
    }

    fn is_ident_continue(&self, c: Option<u8>) -> bool {
        matches!(c, Some(c) if c.is_ascii_alphanumeric() || c == b'_')
    }

    fn lex_ident(&mut self, start: Location) -> Token {
        let begin = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == b'_') {
            self.advance();
        }
        let text = &self.source[begin..self.pos];
        let kind = TokenKind::keyword_from_ident(text).unwrap_or_else(|| TokenKind::Ident(text.to_owned()));
        Token::new(kind, self.span_from(start))
    }

    /// `0 | [1-9][0-9]*`, optional `.[0-9]+`, optional `[eE][+-]?[0-9]+`.
    /// Leading zeros, trailing dots, and dot-prefixed numbers are errors.
    fn lex_number(&mut self, start: Location) -> Result<Token, Error> {
        let begin = self.pos;
        let mut is_int = true;

        if self.peek() == Some(b'0') {
            self.advance();
            if matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return Err(self.err(start, "invalid number: leading zero"));
            }
        } else {
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        if self.peek() == Some(b'.') {
            if !matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
                return Err(self.err(start, "invalid number: trailing dot"));
            }
            is_int = false;
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        if matches!(self.peek(), Some(b'e' | b'E')) {
            let mut lookahead = 1;
            if matches!(self.peek_at(1), Some(b'+' | b'-')) {
                lookahead = 2;
            }
            if !matches!(self.peek_at(lookahead), Some(c) if c.is_ascii_digit()) {
                return Err(self.err(start, "invalid number: malformed exponent"));
            }
            is_int = false;
            self.advance();
            if matches!(self.peek(), Some(b'+' | b'-')) {
                self.advance();
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        let text = &self.source[begin..self.pos];
        let value: f64 = text.parse().map_err(|_| self.err(start, "invalid number literal"))?;
        Ok(Token::new(TokenKind::Number { value, is_int }, self.span_from(start)))
    }

    fn lex_string(&mut self, start: Location) -> Result<Token, Error> {
        self.advance(); // opening quote
        let mut out = String::new();
        loop {
            match self.advance() {
                None | Some(b'\n') => return Err(self.err(start, "unterminated string literal")),
                Some(b'"') => break,
                Some(b'\\') => {
                    let escaped = self.advance().ok_or_else(|| self.err(start, "unterminated escape sequence"))?;
                    match escaped {
                        b'"' => out.push('"'),
                        b'\\' => out.push('\\'),
                        b'/' => out.push('/'),
                        b'b' => out.push('\u{8}'),
                        b'f' => out.push('\u{c}'),
                        b'n' => out.push('\n'),
                        b'r' => out.push('\r'),
                        b't' => out.push('\t'),
                        b'u' => out.push(self.lex_unicode_escape(start)?),
                        _ => return Err(self.err(start, "invalid escape sequence")),
                    }
                }
                Some(c) => {
                    // Re-decode as UTF-8: ASCII fast path, else collect the
                    // full multi-byte sequence already consumed by `advance`.
                    if c.is_ascii() {
                        out.push(c as char);
                    } else {
                        let char_start = self.pos - 1;
                        let width = utf8_width(c);
                        for _ in 1..width {
                            self.advance();
                        }
                        let s = std::str::from_utf8(&self.bytes[char_start..self.pos])
                            .map_err(|_| self.err(start, "invalid utf-8 in string literal"))?;
                        out.push_str(s);
                    }
                }
            }
        }
        Ok(Token::new(TokenKind::String(out), self.span_from(start)))
    }

    fn lex_unicode_escape(&mut self, start: Location) -> Result<char, Error> {
        let mut value: u32 = 0;
        for _ in 0..4 {
            let c = self.advance().ok_or_else(|| self.err(start, "unterminated \\u escape"))?;
            let digit = (c as char).to_digit(16).ok_or_else(|| self.err(start, "invalid \\u escape"))?;
            value = value * 16 + digit;
        }
        char::from_u32(value).ok_or_else(|| self.err(start, "invalid unicode scalar in \\u escape"))
    }

    /// Backtick-delimited, only `\{` escapes to `{`.
    fn lex_raw_string(&mut self, start: Location) -> Result<Token, Error> {
        self.advance(); // opening backtick
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(self.err(start, "unterminated raw string literal")),
                Some(b'`') => break,
                Some(b'\\') if self.peek() == Some(b'{') => {
                    self.advance();
                    out.push('{');
                }
                Some(c) if c.is_ascii() => out.push(c as char),
                Some(c) => {
                    let char_start = self.pos - 1;
                    let width = utf8_width(c);
                    for _ in 1..width {
                        self.advance();
                    }
                    let s = std::str::from_utf8(&self.bytes[char_start..self.pos])
                        .map_err(|_| self.err(start, "invalid utf-8 in raw string literal"))?;
                    out.push_str(s);
                }
            }
        }
        Ok(Token::new(TokenKind::RawString(out), self.span_from(start)))
    }

    fn lex_operator(&mut self, start: Location) -> Result<Token, Error> {
        macro_rules! two {
            ($second:expr, $both:expr, $single:expr) => {{
                self.advance();
                if self.peek() == Some($second) {
                    self.advance();
                    $both
                } else {
                    $single
                }
            }};
        }

        let c = self.advance().expect("checked by caller");
        let kind = match c {
            b':' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Assign
                } else {
                    TokenKind::Colon
                }
            }
            b'=' => two!(b'=', TokenKind::Eq, TokenKind::Unify),
            b'!' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ne
                } else {
                    return Err(self.err(start, "unexpected character '!'"));
                }
            }
            b'<' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            b'>' => {
                if self.peek() == Some(b'=') {
                    self.advance();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'%' => TokenKind::Percent,
            b'|' => TokenKind::Pipe,
            b'&' => TokenKind::Amp,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b'[' => TokenKind::LBracket,
            b']' => TokenKind::RBracket,
            b'{' => TokenKind::LBrace,
            b'}' => TokenKind::RBrace,
            b',' => TokenKind::Comma,
            b';' => TokenKind::Semicolon,
            b'.' => TokenKind::Dot,
            other => {
                return Err(self.err(start, format!("unexpected character {:?}", other as char)));
            }
        };
        Ok(Token::new(kind, self.span_from(start)))
    }

    fn err(&self, start: Location, message: impl Into<String>) -> Error {
        Error::new(ErrorKind::Lex, message.into()).with_location(start)
    }
}

fn utf8_width(first_byte: u8) -> usize {
    if first_byte & 0b1110_0000 == 0b1100_0000 {
        2
    } else if first_byte & 0b1111_0000 == 0b1110_0000 {
        3
    } else if first_byte & 0b1111_1000 == 0b1111_0000 {
        4
    } else {
        1
    }
}
