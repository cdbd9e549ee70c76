//! A lexer for the subset of Go needed to read import declarations.
//!
//! Tokens are produced on demand, so the lexer never looks past the point
//! where the parser stops. Comments are not returned as tokens; they are
//! collected in source order for directive scanning.

use std::fmt;

/// A lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    Ident(String),
    /// A string literal, already unquoted.
    Str(String),
    Dot,
    LParen,
    RParen,
    Semi,
    /// Any other punctuation or literal; the parser only needs to know it is
    /// not part of an import declaration.
    Other(char),
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "{}", name),
            TokenKind::Str(value) => write!(f, "{:?}", value),
            TokenKind::Dot => f.write_str("'.'"),
            TokenKind::LParen => f.write_str("'('"),
            TokenKind::RParen => f.write_str("')'"),
            TokenKind::Semi => f.write_str("';'"),
            TokenKind::Other(c) => write!(f, "{:?}", c),
            TokenKind::Eof => f.write_str("EOF"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the first character.
    pub pos: usize,
}

/// A `//` or `/* */` comment, text included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub pos: usize,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub pos: usize,
    pub message: String,
}

/// Keywords after which a newline still ends the statement.
const STATEMENT_END_KEYWORDS: [&str; 4] = ["break", "continue", "fallthrough", "return"];

const KEYWORDS: [&str; 25] = [
    "break", "case", "chan", "const", "continue", "default", "defer", "else", "fallthrough",
    "for", "func", "go", "goto", "if", "import", "interface", "map", "package", "range",
    "return", "select", "struct", "switch", "type", "var",
];

pub struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    comments: Vec<Comment>,
    /// A newline here ends a statement.
    insert_semi: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src,
            pos: 0,
            comments: Vec::new(),
            insert_semi: false,
        }
    }

    /// Comments seen so far, in source order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    fn peek_char(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn error(&self, pos: usize, message: impl Into<String>) -> LexError {
        LexError {
            pos,
            message: message.into(),
        }
    }

    /// Produce the next token.
    ///
    /// A newline becomes `Semi` when it follows an identifier, a string, a
    /// closing bracket or one of the statement-ending keywords, as in Go. A
    /// block comment spanning lines counts as a newline.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        loop {
            let start = self.pos;
            match self.peek_char() {
                None => {
                    return Ok(Token {
                        kind: TokenKind::Eof,
                        pos: start,
                    })
                }
                Some('\n') => {
                    self.bump();
                    if let Some(semi) = self.newline(start) {
                        return Ok(semi);
                    }
                }
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') if self.peek_second() == Some('/') => {
                    let end = self.src[start..]
                        .find('\n')
                        .map_or(self.src.len(), |i| start + i);
                    self.comments.push(Comment {
                        pos: start,
                        text: self.src[start..end].to_string(),
                    });
                    self.pos = end;
                }
                Some('/') if self.peek_second() == Some('*') => {
                    let body = &self.src[start + 2..];
                    let Some(close) = body.find("*/") else {
                        return Err(self.error(start, "comment not terminated"));
                    };
                    let end = start + 2 + close + 2;
                    let text = &self.src[start..end];
                    let multiline = text.contains('\n');
                    self.comments.push(Comment {
                        pos: start,
                        text: text.to_string(),
                    });
                    self.pos = end;
                    if multiline {
                        if let Some(semi) = self.newline(start) {
                            return Ok(semi);
                        }
                    }
                }
                Some(c) => {
                    let token = self.lex_token(start, c)?;
                    self.insert_semi = ends_statement(&token.kind);
                    return Ok(token);
                }
            }
        }
    }

    fn newline(&mut self, pos: usize) -> Option<Token> {
        if std::mem::take(&mut self.insert_semi) {
            Some(Token {
                kind: TokenKind::Semi,
                pos,
            })
        } else {
            None
        }
    }

    fn lex_token(&mut self, start: usize, c: char) -> Result<Token, LexError> {
        let kind = match c {
            '(' => {
                self.bump();
                TokenKind::LParen
            }
            ')' => {
                self.bump();
                TokenKind::RParen
            }
            ';' => {
                self.bump();
                TokenKind::Semi
            }
            '.' => {
                self.bump();
                TokenKind::Dot
            }
            '"' => TokenKind::Str(self.interpreted_string(start)?),
            '`' => TokenKind::Str(self.raw_string(start)?),
            c if c == '_' || c.is_alphabetic() => {
                while self
                    .peek_char()
                    .is_some_and(|c| c == '_' || c.is_alphanumeric())
                {
                    self.bump();
                }
                TokenKind::Ident(self.src[start..self.pos].to_string())
            }
            c => {
                self.bump();
                TokenKind::Other(c)
            }
        };
        Ok(Token { kind, pos: start })
    }

    /// Decode an interpreted string. `\x` and octal escapes produce bytes,
    /// so the decoded value must be valid UTF-8 as a whole.
    fn interpreted_string(&mut self, start: usize) -> Result<String, LexError> {
        self.bump();
        let mut value = Vec::new();
        loop {
            match self.bump() {
                None | Some('\n') => return Err(self.error(start, "string literal not terminated")),
                Some('"') => break,
                Some('\\') => {
                    let escape_pos = self.pos - 1;
                    let simple = match self.bump() {
                        Some('\\') => b'\\',
                        Some('"') => b'"',
                        Some('n') => b'\n',
                        Some('t') => b'\t',
                        Some('r') => b'\r',
                        Some('a') => 0x07,
                        Some('b') => 0x08,
                        Some('f') => 0x0c,
                        Some('v') => 0x0b,
                        Some('x') => self.byte_escape(escape_pos, 2, 16)?,
                        Some(c @ '0'..='7') => {
                            self.pos -= c.len_utf8();
                            self.byte_escape(escape_pos, 3, 8)?
                        }
                        Some('u') => {
                            self.push_char(&mut value, escape_pos, 4)?;
                            continue;
                        }
                        Some('U') => {
                            self.push_char(&mut value, escape_pos, 8)?;
                            continue;
                        }
                        _ => return Err(self.error(escape_pos, "unknown escape sequence")),
                    };
                    value.push(simple);
                }
                Some(c) => {
                    let mut buf = [0; 4];
                    value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
                }
            }
        }
        String::from_utf8(value).map_err(|_| self.error(start, "string literal is not valid UTF-8"))
    }

    /// Read exactly `digits` digits in `radix`.
    fn digits(&mut self, escape_pos: usize, digits: usize, radix: u32) -> Result<u32, LexError> {
        let end = self.pos + digits;
        let text = self
            .src
            .get(self.pos..end)
            .filter(|t| t.chars().all(|c| c.is_digit(radix)))
            .ok_or_else(|| self.error(escape_pos, "invalid escape sequence"))?;
        let value = u32::from_str_radix(text, radix)
            .map_err(|_| self.error(escape_pos, "invalid escape sequence"))?;
        self.pos = end;
        Ok(value)
    }

    fn byte_escape(
        &mut self,
        escape_pos: usize,
        digits: usize,
        radix: u32,
    ) -> Result<u8, LexError> {
        let value = self.digits(escape_pos, digits, radix)?;
        u8::try_from(value).map_err(|_| self.error(escape_pos, "octal escape value > 255"))
    }

    fn push_char(
        &mut self,
        value: &mut Vec<u8>,
        escape_pos: usize,
        digits: usize,
    ) -> Result<(), LexError> {
        let code = self.digits(escape_pos, digits, 16)?;
        let c = char::from_u32(code)
            .ok_or_else(|| self.error(escape_pos, "invalid Unicode code point in escape"))?;
        let mut buf = [0; 4];
        value.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn raw_string(&mut self, start: usize) -> Result<String, LexError> {
        self.bump();
        let body = &self.src[self.pos..];
        let Some(close) = body.find('`') else {
            return Err(self.error(start, "raw string literal not terminated"));
        };
        let value = body[..close].replace('\r', "");
        self.pos += close + 1;
        Ok(value)
    }
}

fn ends_statement(kind: &TokenKind) -> bool {
    match kind {
        TokenKind::Ident(word) => {
            !KEYWORDS.contains(&word.as_str()) || STATEMENT_END_KEYWORDS.contains(&word.as_str())
        }
        TokenKind::Str(_) | TokenKind::RParen => true,
        TokenKind::Other(c) => matches!(c, ']' | '}') || c.is_ascii_digit(),
        _ => false,
    }
}

/// Convert a byte offset to a 1-based line and column.
pub fn line_col(src: &str, pos: usize) -> (usize, usize) {
    let before = &src[..pos.min(src.len())];
    let line = before.matches('\n').count() + 1;
    let column = before
        .rfind('\n')
        .map_or(before.len(), |i| before.len() - i - 1)
        + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let mut lexer = Lexer::new(src);
        let mut out = Vec::new();
        loop {
            let tok = lexer.next_token().unwrap();
            if tok.kind == TokenKind::Eof {
                break;
            }
            out.push(tok.kind);
        }
        out
    }

    #[test]
    fn test_tokens() {
        assert_eq!(
            kinds("package tools\n\nimport _ \"a/b\""),
            vec![
                TokenKind::Ident("package".into()),
                TokenKind::Ident("tools".into()),
                TokenKind::Semi,
                TokenKind::Ident("import".into()),
                TokenKind::Ident("_".into()),
                TokenKind::Str("a/b".into()),
            ]
        );
    }

    #[test]
    fn test_strings() {
        assert_eq!(kinds(r#""a\"b""#), vec![TokenKind::Str("a\"b".into())]);
        assert_eq!(kinds(r#""é""#), vec![TokenKind::Str("é".into())]);
        assert_eq!(kinds("`raw\\n`"), vec![TokenKind::Str("raw\\n".into())]);
    }

    #[test]
    fn test_newline_after_keyword_is_not_a_separator() {
        assert_eq!(
            kinds("package\ntools\nimport\n\t_ \"a\"\nimport (\n\"b\"\n)\n"),
            vec![
                TokenKind::Ident("package".into()),
                TokenKind::Ident("tools".into()),
                TokenKind::Semi,
                TokenKind::Ident("import".into()),
                TokenKind::Ident("_".into()),
                TokenKind::Str("a".into()),
                TokenKind::Semi,
                TokenKind::Ident("import".into()),
                TokenKind::LParen,
                TokenKind::Str("b".into()),
                TokenKind::Semi,
                TokenKind::RParen,
                TokenKind::Semi,
            ]
        );
    }

    #[test]
    fn test_multiline_block_comment_ends_statement() {
        assert_eq!(
            kinds("x /* a\nb */ y"),
            vec![
                TokenKind::Ident("x".into()),
                TokenKind::Semi,
                TokenKind::Ident("y".into()),
            ]
        );
        assert_eq!(
            kinds("x /* a */ y"),
            vec![TokenKind::Ident("x".into()), TokenKind::Ident("y".into())]
        );
    }

    #[test]
    fn test_byte_escapes() {
        assert_eq!(kinds(r#""\101\x42""#), vec![TokenKind::Str("AB".into())]);
        assert_eq!(kinds(r#""\xc3\xa9""#), vec![TokenKind::Str("\u{e9}".into())]);
        assert_eq!(kinds(r#""\u00e9\U0001F600""#), vec![TokenKind::Str("\u{e9}\u{1f600}".into())]);
        assert!(Lexer::new(r#""\xff""#).next_token().is_err());
        assert!(Lexer::new(r#""\400""#).next_token().is_err());
        assert!(Lexer::new(r#""\12""#).next_token().is_err());
        assert!(Lexer::new(r#""\ud800""#).next_token().is_err());
    }

    #[test]
    fn test_comments_collected() {
        let mut lexer = Lexer::new("// one\n/* two */ x");
        let tok = lexer.next_token().unwrap();
        assert_eq!(tok.kind, TokenKind::Ident("x".into()));
        let texts: Vec<_> = lexer.comments().iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["// one", "/* two */"]);
    }

    #[test]
    fn test_errors() {
        assert!(Lexer::new("\"open").next_token().is_err());
        assert!(Lexer::new("/* open").next_token().is_err());
        assert!(Lexer::new("`open").next_token().is_err());
        assert!(Lexer::new(r#""\q""#).next_token().is_err());
    }

    #[test]
    fn test_line_col() {
        let src = "package x\nimport \"y\"";
        assert_eq!(line_col(src, 0), (1, 1));
        assert_eq!(line_col(src, 10), (2, 1));
        assert_eq!(line_col(src, 17), (2, 8));
    }
}
