//! Manifest parser.
//!
//! Reads the package clause and import declarations of a Go source file and
//! turns every import into a [`Tool`]. Directive comments (`gex:bin`,
//! `gex:nobin`) select build modes: comments before the `package` keyword
//! apply to the whole file, comments between two imports apply to the later
//! one.

use std::io;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::errors::Error;
use crate::core::{BuildMode, ManagerType, Manifest, Tool};
use crate::toolfile::lexer::{line_col, Comment, LexError, Lexer, Token, TokenKind};

static DIRECTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"gex:(nobin|bin)\b").expect("directive pattern is valid"));

/// Reads tool manifests from disk.
#[derive(Debug, Clone)]
pub struct ManifestParser {
    manager_type: ManagerType,
}

impl ManifestParser {
    pub fn new(manager_type: ManagerType) -> Self {
        ManifestParser { manager_type }
    }

    /// Parse the manifest at `path`.
    pub fn parse(&self, path: &Path) -> Result<Manifest, Error> {
        let src = std::fs::read_to_string(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::ManifestNotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Read {
                path: path.to_path_buf(),
                err,
            },
        })?;
        self.parse_str(&src, path)
    }

    /// Parse manifest source. `path` is only used in error messages.
    pub fn parse_str(&self, src: &str, path: &Path) -> Result<Manifest, Error> {
        let file = ImportParser::new(src)
            .parse()
            .map_err(|e| {
                let (line, column) = line_col(src, e.pos);
                Error::Parse {
                    path: path.to_path_buf(),
                    line,
                    column,
                    message: e.message,
                }
            })?;

        let mut comments = CommentCursor::new(&file.comments);
        let default_mode = build_mode(comments.consume(file.package_pos));

        let mut tools = Vec::with_capacity(file.imports.len());
        for spec in &file.imports {
            let mode = build_mode(comments.consume(spec.pos));
            tools.push(Tool::new(spec.path.clone()).with_build_mode(mode));
        }

        tracing::debug!(
            "parsed {} tool(s) from {} (default mode: {})",
            tools.len(),
            path.display(),
            default_mode
        );

        Ok(Manifest::new(tools, self.manager_type).with_default_build_mode(default_mode))
    }
}

/// Hands out comments in source order, each one at most once.
struct CommentCursor<'a> {
    comments: &'a [Comment],
    index: usize,
}

impl<'a> CommentCursor<'a> {
    fn new(comments: &'a [Comment]) -> Self {
        CommentCursor { comments, index: 0 }
    }

    /// Take all remaining comments that start before `pos`.
    fn consume(&mut self, pos: usize) -> &'a [Comment] {
        let start = self.index;
        while self.index < self.comments.len() && self.comments[self.index].pos < pos {
            self.index += 1;
        }
        &self.comments[start..self.index]
    }
}

fn build_mode(comments: &[Comment]) -> BuildMode {
    comments
        .iter()
        .find_map(|c| DIRECTIVE.captures(&c.text))
        .map_or(BuildMode::Unknown, |caps| match &caps[1] {
            "nobin" => BuildMode::NoBin,
            _ => BuildMode::Bin,
        })
}

#[derive(Debug)]
struct ImportSpec {
    /// Start of the import spec: the alias when present, otherwise the path.
    pos: usize,
    path: String,
}

#[derive(Debug)]
struct ParsedFile {
    package_pos: usize,
    imports: Vec<ImportSpec>,
    comments: Vec<Comment>,
}

struct ImportParser<'a> {
    lexer: Lexer<'a>,
    peeked: Option<Token>,
}

impl<'a> ImportParser<'a> {
    fn new(src: &'a str) -> Self {
        ImportParser {
            lexer: Lexer::new(src),
            peeked: None,
        }
    }

    fn peek(&mut self) -> Result<&Token, LexError> {
        let tok = match self.peeked.take() {
            Some(tok) => tok,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(tok))
    }

    fn next(&mut self) -> Result<Token, LexError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.lexer.next_token(),
        }
    }

    /// Skip statement separators.
    fn skip_semis(&mut self) -> Result<(), LexError> {
        while self.peek()?.kind == TokenKind::Semi {
            self.next()?;
        }
        Ok(())
    }

    fn unexpected(tok: &Token, expected: &str) -> LexError {
        LexError {
            pos: tok.pos,
            message: format!("expected {}, found {}", expected, tok.kind),
        }
    }

    fn parse(mut self) -> Result<ParsedFile, LexError> {
        self.skip_semis()?;
        let package = self.next()?;
        if package.kind != TokenKind::Ident("package".to_string()) {
            return Err(Self::unexpected(&package, "'package'"));
        }

        let name = self.next()?;
        match &name.kind {
            TokenKind::Ident(n) if n == "_" => {
                return Err(LexError {
                    pos: name.pos,
                    message: "invalid package name _".to_string(),
                })
            }
            TokenKind::Ident(_) => {}
            _ => return Err(Self::unexpected(&name, "package name")),
        }
        self.end_of_decl()?;

        let mut imports = Vec::new();
        loop {
            self.skip_semis()?;
            if self.peek()?.kind != TokenKind::Ident("import".to_string()) {
                break;
            }
            self.next()?;

            if self.peek()?.kind == TokenKind::LParen {
                self.next()?;
                loop {
                    self.skip_semis()?;
                    if self.peek()?.kind == TokenKind::RParen {
                        self.next()?;
                        break;
                    }
                    imports.push(self.import_spec()?);
                    match self.peek()?.kind {
                        TokenKind::Semi | TokenKind::RParen => {}
                        _ => {
                            let tok = self.next()?;
                            return Err(Self::unexpected(&tok, "';' or ')' after import spec"));
                        }
                    }
                }
            } else {
                imports.push(self.import_spec()?);
            }
            self.end_of_decl()?;
        }

        Ok(ParsedFile {
            package_pos: package.pos,
            imports,
            comments: self.lexer.comments().to_vec(),
        })
    }

    fn import_spec(&mut self) -> Result<ImportSpec, LexError> {
        let first = self.next()?;
        let (pos, path_tok) = match first.kind {
            TokenKind::Ident(_) | TokenKind::Dot => {
                let path = self.next()?;
                (first.pos, path)
            }
            _ => (first.pos, first),
        };
        match path_tok.kind {
            TokenKind::Str(path) if path.is_empty() => Err(LexError {
                pos: path_tok.pos,
                message: "invalid import path: \"\"".to_string(),
            }),
            TokenKind::Str(path) => Ok(ImportSpec { pos, path }),
            other => Err(Self::unexpected(
                &Token {
                    kind: other,
                    pos: path_tok.pos,
                },
                "import path",
            )),
        }
    }

    /// A declaration ends at a separator or at the end of the file.
    fn end_of_decl(&mut self) -> Result<(), LexError> {
        match self.peek()?.kind {
            TokenKind::Semi | TokenKind::Eof => Ok(()),
            _ => {
                let tok = self.next()?;
                Err(Self::unexpected(&tok, "';' or newline"))
            }
        }
    }
}
