//! Hand-written lexer for annotation text.

use tymap_ast::{FileId, Span};
use tymap_diag::{Category, Diagnostic, SourceLocation};

use crate::token::{Token, TokenKind, Trivia, TriviaKind};

/// Lex source text into a sequence of tokens.
///
/// Returns `Ok(tokens)` where the last token is always `Eof`. Newlines inside
/// `[...]` or `(...)` are whitespace, so an annotation may span several lines.
/// Returns `Err` with diagnostics for lexical errors.
pub fn lex(source: &str, file: FileId) -> Result<Vec<Token>, Vec<Diagnostic>> {
    let mut lexer = Lexer::new(source, file, false);
    lexer.scan_all();
    if lexer.errors.is_empty() {
        Ok(lexer.tokens)
    } else {
        Err(lexer.errors)
    }
}

/// Lex an annotation sheet, where every physical line is one entry.
///
/// A newline ends the entry even inside unclosed brackets, so one bad line
/// cannot swallow the rest of the sheet. Lexical errors are returned next to
/// the tokens; characters that fail to lex are skipped.
pub fn lex_sheet(source: &str, file: FileId) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut lexer = Lexer::new(source, file, true);
    lexer.scan_all();
    (lexer.tokens, lexer.errors)
}

struct Lexer<'src> {
    text: &'src str,
    source: &'src [u8],
    file: FileId,
    pos: usize,
    /// Open brackets and parentheses.
    depth: usize,
    /// Sheet mode: newlines always end an entry.
    line_entries: bool,
    tokens: Vec<Token>,
    errors: Vec<Diagnostic>,
    /// Accumulated trivia to attach as leading trivia on the next emitted token.
    pending_trivia: Vec<Trivia>,
}

impl<'src> Lexer<'src> {
    fn new(source: &'src str, file: FileId, line_entries: bool) -> Self {
        Self {
            text: source,
            source: source.as_bytes(),
            file,
            pos: 0,
            depth: 0,
            line_entries,
            tokens: Vec::new(),
            errors: Vec::new(),
            pending_trivia: Vec::new(),
        }
    }

    fn scan_all(&mut self) {
        loop {
            self.collect_trivia();
            if self.is_at_end() {
                self.emit(TokenKind::Eof, self.pos, self.pos);
                break;
            }
            self.scan_token();
        }
    }

    fn scan_token(&mut self) {
        let start = self.pos;
        let ch = self.advance();

        match ch {
            b'\n' => {
                if self.line_entries {
                    self.depth = 0;
                }
                // Blank lines and leading newlines are trivia; only the first
                // newline after real content ends an entry.
                if self.depth == 0 && !self.tokens.is_empty() && !self.last_is_newline() {
                    self.emit(TokenKind::Newline, start, self.pos);
                } else {
                    self.push_trivia(TriviaKind::Whitespace, start);
                }
            }
            b'[' => {
                self.depth += 1;
                self.emit(TokenKind::LBracket, start, self.pos);
            }
            b']' => {
                self.depth = self.depth.saturating_sub(1);
                self.emit(TokenKind::RBracket, start, self.pos);
            }
            b'(' => {
                self.depth += 1;
                self.emit(TokenKind::LParen, start, self.pos);
            }
            b')' => {
                self.depth = self.depth.saturating_sub(1);
                self.emit(TokenKind::RParen, start, self.pos);
            }
            b',' => self.emit(TokenKind::Comma, start, self.pos),
            b':' => self.emit(TokenKind::Colon, start, self.pos),
            b'.' => self.emit(TokenKind::Dot, start, self.pos),
            b'*' => self.emit(TokenKind::Star, start, self.pos),
            c if c == b'_' || c.is_ascii_alphabetic() => {
                while self
                    .peek()
                    .is_some_and(|c| c == b'_' || c.is_ascii_alphanumeric())
                {
                    self.pos += 1;
                }
                let name = self.text[start..self.pos].to_string();
                self.emit(TokenKind::Ident(name), start, self.pos);
            }
            c if c.is_ascii_digit() => {
                while self
                    .peek()
                    .is_some_and(|c| c == b'_' || c.is_ascii_digit())
                {
                    self.pos += 1;
                }
                let digits = self.text[start..self.pos].to_string();
                self.emit(TokenKind::Number(digits), start, self.pos);
            }
            _ => {
                // Step over the whole UTF-8 sequence so the message shows the
                // character the user typed.
                let ch = self.text[start..].chars().next().unwrap_or('\u{fffd}');
                self.pos = start + ch.len_utf8();
                self.error(start, self.pos, format!("unexpected character `{ch}`"));
            }
        }
    }

    /// Collect spaces, tabs, carriage returns, and comments as trivia.
    /// Newlines are left for `scan_token` because they may be significant.
    fn collect_trivia(&mut self) {
        loop {
            let start = self.pos;
            match self.peek() {
                Some(b' ' | b'\t' | b'\r') => {
                    while matches!(self.peek(), Some(b' ' | b'\t' | b'\r')) {
                        self.pos += 1;
                    }
                    self.push_trivia(TriviaKind::Whitespace, start);
                }
                Some(b'#') => {
                    while self.peek().is_some_and(|c| c != b'\n') {
                        self.pos += 1;
                    }
                    self.push_trivia(TriviaKind::Comment, start);
                }
                _ => break,
            }
        }
    }

    fn push_trivia(&mut self, kind: TriviaKind, start: usize) {
        self.pending_trivia.push(Trivia {
            kind,
            text: self.text[start..self.pos].to_string(),
            span: self.span(start, self.pos),
        });
    }

    fn emit(&mut self, kind: TokenKind, start: usize, end: usize) {
        let leading_trivia = std::mem::take(&mut self.pending_trivia);
        self.tokens.push(Token {
            kind,
            span: self.span(start, end),
            leading_trivia,
        });
    }

    fn error(&mut self, start: usize, end: usize, message: String) {
        self.errors.push(
            Diagnostic::error(Category::Syntax, message).at(SourceLocation {
                file_id: self.file.0,
                start: start as u32,
                end: end as u32,
            }),
        );
    }

    fn last_is_newline(&self) -> bool {
        self.tokens
            .last()
            .is_some_and(|t| t.kind == TokenKind::Newline)
    }

    fn span(&self, start: usize, end: usize) -> Span {
        Span::new(self.file, start as u32, end as u32)
    }

    fn peek(&self) -> Option<u8> {
        self.source.get(self.pos).copied()
    }

    fn advance(&mut self) -> u8 {
        let ch = self.source[self.pos];
        self.pos += 1;
        ch
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.source.len()
    }
}
