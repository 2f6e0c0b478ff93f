//! Recursive descent parser for annotations, type parameter lists, and sheets.

use tymap_ast::*;
use tymap_diag::{Category, Diagnostic, SourceLocation};

use crate::token::{Token, TokenKind};

/// Parse a standalone annotation from a token stream.
pub fn parse_type(tokens: Vec<Token>, file: FileId) -> Result<TypeExpr, Vec<Diagnostic>> {
    let mut parser = Parser::new(tokens, file);
    parser.skip_newlines();
    let ann = parser.type_expr();
    parser.skip_newlines();
    if ann.is_some() && !parser.at_eof() {
        parser.error_at_current("unexpected token after annotation");
    }
    parser.finish(ann, "expected annotation")
}

/// Parse a type parameter list, with or without the surrounding brackets:
/// `[T: int, *Ts]` or `T: int, *Ts`.
pub fn parse_type_params(
    tokens: Vec<Token>,
    file: FileId,
) -> Result<Vec<TypeParam>, Vec<Diagnostic>> {
    let mut parser = Parser::new(tokens, file);
    parser.skip_newlines();
    let params = if parser.check(&TokenKind::LBracket) {
        parser.bracketed_type_params()
    } else if parser.at_eof() {
        Some(Vec::new())
    } else {
        parser.type_param_list(&TokenKind::Eof)
    };
    parser.skip_newlines();
    if params.is_some() && !parser.at_eof() {
        parser.error_at_current("unexpected token after type parameters");
    }
    parser.finish(params, "expected type parameters")
}

/// Parse an annotation sheet: one `[params]? annotation` entry per line.
///
/// Errors do not stop the parse; the parser resynchronizes at the next line
/// so every bad entry is reported.
pub fn parse_sheet(tokens: Vec<Token>, file: FileId) -> Result<Sheet, Vec<Diagnostic>> {
    let (sheet, errors) = parse_sheet_recovering(tokens, file);
    if errors.is_empty() {
        Ok(sheet)
    } else {
        Err(errors)
    }
}

/// Parse an annotation sheet, keeping every well-formed entry next to the
/// errors for the bad ones.
pub fn parse_sheet_recovering(tokens: Vec<Token>, file: FileId) -> (Sheet, Vec<Diagnostic>) {
    let mut parser = Parser::new(tokens, file);
    let sheet = parser.sheet();
    (sheet, parser.errors)
}

// ---------------------------------------------------------------------------
// Parser
// ---------------------------------------------------------------------------

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: FileId,
    errors: Vec<Diagnostic>,
}

impl Parser {
    fn new(tokens: Vec<Token>, file: FileId) -> Self {
        Self {
            tokens,
            pos: 0,
            file,
            errors: Vec::new(),
        }
    }

    fn finish<T>(self, value: Option<T>, missing: &str) -> Result<T, Vec<Diagnostic>> {
        if self.errors.is_empty() {
            match value {
                Some(v) => Ok(v),
                None => Err(vec![Diagnostic::error(Category::Syntax, missing)]),
            }
        } else {
            Err(self.errors)
        }
    }

    // -- Sheets --

    fn sheet(&mut self) -> Sheet {
        let mut entries = Vec::new();
        self.skip_newlines();
        while !self.at_eof() {
            let error_count = self.errors.len();
            match self.sheet_entry() {
                Some(entry) if self.errors.len() == error_count => entries.push(entry),
                _ => self.synchronize(),
            }
            self.skip_newlines();
        }
        Sheet { entries }
    }

    fn sheet_entry(&mut self) -> Option<SheetEntry> {
        let start = self.current_span();
        let params = if self.check(&TokenKind::LBracket) {
            self.bracketed_type_params()?
        } else {
            Vec::new()
        };
        let annotation = self.type_expr()?;
        let span = start.merge(annotation.span);
        if !self.check(&TokenKind::Newline) && !self.at_eof() {
            self.error_at_current("expected end of line after annotation");
            return None;
        }
        Some(SheetEntry {
            params,
            annotation,
            span,
        })
    }

    /// Skip to the start of the next line.
    fn synchronize(&mut self) {
        while !self.at_eof() && !self.check(&TokenKind::Newline) {
            self.advance();
        }
    }

    // -- Type parameters --

    fn bracketed_type_params(&mut self) -> Option<Vec<TypeParam>> {
        self.expect(&TokenKind::LBracket, "expected `[` to open type parameters")?;
        if self.check(&TokenKind::RBracket) {
            self.error_at_current("type parameter list cannot be empty");
            return None;
        }
        let params = self.type_param_list(&TokenKind::RBracket)?;
        self.expect(&TokenKind::RBracket, "expected `]` to close type parameters")?;
        Some(params)
    }

    fn type_param_list(&mut self, close: &TokenKind) -> Option<Vec<TypeParam>> {
        let mut params = vec![self.type_param()?];
        while self.match_token(&TokenKind::Comma) {
            if self.check(close) {
                break;
            }
            params.push(self.type_param()?);
        }
        Some(params)
    }

    fn type_param(&mut self) -> Option<TypeParam> {
        if self.match_token(&TokenKind::Star) {
            let name = self.expect_ident("expected type variable tuple name after `*`")?;
            return Some(TypeParam::VarTuple { name });
        }
        let name = self.expect_ident("expected type parameter name")?;
        let bound = if self.match_token(&TokenKind::Colon) {
            Some(self.type_expr()?)
        } else {
            None
        };
        Some(TypeParam::Var { name, bound })
    }

    // -- Annotations --

    fn type_expr(&mut self) -> Option<TypeExpr> {
        if self.check(&TokenKind::Star) {
            let star = self.advance();
            let inner = self.type_expr()?;
            let span = star.span.merge(inner.span);
            return Some(Spanned::new(TypeExprKind::Star(Box::new(inner)), span));
        }
        let mut expr = self.primary()?;
        loop {
            if self.check(&TokenKind::LBracket) {
                self.advance();
                let args = self.type_args()?;
                let close = self.expect(&TokenKind::RBracket, "expected `]` to close type arguments")?;
                let span = expr.span.merge(close.span);
                expr = Spanned::new(
                    TypeExprKind::Subscript {
                        base: Box::new(expr),
                        args,
                    },
                    span,
                );
            } else if self.check(&TokenKind::LParen) {
                let close = self.skip_call_arguments()?;
                let span = expr.span.merge(close.span);
                expr = Spanned::new(
                    TypeExprKind::Call {
                        callee: Box::new(expr),
                    },
                    span,
                );
            } else {
                return Some(expr);
            }
        }
    }

    fn primary(&mut self) -> Option<TypeExpr> {
        if self.check(&TokenKind::LParen) {
            let open = self.advance();
            let close = self.expect(&TokenKind::RParen, "expected `)` in empty tuple `()`")?;
            return Some(Spanned::new(
                TypeExprKind::EmptyTuple,
                open.span.merge(close.span),
            ));
        }
        let first = self.expect_ident("expected a type")?;
        let mut span = first.span;
        let mut path = vec![first.node];
        while self.match_token(&TokenKind::Dot) {
            let segment = self.expect_ident("expected name after `.`")?;
            span = span.merge(segment.span);
            path.push(segment.node);
        }
        Some(Spanned::new(TypeExprKind::Name(path), span))
    }

    fn type_args(&mut self) -> Option<Vec<TypeArg>> {
        if self.check(&TokenKind::RBracket) {
            self.error_at_current("expected at least one type argument");
            return None;
        }
        let mut args = vec![self.type_arg()?];
        while self.match_token(&TokenKind::Comma) {
            if self.check(&TokenKind::RBracket) {
                break;
            }
            args.push(self.type_arg()?);
        }
        Some(args)
    }

    fn type_arg(&mut self) -> Option<TypeArg> {
        // `T: bound` is only recognized as `Ident :` so that `ext.T` stays a name.
        let is_bounded = matches!(self.peek_kind(), Some(TokenKind::Ident(_)))
            && self.peek_is(|k| matches!(k, TokenKind::Colon));
        if is_bounded {
            let name = self.expect_ident("expected type variable name")?;
            self.advance(); // consume ':'
            let bound = self.type_expr()?;
            return Some(TypeArg::Bounded { name, bound });
        }
        self.type_expr().map(TypeArg::Type)
    }

    /// Skip a balanced `( ... )` group and return the closing token.
    ///
    /// Call arguments are values, not types, so they are not parsed; the
    /// lowering pass rejects the call itself.
    fn skip_call_arguments(&mut self) -> Option<Token> {
        self.expect(&TokenKind::LParen, "expected `(`")?;
        let mut depth = 1usize;
        loop {
            match self.peek_kind() {
                None | Some(TokenKind::Eof) => {
                    self.error_at_current("expected `)` to close call");
                    return None;
                }
                Some(TokenKind::LParen) => depth += 1,
                Some(TokenKind::RParen) => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(self.advance());
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    // -- Token stream helpers --

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    /// Check whether the next token (at pos+1) satisfies a predicate.
    fn peek_is(&self, pred: impl FnOnce(&TokenKind) -> bool) -> bool {
        self.tokens.get(self.pos + 1).is_some_and(|t| pred(&t.kind))
    }

    fn current_span(&self) -> Span {
        self.tokens
            .get(self.pos)
            .map(|t| t.span)
            .unwrap_or(Span::new(self.file, 0, 0))
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
    }

    fn check(&self, kind: &TokenKind) -> bool {
        self.peek_kind()
            .is_some_and(|k| std::mem::discriminant(k) == std::mem::discriminant(kind))
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn advance(&mut self) -> Token {
        let tok = self.tokens[self.pos].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn skip_newlines(&mut self) {
        while self.check(&TokenKind::Newline) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, kind: &TokenKind, msg: &str) -> Option<Token> {
        if self.check(kind) {
            Some(self.advance())
        } else {
            self.error_at_current(msg);
            None
        }
    }

    fn expect_ident(&mut self, msg: &str) -> Option<Spanned<String>> {
        if let Some(TokenKind::Ident(name)) = self.peek_kind() {
            let name = name.clone();
            let tok = self.advance();
            Some(Spanned::new(name, tok.span))
        } else {
            self.error_at_current(msg);
            None
        }
    }

    fn error_at_current(&mut self, msg: &str) {
        let span = self.current_span();
        let found = self
            .peek_kind()
            .map(TokenKind::describe)
            .unwrap_or_else(|| "end of input".to_string());
        self.errors.push(
            Diagnostic::error(Category::Syntax, format!("{msg}, found {found}")).at(
                SourceLocation {
                    file_id: self.file.0,
                    start: span.start,
                    end: span.end,
                },
            ),
        );
    }
}
