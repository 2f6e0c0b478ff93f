//! Lexer and recursive descent parser for type annotations.
//!
//! This crate takes annotation text (a single annotation, a type parameter
//! list, or a whole sheet of annotations) and produces the tree defined in
//! `tymap-ast`.

pub mod lexer;
pub mod parser;
pub mod token;

use tymap_ast::{FileId, Sheet, TypeExpr, TypeParam};
use tymap_diag::Diagnostic;

pub use lexer::{lex, lex_sheet};
pub use parser::{parse_sheet, parse_sheet_recovering, parse_type, parse_type_params};
pub use token::{Token, TokenKind, Trivia, TriviaKind, reconstruct_source};

/// Parse a single annotation directly from source text.
pub fn parse_type_source(source: &str, file: FileId) -> Result<TypeExpr, Vec<Diagnostic>> {
    let tokens = lex(source, file)?;
    parse_type(tokens, file)
}

/// Parse a type parameter list directly from source text.
pub fn parse_type_params_source(
    source: &str,
    file: FileId,
) -> Result<Vec<TypeParam>, Vec<Diagnostic>> {
    let tokens = lex(source, file)?;
    parse_type_params(tokens, file)
}

/// Parse an annotation sheet directly from source text.
pub fn parse_sheet_source(source: &str, file: FileId) -> Result<Sheet, Vec<Diagnostic>> {
    let (tokens, errors) = lex_sheet(source, file);
    if !errors.is_empty() {
        return Err(errors);
    }
    parse_sheet(tokens, file)
}

/// Parse an annotation sheet, keeping the good entries when some lines are
/// bad. Lexer and parser errors are returned together in source order.
pub fn parse_sheet_source_recovering(source: &str, file: FileId) -> (Sheet, Vec<Diagnostic>) {
    let (tokens, mut errors) = lex_sheet(source, file);
    let (sheet, parse_errors) = parse_sheet_recovering(tokens, file);
    errors.extend(parse_errors);
    errors.sort_by_key(|diag| diag.location.map(|loc| loc.start));
    (sheet, errors)
}
