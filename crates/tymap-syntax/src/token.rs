//! Token types produced by the annotation lexer.

use tymap_ast::Span;

/// The kind of a trivia element attached to a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriviaKind {
    /// Spaces, tabs, and newlines that do not end an entry.
    Whitespace,
    /// A `#` comment up to (not including) the end of the line.
    Comment,
}

/// Whitespace or a comment preceding a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trivia {
    pub kind: TriviaKind,
    pub text: String,
    pub span: Span,
}

/// A token with its kind, source span, and leading trivia.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub leading_trivia: Vec<Trivia>,
}

/// Reconstruct source text from tokens with trivia.
///
/// For any source that lexes successfully,
/// `reconstruct_source(&lex(source), source) == source`.
pub fn reconstruct_source(tokens: &[Token], source: &str) -> String {
    let mut output = String::new();
    for token in tokens {
        for t in &token.leading_trivia {
            output.push_str(&t.text);
        }
        if token.kind != TokenKind::Eof {
            let start = token.span.start as usize;
            let end = token.span.end as usize;
            output.push_str(&source[start..end]);
        }
    }
    output
}

/// The kind of a lexical token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Identifier: `int`, `T`, `_Private`, `Map`.
    Ident(String),
    /// Integer literal. Only meaningful inside call arguments.
    Number(String),

    LBracket,
    RBracket,
    LParen,
    RParen,
    Comma,
    Colon,
    Dot,
    Star,

    /// End of an entry. Only emitted outside brackets and parentheses.
    Newline,
    Eof,
}

impl TokenKind {
    /// Human-readable form for diagnostics and snapshots.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(name) => format!("identifier `{name}`"),
            TokenKind::Number(digits) => format!("number `{digits}`"),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}
