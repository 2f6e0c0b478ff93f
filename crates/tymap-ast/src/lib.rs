//! Source spans and the syntactic annotation tree for tymap.
//!
//! This crate defines the tree produced by the parser. Every node carries a
//! [`Span`] for source location tracking. Semantic types live in
//! `tymap-types`; the lowering pass in `tymap-expand` turns one into the other.

/// Identifies a source file in the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FileId(pub u32);

/// A byte offset range within a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Span {
    pub file: FileId,
    pub start: u32,
    pub end: u32,
}

impl Span {
    pub fn new(file: FileId, start: u32, end: u32) -> Self {
        Self { file, start, end }
    }

    /// Create a span that covers both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        debug_assert_eq!(
            self.file, other.file,
            "cannot merge spans from different files"
        );
        Span {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    /// A synthetic span for nodes that do not come from source text.
    pub fn synthetic() -> Self {
        Self {
            file: FileId(u32::MAX),
            start: 0,
            end: 0,
        }
    }
}

/// A value paired with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    pub node: T,
    pub span: Span,
}

impl<T> Spanned<T> {
    pub fn new(node: T, span: Span) -> Self {
        Self { node, span }
    }
}

// ---------------------------------------------------------------------------
// Annotations
// ---------------------------------------------------------------------------

pub type TypeExpr = Spanned<TypeExprKind>;

/// A type annotation as written in source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExprKind {
    /// A possibly dotted name: `int`, `T`, `ext.Map`.
    Name(Vec<String>),

    /// Subscription: `base[arg, ...]`.
    Subscript {
        base: Box<TypeExpr>,
        args: Vec<TypeArg>,
    },

    /// Star-unpacking: `*Ts`, `*tuple[int, str]`.
    Star(Box<TypeExpr>),

    /// Call syntax: `base(...)`. Never valid in an annotation; kept so the
    /// lowering pass can say why.
    Call { callee: Box<TypeExpr> },

    /// The empty tuple marker `()` as in `tuple[()]`.
    EmptyTuple,
}

impl TypeExprKind {
    /// The full dotted path, if this is a name.
    pub fn dotted_name(&self) -> Option<String> {
        match self {
            TypeExprKind::Name(path) => Some(path.join(".")),
            _ => None,
        }
    }
}

/// One argument inside `[...]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeArg {
    /// A plain annotation.
    Type(TypeExpr),
    /// An inline bounded type variable: `T: int`.
    Bounded {
        name: Spanned<String>,
        bound: TypeExpr,
    },
}

impl TypeArg {
    pub fn span(&self) -> Span {
        match self {
            TypeArg::Type(expr) => expr.span,
            TypeArg::Bounded { name, bound } => name.span.merge(bound.span),
        }
    }
}

// ---------------------------------------------------------------------------
// Type parameters and sheets
// ---------------------------------------------------------------------------

/// A declared type parameter: `T`, `T: int`, or `*Ts`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeParam {
    Var {
        name: Spanned<String>,
        bound: Option<TypeExpr>,
    },
    VarTuple { name: Spanned<String> },
}

impl TypeParam {
    pub fn name(&self) -> &Spanned<String> {
        match self {
            TypeParam::Var { name, .. } | TypeParam::VarTuple { name } => name,
        }
    }
}

/// One line of an annotation sheet: `[T: int, *Ts] Map[type, T, *Ts]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    pub params: Vec<TypeParam>,
    pub annotation: TypeExpr,
    pub span: Span,
}

/// A parsed annotation sheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub entries: Vec<SheetEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both_spans() {
        let a = Span::new(FileId(0), 4, 8);
        let b = Span::new(FileId(0), 1, 5);
        assert_eq!(a.merge(b), Span::new(FileId(0), 1, 8));
    }

    #[test]
    fn dotted_name_joins_segments() {
        let kind = TypeExprKind::Name(vec!["ext".into(), "Map".into()]);
        assert_eq!(kind.dotted_name().as_deref(), Some("ext.Map"));
        assert_eq!(TypeExprKind::EmptyTuple.dotted_name(), None);
    }

    #[test]
    fn bounded_arg_span_covers_name_and_bound() {
        let name = Spanned::new("T".to_string(), Span::new(FileId(0), 10, 11));
        let bound = Spanned::new(
            TypeExprKind::Name(vec!["int".into()]),
            Span::new(FileId(0), 13, 16),
        );
        let arg = TypeArg::Bounded { name, bound };
        assert_eq!(arg.span(), Span::new(FileId(0), 10, 16));
    }
}
