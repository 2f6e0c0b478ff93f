//! Error reporting and diagnostics for tymap.
//!
//! Diagnostics are created by other crates (the lexer and parser in
//! `tymap-syntax`, the lowering pass in `tymap-expand`) and rendered here for
//! display. The expansion algorithm itself never produces one: every
//! diagnostic describes input that was rejected before reaching it.

use std::fmt;

// ---------------------------------------------------------------------------
// Diagnostic categories
// ---------------------------------------------------------------------------

/// Broad category for diagnostics. Used for filtering and grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Syntax error.
    Syntax,
    /// More than one variadic rest, or a variadic rest that is not last.
    MalformedArguments,
    /// The map operator was given no type arguments to map over.
    EmptyArguments,
    /// The mapped constructor does not take exactly one parameter.
    ArityMismatch,
    /// The first argument of the map operator is not a constructor reference.
    InvalidConstructor,
    /// A type-level construct was used as a runtime value.
    Instantiation,
    /// Mapping over a pack that has already been mapped.
    NestedMapping,
    /// General annotation error.
    TypeError,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Syntax,
        Category::MalformedArguments,
        Category::EmptyArguments,
        Category::ArityMismatch,
        Category::InvalidConstructor,
        Category::Instantiation,
        Category::NestedMapping,
        Category::TypeError,
    ];

    pub fn all() -> &'static [Category] {
        &Self::ALL
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::Syntax => "syntax",
            Category::MalformedArguments => "malformed_arguments",
            Category::EmptyArguments => "empty_arguments",
            Category::ArityMismatch => "arity_mismatch",
            Category::InvalidConstructor => "invalid_constructor",
            Category::Instantiation => "instantiation",
            Category::NestedMapping => "nested_mapping",
            Category::TypeError => "type_error",
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Category::Syntax => "E0001",
            Category::MalformedArguments => "E0002",
            Category::EmptyArguments => "E0003",
            Category::ArityMismatch => "E0004",
            Category::InvalidConstructor => "E0005",
            Category::Instantiation => "E0006",
            Category::NestedMapping => "E0007",
            Category::TypeError => "E0008",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Syntax => "Source text does not parse as a valid annotation.",
            Category::MalformedArguments => {
                "A variadic rest appears more than once or not in trailing position."
            }
            Category::EmptyArguments => "The map operator needs at least one type argument.",
            Category::ArityMismatch => "The mapped constructor must take exactly one parameter.",
            Category::InvalidConstructor => {
                "The first argument of the map operator must name a type constructor."
            }
            Category::Instantiation => "A type-level construct cannot be instantiated.",
            Category::NestedMapping => "A variadic pack can be mapped at most once.",
            Category::TypeError => "General annotation error.",
        }
    }

    pub fn example_fix(self) -> &'static str {
        match self {
            Category::Syntax => "Fix parser-reported syntax near the highlighted span.",
            Category::MalformedArguments => {
                "Keep a single `*Ts` and move it to the end of the argument list."
            }
            Category::EmptyArguments => "Add the types to map over, e.g. `Map[type, int]`.",
            Category::ArityMismatch => "Map a single-parameter constructor such as `type` or `list`.",
            Category::InvalidConstructor => {
                "Pass the bare constructor name, e.g. `Map[list, T]` rather than `Map[list[T], T]`."
            }
            Category::Instantiation => "Use the construct only inside annotations.",
            Category::NestedMapping => "Map the original pack with a single composed constructor.",
            Category::TypeError => "Follow the labeled spans to correct the annotation.",
        }
    }
}

// ---------------------------------------------------------------------------
// Source locations (independent of tymap-ast's Span)
// ---------------------------------------------------------------------------

/// A source location for diagnostics.
///
/// Uses byte offsets. Callers convert from `tymap-ast` spans to this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    pub file_id: u32,
    pub start: u32,
    pub end: u32,
}

// ---------------------------------------------------------------------------
// Diagnostic
// ---------------------------------------------------------------------------

/// A structured error message. The stable code (e.g. E0002) comes from the
/// category.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub category: Category,
    /// Primary message: what went wrong.
    pub message: String,
    /// Where it went wrong.
    pub location: Option<SourceLocation>,
    /// Additional labeled spans (e.g., "first variadic rest here").
    pub labels: Vec<DiagLabel>,
    /// Suggested fix, if any.
    pub help: Option<String>,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone)]
pub struct DiagLabel {
    pub location: SourceLocation,
    pub message: String,
}

impl Diagnostic {
    pub fn error(category: Category, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            location: None,
            labels: Vec::new(),
            help: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_label(mut self, location: SourceLocation, message: impl Into<String>) -> Self {
        self.labels.push(DiagLabel {
            location,
            message: message.into(),
        });
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Attach the category's canned fix as help text.
    pub fn with_default_help(self) -> Self {
        let help = self.category.example_fix();
        self.with_help(help)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error[{}]: {}", self.category.code(), self.message)?;
        if let Some(loc) = &self.location {
            write!(f, " (at {}..{})", loc.start, loc.end)?;
        }
        for label in &self.labels {
            write!(
                f,
                "\n  note: {} (at {}..{})",
                label.message, label.location.start, label.location.end
            )?;
        }
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Error type for crates that produce diagnostics
// ---------------------------------------------------------------------------

/// Error type wrapping one or more diagnostics. Syntax errors arrive as a
/// batch, lowering errors one at a time; both convert with `?`.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{}", .0.first().map(|d| d.to_string()).unwrap_or_default())]
pub struct DiagnosticError(pub Vec<Diagnostic>);

impl DiagnosticError {
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.0
    }
}

impl From<Diagnostic> for DiagnosticError {
    fn from(diag: Diagnostic) -> Self {
        Self(vec![diag])
    }
}

impl From<Vec<Diagnostic>> for DiagnosticError {
    fn from(diags: Vec<Diagnostic>) -> Self {
        Self(diags)
    }
}
