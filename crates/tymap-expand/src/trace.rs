//! Tracing types for expansion observability.
//!
//! These types capture step-by-step traces of map expansion so that outer
//! surfaces (the CLI's `--trace` flag) can show how a result was built.
//! Tracing is opt-in: `expand` formats nothing, `expand_traced` and a
//! `Lowerer` with `ExpandConfig::trace` set record every decision.

use serde::Serialize;

// ---------------------------------------------------------------------------
// Expansion steps
// ---------------------------------------------------------------------------

/// A single decision taken while expanding one `Map[...]` occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpandStep {
    pub step: usize,
    pub action: ExpandAction,
    pub input: String,
    pub output: String,
    pub detail: String,
}

/// Which rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpandAction {
    /// A lone concrete type or variable mapped to a bare `F[T]`.
    Collapse,
    /// One fixed argument mapped to `F[T]` inside an unpacked tuple.
    MapElement,
    /// The trailing variadic rest mapped to `*Ts: F`.
    MapVariadic,
    /// Mapped pieces joined into the unpacked tuple result.
    Concatenate,
}

// ---------------------------------------------------------------------------
// Per-occurrence record
// ---------------------------------------------------------------------------

/// Everything recorded for one expanded occurrence in the source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Expansion {
    pub constructor: String,
    pub arguments: Vec<String>,
    pub result: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<(u32, u32)>,
    pub steps: Vec<ExpandStep>,
}
