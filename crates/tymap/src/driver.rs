use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Serialize;
use tymap_ast::{FileId, SheetEntry};
use tymap_diag::{Diagnostic, DiagnosticError};
use tymap_expand::{ExpandConfig, Expansion, Lowerer};
use tymap_syntax::{parse_sheet_source_recovering, parse_type_params_source, parse_type_source};
use tymap_types::Type;

/// One annotation after expansion.
#[derive(Debug, Clone)]
pub struct ExpandResult {
    pub ty: Type,
    pub expansions: Vec<Expansion>,
}

/// Outcome of one sheet line. Failing lines keep their diagnostic so the
/// rest of the sheet is still checked.
#[derive(Debug, Clone)]
pub struct CheckedEntry {
    pub line: usize,
    pub source: String,
    pub result: Result<Type, Diagnostic>,
    pub expansions: Vec<Expansion>,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub entries: Vec<CheckedEntry>,
}

impl CheckResult {
    pub fn failures(&self) -> impl Iterator<Item = &CheckedEntry> {
        self.entries.iter().filter(|entry| entry.result.is_err())
    }
}

/// Serialized shape of `--trace` output.
#[derive(Debug, Serialize)]
pub struct TraceReport<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    pub annotation: &'a str,
    pub result: Option<String>,
    pub expansions: &'a [Expansion],
}

/// Expand a single annotation, with optional `T, *Ts`-style parameters in
/// scope.
pub fn expand_source(
    annotation: &str,
    params: Option<&str>,
    config: &ExpandConfig,
) -> Result<ExpandResult, DiagnosticError> {
    let expr = parse_type_source(annotation, FileId(0))?;
    let params = match params {
        Some(params) => parse_type_params_source(params, FileId(1))?,
        None => Vec::new(),
    };

    let mut lowerer = Lowerer::new(config);
    let scope = lowerer.scope_from_params(&params)?;
    let ty = lowerer.lower_type(&expr, &scope)?;
    Ok(ExpandResult {
        ty,
        expansions: lowerer.take_expansions(),
    })
}

/// Expand every entry of an annotation sheet.
///
/// Each line stands alone: a line with a syntax error becomes a failing
/// entry carrying its first diagnostic, and the remaining lines are still
/// expanded. Entries come back in line order.
pub fn check_source(source: &str, config: &ExpandConfig) -> CheckResult {
    let (sheet, errors) = parse_sheet_source_recovering(source, FileId(0));

    let mut broken: BTreeMap<usize, Diagnostic> = BTreeMap::new();
    for diag in errors {
        let offset = diag.location.map_or(0, |loc| loc.start as usize);
        broken.entry(line_of(source, offset)).or_insert(diag);
    }

    let mut lowerer = Lowerer::new(config);
    let mut entries = Vec::with_capacity(sheet.entries.len() + broken.len());
    for entry in &sheet.entries {
        // A character the lexer skipped still fails its line.
        if broken.contains_key(&line_of(source, entry.span.start as usize)) {
            continue;
        }
        entries.push(check_entry(&mut lowerer, entry, source));
    }
    for (line, diag) in broken {
        entries.push(CheckedEntry {
            line,
            source: line_text(source, line).to_string(),
            result: Err(diag),
            expansions: Vec::new(),
        });
    }
    entries.sort_by_key(|entry| entry.line);
    CheckResult { entries }
}

pub fn check_file(input: &Path, config: &ExpandConfig) -> Result<CheckResult, String> {
    let source = fs::read_to_string(input)
        .map_err(|err| format!("failed to read `{}`: {err}", input.display()))?;
    Ok(check_source(&source, config))
}

fn check_entry(lowerer: &mut Lowerer<'_>, entry: &SheetEntry, source: &str) -> CheckedEntry {
    let start = entry.span.start as usize;
    let end = (entry.span.end as usize).min(source.len());
    let result = lowerer.lower_entry(entry);
    CheckedEntry {
        line: line_of(source, start),
        source: source.get(start..end).unwrap_or_default().to_string(),
        result,
        expansions: lowerer.take_expansions(),
    }
}

/// One-based line number of a byte offset.
pub fn line_of(source: &str, offset: usize) -> usize {
    let offset = offset.min(source.len());
    source.as_bytes()[..offset]
        .iter()
        .filter(|&&byte| byte == b'\n')
        .count()
        + 1
}

/// Text of a one-based line without its trailing comment.
fn line_text(source: &str, line: usize) -> &str {
    let text = source.lines().nth(line.saturating_sub(1)).unwrap_or_default();
    text.split('#').next().unwrap_or_default().trim()
}

pub fn emit_diagnostics(diags: &[Diagnostic]) {
    for diag in diags {
        eprintln!("{diag}");
    }
}

pub fn format_diagnostics(prefix: &str, diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return prefix.to_string();
    }

    let rendered = diagnostics
        .iter()
        .map(|d| format!("  - {d}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("{prefix}:\n{rendered}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tymap_diag::Category;

    #[test]
    fn expand_source_with_params() {
        let result = expand_source("Map[type, int, T, *Ts]", Some("T, *Ts"), &ExpandConfig::default())
            .expect("annotation should expand");
        assert_eq!(result.ty.to_string(), "*tuple[type[int], type[T], *Ts: type]");
        assert!(result.expansions.is_empty());
    }

    #[test]
    fn expand_source_reports_syntax_errors() {
        let err = expand_source("Map[type, int", None, &ExpandConfig::default())
            .expect_err("unclosed subscript");
        assert_eq!(err.diagnostics()[0].category, Category::Syntax);
    }

    #[test]
    fn expand_source_reports_lowering_errors() {
        let err = expand_source("Map[type, *Ts, int]", None, &ExpandConfig::default())
            .expect_err("variadic rest is not last");
        assert_eq!(err.diagnostics().len(), 1);
        assert_eq!(err.diagnostics()[0].category, Category::MalformedArguments);
    }

    #[test]
    fn expand_source_collects_trace_when_enabled() {
        let config = ExpandConfig::default().with_trace(true);
        let result = expand_source("Map[type, int, str]", None, &config).expect("expands");
        assert_eq!(result.expansions.len(), 1);
        assert_eq!(result.expansions[0].steps.len(), 3);
    }

    #[test]
    fn check_source_keeps_going_after_a_failure() {
        let source = "Map[type, int]\n\n# comment\nMap[dict, int]\n[*Ts] Map[list, *Ts]\n";
        let result = check_source(source, &ExpandConfig::default());
        assert_eq!(result.entries.len(), 3);

        let lines: Vec<usize> = result.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 4, 5]);
        assert_eq!(result.entries[1].source, "Map[dict, int]");
        assert_eq!(
            result.entries[2].result.as_ref().ok().map(ToString::to_string),
            Some("*Ts: list".to_string())
        );

        let failures: Vec<usize> = result.failures().map(|e| e.line).collect();
        assert_eq!(failures, vec![4]);
    }

    #[test]
    fn check_source_expands_lines_around_a_syntax_error() {
        let source = "Map[type, int]\nMap[type,, int]\nMap[list, str]\n";
        let result = check_source(source, &ExpandConfig::default());

        let lines: Vec<usize> = result.entries.iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![1, 2, 3]);
        let failed = &result.entries[1];
        assert_eq!(failed.source, "Map[type,, int]");
        assert!(
            matches!(&failed.result, Err(diag) if diag.category == Category::Syntax),
            "{:?}",
            failed.result
        );
        assert_eq!(
            result.entries[2].result.as_ref().ok().map(ToString::to_string),
            Some("list[str]".to_string())
        );
    }

    #[test]
    fn check_source_unclosed_bracket_fails_only_its_line() {
        let source = "Map[type, int\nMap[list, str]\nMap[set, bytes]  # ok\n";
        let result = check_source(source, &ExpandConfig::default());

        let rendered: Vec<(usize, Option<String>)> = result
            .entries
            .iter()
            .map(|e| (e.line, e.result.as_ref().ok().map(ToString::to_string)))
            .collect();
        assert_eq!(
            rendered,
            vec![
                (1, None),
                (2, Some("list[str]".to_string())),
                (3, Some("set[bytes]".to_string())),
            ]
        );
        assert_eq!(result.entries[0].source, "Map[type, int");
    }

    #[test]
    fn check_source_lex_error_fails_its_line() {
        let source = "Map[type, int?]\nMap[list, str]\n";
        let result = check_source(source, &ExpandConfig::default());
        let failures: Vec<usize> = result.failures().map(|e| e.line).collect();
        assert_eq!(failures, vec![1]);
        assert_eq!(result.entries.len(), 2);
        assert!(result.entries[1].result.is_ok());
    }

    #[test]
    fn line_of_counts_newlines() {
        assert_eq!(line_of("a\nb\nc", 0), 1);
        assert_eq!(line_of("a\nb\nc", 2), 2);
        assert_eq!(line_of("a\nb\nc", 99), 3);
    }

    #[test]
    fn format_diagnostics_lists_each() {
        let diags = vec![Diagnostic::error(Category::Syntax, "bad")];
        assert_eq!(
            format_diagnostics("failed", &diags),
            "failed:\n  - error[E0001]: bad"
        );
        assert_eq!(format_diagnostics("failed", &[]), "failed");
    }
}
