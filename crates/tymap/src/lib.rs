mod driver;

pub use driver::{
    CheckResult, CheckedEntry, ExpandResult, TraceReport, check_file, check_source,
    emit_diagnostics, expand_source, format_diagnostics, line_of,
};
