//! Error rendering using ariadne
//!
//! Diagnostics are anchored in the body text of the function they were
//! reported for, so rendering takes that text alongside the error.

use crate::{Diagnostic, Error, Severity};
use ariadne::{ColorGenerator, Label, Report, ReportKind, Source};
use std::io::Write;

const SOURCE_ID: &str = "<source>";

/// Render an error with formatting to stderr
pub fn render_error(error: &Error, source: &str) {
    render_error_to_writer(error, source, &mut std::io::stderr(), true).ok();
}

/// Render an error to a specific writer
pub fn render_error_to(error: &Error, source: &str, writer: &mut dyn Write) -> std::io::Result<()> {
    render_error_to_writer(error, source, writer, true)
}

/// Render an error to a String (useful for tests, web UIs, etc.)
///
/// # Example
/// ```
/// use rain::{CompilerOptions, FunctionSource, SymbolTable, render_error_to_string};
///
/// let table = SymbolTable::new();
/// let body = "return missing";
/// let source = FunctionSource { name: "f", parameters: &[], returns: &[], body };
/// if let Err(e) = rain::compile(&table, CompilerOptions::default(), &[source]) {
///     let formatted = render_error_to_string(&e, body);
///     assert!(formatted.contains("missing"));
/// }
/// ```
pub fn render_error_to_string(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, true).ok();
    String::from_utf8_lossy(&buf).to_string()
}

/// Same as `render_error_to_string` but without ANSI color codes.
pub fn render_error_to_string_no_color(error: &Error, source: &str) -> String {
    let mut buf = Vec::new();
    render_error_to_writer(error, source, &mut buf, false).ok();
    String::from_utf8_lossy(&buf).to_string()
}

fn render_error_to_writer(
    error: &Error,
    source: &str,
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    match error {
        Error::Compilation { diagnostics } => {
            render_diagnostics_to(source, diagnostics, writer, use_color)
        }
        Error::Internal(inner) => writeln!(writer, "Internal error: {}", inner),
    }
}

/// Renders `diagnostics`, for instance the warnings of a [`Module`](crate::Module).
pub fn render_diagnostics_to(
    source: &str,
    diagnostics: &[Diagnostic],
    writer: &mut dyn Write,
    use_color: bool,
) -> std::io::Result<()> {
    for diag in diagnostics {
        let mut colors = ColorGenerator::new();
        colors.next(); // Skip the first color.

        let kind = match diag.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
            Severity::Info => ReportKind::Advice,
        };
        let span = diag.anchor.span.0.clone();

        let mut report = Report::build(kind, (SOURCE_ID, span.clone()))
            .with_message(&diag.message)
            .with_code(diag.code)
            .with_config(ariadne::Config::default().with_color(use_color));

        let color = colors.next();
        report = report.with_label(
            Label::new((SOURCE_ID, span))
                .with_message(&diag.message)
                .with_color(color),
        );

        // Related locations as secondary labels
        for related in &diag.related {
            let color = colors.next();
            report = report.with_label(
                Label::new((SOURCE_ID, related.anchor.span.0.clone()))
                    .with_message(&related.message)
                    .with_color(color),
            );
        }

        if let Some(help) = &diag.help {
            report = report.with_help(help);
        }

        report
            .finish()
            .write((SOURCE_ID, Source::from(source)), &mut *writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CompilingType;
    use crate::{CompilerOptions, FunctionSource, SymbolTable};

    fn compile_error(body: &str, returns: &[CompilingType]) -> Error {
        let table = SymbolTable::new();
        let source = FunctionSource {
            name: "f",
            parameters: &[],
            returns,
            body,
        };
        crate::compile(&table, CompilerOptions::default(), &[source]).unwrap_err()
    }

    #[test]
    fn test_render_undefined_name() {
        let source = "return nothing_here";
        let error = compile_error(source, &[CompilingType::INTEGER]);
        let output = render_error_to_string_no_color(&error, source);

        assert!(output.contains("Error") || output.contains("error"));
        assert!(output.contains("nothing_here"));
        assert!(output.lines().count() > 1);
    }

    #[test]
    fn test_render_type_error() {
        let source = "integer n = \"hello\"";
        let error = compile_error(source, &[]);
        let output = render_error_to_string_no_color(&error, source);

        assert!(output.contains("string"));
        assert!(output.contains("E1"));
    }

    #[test]
    fn test_colorless_output_has_no_escape_codes() {
        let source = "return";
        let error = compile_error(source, &[CompilingType::INTEGER]);
        let plain = render_error_to_string_no_color(&error, source);
        assert!(!plain.is_empty());
        assert!(!plain.contains('\u{1b}'));
    }
}
