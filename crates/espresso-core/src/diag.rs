//! The diagnostic model and sink.
//!
//! Every pass reports into one [`DiagnosticSink`]; nothing in the middle-end
//! prints. Rendering, ordering and exit-code policy belong to the driver.

use crate::span::SourceRange;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Debug,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub range: SourceRange,
}

impl Diagnostic {
    pub fn error(code: &'static str, message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            range,
        }
    }

    pub fn warning(code: &'static str, message: impl Into<String>, range: SourceRange) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            range,
        }
    }
}

/// Accumulates diagnostics across all passes of one compilation.
#[derive(Default, Debug)]
pub struct DiagnosticSink {
    diags: Vec<Diagnostic>,
}

impl DiagnosticSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, diag: Diagnostic) {
        self.diags.push(diag);
    }

    /// Convenience for the common error case; callers that abort an
    /// expression pair this with their own control-flow signal.
    pub fn report_error(
        &mut self,
        code: &'static str,
        message: impl Into<String>,
        range: SourceRange,
    ) {
        self.report(Diagnostic::error(code, message, range));
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.diags
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    /// The driver skips later phases when an earlier one errored.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diags.iter().any(|d| d.severity == Severity::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sink_counts_only_errors() {
        let mut sink = DiagnosticSink::new();
        sink.report(Diagnostic::warning(
            "unused",
            "unused local",
            SourceRange::default(),
        ));
        assert!(!sink.has_errors());
        sink.report_error("type", "int is not assignable to boolean", SourceRange::default());
        assert!(sink.has_errors());
        assert_eq!(sink.error_count(), 1);
        assert_eq!(sink.diagnostics().len(), 2);
    }
}
