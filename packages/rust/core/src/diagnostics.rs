//! Collection of recoverable anomalies met while parsing.

use tracing::warn;

use iodschema_shared::{Diagnostic, DiagnosticKind};

/// Ordered log of diagnostics for one parse run.
///
/// Every report is also emitted as a `warn!` event so it shows up in the
/// terminal as it happens.
#[derive(Debug, Default)]
pub struct DiagnosticLog {
    entries: Vec<Diagnostic>,
}

impl DiagnosticLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic and emit it as a warning.
    pub fn report(&mut self, kind: DiagnosticKind, message: impl Into<String>) {
        let message = message.into();
        warn!(kind = ?kind, "{message}");
        self.entries.push(Diagnostic::new(kind, message));
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of diagnostics of a given kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.entries.iter().filter(|d| d.kind == kind).count()
    }

    pub fn into_entries(self) -> Vec<Diagnostic> {
        self.entries
    }
}
