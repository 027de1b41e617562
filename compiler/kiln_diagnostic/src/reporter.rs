//! Thread-safe diagnostic sink.
//!
//! Synthesizers run on worker threads, so diagnostics are collected behind a
//! lock and read back once the pass is done.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::{Diagnostic, ErrorGuaranteed};

#[derive(Default)]
struct ReporterState {
    diagnostics: Mutex<Vec<Diagnostic>>,
    error_count: AtomicUsize,
}

/// Shared handle to a diagnostic collection.
#[derive(Clone, Default)]
pub struct Reporter(Arc<ReporterState>);

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report an error diagnostic.
    pub fn error(&self, diagnostic: Diagnostic) -> ErrorGuaranteed {
        debug_assert!(diagnostic.is_error());
        self.push(diagnostic);
        ErrorGuaranteed::new()
    }

    /// Report a diagnostic of any severity.
    pub fn report(&self, diagnostic: Diagnostic) -> Option<ErrorGuaranteed> {
        let is_error = diagnostic.is_error();
        self.push(diagnostic);
        is_error.then(ErrorGuaranteed::new)
    }

    fn push(&self, diagnostic: Diagnostic) {
        tracing::debug!(
            code = %diagnostic.code,
            severity = %diagnostic.severity,
            "diagnostic reported"
        );
        if diagnostic.is_error() {
            self.0.error_count.fetch_add(1, Ordering::Relaxed);
        }
        self.0.diagnostics.lock().push(diagnostic);
    }

    pub fn error_count(&self) -> usize {
        self.0.error_count.load(Ordering::Relaxed)
    }

    pub fn has_errors(&self) -> Option<ErrorGuaranteed> {
        ErrorGuaranteed::from_error_count(self.error_count())
    }

    /// Snapshot of everything reported so far, in report order.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.0.diagnostics.lock().clone()
    }

    /// Drain the collected diagnostics. The error count is kept.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.0.diagnostics.lock())
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("error_count", &self.error_count())
            .finish_non_exhaustive()
    }
}
