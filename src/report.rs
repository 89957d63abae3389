//! The two diagnostic reporters (§6): one for compiler diagnostics, one for
//! the driver's own build-status narration (`Building project '...'`,
//! `Project '...' is out of date because ...`). Reports through
//! tracing-event-plus-`yansi`-coloring rather than a `println!` call
//! scattered through the driver.

use crate::{compiler::Diagnostic, id::ProjectId, status::UpToDateStatus};
use yansi::Paint;

/// Receives compiler diagnostics as they're produced (§6).
pub trait DiagnosticReporter: Send + Sync {
    fn report(&self, project: &ProjectId, diagnostic: &Diagnostic);
}

/// Receives the driver's own narration of what it's doing and why (§4.D/§6
/// `verbose`).
pub trait StatusReporter: Send + Sync {
    fn building(&self, project: &ProjectId);
    fn up_to_date(&self, project: &ProjectId, status: &UpToDateStatus);
    fn out_of_date(&self, project: &ProjectId, status: &UpToDateStatus);
    fn cleaning(&self, project: &ProjectId);
}

/// Reports diagnostics through `tracing`, colored by severity when the
/// terminal supports it.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnosticReporter;

impl DiagnosticReporter for TracingDiagnosticReporter {
    fn report(&self, project: &ProjectId, diagnostic: &Diagnostic) {
        let line = format!("{}: {}", diagnostic.severity, diagnostic.message).paint(diagnostic.severity.color());
        if diagnostic.severity.is_error() {
            error!(%project, "{line}");
        } else {
            warn!(%project, "{line}");
        }
    }
}

/// Reports build-status narration through `tracing`, at `info` for the
/// headline actions and `debug` for the "why" detail.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusReporter;

impl StatusReporter for TracingStatusReporter {
    fn building(&self, project: &ProjectId) {
        info!(%project, "building project");
    }

    fn up_to_date(&self, project: &ProjectId, status: &UpToDateStatus) {
        debug!(%project, kind = status.kind(), "project is up to date, skipping");
    }

    fn out_of_date(&self, project: &ProjectId, status: &UpToDateStatus) {
        debug!(%project, kind = status.kind(), "project is out of date");
    }

    fn cleaning(&self, project: &ProjectId) {
        info!(%project, "cleaning project outputs");
    }
}
