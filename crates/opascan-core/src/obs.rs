//! Structured scan lifecycle events.
//!
//! Every event carries `event = "scan.*"` and the scan id so log pipelines
//! can stitch a scan back together.

use tracing::{info, warn, Span};

use crate::dialect::Dialect;
use crate::verdict::ScanVerdict;

/// Span covering one scan. Attach with `tracing::Instrument`.
pub fn scan_span(scan_id: &str) -> Span {
    tracing::info_span!("opascan.scan", scan_id = %scan_id)
}

pub fn emit_scan_started(scan_id: &str, input: &str, rule_sources: usize) {
    info!(
        event = "scan.started",
        scan_id = %scan_id,
        input = %input,
        rule_sources = rule_sources,
    );
}

pub fn emit_documents_loaded(scan_id: &str, dialect: Dialect, documents: usize, modules: usize) {
    info!(
        event = "scan.documents_loaded",
        scan_id = %scan_id,
        dialect = %dialect,
        documents = documents,
        modules = modules,
    );
}

pub fn emit_scan_finished(scan_id: &str, duration_ms: u64, rules: usize, success: bool) {
    info!(
        event = "scan.finished",
        scan_id = %scan_id,
        duration_ms = duration_ms,
        rules = rules,
        success = success,
    );
}

/// Failed verdicts are logged at warn level.
pub fn emit_verdict(scan_id: &str, verdict: &ScanVerdict) {
    if verdict.passed {
        info!(event = "scan.verdict", scan_id = %scan_id, passed = true, failures = 0usize);
    } else {
        warn!(
            event = "scan.verdict",
            scan_id = %scan_id,
            passed = false,
            failures = verdict.failures.len(),
            message = %verdict.message,
        );
    }
}
