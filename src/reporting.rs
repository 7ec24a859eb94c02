use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::warn;

use crate::error::SpeechError;

/// A failure that was handled without being returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub operation: &'static str,
    pub kind: &'static str,
    pub message: String,
    pub language: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl ErrorReport {
    pub fn new(operation: &'static str, error: &SpeechError, language: Option<&str>) -> Self {
        Self {
            operation,
            kind: error.kind(),
            message: error.to_string(),
            language: language.map(|l| l.to_string()),
            occurred_at: Utc::now(),
        }
    }
}

/// Sink for suppressed errors.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, report: ErrorReport);
}

fn log_report(report: &ErrorReport) {
    warn!(
        operation = report.operation,
        kind = report.kind,
        language = report.language.as_deref().unwrap_or(""),
        error = %report.message,
        "Suppressed error"
    );
}

/// Emits every report as a structured `warn` event and keeps the most recent
/// ones in memory.
#[derive(Debug)]
pub struct RecentErrors {
    capacity: usize,
    reports: Mutex<VecDeque<ErrorReport>>,
    total: Mutex<u64>,
}

impl RecentErrors {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            reports: Mutex::new(VecDeque::new()),
            total: Mutex::new(0),
        }
    }

    /// Newest last.
    pub fn recent(&self) -> Vec<ErrorReport> {
        self.reports
            .lock()
            .map(|r| r.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn total(&self) -> u64 {
        self.total.lock().map(|t| *t).unwrap_or(0)
    }
}

impl Default for RecentErrors {
    fn default() -> Self {
        Self::new(32)
    }
}

impl ErrorReporter for RecentErrors {
    fn report(&self, report: ErrorReport) {
        log_report(&report);
        if let Ok(mut total) = self.total.lock() {
            *total += 1;
        }
        if let Ok(mut reports) = self.reports.lock() {
            if reports.len() == self.capacity {
                reports.pop_front();
            }
            reports.push_back(report);
        }
    }
}
