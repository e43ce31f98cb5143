// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Call log implementation.

use crate::call::{CallOutcome, CapturedCall, ServiceCall};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::time::{Instant, SystemTime};

/// Shared log of service calls.
///
/// Clones share the same underlying storage, so a log handed to several
/// workers collects every call in arrival order.
pub struct CallLog {
    start: Instant,
    calls: Arc<Mutex<Vec<CapturedCall>>>,
    file_writer: Option<Arc<Mutex<BufWriter<File>>>>,
}

impl CallLog {
    /// Create a new in-memory call log
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
            calls: Arc::new(Mutex::new(Vec::new())),
            file_writer: None,
        }
    }

    /// Create a call log that also appends to a file (JSONL format)
    pub fn with_file(path: &Path) -> std::io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            start: Instant::now(),
            calls: Arc::new(Mutex::new(Vec::new())),
            file_writer: Some(Arc::new(Mutex::new(BufWriter::new(file)))),
        })
    }

    /// Record a call
    pub fn record(&self, call: ServiceCall, outcome: CallOutcome) {
        let mut calls = self.calls.lock();
        let captured = CapturedCall {
            seq: calls.len() as u64,
            timestamp: SystemTime::now(),
            elapsed: self.start.elapsed(),
            call,
            outcome,
        };

        calls.push(captured.clone());

        if let Some(ref writer) = self.file_writer {
            use std::io::Write;
            let mut w = writer.lock();
            if let Ok(json) = serde_json::to_string(&captured) {
                let _ = writeln!(w, "{}", json);
                let _ = w.flush();
            }
        }
    }

    /// Get all captured calls
    pub fn calls(&self) -> Vec<CapturedCall> {
        self.calls.lock().clone()
    }

    /// Get the last N calls
    pub fn last(&self, n: usize) -> Vec<CapturedCall> {
        let all = self.calls.lock();
        all.iter().rev().take(n).rev().cloned().collect()
    }

    /// Count calls matching a predicate
    pub fn count<F: Fn(&CapturedCall) -> bool>(&self, pred: F) -> usize {
        self.calls.lock().iter().filter(|c| pred(c)).count()
    }

    /// Find calls by operation name
    pub fn find_by_operation(&self, operation: &str) -> Vec<CapturedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.call.operation == operation)
            .cloned()
            .collect()
    }

    /// Find calls made on behalf of an identity
    pub fn find_by_identity(&self, identity: &str) -> Vec<CapturedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.call.identity.as_deref() == Some(identity))
            .cloned()
            .collect()
    }

    /// Find calls that ended in an error
    pub fn find_errors(&self) -> Vec<CapturedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.outcome.is_error())
            .cloned()
            .collect()
    }

    /// Distinct access key ids used by calls made for an identity
    pub fn access_keys_for(&self, identity: &str) -> BTreeSet<String> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.call.identity.as_deref() == Some(identity))
            .filter_map(|c| c.call.access_key_id.clone())
            .collect()
    }

    /// Get the total number of calls
    pub fn len(&self) -> usize {
        self.calls.lock().len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Clear all recorded calls
    pub fn clear(&self) {
        self.calls.lock().clear();
    }
}

impl Default for CallLog {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for CallLog {
    fn clone(&self) -> Self {
        Self {
            start: self.start,
            calls: Arc::clone(&self.calls),
            file_writer: self.file_writer.as_ref().map(Arc::clone),
        }
    }
}

impl std::fmt::Debug for CallLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallLog")
            .field("calls", &self.len())
            .field("file", &self.file_writer.is_some())
            .finish()
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
