// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-query and per-identity outcomes of a validation run.

use crate::classify::FailureCategory;
use crate::expect::Verdict;
use crate::results::ResultSet;
use crate::service::{JobId, JobState};
use serde::Serialize;
use std::fmt;

/// Where a query ended up
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OutcomeStatus {
    /// The service rejected the submission outright
    SubmitFailed,
    Succeeded,
    Failed,
    Cancelled,
    /// A status check was rejected, so the job's state is unknown
    StatusFailed,
    /// Poll budget exhausted before a terminal state
    TimedOut { last_state: Option<JobState> },
}

impl OutcomeStatus {
    /// Submission, execution or status-check failure
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::SubmitFailed | Self::Failed | Self::StatusFailed)
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SubmitFailed => f.write_str("SUBMIT FAILED"),
            Self::Succeeded => f.write_str("SUCCEEDED"),
            Self::Failed => f.write_str("FAILED"),
            Self::Cancelled => f.write_str("CANCELLED"),
            Self::StatusFailed => f.write_str("STATUS CHECK FAILED"),
            Self::TimedOut {
                last_state: Some(state),
            } => write!(f, "TIMED OUT (still {})", state),
            Self::TimedOut { last_state: None } => f.write_str("TIMED OUT"),
        }
    }
}

/// Error details attached to an outcome
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub message: String,
    /// Present when the message describes a query failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<FailureCategory>,
}

impl Diagnostic {
    /// A query failure message, classified
    pub fn failure(message: impl Into<String>) -> Self {
        let message = message.into();
        let category = Some(FailureCategory::classify(&message));
        Self { message, category }
    }

    /// A note that is not a query failure (timeouts, retrieval problems)
    pub fn note(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            category: None,
        }
    }
}

/// Outcome of one (identity, query) pair
#[derive(Clone, Debug, Serialize)]
pub struct QueryOutcome {
    pub identity: String,
    pub description: String,
    pub sql: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ResultSet>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<Diagnostic>,
    pub verdict: Verdict,
}

/// Everything that happened for one identity
#[derive(Clone, Debug, Serialize)]
pub struct IdentityRun {
    pub identity: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_access: Option<String>,
    /// Role assumption error; when set, no queries ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assume_error: Option<String>,
    /// Re-assuming an expiring credential failed partway through the battery
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_error: Option<String>,
    pub outcomes: Vec<QueryOutcome>,
    /// Queries that never ran because no valid credential was available
    pub skipped_queries: usize,
}

impl IdentityRun {
    pub fn assumed(&self) -> bool {
        self.assume_error.is_none()
    }

    pub fn passed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.verdict.is_pass()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.verdict.is_fail()).count()
    }

    pub fn inconclusive(&self) -> usize {
        self.outcomes.len() - self.passed() - self.failed()
    }
}
