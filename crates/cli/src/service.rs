// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Service seams the engine talks to.
//!
//! `RoleAssumer` exchanges a role reference for a scoped credential;
//! `QueryService` runs SQL asynchronously under such a credential. Every
//! query-side call takes the credential explicitly, so an implementation
//! never falls back to ambient process credentials.

use crate::credential::{Credential, RoleRef, SessionLabel};
use crate::error::{Result, ServiceError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Role-assumption service
#[async_trait]
pub trait RoleAssumer: Send + Sync {
    async fn assume_role(&self, role: &RoleRef, session: &SessionLabel) -> Result<Credential>;
}

/// Asynchronous query-execution service
#[async_trait]
pub trait QueryService: Send + Sync {
    /// Submit `sql` and return the job id
    async fn start_query(
        &self,
        credential: &Credential,
        sql: &str,
        target: &ExecutionTarget,
    ) -> Result<JobId>;

    /// Current state of a job, with the state-change reason if any
    async fn get_status(
        &self,
        credential: &Credential,
        job: &JobId,
        target: &ExecutionTarget,
    ) -> Result<JobStatus>;

    /// One page of raw result rows. Row 0 of the first page is the header.
    async fn get_results(
        &self,
        credential: &Credential,
        job: &JobId,
        target: &ExecutionTarget,
        page: PageRequest,
    ) -> Result<ResultPage>;

    /// Ask the service to stop a running job
    async fn stop_query(
        &self,
        credential: &Credential,
        job: &JobId,
        target: &ExecutionTarget,
    ) -> Result<()>;
}

/// Where and how queries run
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionTarget {
    /// Pre-provisioned execution group
    pub workgroup: String,
    /// Results location the identity may write to, e.g. `s3://bucket/prefix/`
    pub output_location: String,
    pub region: String,
    /// Default database for unqualified table names
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

/// Opaque query job identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

/// Lowercase hex UUID, 8-4-4-4-12
fn is_execution_id(id: &str) -> bool {
    let groups: Vec<&str> = id.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f')))
}

impl JobId {
    /// Wrap an id returned by a backend without validation
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Wrap a backend id, rejecting a blank one
    pub fn non_empty(id: &str) -> Option<Self> {
        let id = id.trim();
        (!id.is_empty()).then(|| Self(id.to_string()))
    }

    /// Parse an id, requiring the UUID shape Athena emits
    pub fn parse(id: &str) -> Result<Self> {
        let id = id.trim();
        if is_execution_id(id) {
            Ok(Self(id.to_string()))
        } else {
            Err(ServiceError::invalid_request(format!(
                "'{}' is not a query execution id",
                id
            )))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Job lifecycle state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl JobState {
    /// Succeeded, failed, and cancelled never transition further
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Queued => "QUEUED",
            Self::Running => "RUNNING",
            Self::Succeeded => "SUCCEEDED",
            Self::Failed => "FAILED",
            Self::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Status snapshot of a job
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobStatus {
    pub state: JobState,
    /// Human-readable state-change reason, usually present on failure
    pub reason: Option<String>,
}

impl JobStatus {
    pub fn new(state: JobState) -> Self {
        Self {
            state,
            reason: None,
        }
    }

    pub fn with_reason(state: JobState, reason: impl Into<String>) -> Self {
        Self {
            state,
            reason: Some(reason.into()),
        }
    }
}

/// Pagination request for result retrieval
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PageRequest {
    pub token: Option<String>,
    pub max_rows: usize,
}

/// One page of raw rows
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResultPage {
    pub rows: Vec<Vec<Option<String>>>,
    pub next_token: Option<String>,
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
