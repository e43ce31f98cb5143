// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The validation engine.
//!
//! For each identity the engine assumes the identity's role, runs its
//! queries one after another under the resulting credential, and checks
//! every outcome against its expectation. The credential lives in a
//! [`CredentialScope`] owned by that identity's run and is passed to each
//! service call; nothing is written to process-wide state. Failures are
//! contained at the smallest scope (query, then identity) so one run
//! surfaces as many discrepancies as possible.

use crate::config::PollPolicy;
use crate::credential::{Credential, RoleRef, SessionLabel};
use crate::error::{Result, ServiceError};
use crate::outcome::{Diagnostic, IdentityRun, OutcomeStatus, QueryOutcome};
use crate::results::ResultSet;
use crate::service::{ExecutionTarget, JobId, JobState, PageRequest, QueryService, RoleAssumer};
use crate::suite::{ResolvedIdentity, ResolvedQuery};
use crate::time::{Clock, ClockHandle};
use lakeguard_capture::{CallLog, CallOutcome, ServiceCall};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;

/// Default number of data rows fetched per query
pub const DEFAULT_MAX_ROWS: usize = 20;

/// Largest page the results call accepts
const PAGE_LIMIT: usize = 1000;

/// Re-assume a role when its credential expires within this margin
const REFRESH_MARGIN_SECS: i64 = 60;

/// An identity's name together with its scoped credential
#[derive(Debug)]
pub struct CredentialScope {
    pub identity: String,
    pub role: RoleRef,
    pub credential: Credential,
}

/// Proof that a job reached the succeeded state.
///
/// Only [`Engine::await_completion`] constructs one, and
/// [`Engine::fetch_results`] requires one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedJob {
    job: JobId,
}

impl CompletedJob {
    pub fn job_id(&self) -> &JobId {
        &self.job
    }
}

/// How waiting on a job ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalStatus {
    Succeeded(CompletedJob),
    Failed { reason: Option<String> },
    Cancelled { reason: Option<String> },
    /// A status call failed with an error that retrying cannot fix
    StatusUnavailable(ServiceError),
    /// Poll budget ran out; the job may still be running remotely
    TimedOut {
        last_state: Option<JobState>,
        last_error: Option<ServiceError>,
    },
}

/// Runs query batteries for identities against the services
#[derive(Clone)]
pub struct Engine {
    roles: Arc<dyn RoleAssumer>,
    queries: Arc<dyn QueryService>,
    target: ExecutionTarget,
    clock: ClockHandle,
    poll: PollPolicy,
    max_rows: usize,
    capture: Option<CallLog>,
}

impl Engine {
    pub fn new(
        roles: Arc<dyn RoleAssumer>,
        queries: Arc<dyn QueryService>,
        target: ExecutionTarget,
    ) -> Self {
        Self {
            roles,
            queries,
            target,
            clock: ClockHandle::system(),
            poll: PollPolicy::default(),
            max_rows: DEFAULT_MAX_ROWS,
            capture: None,
        }
    }

    pub fn with_clock(mut self, clock: ClockHandle) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_poll_policy(mut self, poll: PollPolicy) -> Self {
        self.poll = poll;
        self
    }

    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = max_rows;
        self
    }

    /// Record every service call into `log`
    pub fn with_capture(mut self, log: CallLog) -> Self {
        self.capture = Some(log);
        self
    }

    pub fn target(&self) -> &ExecutionTarget {
        &self.target
    }

    pub fn poll_policy(&self) -> &PollPolicy {
        &self.poll
    }

    /// Assume `role` for `identity` with a caller-chosen session label
    pub async fn assume_identity(
        &self,
        identity: &str,
        role: &RoleRef,
        session: &SessionLabel,
    ) -> Result<Credential> {
        let call = ServiceCall::new("sts", "AssumeRole")
            .identity(identity)
            .detail(role.to_string());
        match self.roles.assume_role(role, session).await {
            Ok(credential) => {
                self.record(call, CallOutcome::ok_with(&credential.access_key_id));
                tracing::info!(%identity, %role, session = %session, "assumed role");
                Ok(credential)
            }
            Err(e) => {
                self.record(call, CallOutcome::error(e.code(), e.message()));
                tracing::warn!(%identity, %role, error = %e, "role assumption failed");
                Err(e)
            }
        }
    }

    /// Assume the identity's role with a fresh session label
    pub async fn open_scope(&self, identity: &str, role: &RoleRef) -> Result<CredentialScope> {
        let session = SessionLabel::for_identity(identity, self.clock.now_millis());
        let credential = self.assume_identity(identity, role, &session).await?;
        Ok(CredentialScope {
            identity: identity.to_string(),
            role: role.clone(),
            credential,
        })
    }

    /// Submit SQL under the scope's credential
    pub async fn submit_query(&self, scope: &CredentialScope, sql: &str) -> Result<JobId> {
        let call = self.call(scope, "StartQueryExecution").detail(sql);
        if sql.trim().is_empty() {
            let err = ServiceError::invalid_request("SQL text is empty");
            self.record(call, CallOutcome::error(err.code(), err.message()));
            return Err(err);
        }

        match self
            .queries
            .start_query(&scope.credential, sql, &self.target)
            .await
        {
            Ok(job) => {
                self.record(call.job_id(job.as_str()), CallOutcome::ok());
                tracing::info!(identity = %scope.identity, job_id = %job, "query submitted");
                Ok(job)
            }
            Err(e) => {
                self.record(call, CallOutcome::error(e.code(), e.message()));
                tracing::warn!(identity = %scope.identity, error = %e, "query submission failed");
                Err(e)
            }
        }
    }

    /// Poll until the job is terminal or the attempt budget is spent.
    ///
    /// Exactly `max_attempts` status calls are made at most, with one
    /// interval sleep between consecutive calls. A throttled or transport
    /// failure uses up an attempt; any other status error ends the wait.
    pub async fn await_completion(&self, scope: &CredentialScope, job: &JobId) -> TerminalStatus {
        let mut last_state = None;
        let mut last_error = None;

        for attempt in 1..=self.poll.max_attempts {
            if attempt > 1 {
                self.clock.sleep(self.poll.interval).await;
            }

            let call = self.call(scope, "GetQueryExecution").job_id(job.as_str());
            match self
                .queries
                .get_status(&scope.credential, job, &self.target)
                .await
            {
                Ok(status) => {
                    self.record(call, CallOutcome::ok_with(status.state.to_string()));
                    tracing::debug!(job_id = %job, attempt, state = %status.state, "polled");
                    last_state = Some(status.state);
                    last_error = None;
                    match status.state {
                        JobState::Succeeded => {
                            return TerminalStatus::Succeeded(CompletedJob { job: job.clone() })
                        }
                        JobState::Failed => {
                            return TerminalStatus::Failed {
                                reason: status.reason,
                            }
                        }
                        JobState::Cancelled => {
                            return TerminalStatus::Cancelled {
                                reason: status.reason,
                            }
                        }
                        JobState::Queued | JobState::Running => {}
                    }
                }
                Err(e) => {
                    self.record(call, CallOutcome::error(e.code(), e.message()));
                    if !e.is_retryable() {
                        tracing::warn!(job_id = %job, attempt, error = %e, "status check rejected");
                        return TerminalStatus::StatusUnavailable(e);
                    }
                    tracing::warn!(job_id = %job, attempt, error = %e, "status poll failed");
                    last_error = Some(e);
                }
            }
        }

        tracing::warn!(
            job_id = %job,
            attempts = self.poll.max_attempts,
            "query still running after poll budget"
        );
        if self.poll.cancel_on_timeout {
            self.stop_query(scope, job).await;
        }
        TerminalStatus::TimedOut {
            last_state,
            last_error,
        }
    }

    /// Fetch up to `max_rows` data rows of a succeeded job
    pub async fn fetch_results(
        &self,
        scope: &CredentialScope,
        done: &CompletedJob,
    ) -> Result<ResultSet> {
        let wanted = self.max_rows.saturating_add(1);
        let mut raw: Vec<Vec<Option<String>>> = Vec::new();
        let mut token = None;

        loop {
            let call = self.call(scope, "GetQueryResults").job_id(done.job.as_str());
            let page = PageRequest {
                token: token.take(),
                max_rows: (wanted - raw.len()).min(PAGE_LIMIT),
            };
            let page = match self
                .queries
                .get_results(&scope.credential, &done.job, &self.target, page)
                .await
            {
                Ok(page) => {
                    self.record(call, CallOutcome::ok_with(format!("{} rows", page.rows.len())));
                    page
                }
                Err(e) => {
                    self.record(call, CallOutcome::error(e.code(), e.message()));
                    return Err(e);
                }
            };

            let empty_page = page.rows.is_empty();
            raw.extend(page.rows);
            match page.next_token {
                Some(next) if raw.len() < wanted && !empty_page => token = Some(next),
                _ => break,
            }
        }

        raw.truncate(wanted);
        Ok(ResultSet::from_raw(raw))
    }

    /// Run one query and check it against its expectation
    pub async fn run_query(&self, scope: &CredentialScope, query: &ResolvedQuery) -> QueryOutcome {
        let mut job_id = None;
        let mut result = None;
        let mut diagnostic = None;

        let status = match self.submit_query(scope, &query.sql).await {
            Err(e) => {
                diagnostic = Some(Diagnostic::failure(e.to_string()));
                OutcomeStatus::SubmitFailed
            }
            Ok(job) => {
                job_id = Some(job.clone());
                match self.await_completion(scope, &job).await {
                    TerminalStatus::Succeeded(done) => {
                        match self.fetch_results(scope, &done).await {
                            Ok(rs) => result = Some(rs),
                            Err(e) => {
                                tracing::warn!(job_id = %job, error = %e, "result retrieval failed");
                                diagnostic = Some(Diagnostic::note(format!(
                                    "query succeeded but results could not be retrieved: {}",
                                    e
                                )));
                            }
                        }
                        OutcomeStatus::Succeeded
                    }
                    TerminalStatus::Failed { reason } => {
                        let reason = match reason {
                            Some(reason) => reason,
                            None => self.failure_reason(scope, &job).await,
                        };
                        diagnostic = Some(Diagnostic::failure(reason));
                        OutcomeStatus::Failed
                    }
                    TerminalStatus::Cancelled { reason } => {
                        diagnostic = Some(Diagnostic::note(
                            reason.unwrap_or_else(|| "query was cancelled".to_string()),
                        ));
                        OutcomeStatus::Cancelled
                    }
                    TerminalStatus::StatusUnavailable(e) => {
                        diagnostic = Some(Diagnostic::failure(format!(
                            "query status could not be read: {}",
                            e
                        )));
                        OutcomeStatus::StatusFailed
                    }
                    TerminalStatus::TimedOut {
                        last_state,
                        last_error,
                    } => {
                        let waited = self
                            .poll
                            .interval
                            .checked_mul(self.poll.max_attempts.saturating_sub(1))
                            .unwrap_or(Duration::MAX);
                        let mut tail = match last_error {
                            Some(e) => format!("; last status check failed: {}", e),
                            None => String::new(),
                        };
                        if self.poll.cancel_on_timeout {
                            tail.push_str("; stop requested");
                        } else if tail.is_empty() {
                            tail.push_str("; the query may still be running");
                        }
                        diagnostic = Some(Diagnostic::note(format!(
                            "no terminal state after {} polls ({:.1}s){}",
                            self.poll.max_attempts,
                            waited.as_secs_f64(),
                            tail
                        )));
                        OutcomeStatus::TimedOut { last_state }
                    }
                }
            }
        };

        let category = diagnostic.as_ref().and_then(|d| d.category);
        let verdict = query.expect.evaluate(&status, result.as_ref(), category);
        tracing::info!(
            identity = %scope.identity,
            description = %query.description,
            %status,
            ?verdict,
            "query finished"
        );

        QueryOutcome {
            identity: scope.identity.clone(),
            description: query.description.clone(),
            sql: query.sql.clone(),
            job_id,
            status,
            result,
            diagnostic,
            verdict,
        }
    }

    /// Run an identity's battery.
    ///
    /// A role assumption failure skips the identity's queries; a failed
    /// refresh skips the ones not yet run. The scope, and with it the
    /// credential, is dropped before this returns.
    pub async fn run_identity(&self, identity: &ResolvedIdentity) -> IdentityRun {
        let mut run = IdentityRun {
            identity: identity.name.clone(),
            role: identity.role.to_string(),
            expected_access: identity.expected_access.clone(),
            assume_error: None,
            refresh_error: None,
            outcomes: Vec::new(),
            skipped_queries: 0,
        };

        let mut scope = match self.open_scope(&identity.name, &identity.role).await {
            Ok(scope) => scope,
            Err(e) => {
                run.assume_error = Some(e.to_string());
                run.skipped_queries = identity.queries.len();
                return run;
            }
        };

        for query in &identity.queries {
            if let Err(e) = self.refresh_if_expiring(&mut scope).await {
                run.refresh_error = Some(e.to_string());
                run.skipped_queries = identity.queries.len() - run.outcomes.len();
                break;
            }
            run.outcomes.push(self.run_query(&scope, query).await);
        }

        drop(scope);
        tracing::debug!(identity = %identity.name, "credential scope closed");
        run
    }

    /// Run every identity, sequentially or one task per identity.
    ///
    /// Parallel mode never shares a credential between tasks: each task
    /// opens its own scope. Runs are returned in input order.
    pub async fn run(&self, identities: &[ResolvedIdentity], parallel: bool) -> Vec<IdentityRun> {
        if !parallel || identities.len() < 2 {
            let mut runs = Vec::with_capacity(identities.len());
            for identity in identities {
                runs.push(self.run_identity(identity).await);
            }
            return runs;
        }

        let mut tasks = JoinSet::new();
        for (index, identity) in identities.iter().cloned().enumerate() {
            let engine = self.clone();
            tasks.spawn(async move { (index, engine.run_identity(&identity).await) });
        }

        let mut slots: Vec<Option<IdentityRun>> = vec![None; identities.len()];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, run)) => slots[index] = Some(run),
                Err(e) => tracing::error!(error = %e, "identity task failed"),
            }
        }

        slots
            .into_iter()
            .zip(identities)
            .map(|(slot, identity)| {
                slot.unwrap_or_else(|| IdentityRun {
                    identity: identity.name.clone(),
                    role: identity.role.to_string(),
                    expected_access: identity.expected_access.clone(),
                    assume_error: Some("identity task aborted".to_string()),
                    refresh_error: None,
                    outcomes: Vec::new(),
                    skipped_queries: identity.queries.len(),
                })
            })
            .collect()
    }

    async fn refresh_if_expiring(&self, scope: &mut CredentialScope) -> Result<()> {
        let margin = chrono::Duration::seconds(REFRESH_MARGIN_SECS);
        if !scope.credential.expires_within(self.clock.now_utc(), margin) {
            return Ok(());
        }
        tracing::info!(identity = %scope.identity, "credential expiring, re-assuming role");
        let fresh = self.open_scope(&scope.identity, &scope.role).await?;
        scope.credential = fresh.credential;
        Ok(())
    }

    /// State-change reason for a failed job whose terminal status had none
    async fn failure_reason(&self, scope: &CredentialScope, job: &JobId) -> String {
        let call = self.call(scope, "GetQueryExecution").job_id(job.as_str());
        match self
            .queries
            .get_status(&scope.credential, job, &self.target)
            .await
        {
            Ok(status) => {
                self.record(call, CallOutcome::ok_with(status.state.to_string()));
                status
                    .reason
                    .unwrap_or_else(|| "no state-change reason reported".to_string())
            }
            Err(e) => {
                self.record(call, CallOutcome::error(e.code(), e.message()));
                format!("state-change reason unavailable: {}", e)
            }
        }
    }

    async fn stop_query(&self, scope: &CredentialScope, job: &JobId) {
        let call = self.call(scope, "StopQueryExecution").job_id(job.as_str());
        match self
            .queries
            .stop_query(&scope.credential, job, &self.target)
            .await
        {
            Ok(()) => {
                self.record(call, CallOutcome::ok());
                tracing::info!(job_id = %job, "stop requested for timed-out query");
            }
            Err(e) => {
                self.record(call, CallOutcome::error(e.code(), e.message()));
                tracing::warn!(job_id = %job, error = %e, "stop request failed");
            }
        }
    }

    fn call(&self, scope: &CredentialScope, operation: &str) -> ServiceCall {
        ServiceCall::new("athena", operation)
            .identity(&scope.identity)
            .access_key_id(&scope.credential.access_key_id)
    }

    fn record(&self, call: ServiceCall, outcome: CallOutcome) {
        if let Some(ref log) = self.capture {
            log.record(call, outcome);
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
