// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! AWS backend: STS for role assumption, Athena for queries.
//!
//! The ambient credential chain is used for exactly one thing: calling STS.
//! Every Athena client is built from the base SDK config with the scoped
//! credential as a static provider, so a query can never run under the
//! caller's own identity.

use crate::credential::{Credential, RoleRef, SessionLabel};
use crate::error::{Result, ServiceError};
use crate::service::{
    ExecutionTarget, JobId, JobState, JobStatus, PageRequest, QueryService, ResultPage,
    RoleAssumer,
};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::Credentials;
use aws_sdk_athena::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};
use chrono::{DateTime, Utc};
use std::time::{Duration, UNIX_EPOCH};
use tokio::sync::OnceCell;

/// Provider name attached to scoped credentials
const PROVIDER_NAME: &str = "lakeguard-assumed-role";

/// Largest page `GetQueryResults` accepts
const MAX_RESULTS_PER_PAGE: usize = 1000;

/// STS and Athena behind the service seams
pub struct AwsServices {
    sdk_config: SdkConfig,
    sts: aws_sdk_sts::Client,
    account_id: OnceCell<String>,
}

impl std::fmt::Debug for AwsServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AwsServices")
            .field("region", &self.sdk_config.region())
            .finish()
    }
}

impl AwsServices {
    /// Load the default AWS configuration for `region`
    pub async fn load(region: &str) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;
        Self::from_config(sdk_config)
    }

    pub fn from_config(sdk_config: SdkConfig) -> Self {
        let sts = aws_sdk_sts::Client::new(&sdk_config);
        Self {
            sdk_config,
            sts,
            account_id: OnceCell::new(),
        }
    }

    /// Caller's account id, looked up once
    async fn account_id(&self) -> Result<&str> {
        let account = self
            .account_id
            .get_or_try_init(|| async {
                let out = self
                    .sts
                    .get_caller_identity()
                    .send()
                    .await
                    .map_err(map_sdk_error)?;
                out.account()
                    .map(str::to_string)
                    .ok_or_else(|| ServiceError::transport("GetCallerIdentity returned no account"))
            })
            .await?;
        Ok(account.as_str())
    }

    fn athena(&self, credential: &Credential, region: &str) -> aws_sdk_athena::Client {
        let conf = aws_sdk_athena::config::Builder::from(&self.sdk_config)
            .credentials_provider(to_sdk_credentials(credential))
            .region(Region::new(region.to_string()))
            .build();
        aws_sdk_athena::Client::from_conf(conf)
    }
}

/// Static SDK credentials for a scoped credential
fn to_sdk_credentials(credential: &Credential) -> Credentials {
    let expiry = credential
        .expiration
        .and_then(|exp| u64::try_from(exp.timestamp()).ok())
        .map(|secs| UNIX_EPOCH + Duration::from_secs(secs));
    let token = (!credential.session_token.is_empty()).then(|| credential.session_token.clone());
    Credentials::new(
        &credential.access_key_id,
        &credential.secret_access_key,
        token,
        expiry,
        PROVIDER_NAME,
    )
}

/// Map an SDK error to a service error, keeping the service's error code
fn map_sdk_error<E, R>(err: SdkError<E, R>) -> ServiceError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::ServiceError(service_err) => {
            let inner = service_err.err();
            ServiceError::from_code(
                inner.code().unwrap_or("Unknown"),
                inner.message().unwrap_or_default(),
            )
        }
        SdkError::TimeoutError(_) => {
            ServiceError::transport(format!("request timed out: {}", DisplayErrorContext(&err)))
        }
        SdkError::DispatchFailure(_) => {
            ServiceError::transport(format!("connection error: {}", DisplayErrorContext(&err)))
        }
        _ => ServiceError::transport(DisplayErrorContext(&err).to_string()),
    }
}

fn job_state(state: &QueryExecutionState) -> Result<JobState> {
    match state {
        QueryExecutionState::Queued => Ok(JobState::Queued),
        QueryExecutionState::Running => Ok(JobState::Running),
        QueryExecutionState::Succeeded => Ok(JobState::Succeeded),
        QueryExecutionState::Failed => Ok(JobState::Failed),
        QueryExecutionState::Cancelled => Ok(JobState::Cancelled),
        other => Err(ServiceError::Service {
            code: "UnknownQueryState".to_string(),
            message: format!("unrecognized query state '{}'", other.as_str()),
        }),
    }
}

#[async_trait]
impl RoleAssumer for AwsServices {
    async fn assume_role(&self, role: &RoleRef, session: &SessionLabel) -> Result<Credential> {
        let arn = match role {
            RoleRef::Arn(arn) => arn.clone(),
            RoleRef::Name(_) => role.to_arn(self.account_id().await?),
        };
        tracing::debug!(%arn, session = %session, "calling sts:AssumeRole");

        let out = self
            .sts
            .assume_role()
            .role_arn(&arn)
            .role_session_name(session.as_str())
            .send()
            .await
            .map_err(map_sdk_error)?;
        let creds = out
            .credentials()
            .ok_or_else(|| ServiceError::transport("AssumeRole returned no credentials"))?;

        let credential = Credential::new(
            creds.access_key_id(),
            creds.secret_access_key(),
            creds.session_token(),
        );
        Ok(
            match DateTime::<Utc>::from_timestamp(creds.expiration().secs(), 0) {
                Some(expiration) => credential.with_expiration(expiration),
                None => credential,
            },
        )
    }
}

#[async_trait]
impl QueryService for AwsServices {
    async fn start_query(
        &self,
        credential: &Credential,
        sql: &str,
        target: &ExecutionTarget,
    ) -> Result<JobId> {
        let client = self.athena(credential, &target.region);
        let mut request = client
            .start_query_execution()
            .query_string(sql)
            .work_group(&target.workgroup)
            .result_configuration(
                ResultConfiguration::builder()
                    .output_location(&target.output_location)
                    .build(),
            );
        if let Some(ref database) = target.database {
            request = request.query_execution_context(
                QueryExecutionContext::builder().database(database).build(),
            );
        }

        let out = request.send().await.map_err(map_sdk_error)?;
        out.query_execution_id()
            .and_then(JobId::non_empty)
            .ok_or_else(|| ServiceError::transport("StartQueryExecution returned no execution id"))
    }

    async fn get_status(
        &self,
        credential: &Credential,
        job: &JobId,
        target: &ExecutionTarget,
    ) -> Result<JobStatus> {
        let out = self
            .athena(credential, &target.region)
            .get_query_execution()
            .query_execution_id(job.as_str())
            .send()
            .await
            .map_err(map_sdk_error)?;
        let status = out
            .query_execution()
            .and_then(|execution| execution.status())
            .ok_or_else(|| ServiceError::transport("GetQueryExecution returned no status"))?;

        let state = match status.state() {
            Some(state) => job_state(state)?,
            None => JobState::Queued,
        };
        let reason = status
            .state_change_reason()
            .or_else(|| status.athena_error().and_then(|e| e.error_message()))
            .map(str::to_string);
        Ok(JobStatus { state, reason })
    }

    async fn get_results(
        &self,
        credential: &Credential,
        job: &JobId,
        target: &ExecutionTarget,
        page: PageRequest,
    ) -> Result<ResultPage> {
        let max_results = page.max_rows.clamp(1, MAX_RESULTS_PER_PAGE) as i32;
        let mut request = self
            .athena(credential, &target.region)
            .get_query_results()
            .query_execution_id(job.as_str())
            .max_results(max_results);
        if let Some(token) = page.token {
            request = request.next_token(token);
        }

        let out = request.send().await.map_err(map_sdk_error)?;
        let rows = out
            .result_set()
            .map(|rs| {
                rs.rows()
                    .iter()
                    .map(|row| {
                        row.data()
                            .iter()
                            .map(|datum| datum.var_char_value().map(str::to_string))
                            .collect()
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(ResultPage {
            rows,
            next_token: out.next_token().map(str::to_string),
        })
    }

    async fn stop_query(
        &self,
        credential: &Credential,
        job: &JobId,
        target: &ExecutionTarget,
    ) -> Result<()> {
        self.athena(credential, &target.region)
            .stop_query_execution()
            .query_execution_id(job.as_str())
            .send()
            .await
            .map_err(map_sdk_error)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "aws_tests.rs"]
mod tests;
