// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Captured service call data types.

use crate::duration_serde;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// A recorded service call
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CapturedCall {
    /// Sequence number within the log
    pub seq: u64,

    /// Wall-clock timestamp
    pub timestamp: SystemTime,

    /// Elapsed time since the log was created, in milliseconds on the wire
    #[serde(with = "duration_serde")]
    pub elapsed: Duration,

    /// What was called and with which credential
    pub call: ServiceCall,

    /// How the call ended
    pub outcome: CallOutcome,
}

/// The request side of a service call.
///
/// Only the access key id of the signing credential is kept; secret keys
/// and session tokens are never captured.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceCall {
    /// Service name, e.g. `sts` or `athena`
    pub service: String,

    /// Operation name, e.g. `StartQueryExecution`
    pub operation: String,

    /// Identity on whose behalf the call was made
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,

    /// Access key id of the credential used to sign the call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    /// Query job the call refers to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    /// Operation-specific detail (role ARN, SQL text)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ServiceCall {
    /// Start describing a call to `service`/`operation`
    pub fn new(service: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn identity(mut self, identity: impl Into<String>) -> Self {
        self.identity = Some(identity.into());
        self
    }

    pub fn access_key_id(mut self, key: impl Into<String>) -> Self {
        self.access_key_id = Some(key.into());
        self
    }

    pub fn job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Captured outcome of a service call
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CallOutcome {
    Ok {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },
    Error {
        code: String,
        message: String,
    },
}

impl CallOutcome {
    pub fn ok() -> Self {
        Self::Ok { detail: None }
    }

    pub fn ok_with(detail: impl Into<String>) -> Self {
        Self::Ok {
            detail: Some(detail.into()),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}

#[cfg(test)]
#[path = "call_tests.rs"]
mod tests;
