// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Errors returned by the role-assumption and query-execution services.

use thiserror::Error;

/// Errors from service calls
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ServiceError {
    /// Caller is not authorized (role trust policy, IAM, Lake Formation)
    #[error("Access denied: {0}")]
    AccessDenied(String),

    /// Referenced resource does not exist (role, workgroup, job)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the service
    #[error("Throttled: {0}")]
    Throttled(String),

    /// Request rejected as malformed (empty SQL, bad parameters)
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Network, timeout, or dispatch failure before a response arrived
    #[error("Transport error: {0}")]
    Transport(String),

    /// Any other service-side error, with its error code
    #[error("{code}: {message}")]
    Service { code: String, message: String },
}

impl ServiceError {
    pub fn access_denied(msg: impl Into<String>) -> Self {
        Self::AccessDenied(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Build an error from a service error code and message.
    ///
    /// Codes follow the AWS error code naming used by STS and Athena.
    pub fn from_code(code: &str, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            "AccessDenied" | "AccessDeniedException" | "UnauthorizedOperation"
            | "ExpiredToken" | "ExpiredTokenException" | "InvalidClientTokenId" => {
                Self::AccessDenied(message)
            }
            "NoSuchEntity" | "ResourceNotFoundException" | "EntityNotFoundException" => {
                Self::NotFound(message)
            }
            "Throttling" | "ThrottlingException" | "TooManyRequestsException" => {
                Self::Throttled(message)
            }
            "InvalidRequestException" | "ValidationError" | "ValidationException"
            | "MalformedPolicyDocument" => Self::InvalidRequest(message),
            _ => Self::Service {
                code: code.to_string(),
                message,
            },
        }
    }

    /// Whether repeating the same call may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Throttled(_) | Self::Transport(_))
    }

    /// Short error code, used in capture logs
    pub fn code(&self) -> &str {
        match self {
            Self::AccessDenied(_) => "AccessDenied",
            Self::NotFound(_) => "NotFound",
            Self::Throttled(_) => "Throttled",
            Self::InvalidRequest(_) => "InvalidRequest",
            Self::Transport(_) => "Transport",
            Self::Service { code, .. } => code,
        }
    }

    /// Message without the category prefix
    pub fn message(&self) -> &str {
        match self {
            Self::AccessDenied(m)
            | Self::NotFound(m)
            | Self::Throttled(m)
            | Self::InvalidRequest(m)
            | Self::Transport(m) => m,
            Self::Service { message, .. } => message,
        }
    }
}

/// Result type for service calls
pub type Result<T> = std::result::Result<T, ServiceError>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
