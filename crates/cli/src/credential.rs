// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Scoped credentials, role references, and session labels.

use chrono::{DateTime, Utc};
use std::fmt;

/// Maximum length STS accepts for a role session name
pub const MAX_SESSION_LABEL_LEN: usize = 64;

/// A short-lived credential triple obtained by assuming a role.
///
/// The value is passed explicitly to every service call made for an
/// identity. Secret material is redacted from `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
    pub expiration: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: secret_access_key.into(),
            session_token: session_token.into(),
            expiration: None,
        }
    }

    pub fn with_expiration(mut self, expiration: DateTime<Utc>) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// True when the credential expires within `margin` of `now`.
    /// Credentials without an expiration never expire.
    pub fn expires_within(&self, now: DateTime<Utc>, margin: chrono::Duration) -> bool {
        self.expiration.is_some_and(|exp| exp - now <= margin)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Reference to an assumable role
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RoleRef {
    /// Fully qualified role ARN
    Arn(String),
    /// Bare role name, qualified with the caller's account at assumption time
    Name(String),
}

impl RoleRef {
    /// Interpret a string as an ARN when it looks like one, else as a role name.
    pub fn parse(value: &str) -> Self {
        let value = value.trim();
        if value.starts_with("arn:") {
            Self::Arn(value.to_string())
        } else {
            Self::Name(value.to_string())
        }
    }

    /// ARN for this role in `account_id` (ARNs are returned unchanged)
    pub fn to_arn(&self, account_id: &str) -> String {
        match self {
            Self::Arn(arn) => arn.clone(),
            Self::Name(name) => format!("arn:aws:iam::{}:role/{}", account_id, name),
        }
    }
}

impl fmt::Display for RoleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Arn(arn) => f.write_str(arn),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// Role session name recorded in the audit trail for one assumption
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionLabel(String);

impl SessionLabel {
    /// Build a label unique within a run: identity, timestamp, random suffix.
    ///
    /// Characters outside `[A-Za-z0-9+=,.@-]` become `-` and the result is
    /// cut to 64 characters, keeping the timestamp and suffix intact.
    pub fn for_identity(identity: &str, now_millis: u64) -> Self {
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let tail = format!("-{}-{}", now_millis, &suffix[..8]);
        let budget = MAX_SESSION_LABEL_LEN.saturating_sub("lakeguard-".len() + tail.len());
        let name: String = identity
            .chars()
            .map(sanitize_char)
            .take(budget)
            .collect();
        Self(format!("lakeguard-{}{}", name, tail))
    }

    /// Wrap an existing label, sanitizing and truncating it
    pub fn new(label: &str) -> Self {
        Self(
            label
                .chars()
                .map(sanitize_char)
                .take(MAX_SESSION_LABEL_LEN)
                .collect(),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sanitize_char(c: char) -> char {
    if c.is_ascii_alphanumeric() || matches!(c, '+' | '=' | ',' | '.' | '@' | '-') {
        c
    } else {
        '-'
    }
}

#[cfg(test)]
#[path = "credential_tests.rs"]
mod tests;
