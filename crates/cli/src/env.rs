// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access.
//!
//! All provisioning overrides and region variables read by lakeguard are
//! defined here. Use these accessors instead of calling `std::env::var()`
//! directly. Credential variables (`AWS_ACCESS_KEY_ID` and friends) are
//! deliberately absent: scoped credentials are passed as values, never
//! through the environment.

/// Generated env var name constants.
mod names {
    include!(concat!(env!("OUT_DIR"), "/env_names.rs"));
}

// Re-export name constants for callers that need the raw name string.
pub use names::*;

use std::path::PathBuf;

/// `LAKEGUARD_OUTPUTS`: Path to a provisioning outputs JSON document.
pub fn outputs_path() -> Option<PathBuf> {
    non_empty(names::LAKEGUARD_OUTPUTS).map(PathBuf::from)
}

/// `LAKEGUARD_SUITE`: Path to a query suite file.
pub fn suite_path() -> Option<PathBuf> {
    non_empty(names::LAKEGUARD_SUITE).map(PathBuf::from)
}

/// `LAKEGUARD_DATABASE`: Glue database name override.
pub fn database() -> Option<String> {
    non_empty(names::LAKEGUARD_DATABASE)
}

/// `LAKEGUARD_TABLE`: Governed table name override.
pub fn table() -> Option<String> {
    non_empty(names::LAKEGUARD_TABLE)
}

/// `LAKEGUARD_VIEW`: Masked view name override.
pub fn view() -> Option<String> {
    non_empty(names::LAKEGUARD_VIEW)
}

/// `LAKEGUARD_DATA_ADMIN_ROLE`: Data admin role ARN or name override.
pub fn data_admin_role() -> Option<String> {
    non_empty(names::LAKEGUARD_DATA_ADMIN_ROLE)
}

/// `LAKEGUARD_ANALYST_ROLE`: Analyst role ARN or name override.
pub fn analyst_role() -> Option<String> {
    non_empty(names::LAKEGUARD_ANALYST_ROLE)
}

/// `LAKEGUARD_WORKGROUP`: Athena workgroup override.
pub fn workgroup() -> Option<String> {
    non_empty(names::LAKEGUARD_WORKGROUP)
}

/// `LAKEGUARD_RESULTS_BUCKET`: Query results bucket or `s3://` location.
pub fn results_bucket() -> Option<String> {
    non_empty(names::LAKEGUARD_RESULTS_BUCKET)
}

/// `AWS_REGION`, falling back to `AWS_DEFAULT_REGION`.
pub fn region() -> Option<String> {
    non_empty(names::AWS_REGION).or_else(|| non_empty(names::AWS_DEFAULT_REGION))
}

/// `NO_COLOR`: any non-empty value disables colored output.
pub fn no_color() -> bool {
    non_empty(names::NO_COLOR).is_some()
}

fn non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
