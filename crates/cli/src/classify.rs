// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Best-effort classification of query failure diagnostics.
//!
//! The execution service reports failures as free text. Matching on known
//! substrings lets the report print a targeted remediation hint, but the
//! service's wording can change at any time: a miss falls back to `Other`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse failure category derived from diagnostic text
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCategory {
    AccessDenied,
    ColumnNotFound,
    TableNotFound,
    Syntax,
    Throttled,
    Other,
}

/// Substrings checked in order; first match wins
const RULES: &[(&str, FailureCategory)] = &[
    ("column_not_found", FailureCategory::ColumnNotFound),
    ("cannot be resolved", FailureCategory::ColumnNotFound),
    ("table_not_found", FailureCategory::TableNotFound),
    ("does not exist", FailureCategory::TableNotFound),
    ("not authorized", FailureCategory::AccessDenied),
    ("insufficient lake formation permission", FailureCategory::AccessDenied),
    ("access denied", FailureCategory::AccessDenied),
    ("accessdenied", FailureCategory::AccessDenied),
    ("permission denied", FailureCategory::AccessDenied),
    ("syntax_error", FailureCategory::Syntax),
    ("mismatched input", FailureCategory::Syntax),
    ("rate exceeded", FailureCategory::Throttled),
    ("throttl", FailureCategory::Throttled),
];

impl FailureCategory {
    /// Classify a diagnostic message
    pub fn classify(diagnostic: &str) -> Self {
        let lower = diagnostic.to_ascii_lowercase();
        RULES
            .iter()
            .find(|(needle, _)| lower.contains(needle))
            .map(|(_, category)| *category)
            .unwrap_or(Self::Other)
    }

    /// Remediation hint for the operator
    pub fn hint(self) -> &'static str {
        match self {
            Self::AccessDenied => {
                "The identity lacks a grant. Check the Lake Formation permissions \
                 or data cells filter for this principal, and that it may write \
                 to the results location."
            }
            Self::ColumnNotFound => {
                "The column is not visible to this identity. If the column is \
                 excluded by a data cells filter this is the expected outcome."
            }
            Self::TableNotFound => {
                "The table or view is missing or not granted. Check the Glue \
                 catalog entry and the database name in the provisioning outputs."
            }
            Self::Syntax => "The SQL did not parse. Check the query text in the suite.",
            Self::Throttled => {
                "The service throttled the request. Raise the poll interval or \
                 run identities sequentially."
            }
            Self::Other => "See the state-change reason above for details.",
        }
    }
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AccessDenied => "access denied",
            Self::ColumnNotFound => "column not found",
            Self::TableNotFound => "table not found",
            Self::Syntax => "syntax error",
            Self::Throttled => "throttled",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
#[path = "classify_tests.rs"]
mod tests;
