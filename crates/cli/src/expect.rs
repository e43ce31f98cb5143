// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Machine-checked expectations for query outcomes.

use crate::classify::FailureCategory;
use crate::outcome::OutcomeStatus;
use crate::results::ResultSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// How many offending values a single reason lists
const MAX_LISTED_VALUES: usize = 3;

/// Terminal status a query is expected to reach
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpectedStatus {
    #[default]
    Succeeded,
    Failed,
}

/// What a query should return for the identity running it
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Expectation {
    #[serde(default)]
    pub status: ExpectedStatus,

    /// Exact number of data rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<usize>,

    /// Lower bound on data rows
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rows: Option<usize>,

    /// Rows that must appear, cell values as text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contains_rows: Vec<Vec<String>>,

    /// Columns that must be returned
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub columns: Vec<String>,

    /// Columns that must not be returned
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub absent_columns: Vec<String>,

    /// Per column, the only values allowed to appear
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allowed_values: BTreeMap<String, Vec<String>>,

    /// Per column, a regex every non-null value must match
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub patterns: BTreeMap<String, String>,

    /// Per column, raw values that must never appear
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub forbidden_values: BTreeMap<String, Vec<String>>,

    /// Failure category required when `status = "failed"`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureCategory>,
}

/// Result of checking an outcome against its expectation
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "detail", rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail(Vec<String>),
    Inconclusive(String),
}

impl Verdict {
    pub fn is_pass(&self) -> bool {
        matches!(self, Self::Pass)
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Self::Fail(_))
    }
}

impl Expectation {
    /// Structural problems, reported when a suite is loaded
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for (column, pattern) in &self.patterns {
            if let Err(e) = Regex::new(pattern) {
                problems.push(format!("invalid pattern for column '{}': {}", column, e));
            }
        }
        if self.status == ExpectedStatus::Succeeded && self.failure.is_some() {
            problems.push("'failure' requires status = \"failed\"".to_string());
        }
        if self.status == ExpectedStatus::Failed && self.checks_rows() {
            problems.push("row and column checks require status = \"succeeded\"".to_string());
        }
        if let (Some(exact), Some(min)) = (self.rows, self.min_rows) {
            if exact < min {
                problems.push(format!("rows = {} contradicts min_rows = {}", exact, min));
            }
        }
        problems
    }

    /// True when the expectation inspects the result set
    pub fn checks_rows(&self) -> bool {
        self.rows.is_some()
            || self.min_rows.is_some()
            || !self.contains_rows.is_empty()
            || !self.columns.is_empty()
            || !self.absent_columns.is_empty()
            || !self.allowed_values.is_empty()
            || !self.patterns.is_empty()
            || !self.forbidden_values.is_empty()
    }

    /// Compare an outcome with this expectation
    pub fn evaluate(
        &self,
        status: &OutcomeStatus,
        result: Option<&ResultSet>,
        category: Option<FailureCategory>,
    ) -> Verdict {
        match status {
            OutcomeStatus::TimedOut { .. } => {
                return Verdict::Inconclusive("query did not finish within the poll budget".into())
            }
            OutcomeStatus::Cancelled => {
                return Verdict::Inconclusive("query was cancelled before finishing".into())
            }
            OutcomeStatus::StatusFailed => {
                let why = category.map(|c| format!(" ({})", c)).unwrap_or_default();
                return Verdict::Fail(vec![format!("query status could not be read{}", why)]);
            }
            _ => {}
        }

        match (self.status, status.is_failure()) {
            (ExpectedStatus::Succeeded, true) => {
                let why = category.map(|c| format!(" ({})", c)).unwrap_or_default();
                Verdict::Fail(vec![format!("expected success, query {}{}", status, why)])
            }
            (ExpectedStatus::Failed, false) => {
                let rows = result.map(|r| r.row_count()).unwrap_or(0);
                Verdict::Fail(vec![format!(
                    "expected failure, query succeeded with {} rows",
                    rows
                )])
            }
            (ExpectedStatus::Failed, true) => match (self.failure, category) {
                (Some(want), Some(got)) if want != got => Verdict::Fail(vec![format!(
                    "expected failure '{}', got '{}'",
                    want, got
                )]),
                _ => Verdict::Pass,
            },
            (ExpectedStatus::Succeeded, false) => match result {
                Some(rs) => self.check_result(rs),
                None if self.checks_rows() => {
                    Verdict::Inconclusive("results could not be retrieved".into())
                }
                None => Verdict::Pass,
            },
        }
    }

    fn check_result(&self, rs: &ResultSet) -> Verdict {
        let mut failures = Vec::new();

        if let Some(want) = self.rows {
            if rs.row_count() != want {
                failures.push(format!("expected {} rows, got {}", want, rs.row_count()));
            }
        }
        if let Some(min) = self.min_rows {
            if rs.row_count() < min {
                failures.push(format!(
                    "expected at least {} rows, got {}",
                    min,
                    rs.row_count()
                ));
            }
        }
        for column in &self.columns {
            if !rs.has_column(column) {
                failures.push(format!("column '{}' was not returned", column));
            }
        }
        for column in &self.absent_columns {
            if rs.has_column(column) {
                failures.push(format!("column '{}' should be hidden but was returned", column));
            }
        }
        for row in &self.contains_rows {
            if !rs.contains_row(row) {
                failures.push(format!("missing row ({})", row.join(", ")));
            }
        }
        for (column, allowed) in &self.allowed_values {
            let Some(values) = rs.column_values(column) else {
                failures.push(format!("column '{}' was not returned", column));
                continue;
            };
            let offending: BTreeSet<&str> = values
                .into_iter()
                .flatten()
                .filter(|v| !allowed.iter().any(|a| a == v))
                .collect();
            if !offending.is_empty() {
                failures.push(format!(
                    "column '{}' has values outside [{}]: {}",
                    column,
                    allowed.join(", "),
                    list(offending)
                ));
            }
        }
        for (column, pattern) in &self.patterns {
            let re = match Regex::new(pattern) {
                Ok(re) => re,
                Err(e) => {
                    failures.push(format!("invalid pattern for '{}': {}", column, e));
                    continue;
                }
            };
            let Some(values) = rs.column_values(column) else {
                failures.push(format!("column '{}' was not returned", column));
                continue;
            };
            let offending: BTreeSet<&str> = values
                .into_iter()
                .flatten()
                .filter(|v| !re.is_match(v))
                .collect();
            if !offending.is_empty() {
                failures.push(format!(
                    "column '{}' has values not matching /{}/: {}",
                    column,
                    pattern,
                    list(offending)
                ));
            }
        }
        for (column, forbidden) in &self.forbidden_values {
            let Some(values) = rs.column_values(column) else {
                continue;
            };
            let exposed: BTreeSet<&str> = values
                .into_iter()
                .flatten()
                .filter(|v| forbidden.iter().any(|f| f == v))
                .collect();
            if !exposed.is_empty() {
                failures.push(format!(
                    "column '{}' exposes raw values: {}",
                    column,
                    list(exposed)
                ));
            }
        }

        if failures.is_empty() {
            Verdict::Pass
        } else {
            Verdict::Fail(failures)
        }
    }
}

fn list(values: BTreeSet<&str>) -> String {
    let total = values.len();
    let mut shown: Vec<String> = values
        .into_iter()
        .take(MAX_LISTED_VALUES)
        .map(|v| format!("'{}'", v))
        .collect();
    if total > MAX_LISTED_VALUES {
        shown.push(format!("and {} more", total - MAX_LISTED_VALUES));
    }
    shown.join(", ")
}

#[cfg(test)]
#[path = "expect_tests.rs"]
mod tests;
