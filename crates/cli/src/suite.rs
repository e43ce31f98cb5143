// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Query suites: which identities run which queries, and what they expect.

use crate::classify::FailureCategory;
use crate::config::{keys, ProvisioningOutputs};
use crate::credential::RoleRef;
use crate::expect::{ExpectedStatus, Expectation};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading a suite
#[derive(Debug, Error)]
pub enum SuiteError {
    #[error("Failed to read suite file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),
}

/// Top-level suite file
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SuiteConfig {
    /// Name for logging/reporting
    #[serde(default)]
    pub name: String,

    /// Identities, run in order
    #[serde(default)]
    pub identities: Vec<IdentitySpec>,
}

/// One identity and its query battery
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct IdentitySpec {
    /// Display name, e.g. "Analyst"
    pub name: String,

    /// Provisioning output key, role ARN, or bare role name
    pub role: String,

    /// Restated in the run summary
    #[serde(default)]
    pub expected_access: Option<String>,

    #[serde(default)]
    pub queries: Vec<QuerySpec>,
}

/// A query with its expectation.
///
/// `sql` may use `{database}`, `{table}` and `{view}` placeholders.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QuerySpec {
    pub description: String,
    pub sql: String,
    #[serde(default)]
    pub expect: Expectation,
}

/// Identity with its role resolved and SQL rendered
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedIdentity {
    pub name: String,
    pub role: RoleRef,
    pub expected_access: Option<String>,
    pub queries: Vec<ResolvedQuery>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedQuery {
    pub description: String,
    pub sql: String,
    pub expect: Expectation,
}

/// A validated suite
#[derive(Clone, Debug)]
pub struct Suite {
    config: SuiteConfig,
}

impl Suite {
    /// Load a suite from a TOML or JSON file
    pub fn load(path: &Path) -> Result<Self, SuiteError> {
        let content = std::fs::read_to_string(path)?;
        let config: SuiteConfig = if path.extension().is_some_and(|e| e == "json") {
            serde_json::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };
        Self::from_config(config)
    }

    /// Validate a suite config
    pub fn from_config(config: SuiteConfig) -> Result<Self, SuiteError> {
        if config.identities.is_empty() {
            return Err(SuiteError::Validation(
                "suite declares no identities".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for identity in &config.identities {
            if identity.name.trim().is_empty() {
                return Err(SuiteError::Validation(
                    "identity name must not be empty".to_string(),
                ));
            }
            if !seen.insert(identity.name.as_str()) {
                return Err(SuiteError::Validation(format!(
                    "duplicate identity '{}'",
                    identity.name
                )));
            }
            if identity.role.trim().is_empty() {
                return Err(SuiteError::Validation(format!(
                    "identity '{}' has no role",
                    identity.name
                )));
            }
            for query in &identity.queries {
                if query.sql.trim().is_empty() {
                    return Err(SuiteError::Validation(format!(
                        "query '{}' for '{}' has empty SQL",
                        query.description, identity.name
                    )));
                }
                if let Some(problem) = query.expect.problems().into_iter().next() {
                    return Err(SuiteError::Validation(format!(
                        "query '{}' for '{}': {}",
                        query.description, identity.name, problem
                    )));
                }
            }
        }

        Ok(Self { config })
    }

    /// The built-in battery: full access for the data admin, row-filtered
    /// and column-restricted access for the analyst, plus the masked view.
    pub fn builtin() -> Self {
        Self {
            config: builtin_config(),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &SuiteConfig {
        &self.config
    }

    /// Resolve role references and render SQL against provisioning outputs.
    ///
    /// A role naming a provisioning output key uses that output (or its
    /// documented default); anything else is taken as an ARN or role name.
    pub fn resolve(&self, outputs: &ProvisioningOutputs) -> Vec<ResolvedIdentity> {
        let vars = outputs.template_vars();
        self.config
            .identities
            .iter()
            .map(|identity| ResolvedIdentity {
                name: identity.name.clone(),
                role: RoleRef::parse(outputs.role(&identity.role).unwrap_or(&identity.role)),
                expected_access: identity.expected_access.clone(),
                queries: identity
                    .queries
                    .iter()
                    .map(|q| ResolvedQuery {
                        description: q.description.clone(),
                        sql: render(&q.sql, &vars),
                        expect: q.expect.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// Substitute `{name}` placeholders; unknown placeholders are left as-is
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |sql, (name, value)| {
        sql.replace(&format!("{{{}}}", name), value)
    })
}

/// Raw PII from the first rows of the demo sales data
const SAMPLE_EMAILS: [&str; 3] = [
    "alice.j@example.com",
    "bob.smith@example.com",
    "charlie.b@example.com",
];
const SAMPLE_SSNS: [&str; 3] = ["123-45-6789", "234-56-7890", "345-67-8901"];

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn query(description: &str, sql: &str, expect: Expectation) -> QuerySpec {
    QuerySpec {
        description: description.to_string(),
        sql: sql.to_string(),
        expect,
    }
}

fn builtin_config() -> SuiteConfig {
    let region_counts = "SELECT sales_region, COUNT(*) AS record_count \
                         FROM {database}.{table} GROUP BY sales_region ORDER BY sales_region";

    SuiteConfig {
        name: "lake formation access controls".to_string(),
        identities: vec![
            IdentitySpec {
                name: "DataAdmin".to_string(),
                role: keys::DATA_ADMIN_ROLE.to_string(),
                expected_access: Some(
                    "Full access: all regions, all columns including PII".to_string(),
                ),
                queries: vec![
                    query(
                        "Full table access including PII columns",
                        "SELECT * FROM {database}.{table} LIMIT 10",
                        Expectation {
                            min_rows: Some(1),
                            columns: vec!["customer_email".into(), "ssn".into()],
                            ..Default::default()
                        },
                    ),
                    query(
                        "Record count by region (all regions visible)",
                        region_counts,
                        Expectation {
                            rows: Some(3),
                            ..Default::default()
                        },
                    ),
                ],
            },
            IdentitySpec {
                name: "Analyst".to_string(),
                role: keys::ANALYST_ROLE.to_string(),
                expected_access: Some(
                    "Restricted: APAC rows only, no customer_email or ssn; masked view readable"
                        .to_string(),
                ),
                queries: vec![
                    query(
                        "Record count by region (APAC only)",
                        region_counts,
                        Expectation {
                            rows: Some(1),
                            allowed_values: BTreeMap::from([(
                                "sales_region".to_string(),
                                vec!["APAC".to_string()],
                            )]),
                            ..Default::default()
                        },
                    ),
                    query(
                        "Non-PII columns",
                        "SELECT customer_id, customer_name, sales_region, sales_amount, sale_date \
                         FROM {database}.{table} LIMIT 10",
                        Expectation {
                            allowed_values: BTreeMap::from([(
                                "sales_region".to_string(),
                                vec!["APAC".to_string()],
                            )]),
                            ..Default::default()
                        },
                    ),
                    query(
                        "PII columns are not visible",
                        "SELECT customer_id, customer_email, ssn FROM {database}.{table} LIMIT 10",
                        Expectation {
                            status: ExpectedStatus::Failed,
                            failure: Some(FailureCategory::ColumnNotFound),
                            ..Default::default()
                        },
                    ),
                    query(
                        "Masked view hides PII values",
                        "SELECT customer_id, customer_email, ssn, sales_region \
                         FROM {database}.{view} LIMIT 10",
                        Expectation {
                            patterns: BTreeMap::from([
                                ("customer_email".to_string(), r"^\*\*\*@".to_string()),
                                ("ssn".to_string(), r"^\*{3}-\*{2}-\*{4}$".to_string()),
                            ]),
                            forbidden_values: BTreeMap::from([
                                ("customer_email".to_string(), strings(&SAMPLE_EMAILS)),
                                ("ssn".to_string(), strings(&SAMPLE_SSNS)),
                            ]),
                            ..Default::default()
                        },
                    ),
                ],
            },
        ],
    }
}

#[cfg(test)]
#[path = "suite_tests.rs"]
mod tests;
