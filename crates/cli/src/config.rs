// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Provisioning outputs and resolved run settings.

use crate::env;
use crate::service::ExecutionTarget;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default Glue database
pub const DEFAULT_DATABASE: &str = "lakeformation_demo_db";
/// Default governed table
pub const DEFAULT_TABLE: &str = "sales_data";
/// Default masked view
pub const DEFAULT_VIEW: &str = "sales_data_masked";
/// Default data admin role name
pub const DEFAULT_DATA_ADMIN_ROLE: &str = "LakeFormationDataAdmin";
/// Default analyst role name
pub const DEFAULT_ANALYST_ROLE: &str = "LakeFormationAnalyst";
/// Default Athena workgroup
pub const DEFAULT_WORKGROUP: &str = "primary";
/// Default region when neither outputs nor environment name one
pub const DEFAULT_REGION: &str = "us-east-1";
/// Prefix appended to a bare results bucket name
pub const RESULTS_PREFIX: &str = "athena-results/";

/// Output keys read from the provisioning layer
pub mod keys {
    pub const DATABASE: &str = "database_name";
    pub const TABLE: &str = "table_name";
    pub const VIEW: &str = "view_name";
    pub const DATA_ADMIN_ROLE: &str = "data_admin_role_arn";
    pub const ANALYST_ROLE: &str = "analyst_role_arn";
    pub const WORKGROUP: &str = "athena_workgroup";
    pub const RESULTS_BUCKET: &str = "athena_results_bucket";
    pub const REGION: &str = "aws_region";
}

/// Errors loading configuration. All are fatal to the run.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read provisioning outputs '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse provisioning outputs: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Provisioning outputs must be a JSON object")]
    NotAnObject,

    #[error(
        "No query results location: set the '{}' output or {}",
        keys::RESULTS_BUCKET,
        env::LAKEGUARD_RESULTS_BUCKET
    )]
    MissingResultsLocation,

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Named outputs exposed by the provisioning layer
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProvisioningOutputs {
    values: BTreeMap<String, String>,
}

impl ProvisioningOutputs {
    /// Parse `terraform output -json` (`{"k": {"value": ..}}`) or a flat object
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let doc: Value = serde_json::from_str(text)?;
        let Value::Object(map) = doc else {
            return Err(ConfigError::NotAnObject);
        };
        let values = map
            .into_iter()
            .filter_map(|(key, value)| {
                let value = match value {
                    Value::Object(mut inner) => inner.remove("value")?,
                    other => other,
                };
                let text = match value {
                    Value::String(s) => s,
                    Value::Number(n) => n.to_string(),
                    Value::Bool(b) => b.to_string(),
                    _ => return None,
                };
                let text = text.trim().to_string();
                (!text.is_empty()).then_some((key, text))
            })
            .collect();
        Ok(Self { values })
    }

    /// Load outputs from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Apply `LAKEGUARD_*` environment overrides
    pub fn with_env_overrides(mut self) -> Self {
        let overrides = [
            (keys::DATABASE, env::database()),
            (keys::TABLE, env::table()),
            (keys::VIEW, env::view()),
            (keys::DATA_ADMIN_ROLE, env::data_admin_role()),
            (keys::ANALYST_ROLE, env::analyst_role()),
            (keys::WORKGROUP, env::workgroup()),
            (keys::RESULTS_BUCKET, env::results_bucket()),
        ];
        for (key, value) in overrides {
            if let Some(value) = value {
                self.values.insert(key.to_string(), value);
            }
        }
        self
    }

    pub fn set(mut self, key: &str, value: impl Into<String>) -> Self {
        self.values.insert(key.to_string(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn database(&self) -> &str {
        self.get(keys::DATABASE).unwrap_or(DEFAULT_DATABASE)
    }

    pub fn table(&self) -> &str {
        self.get(keys::TABLE).unwrap_or(DEFAULT_TABLE)
    }

    pub fn view(&self) -> &str {
        self.get(keys::VIEW).unwrap_or(DEFAULT_VIEW)
    }

    pub fn workgroup(&self) -> &str {
        self.get(keys::WORKGROUP).unwrap_or(DEFAULT_WORKGROUP)
    }

    /// Role reference for an output key, with documented defaults for the
    /// two built-in roles. Unknown keys resolve to None.
    pub fn role(&self, key: &str) -> Option<&str> {
        self.get(key).or(match key {
            keys::DATA_ADMIN_ROLE => Some(DEFAULT_DATA_ADMIN_ROLE),
            keys::ANALYST_ROLE => Some(DEFAULT_ANALYST_ROLE),
            _ => None,
        })
    }

    /// `s3://` location for query results. Missing is fatal.
    pub fn results_location(&self) -> Result<String, ConfigError> {
        let raw = self
            .get(keys::RESULTS_BUCKET)
            .ok_or(ConfigError::MissingResultsLocation)?;
        if raw.starts_with("s3://") {
            if raw.ends_with('/') {
                Ok(raw.to_string())
            } else {
                Ok(format!("{}/", raw))
            }
        } else {
            Ok(format!("s3://{}/{}", raw.trim_matches('/'), RESULTS_PREFIX))
        }
    }

    /// Region from outputs, then environment, then default
    pub fn region(&self) -> String {
        self.get(keys::REGION)
            .map(str::to_string)
            .or_else(env::region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string())
    }

    /// Template variables for suite SQL
    pub fn template_vars(&self) -> [(&'static str, &str); 3] {
        [
            ("database", self.database()),
            ("table", self.table()),
            ("view", self.view()),
        ]
    }

    /// Execution target for the given region
    pub fn execution_target(&self, region: String) -> Result<ExecutionTarget, ConfigError> {
        Ok(ExecutionTarget {
            workgroup: self.workgroup().to_string(),
            output_location: self.results_location()?,
            region,
            database: Some(self.database().to_string()),
        })
    }
}

/// Poll loop settings
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
    /// Issue a stop-execution call when the budget runs out
    pub cancel_on_timeout: bool,
}

impl PollPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Result<Self, ConfigError> {
        if max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "max attempts must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            interval,
            max_attempts,
            cancel_on_timeout: false,
        })
    }

    pub fn cancel_on_timeout(mut self, cancel: bool) -> Self {
        self.cancel_on_timeout = cancel;
        self
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
            cancel_on_timeout: false,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
