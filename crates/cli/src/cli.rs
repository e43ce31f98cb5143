// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! CLI argument parsing.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::{ConfigError, PollPolicy};
use crate::engine::DEFAULT_MAX_ROWS;
use crate::env;

/// Validate Lake Formation access controls by running queries as each role
#[derive(Parser, Clone, Debug)]
#[command(name = "lakeguard", version)]
pub struct Cli {
    /// Provisioning outputs JSON (`terraform output -json` or a flat object).
    /// Falls back to LAKEGUARD_OUTPUTS.
    #[arg(long, value_name = "PATH")]
    pub outputs: Option<PathBuf>,

    /// Query suite file (TOML or JSON). Falls back to LAKEGUARD_SUITE, then
    /// the built-in suite.
    #[arg(long, value_name = "PATH")]
    pub suite: Option<PathBuf>,

    /// Region for STS and Athena calls
    #[arg(long, env = "LAKEGUARD_REGION")]
    pub region: Option<String>,

    /// Delay between status polls, in milliseconds
    #[arg(long, env = "LAKEGUARD_POLL_INTERVAL_MS", default_value_t = 2000)]
    pub poll_interval_ms: u64,

    /// Status polls per query before giving up
    #[arg(long, env = "LAKEGUARD_MAX_ATTEMPTS", default_value_t = 30)]
    pub max_attempts: u32,

    /// Data rows fetched and displayed per query
    #[arg(long, env = "LAKEGUARD_MAX_ROWS", default_value_t = DEFAULT_MAX_ROWS)]
    pub max_rows: usize,

    /// Run identities concurrently
    #[arg(long, env = "LAKEGUARD_PARALLEL")]
    pub parallel: bool,

    /// Stop queries that are still running when the poll budget runs out
    #[arg(long, env = "LAKEGUARD_CANCEL_ON_TIMEOUT")]
    pub cancel_on_timeout: bool,

    /// Record every service call to a JSONL file
    #[arg(long, env = "LAKEGUARD_CAPTURE", value_name = "PATH")]
    pub capture: Option<PathBuf>,

    /// Write the run report as JSON
    #[arg(long, env = "LAKEGUARD_REPORT_JSON", value_name = "PATH")]
    pub report_json: Option<PathBuf>,

    /// Disable colored output (also set by NO_COLOR)
    #[arg(long)]
    pub no_color: bool,

    /// Run against an in-process simulated lake seeded with sample sales data
    #[arg(long, env = "LAKEGUARD_SIMULATE")]
    pub simulate: bool,
}

impl Cli {
    /// Outputs file from the flag or the environment
    pub fn outputs_path(&self) -> Option<PathBuf> {
        self.outputs.clone().or_else(env::outputs_path)
    }

    /// Suite file from the flag or the environment
    pub fn suite_path(&self) -> Option<PathBuf> {
        self.suite.clone().or_else(env::suite_path)
    }

    pub fn poll_policy(&self) -> Result<PollPolicy, ConfigError> {
        Ok(
            PollPolicy::new(Duration::from_millis(self.poll_interval_ms), self.max_attempts)?
                .cancel_on_timeout(self.cancel_on_timeout),
        )
    }

    /// Validate arguments that clap cannot check on its own
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rows == 0 {
            return Err(ConfigError::Invalid(
                "--max-rows must be at least 1".to_string(),
            ));
        }
        if let Some(ref region) = self.region {
            if region.trim().is_empty() {
                return Err(ConfigError::Invalid("--region must not be empty".to_string()));
            }
        }
        self.poll_policy().map(|_| ())
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
