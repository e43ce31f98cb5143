// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Turns parsed arguments into a validation run.
//!
//! Everything that can fail before the first service call (outputs, suite,
//! results location, capture file) is checked in [`Runner::from_cli`] so the
//! binary can exit with a configuration error without touching AWS.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use lakeguard_capture::CallLog;
use thiserror::Error;

use crate::aws::AwsServices;
use crate::cli::Cli;
use crate::config::{ConfigError, PollPolicy, ProvisioningOutputs};
use crate::engine::Engine;
use crate::report::RunReport;
use crate::service::{ExecutionTarget, QueryService, RoleAssumer};
use crate::sim::SimLake;
use crate::suite::{ResolvedIdentity, Suite, SuiteError};

/// Errors that stop a run before it starts
#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to load suite '{path}': {source}")]
    Suite {
        path: String,
        #[source]
        source: SuiteError,
    },

    #[error("Failed to open capture file '{path}': {source}")]
    Capture {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// A configured run, ready to execute
#[derive(Debug)]
pub struct Runner {
    cli: Cli,
    outputs: ProvisioningOutputs,
    suite: Suite,
    target: ExecutionTarget,
    poll: PollPolicy,
    capture: Option<CallLog>,
}

impl Runner {
    pub fn from_cli(cli: Cli) -> Result<Self, RunError> {
        cli.validate()?;

        let outputs = match cli.outputs_path() {
            Some(path) => ProvisioningOutputs::load(&path)?,
            None => ProvisioningOutputs::default(),
        }
        .with_env_overrides();

        let suite = match cli.suite_path() {
            Some(path) => Suite::load(&path).map_err(|source| RunError::Suite {
                path: path.display().to_string(),
                source,
            })?,
            None => Suite::builtin(),
        };

        let region = cli.region.clone().unwrap_or_else(|| outputs.region());
        let target = outputs.execution_target(region)?;
        let poll = cli.poll_policy()?;
        let capture = cli.capture.as_deref().map(open_capture).transpose()?;

        Ok(Self {
            cli,
            outputs,
            suite,
            target,
            poll,
            capture,
        })
    }

    pub fn cli(&self) -> &Cli {
        &self.cli
    }

    pub fn suite(&self) -> &Suite {
        &self.suite
    }

    pub fn target(&self) -> &ExecutionTarget {
        &self.target
    }

    /// Call log shared with the engine, when `--capture` is set
    pub fn capture(&self) -> Option<&CallLog> {
        self.capture.as_ref()
    }

    /// Identities with roles and SQL resolved against the outputs
    pub fn identities(&self) -> Vec<ResolvedIdentity> {
        self.suite.resolve(&self.outputs)
    }

    /// Run against the simulated lake or AWS, per `--simulate`
    pub async fn execute(&self) -> RunReport {
        if self.cli.simulate {
            let lake = Arc::new(SimLake::demo(&self.outputs));
            self.execute_with(lake.clone(), lake).await
        } else {
            let aws = Arc::new(AwsServices::load(&self.target.region).await);
            self.execute_with(aws.clone(), aws).await
        }
    }

    /// Run against the given services
    pub async fn execute_with(
        &self,
        roles: Arc<dyn RoleAssumer>,
        queries: Arc<dyn QueryService>,
    ) -> RunReport {
        let mut engine = Engine::new(roles, queries, self.target.clone())
            .with_poll_policy(self.poll.clone())
            .with_max_rows(self.cli.max_rows);
        if let Some(ref log) = self.capture {
            engine = engine.with_capture(log.clone());
        }

        let identities = self.identities();
        tracing::info!(
            suite = self.suite.name(),
            identities = identities.len(),
            workgroup = %self.target.workgroup,
            region = %self.target.region,
            simulated = self.cli.simulate,
            parallel = self.cli.parallel,
            "starting validation run"
        );

        let started = Utc::now();
        let runs = engine.run(&identities, self.cli.parallel).await;
        let finished = Utc::now();

        let report = RunReport::new(
            self.suite.name(),
            self.target.clone(),
            runs,
            started,
            finished,
        )
        .simulated(self.cli.simulate);
        tracing::info!(
            passed = report.tally.passed,
            failed = report.tally.failed,
            inconclusive = report.tally.inconclusive,
            skipped_identities = report.tally.skipped_identities,
            "validation run finished"
        );
        report
    }
}

fn open_capture(path: &Path) -> Result<CallLog, RunError> {
    CallLog::with_file(path).map_err(|source| RunError::Capture {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
