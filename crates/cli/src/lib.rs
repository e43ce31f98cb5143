// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Lake Formation access-control validation.
//!
//! Assumes each configured role in turn, runs a battery of Athena queries
//! under that role's scoped credentials, and checks every outcome against an
//! expectation: rows a role should see, columns it must not see, values that
//! must come back masked. Failures are classified with remediation hints and
//! the process exits non-zero when any expectation fails.
//!
//! The same engine runs against AWS or an in-process simulated lake
//! ([`sim::SimLake`]) seeded with sample sales data.

pub mod aws;
pub mod classify;
pub mod cli;
pub mod config;
pub mod credential;
pub mod engine;
pub mod env;
pub mod error;
pub mod expect;
pub mod outcome;
pub mod output;
pub mod report;
pub mod results;
pub mod runner;
pub mod service;
pub mod sim;
pub mod suite;
pub mod time;

/// Re-exported capture types from the lakeguard-capture crate.
pub mod capture {
    pub use lakeguard_capture::{CallLog, CallOutcome, CapturedCall, ServiceCall};
}
