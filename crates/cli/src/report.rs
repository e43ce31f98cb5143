// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Run report: console rendering, JSON export, and exit status.

use crate::expect::Verdict;
use crate::outcome::{IdentityRun, OutcomeStatus, QueryOutcome};
use crate::output::{make_rule, make_section_header, Palette};
use crate::service::ExecutionTarget;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::Path;

/// Process exit codes
pub mod exit_codes {
    /// Every verdict passed or was inconclusive
    pub const SUCCESS: i32 = 0;
    /// A role could not be assumed, a query was skipped or a verdict failed
    pub const FAILURE: i32 = 1;
    /// Configuration or suite error before anything ran
    pub const CONFIG: i32 = 2;
}

const INDENT: &str = "  ";

const ASSUME_HINT: &str = "Check that the role exists and that its trust policy lets \
                           the calling principal assume it.";

/// Verdict counts across a run
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub passed: usize,
    pub failed: usize,
    pub inconclusive: usize,
    pub skipped_identities: usize,
    pub skipped_queries: usize,
}

impl Tally {
    pub fn from_runs(runs: &[IdentityRun]) -> Self {
        runs.iter().fold(Self::default(), |mut tally, run| {
            tally.passed += run.passed();
            tally.failed += run.failed();
            tally.inconclusive += run.inconclusive();
            tally.skipped_queries += run.skipped_queries;
            if !run.assumed() {
                tally.skipped_identities += 1;
            }
            tally
        })
    }

    /// A failed verdict or a skipped identity or query fails the run
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped_identities == 0 && self.skipped_queries == 0
    }
}

/// Everything a validation run produced
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub suite: String,
    pub simulated: bool,
    pub target: ExecutionTarget,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub tally: Tally,
    pub identities: Vec<IdentityRun>,
}

impl RunReport {
    pub fn new(
        suite: impl Into<String>,
        target: ExecutionTarget,
        identities: Vec<IdentityRun>,
        started_at: DateTime<Utc>,
        finished_at: DateTime<Utc>,
    ) -> Self {
        Self {
            suite: suite.into(),
            simulated: false,
            target,
            started_at,
            finished_at,
            tally: Tally::from_runs(&identities),
            identities,
        }
    }

    pub fn simulated(mut self, simulated: bool) -> Self {
        self.simulated = simulated;
        self
    }

    pub fn exit_code(&self) -> i32 {
        if self.tally.is_success() {
            exit_codes::SUCCESS
        } else {
            exit_codes::FAILURE
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        let json = self.to_json().map_err(std::io::Error::other)?;
        std::fs::write(path, json + "\n")
    }

    /// Render the full console report: one section per identity, then the summary
    pub fn render(&self, palette: Palette, width: usize) -> String {
        let mut out = String::new();
        let mode = if self.simulated { " (simulated)" } else { "" };
        let _ = writeln!(
            out,
            "{}{}",
            palette.bold(&format!("Access-control validation: {}", self.suite)),
            palette.dim(mode)
        );
        let _ = writeln!(
            out,
            "{}",
            palette.dim(&format!(
                "workgroup {} | region {} | results {}",
                self.target.workgroup, self.target.region, self.target.output_location
            ))
        );

        for run in &self.identities {
            out.push('\n');
            render_identity(&mut out, run, palette, width);
        }

        out.push('\n');
        self.render_summary(&mut out, palette, width);
        out
    }

    fn render_summary(&self, out: &mut String, palette: Palette, width: usize) {
        let _ = writeln!(out, "{}", palette.bold(&make_section_header("Summary", width)));
        for run in &self.identities {
            let _ = writeln!(out, "{} ({})", palette.bold(&run.identity), run.role);
            if let Some(ref access) = run.expected_access {
                push_wrapped(out, &format!("Expected: {}", access), INDENT, width);
            }
            let line = if run.assumed() {
                let mut line = format!(
                    "{} passed, {} failed, {} inconclusive",
                    run.passed(),
                    run.failed(),
                    run.inconclusive()
                );
                if run.refresh_error.is_some() {
                    let _ = write!(
                        line,
                        ", credential refresh failed, {} {} skipped",
                        run.skipped_queries,
                        plural(run.skipped_queries, "query", "queries")
                    );
                }
                line
            } else {
                format!(
                    "role assumption failed, {} {} skipped",
                    run.skipped_queries,
                    plural(run.skipped_queries, "query", "queries")
                )
            };
            let line = if !run.assumed() || run.failed() > 0 || run.skipped_queries > 0 {
                palette.red(&line)
            } else if run.inconclusive() > 0 {
                palette.yellow(&line)
            } else {
                palette.green(&line)
            };
            let _ = writeln!(out, "{}{}", INDENT, line);
        }

        let t = self.tally;
        let _ = writeln!(out, "{}", make_rule(width));
        let _ = writeln!(
            out,
            "Totals: {} passed, {} failed, {} inconclusive, {} {} skipped",
            t.passed,
            t.failed,
            t.inconclusive,
            t.skipped_identities,
            plural(t.skipped_identities, "identity", "identities")
        );
        let elapsed = (self.finished_at - self.started_at).num_milliseconds() as f64 / 1000.0;
        let result = if t.is_success() {
            palette.green("PASS")
        } else {
            palette.red("FAIL")
        };
        let _ = writeln!(out, "Result: {} in {:.1}s", palette.bold(&result), elapsed);
    }
}

fn render_identity(out: &mut String, run: &IdentityRun, palette: Palette, width: usize) {
    let _ = writeln!(
        out,
        "{}",
        palette.cyan(&make_section_header(&run.identity, width))
    );
    let _ = writeln!(out, "Role: {}", run.role);
    if let Some(ref access) = run.expected_access {
        push_wrapped(out, &format!("Expected access: {}", access), "", width);
    }

    if let Some(ref error) = run.assume_error {
        push_wrapped(
            out,
            &format!("{} {}", palette.red("Role assumption failed:"), error),
            "",
            width,
        );
        push_wrapped(
            out,
            &format!("Hint: {}", ASSUME_HINT),
            INDENT,
            width,
        );
        if run.skipped_queries > 0 {
            let _ = writeln!(
                out,
                "{}",
                palette.yellow(&format!(
                    "Skipped {} {}",
                    run.skipped_queries,
                    plural(run.skipped_queries, "query", "queries")
                ))
            );
        }
    }

    for outcome in &run.outcomes {
        out.push('\n');
        render_outcome(out, outcome, palette, width);
    }

    if let Some(ref error) = run.refresh_error {
        out.push('\n');
        push_wrapped(
            out,
            &format!("{} {}", palette.red("Credential refresh failed:"), error),
            "",
            width,
        );
        let _ = writeln!(
            out,
            "{}",
            palette.yellow(&format!(
                "Skipped {} remaining {}",
                run.skipped_queries,
                plural(run.skipped_queries, "query", "queries")
            ))
        );
    }
}

fn render_outcome(out: &mut String, outcome: &QueryOutcome, palette: Palette, width: usize) {
    let _ = writeln!(out, "{}", palette.bold(&format!("> {}", outcome.description)));
    if let Some(ref job) = outcome.job_id {
        let _ = writeln!(out, "{}Job:    {}", INDENT, palette.dim(job.as_str()));
    }
    let status = outcome.status.to_string();
    let status = match outcome.status {
        OutcomeStatus::Succeeded => palette.green(&status),
        OutcomeStatus::SubmitFailed | OutcomeStatus::Failed | OutcomeStatus::StatusFailed => {
            palette.red(&status)
        }
        OutcomeStatus::Cancelled | OutcomeStatus::TimedOut { .. } => palette.yellow(&status),
    };
    let _ = writeln!(out, "{}Status: {}", INDENT, status);

    if let Some(ref result) = outcome.result {
        for line in result.render_table().lines() {
            let _ = writeln!(out, "{}{}", INDENT, line);
        }
    }

    if let Some(ref diagnostic) = outcome.diagnostic {
        match diagnostic.category {
            Some(category) => {
                push_wrapped(
                    out,
                    &format!("Error [{}]: {}", category, diagnostic.message),
                    INDENT,
                    width,
                );
                push_wrapped(out, &format!("Hint: {}", category.hint()), INDENT, width);
            }
            None => push_wrapped(out, &format!("Note: {}", diagnostic.message), INDENT, width),
        }
    }

    match &outcome.verdict {
        Verdict::Pass => {
            let _ = writeln!(out, "{}Verdict: {}", INDENT, palette.green("PASS"));
        }
        Verdict::Fail(reasons) => {
            let _ = writeln!(out, "{}Verdict: {}", INDENT, palette.red("FAIL"));
            for reason in reasons {
                push_wrapped(out, &format!("- {}", reason), "    ", width);
            }
        }
        Verdict::Inconclusive(reason) => {
            let _ = writeln!(out, "{}Verdict: {}", INDENT, palette.yellow("INCONCLUSIVE"));
            push_wrapped(out, &format!("- {}", reason), "    ", width);
        }
    }
}

/// Append `text` wrapped to `width`, every line prefixed with `indent`
fn push_wrapped(out: &mut String, text: &str, indent: &str, width: usize) {
    let options = textwrap::Options::new(width)
        .initial_indent(indent)
        .subsequent_indent(indent);
    for line in textwrap::wrap(text, options) {
        let _ = writeln!(out, "{}", line);
    }
}

fn plural<'a>(n: usize, one: &'a str, many: &'a str) -> &'a str {
    if n == 1 {
        one
    } else {
        many
    }
}

#[cfg(test)]
#[path = "report_tests.rs"]
mod tests;
