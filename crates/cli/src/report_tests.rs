// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use crate::outcome::Diagnostic;
use crate::results::ResultSet;
use crate::service::JobId;

fn target() -> ExecutionTarget {
    ExecutionTarget {
        workgroup: "primary".into(),
        output_location: "s3://demo-results/athena-results/".into(),
        region: "us-east-1".into(),
        database: Some("lakeformation_demo_db".into()),
    }
}

fn outcome(description: &str, status: OutcomeStatus, verdict: Verdict) -> QueryOutcome {
    QueryOutcome {
        identity: "Analyst".into(),
        description: description.into(),
        sql: "SELECT 1".into(),
        job_id: Some(JobId::new("a1b2c3d4-5678-90ab-cdef-1234567890ab")),
        status,
        result: None,
        diagnostic: None,
        verdict,
    }
}

fn identity(name: &str, outcomes: Vec<QueryOutcome>) -> IdentityRun {
    IdentityRun {
        identity: name.into(),
        role: format!("arn:aws:iam::123456789012:role/{}", name),
        expected_access: Some(format!("{} access", name)),
        assume_error: None,
        refresh_error: None,
        outcomes,
        skipped_queries: 0,
    }
}

fn ghost() -> IdentityRun {
    IdentityRun {
        assume_error: Some("Access denied: not authorized to perform sts:AssumeRole".into()),
        skipped_queries: 2,
        ..identity("Ghost", Vec::new())
    }
}

fn report(identities: Vec<IdentityRun>) -> RunReport {
    let started = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let finished = DateTime::from_timestamp(1_700_000_012, 500_000_000).unwrap();
    RunReport::new("demo", target(), identities, started, finished)
}

#[test]
fn all_passing_run_exits_zero() {
    let report = report(vec![identity(
        "DataAdmin",
        vec![outcome("counts", OutcomeStatus::Succeeded, Verdict::Pass)],
    )]);
    assert_eq!(report.tally.passed, 1);
    assert_eq!(report.exit_code(), exit_codes::SUCCESS);
}

#[test]
fn failed_verdict_exits_one() {
    let report = report(vec![identity(
        "Analyst",
        vec![outcome(
            "counts",
            OutcomeStatus::Succeeded,
            Verdict::Fail(vec!["expected 1 rows, got 3".into()]),
        )],
    )]);
    assert_eq!(report.tally.failed, 1);
    assert_eq!(report.exit_code(), exit_codes::FAILURE);
}

#[test]
fn skipped_identity_exits_one() {
    let report = report(vec![ghost()]);
    assert_eq!(report.tally.skipped_identities, 1);
    assert_eq!(report.tally.skipped_queries, 2);
    assert_eq!(report.exit_code(), exit_codes::FAILURE);
}

#[test]
fn failed_refresh_is_reported_apart_from_role_assumption() {
    let run = IdentityRun {
        refresh_error: Some("Access denied: session policy revoked".into()),
        skipped_queries: 2,
        ..identity(
            "DataAdmin",
            vec![outcome("counts", OutcomeStatus::Succeeded, Verdict::Pass)],
        )
    };
    let report = report(vec![run]);
    assert_eq!(report.tally.skipped_identities, 0);
    assert_eq!(report.tally.skipped_queries, 2);
    assert_eq!(report.exit_code(), exit_codes::FAILURE);

    let text = report.render(Palette::plain(), 100);
    assert!(text.contains("Credential refresh failed: Access denied: session policy revoked"));
    assert!(text.contains("Skipped 2 remaining queries"));
    assert!(text.contains("1 passed, 0 failed, 0 inconclusive, credential refresh failed, 2 queries skipped"));
    assert!(!text.contains("Role assumption failed"));
    assert!(!text.contains("role assumption failed"));
}

#[test]
fn inconclusive_alone_does_not_fail_the_run() {
    let report = report(vec![identity(
        "Analyst",
        vec![outcome(
            "slow",
            OutcomeStatus::TimedOut { last_state: None },
            Verdict::Inconclusive("query did not finish".into()),
        )],
    )]);
    assert_eq!(report.tally.inconclusive, 1);
    assert_eq!(report.exit_code(), exit_codes::SUCCESS);
}

#[test]
fn render_shows_table_and_verdict() {
    let mut ok = outcome("Record count by region", OutcomeStatus::Succeeded, Verdict::Pass);
    ok.result = Some(ResultSet::from_raw(vec![
        vec![Some("sales_region".into()), Some("record_count".into())],
        vec![Some("APAC".into()), Some("9".into())],
    ]));
    let text = report(vec![identity("Analyst", vec![ok])]).render(Palette::plain(), 80);

    assert!(text.contains("Analyst"));
    assert!(text.contains("> Record count by region"));
    assert!(text.contains("Job:    a1b2c3d4-5678-90ab-cdef-1234567890ab"));
    assert!(text.contains("Status: SUCCEEDED"));
    assert!(text.contains("APAC"));
    assert!(text.contains("(1 row)"));
    assert!(text.contains("Verdict: PASS"));
    assert!(!text.contains('\x1b'));
}

#[test]
fn render_classifies_failures_with_hint() {
    let mut failed = outcome(
        "PII columns",
        OutcomeStatus::Failed,
        Verdict::Fail(vec!["expected success, query FAILED (column not found)".into()]),
    );
    failed.diagnostic = Some(Diagnostic::failure(
        "COLUMN_NOT_FOUND: line 1:8: Column 'ssn' cannot be resolved",
    ));
    let text = report(vec![identity("Analyst", vec![failed])]).render(Palette::plain(), 200);

    assert!(text.contains("Error [column not found]: COLUMN_NOT_FOUND"));
    assert!(text.contains("Hint: The column is not visible to this identity."));
    assert!(text.contains("Verdict: FAIL"));
    assert!(text.contains("- expected success, query FAILED (column not found)"));
}

#[test]
fn render_reports_skipped_identity() {
    let text = report(vec![ghost()]).render(Palette::plain(), 100);
    assert!(text.contains("Role assumption failed: Access denied"));
    assert!(text.contains("Skipped 2 queries"));
    assert!(text.contains("role assumption failed, 2 queries skipped"));
}

#[test]
fn summary_restates_expected_access_and_totals() {
    let text = report(vec![
        identity(
            "DataAdmin",
            vec![outcome("counts", OutcomeStatus::Succeeded, Verdict::Pass)],
        ),
        ghost(),
    ])
    .render(Palette::plain(), 100);

    let summary = text.split("Summary").nth(1).unwrap();
    assert!(summary.contains("Expected: DataAdmin access"));
    assert!(summary.contains("1 passed, 0 failed, 0 inconclusive"));
    assert!(summary.contains("Totals: 1 passed, 0 failed, 0 inconclusive, 1 identity skipped"));
    assert!(summary.contains("Result: FAIL in 12.5s"));
}

#[test]
fn long_diagnostics_wrap_to_width() {
    let mut failed = outcome("wide", OutcomeStatus::Failed, Verdict::Pass);
    failed.diagnostic = Some(Diagnostic::note("word ".repeat(40)));
    let text = report(vec![identity("Analyst", vec![failed])]).render(Palette::plain(), 50);
    for line in text.lines().filter(|l| l.contains("word")) {
        assert!(line.chars().count() <= 50, "{:?}", line);
    }
}

#[test]
fn colored_render_uses_escape_codes() {
    let text = report(vec![ghost()]).render(Palette::new(true), 80);
    assert!(text.contains(crate::output::escape::RED));
}

#[test]
fn json_report_round_trips_through_serde_value() {
    let mut failed = outcome(
        "PII columns",
        OutcomeStatus::Failed,
        Verdict::Fail(vec!["expected success".into()]),
    );
    failed.diagnostic = Some(Diagnostic::failure("Insufficient Lake Formation permission(s)"));
    let report = report(vec![identity("Analyst", vec![failed]), ghost()]);

    let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(value["suite"], "demo");
    assert_eq!(value["tally"]["failed"], 1);
    let first = &value["identities"][0]["outcomes"][0];
    assert_eq!(first["status"]["status"], "failed");
    assert_eq!(first["diagnostic"]["category"], "access_denied");
    assert_eq!(first["verdict"]["verdict"], "fail");
    assert_eq!(value["identities"][1]["skipped_queries"], 2);
}

#[test]
fn write_json_creates_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.json");
    report(vec![ghost()]).write_json(&path).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("\"suite\": \"demo\""));
}
