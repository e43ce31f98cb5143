// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use rstest::rstest;

fn target() -> ExecutionTarget {
    ExecutionTarget {
        workgroup: "primary".into(),
        output_location: "s3://results/athena-results/".into(),
        region: "us-east-1".into(),
        database: Some("lakeformation_demo_db".into()),
    }
}

fn demo() -> SimLake {
    SimLake::demo(&ProvisioningOutputs::default())
}

async fn assume(lake: &SimLake, role: &str) -> Credential {
    lake.assume_role(&RoleRef::parse(role), &SessionLabel::new("test"))
        .await
        .unwrap()
}

/// Submit, poll to a terminal state, and read every page
async fn run(
    lake: &SimLake,
    credential: &Credential,
    sql: &str,
) -> std::result::Result<Vec<Vec<Option<String>>>, String> {
    let job = lake.start_query(credential, sql, &target()).await.unwrap();
    loop {
        let status = lake.get_status(credential, &job, &target()).await.unwrap();
        match status.state {
            JobState::Succeeded => break,
            JobState::Failed | JobState::Cancelled => return Err(status.reason.unwrap_or_default()),
            JobState::Queued | JobState::Running => {}
        }
    }
    let mut rows = Vec::new();
    let mut token = None;
    loop {
        let page = lake
            .get_results(
                credential,
                &job,
                &target(),
                PageRequest {
                    token: token.take(),
                    max_rows: 1000,
                },
            )
            .await
            .unwrap();
        rows.extend(page.rows);
        match page.next_token {
            Some(next) => token = Some(next),
            None => return Ok(rows),
        }
    }
}

fn cells(rows: &[Vec<Option<String>>]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|r| r.iter().map(|c| c.clone().unwrap_or_default()).collect())
        .collect()
}

#[rstest]
#[case(Mask::Email, "alice.j@example.com", "***@example.com")]
#[case(Mask::Email, "not-an-email", "***")]
#[case(Mask::Digits, "123-45-6789", "***-**-****")]
fn masks_rewrite_values(#[case] mask: Mask, #[case] input: &str, #[case] expected: &str) {
    assert_eq!(mask.apply(input), expected);
}

#[rstest]
#[case("arn:aws:iam::123456789012:role/Analyst", "Analyst")]
#[case("arn:aws:iam::123456789012:role/team/Analyst", "Analyst")]
#[case("Analyst", "Analyst")]
fn role_name_strips_arn(#[case] role: &str, #[case] expected: &str) {
    assert_eq!(role_name(role), expected);
}

#[test]
fn sample_sales_has_twenty_rows_across_three_regions() {
    let sales = sample_sales();
    assert_eq!(sales.rows.len(), 20);
    let region = sales.index("sales_region").unwrap();
    let count = |r: &str| sales.rows.iter().filter(|row| row[region] == r).count();
    assert_eq!((count("APAC"), count("EMEA"), count("AMER")), (8, 6, 6));
}

#[tokio::test]
async fn unknown_role_is_denied() {
    let lake = demo();
    let err = lake
        .assume_role(&RoleRef::parse("Ghost"), &SessionLabel::new("test"))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied(_)));
    assert!(err.to_string().contains("sts:AssumeRole"));
    assert_eq!(lake.minted(), 0);
}

#[tokio::test]
async fn each_assumption_mints_distinct_credentials() {
    let lake = demo();
    let admin = assume(&lake, "LakeFormationDataAdmin").await;
    let analyst = assume(&lake, "arn:aws:iam::123456789012:role/LakeFormationAnalyst").await;
    let again = assume(&lake, "LakeFormationAnalyst").await;
    assert_ne!(admin.access_key_id, analyst.access_key_id);
    assert_ne!(analyst.access_key_id, again.access_key_id);
    assert_eq!(lake.minted(), 3);
}

#[tokio::test]
async fn admin_sees_every_region_and_pii() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationDataAdmin").await;

    let rows = run(
        &lake,
        &cred,
        "SELECT sales_region, COUNT(*) AS record_count FROM lakeformation_demo_db.sales_data \
         GROUP BY sales_region ORDER BY sales_region",
    )
    .await
    .unwrap();
    assert_eq!(
        cells(&rows),
        vec![
            vec!["sales_region", "record_count"],
            vec!["AMER", "6"],
            vec!["APAC", "8"],
            vec!["EMEA", "6"],
        ]
    );

    let rows = run(&lake, &cred, "SELECT * FROM sales_data LIMIT 10").await.unwrap();
    assert_eq!(rows.len(), 11);
    assert!(cells(&rows)[0].contains(&"ssn".to_string()));
}

#[tokio::test]
async fn analyst_rows_are_filtered_to_apac() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationAnalyst").await;
    let rows = run(
        &lake,
        &cred,
        "SELECT sales_region, COUNT(*) AS record_count FROM lakeformation_demo_db.sales_data \
         GROUP BY sales_region",
    )
    .await
    .unwrap();
    assert_eq!(
        cells(&rows),
        vec![vec!["sales_region", "record_count"], vec!["APAC", "8"]]
    );
}

#[tokio::test]
async fn analyst_star_omits_hidden_columns() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationAnalyst").await;
    let rows = run(&lake, &cred, "SELECT * FROM sales_data").await.unwrap();
    let rows = cells(&rows);
    assert!(!rows[0].contains(&"ssn".to_string()));
    assert!(!rows[0].contains(&"customer_email".to_string()));
    assert_eq!(rows.len(), 9);
}

#[tokio::test]
async fn hidden_column_fails_as_unresolvable() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationAnalyst").await;
    let reason = run(&lake, &cred, "SELECT customer_id, ssn FROM sales_data")
        .await
        .unwrap_err();
    assert!(reason.starts_with("COLUMN_NOT_FOUND"));
    assert!(reason.contains("'ssn' cannot be resolved"));
}

#[tokio::test]
async fn masked_view_hides_pii() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationAnalyst").await;
    let rows = run(
        &lake,
        &cred,
        "SELECT customer_email, ssn, sales_region FROM lakeformation_demo_db.sales_data_masked",
    )
    .await
    .unwrap();
    let rows = cells(&rows);
    assert_eq!(rows.len(), 9);
    for row in &rows[1..] {
        assert!(row[0].starts_with("***@"));
        assert!(!row[1].chars().any(|c| c.is_ascii_digit()));
        assert_eq!(row[2], "APAC");
    }
}

#[rstest]
#[case("SELECT * FROM other_db.sales_data", "TABLE_NOT_FOUND")]
#[case("SELECT * FROM missing", "TABLE_NOT_FOUND")]
#[case("DROP TABLE sales_data", "SYNTAX_ERROR")]
#[case("SELECT customer_id, COUNT(*) FROM sales_data", "SYNTAX_ERROR")]
#[case("SELECT * FROM sales_data WHERE amount > 3", "SYNTAX_ERROR")]
#[tokio::test]
async fn bad_queries_fail_with_service_reasons(#[case] sql: &str, #[case] prefix: &str) {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let reason = run(&lake, &cred, sql).await.unwrap_err();
    assert!(reason.starts_with(prefix), "{}", reason);
}

#[tokio::test]
async fn ungranted_relation_is_insufficient_permission() {
    let lake = SimLake::new("db")
        .with_table("t", sample_sales())
        .with_role("Nobody", RolePolicy::new());
    let cred = assume(&lake, "Nobody").await;
    let mut target = target();
    target.database = Some("db".into());
    let job = lake.start_query(&cred, "SELECT * FROM t", &target).await.unwrap();
    lake.get_status(&cred, &job, &target).await.unwrap();
    let status = lake.get_status(&cred, &job, &target).await.unwrap();
    assert_eq!(status.state, JobState::Failed);
    assert!(status
        .reason
        .unwrap()
        .contains("Insufficient Lake Formation permission"));
}

#[tokio::test]
async fn where_clause_filters_rows() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let rows = run(
        &lake,
        &cred,
        "SELECT customer_id FROM sales_data WHERE sales_region = 'EMEA' AND sale_date = '2024-04-22'",
    )
    .await
    .unwrap();
    assert_eq!(cells(&rows), vec![vec!["customer_id"], vec!["CUST0018"]]);
}

#[tokio::test]
async fn order_by_desc_sorts_numerically() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let rows = run(
        &lake,
        &cred,
        "SELECT customer_id, sales_amount FROM sales_data ORDER BY sales_amount DESC LIMIT 2",
    )
    .await
    .unwrap();
    assert_eq!(
        cells(&rows),
        vec![
            vec!["customer_id", "sales_amount"],
            vec!["CUST0004", "3200.00"],
            vec!["CUST0014", "3100.00"],
        ]
    );
}

#[tokio::test]
async fn jobs_report_queued_then_running_before_terminal() {
    let lake = demo().with_behavior(SimBehavior {
        running_polls: 2,
        ..SimBehavior::default()
    });
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let job = lake
        .start_query(&cred, "SELECT * FROM sales_data", &target())
        .await
        .unwrap();
    let mut states = Vec::new();
    for _ in 0..3 {
        states.push(lake.get_status(&cred, &job, &target()).await.unwrap().state);
    }
    assert_eq!(
        states,
        vec![JobState::Queued, JobState::Running, JobState::Succeeded]
    );
}

#[tokio::test]
async fn results_before_completion_are_rejected() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let job = lake
        .start_query(&cred, "SELECT * FROM sales_data", &target())
        .await
        .unwrap();
    let err = lake
        .get_results(&cred, &job, &target(), PageRequest::default())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("has not yet finished"));
}

#[tokio::test]
async fn results_are_paginated() {
    let lake = demo().with_behavior(SimBehavior {
        running_polls: 0,
        page_size: 8,
        ..SimBehavior::default()
    });
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let job = lake
        .start_query(&cred, "SELECT customer_id FROM sales_data", &target())
        .await
        .unwrap();
    lake.get_status(&cred, &job, &target()).await.unwrap();

    let first = lake
        .get_results(
            &cred,
            &job,
            &target(),
            PageRequest {
                token: None,
                max_rows: 100,
            },
        )
        .await
        .unwrap();
    assert_eq!(first.rows.len(), 8);
    assert_eq!(first.next_token.as_deref(), Some("offset-8"));

    let rows = run(&lake, &cred, "SELECT customer_id FROM sales_data")
        .await
        .unwrap();
    assert_eq!(rows.len(), 21);
}

#[tokio::test]
async fn jobs_are_bound_to_the_submitting_session() {
    let lake = demo();
    let admin = assume(&lake, "LakeFormationDataAdmin").await;
    let analyst = assume(&lake, "LakeFormationAnalyst").await;
    let job = lake
        .start_query(&admin, "SELECT * FROM sales_data", &target())
        .await
        .unwrap();
    let err = lake.get_status(&analyst, &job, &target()).await.unwrap_err();
    assert!(matches!(err, ServiceError::AccessDenied(_)));
}

#[tokio::test]
async fn forged_credentials_are_rejected() {
    let lake = demo();
    let forged = Credential::new("ASIAFORGED", "secret", "token");
    let err = lake
        .start_query(&forged, "SELECT * FROM sales_data", &target())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "UnrecognizedClientException");
}

#[tokio::test]
async fn stop_cancels_a_running_job() {
    let lake = demo().with_behavior(SimBehavior {
        never_finish: true,
        ..SimBehavior::default()
    });
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let job = lake
        .start_query(&cred, "SELECT * FROM sales_data", &target())
        .await
        .unwrap();
    assert_eq!(
        lake.get_status(&cred, &job, &target()).await.unwrap().state,
        JobState::Queued
    );
    lake.stop_query(&cred, &job, &target()).await.unwrap();
    assert_eq!(
        lake.get_status(&cred, &job, &target()).await.unwrap().state,
        JobState::Cancelled
    );
}

#[tokio::test]
async fn missing_output_location_is_rejected_at_submit() {
    let lake = demo();
    let cred = assume(&lake, "LakeFormationDataAdmin").await;
    let mut target = target();
    target.output_location.clear();
    let err = lake
        .start_query(&cred, "SELECT 1 FROM sales_data", &target)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidRequest(_)));
}
