// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use serial_test::serial;

const TERRAFORM_OUTPUT: &str = r#"{
  "database_name": {"sensitive": false, "type": "string", "value": "sales_db"},
  "table_name": {"sensitive": false, "type": "string", "value": "sales"},
  "analyst_role_arn": {"sensitive": false, "type": "string", "value": "arn:aws:iam::123456789012:role/Analyst"},
  "athena_results_bucket": {"sensitive": false, "type": "string", "value": "demo-athena-results"},
  "tags": {"sensitive": false, "type": ["map", "string"], "value": {"env": "demo"}}
}"#;

#[test]
fn parses_terraform_output_json() {
    let outputs = ProvisioningOutputs::from_json(TERRAFORM_OUTPUT).unwrap();
    assert_eq!(outputs.database(), "sales_db");
    assert_eq!(outputs.table(), "sales");
    assert_eq!(
        outputs.role(keys::ANALYST_ROLE),
        Some("arn:aws:iam::123456789012:role/Analyst")
    );
    // non-scalar values are ignored
    assert_eq!(outputs.get("tags"), None);
}

#[test]
fn parses_flat_json() {
    let outputs =
        ProvisioningOutputs::from_json(r#"{"view_name": "masked", "athena_workgroup": "wg"}"#)
            .unwrap();
    assert_eq!(outputs.view(), "masked");
    assert_eq!(outputs.workgroup(), "wg");
}

#[test]
fn missing_outputs_fall_back_to_defaults() {
    let outputs = ProvisioningOutputs::default();
    assert_eq!(outputs.database(), DEFAULT_DATABASE);
    assert_eq!(outputs.table(), DEFAULT_TABLE);
    assert_eq!(outputs.view(), DEFAULT_VIEW);
    assert_eq!(outputs.workgroup(), DEFAULT_WORKGROUP);
    assert_eq!(
        outputs.role(keys::DATA_ADMIN_ROLE),
        Some(DEFAULT_DATA_ADMIN_ROLE)
    );
    assert_eq!(outputs.role("ghost_role_arn"), None);
}

#[test]
fn missing_results_location_is_fatal() {
    let outputs = ProvisioningOutputs::default();
    assert!(matches!(
        outputs.results_location(),
        Err(ConfigError::MissingResultsLocation)
    ));
    assert!(outputs.execution_target("us-east-1".into()).is_err());
}

#[test]
fn bucket_name_becomes_s3_location() {
    let outputs = ProvisioningOutputs::default().set(keys::RESULTS_BUCKET, "demo-results");
    assert_eq!(
        outputs.results_location().unwrap(),
        "s3://demo-results/athena-results/"
    );

    let outputs = ProvisioningOutputs::default().set(keys::RESULTS_BUCKET, "s3://b/custom");
    assert_eq!(outputs.results_location().unwrap(), "s3://b/custom/");
}

#[test]
fn rejects_non_object_documents() {
    assert!(matches!(
        ProvisioningOutputs::from_json("[1, 2]"),
        Err(ConfigError::NotAnObject)
    ));
    assert!(matches!(
        ProvisioningOutputs::from_json("{"),
        Err(ConfigError::Parse(_))
    ));
}

#[test]
fn load_reports_missing_file() {
    let err = ProvisioningOutputs::load(Path::new("/nonexistent/outputs.json")).unwrap_err();
    assert!(err.to_string().contains("/nonexistent/outputs.json"));
}

#[test]
#[serial]
fn env_overrides_win_over_outputs() {
    std::env::set_var(env::LAKEGUARD_TABLE, "override_table");
    std::env::set_var(env::LAKEGUARD_RESULTS_BUCKET, "env-bucket");
    let outputs = ProvisioningOutputs::from_json(TERRAFORM_OUTPUT)
        .unwrap()
        .with_env_overrides();
    std::env::remove_var(env::LAKEGUARD_TABLE);
    std::env::remove_var(env::LAKEGUARD_RESULTS_BUCKET);

    assert_eq!(outputs.table(), "override_table");
    assert_eq!(outputs.database(), "sales_db");
    assert_eq!(
        outputs.results_location().unwrap(),
        "s3://env-bucket/athena-results/"
    );
}

#[test]
#[serial]
fn region_prefers_outputs_then_env() {
    std::env::set_var(env::AWS_REGION, "eu-central-1");
    let from_env = ProvisioningOutputs::default().region();
    let from_outputs = ProvisioningOutputs::default()
        .set(keys::REGION, "ap-southeast-2")
        .region();
    std::env::remove_var(env::AWS_REGION);

    assert_eq!(from_env, "eu-central-1");
    assert_eq!(from_outputs, "ap-southeast-2");
}

#[test]
fn poll_policy_requires_an_attempt() {
    assert!(PollPolicy::new(Duration::from_millis(10), 0).is_err());
    let policy = PollPolicy::new(Duration::from_millis(10), 3)
        .unwrap()
        .cancel_on_timeout(true);
    assert_eq!(policy.max_attempts, 3);
    assert!(policy.cancel_on_timeout);
}
