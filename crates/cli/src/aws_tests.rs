// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
use super::*;
use rstest::rstest;

fn offline_services() -> AwsServices {
    AwsServices::from_config(
        SdkConfig::builder()
            .region(Region::new("eu-west-1"))
            .behavior_version(BehaviorVersion::latest())
            .build(),
    )
}

#[test]
fn scoped_credentials_become_static_sdk_credentials() {
    let expiration = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
    let credential = Credential::new("ASIAEXAMPLE", "secret", "token").with_expiration(expiration);

    let sdk = to_sdk_credentials(&credential);
    assert_eq!(sdk.access_key_id(), "ASIAEXAMPLE");
    assert_eq!(sdk.secret_access_key(), "secret");
    assert_eq!(sdk.session_token(), Some("token"));
    assert_eq!(
        sdk.expiry(),
        Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    );
}

#[test]
fn empty_session_token_is_omitted() {
    let sdk = to_sdk_credentials(&Credential::new("AKIA", "secret", ""));
    assert_eq!(sdk.session_token(), None);
    assert_eq!(sdk.expiry(), None);
}

#[rstest]
#[case(QueryExecutionState::Queued, JobState::Queued)]
#[case(QueryExecutionState::Running, JobState::Running)]
#[case(QueryExecutionState::Succeeded, JobState::Succeeded)]
#[case(QueryExecutionState::Failed, JobState::Failed)]
#[case(QueryExecutionState::Cancelled, JobState::Cancelled)]
fn athena_states_map_to_job_states(#[case] state: QueryExecutionState, #[case] expected: JobState) {
    assert_eq!(job_state(&state).unwrap(), expected);
}

#[test]
fn unknown_athena_state_is_an_error() {
    let err = job_state(&QueryExecutionState::from("PAUSED")).unwrap_err();
    assert_eq!(err.code(), "UnknownQueryState");
    assert!(err.message().contains("PAUSED"));
}

#[tokio::test]
async fn athena_clients_use_the_target_region() {
    let services = offline_services();
    let client = services.athena(&Credential::new("AKIA", "secret", "token"), "ap-southeast-2");
    assert_eq!(
        client.config().region().map(|r| r.as_ref()),
        Some("ap-southeast-2")
    );
}

#[test]
fn debug_shows_region_only() {
    let text = format!("{:?}", offline_services());
    assert!(text.contains("eu-west-1"));
}
