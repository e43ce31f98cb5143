// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use rstest::rstest;

#[rstest]
#[case(
    "COLUMN_NOT_FOUND: line 1:8: Column 'ssn' cannot be resolved",
    FailureCategory::ColumnNotFound
)]
#[case(
    "Insufficient Lake Formation permission(s) on sales_data",
    FailureCategory::AccessDenied
)]
#[case(
    "User: arn:aws:sts::1:assumed-role/Analyst/x is not authorized to perform: athena:StartQueryExecution",
    FailureCategory::AccessDenied
)]
#[case(
    "TABLE_NOT_FOUND: line 1:15: Table 'awsdatacatalog.db.nope' does not exist",
    FailureCategory::TableNotFound
)]
#[case("SYNTAX_ERROR: line 1:1: mismatched input 'SELEC'", FailureCategory::Syntax)]
#[case("Rate exceeded", FailureCategory::Throttled)]
#[case("Query exhausted resources at this scale factor", FailureCategory::Other)]
#[case("", FailureCategory::Other)]
fn classify_known_messages(#[case] message: &str, #[case] expected: FailureCategory) {
    assert_eq!(FailureCategory::classify(message), expected);
}

#[test]
fn column_not_found_wins_over_access_wording() {
    // Filtered columns surface as unresolvable, even though the cause is a grant
    let msg = "COLUMN_NOT_FOUND: Column 'customer_email' cannot be resolved or requester is not authorized";
    assert_eq!(
        FailureCategory::classify(msg),
        FailureCategory::ColumnNotFound
    );
}

#[test]
fn every_category_has_a_hint() {
    for category in [
        FailureCategory::AccessDenied,
        FailureCategory::ColumnNotFound,
        FailureCategory::TableNotFound,
        FailureCategory::Syntax,
        FailureCategory::Throttled,
        FailureCategory::Other,
    ] {
        assert!(!category.hint().is_empty());
    }
}
