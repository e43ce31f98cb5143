// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

// Build scripts are expected to panic on failure.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::io::Write;

fn main() {
    let out_dir = std::env::var("OUT_DIR").unwrap();
    let path = std::path::Path::new(&out_dir).join("env_names.rs");
    let mut f = std::fs::File::create(path).unwrap();

    let vars = [
        ("LAKEGUARD_OUTPUTS", "LAKEGUARD_OUTPUTS"),
        ("LAKEGUARD_SUITE", "LAKEGUARD_SUITE"),
        ("LAKEGUARD_DATABASE", "LAKEGUARD_DATABASE"),
        ("LAKEGUARD_TABLE", "LAKEGUARD_TABLE"),
        ("LAKEGUARD_VIEW", "LAKEGUARD_VIEW"),
        ("LAKEGUARD_DATA_ADMIN_ROLE", "LAKEGUARD_DATA_ADMIN_ROLE"),
        ("LAKEGUARD_ANALYST_ROLE", "LAKEGUARD_ANALYST_ROLE"),
        ("LAKEGUARD_WORKGROUP", "LAKEGUARD_WORKGROUP"),
        ("LAKEGUARD_RESULTS_BUCKET", "LAKEGUARD_RESULTS_BUCKET"),
        ("AWS_REGION", "AWS_REGION"),
        ("AWS_DEFAULT_REGION", "AWS_DEFAULT_REGION"),
        ("NO_COLOR", "NO_COLOR"),
    ];

    for (const_name, env_name) in vars {
        writeln!(f, "pub const {const_name}: &str = \"{env_name}\";").unwrap();
    }
}
