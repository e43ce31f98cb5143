// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Service call capture and recording.
//!
//! Every call lakeguard makes to the role-assumption and query-execution
//! services can be recorded here together with the access key that signed
//! it. The log doubles as an audit trail (JSONL on disk) and as the basis of
//! credential-isolation assertions in tests.

mod call;
mod duration_serde;
mod log;

pub use call::{CallOutcome, CapturedCall, ServiceCall};
pub use log::CallLog;
