// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use thiserror::Error;

/// Inconsistent use of a barrier group. Every variant is a programming error
/// in the workflow and aborts the run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BarrierError {
    #[error("Barrier group '{group}' was opened twice (expected {first}, then {second})")]
    AlreadyOpened {
        group: String,
        first: usize,
        second: usize,
    },

    #[error("Barrier group '{group}' received {received} results but expects only {expected}")]
    Overflow {
        group: String,
        expected: usize,
        received: usize,
    },

    #[error("Barrier group '{group}' received a result after it was released")]
    SubmitAfterRelease { group: String },

    #[error("Barrier group '{group}' was used with a result type other than {expected}")]
    TypeMismatch { group: String, expected: &'static str },
}
