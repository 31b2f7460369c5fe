// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for fan-in barrier groups.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use tracing::Span;

/// A fan-out step declared how many results a group waits for.
///
/// # Log Level
/// `debug!` - Scheduler detail
pub struct GroupOpened<'a> {
    pub group: &'a str,
    pub expected: usize,
}

impl Display for GroupOpened<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Barrier group '{}' expects {} results", self.group, self.expected)
    }
}

/// A group collected all of its results and released them downstream.
///
/// # Log Level
/// `info!` - Fan-in completed
///
/// # Example
/// ```
/// use caseflow::observability::messages::barrier::GroupReleased;
///
/// let msg = GroupReleased { group: "guideline_matches", count: 3 };
/// assert_eq!(msg.to_string(), "Barrier group 'guideline_matches' released with 3 results");
/// ```
pub struct GroupReleased<'a> {
    pub group: &'a str,
    pub count: usize,
}

impl Display for GroupReleased<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Barrier group '{}' released with {} results",
            self.group, self.count
        )
    }
}

impl StructuredLog for GroupReleased<'_> {
    fn log(&self) {
        tracing::info!(group = self.group, count = self.count, "{}", self);
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("barrier", span_name = name, group = self.group)
    }
}
