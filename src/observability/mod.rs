// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! Operational diagnostics go through `tracing` using the struct-based
//! messages in [`messages`], so that log text is not scattered through the
//! engine as magic strings. Progress meant for the person running a workflow
//! is a separate channel: steps write `Log` events to the run's event stream.
//!
//! # Usage
//!
//! ```rust
//! use caseflow::observability::messages::engine::StepFailed;
//!
//! let error = std::io::Error::new(std::io::ErrorKind::Other, "test error");
//! let msg = StepFailed {
//!     step: "gather_guideline_match",
//!     error: &error,
//! };
//!
//! tracing::error!("{}", msg);
//! ```

pub mod messages;
