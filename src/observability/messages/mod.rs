// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for a consistent human-readable
//! line. Messages that carry fields worth filtering on also implement
//! [`StructuredLog`], which emits the line together with those fields and can
//! open a matching span.
//!
//! # Organization
//!
//! * `engine` - run lifecycle and step dispatch
//! * `barrier` - fan-in group events
//! * `cache` - stage cache hits, misses and writes
//! * `capability` - generation and retrieval calls
//!
//! # Usage Pattern
//!
//! ```rust
//! use caseflow::observability::messages::cache::CacheHit;
//!
//! let msg = CacheHit { stage: "patient_info" };
//!
//! tracing::info!("{}", msg);
//! ```

use tracing::Span;

pub mod barrier;
pub mod cache;
pub mod capability;
pub mod engine;

/// A message that knows its own level and structured fields.
pub trait StructuredLog {
    /// Emit the message at its level with structured fields attached.
    fn log(&self);

    /// Create a span carrying the same fields.
    fn span(&self, name: &str) -> Span;
}
