// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Capability backends for caseflow workflows.
//!
//! Steps never construct their collaborators. Generation, retrieval and the
//! stage cache are trait objects handed in when a workflow is assembled, and
//! this module provides the concrete implementations.
//!
//! # Available Backends
//!
//! ## Generation
//! - **OpenAiGenerator**: chat-completions API with a forced function call
//!   whose parameters are the output schema
//! - **RetryingGenerator**: wraps any generator and retries transient failures
//!
//! ## Retrieval
//! - **GuidelineIndex**: keyword ranking over a directory of guideline files
//!
//! ## Stage cache
//! - **FsCacheStore**: one JSON file per stage, atomic replace on write
//! - **MemoryCacheStore**: in-process map
//!
//! ## Stub Backend (Test-Only)
//! - **StubGenerator**: canned answers keyed by schema name, with call counts
//! - **FailingGenerator**: always fails
//! - **StaticRetriever**: same documents for every query
//!
//! # Architecture
//!
//! ```text
//! Configuration → RuntimeBuilder → Arc<dyn Capability> → Steps → Workflow
//! ```

pub mod fs_cache;
pub mod guidelines;
pub mod memory_cache;
pub mod openai;
pub mod retry;
#[cfg(test)]
pub mod stub;

pub use fs_cache::FsCacheStore;
pub use guidelines::GuidelineIndex;
pub use memory_cache::MemoryCacheStore;
pub use openai::{OpenAiGenerator, OpenAiSettings};
pub use retry::RetryingGenerator;
