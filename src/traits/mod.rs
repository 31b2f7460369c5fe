// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod cache;
pub mod generator;
pub mod retriever;
pub mod step;

pub use cache::CacheStore;
pub use generator::{
    predict, ChatMessage, OutputSchema, PredictRequest, PromptInputs, PromptTemplate, Role,
    StructuredGenerator, StructuredOutput,
};
pub use retriever::{dedup_by_id, Document, Retriever};
pub use step::{FnStep, Step};
