// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised by injected capabilities: structured generation, retrieval
//! and the stage cache store.

use std::path::PathBuf;
use thiserror::Error;

/// Failure of a generation or retrieval call.
#[derive(Error, Debug)]
pub enum CapabilityError {
    /// Network-level failure talking to the backing service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service answered with a non-success status.
    #[error("Service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// The service answered but the payload was not what the protocol promises.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// A prompt template referenced an input that was not supplied.
    #[error("Prompt template references missing input '{0}'")]
    MissingPromptInput(String),

    /// A prompt template failed to parse or render.
    #[error("Prompt template failed to render: {0}")]
    PromptTemplate(String),

    /// Credentials or endpoint settings are unusable.
    #[error("Capability misconfigured: {0}")]
    Misconfigured(String),

    /// Local I/O performed by a capability (e.g. reading a guideline file).
    #[error("I/O error in capability: {0}")]
    Io(#[from] std::io::Error),

    /// Catch-all used by test doubles and simple adapters.
    #[error("{0}")]
    Other(String),
}

impl CapabilityError {
    /// Whether a fresh attempt of the same call could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CapabilityError::Transport(_) => true,
            CapabilityError::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for CapabilityError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => CapabilityError::Status {
                status: status.as_u16(),
                body: err.to_string(),
            },
            None if err.is_decode() => CapabilityError::MalformedResponse(err.to_string()),
            None => CapabilityError::Transport(err.to_string()),
        }
    }
}

/// Failure of the stage cache. Always fatal for the run.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Cache I/O failed for stage '{stage}' at '{path}': {source}")]
    Io {
        stage: String,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cached output for stage '{stage}' could not be decoded: {reason}")]
    Corrupt { stage: String, reason: String },

    #[error("Output for stage '{stage}' could not be encoded: {reason}")]
    Encode { stage: String, reason: String },

    #[error("Invalid stage key '{0}'")]
    InvalidKey(String),
}
