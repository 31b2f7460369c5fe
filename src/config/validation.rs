// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Configuration validation.
//!
//! All checks run and every failure is returned, so a user fixing a config
//! file sees the whole list in one pass.
//!
//! # Checks
//!
//! 1. **Executor options**: every count that is set must be at least one, and
//!    `retry_attempts` is capped
//! 2. **Generation**: model, base URL and API key variable must be non-empty
//! 3. **Retrieval**: `similarity_top_k` at least one, guidelines directory exists
//!
//! # Example
//! ```rust
//! use caseflow::config::{parse_config, validate_config};
//! use caseflow::errors::ValidationError;
//!
//! let config = parse_config("retrieval:\n  guidelines_dir: /nowhere\n", "yaml").unwrap();
//! let errors = validate_config(&config).unwrap_err();
//! assert!(matches!(errors[0], ValidationError::MissingGuidelinesDir { .. }));
//! ```

use crate::config::consts::MAX_RETRY_ATTEMPTS;
use crate::config::Config;
use crate::errors::ValidationError;

/// Validate a loaded configuration, returning every problem found.
pub fn validate_config(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    validate_executor_options(config, &mut errors);
    validate_generation(config, &mut errors);
    validate_retrieval(config, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn require_positive(value: Option<u64>, field: &'static str, errors: &mut Vec<ValidationError>) {
    if value == Some(0) {
        errors.push(ValidationError::NonPositive { field });
    }
}

fn require_non_empty(value: &str, field: &'static str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError::EmptyValue { field });
    }
}

fn validate_executor_options(config: &Config, errors: &mut Vec<ValidationError>) {
    let options = &config.executor_options;
    require_positive(
        options.max_concurrency.map(|v| v as u64),
        "executor_options.max_concurrency",
        errors,
    );
    require_positive(options.timeout_seconds, "executor_options.timeout_seconds", errors);
    require_positive(
        options.stream_capacity.map(|v| v as u64),
        "executor_options.stream_capacity",
        errors,
    );
    // retry_attempts may be zero: that just disables retries.
    if let Some(retries) = options.retry_attempts {
        if retries > MAX_RETRY_ATTEMPTS {
            errors.push(ValidationError::TooLarge {
                field: "executor_options.retry_attempts",
                max: MAX_RETRY_ATTEMPTS as u64,
            });
        }
    }
}

fn validate_generation(config: &Config, errors: &mut Vec<ValidationError>) {
    let generation = &config.generation;
    require_non_empty(&generation.model, "generation.model", errors);
    require_non_empty(&generation.base_url, "generation.base_url", errors);
    require_non_empty(&generation.api_key_env, "generation.api_key_env", errors);
    require_positive(
        Some(generation.request_timeout_seconds),
        "generation.request_timeout_seconds",
        errors,
    );
}

fn validate_retrieval(config: &Config, errors: &mut Vec<ValidationError>) {
    let retrieval = &config.retrieval;
    require_positive(
        Some(retrieval.similarity_top_k as u64),
        "retrieval.similarity_top_k",
        errors,
    );
    if !retrieval.guidelines_dir.is_dir() {
        errors.push(ValidationError::MissingGuidelinesDir {
            path: retrieval.guidelines_dir.clone(),
        });
    }
}
