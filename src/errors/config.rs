// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric option must be at least one
    NonPositive {
        /// Dotted path of the offending option
        field: &'static str,
    },
    /// A numeric option exceeded its upper bound
    TooLarge {
        /// Dotted path of the offending option
        field: &'static str,
        /// Largest accepted value
        max: u64,
    },
    /// A required string option was empty
    EmptyValue {
        /// Dotted path of the offending option
        field: &'static str,
    },
    /// The configured guidelines directory does not exist
    MissingGuidelinesDir {
        /// The directory that could not be found
        path: PathBuf,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::NonPositive { field } => {
                write!(f, "'{}' must be greater than zero", field)
            }
            ValidationError::TooLarge { field, max } => {
                write!(f, "'{}' must be at most {}", field, max)
            }
            ValidationError::EmptyValue { field } => {
                write!(f, "'{}' must not be empty", field)
            }
            ValidationError::MissingGuidelinesDir { path } => {
                write!(f, "Guidelines directory '{}' does not exist", path.display())
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Errors raised while reading a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Unsupported config format '{0}' (expected .yaml, .yml or .toml)")]
    UnsupportedFormat(String),

    #[error("Configuration validation failed: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
