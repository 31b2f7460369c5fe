// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod barrier;
mod capability;
mod config;
mod execution;
mod record;
mod registration;

pub use barrier::BarrierError;
pub use capability::{CacheError, CapabilityError};
pub use config::{ConfigError, ValidationError};
pub use execution::WorkflowError;
pub use record::RecordError;
pub use registration::RegistrationError;
