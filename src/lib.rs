// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod backends;       // capability implementations
pub mod case_summary;   // patient case-summary workflow
pub mod config;         // config + runtime assembly
pub mod engine;         // event-driven step scheduler
pub mod errors;         // error handling
pub mod observability;
pub mod traits;         // step and capability abstractions
