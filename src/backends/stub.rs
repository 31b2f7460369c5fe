// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Stub capabilities for tests.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::errors::CapabilityError;
use crate::traits::{Document, PredictRequest, Retriever, StructuredGenerator};

type Responder = Arc<dyn Fn(&PredictRequest) -> Result<Value, CapabilityError> + Send + Sync>;

/// A generator that answers from canned responses keyed by schema name.
#[derive(Default)]
pub struct StubGenerator {
    responders: HashMap<&'static str, Responder>,
    delay: Option<Duration>,
    calls: AtomicUsize,
    calls_by_schema: Mutex<HashMap<&'static str, usize>>,
}

impl StubGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every request for `schema` with `value`.
    pub fn respond(self, schema: &'static str, value: Value) -> Self {
        self.respond_with(schema, move |_| Ok(value.clone()))
    }

    /// Answer requests for `schema` by calling `responder`.
    pub fn respond_with<F>(mut self, schema: &'static str, responder: F) -> Self
    where
        F: Fn(&PredictRequest) -> Result<Value, CapabilityError> + Send + Sync + 'static,
    {
        self.responders.insert(schema, Arc::new(responder));
        self
    }

    /// Sleep before answering, to keep calls in flight.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, schema: &str) -> usize {
        self.calls_by_schema
            .lock()
            .map(|calls| calls.get(schema).copied().unwrap_or(0))
            .unwrap_or(0)
    }
}

#[async_trait]
impl StructuredGenerator for StubGenerator {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut calls) = self.calls_by_schema.lock() {
            *calls.entry(request.schema.name).or_insert(0) += 1;
        }
        // Surface missing template inputs the way a real generator would.
        request.messages()?;

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let responder = self.responders.get(request.schema.name).ok_or_else(|| {
            CapabilityError::Other(format!("no stub response for schema '{}'", request.schema.name))
        })?;
        responder(request)
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// A generator that always fails, for testing failure scenarios
pub struct FailingGenerator;

#[async_trait]
impl StructuredGenerator for FailingGenerator {
    async fn predict(&self, _request: &PredictRequest) -> Result<Value, CapabilityError> {
        Err(CapabilityError::Other("Simulated generator failure".to_string()))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// A retriever that returns the same documents for every query.
#[derive(Default)]
pub struct StaticRetriever {
    documents: Vec<Document>,
    calls: AtomicUsize,
}

impl StaticRetriever {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Retriever for StaticRetriever {
    async fn retrieve(&self, _query: &str) -> Result<Vec<Document>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.documents.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}
