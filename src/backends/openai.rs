// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured generation against an OpenAI-compatible chat-completions API.
//!
//! The output schema is offered as the single callable function and the
//! request forces the model to call it, so the function arguments are the
//! structured answer.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use crate::errors::CapabilityError;
use crate::observability::messages::capability::GenerationRequested;
use crate::traits::{ChatMessage, PredictRequest, StructuredGenerator};

#[derive(Debug, Clone)]
pub struct OpenAiSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub request_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct OpenAiGenerator {
    client: Client,
    settings: OpenAiSettings,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    tools: Vec<Value>,
    tool_choice: Value,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Deserialize)]
struct AssistantMessage {
    #[serde(default)]
    tool_calls: Vec<ToolCall>,
}

#[derive(Deserialize)]
struct ToolCall {
    function: FunctionCall,
}

#[derive(Deserialize)]
struct FunctionCall {
    name: String,
    arguments: String,
}

impl OpenAiGenerator {
    pub fn new(settings: OpenAiSettings) -> Result<Self, CapabilityError> {
        if settings.api_key.trim().is_empty() {
            return Err(CapabilityError::Misconfigured("API key is empty".to_string()));
        }
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&format!("Bearer {}", settings.api_key))
                .map_err(|_| CapabilityError::Misconfigured("Invalid API key format".to_string()))?,
        );

        let client = Client::builder()
            .timeout(settings.request_timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }
}

/// Pull the forced function call's arguments out of a completion response.
fn extract_arguments(response: CompletionResponse, function: &str) -> Result<Value, CapabilityError> {
    let call = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.tool_calls.into_iter().next())
        .ok_or_else(|| CapabilityError::MalformedResponse("response contains no function call".to_string()))?;

    if call.function.name != function {
        return Err(CapabilityError::MalformedResponse(format!(
            "expected a call to '{}', got '{}'",
            function, call.function.name
        )));
    }
    serde_json::from_str(&call.function.arguments)
        .map_err(|e| CapabilityError::MalformedResponse(format!("function arguments are not JSON: {}", e)))
}

#[async_trait]
impl StructuredGenerator for OpenAiGenerator {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, CapabilityError> {
        let messages = request.messages()?;
        let schema = &request.schema;
        tracing::debug!(
            "{}",
            GenerationRequested {
                generator: self.name(),
                schema: schema.name,
            }
        );

        let body = CompletionRequest {
            model: &self.settings.model,
            messages: &messages,
            tools: vec![json!({
                "type": "function",
                "function": {
                    "name": schema.name,
                    "description": schema.description,
                    "parameters": schema.parameters,
                }
            })],
            tool_choice: json!({"type": "function", "function": {"name": schema.name}}),
            temperature: 0.0,
        };

        let response = self.client.post(self.endpoint()).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CapabilityError::Status {
                status: status.as_u16(),
                body,
            });
        }
        let completion: CompletionResponse = response.json().await?;
        extract_arguments(completion, schema.name)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(value: Value) -> CompletionResponse {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_extracts_forced_function_arguments() {
        let completion = response(json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "GuidelineQueries", "arguments": "{\"queries\": [\"a\"]}"}
                    }]
                }
            }]
        }));
        let value = extract_arguments(completion, "GuidelineQueries").unwrap();
        assert_eq!(value, json!({"queries": ["a"]}));
    }

    #[test]
    fn test_plain_text_answer_is_malformed() {
        let completion = response(json!({
            "choices": [{"message": {"role": "assistant", "content": "Sure! Here you go."}}]
        }));
        assert!(matches!(
            extract_arguments(completion, "CaseSummary"),
            Err(CapabilityError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_rejects_empty_api_key() {
        let settings = OpenAiSettings {
            base_url: "http://localhost".to_string(),
            model: "m".to_string(),
            api_key: "  ".to_string(),
            request_timeout: Duration::from_secs(1),
        };
        assert!(matches!(
            OpenAiGenerator::new(settings),
            Err(CapabilityError::Misconfigured(_))
        ));
    }
}
