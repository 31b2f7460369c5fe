// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Structured generation capability.
//!
//! A generator receives an output schema, a prompt template and the named
//! inputs for that template, and answers with a JSON value that is supposed
//! to conform to the schema. Conformance is checked on our side by
//! deserializing into the requested Rust type: a value that does not fit is a
//! `WorkflowError::Validation`, never silently patched up.

use async_trait::async_trait;
use minijinja::{Environment, ErrorKind, UndefinedBehavior};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use crate::errors::{CapabilityError, WorkflowError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Named values substituted into a [`PromptTemplate`].
#[derive(Debug, Clone, Default)]
pub struct PromptInputs(BTreeMap<String, String>);

impl PromptInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        self.0.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Role-tagged message templates rendered with minijinja.
///
/// Inputs are referenced as `{{ name }}`. Rendering is strict: a template
/// that references an input nobody supplied fails instead of rendering an
/// empty string. Input values are inserted verbatim and never re-rendered.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    messages: Vec<(Role, &'static str)>,
}

impl PromptTemplate {
    pub fn user(template: &'static str) -> Self {
        Self {
            messages: vec![(Role::User, template)],
        }
    }

    pub fn with_system(system: &'static str, user: &'static str) -> Self {
        Self {
            messages: vec![(Role::System, system), (Role::User, user)],
        }
    }

    pub fn render(&self, inputs: &PromptInputs) -> Result<Vec<ChatMessage>, CapabilityError> {
        let env = prompt_environment();
        self.messages
            .iter()
            .map(|(role, template)| {
                Ok(ChatMessage {
                    role: *role,
                    content: render_message(&env, *template, inputs)?,
                })
            })
            .collect()
    }
}

fn prompt_environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env
}

fn render_message(
    env: &Environment<'static>,
    source: &'static str,
    inputs: &PromptInputs,
) -> Result<String, CapabilityError> {
    let template = env
        .template_from_str(source)
        .map_err(|e| CapabilityError::PromptTemplate(e.to_string()))?;

    let mut missing: Vec<String> = template
        .undeclared_variables(false)
        .into_iter()
        .filter(|name| inputs.get(name).is_none())
        .collect();
    missing.sort();
    if let Some(name) = missing.into_iter().next() {
        return Err(CapabilityError::MissingPromptInput(name));
    }

    template.render(&inputs.0).map_err(|e| match e.kind() {
        ErrorKind::UndefinedError => CapabilityError::MissingPromptInput(e.to_string()),
        _ => CapabilityError::PromptTemplate(e.to_string()),
    })
}

/// Description of the value a generator must produce.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: &'static str,
    pub description: &'static str,
    /// JSON Schema of the expected object.
    pub parameters: Value,
}

/// A Rust type that can be requested from a generator.
pub trait StructuredOutput: DeserializeOwned + Send {
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn json_schema() -> Value;

    fn schema() -> OutputSchema {
        OutputSchema {
            name: Self::NAME,
            description: Self::DESCRIPTION,
            parameters: Self::json_schema(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictRequest {
    pub schema: OutputSchema,
    pub prompt: PromptTemplate,
    pub inputs: PromptInputs,
}

impl PredictRequest {
    pub fn messages(&self) -> Result<Vec<ChatMessage>, CapabilityError> {
        self.prompt.render(&self.inputs)
    }
}

#[async_trait]
pub trait StructuredGenerator: Send + Sync {
    async fn predict(&self, request: &PredictRequest) -> Result<Value, CapabilityError>;

    fn name(&self) -> &'static str;
}

/// Ask `generator` for a `T` and validate the answer against it.
pub async fn predict<T: StructuredOutput>(
    generator: &dyn StructuredGenerator,
    prompt: &PromptTemplate,
    inputs: PromptInputs,
) -> Result<T, WorkflowError> {
    let request = PredictRequest {
        schema: T::schema(),
        prompt: prompt.clone(),
        inputs,
    };
    let value = generator.predict(&request).await?;
    serde_json::from_value(value).map_err(|e| WorkflowError::Validation {
        schema: T::NAME.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        value: u32,
    }

    impl StructuredOutput for Answer {
        const NAME: &'static str = "Answer";
        const DESCRIPTION: &'static str = "A single number";

        fn json_schema() -> Value {
            json!({"type": "object", "properties": {"value": {"type": "integer"}}, "required": ["value"]})
        }
    }

    struct Fixed(Value);

    #[async_trait]
    impl StructuredGenerator for Fixed {
        async fn predict(&self, request: &PredictRequest) -> Result<Value, CapabilityError> {
            request.messages()?;
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_render_substitutes_named_inputs() {
        let template = PromptTemplate::with_system("You are {{ role }}.", "Summarize: {{ text }}\n");
        let inputs = PromptInputs::new().with("role", "a clinician").with("text", "notes");
        let messages = template.render(&inputs).unwrap();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are a clinician.");
        assert_eq!(messages[1].role, Role::User);
        assert_eq!(messages[1].content, "Summarize: notes\n");
    }

    #[test]
    fn test_render_inserts_values_verbatim() {
        let inputs = PromptInputs::new().with("record", r#"{"note": "<b>{{ x }}</b> & more"}"#);
        let messages = PromptTemplate::user("json like {\"a\": 1} stays; record {{ record }}")
            .render(&inputs)
            .unwrap();
        assert_eq!(
            messages[0].content,
            r#"json like {"a": 1} stays; record {"note": "<b>{{ x }}</b> & more"}"#
        );
    }

    #[test]
    fn test_render_missing_input_is_an_error() {
        let inputs = PromptInputs::new().with("greeting", "Hello");
        match PromptTemplate::user("{{ greeting }} {{ name }}").render(&inputs) {
            Err(CapabilityError::MissingPromptInput(name)) => assert_eq!(name, "name"),
            other => panic!("Expected MissingPromptInput, got {:?}", other),
        }
    }

    #[test]
    fn test_render_rejects_broken_template() {
        match PromptTemplate::user("Hello {{ name").render(&PromptInputs::new().with("name", "Ana")) {
            Err(CapabilityError::PromptTemplate(_)) => {}
            other => panic!("Expected PromptTemplate error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_predict_validates_against_the_schema() {
        let prompt = PromptTemplate::user("give me a number");

        let ok: Answer = predict(&Fixed(json!({"value": 4})), &prompt, PromptInputs::new())
            .await
            .unwrap();
        assert_eq!(ok, Answer { value: 4 });

        let err = predict::<Answer>(&Fixed(json!({"value": "four"})), &prompt, PromptInputs::new())
            .await
            .unwrap_err();
        match err {
            WorkflowError::Validation { schema, .. } => assert_eq!(schema, "Answer"),
            other => panic!("Expected Validation error, got {:?}", other),
        }
    }
}
