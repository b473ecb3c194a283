//! Opaque text transforms backed by a chat-completion API.
//!
//! Both pipeline personas (transcript proofreading, study-question
//! generation) are the same mechanism: a fixed system instruction plus the
//! chunk text as the user message.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{PromptsConfig, TransformConfig};

pub const PROOFREAD_INSTRUCTION: &str = "You are now an expert transcript proofreader who has \
    proof read many english texts written by both native and non-native english speakers. \
    You will only give me proof read text.";

pub const QUESTIONS_INSTRUCTION: &str = "You are now an expert at creating questions from given \
    text such that these questions will test students on the core concept of the text. You will \
    consider this entire text and generate questions from this text.";

/// Failures of a single transform call.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("transform request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transform service error ({status}): {body}")]
    Remote { status: StatusCode, body: String },
    #[error("could not parse transform response: {0}")]
    MalformedResponse(#[from] serde_json::Error),
    #[error("transform response contained no choices")]
    EmptyResponse,
}

/// A size-limited text transform applied to one chunk at a time.
///
/// Implementations must be stateless across calls: no chunk may depend on
/// another chunk's transformed output.
#[async_trait]
pub trait TextTransform: Send + Sync {
    async fn transform(&self, text: &str) -> Result<String, TransformError>;
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Chat-completion transform with a fixed instruction persona.
pub struct ChatTransform {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    instruction: String,
}

impl ChatTransform {
    pub fn new(config: &TransformConfig, instruction: impl Into<String>) -> Self {
        let instruction = instruction.into();
        info!(
            "Initialized chat transform ({}, instruction {} chars)",
            config.model,
            instruction.len()
        );
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
            api_key: config.resolved_api_key(),
            model: config.model.clone(),
            temperature: config.temperature,
            instruction,
        }
    }

    pub fn proofreader(config: &TransformConfig, prompts: &PromptsConfig) -> Self {
        Self::new(config, prompts.proofread_instruction.clone())
    }

    pub fn question_writer(config: &TransformConfig, prompts: &PromptsConfig) -> Self {
        Self::new(config, prompts.questions_instruction.clone())
    }
}

#[async_trait]
impl TextTransform for ChatTransform {
    async fn transform(&self, text: &str) -> Result<String, TransformError> {
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: self.instruction.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: text.to_string(),
                },
            ],
            temperature: self.temperature,
        };

        debug!("Sending {} chars to transform endpoint", text.len());

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        let response_text = response.text().await?;

        if !status.is_success() {
            return Err(TransformError::Remote {
                status,
                body: response_text,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&response_text)?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(TransformError::EmptyResponse)?
            .message
            .content;

        debug!("Transform returned {} chars", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_response_parsing() {
        let json = r#"{
            "choices": [
                {"message": {"role": "assistant", "content": "Proofread text."}}
            ]
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Proofread text.");
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "gpt-4o".to_string(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: PROOFREAD_INSTRUCTION.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: "some chunk".to_string(),
                },
            ],
            temperature: 0.0,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["model"], "gpt-4o");
        assert_eq!(value["messages"][0]["role"], "system");
        assert_eq!(value["messages"][1]["content"], "some chunk");
    }
}
