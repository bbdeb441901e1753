//! OpenAI Responses API client (`POST /v1/responses`).
//!
//! Wire types are kept close to the API's JSON. Unknown output item kinds are
//! tolerated so that new hosted tools do not break parsing.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{AgentError, ModelBackend};
use crate::config::Config;

// ── Request types ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct ResponseRequest {
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    pub input: Vec<InputItem>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<TextConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_response_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl ResponseRequest {
    /// Plain single-message request with no tools
    pub fn user_message(model: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            instructions: None,
            input: vec![InputItem::user(content)],
            tools: Vec::new(),
            text: None,
            previous_response_id: None,
            max_output_tokens: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputItem {
    Message { role: String, content: String },
    FunctionCallOutput { call_id: String, output: String },
}

impl InputItem {
    pub fn user(content: impl Into<String>) -> Self {
        InputItem::Message {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    Function {
        name: String,
        description: String,
        parameters: serde_json::Value,
        strict: bool,
    },
    WebSearchPreview,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextConfig {
    pub format: TextFormat,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TextFormat {
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        strict: bool,
    },
}

// ── Response types ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ModelResponse {
    pub id: String,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl ModelResponse {
    /// Concatenated text of every assistant message in the response
    pub fn output_text(&self) -> String {
        self.output
            .iter()
            .filter_map(|item| match item {
                OutputItem::Message { content, .. } => Some(content),
                _ => None,
            })
            .flatten()
            .filter_map(|part| match part {
                ContentPart::OutputText { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputItem {
    Message {
        #[serde(default)]
        content: Vec<ContentPart>,
    },
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    WebSearchCall {
        #[serde(default)]
        status: Option<String>,
    },
    Reasoning {},
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    OutputText { text: String },
    Refusal { refusal: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

// ── Client ────────────────────────────────────────────────────────────────────

/// HTTP client for the hosted Responses API.
///
/// Cheap to clone since `reqwest::Client` is reference counted.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = config.openai_api_key()?;
        Ok(Self::new(
            config.openai.base_url.clone(),
            api_key,
            Duration::from_secs(config.openai.timeout_seconds),
        )?)
    }
}

#[async_trait]
impl ModelBackend for OpenAiClient {
    async fn create_response(&self, request: &ResponseRequest) -> Result<ModelResponse, AgentError> {
        let url = format!("{}/responses", self.base_url);

        tracing::debug!(
            model = %request.model,
            input_items = request.input.len(),
            tools = request.tools.len(),
            previous_response_id = ?request.previous_response_id,
            "sending Responses API request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(%url, error = %e, "Responses API request failed");
                AgentError::Http(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            tracing::error!(status = status.as_u16(), %message, "Responses API returned an error");
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ModelResponse = response
            .json()
            .await
            .map_err(|e| AgentError::InvalidResponse(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            tracing::debug!(
                response_id = %parsed.id,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "received Responses API response"
            );
        }

        Ok(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(format!("{}/v1/", server.uri()), "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_request_serialization_skips_empty_fields() {
        let request = ResponseRequest::user_message("gpt-4o", "hi");
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "gpt-4o",
                "input": [ { "type": "message", "role": "user", "content": "hi" } ]
            })
        );
    }

    #[test]
    fn test_function_output_serialization() {
        let item = InputItem::FunctionCallOutput {
            call_id: "call_1".to_string(),
            output: "done".to_string(),
        };
        assert_eq!(
            serde_json::to_value(item).unwrap(),
            json!({ "type": "function_call_output", "call_id": "call_1", "output": "done" })
        );
    }

    #[test]
    fn test_response_parsing_tolerates_unknown_items() {
        let response: ModelResponse = serde_json::from_value(json!({
            "id": "resp_1",
            "output": [
                { "type": "reasoning", "id": "rs_1", "summary": [] },
                { "type": "web_search_call", "id": "ws_1", "status": "completed" },
                { "type": "image_generation_call", "id": "ig_1" },
                { "type": "message", "id": "msg_1", "role": "assistant", "content": [
                    { "type": "output_text", "text": "Hello ", "annotations": [] },
                    { "type": "output_text", "text": "world", "annotations": [] }
                ] }
            ]
        }))
        .unwrap();

        assert_eq!(response.output.len(), 4);
        assert_eq!(response.output[2], OutputItem::Unknown);
        assert_eq!(response.output_text(), "Hello world");
    }

    #[tokio::test]
    async fn test_create_response_sends_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/responses"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-4o", "max_output_tokens": 100 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "resp_1",
                "output": [ { "type": "message", "content": [ { "type": "output_text", "text": "A post" } ] } ],
                "usage": { "input_tokens": 10, "output_tokens": 3 }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = ResponseRequest::user_message("gpt-4o", "write");
        request.max_output_tokens = Some(100);
        let response = client_for(&server).create_response(&request).await.unwrap();

        assert_eq!(response.id, "resp_1");
        assert_eq!(response.output_text(), "A post");
    }

    #[tokio::test]
    async fn test_create_response_maps_error_envelope() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/responses"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "Incorrect API key provided", "type": "invalid_request_error" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .create_response(&ResponseRequest::user_message("gpt-4o", "x"))
            .await
            .unwrap_err();

        match err {
            AgentError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
