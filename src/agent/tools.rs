use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::{AgentError, ModelBackend, ResponseRequest};

/// A function the model can call; executed locally by the runner
#[async_trait]
pub trait FunctionTool: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON schema of the arguments object
    fn parameters(&self) -> serde_json::Value;

    /// Run the tool with the raw JSON arguments produced by the model
    async fn invoke(&self, backend: &dyn ModelBackend, arguments: &str) -> Result<String, AgentError>;
}

/// Drafts a post for one platform with a dedicated completion call
pub struct GenerateContentTool {
    model: String,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentArgs {
    video_transcript: String,
    social_media_platform: String,
}

impl GenerateContentTool {
    pub fn new(model: impl Into<String>, max_output_tokens: u32) -> Self {
        Self {
            model: model.into(),
            max_output_tokens,
        }
    }

    pub fn prompt(video_transcript: &str, social_media_platform: &str) -> String {
        format!(
            "Here is a new video transcript:\n{video_transcript}\n\n\
             Generate a social media post on my {social_media_platform} based on my provided video transcript.\n"
        )
    }
}

#[async_trait]
impl FunctionTool for GenerateContentTool {
    fn name(&self) -> &str {
        "generate_content"
    }

    fn description(&self) -> &str {
        "Generate social media content from a video transcript for the given platform."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "video_transcript": { "type": "string" },
                "social_media_platform": { "type": "string" }
            },
            "required": ["video_transcript", "social_media_platform"],
            "additionalProperties": false
        })
    }

    async fn invoke(&self, backend: &dyn ModelBackend, arguments: &str) -> Result<String, AgentError> {
        let args: GenerateContentArgs =
            serde_json::from_str(arguments).map_err(|e| AgentError::ToolFailed {
                name: self.name().to_string(),
                message: format!("invalid arguments: {e}"),
            })?;

        tracing::info!("Generating social media content for {}...", args.social_media_platform);

        let mut request = ResponseRequest::user_message(
            self.model.clone(),
            Self::prompt(&args.video_transcript, &args.social_media_platform),
        );
        request.max_output_tokens = Some(self.max_output_tokens);

        let response = backend.create_response(&request).await?;
        Ok(response.output_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{InputItem, MockModelBackend, ModelResponse};

    fn text_response(text: &str) -> ModelResponse {
        serde_json::from_value(json!({
            "id": "resp_tool",
            "output": [ { "type": "message", "content": [ { "type": "output_text", "text": text } ] } ]
        }))
        .unwrap()
    }

    #[test]
    fn test_prompt_layout() {
        assert_eq!(
            GenerateContentTool::prompt("the words", "LinkedIn"),
            "Here is a new video transcript:\nthe words\n\nGenerate a social media post on my LinkedIn based on my provided video transcript.\n"
        );
    }

    #[tokio::test]
    async fn test_invoke_calls_content_model_with_token_cap() {
        let mut backend = MockModelBackend::new();
        backend
            .expect_create_response()
            .withf(|request| {
                request.model == "gpt-4o"
                    && request.max_output_tokens == Some(100)
                    && request.tools.is_empty()
                    && request.input
                        == vec![InputItem::user(GenerateContentTool::prompt("talk", "Threads"))]
            })
            .times(1)
            .returning(|_| Ok(text_response("Threads post")));

        let tool = GenerateContentTool::new("gpt-4o", 100);
        let output = tool
            .invoke(&backend, r#"{"video_transcript":"talk","social_media_platform":"Threads"}"#)
            .await
            .unwrap();
        assert_eq!(output, "Threads post");
    }

    #[tokio::test]
    async fn test_invoke_rejects_bad_arguments() {
        let backend = MockModelBackend::new();
        let tool = GenerateContentTool::new("gpt-4o", 100);

        let err = tool.invoke(&backend, r#"{"video_transcript":"x"}"#).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolFailed { .. }));
    }
}
