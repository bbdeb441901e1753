//! Declarative configuration of the hosted content writer agent and the client
//! plumbing that invokes it.
//!
//! The model, hosted web search and structured output all live on the OpenAI
//! Responses API. This module only describes the agent, forwards requests and
//! executes the one local function tool when the model asks for it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub mod openai;
pub mod runner;
pub mod tools;

pub use openai::{
    InputItem, ModelResponse, OpenAiClient, OutputItem, ResponseRequest, TextConfig, TextFormat,
    ToolDefinition,
};
pub use runner::{text_message_outputs, RunItem, RunResult, Runner};
pub use tools::{FunctionTool, GenerateContentTool};

use crate::config::Config;

/// A drafted post as returned in the agent's structured output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub platform: String,
    pub content: String,
}

/// Errors raised while talking to the hosted agent
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error("OpenAI API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("OpenAI request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected response from OpenAI: {0}")]
    InvalidResponse(String),

    #[error("Model called unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool {name} failed: {message}")]
    ToolFailed { name: String, message: String },

    #[error("Agent run exceeded {0} turns")]
    MaxTurnsExceeded(usize),
}

/// Hosted model runtime the agent runs on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelBackend: Send + Sync {
    async fn create_response(&self, request: &ResponseRequest) -> Result<ModelResponse, AgentError>;
}

/// Tools the agent may call
#[derive(Clone)]
pub enum Tool {
    /// Web search executed by the hosted runtime
    WebSearch,
    /// Function executed locally when the model calls it
    Function(Arc<dyn FunctionTool>),
}

impl Tool {
    pub fn name(&self) -> &str {
        match self {
            Tool::WebSearch => "web_search",
            Tool::Function(tool) => tool.name(),
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            Tool::WebSearch => ToolDefinition::WebSearchPreview,
            Tool::Function(tool) => ToolDefinition::Function {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
                strict: true,
            },
        }
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tool({})", self.name())
    }
}

/// JSON schema the final answer must follow
#[derive(Debug, Clone, PartialEq)]
pub struct OutputSchema {
    pub name: String,
    pub schema: serde_json::Value,
}

impl OutputSchema {
    /// A list of [`Post`]s, wrapped in a `response` field since the API wants an object at the top
    pub fn post_list() -> Self {
        Self {
            name: "final_output".to_string(),
            schema: json!({
                "type": "object",
                "properties": {
                    "response": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "platform": { "type": "string" },
                                "content": { "type": "string" }
                            },
                            "required": ["platform", "content"],
                            "additionalProperties": false
                        }
                    }
                },
                "required": ["response"],
                "additionalProperties": false
            }),
        }
    }

    pub fn text_config(&self) -> TextConfig {
        TextConfig {
            format: TextFormat::JsonSchema {
                name: self.name.clone(),
                schema: self.schema.clone(),
                strict: true,
            },
        }
    }
}

/// Everything the hosted runtime needs to know about an agent
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub instructions: String,
    pub model: String,
    pub tools: Vec<Tool>,
    pub output_type: Option<OutputSchema>,
}

impl Agent {
    pub fn find_function(&self, name: &str) -> Option<&Arc<dyn FunctionTool>> {
        self.tools.iter().find_map(|tool| match tool {
            Tool::Function(function) if function.name() == name => Some(function),
            _ => None,
        })
    }
}

pub const CONTENT_WRITER_INSTRUCTIONS: &str = "You are a talented content writer who writes engaging, humorous, informative and \
highly readable social media posts. \
You will be given a video transcript and social media platforms. \
You will generate a social media post based on the video transcript \
and the social media platforms. \
You may search the web for up-to-date information on the topic and \
fill in some useful details if needed.";

/// The content writer agent: a cheap model that can draft with a stronger one and search the web
pub fn content_writer_agent(config: &Config) -> Agent {
    let mut tools = vec![Tool::Function(Arc::new(GenerateContentTool::new(
        config.openai.content_model.clone(),
        config.openai.content_max_output_tokens,
    )))];
    if config.openai.web_search {
        tools.push(Tool::WebSearch);
    }

    Agent {
        name: "Content writer agent".to_string(),
        instructions: CONTENT_WRITER_INSTRUCTIONS.to_string(),
        model: config.openai.agent_model.clone(),
        tools,
        output_type: Some(OutputSchema::post_list()),
    }
}
