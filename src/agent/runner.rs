use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use super::openai::{ContentPart, InputItem, OutputItem, ResponseRequest};
use super::{Agent, AgentError, ModelBackend, Post};

/// Maximum model round trips per run unless configured otherwise
pub const DEFAULT_MAX_TURNS: usize = 10;

/// Something that happened during an agent run, in order
#[derive(Debug, Clone, PartialEq)]
pub enum RunItem {
    MessageOutput { text: String },
    ToolCall { call_id: String, name: String, arguments: String },
    ToolCallOutput { call_id: String, output: String },
    WebSearchCall { status: Option<String> },
    Reasoning,
}

/// Outcome of a completed agent run
#[derive(Debug, Clone)]
pub struct RunResult {
    /// Identifier of the tracing span the run executed in
    pub trace_id: String,

    /// Items produced during the run
    pub new_items: Vec<RunItem>,

    /// Structured posts, when the final message matched the output schema
    pub final_output: Option<Vec<Post>>,

    pub last_response_id: String,
}

impl RunResult {
    pub fn text_outputs(&self) -> String {
        text_message_outputs(&self.new_items)
    }
}

/// Concatenate the text of all message outputs
pub fn text_message_outputs(items: &[RunItem]) -> String {
    items
        .iter()
        .filter_map(|item| match item {
            RunItem::MessageOutput { text } => Some(text.as_str()),
            _ => None,
        })
        .collect()
}

#[derive(Deserialize)]
struct StructuredOutput {
    response: Vec<Post>,
}

/// Drives an [`Agent`] on a hosted backend until it produces a final answer
pub struct Runner<'a> {
    backend: &'a dyn ModelBackend,
    max_turns: usize,
}

impl<'a> Runner<'a> {
    pub fn new(backend: &'a dyn ModelBackend) -> Self {
        Self {
            backend,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }

    pub fn max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns.max(1);
        self
    }

    /// Run `agent` on `input`, recording the run under a `trace` span named after `workflow`
    pub async fn run(
        &self,
        agent: &Agent,
        workflow: &str,
        input: Vec<InputItem>,
    ) -> Result<RunResult, AgentError> {
        let trace_id = format!("trace_{}", Uuid::new_v4().simple());
        let span = tracing::info_span!("trace", workflow, trace_id = %trace_id, agent = %agent.name);

        self.run_inner(agent, input, trace_id).instrument(span).await
    }

    async fn run_inner(
        &self,
        agent: &Agent,
        input: Vec<InputItem>,
        trace_id: String,
    ) -> Result<RunResult, AgentError> {
        let tools = agent.tools.iter().map(|tool| tool.definition()).collect::<Vec<_>>();
        let text = agent.output_type.as_ref().map(|schema| schema.text_config());

        let mut new_items = Vec::new();
        let mut pending_input = input;
        let mut previous_response_id: Option<String> = None;

        for turn in 1..=self.max_turns {
            let request = ResponseRequest {
                model: agent.model.clone(),
                instructions: Some(agent.instructions.clone()),
                input: std::mem::take(&mut pending_input),
                tools: tools.clone(),
                text: text.clone(),
                previous_response_id: previous_response_id.clone(),
                max_output_tokens: None,
            };

            tracing::debug!(turn, "requesting model turn");
            let response = self.backend.create_response(&request).await?;

            let mut calls = Vec::new();
            let mut final_text = String::new();
            for item in &response.output {
                match item {
                    OutputItem::Message { content } => {
                        let message = message_text(content);
                        final_text.push_str(&message);
                        new_items.push(RunItem::MessageOutput { text: message });
                    }
                    OutputItem::FunctionCall {
                        call_id,
                        name,
                        arguments,
                    } => {
                        new_items.push(RunItem::ToolCall {
                            call_id: call_id.clone(),
                            name: name.clone(),
                            arguments: arguments.clone(),
                        });
                        calls.push((call_id.clone(), name.clone(), arguments.clone()));
                    }
                    OutputItem::WebSearchCall { status } => {
                        tracing::debug!(?status, "hosted web search");
                        new_items.push(RunItem::WebSearchCall {
                            status: status.clone(),
                        });
                    }
                    OutputItem::Reasoning {} => new_items.push(RunItem::Reasoning),
                    OutputItem::Unknown => {}
                }
            }

            if calls.is_empty() {
                let final_output = agent
                    .output_type
                    .as_ref()
                    .and_then(|_| parse_structured_output(&final_text));
                tracing::info!(
                    turns = turn,
                    posts = final_output.as_ref().map(Vec::len).unwrap_or(0),
                    "agent run finished"
                );
                return Ok(RunResult {
                    trace_id,
                    new_items,
                    final_output,
                    last_response_id: response.id,
                });
            }

            for (call_id, name, arguments) in calls {
                let tool = agent
                    .find_function(&name)
                    .ok_or_else(|| AgentError::UnknownTool(name.clone()))?;

                tracing::debug!(tool = %name, %call_id, "running function tool");
                let output = match tool.invoke(self.backend, &arguments).await {
                    Ok(output) => output,
                    Err(e) => {
                        // The model gets a chance to recover, as with hosted runtimes
                        tracing::warn!(tool = %name, error = %e, "function tool failed");
                        format!("An error occurred while running the tool. Please try again. Error: {e}")
                    }
                };

                new_items.push(RunItem::ToolCallOutput {
                    call_id: call_id.clone(),
                    output: output.clone(),
                });
                pending_input.push(InputItem::FunctionCallOutput { call_id, output });
            }

            previous_response_id = Some(response.id);
        }

        Err(AgentError::MaxTurnsExceeded(self.max_turns))
    }
}

fn message_text(content: &[ContentPart]) -> String {
    content
        .iter()
        .filter_map(|part| match part {
            ContentPart::OutputText { text } => Some(text.as_str()),
            ContentPart::Refusal { refusal } => Some(refusal.as_str()),
            ContentPart::Other => None,
        })
        .collect()
}

fn parse_structured_output(text: &str) -> Option<Vec<Post>> {
    match serde_json::from_str::<StructuredOutput>(text.trim()) {
        Ok(output) => Some(output.response),
        Err(e) => {
            tracing::warn!(error = %e, "final output did not match the post list schema");
            None
        }
    }
}
