//! Glue between transcripts and the content writer agent: prompt assembly,
//! per-platform runs and selection of the fields shown to users.

use async_trait::async_trait;
use futures_util::stream::{self, StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

mod platform;

pub use platform::Platform;

use crate::agent::{content_writer_agent, Agent, InputItem, ModelBackend, RunResult, Runner};
use crate::config::Config;
use crate::transcript::{fetch_transcript_text, TranscriptSource};
use crate::utils::truncate_chars;
use crate::WriterError;

/// Query used when the user leaves the description empty
pub const DEFAULT_QUERY: &str = "Generate a post for each selected platform.";

/// Shown when the agent produced nothing usable
pub const NO_CONTENT: &str = "No content generated";

/// Prompt for the one-shot flow: a LinkedIn post and an Instagram caption in a single run
pub fn cli_prompt(transcript: &str) -> String {
    format!(
        "Generate a LinkedIn post and an Instagram caption based on this video transcript: {transcript}"
    )
}

/// Prompt for one platform of a multi-platform request
pub fn platform_prompt(query: &str, platform: Platform, transcript: &str) -> String {
    format!("{query}\nPlatform: {platform}\nVideo transcript: {transcript}")
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    /// Video id or URL
    pub video: String,

    #[serde(default = "default_platforms")]
    pub platforms: Vec<Platform>,

    #[serde(default)]
    pub query: Option<String>,

    /// Transcript languages in priority order; empty uses the configured ones
    #[serde(default)]
    pub languages: Vec<String>,
}

fn default_platforms() -> Vec<Platform> {
    Platform::DEFAULT_SELECTION.to_vec()
}

impl GenerateRequest {
    pub fn new(video: impl Into<String>, platforms: Vec<Platform>) -> Self {
        Self {
            video: video.into(),
            platforms,
            query: None,
            languages: Vec::new(),
        }
    }

    pub fn effective_query(&self) -> &str {
        self.query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .unwrap_or(DEFAULT_QUERY)
    }
}

/// Content generated for one platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformResult {
    pub platform: String,
    pub content: String,
}

/// Front-end facing generation interface
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// One agent run per selected platform, results in selection order
    async fn generate(&self, request: GenerateRequest) -> Result<Vec<PlatformResult>, WriterError>;
}

/// Fetches transcripts and drives the content writer agent
pub struct PostWriter {
    transcripts: Arc<dyn TranscriptSource>,
    backend: Arc<dyn ModelBackend>,
    agent: Agent,
    languages: Vec<String>,
    max_turns: usize,
    max_concurrent: usize,
}

impl PostWriter {
    pub fn new(
        config: &Config,
        transcripts: Arc<dyn TranscriptSource>,
        backend: Arc<dyn ModelBackend>,
    ) -> Self {
        Self {
            transcripts,
            backend,
            agent: content_writer_agent(config),
            languages: config.transcript.languages.clone(),
            max_turns: config.openai.max_turns,
            max_concurrent: config.app.max_concurrent_requests.max(1),
        }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    /// Resolve the video id and fetch its transcript text
    pub async fn transcript(&self, video: &str, languages: &[String]) -> Result<String, WriterError> {
        let languages = if languages.is_empty() {
            &self.languages[..]
        } else {
            languages
        };
        let transcript = fetch_transcript_text(self.transcripts.as_ref(), video, languages).await?;
        tracing::debug!(
            video = %video,
            preview = %truncate_chars(&transcript, 120),
            "using transcript"
        );
        Ok(transcript)
    }

    /// The one-shot flow: LinkedIn post and Instagram caption in a single run
    pub async fn draft_posts(&self, video: &str, languages: &[String]) -> Result<String, WriterError> {
        let transcript = self.transcript(video, languages).await?;
        let run = self
            .run_agent("Writing content", cli_prompt(&transcript))
            .await?;
        Ok(run.text_outputs())
    }

    async fn run_agent(&self, workflow: &str, message: String) -> Result<RunResult, WriterError> {
        let runner = Runner::new(self.backend.as_ref()).max_turns(self.max_turns);
        Ok(runner
            .run(&self.agent, workflow, vec![InputItem::user(message)])
            .await?)
    }

    async fn generate_for_platform(
        &self,
        query: &str,
        platform: Platform,
        transcript: &str,
    ) -> Result<PlatformResult, WriterError> {
        let workflow = format!("Writing content for {platform}");
        let run = self
            .run_agent(&workflow, platform_prompt(query, platform, transcript))
            .await?;
        Ok(select_result(platform, &run))
    }
}

#[async_trait]
impl ContentGenerator for PostWriter {
    async fn generate(&self, request: GenerateRequest) -> Result<Vec<PlatformResult>, WriterError> {
        if request.video.trim().is_empty() {
            return Err(WriterError::InvalidRequest("a YouTube video ID is required".to_string()));
        }
        if request.platforms.is_empty() {
            return Err(WriterError::InvalidRequest(
                "select at least one platform".to_string(),
            ));
        }

        let transcript = self.transcript(&request.video, &request.languages).await?;
        let query = request.effective_query();

        tracing::info!(
            platforms = request.platforms.len(),
            transcript_chars = transcript.len(),
            "generating content"
        );

        stream::iter(request.platforms.iter().copied())
            .map(|platform| self.generate_for_platform(query, platform, &transcript))
            .buffered(self.max_concurrent)
            .try_collect()
            .await
    }
}

/// Pick the platform heading and content to display for one run.
///
/// The heading is always the selected platform; content comes from the first
/// structured post, then from the raw message text.
pub fn select_result(platform: Platform, run: &RunResult) -> PlatformResult {
    let content = run
        .final_output
        .as_ref()
        .and_then(|posts| posts.first())
        .map(|post| post.content.clone())
        .or_else(|| {
            let text = run.text_outputs();
            (!text.trim().is_empty()).then_some(text)
        })
        .unwrap_or_else(|| NO_CONTENT.to_string());

    PlatformResult {
        platform: platform.label().to_string(),
        content,
    }
}
