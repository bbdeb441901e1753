//! Social Post Writer - turn YouTube video transcripts into social media posts
//!
//! This library fetches the transcript of a YouTube video and hands it to a hosted
//! OpenAI agent that drafts posts for the selected platforms. The same flow is
//! exposed through the `postwriter` command line and a small web form.

pub mod agent;
pub mod cli;
pub mod config;
pub mod output;
pub mod transcript;
pub mod utils;
pub mod web;
pub mod writer;

pub use agent::{Agent, AgentError, ModelBackend, OpenAiClient, Post, RunResult, Runner};
pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use transcript::{get_transcript, TranscriptError, TranscriptSource, YoutubeTranscriptClient};
pub use writer::{ContentGenerator, GenerateRequest, Platform, PlatformResult, PostWriter};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types surfaced by the post writer front ends
#[derive(thiserror::Error, Debug)]
pub enum WriterError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Agent(#[from] AgentError),
}
