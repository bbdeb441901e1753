use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::writer::{Platform, DEFAULT_QUERY};

#[derive(Parser)]
#[command(
    name = "postwriter",
    about = "Social Post Writer - Draft social media posts from YouTube video transcripts",
    version,
    long_about = "Fetches the transcript of a YouTube video and asks a hosted OpenAI agent to write posts for the platforms you pick. Available as a command line tool and as a small web form."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate one post per selected platform
    Generate {
        /// YouTube video ID or URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Platforms to write for (repeatable)
        #[arg(short, long = "platform", value_enum, default_values_t = Platform::DEFAULT_SELECTION.to_vec())]
        platforms: Vec<Platform>,

        /// Describe what you want
        #[arg(long, default_value = DEFAULT_QUERY)]
        query: String,

        /// Transcript language codes in priority order (repeatable)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format (defaults to app.default_output_format from the config)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },

    /// Write a LinkedIn post and an Instagram caption in a single agent run
    Draft {
        /// YouTube video ID or URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Transcript language codes in priority order (repeatable)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,
    },

    /// Fetch and print a video transcript
    Transcript {
        /// YouTube video ID or URL
        #[arg(value_name = "VIDEO")]
        video: String,

        /// Transcript language codes in priority order (repeatable)
        #[arg(short, long = "language", value_name = "LANG")]
        languages: Vec<String>,
    },

    /// Serve the web form
    Serve {
        /// Address to bind (defaults to web.bind_addr from the config)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}

#[derive(ValueEnum, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// Markdown, same layout as the web form
    Markdown,
    /// JSON array of platform results
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Markdown => write!(f, "markdown"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_generate_defaults() {
        let cli = Cli::parse_from(["postwriter", "generate", "OZ5OZZZ2cvk"]);
        match cli.command {
            Commands::Generate {
                video,
                platforms,
                query,
                languages,
                output,
                format,
            } => {
                assert_eq!(video, "OZ5OZZZ2cvk");
                assert_eq!(platforms, vec![Platform::LinkedIn, Platform::Instagram]);
                assert_eq!(query, DEFAULT_QUERY);
                assert!(languages.is_empty());
                assert!(output.is_none());
                assert!(format.is_none());
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_generate_with_platforms_and_languages() {
        let cli = Cli::parse_from([
            "postwriter", "-v", "generate", "OZ5OZZZ2cvk", "-p", "tiktok", "-p", "youtube-shorts", "-l", "iw",
            "-l", "en", "-f", "json",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                platforms,
                languages,
                format,
                ..
            } => {
                assert_eq!(platforms, vec![Platform::TikTok, Platform::YouTubeShorts]);
                assert_eq!(languages, vec!["iw".to_string(), "en".to_string()]);
                assert_eq!(format, Some(OutputFormat::Json));
            }
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_unknown_platform_is_rejected() {
        assert!(Cli::try_parse_from(["postwriter", "generate", "OZ5OZZZ2cvk", "-p", "myspace"]).is_err());
    }
}
