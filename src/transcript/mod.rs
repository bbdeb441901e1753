use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

pub mod parser;
pub mod youtube;

pub use youtube::YoutubeTranscriptClient;

/// Language used when the caller does not ask for any
pub const DEFAULT_LANGUAGE: &str = "en";

/// One timed piece of caption text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSnippet {
    /// Caption text with markup removed
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// A transcript retrieved for a single video and language
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedTranscript {
    pub video_id: String,

    /// Human readable track name, e.g. "English (auto-generated)"
    pub language: String,

    pub language_code: String,

    /// True for automatic speech recognition tracks
    pub is_generated: bool,

    pub snippets: Vec<TranscriptSnippet>,
}

impl FetchedTranscript {
    /// All snippet texts joined by a single space
    pub fn text(&self) -> String {
        self.snippets
            .iter()
            .map(|snippet| snippet.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// End of the last snippet in seconds
    pub fn duration(&self) -> f64 {
        self.snippets
            .last()
            .map(|snippet| snippet.start + snippet.duration)
            .unwrap_or(0.0)
    }
}

/// Reasons a transcript could not be retrieved
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("Transcripts are disabled for the video {video_id}")]
    TranscriptsDisabled { video_id: String },

    #[error(
        "No transcript found for the video {video_id} in languages {requested:?} (available: {available:?})"
    )]
    NoTranscriptFound {
        video_id: String,
        requested: Vec<String>,
        available: Vec<String>,
    },

    #[error("The video {video_id} is unavailable")]
    VideoUnavailable { video_id: String },

    #[error("The video {video_id} is unplayable: {reason}")]
    VideoUnplayable { video_id: String, reason: String },

    #[error("The video {video_id} is age restricted")]
    AgeRestricted { video_id: String },

    #[error("YouTube is blocking requests for the video {video_id}")]
    RequestBlocked { video_id: String },

    #[error("Could not parse YouTube data for the video {video_id}: {detail}")]
    DataUnparsable { video_id: String, detail: String },

    #[error("Invalid video id or URL: {0}")]
    InvalidVideoId(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Something that can produce transcripts for YouTube videos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptSource: Send + Sync {
    /// Fetch the first available transcript matching `languages`, in priority order
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, TranscriptError>;
}

/// Fetch a video transcript and return its text as a single string.
///
/// Known failure kinds are logged with the video id and handed back unchanged.
pub async fn get_transcript(
    source: &dyn TranscriptSource,
    video_id: &str,
    languages: &[String],
) -> Result<String, TranscriptError> {
    let languages = if languages.is_empty() {
        vec![DEFAULT_LANGUAGE.to_string()]
    } else {
        languages.to_vec()
    };

    match source.fetch(video_id, &languages).await {
        Ok(transcript) => {
            tracing::debug!(
                video_id,
                language = %transcript.language,
                language_code = %transcript.language_code,
                generated = transcript.is_generated,
                snippets = transcript.snippets.len(),
                duration = %crate::utils::format_duration(transcript.duration()),
                "transcript fetched"
            );
            Ok(transcript.text())
        }
        Err(e) => {
            match &e {
                TranscriptError::TranscriptsDisabled { .. } => {
                    tracing::error!("Transcripts are disabled for the video with ID {}.", video_id);
                }
                TranscriptError::NoTranscriptFound { .. } => {
                    tracing::error!("No transcript found for the video with ID {}.", video_id);
                }
                TranscriptError::VideoUnavailable { .. } => {
                    tracing::error!("The video with ID {} is unavailable.", video_id);
                }
                other => {
                    tracing::error!(
                        "An unexpected error occurred while fetching the transcript for video ID {}: {}",
                        video_id,
                        other
                    );
                }
            }
            Err(e)
        }
    }
}

/// Resolve a video id or URL, then fetch through [`get_transcript`]
pub async fn fetch_transcript_text(
    source: &dyn TranscriptSource,
    video: &str,
    languages: &[String],
) -> Result<String, TranscriptError> {
    let video_id = extract_video_id(video)?;
    get_transcript(source, &video_id, languages).await
}

/// Accept either a bare video id or any common YouTube URL form
pub fn extract_video_id(input: &str) -> Result<String, TranscriptError> {
    let input = input.trim();

    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let invalid = || TranscriptError::InvalidVideoId(input.to_string());
    let url = Url::parse(input).map_err(|_| invalid())?;
    let host = url.host_str().ok_or_else(invalid)?.trim_start_matches("www.");

    let candidate = match host {
        "youtu.be" => url.path_segments().and_then(|mut s| s.next()).map(str::to_string),
        "youtube.com" | "m.youtube.com" | "music.youtube.com" => {
            let mut segments = url.path_segments().into_iter().flatten();
            match segments.next() {
                Some("watch") => url
                    .query_pairs()
                    .find(|(key, _)| key == "v")
                    .map(|(_, value)| value.into_owned()),
                Some("embed") | Some("shorts") | Some("v") | Some("live") => {
                    segments.next().map(str::to_string)
                }
                _ => None,
            }
        }
        _ => None,
    };

    candidate.filter(|id| is_video_id(id)).ok_or_else(invalid)
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcript(texts: &[&str]) -> FetchedTranscript {
        FetchedTranscript {
            video_id: "OZ5OZZZ2cvk".to_string(),
            language: "English".to_string(),
            language_code: "en".to_string(),
            is_generated: false,
            snippets: texts
                .iter()
                .enumerate()
                .map(|(i, text)| TranscriptSnippet {
                    text: text.to_string(),
                    start: i as f64 * 2.0,
                    duration: 2.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_text_joins_snippets_with_spaces() {
        let t = transcript(&["hello there", "general", "kenobi"]);
        assert_eq!(t.text(), "hello there general kenobi");
        assert_eq!(t.duration(), 6.0);
    }

    #[test]
    fn test_empty_transcript() {
        let t = transcript(&[]);
        assert_eq!(t.text(), "");
        assert_eq!(t.duration(), 0.0);
    }

    #[tokio::test]
    async fn test_get_transcript_defaults_to_english() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch()
            .withf(|id, langs| id == "OZ5OZZZ2cvk" && langs == ["en".to_string()])
            .returning(|_, _| Ok(transcript(&["a", "b"])));

        let text = get_transcript(&source, "OZ5OZZZ2cvk", &[]).await.unwrap();
        assert_eq!(text, "a b");
    }

    #[tokio::test]
    async fn test_get_transcript_passes_languages_in_order() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch()
            .withf(|_, langs| langs == ["iw".to_string(), "en".to_string()])
            .returning(|_, _| Ok(transcript(&["shalom"])));

        let langs = vec!["iw".to_string(), "en".to_string()];
        let text = get_transcript(&source, "8RvAKRoIDqU", &langs).await.unwrap();
        assert_eq!(text, "shalom");
    }

    #[tokio::test]
    async fn test_get_transcript_returns_same_error_kind() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch().returning(|id, _| {
            Err(TranscriptError::TranscriptsDisabled {
                video_id: id.to_string(),
            })
        });

        let err = get_transcript(&source, "OZ5OZZZ2cvk", &[]).await.unwrap_err();
        assert!(matches!(err, TranscriptError::TranscriptsDisabled { .. }));
    }

    #[tokio::test]
    async fn test_get_transcript_passes_through_unexpected_errors() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch().returning(|id, _| {
            Err(TranscriptError::RequestBlocked {
                video_id: id.to_string(),
            })
        });

        let err = get_transcript(&source, "OZ5OZZZ2cvk", &[]).await.unwrap_err();
        assert!(matches!(err, TranscriptError::RequestBlocked { .. }));
    }

    #[tokio::test]
    async fn test_fetch_transcript_text_resolves_urls() {
        let mut source = MockTranscriptSource::new();
        source
            .expect_fetch()
            .withf(|id, langs| id == "8RvAKRoIDqU" && langs == ["iw".to_string(), "en".to_string()])
            .times(1)
            .returning(|_, _| Ok(transcript(&["shalom", "olam"])));

        let langs = vec!["iw".to_string(), "en".to_string()];
        let text = fetch_transcript_text(&source, "https://youtu.be/8RvAKRoIDqU", &langs)
            .await
            .unwrap();
        assert_eq!(text, "shalom olam");
    }

    #[tokio::test]
    async fn test_fetch_transcript_text_keeps_error_kind() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch().returning(|id, _| {
            Err(TranscriptError::VideoUnavailable {
                video_id: id.to_string(),
            })
        });

        let err = fetch_transcript_text(&source, "OZ5OZZZ2cvk", &[]).await.unwrap_err();
        assert!(matches!(err, TranscriptError::VideoUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_fetch_transcript_text_rejects_bad_input_before_fetching() {
        let mut source = MockTranscriptSource::new();
        source.expect_fetch().never();

        let err = fetch_transcript_text(&source, "https://vimeo.com/1", &[]).await.unwrap_err();
        assert!(matches!(err, TranscriptError::InvalidVideoId(_)));
    }

    #[test]
    fn test_extract_video_id() {
        let cases = [
            ("OZ5OZZZ2cvk", "OZ5OZZZ2cvk"),
            ("https://www.youtube.com/watch?v=OZ5OZZZ2cvk", "OZ5OZZZ2cvk"),
            ("https://www.youtube.com/watch?feature=share&v=OZ5OZZZ2cvk", "OZ5OZZZ2cvk"),
            ("https://youtu.be/8RvAKRoIDqU?t=12", "8RvAKRoIDqU"),
            ("https://m.youtube.com/watch?v=8RvAKRoIDqU", "8RvAKRoIDqU"),
            ("https://www.youtube.com/embed/8RvAKRoIDqU", "8RvAKRoIDqU"),
            ("https://youtube.com/shorts/8RvAKRoIDqU", "8RvAKRoIDqU"),
            ("https://www.youtube.com/v/8RvAKRoIDqU?version=3", "8RvAKRoIDqU"),
            ("https://www.youtube.com/live/8RvAKRoIDqU", "8RvAKRoIDqU"),
            ("  OZ5OZZZ2cvk  ", "OZ5OZZZ2cvk"),
        ];
        for (input, expected) in cases {
            assert_eq!(extract_video_id(input).unwrap(), expected, "input: {input}");
        }
    }

    #[test]
    fn test_extract_video_id_rejects_garbage() {
        assert!(extract_video_id("").is_err());
        assert!(extract_video_id("short").is_err());
        assert!(extract_video_id("https://vimeo.com/12345678901").is_err());
        assert!(extract_video_id("https://www.youtube.com/watch?v=bad").is_err());
        assert!(extract_video_id("https://www.youtube.com/channel/UC123").is_err());
    }
}
