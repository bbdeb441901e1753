use async_trait::async_trait;
use regex::Regex;
use reqwest::header::{ACCEPT_LANGUAGE, COOKIE};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Duration;

use super::parser::parse_timedtext;
use super::{FetchedTranscript, TranscriptError, TranscriptSource};
use crate::config::ProxyConfig;

const YOUTUBE_BASE_URL: &str = "https://www.youtube.com";
const CONSENT_FORM_MARKER: &str = "action=\"https://consent.youtube.com/s\"";
const RECAPTCHA_MARKER: &str = "class=\"g-recaptcha\"";
const INNERTUBE_CLIENT_NAME: &str = "ANDROID";
const INNERTUBE_CLIENT_VERSION: &str = "20.10.38";
const BOT_CHECK_REASON: &str = "Sign in to confirm you're not a bot";

fn consent_value_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"name="v" value="(.*?)""#).expect("valid regex"))
}

fn api_key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#""INNERTUBE_API_KEY":\s*"([a-zA-Z0-9_-]+)""#).expect("valid regex"))
}

/// Transcript source backed by the public YouTube watch page and the innertube player API
pub struct YoutubeTranscriptClient {
    client: Client,
    base_url: String,
    retries_when_blocked: u32,
}

/// Caption track advertised by the player response
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionTrack {
    base_url: String,
    language_code: String,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    name: Option<TrackName>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TrackName {
    #[serde(default)]
    simple_text: Option<String>,
    #[serde(default)]
    runs: Vec<TextRun>,
}

#[derive(Debug, Clone, Deserialize)]
struct TextRun {
    text: String,
}

impl CaptionTrack {
    fn is_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn display_name(&self) -> String {
        self.name
            .as_ref()
            .and_then(|name| {
                name.simple_text
                    .clone()
                    .or_else(|| name.runs.first().map(|run| run.text.clone()))
            })
            .unwrap_or_else(|| self.language_code.clone())
    }

    fn transcript_url(&self) -> String {
        self.base_url.replace("&fmt=srv3", "")
    }
}

impl YoutubeTranscriptClient {
    pub fn new() -> Result<Self, TranscriptError> {
        Self::builder().build()
    }

    pub fn builder() -> YoutubeTranscriptClientBuilder {
        YoutubeTranscriptClientBuilder::default()
    }

    async fn fetch_once(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, TranscriptError> {
        let html = self.fetch_video_html(video_id).await?;
        let api_key = extract_innertube_api_key(&html, video_id)?;
        let player = self.fetch_player_data(video_id, &api_key).await?;

        assert_playability(&player, video_id)?;
        let tracks = extract_caption_tracks(&player, video_id)?;
        let track = find_track(&tracks, languages, video_id)?;

        tracing::debug!(
            video_id,
            language = %track.language_code,
            generated = track.is_generated(),
            "fetching caption track"
        );

        let response = self.client.get(track.transcript_url()).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscriptError::RequestBlocked {
                video_id: video_id.to_string(),
            });
        }
        let xml = response.error_for_status()?.text().await?;

        Ok(FetchedTranscript {
            video_id: video_id.to_string(),
            language: track.display_name(),
            language_code: track.language_code.clone(),
            is_generated: track.is_generated(),
            snippets: parse_timedtext(&xml),
        })
    }

    /// Load the watch page, accepting the cookie consent interstitial once if shown
    async fn fetch_video_html(&self, video_id: &str) -> Result<String, TranscriptError> {
        let html = self.get_watch_page(video_id, None).await?;
        if !html.contains(CONSENT_FORM_MARKER) {
            return Ok(html);
        }

        tracing::debug!(video_id, "accepting YouTube consent form");
        let consent_value = consent_value_regex()
            .captures(&html)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| TranscriptError::DataUnparsable {
                video_id: video_id.to_string(),
                detail: "consent form without a consent value".to_string(),
            })?;

        let html = self
            .get_watch_page(video_id, Some(format!("CONSENT=YES+{consent_value}")))
            .await?;
        if html.contains(CONSENT_FORM_MARKER) {
            return Err(TranscriptError::DataUnparsable {
                video_id: video_id.to_string(),
                detail: "consent cookie was not accepted".to_string(),
            });
        }
        Ok(html)
    }

    async fn get_watch_page(
        &self,
        video_id: &str,
        cookie: Option<String>,
    ) -> Result<String, TranscriptError> {
        let url = format!("{}/watch?v={}", self.base_url, urlencoding::encode(video_id));
        let mut request = self.client.get(url).header(ACCEPT_LANGUAGE, "en-US");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscriptError::RequestBlocked {
                video_id: video_id.to_string(),
            });
        }
        Ok(response.error_for_status()?.text().await?)
    }

    async fn fetch_player_data(
        &self,
        video_id: &str,
        api_key: &str,
    ) -> Result<serde_json::Value, TranscriptError> {
        let url = format!("{}/youtubei/v1/player?key={}", self.base_url, api_key);
        let body = json!({
            "context": {
                "client": {
                    "clientName": INNERTUBE_CLIENT_NAME,
                    "clientVersion": INNERTUBE_CLIENT_VERSION,
                }
            },
            "videoId": video_id,
        });

        let response = self.client.post(url).json(&body).send().await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(TranscriptError::RequestBlocked {
                video_id: video_id.to_string(),
            });
        }
        Ok(response.error_for_status()?.json().await?)
    }
}

#[async_trait]
impl TranscriptSource for YoutubeTranscriptClient {
    async fn fetch(
        &self,
        video_id: &str,
        languages: &[String],
    ) -> Result<FetchedTranscript, TranscriptError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(video_id, languages).await {
                Err(TranscriptError::RequestBlocked { .. }) if attempt < self.retries_when_blocked => {
                    attempt += 1;
                    tracing::warn!(
                        video_id,
                        attempt,
                        max = self.retries_when_blocked,
                        "request blocked by YouTube, retrying through a fresh proxy connection"
                    );
                }
                result => return result,
            }
        }
    }
}

/// Builder for [`YoutubeTranscriptClient`]
#[derive(Default)]
pub struct YoutubeTranscriptClientBuilder {
    base_url: Option<String>,
    proxy: Option<ProxyConfig>,
    timeout: Option<Duration>,
    retries_when_blocked: Option<u32>,
}

impl YoutubeTranscriptClientBuilder {
    /// Override the YouTube origin (used by tests)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn proxy(mut self, proxy: Option<ProxyConfig>) -> Self {
        self.proxy = proxy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Retry the whole fetch this many times on `RequestBlocked`; defaults to the proxy's setting
    pub fn retries_when_blocked(mut self, retries: u32) -> Self {
        self.retries_when_blocked = Some(retries);
        self
    }

    pub fn build(self) -> Result<YoutubeTranscriptClient, TranscriptError> {
        let mut builder = Client::builder().timeout(self.timeout.unwrap_or(Duration::from_secs(30)));
        let mut retries_when_blocked = 0;

        if let Some(proxy) = &self.proxy {
            if let Some(url) = proxy.http_url() {
                builder = builder.proxy(reqwest::Proxy::http(url)?);
            }
            if let Some(url) = proxy.https_url() {
                builder = builder.proxy(reqwest::Proxy::https(url)?);
            }
            if proxy.is_rotating() {
                // Rotating proxies hand out a new exit IP per connection
                builder = builder.pool_max_idle_per_host(0);
            }
            retries_when_blocked = proxy.retries_when_blocked();
        }

        Ok(YoutubeTranscriptClient {
            client: builder.build()?,
            base_url: self
                .base_url
                .unwrap_or_else(|| YOUTUBE_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            retries_when_blocked: self.retries_when_blocked.unwrap_or(retries_when_blocked),
        })
    }
}

fn extract_innertube_api_key(html: &str, video_id: &str) -> Result<String, TranscriptError> {
    if let Some(caps) = api_key_regex().captures(html) {
        return Ok(caps[1].to_string());
    }

    if html.contains(RECAPTCHA_MARKER) {
        return Err(TranscriptError::RequestBlocked {
            video_id: video_id.to_string(),
        });
    }

    Err(TranscriptError::DataUnparsable {
        video_id: video_id.to_string(),
        detail: "innertube API key not found on the watch page".to_string(),
    })
}

fn assert_playability(player: &serde_json::Value, video_id: &str) -> Result<(), TranscriptError> {
    let status = &player["playabilityStatus"];
    let state = status["status"].as_str().unwrap_or("OK");
    if state == "OK" {
        return Ok(());
    }

    let reason = status["reason"].as_str().unwrap_or_default().to_string();
    let video_id = video_id.to_string();

    Err(match state {
        "ERROR" if reason.contains("unavailable") || reason.is_empty() => {
            TranscriptError::VideoUnavailable { video_id }
        }
        "LOGIN_REQUIRED" if is_bot_check(&reason) => TranscriptError::RequestBlocked { video_id },
        "LOGIN_REQUIRED" | "AGE_CHECK_REQUIRED" => TranscriptError::AgeRestricted { video_id },
        _ => TranscriptError::VideoUnplayable { video_id, reason },
    })
}

/// YouTube sends the bot check with either a straight or a curly apostrophe
fn is_bot_check(reason: &str) -> bool {
    reason.replace('\u{2019}', "'").starts_with(BOT_CHECK_REASON)
}

fn extract_caption_tracks(
    player: &serde_json::Value,
    video_id: &str,
) -> Result<Vec<CaptionTrack>, TranscriptError> {
    let tracks = &player["captions"]["playerCaptionsTracklistRenderer"]["captionTracks"];
    let tracks: Vec<CaptionTrack> = if tracks.is_null() {
        Vec::new()
    } else {
        serde_json::from_value(tracks.clone()).map_err(|e| TranscriptError::DataUnparsable {
            video_id: video_id.to_string(),
            detail: format!("caption tracks: {e}"),
        })?
    };

    if tracks.is_empty() {
        return Err(TranscriptError::TranscriptsDisabled {
            video_id: video_id.to_string(),
        });
    }
    Ok(tracks)
}

/// Walk the requested languages in order, preferring manual tracks over generated ones
fn find_track<'a>(
    tracks: &'a [CaptionTrack],
    languages: &[String],
    video_id: &str,
) -> Result<&'a CaptionTrack, TranscriptError> {
    for language in languages {
        let manual = tracks
            .iter()
            .find(|t| !t.is_generated() && &t.language_code == language);
        let generated = tracks
            .iter()
            .find(|t| t.is_generated() && &t.language_code == language);
        if let Some(track) = manual.or(generated) {
            return Ok(track);
        }
    }

    Err(TranscriptError::NoTranscriptFound {
        video_id: video_id.to_string(),
        requested: languages.to_vec(),
        available: tracks
            .iter()
            .map(|t| {
                if t.is_generated() {
                    format!("{} (generated)", t.language_code)
                } else {
                    t.language_code.clone()
                }
            })
            .collect(),
    })
}
