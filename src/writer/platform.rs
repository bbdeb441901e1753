use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Social media platforms a post can be written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case", try_from = "String")]
pub enum Platform {
    #[value(name = "linkedin")]
    #[serde(rename = "linkedin")]
    LinkedIn,
    Instagram,
    Twitter,
    Facebook,
    #[value(name = "tiktok")]
    #[serde(rename = "tiktok")]
    TikTok,
    #[value(name = "youtube-shorts")]
    #[serde(rename = "youtube-shorts")]
    YouTubeShorts,
    Threads,
    Other,
}

impl Platform {
    pub const ALL: [Platform; 8] = [
        Platform::LinkedIn,
        Platform::Instagram,
        Platform::Twitter,
        Platform::Facebook,
        Platform::TikTok,
        Platform::YouTubeShorts,
        Platform::Threads,
        Platform::Other,
    ];

    /// Platforms selected when the user does not choose any
    pub const DEFAULT_SELECTION: [Platform; 2] = [Platform::LinkedIn, Platform::Instagram];

    /// Label shown to users and sent to the agent
    pub fn label(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "LinkedIn",
            Platform::Instagram => "Instagram",
            Platform::Twitter => "Twitter",
            Platform::Facebook => "Facebook",
            Platform::TikTok => "TikTok",
            Platform::YouTubeShorts => "YouTube Shorts",
            Platform::Threads => "Threads",
            Platform::Other => "Other",
        }
    }

    /// Stable identifier used in forms and on the command line
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::LinkedIn => "linkedin",
            Platform::Instagram => "instagram",
            Platform::Twitter => "twitter",
            Platform::Facebook => "facebook",
            Platform::TikTok => "tiktok",
            Platform::YouTubeShorts => "youtube-shorts",
            Platform::Threads => "threads",
            Platform::Other => "other",
        }
    }

    pub fn is_default(&self) -> bool {
        Self::DEFAULT_SELECTION.contains(self)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Platform {
    type Err = String;

    /// Accepts labels or slugs, ignoring case, spaces, dashes and underscores
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted: String = s
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        Platform::ALL
            .into_iter()
            .find(|platform| platform.slug().replace('-', "") == wanted)
            .or(match wanted.as_str() {
                "x" => Some(Platform::Twitter),
                "shorts" => Some(Platform::YouTubeShorts),
                _ => None,
            })
            .ok_or_else(|| format!("Unknown platform: {s}"))
    }
}

impl TryFrom<String> for Platform {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
