use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::OutputFormat;
use crate::utils::validate_and_normalize_url;

pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const OPENAI_BASE_URL_ENV: &str = "OPENAI_BASE_URL";
pub const WEBSHARE_USERNAME_ENV: &str = "WEBSHARE_PROXY_USERNAME";
pub const WEBSHARE_PASSWORD_ENV: &str = "WEBSHARE_PROXY_PASSWORD";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Hosted agent settings
    pub openai: OpenAiConfig,

    /// Transcript retrieval settings
    pub transcript: TranscriptConfig,

    /// Web form settings
    pub web: WebConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (usually supplied through OPENAI_API_KEY instead)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Responses API base URL
    pub base_url: String,

    /// Model driving the content writer agent
    pub agent_model: String,

    /// Model used by the generate_content tool
    pub content_model: String,

    /// Output token cap for the generate_content tool
    pub content_max_output_tokens: u32,

    /// Maximum model round trips per agent run
    pub max_turns: usize,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Offer the hosted web search tool to the agent
    pub web_search: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptConfig {
    /// Preferred transcript languages, highest priority first
    pub languages: Vec<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,

    /// Optional proxy for YouTube requests
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

/// Proxy used for YouTube requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProxyConfig {
    /// Webshare rotating residential proxy
    Webshare {
        username: String,
        password: String,
        #[serde(default = "default_webshare_domain")]
        domain: String,
        #[serde(default = "default_webshare_port")]
        port: u16,
        #[serde(default = "default_retries_when_blocked")]
        retries_when_blocked: u32,
    },
    /// Any HTTP(S) proxy
    Generic {
        #[serde(default)]
        http_url: Option<String>,
        #[serde(default)]
        https_url: Option<String>,
    },
}

fn default_webshare_domain() -> String {
    "p.webshare.io".to_string()
}

fn default_webshare_port() -> u16 {
    80
}

fn default_retries_when_blocked() -> u32 {
    10
}

impl ProxyConfig {
    pub fn http_url(&self) -> Option<String> {
        match self {
            ProxyConfig::Webshare {
                username,
                password,
                domain,
                port,
                ..
            } => Some(format!(
                "http://{}-rotate:{}@{}:{}/",
                urlencoding::encode(username),
                urlencoding::encode(password),
                domain,
                port
            )),
            ProxyConfig::Generic { http_url, https_url } => http_url.clone().or_else(|| https_url.clone()),
        }
    }

    pub fn https_url(&self) -> Option<String> {
        match self {
            ProxyConfig::Webshare { .. } => self.http_url(),
            ProxyConfig::Generic { http_url, https_url } => https_url.clone().or_else(|| http_url.clone()),
        }
    }

    pub fn is_rotating(&self) -> bool {
        matches!(self, ProxyConfig::Webshare { .. })
    }

    pub fn retries_when_blocked(&self) -> u32 {
        match self {
            ProxyConfig::Webshare {
                retries_when_blocked,
                ..
            } => *retries_when_blocked,
            ProxyConfig::Generic { .. } => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Address the web form binds to
    pub bind_addr: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Output format used when `generate` is run without `--format`
    pub default_output_format: OutputFormat,

    /// Maximum concurrent agent runs when generating for several platforms
    pub max_concurrent_requests: usize,
}

impl AppConfig {
    pub fn output_format(&self, requested: Option<OutputFormat>) -> OutputFormat {
        requested.unwrap_or_else(|| self.default_output_format.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai: OpenAiConfig {
                api_key: None,
                base_url: "https://api.openai.com/v1".to_string(),
                agent_model: "gpt-4o-mini".to_string(),
                content_model: "gpt-4o".to_string(),
                content_max_output_tokens: 100,
                max_turns: 10,
                timeout_seconds: 120,
                web_search: true,
            },
            transcript: TranscriptConfig {
                languages: vec!["en".to_string()],
                timeout_seconds: 30,
                proxy: None,
            },
            web: WebConfig {
                bind_addr: "127.0.0.1:8501".to_string(),
            },
            app: AppConfig {
                default_output_format: OutputFormat::Text,
                max_concurrent_requests: 1,
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default, then apply environment overrides
    pub async fn load() -> Result<Self> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read the file at `path`, writing the default configuration there if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs_err::read_to_string(path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            Ok(config)
        } else {
            let config = Self::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("social-post-writer").join("config.yaml"))
    }

    /// Environment variables win over file values
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty(OPENAI_API_KEY_ENV) {
            self.openai.api_key = Some(key);
        }
        if let Some(base_url) = non_empty(OPENAI_BASE_URL_ENV) {
            self.openai.base_url = base_url;
        }

        if let (Some(username), Some(password)) =
            (non_empty(WEBSHARE_USERNAME_ENV), non_empty(WEBSHARE_PASSWORD_ENV))
        {
            let (domain, port, retries_when_blocked) = match &self.transcript.proxy {
                Some(ProxyConfig::Webshare {
                    domain,
                    port,
                    retries_when_blocked,
                    ..
                }) => (domain.clone(), *port, *retries_when_blocked),
                _ => (
                    default_webshare_domain(),
                    default_webshare_port(),
                    default_retries_when_blocked(),
                ),
            };
            self.transcript.proxy = Some(ProxyConfig::Webshare {
                username,
                password,
                domain,
                port,
                retries_when_blocked,
            });
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        validate_and_normalize_url(&self.openai.base_url)
            .context("Invalid OpenAI base URL")?;

        if self.openai.max_turns == 0 {
            anyhow::bail!("openai.max_turns must be at least 1");
        }

        if self.transcript.languages.is_empty() {
            anyhow::bail!("transcript.languages must list at least one language code");
        }

        if self.app.max_concurrent_requests == 0 {
            anyhow::bail!("app.max_concurrent_requests must be at least 1");
        }

        self.web
            .bind_addr
            .parse::<std::net::SocketAddr>()
            .with_context(|| format!("Invalid web.bind_addr: {}", self.web.bind_addr))?;

        Ok(())
    }

    /// API key needed by every command that talks to the hosted agent
    pub fn openai_api_key(&self) -> Result<&str> {
        self.openai
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .with_context(|| {
                format!("OpenAI API key is not configured; set {OPENAI_API_KEY_ENV} or openai.api_key")
            })
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  OpenAI Base URL: {}", self.openai.base_url);
        println!(
            "  OpenAI API Key: {}",
            if self.openai.api_key.is_some() { "set" } else { "not set" }
        );
        println!("  Agent Model: {}", self.openai.agent_model);
        println!("  Content Model: {}", self.openai.content_model);
        println!("  Web Search: {}", self.openai.web_search);
        println!("  Transcript Languages: {}", self.transcript.languages.join(", "));
        match &self.transcript.proxy {
            Some(ProxyConfig::Webshare { domain, port, .. }) => {
                println!("  Proxy: webshare ({}:{})", domain, port)
            }
            Some(ProxyConfig::Generic { .. }) => println!("  Proxy: generic"),
            None => println!("  Proxy: none"),
        }
        println!("  Web Bind Address: {}", self.web.bind_addr);
        println!("  Default Format: {}", self.app.default_output_format);
    }
}
