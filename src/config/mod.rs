use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::firecrawl::FirecrawlMode;
use crate::transcribe::TranscriptionCredentials;
use crate::twitter::DEFAULT_NITTER_MIRRORS;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,

    /// HTTP fetch settings
    pub http: HttpConfig,

    /// Transcript cache settings
    pub cache: CacheConfig,

    /// Firecrawl fallback settings
    pub firecrawl: FirecrawlConfig,

    /// Nitter mirror pool for tweet rendering
    pub nitter: NitterConfig,

    /// API credentials for optional collaborators
    pub credentials: CredentialsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Character cap applied to resolved content
    pub max_characters: usize,

    /// Path to the yt-dlp binary used for media download and probing
    pub yt_dlp_path: Option<PathBuf>,

    /// Local whisper model, used when no cloud credential exists
    pub whisper_model_path: Option<PathBuf>,

    /// Scratch directory override for downloaded audio
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Per-request fetch timeout
    pub fetch_timeout_seconds: u64,

    /// Deadline for a whole resolution, cascade included
    pub overall_timeout_seconds: u64,

    /// User agent sent on direct page fetches
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// TTL for successfully resolved transcripts
    pub transcript_ttl_hours: i64,

    /// Shorter TTL for confirmed-absent transcripts, so new captions are
    /// picked up without hammering providers on every request
    pub negative_ttl_hours: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirecrawlConfig {
    /// When to fall back to the rendering service
    pub mode: FirecrawlMode,

    /// Service base URL
    pub base_url: String,

    /// API key; Firecrawl is skipped entirely when absent
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NitterConfig {
    /// Mirror hostnames tried in rotated order per tweet
    pub mirrors: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CredentialsConfig {
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub fal_api_key: Option<String>,
    pub apify_api_key: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                max_characters: 40_000,
                yt_dlp_path: None,
                whisper_model_path: None,
                temp_dir: None,
            },
            http: HttpConfig {
                fetch_timeout_seconds: 30,
                overall_timeout_seconds: 600,
                user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:126.0) Gecko/20100101 Firefox/126.0"
                    .to_string(),
            },
            cache: CacheConfig {
                transcript_ttl_hours: 24 * 7,
                negative_ttl_hours: 24,
            },
            firecrawl: FirecrawlConfig {
                mode: FirecrawlMode::Auto,
                base_url: "https://api.firecrawl.dev/v1".to_string(),
                api_key: None,
            },
            nitter: NitterConfig {
                mirrors: DEFAULT_NITTER_MIRRORS.iter().map(|m| m.to_string()).collect(),
            },
            credentials: CredentialsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            let content = fs_err::read_to_string(&config_path)
                .context("Failed to read config file")?;

            let config: Config = serde_yaml::from_str(&content)
                .context("Failed to parse config file")?;

            config.validate()?;
            Ok(config)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("linkscribe").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.app.max_characters == 0 {
            anyhow::bail!("max_characters must be greater than zero");
        }
        if self.cache.negative_ttl_hours >= self.cache.transcript_ttl_hours {
            anyhow::bail!("negative cache TTL must be shorter than the transcript TTL");
        }
        if self.nitter.mirrors.is_empty() {
            anyhow::bail!("at least one Nitter mirror must be configured");
        }
        Ok(())
    }

    /// Display current configuration, keys redacted
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Max Characters: {}", self.app.max_characters);
        println!("  Fetch Timeout: {}s", self.http.fetch_timeout_seconds);
        println!("  Overall Timeout: {}s", self.http.overall_timeout_seconds);
        println!("  Transcript TTL: {}h", self.cache.transcript_ttl_hours);
        println!("  Negative TTL: {}h", self.cache.negative_ttl_hours);
        println!("  Firecrawl Mode: {:?}", self.firecrawl.mode);
        println!("  Firecrawl Key: {}", presence(&self.firecrawl.api_key));
        println!("  Nitter Mirrors: {}", self.nitter.mirrors.join(", "));
        println!("  Groq Key: {}", presence(&self.credentials.groq_api_key));
        println!("  OpenAI Key: {}", presence(&self.credentials.openai_api_key));
        println!("  FAL Key: {}", presence(&self.credentials.fal_api_key));
        println!("  Apify Key: {}", presence(&self.credentials.apify_api_key));
        if let Some(path) = &self.app.yt_dlp_path {
            println!("  yt-dlp: {}", path.display());
        }
        if let Some(path) = &self.app.whisper_model_path {
            println!("  Whisper Model: {}", path.display());
        }
    }

    /// Credentials in the shape the transcript cascade consumes
    pub fn transcription_credentials(&self) -> TranscriptionCredentials {
        TranscriptionCredentials {
            groq_api_key: self.credentials.groq_api_key.clone(),
            openai_api_key: self.credentials.openai_api_key.clone(),
            fal_api_key: self.credentials.fal_api_key.clone(),
            whisper_model_path: self.app.whisper_model_path.clone(),
        }
    }
}

fn presence(key: &Option<String>) -> &'static str {
    if key.is_some() {
        "configured"
    } else {
        "not set"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_negative_ttl_must_stay_below_success_ttl() {
        let mut config = Config::default();
        config.cache.negative_ttl_hours = config.cache.transcript_ttl_hours;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_round_trips_through_yaml() {
        let mut config = Config::default();
        config.credentials.groq_api_key = Some("gsk_test".to_string());
        config.firecrawl.mode = FirecrawlMode::Always;

        let yaml = serde_yaml::to_string(&config).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.credentials.groq_api_key.as_deref(), Some("gsk_test"));
        assert_eq!(parsed.firecrawl.mode, FirecrawlMode::Always);
        assert_eq!(parsed.nitter.mirrors, config.nitter.mirrors);
    }

    #[test]
    fn test_mirrors_cannot_be_empty() {
        let mut config = Config::default();
        config.nitter.mirrors.clear();
        assert!(config.validate().is_err());
    }
}
