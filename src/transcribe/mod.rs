use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::Result;

/// Progress of a (possibly chunked) transcription
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TranscriptionProgress {
    pub processed_seconds: f64,
    pub total_seconds: Option<f64>,
    pub part_index: usize,
    pub total_parts: usize,
}

pub type ProgressCallback = Arc<dyn Fn(TranscriptionProgress) + Send + Sync>;

/// A request handed to the transcription collaborator
pub struct TranscriptionRequest {
    pub file_path: PathBuf,
    pub media_type: String,
    pub duration_hint: Option<f64>,
    pub progress: Option<ProgressCallback>,
}

impl TranscriptionRequest {
    pub fn new(file_path: PathBuf, media_type: impl Into<String>) -> Self {
        Self {
            file_path,
            media_type: media_type.into(),
            duration_hint: None,
            progress: None,
        }
    }

    pub fn with_duration_hint(mut self, seconds: Option<f64>) -> Self {
        self.duration_hint = seconds;
        self
    }
}

/// What the transcription collaborator returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionOutcome {
    pub text: String,
    pub provider_id: String,
    pub error: Option<String>,
}

/// Speech-to-text collaborator (whisper.cpp, cloud APIs, ...)
///
/// The engine never executes transcription binaries or calls cloud APIs
/// itself; it hands a local media file to this trait and consumes the result.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionOutcome>;
}

/// Audio/video download collaborator shaped like yt-dlp
#[async_trait]
pub trait MediaDownloader: Send + Sync {
    /// Probe a URL for metadata (title, duration, formats) as loose JSON
    async fn probe(&self, url: &str) -> Result<serde_json::Value>;

    /// Download the best audio stream to `dest`
    async fn download_audio(&self, url: &str, dest: &Path, cookies: Option<&Path>) -> Result<()>;
}

/// Best-effort browser-cookie resolution for sites that gate media behind
/// a login (X/Twitter in particular)
#[async_trait]
pub trait CookieResolver: Send + Sync {
    async fn cookie_file(&self, domain: &str) -> Option<PathBuf>;
}

/// Third-party transcript scrape API (Apify-style), last-resort for YouTube
#[async_trait]
pub trait ApifyClient: Send + Sync {
    /// Returns `Ok(None)` when the service confirms no transcript exists
    async fn fetch_transcript(&self, video_url: &str) -> Result<Option<String>>;
}

/// Cloud transcription backends in fixed precedence order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    Groq,
    OpenAi,
    Fal,
}

impl CloudProvider {
    pub fn id(&self) -> &'static str {
        match self {
            CloudProvider::Groq => "groq",
            CloudProvider::OpenAi => "openai",
            CloudProvider::Fal => "fal",
        }
    }
}

/// Transcription credentials known to the engine
///
/// The engine only checks presence and precedence; the actual keys are
/// consumed by the injected `Transcriber`.
#[derive(Debug, Clone, Default)]
pub struct TranscriptionCredentials {
    pub groq_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub fal_api_key: Option<String>,
    pub whisper_model_path: Option<PathBuf>,
}

impl TranscriptionCredentials {
    /// Preferred cloud backend when several keys exist: groq, openai, fal
    pub fn preferred_cloud(&self) -> Option<CloudProvider> {
        if self.groq_api_key.is_some() {
            Some(CloudProvider::Groq)
        } else if self.openai_api_key.is_some() {
            Some(CloudProvider::OpenAi)
        } else if self.fal_api_key.is_some() {
            Some(CloudProvider::Fal)
        } else {
            None
        }
    }

    /// Local model readiness counts as a credential
    pub fn has_any(&self) -> bool {
        self.preferred_cloud().is_some() || self.whisper_model_path.is_some()
    }
}

/// Transcriber backed by the OpenAI-compatible audio transcription endpoints
///
/// Groq and OpenAI share the request shape; the configured credential
/// precedence picks which one is called.
pub struct CloudTranscriber {
    client: reqwest::Client,
    credentials: TranscriptionCredentials,
}

impl CloudTranscriber {
    pub fn new(client: reqwest::Client, credentials: TranscriptionCredentials) -> Self {
        Self {
            client,
            credentials,
        }
    }

    fn endpoint(provider: CloudProvider) -> Option<(&'static str, &'static str)> {
        match provider {
            CloudProvider::Groq => Some((
                "https://api.groq.com/openai/v1/audio/transcriptions",
                "whisper-large-v3",
            )),
            CloudProvider::OpenAi => Some((
                "https://api.openai.com/v1/audio/transcriptions",
                "whisper-1",
            )),
            // FAL's queue-based API needs its own collaborator
            CloudProvider::Fal => None,
        }
    }

    fn api_key(&self, provider: CloudProvider) -> Option<&str> {
        match provider {
            CloudProvider::Groq => self.credentials.groq_api_key.as_deref(),
            CloudProvider::OpenAi => self.credentials.openai_api_key.as_deref(),
            CloudProvider::Fal => self.credentials.fal_api_key.as_deref(),
        }
    }
}

#[async_trait]
impl Transcriber for CloudTranscriber {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionOutcome> {
        let provider = self
            .credentials
            .preferred_cloud()
            .ok_or_else(|| anyhow::anyhow!("no cloud transcription credential configured"))?;
        let (endpoint, model) = Self::endpoint(provider)
            .ok_or_else(|| anyhow::anyhow!("{} transcription is not supported by the built-in transcriber", provider.id()))?;
        let api_key = self
            .api_key(provider)
            .ok_or_else(|| anyhow::anyhow!("missing API key for {}", provider.id()))?
            .to_string();

        tracing::info!(
            provider = provider.id(),
            file = %request.file_path.display(),
            "uploading media for transcription"
        );

        let bytes = tokio::fs::read(&request.file_path).await?;
        let file_name = request
            .file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "media.mp3".to_string());
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(&request.media_type)?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", model)
            .text("response_format", "json");

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} transcription failed: HTTP {}: {}", provider.id(), status, body);
        }

        let payload: serde_json::Value = response.json().await?;
        let text = payload
            .get("text")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();
        if text.is_empty() {
            anyhow::bail!("{} returned an empty transcript", provider.id());
        }

        if let Some(callback) = &request.progress {
            callback(TranscriptionProgress {
                processed_seconds: request.duration_hint.unwrap_or(0.0),
                total_seconds: request.duration_hint,
                part_index: 1,
                total_parts: 1,
            });
        }

        Ok(TranscriptionOutcome {
            text,
            provider_id: provider.id().to_string(),
            error: None,
        })
    }
}

/// yt-dlp subprocess downloader
pub struct YtDlpDownloader {
    yt_dlp_path: PathBuf,
}

impl YtDlpDownloader {
    pub fn new(yt_dlp_path: impl Into<PathBuf>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }
}

#[async_trait]
impl MediaDownloader for YtDlpDownloader {
    async fn probe(&self, url: &str) -> Result<serde_json::Value> {
        tracing::debug!("Probing media info for: {}", url);

        let output = tokio::process::Command::new(&self.yt_dlp_path)
            .args(["--dump-json", "--no-playlist", url])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp probe failed: {}", error);
        }

        let json_str = String::from_utf8(output.stdout)?;
        Ok(serde_json::from_str(&json_str)?)
    }

    async fn download_audio(&self, url: &str, dest: &Path, cookies: Option<&Path>) -> Result<()> {
        tracing::debug!("Downloading audio for: {}", url);

        let mut command = tokio::process::Command::new(&self.yt_dlp_path);
        command.args([
            "--output",
            &dest.to_string_lossy(),
            "--extract-audio",
            "--audio-format",
            "mp3",
            // Lowest quality for speed; still fine for speech-to-text
            "--audio-quality",
            "9",
            "--format",
            "worstaudio[acodec^=mp4a]/worstaudio[ext=m4a]/worstaudio[ext=mp3]/worstaudio",
            "--no-playlist",
            "--concurrent-fragments",
            "4",
            "--newline",
        ]);
        if let Some(cookie_file) = cookies {
            command.args(["--cookies", &cookie_file.to_string_lossy()]);
        }
        command.arg(url);

        let output = command
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("Failed to download audio: {}", error);
        }

        Ok(())
    }
}

/// A scratch media file removed on every exit path
///
/// Cancellation mid-download drops the guard, which deletes any partial file.
pub struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    /// Reserve a unique path under `dir` for one request's media bytes
    pub fn reserve(dir: &Path, extension: &str) -> Self {
        let name = format!("media_{}.{}", &uuid::Uuid::new_v4().to_string()[..8], extension);
        Self {
            path: dir.join(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(err) = std::fs::remove_file(&self.path) {
                tracing::warn!(path = %self.path.display(), %err, "failed to remove scratch media file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cloud_precedence() {
        let mut creds = TranscriptionCredentials::default();
        assert_eq!(creds.preferred_cloud(), None);
        assert!(!creds.has_any());

        creds.fal_api_key = Some("f".into());
        assert_eq!(creds.preferred_cloud(), Some(CloudProvider::Fal));

        creds.openai_api_key = Some("o".into());
        assert_eq!(creds.preferred_cloud(), Some(CloudProvider::OpenAi));

        creds.groq_api_key = Some("g".into());
        assert_eq!(creds.preferred_cloud(), Some(CloudProvider::Groq));
    }

    #[test]
    fn test_local_model_counts_as_credential() {
        let creds = TranscriptionCredentials {
            whisper_model_path: Some(PathBuf::from("/models/ggml-base.bin")),
            ..Default::default()
        };
        assert!(creds.has_any());
        assert_eq!(creds.preferred_cloud(), None);
    }

    #[test]
    fn test_scratch_file_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path;
        {
            let scratch = ScratchFile::reserve(dir.path(), "mp3");
            path = scratch.path().to_path_buf();
            std::fs::write(&path, b"partial bytes").unwrap();
            assert!(path.exists());
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_paths_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let a = ScratchFile::reserve(dir.path(), "mp3");
        let b = ScratchFile::reserve(dir.path(), "mp3");
        assert_ne!(a.path(), b.path());
    }
}
