use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::cache::{CacheRecord, TranscriptStore};
use crate::diagnostics::{CacheMode, CacheStatus, NoteOutcome, TranscriptDiagnostics};
use crate::transcribe::{
    ApifyClient, CookieResolver, MediaDownloader, Transcriber, TranscriptionCredentials,
};
use crate::Result;

pub mod generic;
pub mod podcast;
pub mod youtube;

pub use youtube::YoutubeMode;

/// Which strategy ultimately produced a transcript
///
/// `Unavailable` means the cascade ran and found nothing; `Unknown` means the
/// cascade never ran for this URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TranscriptSource {
    #[serde(rename = "youtubei")]
    Youtubei,
    #[serde(rename = "captionTracks")]
    CaptionTracks,
    #[serde(rename = "yt-dlp")]
    YtDlp,
    #[serde(rename = "podcastTranscript")]
    PodcastTranscript,
    #[serde(rename = "whisper")]
    Whisper,
    #[serde(rename = "apify")]
    Apify,
    #[serde(rename = "html")]
    Html,
    #[serde(rename = "unavailable")]
    Unavailable,
    #[default]
    #[serde(rename = "unknown")]
    Unknown,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptSource::Youtubei => "youtubei",
            TranscriptSource::CaptionTracks => "captionTracks",
            TranscriptSource::YtDlp => "yt-dlp",
            TranscriptSource::PodcastTranscript => "podcastTranscript",
            TranscriptSource::Whisper => "whisper",
            TranscriptSource::Apify => "apify",
            TranscriptSource::Html => "html",
            TranscriptSource::Unavailable => "unavailable",
            TranscriptSource::Unknown => "unknown",
        }
    }
}

/// Result of the transcript dispatch for one URL
#[derive(Debug, Clone, Default)]
pub struct TranscriptResolution {
    pub text: Option<String>,
    pub source: TranscriptSource,
    pub metadata: Option<serde_json::Value>,
    pub diagnostics: TranscriptDiagnostics,
}

impl TranscriptResolution {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
    }
}

/// What one provider's cascade produced
#[derive(Debug, Clone)]
pub struct ProviderOutcome {
    pub text: Option<String>,
    pub source: TranscriptSource,
    pub metadata: Option<serde_json::Value>,
}

impl ProviderOutcome {
    pub fn unavailable() -> Self {
        Self {
            text: None,
            source: TranscriptSource::Unavailable,
            metadata: None,
        }
    }

    pub fn found(text: String, source: TranscriptSource) -> Self {
        Self {
            text: Some(text),
            source,
            metadata: None,
        }
    }

    pub fn has_text(&self) -> bool {
        self.text.as_deref().map(|t| !t.trim().is_empty()).unwrap_or(false)
    }
}

/// Collaborators shared by all transcript providers
#[derive(Clone)]
pub struct TranscriptDeps {
    pub http: reqwest::Client,
    pub downloader: Option<Arc<dyn MediaDownloader>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub apify: Option<Arc<dyn ApifyClient>>,
    pub cookies: Option<Arc<dyn CookieResolver>>,
    pub credentials: TranscriptionCredentials,
    pub scratch_dir: PathBuf,
}

/// Per-request knobs for the transcript cascade
#[derive(Debug, Clone, Default)]
pub struct TranscriptOptions {
    pub cache_mode: CacheMode,
    pub youtube_mode: YoutubeMode,
    pub prefer_media_transcript: bool,
    pub wants_segments: bool,
}

/// Everything a provider sees for one resolution
pub struct ProviderContext<'a> {
    pub url: &'a str,
    pub html: Option<&'a str>,
    pub deps: &'a TranscriptDeps,
    pub options: &'a TranscriptOptions,
}

/// One per-source-type transcript cascade
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    fn id(&self) -> &'static str;

    /// URL-shape predicate; the dispatcher scans providers in fixed order
    fn supports(&self, url: &str, html: Option<&str>) -> bool;

    async fn resolve(
        &self,
        ctx: &ProviderContext<'_>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<ProviderOutcome>;
}

/// A stable (service, key) pair for cache lookups, distinct from the full URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceKey {
    pub service: String,
    pub key: String,
}

/// Compute the cache key for a URL
pub fn resource_key(url: &str) -> ResourceKey {
    if let Some(video_id) = youtube::video_id(url) {
        return ResourceKey {
            service: "youtube".to_string(),
            key: video_id,
        };
    }
    if let Some(episode) = podcast::episode_key(url) {
        return ResourceKey {
            service: "podcast".to_string(),
            key: episode,
        };
    }
    if let Some(id) = crate::twitter::tweet_id(url) {
        return ResourceKey {
            service: "twitter".to_string(),
            key: id,
        };
    }
    ResourceKey {
        service: "generic".to_string(),
        key: url.to_string(),
    }
}

/// Selects a provider by URL shape, wraps it with the transcript cache, and
/// normalizes results
pub struct TranscriptDispatcher {
    store: TranscriptStore,
    providers: Vec<Arc<dyn TranscriptProvider>>,
}

impl TranscriptDispatcher {
    /// Build the dispatcher with the default provider table
    pub fn new(store: TranscriptStore) -> Self {
        Self {
            store,
            providers: vec![
                Arc::new(youtube::YoutubeProvider),
                Arc::new(podcast::PodcastProvider),
                Arc::new(generic::GenericProvider),
            ],
        }
    }

    /// Build with an explicit provider table (tests, custom wiring)
    pub fn with_providers(store: TranscriptStore, providers: Vec<Arc<dyn TranscriptProvider>>) -> Self {
        Self { store, providers }
    }

    /// Resolve a transcript for a URL, read-through/write-through cached
    pub async fn resolve(
        &self,
        url: &str,
        html: Option<&str>,
        deps: &TranscriptDeps,
        options: &TranscriptOptions,
    ) -> Result<TranscriptResolution> {
        let key = resource_key(url);
        let mut diag = TranscriptDiagnostics {
            cache_mode: options.cache_mode,
            ..Default::default()
        };

        let consult = self
            .store
            .consult(&key.service, &key.key, options.cache_mode, options.wants_segments)
            .await;
        diag.cache_status = consult.status;

        if consult.status == CacheStatus::Hit {
            let entry = consult.entry.expect("hit carries an entry");
            diag.text_provided = !entry.content.is_empty();
            diag.provider = Some(entry.source.as_str().to_string());
            diag.note("cache", NoteOutcome::Ok, format!("served {} from cache", key.key));
            return Ok(TranscriptResolution {
                text: Some(entry.content).filter(|c| !c.is_empty()),
                source: entry.source,
                metadata: entry.metadata,
                diagnostics: diag,
            });
        }

        let Some(provider) = self
            .providers
            .iter()
            .find(|p| p.supports(url, html))
        else {
            diag.note("dispatch", NoteOutcome::Skipped, "no provider matched URL");
            return Ok(TranscriptResolution {
                diagnostics: diag,
                ..Default::default()
            });
        };

        tracing::debug!(url, provider = provider.id(), "dispatching transcript provider");
        let ctx = ProviderContext {
            url,
            html,
            deps,
            options,
        };

        match provider.resolve(&ctx, &mut diag).await {
            Ok(outcome) if outcome.has_text() => {
                let text = outcome.text.clone().unwrap_or_default();
                self.store
                    .store_success(
                        &key.service,
                        &key.key,
                        CacheRecord {
                            content: text.clone(),
                            source: outcome.source,
                            metadata: outcome.metadata.clone(),
                        },
                    )
                    .await;
                diag.text_provided = true;
                diag.provider = Some(outcome.source.as_str().to_string());
                Ok(TranscriptResolution {
                    text: Some(text),
                    source: outcome.source,
                    metadata: outcome.metadata,
                    diagnostics: diag,
                })
            }
            Ok(outcome) => {
                // Confirmed unavailable: negative-cache with the short TTL so a
                // transient absence is not remembered forever
                if outcome.source == TranscriptSource::Unavailable {
                    self.store.store_unavailable(&key.service, &key.key).await;
                }
                diag.provider = Some(outcome.source.as_str().to_string());
                Ok(TranscriptResolution {
                    text: None,
                    source: outcome.source,
                    metadata: outcome.metadata,
                    diagnostics: diag,
                })
            }
            Err(err) => {
                // Availability over freshness: a stale entry beats a hard
                // failure when the cache has prior knowledge
                if let Some(entry) = self.store.stale_fallback(&key.service, &key.key).await {
                    tracing::warn!(url, %err, "provider failed, substituting cached transcript");
                    diag.cache_status = CacheStatus::Fallback;
                    diag.text_provided = !entry.content.is_empty();
                    diag.provider = Some(entry.source.as_str().to_string());
                    diag.note(
                        "cache",
                        NoteOutcome::Ok,
                        format!("live fetch failed ({}), substituted stale cache entry", err),
                    );
                    return Ok(TranscriptResolution {
                        text: Some(entry.content).filter(|c| !c.is_empty()),
                        source: entry.source,
                        metadata: entry.metadata,
                        diagnostics: diag,
                    });
                }
                Err(err)
            }
        }
    }
}
