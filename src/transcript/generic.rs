use async_trait::async_trait;
use serde_json::Value;

use super::{ProviderContext, ProviderOutcome, TranscriptProvider, TranscriptSource};
use crate::diagnostics::{NoteOutcome, TranscriptDiagnostics};
use crate::html::has_sourceless_media_tag;
use crate::transcribe::{ScratchFile, TranscriptionRequest};
use crate::twitter::is_status_url;
use crate::utils::extract_domain;
use crate::{ResolveError, Result};

/// Catch-all provider: arbitrary pages with an embedded but source-less media
/// tag, plus X/Twitter statuses, handled through the downloader collaborator
pub struct GenericProvider;

impl GenericProvider {
    fn applicable(ctx: &ProviderContext<'_>) -> bool {
        if !ctx.options.prefer_media_transcript {
            return false;
        }
        is_status_url(ctx.url)
            || ctx.html.map(has_sourceless_media_tag).unwrap_or(false)
    }
}

#[async_trait]
impl TranscriptProvider for GenericProvider {
    fn id(&self) -> &'static str {
        "generic"
    }

    fn supports(&self, _url: &str, _html: Option<&str>) -> bool {
        // terminal entry of the dispatch table; applicability is re-checked
        // per request because it depends on options and page content
        true
    }

    async fn resolve(
        &self,
        ctx: &ProviderContext<'_>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<ProviderOutcome> {
        if !Self::applicable(ctx) {
            // cascade never ran for this URL
            return Ok(ProviderOutcome {
                text: None,
                source: TranscriptSource::Unknown,
                metadata: None,
            });
        }

        let twitter = is_status_url(ctx.url);
        let Some(downloader) = ctx.deps.downloader.as_ref() else {
            if twitter {
                // common, expected configuration gap for Twitter media;
                // name it instead of failing generically
                return Err(ResolveError::MissingCredentials("missing_yt_dlp".into()).into());
            }
            diag.note("yt-dlp", NoteOutcome::Skipped, "no downloader binary configured");
            return Ok(ProviderOutcome::unavailable());
        };
        let Some(transcriber) = ctx.deps.transcriber.as_ref() else {
            diag.note("yt-dlp", NoteOutcome::Skipped, "no transcription collaborator configured");
            return Ok(ProviderOutcome::unavailable());
        };

        diag.attempt("yt-dlp");

        let cookie_file = match (&ctx.deps.cookies, extract_domain(ctx.url)) {
            (Some(cookies), Some(domain)) => cookies.cookie_file(&domain).await,
            _ => None,
        };
        if cookie_file.is_some() {
            diag.note("yt-dlp", NoteOutcome::Ok, "cookie file resolved for domain");
        }

        let duration_hint = match downloader.probe(ctx.url).await {
            Ok(info) => info.get("duration").and_then(Value::as_f64),
            Err(err) => {
                tracing::debug!(%err, "probe failed, continuing without duration hint");
                None
            }
        };

        let scratch = ScratchFile::reserve(&ctx.deps.scratch_dir, "mp3");
        downloader
            .download_audio(ctx.url, scratch.path(), cookie_file.as_deref())
            .await
            .map_err(|err| anyhow::anyhow!("media download failed: {}", err))?;

        let outcome = transcriber
            .transcribe(
                TranscriptionRequest::new(scratch.path().to_path_buf(), "audio/mpeg")
                    .with_duration_hint(duration_hint),
            )
            .await?;

        if let Some(error) = outcome.error {
            anyhow::bail!("media transcription failed: {}", error);
        }
        if outcome.text.trim().is_empty() {
            diag.note("yt-dlp", NoteOutcome::SoftMiss, "transcription produced no text");
            return Ok(ProviderOutcome::unavailable());
        }

        diag.note("yt-dlp", NoteOutcome::Ok, format!("transcribed via {}", outcome.provider_id));
        Ok(ProviderOutcome {
            text: Some(outcome.text),
            source: TranscriptSource::YtDlp,
            metadata: Some(serde_json::json!({
                "transcriptionProvider": outcome.provider_id,
                "mediaDurationSeconds": duration_hint,
            })),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcribe::{
        MediaDownloader, Transcriber, TranscriptionCredentials, TranscriptionOutcome,
        TranscriptionRequest,
    };
    use crate::transcript::{TranscriptDeps, TranscriptOptions};
    use std::path::Path;
    use std::sync::Arc;

    struct FakeDownloader;

    #[async_trait]
    impl MediaDownloader for FakeDownloader {
        async fn probe(&self, _url: &str) -> Result<serde_json::Value> {
            Ok(serde_json::json!({"duration": 42.5}))
        }

        async fn download_audio(&self, _url: &str, dest: &Path, _cookies: Option<&Path>) -> Result<()> {
            fs_err::write(dest, b"fake audio bytes")?;
            Ok(())
        }
    }

    struct FakeTranscriber;

    #[async_trait]
    impl Transcriber for FakeTranscriber {
        async fn transcribe(&self, request: TranscriptionRequest) -> Result<TranscriptionOutcome> {
            assert!(request.file_path.exists());
            assert_eq!(request.duration_hint, Some(42.5));
            Ok(TranscriptionOutcome {
                text: "spoken words from the clip".into(),
                provider_id: "groq".into(),
                error: None,
            })
        }
    }

    fn deps(downloader: bool, transcriber: bool) -> TranscriptDeps {
        TranscriptDeps {
            http: reqwest::Client::new(),
            downloader: downloader.then(|| Arc::new(FakeDownloader) as Arc<dyn MediaDownloader>),
            transcriber: transcriber.then(|| Arc::new(FakeTranscriber) as Arc<dyn Transcriber>),
            apify: None,
            cookies: None,
            credentials: TranscriptionCredentials {
                groq_api_key: Some("k".into()),
                ..Default::default()
            },
            scratch_dir: std::env::temp_dir(),
        }
    }

    fn options(prefer: bool) -> TranscriptOptions {
        TranscriptOptions {
            prefer_media_transcript: prefer,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_not_applicable_leaves_cascade_unrun() {
        let provider = GenericProvider;
        let deps = deps(true, true);
        let opts = options(false);
        let ctx = ProviderContext {
            url: "https://example.com/post",
            html: Some("<p>plain article</p>"),
            deps: &deps,
            options: &opts,
        };
        let mut diag = TranscriptDiagnostics::default();
        let outcome = provider.resolve(&ctx, &mut diag).await.unwrap();
        assert_eq!(outcome.source, TranscriptSource::Unknown);
        assert!(diag.attempted_providers.is_empty());
    }

    #[tokio::test]
    async fn test_twitter_without_downloader_names_the_gap() {
        let provider = GenericProvider;
        let deps = deps(false, true);
        let opts = options(true);
        let ctx = ProviderContext {
            url: "https://x.com/user/status/123",
            html: None,
            deps: &deps,
            options: &opts,
        };
        let mut diag = TranscriptDiagnostics::default();
        let err = provider.resolve(&ctx, &mut diag).await.unwrap_err();
        match err.downcast_ref::<ResolveError>() {
            Some(ResolveError::MissingCredentials(reason)) => assert_eq!(reason, "missing_yt_dlp"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_sourceless_media_page_transcribed() {
        let provider = GenericProvider;
        let deps = deps(true, true);
        let opts = options(true);
        let ctx = ProviderContext {
            url: "https://example.com/clip",
            html: Some(r#"<video controls width="640"></video>"#),
            deps: &deps,
            options: &opts,
        };
        let mut diag = TranscriptDiagnostics::default();
        let outcome = provider.resolve(&ctx, &mut diag).await.unwrap();
        assert_eq!(outcome.source, TranscriptSource::YtDlp);
        assert_eq!(outcome.text.as_deref(), Some("spoken words from the clip"));
        assert_eq!(diag.attempted_providers, vec!["yt-dlp"]);
    }
}
