use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheGateway, TranscriptStore};
use crate::config::Config;
use crate::diagnostics::{
    CacheMode, ContentFetchDiagnostics, DiagnosticNote, FetchStrategy, NoteOutcome,
};
use crate::firecrawl::{should_fallback, FirecrawlClient, FirecrawlMode, FirecrawlPayload};
use crate::html::{
    declares_video, extract_description, extract_site_name, extract_title, find_blocked_marker,
    html_to_text, ArticleParser, PageFetcher,
};
use crate::transcribe::{ApifyClient, CookieResolver, MediaDownloader, Transcriber};
use crate::transcript::podcast::is_captcha_walled_platform;
use crate::transcript::youtube::video_id;
use crate::transcript::{
    TranscriptDeps, TranscriptDispatcher, TranscriptOptions, TranscriptResolution, YoutubeMode,
};
use crate::twitter::{is_status_url, mirror_url, rotated_mirrors, tweet_path_and_query, BirdClient};
use crate::{ResolveError, Result};

pub mod finalize;

use finalize::{finalize, PageMeta, ResolvedContent};

/// Best-effort observability notifications, emitted in call order
///
/// Listeners are optional; nothing about correctness depends on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    FetchStart { url: String },
    FetchDone,
    FirecrawlStart,
    FirecrawlDone,
    BirdStart,
    NitterStart { mirror: String },
    TranscriptStart,
    TranscriptDone,
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: &ProgressEvent);
}

/// Default sink: drop everything
pub struct NoopProgress;

impl ProgressSink for NoopProgress {
    fn emit(&self, _event: &ProgressEvent) {}
}

/// Injected collaborators for one resolver instance
///
/// Everything is an explicit handle threaded through the calls; there is no
/// module-level state, so independent resolvers coexist in one process and
/// tests get deterministic wiring.
#[derive(Clone)]
pub struct ResolverDeps {
    pub fetcher: Arc<dyn PageFetcher>,
    pub cache: Arc<dyn CacheGateway>,
    pub article_parser: Arc<dyn ArticleParser>,
    pub firecrawl: Option<Arc<dyn FirecrawlClient>>,
    pub bird: Option<Arc<dyn BirdClient>>,
    pub apify: Option<Arc<dyn ApifyClient>>,
    pub downloader: Option<Arc<dyn MediaDownloader>>,
    pub transcriber: Option<Arc<dyn Transcriber>>,
    pub cookies: Option<Arc<dyn CookieResolver>>,
    pub progress: Arc<dyn ProgressSink>,
}

/// Per-call options
#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    pub cache_mode: CacheMode,
    pub firecrawl_mode: Option<FirecrawlMode>,
    pub max_characters: Option<usize>,
    pub youtube_mode: YoutubeMode,
    pub prefer_media_transcript: bool,
    pub wants_segments: bool,
    pub overall_timeout: Option<Duration>,
}

/// Top-level link content resolution engine
pub struct LinkResolver {
    config: Config,
    deps: ResolverDeps,
    dispatcher: TranscriptDispatcher,
    transcript_deps: TranscriptDeps,
    _scratch: tempfile::TempDir,
}

impl LinkResolver {
    pub fn new(config: Config, deps: ResolverDeps) -> Result<Self> {
        let scratch = tempfile::TempDir::new()?;
        let store = TranscriptStore::new(
            deps.cache.clone(),
            chrono::Duration::hours(config.cache.transcript_ttl_hours),
            chrono::Duration::hours(config.cache.negative_ttl_hours),
        );
        let transcript_deps = TranscriptDeps {
            http: reqwest::Client::new(),
            downloader: deps.downloader.clone(),
            transcriber: deps.transcriber.clone(),
            apify: deps.apify.clone(),
            cookies: deps.cookies.clone(),
            credentials: config.transcription_credentials(),
            scratch_dir: scratch.path().to_path_buf(),
        };
        Ok(Self {
            config,
            deps,
            dispatcher: TranscriptDispatcher::new(store),
            transcript_deps,
            _scratch: scratch,
        })
    }

    /// Resolve a URL into content plus transcript, bounded by the overall
    /// deadline; the cascade never resumes after the deadline elapses
    pub async fn resolve(&self, url: &str, options: &ResolveOptions) -> Result<ResolvedContent> {
        let deadline = options
            .overall_timeout
            .unwrap_or(Duration::from_secs(self.config.http.overall_timeout_seconds));

        let mut diag = ContentFetchDiagnostics::new(options.cache_mode);
        let outcome =
            tokio::time::timeout(deadline, self.resolve_inner(url, options, &mut diag)).await;
        match outcome {
            Ok(result) => result,
            Err(_) => {
                // The partial audit trail still matters to the caller; attach
                // whatever the cascade recorded before the deadline fired
                let notes = rendered_notes(&diag);
                let mut reason = format!("overall deadline of {:?} elapsed mid-cascade", deadline);
                if !notes.is_empty() {
                    reason = format!("{} ({})", reason, notes.join("; "));
                }
                Err(ResolveError::Network {
                    url: url.to_string(),
                    reason,
                }
                .into())
            }
        }
    }

    async fn resolve_inner(
        &self,
        url: &str,
        options: &ResolveOptions,
        diag: &mut ContentFetchDiagnostics,
    ) -> Result<ResolvedContent> {
        let url = crate::utils::validate_and_normalize_url(url)?;
        let firecrawl_mode = options.firecrawl_mode.unwrap_or(self.config.firecrawl.mode);
        let max_characters = options.max_characters.unwrap_or(self.config.app.max_characters);
        let transcript_options = TranscriptOptions {
            cache_mode: options.cache_mode,
            youtube_mode: options.youtube_mode,
            prefer_media_transcript: options.prefer_media_transcript,
            wants_segments: options.wants_segments,
        };

        // Platform short-circuit: these episode pages are captcha walls, so
        // fetching them would only ever yield garbage "content". Require a
        // transcription path up front instead of failing late.
        if is_captcha_walled_platform(&url) {
            if self.transcript_deps.transcriber.is_none()
                || !self.transcript_deps.credentials.has_any()
            {
                return Err(ResolveError::MissingCredentials(
                    "podcast platform page requires a transcription credential (OpenAI, Groq, FAL, or a local whisper model)"
                        .into(),
                )
                .into());
            }
            let meta = PageMeta {
                url: url.clone(),
                ..Default::default()
            };
            return self
                .finish(&url, None, String::new(), max_characters, FetchStrategy::Html, diag, meta, &transcript_options, true)
                .await;
        }

        let mut chosen: Option<(FetchStrategy, String)> = None;
        let mut page_html: Option<String> = None;
        let mut meta = PageMeta {
            url: url.clone(),
            ..Default::default()
        };

        // Twitter cascade: bird collaborator, then Nitter mirrors, then
        // ordinary HTML like any other page
        if is_status_url(&url) {
            if let Some(bird) = &self.deps.bird {
                self.deps.progress.emit(&ProgressEvent::BirdStart);
                match bird.fetch_status(&url).await {
                    Ok(status) if !status.text.trim().is_empty() => {
                        diag.set_strategy(FetchStrategy::Bird);
                        meta.title = status.author_name.clone().map(|name| match &status.author_handle {
                            Some(handle) => format!("{} (@{})", name, handle),
                            None => name,
                        });
                        chosen = Some((FetchStrategy::Bird, status.text));
                    }
                    Ok(_) => {
                        diag.markdown_note("bird", NoteOutcome::SoftMiss, "bird returned empty status text");
                    }
                    Err(err) => {
                        diag.markdown_note("bird", NoteOutcome::SoftMiss, err.to_string());
                    }
                }
            }

            if chosen.is_none() {
                if let Some(path_and_query) = tweet_path_and_query(&url) {
                    for mirror in rotated_mirrors(&path_and_query, &self.config.nitter.mirrors) {
                        self.deps.progress.emit(&ProgressEvent::NitterStart {
                            mirror: mirror.to_string(),
                        });
                        let mirror_target = mirror_url(mirror, &path_and_query);
                        match self.deps.fetcher.fetch(&mirror_target).await {
                            Ok(html) => {
                                let plain = html_to_text(&html);
                                if find_blocked_marker(&plain).is_none() && !plain.trim().is_empty() {
                                    diag.set_strategy(FetchStrategy::Nitter);
                                    diag.markdown_note(
                                        "nitter",
                                        NoteOutcome::Ok,
                                        format!("mirror {} served the status", mirror),
                                    );
                                    page_html = Some(html);
                                    break;
                                }
                                diag.markdown_note(
                                    "nitter",
                                    NoteOutcome::SoftMiss,
                                    format!("mirror {} blocked or empty", mirror),
                                );
                            }
                            Err(err) => {
                                diag.markdown_note(
                                    "nitter",
                                    NoteOutcome::SoftMiss,
                                    format!("mirror {}: {}", mirror, err),
                                );
                            }
                        }
                    }
                }
            }
        }

        // Firecrawl-always goes before any direct fetch
        if chosen.is_none() && page_html.is_none() && firecrawl_mode == FirecrawlMode::Always {
            if let Some(payload) = self.attempt_firecrawl(&url, diag).await {
                apply_firecrawl_meta(&mut meta, &payload);
                if let Some(content) = payload.content() {
                    diag.set_strategy(FetchStrategy::Firecrawl);
                    diag.firecrawl.used = true;
                    chosen = Some((FetchStrategy::Firecrawl, content.to_string()));
                }
            }
        }

        // Direct HTML fetch, with Firecrawl as the rescue path on failure
        if chosen.is_none() && page_html.is_none() {
            self.deps.progress.emit(&ProgressEvent::FetchStart { url: url.clone() });
            match self.deps.fetcher.fetch(&url).await {
                Ok(html) => {
                    self.deps.progress.emit(&ProgressEvent::FetchDone);
                    page_html = Some(html);
                }
                Err(fetch_err) => {
                    if firecrawl_mode != FirecrawlMode::Off {
                        if let Some(payload) = self.attempt_firecrawl(&url, diag).await {
                            apply_firecrawl_meta(&mut meta, &payload);
                            if let Some(content) = payload.content() {
                                diag.set_strategy(FetchStrategy::Firecrawl);
                                diag.firecrawl.used = true;
                                chosen = Some((FetchStrategy::Firecrawl, content.to_string()));
                            }
                        }
                    }
                    if chosen.is_none() {
                        let firecrawl_notes: Vec<String> =
                            diag.firecrawl.notes.iter().map(|n| n.render()).collect();
                        let mut reason = fetch_err.to_string();
                        if !firecrawl_notes.is_empty() {
                            reason = format!("{} ({})", reason, firecrawl_notes.join("; "));
                        }
                        return Err(ResolveError::Network { url, reason }.into());
                    }
                }
            }
        }

        // Firecrawl-auto: with HTML in hand, let the decision policy choose
        if chosen.is_none() {
            if let Some(html) = page_html.as_deref() {
                if firecrawl_mode == FirecrawlMode::Auto
                    && self.deps.firecrawl.is_some()
                    && should_fallback(html)
                {
                    if let Some(payload) = self.attempt_firecrawl(&url, diag).await {
                        apply_firecrawl_meta(&mut meta, &payload);
                        if let Some(content) = payload.content() {
                            diag.set_strategy(FetchStrategy::Firecrawl);
                            diag.firecrawl.used = true;
                            chosen = Some((FetchStrategy::Firecrawl, content.to_string()));
                        }
                    }
                }
            }
        }

        // Extract article text from whichever HTML survived
        if chosen.is_none() {
            let html = page_html.as_deref().ok_or_else(|| ResolveError::ContentEmpty(url.clone()))?;
            let plain = html_to_text(html);
            if let Some(marker) = find_blocked_marker(&plain) {
                return Err(ResolveError::BlockedContent {
                    url,
                    marker: marker.to_string(),
                }
                .into());
            }

            meta.title = meta.title.take().or_else(|| extract_title(html));
            meta.description = extract_description(html);
            meta.site_name = extract_site_name(html);
            meta.is_video_only = declares_video(html) && plain.split_whitespace().count() < 40;

            let strategy = diag.strategy.unwrap_or(FetchStrategy::Html);
            diag.set_strategy(strategy);
            let text = match self.deps.article_parser.parse(html, Some(&url)) {
                Some(article) => {
                    diag.markdown.used = true;
                    diag.markdown.provider = Some("readability".to_string());
                    if meta.title.is_none() {
                        meta.title = article.title;
                    }
                    article.text
                }
                None => plain,
            };
            chosen = Some((strategy, text));
        }

        let (strategy, base_content) = chosen.expect("a strategy was chosen or we returned early");
        diag.set_strategy(strategy);

        if let Some(id) = video_id(&url) {
            meta.video = Some(serde_json::json!({ "id": id }));
        }

        self.finish(
            &url,
            page_html.as_deref(),
            base_content,
            max_characters,
            strategy,
            diag,
            meta,
            &transcript_options,
            false,
        )
        .await
    }

    /// Run the transcript dispatcher and assemble the final result
    #[allow(clippy::too_many_arguments)]
    async fn finish(
        &self,
        url: &str,
        page_html: Option<&str>,
        base_content: String,
        max_characters: usize,
        strategy: FetchStrategy,
        diag: &mut ContentFetchDiagnostics,
        meta: PageMeta,
        transcript_options: &TranscriptOptions,
        require_transcript: bool,
    ) -> Result<ResolvedContent> {
        self.deps.progress.emit(&ProgressEvent::TranscriptStart);
        let resolution: Option<TranscriptResolution> = match self
            .dispatcher
            .resolve(url, page_html, &self.transcript_deps, transcript_options)
            .await
        {
            Ok(resolution) => Some(resolution),
            Err(err) if !require_transcript && !base_content.trim().is_empty() => {
                // HTML content still stands on its own; record the transcript
                // failure rather than discarding a usable page
                diag.transcript.note("dispatch", NoteOutcome::Error, err.to_string());
                None
            }
            Err(err) => return Err(err),
        };
        self.deps.progress.emit(&ProgressEvent::TranscriptDone);

        if let Some(resolution) = &resolution {
            diag.transcript = resolution.diagnostics.clone();
        }
        diag.set_strategy(strategy);

        if require_transcript && !resolution.as_ref().map(|r| r.has_text()).unwrap_or(false) {
            let attempts = resolution
                .as_ref()
                .map(|r| r.diagnostics.attempted_providers.join(", "))
                .unwrap_or_default();
            return Err(ResolveError::ProviderExhausted {
                url: url.to_string(),
                attempts,
            }
            .into());
        }

        Ok(finalize(
            &base_content,
            resolution.as_ref(),
            max_characters,
            meta,
            diag.clone(),
        ))
    }

    async fn attempt_firecrawl(
        &self,
        url: &str,
        diag: &mut ContentFetchDiagnostics,
    ) -> Option<FirecrawlPayload> {
        let client = self.deps.firecrawl.as_ref()?;
        self.deps.progress.emit(&ProgressEvent::FirecrawlStart);
        diag.firecrawl.attempted = true;
        match client.scrape(url).await {
            Ok(payload) => {
                self.deps.progress.emit(&ProgressEvent::FirecrawlDone);
                if payload.content().is_some() {
                    diag.firecrawl_note("scrape", NoteOutcome::Ok, "firecrawl returned content");
                    Some(payload)
                } else {
                    diag.firecrawl_note("scrape", NoteOutcome::SoftMiss, "firecrawl payload was empty");
                    None
                }
            }
            Err(err) => {
                diag.firecrawl_note("scrape", NoteOutcome::Error, err.to_string());
                None
            }
        }
    }
}

/// Every recorded note across the sub-diagnostics, rendered for error text
fn rendered_notes(diag: &ContentFetchDiagnostics) -> Vec<String> {
    diag.firecrawl
        .notes
        .iter()
        .chain(&diag.markdown.notes)
        .chain(&diag.transcript.notes)
        .map(DiagnosticNote::render)
        .collect()
}

fn apply_firecrawl_meta(meta: &mut PageMeta, payload: &FirecrawlPayload) {
    if meta.title.is_none() {
        meta.title = payload.title.clone();
    }
    if meta.description.is_none() {
        meta.description = payload.description.clone();
    }
    if meta.site_name.is_none() {
        meta.site_name = payload.site_name.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::html::BasicArticleParser;
    use crate::twitter::BirdStatus;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned HTML per URL and records every fetch
    struct FakeFetcher {
        pages: HashMap<String, String>,
        calls: Mutex<Vec<String>>,
    }

    impl FakeFetcher {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages.iter().map(|(u, h)| (u.to_string(), h.to_string())).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PageFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            self.calls.lock().unwrap().push(url.to_string());
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ResolveError::Network {
                    url: url.to_string(),
                    reason: "connection refused".into(),
                }
                .into())
        }
    }

    /// Answers every fetch after an hour; the overall deadline always wins
    struct HangingFetcher;

    #[async_trait]
    impl PageFetcher for HangingFetcher {
        async fn fetch(&self, url: &str) -> Result<String> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(ResolveError::Network {
                url: url.to_string(),
                reason: "connection refused".into(),
            }
            .into())
        }
    }

    struct FakeBird {
        status: Option<BirdStatus>,
    }

    #[async_trait]
    impl BirdClient for FakeBird {
        async fn fetch_status(&self, _url: &str) -> Result<BirdStatus> {
            self.status
                .clone()
                .ok_or_else(|| anyhow::anyhow!("bird lookup failed: upstream 503"))
        }
    }

    struct FakeFirecrawl {
        calls: Mutex<usize>,
    }

    #[async_trait]
    impl FirecrawlClient for FakeFirecrawl {
        async fn scrape(&self, _url: &str) -> Result<FirecrawlPayload> {
            *self.calls.lock().unwrap() += 1;
            Ok(FirecrawlPayload {
                markdown: Some("# Rendered\n\nFirecrawl rendered body text.".into()),
                title: Some("Rendered".into()),
                ..Default::default()
            })
        }
    }

    fn base_deps(fetcher: Arc<dyn PageFetcher>) -> ResolverDeps {
        ResolverDeps {
            fetcher,
            cache: Arc::new(MemoryCache::new()),
            article_parser: Arc::new(BasicArticleParser),
            firecrawl: None,
            bird: None,
            apify: None,
            downloader: None,
            transcriber: None,
            cookies: None,
            progress: Arc::new(NoopProgress),
        }
    }

    fn resolver(fetcher: Arc<FakeFetcher>, firecrawl: Option<Arc<FakeFirecrawl>>) -> LinkResolver {
        let mut deps = base_deps(fetcher);
        deps.firecrawl = firecrawl.map(|f| f as Arc<dyn FirecrawlClient>);
        LinkResolver::new(Config::default(), deps).unwrap()
    }

    #[tokio::test]
    async fn test_short_page_resolves_as_html_without_firecrawl() {
        let fetcher = Arc::new(FakeFetcher::new(&[(
            "https://example.com/",
            "<html><title>Example</title><body><p>just eight words of text on this page</p></body></html>",
        )]));
        let firecrawl = Arc::new(FakeFirecrawl { calls: Mutex::new(0) });
        let resolver = resolver(fetcher, Some(firecrawl.clone()));

        let result = resolver
            .resolve("https://example.com", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Html));
        assert!(!result.diagnostics.firecrawl.attempted);
        assert_eq!(*firecrawl.calls.lock().unwrap(), 0);
        assert!(result.content.contains("eight words"));
    }

    #[tokio::test]
    async fn test_blocked_page_falls_back_to_firecrawl() {
        let fetcher = Arc::new(FakeFetcher::new(&[(
            "https://example.com/wall",
            "<html><title>Attention Required! | Cloudflare</title><body>Attention Required! | Cloudflare</body></html>",
        )]));
        let firecrawl = Arc::new(FakeFirecrawl { calls: Mutex::new(0) });
        let resolver = resolver(fetcher, Some(firecrawl));

        let result = resolver
            .resolve("https://example.com/wall", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Firecrawl));
        assert!(result.diagnostics.firecrawl.used);
        assert!(result.content.contains("Firecrawl rendered body text"));
    }

    #[tokio::test]
    async fn test_blocked_page_without_firecrawl_is_typed_error() {
        let fetcher = Arc::new(FakeFetcher::new(&[(
            "https://example.com/wall",
            "<html><body>Attention Required! | Cloudflare</body></html>",
        )]));
        let resolver = resolver(fetcher, None);

        let err = resolver
            .resolve("https://example.com/wall", &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::BlockedContent { .. })
        ));
    }

    #[tokio::test]
    async fn test_spotify_without_credentials_fails_before_any_fetch() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let resolver = resolver(fetcher.clone(), None);

        let err = resolver
            .resolve(
                "https://open.spotify.com/episode/4rOoJ6Egrf8K2IrywzwOMk",
                &ResolveOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::MissingCredentials(_))
        ));
        assert!(fetcher.calls().is_empty(), "no network calls before the credential check");
    }

    #[tokio::test]
    async fn test_fetch_failure_without_firecrawl_surfaces_network_error() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let resolver = resolver(fetcher, None);

        let err = resolver
            .resolve("https://unreachable.example/page", &ResolveOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ResolveError>(),
            Some(ResolveError::Network { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_failure_rescued_by_firecrawl() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let firecrawl = Arc::new(FakeFirecrawl { calls: Mutex::new(0) });
        let resolver = resolver(fetcher, Some(firecrawl));

        let result = resolver
            .resolve("https://unreachable.example/page", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Firecrawl));
        assert!(result.content.contains("Firecrawl"));
    }

    #[tokio::test]
    async fn test_firecrawl_always_skips_direct_fetch() {
        let fetcher = Arc::new(FakeFetcher::new(&[(
            "https://example.com/page",
            "<html><body><p>direct body</p></body></html>",
        )]));
        let firecrawl = Arc::new(FakeFirecrawl { calls: Mutex::new(0) });
        let resolver = resolver(fetcher.clone(), Some(firecrawl));

        let options = ResolveOptions {
            firecrawl_mode: Some(FirecrawlMode::Always),
            ..Default::default()
        };
        let result = resolver.resolve("https://example.com/page", &options).await.unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Firecrawl));
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn test_max_characters_truncates() {
        let fetcher = Arc::new(FakeFetcher::new(&[(
            "https://example.com/",
            "<html><body><p>a reasonably long sentence that will get cut down</p></body></html>",
        )]));
        let resolver = resolver(fetcher, None);

        let options = ResolveOptions {
            max_characters: Some(10),
            ..Default::default()
        };
        let result = resolver.resolve("https://example.com", &options).await.unwrap();
        assert!(result.truncated);
        assert_eq!(result.content.chars().count(), 10);
        assert_eq!(result.total_characters, 10);
    }

    #[tokio::test]
    async fn test_bird_success_serves_status_without_mirror_fetches() {
        let fetcher = Arc::new(FakeFetcher::new(&[]));
        let mut deps = base_deps(fetcher.clone());
        deps.bird = Some(Arc::new(FakeBird {
            status: Some(BirdStatus {
                text: "tweet body text".into(),
                author_name: Some("Jane Doe".into()),
                author_handle: Some("jane".into()),
            }),
        }));
        let resolver = LinkResolver::new(Config::default(), deps).unwrap();

        let result = resolver
            .resolve("https://x.com/jane/status/99", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Bird));
        assert_eq!(result.title, Some("Jane Doe (@jane)".to_string()));
        assert!(result.content.contains("tweet body text"));
        assert!(fetcher.calls().is_empty(), "bird success skips mirrors and direct fetch");
    }

    #[tokio::test]
    async fn test_bird_failure_falls_through_to_nitter_rotation() {
        let config = Config::default();
        let path = "/jane/status/99";
        let rotated: Vec<String> = rotated_mirrors(path, &config.nitter.mirrors)
            .into_iter()
            .map(|mirror| mirror_url(mirror, path))
            .collect();
        let fetcher = Arc::new(FakeFetcher::new(&[(
            rotated[0].as_str(),
            "<html><title>Tweet</title><body><p>nitter served the status text</p></body></html>",
        )]));
        let mut deps = base_deps(fetcher.clone());
        deps.bird = Some(Arc::new(FakeBird { status: None }));
        let resolver = LinkResolver::new(config, deps).unwrap();

        let result = resolver
            .resolve("https://x.com/jane/status/99", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Nitter));
        assert!(result.content.contains("nitter served the status text"));
        assert_eq!(fetcher.calls(), vec![rotated[0].clone()]);
        assert!(result
            .diagnostics
            .markdown
            .notes
            .iter()
            .any(|note| note.step == "bird"));
    }

    #[tokio::test]
    async fn test_blocked_mirror_advances_to_next_in_rotation() {
        let config = Config::default();
        let path = "/jane/status/99";
        let rotated: Vec<String> = rotated_mirrors(path, &config.nitter.mirrors)
            .into_iter()
            .map(|mirror| mirror_url(mirror, path))
            .collect();
        let fetcher = Arc::new(FakeFetcher::new(&[
            (rotated[0].as_str(), "<html><body>verify you are human</body></html>"),
            (
                rotated[1].as_str(),
                "<html><body><p>second mirror served the status text</p></body></html>",
            ),
        ]));
        let resolver = LinkResolver::new(config, base_deps(fetcher.clone())).unwrap();

        let result = resolver
            .resolve("https://x.com/jane/status/99", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Nitter));
        assert!(result.content.contains("second mirror served"));
        assert_eq!(fetcher.calls(), vec![rotated[0].clone(), rotated[1].clone()]);
    }

    #[tokio::test]
    async fn test_all_mirrors_failing_falls_back_to_plain_html() {
        let config = Config::default();
        let mirror_count = config.nitter.mirrors.len();
        let fetcher = Arc::new(FakeFetcher::new(&[(
            "https://x.com/jane/status/99",
            "<html><title>Post</title><body><p>the page itself still renders the status</p></body></html>",
        )]));
        let resolver = LinkResolver::new(config, base_deps(fetcher.clone())).unwrap();

        let result = resolver
            .resolve("https://x.com/jane/status/99", &ResolveOptions::default())
            .await
            .unwrap();
        assert_eq!(result.diagnostics.strategy, Some(FetchStrategy::Html));
        assert!(result.content.contains("still renders the status"));
        let calls = fetcher.calls();
        assert_eq!(calls.len(), mirror_count + 1);
        assert_eq!(calls.last().unwrap(), "https://x.com/jane/status/99");
    }

    #[tokio::test]
    async fn test_deadline_error_carries_accumulated_notes() {
        let mut deps = base_deps(Arc::new(HangingFetcher));
        deps.bird = Some(Arc::new(FakeBird { status: None }));
        let resolver = LinkResolver::new(Config::default(), deps).unwrap();

        let options = ResolveOptions {
            overall_timeout: Some(Duration::from_millis(50)),
            ..Default::default()
        };
        let err = resolver
            .resolve("https://x.com/jane/status/99", &options)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("deadline"));
        assert!(message.contains("bird lookup failed"), "notes recorded before the deadline survive: {}", message);
    }
}
