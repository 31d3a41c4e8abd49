use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use linkscribe::cache::MemoryCache;
use linkscribe::cli::{Cli, Commands};
use linkscribe::config::Config;
use linkscribe::diagnostics::CacheMode;
use linkscribe::firecrawl::HttpFirecrawlClient;
use linkscribe::html::{BasicArticleParser, HtmlFetcher};
use linkscribe::resolve::{LinkResolver, NoopProgress, ProgressEvent, ProgressSink, ResolveOptions, ResolverDeps};
use linkscribe::transcribe::{CloudTranscriber, YtDlpDownloader};
use linkscribe::{output, utils};

/// Spinner-backed progress sink for interactive runs
struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .unwrap(),
        );
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

impl ProgressSink for SpinnerProgress {
    fn emit(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::FetchStart { url } => self.bar.set_message(format!("Fetching {}...", url)),
            ProgressEvent::FetchDone => self.bar.set_message("Fetched"),
            ProgressEvent::FirecrawlStart => self.bar.set_message("Rendering via Firecrawl..."),
            ProgressEvent::FirecrawlDone => self.bar.set_message("Firecrawl done"),
            ProgressEvent::BirdStart => self.bar.set_message("Looking up tweet..."),
            ProgressEvent::NitterStart { mirror } => {
                self.bar.set_message(format!("Trying Nitter mirror {}...", mirror))
            }
            ProgressEvent::TranscriptStart => self.bar.set_message("Resolving transcript..."),
            ProgressEvent::TranscriptDone => self.bar.finish_and_clear(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "linkscribe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::load().await?;

    let yt_dlp_path = config
        .app
        .yt_dlp_path
        .clone()
        .unwrap_or_else(|| "yt-dlp".into());

    match cli.command {
        Commands::Resolve {
            url,
            output: output_path,
            format,
            max_characters,
            bypass_cache,
            firecrawl,
            transcript_mode,
            prefer_media_transcript,
        } => {
            // Check for required external dependencies (non-fatal in Docker)
            let missing_deps = utils::check_dependencies(&yt_dlp_path.to_string_lossy()).await;
            if !missing_deps.is_empty() {
                eprintln!("{}", console::style("⚠️  Dependency check warnings:").yellow());
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            let client = reqwest::Client::new();
            let credentials = config.transcription_credentials();

            let progress: Arc<dyn ProgressSink> = if cli.quiet {
                Arc::new(NoopProgress)
            } else {
                Arc::new(SpinnerProgress::new())
            };

            let deps = ResolverDeps {
                fetcher: Arc::new(HtmlFetcher::new(
                    client.clone(),
                    Duration::from_secs(config.http.fetch_timeout_seconds),
                    config.http.user_agent.clone(),
                )),
                cache: Arc::new(MemoryCache::new()),
                article_parser: Arc::new(BasicArticleParser),
                firecrawl: config.firecrawl.api_key.clone().map(|key| {
                    Arc::new(
                        HttpFirecrawlClient::new(client.clone(), key)
                            .with_base_url(config.firecrawl.base_url.clone()),
                    ) as _
                }),
                bird: None,
                apify: None,
                downloader: Some(Arc::new(YtDlpDownloader::new(yt_dlp_path))),
                transcriber: credentials
                    .preferred_cloud()
                    .is_some()
                    .then(|| Arc::new(CloudTranscriber::new(client.clone(), credentials)) as _),
                cookies: None,
                progress,
            };

            let options = ResolveOptions {
                cache_mode: if bypass_cache {
                    CacheMode::Bypass
                } else {
                    CacheMode::Default
                },
                firecrawl_mode: firecrawl,
                max_characters,
                youtube_mode: transcript_mode,
                prefer_media_transcript,
                wants_segments: false,
                overall_timeout: None,
            };

            let resolver = LinkResolver::new(config, deps)?;

            tracing::info!("Resolving content for URL: {}", url);

            let result = resolver.resolve(&url, &options).await?;

            match output_path {
                Some(path) => {
                    output::save_to_file(&result, &path, format).await?;
                    println!("Resolution saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&result, format)?;
                }
            }
        }
        Commands::Config { show } => {
            if show {
                config.display();
            } else {
                println!("Edit the config file manually, then re-run with --show to verify.");
            }
        }
        Commands::Platforms => {
            println!("Supported platforms:");
            println!("  • Web articles (any HTTP/HTTPS page)");
            println!("  • YouTube (youtube.com, youtu.be, shorts, live)");
            println!("  • Podcasts (Apple Podcasts, Spotify episodes, RSS feeds)");
            println!("  • Twitter/X statuses (twitter.com, x.com)");
            println!("  • Bot-walled pages via Firecrawl (with an API key)");
        }
    }

    Ok(())
}
