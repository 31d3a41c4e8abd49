//! Linkscribe - resolve a URL (or local media file) into the best available
//! text content, plus a transcript when the source is audio/video.
//!
//! The core is the link content resolution engine: an orchestrator that picks
//! among competing extraction and transcription strategies (readability HTML,
//! Firecrawl, YouTube caption cascades, podcast RSS transcripts, whisper-style
//! transcription) and records which path was taken in structured diagnostics.

pub mod cache;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod firecrawl;
pub mod html;
pub mod output;
pub mod resolve;
pub mod transcribe;
pub mod transcript;
pub mod twitter;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use diagnostics::{CacheMode, CacheStatus, ContentFetchDiagnostics, FetchStrategy};
pub use resolve::finalize::ResolvedContent;
pub use resolve::{LinkResolver, ResolveOptions, ResolverDeps};
pub use transcript::{TranscriptResolution, TranscriptSource};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error taxonomy for content resolution
///
/// Soft failures inside a cascade never surface here; only terminal outcomes
/// do, and each variant carries enough context to know why.
#[derive(thiserror::Error, Debug)]
pub enum ResolveError {
    #[error("Unsupported URL format: {0}")]
    UnsupportedUrl(String),

    #[error("Network failure fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Blocked content detected at {url}: {marker}")]
    BlockedContent { url: String, marker: String },

    #[error("Extraction produced no usable content for {0}")]
    ContentEmpty(String),

    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    #[error("Every strategy exhausted for {url}: {attempts}")]
    ProviderExhausted { url: String, attempts: String },
}
