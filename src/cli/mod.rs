use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::firecrawl::FirecrawlMode;
use crate::transcript::YoutubeMode;

#[derive(Parser)]
#[command(
    name = "linkscribe",
    about = "Linkscribe - Resolve any URL into clean text and transcripts for LLM consumption",
    version,
    long_about = "Resolves a link into its best textual representation: article text for web pages, transcripts for YouTube videos, podcast episodes, and tweets with media. Falls back to Firecrawl rendering for bot-walled or script-heavy pages."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a URL into content and transcript
    Resolve {
        /// URL to resolve (web page, YouTube, podcast episode, or tweet)
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Maximum characters of content to keep
        #[arg(long, value_name = "CHARS")]
        max_characters: Option<usize>,

        /// Skip cache reads (fresh results are still written back)
        #[arg(long)]
        bypass_cache: bool,

        /// Firecrawl fallback mode
        #[arg(long, value_enum)]
        firecrawl: Option<FirecrawlMode>,

        /// Transcript strategy for YouTube URLs
        #[arg(long, value_enum, default_value = "auto")]
        transcript_mode: YoutubeMode,

        /// Transcribe embedded media instead of settling for page text
        #[arg(long)]
        prefer_media_transcript: bool,
    },

    /// Configure credentials and settings
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text with a diagnostics footer
    Text,
    /// Full resolution record as JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
