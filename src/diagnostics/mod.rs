use serde::{Deserialize, Serialize};

/// Top-level strategy that produced the final content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchStrategy {
    Bird,
    Firecrawl,
    Html,
    Nitter,
}

/// Whether cache reads are honored for a request
///
/// `Bypass` skips reads only; successful fetches are still written back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheMode {
    #[default]
    Default,
    Bypass,
}

/// Outcome of the cache consultation for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStatus {
    Hit,
    Miss,
    Expired,
    Bypassed,
    /// Live fetch failed and a stale cache entry was substituted
    Fallback,
    #[default]
    Unknown,
}

/// How a recorded step ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteOutcome {
    Ok,
    /// Step found nothing but did not error; the cascade continued
    SoftMiss,
    Error,
    Skipped,
}

/// One structured, append-only diagnostic record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticNote {
    pub step: String,
    pub outcome: NoteOutcome,
    pub message: String,
}

impl DiagnosticNote {
    pub fn new(step: impl Into<String>, outcome: NoteOutcome, message: impl Into<String>) -> Self {
        Self {
            step: step.into(),
            outcome,
            message: message.into(),
        }
    }

    pub fn render(&self) -> String {
        format!("{}: {:?}: {}", self.step, self.outcome, self.message)
    }
}

/// Diagnostics for the Firecrawl leg of a resolution
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirecrawlDiagnostics {
    pub attempted: bool,
    pub used: bool,
    pub cache_mode: CacheMode,
    pub cache_status: CacheStatus,
    pub notes: Vec<DiagnosticNote>,
}

/// Diagnostics for markdown/article extraction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkdownDiagnostics {
    pub requested: bool,
    pub used: bool,
    pub provider: Option<String>,
    pub notes: Vec<DiagnosticNote>,
}

/// Diagnostics for the transcript cascade
///
/// `attempted_providers` is the audit trail of the cascade: strict attempt
/// order, never reordered or deduplicated. Tests assert on it directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptDiagnostics {
    pub cache_mode: CacheMode,
    pub cache_status: CacheStatus,
    pub text_provided: bool,
    pub provider: Option<String>,
    pub attempted_providers: Vec<String>,
    pub notes: Vec<DiagnosticNote>,
}

impl TranscriptDiagnostics {
    pub fn attempt(&mut self, provider: impl Into<String>) {
        self.attempted_providers.push(provider.into());
    }

    pub fn note(&mut self, step: &str, outcome: NoteOutcome, message: impl Into<String>) {
        self.notes.push(DiagnosticNote::new(step, outcome, message));
    }
}

/// Structured record of which strategy, provider, and cache path produced a
/// given result. Serialized shape is a stable external contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentFetchDiagnostics {
    pub strategy: Option<FetchStrategy>,
    pub firecrawl: FirecrawlDiagnostics,
    pub markdown: MarkdownDiagnostics,
    pub transcript: TranscriptDiagnostics,
}

impl Default for ContentFetchDiagnostics {
    fn default() -> Self {
        Self {
            strategy: None,
            firecrawl: FirecrawlDiagnostics::default(),
            markdown: MarkdownDiagnostics::default(),
            transcript: TranscriptDiagnostics::default(),
        }
    }
}

impl ContentFetchDiagnostics {
    pub fn new(cache_mode: CacheMode) -> Self {
        let mut d = Self::default();
        d.firecrawl.cache_mode = cache_mode;
        d.transcript.cache_mode = cache_mode;
        d
    }

    /// Record the winning strategy; first writer wins, never retracted
    pub fn set_strategy(&mut self, strategy: FetchStrategy) {
        if self.strategy.is_none() {
            self.strategy = Some(strategy);
        }
    }

    pub fn firecrawl_note(&mut self, step: &str, outcome: NoteOutcome, message: impl Into<String>) {
        self.firecrawl
            .notes
            .push(DiagnosticNote::new(step, outcome, message));
    }

    pub fn markdown_note(&mut self, step: &str, outcome: NoteOutcome, message: impl Into<String>) {
        self.markdown
            .notes
            .push(DiagnosticNote::new(step, outcome, message));
    }
}
