use serde::{Deserialize, Serialize};

use crate::diagnostics::ContentFetchDiagnostics;
use crate::transcript::{TranscriptResolution, TranscriptSource};
use crate::utils::{line_count, strip_title_prefix, truncate_chars, word_count};

/// Page-level metadata carried into the final result
#[derive(Debug, Clone, Default)]
pub struct PageMeta {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub video: Option<serde_json::Value>,
    pub is_video_only: bool,
    pub media_duration_seconds: Option<f64>,
}

/// The resolved content for one URL, immutable once returned
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedContent {
    pub url: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
    pub content: String,
    pub truncated: bool,
    pub total_characters: usize,
    pub word_count: usize,
    pub transcript_characters: Option<usize>,
    pub transcript_word_count: Option<usize>,
    pub transcript_lines: Option<usize>,
    pub transcript_source: Option<TranscriptSource>,
    pub transcription_provider: Option<String>,
    pub transcript_metadata: Option<serde_json::Value>,
    pub media_duration_seconds: Option<f64>,
    pub video: Option<serde_json::Value>,
    pub is_video_only: bool,
    pub diagnostics: ContentFetchDiagnostics,
}

/// Merge base content with a transcript and assemble the final result
///
/// A non-empty transcript replaces the base content outright: for
/// audio/video sources the transcript is the authoritative representation,
/// and the page text is demoted to description metadata. Counts are computed
/// after truncation so reported numbers always match what is returned.
pub fn finalize(
    base_content: &str,
    transcript: Option<&TranscriptResolution>,
    max_characters: usize,
    meta: PageMeta,
    diagnostics: ContentFetchDiagnostics,
) -> ResolvedContent {
    let base = base_content.trim();
    let transcript_text = transcript
        .filter(|t| t.has_text())
        .and_then(|t| t.text.as_deref())
        .map(str::trim);

    let mut description = meta.description.clone();
    let chosen = match transcript_text {
        Some(text) => {
            if description.is_none() && !base.is_empty() {
                description = Some(base.to_string());
            }
            text.to_string()
        }
        None => match meta.title.as_deref() {
            Some(title) => strip_title_prefix(base, title),
            None => base.to_string(),
        },
    };

    let (content, truncated) = truncate_chars(&chosen, max_characters);
    let total_characters = content.chars().count();
    let words = word_count(&content);

    let (transcript_characters, transcript_word_count, transcript_lines) = match transcript_text {
        Some(text) => (
            Some(text.chars().count()),
            Some(word_count(text)),
            Some(line_count(text)),
        ),
        None => (None, None, None),
    };

    let transcript_source = transcript
        .map(|t| t.source)
        .filter(|s| *s != TranscriptSource::Unknown);
    let transcript_metadata = transcript.and_then(|t| t.metadata.clone());
    let transcription_provider = transcript_metadata
        .as_ref()
        .and_then(|m| m.get("transcriptionProvider"))
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let media_duration_seconds = meta.media_duration_seconds.or_else(|| {
        transcript_metadata
            .as_ref()
            .and_then(|m| m.get("mediaDurationSeconds"))
            .and_then(|v| v.as_f64())
    });

    ResolvedContent {
        url: meta.url,
        title: meta.title,
        description,
        site_name: meta.site_name,
        content,
        truncated,
        total_characters,
        word_count: words,
        transcript_characters,
        transcript_word_count,
        transcript_lines,
        transcript_source,
        transcription_provider,
        transcript_metadata,
        media_duration_seconds,
        video: meta.video,
        is_video_only: meta.is_video_only,
        diagnostics,
    }
}
