use anyhow::Result;
use std::path::Path;

use crate::cli::OutputFormat;
use crate::resolve::finalize::ResolvedContent;
use crate::utils::format_duration;

/// Save a resolution to file
pub async fn save_to_file(result: &ResolvedContent, path: &Path, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Text => format_as_text(result),
        OutputFormat::Json => format_as_json(result)?,
    };

    fs_err::write(path, content)?;
    Ok(())
}

/// Print a resolution to console
pub fn print_to_console(result: &ResolvedContent, format: OutputFormat) -> Result<()> {
    let content = match format {
        OutputFormat::Text => format_as_text(result),
        OutputFormat::Json => format_as_json(result)?,
    };

    println!("{}", content);
    Ok(())
}

/// Plain text: content first, then a short provenance footer
pub fn format_as_text(result: &ResolvedContent) -> String {
    let mut out = String::new();

    if let Some(title) = &result.title {
        out.push_str(title);
        out.push_str("\n\n");
    }
    out.push_str(&result.content);
    out.push('\n');

    out.push_str("\n---\n");
    out.push_str(&format!("url: {}\n", result.url));
    if let Some(site) = &result.site_name {
        out.push_str(&format!("site: {}\n", site));
    }
    if let Some(strategy) = &result.diagnostics.strategy {
        out.push_str(&format!("strategy: {:?}\n", strategy));
    }
    out.push_str(&format!(
        "characters: {}{}\n",
        result.total_characters,
        if result.truncated { " (truncated)" } else { "" }
    ));
    if let Some(source) = &result.transcript_source {
        out.push_str(&format!("transcript source: {:?}\n", source));
        if let Some(provider) = &result.transcription_provider {
            out.push_str(&format!("transcription provider: {}\n", provider));
        }
        if let Some(words) = result.transcript_word_count {
            out.push_str(&format!("transcript words: {}\n", words));
        }
    }
    if let Some(seconds) = result.media_duration_seconds {
        out.push_str(&format!("media duration: {}\n", format_duration(seconds)));
    }
    if !result.diagnostics.transcript.attempted_providers.is_empty() {
        out.push_str(&format!(
            "transcript attempts: {}\n",
            result.diagnostics.transcript.attempted_providers.join(", ")
        ));
    }

    out
}

/// The full resolution record, diagnostics included
pub fn format_as_json(result: &ResolvedContent) -> Result<String> {
    Ok(serde_json::to_string_pretty(result)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CacheMode, ContentFetchDiagnostics, FetchStrategy};

    fn sample() -> ResolvedContent {
        let mut diag = ContentFetchDiagnostics::new(CacheMode::Default);
        diag.set_strategy(FetchStrategy::Html);
        ResolvedContent {
            url: "https://example.com/".to_string(),
            title: Some("Example".to_string()),
            description: None,
            site_name: None,
            content: "body text".to_string(),
            truncated: false,
            total_characters: 9,
            word_count: 2,
            transcript_characters: None,
            transcript_word_count: None,
            transcript_lines: None,
            transcript_source: None,
            transcription_provider: None,
            transcript_metadata: None,
            media_duration_seconds: None,
            video: None,
            is_video_only: false,
            diagnostics: diag,
        }
    }

    #[test]
    fn test_text_format_has_content_and_footer() {
        let text = format_as_text(&sample());
        assert!(text.starts_with("Example\n\nbody text\n"));
        assert!(text.contains("url: https://example.com/"));
        assert!(text.contains("characters: 9\n"));
        assert!(!text.contains("transcript source"));
        assert!(!text.contains("media duration"));
    }

    #[test]
    fn test_text_footer_reports_media_duration() {
        let mut result = sample();
        result.media_duration_seconds = Some(90.0);
        let text = format_as_text(&result);
        assert!(text.contains("media duration: 1m 30s\n"));
    }

    #[test]
    fn test_json_format_uses_camel_case_contract() {
        let json = format_as_json(&sample()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["totalCharacters"], 9);
        assert_eq!(value["diagnostics"]["strategy"], "html");
    }
}
