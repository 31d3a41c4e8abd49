use regex::Regex;
use std::time::Duration;

use crate::{ResolveError, Result};

/// Markers that identify anti-bot interstitials rather than real content
///
/// Matched case-insensitively against normalized plain text.
const BLOCKED_MARKERS: &[&str] = &[
    "attention required! | cloudflare",
    "checking your browser before accessing",
    "verify you are human",
    "please enable javascript to continue",
    "enable javascript and cookies to continue",
    "access denied",
    "captcha",
    "are you a robot",
    "request blocked",
];

/// Find the blocked-page marker present in a plain-text rendering, if any
pub fn find_blocked_marker(text: &str) -> Option<&'static str> {
    let lowered = text.to_lowercase();
    BLOCKED_MARKERS
        .iter()
        .find(|marker| lowered.contains(*marker))
        .copied()
}

/// Article fields produced by readability-style extraction
#[derive(Debug, Clone, Default)]
pub struct ExtractedArticle {
    pub text: String,
    pub html: String,
    pub title: Option<String>,
    pub excerpt: Option<String>,
}

/// Readability collaborator: HTML (+ optional base URL) in, article out
///
/// A full Mozilla-readability port can be injected here; the built-in
/// implementation is a conservative tag stripper that is good enough for the
/// fallback-policy length checks and plain pages.
pub trait ArticleParser: Send + Sync {
    fn parse(&self, html: &str, base_url: Option<&str>) -> Option<ExtractedArticle>;
}

/// Built-in tag-stripping parser
pub struct BasicArticleParser;

impl ArticleParser for BasicArticleParser {
    fn parse(&self, html: &str, _base_url: Option<&str>) -> Option<ExtractedArticle> {
        let text = html_to_text(html);
        if text.is_empty() {
            return None;
        }
        let title = extract_title(html);
        let excerpt = meta_content(html, "description")
            .or_else(|| Some(text.chars().take(200).collect()).filter(|s: &String| !s.is_empty()));
        Some(ExtractedArticle {
            text,
            html: html.to_string(),
            title,
            excerpt,
        })
    }
}

/// Strip scripts, styles, and tags; decode common entities; collapse space
pub fn html_to_text(html: &str) -> String {
    // Non-greedy block removal keeps this robust against unclosed markup
    let mut without_blocks = html.to_string();
    for tag in ["script", "style", "noscript", "template"] {
        let block_re = Regex::new(&format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}>")).expect("static regex");
        without_blocks = block_re.replace_all(&without_blocks, " ").into_owned();
    }

    let comment_re = Regex::new(r"(?s)<!--.*?-->").expect("static regex");
    let without_comments = comment_re.replace_all(&without_blocks, " ");

    let block_break_re =
        Regex::new(r"(?i)</?(p|div|br|li|h[1-6]|tr|section|article)\b[^>]*>").expect("static regex");
    let with_breaks = block_break_re.replace_all(&without_comments, "\n");

    let tag_re = Regex::new(r"(?s)<[^>]+>").expect("static regex");
    let stripped = tag_re.replace_all(&with_breaks, " ");

    let decoded = decode_entities(&stripped);

    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    text.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&nbsp;", " ")
}

/// Page title: og:title first, then the `<title>` element
pub fn extract_title(html: &str) -> Option<String> {
    meta_property(html, "og:title").or_else(|| {
        let re = Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("static regex");
        re.captures(html)
            .map(|c| decode_entities(c[1].trim()))
            .filter(|t| !t.is_empty())
    })
}

pub fn extract_site_name(html: &str) -> Option<String> {
    meta_property(html, "og:site_name")
}

pub fn extract_description(html: &str) -> Option<String> {
    meta_property(html, "og:description").or_else(|| meta_content(html, "description"))
}

/// Whether the page declares itself a video (og:type/og:video)
pub fn declares_video(html: &str) -> bool {
    meta_property(html, "og:type")
        .map(|t| t.contains("video"))
        .unwrap_or(false)
        || meta_property(html, "og:video").is_some()
        || meta_property(html, "og:video:url").is_some()
}

/// Whether the page embeds a media tag with no usable source URL
///
/// Those pages need a downloader-backed transcript rather than HTML text.
pub fn has_sourceless_media_tag(html: &str) -> bool {
    let tag_re = Regex::new(r"(?is)<(video|audio)\b([^>]*)>").expect("static regex");
    for caps in tag_re.captures_iter(html) {
        let attrs = &caps[2];
        if !attrs.to_lowercase().contains("src=") {
            return true;
        }
    }
    false
}

fn meta_property(html: &str, property: &str) -> Option<String> {
    let patterns = [
        format!(
            r#"(?is)<meta[^>]+property=["']{}["'][^>]+content=["']([^"']+)["']"#,
            regex::escape(property)
        ),
        format!(
            r#"(?is)<meta[^>]+content=["']([^"']+)["'][^>]+property=["']{}["']"#,
            regex::escape(property)
        ),
    ];
    for pattern in patterns {
        if let Some(caps) = Regex::new(&pattern).expect("static pattern").captures(html) {
            let value = decode_entities(caps[1].trim());
            if !value.is_empty() {
                return Some(value);
            }
        }
    }
    None
}

fn meta_content(html: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?is)<meta[^>]+name=["']{}["'][^>]+content=["']([^"']+)["']"#,
        regex::escape(name)
    );
    Regex::new(&pattern)
        .expect("static pattern")
        .captures(html)
        .map(|c| decode_entities(c[1].trim()))
        .filter(|v| !v.is_empty())
}

/// Document fetch seam; injectable so the orchestrator is testable offline
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// Bounded HTML fetcher
#[derive(Clone)]
pub struct HtmlFetcher {
    client: reqwest::Client,
    timeout: Duration,
    user_agent: String,
}

impl HtmlFetcher {
    pub fn new(client: reqwest::Client, timeout: Duration, user_agent: impl Into<String>) -> Self {
        Self {
            client,
            timeout,
            user_agent: user_agent.into(),
        }
    }

}

#[async_trait::async_trait]
impl PageFetcher for HtmlFetcher {
    /// Fetch a document, mapping transport failures to `ResolveError::Network`
    async fn fetch(&self, url: &str) -> Result<String> {
        tracing::debug!(url, "fetching document");
        let response = self
            .client
            .get(url)
            .header("User-Agent", &self.user_agent)
            .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| ResolveError::Network {
                url: url.to_string(),
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(ResolveError::Network {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            }
            .into());
        }

        response.text().await.map_err(|err| {
            ResolveError::Network {
                url: url.to_string(),
                reason: err.to_string(),
            }
            .into()
        })
    }
}
