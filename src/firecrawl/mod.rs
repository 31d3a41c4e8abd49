use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::html::{find_blocked_marker, html_to_text, ArticleParser, BasicArticleParser};
use crate::utils::normalize_whitespace;
use crate::Result;

/// When to reach for the hosted Firecrawl renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum FirecrawlMode {
    /// Consult the decision policy after a direct fetch
    #[default]
    Auto,
    /// Attempt Firecrawl before any direct fetch
    Always,
    /// Never call Firecrawl
    Off,
}

/// Typed payload returned by the Firecrawl collaborator
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirecrawlPayload {
    pub markdown: Option<String>,
    pub html: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub site_name: Option<String>,
}

impl FirecrawlPayload {
    /// The usable text body of the payload, markdown preferred
    pub fn content(&self) -> Option<&str> {
        self.markdown
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .or_else(|| self.html.as_deref().filter(|h| !h.trim().is_empty()))
    }
}

/// Firecrawl HTTP collaborator
#[async_trait]
pub trait FirecrawlClient: Send + Sync {
    async fn scrape(&self, url: &str) -> Result<FirecrawlPayload>;
}

/// Extracted-content length below which a page is considered thin
const GOOD_CONTENT_CHARS: usize = 200;

/// Raw-document length above which a thin page looks like an app shell
const LARGE_DOCUMENT_CHARS: usize = 5_000;

/// Decide whether raw HTML is trustworthy enough to use directly
///
/// Firecrawl calls cost money and latency, so the policy must never trigger
/// on legitimately short content. A blocked-page marker always triggers the
/// fallback. Otherwise, if readability-style extraction already yields at
/// least 200 normalized characters the HTML is good enough. A page that
/// fails that bar triggers the fallback only when the raw document is large:
/// a big document with nothing extractable is an app shell, while a small
/// one is just a short page.
pub fn should_fallback(html: &str) -> bool {
    let plain = html_to_text(html);
    if let Some(marker) = find_blocked_marker(&plain) {
        tracing::debug!(marker, "blocked-page marker found, recommending fallback");
        return true;
    }

    let extracted_len = BasicArticleParser
        .parse(html, None)
        .map(|article| normalize_whitespace(&article.text).chars().count())
        .unwrap_or(0);
    if extracted_len >= GOOD_CONTENT_CHARS {
        return false;
    }

    html.chars().count() >= LARGE_DOCUMENT_CHARS
}

/// Thin reqwest client for the hosted Firecrawl scrape endpoint
pub struct HttpFirecrawlClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl HttpFirecrawlClient {
    pub fn new(client: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.firecrawl.dev/v1".to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl FirecrawlClient for HttpFirecrawlClient {
    async fn scrape(&self, url: &str) -> Result<FirecrawlPayload> {
        let response = self
            .client
            .post(format!("{}/scrape", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({
                "url": url,
                "formats": ["markdown", "html"],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            anyhow::bail!("firecrawl scrape failed: HTTP {}", response.status());
        }

        let body: serde_json::Value = response.json().await?;
        let data = &body["data"];
        Ok(FirecrawlPayload {
            markdown: data["markdown"].as_str().map(str::to_string),
            html: data["html"].as_str().map(str::to_string),
            title: data["metadata"]["title"].as_str().map(str::to_string),
            description: data["metadata"]["description"].as_str().map(str::to_string),
            site_name: data["metadata"]["ogSiteName"].as_str().map(str::to_string),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paragraph(words: usize) -> String {
        (0..words).map(|i| format!("word{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_blocked_page_always_falls_back() {
        let html = "<html><body>Attention Required! | Cloudflare</body></html>";
        assert!(should_fallback(html));
    }

    #[test]
    fn test_good_content_never_falls_back() {
        let html = format!("<html><body><p>{}</p></body></html>", paragraph(60));
        assert!(!should_fallback(&html));
    }

    #[test]
    fn test_short_simple_page_stays_thin() {
        // 8-word page: thin, but the raw document is small, so no fallback
        let html = "<html><body><p>just a few words on this tiny page</p></body></html>";
        assert!(!should_fallback(html));
    }

    #[test]
    fn test_large_app_shell_falls_back() {
        let padding = "<script>window.__APP__ = 1;</script>".repeat(300);
        let html = format!("<html><head>{}</head><body><div id=\"root\"></div></body></html>", padding);
        assert!(html.chars().count() >= 5_000);
        assert!(should_fallback(&html));
    }

    #[test]
    fn test_payload_content_prefers_markdown() {
        let payload = FirecrawlPayload {
            markdown: Some("# md".into()),
            html: Some("<p>html</p>".into()),
            ..Default::default()
        };
        assert_eq!(payload.content(), Some("# md"));

        let html_only = FirecrawlPayload {
            markdown: Some("   ".into()),
            html: Some("<p>html</p>".into()),
            ..Default::default()
        };
        assert_eq!(html_only.content(), Some("<p>html</p>"));
    }
}
