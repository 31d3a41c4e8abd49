use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::utils::string_hash;
use crate::Result;

/// Public Nitter mirrors tried when the bird collaborator is absent or fails
pub const DEFAULT_NITTER_MIRRORS: &[&str] = &[
    "nitter.net",
    "nitter.poast.org",
    "nitter.privacydev.net",
    "xcancel.com",
    "nitter.moomoo.me",
];

/// A tweet as returned by the bird collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BirdStatus {
    pub text: String,
    pub author_name: Option<String>,
    pub author_handle: Option<String>,
}

/// Injected client for a first-party tweet lookup service
#[async_trait]
pub trait BirdClient: Send + Sync {
    async fn fetch_status(&self, url: &str) -> Result<BirdStatus>;
}

/// Whether a URL is an X/Twitter status permalink
pub fn is_status_url(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or("").to_lowercase();
    let is_twitter_host = matches!(
        host.trim_start_matches("www.").trim_start_matches("mobile.").trim_start_matches("m."),
        "twitter.com" | "x.com"
    );
    is_twitter_host && parsed.path().contains("/status/")
}

/// The numeric status id from a tweet permalink
pub fn tweet_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    while let Some(segment) = segments.next() {
        if segment == "status" {
            return segments
                .next()
                .map(|id| id.chars().take_while(|c| c.is_ascii_digit()).collect::<String>())
                .filter(|id| !id.is_empty());
        }
    }
    None
}

/// Path plus query of a tweet URL, the rotation seed input
pub fn tweet_path_and_query(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut path = parsed.path().to_string();
    if let Some(query) = parsed.query() {
        path.push('?');
        path.push_str(query);
    }
    Some(path)
}

/// Mirror hosts in deterministic rotated order for one tweet
///
/// The rotation offset is a pure function of path+query, so the same tweet
/// always starts at the same mirror while different tweets spread load.
pub fn rotated_mirrors<'a>(path_and_query: &str, mirrors: &'a [String]) -> Vec<&'a str> {
    if mirrors.is_empty() {
        return Vec::new();
    }
    let offset = (string_hash(path_and_query) % mirrors.len() as u64) as usize;
    (0..mirrors.len())
        .map(|i| mirrors[(offset + i) % mirrors.len()].as_str())
        .collect()
}

/// A tweet URL rewritten onto a mirror host
pub fn mirror_url(mirror_host: &str, path_and_query: &str) -> String {
    format!("https://{}{}", mirror_host, path_and_query)
}
