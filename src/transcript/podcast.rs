use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use url::Url;

use super::{ProviderContext, ProviderOutcome, TranscriptProvider, TranscriptSource};
use crate::diagnostics::{NoteOutcome, TranscriptDiagnostics};
use crate::transcribe::{ScratchFile, TranscriptionRequest};
use crate::utils::{json_pluck, titles_match};
use crate::Result;

/// Podcast platforms whose episode pages are captcha walls
///
/// The orchestrator skips the HTML fetch for these entirely and requires a
/// transcription credential up front.
pub fn is_captcha_walled_platform(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let host = parsed.host_str().unwrap_or("").to_lowercase();
    let path = parsed.path();
    (host.ends_with("open.spotify.com") && path.starts_with("/episode/"))
        || (host.ends_with("podcasts.apple.com") && path.contains("/podcast/"))
}

pub fn is_podcast_url(url: &str) -> bool {
    if episode_key(url).is_some() {
        return true;
    }
    looks_like_feed(url)
}

fn looks_like_feed(url: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    let path = parsed.path().to_lowercase();
    path.ends_with(".rss") || path.ends_with(".xml") || path.ends_with("/feed") || path.ends_with("/rss")
}

/// Platform identifiers parsed from an episode URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpisodeRef {
    pub show_id: Option<String>,
    pub episode_id: Option<String>,
}

/// Parse Apple Podcasts URLs: `/podcast/<slug>/id<show>?i=<episode>`
pub fn parse_apple_url(url: &str) -> Option<EpisodeRef> {
    let parsed = Url::parse(url).ok()?;
    if !parsed.host_str()?.to_lowercase().ends_with("podcasts.apple.com") {
        return None;
    }
    let show_id = parsed
        .path_segments()?
        .find(|segment| segment.starts_with("id") && segment[2..].chars().all(|c| c.is_ascii_digit()))
        .map(|segment| segment[2..].to_string())?;
    let episode_id = parsed
        .query_pairs()
        .find(|(k, _)| k == "i")
        .map(|(_, v)| v.into_owned());
    Some(EpisodeRef {
        show_id: Some(show_id),
        episode_id,
    })
}

/// Parse Spotify episode URLs: `/episode/<id>`
pub fn parse_spotify_url(url: &str) -> Option<EpisodeRef> {
    let parsed = Url::parse(url).ok()?;
    if !parsed.host_str()?.to_lowercase().ends_with("open.spotify.com") {
        return None;
    }
    let mut segments = parsed.path_segments()?;
    if segments.next()? != "episode" {
        return None;
    }
    let id = segments.next()?.to_string();
    (!id.is_empty()).then(|| EpisodeRef {
        episode_id: Some(id),
        ..Default::default()
    })
}

/// Stable cache key for podcast episode URLs
pub fn episode_key(url: &str) -> Option<String> {
    if let Some(r) = parse_spotify_url(url) {
        return Some(format!("spotify:{}", r.episode_id.unwrap_or_default()));
    }
    if let Some(r) = parse_apple_url(url) {
        return Some(format!(
            "apple:{}:{}",
            r.show_id.unwrap_or_default(),
            r.episode_id.unwrap_or_default()
        ));
    }
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    if host.ends_with("overcast.fm") || host.ends_with("pocketcasts.com") {
        return Some(format!("{}:{}", host, parsed.path()));
    }
    None
}

/// One episode as reported by the iTunes lookup API
#[derive(Debug, Clone, Default)]
pub struct EpisodeInfo {
    pub id: Option<String>,
    pub title: Option<String>,
    pub release_date: Option<String>,
    pub duration_seconds: Option<f64>,
    pub stream_url: Option<String>,
}

/// Show lookup result: feed URL plus known episodes
#[derive(Debug, Clone, Default)]
pub struct ShowLookup {
    pub feed_url: Option<String>,
    pub episodes: Vec<EpisodeInfo>,
}

/// Parse an iTunes lookup/search payload; every field defaults to absence
pub fn parse_lookup_payload(payload: &Value) -> ShowLookup {
    let mut lookup = ShowLookup::default();
    let Some(results) = json_pluck(payload, &["results"]).and_then(Value::as_array) else {
        return lookup;
    };
    for result in results {
        let kind = result.get("kind").and_then(Value::as_str).unwrap_or("");
        let wrapper = result.get("wrapperType").and_then(Value::as_str).unwrap_or("");
        if wrapper == "track" && kind == "podcast" || result.get("feedUrl").is_some() {
            if lookup.feed_url.is_none() {
                lookup.feed_url = result.get("feedUrl").and_then(Value::as_str).map(str::to_string);
            }
        }
        if kind == "podcast-episode" || wrapper == "podcastEpisode" {
            lookup.episodes.push(EpisodeInfo {
                id: result
                    .get("trackId")
                    .map(|v| v.as_i64().map(|i| i.to_string()).unwrap_or_else(|| v.to_string())),
                title: result.get("trackName").and_then(Value::as_str).map(str::to_string),
                release_date: result.get("releaseDate").and_then(Value::as_str).map(str::to_string),
                duration_seconds: result
                    .get("trackTimeMillis")
                    .and_then(Value::as_f64)
                    .map(|ms| ms / 1000.0),
                stream_url: result.get("episodeUrl").and_then(Value::as_str).map(str::to_string),
            });
        }
    }
    lookup
}

/// Pick the named episode, else the most recently released one
pub fn select_episode<'a>(
    episodes: &'a [EpisodeInfo],
    episode_id: Option<&str>,
    episode_title: Option<&str>,
) -> Option<&'a EpisodeInfo> {
    if let Some(id) = episode_id {
        if let Some(found) = episodes.iter().find(|e| e.id.as_deref() == Some(id)) {
            return Some(found);
        }
    }
    if let Some(title) = episode_title {
        if let Some(found) = episodes
            .iter()
            .find(|e| e.title.as_deref().map(|t| titles_match(t, title)).unwrap_or(false))
        {
            return Some(found);
        }
    }
    episodes
        .iter()
        .max_by(|a, b| a.release_date.cmp(&b.release_date))
}

/// One `<item>` pulled from an RSS feed
#[derive(Debug, Clone, Default)]
pub struct FeedItem {
    pub title: Option<String>,
    pub transcript_url: Option<String>,
    pub transcript_type: Option<String>,
    pub enclosure_url: Option<String>,
    pub duration_seconds: Option<f64>,
}

/// Extract feed items with the fields the cascade cares about
pub fn parse_feed_items(xml: &str) -> Vec<FeedItem> {
    let item_re = Regex::new(r"(?s)<item[\s>](.*?)</item>").expect("static regex");
    let title_re = Regex::new(r"(?s)<title[^>]*>\s*(?:<!\[CDATA\[)?(.*?)(?:\]\]>)?\s*</title>").expect("static regex");
    let transcript_re =
        Regex::new(r#"<podcast:transcript[^>]*\burl="([^"]+)"[^>]*?(?:\btype="([^"]+)")?[^>]*/?>"#)
            .expect("static regex");
    let enclosure_re = Regex::new(r#"<enclosure[^>]*\burl="([^"]+)""#).expect("static regex");
    let duration_re = Regex::new(r"(?s)<itunes:duration>\s*([^<]+?)\s*</itunes:duration>").expect("static regex");

    item_re
        .captures_iter(xml)
        .map(|item| {
            let body = &item[1];
            FeedItem {
                title: title_re.captures(body).map(|c| c[1].trim().to_string()),
                transcript_url: transcript_re.captures(body).map(|c| c[1].to_string()),
                transcript_type: transcript_re
                    .captures(body)
                    .and_then(|c| c.get(2))
                    .map(|m| m.as_str().to_string()),
                enclosure_url: enclosure_re.captures(body).map(|c| c[1].to_string()),
                duration_seconds: duration_re.captures(body).and_then(|c| parse_duration(&c[1])),
            }
        })
        .collect()
}

/// Parse `hh:mm:ss`, `mm:ss`, or plain seconds
pub fn parse_duration(raw: &str) -> Option<f64> {
    let parts: Vec<&str> = raw.trim().split(':').collect();
    let mut seconds = 0.0;
    for part in &parts {
        seconds = seconds * 60.0 + part.parse::<f64>().ok()?;
    }
    (seconds > 0.0).then_some(seconds)
}

/// Drop SRT/VTT cue numbering and timestamp lines, keeping the spoken text
pub fn strip_caption_timestamps(text: &str) -> String {
    let timing_re = Regex::new(r"^\s*(\d+\s*$|\d{1,2}:\d{2}(:\d{2})?[.,]\d{3}\s*-->|WEBVTT)").expect("static regex");
    text.lines()
        .filter(|line| !timing_re.is_match(line))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Pull an embedded feed or stream URL out of page JSON blobs
pub fn embedded_media_urls(html: &str) -> (Option<String>, Option<String>) {
    let feed_re = Regex::new(r#""feedUrl"\s*:\s*"([^"]+)""#).expect("static regex");
    let stream_re =
        Regex::new(r#""(?:streamUrl|audioUrl|contentUrl|episodeUrl)"\s*:\s*"([^"]+)""#).expect("static regex");
    let unescape = |s: &str| s.replace("\\/", "/");
    (
        feed_re.captures(html).map(|c| unescape(&c[1])),
        stream_re.captures(html).map(|c| unescape(&c[1])),
    )
}

/// Podcast transcript cascade: platform lookup, RSS transcript tag,
/// enclosure transcription, embedded stream fallback
pub struct PodcastProvider;

impl PodcastProvider {
    async fn itunes_lookup(&self, ctx: &ProviderContext<'_>, show_id: &str) -> Result<ShowLookup> {
        let url = format!(
            "https://itunes.apple.com/lookup?id={}&entity=podcastEpisode&limit=200",
            show_id
        );
        let payload: Value = ctx.deps.http.get(&url).send().await?.json().await?;
        Ok(parse_lookup_payload(&payload))
    }

    async fn itunes_search(&self, ctx: &ProviderContext<'_>, term: &str) -> Result<ShowLookup> {
        let url = format!(
            "https://itunes.apple.com/search?term={}&media=podcast&entity=podcastEpisode&limit=50",
            urlencoding::encode(term)
        );
        let payload: Value = ctx.deps.http.get(&url).send().await?.json().await?;
        Ok(parse_lookup_payload(&payload))
    }

    /// Spotify episode pages are walls; the oembed endpoint still serves the
    /// episode title, which keys the iTunes search.
    async fn spotify_title(&self, ctx: &ProviderContext<'_>) -> Option<String> {
        let url = format!(
            "https://open.spotify.com/oembed?url={}",
            urlencoding::encode(ctx.url)
        );
        let payload: Value = ctx.deps.http.get(&url).send().await.ok()?.json().await.ok()?;
        payload.get("title").and_then(Value::as_str).map(str::to_string)
    }

    async fn fetch_transcript_tag(
        &self,
        ctx: &ProviderContext<'_>,
        item: &FeedItem,
        diag: &mut TranscriptDiagnostics,
    ) -> Option<String> {
        let url = item.transcript_url.as_deref()?;
        diag.attempt("podcastTranscript");
        match ctx.deps.http.get(url).send().await {
            Ok(response) if response.status().is_success() => {
                let body = response.text().await.ok()?;
                let is_captions = item
                    .transcript_type
                    .as_deref()
                    .map(|t| t.contains("srt") || t.contains("vtt"))
                    .unwrap_or(false)
                    || body.starts_with("WEBVTT");
                let text = if is_captions { strip_caption_timestamps(&body) } else { body };
                let text = text.trim().to_string();
                if text.is_empty() {
                    diag.note("podcastTranscript", NoteOutcome::SoftMiss, "transcript file was empty");
                    None
                } else {
                    diag.note("podcastTranscript", NoteOutcome::Ok, "creator-provided transcript used");
                    Some(text)
                }
            }
            Ok(response) => {
                diag.note(
                    "podcastTranscript",
                    NoteOutcome::SoftMiss,
                    format!("HTTP {}", response.status()),
                );
                None
            }
            Err(err) => {
                diag.note("podcastTranscript", NoteOutcome::SoftMiss, err.to_string());
                None
            }
        }
    }

    async fn transcribe_stream(
        &self,
        ctx: &ProviderContext<'_>,
        stream_url: &str,
        duration_hint: Option<f64>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<Option<(String, Value)>> {
        diag.attempt("whisper");
        let Some(transcriber) = ctx.deps.transcriber.as_ref() else {
            diag.note("whisper", NoteOutcome::Skipped, "no transcription collaborator configured");
            return Ok(None);
        };
        if !ctx.deps.credentials.has_any() {
            diag.note("whisper", NoteOutcome::Skipped, "no transcription credential configured");
            return Ok(None);
        }

        let extension = stream_url
            .rsplit('.')
            .next()
            .filter(|ext| ext.len() <= 4 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or("mp3");
        let scratch = ScratchFile::reserve(&ctx.deps.scratch_dir, extension);

        let response = ctx.deps.http.get(stream_url).send().await?;
        if !response.status().is_success() {
            anyhow::bail!("enclosure download failed: HTTP {}", response.status());
        }

        let mut file = fs_err::File::create(scratch.path())?;
        let mut stream = response.bytes_stream();

        use futures_util::StreamExt;
        use std::io::Write;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk)?;
        }
        drop(file);

        let outcome = transcriber
            .transcribe(
                TranscriptionRequest::new(scratch.path().to_path_buf(), "audio/mpeg")
                    .with_duration_hint(duration_hint),
            )
            .await?;

        if let Some(error) = outcome.error {
            anyhow::bail!("enclosure transcription failed: {}", error);
        }
        if outcome.text.trim().is_empty() {
            diag.note("whisper", NoteOutcome::SoftMiss, "transcription produced no text");
            return Ok(None);
        }

        diag.note("whisper", NoteOutcome::Ok, format!("transcribed via {}", outcome.provider_id));
        let metadata = serde_json::json!({
            "transcriptionProvider": outcome.provider_id,
            "mediaDurationSeconds": duration_hint,
        });
        Ok(Some((outcome.text, metadata)))
    }
}

#[async_trait]
impl TranscriptProvider for PodcastProvider {
    fn id(&self) -> &'static str {
        "podcast"
    }

    fn supports(&self, url: &str, _html: Option<&str>) -> bool {
        is_podcast_url(url)
    }

    async fn resolve(
        &self,
        ctx: &ProviderContext<'_>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<ProviderOutcome> {
        let mut failures: Vec<String> = Vec::new();
        let mut feed_url: Option<String> = None;
        let mut episode_title: Option<String> = None;
        let mut episode_id: Option<String> = None;
        let mut lookup_stream: Option<String> = None;
        let mut lookup_duration: Option<f64> = None;

        // (a) platform identifiers first
        if let Some(episode_ref) = parse_apple_url(ctx.url) {
            episode_id = episode_ref.episode_id.clone();
            if let Some(show_id) = episode_ref.show_id.as_deref() {
                diag.attempt("podcastLookup");
                match self.itunes_lookup(ctx, show_id).await {
                    Ok(lookup) => {
                        feed_url = lookup.feed_url.clone();
                        if let Some(episode) =
                            select_episode(&lookup.episodes, episode_id.as_deref(), None)
                        {
                            episode_title = episode.title.clone();
                            lookup_stream = episode.stream_url.clone();
                            lookup_duration = episode.duration_seconds;
                        }
                        diag.note("podcastLookup", NoteOutcome::Ok, "resolved show via iTunes lookup");
                    }
                    Err(err) => {
                        failures.push(format!("lookup: {}", err));
                        diag.note("podcastLookup", NoteOutcome::Error, err.to_string());
                    }
                }
            }
        } else if parse_spotify_url(ctx.url).is_some() {
            diag.attempt("podcastLookup");
            match self.spotify_title(ctx).await {
                Some(title) => {
                    episode_title = Some(title.clone());
                    match self.itunes_search(ctx, &title).await {
                        Ok(lookup) => {
                            feed_url = lookup.feed_url.clone();
                            if let Some(episode) =
                                select_episode(&lookup.episodes, None, Some(&title))
                            {
                                lookup_stream = episode.stream_url.clone();
                                lookup_duration = episode.duration_seconds;
                            }
                            diag.note("podcastLookup", NoteOutcome::Ok, "resolved episode via iTunes search");
                        }
                        Err(err) => {
                            failures.push(format!("lookup: {}", err));
                            diag.note("podcastLookup", NoteOutcome::Error, err.to_string());
                        }
                    }
                }
                None => {
                    failures.push("lookup: spotify oembed title unavailable".to_string());
                    diag.note("podcastLookup", NoteOutcome::SoftMiss, "spotify oembed title unavailable");
                }
            }
        } else if looks_like_feed(ctx.url) {
            feed_url = Some(ctx.url.to_string());
        }

        // (b) embedded page data when the platform path yielded nothing
        let mut embedded_stream = None;
        if let Some(html) = ctx.html {
            let (embedded_feed, stream) = embedded_media_urls(html);
            if feed_url.is_none() {
                feed_url = embedded_feed;
            }
            embedded_stream = stream;
        }

        // feed fetch, then the transcript-tag / enclosure pair
        let mut enclosure: Option<(String, Option<f64>)> = None;
        if let Some(feed) = feed_url.as_deref() {
            match ctx.deps.http.get(feed).send().await {
                Ok(response) if response.status().is_success() => match response.text().await {
                    Ok(xml) => {
                        let items = if xml.contains("<podcast:transcript") || xml.contains("<enclosure") {
                            parse_feed_items(&xml)
                        } else {
                            Vec::new()
                        };
                        let matched = items
                            .iter()
                            .find(|item| {
                                matches!(
                                    (item.title.as_deref(), episode_title.as_deref()),
                                    (Some(a), Some(b)) if titles_match(a, b)
                                )
                            })
                            .or(if items.len() == 1 { items.first() } else { None });

                        if let Some(item) = matched {
                            // creator-provided transcript beats paying for
                            // transcription and is bit-exact
                            if xml.contains("<podcast:transcript") {
                                if let Some(text) = self.fetch_transcript_tag(ctx, item, diag).await {
                                    return Ok(ProviderOutcome::found(
                                        text,
                                        TranscriptSource::PodcastTranscript,
                                    ));
                                }
                            }
                            if let Some(url) = item.enclosure_url.clone() {
                                enclosure = Some((url, item.duration_seconds.or(lookup_duration)));
                            }
                        } else if !items.is_empty() {
                            failures.push("transcript parse: no feed item matched episode title".to_string());
                            diag.note(
                                "podcastTranscript",
                                NoteOutcome::SoftMiss,
                                "no feed item matched episode title",
                            );
                        }
                    }
                    Err(err) => {
                        failures.push(format!("feed fetch: {}", err));
                        diag.note("feedFetch", NoteOutcome::Error, err.to_string());
                    }
                },
                Ok(response) => {
                    failures.push(format!("feed fetch: HTTP {}", response.status()));
                    diag.note("feedFetch", NoteOutcome::Error, format!("HTTP {}", response.status()));
                }
                Err(err) => {
                    failures.push(format!("feed fetch: {}", err));
                    diag.note("feedFetch", NoteOutcome::Error, err.to_string());
                }
            }
        }

        // enclosure (or any directly known stream) to the transcriber
        let stream = enclosure
            .clone()
            .or_else(|| lookup_stream.map(|u| (u, lookup_duration)))
            .or_else(|| embedded_stream.map(|u| (u, None)));

        if let Some((stream_url, duration)) = stream {
            match self.transcribe_stream(ctx, &stream_url, duration, diag).await {
                Ok(Some((text, metadata))) => {
                    return Ok(ProviderOutcome {
                        text: Some(text),
                        source: TranscriptSource::Whisper,
                        metadata: Some(metadata),
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    failures.push(format!("enclosure transcription: {}", err));
                    diag.note("whisper", NoteOutcome::Error, err.to_string());
                }
            }
        }

        if failures.is_empty() {
            Ok(ProviderOutcome::unavailable())
        } else {
            // every sub-step that errored is named; a partial soft cascade
            // without hard failures ends as unavailable above instead
            anyhow::bail!("podcast transcript resolution failed: {}", failures.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captcha_walled_platforms() {
        assert!(is_captcha_walled_platform("https://open.spotify.com/episode/abc123"));
        assert!(is_captcha_walled_platform(
            "https://podcasts.apple.com/us/podcast/some-show/id123?i=456"
        ));
        assert!(!is_captcha_walled_platform("https://open.spotify.com/track/abc123"));
        assert!(!is_captcha_walled_platform("https://example.com/podcast"));
    }

    #[test]
    fn test_parse_apple_url() {
        let r = parse_apple_url("https://podcasts.apple.com/us/podcast/my-show/id12345?i=67890").unwrap();
        assert_eq!(r.show_id.as_deref(), Some("12345"));
        assert_eq!(r.episode_id.as_deref(), Some("67890"));

        let no_episode = parse_apple_url("https://podcasts.apple.com/us/podcast/my-show/id12345").unwrap();
        assert_eq!(no_episode.episode_id, None);
        assert!(parse_apple_url("https://example.com/podcast/id12345").is_none());
    }

    #[test]
    fn test_parse_spotify_url() {
        let r = parse_spotify_url("https://open.spotify.com/episode/4rOoJ6Egrf8K2IrywzwOMk").unwrap();
        assert_eq!(r.episode_id.as_deref(), Some("4rOoJ6Egrf8K2IrywzwOMk"));
        assert!(parse_spotify_url("https://open.spotify.com/show/abc").is_none());
    }

    #[test]
    fn test_episode_key() {
        assert_eq!(
            episode_key("https://open.spotify.com/episode/abc"),
            Some("spotify:abc".to_string())
        );
        assert_eq!(
            episode_key("https://podcasts.apple.com/us/podcast/x/id12?i=34"),
            Some("apple:12:34".to_string())
        );
        assert_eq!(episode_key("https://example.com/article"), None);
    }

    #[test]
    fn test_parse_lookup_payload_tolerates_partial_fields() {
        let payload = serde_json::json!({
            "results": [
                {"wrapperType": "track", "kind": "podcast", "feedUrl": "https://feeds.example/show.rss"},
                {"kind": "podcast-episode", "trackId": 67890, "trackName": "Episode 42",
                 "releaseDate": "2024-03-01T00:00:00Z", "trackTimeMillis": 1800000,
                 "episodeUrl": "https://cdn.example/42.mp3"},
                {"kind": "podcast-episode"}
            ]
        });
        let lookup = parse_lookup_payload(&payload);
        assert_eq!(lookup.feed_url.as_deref(), Some("https://feeds.example/show.rss"));
        assert_eq!(lookup.episodes.len(), 2);
        assert_eq!(lookup.episodes[0].id.as_deref(), Some("67890"));
        assert_eq!(lookup.episodes[0].duration_seconds, Some(1800.0));
        assert_eq!(lookup.episodes[1].title, None);
    }

    #[test]
    fn test_select_episode_prefers_id_then_title_then_recency() {
        let episodes = vec![
            EpisodeInfo {
                id: Some("1".into()),
                title: Some("Old One".into()),
                release_date: Some("2023-01-01".into()),
                ..Default::default()
            },
            EpisodeInfo {
                id: Some("2".into()),
                title: Some("Newest Episode".into()),
                release_date: Some("2024-06-01".into()),
                ..Default::default()
            },
        ];
        assert_eq!(select_episode(&episodes, Some("1"), None).unwrap().id.as_deref(), Some("1"));
        assert_eq!(
            select_episode(&episodes, None, Some("old one")).unwrap().id.as_deref(),
            Some("1")
        );
        assert_eq!(select_episode(&episodes, None, None).unwrap().id.as_deref(), Some("2"));
    }

    #[test]
    fn test_parse_feed_items() {
        let xml = r#"<rss><channel>
            <item>
                <title><![CDATA[Episode 42: The Answer]]></title>
                <podcast:transcript url="https://feeds.example/42.srt" type="application/x-subrip"/>
                <enclosure url="https://cdn.example/42.mp3" type="audio/mpeg" length="123"/>
                <itunes:duration>01:30:00</itunes:duration>
            </item>
            <item>
                <title>Episode 41</title>
                <enclosure url="https://cdn.example/41.mp3"/>
            </item>
        </channel></rss>"#;
        let items = parse_feed_items(xml);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title.as_deref(), Some("Episode 42: The Answer"));
        assert_eq!(items[0].transcript_url.as_deref(), Some("https://feeds.example/42.srt"));
        assert_eq!(items[0].duration_seconds, Some(5400.0));
        assert_eq!(items[1].transcript_url, None);
        assert_eq!(items[1].enclosure_url.as_deref(), Some("https://cdn.example/41.mp3"));
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("90"), Some(90.0));
        assert_eq!(parse_duration("02:15"), Some(135.0));
        assert_eq!(parse_duration("01:30:00"), Some(5400.0));
        assert_eq!(parse_duration("not-a-time"), None);
    }

    #[test]
    fn test_strip_caption_timestamps() {
        let srt = "1\n00:00:01,000 --> 00:00:04,000\nfirst line\n\n2\n00:00:04,000 --> 00:00:06,000\nsecond line\n";
        assert_eq!(strip_caption_timestamps(srt), "first line\nsecond line");

        let vtt = "WEBVTT\n\n00:01.000 --> 00:04.000\nspoken words\n";
        assert_eq!(strip_caption_timestamps(vtt), "spoken words");
    }

    #[test]
    fn test_embedded_media_urls() {
        let html = r#"<script>{"feedUrl":"https:\/\/feeds.example\/show.rss","streamUrl":"https:\/\/cdn.example\/ep.mp3"}</script>"#;
        let (feed, stream) = embedded_media_urls(html);
        assert_eq!(feed.as_deref(), Some("https://feeds.example/show.rss"));
        assert_eq!(stream.as_deref(), Some("https://cdn.example/ep.mp3"));
        assert_eq!(embedded_media_urls("<p>nothing</p>"), (None, None));
    }
}
