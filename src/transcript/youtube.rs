use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use super::{ProviderContext, ProviderOutcome, TranscriptProvider, TranscriptSource};
use crate::diagnostics::{NoteOutcome, TranscriptDiagnostics};
use crate::html::html_to_text;
use crate::transcribe::{ScratchFile, TranscriptionRequest};
use crate::utils::json_pluck;
use crate::{ResolveError, Result};

/// Transcript strategy selection for YouTube URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum YoutubeMode {
    /// Full cascade: youtubei, caption tracks, audio transcription, apify
    #[default]
    Auto,
    /// Page-scrape strategies only (youtubei + caption tracks)
    Web,
    /// Audio download + transcription only
    YtDlp,
    /// Third-party scrape API only
    Apify,
}

pub fn is_youtube_url(url: &str) -> bool {
    video_id(url).is_some()
}

/// The 11-character video id from any common YouTube URL shape
pub fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    let host = host.trim_start_matches("www.").trim_start_matches("m.");

    let candidate = match host {
        "youtube.com" | "youtube-nocookie.com" => {
            let path: Vec<&str> = parsed.path_segments()?.collect();
            match path.as_slice() {
                ["watch"] | ["watch", ..] => parsed
                    .query_pairs()
                    .find(|(k, _)| k == "v")
                    .map(|(_, v)| v.into_owned()),
                ["embed", id] | ["v", id] | ["shorts", id] | ["live", id] => Some((*id).to_string()),
                _ => None,
            }
        }
        "youtu.be" => parsed.path_segments()?.next().map(str::to_string),
        _ => None,
    }?;

    let id: String = candidate
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    (id.len() == 11).then_some(id)
}

/// Bootstrap config scraped from the watch page
///
/// The page's internal JSON shape is not a stable contract: any missing
/// field is a soft miss for the youtubei step, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InnertubeBootstrap {
    pub api_key: String,
    pub client_version: String,
    pub visitor_data: String,
    pub transcript_params: String,
}

/// Parse the youtubei bootstrap out of watch-page HTML
///
/// Logs a distinguishable schema-drift warning naming the first missing
/// field, so silent upstream changes are visible in the logs.
pub fn parse_bootstrap(html: &str, diag: &mut TranscriptDiagnostics) -> Option<InnertubeBootstrap> {
    let grab = |pattern: &str| -> Option<String> {
        Regex::new(pattern)
            .ok()?
            .captures(html)
            .map(|c| c[1].replace("\\u0026", "&").replace("\\/", "/"))
    };

    let fields = [
        ("INNERTUBE_API_KEY", r#""INNERTUBE_API_KEY":"([^"]+)""#),
        ("clientVersion", r#""INNERTUBE_CONTEXT_CLIENT_VERSION":"([^"]+)""#),
        ("visitorData", r#""visitorData":"([^"]+)""#),
        ("getTranscriptEndpoint.params", r#""getTranscriptEndpoint":\{"params":"([^"]+)""#),
    ];

    let mut values = Vec::with_capacity(fields.len());
    for (name, pattern) in fields {
        match grab(pattern) {
            Some(value) => values.push(value),
            None => {
                tracing::warn!(field = name, "schema drift: youtubei bootstrap field missing from watch page");
                diag.note(
                    "youtubei",
                    NoteOutcome::SoftMiss,
                    format!("schema drift: bootstrap field {} not found", name),
                );
                return None;
            }
        }
    }

    let mut iter = values.into_iter();
    Some(InnertubeBootstrap {
        api_key: iter.next()?,
        client_version: iter.next()?,
        visitor_data: iter.next()?,
        transcript_params: iter.next()?,
    })
}

/// One caption track advertised by the watch page
#[derive(Debug, Clone, Deserialize)]
pub struct CaptionTrack {
    #[serde(rename = "baseUrl")]
    pub base_url: String,
    #[serde(rename = "languageCode", default)]
    pub language_code: String,
    #[serde(default)]
    pub kind: Option<String>,
}

/// Pull caption tracks out of watch-page HTML
pub fn parse_caption_tracks(html: &str) -> Vec<CaptionTrack> {
    let re = Regex::new(r#"(?s)"captionTracks":(\[.*?\])"#).expect("static regex");
    let Some(caps) = re.captures(html) else {
        return Vec::new();
    };
    let raw = caps[1].replace("\\u0026", "&").replace("\\/", "/");
    serde_json::from_str(&raw).unwrap_or_default()
}

/// Prefer a human-made English track, then any human track, then the rest
pub fn pick_caption_track(tracks: &[CaptionTrack]) -> Option<&CaptionTrack> {
    let is_asr = |t: &CaptionTrack| t.kind.as_deref() == Some("asr");
    tracks
        .iter()
        .find(|t| t.language_code.starts_with("en") && !is_asr(t))
        .or_else(|| tracks.iter().find(|t| !is_asr(t)))
        .or_else(|| tracks.first())
}

/// Join timedtext json3 events into plain text
pub fn timedtext_json_to_text(payload: &Value) -> Option<String> {
    let events = json_pluck(payload, &["events"])?.as_array()?;
    let mut lines = Vec::new();
    for event in events {
        let Some(segs) = event.get("segs").and_then(Value::as_array) else {
            continue;
        };
        let line: String = segs
            .iter()
            .filter_map(|s| s.get("utf8").and_then(Value::as_str))
            .collect();
        let line = line.trim();
        if !line.is_empty() && line != "\n" {
            lines.push(line.to_string());
        }
    }
    let text = lines.join("\n");
    (!text.is_empty()).then_some(text)
}

/// Extract cue text from legacy timedtext XML
pub fn timedtext_xml_to_text(xml: &str) -> Option<String> {
    let re = Regex::new(r"(?s)<text[^>]*>(.*?)</text>").expect("static regex");
    let lines: Vec<String> = re
        .captures_iter(xml)
        .map(|c| html_to_text(&c[1]))
        .filter(|line| !line.is_empty())
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Flatten the get_transcript response into plain text
///
/// Defensive by construction: every access defaults to absence, and a shape
/// mismatch is an ordinary soft miss.
pub fn parse_transcript_response(body: &Value) -> Option<String> {
    let segments = json_pluck(
        body,
        &[
            "actions",
            "0",
            "updateEngagementPanelAction",
            "content",
            "transcriptRenderer",
            "content",
            "transcriptSearchPanelRenderer",
            "body",
            "transcriptSegmentListRenderer",
            "initialSegments",
        ],
    )?
    .as_array()?;

    let mut lines = Vec::new();
    for segment in segments {
        let Some(runs) = json_pluck(segment, &["transcriptSegmentRenderer", "snippet", "runs"])
            .and_then(Value::as_array)
        else {
            continue;
        };
        let line: String = runs
            .iter()
            .filter_map(|run| run.get("text").and_then(Value::as_str))
            .collect();
        let line = line.trim();
        if !line.is_empty() {
            lines.push(line.to_string());
        }
    }
    let text = lines.join("\n");
    (!text.is_empty()).then_some(text)
}

/// YouTube transcript cascade
pub struct YoutubeProvider;

impl YoutubeProvider {
    async fn fetch_watch_page(&self, ctx: &ProviderContext<'_>, id: &str) -> Option<String> {
        let url = format!("https://www.youtube.com/watch?v={}", id);
        match ctx.deps.http.get(&url).header("Accept-Language", "en").send().await {
            Ok(response) if response.status().is_success() => response.text().await.ok(),
            Ok(response) => {
                tracing::debug!(%url, status = %response.status(), "watch page fetch refused");
                None
            }
            Err(err) => {
                tracing::debug!(%url, %err, "watch page fetch failed");
                None
            }
        }
    }

    async fn try_youtubei(
        &self,
        ctx: &ProviderContext<'_>,
        html: &str,
        diag: &mut TranscriptDiagnostics,
    ) -> Option<String> {
        diag.attempt("youtubei");
        let bootstrap = parse_bootstrap(html, diag)?;

        let endpoint = format!(
            "https://www.youtube.com/youtubei/v1/get_transcript?key={}",
            bootstrap.api_key
        );
        let body = serde_json::json!({
            "context": {
                "client": {
                    "clientName": "WEB",
                    "clientVersion": bootstrap.client_version,
                    "visitorData": bootstrap.visitor_data,
                }
            },
            "params": bootstrap.transcript_params,
        });

        let response = match ctx.deps.http.post(&endpoint).json(&body).send().await {
            Ok(r) if r.status().is_success() => r,
            Ok(r) => {
                diag.note("youtubei", NoteOutcome::SoftMiss, format!("HTTP {}", r.status()));
                return None;
            }
            Err(err) => {
                diag.note("youtubei", NoteOutcome::SoftMiss, err.to_string());
                return None;
            }
        };

        let payload: Value = response.json().await.ok()?;
        match parse_transcript_response(&payload) {
            Some(text) => {
                diag.note("youtubei", NoteOutcome::Ok, "internal transcript endpoint yielded text");
                Some(text)
            }
            None => {
                tracing::warn!("schema drift: get_transcript response shape unrecognized");
                diag.note(
                    "youtubei",
                    NoteOutcome::SoftMiss,
                    "schema drift: transcript response shape unrecognized",
                );
                None
            }
        }
    }

    async fn try_caption_tracks(
        &self,
        ctx: &ProviderContext<'_>,
        html: &str,
        diag: &mut TranscriptDiagnostics,
    ) -> Option<String> {
        diag.attempt("captionTracks");
        let tracks = parse_caption_tracks(html);
        let Some(track) = pick_caption_track(&tracks) else {
            diag.note("captionTracks", NoteOutcome::SoftMiss, "no caption tracks on page");
            return None;
        };

        // json3 first; older videos only serve the XML shape
        let json_url = format!("{}&fmt=json3", track.base_url);
        if let Ok(response) = ctx.deps.http.get(&json_url).send().await {
            if response.status().is_success() {
                if let Ok(payload) = response.json::<Value>().await {
                    if let Some(text) = timedtext_json_to_text(&payload) {
                        diag.note("captionTracks", NoteOutcome::Ok, format!("timedtext json3, lang {}", track.language_code));
                        return Some(text);
                    }
                }
            }
        }

        match ctx.deps.http.get(&track.base_url).send().await {
            Ok(response) if response.status().is_success() => {
                let xml = response.text().await.ok()?;
                match timedtext_xml_to_text(&xml) {
                    Some(text) => {
                        diag.note("captionTracks", NoteOutcome::Ok, format!("timedtext xml, lang {}", track.language_code));
                        Some(text)
                    }
                    None => {
                        diag.note("captionTracks", NoteOutcome::SoftMiss, "timedtext payload had no cues");
                        None
                    }
                }
            }
            Ok(response) => {
                diag.note("captionTracks", NoteOutcome::SoftMiss, format!("HTTP {}", response.status()));
                None
            }
            Err(err) => {
                diag.note("captionTracks", NoteOutcome::SoftMiss, err.to_string());
                None
            }
        }
    }

    fn audio_leg_ready(&self, ctx: &ProviderContext<'_>) -> bool {
        ctx.deps.downloader.is_some()
            && ctx.deps.transcriber.is_some()
            && ctx.deps.credentials.has_any()
    }

    async fn try_audio_transcription(
        &self,
        ctx: &ProviderContext<'_>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<Option<(String, Value)>> {
        diag.attempt("yt-dlp");
        let downloader = ctx.deps.downloader.as_ref().expect("caller checked prerequisites");
        let transcriber = ctx.deps.transcriber.as_ref().expect("caller checked prerequisites");

        let duration_hint = match downloader.probe(ctx.url).await {
            Ok(info) => info.get("duration").and_then(Value::as_f64),
            Err(err) => {
                tracing::debug!(%err, "probe failed, continuing without duration hint");
                None
            }
        };

        let scratch = ScratchFile::reserve(&ctx.deps.scratch_dir, "mp3");
        downloader
            .download_audio(ctx.url, scratch.path(), None)
            .await
            .map_err(|err| anyhow::anyhow!("audio download failed: {}", err))?;

        let outcome = transcriber
            .transcribe(
                TranscriptionRequest::new(scratch.path().to_path_buf(), "audio/mpeg")
                    .with_duration_hint(duration_hint),
            )
            .await?;

        if let Some(error) = outcome.error {
            diag.note("yt-dlp", NoteOutcome::Error, error.clone());
            anyhow::bail!("transcription failed: {}", error);
        }
        if outcome.text.trim().is_empty() {
            diag.note("yt-dlp", NoteOutcome::SoftMiss, "transcription produced no text");
            return Ok(None);
        }

        diag.note(
            "yt-dlp",
            NoteOutcome::Ok,
            format!("transcribed via {}", outcome.provider_id),
        );
        let metadata = serde_json::json!({
            "transcriptionProvider": outcome.provider_id,
            "mediaDurationSeconds": duration_hint,
        });
        Ok(Some((outcome.text, metadata)))
    }

    async fn try_apify(
        &self,
        ctx: &ProviderContext<'_>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<Option<String>> {
        diag.attempt("apify");
        let apify = ctx.deps.apify.as_ref().expect("caller checked prerequisites");
        match apify.fetch_transcript(ctx.url).await? {
            Some(text) if !text.trim().is_empty() => {
                diag.note("apify", NoteOutcome::Ok, "third-party scrape yielded text");
                Ok(Some(text))
            }
            _ => {
                diag.note("apify", NoteOutcome::SoftMiss, "third-party scrape found nothing");
                Ok(None)
            }
        }
    }
}

#[async_trait]
impl TranscriptProvider for YoutubeProvider {
    fn id(&self) -> &'static str {
        "youtube"
    }

    fn supports(&self, url: &str, _html: Option<&str>) -> bool {
        is_youtube_url(url)
    }

    async fn resolve(
        &self,
        ctx: &ProviderContext<'_>,
        diag: &mut TranscriptDiagnostics,
    ) -> Result<ProviderOutcome> {
        let mode = ctx.options.youtube_mode;
        let id = video_id(ctx.url)
            .ok_or_else(|| ResolveError::UnsupportedUrl(ctx.url.to_string()))?;

        // Explicit modes fail loud on missing prerequisites: the caller asked
        // for exactly one strategy, silent fallback would betray that intent.
        match mode {
            YoutubeMode::YtDlp if ctx.deps.downloader.is_none() => {
                return Err(ResolveError::MissingCredentials(
                    "yt-dlp mode requested but no downloader binary is configured".into(),
                )
                .into());
            }
            YoutubeMode::YtDlp if ctx.deps.transcriber.is_none() || !ctx.deps.credentials.has_any() => {
                return Err(ResolveError::MissingCredentials(
                    "yt-dlp mode requested but no transcription credential is configured".into(),
                )
                .into());
            }
            YoutubeMode::Apify if ctx.deps.apify.is_none() => {
                return Err(ResolveError::MissingCredentials(
                    "apify mode requested but no Apify token is configured".into(),
                )
                .into());
            }
            _ => {}
        }

        if mode == YoutubeMode::YtDlp {
            return match self.try_audio_transcription(ctx, diag).await? {
                Some((text, metadata)) => Ok(ProviderOutcome {
                    text: Some(text),
                    source: TranscriptSource::Whisper,
                    metadata: Some(metadata),
                }),
                None => Ok(ProviderOutcome::unavailable()),
            };
        }

        if mode == YoutubeMode::Apify {
            return match self.try_apify(ctx, diag).await? {
                Some(text) => Ok(ProviderOutcome::found(text, TranscriptSource::Apify)),
                None => Ok(ProviderOutcome::unavailable()),
            };
        }

        // auto / web need the watch page for the scrape strategies
        let page = match ctx.html {
            Some(html) => Some(html.to_string()),
            None => self.fetch_watch_page(ctx, &id).await,
        };

        if let Some(html) = page.as_deref() {
            if let Some(text) = self.try_youtubei(ctx, html, diag).await {
                return Ok(ProviderOutcome::found(text, TranscriptSource::Youtubei));
            }
            if let Some(text) = self.try_caption_tracks(ctx, html, diag).await {
                return Ok(ProviderOutcome::found(text, TranscriptSource::CaptionTracks));
            }
        } else {
            diag.note("watchPage", NoteOutcome::SoftMiss, "watch page unavailable, skipping scrape strategies");
        }

        if mode == YoutubeMode::Web {
            return Ok(ProviderOutcome::unavailable());
        }

        if self.audio_leg_ready(ctx) {
            match self.try_audio_transcription(ctx, diag).await {
                Ok(Some((text, metadata))) => {
                    return Ok(ProviderOutcome {
                        text: Some(text),
                        source: TranscriptSource::Whisper,
                        metadata: Some(metadata),
                    });
                }
                Ok(None) => {}
                Err(err) => {
                    // auto mode never throws mid-cascade
                    diag.note("yt-dlp", NoteOutcome::Error, err.to_string());
                }
            }
        } else {
            tracing::debug!("audio transcription prerequisites absent, step not attempted");
        }

        if ctx.deps.apify.is_some() {
            match self.try_apify(ctx, diag).await {
                Ok(Some(text)) => return Ok(ProviderOutcome::found(text, TranscriptSource::Apify)),
                Ok(None) => {}
                Err(err) => {
                    diag.note("apify", NoteOutcome::Error, err.to_string());
                }
            }
        }

        Ok(ProviderOutcome::unavailable())
    }
}
