use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::diagnostics::{CacheMode, CacheStatus};
use crate::transcript::TranscriptSource;

/// What a provider asks the cache to remember
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    pub content: String,
    pub source: TranscriptSource,
    pub metadata: Option<serde_json::Value>,
}

/// A cache read result
///
/// A present-but-expired entry is still returned with `expired = true` so the
/// dispatcher can substitute it when a live fetch fails. Expired entries are
/// never silently discarded on read.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub content: String,
    pub source: TranscriptSource,
    pub metadata: Option<serde_json::Value>,
    pub expired: bool,
}

/// Read-through/write-through cache keyed by (service, resource key)
///
/// Implementations must tolerate concurrent reads and writes to different
/// keys; same-key writers may race last-write-wins. The cache is a
/// performance optimization, not a source of truth.
#[async_trait]
pub trait CacheGateway: Send + Sync {
    async fn get(&self, service: &str, resource_key: &str) -> Option<CacheEntry>;
    async fn set(&self, service: &str, resource_key: &str, record: CacheRecord, ttl: Duration);
}

#[derive(Debug, Clone)]
struct StoredEntry {
    record: CacheRecord,
    expires_at: DateTime<Utc>,
}

/// In-process cache gateway
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<(String, String), StoredEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheGateway for MemoryCache {
    async fn get(&self, service: &str, resource_key: &str) -> Option<CacheEntry> {
        let entries = self.entries.lock().await;
        let stored = entries.get(&(service.to_string(), resource_key.to_string()))?;
        Some(CacheEntry {
            content: stored.record.content.clone(),
            source: stored.record.source,
            metadata: stored.record.metadata.clone(),
            expired: stored.expires_at <= Utc::now(),
        })
    }

    async fn set(&self, service: &str, resource_key: &str, record: CacheRecord, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            (service.to_string(), resource_key.to_string()),
            StoredEntry {
                record,
                expires_at: Utc::now() + ttl,
            },
        );
    }
}

/// Outcome of consulting the transcript store before running a provider
#[derive(Debug, Clone)]
pub struct CacheConsult {
    pub status: CacheStatus,
    pub entry: Option<CacheEntry>,
}

/// Transcript-specific wrapper over the cache gateway
///
/// Carries the TTL pair: confirmed-unavailable results get a deliberately
/// shorter TTL than successful transcripts, so a transient absence is
/// re-probed instead of cached forever.
#[derive(Clone)]
pub struct TranscriptStore {
    gateway: Arc<dyn CacheGateway>,
    success_ttl: Duration,
    negative_ttl: Duration,
}

impl TranscriptStore {
    pub fn new(gateway: Arc<dyn CacheGateway>, success_ttl: Duration, negative_ttl: Duration) -> Self {
        debug_assert!(negative_ttl < success_ttl);
        Self {
            gateway,
            success_ttl,
            negative_ttl,
        }
    }

    /// Read the cache for a resource, honoring the cache mode
    ///
    /// `wants_segments` is the capability check: a cached plain-text entry
    /// cannot satisfy a request for timestamped segments, so it is reported
    /// as a miss (forcing a re-fetch) rather than a hit.
    pub async fn consult(
        &self,
        service: &str,
        resource_key: &str,
        mode: CacheMode,
        wants_segments: bool,
    ) -> CacheConsult {
        if mode == CacheMode::Bypass {
            return CacheConsult {
                status: CacheStatus::Bypassed,
                entry: None,
            };
        }

        let Some(entry) = self.gateway.get(service, resource_key).await else {
            return CacheConsult {
                status: CacheStatus::Miss,
                entry: None,
            };
        };

        if wants_segments && !entry_has_segments(&entry) {
            tracing::debug!(service, resource_key, "cached entry lacks segments, treating as miss");
            return CacheConsult {
                status: CacheStatus::Miss,
                entry: Some(entry),
            };
        }

        if entry.expired {
            return CacheConsult {
                status: CacheStatus::Expired,
                entry: Some(entry),
            };
        }

        CacheConsult {
            status: CacheStatus::Hit,
            entry: Some(entry),
        }
    }

    /// Look up any prior entry, expired or not, for failure fallback
    pub async fn stale_fallback(&self, service: &str, resource_key: &str) -> Option<CacheEntry> {
        self.gateway.get(service, resource_key).await
    }

    /// Write-through a successful transcript with the long TTL
    pub async fn store_success(&self, service: &str, resource_key: &str, record: CacheRecord) {
        self.gateway
            .set(service, resource_key, record, self.success_ttl)
            .await;
    }

    /// Negative-cache a confirmed "no transcript exists" with the short TTL
    pub async fn store_unavailable(&self, service: &str, resource_key: &str) {
        self.gateway
            .set(
                service,
                resource_key,
                CacheRecord {
                    content: String::new(),
                    source: TranscriptSource::Unavailable,
                    metadata: None,
                },
                self.negative_ttl,
            )
            .await;
    }

    pub fn success_ttl(&self) -> Duration {
        self.success_ttl
    }

    pub fn negative_ttl(&self) -> Duration {
        self.negative_ttl
    }
}

fn entry_has_segments(entry: &CacheEntry) -> bool {
    entry
        .metadata
        .as_ref()
        .and_then(|m| m.get("segments"))
        .map(|s| !s.is_null())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(gateway: Arc<dyn CacheGateway>) -> TranscriptStore {
        TranscriptStore::new(gateway, Duration::days(30), Duration::hours(6))
    }

    fn record(content: &str) -> CacheRecord {
        CacheRecord {
            content: content.to_string(),
            source: TranscriptSource::Youtubei,
            metadata: None,
        }
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let store = store(Arc::new(MemoryCache::new()));
        let consult = store.consult("youtube", "abc123", CacheMode::Default, false).await;
        assert_eq!(consult.status, CacheStatus::Miss);

        store.store_success("youtube", "abc123", record("hello")).await;
        let consult = store.consult("youtube", "abc123", CacheMode::Default, false).await;
        assert_eq!(consult.status, CacheStatus::Hit);
        assert_eq!(consult.entry.unwrap().content, "hello");
    }

    #[tokio::test]
    async fn test_bypass_skips_reads_but_not_writes() {
        let gateway = Arc::new(MemoryCache::new());
        let store = store(gateway.clone());
        store.store_success("youtube", "abc123", record("hello")).await;

        let consult = store.consult("youtube", "abc123", CacheMode::Bypass, false).await;
        assert_eq!(consult.status, CacheStatus::Bypassed);
        assert!(consult.entry.is_none());

        // the entry itself is still there
        assert!(gateway.get("youtube", "abc123").await.is_some());
    }

    #[tokio::test]
    async fn test_expired_entry_still_returned() {
        let gateway = Arc::new(MemoryCache::new());
        gateway
            .set("youtube", "abc123", record("old"), Duration::seconds(-1))
            .await;

        let store = store(gateway);
        let consult = store.consult("youtube", "abc123", CacheMode::Default, false).await;
        assert_eq!(consult.status, CacheStatus::Expired);
        let entry = consult.entry.unwrap();
        assert!(entry.expired);
        assert_eq!(entry.content, "old");
    }

    #[tokio::test]
    async fn test_segment_capability_mismatch_is_miss() {
        let gateway = Arc::new(MemoryCache::new());
        let store = store(gateway);
        store.store_success("youtube", "abc123", record("plain text")).await;

        let consult = store.consult("youtube", "abc123", CacheMode::Default, true).await;
        assert_eq!(consult.status, CacheStatus::Miss);

        let mut with_segments = record("timed text");
        with_segments.metadata = Some(serde_json::json!({"segments": [{"start": 0.0}]}));
        store.store_success("youtube", "abc123", with_segments).await;
        let consult = store.consult("youtube", "abc123", CacheMode::Default, true).await;
        assert_eq!(consult.status, CacheStatus::Hit);
    }

    #[tokio::test]
    async fn test_negative_ttl_strictly_shorter() {
        let store = store(Arc::new(MemoryCache::new()));
        assert!(store.negative_ttl() < store.success_ttl());
        store.store_unavailable("youtube", "novid").await;
        let consult = store.consult("youtube", "novid", CacheMode::Default, false).await;
        assert_eq!(consult.status, CacheStatus::Hit);
        assert_eq!(consult.entry.unwrap().source, TranscriptSource::Unavailable);
    }
}
