//! Memoization of extraction results keyed by the description pair.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::CacheError;
use crate::models::{ExtractionMethod, ExtractionResult};

/// Entries older than this are treated as absent.
pub const DEFAULT_TTL_DAYS: i64 = 30;

/// Number of keys reported in [`CacheStats::most_used`].
const MOST_USED_LIMIT: usize = 10;

/// Characters of a key shown in [`CacheStats::most_used`].
const KEY_PREVIEW_CHARS: usize = 50;

/// Cache key for a description pair: both fields lower-cased and trimmed,
/// joined by `|`.
pub fn cache_key(desc_base: &str, desc_opt: &str) -> String {
    format!(
        "{}|{}",
        desc_base.trim().to_lowercase(),
        desc_opt.trim().to_lowercase()
    )
}

/// Storage for extraction results, injected into the converter.
pub trait ResultCache: Send {
    /// Cached result tagged [`ExtractionMethod::CacheHit`], or `None`.
    fn get(&mut self, desc_base: &str, desc_opt: &str) -> Option<ExtractionResult>;

    /// Store a result, replacing any previous entry for the pair.
    fn set(&mut self, desc_base: &str, desc_opt: &str, result: ExtractionResult);

    /// Whether an entry exists, expired or not.
    fn has(&self, desc_base: &str, desc_opt: &str) -> bool;

    /// Remove expired entries, returning how many were dropped.
    fn cleanup(&mut self) -> usize;

    /// Remove everything.
    fn clear(&mut self);

    fn stats(&self) -> CacheStats;

    /// Write the cache to `path`. Caches without a file form do nothing.
    fn persist(&self, _path: &Path) -> Result<(), CacheError> {
        Ok(())
    }
}

/// One cached result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub key: String,
    pub extracted: ExtractionResult,
    /// When the entry was written; the TTL counts from here.
    pub timestamp: DateTime<Utc>,
    /// When the entry was last read or written.
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    /// Writes plus hits.
    pub usage_count: u64,
}

/// Key usage in [`CacheStats`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyUsage {
    pub key: String,
    pub usage_count: u64,
}

/// Cache statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    /// Percentage of accesses that were hits rather than first writes.
    pub hit_rate: f64,
    pub most_used: Vec<KeyUsage>,
}

/// In-memory cache with lazy TTL expiry.
#[derive(Debug, Clone)]
pub struct MemoryCache {
    entries: HashMap<String, CacheEntry>,
    ttl: Duration,
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Duration::days(DEFAULT_TTL_DAYS),
        }
    }

    /// Use a different time-to-live.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Store a result as if written at `timestamp`.
    pub fn set_at(
        &mut self,
        desc_base: &str,
        desc_opt: &str,
        result: ExtractionResult,
        timestamp: DateTime<Utc>,
    ) {
        let key = cache_key(desc_base, desc_opt);
        self.entries.insert(
            key.clone(),
            CacheEntry {
                key,
                extracted: result,
                timestamp,
                last_used: Some(timestamp),
                usage_count: 1,
            },
        );
    }

    fn is_expired(&self, entry: &CacheEntry, now: DateTime<Utc>) -> bool {
        now - entry.timestamp > self.ttl
    }

    /// Serialize all entries as a JSON array, sorted by key.
    pub fn export_json(&self) -> Result<String, CacheError> {
        let mut entries: Vec<&CacheEntry> = self.entries.values().collect();
        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(serde_json::to_string_pretty(&entries)?)
    }

    /// Merge entries from [`Self::export_json`] output, returning how many
    /// were read. Existing keys are overwritten.
    pub fn import_json(&mut self, json: &str) -> Result<usize, CacheError> {
        let entries: Vec<CacheEntry> = serde_json::from_str(json)?;
        let count = entries.len();
        for entry in entries {
            self.entries.insert(entry.key.clone(), entry);
        }
        debug!(count, "imported cache entries");
        Ok(count)
    }

    /// Load a cache file. A missing file yields an empty cache.
    pub fn load(path: &Path) -> Result<Self, CacheError> {
        let mut cache = Self::new();
        if !path.exists() {
            return Ok(cache);
        }
        let content = std::fs::read_to_string(path)?;
        if !content.trim().is_empty() {
            cache.import_json(&content)?;
        }
        info!(entries = cache.len(), path = %path.display(), "loaded cache");
        Ok(cache)
    }

    /// Write the cache to a file, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), CacheError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, self.export_json()?)?;
        debug!(entries = self.len(), path = %path.display(), "saved cache");
        Ok(())
    }
}

impl ResultCache for MemoryCache {
    fn get(&mut self, desc_base: &str, desc_opt: &str) -> Option<ExtractionResult> {
        let key = cache_key(desc_base, desc_opt);
        let now = Utc::now();
        let expired = self.is_expired(self.entries.get(&key)?, now);
        if expired {
            debug!(key = %key, "cache entry expired");
            self.entries.remove(&key);
            return None;
        }

        let entry = self.entries.get_mut(&key)?;
        entry.usage_count += 1;
        entry.last_used = Some(now);

        let mut result = entry.extracted.clone();
        result.method = ExtractionMethod::CacheHit;
        Some(result)
    }

    fn set(&mut self, desc_base: &str, desc_opt: &str, result: ExtractionResult) {
        self.set_at(desc_base, desc_opt, result, Utc::now());
    }

    fn has(&self, desc_base: &str, desc_opt: &str) -> bool {
        self.entries.contains_key(&cache_key(desc_base, desc_opt))
    }

    fn cleanup(&mut self) -> usize {
        let now = Utc::now();
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries.retain(|_, entry| now - entry.timestamp <= ttl);
        before - self.entries.len()
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn stats(&self) -> CacheStats {
        let total_usage: u64 = self.entries.values().map(|e| e.usage_count).sum();
        let total_hits: u64 = self
            .entries
            .values()
            .map(|e| e.usage_count.saturating_sub(1))
            .sum();
        let hit_rate = if total_usage > 0 {
            total_hits as f64 / total_usage as f64 * 100.0
        } else {
            0.0
        };

        let mut ranked: Vec<&CacheEntry> = self.entries.values().collect();
        ranked.sort_by(|a, b| b.usage_count.cmp(&a.usage_count).then_with(|| a.key.cmp(&b.key)));

        CacheStats {
            size: self.entries.len(),
            hit_rate,
            most_used: ranked
                .into_iter()
                .take(MOST_USED_LIMIT)
                .map(|e| KeyUsage {
                    key: preview(&e.key),
                    usage_count: e.usage_count,
                })
                .collect(),
        }
    }

    fn persist(&self, path: &Path) -> Result<(), CacheError> {
        self.save(path)
    }
}

fn preview(key: &str) -> String {
    if key.chars().count() <= KEY_PREVIEW_CHARS {
        return key.to_string();
    }
    let head: String = key.chars().take(KEY_PREVIEW_CHARS).collect();
    format!("{head}...")
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl ResultCache for NoopCache {
    fn get(&mut self, _desc_base: &str, _desc_opt: &str) -> Option<ExtractionResult> {
        None
    }

    fn set(&mut self, _desc_base: &str, _desc_opt: &str, _result: ExtractionResult) {}

    fn has(&self, _desc_base: &str, _desc_opt: &str) -> bool {
        false
    }

    fn cleanup(&mut self) -> usize {
        0
    }

    fn clear(&mut self) {}

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Confidence, RawDescriptions};
    use pretty_assertions::assert_eq;

    fn result() -> ExtractionResult {
        ExtractionResult {
            street_name: Some("Joliot-Curie".into()),
            building_number: Some("3".into()),
            apartment_number: Some("27".into()),
            full_address: Some("Joliot-Curie 3/27".into()),
            tenant_name: Some("Ewa Teresa Osiecka-Cisowska".into()),
            confidence: Confidence::from_apartment(95, 95, 75),
            method: ExtractionMethod::PatternMatch,
            reasoning: None,
            warnings: Vec::new(),
            raw: RawDescriptions {
                desc_base: "Foo".into(),
                desc_opt: "Bar".into(),
            },
        }
    }

    #[test]
    fn test_get_after_set_is_cache_hit() {
        let mut cache = MemoryCache::new();
        cache.set("Foo", "Bar", result());

        let hit = cache.get("Foo", "Bar").unwrap();
        assert_eq!(hit.method, ExtractionMethod::CacheHit);
        assert_eq!(
            ExtractionResult {
                method: ExtractionMethod::PatternMatch,
                ..hit
            },
            result()
        );
    }

    #[test]
    fn test_key_ignores_case_and_outer_whitespace() {
        let mut cache = MemoryCache::new();
        cache.set("Foo ", "Bar", result());
        assert!(cache.has("foo", "bar"));
        assert!(cache.get("foo", "bar").is_some());
        assert!(cache.get("foo", "baz").is_none());
    }

    #[test]
    fn test_expired_entry_is_evicted_on_get() {
        let mut cache = MemoryCache::new();
        cache.set_at("a", "b", result(), Utc::now() - Duration::days(31));
        assert!(cache.has("a", "b"));
        assert!(cache.get("a", "b").is_none());
        assert!(!cache.has("a", "b"));
    }

    #[test]
    fn test_cleanup_counts_removed() {
        let mut cache = MemoryCache::new();
        cache.set_at("old", "1", result(), Utc::now() - Duration::days(40));
        cache.set_at("old", "2", result(), Utc::now() - Duration::days(31));
        cache.set("fresh", "3", result());
        assert_eq!(cache.cleanup(), 2);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_stats_hit_rate_and_ranking() {
        let mut cache = MemoryCache::new();
        cache.set("a", "1", result());
        cache.set("b", "2", result());
        cache.get("a", "1");
        cache.get("a", "1");

        let stats = cache.stats();
        assert_eq!(stats.size, 2);
        // usage 3 + 1, hits 2 + 0
        assert!((stats.hit_rate - 50.0).abs() < f64::EPSILON);
        assert_eq!(stats.most_used[0].key, "a|1");
        assert_eq!(stats.most_used[0].usage_count, 3);
    }

    #[test]
    fn test_stats_truncates_long_keys() {
        let mut cache = MemoryCache::new();
        cache.set(&"x".repeat(80), "y", result());
        let key = &cache.stats().most_used[0].key;
        assert_eq!(key.chars().count(), 53);
        assert!(key.ends_with("..."));
    }

    #[test]
    fn test_export_import_round_trip() {
        let mut cache = MemoryCache::new();
        cache.set("a", "1", result());
        cache.get("a", "1");
        let json = cache.export_json().unwrap();

        let mut restored = MemoryCache::new();
        assert_eq!(restored.import_json(&json).unwrap(), 1);
        assert_eq!(restored.stats().most_used[0].usage_count, 2);
    }

    #[test]
    fn test_import_malformed_is_error() {
        let mut cache = MemoryCache::new();
        assert!(matches!(
            cache.import_json("{not json"),
            Err(CacheError::Malformed(_))
        ));
    }

    #[test]
    fn test_clear_drops_every_entry() {
        let mut cache = MemoryCache::new();
        cache.set("a", "1", result());
        cache.set("b", "2", result());
        cache.clear();

        assert!(cache.is_empty());
        assert!(!cache.has("a", "1"));
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_import_rejects_inconsistent_confidence() {
        let mut cache = MemoryCache::new();
        cache.set("a", "1", result());
        let mut entries: serde_json::Value =
            serde_json::from_str(&cache.export_json().unwrap()).unwrap();
        entries[0]["extracted"]["confidence"]["overall"] = serde_json::json!(100);

        let mut restored = MemoryCache::new();
        assert!(matches!(
            restored.import_json(&entries.to_string()),
            Err(CacheError::Malformed(_))
        ));
        assert!(restored.is_empty());
    }

    #[test]
    fn test_save_and_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let mut cache = MemoryCache::new();
        cache.set("a", "1", result());
        cache.save(&path).unwrap();

        let mut loaded = MemoryCache::load(&path).unwrap();
        assert!(loaded.get("A", "1").is_some());
        assert!(MemoryCache::load(&dir.path().join("missing.json")).unwrap().is_empty());
    }

    #[test]
    fn test_noop_cache_stores_nothing() {
        let mut cache = NoopCache;
        cache.set("a", "b", result());
        assert!(!cache.has("a", "b"));
        assert!(cache.get("a", "b").is_none());
        assert_eq!(cache.stats().size, 0);
    }
}
