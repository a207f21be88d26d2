//! Process-lifetime memoization of extraction results.
//!
//! Identical page sequences (same prompt version, same encoded images in the
//! same order) map to the same [`CacheKey`]. Only fully parsed records are
//! ever inserted, so a lookup yields either nothing or a complete record.
//! Entries are never evicted.

use crate::pipeline::encode::InlineImage;
use crate::record::ExtractedRecord;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

/// BLAKE3 digest identifying one extraction request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey(blake3::Hash);

impl CacheKey {
    /// Hash the prompt version and every image, in order.
    ///
    /// Each component is length-prefixed so that moving bytes between
    /// adjacent images changes the key.
    pub fn new(prompt_version: &str, images: &[InlineImage]) -> Self {
        let mut hasher = blake3::Hasher::new();
        update_framed(&mut hasher, prompt_version.as_bytes());
        hasher.update(&(images.len() as u64).to_le_bytes());
        for image in images {
            update_framed(&mut hasher, image.mime_type.as_bytes());
            update_framed(&mut hasher, image.data.as_bytes());
        }
        Self(hasher.finalize())
    }
}

fn update_framed(hasher: &mut blake3::Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "blake3:{}", self.0.to_hex())
    }
}

/// Concurrent map from [`CacheKey`] to a shared record.
#[derive(Debug, Default)]
pub struct ExtractionCache {
    entries: RwLock<HashMap<CacheKey, Arc<ExtractedRecord>>>,
}

impl ExtractionCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<Arc<ExtractedRecord>> {
        self.entries.read().await.get(key).cloned()
    }

    /// Store a record. An existing entry for the same key is kept, so
    /// concurrent identical requests all end up sharing one record.
    pub async fn insert(&self, key: CacheKey, record: ExtractedRecord) -> Arc<ExtractedRecord> {
        let mut entries = self.entries.write().await;
        let stored = Arc::clone(entries.entry(key).or_insert_with(|| Arc::new(record)));
        debug!("Cached record {} ({} entries)", key, entries.len());
        stored
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn clear(&self) {
        self.entries.write().await.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn img(data: &str) -> InlineImage {
        InlineImage {
            mime_type: "image/png".into(),
            data: data.into(),
        }
    }

    fn record(name: &str) -> ExtractedRecord {
        match json!({ "insured_name": name }) {
            serde_json::Value::Object(m) => ExtractedRecord::new(m),
            _ => unreachable!(),
        }
    }

    #[test]
    fn key_depends_on_order_version_and_framing() {
        let a = CacheKey::new("v1", &[img("AA"), img("BB")]);
        assert_eq!(a, CacheKey::new("v1", &[img("AA"), img("BB")]));
        assert_ne!(a, CacheKey::new("v1", &[img("BB"), img("AA")]));
        assert_ne!(a, CacheKey::new("v2", &[img("AA"), img("BB")]));
        assert_ne!(a, CacheKey::new("v1", &[img("A"), img("ABB")]));
        assert!(a.to_string().starts_with("blake3:"));
        assert_eq!(a.to_string().len(), "blake3:".len() + 64);
    }

    #[test]
    fn insert_then_get() {
        tokio_test::block_on(async {
            let cache = ExtractionCache::new();
            let key = CacheKey::new("v1", &[img("AA")]);
            assert!(cache.get(&key).await.is_none());

            let stored = cache.insert(key, record("Jane")).await;
            let hit = cache.get(&key).await.expect("cached");
            assert!(Arc::ptr_eq(&stored, &hit));
            assert_eq!(cache.len().await, 1);
        });
    }

    #[test]
    fn first_insert_wins() {
        tokio_test::block_on(async {
            let cache = ExtractionCache::new();
            let key = CacheKey::new("v1", &[img("AA")]);
            cache.insert(key, record("first")).await;
            let kept = cache.insert(key, record("second")).await;
            assert_eq!(kept.get("insured_name").and_then(|v| v.as_str()), Some("first"));

            cache.clear().await;
            assert!(cache.is_empty().await);
        });
    }
}
