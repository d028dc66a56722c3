//! Edge cache for generated images
//!
//! Entries are keyed by the complete normalized request, so a cached image is
//! never stale: any input that could change the image changes the key.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use async_trait::async_trait;
use axum::body::Bytes;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Cache store errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store unavailable: {0}")]
    Unavailable(String),
}

/// Normalized request identity: `GET <path>?<sorted query>`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Build a key from a method, path and raw (still encoded) query string
    pub fn new(method: &str, path: &str, query: Option<&str>) -> Self {
        let mut pairs: Vec<(String, String)> = query
            .map(|q| {
                url::form_urlencoded::parse(q.as_bytes())
                    .into_owned()
                    .collect()
            })
            .unwrap_or_default();
        // Stable by name: repeated names keep their order, and the first one wins
        pairs.sort_by(|a, b| a.0.cmp(&b.0));

        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();

        Self(format!("{} {}?{}", method.to_uppercase(), path, query))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A cached image response body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedImage {
    pub data: Bytes,
    pub mime_type: String,
}

/// Key-value store for generated images
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &CacheKey) -> Option<CachedImage>;

    async fn put(&self, key: CacheKey, image: CachedImage) -> Result<(), CacheError>;
}

/// Cache sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of cached images; oldest entries are evicted first
    pub max_entries: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_entries: 1024 }
    }
}

#[derive(Debug, Default)]
struct Entries {
    images: HashMap<CacheKey, CachedImage>,
    order: VecDeque<CacheKey>,
}

/// In-process bounded image cache
#[derive(Debug)]
pub struct MemoryCache {
    entries: RwLock<Entries>,
    max_entries: usize,
}

impl MemoryCache {
    /// Create a new cache holding at most `max_entries` images
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Entries::default()),
            max_entries: max_entries.max(1),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_entries)
    }

    /// Number of cached images
    pub fn len(&self) -> usize {
        self.entries.read().images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check if a key is cached
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.read().images.contains_key(key)
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedImage> {
        self.entries.read().images.get(key).cloned()
    }

    async fn put(&self, key: CacheKey, image: CachedImage) -> Result<(), CacheError> {
        let mut entries = self.entries.write();

        // Last write wins; an overwrite keeps the original eviction slot
        if entries.images.insert(key.clone(), image).is_none() {
            entries.order.push_back(key);
        }

        while entries.images.len() > self.max_entries {
            let Some(oldest) = entries.order.pop_front() else {
                break;
            };
            entries.images.remove(&oldest);
            debug!("Evicted cached image {}", oldest);
        }

        Ok(())
    }
}
