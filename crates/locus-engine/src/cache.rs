//! Exact-match cache of heal responses.
//!
//! A key is the failed locator and the page identity, plus every request
//! option that changes the result: kind hint, coverage and usage description.
//!
//! Entries are recomputable, so concurrent writers may overwrite each other
//! and a contended read is simply a miss.

use locus_common::locator::{Coverage, LocatorKindHint};
use locus_common::protocol::{HealRequest, HealResponse};
use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, TryLockError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub failed_selector: String,
    pub page_identity: String,
    pub kind_hint: LocatorKindHint,
    pub coverage: Coverage,
    pub usage: Option<String>,
}

impl CacheKey {
    pub fn for_request(request: &HealRequest) -> Self {
        Self {
            failed_selector: request.failed_selector.trim().to_string(),
            page_identity: page_identity(request),
            kind_hint: request.locator_kind_hint,
            coverage: request.coverage,
            usage: request.usage().map(str::to_string),
        }
    }
}

/// The page URL without its fragment, or a content hash when no URL is given.
pub fn page_identity(request: &HealRequest) -> String {
    if let Some(raw) = request.page_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return match url::Url::parse(raw) {
            Ok(mut parsed) => {
                parsed.set_fragment(None);
                parsed.to_string()
            }
            Err(_) => raw.to_string(),
        };
    }

    let mut hasher = DefaultHasher::new();
    if let Some(elements) = &request.element_list {
        // Going through `Value` sorts attribute keys.
        serde_json::to_value(elements)
            .map(|value| value.to_string())
            .unwrap_or_default()
            .hash(&mut hasher);
    } else {
        request.markup.as_deref().unwrap_or_default().hash(&mut hasher);
    }
    format!("content:{:016x}", hasher.finish())
}

pub trait HealCache: Send + Sync {
    /// Non-blocking lookup.
    fn get(&self, key: &CacheKey) -> Option<HealResponse>;

    fn put(&self, key: CacheKey, response: HealResponse);
}

struct Entry {
    response: HealResponse,
    inserted: Instant,
}

/// In-process cache with a TTL and oldest-first eviction.
pub struct InMemoryHealCache {
    ttl: Duration,
    capacity: usize,
    entries: Mutex<HashMap<CacheKey, Entry>>,
}

impl InMemoryHealCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            ttl,
            capacity: capacity.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HealCache for InMemoryHealCache {
    fn get(&self, key: &CacheKey) -> Option<HealResponse> {
        let mut entries = match self.entries.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                tracing::debug!("Cache busy, treating lookup as a miss");
                return None;
            }
        };

        let expired = entries
            .get(key)
            .is_some_and(|entry| entry.inserted.elapsed() >= self.ttl);
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.response.clone())
    }

    fn put(&self, key: CacheKey, response: HealResponse) {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let ttl = self.ttl;
        entries.retain(|_, entry| entry.inserted.elapsed() < ttl);

        if !entries.contains_key(&key) && entries.len() >= self.capacity {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            key,
            Entry {
                response,
                inserted: Instant::now(),
            },
        );
    }
}
