use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::models::ProductInfo;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    pub product: ProductInfo,
    pub refreshed_at: DateTime<Utc>,
}

/// Last-known product metadata per URL, kept for the whole run.
///
/// Entries are only ever freshened: an empty extraction or a failed fetch
/// never replaces what is already known, and entries are never removed.
#[derive(Debug, Clone, Default)]
pub struct MetadataCache {
    entries: HashMap<String, CacheEntry>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge freshly extracted fields into the entry for `url`.
    ///
    /// Returns `false`, leaving the cache untouched, when `fresh` carries no
    /// fields at all.
    pub fn merge(&mut self, url: &str, fresh: &ProductInfo, at: DateTime<Utc>) -> bool {
        if fresh.is_empty() {
            return false;
        }

        match self.entries.get_mut(url) {
            Some(entry) => {
                entry.product.merge_from(fresh);
                if at > entry.refreshed_at {
                    entry.refreshed_at = at;
                }
            }
            None => {
                self.entries.insert(
                    url.to_string(),
                    CacheEntry {
                        product: fresh.clone(),
                        refreshed_at: at,
                    },
                );
            }
        }

        true
    }

    pub fn get(&self, url: &str) -> Option<&CacheEntry> {
        self.entries.get(url)
    }

    pub fn product(&self, url: &str) -> Option<&ProductInfo> {
        self.entries.get(url).map(|entry| &entry.product)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CacheEntry)> {
        self.entries.iter()
    }
}
