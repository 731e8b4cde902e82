//! `<KIN_HOME>/pricing_cache.json`: `{provider:model -> prices}`, TTL 24h.
//!
//! The agent core only ever consumes resolved prices; fetching fresh
//! prices from a provider's pricing page is a frontend concern and is not
//! implemented here.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::paths::Paths;

const TTL_SECS: i64 = 24 * 60 * 60;

/// One cached price quote for a `provider:model` key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CachedPrice {
    /// USD per million input tokens.
    pub input_price: f64,
    /// USD per million output tokens.
    pub output_price: f64,
    /// Unix epoch seconds when this entry was fetched.
    pub fetched_at_epoch: i64,
}

impl CachedPrice {
    fn is_fresh(&self, now_epoch: i64) -> bool {
        now_epoch.saturating_sub(self.fetched_at_epoch) < TTL_SECS
    }
}

/// The on-disk pricing cache, keyed by `"provider:model"`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PricingCache {
    #[serde(flatten)]
    entries: HashMap<String, CachedPrice>,
}

impl PricingCache {
    /// Load from `paths.pricing_cache_file()`, or an empty cache if the
    /// file does not exist.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file exists but cannot be read or
    /// parsed.
    pub fn load(paths: &Paths) -> ConfigResult<Self> {
        let path = paths.pricing_cache_file();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::ReadError {
                    path: path.display().to_string(),
                    source,
                });
            }
        };
        serde_json::from_str(&content).map_err(|source| ConfigError::JsonError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Persist to `paths.pricing_cache_file()`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if serialization or the write fails.
    pub fn save(&self, paths: &Paths) -> ConfigResult<()> {
        let path = paths.pricing_cache_file();
        let text = serde_json::to_string_pretty(self).map_err(|source| ConfigError::JsonError {
            path: path.display().to_string(),
            source,
        })?;
        std::fs::write(&path, text).map_err(|source| ConfigError::ReadError {
            path: path.display().to_string(),
            source,
        })
    }

    /// Look up a still-fresh entry for `provider:model`, given the
    /// current epoch time. Returns `None` if absent or stale.
    #[must_use]
    pub fn get_fresh(&self, provider: &str, model: &str, now_epoch: i64) -> Option<&CachedPrice> {
        let key = format!("{provider}:{model}");
        self.entries
            .get(&key)
            .filter(|entry| entry.is_fresh(now_epoch))
    }

    /// Insert or replace the entry for `provider:model`.
    pub fn put(&mut self, provider: &str, model: &str, price: CachedPrice) {
        self.entries.insert(format!("{provider}:{model}"), price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_entry_is_returned() {
        let mut cache = PricingCache::default();
        cache.put(
            "anthropic",
            "claude",
            CachedPrice {
                input_price: 3.0,
                output_price: 15.0,
                fetched_at_epoch: 1000,
            },
        );
        assert!(cache.get_fresh("anthropic", "claude", 1000 + 60).is_some());
    }

    #[test]
    fn stale_entry_is_not_returned() {
        let mut cache = PricingCache::default();
        cache.put(
            "anthropic",
            "claude",
            CachedPrice {
                input_price: 3.0,
                output_price: 15.0,
                fetched_at_epoch: 1000,
            },
        );
        assert!(cache
            .get_fresh("anthropic", "claude", 1000 + TTL_SECS + 1)
            .is_none());
    }

    #[test]
    fn round_trips_through_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let paths = Paths::resolve(Some(dir.path().to_path_buf())).unwrap();
        let mut cache = PricingCache::default();
        cache.put(
            "openai",
            "gpt",
            CachedPrice {
                input_price: 1.0,
                output_price: 2.0,
                fetched_at_epoch: 500,
            },
        );
        cache.save(&paths).unwrap();
        let loaded = PricingCache::load(&paths).unwrap();
        let entry = loaded.get_fresh("openai", "gpt", 500).unwrap();
        assert_eq!(entry.input_price, 1.0);
    }
}
