//! Proxy Scout - MTProto proxy extractor and ranker
//!
//! Finds proxy links in scraped channel pages, validates their secrets,
//! probes every endpoint for liveness and ranks the results.

pub mod logging;
pub mod proxy;
pub mod report;
pub mod store;

pub use proxy::*;

use std::path::PathBuf;
use std::time::Duration;

/// Application result type
pub type Result<T> = anyhow::Result<T>;

/// Default cache lifetime in seconds
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Result cache file path
    pub cache_path: PathBuf,
    /// How long cached results are reused
    pub cache_ttl: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_path: PathBuf::from("proxies.json"),
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl Config {
    pub fn with_cache_path(mut self, path: PathBuf) -> Self {
        self.cache_path = path;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn cache(&self) -> store::ResultCache {
        store::ResultCache::new(self.cache_path.clone())
    }
}
