//! JSON result cache

use crate::proxy::models::{ProbeOutcome, ProbeStatus, ProxyRecord, SecretMode};
use crate::proxy::secret::SecretValidator;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("cache I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("cache format error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One cached outcome, flattened for the JSON file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    pub server: String,
    pub port: u16,
    pub secret: String,
    pub secret_mode: SecretMode,
    #[serde(rename = "canonicalURI")]
    pub canonical_uri: String,
    pub status: ProbeStatus,
    pub latency_ms: Option<u64>,
}

impl From<&ProbeOutcome> for CacheEntry {
    fn from(outcome: &ProbeOutcome) -> Self {
        let record = &outcome.record;
        Self {
            server: record.server().to_string(),
            port: record.port(),
            secret: record.secret().to_string(),
            secret_mode: record.secret_mode(),
            canonical_uri: record.canonical_uri().to_string(),
            status: outcome.status,
            latency_ms: outcome.latency_ms,
        }
    }
}

impl CacheEntry {
    /// Rebuild the outcome, re-validating the secret.
    ///
    /// The stored mode and link are ignored and derived again.
    pub fn into_outcome(self) -> Option<ProbeOutcome> {
        let secret = SecretValidator::validate(&self.secret)?;
        Some(ProbeOutcome {
            record: ProxyRecord::new(self.server, self.port, secret),
            status: self.status,
            latency_ms: self.latency_ms,
        })
    }
}

/// Result cache stored as a JSON array
#[derive(Debug, Clone)]
pub struct ResultCache {
    path: PathBuf,
}

impl ResultCache {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write outcomes, replacing the previous cache
    pub fn save(&self, outcomes: &[ProbeOutcome]) -> Result<(), StoreError> {
        let entries: Vec<CacheEntry> = outcomes.iter().map(CacheEntry::from).collect();
        let content = serde_json::to_string_pretty(&entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, content)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Read cached outcomes; `None` when there is no cache file.
    ///
    /// Entries whose secret no longer validates are skipped.
    pub fn load(&self) -> Result<Option<Vec<ProbeOutcome>>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let entries: Vec<CacheEntry> = serde_json::from_str(&content)?;
        Ok(Some(
            entries
                .into_iter()
                .filter_map(CacheEntry::into_outcome)
                .collect(),
        ))
    }

    /// Time the cache was last written
    pub fn checked_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        match fs::metadata(&self.path) {
            Ok(metadata) => Ok(Some(DateTime::<Utc>::from(metadata.modified()?))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Whether the cache was written less than `ttl` ago
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        let Ok(Some(checked_at)) = self.checked_at() else {
            return false;
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return true;
        };
        Utc::now().signed_duration_since(checked_at) < ttl
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(server: &str, secret: &str, status: ProbeStatus, latency_ms: Option<u64>) -> ProbeOutcome {
        ProbeOutcome {
            record: ProxyRecord::new(
                server.to_string(),
                443,
                SecretValidator::validate(secret).unwrap(),
            ),
            status,
            latency_ms,
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path().join("nested").join("proxies.json"));
        let outcomes = vec![
            outcome("1.2.3.4", "dd0123456789abcdef0123456789abcd", ProbeStatus::Online, Some(12)),
            outcome("5.6.7.8", "0123456789abcdef0123456789abcdef", ProbeStatus::Offline, None),
        ];

        cache.save(&outcomes).unwrap();
        let loaded = cache.load().unwrap().unwrap();
        assert_eq!(loaded, outcomes);
    }

    #[test]
    fn test_json_field_names() {
        let entry = CacheEntry::from(&outcome(
            "1.2.3.4",
            "ee0123456789abcdef0123456789abcdef6578616d706c65",
            ProbeStatus::Unstable,
            Some(80),
        ));
        let value = serde_json::to_value(&entry).unwrap();

        assert_eq!(value["server"], "1.2.3.4");
        assert_eq!(value["port"], 443);
        assert_eq!(value["secretMode"], "tls");
        assert_eq!(value["status"], "unstable");
        assert_eq!(value["latencyMs"], 80);
        assert!(value["canonicalURI"].as_str().unwrap().starts_with("tg://proxy?"));
    }

    #[test]
    fn test_load_skips_invalid_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.json");
        let content = r#"[
            {"server": "1.2.3.4", "port": 443, "secret": "dd00", "secretMode": "secured",
             "canonicalURI": "tg://proxy?server=1.2.3.4&port=443&secret=dd00",
             "status": "online", "latencyMs": 5},
            {"server": "5.6.7.8", "port": 443, "secret": "0123456789ABCDEF0123456789abcdef",
             "secretMode": "tls", "canonicalURI": "garbage",
             "status": "offline", "latencyMs": null}
        ]"#;
        fs::write(&path, content).unwrap();

        let loaded = ResultCache::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.len(), 1);
        let record = &loaded[0].record;
        assert_eq!(record.secret(), "0123456789abcdef0123456789abcdef");
        assert_eq!(record.secret_mode(), SecretMode::Standard);
        assert_eq!(
            record.canonical_uri(),
            "tg://proxy?server=5.6.7.8&port=443&secret=0123456789abcdef0123456789abcdef"
        );
    }

    #[test]
    fn test_missing_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path().join("missing.json"));
        assert!(cache.load().unwrap().is_none());
        assert!(cache.checked_at().unwrap().is_none());
        assert!(!cache.is_fresh(Duration::from_secs(3600)));
    }

    #[test]
    fn test_corrupt_cache_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(ResultCache::new(&path).load(), Err(StoreError::Json(_))));
    }

    #[test]
    fn test_freshness() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ResultCache::new(dir.path().join("proxies.json"));
        cache.save(&[]).unwrap();

        assert!(cache.is_fresh(Duration::from_secs(3600)));
        assert!(!cache.is_fresh(Duration::ZERO));
        assert!(cache.checked_at().unwrap().is_some());
    }
}
