//! On-Disk Response Cache
//!
//! Wraps an expensive producer behind a fingerprint lookup. Entries live at
//! `<root>/<namespace>/<fingerprint>.json` and are never rewritten in place.

use super::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Separate key spaces for text and image artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    Text,
    Image,
}

impl Namespace {
    /// Subdirectory name
    pub fn dir_name(&self) -> &'static str {
        match self {
            Namespace::Text => "text",
            Namespace::Image => "image",
        }
    }
}

/// Stored envelope around a cached payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// Key the entry was stored under
    pub fingerprint: String,
    /// When the producer ran
    pub created_at: DateTime<Utc>,
    /// Producer output
    pub payload: T,
}

/// Content-addressed artifact cache
#[derive(Debug, Clone)]
pub struct ResponseCache {
    root: PathBuf,
    enabled: bool,
}

impl ResponseCache {
    /// Cache rooted at `root`; when `enabled` is false every lookup misses
    /// and nothing is written
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        Self {
            root: root.into(),
            enabled,
        }
    }

    /// A cache that always invokes the producer
    pub fn disabled() -> Self {
        Self::new(PathBuf::new(), false)
    }

    /// Whether reads and writes are active
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return the cached artifact for `fingerprint`, or run `producer` once
    /// and store its result.
    ///
    /// Producer errors are returned unchanged and nothing is stored. Storage
    /// failures never reach the caller: a failed read counts as a miss and a
    /// failed write is logged.
    pub fn get_or_compute<T, E, F>(
        &self,
        namespace: Namespace,
        fingerprint: &Fingerprint,
        producer: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T, E>,
    {
        if !self.enabled {
            return producer();
        }

        match self.read::<T>(namespace, fingerprint) {
            Ok(Some(entry)) => {
                debug!(
                    namespace = namespace.dir_name(),
                    fingerprint = %fingerprint,
                    created_at = %entry.created_at,
                    "Cache hit"
                );
                return Ok(entry.payload);
            }
            Ok(None) => {
                debug!(namespace = namespace.dir_name(), fingerprint = %fingerprint, "Cache miss");
            }
            Err(e) => {
                warn!(
                    namespace = namespace.dir_name(),
                    fingerprint = %fingerprint,
                    error = %e,
                    "Cache read failed, recomputing"
                );
            }
        }

        let payload = producer()?;

        if let Err(e) = self.write(namespace, fingerprint, &payload) {
            warn!(
                namespace = namespace.dir_name(),
                fingerprint = %fingerprint,
                error = %e,
                "Cache write failed, continuing without caching"
            );
        }

        Ok(payload)
    }

    /// Whether an entry file exists for `fingerprint`
    pub fn contains(&self, namespace: Namespace, fingerprint: &Fingerprint) -> bool {
        self.enabled && self.entry_path(namespace, fingerprint).is_file()
    }

    /// Location of the entry for `fingerprint`
    pub fn entry_path(&self, namespace: Namespace, fingerprint: &Fingerprint) -> PathBuf {
        self.root
            .join(namespace.dir_name())
            .join(format!("{}.json", fingerprint))
    }

    fn read<T: DeserializeOwned>(
        &self,
        namespace: Namespace,
        fingerprint: &Fingerprint,
    ) -> crate::Result<Option<CacheEntry<T>>> {
        let path = self.entry_path(namespace, fingerprint);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(crate::Error::CacheIo(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let entry: CacheEntry<T> = serde_json::from_str(&content).map_err(|e| {
            crate::Error::CacheIo(format!("corrupt entry {}: {}", path.display(), e))
        })?;

        if entry.fingerprint != fingerprint.as_str() {
            return Err(crate::Error::CacheIo(format!(
                "entry {} was stored under fingerprint {}",
                path.display(),
                entry.fingerprint
            )));
        }

        Ok(Some(entry))
    }

    fn write<T: Serialize>(
        &self,
        namespace: Namespace,
        fingerprint: &Fingerprint,
        payload: &T,
    ) -> crate::Result<()> {
        let path = self.entry_path(namespace, fingerprint);
        let io_err = |e: std::io::Error| {
            crate::Error::CacheIo(format!("failed to write {}: {}", path.display(), e))
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }

        let entry = CacheEntry {
            fingerprint: fingerprint.to_string(),
            created_at: Utc::now(),
            payload,
        };
        let json = serde_json::to_string(&entry)?;

        // Readers only ever see a complete entry; concurrent writers race on
        // the rename and the last one wins.
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, json).map_err(io_err)?;
        std::fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp_path);
            io_err(e)
        })?;

        debug!(namespace = namespace.dir_name(), fingerprint = %fingerprint, "Cache entry stored");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn fp(s: &str) -> Fingerprint {
        Fingerprint::derive([s])
    }

    #[test]
    fn test_hit_skips_producer() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);
        let calls = Cell::new(0);

        for _ in 0..3 {
            let value: Result<String, String> = cache.get_or_compute(Namespace::Text, &fp("k"), || {
                calls.set(calls.get() + 1);
                Ok("hello".to_string())
            });
            assert_eq!(value.unwrap(), "hello");
        }

        assert_eq!(calls.get(), 1);
        assert!(cache.contains(Namespace::Text, &fp("k")));
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);

        let _: Result<String, String> =
            cache.get_or_compute(Namespace::Text, &fp("same"), || Ok("text".to_string()));
        let image: Result<String, String> =
            cache.get_or_compute(Namespace::Image, &fp("same"), || Ok("image".to_string()));

        assert_eq!(image.unwrap(), "image");
        assert!(cache.entry_path(Namespace::Text, &fp("same")).ends_with(
            format!("text/{}.json", fp("same"))
        ));
    }

    #[test]
    fn test_producer_error_not_cached() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);

        let failed: Result<String, String> =
            cache.get_or_compute(Namespace::Text, &fp("k"), || Err("boom".to_string()));
        assert_eq!(failed.unwrap_err(), "boom");
        assert!(!cache.contains(Namespace::Text, &fp("k")));

        let recovered: Result<String, String> =
            cache.get_or_compute(Namespace::Text, &fp("k"), || Ok("ok".to_string()));
        assert_eq!(recovered.unwrap(), "ok");
    }

    #[test]
    fn test_disabled_always_produces() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), false);
        let calls = Cell::new(0);

        for _ in 0..3 {
            let _: Result<u32, String> = cache.get_or_compute(Namespace::Text, &fp("k"), || {
                calls.set(calls.get() + 1);
                Ok(7)
            });
        }

        assert_eq!(calls.get(), 3);
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_corrupt_entry_is_a_miss_and_gets_replaced() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);
        let path = cache.entry_path(Namespace::Text, &fp("k"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{ truncated").unwrap();

        let value: Result<String, String> =
            cache.get_or_compute(Namespace::Text, &fp("k"), || Ok("fresh".to_string()));
        assert_eq!(value.unwrap(), "fresh");

        let stored: CacheEntry<String> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(stored.payload, "fresh");
        assert_eq!(stored.fingerprint, fp("k").to_string());
    }

    #[test]
    fn test_mismatched_fingerprint_is_a_miss() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);
        let path = cache.entry_path(Namespace::Text, &fp("k"));
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let foreign = CacheEntry {
            fingerprint: fp("other").to_string(),
            created_at: Utc::now(),
            payload: "stale".to_string(),
        };
        std::fs::write(&path, serde_json::to_string(&foreign).unwrap()).unwrap();

        let value: Result<String, String> =
            cache.get_or_compute(Namespace::Text, &fp("k"), || Ok("fresh".to_string()));
        assert_eq!(value.unwrap(), "fresh");
    }

    #[test]
    fn test_unwritable_root_still_returns_payload() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();
        let cache = ResponseCache::new(&blocker, true);
        let calls = Cell::new(0);

        for _ in 0..2 {
            let value: Result<String, String> = cache.get_or_compute(Namespace::Image, &fp("k"), || {
                calls.set(calls.get() + 1);
                Ok("bytes".to_string())
            });
            assert_eq!(value.unwrap(), "bytes");
        }

        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_no_tmp_files_left_behind() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let cache = ResponseCache::new(temp_dir.path(), true);
        let _: Result<String, String> =
            cache.get_or_compute(Namespace::Text, &fp("k"), || Ok("v".to_string()));

        let names: Vec<_> = std::fs::read_dir(temp_dir.path().join("text"))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec![format!("{}.json", fp("k"))]);
    }
}
