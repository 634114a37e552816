//! URL cache - Store and reuse resolved download URLs
//!
//! File URLs on the wiki rarely change, so resolved URLs are kept in a JSON
//! file and only cache misses reach the resolver.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::api::logs::{log_info, log_warning};
use crate::config::{ImportOptions, DEFAULT_CACHE_DIR};
use crate::error::{CacheError, CacheResult, ResolveResult};
use crate::resolve::{title_key, url_file_name, UrlResolver};

/// File holding the cached URLs, inside the cache directory.
const CACHE_FILE: &str = "urls.json";

/// A cached URL with metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedUrl {
    /// Namespaced lookup key (e.g. `File:Work-A.pdf`)
    pub key: String,
    pub url: String,
    /// When the URL was resolved
    pub resolved_at: String,
}

/// On-disk cache of resolved URLs
pub struct UrlCache {
    path: PathBuf,
    /// key -> entry
    entries: BTreeMap<String, CachedUrl>,
}

impl UrlCache {
    /// Open the cache in the default directory
    pub fn new() -> Self {
        Self::with_dir(DEFAULT_CACHE_DIR)
    }

    /// Open the cache in a custom directory, loading existing entries.
    ///
    /// A missing or unreadable cache file gives an empty cache.
    pub fn with_dir(dir: impl AsRef<Path>) -> Self {
        let path = dir.as_ref().join(CACHE_FILE);
        let entries = fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str::<Vec<CachedUrl>>(&content).ok())
            .map(|list| list.into_iter().map(|e| (e.key.clone(), e)).collect())
            .unwrap_or_default();
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&CachedUrl> {
        self.entries.get(key)
    }

    /// All entries, sorted by key
    pub fn list(&self) -> Vec<&CachedUrl> {
        self.entries.values().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<String>, url: impl Into<String>) {
        let key = key.into();
        self.entries.insert(
            key.clone(),
            CachedUrl {
                key,
                url: url.into(),
                resolved_at: chrono::Utc::now().to_rfc3339(),
            },
        );
    }

    /// Write the cache to disk
    pub fn save(&self) -> CacheResult<()> {
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let list: Vec<&CachedUrl> = self.entries.values().collect();
        fs::write(&self.path, serde_json::to_string_pretty(&list)?)?;
        Ok(())
    }

    /// Drop every entry and remove the cache file
    pub fn clear(&mut self) -> CacheResult<usize> {
        let removed = self.entries.len();
        self.entries.clear();
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(removed),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(removed),
            Err(e) => Err(CacheError::Io(e)),
        }
    }
}

impl Default for UrlCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Title part of a namespaced key (`File:Work-A.pdf` -> `Work-A.pdf`).
fn key_title<'a>(key: &'a str, namespace: &str) -> &'a str {
    key.strip_prefix(namespace).unwrap_or(key)
}

/// A [`UrlResolver`] that answers from a [`UrlCache`] first.
///
/// Misses are sent to the inner resolver in one batch; what comes back is
/// stored and the cache file rewritten.
pub struct CachingResolver<R> {
    inner: R,
    cache: Mutex<UrlCache>,
    namespace: String,
}

impl<R: UrlResolver> CachingResolver<R> {
    pub fn new(inner: R, cache: UrlCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
            namespace: ImportOptions::default().namespace,
        }
    }

    /// Namespace prefix of the lookup keys this resolver receives.
    pub fn with_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// Split keys into cached URLs and misses.
    fn lookup(&self, keys: &[String]) -> (Vec<Option<String>>, Vec<String>) {
        let cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut hits = Vec::new();
        let mut misses = Vec::new();
        for key in keys {
            match cache.get(key) {
                Some(entry) => hits.push(Some(entry.url.clone())),
                None => misses.push(key.clone()),
            }
        }
        (hits, misses)
    }

    fn store(&self, misses: &[String], fetched: &[Option<String>]) {
        let mut cache = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let mut stored = 0;
        for url in fetched.iter().flatten() {
            let name = title_key(url_file_name(url));
            if let Some(key) = misses
                .iter()
                .find(|k| title_key(key_title(k, &self.namespace)) == name) {
                cache.insert(key.clone(), url.clone());
                stored += 1;
            }
        }
        if stored == 0 {
            return;
        }
        if let Err(e) = cache.save() {
            log_warning(format!("Could not write URL cache: {}", e));
        }
    }
}

#[async_trait]
impl<R: UrlResolver> UrlResolver for CachingResolver<R> {
    async fn resolve_urls(&self, lookup_keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
        let (mut urls, misses) = self.lookup(lookup_keys);
        log_info(format!(
            "   📦 {} cached, {} to resolve",
            urls.len(),
            misses.len()
        ));
        if misses.is_empty() {
            return Ok(urls);
        }

        let fetched = self.inner.resolve_urls(&misses).await?;
        self.store(&misses, &fetched);
        urls.extend(fetched);
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    struct CountingResolver {
        requested: AtomicUsize,
    }

    #[async_trait]
    impl UrlResolver for CountingResolver {
        async fn resolve_urls(&self, keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
            self.requested.fetch_add(keys.len(), Ordering::SeqCst);
            Ok(keys
                .iter()
                .map(|k| Some(format!("https://www.cpdl.org/wiki/images/x/{}", key_title(k, "File:"))))
                .collect())
        }
    }

    fn counting() -> CountingResolver {
        CountingResolver {
            requested: AtomicUsize::new(0),
        }
    }

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let mut cache = UrlCache::with_dir(dir.path());
        assert!(cache.is_empty());

        cache.insert("File:A.pdf", "https://x/A.pdf");
        cache.save().unwrap();

        let reloaded = UrlCache::with_dir(dir.path());
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get("File:A.pdf").unwrap().url, "https://x/A.pdf");
    }

    #[test]
    fn test_clear_removes_file() {
        let dir = tempdir().unwrap();
        let mut cache = UrlCache::with_dir(dir.path());
        cache.insert("File:A.pdf", "https://x/A.pdf");
        cache.save().unwrap();

        assert_eq!(cache.clear().unwrap(), 1);
        assert!(!cache.path().exists());
        // clearing twice is fine
        assert_eq!(cache.clear().unwrap(), 0);
    }

    #[test]
    fn test_corrupt_file_gives_empty_cache() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CACHE_FILE), "not json").unwrap();
        assert!(UrlCache::with_dir(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_only_misses_reach_inner_resolver() {
        let dir = tempdir().unwrap();
        let resolver = CachingResolver::new(counting(), UrlCache::with_dir(dir.path()));

        let first = resolver
            .resolve_urls(&keys(&["File:A.pdf", "File:B.pdf"]))
            .await
            .unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(resolver.inner().requested.load(Ordering::SeqCst), 2);

        let second = resolver
            .resolve_urls(&keys(&["File:A.pdf", "File:B.pdf", "File:C.pdf"]))
            .await
            .unwrap();
        assert_eq!(second.len(), 3);
        assert_eq!(resolver.inner().requested.load(Ordering::SeqCst), 3);

        // persisted for the next process
        assert_eq!(UrlCache::with_dir(dir.path()).len(), 3);
    }

    #[test]
    fn test_key_title() {
        assert_eq!(key_title("File:Work-A.pdf", "File:"), "Work-A.pdf");
        assert_eq!(key_title("Work-A.pdf", "File:"), "Work-A.pdf");
        assert_eq!(key_title("Mass: Kyrie.pdf", ""), "Mass: Kyrie.pdf");
    }

    struct BareResolver;

    #[async_trait]
    impl UrlResolver for BareResolver {
        async fn resolve_urls(&self, keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
            Ok(keys
                .iter()
                .map(|k| Some(format!("https://www.cpdl.org/wiki/images/x/{}", k.replace(' ', "_"))))
                .collect())
        }
    }

    #[tokio::test]
    async fn test_empty_namespace_keeps_colon_titles() {
        let dir = tempdir().unwrap();
        let resolver =
            CachingResolver::new(BareResolver, UrlCache::with_dir(dir.path())).with_namespace("");

        resolver
            .resolve_urls(&keys(&["Mass: Kyrie.pdf"]))
            .await
            .unwrap();

        let cache = UrlCache::with_dir(dir.path());
        assert_eq!(
            cache.get("Mass: Kyrie.pdf").unwrap().url,
            "https://www.cpdl.org/wiki/images/x/Mass:_Kyrie.pdf"
        );
    }
}
