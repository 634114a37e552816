//! Batched URL resolution with an order-independent join.
//!
//! The resolver answers a batch of lookup keys but does not promise to keep
//! their order. Instead of trusting positions, returned URLs are matched back
//! to file names through the file name embedded in each URL.

use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::UrlResolver;
use crate::api::logs::{log_info, log_warning};
use crate::error::ResolveResult;
use crate::models::ImportWarning;

/// Result of resolving a set of file names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResolvedUrls {
    by_name: BTreeMap<String, Option<String>>,
    /// Diagnostics from the join (ambiguous matches).
    pub warnings: Vec<ImportWarning>,
}

impl ResolvedUrls {
    /// Every name left without a URL, as when the resolver is skipped.
    pub fn unresolved<S: AsRef<str>>(names: &[S]) -> Self {
        Self {
            by_name: names
                .iter()
                .map(|n| (n.as_ref().to_string(), None))
                .collect(),
            warnings: Vec::new(),
        }
    }

    /// URL of a manifest file name, if one was resolved.
    pub fn url_for(&self, name: &str) -> Option<&str> {
        self.by_name.get(name).and_then(|u| u.as_deref())
    }

    /// Distinct names without a URL, alphabetically.
    pub fn gaps(&self) -> impl Iterator<Item = &str> {
        self.by_name
            .iter()
            .filter(|(_, url)| url.is_none())
            .map(|(name, _)| name.as_str())
    }

    pub fn resolved_count(&self) -> usize {
        self.by_name.values().filter(|u| u.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Wraps a [`UrlResolver`] and exposes a "file name → URL" lookup.
pub struct UrlResolutionAdapter<'a, R: UrlResolver + ?Sized> {
    resolver: &'a R,
    namespace: &'a str,
}

impl<'a, R: UrlResolver + ?Sized> UrlResolutionAdapter<'a, R> {
    pub fn new(resolver: &'a R, namespace: &'a str) -> Self {
        Self {
            resolver,
            namespace,
        }
    }

    /// Namespaced lookup keys for `names`, deduplicated and sorted.
    pub fn lookup_keys<S: AsRef<str>>(&self, names: &[S]) -> Vec<String> {
        names
            .iter()
            .map(|n| format!("{}{}", self.namespace, n.as_ref()))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Resolve every name with a single resolver call.
    ///
    /// No call is made when `names` is empty.
    pub async fn resolve<S: AsRef<str>>(&self, names: &[S]) -> ResolveResult<ResolvedUrls> {
        let keys = self.lookup_keys(names);
        if keys.is_empty() {
            return Ok(ResolvedUrls::default());
        }

        log_info(format!("🔗 Resolving {} file URLs...", keys.len()));
        let returned = self.resolver.resolve_urls(&keys).await?;
        let urls = sort_urls(returned.into_iter().flatten().collect());

        // candidates per normalized file name, in sort order
        let mut candidates: HashMap<String, Vec<String>> = HashMap::new();
        for url in urls {
            candidates
                .entry(title_key(url_file_name(&url)))
                .or_default()
                .push(url);
        }

        let mut resolved = ResolvedUrls::default();
        for name in names {
            let name = name.as_ref();
            if resolved.by_name.contains_key(name) {
                continue;
            }
            let matches = candidates.get(&title_key(name));
            let url = matches.and_then(|m| m.first().cloned());
            if let Some(m) = matches.filter(|m| m.len() > 1) {
                let warning = ImportWarning::AmbiguousUrl {
                    name: name.to_string(),
                    candidates: m.clone(),
                };
                log_warning(warning.to_string());
                resolved.warnings.push(warning);
            }
            resolved.by_name.insert(name.to_string(), url);
        }

        log_info(format!(
            "   {} of {} resolved",
            resolved.resolved_count(),
            resolved.len()
        ));
        Ok(resolved)
    }
}

/// Sort URLs by the file name they carry, then by the full URL.
fn sort_urls(mut urls: Vec<String>) -> Vec<String> {
    urls.sort_by(|a, b| {
        title_key(url_file_name(a))
            .cmp(&title_key(url_file_name(b)))
            .then_with(|| a.cmp(b))
    });
    urls.dedup();
    urls
}

/// Last path segment of a URL, without query or fragment.
pub fn url_file_name(url: &str) -> &str {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.rsplit('/').next().unwrap_or(path)
}

/// Canonical form of a wiki file name.
///
/// Percent-escapes are decoded, underscores become spaces, whitespace is
/// collapsed and the first character is upper-cased, the way the wiki
/// normalizes titles. `"work_a.pdf"`, `"Work%20a.pdf"` and `"Work a.pdf"`
/// all map to `"Work a.pdf"`.
pub fn title_key(name: &str) -> String {
    let decoded = urlencoding::decode(name).unwrap_or(Cow::Borrowed(name));
    let spaced = decoded.replace('_', " ");
    let collapsed = spaced.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// Serves URLs from a fixed table, in reverse key order.
    struct StubResolver {
        base: &'static str,
        known: Vec<&'static str>,
        calls: Mutex<Vec<Vec<String>>>,
    }

    impl StubResolver {
        fn new(known: Vec<&'static str>) -> Self {
            Self {
                base: "https://www.cpdl.org/wiki/images",
                known,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<Vec<String>> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl UrlResolver for StubResolver {
        async fn resolve_urls(&self, keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
            self.calls.lock().unwrap().push(keys.to_vec());
            Ok(keys
                .iter()
                .rev()
                .map(|key| {
                    let name = key.strip_prefix("File:").unwrap_or(key);
                    self.known
                        .iter()
                        .any(|k| *k == name)
                        .then(|| format!("{}/a/ab/{}", self.base, name.replace(' ', "_")))
                })
                .collect())
        }
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_title_key() {
        assert_eq!(title_key("work_a.pdf"), "Work a.pdf");
        assert_eq!(title_key("Work%20a.pdf"), "Work a.pdf");
        assert_eq!(title_key("Ecco_morir%C3%B2.pdf"), "Ecco morirò.pdf");
        assert_eq!(title_key(""), "");
    }

    #[test]
    fn test_url_file_name() {
        assert_eq!(
            url_file_name("https://www.cpdl.org/wiki/images/4/4d/Work-A.pdf"),
            "Work-A.pdf"
        );
        assert_eq!(url_file_name("https://x/images/Work-A.mid?version=2"), "Work-A.mid");
        assert_eq!(url_file_name("Work-A.pdf"), "Work-A.pdf");
    }

    #[test]
    fn test_lookup_keys_sorted_and_deduplicated() {
        let stub = StubResolver::new(vec![]);
        let adapter = UrlResolutionAdapter::new(&stub, "File:");
        let keys = adapter.lookup_keys(&names(&["b.pdf", "a.mid", "b.pdf"]));
        assert_eq!(keys, vec!["File:a.mid", "File:b.pdf"]);
    }

    #[tokio::test]
    async fn test_shuffled_response_joins_by_name() {
        let stub = StubResolver::new(vec!["Work-A.pdf", "Work-A.mid", "Work-B.pdf"]);
        let adapter = UrlResolutionAdapter::new(&stub, "File:");
        let files = names(&["Work-A.pdf", "Work-A.mid", "Work-B.pdf"]);

        let urls = adapter.resolve(&files).await.unwrap();

        for name in &files {
            let url = urls.url_for(name).unwrap();
            assert!(url.ends_with(&format!("/{}", name)), "{} -> {}", name, url);
        }
        assert_eq!(urls.gaps().count(), 0);
        assert_eq!(stub.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_url_becomes_gap() {
        let stub = StubResolver::new(vec!["Work-A.pdf"]);
        let adapter = UrlResolutionAdapter::new(&stub, "File:");
        let urls = adapter.resolve(&names(&["Work-A.pdf", "Work-A.mid"])).await.unwrap();

        assert!(urls.url_for("Work-A.pdf").is_some());
        assert!(urls.url_for("Work-A.mid").is_none());
        assert_eq!(urls.gaps().collect::<Vec<_>>(), vec!["Work-A.mid"]);
    }

    #[tokio::test]
    async fn test_no_call_for_empty_names() {
        let stub = StubResolver::new(vec![]);
        let adapter = UrlResolutionAdapter::new(&stub, "File:");
        let urls = adapter.resolve::<String>(&[]).await.unwrap();
        assert!(urls.is_empty());
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_resolution_is_idempotent() {
        let stub = StubResolver::new(vec!["Work A.pdf", "Work-B.pdf"]);
        let adapter = UrlResolutionAdapter::new(&stub, "File:");
        let files = names(&["Work A.pdf", "Work-B.pdf", "Work-C.pdf"]);

        let first = adapter.resolve(&files).await.unwrap();
        let second = adapter.resolve(&files).await.unwrap();
        assert_eq!(first, second);
        assert!(first.url_for("Work A.pdf").unwrap().ends_with("/Work_A.pdf"));
    }

    struct DuplicatingResolver;

    #[async_trait]
    impl UrlResolver for DuplicatingResolver {
        async fn resolve_urls(&self, _keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
            Ok(vec![
                Some("https://mirror-b/images/Work-A.pdf".to_string()),
                None,
                Some("https://mirror-a/images/Work-A.pdf".to_string()),
            ])
        }
    }

    #[tokio::test]
    async fn test_ambiguous_match_takes_first_in_order() {
        let adapter = UrlResolutionAdapter::new(&DuplicatingResolver, "File:");
        let urls = adapter.resolve(&names(&["Work-A.pdf"])).await.unwrap();

        assert_eq!(
            urls.url_for("Work-A.pdf"),
            Some("https://mirror-a/images/Work-A.pdf")
        );
        assert!(matches!(
            urls.warnings.as_slice(),
            [ImportWarning::AmbiguousUrl { candidates, .. }] if candidates.len() == 2
        ));
    }

    #[test]
    fn test_unresolved_marks_everything() {
        let urls = ResolvedUrls::unresolved(&names(&["a.pdf", "a.mid", "a.pdf"]));
        assert_eq!(urls.len(), 2);
        assert_eq!(urls.resolved_count(), 0);
    }
}
