//! File name → download URL resolution.
//!
//! The resolver itself is an external collaborator behind [`UrlResolver`]:
//! one batched call, ordered lookup keys in, URLs out in no guaranteed order.
//! [`adapter::UrlResolutionAdapter`] hides that ordering from the rest of the
//! pipeline and exposes a plain "file name → URL" lookup.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cpdl_ingest::resolve::{MediaWikiClient, UrlResolutionAdapter};
//!
//! let client = MediaWikiClient::from_env()?;
//! let adapter = UrlResolutionAdapter::new(&client, "File:");
//! let urls = adapter.resolve(&["Work-A.pdf".to_string()]).await?;
//! println!("{:?}", urls.url_for("Work-A.pdf"));
//! ```

pub mod adapter;
pub mod mediawiki;

use async_trait::async_trait;

use crate::error::ResolveResult;

pub use adapter::{title_key, url_file_name, ResolvedUrls, UrlResolutionAdapter};
pub use mediawiki::{MediaWikiClient, SearchHit};

/// The URL resolution collaborator.
#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Resolve namespaced lookup keys (e.g. `File:Work-A.pdf`) in one batch.
    ///
    /// Entries may come back in any order; keys without a file yield `None`
    /// or are left out.
    async fn resolve_urls(&self, lookup_keys: &[String]) -> ResolveResult<Vec<Option<String>>>;
}

#[async_trait]
impl<R: UrlResolver + ?Sized> UrlResolver for std::sync::Arc<R> {
    async fn resolve_urls(&self, lookup_keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
        (**self).resolve_urls(lookup_keys).await
    }
}
