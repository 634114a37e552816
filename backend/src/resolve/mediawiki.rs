//! MediaWiki `api.php` client.
//!
//! Serves three calls against the catalogue wiki:
//! - `resolve_urls`: `prop=imageinfo` lookups, batched 50 titles per request
//! - `fetch_page`: the `action=parse` envelope of one page
//! - `search`: full-text search returning page ids and titles

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::UrlResolver;
use crate::api::logs::{log_info, log_warning};
use crate::config::Settings;
use crate::error::{ResolveError, ResolveResult};

/// Most titles the API accepts in one `titles=` parameter.
pub const TITLES_PER_REQUEST: usize = 50;

/// Most search hits requested at once.
const SEARCH_LIMIT: usize = 50;

/// Client for one wiki endpoint.
#[derive(Clone)]
pub struct MediaWikiClient {
    http: Client,
    api_url: String,
}

/// One search hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    #[serde(alias = "pageid")]
    pub page_id: u64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    query: Option<T>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    #[serde(default)]
    info: String,
}

#[derive(Debug, Deserialize)]
struct ImageInfoQuery {
    #[serde(default)]
    pages: Vec<ImageInfoPage>,
}

#[derive(Debug, Deserialize)]
struct ImageInfoPage {
    #[serde(default)]
    imageinfo: Vec<ImageInfo>,
}

#[derive(Debug, Deserialize)]
struct ImageInfo {
    url: String,
}

#[derive(Debug, Deserialize)]
struct SearchQuery {
    #[serde(default)]
    search: Vec<SearchHit>,
}

impl MediaWikiClient {
    /// Build a client from explicit settings.
    pub fn new(settings: &Settings) -> ResolveResult<Self> {
        let http = Client::builder()
            .timeout(settings.timeout)
            .user_agent(settings.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            api_url: settings.api_url.clone(),
        })
    }

    /// Build a client from `CPDL_*` environment variables.
    pub fn from_env() -> ResolveResult<Self> {
        Self::new(&Settings::from_env())
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    /// Raw `action=parse` envelope of a page, as JSON text.
    pub async fn fetch_page(&self, page_id: u64) -> ResolveResult<String> {
        log_info(format!("📡 Fetching page {}...", page_id));
        let body = self
            .get_text(&[
                ("action", "parse".to_string()),
                ("format", "json".to_string()),
                ("pageid", page_id.to_string()),
                ("prop", "text|images".to_string()),
            ])
            .await?;

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ResolveError::InvalidResponse(e.to_string()))?;
        if let Some(error) = value.get("error") {
            let error: ApiError = serde_json::from_value(error.clone())
                .map_err(|e| ResolveError::InvalidResponse(e.to_string()))?;
            return Err(api_error(error));
        }

        log_info(format!("   Received {} bytes", body.len()));
        Ok(body)
    }

    /// Pages matching `terms`, in the order the wiki returns them.
    pub async fn search(&self, terms: &str) -> ResolveResult<Vec<SearchHit>> {
        let query: SearchQuery = self
            .query(&[
                ("list", "search".to_string()),
                ("srsearch", terms.to_string()),
                ("srlimit", SEARCH_LIMIT.to_string()),
                ("srprop", String::new()),
            ])
            .await?;
        Ok(query.search)
    }

    async fn resolve_chunk(&self, titles: &[String]) -> ResolveResult<Vec<Option<String>>> {
        let query: ImageInfoQuery = self
            .query(&[
                ("prop", "imageinfo".to_string()),
                ("iiprop", "url".to_string()),
                ("titles", titles.join("|")),
            ])
            .await?;

        Ok(query
            .pages
            .into_iter()
            .map(|page| page.imageinfo.into_iter().next().map(|info| info.url))
            .collect())
    }

    /// `action=query` call, decoding the `query` member.
    async fn query<T: DeserializeOwned>(&self, params: &[(&str, String)]) -> ResolveResult<T> {
        let mut all = vec![
            ("action", "query".to_string()),
            ("format", "json".to_string()),
            ("formatversion", "2".to_string()),
        ];
        all.extend(params.iter().cloned());

        let body = self.get_text(&all).await?;
        let response: ApiResponse<T> = serde_json::from_str(&body)
            .map_err(|e| ResolveError::InvalidResponse(e.to_string()))?;

        if let Some(error) = response.error {
            return Err(api_error(error));
        }
        response
            .query
            .ok_or_else(|| ResolveError::InvalidResponse("missing 'query' member".to_string()))
    }

    async fn get_text(&self, params: &[(&str, String)]) -> ResolveResult<String> {
        let response = self.http.get(self.api_url.as_str()).query(params).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ResolveError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }
        Ok(body)
    }
}

fn api_error(error: ApiError) -> ResolveError {
    log_warning(format!("Wiki API error {}: {}", error.code, error.info));
    ResolveError::InvalidResponse(format!("{}: {}", error.code, error.info))
}

#[async_trait]
impl UrlResolver for MediaWikiClient {
    async fn resolve_urls(&self, lookup_keys: &[String]) -> ResolveResult<Vec<Option<String>>> {
        let mut urls = Vec::with_capacity(lookup_keys.len());
        for chunk in lookup_keys.chunks(TITLES_PER_REQUEST) {
            urls.extend(self.resolve_chunk(chunk).await?);
        }
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_imageinfo_response() {
        let body = r#"{
            "batchcomplete": true,
            "query": {
                "normalized": [{"fromencoded": false, "from": "File:work_a.pdf", "to": "File:Work a.pdf"}],
                "pages": [
                    {"ns": 6, "title": "File:Missing.pdf", "missing": true, "known": false},
                    {"ns": 6, "title": "File:Work a.pdf", "imageinfo": [
                        {"url": "https://www.cpdl.org/wiki/images/4/4d/Work_a.pdf",
                         "descriptionurl": "https://www.cpdl.org/wiki/index.php/File:Work_a.pdf"}
                    ]}
                ]
            }
        }"#;
        let response: ApiResponse<ImageInfoQuery> = serde_json::from_str(body).unwrap();
        let pages = response.query.unwrap().pages;
        assert_eq!(pages.len(), 2);
        assert!(pages[0].imageinfo.is_empty());
        assert_eq!(
            pages[1].imageinfo[0].url,
            "https://www.cpdl.org/wiki/images/4/4d/Work_a.pdf"
        );
    }

    #[test]
    fn test_decode_search_response() {
        let body = r#"{"query": {"searchinfo": {"totalhits": 2}, "search": [
            {"ns": 0, "title": "Ecco, moriro dunque (Carlo Gesualdo)", "pageid": 3788},
            {"ns": 0, "title": "Moro, lasso (Carlo Gesualdo)", "pageid": 3790}
        ]}}"#;
        let response: ApiResponse<SearchQuery> = serde_json::from_str(body).unwrap();
        let hits = response.query.unwrap().search;
        assert_eq!(hits[0].page_id, 3788);
        assert_eq!(hits[1].title, "Moro, lasso (Carlo Gesualdo)");
    }

    #[test]
    fn test_decode_api_error() {
        let body = r#"{"error": {"code": "toomanyvalues", "info": "Too many values supplied"}}"#;
        let response: ApiResponse<ImageInfoQuery> = serde_json::from_str(body).unwrap();
        assert!(response.query.is_none());
        let err = api_error(response.error.unwrap());
        assert!(err.to_string().contains("toomanyvalues"));
    }

    #[test]
    fn test_client_from_settings() {
        let client = MediaWikiClient::new(&Settings::default()).unwrap();
        assert_eq!(client.api_url(), crate::config::DEFAULT_API_URL);
    }
}
