//! Runtime configuration.
//!
//! [`Settings`] comes from the environment (a `.env` file is honored),
//! [`ImportOptions`] controls one import call and can be overridden per
//! CLI invocation or HTTP request.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Default wiki API endpoint.
pub const DEFAULT_API_URL: &str = "https://www.cpdl.org/wiki/api.php";

/// Default timeout for wiki API requests, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default directory for the URL cache (relative to current dir).
pub const DEFAULT_CACHE_DIR: &str = ".cpdl-ingest";

/// Name of the catalogue that pages come from.
pub const PROVIDER: &str = "CPDL";

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Wiki `api.php` endpoint.
    pub api_url: String,
    /// Timeout applied to every wiki request.
    pub timeout: Duration,
    /// User-Agent sent to the wiki.
    pub user_agent: String,
    /// Where the URL cache lives.
    pub cache_dir: PathBuf,
}

impl Settings {
    /// Load settings from environment variables.
    ///
    /// | Variable            | Default                               |
    /// |---------------------|---------------------------------------|
    /// | `CPDL_API_URL`      | `https://www.cpdl.org/wiki/api.php`   |
    /// | `CPDL_TIMEOUT_SECS` | `30`                                  |
    /// | `CPDL_USER_AGENT`   | `cpdl-ingest/<version>`               |
    /// | `CPDL_CACHE_DIR`    | `.cpdl-ingest`                        |
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let timeout_secs = env::var("CPDL_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            api_url: env::var("CPDL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string()),
            timeout: Duration::from_secs(timeout_secs),
            user_agent: env::var("CPDL_USER_AGENT").unwrap_or_else(|_| default_user_agent()),
            cache_dir: env::var("CPDL_CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CACHE_DIR)),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: default_user_agent(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
        }
    }
}

fn default_user_agent() -> String {
    format!("cpdl-ingest/{}", env!("CARGO_PKG_VERSION"))
}

/// Options for a single page import.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    /// Leading manifest entries that are page furniture, not media.
    pub furniture_count: usize,

    /// Extension of the file that opens each edition.
    pub primary_extension: String,

    /// Namespace prefix of resolver lookup keys.
    pub namespace: String,

    /// Skip schema validation of the result.
    pub skip_validation: bool,

    /// Do not call the resolver; every file keeps an absent URL.
    pub offline: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            furniture_count: 2,
            primary_extension: "pdf".to_string(),
            namespace: "File:".to_string(),
            skip_validation: false,
            offline: false,
        }
    }
}
