use crate::error::HarvestError;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// How product pages are fetched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FetchMode {
    /// Direct HTTP GET with throttle and 429-aware retry
    #[default]
    Plain,
    /// Rendered DOM via a shared WebDriver session
    Rendered,
}

/// Configuration for a harvest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// URL of the sitemap to discover product pages from
    pub sitemap_url: String,

    /// Domain product URLs must belong to (e.g. "kaffekapslen.co.uk")
    pub domain: String,

    /// Locale tag used to pick alternate-language links (e.g. "en-GB")
    #[serde(default = "default_locale")]
    pub locale: String,

    /// How product pages are fetched
    #[serde(default)]
    pub mode: FetchMode,

    /// Number of URLs per result page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Maximum number of concurrent page fetches
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Delay before each plain fetch, in milliseconds
    #[serde(default = "default_throttle_ms")]
    pub throttle_ms: u64,

    /// Base backoff after a 429 response, in milliseconds (doubles per retry)
    #[serde(default = "default_backoff_ms")]
    pub rate_limit_backoff_ms: u64,

    /// Maximum fetch attempts per URL (first try included)
    #[serde(default = "default_max_attempts")]
    pub max_fetch_attempts: u32,

    /// Per-request timeout for plain fetches, in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// URL for the WebDriver instance (rendered mode)
    #[serde(default = "default_webdriver_url")]
    pub webdriver_url: String,

    /// Selector that must appear before a rendered page is read
    #[serde(default = "default_ready_selector")]
    pub ready_selector: String,

    /// Navigation timeout for rendered fetches, in seconds
    #[serde(default = "default_navigation_timeout")]
    pub navigation_timeout_secs: u64,

    /// Readiness-selector timeout for rendered fetches, in seconds
    #[serde(default = "default_selector_timeout")]
    pub selector_timeout_secs: u64,

    /// Keywords that disqualify a page (matched against title/description)
    #[serde(default = "default_exclusion_keywords")]
    pub exclusion_keywords: Vec<String>,

    /// Marker identifying the inline script that carries the SKU
    #[serde(default = "default_script_marker")]
    pub script_marker: String,

    /// User agent sent with plain fetches
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HarvestConfig {
    /// Create a configuration with default values for the given market
    pub fn new(sitemap_url: &str, domain: &str) -> Self {
        Self {
            sitemap_url: sitemap_url.to_string(),
            domain: domain.to_string(),
            locale: default_locale(),
            mode: FetchMode::default(),
            page_size: default_page_size(),
            max_concurrency: default_max_concurrency(),
            throttle_ms: default_throttle_ms(),
            rate_limit_backoff_ms: default_backoff_ms(),
            max_fetch_attempts: default_max_attempts(),
            request_timeout_secs: default_request_timeout(),
            webdriver_url: default_webdriver_url(),
            ready_selector: default_ready_selector(),
            navigation_timeout_secs: default_navigation_timeout(),
            selector_timeout_secs: default_selector_timeout(),
            exclusion_keywords: default_exclusion_keywords(),
            script_marker: default_script_marker(),
            user_agent: default_user_agent(),
        }
    }

    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HarvestError> {
        let mut file = File::open(path).map_err(|e| HarvestError::Config(e.to_string()))?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| HarvestError::Config(e.to_string()))?;
        Self::from_json(&contents)
    }

    /// Load configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, HarvestError> {
        serde_json::from_str(json).map_err(|e| HarvestError::Config(e.to_string()))
    }
}

/// Default locale tag
fn default_locale() -> String {
    "en-GB".to_string()
}

/// Default URLs per result page
fn default_page_size() -> usize {
    150
}

/// Default max concurrent fetches
fn default_max_concurrency() -> usize {
    5
}

/// Default pre-request throttle
fn default_throttle_ms() -> u64 {
    1000
}

/// Default base backoff after a 429
fn default_backoff_ms() -> u64 {
    3000
}

/// Default fetch attempt budget
fn default_max_attempts() -> u32 {
    3
}

/// Default plain-fetch request timeout
fn default_request_timeout() -> u64 {
    30
}

/// Default value for webdriver_url
fn default_webdriver_url() -> String {
    "http://localhost:4444".to_string()
}

/// Default rendered-page readiness selector
fn default_ready_selector() -> String {
    ".product-title".to_string()
}

/// Default rendered-fetch navigation timeout
fn default_navigation_timeout() -> u64 {
    30
}

/// Default readiness-selector timeout
fn default_selector_timeout() -> u64 {
    60
}

/// Default keywords marking incompatible product types
fn default_exclusion_keywords() -> Vec<String> {
    vec!["ground".to_string(), "beans".to_string()]
}

/// Default inline-script marker carrying the SKU payload
fn default_script_marker() -> String {
    "parseProduct_".to_string()
}

/// Default user agent for plain fetches
fn default_user_agent() -> String {
    format!("capsule-harvest/{}", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_applies_defaults() {
        let config = HarvestConfig::new("https://shop.example/sitemap.xml", "shop.example");
        assert_eq!(config.locale, "en-GB");
        assert_eq!(config.page_size, 150);
        assert_eq!(config.mode, FetchMode::Plain);
        assert_eq!(config.max_fetch_attempts, 3);
        assert_eq!(config.exclusion_keywords, vec!["ground", "beans"]);
    }

    #[test]
    fn from_json_fills_missing_fields() {
        let config = HarvestConfig::from_json(
            r#"{
                "sitemap_url": "https://shop.example/sitemap.xml",
                "domain": "shop.example",
                "mode": "rendered",
                "page_size": 20
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, FetchMode::Rendered);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.webdriver_url, "http://localhost:4444");
        assert_eq!(config.ready_selector, ".product-title");
    }

    #[test]
    fn from_json_rejects_missing_required_fields() {
        let result = HarvestConfig::from_json(r#"{"locale": "en-GB"}"#);
        assert!(matches!(result, Err(HarvestError::Config(_))));
    }
}
