use thiserror::Error;

/// Errors that abort a whole harvest request.
///
/// Only sitemap-level problems (and bad configuration) are allowed to fail
/// the request; everything that happens to an individual product URL is
/// absorbed into its per-URL result instead.
#[derive(Debug, Error)]
pub enum HarvestError {
    /// The sitemap document could not be fetched
    #[error("failed to fetch sitemap: {0}")]
    SitemapFetch(#[from] reqwest::Error),

    /// The sitemap document was malformed or had no url entries
    #[error("failed to parse sitemap: {0}")]
    SitemapParse(String),

    /// The configuration could not be loaded
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Errors fetching a single product page.
///
/// These never cross the per-URL boundary: the pipeline converts them into
/// failure records (or exclusions) and keeps going.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request itself failed (connection, timeout, bad body)
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success, non-429 status
    #[error("unexpected status {0}")]
    Status(u16),

    /// Still rate limited after exhausting the retry budget
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    /// The WebDriver session could not be established or driven
    #[error("webdriver error: {0}")]
    Browser(String),
}
