pub mod browser;
pub mod http;

pub use browser::RenderedFetcher;
pub use http::PlainFetcher;

use crate::config::{FetchMode, HarvestConfig};
use crate::error::FetchError;

/// What a fetch produced
#[derive(Debug)]
pub enum FetchOutcome {
    /// The page's HTML (or rendered DOM) source
    Html(String),
    /// A rendered page that never became ready; excluded downstream
    NotReady,
}

/// Page fetcher, dispatched on the configured deployment mode
pub enum Fetcher {
    Plain(PlainFetcher),
    Rendered(RenderedFetcher),
}

impl Fetcher {
    /// Build the fetcher for the configured mode, reusing the shared
    /// HTTP client in plain mode
    pub fn from_config(config: &HarvestConfig, client: reqwest::Client) -> Self {
        match config.mode {
            FetchMode::Plain => Fetcher::Plain(PlainFetcher::new(client, config)),
            FetchMode::Rendered => Fetcher::Rendered(RenderedFetcher::new(config)),
        }
    }

    /// Fetch one URL's content
    pub async fn fetch(&self, url: &str) -> Result<FetchOutcome, FetchError> {
        match self {
            Fetcher::Plain(fetcher) => fetcher.fetch(url).await.map(FetchOutcome::Html),
            Fetcher::Rendered(fetcher) => Ok(match fetcher.fetch(url).await? {
                Some(html) => FetchOutcome::Html(html),
                None => FetchOutcome::NotReady,
            }),
        }
    }

    /// Release long-lived fetch resources at end-of-batch
    pub async fn shutdown(&self) {
        if let Fetcher::Rendered(fetcher) = self {
            fetcher.shutdown().await;
        }
    }
}
