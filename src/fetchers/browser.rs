use crate::config::HarvestConfig;
use crate::error::FetchError;
use fantoccini::{Client, ClientBuilder, Locator};
use std::time::Duration;
use tokio::sync::{Mutex, OnceCell};
use tokio::time::timeout;

/// Fetcher that renders pages through a shared WebDriver session.
///
/// The session is connected lazily, exactly once: concurrent callers
/// await the same in-flight connection rather than racing to create
/// duplicates. Navigation is serialized because one WebDriver session
/// drives one page at a time. `shutdown` is the explicit end-of-batch
/// lifecycle call.
pub struct RenderedFetcher {
    webdriver_url: String,
    ready_selector: String,
    navigation_timeout: Duration,
    selector_timeout: Duration,
    session: OnceCell<Client>,
    navigation_lock: Mutex<()>,
}

impl RenderedFetcher {
    pub fn new(config: &HarvestConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            ready_selector: config.ready_selector.clone(),
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            selector_timeout: Duration::from_secs(config.selector_timeout_secs),
            session: OnceCell::new(),
            navigation_lock: Mutex::new(()),
        }
    }

    /// Connect on first use; later callers share the same session.
    async fn session(&self) -> Result<&Client, FetchError> {
        self.session
            .get_or_try_init(|| async {
                ::log::info!("Connecting to WebDriver at {}", self.webdriver_url);
                ClientBuilder::native()
                    .connect(&self.webdriver_url)
                    .await
                    .map_err(|e| FetchError::Browser(e.to_string()))
            })
            .await
    }

    /// Render a URL and return its DOM source.
    ///
    /// `Ok(None)` means the page never became ready (navigation or
    /// readiness-selector timeout) and should be excluded, not reported
    /// as a failure.
    pub async fn fetch(&self, url: &str) -> Result<Option<String>, FetchError> {
        let client = self.session().await?;
        let _guard = self.navigation_lock.lock().await;

        match timeout(self.navigation_timeout, client.goto(url)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                ::log::warn!("Navigation to {} failed: {}", url, e);
                return Ok(None);
            }
            Err(_) => {
                ::log::warn!("Navigation to {} timed out", url);
                return Ok(None);
            }
        }

        let ready = client
            .wait()
            .at_most(self.selector_timeout)
            .for_element(Locator::Css(&self.ready_selector))
            .await;
        if let Err(e) = ready {
            ::log::warn!(
                "Readiness selector \"{}\" not found on {}: {}",
                self.ready_selector,
                url,
                e
            );
            return Ok(None);
        }

        match client.source().await {
            Ok(html) => Ok(Some(html)),
            Err(e) => {
                ::log::warn!("Failed to read source of {}: {}", url, e);
                Ok(None)
            }
        }
    }

    /// Close the WebDriver session, if one was ever opened.
    pub async fn shutdown(&self) {
        if let Some(client) = self.session.get() {
            // Client handles are channel clones over one session; closing
            // any of them ends the session.
            if let Err(e) = client.clone().close().await {
                ::log::warn!("Failed to close WebDriver session: {}", e);
            } else {
                ::log::debug!("WebDriver session closed");
            }
        }
    }
}
