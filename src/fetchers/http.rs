use crate::config::HarvestConfig;
use crate::error::{FetchError, HarvestError};
use reqwest::StatusCode;
use std::time::Duration;

/// Plain HTTP fetcher with a fixed pre-request throttle and a bounded
/// retry budget for 429 responses.
///
/// Only rate limiting is retried; any other failure is terminal for the
/// URL and surfaces as a per-URL error upstream.
#[derive(Debug, Clone)]
pub struct PlainFetcher {
    client: reqwest::Client,
    throttle: Duration,
    backoff_base: Duration,
    max_attempts: u32,
}

impl PlainFetcher {
    pub fn new(client: reqwest::Client, config: &HarvestConfig) -> Self {
        Self {
            client,
            throttle: Duration::from_millis(config.throttle_ms),
            backoff_base: Duration::from_millis(config.rate_limit_backoff_ms),
            max_attempts: config.max_fetch_attempts.max(1),
        }
    }

    /// Fetch a URL's HTML body.
    pub async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        for attempt in 1..=self.max_attempts {
            if !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }

            let response = self.client.get(url).send().await?;
            let status = response.status();

            if status.is_success() {
                return Ok(response.text().await?);
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                if attempt < self.max_attempts {
                    let wait = backoff_delay(self.backoff_base, attempt);
                    ::log::warn!(
                        "Rate limited on {} (attempt {}), retrying in {:?}",
                        url,
                        attempt,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    continue;
                }
                return Err(FetchError::RateLimited {
                    attempts: self.max_attempts,
                });
            }

            return Err(FetchError::Status(status.as_u16()));
        }

        // The loop always returns before falling through.
        Err(FetchError::RateLimited {
            attempts: self.max_attempts,
        })
    }
}

/// Backoff before retry number `attempt`: base doubled per prior attempt
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(attempt.saturating_sub(1)))
}

/// Build the shared HTTP client used for the sitemap and plain fetches
pub fn build_client(config: &HarvestConfig) -> Result<reqwest::Client, HarvestError> {
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .build()
        .map_err(|e| HarvestError::Config(e.to_string()))
}
