// Re-export modules
pub mod config;
pub mod error;
pub mod extract;
pub mod fetchers;
pub mod paginate;
pub mod pipeline;
pub mod results;
pub mod sitemap;

// Re-export commonly used types for convenience
pub use config::{FetchMode, HarvestConfig};
pub use error::HarvestError;
pub use results::{ProductPage, ProductRecord};

use paginate::PageRequest;

/// Builder for a single harvest request.
///
/// Wraps a [`HarvestConfig`] with the per-request parameters (category
/// and page number) and runs the pipeline.
///
/// ```no_run
/// # async fn example() -> Result<(), capsule_harvest::HarvestError> {
/// use capsule_harvest::{Harvest, HarvestConfig};
///
/// let config = HarvestConfig::new(
///     "https://www.shop.co.uk/sitemap/uk/sitemap.xml",
///     "shop.co.uk",
/// );
/// let page = Harvest::new(config)
///     .with_category("dolce-gusto")
///     .with_page(2)
///     .run()
///     .await?;
/// println!("{} records", page.data.len());
/// # Ok(())
/// # }
/// ```
pub struct Harvest {
    config: HarvestConfig,
    category: String,
    page: usize,
}

impl Harvest {
    /// Create a harvest over the given configuration, defaulting to the
    /// "All" category and the first page
    pub fn new(config: HarvestConfig) -> Self {
        Self {
            config,
            category: "All".to_string(),
            page: 1,
        }
    }

    /// Set the category filter (case-insensitive URL substring; "All"
    /// matches everything)
    pub fn with_category(mut self, category: &str) -> Self {
        self.category = category.to_string();
        self
    }

    /// Set the 1-based page number to harvest
    pub fn with_page(mut self, page: usize) -> Self {
        self.page = page;
        self
    }

    /// Override the configured page size
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    /// Override the configured concurrency bound
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.config.max_concurrency = max_concurrency;
        self
    }

    /// Run the pipeline and return one page of results
    pub async fn run(mut self) -> Result<ProductPage, HarvestError> {
        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                self.config.webdriver_url = webdriver_url;
            }
        }

        let request = PageRequest::new(self.page, self.config.page_size);
        pipeline::run(&self.config, &self.category, &request).await
    }
}
