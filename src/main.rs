use capsule_harvest::{FetchMode, Harvest, HarvestConfig};
use clap::Parser;
use url::Url;

mod args;
use args::{Args, convert_fetch_mode};

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    ::log::info!("Starting harvest for sitemap: {}", args.sitemap_url);

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to build configuration: {}", e);
            std::process::exit(1);
        }
    };

    if config.mode == FetchMode::Rendered {
        println!("Note: Rendered mode requires a WebDriver server (e.g., ChromeDriver).");
        println!(
            "Set WEBDRIVER_URL environment variable if not using the default http://localhost:4444"
        );
    }

    let start_time = std::time::Instant::now();

    let result = Harvest::new(config)
        .with_category(&args.category)
        .with_page(args.page)
        .run()
        .await;

    match result {
        Ok(page) => {
            let duration = start_time.elapsed();
            ::log::info!(
                "Harvest complete - {} records (page {} of {}) in {:.2} seconds",
                page.data.len(),
                page.current_page,
                page.total_pages,
                duration.as_secs_f64()
            );
            match serde_json::to_string_pretty(&page) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    ::log::error!("Failed to serialize results: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Err(e) => {
            ::log::error!("Error fetching sitemap data: {}", e);
            std::process::exit(1);
        }
    }
}

/// Assemble the configuration from a config file or CLI flags
fn build_config(args: &Args) -> Result<HarvestConfig, String> {
    if let Some(path) = &args.config {
        return HarvestConfig::from_file(path).map_err(|e| e.to_string());
    }

    let domain = match &args.domain {
        Some(domain) => domain.clone(),
        None => Url::parse(&args.sitemap_url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .ok_or_else(|| format!("cannot derive domain from {}", args.sitemap_url))?,
    };

    let mut config = HarvestConfig::new(&args.sitemap_url, &domain);
    config.page_size = args.page_size;
    config.locale = args.locale.clone();
    config.mode = convert_fetch_mode(args.mode);
    config.max_concurrency = args.concurrency;
    if let Some(webdriver_url) = &args.webdriver_url {
        config.webdriver_url = webdriver_url.clone();
    }
    Ok(config)
}
