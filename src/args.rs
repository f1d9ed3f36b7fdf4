use capsule_harvest::FetchMode;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "capsule-harvest")]
#[command(about = "Harvests product metadata from a shop's sitemap")]
#[command(version)]
pub struct Args {
    /// Sitemap URL to discover product pages from
    pub sitemap_url: String,

    /// Domain product URLs must belong to (defaults to the sitemap's host)
    #[arg(short, long)]
    pub domain: Option<String>,

    /// Category filter ("All" matches everything)
    #[arg(short, long, default_value = "All")]
    pub category: String,

    /// Page number to harvest (1-based)
    #[arg(short, long, default_value_t = 1)]
    pub page: usize,

    /// Number of URLs per page
    #[arg(long, default_value_t = 150)]
    pub page_size: usize,

    /// Locale tag for alternate-language link selection
    #[arg(long, default_value = "en-GB")]
    pub locale: String,

    /// How product pages are fetched
    #[arg(short, long, value_enum, default_value_t = FetchModeArg::Plain)]
    pub mode: FetchModeArg,

    /// Maximum number of concurrent fetches
    #[arg(long, default_value_t = 5)]
    pub concurrency: usize,

    /// WebDriver URL for rendered mode
    #[arg(long)]
    pub webdriver_url: Option<String>,

    /// Load the full configuration from a JSON file instead
    #[arg(long)]
    pub config: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum FetchModeArg {
    Plain,
    Rendered,
}

/// Convert from CLI argument fetch mode to internal fetch mode
pub fn convert_fetch_mode(arg_mode: FetchModeArg) -> FetchMode {
    match arg_mode {
        FetchModeArg::Plain => FetchMode::Plain,
        FetchModeArg::Rendered => FetchMode::Rendered,
    }
}
