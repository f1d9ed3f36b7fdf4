use crate::config::HarvestConfig;
use crate::paginate;
use crate::results::{ExcludeReason, Extraction, ProductRecord};
use regex::Regex;
use scraper::{Html, Selector};

/// Pattern locating the SKU inside the marker script's JSON payload
const SKU_PATTERN: &str = r#""sku":"(\d+)""#;

/// Label of the attribute-table row carrying the pack size
const PODS_LABEL: &str = "number of pods";

/// Extraction policy derived from the harvest configuration.
///
/// Built once per run and shared across extraction tasks so the SKU regex
/// is compiled a single time.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    exclusion_keywords: Vec<String>,
    script_marker: String,
    sku_regex: Regex,
}

impl ExtractOptions {
    pub fn from_config(config: &HarvestConfig) -> Self {
        Self {
            exclusion_keywords: config
                .exclusion_keywords
                .iter()
                .map(|kw| kw.to_lowercase())
                .collect(),
            script_marker: config.script_marker.clone(),
            sku_regex: Regex::new(SKU_PATTERN).expect("SKU pattern should be valid"),
        }
    }
}

/// Extract a product record from a page's HTML.
///
/// The URL is gated on the category filter, then the page is gated on the
/// exclusion keywords. Missing fields become empty strings — absence is
/// not an error. This function never fails; pages it cannot use are
/// reported as `Excluded`.
pub fn extract_product(
    url: &str,
    html: &str,
    category: &str,
    options: &ExtractOptions,
) -> Extraction {
    if !paginate::matches_category(url, category) {
        return Extraction::Excluded {
            url: url.to_string(),
            reason: ExcludeReason::CategoryMismatch,
        };
    }

    let doc = Html::parse_document(html);

    let title = meta_content(&doc, "og:title");
    let description = meta_content(&doc, "og:description");

    // Pages for incompatible product types (ground coffee, whole beans)
    // are skipped outright, not reported.
    let haystack = format!("{} {}", title.to_lowercase(), description.to_lowercase());
    for keyword in &options.exclusion_keywords {
        if haystack.contains(keyword) {
            ::log::debug!("Excluding {} on keyword \"{}\"", url, keyword);
            return Extraction::Excluded {
                url: url.to_string(),
                reason: ExcludeReason::Keyword(keyword.clone()),
            };
        }
    }

    let image = meta_content(&doc, "og:image");
    let price = meta_content(&doc, "product:price:amount");
    let sku = extract_sku(&doc, &options.script_marker, &options.sku_regex);
    let pod_count = extract_pod_count(&doc);

    Extraction::Product(ProductRecord {
        url: url.to_string(),
        brand: title,
        image,
        price,
        id: sku,
        system: category.to_string(),
        pod_count,
        error: None,
    })
}

/// Content of a `<meta property="...">` tag, or an empty string
fn meta_content(doc: &Html, property: &str) -> String {
    let selector = Selector::parse(&format!(r#"meta[property="{property}"]"#))
        .expect("meta selector should be valid");
    doc.select(&selector)
        .next()
        .and_then(|e| e.value().attr("content"))
        .unwrap_or_default()
        .to_string()
}

/// Pull the SKU out of the inline script block containing the marker.
///
/// No marker script or no pattern match yields an empty SKU, not an error.
fn extract_sku(doc: &Html, marker: &str, sku_regex: &Regex) -> String {
    let selector = Selector::parse("script").expect("script selector should be valid");
    for script in doc.select(&selector) {
        let text = script.text().collect::<String>();
        if !text.contains(marker) {
            continue;
        }
        if let Some(captures) = sku_regex.captures(&text) {
            return captures[1].to_string();
        }
    }
    String::new()
}

/// Read the pod count from the attribute table, if the page lists one
fn extract_pod_count(doc: &Html) -> Option<u32> {
    let row_selector = Selector::parse("tr").expect("tr selector should be valid");
    let cell_selector = Selector::parse("td, th").expect("cell selector should be valid");

    for row in doc.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect();
        if cells.len() < 2 {
            continue;
        }
        if cells[0].to_lowercase().contains(PODS_LABEL) {
            return cells[1].parse().ok();
        }
    }
    None
}
