use crate::config::HarvestConfig;
use crate::error::HarvestError;
use crate::extract::{self, ExtractOptions};
use crate::fetchers::{FetchOutcome, Fetcher, http};
use crate::paginate::{self, PageRequest};
use crate::results::{ExcludeReason, Extraction, ProductPage};
use crate::sitemap;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Run one harvest request end to end.
///
/// Fetches the sitemap fresh (no caching across requests), selects the
/// market's URLs, filters by category, slices to the requested page and
/// fans extraction out over exactly that slice. Only sitemap-level
/// failures abort the request; everything per-URL degrades to a record
/// or an exclusion.
pub async fn run(
    config: &HarvestConfig,
    category: &str,
    request: &PageRequest,
) -> Result<ProductPage, HarvestError> {
    let client = http::build_client(config)?;

    let xml = fetch_sitemap(&client, &config.sitemap_url).await?;
    let entries = sitemap::parse_sitemap(&xml)?;
    let urls = sitemap::select_market_urls(&entries, &config.domain, &config.locale);

    let valid_urls = paginate::filter_by_category(&urls, category);
    let total_pages = request.total_pages(valid_urls.len());
    let slice = paginate::page_slice(&valid_urls, request);

    ::log::info!(
        "Harvesting page {}/{}: {} of {} URLs match category \"{}\"",
        request.page(),
        total_pages,
        slice.len(),
        valid_urls.len(),
        category
    );

    let fetcher = Arc::new(Fetcher::from_config(config, client));
    let options = Arc::new(ExtractOptions::from_config(config));
    let extractions = harvest_slice(slice, category, config, &fetcher, &options).await;
    fetcher.shutdown().await;

    let data = extractions
        .into_iter()
        .filter_map(Extraction::into_record)
        .collect();

    Ok(ProductPage {
        data,
        current_page: request.page(),
        total_pages,
    })
}

/// Fetch the sitemap document. No retry at this layer.
async fn fetch_sitemap(client: &reqwest::Client, url: &str) -> Result<String, HarvestError> {
    ::log::debug!("Fetching sitemap {}", url);
    let response = client.get(url).send().await?.error_for_status()?;
    Ok(response.text().await?)
}

/// Fan out extraction over the page slice with bounded concurrency.
///
/// Results are joined by spawn order so output order matches input order,
/// regardless of completion order. Every task resolves to an `Extraction`;
/// a panicked task degrades to a failure record for its URL.
async fn harvest_slice(
    slice: &[String],
    category: &str,
    config: &HarvestConfig,
    fetcher: &Arc<Fetcher>,
    options: &Arc<ExtractOptions>,
) -> Vec<Extraction> {
    let semaphore = Arc::new(Semaphore::new(config.max_concurrency.max(1)));

    let mut handles = Vec::with_capacity(slice.len());
    for url in slice {
        let url = url.clone();
        let category = category.to_string();
        let fetcher = Arc::clone(fetcher);
        let options = Arc::clone(options);
        let semaphore = Arc::clone(&semaphore);

        handles.push(tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return Extraction::Failed { url },
            };
            harvest_one(&fetcher, &url, &category, &options).await
        }));
    }

    let mut extractions = Vec::with_capacity(handles.len());
    for (handle, url) in handles.into_iter().zip(slice) {
        match handle.await {
            Ok(extraction) => extractions.push(extraction),
            Err(e) => {
                ::log::error!("Extraction task for {} panicked: {}", url, e);
                extractions.push(Extraction::Failed { url: url.clone() });
            }
        }
    }
    extractions
}

/// Process a single URL. Never returns an error — every failure mode maps
/// to an `Extraction` variant.
async fn harvest_one(
    fetcher: &Fetcher,
    url: &str,
    category: &str,
    options: &ExtractOptions,
) -> Extraction {
    match fetcher.fetch(url).await {
        Ok(FetchOutcome::Html(html)) => extract::extract_product(url, &html, category, options),
        Ok(FetchOutcome::NotReady) => Extraction::Excluded {
            url: url.to_string(),
            reason: ExcludeReason::PageNotReady,
        },
        Err(e) => {
            ::log::error!("Error fetching data from {}: {}", url, e);
            Extraction::Failed {
                url: url.to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::RETRIEVAL_ERROR;
    use wiremock::matchers::{method, path, path_regex};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sitemap_xml(base: &str, paths: &[&str]) -> String {
        let urls: String = paths
            .iter()
            .map(|p| format!("<url><loc>{base}{p}</loc></url>"))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
            <urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{urls}</urlset>"#
        )
    }

    fn product_html(title: &str) -> String {
        format!(
            r#"<html><head>
                <meta property="og:title" content="{title}" />
                <meta property="og:image" content="https://cdn.example/{title}.jpg" />
                <meta property="product:price:amount" content="2.99" />
            </head><body>
                <script>window.parseProduct_1 = {{"sku":"1234"}};</script>
            </body></html>"#
        )
    }

    fn test_setup(server: &MockServer) -> HarvestConfig {
        let mut config = HarvestConfig::new(&format!("{}/sitemap.xml", server.uri()), "127.0.0.1");
        config.throttle_ms = 0;
        config.rate_limit_backoff_ms = 1;
        config
    }

    #[tokio::test]
    async fn paginates_over_the_filtered_set() {
        let server = MockServer::start().await;
        let paths: Vec<String> = (1..=10).map(|i| format!("/capsules/pod-{i}")).collect();
        let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &path_refs)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/capsules/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html("Pod")))
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let page = run(&config, "All", &PageRequest::new(2, 8)).await.unwrap();

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.current_page, 2);
        assert_eq!(page.total_pages, 2);
        assert!(page.data.iter().all(|r| !r.is_error()));
    }

    #[tokio::test]
    async fn results_keep_sitemap_order() {
        let server = MockServer::start().await;
        let paths = ["/capsules/alpha", "/capsules/beta", "/capsules/gamma"];

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &paths)),
            )
            .mount(&server)
            .await;
        for (p, title) in paths.iter().zip(["Alpha", "Beta", "Gamma"]) {
            Mock::given(method("GET"))
                .and(path(*p))
                .respond_with(ResponseTemplate::new(200).set_body_string(product_html(title)))
                .mount(&server)
                .await;
        }

        let config = test_setup(&server);
        let page = run(&config, "capsules", &PageRequest::new(1, 10))
            .await
            .unwrap();

        let brands: Vec<&str> = page.data.iter().map(|r| r.brand.as_str()).collect();
        assert_eq!(brands, vec!["Alpha", "Beta", "Gamma"]);
    }

    #[tokio::test]
    async fn category_filter_drives_total_pages() {
        let server = MockServer::start().await;
        let paths = [
            "/dolce-gusto/one",
            "/senseo/two",
            "/dolce-gusto/three",
            "/senseo/four",
        ];

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &paths)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/dolce-gusto/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html("Dolce")))
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let page = run(&config, "dolce-gusto", &PageRequest::new(1, 1))
            .await
            .unwrap();

        // Two URLs match the category; page size 1 means two pages.
        assert_eq!(page.total_pages, 2);
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].system, "dolce-gusto");
    }

    #[tokio::test]
    async fn excluded_pages_are_dropped_but_still_counted() {
        let server = MockServer::start().await;
        let paths = ["/coffee/pods", "/coffee/ground-pack"];

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &paths)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coffee/pods"))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html("Pods")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/coffee/ground-pack"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(product_html("Fresh ground coffee")),
            )
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let page = run(&config, "coffee", &PageRequest::new(1, 10)).await.unwrap();

        // The excluded page never shows up in data, but it was part of the
        // filtered set, so the page count includes it.
        assert_eq!(page.data.len(), 1);
        assert_eq!(page.data[0].brand, "Pods");
        assert_eq!(page.total_pages, 1);
    }

    #[tokio::test]
    async fn failed_fetch_becomes_error_record_without_aborting_batch() {
        let server = MockServer::start().await;
        let paths = ["/capsules/good", "/capsules/broken"];

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &paths)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/capsules/good"))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html("Good")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/capsules/broken"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let page = run(&config, "All", &PageRequest::new(1, 10)).await.unwrap();

        assert_eq!(page.data.len(), 2);
        assert_eq!(page.data[0].brand, "Good");
        assert!(page.data[0].error.is_none());
        assert_eq!(page.data[1].error.as_deref(), Some(RETRIEVAL_ERROR));
        assert!(page.data[1].brand.is_empty());
    }

    #[tokio::test]
    async fn rate_limited_page_recovers_after_one_retry() {
        let server = MockServer::start().await;
        let paths = ["/capsules/limited"];

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &paths)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/capsules/limited"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(1)
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/capsules/limited"))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html("Limited")))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let page = run(&config, "All", &PageRequest::new(1, 10)).await.unwrap();

        assert_eq!(page.data.len(), 1);
        assert!(page.data[0].error.is_none());
        assert_eq!(page.data[0].brand, "Limited");
    }

    #[tokio::test]
    async fn sitemap_fetch_failure_aborts_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let result = run(&config, "All", &PageRequest::new(1, 10)).await;
        assert!(matches!(result, Err(HarvestError::SitemapFetch(_))));
    }

    #[tokio::test]
    async fn malformed_sitemap_aborts_the_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not a sitemap</html>"))
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let result = run(&config, "All", &PageRequest::new(1, 10)).await;
        assert!(matches!(result, Err(HarvestError::SitemapParse(_))));
    }

    #[tokio::test]
    async fn identical_requests_yield_identical_pages() {
        let server = MockServer::start().await;
        let paths = ["/capsules/one", "/capsules/two"];

        Mock::given(method("GET"))
            .and(path("/sitemap.xml"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(sitemap_xml(&server.uri(), &paths)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex("^/capsules/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(product_html("Pod")))
            .mount(&server)
            .await;

        let config = test_setup(&server);
        let request = PageRequest::new(1, 10);
        let first = run(&config, "All", &request).await.unwrap();
        let second = run(&config, "All", &request).await.unwrap();

        assert_eq!(
            serde_json::to_value(&first).unwrap(),
            serde_json::to_value(&second).unwrap()
        );
    }
}
