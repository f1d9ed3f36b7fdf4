use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

/// A single harvested product, as it appears in the response body.
///
/// Either the metadata fields are populated (possibly with empty strings
/// where the page lacks a field) or `error` alone is set — a record never
/// claims both success and failure. Failure records serialize as
/// `{url, error}` only; success records always carry every metadata
/// field, empty strings included.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProductRecord {
    /// URL of the product page
    pub url: String,

    /// Brand/title, from the og:title meta tag
    pub brand: String,

    /// Image URL, from the og:image meta tag
    pub image: String,

    /// Price amount, from the product price meta tag
    pub price: String,

    /// SKU extracted from inline script data
    pub id: String,

    /// The capsule system (category) this record was harvested under
    pub system: String,

    /// Number of pods in the pack, when the page lists it
    #[serde(rename = "podCount")]
    pub pod_count: Option<u32>,

    /// Set instead of the metadata fields when the page could not be fetched
    pub error: Option<String>,
}

impl Serialize for ProductRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if let Some(error) = &self.error {
            let mut state = serializer.serialize_struct("ProductRecord", 2)?;
            state.serialize_field("url", &self.url)?;
            state.serialize_field("error", error)?;
            return state.end();
        }

        let field_count = 6 + usize::from(self.pod_count.is_some());
        let mut state = serializer.serialize_struct("ProductRecord", field_count)?;
        state.serialize_field("url", &self.url)?;
        state.serialize_field("brand", &self.brand)?;
        state.serialize_field("image", &self.image)?;
        state.serialize_field("price", &self.price)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("system", &self.system)?;
        if let Some(pod_count) = self.pod_count {
            state.serialize_field("podCount", &pod_count)?;
        }
        state.end()
    }
}

/// Error message used for per-URL failure records.
pub const RETRIEVAL_ERROR: &str = "Could not retrieve data";

impl ProductRecord {
    /// Create a failure record for a URL whose page could not be retrieved
    pub fn failed(url: String) -> Self {
        Self {
            url,
            brand: String::new(),
            image: String::new(),
            price: String::new(),
            id: String::new(),
            system: String::new(),
            pod_count: None,
            error: Some(RETRIEVAL_ERROR.to_string()),
        }
    }

    /// Whether this record represents a failed retrieval
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Why a URL was excluded from the results without producing a record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExcludeReason {
    /// The URL does not match the active category filter
    CategoryMismatch,
    /// The page title/description matched an exclusion keyword
    Keyword(String),
    /// The rendered page never became ready within its timeouts
    PageNotReady,
}

impl std::fmt::Display for ExcludeReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExcludeReason::CategoryMismatch => write!(f, "category mismatch"),
            ExcludeReason::Keyword(kw) => write!(f, "exclusion keyword \"{}\"", kw),
            ExcludeReason::PageNotReady => write!(f, "page not ready"),
        }
    }
}

/// Outcome of processing one URL.
///
/// Every per-URL code path resolves to one of these — extraction never
/// propagates an error past its own boundary, so one bad URL cannot abort
/// the batch.
#[derive(Debug, Clone)]
pub enum Extraction {
    /// A fully extracted product record
    Product(ProductRecord),
    /// The URL was skipped; nothing appears in the response for it
    Excluded { url: String, reason: ExcludeReason },
    /// The page could not be retrieved; an error record appears in the response
    Failed { url: String },
}

impl Extraction {
    /// Convert into the record (if any) that belongs in the response body.
    ///
    /// `Excluded` URLs are silently dropped; `Failed` URLs become error
    /// records, matching the original surface behavior.
    pub fn into_record(self) -> Option<ProductRecord> {
        match self {
            Extraction::Product(record) => Some(record),
            Extraction::Excluded { .. } => None,
            Extraction::Failed { url } => Some(ProductRecord::failed(url)),
        }
    }
}

/// One page of harvested results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductPage {
    /// Records for this page, in sitemap order
    pub data: Vec<ProductRecord>,

    /// The page number that was requested
    #[serde(rename = "currentPage")]
    pub current_page: usize,

    /// Total pages available for the active category filter
    #[serde(rename = "totalPages")]
    pub total_pages: usize,
}
