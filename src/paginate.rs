/// A validated page request.
///
/// Page numbers are 1-based. Values below 1 are clamped rather than
/// rejected; input validation belongs to the calling surface.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest {
    page: usize,
    page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.max(1),
        }
    }

    /// The requested (1-based) page number
    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Index of the first URL on this page
    pub fn start_index(&self) -> usize {
        (self.page - 1) * self.page_size
    }

    /// Index one past the last URL on this page
    pub fn end_index(&self) -> usize {
        self.page * self.page_size
    }

    /// Number of pages needed to cover `item_count` items
    pub fn total_pages(&self, item_count: usize) -> usize {
        item_count.div_ceil(self.page_size)
    }
}

/// Whether a category filter matches everything
pub fn is_wildcard(category: &str) -> bool {
    category.is_empty() || category.eq_ignore_ascii_case("all")
}

/// Case-insensitive substring match of the category against a URL
pub fn matches_category(url: &str, category: &str) -> bool {
    is_wildcard(category) || url.to_lowercase().contains(&category.to_lowercase())
}

/// Keep only the URLs matching the category filter, preserving order
pub fn filter_by_category(urls: &[String], category: &str) -> Vec<String> {
    if is_wildcard(category) {
        return urls.to_vec();
    }
    urls.iter()
        .filter(|url| matches_category(url, category))
        .cloned()
        .collect()
}

/// Slice the filtered URL list down to the requested page, clamped to bounds
pub fn page_slice<'a>(urls: &'a [String], request: &PageRequest) -> &'a [String] {
    let start = request.start_index().min(urls.len());
    let end = request.end_index().min(urls.len());
    &urls[start..end]
}
