use crate::error::HarvestError;
use quick_xml::Reader;
use quick_xml::events::Event;
use url::Url;

/// An alternate-language link attached to a sitemap entry
#[derive(Debug, Clone)]
pub struct LocaleLink {
    /// Language/region tag, e.g. "en-GB"
    pub hreflang: String,
    /// URL of the regional variant
    pub href: String,
}

/// One `url` entry from a sitemap document
#[derive(Debug, Clone)]
pub struct SitemapEntry {
    /// Canonical URL of the entry
    pub loc: String,
    /// Alternate-locale links, in document order
    pub alternates: Vec<LocaleLink>,
}

/// Parse a sitemap XML string into entries, preserving document order.
///
/// Fails if the XML is malformed or if the document contains no
/// `urlset/url` entries at all.
pub fn parse_sitemap(xml: &str) -> Result<Vec<SitemapEntry>, HarvestError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut entries = Vec::new();
    let mut buf = Vec::new();

    let mut in_url = false;
    let mut current_tag = String::new();
    let mut current_loc = String::new();
    let mut current_alternates: Vec<LocaleLink> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).to_string();
                match name.as_str() {
                    "url" => {
                        in_url = true;
                        current_loc.clear();
                        current_alternates.clear();
                    }
                    "link" if in_url => {
                        if let Some(link) = read_locale_link(&e) {
                            current_alternates.push(link);
                        }
                    }
                    _ => {
                        current_tag = name;
                    }
                }
            }
            // xhtml:link alternates are usually self-closing
            Ok(Event::Empty(e)) => {
                if in_url && e.local_name().as_ref() == b"link" {
                    if let Some(link) = read_locale_link(&e) {
                        current_alternates.push(link);
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"url" && in_url {
                    if !current_loc.is_empty() {
                        entries.push(SitemapEntry {
                            loc: current_loc.clone(),
                            alternates: std::mem::take(&mut current_alternates),
                        });
                    }
                    in_url = false;
                }
                // Text outside an open element must not be attributed to
                // the last tag seen.
                current_tag.clear();
            }
            Ok(Event::Text(e)) => {
                if in_url && current_tag == "loc" {
                    let text = e.unescape().unwrap_or_default();
                    current_loc = text.trim().to_string();
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(HarvestError::SitemapParse(format!("XML error: {e}")));
            }
            _ => {}
        }
        buf.clear();
    }

    if entries.is_empty() {
        return Err(HarvestError::SitemapParse(
            "document has no urlset/url entries".to_string(),
        ));
    }

    Ok(entries)
}

/// Pull hreflang/href attributes out of an xhtml:link element
fn read_locale_link(e: &quick_xml::events::BytesStart<'_>) -> Option<LocaleLink> {
    let mut hreflang = None;
    let mut href = None;

    for attr in e.attributes().flatten() {
        let value = attr.unescape_value().unwrap_or_default().to_string();
        match attr.key.local_name().as_ref() {
            b"hreflang" => hreflang = Some(value),
            b"href" => href = Some(value),
            _ => {}
        }
    }

    match (hreflang, href) {
        (Some(hreflang), Some(href)) => Some(LocaleLink { hreflang, href }),
        _ => None,
    }
}

/// Select the URL representing each entry in the target market.
///
/// An entry whose `loc` is already on the target domain is taken verbatim.
/// Otherwise the alternate tagged with the target locale is used, but only
/// if that alternate's URL is itself on the target domain. Entries with no
/// representable URL are dropped. Output preserves sitemap order.
pub fn select_market_urls(entries: &[SitemapEntry], domain: &str, locale: &str) -> Vec<String> {
    let urls: Vec<String> = entries
        .iter()
        .filter_map(|entry| select_entry_url(entry, domain, locale))
        .collect();

    ::log::info!(
        "Selected {} of {} sitemap entries for domain {}",
        urls.len(),
        entries.len(),
        domain
    );

    urls
}

fn select_entry_url(entry: &SitemapEntry, domain: &str, locale: &str) -> Option<String> {
    if is_on_domain(&entry.loc, domain) {
        return Some(entry.loc.clone());
    }

    let alternate = entry
        .alternates
        .iter()
        .find(|link| link.hreflang.eq_ignore_ascii_case(locale))?;

    if is_on_domain(&alternate.href, domain) {
        Some(alternate.href.clone())
    } else {
        ::log::debug!(
            "Dropping entry {}: {} alternate is off-domain",
            entry.loc,
            locale
        );
        None
    }
}

/// Whether a URL's host is the given domain or a subdomain of it
fn is_on_domain(url: &str, domain: &str) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    match parsed.host_str() {
        Some(host) => host == domain || host.ends_with(&format!(".{domain}")),
        None => false,
    }
}
