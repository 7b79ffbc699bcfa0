use std::collections::HashSet;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use scraper::{Html, Selector};
use tracing::info;

use crate::fetch::HttpFetcher;
use crate::venue::{Venue, VenueKind};

static LINK_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

const MIN_NAME_LEN: usize = 4;

/// Fetch a venue index page and return the venues it links to.
pub async fn discover_venues(
    fetcher: &HttpFetcher,
    index_url: &str,
    kind: VenueKind,
    base_url: &str,
    listing_pattern: &str,
) -> Result<Vec<Venue>> {
    info!("Discovering {} venues from {}", kind, index_url);
    let page = fetcher
        .fetch_with_retry(index_url)
        .await
        .with_context(|| format!("Failed to fetch {} index page", kind))?;

    let venues = parse_venue_links(&page.body, base_url, listing_pattern);
    info!("Found {} {} links", venues.len(), kind);
    for v in &venues {
        info!("  * {}  ->  {}", v.name, v.url);
    }
    Ok(venues)
}

/// Venue links on an index page, in document order, one per URL.
pub fn parse_venue_links(html: &str, base_url: &str, listing_pattern: &str) -> Vec<Venue> {
    let doc = Html::parse_document(html);
    let base = base_url.trim_end_matches('/');
    let mut seen: HashSet<String> = HashSet::new();
    let mut venues = Vec::new();

    for a in doc.select(&LINK_SEL) {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        let url = if href.starts_with('/') {
            format!("{}{}", base, href)
        } else {
            href.to_string()
        };
        if !url.contains(listing_pattern) || !seen.insert(url.clone()) {
            continue;
        }

        let name = a.text().collect::<Vec<_>>().join(" ");
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.chars().count() < MIN_NAME_LEN {
            continue;
        }

        let id = url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_string();
        venues.push(Venue {
            id,
            name,
            url,
            address: String::new(),
        });
    }

    venues
}
