use crate::error::{AskblogError, Result};
use crate::progress::{report, ProgressSink};
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use url::Url;

/// CSS selector for a post card on an index page
const CARD_SELECTOR: &str = ".adb-card";
/// CSS selector for the anchor inside a card that carries the post URL
const CARD_LINK_SELECTOR: &str = ".adb-card__href";
/// CSS selector for the "older posts" pager element
const NEXT_PAGE_SELECTOR: &str = ".blog-pager-older-link.page-button";

/// Discover post links by paginating the blog's index pages.
///
/// Starts at `start_url` and follows the "older posts" pager until it is
/// absent or `max_pages` pages have been fetched, whichever comes first.
/// One URL is extracted per card element; a page with zero cards is not an
/// error and pagination still continues. URLs are returned in discovery
/// order and are intentionally not deduplicated.
///
/// A fetch or parse failure on any page is fatal to the whole run.
pub async fn discover_links(
    client: &Client,
    start_url: &str,
    max_pages: usize,
    fetch_delay: Duration,
    progress: Option<&dyn ProgressSink>,
) -> Result<Vec<String>> {
    let mut urls = Vec::new();
    let mut next_page = Some(start_url.to_string());
    let mut pages_scraped = 0;

    while let Some(page_url) = next_page {
        if pages_scraped >= max_pages {
            break;
        }

        report(
            progress,
            &format!("Scraping page {} of {}...", pages_scraped + 1, max_pages),
        );

        let body = client
            .get(&page_url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;

        let base = Url::parse(&page_url)
            .map_err(|e| AskblogError::Parse(format!("Invalid page URL {}: {}", page_url, e)))?;

        // Html is parsed in a sync helper so the non-Send DOM never lives
        // across an await point.
        let page = parse_index_page(&body, &base)?;
        urls.extend(page.links);
        next_page = page.next_page;
        pages_scraped += 1;

        log::debug!(
            "Discovered {} links so far after page {}",
            urls.len(),
            pages_scraped
        );

        if next_page.is_some() && pages_scraped < max_pages && !fetch_delay.is_zero() {
            tokio::time::sleep(fetch_delay).await;
        }
    }

    Ok(urls)
}

/// Extraction result for a single index page
struct IndexPage {
    links: Vec<String>,
    next_page: Option<String>,
}

/// Extract card links and the next-page URL from index-page HTML.
///
/// Relative hrefs are resolved against `base`.
fn parse_index_page(html: &str, base: &Url) -> Result<IndexPage> {
    let document = Html::parse_document(html);

    let card_selector = selector(CARD_SELECTOR)?;
    let link_selector = selector(CARD_LINK_SELECTOR)?;
    let next_selector = selector(NEXT_PAGE_SELECTOR)?;

    let mut links = Vec::new();
    for card in document.select(&card_selector) {
        let href = card
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"));
        if let Some(href) = href {
            links.push(resolve(base, href)?);
        }
    }

    let next_page = match document
        .select(&next_selector)
        .next()
        .and_then(|a| a.value().attr("href"))
    {
        Some(href) => Some(resolve(base, href)?),
        None => None,
    };

    Ok(IndexPage { links, next_page })
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| AskblogError::Parse(format!("Invalid selector {}: {}", css, e)))
}

fn resolve(base: &Url, href: &str) -> Result<String> {
    base.join(href)
        .map(|u| u.to_string())
        .map_err(|e| AskblogError::Parse(format!("Invalid href {}: {}", href, e)))
}
