//! Concurrent page downloads for Douban lists.

use std::time::Duration;

use futures_util::future::try_join_all;
use reqwest::header::{HeaderMap, HeaderValue, REFERER, USER_AGENT};

use crate::parse::{parse_doulist_meta, parse_pages};
use crate::{Catalog, CatalogError, ListId};

/// Entries per Douban list page.
pub const PAGE_SIZE: u32 = 25;

/// The Top 250 chart always spans ten pages.
const TOP250_PAGES: u32 = 10;

pub const TOP250_NAME: &str = "豆瓣TOP250";

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/58.0.3029.110 Safari/537.3";

/// HTTP client with the headers Douban expects from a browser.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, CatalogError> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(REFERER, HeaderValue::from_static("https://www.douban.com/"));

    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()?)
}

/// URLs of every page of a list, `?start=0`, `?start=25`, ...
pub fn page_urls(base: &str, pages: u32) -> Vec<String> {
    (0..pages)
        .map(|page| format!("{base}?start={}", page * PAGE_SIZE))
        .collect()
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> Result<String, CatalogError> {
    let resp = client.get(url).send().await?;
    let status = resp.status();
    if !status.is_success() {
        return Err(CatalogError::Status {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }
    Ok(resp.text().await?)
}

/// Download pages concurrently, keeping their order.
async fn fetch_all(client: &reqwest::Client, urls: &[String]) -> Result<Vec<String>, CatalogError> {
    try_join_all(urls.iter().map(|url| fetch_page(client, url))).await
}

/// Download and parse a whole list.
pub async fn fetch_catalog(
    client: &reqwest::Client,
    list: &ListId,
) -> Result<Catalog, CatalogError> {
    let base = list.url();

    let (name, pages) = match list {
        ListId::Top250 => {
            let urls = page_urls(&base, TOP250_PAGES);
            (TOP250_NAME.to_string(), fetch_all(client, &urls).await?)
        }
        ListId::Doulist(_) => {
            let first = fetch_page(client, &base).await?;
            // scraper documents are !Send, so parse off the async task
            let first_clone = first.clone();
            let meta = tokio::task::spawn_blocking(move || parse_doulist_meta(&first_clone)).await??;

            let page_count = meta.item_count.div_ceil(PAGE_SIZE).max(1);
            let rest = page_urls(&base, page_count).split_off(1);
            let mut pages = Vec::with_capacity(page_count as usize);
            pages.push(first);
            pages.extend(fetch_all(client, &rest).await?);
            (meta.name, pages)
        }
    };

    tracing::info!(list = %list, pages = pages.len(), "downloaded catalog pages");

    let owned_list = list.clone();
    let items = tokio::task::spawn_blocking(move || parse_pages(&owned_list, &pages)).await?;
    if items.is_empty() {
        return Err(CatalogError::Parse(format!("no entries found in list {list}")));
    }

    Ok(Catalog {
        list: list.clone(),
        name,
        items,
    })
}
