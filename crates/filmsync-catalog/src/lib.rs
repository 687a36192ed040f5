//! Douban list retrieval for filmsync.
//!
//! Turns a list id into the ordered [`CatalogItem`]s the reconciliation engine
//! consumes: pages are downloaded concurrently, parsed with `scraper`, and
//! cached in SQLite so repeated runs do not hit Douban again.

pub mod cache;
pub mod fetch;
pub mod parse;

use std::fmt;
use std::str::FromStr;

use filmsync_core::CatalogItem;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

pub use cache::{CachedCatalog, CatalogCache};
pub use fetch::{build_client, fetch_catalog};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },
    #[error("cache error: {0}")]
    Cache(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("invalid list id: {0}")]
    InvalidListId(String),
    #[error("background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Which published list to reconcile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ListId {
    /// The Douban movie Top 250 chart.
    Top250,
    /// A user-curated Doulist, by numeric id.
    Doulist(String),
}

impl ListId {
    /// Key used for this list in the cache.
    pub fn key(&self) -> &str {
        match self {
            ListId::Top250 => "top250",
            ListId::Doulist(id) => id,
        }
    }

    /// First page of the list.
    pub fn url(&self) -> String {
        match self {
            ListId::Top250 => "https://movie.douban.com/top250".to_string(),
            ListId::Doulist(id) => format!("https://www.douban.com/doulist/{id}/"),
        }
    }
}

impl fmt::Display for ListId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ListId {
    type Err = CatalogError;

    /// Accepts `top250`, a bare Doulist id, or a Doulist URL.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        static DOULIST_URL: Lazy<Regex> =
            Lazy::new(|| Regex::new(r"douban\.com/doulist/(\d+)").unwrap());

        let s = s.trim();
        if s.eq_ignore_ascii_case("top250") {
            return Ok(ListId::Top250);
        }
        if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
            return Ok(ListId::Doulist(s.to_string()));
        }
        if let Some(caps) = DOULIST_URL.captures(s) {
            return Ok(ListId::Doulist(caps[1].to_string()));
        }
        Err(CatalogError::InvalidListId(s.to_string()))
    }
}

/// A fetched (or cached) list.
#[derive(Debug, Clone, PartialEq)]
pub struct Catalog {
    pub list: ListId,
    pub name: String,
    pub items: Vec<CatalogItem>,
}

/// Get a list's catalog, preferring the cache.
///
/// The cache is bypassed when `renew` is set or holds nothing for the list.
/// Cache failures are logged and the list is fetched instead.
pub async fn load_catalog(
    client: &reqwest::Client,
    cache: Option<&CatalogCache>,
    list: &ListId,
    renew: bool,
) -> Result<Catalog, CatalogError> {
    if let Some(cache) = cache.filter(|_| !renew) {
        match cache.load(list) {
            Ok(Some(cached)) => {
                tracing::info!(
                    list = %list,
                    name = %cached.catalog.name,
                    renewed_at = cached.renewed_at,
                    items = cached.catalog.items.len(),
                    "using cached catalog"
                );
                return Ok(cached.catalog);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(list = %list, error = %e, "catalog cache unreadable, fetching"),
        }
    }

    let catalog = fetch_catalog(client, list).await?;

    if let Some(cache) = cache {
        match cache.store(&catalog) {
            Ok(()) => tracing::info!(list = %list, items = catalog.items.len(), "catalog cached"),
            Err(e) => tracing::warn!(list = %list, error = %e, "failed to cache catalog"),
        }
    }
    Ok(catalog)
}
