//! HTML extraction for Douban list pages.

use filmsync_core::CatalogItem;
use filmsync_core::normalize::strip_punctuation;
use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};

use crate::{CatalogError, ListId};

static TOP250_ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse("ol.grid_view > li > div.item").unwrap());
static TOP250_RANK: Lazy<Selector> = Lazy::new(|| Selector::parse("div.pic em").unwrap());
static TOP250_TITLE: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.info div.hd a span.title").unwrap());
static TOP250_BD: Lazy<Selector> = Lazy::new(|| Selector::parse("div.info div.bd p").unwrap());

static DOULIST_ITEM: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.bd.doulist-subject").unwrap());
static DOULIST_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("div.title a").unwrap());
static DOULIST_ABSTRACT: Lazy<Selector> = Lazy::new(|| Selector::parse("div.abstract").unwrap());
static DOULIST_COUNT: Lazy<Selector> = Lazy::new(|| Selector::parse("a.active span").unwrap());
static PAGE_TITLE: Lazy<Selector> = Lazy::new(|| Selector::parse("title").unwrap());

/// Marker of the release-year line in a Doulist abstract.
const YEAR_LABEL: &str = "年份";

/// Name and size of a Doulist, read from its first page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoulistMeta {
    pub name: String,
    pub item_count: u32,
}

/// Parse every downloaded page of a list, ranking Doulist entries by position.
pub fn parse_pages(list: &ListId, pages: &[String]) -> Vec<CatalogItem> {
    match list {
        ListId::Top250 => pages.iter().flat_map(|p| parse_top250_page(p)).collect(),
        ListId::Doulist(_) => {
            let mut items = Vec::new();
            for page in pages {
                let next_rank = items.len() as u32 + 1;
                items.extend(parse_doulist_page(page, next_rank));
            }
            items
        }
    }
}

/// Reduce a year field to its first four characters once punctuation is gone.
///
/// `1961(中国大陆)` becomes `1961`.
fn clean_year(raw: &str) -> Option<String> {
    let year: String = strip_punctuation(raw).chars().take(4).collect();
    (!year.is_empty()).then_some(year)
}

fn text_nodes(element: ElementRef<'_>) -> Vec<&str> {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// Parse one page of the Top 250 chart.
pub fn parse_top250_page(html: &str) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for entry in document.select(&TOP250_ITEM) {
        let rank = entry
            .select(&TOP250_RANK)
            .next()
            .and_then(|em| em.text().collect::<String>().trim().parse::<u32>().ok());

        let titles: Vec<String> = entry
            .select(&TOP250_TITLE)
            .map(|span| span.text().collect::<String>())
            .collect();
        let Some(title) = titles.first().map(|t| t.trim().to_string()) else {
            tracing::debug!(?rank, "top250 entry without a title");
            continue;
        };
        let original_title = titles
            .get(1)
            .map(|t| t.replace('/', "").trim().to_string())
            .filter(|t| !t.is_empty());

        // second line of the blurb reads "1994 / 美国 / 犯罪 剧情"
        let year = entry
            .select(&TOP250_BD)
            .next()
            .and_then(|p| {
                let lines = text_nodes(p);
                lines.get(1).and_then(|line| line.split('/').next()).and_then(clean_year)
            });

        items.push(CatalogItem {
            rank: rank.unwrap_or(items.len() as u32 + 1),
            title,
            original_title,
            year,
        });
    }
    items
}

/// Parse one Doulist page; `first_rank` is the rank of its first entry.
pub fn parse_doulist_page(html: &str, first_rank: u32) -> Vec<CatalogItem> {
    let document = Html::parse_document(html);
    let mut items = Vec::new();

    for entry in document.select(&DOULIST_ITEM) {
        // link text is "肖申克的救赎 The Shawshank Redemption"; keep the local title
        let title = entry
            .select(&DOULIST_TITLE)
            .next()
            .and_then(|a| {
                text_nodes(a)
                    .into_iter()
                    .find_map(|t| t.split_whitespace().next().map(str::to_string))
            });
        let Some(title) = title else {
            tracing::debug!("doulist entry without a title");
            continue;
        };

        let year = entry.select(&DOULIST_ABSTRACT).next().and_then(|abs| {
            text_nodes(abs)
                .into_iter()
                .find(|line| line.contains(YEAR_LABEL))
                .and_then(|line| clean_year(&line.replace(YEAR_LABEL, "")))
        });

        items.push(CatalogItem {
            rank: first_rank + items.len() as u32,
            title,
            original_title: None,
            year,
        });
    }
    items
}

/// Read a Doulist's name and total item count from its first page.
pub fn parse_doulist_meta(html: &str) -> Result<DoulistMeta, CatalogError> {
    let document = Html::parse_document(html);

    let count_text = document
        .select(&DOULIST_COUNT)
        .next()
        .map(|span| span.text().collect::<String>())
        .ok_or_else(|| CatalogError::Parse("doulist item count not found".into()))?;
    let item_count = strip_punctuation(&count_text)
        .parse::<u32>()
        .map_err(|e| CatalogError::Parse(format!("bad doulist item count {count_text:?}: {e}")))?;

    let name = document
        .select(&PAGE_TITLE)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| CatalogError::Parse("doulist title not found".into()))?;

    Ok(DoulistMeta { name, item_count })
}
