//! JSON inputs: the library export and offline catalogs.

use std::path::Path;

use anyhow::Context;
use filmsync_core::{CatalogItem, InventoryItem};
use serde::Deserialize;

/// Library exports write the year either as a number or as text.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum YearField {
    Number(i64),
    Text(String),
}

impl YearField {
    fn into_text(self) -> String {
        match self {
            YearField::Number(n) => n.to_string(),
            YearField::Text(s) => s,
        }
    }
}

#[derive(Debug, Deserialize)]
struct InventoryRecord {
    handle: String,
    title: String,
    #[serde(default)]
    year: Option<YearField>,
}

#[derive(Debug, Deserialize)]
struct CatalogRecord {
    rank: u32,
    title: String,
    #[serde(default)]
    original_title: Option<String>,
    #[serde(default)]
    year: Option<YearField>,
}

pub fn parse_inventory(json: &str) -> serde_json::Result<Vec<InventoryItem>> {
    let records: Vec<InventoryRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| InventoryItem {
            handle: r.handle,
            title: r.title,
            year: r.year.map(YearField::into_text).unwrap_or_default(),
        })
        .collect())
}

pub fn parse_catalog(json: &str) -> serde_json::Result<Vec<CatalogItem>> {
    let records: Vec<CatalogRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .map(|r| CatalogItem {
            rank: r.rank,
            title: r.title,
            original_title: r.original_title,
            year: r.year.map(YearField::into_text),
        })
        .collect())
}

pub fn load_inventory(path: &Path) -> anyhow::Result<Vec<InventoryItem>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading inventory {}", path.display()))?;
    parse_inventory(&json).with_context(|| format!("parsing inventory {}", path.display()))
}

pub fn load_catalog_file(path: &Path) -> anyhow::Result<Vec<CatalogItem>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading catalog {}", path.display()))?;
    parse_catalog(&json).with_context(|| format!("parsing catalog {}", path.display()))
}
