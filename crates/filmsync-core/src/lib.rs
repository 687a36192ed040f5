use std::fmt;

use serde::{Deserialize, Serialize};

pub mod classify;
pub mod config_file;
pub mod engine;
pub mod filter;
pub mod normalize;
pub mod phonetic;
pub mod similarity;

// Re-export for convenience
pub use engine::{InventoryPool, Reconciliation, Reconciler, reconcile};
pub use normalize::{NormalizedTitle, normalize_title};
pub use similarity::DEFAULT_PAD_WIDTH;

/// One entry of an externally published, ranked list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    /// 1-based position in the published list.
    pub rank: u32,
    pub title: String,
    pub original_title: Option<String>,
    /// Release year as published; may be missing or garbled.
    pub year: Option<String>,
}

/// An entity held in the local library.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    /// Opaque reference understood by whoever builds the playlist.
    pub handle: String,
    pub title: String,
    pub year: String,
}

/// Confidence classification of a catalog item's outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchTier {
    Exact,
    FuzzyAccepted,
    /// Similar candidate found but no rule vouches for it; not assigned.
    FuzzyRejected,
    None,
}

impl MatchTier {
    /// Whether results of this tier bind an inventory item.
    pub fn is_accepted(self) -> bool {
        matches!(self, MatchTier::Exact | MatchTier::FuzzyAccepted)
    }

    pub fn label(self) -> &'static str {
        match self {
            MatchTier::Exact => "EXACT",
            MatchTier::FuzzyAccepted => "FUZZY_ACCEPTED",
            MatchTier::FuzzyRejected => "FUZZY_REJECTED",
            MatchTier::None => "NONE",
        }
    }
}

impl fmt::Display for MatchTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Diagnostic attached to a result. Independent of the accept/reject
/// decision, which is carried by [`MatchTier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReason {
    PreciseMatch,
    SubtitleDiffers,
    IndexDiffers,
    BothDiffer,
    ScriptVariant,
    ReleaseYearDiffers,
    NumeralFormDiffers,
    UndiagnosedFuzzy,
    NotFound,
}

impl MatchReason {
    pub fn description(self) -> &'static str {
        match self {
            MatchReason::PreciseMatch => "precise match",
            MatchReason::SubtitleDiffers => "subtitle differs",
            MatchReason::IndexDiffers => "index differs",
            MatchReason::BothDiffer => "both differ",
            MatchReason::ScriptVariant => "script variant",
            MatchReason::ReleaseYearDiffers => "release year differs",
            MatchReason::NumeralFormDiffers => "numeral form differs",
            MatchReason::UndiagnosedFuzzy => "similar title without a diagnostic rule",
            MatchReason::NotFound => "not found in inventory",
        }
    }
}

impl fmt::Display for MatchReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Outcome for one catalog item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub catalog_item: CatalogItem,
    /// Bound only for accepted tiers.
    pub matched_handle: Option<String>,
    /// Best candidate examined: the matched item, or the rejected one
    /// surfaced for review.
    pub candidate: Option<InventoryItem>,
    pub similarity_ratio: f64,
    pub year_deviation: u32,
    pub tier: MatchTier,
    pub reasons: Vec<MatchReason>,
}

impl MatchResult {
    pub fn not_found(catalog_item: CatalogItem) -> Self {
        Self {
            catalog_item,
            matched_handle: None,
            candidate: None,
            similarity_ratio: 0.0,
            year_deviation: 0,
            tier: MatchTier::None,
            reasons: vec![MatchReason::NotFound],
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.tier.is_accepted()
    }

    /// Human-readable diagnostic, never empty.
    pub fn diagnostic(&self) -> String {
        if self.reasons.is_empty() {
            return self.tier.label().to_lowercase();
        }
        self.reasons
            .iter()
            .map(|r| r.description())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Progress events emitted while a run walks the catalog.
#[derive(Debug, Clone)]
pub enum MatchEvent {
    Scanning {
        index: usize,
        total: usize,
        title: String,
        pool_size: usize,
    },
    Decided {
        index: usize,
        total: usize,
        result: Box<MatchResult>,
    },
}

/// Summary statistics for a complete run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub exact: usize,
    pub fuzzy_accepted: usize,
    pub fuzzy_rejected: usize,
    pub not_found: usize,
}

impl RunSummary {
    pub fn from_results(results: &[MatchResult]) -> Self {
        let mut summary = Self {
            total: results.len(),
            ..Self::default()
        };
        for result in results {
            match result.tier {
                MatchTier::Exact => summary.exact += 1,
                MatchTier::FuzzyAccepted => summary.fuzzy_accepted += 1,
                MatchTier::FuzzyRejected => summary.fuzzy_rejected += 1,
                MatchTier::None => summary.not_found += 1,
            }
        }
        summary
    }

    pub fn accepted(&self) -> usize {
        self.exact + self.fuzzy_accepted
    }
}

/// Matching knobs. Defaults are the tuned values for Douban/Plex titles.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchConfig {
    /// Largest release-year difference still considered the same film.
    pub max_year_deviation: u32,
    /// Ratio a candidate must exceed to count as similar.
    pub fuzzy_threshold: f64,
    /// Width titles are padded to before the year is appended.
    pub pad_width: usize,
    /// Reject pairs whose main titles differ in character length.
    pub strict_length: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            max_year_deviation: 2,
            fuzzy_threshold: 0.8,
            pad_width: DEFAULT_PAD_WIDTH,
            strict_length: true,
        }
    }
}
