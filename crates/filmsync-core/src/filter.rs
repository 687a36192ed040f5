//! Structural screening of (catalog, inventory) pairs.
//!
//! A pair only reaches the scorer when both years parse, the years are close
//! enough, the franchise numerals agree and the main titles are the same
//! length. Failing pairs are never errors: unparsable years mean "no
//! information" and the other checks simply disqualify.

use crate::MatchConfig;
use crate::normalize::NormalizedTitle;

/// Why a pair was disqualified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Release years further apart than allowed.
    YearGap(u32),
    /// Both titles carry a sequence index and the indices differ.
    IndexMismatch,
    /// Main titles have different character lengths.
    LengthMismatch,
}

/// Outcome of screening one pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screening {
    /// Pair may be scored; carries the absolute year difference.
    Pass { year_deviation: u32 },
    /// At least one year is not an integer; the pair is ignored.
    Unparsable,
    Reject(Rejection),
}

/// Parse a year field, tolerating surrounding whitespace.
pub fn parse_year(year: &str) -> Option<i32> {
    year.trim().parse().ok()
}

/// Screen a pair whose years have already been parsed (`None` = unparsable).
pub fn screen(
    catalog_title: &NormalizedTitle,
    catalog_year: Option<i32>,
    inventory_title: &NormalizedTitle,
    inventory_year: Option<i32>,
    config: &MatchConfig,
) -> Screening {
    let (Some(a), Some(b)) = (catalog_year, inventory_year) else {
        return Screening::Unparsable;
    };

    let year_deviation = a.abs_diff(b);
    if year_deviation > config.max_year_deviation {
        return Screening::Reject(Rejection::YearGap(year_deviation));
    }

    let (idx_a, idx_b) = (
        &catalog_title.sequence_index,
        &inventory_title.sequence_index,
    );
    if !idx_a.is_empty() && !idx_b.is_empty() && idx_a != idx_b {
        return Screening::Reject(Rejection::IndexMismatch);
    }

    if config.strict_length
        && catalog_title.main_title.chars().count() != inventory_title.main_title.chars().count()
    {
        return Screening::Reject(Rejection::LengthMismatch);
    }

    Screening::Pass { year_deviation }
}
