//! Tiered match rules.
//!
//! Each surviving candidate is run through the rules in order; the first
//! three end the scan for the current catalog item, the fourth only proposes
//! a tentative best. See [`evaluate`].

use crate::filter::parse_year;
use crate::normalize::{NormalizedTitle, normalize_title};
use crate::phonetic::{ideographic_numerals, phonetic_key};
use crate::similarity::similarity;
use crate::{MatchConfig, MatchReason, MatchTier};

/// A title with every derived form the rules need, computed once per item.
#[derive(Debug, Clone)]
pub struct Prepared {
    pub normalized: NormalizedTitle,
    pub compact: String,
    pub phonetic: String,
    pub year_text: String,
    pub year: Option<i32>,
}

impl Prepared {
    pub fn new(title: &str, year: &str) -> Self {
        let normalized = normalize_title(title);
        let compact = normalized.compact();
        let phonetic = phonetic_key(&normalized.main_title);
        Self {
            normalized,
            compact,
            phonetic,
            year_text: year.trim().to_string(),
            year: parse_year(year),
        }
    }

    /// Similarity ratio against another prepared title.
    pub fn similarity(&self, other: &Prepared, pad_width: usize) -> f64 {
        similarity(
            &self.compact,
            &self.year_text,
            &other.compact,
            &other.year_text,
            pad_width,
        )
    }
}

/// What the rules concluded about a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    /// Rules 1-3: certain match, stop scanning.
    Exact { ratio: f64, reasons: Vec<MatchReason> },
    /// Rule 4: above the threshold; `diagnosis` decides accept vs. reject.
    Fuzzy {
        ratio: f64,
        diagnosis: Option<MatchReason>,
    },
    /// Not similar enough to consider.
    Below { ratio: f64 },
}

impl Evaluation {
    pub fn ratio(&self) -> f64 {
        match self {
            Evaluation::Exact { ratio, .. }
            | Evaluation::Fuzzy { ratio, .. }
            | Evaluation::Below { ratio } => *ratio,
        }
    }
}

/// Which of subtitle / sequence index differ between two titles.
fn part_difference(a: &NormalizedTitle, b: &NormalizedTitle) -> Option<MatchReason> {
    match (
        a.subtitle != b.subtitle,
        a.sequence_index != b.sequence_index,
    ) {
        (true, true) => Some(MatchReason::BothDiffer),
        (true, false) => Some(MatchReason::SubtitleDiffers),
        (false, true) => Some(MatchReason::IndexDiffers),
        (false, false) => None,
    }
}

/// Apply the tier rules to a candidate that passed the filter.
///
/// 1. identical comparison strings: exact, "precise match"
/// 2. same main title and year: exact, reasons name the differing parts
/// 3. above threshold, same phonetic key and year: exact, "script variant"
/// 4. above threshold: fuzzy, with a diagnosis when one applies
pub fn evaluate(
    catalog: &Prepared,
    candidate: &Prepared,
    year_deviation: u32,
    config: &MatchConfig,
) -> Evaluation {
    let ratio = catalog.similarity(candidate, config.pad_width);
    let (a, b) = (&catalog.normalized, &candidate.normalized);
    let same_year = year_deviation == 0;

    if ratio == 1.0 {
        return Evaluation::Exact {
            ratio,
            reasons: vec![MatchReason::PreciseMatch],
        };
    }

    if a.main_title == b.main_title && same_year {
        let reason = part_difference(a, b).unwrap_or(MatchReason::PreciseMatch);
        return Evaluation::Exact {
            ratio,
            reasons: vec![reason],
        };
    }

    if ratio <= config.fuzzy_threshold {
        return Evaluation::Below { ratio };
    }

    if same_year && catalog.phonetic == candidate.phonetic {
        let mut reasons: Vec<MatchReason> = part_difference(a, b).into_iter().collect();
        reasons.push(MatchReason::ScriptVariant);
        return Evaluation::Exact { ratio, reasons };
    }

    let same_index = a.sequence_index == b.sequence_index;
    let diagnosis = if a.main_title == b.main_title && same_index {
        Some(MatchReason::ReleaseYearDiffers)
    } else if same_index
        && ideographic_numerals(&a.main_title) == ideographic_numerals(&b.main_title)
    {
        Some(MatchReason::NumeralFormDiffers)
    } else {
        None
    };

    Evaluation::Fuzzy { ratio, diagnosis }
}

/// Tier of a retained fuzzy candidate once the scan has finished.
pub fn settle(diagnosis: Option<MatchReason>) -> MatchTier {
    match diagnosis {
        Some(_) => MatchTier::FuzzyAccepted,
        None => MatchTier::FuzzyRejected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(a: &str, ya: &str, b: &str, yb: &str) -> Evaluation {
        let left = Prepared::new(a, ya);
        let right = Prepared::new(b, yb);
        let deviation = match (left.year, right.year) {
            (Some(x), Some(y)) => x.abs_diff(y),
            _ => 0,
        };
        evaluate(&left, &right, deviation, &MatchConfig::default())
    }

    // =========================================================================
    // Exact tiers
    // =========================================================================

    #[test]
    fn test_precise_match() {
        assert_eq!(
            eval("阿甘正传", "1994", "阿甘正传", "1994"),
            Evaluation::Exact {
                ratio: 1.0,
                reasons: vec![MatchReason::PreciseMatch]
            }
        );
    }

    #[test]
    fn test_punctuation_differences_still_precise() {
        let e = eval("《阿甘正传》", "1994", "阿甘 正传", "1994");
        assert_eq!(e.ratio(), 1.0);
    }

    #[test]
    fn test_same_main_title_subtitle_differs() {
        match eval("星球大战：新希望", "1977", "星球大战：新的希望", "1977") {
            Evaluation::Exact { ratio, reasons } => {
                assert!(ratio < 1.0);
                assert_eq!(reasons, vec![MatchReason::SubtitleDiffers]);
            }
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn test_same_main_title_index_differs() {
        match eval("教父", "1974", "教父2", "1974") {
            Evaluation::Exact { reasons, .. } => {
                assert_eq!(reasons, vec![MatchReason::IndexDiffers]);
            }
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn test_same_main_title_both_differ() {
        match eval("指环王：护戒使者", "2001", "指环王1：魔戒再现", "2001") {
            Evaluation::Exact { reasons, .. } => {
                assert_eq!(reasons, vec![MatchReason::BothDiffer]);
            }
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn test_script_variant() {
        match eval("霸王别姬", "1993", "霸王別姬", "1993") {
            Evaluation::Exact { ratio, reasons } => {
                assert!(ratio > 0.8 && ratio < 1.0);
                assert_eq!(reasons, vec![MatchReason::ScriptVariant]);
            }
            other => panic!("expected exact, got {other:?}"),
        }
    }

    #[test]
    fn test_script_variant_needs_same_year() {
        assert!(matches!(
            eval("霸王别姬", "1993", "霸王別姬", "1994"),
            Evaluation::Fuzzy {
                diagnosis: None,
                ..
            }
        ));
    }

    #[test]
    fn test_shared_initials_are_not_a_script_variant() {
        // 教父 (jiao fu) and 解放 (jie fang) score above the threshold at this length
        match eval("教父", "1972", "解放", "1972") {
            Evaluation::Fuzzy { ratio, diagnosis } => {
                assert!(ratio > 0.8);
                assert_eq!(diagnosis, None);
            }
            other => panic!("expected fuzzy, got {other:?}"),
        }
    }

    #[test]
    fn test_script_variant_still_needs_the_threshold() {
        let simplified = "龙门客栈龙门客栈龙门客栈";
        let traditional = "龍門客棧龍門客棧龍門客棧";
        assert_eq!(phonetic_key(simplified), phonetic_key(traditional));
        assert!(matches!(
            eval(simplified, "1992", traditional, "1992"),
            Evaluation::Below { ratio } if ratio <= 0.8
        ));
    }

    #[test]
    fn test_first_word_is_the_main_title() {
        // whitespace separates main title from subtitle, so these share "The"
        match eval("The Matrix", "1999", "The Mummy", "1999") {
            Evaluation::Exact { ratio, reasons } => {
                assert!(ratio < 0.8);
                assert_eq!(reasons, vec![MatchReason::SubtitleDiffers]);
            }
            other => panic!("expected exact, got {other:?}"),
        }
    }

    // =========================================================================
    // Fuzzy tiers
    // =========================================================================

    #[test]
    fn test_release_year_differs() {
        assert!(matches!(
            eval("霸王别姬", "1993", "霸王别姬", "1992"),
            Evaluation::Fuzzy {
                diagnosis: Some(MatchReason::ReleaseYearDiffers),
                ..
            }
        ));
    }

    #[test]
    fn test_numeral_form_differs() {
        assert!(matches!(
            eval("第1滴血", "1982", "第一滴血", "1982"),
            Evaluation::Fuzzy {
                diagnosis: Some(MatchReason::NumeralFormDiffers),
                ..
            }
        ));
    }

    #[test]
    fn test_undiagnosed_fuzzy() {
        match eval("教父", "1972", "教父2", "1974") {
            Evaluation::Fuzzy { ratio, diagnosis } => {
                assert!(ratio > 0.8);
                assert_eq!(diagnosis, None);
            }
            other => panic!("expected fuzzy, got {other:?}"),
        }
    }

    #[test]
    fn test_below_threshold() {
        assert!(matches!(
            eval("千与千寻", "2001", "龙猫猫猫", "2001"),
            Evaluation::Below { .. }
        ));
    }

    #[test]
    fn test_settle() {
        assert_eq!(
            settle(Some(MatchReason::ReleaseYearDiffers)),
            MatchTier::FuzzyAccepted
        );
        assert_eq!(settle(None), MatchTier::FuzzyRejected);
    }
}
