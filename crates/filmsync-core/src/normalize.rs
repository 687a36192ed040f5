use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

/// The single separator every whitespace/colon variant is folded into.
pub const SEPARATOR: char = ' ';

/// Typographic and CJK marks removed from titles, on top of ASCII punctuation.
///
/// Full-width ASCII forms (`！`, `（`, `，` ...) are not listed: NFKC folds them
/// into their ASCII counterparts before this set is consulted.
const EXTRA_PUNCTUATION: &[char] = &[
    '‧', '·', '・', '。', '、', '“', '”', '‘', '’', '《', '》', '〈', '〉', '【', '】', '〔',
    '〕', '「', '」', '『', '』', '〖', '〗', '—', '–', '―', '…', '～', '〜', '♪', '☆', '★',
];

/// Colon-like characters that separate a main title from its subtitle.
const COLON_LIKE: &[char] = &[':', '：', '∶', '︰', '﹕'];

/// A title split into its comparable parts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedTitle {
    pub main_title: String,
    /// Trailing franchise numeral (`"2"` in `教父2`), empty when absent.
    pub sequence_index: String,
    /// Everything after the first separator, empty when absent.
    pub subtitle: String,
}

impl NormalizedTitle {
    /// Main title, index and subtitle joined without separators.
    pub fn compact(&self) -> String {
        let mut out = String::with_capacity(
            self.main_title.len() + self.sequence_index.len() + self.subtitle.len(),
        );
        out.push_str(&self.main_title);
        out.push_str(&self.sequence_index);
        out.extend(self.subtitle.chars().filter(|&c| c != SEPARATOR));
        out
    }

    pub fn is_empty(&self) -> bool {
        self.main_title.is_empty() && self.sequence_index.is_empty() && self.subtitle.is_empty()
    }
}

fn is_separator(c: char) -> bool {
    c.is_whitespace() || COLON_LIKE.contains(&c)
}

/// Characters dropped during normalization.
///
/// ASCII punctuation and symbols, plus [`EXTRA_PUNCTUATION`]. Letters, digits
/// and CJK ideographs never match.
pub fn is_stripped_punctuation(c: char) -> bool {
    c.is_ascii_punctuation() || EXTRA_PUNCTUATION.contains(&c)
}

/// Fold separators to [`SEPARATOR`] and drop punctuation.
///
/// Runs of separators collapse into one; leading and trailing separators are
/// removed.
pub fn clean_title(raw: &str) -> String {
    let folded: String = raw.nfkc().collect();
    let mut out = String::with_capacity(folded.len());
    for c in folded.trim().chars() {
        if is_separator(c) {
            if !out.is_empty() && !out.ends_with(SEPARATOR) {
                out.push(SEPARATOR);
            }
        } else if !is_stripped_punctuation(c) {
            out.push(c);
        }
    }
    if out.ends_with(SEPARATOR) {
        out.pop();
    }
    out
}

/// Remove every separator and punctuation mark from a title.
pub fn strip_punctuation(raw: &str) -> String {
    clean_title(raw).chars().filter(|&c| c != SEPARATOR).collect()
}

/// Split a title into main title, sequence index and subtitle.
///
/// Only the first separator is a split point: `指环王3：王者无敌 加长版`
/// yields main `指环王`, index `3`, subtitle `王者无敌 加长版`.
pub fn normalize_title(raw: &str) -> NormalizedTitle {
    let cleaned = clean_title(raw);

    let (candidate, subtitle) = match cleaned.split_once(SEPARATOR) {
        Some((head, tail)) if !head.is_empty() && !tail.is_empty() => {
            (head.to_string(), tail.to_string())
        }
        _ => (
            cleaned.chars().filter(|&c| c != SEPARATOR).collect(),
            String::new(),
        ),
    };

    let (main_title, sequence_index) = split_sequence_index(&candidate);
    NormalizedTitle {
        main_title,
        sequence_index,
        subtitle,
    }
}

/// Peel a trailing run of ASCII digits off a title, if a non-digit precedes it.
fn split_sequence_index(candidate: &str) -> (String, String) {
    static TRAILING_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(.*[^0-9])([0-9]+)$").unwrap());

    match TRAILING_INDEX.captures(candidate) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (candidate.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // Cleaning
    // =========================================================================

    #[test]
    fn test_clean_strips_brackets_and_quotes() {
        assert_eq!(clean_title("《阿甘正传》"), "阿甘正传");
        assert_eq!(clean_title("【霸王别姬】"), "霸王别姬");
        assert_eq!(clean_title("“大话西游”"), "大话西游");
    }

    #[test]
    fn test_clean_folds_full_width() {
        assert_eq!(clean_title("ＡＢＣ！"), "ABC");
        assert_eq!(clean_title("（无间道）"), "无间道");
    }

    #[test]
    fn test_clean_collapses_separators() {
        assert_eq!(clean_title("  星球大战 ：  新希望  "), "星球大战 新希望");
        assert_eq!(clean_title("Star\u{3000}Wars"), "Star Wars");
        assert_eq!(clean_title("a\u{a0}b"), "a b");
    }

    #[test]
    fn test_clean_drops_middle_dot() {
        assert_eq!(clean_title("哈利·波特与魔法石"), "哈利波特与魔法石");
    }

    #[test]
    fn test_clean_trailing_punctuation_leaves_no_separator() {
        assert_eq!(clean_title("让子弹飞 -"), "让子弹飞");
    }

    #[test]
    fn test_strip_punctuation_removes_separators() {
        assert_eq!(strip_punctuation("The Dark Knight"), "TheDarkKnight");
    }

    // =========================================================================
    // Splitting
    // =========================================================================

    #[test]
    fn test_normalize_empty() {
        let n = normalize_title("");
        assert!(n.is_empty());
        assert_eq!(n, NormalizedTitle::default());
    }

    #[test]
    fn test_normalize_plain() {
        let n = normalize_title("阿甘正传");
        assert_eq!(n.main_title, "阿甘正传");
        assert_eq!(n.sequence_index, "");
        assert_eq!(n.subtitle, "");
    }

    #[test]
    fn test_normalize_subtitle() {
        let n = normalize_title("星球大战：新希望");
        assert_eq!(n.main_title, "星球大战");
        assert_eq!(n.subtitle, "新希望");
    }

    #[test]
    fn test_normalize_sequence_index() {
        let n = normalize_title("教父2");
        assert_eq!(n.main_title, "教父");
        assert_eq!(n.sequence_index, "2");
    }

    #[test]
    fn test_normalize_index_and_subtitle() {
        let n = normalize_title("指环王3：王者无敌");
        assert_eq!(n.main_title, "指环王");
        assert_eq!(n.sequence_index, "3");
        assert_eq!(n.subtitle, "王者无敌");
    }

    #[test]
    fn test_normalize_only_first_separator_splits() {
        let n = normalize_title("指环王3：王者无敌 加长版");
        assert_eq!(n.main_title, "指环王");
        assert_eq!(n.subtitle, "王者无敌 加长版");
        assert_eq!(n.compact(), "指环王3王者无敌加长版");
    }

    #[test]
    fn test_normalize_leading_digits_are_not_an_index() {
        let n = normalize_title("2001太空漫游");
        assert_eq!(n.main_title, "2001太空漫游");
        assert_eq!(n.sequence_index, "");
    }

    #[test]
    fn test_normalize_all_digits_title() {
        let n = normalize_title("1917");
        assert_eq!(n.main_title, "1917");
        assert_eq!(n.sequence_index, "");
    }

    #[test]
    fn test_normalize_separator_only() {
        assert!(normalize_title(" ： ").is_empty());
    }

    #[test]
    fn test_compact_matches_stripped_title() {
        let raw = "速度与激情7：终极 之战";
        assert_eq!(normalize_title(raw).compact(), strip_punctuation(raw));
    }
}
