/// Width every title is padded to before the year is appended.
pub const DEFAULT_PAD_WIDTH: usize = 11;

/// Character used to pad short titles. Never survives normalization, so it
/// cannot collide with title text.
pub const FILLER: char = '*';

/// Pad a title with [`FILLER`] up to `width` characters and append the year.
///
/// Titles already wider than `width` are left unpadded.
pub fn comparison_string(title: &str, year: &str, width: usize) -> String {
    let len = title.chars().count();
    let mut out = String::with_capacity(title.len() + width + year.len());
    out.push_str(title);
    out.extend(std::iter::repeat_n(FILLER, width.saturating_sub(len)));
    out.push_str(year.trim());
    out
}

/// Similarity of two (title, year) pairs in `[0, 1]`.
///
/// Indel ratio (`2 * LCS / total length`) over the padded comparison
/// strings: commutative, and exactly `1.0` only when both strings are
/// identical. Padding keeps short-title length differences from dominating
/// the score; the year separates same-titled works from different years.
pub fn similarity(title_a: &str, year_a: &str, title_b: &str, year_b: &str, width: usize) -> f64 {
    let a = comparison_string(title_a, year_a, width);
    let b = comparison_string(title_b, year_b, width);
    if a == b {
        return 1.0;
    }
    rapidfuzz::fuzz::ratio(a.chars(), b.chars()).clamp(0.0, 1.0)
}
