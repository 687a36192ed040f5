//! Script-invariant phonetic keys for titles.
//!
//! Simplified and traditional renderings of the same title share their
//! pinyin, so spelling every Han character as its toneless reading lets
//! `霸王别姬` and `霸王別姬` compare equal even though their characters differ.
//! Initials alone are too coarse: `教父` and `解放` would both become `JF`.

use pinyin::ToPinyin;

const IDEOGRAPHIC_DIGITS: [char; 10] = ['〇', '一', '二', '三', '四', '五', '六', '七', '八', '九'];

/// Build the phonetic key of a title.
///
/// Han characters map to their upper-case toneless pinyin reading, other
/// alphanumerics to their upper-case form; anything else is kept as is.
pub fn phonetic_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    for c in title.chars() {
        match c.to_pinyin() {
            Some(reading) => key.push_str(&reading.plain().to_uppercase()),
            None if c.is_alphanumeric() => key.extend(c.to_uppercase()),
            None => key.push(c),
        }
    }
    key
}

/// Replace Arabic digits with their ideographic numerals (`第1滴血` -> `第一滴血`).
pub fn ideographic_numerals(title: &str) -> String {
    title
        .chars()
        .map(|c| match c.to_digit(10) {
            Some(d) if c.is_ascii_digit() => IDEOGRAPHIC_DIGITS[d as usize],
            _ => c,
        })
        .collect()
}
