/// The genres module resolves legacy numeric genre identifiers: the ID3v1 genre table (0-191,
/// including the Winamp extensions) and the parenthesized ID3v2.3 TCON references that point
/// back into it.
use lofty::id3::v1::GENRES;
use once_cell::sync::Lazy;
use regex::Regex;

static GENRE_REF_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\((\d+)\)\s*(.*)$").unwrap());

static GENRE_CODE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+$").unwrap());

/// Codes 192-254 are unassigned and 255 means "no genre"; both read back as absent.
pub fn genre_name(code: u8) -> Option<&'static str> {
    GENRES.get(code as usize).copied()
}

pub fn genre_code(name: &str) -> Option<u8> {
    GENRES.iter().position(|g| g.eq_ignore_ascii_case(name)).map(|i| i as u8)
}

/// Resolves a raw genre string that may be a numeric table reference.
///
/// `"17"` and `"(17)"` resolve through the table; `"(17)Roots Rock"` keeps the refinement
/// text; a reference to an unassigned code resolves to nothing; any other string passes
/// through unchanged.
pub fn resolve_genre_value(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if let Some(caps) = GENRE_REF_REGEX.captures(raw) {
        let refinement = caps[2].trim();
        if !refinement.is_empty() {
            return Some(refinement.to_string());
        }
        return caps[1].parse::<u8>().ok().and_then(genre_name).map(String::from);
    }
    if GENRE_CODE_REGEX.is_match(raw) {
        return raw.parse::<u8>().ok().and_then(genre_name).map(String::from);
    }
    if raw.is_empty() {
        return None;
    }
    Some(raw.to_string())
}
