/// The normalize module converts raw per-format field content into canonical unified values
/// and back. Raw content arrives as whatever shape the format stores natively (one string
/// with ad-hoc separators, repeated discrete entries, a legacy genre code) and leaves as the
/// declared canonical type of the unified key.
///
/// Ratings are the one exception: they are numeric scale conversions, owned by the rating
/// module, and the engines route them around this module.
use crate::adapters::RawValue;
use crate::errors::{Result, UnitagError};
use crate::genres;
use crate::keys::{MetadataValue, UnifiedMetadataKey, ValueKind};
use tracing::{debug, warn};

/// Separators recognized inside single-string multi-value fields, in decision priority.
/// Two-character separators come first so that e.g. a double backslash is never misread as
/// two empty-producing single backslashes.
pub const VALUE_SEPARATORS: &[&str] = &["//", "\\\\", ";", "\\", "/", ","];

/// Separator used when serializing a list into a format that stores one joined string.
pub const MULTI_VALUE_JOINER: &str = ";";

/// How a format stores multi-valued fields on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultiValueStyle {
    /// One discrete entry per value (Vorbis).
    Repeated,
    /// A single string with values joined by [`MULTI_VALUE_JOINER`].
    Joined,
}

pub fn multi_value_style(format: crate::formats::MetadataFormat) -> MultiValueStyle {
    match format {
        crate::formats::MetadataFormat::Vorbis => MultiValueStyle::Repeated,
        _ => MultiValueStyle::Joined,
    }
}

/// Splits a single-string multi-value field on the highest-priority separator present.
///
/// Exactly one separator is chosen per string; lower-priority separator characters inside
/// the resulting parts are preserved verbatim. Parts are trimmed and empty parts dropped.
pub fn split_separated_value(raw: &str) -> Vec<String> {
    for sep in VALUE_SEPARATORS {
        if raw.contains(sep) {
            return raw.split(sep).map(str::trim).filter(|p| !p.is_empty()).map(String::from).collect();
        }
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        vec![]
    } else {
        vec![trimmed.to_string()]
    }
}

/// Trims a list of discrete raw entries and drops the blank ones. Order and duplicates are
/// preserved; entries are never split further.
pub fn normalize_multi_value(raw: &[String]) -> Vec<String> {
    raw.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).map(String::from).collect()
}

/// Reduces a raw value to one trimmed non-blank string, if it has one. A multi-entry raw for
/// a single-valued key keeps its first non-blank entry.
fn first_text(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        RawValue::Entries(v) => {
            let mut values = normalize_multi_value(v);
            if values.len() > 1 {
                debug!("multiple entries for single-valued field, keeping the first of {}", values.len());
            }
            if values.is_empty() {
                None
            } else {
                Some(values.swap_remove(0))
            }
        }
        _ => None,
    }
}

/// Converts one raw field into its canonical unified value. Returns None when the raw
/// content is blank or unusable; a read never fails over one corrupt field.
pub fn normalize_raw_value(key: UnifiedMetadataKey, raw: &RawValue) -> Option<MetadataValue> {
    match key.value_kind() {
        ValueKind::TextList => {
            let values = match raw {
                RawValue::Text(s) => split_separated_value(s),
                RawValue::Entries(v) => normalize_multi_value(v),
                other => {
                    warn!("ignoring non-text raw value for {:?}: {:?}", key, other.kind_name());
                    return None;
                }
            };
            if values.is_empty() {
                None
            } else {
                Some(MetadataValue::List(values))
            }
        }
        ValueKind::Text => {
            if key == UnifiedMetadataKey::Genre {
                return match raw {
                    RawValue::GenreCode(code) => genres::genre_name(*code).map(|g| MetadataValue::Text(g.to_string())),
                    _ => first_text(raw).and_then(|s| genres::resolve_genre_value(&s)).map(MetadataValue::Text),
                };
            }
            first_text(raw).map(MetadataValue::Text)
        }
        ValueKind::Integer => {
            // Ratings are converted by the rating normalizer before reaching this point; a
            // stray native rating raw passes through as its numeric value.
            if let RawValue::Rating(n) = raw {
                return Some(MetadataValue::Integer(*n as i64));
            }
            let text = first_text(raw)?;
            match text.parse::<i64>() {
                Ok(i) => Some(MetadataValue::Integer(i)),
                Err(_) => {
                    warn!("ignoring unparseable integer for {:?}: {:?}", key, text);
                    None
                }
            }
        }
        ValueKind::Boolean => {
            let text = first_text(raw)?;
            match text.to_lowercase().as_str() {
                "1" | "true" | "yes" => Some(MetadataValue::Boolean(true)),
                "0" | "false" | "no" => Some(MetadataValue::Boolean(false)),
                _ => {
                    warn!("ignoring unparseable boolean for {:?}: {:?}", key, text);
                    None
                }
            }
        }
        ValueKind::Binary => match raw {
            RawValue::Binary(b) => Some(MetadataValue::Binary(b.clone())),
            _ => None,
        },
    }
}

/// Rejects a payload whose variant disagrees with the key's canonical kind.
pub fn check_value_type(key: UnifiedMetadataKey, value: &MetadataValue) -> Result<()> {
    if value.kind() != key.value_kind() {
        return Err(UnitagError::InvalidValue { key, expected: key.value_kind() });
    }
    Ok(())
}

/// Converts one canonical value into the raw shape a format stores. Ratings are converted by
/// the rating normalizer instead of this function.
pub fn denormalize_value(key: UnifiedMetadataKey, value: &MetadataValue, style: MultiValueStyle) -> Result<RawValue> {
    check_value_type(key, value)?;
    Ok(match value {
        MetadataValue::Text(s) => RawValue::Text(s.clone()),
        MetadataValue::List(v) => match style {
            MultiValueStyle::Repeated => RawValue::Entries(normalize_multi_value(v)),
            MultiValueStyle::Joined => RawValue::Text(normalize_multi_value(v).join(MULTI_VALUE_JOINER)),
        },
        MetadataValue::Integer(i) => RawValue::Text(i.to_string()),
        MetadataValue::Boolean(b) => RawValue::Text(if *b { "1" } else { "0" }.to_string()),
        MetadataValue::Binary(b) => RawValue::Binary(b.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separator_priority() {
        assert_eq!(split_separated_value("Artist//One;Two,Three"), vec!["Artist", "One;Two,Three"]);
    }

    #[test]
    fn test_single_separator_per_string() {
        assert_eq!(split_separated_value("A,B;C"), vec!["A,B", "C"]);
        assert_eq!(split_separated_value("A/B//C"), vec!["A/B", "C"]);
    }

    #[test]
    fn test_backslash_separators() {
        // Double backslash outranks single so it never splits into empty halves.
        assert_eq!(split_separated_value(r"A \\ B"), vec!["A", "B"]);
        assert_eq!(split_separated_value(r"A\B"), vec!["A", "B"]);
    }

    #[test]
    fn test_split_without_separator() {
        assert_eq!(split_separated_value("  Single Artist  "), vec!["Single Artist"]);
        assert_eq!(split_separated_value("   "), Vec::<String>::new());
        assert_eq!(split_separated_value("//"), Vec::<String>::new());
    }

    #[test]
    fn test_split_drops_empty_parts() {
        assert_eq!(split_separated_value("Artist One;;Artist Two;"), vec!["Artist One", "Artist Two"]);
    }

    #[test]
    fn test_normalize_multi_value() {
        let raw = vec!["  a ".to_string(), String::new(), "  ".to_string(), "b".to_string(), "a".to_string()];
        assert_eq!(normalize_multi_value(&raw), vec!["a", "b", "a"]);
    }

    #[test]
    fn test_entries_are_not_resplit() {
        let raw = RawValue::Entries(vec!["AC/DC".to_string(), "Other".to_string()]);
        let value = normalize_raw_value(UnifiedMetadataKey::ArtistsNames, &raw).unwrap();
        assert_eq!(value, MetadataValue::List(vec!["AC/DC".to_string(), "Other".to_string()]));
    }

    #[test]
    fn test_text_splits_for_list_keys() {
        let raw = RawValue::Text("One // Two".to_string());
        let value = normalize_raw_value(UnifiedMetadataKey::ArtistsNames, &raw).unwrap();
        assert_eq!(value, MetadataValue::List(vec!["One".to_string(), "Two".to_string()]));
    }

    #[test]
    fn test_single_valued_key_takes_first_entry() {
        let raw = RawValue::Entries(vec![" ".to_string(), "Main Title".to_string(), "Alt Title".to_string()]);
        let value = normalize_raw_value(UnifiedMetadataKey::Title, &raw).unwrap();
        assert_eq!(value, MetadataValue::Text("Main Title".to_string()));
    }

    #[test]
    fn test_genre_code_resolution() {
        let value = normalize_raw_value(UnifiedMetadataKey::Genre, &RawValue::GenreCode(17)).unwrap();
        assert_eq!(value, MetadataValue::Text("Rock".to_string()));
        assert_eq!(normalize_raw_value(UnifiedMetadataKey::Genre, &RawValue::GenreCode(255)), None);
    }

    #[test]
    fn test_genre_reference_resolution() {
        let value = normalize_raw_value(UnifiedMetadataKey::Genre, &RawValue::Text("(17)".to_string())).unwrap();
        assert_eq!(value, MetadataValue::Text("Rock".to_string()));
        let value = normalize_raw_value(UnifiedMetadataKey::Genre, &RawValue::Text("Shoegaze".to_string())).unwrap();
        assert_eq!(value, MetadataValue::Text("Shoegaze".to_string()));
    }

    #[test]
    fn test_integer_parsing() {
        let value = normalize_raw_value(UnifiedMetadataKey::Bpm, &RawValue::Text(" 128 ".to_string())).unwrap();
        assert_eq!(value, MetadataValue::Integer(128));
        assert_eq!(normalize_raw_value(UnifiedMetadataKey::Bpm, &RawValue::Text("fast".to_string())), None);
    }

    #[test]
    fn test_boolean_parsing() {
        let truthy = normalize_raw_value(UnifiedMetadataKey::Compilation, &RawValue::Text("1".to_string())).unwrap();
        assert_eq!(truthy, MetadataValue::Boolean(true));
        let falsy = normalize_raw_value(UnifiedMetadataKey::Compilation, &RawValue::Text("False".to_string())).unwrap();
        assert_eq!(falsy, MetadataValue::Boolean(false));
        assert_eq!(normalize_raw_value(UnifiedMetadataKey::Compilation, &RawValue::Text("maybe".to_string())), None);
    }

    #[test]
    fn test_blank_values_are_absent() {
        assert_eq!(normalize_raw_value(UnifiedMetadataKey::Title, &RawValue::Text("   ".to_string())), None);
        assert_eq!(normalize_raw_value(UnifiedMetadataKey::ArtistsNames, &RawValue::Entries(vec![])), None);
    }

    #[test]
    fn test_denormalize_list_styles() {
        let value = MetadataValue::List(vec!["One".to_string(), "Two".to_string()]);
        let joined = denormalize_value(UnifiedMetadataKey::ArtistsNames, &value, MultiValueStyle::Joined).unwrap();
        assert_eq!(joined, RawValue::Text("One;Two".to_string()));
        let repeated = denormalize_value(UnifiedMetadataKey::ArtistsNames, &value, MultiValueStyle::Repeated).unwrap();
        assert_eq!(repeated, RawValue::Entries(vec!["One".to_string(), "Two".to_string()]));
    }

    #[test]
    fn test_denormalize_scalars() {
        let raw = denormalize_value(UnifiedMetadataKey::TrackNumber, &MetadataValue::Integer(7), MultiValueStyle::Joined).unwrap();
        assert_eq!(raw, RawValue::Text("7".to_string()));
        let raw = denormalize_value(UnifiedMetadataKey::Compilation, &MetadataValue::Boolean(true), MultiValueStyle::Joined).unwrap();
        assert_eq!(raw, RawValue::Text("1".to_string()));
    }

    #[test]
    fn test_denormalize_rejects_type_mismatch() {
        let err = denormalize_value(UnifiedMetadataKey::Title, &MetadataValue::Integer(1), MultiValueStyle::Joined).unwrap_err();
        assert!(matches!(err, UnitagError::InvalidValue { key: UnifiedMetadataKey::Title, .. }));
    }
}
