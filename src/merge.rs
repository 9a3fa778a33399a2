/// The merge module is the read side of the crate. It reads every metadata block a container
/// carries, normalizes each block into unified keys, and overlays the blocks in the
/// container's precedence order so that the preferred format wins field by field. Reading is
/// tolerant: a field that fails to normalize is dropped with a warning instead of failing
/// the whole read.
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::{self, AdapterRegistry, RawFieldMap, RawValue};
use crate::errors::{Result, UnitagError};
use crate::formats::{FileKind, MetadataFormat};
use crate::keys::{self, MetadataValue, UnifiedMetadata, UnifiedMetadataKey};
use crate::normalize;
use crate::rating::{RatingScales, REFERENCE_RATING_MAX};

/// Read-side options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReadOptions {
    /// The 0..=max scale ratings are reported on. Unset reports ratings on the 0..=255
    /// reference scale.
    pub normalized_rating_max_value: Option<u32>,
    /// The native scale each rating-capable format stores.
    pub rating_scales: RatingScales,
}

impl ReadOptions {
    fn validate(&self) -> Result<()> {
        if self.normalized_rating_max_value == Some(0) {
            return Err(UnitagError::Configuration("normalized rating maximum must be nonzero".to_string()));
        }
        self.rating_scales.validate()
    }

    fn rating_max(&self) -> u32 {
        self.normalized_rating_max_value.unwrap_or(REFERENCE_RATING_MAX)
    }
}

/// Reads all metadata formats present in the file and merges them into one unified map.
/// Precedence follows the container: the native format first, then the legacy blocks.
pub fn get_merged_unified_metadata(path: &Path, options: &ReadOptions) -> Result<UnifiedMetadata> {
    merged_with(adapters::default_registry(), path, options)
}

pub(crate) fn merged_with(registry: &AdapterRegistry, path: &Path, options: &ReadOptions) -> Result<UnifiedMetadata> {
    keys::check_key_table();
    options.validate()?;
    let kind = FileKind::from_path(path)?;
    let mut merged = UnifiedMetadata::new();
    for format in kind.formats() {
        let adapter = registry.get(*format)?;
        let raw = adapter.get_all(path)?;
        for (key, value) in normalize_fields(*format, &raw, options) {
            // formats() lists the preferred format first, so earlier inserts win.
            merged.entry(key).or_insert(value);
        }
    }
    Ok(merged)
}

/// Reads a single unified field, stopping at the first format in precedence order that
/// carries a usable value for it.
pub fn get_unified_metadata_field(path: &Path, key: UnifiedMetadataKey, options: &ReadOptions) -> Result<Option<MetadataValue>> {
    field_with(adapters::default_registry(), path, key, options)
}

pub(crate) fn field_with(registry: &AdapterRegistry, path: &Path, key: UnifiedMetadataKey, options: &ReadOptions) -> Result<Option<MetadataValue>> {
    keys::check_key_table();
    options.validate()?;
    let kind = FileKind::from_path(path)?;
    for format in kind.formats() {
        let adapter = registry.get(*format)?;
        if !adapter.supports(key) {
            continue;
        }
        let raw = adapter.get_all(path)?;
        let value = match raw.get(&key) {
            Some(value) => value,
            None => continue,
        };
        let normalized = if key == UnifiedMetadataKey::Rating {
            normalize_rating(*format, value, options)
        } else {
            normalize::normalize_raw_value(key, value)
        };
        if let Some(normalized) = normalized {
            debug!("resolved {:?} for {} from {}", key, path.display(), format);
            return Ok(Some(normalized));
        }
    }
    Ok(None)
}

/// Reads exactly one format's block as unified metadata, without any merging. The format
/// must be one the container can carry.
pub fn get_single_format_app_metadata(path: &Path, format: MetadataFormat, options: &ReadOptions) -> Result<UnifiedMetadata> {
    single_format_with(adapters::default_registry(), path, format, options)
}

pub(crate) fn single_format_with(
    registry: &AdapterRegistry,
    path: &Path,
    format: MetadataFormat,
    options: &ReadOptions,
) -> Result<UnifiedMetadata> {
    keys::check_key_table();
    options.validate()?;
    let kind = FileKind::from_path(path)?;
    kind.check_format_allowed(format)?;
    let adapter = registry.get(format)?;
    let raw = adapter.get_all(path)?;
    Ok(normalize_fields(format, &raw, options))
}

/// Normalizes one format's raw fields into unified values. Ratings are rescaled onto the
/// caller's normalized scale; every other field goes through the value normalizer.
fn normalize_fields(format: MetadataFormat, raw: &RawFieldMap, options: &ReadOptions) -> UnifiedMetadata {
    let mut unified = UnifiedMetadata::new();
    for (key, value) in raw {
        let normalized = if *key == UnifiedMetadataKey::Rating {
            normalize_rating(format, value, options)
        } else {
            normalize::normalize_raw_value(*key, value)
        };
        if let Some(normalized) = normalized {
            unified.insert(*key, normalized);
        }
    }
    unified
}

fn normalize_rating(format: MetadataFormat, raw: &RawValue, options: &ReadOptions) -> Option<MetadataValue> {
    let native = match raw {
        RawValue::Rating(n) => *n,
        RawValue::Text(s) => match s.trim().parse::<u32>() {
            Ok(n) => n,
            Err(_) => {
                warn!("ignoring unparseable {} rating {:?}", format, s);
                return None;
            }
        },
        other => {
            warn!("ignoring {} rating of kind {}", format, other.kind_name());
            return None;
        }
    };
    let scale = match options.rating_scales.for_format(format) {
        Some(scale) => scale,
        None => {
            warn!("{} has no rating scale, dropping rating", format);
            return None;
        }
    };
    Some(MetadataValue::Integer(i64::from(scale.to_normalized(native, options.rating_max()))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_options_reject_zero_rating_max() {
        let options = ReadOptions { normalized_rating_max_value: Some(0), ..Default::default() };
        assert!(matches!(options.validate(), Err(UnitagError::Configuration(_))));
    }

    #[test]
    fn test_rating_max_defaults_to_reference_scale() {
        assert_eq!(ReadOptions::default().rating_max(), 255);
        let options = ReadOptions { normalized_rating_max_value: Some(5), ..Default::default() };
        assert_eq!(options.rating_max(), 5);
    }

    #[test]
    fn test_normalize_rating_follows_popm_breakpoints() {
        let options = ReadOptions { normalized_rating_max_value: Some(100), ..Default::default() };
        // 196 is the four-star POPM byte under the default non-proportional scale.
        let value = normalize_rating(MetadataFormat::Id3v2, &RawValue::Rating(196), &options);
        assert_eq!(value, Some(MetadataValue::Integer(80)));
    }

    #[test]
    fn test_normalize_rating_rescales_proportional_text() {
        // RIFF stores a bare number on a proportional 0..=100 scale by default.
        let value = normalize_rating(MetadataFormat::Riff, &RawValue::Text("60".to_string()), &ReadOptions::default());
        assert_eq!(value, Some(MetadataValue::Integer(153)));
    }

    #[test]
    fn test_normalize_rating_drops_garbage_and_scaleless_formats() {
        let options = ReadOptions::default();
        assert_eq!(normalize_rating(MetadataFormat::Riff, &RawValue::Text("loud".to_string()), &options), None);
        assert_eq!(normalize_rating(MetadataFormat::Id3v1, &RawValue::Rating(10), &options), None);
    }

    #[test]
    fn test_normalize_fields_drops_corrupt_values_quietly() {
        let mut raw = RawFieldMap::new();
        raw.insert(UnifiedMetadataKey::Title, RawValue::Text("Weightless".to_string()));
        raw.insert(UnifiedMetadataKey::TrackNumber, RawValue::Text("three".to_string()));
        let unified = normalize_fields(MetadataFormat::Vorbis, &raw, &ReadOptions::default());
        assert_eq!(unified.get(&UnifiedMetadataKey::Title), Some(&MetadataValue::Text("Weightless".to_string())));
        assert!(!unified.contains_key(&UnifiedMetadataKey::TrackNumber));
    }
}
