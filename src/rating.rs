/// The rating module converts ratings between the scales the formats actually store and the
/// caller's chosen normalized scale.
///
/// Two scale families exist in the wild. Proportional scales are plain linear ranges (0-100
/// in Vorbis FMPS ratings and RIFF, 0-255 in some taggers). The ID3v2 POPM byte is usually
/// NOT proportional: popular players write one of a handful of breakpoint values per star
/// count, so 196 means "4 stars", not 77%. Which family a format uses is configuration, with
/// defaults that match the most common taggers.
///
/// A stored value of 0 is an explicit zero rating. Some writers also use 0 to mean "no
/// rating"; the two cases cannot be distinguished from the value alone, so 0 converts to 0
/// and only a missing field converts to absent.
use crate::errors::{Result, UnitagError};
use crate::formats::MetadataFormat;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Native POPM byte values for 0 through 5 stars.
pub const STAR_BREAKPOINTS: [u32; 6] = [0, 1, 64, 128, 196, 255];

/// The reference scale used when a read does not request a normalized maximum.
pub const REFERENCE_RATING_MAX: u32 = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatingScale {
    /// A linear 0..=max range.
    Proportional { max: u32 },
    /// The 0..=255 POPM byte interpreted through [`STAR_BREAKPOINTS`].
    NonProportional255,
}

impl RatingScale {
    pub fn validate(&self) -> Result<()> {
        if let RatingScale::Proportional { max: 0 } = self {
            return Err(UnitagError::Configuration("proportional rating scale must have a nonzero maximum".to_string()));
        }
        Ok(())
    }

    /// Converts a native stored rating to the 0..=target_max normalized scale.
    pub fn to_normalized(&self, native: u32, target_max: u32) -> u32 {
        match self {
            RatingScale::Proportional { max } => {
                let clamped = native.min(*max);
                if clamped < native {
                    debug!("clamping out-of-range native rating {} to {}", native, clamped);
                }
                ((clamped as f64 / *max as f64) * target_max as f64).round() as u32
            }
            RatingScale::NonProportional255 => {
                let stars = nearest_star(native.min(255));
                ((stars as f64 / 5.0) * target_max as f64).round() as u32
            }
        }
    }

    /// Converts a 0..=source_max normalized rating to the native stored scale.
    pub fn from_normalized(&self, normalized: u32, source_max: u32) -> u32 {
        let clamped = normalized.min(source_max);
        if clamped < normalized {
            debug!("clamping out-of-range normalized rating {} to {}", normalized, clamped);
        }
        match self {
            RatingScale::Proportional { max } => ((clamped as f64 / source_max as f64) * *max as f64).round() as u32,
            RatingScale::NonProportional255 => {
                let stars = ((clamped as f64 / source_max as f64) * 5.0).round() as usize;
                STAR_BREAKPOINTS[stars.min(5)]
            }
        }
    }
}

/// The star count whose breakpoint is closest to the stored byte. Ties resolve toward the
/// lower star.
fn nearest_star(native: u32) -> u32 {
    let mut best = 0u32;
    let mut best_distance = u32::MAX;
    for (stars, bp) in STAR_BREAKPOINTS.iter().enumerate() {
        let distance = native.abs_diff(*bp);
        if distance < best_distance {
            best_distance = distance;
            best = stars as u32;
        }
    }
    best
}

/// Which scale each rating-capable format stores natively. ID3v1 has no rating field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingScales {
    pub id3v2: RatingScale,
    pub vorbis: RatingScale,
    pub riff: RatingScale,
}

impl Default for RatingScales {
    fn default() -> Self {
        RatingScales {
            id3v2: RatingScale::NonProportional255,
            vorbis: RatingScale::Proportional { max: 100 },
            riff: RatingScale::Proportional { max: 100 },
        }
    }
}

impl RatingScales {
    pub fn for_format(&self, format: MetadataFormat) -> Option<RatingScale> {
        match format {
            MetadataFormat::Id3v2 => Some(self.id3v2),
            MetadataFormat::Vorbis => Some(self.vorbis),
            MetadataFormat::Riff => Some(self.riff),
            MetadataFormat::Id3v1 => None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.id3v2.validate()?;
        self.vorbis.validate()?;
        self.riff.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_proportional_round_trip_of_three_stars() {
        // 3 stars entered on a 0-5 scale against a proportional 0-255 store.
        let scale = RatingScale::Proportional { max: 255 };
        let native = scale.from_normalized(3, 5);
        assert_eq!(native, 153);
        assert_eq!(scale.to_normalized(native, 100), 60);
        assert_eq!(scale.to_normalized(native, 255), 153);
    }

    #[test]
    fn test_non_proportional_write_uses_breakpoints() {
        let scale = RatingScale::NonProportional255;
        assert_eq!(scale.from_normalized(85, 100), 196);
        assert_eq!(scale.from_normalized(100, 100), 255);
        assert_eq!(scale.from_normalized(1, 5), 1);
        assert_eq!(scale.from_normalized(0, 100), 0);
    }

    #[test]
    fn test_non_proportional_read_snaps_to_nearest_breakpoint() {
        let scale = RatingScale::NonProportional255;
        assert_eq!(scale.to_normalized(196, 100), 80);
        assert_eq!(scale.to_normalized(255, 5), 5);
        assert_eq!(scale.to_normalized(32, 100), 20);
        assert_eq!(scale.to_normalized(33, 100), 40);
        // Equidistant between 64 and 128 resolves to the lower star.
        assert_eq!(scale.to_normalized(96, 100), 40);
    }

    #[test]
    fn test_zero_is_a_rating() {
        assert_eq!(RatingScale::NonProportional255.to_normalized(0, 100), 0);
        assert_eq!(RatingScale::Proportional { max: 100 }.to_normalized(0, 255), 0);
    }

    #[test]
    fn test_out_of_range_values_clamp() {
        assert_eq!(RatingScale::Proportional { max: 100 }.to_normalized(150, 100), 100);
        assert_eq!(RatingScale::Proportional { max: 100 }.from_normalized(300, 100), 100);
        assert_eq!(RatingScale::NonProportional255.from_normalized(9, 5), 255);
    }

    #[test]
    fn test_default_scales_per_format() {
        let scales = RatingScales::default();
        assert_eq!(scales.for_format(MetadataFormat::Id3v2), Some(RatingScale::NonProportional255));
        assert_eq!(scales.for_format(MetadataFormat::Vorbis), Some(RatingScale::Proportional { max: 100 }));
        assert_eq!(scales.for_format(MetadataFormat::Id3v1), None);
    }

    #[test]
    fn test_scale_validation() {
        assert!(RatingScale::Proportional { max: 0 }.validate().is_err());
        assert!(RatingScales::default().validate().is_ok());
    }
}
