pub mod adapters;
pub mod errors;
pub mod formats;
pub mod genres;
pub mod keys;
pub mod merge;
pub mod normalize;
pub mod properties;
pub mod rating;
pub mod strategy;

pub use errors::{Result, UnitagError};
pub use formats::{FileKind, Id3v2Revision, MetadataFormat, MetadataWritingStrategy};
pub use keys::{MetadataValue, UnifiedMetadata, UnifiedMetadataKey, ValueKind};
pub use merge::{get_merged_unified_metadata, get_single_format_app_metadata, get_unified_metadata_field, ReadOptions};
pub use properties::{get_bitrate, get_duration_in_sec};
pub use rating::{RatingScale, RatingScales};
pub use strategy::{delete_all_metadata, delete_metadata, update_file_metadata, MetadataChanges, WriteOptions};

#[cfg(test)]
mod testing;
