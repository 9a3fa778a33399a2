/// ID3v1 is the 128-byte block at the end of an MP3: seven fixed-width fields and nothing
/// else. lofty materializes it as a generic tag with the genre byte already resolved to its
/// table name; this adapter narrows the generic tag to the fields the block can physically
/// hold and applies the classic width limits on write so a caller sees a predictable cut
/// instead of whatever the serializer silently drops.
use std::path::Path;

use lofty::prelude::{TagExt, TaggedFileExt};
use lofty::tag::{ItemKey, ItemValue, TagItem};
use tracing::{debug, warn};

use crate::adapters::{self, FormatAdapter, RawFieldMap, RawFieldUpdates, RawValue, WriteContext};
use crate::errors::Result;
use crate::formats::MetadataFormat;
use crate::keys::UnifiedMetadataKey;

/// Classic field widths, counted in characters. lofty re-encodes to Latin-1 when it
/// serializes the block.
const TEXT_WIDTH: usize = 30;
const YEAR_WIDTH: usize = 4;

pub struct Id3v1Adapter;

fn item_key(key: UnifiedMetadataKey) -> Option<ItemKey> {
    match key {
        UnifiedMetadataKey::Title => Some(ItemKey::TrackTitle),
        UnifiedMetadataKey::ArtistsNames => Some(ItemKey::TrackArtist),
        UnifiedMetadataKey::AlbumName => Some(ItemKey::AlbumTitle),
        UnifiedMetadataKey::ReleaseDate => Some(ItemKey::Year),
        UnifiedMetadataKey::Comment => Some(ItemKey::Comment),
        UnifiedMetadataKey::TrackNumber => Some(ItemKey::TrackNumber),
        UnifiedMetadataKey::Genre => Some(ItemKey::Genre),
        _ => None,
    }
}

fn unified_key(key: &ItemKey) -> Option<UnifiedMetadataKey> {
    match key {
        ItemKey::TrackTitle => Some(UnifiedMetadataKey::Title),
        ItemKey::TrackArtist => Some(UnifiedMetadataKey::ArtistsNames),
        ItemKey::AlbumTitle => Some(UnifiedMetadataKey::AlbumName),
        ItemKey::Year => Some(UnifiedMetadataKey::ReleaseDate),
        ItemKey::Comment => Some(UnifiedMetadataKey::Comment),
        ItemKey::TrackNumber => Some(UnifiedMetadataKey::TrackNumber),
        ItemKey::Genre => Some(UnifiedMetadataKey::Genre),
        _ => None,
    }
}

fn fit_to_width(key: UnifiedMetadataKey, value: &str) -> String {
    let width = match key {
        UnifiedMetadataKey::ReleaseDate => YEAR_WIDTH,
        UnifiedMetadataKey::TrackNumber | UnifiedMetadataKey::Genre => return value.to_string(),
        _ => TEXT_WIDTH,
    };
    if value.chars().count() <= width {
        return value.to_string();
    }
    debug!("truncating ID3v1 {:?} to {} characters", key, width);
    value.chars().take(width).collect()
}

impl FormatAdapter for Id3v1Adapter {
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Id3v1
    }

    fn supports(&self, key: UnifiedMetadataKey) -> bool {
        item_key(key).is_some()
    }

    fn get_all(&self, path: &Path) -> Result<RawFieldMap> {
        let tagged_file = adapters::read_tagged_file(path)?;
        let mut fields = RawFieldMap::new();
        let tag = match tagged_file.tag(adapters::tag_type(MetadataFormat::Id3v1)) {
            Some(tag) => tag,
            None => return Ok(fields),
        };
        for item in tag.items() {
            if let Some(key) = unified_key(item.key()) {
                if let Some(text) = item.value().text() {
                    fields.entry(key).or_insert_with(|| RawValue::Text(text.to_string()));
                }
            }
        }
        Ok(fields)
    }

    fn set_all(&self, path: &Path, updates: &RawFieldUpdates, ctx: &WriteContext) -> Result<()> {
        let mut tagged_file = adapters::read_tagged_file(path)?;
        let tag = adapters::tag_for_update(&mut tagged_file, MetadataFormat::Id3v1)?;
        for (key, update) in updates {
            let native_key = match item_key(*key) {
                Some(native_key) => native_key,
                None => {
                    debug!("ID3v1 has no field for {:?}, skipping", key);
                    continue;
                }
            };
            match update {
                Some(RawValue::Text(text)) => {
                    tag.insert(TagItem::new(native_key, ItemValue::Text(fit_to_width(*key, text))));
                }
                Some(other) => {
                    warn!("ID3v1 cannot store a {} value for {:?}, skipping", other.kind_name(), key);
                }
                None => {
                    tag.retain(|item| item.key() != &native_key);
                }
            }
        }
        tag.save_to_path(path, adapters::lofty_write_options(ctx))?;
        Ok(())
    }

    fn delete_all(&self, path: &Path) -> Result<bool> {
        adapters::remove_tag_block(path, MetadataFormat::Id3v1)
    }

    fn has_metadata(&self, path: &Path) -> Result<bool> {
        adapters::has_tag_block(path, MetadataFormat::Id3v1)
    }
}
