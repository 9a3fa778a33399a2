/// RIFF INFO is the LIST/INFO chunk inside a WAV container: a flat set of FourCC text
/// chunks, one value each, no repeats and no binary payloads. Seventeen unified keys have a
/// chunk; everything else is unsupported. The IRTD rating chunk carries a bare number, and
/// the ICRD creation-date chunk carries the release date. Writing an empty value removes
/// the chunk, since an empty INFO chunk and an absent one are indistinguishable to readers.
use std::path::Path;

use lofty::prelude::{TagExt, TaggedFileExt};
use lofty::tag::{ItemKey, ItemValue, TagItem};
use tracing::{debug, warn};

use crate::adapters::{self, FormatAdapter, RawFieldMap, RawFieldUpdates, RawValue, WriteContext};
use crate::errors::Result;
use crate::formats::MetadataFormat;
use crate::keys::UnifiedMetadataKey;
use crate::normalize::MULTI_VALUE_JOINER;

pub struct RiffAdapter;

fn item_key(key: UnifiedMetadataKey) -> Option<ItemKey> {
    match key {
        UnifiedMetadataKey::Title => Some(ItemKey::TrackTitle),
        UnifiedMetadataKey::ArtistsNames => Some(ItemKey::TrackArtist),
        UnifiedMetadataKey::AlbumName => Some(ItemKey::AlbumTitle),
        UnifiedMetadataKey::Genre => Some(ItemKey::Genre),
        UnifiedMetadataKey::Comment => Some(ItemKey::Comment),
        UnifiedMetadataKey::TrackNumber => Some(ItemKey::TrackNumber),
        UnifiedMetadataKey::TrackTotal => Some(ItemKey::TrackTotal),
        UnifiedMetadataKey::ReleaseDate => Some(ItemKey::RecordingDate),
        UnifiedMetadataKey::Writer => Some(ItemKey::Writer),
        UnifiedMetadataKey::Composer => Some(ItemKey::Composer),
        UnifiedMetadataKey::Producer => Some(ItemKey::Producer),
        UnifiedMetadataKey::Copyright => Some(ItemKey::CopyrightMessage),
        UnifiedMetadataKey::Language => Some(ItemKey::Language),
        UnifiedMetadataKey::EncodedBy => Some(ItemKey::EncodedBy),
        UnifiedMetadataKey::EncoderSoftware => Some(ItemKey::EncoderSoftware),
        UnifiedMetadataKey::MediaType => Some(ItemKey::OriginalMediaType),
        _ => None,
    }
}

fn unified_key(key: &ItemKey) -> Option<UnifiedMetadataKey> {
    match key {
        ItemKey::TrackTitle => Some(UnifiedMetadataKey::Title),
        ItemKey::TrackArtist => Some(UnifiedMetadataKey::ArtistsNames),
        ItemKey::AlbumTitle => Some(UnifiedMetadataKey::AlbumName),
        ItemKey::Genre => Some(UnifiedMetadataKey::Genre),
        ItemKey::Comment => Some(UnifiedMetadataKey::Comment),
        ItemKey::TrackNumber => Some(UnifiedMetadataKey::TrackNumber),
        ItemKey::TrackTotal => Some(UnifiedMetadataKey::TrackTotal),
        ItemKey::RecordingDate => Some(UnifiedMetadataKey::ReleaseDate),
        ItemKey::Writer => Some(UnifiedMetadataKey::Writer),
        ItemKey::Composer => Some(UnifiedMetadataKey::Composer),
        ItemKey::Producer => Some(UnifiedMetadataKey::Producer),
        ItemKey::CopyrightMessage => Some(UnifiedMetadataKey::Copyright),
        ItemKey::Language => Some(UnifiedMetadataKey::Language),
        ItemKey::EncodedBy => Some(UnifiedMetadataKey::EncodedBy),
        ItemKey::EncoderSoftware => Some(UnifiedMetadataKey::EncoderSoftware),
        ItemKey::OriginalMediaType => Some(UnifiedMetadataKey::MediaType),
        _ => None,
    }
}

impl FormatAdapter for RiffAdapter {
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Riff
    }

    fn supports(&self, key: UnifiedMetadataKey) -> bool {
        key == UnifiedMetadataKey::Rating || item_key(key).is_some()
    }

    fn get_all(&self, path: &Path) -> Result<RawFieldMap> {
        let tagged_file = adapters::read_tagged_file(path)?;
        let mut fields = RawFieldMap::new();
        let tag = match tagged_file.tag(adapters::tag_type(MetadataFormat::Riff)) {
            Some(tag) => tag,
            None => return Ok(fields),
        };
        for item in tag.items() {
            if item.key() == &ItemKey::Popularimeter {
                if let Some(text) = item.value().text() {
                    if let Ok(rating) = text.trim().parse::<u32>() {
                        fields.entry(UnifiedMetadataKey::Rating).or_insert(RawValue::Rating(rating));
                    } else {
                        warn!("ignoring non-numeric IRTD chunk: {:?}", text);
                    }
                }
                continue;
            }
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
        let tag = adapters::tag_for_update(&mut tagged_file, MetadataFormat::Riff)?;
        for (key, update) in updates {
            if *key == UnifiedMetadataKey::Rating {
                match update {
                    Some(RawValue::Rating(rating)) => {
                        tag.insert(TagItem::new(ItemKey::Popularimeter, ItemValue::Text(rating.to_string())));
                    }
                    Some(other) => warn!("RIFF INFO rating takes a native rating value, not {}, skipping", other.kind_name()),
                    None => tag.retain(|item| item.key() != &ItemKey::Popularimeter),
                }
                continue;
            }
            let native_key = match item_key(*key) {
                Some(native_key) => native_key,
                None => {
                    debug!("RIFF INFO has no chunk for {:?}, skipping", key);
                    continue;
                }
            };
            match update {
                Some(RawValue::Text(text)) if text.is_empty() => {
                    tag.retain(|item| item.key() != &native_key);
                }
                Some(RawValue::Text(text)) => {
                    tag.insert(TagItem::new(native_key, ItemValue::Text(text.clone())));
                }
                Some(RawValue::Entries(entries)) => {
                    // Chunks are unique per FourCC, so discrete entries collapse to one value.
                    tag.insert(TagItem::new(native_key, ItemValue::Text(entries.join(MULTI_VALUE_JOINER))));
                }
                Some(other) => {
                    warn!("RIFF INFO cannot store a {} value for {:?}, skipping", other.kind_name(), key);
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
        adapters::remove_tag_block(path, MetadataFormat::Riff)
    }

    fn has_metadata(&self, path: &Path) -> Result<bool> {
        adapters::has_tag_block(path, MetadataFormat::Riff)
    }
}
