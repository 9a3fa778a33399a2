/// ID3v2 is the frame-based block at the front of an MP3 and the secondary block lofty
/// exposes inside WAV and FLAC containers. Most unified keys map one-to-one onto text
/// frames; the exceptions are the POPM rating frame, which travels through the generic tag
/// as an opaque blob, and cover art, which lives in the tag's picture list.
///
/// Two frames are deliberately not writable through this adapter: TEXT serves both "writer"
/// and "lyricist" in the generic mapping and is owned by the lyricist key here, and TSSE
/// serves both "encoder software" and "encoder settings" and is owned by the software key.
/// The involved-people frames (TIPL/TMCL) have no per-person unified keys, so arranger,
/// engineer, producer and performer are unsupported as well.
use std::path::Path;

use lofty::prelude::{TagExt, TaggedFileExt};
use lofty::tag::{ItemKey, ItemValue, TagItem};
use tracing::{debug, warn};

use crate::adapters::{self, FormatAdapter, RawFieldMap, RawFieldUpdates, RawValue, WriteContext};
use crate::errors::Result;
use crate::formats::MetadataFormat;
use crate::keys::UnifiedMetadataKey;

pub struct Id3v2Adapter;

fn item_key(key: UnifiedMetadataKey) -> Option<ItemKey> {
    match key {
        UnifiedMetadataKey::Title => Some(ItemKey::TrackTitle),
        UnifiedMetadataKey::ArtistsNames => Some(ItemKey::TrackArtist),
        UnifiedMetadataKey::AlbumName => Some(ItemKey::AlbumTitle),
        UnifiedMetadataKey::AlbumArtistsNames => Some(ItemKey::AlbumArtist),
        UnifiedMetadataKey::Genre => Some(ItemKey::Genre),
        UnifiedMetadataKey::Comment => Some(ItemKey::Comment),
        UnifiedMetadataKey::TrackNumber => Some(ItemKey::TrackNumber),
        UnifiedMetadataKey::TrackTotal => Some(ItemKey::TrackTotal),
        UnifiedMetadataKey::DiscNumber => Some(ItemKey::DiscNumber),
        UnifiedMetadataKey::DiscTotal => Some(ItemKey::DiscTotal),
        UnifiedMetadataKey::ReleaseDate => Some(ItemKey::ReleaseDate),
        UnifiedMetadataKey::OriginalReleaseDate => Some(ItemKey::OriginalReleaseDate),
        UnifiedMetadataKey::RecordingDate => Some(ItemKey::RecordingDate),
        UnifiedMetadataKey::Bpm => Some(ItemKey::IntegerBpm),
        UnifiedMetadataKey::Composer => Some(ItemKey::Composer),
        UnifiedMetadataKey::Conductor => Some(ItemKey::Conductor),
        UnifiedMetadataKey::Lyricist => Some(ItemKey::Lyricist),
        UnifiedMetadataKey::Publisher => Some(ItemKey::Publisher),
        UnifiedMetadataKey::Copyright => Some(ItemKey::CopyrightMessage),
        UnifiedMetadataKey::Lyrics => Some(ItemKey::Lyrics),
        UnifiedMetadataKey::Language => Some(ItemKey::Language),
        UnifiedMetadataKey::Isrc => Some(ItemKey::Isrc),
        UnifiedMetadataKey::Barcode => Some(ItemKey::Barcode),
        UnifiedMetadataKey::CatalogNumber => Some(ItemKey::CatalogNumber),
        UnifiedMetadataKey::EncodedBy => Some(ItemKey::EncodedBy),
        UnifiedMetadataKey::EncoderSoftware => Some(ItemKey::EncoderSoftware),
        UnifiedMetadataKey::Grouping => Some(ItemKey::ContentGroup),
        UnifiedMetadataKey::TrackSubtitle => Some(ItemKey::TrackSubtitle),
        UnifiedMetadataKey::DiscSubtitle => Some(ItemKey::SetSubtitle),
        UnifiedMetadataKey::Mood => Some(ItemKey::Mood),
        UnifiedMetadataKey::InitialKey => Some(ItemKey::InitialKey),
        UnifiedMetadataKey::Remixer => Some(ItemKey::Remixer),
        UnifiedMetadataKey::OriginalArtist => Some(ItemKey::OriginalArtist),
        UnifiedMetadataKey::OriginalAlbumName => Some(ItemKey::OriginalAlbumTitle),
        UnifiedMetadataKey::Compilation => Some(ItemKey::FlagCompilation),
        UnifiedMetadataKey::TitleSortOrder => Some(ItemKey::TrackTitleSortOrder),
        UnifiedMetadataKey::AlbumSortOrder => Some(ItemKey::AlbumTitleSortOrder),
        UnifiedMetadataKey::ArtistSortOrder => Some(ItemKey::TrackArtistSortOrder),
        UnifiedMetadataKey::MediaType => Some(ItemKey::OriginalMediaType),
        _ => None,
    }
}

fn unified_key(key: &ItemKey) -> Option<UnifiedMetadataKey> {
    match key {
        ItemKey::TrackTitle => Some(UnifiedMetadataKey::Title),
        ItemKey::TrackArtist => Some(UnifiedMetadataKey::ArtistsNames),
        ItemKey::AlbumTitle => Some(UnifiedMetadataKey::AlbumName),
        ItemKey::AlbumArtist => Some(UnifiedMetadataKey::AlbumArtistsNames),
        ItemKey::Genre => Some(UnifiedMetadataKey::Genre),
        ItemKey::Comment => Some(UnifiedMetadataKey::Comment),
        ItemKey::TrackNumber => Some(UnifiedMetadataKey::TrackNumber),
        ItemKey::TrackTotal => Some(UnifiedMetadataKey::TrackTotal),
        ItemKey::DiscNumber => Some(UnifiedMetadataKey::DiscNumber),
        ItemKey::DiscTotal => Some(UnifiedMetadataKey::DiscTotal),
        ItemKey::ReleaseDate => Some(UnifiedMetadataKey::ReleaseDate),
        ItemKey::OriginalReleaseDate => Some(UnifiedMetadataKey::OriginalReleaseDate),
        ItemKey::RecordingDate => Some(UnifiedMetadataKey::RecordingDate),
        ItemKey::IntegerBpm => Some(UnifiedMetadataKey::Bpm),
        ItemKey::Composer => Some(UnifiedMetadataKey::Composer),
        ItemKey::Conductor => Some(UnifiedMetadataKey::Conductor),
        ItemKey::Lyricist => Some(UnifiedMetadataKey::Lyricist),
        // A TEXT frame maps to the writer item first; it carries lyricist content here.
        ItemKey::Writer => Some(UnifiedMetadataKey::Lyricist),
        ItemKey::Publisher => Some(UnifiedMetadataKey::Publisher),
        ItemKey::CopyrightMessage => Some(UnifiedMetadataKey::Copyright),
        ItemKey::Lyrics => Some(UnifiedMetadataKey::Lyrics),
        ItemKey::Language => Some(UnifiedMetadataKey::Language),
        ItemKey::Isrc => Some(UnifiedMetadataKey::Isrc),
        ItemKey::Barcode => Some(UnifiedMetadataKey::Barcode),
        ItemKey::CatalogNumber => Some(UnifiedMetadataKey::CatalogNumber),
        ItemKey::EncodedBy => Some(UnifiedMetadataKey::EncodedBy),
        ItemKey::EncoderSoftware => Some(UnifiedMetadataKey::EncoderSoftware),
        ItemKey::ContentGroup => Some(UnifiedMetadataKey::Grouping),
        ItemKey::TrackSubtitle => Some(UnifiedMetadataKey::TrackSubtitle),
        ItemKey::SetSubtitle => Some(UnifiedMetadataKey::DiscSubtitle),
        ItemKey::Mood => Some(UnifiedMetadataKey::Mood),
        ItemKey::InitialKey => Some(UnifiedMetadataKey::InitialKey),
        ItemKey::Remixer => Some(UnifiedMetadataKey::Remixer),
        ItemKey::OriginalArtist => Some(UnifiedMetadataKey::OriginalArtist),
        ItemKey::OriginalAlbumTitle => Some(UnifiedMetadataKey::OriginalAlbumName),
        ItemKey::FlagCompilation => Some(UnifiedMetadataKey::Compilation),
        ItemKey::TrackTitleSortOrder => Some(UnifiedMetadataKey::TitleSortOrder),
        ItemKey::AlbumTitleSortOrder => Some(UnifiedMetadataKey::AlbumSortOrder),
        ItemKey::TrackArtistSortOrder => Some(UnifiedMetadataKey::ArtistSortOrder),
        ItemKey::OriginalMediaType => Some(UnifiedMetadataKey::MediaType),
        _ => None,
    }
}

/// POPM lays out an email, a NUL, the rating byte, and a four-byte play counter. We write an
/// anonymous frame with a zeroed counter.
fn popm_bytes(rating: u32) -> Vec<u8> {
    vec![0, rating.min(255) as u8, 0, 0, 0, 0]
}

fn popm_rating(value: &ItemValue) -> Option<u32> {
    match value {
        ItemValue::Binary(blob) => {
            let nul = blob.iter().position(|b| *b == 0)?;
            blob.get(nul + 1).map(|b| u32::from(*b))
        }
        // Some taggers store the bare rating number as text.
        ItemValue::Text(text) => text.trim().parse::<u32>().ok(),
        _ => None,
    }
}

impl FormatAdapter for Id3v2Adapter {
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Id3v2
    }

    fn supports(&self, key: UnifiedMetadataKey) -> bool {
        matches!(key, UnifiedMetadataKey::Rating | UnifiedMetadataKey::CoverArt) || item_key(key).is_some()
    }

    fn get_all(&self, path: &Path) -> Result<RawFieldMap> {
        let tagged_file = adapters::read_tagged_file(path)?;
        let mut fields = RawFieldMap::new();
        let tag = match tagged_file.tag(adapters::tag_type(MetadataFormat::Id3v2)) {
            Some(tag) => tag,
            None => return Ok(fields),
        };
        for item in tag.items() {
            if item.key() == &ItemKey::Popularimeter {
                if let Some(rating) = popm_rating(item.value()) {
                    fields.entry(UnifiedMetadataKey::Rating).or_insert(RawValue::Rating(rating));
                }
                continue;
            }
            if let Some(key) = unified_key(item.key()) {
                if let Some(text) = item.value().text() {
                    adapters::accumulate_text(&mut fields, key, text);
                }
            }
        }
        if let Some(cover) = adapters::front_cover(tag) {
            fields.insert(UnifiedMetadataKey::CoverArt, cover);
        }
        Ok(fields)
    }

    fn set_all(&self, path: &Path, updates: &RawFieldUpdates, ctx: &WriteContext) -> Result<()> {
        let mut tagged_file = adapters::read_tagged_file(path)?;
        let tag = adapters::tag_for_update(&mut tagged_file, MetadataFormat::Id3v2)?;
        for (key, update) in updates {
            match key {
                UnifiedMetadataKey::CoverArt => match update {
                    Some(RawValue::Binary(data)) => adapters::set_front_cover(tag, data),
                    Some(other) => warn!("ID3v2 cover art takes a binary value, not {}, skipping", other.kind_name()),
                    None => adapters::remove_front_cover(tag),
                },
                UnifiedMetadataKey::Rating => match update {
                    Some(RawValue::Rating(rating)) => {
                        tag.insert(TagItem::new(ItemKey::Popularimeter, ItemValue::Binary(popm_bytes(*rating))));
                    }
                    Some(other) => warn!("ID3v2 rating takes a native rating value, not {}, skipping", other.kind_name()),
                    None => tag.retain(|item| item.key() != &ItemKey::Popularimeter),
                },
                _ => {
                    let native_key = match item_key(*key) {
                        Some(native_key) => native_key,
                        None => {
                            debug!("ID3v2 has no frame for {:?}, skipping", key);
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
                            tag.retain(|item| item.key() != &native_key);
                            for entry in entries {
                                tag.push(TagItem::new(native_key.clone(), ItemValue::Text(entry.clone())));
                            }
                        }
                        Some(other) => {
                            warn!("ID3v2 cannot store a {} value for {:?}, skipping", other.kind_name(), key);
                        }
                        None => {
                            tag.retain(|item| item.key() != &native_key);
                        }
                    }
                }
            }
        }
        tag.save_to_path(path, adapters::lofty_write_options(ctx))?;
        Ok(())
    }

    fn delete_all(&self, path: &Path) -> Result<bool> {
        adapters::remove_tag_block(path, MetadataFormat::Id3v2)
    }

    fn has_metadata(&self, path: &Path) -> Result<bool> {
        adapters::has_tag_block(path, MetadataFormat::Id3v2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_mapping_is_bidirectional() {
        for key in Id3v2Adapter.supported_keys() {
            if matches!(key, UnifiedMetadataKey::Rating | UnifiedMetadataKey::CoverArt) {
                continue;
            }
            let native = item_key(key).unwrap();
            assert_eq!(unified_key(&native), Some(key), "round trip through {native:?}");
        }
    }

    #[test]
    fn test_supported_keys() {
        let adapter = Id3v2Adapter;
        assert!(adapter.supports(UnifiedMetadataKey::Rating));
        assert!(adapter.supports(UnifiedMetadataKey::CoverArt));
        assert!(adapter.supports(UnifiedMetadataKey::Lyricist));
        assert!(adapter.supports(UnifiedMetadataKey::RecordingDate));
        assert!(!adapter.supports(UnifiedMetadataKey::Writer));
        assert!(!adapter.supports(UnifiedMetadataKey::EncoderSettings));
        assert!(!adapter.supports(UnifiedMetadataKey::Performer));
        assert!(!adapter.supports(UnifiedMetadataKey::Arranger));
    }

    #[test]
    fn test_writer_frame_reads_as_lyricist() {
        assert_eq!(unified_key(&ItemKey::Writer), Some(UnifiedMetadataKey::Lyricist));
        assert_eq!(unified_key(&ItemKey::Lyricist), Some(UnifiedMetadataKey::Lyricist));
    }

    #[test]
    fn test_popm_blob_layout() {
        let blob = popm_bytes(196);
        assert_eq!(blob, vec![0, 196, 0, 0, 0, 0]);
        assert_eq!(popm_rating(&ItemValue::Binary(blob)), Some(196));
    }

    #[test]
    fn test_popm_parsing_handles_email_prefix() {
        let mut blob = b"user@example.com".to_vec();
        blob.push(0);
        blob.push(128);
        blob.extend_from_slice(&[0, 0, 0, 42]);
        assert_eq!(popm_rating(&ItemValue::Binary(blob)), Some(128));
    }

    #[test]
    fn test_popm_parsing_text_fallback() {
        assert_eq!(popm_rating(&ItemValue::Text(" 64 ".to_string())), Some(64));
        assert_eq!(popm_rating(&ItemValue::Text("loud".to_string())), None);
        assert_eq!(popm_rating(&ItemValue::Binary(vec![])), None);
    }

    #[test]
    fn test_rating_clamps_to_byte_range() {
        assert_eq!(popm_bytes(400)[1], 255);
    }
}
