/// Vorbis comments are free-form KEY=value pairs, repeated keys included, which makes this
/// the roomiest of the four formats: nearly every unified key has a conventional comment
/// name. Multi-valued fields are written as repeated entries rather than a joined string,
/// the rating travels as a bare number under RATING, and FLAC pictures surface through the
/// same tag.
///
/// The DATE comment carries the release date here, with old-style YEAR comments honored on
/// read when no DATE is present. There is no separate recording-date comment in common use,
/// so the unified recording-date key is ID3v2-only, and the original artist and original
/// album keys have no Vorbis convention either.
use std::path::Path;

use lofty::prelude::{TagExt, TaggedFileExt};
use lofty::tag::{ItemKey, ItemValue, TagItem};
use tracing::{debug, warn};

use crate::adapters::{self, FormatAdapter, RawFieldMap, RawFieldUpdates, RawValue, WriteContext};
use crate::errors::Result;
use crate::formats::MetadataFormat;
use crate::keys::UnifiedMetadataKey;

pub struct VorbisAdapter;

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
        UnifiedMetadataKey::ReleaseDate => Some(ItemKey::RecordingDate),
        UnifiedMetadataKey::OriginalReleaseDate => Some(ItemKey::OriginalReleaseDate),
        UnifiedMetadataKey::Bpm => Some(ItemKey::Bpm),
        UnifiedMetadataKey::Composer => Some(ItemKey::Composer),
        UnifiedMetadataKey::Conductor => Some(ItemKey::Conductor),
        UnifiedMetadataKey::Lyricist => Some(ItemKey::Lyricist),
        UnifiedMetadataKey::Writer => Some(ItemKey::Writer),
        UnifiedMetadataKey::Publisher => Some(ItemKey::Publisher),
        UnifiedMetadataKey::Copyright => Some(ItemKey::CopyrightMessage),
        UnifiedMetadataKey::Lyrics => Some(ItemKey::Lyrics),
        UnifiedMetadataKey::Language => Some(ItemKey::Language),
        UnifiedMetadataKey::Isrc => Some(ItemKey::Isrc),
        UnifiedMetadataKey::Barcode => Some(ItemKey::Barcode),
        UnifiedMetadataKey::CatalogNumber => Some(ItemKey::CatalogNumber),
        UnifiedMetadataKey::EncodedBy => Some(ItemKey::EncodedBy),
        UnifiedMetadataKey::EncoderSoftware => Some(ItemKey::EncoderSoftware),
        UnifiedMetadataKey::EncoderSettings => Some(ItemKey::EncoderSettings),
        UnifiedMetadataKey::Grouping => Some(ItemKey::ContentGroup),
        UnifiedMetadataKey::TrackSubtitle => Some(ItemKey::TrackSubtitle),
        UnifiedMetadataKey::DiscSubtitle => Some(ItemKey::SetSubtitle),
        UnifiedMetadataKey::Mood => Some(ItemKey::Mood),
        UnifiedMetadataKey::InitialKey => Some(ItemKey::InitialKey),
        UnifiedMetadataKey::Remixer => Some(ItemKey::Remixer),
        UnifiedMetadataKey::Arranger => Some(ItemKey::Arranger),
        UnifiedMetadataKey::Engineer => Some(ItemKey::Engineer),
        UnifiedMetadataKey::Producer => Some(ItemKey::Producer),
        UnifiedMetadataKey::Performer => Some(ItemKey::Performer),
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
        ItemKey::RecordingDate => Some(UnifiedMetadataKey::ReleaseDate),
        ItemKey::OriginalReleaseDate => Some(UnifiedMetadataKey::OriginalReleaseDate),
        ItemKey::Bpm => Some(UnifiedMetadataKey::Bpm),
        ItemKey::Composer => Some(UnifiedMetadataKey::Composer),
        ItemKey::Conductor => Some(UnifiedMetadataKey::Conductor),
        ItemKey::Lyricist => Some(UnifiedMetadataKey::Lyricist),
        ItemKey::Writer => Some(UnifiedMetadataKey::Writer),
        ItemKey::Publisher => Some(UnifiedMetadataKey::Publisher),
        ItemKey::CopyrightMessage => Some(UnifiedMetadataKey::Copyright),
        ItemKey::Lyrics => Some(UnifiedMetadataKey::Lyrics),
        ItemKey::Language => Some(UnifiedMetadataKey::Language),
        ItemKey::Isrc => Some(UnifiedMetadataKey::Isrc),
        ItemKey::Barcode => Some(UnifiedMetadataKey::Barcode),
        ItemKey::CatalogNumber => Some(UnifiedMetadataKey::CatalogNumber),
        ItemKey::EncodedBy => Some(UnifiedMetadataKey::EncodedBy),
        ItemKey::EncoderSoftware => Some(UnifiedMetadataKey::EncoderSoftware),
        ItemKey::EncoderSettings => Some(UnifiedMetadataKey::EncoderSettings),
        ItemKey::ContentGroup => Some(UnifiedMetadataKey::Grouping),
        ItemKey::TrackSubtitle => Some(UnifiedMetadataKey::TrackSubtitle),
        ItemKey::SetSubtitle => Some(UnifiedMetadataKey::DiscSubtitle),
        ItemKey::Mood => Some(UnifiedMetadataKey::Mood),
        ItemKey::InitialKey => Some(UnifiedMetadataKey::InitialKey),
        ItemKey::Remixer => Some(UnifiedMetadataKey::Remixer),
        ItemKey::Arranger => Some(UnifiedMetadataKey::Arranger),
        ItemKey::Engineer => Some(UnifiedMetadataKey::Engineer),
        ItemKey::Producer => Some(UnifiedMetadataKey::Producer),
        ItemKey::Performer => Some(UnifiedMetadataKey::Performer),
        ItemKey::FlagCompilation => Some(UnifiedMetadataKey::Compilation),
        ItemKey::TrackTitleSortOrder => Some(UnifiedMetadataKey::TitleSortOrder),
        ItemKey::AlbumTitleSortOrder => Some(UnifiedMetadataKey::AlbumSortOrder),
        ItemKey::TrackArtistSortOrder => Some(UnifiedMetadataKey::ArtistSortOrder),
        ItemKey::OriginalMediaType => Some(UnifiedMetadataKey::MediaType),
        _ => None,
    }
}

impl FormatAdapter for VorbisAdapter {
    fn format(&self) -> MetadataFormat {
        MetadataFormat::Vorbis
    }

    fn supports(&self, key: UnifiedMetadataKey) -> bool {
        matches!(key, UnifiedMetadataKey::Rating | UnifiedMetadataKey::CoverArt) || item_key(key).is_some()
    }

    fn get_all(&self, path: &Path) -> Result<RawFieldMap> {
        let tagged_file = adapters::read_tagged_file(path)?;
        let mut fields = RawFieldMap::new();
        let tag = match tagged_file.tag(adapters::tag_type(MetadataFormat::Vorbis)) {
            Some(tag) => tag,
            None => return Ok(fields),
        };
        let mut legacy_year: Option<String> = None;
        for item in tag.items() {
            if item.key() == &ItemKey::Popularimeter {
                if let Some(text) = item.value().text() {
                    if let Ok(rating) = text.trim().parse::<u32>() {
                        fields.entry(UnifiedMetadataKey::Rating).or_insert(RawValue::Rating(rating));
                    } else {
                        warn!("ignoring non-numeric RATING comment: {:?}", text);
                    }
                }
                continue;
            }
            if item.key() == &ItemKey::Year {
                if legacy_year.is_none() {
                    if let Some(text) = item.value().text() {
                        legacy_year = Some(text.to_string());
                    }
                }
                continue;
            }
            if let Some(key) = unified_key(item.key()) {
                if let Some(text) = item.value().text() {
                    adapters::accumulate_text(&mut fields, key, text);
                }
            }
        }
        // An old-style YEAR comment stands in for the release date only when no DATE exists.
        if let Some(year) = legacy_year {
            fields.entry(UnifiedMetadataKey::ReleaseDate).or_insert(RawValue::Text(year));
        }
        if let Some(cover) = adapters::front_cover(tag) {
            fields.insert(UnifiedMetadataKey::CoverArt, cover);
        }
        Ok(fields)
    }

    fn set_all(&self, path: &Path, updates: &RawFieldUpdates, ctx: &WriteContext) -> Result<()> {
        let mut tagged_file = adapters::read_tagged_file(path)?;
        let tag = adapters::tag_for_update(&mut tagged_file, MetadataFormat::Vorbis)?;
        for (key, update) in updates {
            match key {
                UnifiedMetadataKey::CoverArt => match update {
                    Some(RawValue::Binary(data)) => adapters::set_front_cover(tag, data),
                    Some(other) => warn!("Vorbis cover art takes a binary value, not {}, skipping", other.kind_name()),
                    None => adapters::remove_front_cover(tag),
                },
                UnifiedMetadataKey::Rating => match update {
                    Some(RawValue::Rating(rating)) => {
                        tag.insert(TagItem::new(ItemKey::Popularimeter, ItemValue::Text(rating.to_string())));
                    }
                    Some(other) => warn!("Vorbis rating takes a native rating value, not {}, skipping", other.kind_name()),
                    None => tag.retain(|item| item.key() != &ItemKey::Popularimeter),
                },
                _ => {
                    let native_key = match item_key(*key) {
                        Some(native_key) => native_key,
                        None => {
                            debug!("Vorbis has no comment for {:?}, skipping", key);
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
                            warn!("Vorbis cannot store a {} value for {:?}, skipping", other.kind_name(), key);
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
        adapters::remove_tag_block(path, MetadataFormat::Vorbis)
    }

    fn has_metadata(&self, path: &Path) -> Result<bool> {
        adapters::has_tag_block(path, MetadataFormat::Vorbis)
    }
}
