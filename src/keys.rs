/// The keys module defines the unified metadata schema: the closed set of metadata keys the
/// engine understands, the canonical value type of each key, and the value payload enum that
/// read and write operations exchange.
///
/// Format adapters translate their native fields into this schema; nothing outside the
/// adapters ever sees a native field name.
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// The canonical value type of a unified key. Every key has exactly one kind; a payload of any
/// other kind is rejected before any file is touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    Text,
    TextList,
    Integer,
    Boolean,
    Binary,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ValueKind::Text => "text",
            ValueKind::TextList => "text list",
            ValueKind::Integer => "integer",
            ValueKind::Boolean => "boolean",
            ValueKind::Binary => "binary",
        };
        write!(f, "{}", s)
    }
}

/// A normalized metadata payload. The variant must agree with the key's [`ValueKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
    Integer(i64),
    Boolean(bool),
    Binary(Vec<u8>),
}

impl MetadataValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            MetadataValue::Text(_) => ValueKind::Text,
            MetadataValue::List(_) => ValueKind::TextList,
            MetadataValue::Integer(_) => ValueKind::Integer,
            MetadataValue::Boolean(_) => ValueKind::Boolean,
            MetadataValue::Binary(_) => ValueKind::Binary,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetadataValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[String]> {
        match self {
            MetadataValue::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            MetadataValue::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// The closed set of unified metadata keys. Each key maps onto whatever native field a given
/// format uses for the same concept; formats that have no such field simply do not support the
/// key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnifiedMetadataKey {
    Title,
    ArtistsNames,
    AlbumName,
    AlbumArtistsNames,
    Genre,
    Rating,
    Comment,
    TrackNumber,
    TrackTotal,
    DiscNumber,
    DiscTotal,
    ReleaseDate,
    OriginalReleaseDate,
    RecordingDate,
    Bpm,
    Composer,
    Conductor,
    Lyricist,
    Writer,
    Publisher,
    Copyright,
    Lyrics,
    Language,
    Isrc,
    Barcode,
    CatalogNumber,
    EncodedBy,
    EncoderSoftware,
    EncoderSettings,
    Grouping,
    TrackSubtitle,
    DiscSubtitle,
    Mood,
    InitialKey,
    Remixer,
    Arranger,
    Engineer,
    Producer,
    Performer,
    OriginalArtist,
    OriginalAlbumName,
    Compilation,
    CoverArt,
    TitleSortOrder,
    AlbumSortOrder,
    ArtistSortOrder,
    MediaType,
}

impl UnifiedMetadataKey {
    pub const ALL: &'static [UnifiedMetadataKey] = &[
        UnifiedMetadataKey::Title,
        UnifiedMetadataKey::ArtistsNames,
        UnifiedMetadataKey::AlbumName,
        UnifiedMetadataKey::AlbumArtistsNames,
        UnifiedMetadataKey::Genre,
        UnifiedMetadataKey::Rating,
        UnifiedMetadataKey::Comment,
        UnifiedMetadataKey::TrackNumber,
        UnifiedMetadataKey::TrackTotal,
        UnifiedMetadataKey::DiscNumber,
        UnifiedMetadataKey::DiscTotal,
        UnifiedMetadataKey::ReleaseDate,
        UnifiedMetadataKey::OriginalReleaseDate,
        UnifiedMetadataKey::RecordingDate,
        UnifiedMetadataKey::Bpm,
        UnifiedMetadataKey::Composer,
        UnifiedMetadataKey::Conductor,
        UnifiedMetadataKey::Lyricist,
        UnifiedMetadataKey::Writer,
        UnifiedMetadataKey::Publisher,
        UnifiedMetadataKey::Copyright,
        UnifiedMetadataKey::Lyrics,
        UnifiedMetadataKey::Language,
        UnifiedMetadataKey::Isrc,
        UnifiedMetadataKey::Barcode,
        UnifiedMetadataKey::CatalogNumber,
        UnifiedMetadataKey::EncodedBy,
        UnifiedMetadataKey::EncoderSoftware,
        UnifiedMetadataKey::EncoderSettings,
        UnifiedMetadataKey::Grouping,
        UnifiedMetadataKey::TrackSubtitle,
        UnifiedMetadataKey::DiscSubtitle,
        UnifiedMetadataKey::Mood,
        UnifiedMetadataKey::InitialKey,
        UnifiedMetadataKey::Remixer,
        UnifiedMetadataKey::Arranger,
        UnifiedMetadataKey::Engineer,
        UnifiedMetadataKey::Producer,
        UnifiedMetadataKey::Performer,
        UnifiedMetadataKey::OriginalArtist,
        UnifiedMetadataKey::OriginalAlbumName,
        UnifiedMetadataKey::Compilation,
        UnifiedMetadataKey::CoverArt,
        UnifiedMetadataKey::TitleSortOrder,
        UnifiedMetadataKey::AlbumSortOrder,
        UnifiedMetadataKey::ArtistSortOrder,
        UnifiedMetadataKey::MediaType,
    ];

    /// The canonical value type of this key. The match is total, so adding a key without
    /// declaring its type does not compile.
    pub fn value_kind(&self) -> ValueKind {
        use UnifiedMetadataKey::*;
        match self {
            Title | AlbumName | Genre | Comment | ReleaseDate | OriginalReleaseDate | RecordingDate | Composer | Conductor | Lyricist
            | Writer | Publisher | Copyright | Lyrics | Language | Isrc | Barcode | CatalogNumber | EncodedBy | EncoderSoftware
            | EncoderSettings | Grouping | TrackSubtitle | DiscSubtitle | Mood | InitialKey | Remixer | Arranger | Engineer | Producer
            | Performer | OriginalArtist | OriginalAlbumName | TitleSortOrder | AlbumSortOrder | ArtistSortOrder | MediaType => {
                ValueKind::Text
            }
            ArtistsNames | AlbumArtistsNames => ValueKind::TextList,
            Rating | TrackNumber | TrackTotal | DiscNumber | DiscTotal | Bpm => ValueKind::Integer,
            Compilation => ValueKind::Boolean,
            CoverArt => ValueKind::Binary,
        }
    }

    /// Whether native single-string representations of this key are subject to
    /// separator splitting on read.
    pub fn is_multi_valued(&self) -> bool {
        matches!(self, UnifiedMetadataKey::ArtistsNames | UnifiedMetadataKey::AlbumArtistsNames)
    }
}

/// A unified metadata dictionary. Absent key means the field is present in no consulted
/// format; there is no "present but null" state.
pub type UnifiedMetadata = HashMap<UnifiedMetadataKey, MetadataValue>;

static KEY_TABLE_CHECK: Lazy<()> = Lazy::new(|| {
    for key in UnifiedMetadataKey::ALL {
        if key.is_multi_valued() {
            assert_eq!(key.value_kind(), ValueKind::TextList, "multi-valued key {key:?} must be list-typed");
        }
        if key.value_kind() == ValueKind::TextList {
            assert!(key.is_multi_valued(), "list-typed key {key:?} must be multi-valued");
        }
    }
});

/// Runs the key table consistency check once per process. Engines call this on entry so a
/// broken table fails loudly on first use rather than corrupting a write.
pub(crate) fn check_key_table() {
    Lazy::force(&KEY_TABLE_CHECK);
}
