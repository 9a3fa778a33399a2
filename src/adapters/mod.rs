/// The adapters module gives each tagging format one object with a uniform interface: read
/// every managed field as raw native content, apply a batch of raw updates, probe for the
/// block's presence, and remove the block outright. The merge and strategy engines talk to
/// [`FormatAdapter`] only; every lofty call and every native field name lives below this
/// boundary, and tests substitute the whole layer with an in-memory store.
use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use lofty::config::WriteOptions as LoftyWriteOptions;
use lofty::file::TaggedFile;
use lofty::picture::{Picture, PictureType};
use lofty::prelude::TaggedFileExt;
use lofty::probe::Probe;
use lofty::tag::{Tag, TagType};

use crate::errors::{Result, UnitagError};
use crate::formats::{Id3v2Revision, MetadataFormat};
use crate::keys::UnifiedMetadataKey;

mod id3v1;
mod id3v2;
mod riff;
mod vorbis;

pub use id3v1::Id3v1Adapter;
pub use id3v2::Id3v2Adapter;
pub use riff::RiffAdapter;
pub use vorbis::VorbisAdapter;

use once_cell::sync::Lazy;

/// Raw field content in the shape a format physically stores it, before normalization on
/// read and after denormalization on write.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// One textual entry, possibly containing ad-hoc value separators.
    Text(String),
    /// Discrete repeated entries for one field. Vorbis stores these natively.
    Entries(Vec<String>),
    /// A legacy genre table code.
    GenreCode(u8),
    /// A numeric rating on the format's native scale.
    Rating(u32),
    /// An opaque byte blob.
    Binary(Vec<u8>),
}

impl RawValue {
    /// Short noun for log lines.
    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            RawValue::Text(_) => "text",
            RawValue::Entries(_) => "entries",
            RawValue::GenreCode(_) => "genre code",
            RawValue::Rating(_) => "rating",
            RawValue::Binary(_) => "binary",
        }
    }
}

/// Everything one format block holds for the unified keys it supports.
pub type RawFieldMap = HashMap<UnifiedMetadataKey, RawValue>;

/// A batch of raw writes for one format block. `None` removes the field.
pub type RawFieldUpdates = HashMap<UnifiedMetadataKey, Option<RawValue>>;

/// Write-time knobs an adapter cannot decide on its own.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteContext {
    pub id3v2_revision: Id3v2Revision,
}

/// One tagging format's read/write surface. Implementations are stateless; every call opens
/// the file fresh and closes it before returning.
pub trait FormatAdapter: Send + Sync {
    /// The format this adapter manages.
    fn format(&self) -> MetadataFormat;

    /// Whether the format itself can be written. Container-level restrictions (an ID3 block
    /// frozen inside a foreign container) are the formats module's concern, not this one.
    fn is_writable(&self) -> bool {
        true
    }

    /// Whether the format has a native field for the key.
    fn supports(&self, key: UnifiedMetadataKey) -> bool;

    /// Every key the format supports, in schema order.
    fn supported_keys(&self) -> Vec<UnifiedMetadataKey> {
        UnifiedMetadataKey::ALL.iter().copied().filter(|k| self.supports(*k)).collect()
    }

    /// Reads every supported field present in the file's block. A file without the block
    /// reads as empty.
    fn get_all(&self, path: &Path) -> Result<RawFieldMap>;

    /// Applies a batch of raw updates to the file's block, creating the block when absent.
    /// `None` removes the field; unnamed fields are left as they were.
    fn set_all(&self, path: &Path, updates: &RawFieldUpdates, ctx: &WriteContext) -> Result<()>;

    /// Removes the whole block from the file. Returns whether a block was present.
    fn delete_all(&self, path: &Path) -> Result<bool>;

    /// Whether the file currently carries this format's block.
    fn has_metadata(&self, path: &Path) -> Result<bool>;
}

/// Routes a format to its adapter. The default registry carries the four lofty-backed
/// adapters; tests construct one around in-memory fakes instead.
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn FormatAdapter>>,
}

static DEFAULT_REGISTRY: Lazy<AdapterRegistry> = Lazy::new(AdapterRegistry::with_defaults);

impl AdapterRegistry {
    pub fn new(adapters: Vec<Box<dyn FormatAdapter>>) -> AdapterRegistry {
        AdapterRegistry { adapters }
    }

    pub fn with_defaults() -> AdapterRegistry {
        AdapterRegistry::new(vec![
            Box::new(Id3v1Adapter),
            Box::new(Id3v2Adapter),
            Box::new(VorbisAdapter),
            Box::new(RiffAdapter),
        ])
    }

    pub fn get(&self, format: MetadataFormat) -> Result<&dyn FormatAdapter> {
        self.adapters
            .iter()
            .find(|a| a.format() == format)
            .map(|a| a.as_ref())
            .ok_or_else(|| UnitagError::Generic(format!("no adapter registered for {}", format)))
    }
}

impl Default for AdapterRegistry {
    fn default() -> AdapterRegistry {
        AdapterRegistry::with_defaults()
    }
}

/// The process-wide registry used by the public operations.
pub(crate) fn default_registry() -> &'static AdapterRegistry {
    &DEFAULT_REGISTRY
}

/// The lofty tag slot a format occupies.
pub(crate) fn tag_type(format: MetadataFormat) -> TagType {
    match format {
        MetadataFormat::Id3v1 => TagType::Id3v1,
        MetadataFormat::Id3v2 => TagType::Id3v2,
        MetadataFormat::Vorbis => TagType::VorbisComments,
        MetadataFormat::Riff => TagType::RiffInfo,
    }
}

pub(crate) fn read_tagged_file(path: &Path) -> Result<TaggedFile> {
    let tagged_file = Probe::open(path)?.guess_file_type()?.read()?;
    Ok(tagged_file)
}

/// Fetches the format's tag for mutation, creating an empty one when the file does not carry
/// it yet. Creation fails only when the container refuses the slot, which the formats module
/// normally gates off beforehand.
pub(crate) fn tag_for_update(tagged_file: &mut TaggedFile, format: MetadataFormat) -> Result<&mut Tag> {
    let ty = tag_type(format);
    if tagged_file.tag_mut(ty).is_none() {
        tagged_file.insert_tag(Tag::new(ty));
    }
    tagged_file.tag_mut(ty).ok_or_else(|| UnitagError::Generic(format!("container refused a {} tag slot", format)))
}

pub(crate) fn lofty_write_options(ctx: &WriteContext) -> LoftyWriteOptions {
    LoftyWriteOptions::default().use_id3v23(ctx.id3v2_revision == Id3v2Revision::V23)
}

pub(crate) fn has_tag_block(path: &Path, format: MetadataFormat) -> Result<bool> {
    Ok(read_tagged_file(path)?.tag(tag_type(format)).is_some())
}

/// Strips a format's whole block from the file. Returns whether a block was present.
pub(crate) fn remove_tag_block(path: &Path, format: MetadataFormat) -> Result<bool> {
    let ty = tag_type(format);
    let tagged_file = read_tagged_file(path)?;
    if tagged_file.tag(ty).is_none() {
        return Ok(false);
    }
    ty.remove_from_path(path)?;
    Ok(true)
}

/// Collects one textual item into the field map. The first item for a key stays a single
/// text; further items for the same key promote it to discrete entries, which is how
/// repeated frames and repeated comment entries surface from lofty.
pub(crate) fn accumulate_text(fields: &mut RawFieldMap, key: UnifiedMetadataKey, text: &str) {
    match fields.get_mut(&key) {
        None => {
            fields.insert(key, RawValue::Text(text.to_string()));
        }
        Some(RawValue::Text(first)) => {
            let first = std::mem::take(first);
            fields.insert(key, RawValue::Entries(vec![first, text.to_string()]));
        }
        Some(RawValue::Entries(entries)) => {
            entries.push(text.to_string());
        }
        Some(_) => {}
    }
}

/// The front cover picture as an opaque blob, falling back to the first picture of any type.
pub(crate) fn front_cover(tag: &Tag) -> Option<RawValue> {
    let pictures = tag.pictures();
    let picture = pictures.iter().find(|p| p.pic_type() == PictureType::CoverFront).or_else(|| pictures.first())?;
    Some(RawValue::Binary(picture.data().to_vec()))
}

/// Replaces the front cover. The blob is parsed once to sniff its MIME type so players that
/// insist on one still render it; other picture types on the tag are left alone.
pub(crate) fn set_front_cover(tag: &mut Tag, data: &[u8]) {
    let mut cursor = Cursor::new(data);
    let mime = Picture::from_reader(&mut cursor).ok().and_then(|p| p.mime_type().cloned());
    tag.remove_picture_type(PictureType::CoverFront);
    tag.push_picture(Picture::new_unchecked(PictureType::CoverFront, mime, None, data.to_vec()));
}

pub(crate) fn remove_front_cover(tag: &mut Tag) {
    tag.remove_picture_type(PictureType::CoverFront);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_covers_every_format() {
        let registry = AdapterRegistry::with_defaults();
        for format in [MetadataFormat::Id3v1, MetadataFormat::Id3v2, MetadataFormat::Vorbis, MetadataFormat::Riff] {
            let adapter = registry.get(format).unwrap();
            assert_eq!(adapter.format(), format);
        }
    }

    #[test]
    fn test_registry_rejects_missing_format() {
        let registry = AdapterRegistry::new(vec![Box::new(Id3v2Adapter)]);
        assert!(registry.get(MetadataFormat::Vorbis).is_err());
    }

    #[test]
    fn test_tag_type_mapping() {
        assert_eq!(tag_type(MetadataFormat::Id3v1), TagType::Id3v1);
        assert_eq!(tag_type(MetadataFormat::Id3v2), TagType::Id3v2);
        assert_eq!(tag_type(MetadataFormat::Vorbis), TagType::VorbisComments);
        assert_eq!(tag_type(MetadataFormat::Riff), TagType::RiffInfo);
    }

    #[test]
    fn test_supported_keys_follow_schema_order() {
        let keys = Id3v1Adapter.supported_keys();
        assert_eq!(keys.first(), Some(&UnifiedMetadataKey::Title));
        assert!(keys.len() < UnifiedMetadataKey::ALL.len());
    }
}
