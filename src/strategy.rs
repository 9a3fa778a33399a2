/// The strategy module is the write side of the crate. One call updates the container's
/// native format and then applies a writing strategy to every other format the container
/// carries: preserve and ignore leave them alone, sync mirrors the changes into the blocks
/// that already exist, and cleanup deletes them. A forced format write bypasses the
/// strategy machinery and targets exactly one block.
///
/// All validation runs before the first byte of file I/O, so a rejected call leaves the
/// file exactly as it was. Calls are self-contained and hold no state between invocations;
/// concurrent writers of the same path race at the filesystem level and the last write
/// wins.
use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::adapters::{self, AdapterRegistry, FormatAdapter, RawFieldUpdates, RawValue, WriteContext};
use crate::errors::{Result, UnitagError};
use crate::formats::{FileKind, Id3v2Revision, MetadataFormat, MetadataWritingStrategy};
use crate::keys::{self, MetadataValue, UnifiedMetadataKey};
use crate::normalize;
use crate::rating::RatingScales;

/// A batch of unified changes. `None` deletes the key from the target format(s).
pub type MetadataChanges = HashMap<UnifiedMetadataKey, Option<MetadataValue>>;

/// Write-side options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WriteOptions {
    /// Write exactly this format and leave every other block untouched. Mutually exclusive
    /// with `strategy`.
    pub format: Option<MetadataFormat>,
    /// How formats other than the native one are treated. Unset resolves to sync.
    pub strategy: Option<MetadataWritingStrategy>,
    /// The 0..=max scale incoming rating values are expressed on. Required whenever the
    /// changes set a rating.
    pub normalized_rating_max_value: Option<u32>,
    /// Fail the whole write when the target format cannot hold one of the changed fields,
    /// instead of dropping that field with a warning. Applies to the native or forced
    /// target only; sync targets always drop.
    pub fail_on_unsupported_field: bool,
    /// The revision new ID3v2 blocks are serialized as.
    pub id3v2_version: Id3v2Revision,
    /// The native scale each rating-capable format stores.
    pub rating_scales: RatingScales,
}

impl WriteOptions {
    fn validate(&self, changes: &MetadataChanges) -> Result<()> {
        if let (Some(format), Some(strategy)) = (self.format, self.strategy) {
            return Err(UnitagError::ConflictingWriteParameters { format, strategy });
        }
        if self.normalized_rating_max_value == Some(0) {
            return Err(UnitagError::Configuration("normalized rating maximum must be nonzero".to_string()));
        }
        self.rating_scales.validate()?;
        for (key, change) in changes {
            if let Some(value) = change {
                normalize::check_value_type(*key, value)?;
            }
        }
        if matches!(changes.get(&UnifiedMetadataKey::Rating), Some(Some(_))) && self.normalized_rating_max_value.is_none() {
            return Err(UnitagError::Configuration("writing a rating requires normalized_rating_max_value".to_string()));
        }
        Ok(())
    }
}

/// Applies a batch of unified changes to the file. The target formats come from the
/// options: a forced format writes that block alone, otherwise the native format is
/// written and the resolved strategy decides what happens to the rest.
pub fn update_file_metadata(path: &Path, changes: &MetadataChanges, options: &WriteOptions) -> Result<()> {
    update_with(adapters::default_registry(), path, changes, options)
}

pub(crate) fn update_with(registry: &AdapterRegistry, path: &Path, changes: &MetadataChanges, options: &WriteOptions) -> Result<()> {
    keys::check_key_table();
    options.validate(changes)?;
    let kind = FileKind::from_path(path)?;
    if changes.is_empty() {
        debug!("no changes for {}, skipping", path.display());
        return Ok(());
    }
    let ctx = WriteContext { id3v2_revision: options.id3v2_version };

    // A forced format bypasses the strategy machinery entirely.
    if let Some(format) = options.format {
        kind.check_format_allowed(format)?;
        let adapter = writable_adapter(registry, kind, format)?;
        let supported = validate_field_support(adapter, changes, options.fail_on_unsupported_field)?;
        let updates = denormalize_changes(format, &supported, options)?;
        return apply_updates(adapter, path, &updates, &ctx);
    }

    let strategy = options.strategy.unwrap_or(MetadataWritingStrategy::Sync);
    let native = kind.native_format();
    let adapter = writable_adapter(registry, kind, native)?;
    let supported = validate_field_support(adapter, changes, options.fail_on_unsupported_field)?;
    let updates = denormalize_changes(native, &supported, options)?;
    apply_updates(adapter, path, &updates, &ctx)?;

    match strategy {
        MetadataWritingStrategy::Preserve | MetadataWritingStrategy::Ignore => {}
        MetadataWritingStrategy::Sync => {
            for format in kind.formats() {
                if *format == native {
                    continue;
                }
                if !kind.is_format_writable(*format) {
                    debug!("{} is frozen in {} containers, not syncing", format, kind.extension());
                    continue;
                }
                let adapter = registry.get(*format)?;
                if !adapter.is_writable() {
                    continue;
                }
                // Sync only mirrors into blocks that already exist; it never creates one.
                if !adapter.has_metadata(path)? {
                    debug!("no {} block in {}, not syncing", format, path.display());
                    continue;
                }
                let supported = validate_field_support(adapter, changes, false)?;
                let updates = denormalize_changes(*format, &supported, options)?;
                apply_updates(adapter, path, &updates, &ctx)?;
            }
        }
        MetadataWritingStrategy::Cleanup => {
            for format in kind.formats() {
                if *format == native {
                    continue;
                }
                if !kind.is_format_writable(*format) {
                    warn!("{} is frozen in {} containers and cannot be cleaned up", format, kind.extension());
                    continue;
                }
                let adapter = registry.get(*format)?;
                if !adapter.is_writable() {
                    continue;
                }
                if adapter.delete_all(path)? {
                    debug!("cleaned up {} block in {}", format, path.display());
                }
            }
        }
    }
    Ok(())
}

/// Deletes every writable metadata block the file carries. Returns true when at least one
/// block was deleted or when the file had no metadata to begin with.
pub fn delete_all_metadata(path: &Path) -> Result<bool> {
    delete_all_with(adapters::default_registry(), path)
}

pub(crate) fn delete_all_with(registry: &AdapterRegistry, path: &Path) -> Result<bool> {
    let kind = FileKind::from_path(path)?;
    let mut had_any = false;
    let mut deleted_any = false;
    for format in kind.formats() {
        let adapter = registry.get(*format)?;
        if !adapter.has_metadata(path)? {
            continue;
        }
        had_any = true;
        if !kind.is_format_writable(*format) || !adapter.is_writable() {
            warn!("{} is read-only in {} containers, its block remains", format, kind.extension());
            continue;
        }
        if adapter.delete_all(path)? {
            deleted_any = true;
        }
    }
    Ok(deleted_any || !had_any)
}

/// Deletes a single format's metadata block. An absent block counts as deleted; a present
/// block in a container that cannot rewrite it is an error.
pub fn delete_metadata(path: &Path, format: MetadataFormat) -> Result<bool> {
    delete_format_with(adapters::default_registry(), path, format)
}

pub(crate) fn delete_format_with(registry: &AdapterRegistry, path: &Path, format: MetadataFormat) -> Result<bool> {
    let kind = FileKind::from_path(path)?;
    kind.check_format_allowed(format)?;
    let adapter = registry.get(format)?;
    if !adapter.has_metadata(path)? {
        return Ok(true);
    }
    if !kind.is_format_writable(format) || !adapter.is_writable() {
        return Err(UnitagError::MetadataNotSupported {
            format,
            fields: vec![format!("deleting from {} files", kind.extension())],
        });
    }
    adapter.delete_all(path)?;
    Ok(true)
}

fn writable_adapter<'a>(registry: &'a AdapterRegistry, kind: FileKind, format: MetadataFormat) -> Result<&'a dyn FormatAdapter> {
    let adapter = registry.get(format)?;
    if !kind.is_format_writable(format) || !adapter.is_writable() {
        return Err(UnitagError::MetadataNotSupported {
            format,
            fields: vec![format!("writing to {} files", kind.extension())],
        });
    }
    Ok(adapter)
}

/// Splits the changes into the subset the adapter can hold. Unsupported field sets either
/// fail the call or drop with a warning; unsupported deletes are silent no-ops either way.
fn validate_field_support(adapter: &dyn FormatAdapter, changes: &MetadataChanges, strict: bool) -> Result<MetadataChanges> {
    let mut supported = MetadataChanges::new();
    let mut unsupported: Vec<String> = Vec::new();
    for (key, change) in changes {
        if adapter.supports(*key) {
            supported.insert(*key, change.clone());
        } else if change.is_some() {
            unsupported.push(format!("{key:?}"));
        }
    }
    if !unsupported.is_empty() {
        unsupported.sort();
        if strict {
            return Err(UnitagError::MetadataNotSupported { format: adapter.format(), fields: unsupported });
        }
        warn!("{} cannot hold {}, dropping", adapter.format(), unsupported.join(", "));
    }
    Ok(supported)
}

/// Converts validated unified changes into the raw updates one format stores. Ratings are
/// rescaled from the caller's normalized scale to the format's native scale.
fn denormalize_changes(format: MetadataFormat, changes: &MetadataChanges, options: &WriteOptions) -> Result<RawFieldUpdates> {
    let style = normalize::multi_value_style(format);
    let mut updates = RawFieldUpdates::new();
    for (key, change) in changes {
        let value = match change {
            Some(value) => value,
            None => {
                updates.insert(*key, None);
                continue;
            }
        };
        let raw = if *key == UnifiedMetadataKey::Rating {
            denormalize_rating(format, value, options)?
        } else {
            normalize::denormalize_value(*key, value, style)?
        };
        updates.insert(*key, Some(raw));
    }
    Ok(updates)
}

fn denormalize_rating(format: MetadataFormat, value: &MetadataValue, options: &WriteOptions) -> Result<RawValue> {
    let source_max = match options.normalized_rating_max_value {
        Some(max) => max,
        None => return Err(UnitagError::Configuration("writing a rating requires normalized_rating_max_value".to_string())),
    };
    let scale = match options.rating_scales.for_format(format) {
        Some(scale) => scale,
        None => return Err(UnitagError::MetadataNotSupported { format, fields: vec!["Rating".to_string()] }),
    };
    let normalized = match value.as_integer() {
        Some(i) if i >= 0 => i as u32,
        Some(i) => {
            warn!("clamping negative rating {} to 0", i);
            0
        }
        None => return Err(UnitagError::InvalidValue { key: UnifiedMetadataKey::Rating, expected: crate::keys::ValueKind::Integer }),
    };
    Ok(RawValue::Rating(scale.from_normalized(normalized, source_max)))
}

fn apply_updates(adapter: &dyn FormatAdapter, path: &Path, updates: &RawFieldUpdates, ctx: &WriteContext) -> Result<()> {
    if updates.is_empty() {
        debug!("nothing applicable for {} in {}", adapter.format(), path.display());
        return Ok(());
    }
    adapter.set_all(path, updates, ctx)
}
