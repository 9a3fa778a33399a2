use crate::formats::{MetadataFormat, MetadataWritingStrategy};
use crate::keys::{UnifiedMetadataKey, ValueKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UnitagError {
    #[error("unitag error: {0}")]
    Generic(String),
    /// The file extension is unknown, or the requested format is not carried
    /// by files of that extension.
    #[error("{extension} is not a supported filetype{}", format_clause(.format))]
    FileTypeNotSupported { extension: String, format: Option<MetadataFormat> },
    /// The target format cannot hold the named fields, or cannot be written
    /// at all on this container.
    #[error("{format} does not support: {}", .fields.join(", "))]
    MetadataNotSupported { format: MetadataFormat, fields: Vec<String> },
    /// A forced single-format write was combined with an explicit strategy.
    #[error("cannot combine forced format {format} with writing strategy {strategy}")]
    ConflictingWriteParameters { format: MetadataFormat, strategy: MetadataWritingStrategy },
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The caller passed a payload whose type disagrees with the key's
    /// canonical kind. This is a caller bug, not a file problem.
    #[error("invalid value for {key:?}: expected {expected}")]
    InvalidValue { key: UnifiedMetadataKey, expected: ValueKind },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("tag error: {0}")]
    Tag(#[from] lofty::error::LoftyError),
}

fn format_clause(format: &Option<MetadataFormat>) -> String {
    match format {
        Some(f) => format!(" for {f} metadata"),
        None => String::new(),
    }
}

pub type Result<T> = std::result::Result<T, UnitagError>;
