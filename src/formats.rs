/// The formats module models the four supported tagging formats and the three supported file
/// containers: which formats a container may carry, which of those are writable in place, and
/// the precedence order used when merging them into one unified view.
use crate::errors::{Result, UnitagError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

pub const SUPPORTED_AUDIO_EXTENSIONS: &[&str] = &[".mp3", ".flac", ".wav"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetadataFormat {
    Id3v1,
    Id3v2,
    Vorbis,
    Riff,
}

impl fmt::Display for MetadataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetadataFormat::Id3v1 => "ID3v1",
            MetadataFormat::Id3v2 => "ID3v2",
            MetadataFormat::Vorbis => "Vorbis",
            MetadataFormat::Riff => "RIFF INFO",
        };
        write!(f, "{}", s)
    }
}

/// How a metadata write treats formats other than the one being written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MetadataWritingStrategy {
    /// Write the native format only; leave every other format byte-for-byte untouched.
    Preserve,
    /// Write the native format, then delete all other formats from the file.
    Cleanup,
    /// Write the native format, then mirror the payload into every other format already
    /// present in the file, subject to each format's capabilities.
    Sync,
    /// Same as preserve: write the native format and leave the rest untouched.
    Ignore,
}

impl fmt::Display for MetadataWritingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetadataWritingStrategy::Preserve => "preserve",
            MetadataWritingStrategy::Cleanup => "cleanup",
            MetadataWritingStrategy::Sync => "sync",
            MetadataWritingStrategy::Ignore => "ignore",
        };
        write!(f, "{}", s)
    }
}

/// Which ID3v2 revision to serialize. v2.4 unless a caller needs v2.3 for player
/// compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Id3v2Revision {
    V23,
    #[default]
    V24,
}

/// A supported container, identified by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Mp3,
    Flac,
    Wav,
}

impl FileKind {
    pub fn from_path(p: &Path) -> Result<FileKind> {
        let extension = p.extension().and_then(|s| s.to_str()).map(|s| format!(".{}", s.to_lowercase())).unwrap_or_default();
        match extension.as_str() {
            ".mp3" => Ok(FileKind::Mp3),
            ".flac" => Ok(FileKind::Flac),
            ".wav" => Ok(FileKind::Wav),
            _ => Err(UnitagError::FileTypeNotSupported { extension, format: None }),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileKind::Mp3 => ".mp3",
            FileKind::Flac => ".flac",
            FileKind::Wav => ".wav",
        }
    }

    /// The formats this container may carry, in merge precedence order. The native format
    /// comes first; later entries only fill keys the earlier ones lack.
    pub fn formats(&self) -> &'static [MetadataFormat] {
        match self {
            FileKind::Mp3 => &[MetadataFormat::Id3v2, MetadataFormat::Id3v1],
            FileKind::Flac => &[MetadataFormat::Vorbis, MetadataFormat::Id3v2, MetadataFormat::Id3v1],
            FileKind::Wav => &[MetadataFormat::Riff, MetadataFormat::Id3v2, MetadataFormat::Id3v1],
        }
    }

    pub fn native_format(&self) -> MetadataFormat {
        self.formats()[0]
    }

    pub fn is_format_allowed(&self, format: MetadataFormat) -> bool {
        self.formats().contains(&format)
    }

    /// Whether the format can be rewritten in place inside this container. Legacy blocks in
    /// foreign containers (ID3 inside FLAC, ID3v1 inside WAV) are readable but frozen.
    pub fn is_format_writable(&self, format: MetadataFormat) -> bool {
        match self {
            FileKind::Mp3 => matches!(format, MetadataFormat::Id3v2 | MetadataFormat::Id3v1),
            FileKind::Flac => matches!(format, MetadataFormat::Vorbis),
            FileKind::Wav => matches!(format, MetadataFormat::Riff | MetadataFormat::Id3v2),
        }
    }

    pub fn check_format_allowed(&self, format: MetadataFormat) -> Result<()> {
        if !self.is_format_allowed(format) {
            return Err(UnitagError::FileTypeNotSupported { extension: self.extension().to_string(), format: Some(format) });
        }
        Ok(())
    }
}
