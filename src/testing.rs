/// Test toys shared across the unit tests: a process-wide tracing subscriber, an in-memory
/// format adapter backed by a plain map, and builders for tiny but structurally valid audio
/// files.
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, Once};

use tempfile::TempDir;

use crate::adapters::{AdapterRegistry, FormatAdapter, RawFieldMap, RawFieldUpdates, RawValue, WriteContext};
use crate::errors::Result;
use crate::formats::MetadataFormat;
use crate::keys::UnifiedMetadataKey;

static INIT: Once = Once::new();

pub fn init() -> TempDir {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")))
            .with_test_writer()
            .try_init();
    });
    TempDir::new().expect("failed to create temp dir")
}

/// Shared backing store for fake adapters, keyed by path and format. Sharing one store
/// across a registry lets a test inspect every block an engine call touched.
pub type FakeStore = HashMap<(PathBuf, MetadataFormat), RawFieldMap>;

pub struct FakeAdapter {
    format: MetadataFormat,
    writable: bool,
    supported: Vec<UnifiedMetadataKey>,
    store: Arc<Mutex<FakeStore>>,
}

impl FakeAdapter {
    pub fn new(format: MetadataFormat, store: Arc<Mutex<FakeStore>>) -> FakeAdapter {
        FakeAdapter { format, writable: true, supported: UnifiedMetadataKey::ALL.to_vec(), store }
    }

    pub fn read_only(mut self) -> FakeAdapter {
        self.writable = false;
        self
    }

    pub fn supporting(mut self, keys: &[UnifiedMetadataKey]) -> FakeAdapter {
        self.supported = keys.to_vec();
        self
    }
}

impl FormatAdapter for FakeAdapter {
    fn format(&self) -> MetadataFormat {
        self.format
    }

    fn is_writable(&self) -> bool {
        self.writable
    }

    fn supports(&self, key: UnifiedMetadataKey) -> bool {
        self.supported.contains(&key)
    }

    fn get_all(&self, path: &Path) -> Result<RawFieldMap> {
        let store = self.store.lock().unwrap();
        Ok(store.get(&(path.to_path_buf(), self.format)).cloned().unwrap_or_default())
    }

    fn set_all(&self, path: &Path, updates: &RawFieldUpdates, _ctx: &WriteContext) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let block = store.entry((path.to_path_buf(), self.format)).or_default();
        for (key, update) in updates {
            match update {
                // Empty text removes the field, mirroring the real adapters.
                Some(RawValue::Text(s)) if s.is_empty() => {
                    block.remove(key);
                }
                Some(value) => {
                    block.insert(*key, value.clone());
                }
                None => {
                    block.remove(key);
                }
            }
        }
        Ok(())
    }

    fn delete_all(&self, path: &Path) -> Result<bool> {
        let mut store = self.store.lock().unwrap();
        Ok(store.remove(&(path.to_path_buf(), self.format)).is_some())
    }

    fn has_metadata(&self, path: &Path) -> Result<bool> {
        let store = self.store.lock().unwrap();
        Ok(store.contains_key(&(path.to_path_buf(), self.format)))
    }
}

/// A registry of fully capable fakes for every format, all sharing one store.
pub fn fake_registry(store: &Arc<Mutex<FakeStore>>) -> AdapterRegistry {
    AdapterRegistry::new(vec![
        Box::new(FakeAdapter::new(MetadataFormat::Id3v1, store.clone())),
        Box::new(FakeAdapter::new(MetadataFormat::Id3v2, store.clone())),
        Box::new(FakeAdapter::new(MetadataFormat::Vorbis, store.clone())),
        Box::new(FakeAdapter::new(MetadataFormat::Riff, store.clone())),
    ])
}

pub fn seed(store: &Arc<Mutex<FakeStore>>, path: &Path, format: MetadataFormat, fields: &[(UnifiedMetadataKey, RawValue)]) {
    let mut store = store.lock().unwrap();
    let block = store.entry((path.to_path_buf(), format)).or_default();
    for (key, value) in fields {
        block.insert(*key, value.clone());
    }
}

pub fn stored(store: &Arc<Mutex<FakeStore>>, path: &Path, format: MetadataFormat) -> Option<RawFieldMap> {
    store.lock().unwrap().get(&(path.to_path_buf(), format)).cloned()
}

/// Writes a minimal PCM WAV file: the standard 44-byte header plus a tenth of a second of
/// silence at 44.1 kHz mono 16-bit.
pub fn write_minimal_wav(path: &Path) -> std::io::Result<()> {
    let sample_rate: u32 = 44100;
    let byte_rate: u32 = sample_rate * 2;
    let data_len: u32 = byte_rate / 10;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes()); // block align
    bytes.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);
    std::fs::write(path, bytes)
}

/// Writes a minimal CBR MP3: eight valid 128 kbps MPEG-1 Layer III frames of silence.
pub fn write_minimal_mp3(path: &Path) -> std::io::Result<()> {
    // 0xFFFB is sync + MPEG-1 Layer III without CRC; 0x90 selects 128 kbps at 44.1 kHz,
    // which makes each frame exactly 417 bytes.
    let mut frame = vec![0u8; 417];
    frame[0] = 0xFF;
    frame[1] = 0xFB;
    frame[2] = 0x90;
    frame[3] = 0x00;
    let mut bytes = Vec::with_capacity(frame.len() * 8);
    for _ in 0..8 {
        bytes.extend_from_slice(&frame);
    }
    std::fs::write(path, bytes)
}

/// Writes a minimal FLAC file: the stream marker, a STREAMINFO block describing one
/// second of 44.1 kHz mono 16-bit audio, and a PADDING block, with no audio frames.
pub fn write_minimal_flac(path: &Path) -> std::io::Result<()> {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"fLaC");
    bytes.extend_from_slice(&[0x00, 0, 0, 34]); // STREAMINFO, length
    bytes.extend_from_slice(&4096u16.to_be_bytes()); // min block size
    bytes.extend_from_slice(&4096u16.to_be_bytes()); // max block size
    bytes.extend_from_slice(&[0, 0, 0]); // min frame size unknown
    bytes.extend_from_slice(&[0, 0, 0]); // max frame size unknown
    // Packed bit fields: sample rate 44100, 1 channel, 16 bps, 44100 total samples.
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x40, 0xF0, 0x00, 0x00, 0xAC, 0x44]);
    bytes.extend_from_slice(&[0; 16]); // audio MD5 unset
    bytes.extend_from_slice(&[0x81, 0, 0, 16]); // last-block flag, PADDING, length
    bytes.extend_from_slice(&[0; 16]);
    std::fs::write(path, bytes)
}
