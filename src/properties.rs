/// Stream properties. These come from the audio stream itself rather than from any
/// metadata block, so they are read-only and unaffected by writing strategies.
use std::path::Path;

use lofty::prelude::AudioFile;

use crate::adapters;
use crate::errors::Result;
use crate::formats::FileKind;

/// The audio bitrate in kbps, or 0 when the codec does not expose one.
pub fn get_bitrate(path: &Path) -> Result<u32> {
    FileKind::from_path(path)?;
    let tagged = adapters::read_tagged_file(path)?;
    Ok(tagged.properties().audio_bitrate().unwrap_or(0))
}

/// The stream duration in seconds, with sub-second precision.
pub fn get_duration_in_sec(path: &Path) -> Result<f64> {
    FileKind::from_path(path)?;
    let tagged = adapters::read_tagged_file(path)?;
    Ok(tagged.properties().duration().as_secs_f64())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::UnitagError;
    use crate::testing;

    #[test]
    fn test_wav_properties() {
        let temp_dir = testing::init();
        let path = temp_dir.path().join("tone.wav");
        testing::write_minimal_wav(&path).unwrap();

        // Mono 16-bit PCM at 44.1 kHz is 705.6 kbps and the fixture holds 0.1 s of it.
        let bitrate = get_bitrate(&path).unwrap();
        assert!((700..=712).contains(&bitrate), "bitrate {bitrate}");
        let duration = get_duration_in_sec(&path).unwrap();
        assert!((duration - 0.1).abs() < 0.05, "duration {duration}");
    }

    #[test]
    fn test_mp3_properties() {
        let temp_dir = testing::init();
        let path = temp_dir.path().join("tone.mp3");
        testing::write_minimal_mp3(&path).unwrap();

        let bitrate = get_bitrate(&path).unwrap();
        assert!((120..=136).contains(&bitrate), "bitrate {bitrate}");
        let duration = get_duration_in_sec(&path).unwrap();
        assert!(duration > 0.1 && duration < 0.4, "duration {duration}");
    }

    #[test]
    fn test_unsupported_extension_is_rejected() {
        let temp_dir = testing::init();
        let path = temp_dir.path().join("notes.txt");
        std::fs::write(&path, b"not audio").unwrap();
        assert!(matches!(get_bitrate(&path), Err(UnitagError::FileTypeNotSupported { .. })));
    }
}
