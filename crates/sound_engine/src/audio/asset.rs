//! Encoded audio assets registered with a backend
//!
//! Stores the raw file bytes so a device backend can decode on demand.

use crate::audio::AudioError;
use std::path::Path;
use std::sync::Arc;

/// Encoded audio data for one asset key
///
/// The bytes are shared, so every sound created from the same asset reuses
/// one buffer. Supports WAV, OGG, MP3, and FLAC formats.
#[derive(Debug, Clone)]
pub struct AudioAsset {
    data: Arc<[u8]>,
    format: AudioFormat,
}

/// Supported audio formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// WAV uncompressed
    Wav,
    /// OGG Vorbis compressed
    Ogg,
    /// MP3 compressed
    Mp3,
    /// FLAC lossless
    Flac,
    /// Unknown format
    Unknown,
}

impl AudioAsset {
    /// Create an asset from encoded bytes, rejecting empty or unrecognized data
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AudioError> {
        if bytes.is_empty() {
            return Err(AudioError::InvalidAsset("Empty audio file".to_string()));
        }

        let format = Self::detect_format(bytes);
        if format == AudioFormat::Unknown {
            return Err(AudioError::InvalidAsset("Unknown audio format".to_string()));
        }

        // Decoding is deferred to playback
        Ok(Self {
            data: Arc::from(bytes),
            format,
        })
    }

    /// Read an asset from disk
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, AudioError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| {
            AudioError::InvalidAsset(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_bytes(&bytes)
    }

    /// Raw encoded bytes
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Shared handle to the encoded bytes
    pub fn shared_data(&self) -> Arc<[u8]> {
        Arc::clone(&self.data)
    }

    /// Detected container format
    pub fn format(&self) -> AudioFormat {
        self.format
    }

    /// Detect audio format from magic bytes
    fn detect_format(bytes: &[u8]) -> AudioFormat {
        if bytes.len() < 4 {
            return AudioFormat::Unknown;
        }

        match &bytes[0..4] {
            b"RIFF" => AudioFormat::Wav,
            b"OggS" => AudioFormat::Ogg,
            b"fLaC" => AudioFormat::Flac,
            // ID3 tag or bare frame sync
            [0xFF, 0xFB, _, _] | [0xFF, 0xFA, _, _] | [b'I', b'D', b'3', _] => AudioFormat::Mp3,
            _ => AudioFormat::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(AudioAsset::detect_format(b"RIFF....WAVE"), AudioFormat::Wav);
        assert_eq!(AudioAsset::detect_format(b"OggS...."), AudioFormat::Ogg);
        assert_eq!(AudioAsset::detect_format(b"fLaC...."), AudioFormat::Flac);
        assert_eq!(AudioAsset::detect_format(b"ID3\x03"), AudioFormat::Mp3);
        assert_eq!(AudioAsset::detect_format(b"ABCD"), AudioFormat::Unknown);
        assert_eq!(AudioAsset::detect_format(b"RI"), AudioFormat::Unknown);
    }

    #[test]
    fn test_empty_data_fails() {
        assert!(matches!(
            AudioAsset::from_bytes(&[]),
            Err(AudioError::InvalidAsset(_))
        ));
    }

    #[test]
    fn test_shared_data_reuses_buffer() {
        let asset = AudioAsset::from_bytes(b"OggS and some payload").unwrap();
        let a = asset.shared_data();
        let b = asset.clone().shared_data();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(asset.format(), AudioFormat::Ogg);
    }
}
