//! Audio sprite metadata
//!
//! An audio sprite is one asset holding many short clips. Its sprite map names
//! each clip with a start and end offset. The manager reads the map through
//! [`AudioSpriteCache`] and turns every entry into a marker.

use crate::audio::sound::SoundMarker;
use crate::audio::AudioError;
use crate::config::SoundOverrides;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// One clip inside an audio sprite
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteEntry {
    /// Clip start in seconds
    pub start: f64,
    /// Clip end in seconds
    pub end: f64,
    /// Loop the clip
    #[serde(rename = "loop", default)]
    pub looped: bool,
}

impl SpriteEntry {
    /// Length of the clip
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Marker equivalent of this clip
    pub fn to_marker(&self, name: &str) -> SoundMarker {
        SoundMarker::new(name, self.start, Some(self.duration()))
            .with_config(SoundOverrides::default().with_loop(self.looped))
    }
}

/// Parsed audiosprite JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AudioSpriteData {
    /// Files the sprite was encoded into
    #[serde(default)]
    pub resources: Vec<String>,
    /// Clips by name, iterated in name order
    pub spritemap: BTreeMap<String, SpriteEntry>,
}

impl AudioSpriteData {
    /// Parse audiosprite JSON and validate every clip
    pub fn from_json(json: &str) -> Result<Self, AudioError> {
        let data: Self =
            serde_json::from_str(json).map_err(|e| AudioError::InvalidSpriteData(e.to_string()))?;
        data.validate()?;
        Ok(data)
    }

    /// Reject clips that end before they start or sit at negative offsets
    pub fn validate(&self) -> Result<(), AudioError> {
        for (name, entry) in &self.spritemap {
            if !entry.start.is_finite() || !entry.end.is_finite() || entry.start < 0.0 || entry.end < entry.start {
                return Err(AudioError::InvalidSpriteData(format!(
                    "sprite '{}' has invalid range {}..{}",
                    name, entry.start, entry.end
                )));
            }
        }
        Ok(())
    }
}

/// Source of sprite maps, keyed like the audio assets
pub trait AudioSpriteCache {
    /// Sprite map for `key`, if cached
    fn sprite_map(&self, key: &str) -> Option<&AudioSpriteData>;
}

/// In-memory sprite map cache
#[derive(Debug, Default)]
pub struct SpriteMapCache {
    entries: HashMap<String, AudioSpriteData>,
}

impl SpriteMapCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Store already parsed data, replacing any previous entry
    pub fn insert(&mut self, key: impl Into<String>, data: AudioSpriteData) {
        self.entries.insert(key.into(), data);
    }

    /// Parse and store audiosprite JSON
    pub fn load_json(&mut self, key: impl Into<String>, json: &str) -> Result<(), AudioError> {
        let key = key.into();
        let data = AudioSpriteData::from_json(json)?;
        log::debug!("Cached audio sprite '{}' with {} clips", key, data.spritemap.len());
        self.entries.insert(key, data);
        Ok(())
    }

    /// Read, parse and store an audiosprite JSON file
    pub fn load_file<P: AsRef<Path>>(&mut self, key: impl Into<String>, path: P) -> Result<(), AudioError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            AudioError::InvalidSpriteData(format!("Failed to read {}: {}", path.display(), e))
        })?;
        self.load_json(key, &json)
    }

    /// Drop a cached entry
    pub fn remove(&mut self, key: &str) -> Option<AudioSpriteData> {
        self.entries.remove(key)
    }

    /// Check whether a key is cached
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
}

impl AudioSpriteCache for SpriteMapCache {
    fn sprite_map(&self, key: &str) -> Option<&AudioSpriteData> {
        self.entries.get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const FX_JSON: &str = r#"{
        "resources": ["fx.ogg", "fx.mp3"],
        "spritemap": {
            "jump": { "start": 0, "end": 0.5, "loop": false },
            "land": { "start": 0.5, "end": 1.2 }
        }
    }"#;

    #[test]
    fn test_parse_audiosprite_json() {
        let data = AudioSpriteData::from_json(FX_JSON).unwrap();
        assert_eq!(data.resources.len(), 2);
        assert_eq!(data.spritemap.len(), 2);
        assert_relative_eq!(data.spritemap["land"].duration(), 0.7, epsilon = 1e-9);
        assert!(!data.spritemap["land"].looped);
    }

    #[test]
    fn test_invalid_range_rejected() {
        let json = r#"{ "spritemap": { "bad": { "start": 2.0, "end": 1.0 } } }"#;
        assert!(matches!(
            AudioSpriteData::from_json(json),
            Err(AudioError::InvalidSpriteData(_))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(AudioSpriteData::from_json("{ not json").is_err());
    }

    #[test]
    fn test_cache_lookup() {
        let mut cache = SpriteMapCache::new();
        cache.load_json("fx", FX_JSON).unwrap();
        assert!(cache.contains("fx"));
        assert!(cache.sprite_map("fx").is_some());
        assert!(cache.sprite_map("music").is_none());
        assert!(cache.remove("fx").is_some());
        assert!(!cache.contains("fx"));
    }

    #[test]
    fn test_entry_to_marker_carries_loop() {
        let entry = SpriteEntry { start: 1.0, end: 3.0, looped: true };
        let marker = entry.to_marker("hum");
        assert_eq!(marker.name, "hum");
        assert_eq!(marker.duration, Some(2.0));
        assert_eq!(marker.config.looped, Some(true));
        assert_eq!(marker.config.volume, None);
    }
}
