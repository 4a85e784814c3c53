//! Configuration system
//!
//! Serializable settings for the sound manager and for individual sounds.
//! Files are read and written as TOML or RON depending on their extension.

pub use serde::{Serialize, Deserialize};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Values that parse but make no sense
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// # Sound Manager Configuration
///
/// Initial global state for a [`SoundManager`](crate::audio::SoundManager).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundManagerConfig {
    /// Forward host focus changes to the backend
    pub pause_on_blur: bool,
    /// Global mute flag
    pub mute: bool,
    /// Global volume multiplier
    pub volume: f32,
    /// Global playback-rate multiplier
    pub rate: f32,
    /// Global detune in cents
    pub detune: f32,
}

impl SoundManagerConfig {
    /// Disable or enable the blur/focus policy
    pub fn with_pause_on_blur(mut self, enabled: bool) -> Self {
        self.pause_on_blur = enabled;
        self
    }

    /// Set the initial global rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the initial global detune
    pub fn with_detune(mut self, detune: f32) -> Self {
        self.detune = detune;
        self
    }

    /// Set the initial global volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.volume.is_finite() || self.volume < 0.0 {
            return Err(ConfigError::Invalid(format!("volume must be >= 0, got {}", self.volume)));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(ConfigError::Invalid(format!("rate must be > 0, got {}", self.rate)));
        }
        if !self.detune.is_finite() || !crate::audio::DETUNE_RANGE.contains(&self.detune) {
            return Err(ConfigError::Invalid(format!(
                "detune must be within -1200..=1200 cents, got {}",
                self.detune
            )));
        }
        Ok(())
    }
}

impl Default for SoundManagerConfig {
    fn default() -> Self {
        Self {
            pause_on_blur: true,
            mute: false,
            volume: 1.0,
            rate: 1.0,
            detune: 0.0,
        }
    }
}

impl Config for SoundManagerConfig {}

/// # Sound Configuration
///
/// Per-instance playback settings. Used when creating a sound, when playing it
/// inline, and as the override attached to a marker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Instance mute flag
    pub mute: bool,
    /// Instance volume
    pub volume: f32,
    /// Instance playback rate
    pub rate: f32,
    /// Instance detune in cents
    pub detune: f32,
    /// Start offset in seconds
    pub seek: f64,
    /// Restart when the end is reached
    #[serde(rename = "loop")]
    pub looped: bool,
    /// Delay before playback starts, in seconds
    pub delay: f64,
}

impl SoundConfig {
    /// Set looping
    pub fn with_loop(mut self, looped: bool) -> Self {
        self.looped = looped;
        self
    }

    /// Set the instance rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = rate;
        self
    }

    /// Set the instance detune
    pub fn with_detune(mut self, detune: f32) -> Self {
        self.detune = detune;
        self
    }

    /// Set the instance volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = volume;
        self
    }

    /// Set the start offset
    pub fn with_seek(mut self, seek: f64) -> Self {
        self.seek = seek;
        self
    }

    /// Set the start delay
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            mute: false,
            volume: 1.0,
            rate: 1.0,
            detune: 0.0,
            seek: 0.0,
            looped: false,
            delay: 0.0,
        }
    }
}

impl Config for SoundConfig {}

/// # Sound Overrides
///
/// Partial [`SoundConfig`] layered on top of another one. Markers carry one,
/// and so does an inline play request; unset fields keep the value below.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundOverrides {
    /// Instance mute flag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mute: Option<bool>,
    /// Instance volume
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    /// Instance playback rate
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate: Option<f32>,
    /// Instance detune in cents
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detune: Option<f32>,
    /// Start offset in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seek: Option<f64>,
    /// Restart when the end is reached
    #[serde(rename = "loop", skip_serializing_if = "Option::is_none")]
    pub looped: Option<bool>,
    /// Delay before playback starts, in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delay: Option<f64>,
}

impl SoundOverrides {
    /// Override muting
    pub fn with_mute(mut self, mute: bool) -> Self {
        self.mute = Some(mute);
        self
    }

    /// Override looping
    pub fn with_loop(mut self, looped: bool) -> Self {
        self.looped = Some(looped);
        self
    }

    /// Override the instance rate
    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Override the instance detune
    pub fn with_detune(mut self, detune: f32) -> Self {
        self.detune = Some(detune);
        self
    }

    /// Override the instance volume
    pub fn with_volume(mut self, volume: f32) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Override the start offset
    pub fn with_seek(mut self, seek: f64) -> Self {
        self.seek = Some(seek);
        self
    }

    /// Override the start delay
    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = Some(delay);
        self
    }

    /// `base` with every set field replaced
    pub fn apply(&self, base: &SoundConfig) -> SoundConfig {
        SoundConfig {
            mute: self.mute.unwrap_or(base.mute),
            volume: self.volume.unwrap_or(base.volume),
            rate: self.rate.unwrap_or(base.rate),
            detune: self.detune.unwrap_or(base.detune),
            seek: self.seek.unwrap_or(base.seek),
            looped: self.looped.unwrap_or(base.looped),
            delay: self.delay.unwrap_or(base.delay),
        }
    }
}
