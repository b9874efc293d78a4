//! Top-level soundpad configuration

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::audio::{AudioConfig, DeviceFilter};
use crate::engine::DEFAULT_OUTPUT_GAIN;
use crate::types::MixMode;

/// Everything persisted between sessions
///
/// ```yaml
/// audio:
///   output_device: "CABLE Input (VB-Audio Virtual Cable)"
///   sample_rate: 48000
///   buffer_size: !fixed 256
/// output_gain: 0.8
/// mode: mixed
/// exclude_patterns: [CABLE, VB-Audio, Voicemeeter, BlackHole, Loopback]
/// sounds:
///   airhorn: /home/me/sounds/airhorn.wav
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundpadConfig {
    /// Host, devices and stream format
    pub audio: AudioConfig,
    /// Gain applied to triggered clips (0.0-1.0, clamped on load)
    #[serde(deserialize_with = "deserialize_gain")]
    pub output_gain: f32,
    /// Whether the microphone is mixed under clips
    pub mode: MixMode,
    /// Name patterns hidden from microphone selection
    pub exclude_patterns: DeviceFilter,
    /// Sound manifest: clip id -> audio file
    pub sounds: BTreeMap<String, PathBuf>,
}

impl Default for SoundpadConfig {
    fn default() -> Self {
        Self {
            audio: AudioConfig::default(),
            output_gain: DEFAULT_OUTPUT_GAIN,
            mode: MixMode::default(),
            exclude_patterns: DeviceFilter::default(),
            sounds: BTreeMap::new(),
        }
    }
}

impl SoundpadConfig {
    /// Add or replace a manifest entry; returns the previous path
    pub fn add_sound(&mut self, id: impl Into<String>, path: impl Into<PathBuf>) -> Option<PathBuf> {
        self.sounds.insert(id.into(), path.into())
    }

    pub fn remove_sound(&mut self, id: &str) -> Option<PathBuf> {
        self.sounds.remove(id)
    }
}

/// Out-of-range or non-finite gains from hand-edited files are pulled back in range
fn deserialize_gain<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    let gain = f32::deserialize(deserializer)?;
    if !gain.is_finite() {
        log::warn!("Invalid output_gain {} in config, using default", gain);
        return Ok(DEFAULT_OUTPUT_GAIN);
    }
    Ok(gain.clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::BufferSize;
    use crate::config::{load_config, save_config};

    #[test]
    fn test_defaults() {
        let config = SoundpadConfig::default();
        assert_eq!(config.output_gain, DEFAULT_OUTPUT_GAIN);
        assert_eq!(config.mode, MixMode::Mixed);
        assert!(config.exclude_patterns.excludes("CABLE Output (VB-Audio Virtual Cable)"));
        assert!(config.sounds.is_empty());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let yaml = "mode: pure\nsounds:\n  horn: /tmp/horn.wav\n";
        let config: SoundpadConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.mode, MixMode::Pure);
        assert_eq!(config.output_gain, DEFAULT_OUTPUT_GAIN);
        assert_eq!(config.audio, AudioConfig::default());
        assert_eq!(config.sounds["horn"], PathBuf::from("/tmp/horn.wav"));
    }

    #[test]
    fn test_gain_clamped_on_load() {
        let loud: SoundpadConfig = serde_yaml::from_str("output_gain: 3.5").unwrap();
        assert_eq!(loud.output_gain, 1.0);
        let negative: SoundpadConfig = serde_yaml::from_str("output_gain: -1").unwrap();
        assert_eq!(negative.output_gain, 0.0);
        let nan: SoundpadConfig = serde_yaml::from_str("output_gain: .nan").unwrap();
        assert_eq!(nan.output_gain, DEFAULT_OUTPUT_GAIN);
    }

    #[test]
    fn test_custom_exclude_patterns() {
        let config: SoundpadConfig =
            serde_yaml::from_str("exclude_patterns: [\"Virtual\"]").unwrap();
        assert!(config.exclude_patterns.excludes("my virtual mic"));
        assert!(!config.exclude_patterns.excludes("CABLE Output"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        let mut config = SoundpadConfig::default();
        config.audio = AudioConfig::default()
            .with_output_device("CABLE Input")
            .with_buffer_frames(256);
        config.output_gain = 0.8;
        config.mode = MixMode::Pure;
        config.add_sound("horn", "/tmp/horn.wav");
        config.add_sound("applause", "/tmp/applause.flac");

        save_config(&config, &path).unwrap();
        let loaded: SoundpadConfig = load_config(&path);

        assert_eq!(loaded, config);
        assert_eq!(loaded.audio.buffer_size, BufferSize::Fixed(256));
        let ids: Vec<&String> = loaded.sounds.keys().collect();
        assert_eq!(ids, vec!["applause", "horn"]);
    }

    #[test]
    fn test_manifest_edits() {
        let mut config = SoundpadConfig::default();
        assert_eq!(config.add_sound("a", "/a.wav"), None);
        assert_eq!(config.add_sound("a", "/b.wav"), Some(PathBuf::from("/a.wav")));
        assert_eq!(config.remove_sound("a"), Some(PathBuf::from("/b.wav")));
        assert_eq!(config.remove_sound("a"), None);
    }
}
