//! Stream configuration
//!
//! Persisted device selection plus the format parameters every stream is
//! opened with. The channel width is fixed (stereo) and not configurable.

use serde::{Deserialize, Serialize};

use crate::types::{CHANNELS, SAMPLE_RATE};

/// Smallest fixed buffer size accepted (frames)
pub const MIN_BUFFER_SIZE: u32 = 32;

/// Preferred buffer size for audio streams
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BufferSize {
    /// Let the host choose its default buffer size
    #[default]
    Default,
    /// Request a specific buffer size in frames (may be adjusted by the host)
    Fixed(u32),
}

impl BufferSize {
    /// Get the buffer size in frames, or None for host default
    pub fn as_frames(&self) -> Option<u32> {
        match self {
            BufferSize::Default => None,
            BufferSize::Fixed(frames) => {
                Some((*frames).clamp(MIN_BUFFER_SIZE, crate::types::MAX_BUFFER_SIZE as u32))
            }
        }
    }

    /// Calculate latency in milliseconds for a given sample rate
    pub fn latency_ms(&self, sample_rate: u32) -> Option<f32> {
        self.as_frames()
            .map(|frames| (frames as f32 / sample_rate as f32) * 1000.0)
    }
}

/// Format parameters shared by the input and output stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamParams {
    /// Operating sample rate (Hz)
    pub sample_rate: u32,
    /// Stream channel width (always stereo)
    pub channels: u16,
    /// Preferred hardware buffer size
    pub buffer_size: BufferSize,
}

impl StreamParams {
    pub fn new(sample_rate: u32, buffer_size: BufferSize) -> Self {
        Self {
            sample_rate,
            channels: CHANNELS,
            buffer_size,
        }
    }
}

impl Default for StreamParams {
    fn default() -> Self {
        Self::new(SAMPLE_RATE, BufferSize::Default)
    }
}

/// Persisted audio configuration
///
/// Device names are stored as reported by the host. They are resolved
/// against a fresh enumeration at startup, never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Audio host name (e.g. "ALSA", "JACK", "WASAPI"); None = default host
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    /// Microphone device name (None = host default input)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_device: Option<String>,
    /// Virtual output device name (None = host default output)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_device: Option<String>,
    /// Operating sample rate; all clips must share it
    pub sample_rate: u32,
    /// Preferred buffer size
    pub buffer_size: BufferSize,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            host: None,
            input_device: None,
            output_device: None,
            sample_rate: SAMPLE_RATE,
            buffer_size: BufferSize::default(),
        }
    }
}

impl AudioConfig {
    /// Stream parameters derived from this configuration
    pub fn stream_params(&self) -> StreamParams {
        StreamParams::new(self.sample_rate, self.buffer_size)
    }

    /// Set the output device
    pub fn with_output_device(mut self, name: impl Into<String>) -> Self {
        self.output_device = Some(name.into());
        self
    }

    /// Set the input device
    pub fn with_input_device(mut self, name: impl Into<String>) -> Self {
        self.input_device = Some(name.into());
        self
    }

    /// Set a fixed buffer size in frames
    pub fn with_buffer_frames(mut self, frames: u32) -> Self {
        self.buffer_size = BufferSize::Fixed(frames);
        self
    }

    /// Set the operating sample rate
    pub fn with_sample_rate(mut self, rate: u32) -> Self {
        self.sample_rate = rate;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_size_clamps_fixed_frames() {
        assert_eq!(BufferSize::Default.as_frames(), None);
        assert_eq!(BufferSize::Fixed(4).as_frames(), Some(MIN_BUFFER_SIZE));
        assert_eq!(BufferSize::Fixed(512).as_frames(), Some(512));
        assert_eq!(BufferSize::Fixed(1 << 20).as_frames(), Some(8192));
    }

    #[test]
    fn test_latency_ms() {
        let latency = BufferSize::Fixed(480).latency_ms(48000).unwrap();
        assert!((latency - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_stream_params_are_stereo() {
        let params = AudioConfig::default().with_sample_rate(44100).stream_params();
        assert_eq!(params.channels, 2);
        assert_eq!(params.sample_rate, 44100);
    }

    #[test]
    fn test_audio_config_yaml_defaults() {
        let config: AudioConfig = serde_yaml::from_str("output_device: CABLE Input\n").unwrap();
        assert_eq!(config.output_device.as_deref(), Some("CABLE Input"));
        assert_eq!(config.sample_rate, SAMPLE_RATE);
        assert_eq!(config.buffer_size, BufferSize::Default);
    }
}
