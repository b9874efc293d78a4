//! Common types for Soundpad
//!
//! The engine works on one fixed format: 32-bit float, stereo, interleaved.
//! Everything that crosses a module boundary is expressed in `StereoSample`
//! frames so the mixer never has to think about channel layout.

/// Default operating sample rate (48kHz)
///
/// Every preloaded clip must be at the operating rate; there is no resampling.
pub const SAMPLE_RATE: u32 = 48000;

/// Channel width of every stream and clip
pub const CHANNELS: u16 = 2;

/// Maximum capture block size to pre-allocate (frames)
/// Common hardware values: 64, 128, 256, 512, 1024, 2048, 4096 frames
pub const MAX_BUFFER_SIZE: usize = 8192;

/// One channel value
pub type Sample = f32;

/// One interleaved stereo frame
///
/// `#[repr(C)]` fixes the layout to `[left, right]`, so an output device
/// buffer of interleaved `f32` can be viewed as `&mut [StereoSample]`
/// with `bytemuck::cast_slice_mut` and no copy.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    /// Zero frame
    #[inline]
    pub fn silence() -> Self {
        Self::default()
    }

    /// Same value on both channels
    #[inline]
    pub fn mono(value: Sample) -> Self {
        Self { left: value, right: value }
    }

    /// Sum of squares of both channels (used for RMS metering)
    #[inline]
    pub fn energy(&self) -> Sample {
        self.left * self.left + self.right * self.right
    }

    /// Larger absolute value of the two channels
    #[inline]
    pub fn peak(&self) -> Sample {
        self.left.abs().max(self.right.abs())
    }
}

impl std::ops::Add for StereoSample {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            left: self.left + other.left,
            right: self.right + other.right,
        }
    }
}

impl std::ops::AddAssign for StereoSample {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.left += other.left;
        self.right += other.right;
    }
}

impl std::ops::Mul<Sample> for StereoSample {
    type Output = Self;

    #[inline]
    fn mul(self, factor: Sample) -> Self {
        Self {
            left: self.left * factor,
            right: self.right * factor,
        }
    }
}

/// Convert an interleaved buffer with 1 or 2 channels into stereo frames
///
/// Mono input is duplicated into both channels. A trailing partial frame
/// (odd stereo length) is dropped. Returns `None` for other channel counts.
pub fn frames_from_interleaved(samples: &[Sample], channels: u16) -> Option<Vec<StereoSample>> {
    match channels {
        1 => Some(samples.iter().map(|&s| StereoSample::mono(s)).collect()),
        2 => Some(
            samples
                .chunks_exact(2)
                .map(|chunk| StereoSample::new(chunk[0], chunk[1]))
                .collect(),
        ),
        _ => None,
    }
}

/// Mixing mode for the output bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum MixMode {
    /// Microphone capture + triggered clip
    #[default]
    Mixed = 0,
    /// Triggered clip only, microphone excluded
    Pure = 1,
}

impl MixMode {
    /// Decode from the atomic representation (unknown values fall back to Mixed)
    #[inline]
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => MixMode::Pure,
            _ => MixMode::Mixed,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MixMode::Mixed => "mixed",
            MixMode::Pure => "pure",
        }
    }
}

impl std::str::FromStr for MixMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mixed" => Ok(MixMode::Mixed),
            "pure" => Ok(MixMode::Pure),
            other => Err(format!("unknown mix mode '{}' (expected mixed or pure)", other)),
        }
    }
}

impl std::fmt::Display for MixMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
