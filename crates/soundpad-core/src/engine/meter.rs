//! Level Meter - instantaneous microphone loudness for UI display
//!
//! The capture callback measures each block as it publishes it and stores
//! the result in atomics, so the UI never has to touch sample data.

use std::sync::atomic::{AtomicU32, Ordering};

use crate::types::StereoSample;

/// Floor reported by [`to_dbfs`] for silence
pub const DBFS_FLOOR: f32 = -96.0;

/// Root-mean-square over both channels of a block (0 for an empty block)
pub fn rms(frames: &[StereoSample]) -> f32 {
    if frames.is_empty() {
        return 0.0;
    }
    let energy: f32 = frames.iter().map(StereoSample::energy).sum();
    (energy / (frames.len() * 2) as f32).sqrt()
}

/// Largest absolute sample in a block
pub fn peak(frames: &[StereoSample]) -> f32 {
    frames.iter().map(StereoSample::peak).fold(0.0, f32::max)
}

/// Convert a linear level to dBFS, clamped at [`DBFS_FLOOR`]
pub fn to_dbfs(level: f32) -> f32 {
    if level <= 0.0 || !level.is_finite() {
        return DBFS_FLOOR;
    }
    (20.0 * level.log10()).max(DBFS_FLOOR)
}

/// Lock-free level readings of the most recent capture block
///
/// Written by the capture callback, read by anyone. Both values start at 0,
/// which is what a meter with no captured frame yet should show.
pub struct LevelMeter {
    rms: AtomicU32,
    peak: AtomicU32,
}

impl LevelMeter {
    pub fn new() -> Self {
        Self {
            rms: AtomicU32::new(0.0f32.to_bits()),
            peak: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    /// Measure and publish a block (capture thread)
    #[inline]
    pub fn update(&self, frames: &[StereoSample]) {
        self.rms.store(rms(frames).to_bits(), Ordering::Relaxed);
        self.peak.store(peak(frames).to_bits(), Ordering::Relaxed);
    }

    /// RMS of the most recent block
    #[inline]
    pub fn level(&self) -> f32 {
        f32::from_bits(self.rms.load(Ordering::Relaxed))
    }

    /// Peak of the most recent block
    #[inline]
    pub fn peak(&self) -> f32 {
        f32::from_bits(self.peak.load(Ordering::Relaxed))
    }

    /// Reset to "nothing captured"
    pub fn reset(&self) {
        self.rms.store(0.0f32.to_bits(), Ordering::Relaxed);
        self.peak.store(0.0f32.to_bits(), Ordering::Relaxed);
    }
}

impl Default for LevelMeter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rms_of_constant_signal() {
        let frames = vec![StereoSample::mono(0.5); 64];
        assert!((rms(&frames) - 0.5).abs() < 1e-6);
        assert_eq!(rms(&[]), 0.0);
    }

    #[test]
    fn test_rms_of_square_wave() {
        let frames: Vec<_> = (0..100)
            .map(|i| StereoSample::mono(if i % 2 == 0 { 0.8 } else { -0.8 }))
            .collect();
        assert!((rms(&frames) - 0.8).abs() < 1e-6);
        assert!((peak(&frames) - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_meter_starts_at_zero() {
        let meter = LevelMeter::new();
        assert_eq!(meter.level(), 0.0);
        meter.update(&[StereoSample::new(1.0, 0.0)]);
        assert!((meter.level() - std::f32::consts::FRAC_1_SQRT_2).abs() < 1e-6);
        assert_eq!(meter.peak(), 1.0);
        meter.reset();
        assert_eq!(meter.level(), 0.0);
    }

    #[test]
    fn test_dbfs() {
        assert_eq!(to_dbfs(0.0), DBFS_FLOOR);
        assert!((to_dbfs(1.0)).abs() < 1e-6);
        assert!((to_dbfs(0.5) + 6.0206).abs() < 1e-3);
        assert_eq!(to_dbfs(1e-9), DBFS_FLOOR);
    }
}
