//! Lock-free mixer settings
//!
//! Written by the control plane, read by the mixer every cycle. Values are
//! validated on write so a reader can never observe an out-of-range gain,
//! even mid-update.

use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};

use crate::types::MixMode;

/// Output gain of a fresh install
pub const DEFAULT_OUTPUT_GAIN: f32 = 0.5;

/// Gain and mode shared between the control plane and the mixer
pub struct MixAtomics {
    /// Output gain applied to the clip contribution, stored as f32 bits
    gain: AtomicU32,
    /// Mixing mode: 0=Mixed, 1=Pure
    mode: AtomicU8,
}

impl MixAtomics {
    pub fn new(gain: f32, mode: MixMode) -> Self {
        let atomics = Self {
            gain: AtomicU32::new(DEFAULT_OUTPUT_GAIN.to_bits()),
            mode: AtomicU8::new(mode as u8),
        };
        atomics.set_gain(gain);
        atomics
    }

    /// Set the output gain, clamped to 0.0..=1.0
    ///
    /// Non-finite values are ignored. Returns the stored value.
    pub fn set_gain(&self, gain: f32) -> f32 {
        if !gain.is_finite() {
            log::warn!("Ignoring non-finite output gain {}", gain);
            return self.gain();
        }
        let clamped = gain.clamp(0.0, 1.0);
        self.gain.store(clamped.to_bits(), Ordering::Relaxed);
        clamped
    }

    #[inline]
    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn set_mode(&self, mode: MixMode) {
        self.mode.store(mode as u8, Ordering::Relaxed);
    }

    #[inline]
    pub fn mode(&self) -> MixMode {
        MixMode::from_u8(self.mode.load(Ordering::Relaxed))
    }
}

impl Default for MixAtomics {
    fn default() -> Self {
        Self::new(DEFAULT_OUTPUT_GAIN, MixMode::default())
    }
}
