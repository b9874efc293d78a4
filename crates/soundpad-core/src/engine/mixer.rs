//! Mixer - the output callback body
//!
//! Runs once per output buffer request. Each cycle:
//! 1. Takes the latest published capture block (any length)
//! 2. Renders the clip contribution at the current gain (zero-padded to F)
//! 3. Fits the capture block to F frames (truncate or zero-pad)
//! 4. Combines per gate and mode:
//!
//! | gate   | mode  | output                 |
//! |--------|-------|------------------------|
//! | closed | any   | silence                |
//! | open   | Pure  | clip                   |
//! | open   | Mixed | capture + clip         |
//!
//! Mixed summation is not clipped or limited; loud capture plus a loud
//! clip can exceed [-1, 1].

use std::sync::Arc;

use super::capture::CaptureReader;
use super::playback::PlaybackState;
use super::settings::MixAtomics;
use crate::types::{MixMode, StereoSample};

/// Owned by the output callback; everything it shares is lock-free
pub struct Mixer {
    capture: CaptureReader,
    playback: Arc<PlaybackState>,
    settings: Arc<MixAtomics>,
}

impl Mixer {
    pub fn new(
        capture: CaptureReader,
        playback: Arc<PlaybackState>,
        settings: Arc<MixAtomics>,
    ) -> Self {
        Self {
            capture,
            playback,
            settings,
        }
    }

    /// Fill `out` with one cycle of mixed audio
    ///
    /// Bounded time, no allocation, no locks.
    pub fn process(&mut self, out: &mut [StereoSample]) {
        let capture = self.capture.latest();
        let gain = self.settings.gain();
        let mode = self.settings.mode();

        let advance = self.playback.advance(out, gain);

        if !advance.gate_open {
            out.fill(StereoSample::silence());
            return;
        }

        if mode == MixMode::Mixed {
            // zip() truncates a longer capture block; a shorter one leaves
            // the tail as clip-only, i.e. capture zero-padded
            for (dst, src) in out.iter_mut().zip(capture) {
                *dst += *src;
            }
        }
    }
}
