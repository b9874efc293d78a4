//! Clip Store - preloaded, decoded sound clips keyed by identifier
//!
//! Clips are immutable once stored. Re-preloading an id swaps in a new
//! `Shared<Clip>`; a playback that already holds the old one keeps reading
//! it until it finishes (copy-on-replace, never in-place mutation).

use std::collections::HashMap;
use std::path::PathBuf;

use basedrop::{Handle, Shared};
use thiserror::Error;

use super::gc::gc_handle;
use crate::types::{frames_from_interleaved, Sample, StereoSample};

/// Reference to a stored clip, cheap to clone and safe to drop on any thread
pub type ClipRef = Shared<Clip>;

/// Errors rejecting a clip at preload time
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipError {
    /// Clip rate differs from the engine's operating rate (no resampling)
    #[error("Sample rate mismatch: engine={expected}Hz, clip={actual}Hz")]
    SampleRateMismatch { expected: u32, actual: u32 },

    /// Buffer holds no complete frame
    #[error("Clip contains no samples")]
    EmptyClip,

    /// Only mono and stereo sources are accepted
    #[error("Unsupported channel count: {0} (expected 1 or 2)")]
    UnsupportedChannels(u16),

    /// Frame count does not fit the playback cursor
    #[error("Clip too long: {frames} frames")]
    TooLong { frames: usize },

    /// File could not be read or decoded
    #[error("Failed to decode {path:?}: {reason}")]
    Decode { path: PathBuf, reason: String },
}

/// Soft error: trigger requested an id that is not loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Clip not found: {0}")]
pub struct ClipNotFound(pub String);

/// A decoded, stereo, engine-rate sound clip
#[derive(Debug)]
pub struct Clip {
    id: String,
    frames: Vec<StereoSample>,
    sample_rate: u32,
}

impl Clip {
    /// Identifier the clip was stored under
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Stereo frames
    #[inline]
    pub fn frames(&self) -> &[StereoSample] {
        &self.frames
    }

    /// Length in frames
    #[inline]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false for stored clips (empty buffers are rejected)
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames.len() as f64 / self.sample_rate as f64
    }
}

/// Holds every preloaded clip for one engine
pub struct ClipStore {
    clips: HashMap<String, ClipRef>,
    sample_rate: u32,
    gc: Handle,
}

impl ClipStore {
    /// Create an empty store accepting clips at `sample_rate`
    pub fn new(sample_rate: u32) -> Self {
        Self {
            clips: HashMap::new(),
            sample_rate,
            gc: gc_handle(),
        }
    }

    /// Operating sample rate clips must match
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Store a clip from interleaved samples, replacing any clip with the same id
    ///
    /// Mono input is duplicated to stereo. The previous clip under `id` stays
    /// alive for as long as a playback still references it.
    pub fn preload(
        &mut self,
        id: impl Into<String>,
        samples: &[Sample],
        channels: u16,
        sample_rate: u32,
    ) -> Result<ClipRef, ClipError> {
        let id = id.into();

        if sample_rate != self.sample_rate {
            return Err(ClipError::SampleRateMismatch {
                expected: self.sample_rate,
                actual: sample_rate,
            });
        }

        let frames = frames_from_interleaved(samples, channels)
            .ok_or(ClipError::UnsupportedChannels(channels))?;

        if channels == 2 && samples.len() % 2 != 0 {
            log::warn!("Clip '{}' has an odd stereo sample count, dropping last sample", id);
        }
        if frames.is_empty() {
            return Err(ClipError::EmptyClip);
        }
        if frames.len() > u32::MAX as usize {
            return Err(ClipError::TooLong { frames: frames.len() });
        }

        let clip = Shared::new(
            &self.gc,
            Clip {
                id: id.clone(),
                frames,
                sample_rate,
            },
        );

        log::info!(
            "Preloaded clip '{}' ({} frames, {:.2}s)",
            id,
            clip.len(),
            clip.duration_secs()
        );

        if self.clips.insert(id.clone(), Shared::clone(&clip)).is_some() {
            log::debug!("Clip '{}' replaced", id);
        }
        Ok(clip)
    }

    /// Look up a clip; a missing id is a normal outcome
    pub fn get(&self, id: &str) -> Option<ClipRef> {
        self.clips.get(id).map(Shared::clone)
    }

    /// Remove a clip; returns whether it was present
    pub fn unload(&mut self, id: &str) -> bool {
        let removed = self.clips.remove(id).is_some();
        if removed {
            log::info!("Unloaded clip '{}'", id);
        }
        removed
    }

    pub fn contains(&self, id: &str) -> bool {
        self.clips.contains_key(id)
    }

    /// Stored ids, sorted
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clips.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}
