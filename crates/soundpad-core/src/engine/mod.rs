//! Audio engine - clip store, playback, capture, mixing, streams
//!
//! This module contains the real-time core and its control-plane facade:
//! - ClipStore: preloaded clips keyed by id
//! - PlaybackState: armed clip, cursor and push-to-talk gate (lock-free)
//! - Capture tap: most-recent-value hand-off of microphone blocks
//! - Mixer: the output callback body
//! - StreamController: input/output stream lifecycle and device selection
//! - SoundpadEngine: control-plane API tying everything together

mod capture;
mod clip;
mod engine;
pub mod gc;
mod meter;
mod mixer;
mod playback;
mod settings;
mod stream;

pub use capture::*;
pub use clip::*;
pub use engine::*;
pub use meter::*;
pub use mixer::*;
pub use playback::*;
pub use settings::*;
pub use stream::*;
