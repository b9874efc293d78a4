//! Soundpad Core - microphone + sound clip mixing engine
//!
//! Mixes a live microphone with triggered sound clips and writes the result
//! to a (usually virtual) output device, so voice-chat applications receive
//! both as a single input.

pub mod audio;
pub mod audio_file;
pub mod config;
pub mod engine;
pub mod types;

pub use types::*;
