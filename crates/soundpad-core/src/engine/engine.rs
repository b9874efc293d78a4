//! SoundpadEngine - the control-plane API
//!
//! Ties the clip store, playback cursor, mixer settings, level meter and
//! stream controller together. Every method here runs on the control
//! thread (UI, hotkeys, CLI); the audio callbacks only ever see the
//! lock-free pieces built in [`SoundpadEngine::start`].
//!
//! ```text
//!  control thread                   input callback      output callback
//!  ─────────────                    ──────────────      ───────────────
//!  trigger/stop/seek ──► PlaybackState ◄──────────────────── Mixer
//!  set_gain/set_mode ──► MixAtomics    ◄──────────────────── Mixer
//!  get_level         ◄── LevelMeter ◄── CaptureWriter ──► CaptureReader
//! ```

use std::path::Path;
use std::sync::Arc;

use super::capture::capture_tap;
use super::clip::{ClipError, ClipNotFound, ClipStore};
use super::meter::LevelMeter;
use super::mixer::Mixer;
use super::playback::{PlaybackState, PlaybackStatus};
use super::settings::MixAtomics;
use super::stream::StreamController;
use crate::audio::{
    AudioBackend, AudioResult, CpalBackend, DeviceDescriptor, DeviceFilter, StreamEvent,
    StreamParams,
};
use crate::audio_file::decode_file;
use crate::config::SoundpadConfig;
use crate::types::{MixMode, Sample, StereoSample};

/// Point-in-time view of the engine for display
#[derive(Debug, Clone, PartialEq)]
pub struct EngineStatus {
    pub playback: PlaybackStatus,
    pub clip: Option<String>,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub gate_open: bool,
    pub output_gain: f32,
    pub mode: MixMode,
    pub level: f32,
    pub peak: f32,
    pub streaming: bool,
}

/// Microphone + clip mixing engine
pub struct SoundpadEngine<B: AudioBackend = CpalBackend> {
    clips: ClipStore,
    playback: Arc<PlaybackState>,
    settings: Arc<MixAtomics>,
    meter: Arc<LevelMeter>,
    streams: StreamController<B>,
}

impl<B: AudioBackend> SoundpadEngine<B> {
    /// Engine at the given stream format with default gain, mode and filter
    pub fn new(backend: B, params: StreamParams) -> Self {
        Self::with_settings(backend, params, MixAtomics::default(), DeviceFilter::default())
    }

    fn with_settings(
        backend: B,
        params: StreamParams,
        settings: MixAtomics,
        filter: DeviceFilter,
    ) -> Self {
        log::info!(
            "Soundpad engine: {} Hz, gain {:.2}, mode {}",
            params.sample_rate,
            settings.gain(),
            settings.mode()
        );
        Self {
            clips: ClipStore::new(params.sample_rate),
            playback: Arc::new(PlaybackState::new()),
            settings: Arc::new(settings),
            meter: Arc::new(LevelMeter::new()),
            streams: StreamController::new(backend, params, filter),
        }
    }

    /// Engine configured from persisted settings
    ///
    /// Configured devices that no longer exist are logged and left
    /// unselected, so `start()` falls back to the host defaults. Sounds in
    /// the manifest are not loaded here; see [`Self::preload_manifest`].
    pub fn from_config(backend: B, config: &SoundpadConfig) -> Self {
        let mut engine = Self::with_settings(
            backend,
            config.audio.stream_params(),
            MixAtomics::new(config.output_gain, config.mode),
            config.exclude_patterns.clone(),
        );

        if let Some(name) = config.audio.input_device.as_deref() {
            if let Err(e) = engine.select_input_device(name) {
                log::warn!("Configured input device unavailable ({}), using default", e);
            }
        }
        if let Some(name) = config.audio.output_device.as_deref() {
            if let Err(e) = engine.select_output_device(name) {
                log::warn!("Configured output device unavailable ({}), using default", e);
            }
        }
        engine
    }

    // ─────────────────────────────────────────────────────────────
    // Clips
    // ─────────────────────────────────────────────────────────────

    /// Store a decoded clip (replaces any clip with the same id)
    pub fn preload(
        &mut self,
        id: &str,
        samples: &[Sample],
        channels: u16,
        sample_rate: u32,
    ) -> Result<(), ClipError> {
        self.clips.preload(id, samples, channels, sample_rate)?;
        Ok(())
    }

    /// Decode an audio file and store it under `id`
    pub fn preload_clip(&mut self, id: &str, path: &Path) -> Result<(), ClipError> {
        let audio = decode_file(path)?;
        let clip = self
            .clips
            .preload(id, &audio.samples, audio.channels, audio.sample_rate)?;
        log::debug!(
            "Loaded clip '{}' from {:?} ({:.2}s)",
            id,
            path,
            clip.duration_secs()
        );
        Ok(())
    }

    /// Load every sound in a config manifest
    ///
    /// Failing entries are logged and skipped. Returns the failures.
    pub fn preload_manifest(&mut self, config: &SoundpadConfig) -> Vec<(String, ClipError)> {
        let mut failures = Vec::new();
        for (id, path) in &config.sounds {
            if let Err(e) = self.preload_clip(id, path) {
                log::warn!("Skipping sound '{}': {}", id, e);
                failures.push((id.clone(), e));
            }
        }
        failures
    }

    /// Remove a clip; a playback already reading it finishes normally
    pub fn unload(&mut self, id: &str) -> bool {
        self.clips.unload(id)
    }

    pub fn clip_ids(&self) -> Vec<String> {
        self.clips.ids()
    }

    pub fn has_clip(&self, id: &str) -> bool {
        self.clips.contains(id)
    }

    /// Length of a loaded clip in seconds
    pub fn clip_duration(&self, id: &str) -> Option<f64> {
        self.clips.get(id).map(|clip| clip.duration_secs())
    }

    // ─────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────

    /// Play a clip from its start, opening the push-to-talk gate
    pub fn trigger(&self, id: &str) -> Result<(), ClipNotFound> {
        let clip = self
            .clips
            .get(id)
            .ok_or_else(|| ClipNotFound(id.to_string()))?;
        log::debug!("Trigger '{}'", id);
        self.playback.arm(clip);
        Ok(())
    }

    /// Stop playback and close the gate
    pub fn stop(&self) {
        self.playback.stop();
    }

    pub fn open_gate(&self) {
        self.playback.open_gate();
    }

    pub fn close_gate(&self) {
        self.playback.close_gate();
    }

    /// Move the playback position; returns false if ignored
    pub fn seek(&self, seconds: f64) -> bool {
        self.playback.seek(seconds)
    }

    pub fn get_position(&self) -> f64 {
        self.playback.position_secs()
    }

    pub fn get_duration(&self) -> f64 {
        self.playback.duration_secs()
    }

    pub fn playback_status(&self) -> PlaybackStatus {
        self.playback.status()
    }

    pub fn is_gate_open(&self) -> bool {
        self.playback.is_gate_open()
    }

    // ─────────────────────────────────────────────────────────────
    // Mix settings and metering
    // ─────────────────────────────────────────────────────────────

    /// Set the clip gain (clamped to 0.0-1.0); returns the stored value
    pub fn set_output_gain(&self, gain: f32) -> f32 {
        self.settings.set_gain(gain)
    }

    pub fn output_gain(&self) -> f32 {
        self.settings.gain()
    }

    pub fn set_mode(&self, mode: MixMode) {
        log::info!("Mix mode: {}", mode);
        self.settings.set_mode(mode);
    }

    pub fn mode(&self) -> MixMode {
        self.settings.mode()
    }

    /// RMS of the latest microphone block (0 before any capture)
    pub fn get_level(&self) -> f32 {
        self.meter.level()
    }

    pub fn get_peak(&self) -> f32 {
        self.meter.peak()
    }

    // ─────────────────────────────────────────────────────────────
    // Devices and streams
    // ─────────────────────────────────────────────────────────────

    pub fn enumerate_output_devices(&self) -> AudioResult<Vec<DeviceDescriptor>> {
        self.streams.enumerate_output_devices()
    }

    pub fn enumerate_input_devices(&self) -> AudioResult<Vec<DeviceDescriptor>> {
        self.streams.enumerate_input_devices()
    }

    pub fn select_input_device(&mut self, name: &str) -> AudioResult<DeviceDescriptor> {
        self.streams.select_input_device(name)
    }

    pub fn select_output_device(&mut self, name: &str) -> AudioResult<DeviceDescriptor> {
        self.streams.select_output_device(name)
    }

    pub fn selected_input(&self) -> Option<&DeviceDescriptor> {
        self.streams.selected_input()
    }

    pub fn selected_output(&self) -> Option<&DeviceDescriptor> {
        self.streams.selected_output()
    }

    pub fn stream_params(&self) -> StreamParams {
        self.streams.params()
    }

    /// Open the capture and output streams and start mixing
    ///
    /// A fresh capture tap and mixer are built for every start; playback,
    /// settings and the meter carry over. Does nothing when already running.
    pub fn start(&mut self) -> AudioResult<()> {
        if self.streams.is_running() {
            return Ok(());
        }

        self.meter.reset();
        let (mut writer, reader) = capture_tap(Arc::clone(&self.meter));
        let mut mixer = Mixer::new(
            reader,
            Arc::clone(&self.playback),
            Arc::clone(&self.settings),
        );

        self.streams.start(
            Box::new(move |data: &[f32], channels: u16| writer.publish(data, channels)),
            Box::new(move |out: &mut [StereoSample]| mixer.process(out)),
        )
    }

    /// Close both streams; safe when not running
    pub fn stop_stream(&mut self) {
        self.streams.stop();
        self.meter.reset();
    }

    pub fn is_streaming(&self) -> bool {
        self.streams.is_running()
    }

    /// Stream errors reported since the last call
    pub fn drain_events(&self) -> Vec<StreamEvent> {
        self.streams.events().try_iter().collect()
    }

    pub fn status(&self) -> EngineStatus {
        EngineStatus {
            playback: self.playback.status(),
            clip: self.playback.current_clip_id(),
            position_secs: self.playback.position_secs(),
            duration_secs: self.playback.duration_secs(),
            gate_open: self.playback.is_gate_open(),
            output_gain: self.settings.gain(),
            mode: self.settings.mode(),
            level: self.meter.level(),
            peak: self.meter.peak(),
            streaming: self.streams.is_running(),
        }
    }
}
