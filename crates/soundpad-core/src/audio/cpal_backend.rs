//! CPAL audio backend implementation
//!
//! Opens one capture stream (microphone) and one playback stream (virtual
//! output device) on a single cpal host.
//!
//! ```text
//! ┌──────────────────┐   publish()    ┌──────────────────┐
//! │  Input Callback  │───────────────►│   Capture Tap    │  most-recent-value
//! │ (mic, HW thread) │                │ (triple buffer)  │  slot, no queue
//! └──────────────────┘                └────────┬─────────┘
//!                                              │ latest()
//! ┌──────────────────┐                ┌────────▼─────────┐
//! │  Control Plane   │──atomics/CAS──►│  Output Callback │──► virtual device
//! │ (UI / hotkeys)   │                │     (Mixer)      │
//! └──────────────────┘                └──────────────────┘
//! ```
//!
//! Both streams are opened as f32. The output is always two channels so the
//! device buffer can be handed to the mixer as `&mut [StereoSample]` without
//! copying. Capture prefers two channels and falls back to mono.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize as CpalBufferSize, BuildStreamError, Host, HostId, SampleFormat, Stream, StreamConfig};
use crossbeam::channel::Sender;

use super::backend::{AudioBackend, InputCallback, OutputCallback, StreamDirection, StreamEvent};
use super::config::StreamParams;
use super::device::DeviceDescriptor;
use super::error::{AudioError, AudioResult};
use crate::types::StereoSample;

/// Get a human-readable name for a host ID
fn host_name(host_id: HostId) -> String {
    // Use the debug representation which gives us the variant name
    let name = format!("{:?}", host_id);
    match name.as_str() {
        "Alsa" => "ALSA".to_string(),
        "Jack" => "JACK".to_string(),
        "Wasapi" => "WASAPI".to_string(),
        "Asio" => "ASIO".to_string(),
        _ => name,
    }
}

/// Names of every audio host compiled into cpal and available at runtime
pub fn available_host_names() -> Vec<String> {
    cpal::available_hosts().into_iter().map(host_name).collect()
}

/// cpal-backed implementation of [`AudioBackend`]
pub struct CpalBackend {
    host: Host,
    host_name: String,
}

impl CpalBackend {
    /// Backend on the platform's default host
    pub fn new() -> Self {
        let host = cpal::default_host();
        let host_name = host_name(host.id());
        Self { host, host_name }
    }

    /// Backend on a named host (case-insensitive), e.g. "JACK" or "ALSA"
    pub fn with_host(name: &str) -> AudioResult<Self> {
        for host_id in cpal::available_hosts() {
            let candidate = host_name(host_id);
            if candidate.eq_ignore_ascii_case(name) {
                let host = cpal::host_from_id(host_id)
                    .map_err(|e| AudioError::HostUnavailable(format!("{}: {}", name, e)))?;
                return Ok(Self {
                    host,
                    host_name: candidate,
                });
            }
        }
        Err(AudioError::HostUnavailable(format!(
            "{} (available: {})",
            name,
            available_host_names().join(", ")
        )))
    }

    /// Backend from an optional configured host name
    pub fn from_config(host: Option<&str>) -> AudioResult<Self> {
        match host {
            Some(name) => Self::with_host(name),
            None => Ok(Self::new()),
        }
    }

    /// Name of the host this backend enumerates
    pub fn host_name(&self) -> &str {
        &self.host_name
    }

    fn describe(&self, index: usize, device: &cpal::Device) -> Option<DeviceDescriptor> {
        let name = device.name().ok()?;
        let input = device
            .supported_input_configs()
            .map(|mut configs| configs.next().is_some())
            .unwrap_or(false);
        let output = device
            .supported_output_configs()
            .map(|mut configs| configs.next().is_some())
            .unwrap_or(false);

        Some(DeviceDescriptor {
            index,
            name,
            host: self.host_name.clone(),
            input,
            output,
        })
    }

    /// Resolve a descriptor back to a live cpal device by name
    fn find_device(&self, descriptor: &DeviceDescriptor) -> AudioResult<cpal::Device> {
        self.host
            .devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?
            .find(|d: &cpal::Device| d.name().ok().as_deref() == Some(descriptor.name.as_str()))
            .ok_or_else(|| AudioError::DeviceUnavailable(descriptor.name.clone()))
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Map cpal build errors; a vanished device is "unavailable", not a build bug
fn map_build_error(device: &str, err: BuildStreamError) -> AudioError {
    match err {
        BuildStreamError::DeviceNotAvailable => AudioError::DeviceUnavailable(device.to_string()),
        BuildStreamError::StreamConfigNotSupported => AudioError::DeviceUnavailable(format!(
            "{}: stream configuration not supported",
            device
        )),
        other => AudioError::StreamBuildError(format!("{}: {}", device, other)),
    }
}

fn buffer_size_to_cpal(params: &StreamParams) -> CpalBufferSize {
    match params.buffer_size.as_frames() {
        Some(frames) => CpalBufferSize::Fixed(frames),
        None => CpalBufferSize::Default,
    }
}

/// Pick an f32 config at the operating rate, preferring `channels` in order
fn pick_config<I>(configs: I, sample_rate: u32, channels: &[u16]) -> Option<u16>
where
    I: Iterator<Item = cpal::SupportedStreamConfigRange>,
{
    let usable: Vec<_> = configs
        .filter(|c| c.sample_format() == SampleFormat::F32)
        .filter(|c| sample_rate >= c.min_sample_rate().0 && sample_rate <= c.max_sample_rate().0)
        .collect();

    channels
        .iter()
        .copied()
        .find(|wanted| usable.iter().any(|c| c.channels() == *wanted))
}

fn error_reporter(
    direction: StreamDirection,
    events: Sender<StreamEvent>,
) -> impl FnMut(cpal::StreamError) + Send + 'static {
    move |err| {
        log::error!("Audio {} stream error: {}", direction, err);
        // Control plane may not be draining events; never block the host thread
        let _ = events.try_send(StreamEvent::Error {
            direction,
            message: err.to_string(),
        });
    }
}

impl AudioBackend for CpalBackend {
    type Stream = Stream;

    fn devices(&self) -> AudioResult<Vec<DeviceDescriptor>> {
        let devices = self
            .host
            .devices()
            .map_err(|e| AudioError::ConfigError(e.to_string()))?;

        let descriptors: Vec<DeviceDescriptor> = devices
            .enumerate()
            .filter_map(|(index, device)| self.describe(index, &device))
            .collect();

        log::debug!(
            "Enumerated {} audio devices on host {}",
            descriptors.len(),
            self.host_name
        );

        if descriptors.is_empty() {
            return Err(AudioError::NoDevices);
        }
        Ok(descriptors)
    }

    fn default_input_device(&self) -> Option<DeviceDescriptor> {
        let name = self.host.default_input_device()?.name().ok()?;
        self.devices().ok()?.into_iter().find(|d| d.input && d.name == name)
    }

    fn default_output_device(&self) -> Option<DeviceDescriptor> {
        let name = self.host.default_output_device()?.name().ok()?;
        self.devices().ok()?.into_iter().find(|d| d.output && d.name == name)
    }

    fn open_input(
        &self,
        descriptor: &DeviceDescriptor,
        params: &StreamParams,
        mut callback: InputCallback,
        events: Sender<StreamEvent>,
    ) -> AudioResult<Stream> {
        let device = self.find_device(descriptor)?;
        let configs = device
            .supported_input_configs()
            .map_err(|e| AudioError::DeviceUnavailable(format!("{}: {}", descriptor.name, e)))?;

        let channels = pick_config(configs, params.sample_rate, &[params.channels, 1])
            .ok_or_else(|| {
                AudioError::DeviceUnavailable(format!(
                    "{}: no f32 capture format at {}Hz",
                    descriptor.name, params.sample_rate
                ))
            })?;

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: buffer_size_to_cpal(params),
        };

        log::info!(
            "Opening input '{}': {} channels, {}Hz, buffer {:?}",
            descriptor.name,
            channels,
            params.sample_rate,
            params.buffer_size
        );

        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _info: &cpal::InputCallbackInfo| {
                    callback(data, channels);
                },
                error_reporter(StreamDirection::Input, events),
                None,
            )
            .map_err(|e| map_build_error(&descriptor.name, e))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(format!("Input: {}", e)))?;

        Ok(stream)
    }

    fn open_output(
        &self,
        descriptor: &DeviceDescriptor,
        params: &StreamParams,
        mut callback: OutputCallback,
        events: Sender<StreamEvent>,
    ) -> AudioResult<Stream> {
        let device = self.find_device(descriptor)?;
        let configs = device
            .supported_output_configs()
            .map_err(|e| AudioError::DeviceUnavailable(format!("{}: {}", descriptor.name, e)))?;

        let channels = pick_config(configs, params.sample_rate, &[params.channels])
            .ok_or_else(|| {
                AudioError::DeviceUnavailable(format!(
                    "{}: no stereo f32 playback format at {}Hz",
                    descriptor.name, params.sample_rate
                ))
            })?;

        let config = StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(params.sample_rate),
            buffer_size: buffer_size_to_cpal(params),
        };

        log::info!(
            "Opening output '{}': {} channels, {}Hz, buffer {:?}",
            descriptor.name,
            channels,
            params.sample_rate,
            params.buffer_size
        );

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _info: &cpal::OutputCallbackInfo| {
                    // Stereo buffers are always even; guard anyway so the cast can't panic
                    let usable = data.len() - data.len() % 2;
                    let (frames, tail) = data.split_at_mut(usable);
                    tail.fill(0.0);
                    callback(bytemuck::cast_slice_mut::<f32, StereoSample>(frames));
                },
                error_reporter(StreamDirection::Output, events),
                None,
            )
            .map_err(|e| map_build_error(&descriptor.name, e))?;

        stream
            .play()
            .map_err(|e| AudioError::StreamPlayError(format!("Output: {}", e)))?;

        Ok(stream)
    }
}
