//! Scripted backend for tests
//!
//! Holds the callbacks handed to it instead of running them on hardware
//! threads, so tests can invoke capture and output cycles one at a time.

use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam::channel::Sender;

use super::backend::{AudioBackend, InputCallback, OutputCallback, StreamDirection, StreamEvent};
use super::config::StreamParams;
use super::device::DeviceDescriptor;
use super::error::{AudioError, AudioResult};
use crate::types::StereoSample;

#[derive(Default)]
struct FakeState {
    devices: Vec<DeviceDescriptor>,
    default_input: Option<String>,
    default_output: Option<String>,
    unavailable: Vec<String>,
    input: Option<InputCallback>,
    output: Option<OutputCallback>,
    events: Option<Sender<StreamEvent>>,
    opened: usize,
    last_params: Option<StreamParams>,
}

#[derive(Clone, Default)]
pub(crate) struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

/// Dropping the stream removes its callback, like closing a hardware stream
pub(crate) struct FakeStream {
    state: Arc<Mutex<FakeState>>,
    direction: StreamDirection,
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        let mut state = self.state.lock().unwrap();
        match self.direction {
            StreamDirection::Input => state.input = None,
            StreamDirection::Output => state.output = None,
        }
    }
}

impl FakeBackend {
    /// Backend with a microphone, a virtual cable pair and speakers
    pub fn with_standard_devices() -> Self {
        let backend = Self::default();
        {
            let mut state = backend.lock();
            state.devices = vec![
                DeviceDescriptor::new(0, "Built-in Microphone", "Fake").with_input(),
                DeviceDescriptor::new(1, "CABLE Output (VB-Audio Virtual Cable)", "Fake")
                    .with_input(),
                DeviceDescriptor::new(2, "CABLE Input (VB-Audio Virtual Cable)", "Fake")
                    .with_output(),
                DeviceDescriptor::new(3, "Speakers", "Fake").with_output(),
            ];
            state.default_input = Some("Built-in Microphone".to_string());
            state.default_output = Some("Speakers".to_string());
        }
        backend
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn set_devices(&self, devices: Vec<DeviceDescriptor>) {
        self.lock().devices = devices;
    }

    pub fn clear_defaults(&self) {
        let mut state = self.lock();
        state.default_input = None;
        state.default_output = None;
    }

    /// Make opening `name` fail as if the driver were missing
    pub fn mark_unavailable(&self, name: &str) {
        self.lock().unavailable.push(name.to_string());
    }

    pub fn is_input_open(&self) -> bool {
        self.lock().input.is_some()
    }

    pub fn is_output_open(&self) -> bool {
        self.lock().output.is_some()
    }

    /// Number of successful stream opens so far
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    pub fn last_params(&self) -> Option<StreamParams> {
        self.lock().last_params
    }

    /// Run one capture callback; false if no input stream is open
    pub fn capture(&self, data: &[f32], channels: u16) -> bool {
        let mut state = self.lock();
        match state.input.as_mut() {
            Some(callback) => {
                callback(data, channels);
                true
            }
            None => false,
        }
    }

    /// Run one output callback for `frames` frames
    pub fn render(&self, frames: usize) -> Option<Vec<StereoSample>> {
        let mut state = self.lock();
        let callback = state.output.as_mut()?;
        let mut buffer = vec![StereoSample::new(9.0, 9.0); frames];
        callback(&mut buffer);
        Some(buffer)
    }

    /// Report a host error the way a running stream would
    pub fn emit_error(&self, direction: StreamDirection, message: &str) {
        if let Some(events) = self.lock().events.as_ref() {
            let _ = events.try_send(StreamEvent::Error {
                direction,
                message: message.to_string(),
            });
        }
    }

    fn check_available(&self, device: &DeviceDescriptor) -> AudioResult<()> {
        let state = self.lock();
        let listed = state.devices.iter().any(|d| d.name == device.name);
        if !listed || state.unavailable.contains(&device.name) {
            return Err(AudioError::DeviceUnavailable(device.name.clone()));
        }
        Ok(())
    }
}

impl AudioBackend for FakeBackend {
    type Stream = FakeStream;

    fn devices(&self) -> AudioResult<Vec<DeviceDescriptor>> {
        let state = self.lock();
        if state.devices.is_empty() {
            return Err(AudioError::NoDevices);
        }
        Ok(state.devices.clone())
    }

    fn default_input_device(&self) -> Option<DeviceDescriptor> {
        let state = self.lock();
        let name = state.default_input.as_ref()?;
        state.devices.iter().find(|d| &d.name == name).cloned()
    }

    fn default_output_device(&self) -> Option<DeviceDescriptor> {
        let state = self.lock();
        let name = state.default_output.as_ref()?;
        state.devices.iter().find(|d| &d.name == name).cloned()
    }

    fn open_input(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        callback: InputCallback,
        events: Sender<StreamEvent>,
    ) -> AudioResult<FakeStream> {
        self.check_available(device)?;
        let mut state = self.lock();
        state.input = Some(callback);
        state.events = Some(events);
        state.opened += 1;
        state.last_params = Some(*params);
        Ok(FakeStream {
            state: Arc::clone(&self.state),
            direction: StreamDirection::Input,
        })
    }

    fn open_output(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        callback: OutputCallback,
        events: Sender<StreamEvent>,
    ) -> AudioResult<FakeStream> {
        self.check_available(device)?;
        let mut state = self.lock();
        state.output = Some(callback);
        state.events = Some(events);
        state.opened += 1;
        state.last_params = Some(*params);
        Ok(FakeStream {
            state: Arc::clone(&self.state),
            direction: StreamDirection::Output,
        })
    }
}
