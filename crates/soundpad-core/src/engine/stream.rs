//! Stream Controller - hardware stream lifecycle and device selection
//!
//! Owns the input (capture) and output (mix) streams of one engine. Both are
//! opened together and closed together: a running controller always has
//! both, a stopped one has neither.
//!
//! Device lists are enumerated from the backend on every call; nothing is
//! cached between a listing and a selection.

use crossbeam::channel::{self, Receiver, Sender};

use crate::audio::{
    find_device, input_devices, output_devices, AudioBackend, AudioError, AudioResult,
    DeviceDescriptor, DeviceFilter, InputCallback, OutputCallback, StreamEvent, StreamParams,
};

/// Capacity of the stream event channel; events beyond it are dropped
const EVENT_CAPACITY: usize = 64;

/// Both streams of a running controller
///
/// Field order is drop order: the output (mixer) stream closes first.
/// The stream handles are only held, never read.
struct ActiveStreams<S> {
    _output: S,
    _input: S,
    output_device: DeviceDescriptor,
    input_device: DeviceDescriptor,
}

pub struct StreamController<B: AudioBackend> {
    backend: B,
    params: StreamParams,
    filter: DeviceFilter,
    input_device: Option<DeviceDescriptor>,
    output_device: Option<DeviceDescriptor>,
    active: Option<ActiveStreams<B::Stream>>,
    event_tx: Sender<StreamEvent>,
    event_rx: Receiver<StreamEvent>,
}

impl<B: AudioBackend> StreamController<B> {
    pub fn new(backend: B, params: StreamParams, filter: DeviceFilter) -> Self {
        let (event_tx, event_rx) = channel::bounded(EVENT_CAPACITY);
        Self {
            backend,
            params,
            filter,
            input_device: None,
            output_device: None,
            active: None,
            event_tx,
            event_rx,
        }
    }

    pub fn params(&self) -> StreamParams {
        self.params
    }

    // ─────────────────────────────────────────────────────────────
    // Enumeration
    // ─────────────────────────────────────────────────────────────

    pub fn enumerate_output_devices(&self) -> AudioResult<Vec<DeviceDescriptor>> {
        Ok(output_devices(self.backend.devices()?))
    }

    /// Input devices with the configured filter applied
    pub fn enumerate_input_devices(&self) -> AudioResult<Vec<DeviceDescriptor>> {
        self.enumerate_input_devices_with(|name| self.filter.excludes(name))
    }

    /// Input devices with a caller-supplied exclusion predicate
    pub fn enumerate_input_devices_with<F>(&self, exclude: F) -> AudioResult<Vec<DeviceDescriptor>>
    where
        F: Fn(&str) -> bool,
    {
        let devices = input_devices(self.backend.devices()?, exclude);
        log::debug!("{} input device(s) after filtering", devices.len());
        Ok(devices)
    }

    // ─────────────────────────────────────────────────────────────
    // Selection
    // ─────────────────────────────────────────────────────────────

    /// Select the capture device by name
    ///
    /// Only devices surviving the filter can be selected. A running stream
    /// keeps its current device until it is stopped and started again.
    pub fn select_input_device(&mut self, name: &str) -> AudioResult<DeviceDescriptor> {
        let device = find_device(&self.enumerate_input_devices()?, name)?;
        log::info!("Input device selected: {}", device);
        if self.is_running() {
            log::info!("Input change takes effect on the next stream start");
        }
        self.input_device = Some(device.clone());
        Ok(device)
    }

    /// Select the output (usually virtual) device by name
    pub fn select_output_device(&mut self, name: &str) -> AudioResult<DeviceDescriptor> {
        let device = find_device(&self.enumerate_output_devices()?, name)?;
        log::info!("Output device selected: {}", device);
        if self.is_running() {
            log::info!("Output change takes effect on the next stream start");
        }
        self.output_device = Some(device.clone());
        Ok(device)
    }

    pub fn selected_input(&self) -> Option<&DeviceDescriptor> {
        self.input_device.as_ref()
    }

    pub fn selected_output(&self) -> Option<&DeviceDescriptor> {
        self.output_device.as_ref()
    }

    // ─────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────

    pub fn is_running(&self) -> bool {
        self.active.is_some()
    }

    /// Devices the running streams were opened on
    pub fn running_devices(&self) -> Option<(&DeviceDescriptor, &DeviceDescriptor)> {
        self.active
            .as_ref()
            .map(|a| (&a.input_device, &a.output_device))
    }

    /// Open and start both streams
    ///
    /// Unselected devices fall back to the host defaults. If either stream
    /// fails to open, the other is closed again and the error is returned.
    /// Does nothing (and drops the callbacks) when already running.
    pub fn start(&mut self, input: InputCallback, output: OutputCallback) -> AudioResult<()> {
        if self.is_running() {
            log::debug!("Streams already running, start ignored");
            return Ok(());
        }

        let input_device = match &self.input_device {
            Some(device) => device.clone(),
            None => self.backend.default_input_device().ok_or_else(|| {
                AudioError::DeviceUnavailable("no default input device".to_string())
            })?,
        };
        let output_device = match &self.output_device {
            Some(device) => device.clone(),
            None => self.backend.default_output_device().ok_or_else(|| {
                AudioError::DeviceUnavailable("no default output device".to_string())
            })?,
        };

        log::info!(
            "Starting streams: {} -> {} ({} Hz, {:?})",
            input_device,
            output_device,
            self.params.sample_rate,
            self.params.buffer_size
        );

        let output_stream = self
            .backend
            .open_output(&output_device, &self.params, output, self.event_tx.clone())
            .map_err(|e| {
                log::error!("Failed to open output stream on {}: {}", output_device, e);
                e
            })?;

        // On failure `output_stream` is dropped here, closing it again
        let input_stream = self
            .backend
            .open_input(&input_device, &self.params, input, self.event_tx.clone())
            .map_err(|e| {
                log::error!("Failed to open input stream on {}: {}", input_device, e);
                e
            })?;

        self.active = Some(ActiveStreams {
            _output: output_stream,
            _input: input_stream,
            output_device,
            input_device,
        });
        Ok(())
    }

    /// Close both streams; does nothing when not running
    pub fn stop(&mut self) {
        if let Some(active) = self.active.take() {
            drop(active);
            log::info!("Streams stopped");
        }
    }

    /// Receiver for host stream errors reported after start
    pub fn events(&self) -> &Receiver<StreamEvent> {
        &self.event_rx
    }
}

impl<B: AudioBackend> Drop for StreamController<B> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::testing::FakeBackend;
    use crate::audio::{BufferSize, StreamDirection};
    use crate::types::StereoSample;

    fn controller() -> (StreamController<FakeBackend>, FakeBackend) {
        let backend = FakeBackend::with_standard_devices();
        let params = StreamParams::new(48000, BufferSize::Fixed(256));
        (
            StreamController::new(backend.clone(), params, DeviceFilter::default()),
            backend,
        )
    }

    fn noop_input() -> InputCallback {
        Box::new(|_data: &[f32], _channels: u16| {})
    }

    fn constant_output(value: f32) -> OutputCallback {
        Box::new(move |out: &mut [StereoSample]| out.fill(StereoSample::mono(value)))
    }

    fn names(devices: &[DeviceDescriptor]) -> Vec<&str> {
        devices.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn test_enumeration_hides_virtual_inputs() {
        let (controller, _backend) = controller();
        let inputs = controller.enumerate_input_devices().unwrap();
        assert_eq!(names(&inputs), vec!["Built-in Microphone"]);

        let outputs = controller.enumerate_output_devices().unwrap();
        assert_eq!(
            names(&outputs),
            vec!["CABLE Input (VB-Audio Virtual Cable)", "Speakers"]
        );
    }

    #[test]
    fn test_enumeration_with_custom_predicate() {
        let (controller, _backend) = controller();
        let all = controller.enumerate_input_devices_with(|_| false).unwrap();
        assert_eq!(all.len(), 2);
        let none = controller
            .enumerate_input_devices_with(|name| name.contains("Microphone"))
            .unwrap();
        assert_eq!(names(&none), vec!["CABLE Output (VB-Audio Virtual Cable)"]);
    }

    #[test]
    fn test_enumeration_is_never_stale() {
        let (controller, backend) = controller();
        backend.set_devices(vec![
            DeviceDescriptor::new(0, "USB Mic", "Fake").with_input(),
        ]);
        let inputs = controller.enumerate_input_devices().unwrap();
        assert_eq!(names(&inputs), vec!["USB Mic"]);

        backend.set_devices(Vec::new());
        assert_eq!(
            controller.enumerate_output_devices(),
            Err(AudioError::NoDevices)
        );
    }

    #[test]
    fn test_select_devices() {
        let (mut controller, _backend) = controller();

        let output = controller.select_output_device("cable").unwrap();
        assert_eq!(output.name, "CABLE Input (VB-Audio Virtual Cable)");
        assert_eq!(controller.selected_output(), Some(&output));

        let input = controller.select_input_device("built-in microphone").unwrap();
        assert_eq!(input.name, "Built-in Microphone");

        // Virtual cable is filtered out of input selection
        assert_eq!(
            controller.select_input_device("CABLE Output"),
            Err(AudioError::DeviceNotFound("CABLE Output".to_string()))
        );
        assert!(matches!(
            controller.select_output_device("Headphones"),
            Err(AudioError::DeviceNotFound(_))
        ));
        // A failed selection keeps the previous one
        assert_eq!(controller.selected_input(), Some(&input));
    }

    #[test]
    fn test_start_uses_defaults_and_params() {
        let (mut controller, backend) = controller();
        controller.start(noop_input(), constant_output(0.5)).unwrap();

        assert!(controller.is_running());
        assert!(backend.is_input_open());
        assert!(backend.is_output_open());
        let (input, output) = controller.running_devices().unwrap();
        assert_eq!(input.name, "Built-in Microphone");
        assert_eq!(output.name, "Speakers");
        assert_eq!(backend.last_params(), Some(controller.params()));

        let rendered = backend.render(4).unwrap();
        assert!(rendered.iter().all(|f| *f == StereoSample::mono(0.5)));
    }

    #[test]
    fn test_start_without_defaults_fails() {
        let (mut controller, backend) = controller();
        backend.clear_defaults();
        assert!(matches!(
            controller.start(noop_input(), constant_output(0.0)),
            Err(AudioError::DeviceUnavailable(_))
        ));
        assert!(!controller.is_running());
        assert_eq!(backend.opened(), 0);
    }

    #[test]
    fn test_start_is_all_or_nothing() {
        let (mut controller, backend) = controller();
        controller.select_output_device("CABLE Input").unwrap();
        backend.mark_unavailable("Built-in Microphone");

        let result = controller.start(noop_input(), constant_output(0.0));
        assert_eq!(
            result,
            Err(AudioError::DeviceUnavailable("Built-in Microphone".to_string()))
        );
        assert!(!controller.is_running());
        assert!(!backend.is_output_open());
        assert!(!backend.is_input_open());
    }

    #[test]
    fn test_missing_virtual_device_is_unavailable() {
        let (mut controller, backend) = controller();
        controller.select_output_device("CABLE Input").unwrap();
        backend.mark_unavailable("CABLE Input (VB-Audio Virtual Cable)");

        assert!(matches!(
            controller.start(noop_input(), constant_output(0.0)),
            Err(AudioError::DeviceUnavailable(_))
        ));
        assert!(!backend.is_input_open());

        // Retry after reconfiguration
        controller.select_output_device("Speakers").unwrap();
        controller.start(noop_input(), constant_output(0.0)).unwrap();
        assert!(controller.is_running());
    }

    #[test]
    fn test_start_twice_is_noop() {
        let (mut controller, backend) = controller();
        controller.start(noop_input(), constant_output(0.25)).unwrap();
        controller.start(noop_input(), constant_output(0.75)).unwrap();

        assert_eq!(backend.opened(), 2);
        let rendered = backend.render(2).unwrap();
        assert_eq!(rendered[0], StereoSample::mono(0.25));
    }

    #[test]
    fn test_stop_closes_both_and_is_safe_when_stopped() {
        let (mut controller, backend) = controller();
        controller.stop();

        controller.start(noop_input(), constant_output(0.0)).unwrap();
        controller.stop();
        assert!(!controller.is_running());
        assert!(!backend.is_input_open());
        assert!(!backend.is_output_open());
        assert!(backend.render(4).is_none());

        controller.stop();
        controller.start(noop_input(), constant_output(0.0)).unwrap();
        assert_eq!(backend.opened(), 4);
    }

    #[test]
    fn test_selection_while_running_keeps_streams() {
        let (mut controller, backend) = controller();
        controller.start(noop_input(), constant_output(0.0)).unwrap();
        controller.select_output_device("CABLE").unwrap();

        assert!(controller.is_running());
        assert_eq!(backend.opened(), 2);
        assert_eq!(controller.running_devices().unwrap().1.name, "Speakers");
    }

    #[test]
    fn test_stream_errors_are_forwarded() {
        let (mut controller, backend) = controller();
        controller.start(noop_input(), constant_output(0.0)).unwrap();
        backend.emit_error(StreamDirection::Output, "device disconnected");

        assert_eq!(
            controller.events().try_recv().unwrap(),
            StreamEvent::Error {
                direction: StreamDirection::Output,
                message: "device disconnected".to_string(),
            }
        );
        assert!(controller.events().try_recv().is_err());
    }

    #[test]
    fn test_drop_closes_streams() {
        let (mut controller, backend) = controller();
        controller.start(noop_input(), constant_output(0.0)).unwrap();
        drop(controller);
        assert!(!backend.is_input_open());
        assert!(!backend.is_output_open());
    }
}
