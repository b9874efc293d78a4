//! Audio backend trait for host-specific implementations
//!
//! The engine core only depends on this interface. A backend enumerates
//! devices and opens streams that invoke the engine's callbacks on the
//! host's real-time threads. Dropping a stream closes it: callbacks already
//! in flight may complete, but no new ones are scheduled afterwards.
//!
//! Callbacks must never block, allocate or panic. Backends must not
//! propagate errors into them; host-side stream errors are reported through
//! [`StreamEvent`] instead.

use crossbeam::channel::Sender;

use super::config::StreamParams;
use super::device::DeviceDescriptor;
use super::error::AudioResult;
use crate::types::StereoSample;

/// Capture callback: one hardware block of interleaved samples plus its
/// channel count (1 or 2)
pub type InputCallback = Box<dyn FnMut(&[f32], u16) + Send + 'static>;

/// Output callback: fill every frame of the destination buffer
pub type OutputCallback = Box<dyn FnMut(&mut [StereoSample]) + Send + 'static>;

/// Which stream a [`StreamEvent`] refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamDirection {
    Input,
    Output,
}

impl std::fmt::Display for StreamDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamDirection::Input => f.write_str("input"),
            StreamDirection::Output => f.write_str("output"),
        }
    }
}

/// Asynchronous notification from a running stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The host reported an error on a running stream
    Error {
        direction: StreamDirection,
        message: String,
    },
}

/// Host audio subsystem abstraction
pub trait AudioBackend {
    /// Open stream handle; dropping it closes the stream
    type Stream;

    /// Enumerate every device the host exposes, with capability flags
    fn devices(&self) -> AudioResult<Vec<DeviceDescriptor>>;

    /// Host default input device, if any
    fn default_input_device(&self) -> Option<DeviceDescriptor>;

    /// Host default output device, if any
    fn default_output_device(&self) -> Option<DeviceDescriptor>;

    /// Open and start a capture stream on `device`
    fn open_input(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        callback: InputCallback,
        events: Sender<StreamEvent>,
    ) -> AudioResult<Self::Stream>;

    /// Open and start a playback stream on `device`
    fn open_output(
        &self,
        device: &DeviceDescriptor,
        params: &StreamParams,
        callback: OutputCallback,
        events: Sender<StreamEvent>,
    ) -> AudioResult<Self::Stream>;
}
