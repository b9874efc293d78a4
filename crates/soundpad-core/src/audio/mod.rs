//! Host audio abstraction for Soundpad
//!
//! The engine core talks to the host only through [`AudioBackend`]:
//! enumerate devices, open a capture stream and a playback stream, drop
//! them to stop. [`CpalBackend`] is the production implementation.
//!
//! # Real-time contract
//!
//! - Callbacks run on host threads and must never block, allocate or unwind
//! - Dropping a stream handle closes it; no callback is scheduled afterwards
//! - Host-side errors arrive as [`StreamEvent`]s on a channel, never inside
//!   a callback

mod backend;
mod config;
mod cpal_backend;
mod device;
mod error;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    AudioBackend, InputCallback, OutputCallback, StreamDirection, StreamEvent,
};
pub use config::{AudioConfig, BufferSize, StreamParams, MIN_BUFFER_SIZE};
pub use cpal_backend::{available_host_names, CpalBackend};
pub use device::{
    find_device, input_devices, output_devices, DeviceDescriptor, DeviceFilter,
    DEFAULT_EXCLUDE_PATTERNS,
};
pub use error::{AudioError, AudioResult};
