//! Audio device descriptors and selection helpers
//!
//! Devices are enumerated from the backend on demand. Nothing here caches a
//! device list: every selection runs against a fresh enumeration so a
//! replugged or renamed device is never resolved against stale data.

use serde::{Deserialize, Serialize};

use super::error::{AudioError, AudioResult};

/// Default name patterns hidden from microphone selection
///
/// These match the common loopback/virtual-cable drivers. Hiding them keeps
/// a user from routing the virtual device back into itself.
pub const DEFAULT_EXCLUDE_PATTERNS: [&str; 5] =
    ["CABLE", "VB-Audio", "Voicemeeter", "BlackHole", "Loopback"];

/// Information about an audio device as reported by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceDescriptor {
    /// Position in the host's device enumeration
    pub index: usize,
    /// Human-readable device name (also the persisted identifier)
    pub name: String,
    /// Host backend name (e.g., "ALSA", "WASAPI")
    pub host: String,
    /// Device can capture audio
    pub input: bool,
    /// Device can play audio
    pub output: bool,
}

impl DeviceDescriptor {
    pub fn new(index: usize, name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            index,
            name: name.into(),
            host: host.into(),
            input: false,
            output: false,
        }
    }

    pub fn with_input(mut self) -> Self {
        self.input = true;
        self
    }

    pub fn with_output(mut self) -> Self {
        self.output = true;
        self
    }
}

impl std::fmt::Display for DeviceDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Show host prefix for clarity, e.g., "[ALSA] hw:0,0"
        write!(f, "[{}] {}", self.host, self.name)
    }
}

/// Name-based exclusion predicate for input enumeration
///
/// Matches case-insensitively on substrings of the device name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceFilter {
    patterns: Vec<String>,
}

impl DeviceFilter {
    /// Filter that excludes nothing
    pub fn none() -> Self {
        Self { patterns: Vec::new() }
    }

    /// Filter excluding any device whose name contains one of `patterns`
    pub fn name_contains<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns
                .into_iter()
                .map(Into::into)
                .filter(|p: &String| !p.trim().is_empty())
                .collect(),
        }
    }

    /// Whether a device name should be hidden
    pub fn excludes(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.patterns
            .iter()
            .any(|pattern| name.contains(&pattern.to_lowercase()))
    }
}

impl Default for DeviceFilter {
    fn default() -> Self {
        Self::name_contains(DEFAULT_EXCLUDE_PATTERNS)
    }
}

/// Output-capable devices, in enumeration order
pub fn output_devices(devices: Vec<DeviceDescriptor>) -> Vec<DeviceDescriptor> {
    devices.into_iter().filter(|d| d.output).collect()
}

/// Input-capable devices that the exclusion predicate does not hide
pub fn input_devices<F>(devices: Vec<DeviceDescriptor>, exclude: F) -> Vec<DeviceDescriptor>
where
    F: Fn(&str) -> bool,
{
    devices
        .into_iter()
        .filter(|d| d.input && !exclude(&d.name))
        .collect()
}

/// Resolve a selection query against a device list
///
/// An exact (case-insensitive) name match wins; otherwise the first device
/// whose name contains the query is chosen.
pub fn find_device(devices: &[DeviceDescriptor], query: &str) -> AudioResult<DeviceDescriptor> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Err(AudioError::DeviceNotFound(query.to_string()));
    }

    devices
        .iter()
        .find(|d| d.name.to_lowercase() == needle)
        .or_else(|| devices.iter().find(|d| d.name.to_lowercase().contains(&needle)))
        .cloned()
        .ok_or_else(|| AudioError::DeviceNotFound(query.to_string()))
}
