//! Persisted configuration
//!
//! The engine reads a [`SoundpadConfig`] at startup; front-ends write it
//! back whenever the user changes a device, the gain, the mode or the
//! sound manifest.
//!
//! ```ignore
//! use soundpad_core::config::{default_config_path, load_config, save_config, SoundpadConfig};
//!
//! let path = default_config_path();
//! let mut config: SoundpadConfig = load_config(&path);
//! config.output_gain = 0.8;
//! save_config(&config, &path)?;
//! ```

mod io;
mod paths;
mod soundpad;

pub use io::{load_config, save_config};
pub use paths::{default_config_dir, default_config_path, CONFIG_FILE_NAME};
pub use soundpad::SoundpadConfig;
