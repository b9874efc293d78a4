//! Console session: one engine, its persisted config and the gate timer

use std::path::PathBuf;
use std::time::Instant;

use soundpad_core::audio::{AudioBackend, AudioResult, DeviceDescriptor, StreamEvent};
use soundpad_core::config::{save_config, SoundpadConfig};
use soundpad_core::engine::{to_dbfs, SoundpadEngine};

use crate::command::{Command, HELP};
use crate::gate::GateTimer;

pub struct Session<B: AudioBackend> {
    pub engine: SoundpadEngine<B>,
    config: SoundpadConfig,
    config_path: PathBuf,
    gate: GateTimer,
}

impl<B: AudioBackend> Session<B> {
    pub fn new(engine: SoundpadEngine<B>, config: SoundpadConfig, config_path: PathBuf) -> Self {
        Self {
            engine,
            config,
            config_path,
            gate: GateTimer::default(),
        }
    }

    fn save(&self) {
        if let Err(e) = save_config(&self.config, &self.config_path) {
            log::error!("Failed to save config: {:#}", e);
        }
    }

    /// Close the gate once the playing clip has run out
    fn schedule_gate_close(&mut self, now: Instant) {
        let remaining = self.engine.get_duration() - self.engine.get_position();
        self.gate.schedule(now, remaining);
    }

    pub fn tick(&mut self, now: Instant) {
        if self.gate.expire(now) {
            self.engine.close_gate();
            log::debug!("Push-to-talk released");
        }

        for event in self.engine.drain_events() {
            match event {
                StreamEvent::Error { direction, message } => {
                    println!("! {} stream error: {}", direction, message);
                }
            }
        }
    }

    /// Run one command; returns false when the session should end
    pub fn execute(&mut self, command: Command, now: Instant) -> bool {
        match command {
            Command::List => {
                for id in self.engine.clip_ids() {
                    let duration = self.engine.clip_duration(&id).unwrap_or(0.0);
                    println!("  {:<20} {:>7.2}s", id, duration);
                }
            }
            Command::Inputs => {
                let selected = self.engine.selected_input().cloned();
                print_devices(self.engine.enumerate_input_devices(), selected.as_ref());
            }
            Command::Outputs => {
                let selected = self.engine.selected_output().cloned();
                print_devices(self.engine.enumerate_output_devices(), selected.as_ref());
            }
            Command::Play(id) => match self.engine.trigger(&id) {
                Ok(()) => self.schedule_gate_close(now),
                Err(e) => println!("! {}", e),
            },
            Command::Stop => {
                self.engine.stop();
                self.gate.cancel();
            }
            Command::Gate(open) => {
                self.gate.cancel();
                if open {
                    self.engine.open_gate();
                } else {
                    self.engine.close_gate();
                }
            }
            Command::Seek(seconds) => {
                if self.engine.seek(seconds) {
                    self.schedule_gate_close(now);
                } else {
                    println!("! seek ignored (nothing playing or out of range)");
                }
            }
            Command::Gain(gain) => {
                let stored = self.engine.set_output_gain(gain);
                println!("  gain {:.2}", stored);
                self.config.output_gain = stored;
                self.save();
            }
            Command::Mode(mode) => {
                self.engine.set_mode(mode);
                self.config.mode = mode;
                self.save();
            }
            Command::Input(name) => match self.engine.select_input_device(&name) {
                Ok(device) => {
                    println!("  input: {}", device);
                    self.config.audio.input_device = Some(device.name);
                    self.save();
                    self.print_restart_hint();
                }
                Err(e) => println!("! {}", e),
            },
            Command::Output(name) => match self.engine.select_output_device(&name) {
                Ok(device) => {
                    println!("  output: {}", device);
                    self.config.audio.output_device = Some(device.name);
                    self.save();
                    self.print_restart_hint();
                }
                Err(e) => println!("! {}", e),
            },
            Command::Start => {
                if let Err(e) = self.engine.start() {
                    println!("! {}", e);
                }
            }
            Command::Halt => self.engine.stop_stream(),
            Command::Status => self.print_status(),
            Command::Load { id, path } => match self.engine.preload_clip(&id, &path) {
                Ok(()) => {
                    self.config.add_sound(id, path);
                    self.save();
                }
                Err(e) => println!("! {}", e),
            },
            Command::Unload(id) => {
                let loaded = self.engine.unload(&id);
                let listed = self.config.remove_sound(&id).is_some();
                if listed {
                    self.save();
                }
                if !loaded && !listed {
                    println!("! no clip '{}'", id);
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
        }
        true
    }

    fn print_restart_hint(&self) {
        if self.engine.is_streaming() {
            println!("  (takes effect after 'halt' and 'start')");
        }
    }

    fn print_status(&self) {
        let status = self.engine.status();
        println!(
            "  streams: {}",
            if status.streaming { "running" } else { "stopped" }
        );
        match &status.clip {
            Some(id) => println!(
                "  playing: {} {:.2}/{:.2}s",
                id, status.position_secs, status.duration_secs
            ),
            None => println!("  playing: -"),
        }
        println!(
            "  gate: {}  mode: {}  gain: {:.2}",
            if status.gate_open { "open" } else { "closed" },
            status.mode,
            status.output_gain
        );
        println!(
            "  mic: {:.1} dBFS (peak {:.1} dBFS)",
            to_dbfs(status.level),
            to_dbfs(status.peak)
        );
    }
}

fn print_devices(devices: AudioResult<Vec<DeviceDescriptor>>, selected: Option<&DeviceDescriptor>) {
    match devices {
        Ok(devices) => {
            for device in devices {
                let marker = if selected.map(|s| s.name == device.name).unwrap_or(false) {
                    '*'
                } else {
                    ' '
                };
                println!(" {} {}", marker, device);
            }
        }
        Err(e) => println!("! {}", e),
    }
}
