//! Playback Cursor - the armed clip, its read position and the push-to-talk gate
//!
//! # Lock-free hand-off
//!
//! Two threads mutate playback: the control plane (trigger, stop, seek,
//! gate) and the mixer callback (advance). Neither may block the other, so
//! the state is split in two published halves:
//!
//! - **Armed slot** (`SharedCell<ArmedSlot>`): the clip reference plus the
//!   epoch it was armed under. Only the control plane replaces it.
//! - **Transport word** (`AtomicU64`): cursor, epoch, active and gate bits.
//!   The control plane stores it; the mixer advances it with compare-and-swap.
//!
//! ```text
//!  63    62     61..32       31..0
//! ┌────┬──────┬──────────┬───────────┐
//! │gate│active│  epoch   │  cursor   │
//! └────┴──────┴──────────┴───────────┘
//! ```
//!
//! The control plane always publishes the slot before the word. A reader
//! loads the word, then the slot. Differing epochs mean a control call sits
//! between its two stores, so the reader loads both again; the word follows
//! within a few instructions. If they still disagree after
//! `SNAPSHOT_RETRIES` reads, the mixer renders a closed, silent cycle, which
//! is the state `stop` leads to. An active word is never paired with another
//! epoch's slot. A mixer CAS that loses against a control call is dropped:
//! the control call wins and takes effect on the next cycle at the latest.

use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use basedrop::{Handle, Shared, SharedCell};

use super::clip::ClipRef;
use super::gc::gc_handle;
use crate::types::StereoSample;

const CURSOR_MASK: u64 = 0xFFFF_FFFF;
const EPOCH_SHIFT: u32 = 32;
const EPOCH_MASK: u32 = (1 << 30) - 1;
const ACTIVE_BIT: u64 = 1 << 62;
const GATE_BIT: u64 = 1 << 63;

/// Retries for a mixer CAS that only lost against a gate toggle
const FLAG_RETRIES: usize = 4;

/// Word/slot reads before a reader gives up on a mid-flight publish
const SNAPSHOT_RETRIES: usize = 16;

/// Decoded view of the transport word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Transport(u64);

impl Transport {
    fn idle(epoch: u32) -> Self {
        Self(((epoch & EPOCH_MASK) as u64) << EPOCH_SHIFT)
    }

    /// Freshly armed: cursor 0, active, gate open
    fn armed(epoch: u32) -> Self {
        Self(Self::idle(epoch).0 | ACTIVE_BIT | GATE_BIT)
    }

    #[inline]
    fn cursor(self) -> usize {
        (self.0 & CURSOR_MASK) as usize
    }

    #[inline]
    fn epoch(self) -> u32 {
        ((self.0 >> EPOCH_SHIFT) as u32) & EPOCH_MASK
    }

    #[inline]
    fn active(self) -> bool {
        self.0 & ACTIVE_BIT != 0
    }

    #[inline]
    fn gate(self) -> bool {
        self.0 & GATE_BIT != 0
    }

    #[inline]
    fn with_cursor(self, cursor: usize) -> Self {
        Self((self.0 & !CURSOR_MASK) | (cursor as u64 & CURSOR_MASK))
    }

    /// Clip exhausted: back to idle, gate left for the control plane to close
    #[inline]
    fn finished(self) -> Self {
        Self(self.0 & !(ACTIVE_BIT | CURSOR_MASK))
    }
}

/// What the control plane armed, tagged with the epoch it was armed under
struct ArmedSlot {
    clip: Option<ClipRef>,
    epoch: u32,
}

/// Coarse playback state for UI display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Nothing armed or the last clip finished
    Idle,
    /// A clip is being read by the mixer
    Playing,
}

/// Result of one mixer advance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    /// Whether the output is audible this cycle (playback active or push-to-talk held)
    pub gate_open: bool,
    /// Clip frames written before zero padding
    pub delivered: usize,
}

/// Shared playback state, one per engine
pub struct PlaybackState {
    transport: AtomicU64,
    slot: SharedCell<ArmedSlot>,
    next_epoch: AtomicU32,
    gc: Handle,
}

impl PlaybackState {
    pub fn new() -> Self {
        let gc = gc_handle();
        Self {
            transport: AtomicU64::new(Transport::idle(0).0),
            slot: SharedCell::new(Shared::new(&gc, ArmedSlot { clip: None, epoch: 0 })),
            next_epoch: AtomicU32::new(0),
            gc,
        }
    }

    #[inline]
    fn load(&self) -> Transport {
        Transport(self.transport.load(Ordering::Acquire))
    }

    fn bump_epoch(&self) -> u32 {
        self.next_epoch.fetch_add(1, Ordering::Relaxed).wrapping_add(1) & EPOCH_MASK
    }

    /// A transport word together with the clip armed under its epoch
    ///
    /// Inactive words need no clip and are returned as loaded. For an active
    /// word the slot is re-read until both carry the same epoch; `None` means
    /// a publish was still in flight after every retry.
    fn snapshot(&self) -> Option<(Transport, Option<ClipRef>)> {
        for _ in 0..SNAPSHOT_RETRIES {
            let word = self.load();
            if !word.active() {
                return Some((word, None));
            }
            let slot = self.slot.get();
            if slot.epoch == word.epoch() {
                return Some((word, slot.clip.as_ref().map(Shared::clone)));
            }
            std::hint::spin_loop();
        }
        None
    }

    /// The playing clip and the word it was read with
    fn playing(&self) -> Option<(Transport, ClipRef)> {
        match self.snapshot()? {
            (word, Some(clip)) => Some((word, clip)),
            (_, None) => None,
        }
    }

    fn publish(&self, clip: Option<ClipRef>, word_for: impl FnOnce(u32) -> Transport) {
        let epoch = self.bump_epoch();
        self.slot.set(Shared::new(&self.gc, ArmedSlot { clip, epoch }));
        self.transport.store(word_for(epoch).0, Ordering::Release);
    }

    // ─────────────────────────────────────────────────────────────
    // Control plane
    // ─────────────────────────────────────────────────────────────

    /// Arm a clip from its first frame and open the gate
    pub fn arm(&self, clip: ClipRef) {
        self.publish(Some(clip), Transport::armed);
    }

    /// Disarm, rewind and close the gate
    ///
    /// Calling it on an already stopped cursor changes nothing.
    pub fn stop(&self) {
        let word = self.load();
        if !word.active() && !word.gate() && self.slot.get().clip.is_none() {
            return;
        }
        self.publish(None, Transport::idle);
    }

    /// Engage push-to-talk without a clip
    pub fn open_gate(&self) {
        self.transport.fetch_or(GATE_BIT, Ordering::AcqRel);
    }

    /// Release push-to-talk (the collaborator calls this once the clip ends)
    pub fn close_gate(&self) {
        self.transport.fetch_and(!GATE_BIT, Ordering::AcqRel);
    }

    /// Move the cursor to the frame nearest `seconds`
    ///
    /// Ignored (returns false) when nothing is armed or the target falls
    /// outside `[0, length)`.
    pub fn seek(&self, seconds: f64) -> bool {
        if !seconds.is_finite() {
            return false;
        }

        loop {
            let Some((word, clip)) = self.playing() else {
                return false;
            };

            let target = (seconds * clip.sample_rate() as f64).round();
            if target < 0.0 || target >= clip.len() as f64 {
                return false;
            }

            let next = word.with_cursor(target as usize);
            match self.transport.compare_exchange(
                word.0,
                next.0,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                // Mixer advanced or a control call landed; re-read both halves
                Err(_) => continue,
            }
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Queries (lock-free, any thread)
    // ─────────────────────────────────────────────────────────────

    pub fn is_active(&self) -> bool {
        self.load().active()
    }

    /// Whether the mixer output is audible (active playback or push-to-talk held)
    pub fn is_gate_open(&self) -> bool {
        let word = self.load();
        word.active() || word.gate()
    }

    pub fn status(&self) -> PlaybackStatus {
        if self.is_active() {
            PlaybackStatus::Playing
        } else {
            PlaybackStatus::Idle
        }
    }

    /// Id of the clip being played, if any
    pub fn current_clip_id(&self) -> Option<String> {
        self.playing().map(|(_, clip)| clip.id().to_string())
    }

    /// Read position in seconds (0 when idle)
    pub fn position_secs(&self) -> f64 {
        self.playing()
            .map(|(word, clip)| word.cursor() as f64 / clip.sample_rate() as f64)
            .unwrap_or(0.0)
    }

    /// Armed clip duration in seconds (0 when idle)
    pub fn duration_secs(&self) -> f64 {
        self.playing()
            .map(|(_, clip)| clip.duration_secs())
            .unwrap_or(0.0)
    }

    /// Read position in frames (0 when idle)
    pub fn cursor(&self) -> usize {
        let word = self.load();
        if word.active() {
            word.cursor()
        } else {
            0
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Mixer (real-time)
    // ─────────────────────────────────────────────────────────────

    /// Render the clip contribution for one output cycle into `out`
    ///
    /// Copies up to `out.len()` frames from the cursor scaled by `gain`,
    /// zero-pads the rest, and returns to idle once the clip's last frame
    /// has been delivered. Wait-free apart from bounded retries; never
    /// allocates. Intended for the mixer callback only.
    pub fn advance(&self, out: &mut [StereoSample], gain: f32) -> Advance {
        let (word, clip) = match self.snapshot() {
            Some((word, Some(clip))) => (word, clip),
            Some((word, None)) => {
                out.fill(StereoSample::silence());
                return Advance {
                    gate_open: word.gate(),
                    delivered: 0,
                };
            }
            None => {
                out.fill(StereoSample::silence());
                return Advance {
                    gate_open: false,
                    delivered: 0,
                };
            }
        };

        let frames = clip.frames();
        let start = word.cursor().min(frames.len());
        let delivered = out.len().min(frames.len() - start);

        for (dst, src) in out[..delivered].iter_mut().zip(&frames[start..start + delivered]) {
            *dst = *src * gain;
        }
        out[delivered..].fill(StereoSample::silence());

        let end = start + delivered;
        let exhausted = end >= frames.len();

        let mut expected = word;
        for _ in 0..FLAG_RETRIES {
            let next = if exhausted {
                expected.finished()
            } else {
                expected.with_cursor(end)
            };
            match self.transport.compare_exchange(
                expected.0,
                next.0,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => break,
                Err(current) => {
                    let current = Transport(current);
                    // Only a gate toggle happened: keep our advance, keep their flag
                    let same_play = current.active()
                        && current.epoch() == word.epoch()
                        && current.cursor() == word.cursor();
                    if !same_play {
                        break;
                    }
                    expected = current;
                }
            }
        }

        // An active word keeps the output audible
        Advance {
            gate_open: true,
            delivered,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::new()
    }
}
