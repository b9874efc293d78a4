//! Capture Tap - most-recent-value hand-off from the input callback to the mixer
//!
//! This is a triple buffer, explicitly not a queue: the writer always has a
//! block to fill, the reader always has a block to read, and the third
//! block sits in the middle carrying the newest complete capture.
//!
//! ```text
//!  capture callback            middle              mixer callback
//! ┌──────────────┐  swap   ┌─────────────┐  swap  ┌──────────────┐
//! │ back (write) │────────►│ idx | FRESH │◄───────│ front (read) │
//! └──────────────┘         └─────────────┘        └──────────────┘
//! ```
//!
//! Publishing swaps the filled back block into the middle and takes the
//! old middle as the next back block, so an unread capture is simply
//! overwritten. The reader swaps only when the middle is marked fresh;
//! otherwise it re-reads the block it already holds. Neither side ever
//! waits for the other and nothing allocates after construction.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use super::meter::LevelMeter;
use crate::types::{StereoSample, MAX_BUFFER_SIZE};

const INDEX_MASK: u8 = 0b011;
const FRESH: u8 = 0b100;

struct Block {
    frames: Box<[StereoSample]>,
    len: usize,
}

impl Block {
    fn new() -> Self {
        Self {
            frames: vec![StereoSample::silence(); MAX_BUFFER_SIZE].into_boxed_slice(),
            len: 0,
        }
    }
}

struct TapShared {
    blocks: [UnsafeCell<Block>; 3],
    /// Index of the middle block, plus FRESH when it holds an unread capture
    middle: AtomicU8,
    meter: Arc<LevelMeter>,
}

// SAFETY: every block index is owned by exactly one party at a time (writer's
// back, reader's front, or the middle slot). Ownership only changes through
// AcqRel swaps on `middle`, so a block is never accessed from two threads at once.
unsafe impl Sync for TapShared {}

/// Create a connected writer/reader pair publishing levels to `meter`
pub fn capture_tap(meter: Arc<LevelMeter>) -> (CaptureWriter, CaptureReader) {
    let shared = Arc::new(TapShared {
        blocks: [
            UnsafeCell::new(Block::new()),
            UnsafeCell::new(Block::new()),
            UnsafeCell::new(Block::new()),
        ],
        middle: AtomicU8::new(1),
        meter,
    });

    (
        CaptureWriter {
            shared: Arc::clone(&shared),
            back: 0,
        },
        CaptureReader { shared, front: 2 },
    )
}

/// Input-callback half of the tap
pub struct CaptureWriter {
    shared: Arc<TapShared>,
    back: u8,
}

impl CaptureWriter {
    /// Publish one hardware block of interleaved samples
    ///
    /// Mono input is duplicated to stereo; for wider input only the first
    /// two channels are kept. Blocks longer than `MAX_BUFFER_SIZE` frames
    /// are truncated.
    pub fn publish(&mut self, data: &[f32], channels: u16) {
        // SAFETY: `back` is owned exclusively by this writer until swapped out below
        let block = unsafe { &mut *self.shared.blocks[self.back as usize].get() };

        let channels = channels as usize;
        let frames = match channels {
            0 => 0,
            c => (data.len() / c).min(block.frames.len()),
        };

        match channels {
            0 => {}
            1 => {
                for (dst, &s) in block.frames[..frames].iter_mut().zip(data) {
                    *dst = StereoSample::mono(s);
                }
            }
            c => {
                for (dst, src) in block.frames[..frames].iter_mut().zip(data.chunks_exact(c)) {
                    *dst = StereoSample::new(src[0], src[1]);
                }
            }
        }
        block.len = frames;

        self.shared.meter.update(&block.frames[..frames]);

        let previous = self.shared.middle.swap(self.back | FRESH, Ordering::AcqRel);
        self.back = previous & INDEX_MASK;
    }
}

/// Mixer-callback half of the tap
pub struct CaptureReader {
    shared: Arc<TapShared>,
    front: u8,
}

impl CaptureReader {
    /// The newest published block (empty if nothing was ever captured)
    ///
    /// May return the same block as the previous call when no new capture
    /// arrived in between.
    pub fn latest(&mut self) -> &[StereoSample] {
        if self.shared.middle.load(Ordering::Relaxed) & FRESH != 0 {
            let previous = self.shared.middle.swap(self.front, Ordering::AcqRel);
            self.front = previous & INDEX_MASK;
        }

        // SAFETY: `front` is owned exclusively by this reader until the next swap
        let block = unsafe { &*self.shared.blocks[self.front as usize].get() };
        &block.frames[..block.len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    fn tap() -> (CaptureWriter, CaptureReader, Arc<LevelMeter>) {
        let meter = Arc::new(LevelMeter::new());
        let (writer, reader) = capture_tap(Arc::clone(&meter));
        (writer, reader, meter)
    }

    #[test]
    fn test_empty_before_first_capture() {
        let (_writer, mut reader, meter) = tap();
        assert!(reader.latest().is_empty());
        assert_eq!(meter.level(), 0.0);
    }

    #[test]
    fn test_latest_value_wins() {
        let (mut writer, mut reader, _meter) = tap();
        writer.publish(&[0.1, 0.1, 0.1, 0.1], 2);
        writer.publish(&[0.2, 0.2, 0.2, 0.2, 0.2, 0.2], 2);
        writer.publish(&[0.3, 0.3], 2);

        let latest = reader.latest();
        assert_eq!(latest, &[StereoSample::mono(0.3)]);
        // No new capture: the same block is read again
        assert_eq!(reader.latest(), &[StereoSample::mono(0.3)]);
    }

    #[test]
    fn test_mono_and_wide_input() {
        let (mut writer, mut reader, _meter) = tap();
        writer.publish(&[0.5, -0.5], 1);
        assert_eq!(reader.latest(), &[StereoSample::mono(0.5), StereoSample::mono(-0.5)]);

        writer.publish(&[0.1, 0.2, 0.9, 0.3, 0.4, 0.9], 3);
        assert_eq!(
            reader.latest(),
            &[StereoSample::new(0.1, 0.2), StereoSample::new(0.3, 0.4)]
        );
    }

    #[test]
    fn test_oversized_block_truncated() {
        let (mut writer, mut reader, _meter) = tap();
        writer.publish(&vec![0.25; (MAX_BUFFER_SIZE + 10) * 2], 2);
        assert_eq!(reader.latest().len(), MAX_BUFFER_SIZE);
    }

    #[test]
    fn test_publish_updates_level() {
        let (mut writer, _reader, meter) = tap();
        writer.publish(&[0.5; 128], 2);
        assert!((meter.level() - 0.5).abs() < 1e-6);
        writer.publish(&[0.0; 128], 2);
        assert_eq!(meter.level(), 0.0);
    }

    #[test]
    fn test_concurrent_reader_sees_whole_blocks() {
        let (mut writer, mut reader, _meter) = tap();
        let done = Arc::new(AtomicBool::new(false));

        let producer = {
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                let mut block = vec![0.0f32; 256];
                for i in 0..50_000u32 {
                    block.fill(i as f32);
                    writer.publish(&block, 2);
                }
                done.store(true, Ordering::Release);
            })
        };

        let mut last_seen = -1.0f32;
        while !done.load(Ordering::Acquire) {
            let latest = reader.latest();
            if let Some(first) = latest.first() {
                assert_eq!(latest.len(), 128);
                assert!(latest.iter().all(|f| f == first), "torn capture block");
                assert!(first.left >= last_seen, "capture went back in time");
                last_seen = first.left;
            }
        }
        producer.join().unwrap();
    }
}
