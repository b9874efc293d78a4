//! Deferred frees for clip buffers and playback slots
//!
//! A preloaded clip is a few megabytes of stereo frames. It is reachable from
//! the clip store, from the armed slot of the playback cursor, and for the
//! length of one cycle from the mixer. Unloading, replacing or re-triggering
//! can therefore drop the last reference on the output callback thread.
//!
//! Every `Shared` in the engine is created with [`gc_handle`]. Its last drop
//! only queues the pointer; the `soundpad-gc` thread frees queued buffers on
//! each pass. The same applies to the small `ArmedSlot` allocations that
//! `PlaybackState` swaps on every arm and stop.

use basedrop::{Collector, Handle};
use std::sync::mpsc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

/// Pause between collection passes
///
/// Unloaded clips linger at most this long; the mixer never waits on it.
const COLLECT_INTERVAL: Duration = Duration::from_millis(100);

static GC_HANDLE: OnceLock<Handle> = OnceLock::new();

fn init_gc() -> Handle {
    let (tx, rx) = mpsc::channel();

    thread::Builder::new()
        .name("soundpad-gc".to_string())
        .spawn(move || {
            // Collector is !Sync and never leaves this thread
            let mut collector = Collector::new();
            tx.send(collector.handle()).expect("clip GC handle receiver dropped");
            log::info!(
                "Clip GC thread started ({} ms interval)",
                COLLECT_INTERVAL.as_millis()
            );

            loop {
                collector.collect();
                thread::sleep(COLLECT_INTERVAL);
            }
        })
        .expect("failed to spawn clip GC thread");

    rx.recv().expect("clip GC thread exited before sending its handle")
}

/// Handle for allocating clips and playback slots
///
/// The first call starts the collector thread; later calls clone its handle.
pub fn gc_handle() -> Handle {
    GC_HANDLE.get_or_init(init_gc).clone()
}
