//! Snapshot delivery between the control-rate and audio-rate domains.
//!
//! ```text
//! Control thread                         Audio callback
//!     │                                        │
//! [DataSource]                                 │
//!     │                                        │
//! [SnapshotSender::send]───(ring)───────►[SnapshotInbox::apply_pending]
//!     │                                  [Orchestra::retarget_all]
//! [reclaim: drop spent]◄───(ring)────────[return spent snapshot]
//!                                        [Orchestra::render]
//! ```
//!
//! Snapshots cross as whole values, so a render never observes a half
//! applied retarget. Both rings are lock free, and spent snapshots travel
//! back so their memory is released on the control thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use ringbuf::{
    HeapCons, HeapProd, HeapRb,
    traits::{Consumer, Observer, Producer, Split},
};
use tracing::{debug, info, warn};

use crate::orchestra::Orchestra;
use crate::snapshot::DataSnapshot;

/// Create a connected sender/inbox pair holding up to `capacity` queued
/// snapshots.
pub fn snapshot_link(capacity: usize) -> (SnapshotSender, SnapshotInbox) {
    let capacity = capacity.max(1);
    let (queue_tx, queue_rx) = HeapRb::<DataSnapshot>::new(capacity).split();
    let (spent_tx, spent_rx) = HeapRb::<DataSnapshot>::new(capacity).split();
    (
        SnapshotSender {
            queue: queue_tx,
            spent: spent_rx,
        },
        SnapshotInbox {
            queue: queue_rx,
            spent: spent_tx,
        },
    )
}

/// Control-side end of the link. Never blocks.
pub struct SnapshotSender {
    queue: HeapProd<DataSnapshot>,
    spent: HeapCons<DataSnapshot>,
}

impl SnapshotSender {
    /// Queue a snapshot for the audio thread.
    ///
    /// Returns false when the snapshot carried nothing or the queue was full;
    /// either way the audio side keeps its last state.
    pub fn send(&mut self, snapshot: DataSnapshot) -> bool {
        self.reclaim();
        if snapshot.is_empty() {
            debug!("skipping empty snapshot");
            return false;
        }

        info!(
            cme_speeds = snapshot.cme_speed_series.as_ref().map(Vec::len),
            kp = snapshot.max_kp_index,
            sunspots = snapshot.sunspot_number,
            flare = snapshot.latest_flare.as_ref().map(|f| f.class_type.as_str()),
            "delivering snapshot to instruments"
        );
        match self.queue.try_push(snapshot) {
            Ok(()) => true,
            Err(_) => {
                warn!("snapshot queue full, audio thread is not draining; dropping update");
                false
            }
        }
    }

    /// Release snapshots the audio thread has finished with.
    pub fn reclaim(&mut self) -> usize {
        let mut count = 0;
        while self.spent.try_pop().is_some() {
            count += 1;
        }
        count
    }

    /// Snapshots still waiting for the audio thread.
    pub fn pending(&self) -> usize {
        self.queue.occupied_len()
    }
}

/// Audio-side end of the link.
pub struct SnapshotInbox {
    queue: HeapCons<DataSnapshot>,
    spent: HeapProd<DataSnapshot>,
}

impl SnapshotInbox {
    /// Retarget `orchestra` with every queued snapshot, oldest first.
    pub fn apply_pending(&mut self, orchestra: &mut Orchestra) -> usize {
        let mut applied = 0;
        while let Some(snapshot) = self.queue.try_pop() {
            orchestra.retarget_all(&snapshot);
            applied += 1;
            // A full return ring means the control side stopped reclaiming;
            // dropping here is the only option left
            let _ = self.spent.try_push(snapshot);
        }
        applied
    }
}

/// Playback position published by the audio thread.
#[derive(Debug, Clone, Default)]
pub struct FrameCounter(Arc<AtomicU64>);

impl FrameCounter {
    pub fn frames(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    fn publish(&self, frames: u64) {
        self.0.store(frames, Ordering::Relaxed);
    }
}

/// The object an audio driver calls once per hardware buffer.
pub struct RealtimeOrchestra {
    orchestra: Orchestra,
    inbox: SnapshotInbox,
    counter: FrameCounter,
}

impl RealtimeOrchestra {
    pub fn new(orchestra: Orchestra, inbox: SnapshotInbox) -> Self {
        RealtimeOrchestra {
            orchestra,
            inbox,
            counter: FrameCounter::default(),
        }
    }

    /// Apply queued snapshots, then render `out`. Never blocks.
    pub fn process(&mut self, out: &mut [f32]) {
        self.inbox.apply_pending(&mut self.orchestra);
        self.orchestra.render(out);
        self.counter.publish(self.orchestra.frames_rendered());
    }

    pub fn frame_counter(&self) -> FrameCounter {
        self.counter.clone()
    }

    pub fn orchestra(&self) -> &Orchestra {
        &self.orchestra
    }
}
