//! Outbound chunk notifications.
//!
//! Voxel destruction/exploration and rebuild completion are reported as
//! explicit events collected into a double-buffered list the owner thread
//! drains each frame — downstream collaborators (collision, fog-of-war)
//! subscribe by reading, not by registering callbacks into the core.
//! Events written in one frame stay readable through the next
//! [`swap`](ChunkEventBuffer::swap); after two swaps they are dropped.

use parking_lot::Mutex;
use strata_math::{ChunkCoord, LocalCoord};

/// A chunk-scoped notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkEvent {
    /// A non-empty voxel was removed.
    VoxelDestroyed {
        /// Owning chunk.
        chunk: ChunkCoord,
        /// Position within the chunk.
        local: LocalCoord,
    },
    /// A voxel was revealed for the first time.
    VoxelExplored {
        /// Owning chunk.
        chunk: ChunkCoord,
        /// Position within the chunk.
        local: LocalCoord,
    },
    /// A chunk's mesh finished rebuilding (derived state changed).
    ChunkModified {
        /// The rebuilt chunk.
        chunk: ChunkCoord,
    },
    /// A chunk was removed from the registry.
    ChunkRemoved {
        /// The removed chunk's coordinate.
        chunk: ChunkCoord,
    },
}

#[derive(Debug, Default)]
struct Buffers {
    /// Events from the previous frame (still readable).
    prev: Vec<ChunkEvent>,
    /// Events from the current frame (being written).
    current: Vec<ChunkEvent>,
}

/// Double-buffered event storage.
///
/// Pushing is allowed from any thread (the mesh worker publishes
/// completion events); draining and [`swap`](Self::swap) belong to the
/// owner thread's frame loop.
#[derive(Debug, Default)]
pub struct ChunkEventBuffer {
    inner: Mutex<Buffers>,
}

impl ChunkEventBuffer {
    /// Creates an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event to the current frame.
    pub fn push(&self, event: ChunkEvent) {
        self.inner.lock().current.push(event);
    }

    /// Returns all readable events (previous + current frame).
    pub fn read(&self) -> Vec<ChunkEvent> {
        let inner = self.inner.lock();
        inner.prev.iter().chain(inner.current.iter()).copied().collect()
    }

    /// Number of readable events.
    pub fn len(&self) -> usize {
        let inner = self.inner.lock();
        inner.prev.len() + inner.current.len()
    }

    /// True if there are no readable events.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances the frame: previous events are dropped, current becomes
    /// previous. Call once per frame before writing new events.
    pub fn swap(&self) {
        let mut inner = self.inner.lock();
        inner.prev.clear();
        let Buffers { prev, current } = &mut *inner;
        std::mem::swap(prev, current);
    }

    /// Drops all events from both frames.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.prev.clear();
        inner.current.clear();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
