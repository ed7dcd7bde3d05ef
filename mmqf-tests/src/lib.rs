/// Test utilities shared across the integration suite.
///
/// This crate provides common scaffolding so the scenario tests in
/// `tests/` stay focused on the behavior under test rather than temp-file
/// bookkeeping.
use std::path::PathBuf;

use mmqf::Queue;
use tempfile::TempDir;

/// A queue paired with the `TempDir` that owns its backing file, so the
/// file is cleaned up when the test wrapper is dropped.
pub struct TestQueue {
    pub queue: Queue,
    pub path: PathBuf,
    _temp_dir: TempDir,
}

impl TestQueue {
    /// Create a fresh queue with the given geometry in a new temp
    /// directory.
    pub fn create(schema_id: u64, capacity: u32, slot_size: u32) -> Self {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let path = temp_dir.path().join("queue.mmqf");
        let queue = Queue::create(&path, schema_id, capacity, slot_size, false).expect("failed to create queue");

        Self {
            queue,
            path,
            _temp_dir: temp_dir,
        }
    }

    /// Reopen the queue at the same path, dropping the current handle
    /// first so the mapping is released before reopening.
    pub fn reopen(self) -> Self {
        let path = self.path.clone();
        drop(self.queue);
        let queue = Queue::open(&path).expect("failed to reopen queue");
        Self {
            queue,
            path,
            _temp_dir: self._temp_dir,
        }
    }
}

/// Encode a `u32` as a zero-padded little-endian slot of `slot_size` bytes,
/// matching the convention used throughout the scenario tests.
pub fn slot_u32(slot_size: usize, value: u32) -> Vec<u8> {
    let mut buf = vec![0u8; slot_size];
    buf[..4].copy_from_slice(&value.to_le_bytes());
    buf
}
