//! A persistent, bounded FIFO queue backed by a memory-mapped file.
//!
//! [`Queue`] wraps [`mmqf_core::FileContainer`] (header + mapping) and
//! [`mmqf_core::RingBuffer`] (the concurrent enqueue/dequeue protocol) into
//! a single handle, mirroring the split between the core engine crate and
//! this thin process-level API.

use std::path::Path;

use mmqf_core::{DequeueOutcome, EnqueueOutcome, Error, FileContainer, QueueConfig, Result, RingBuffer};
use tracing::info;

pub use mmqf_core::{DequeueOutcome as Dequeued, EnqueueOutcome as Enqueued};

/// Converts application values to and from the fixed-width byte slots the
/// core stores. The core never inspects the bytes; it only guarantees
/// `to_bytes` produces exactly `slot_size` bytes before anything touches
/// the mapping.
pub trait ElementCodec: Sized {
    fn to_bytes(&self, slot_size: usize) -> Result<Vec<u8>>;
    fn from_bytes(bytes: &[u8]) -> Result<Self>;
}

impl ElementCodec for u32 {
    fn to_bytes(&self, slot_size: usize) -> Result<Vec<u8>> {
        if slot_size < 4 {
            return Err(Error::BoundsError(format!("slot_size {} too small for u32", slot_size)));
        }
        let mut buf = vec![0u8; slot_size];
        buf[..4].copy_from_slice(&self.to_le_bytes());
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 4 {
            return Err(Error::BoundsError(format!("{} bytes too short for u32", bytes.len())));
        }
        Ok(u32::from_le_bytes(bytes[..4].try_into().unwrap()))
    }
}

impl ElementCodec for u64 {
    fn to_bytes(&self, slot_size: usize) -> Result<Vec<u8>> {
        if slot_size < 8 {
            return Err(Error::BoundsError(format!("slot_size {} too small for u64", slot_size)));
        }
        let mut buf = vec![0u8; slot_size];
        buf[..8].copy_from_slice(&self.to_le_bytes());
        Ok(buf)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 8 {
            return Err(Error::BoundsError(format!("{} bytes too short for u64", bytes.len())));
        }
        Ok(u64::from_le_bytes(bytes[..8].try_into().unwrap()))
    }
}

/// A persistent, bounded, memory-mapped FIFO queue.
pub struct Queue {
    container: FileContainer,
    ring: RingBuffer,
}

impl Queue {
    fn from_container(container: FileContainer, config: &QueueConfig) -> Result<Self> {
        config.validate()?;
        let (data_ptr, data_len) = container.data_buffer();
        let header = container.header();
        let ring = RingBuffer::new(data_ptr, data_len, header.capacity(), header.slot_size(), config.spin_yield)?;
        Ok(Self { container, ring })
    }

    /// Open an existing queue file. Fails unless the file already exists
    /// and passes header validation.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, &QueueConfig::default())
    }

    pub fn open_with_config(path: impl AsRef<Path>, config: &QueueConfig) -> Result<Self> {
        let container = FileContainer::open(path)?;
        Self::from_container(container, config)
    }

    /// Create a new queue file. If `overwrite` is `false`, fails with
    /// [`Error::AlreadyExists`] when one is already present at `path`; if
    /// `overwrite` is `true`, an existing file is truncated and replaced.
    pub fn create(path: impl AsRef<Path>, schema_id: u64, capacity: u32, slot_size: u32, overwrite: bool) -> Result<Self> {
        Self::create_with_config(path, schema_id, capacity, slot_size, overwrite, &QueueConfig::default())
    }

    pub fn create_with_config(
        path: impl AsRef<Path>,
        schema_id: u64,
        capacity: u32,
        slot_size: u32,
        overwrite: bool,
        config: &QueueConfig,
    ) -> Result<Self> {
        let container = FileContainer::create(&path, schema_id, capacity, slot_size, overwrite, config.sync_on_create)?;
        info!(path = %path.as_ref().display(), schema_id, capacity, slot_size, overwrite, "created queue");
        Self::from_container(container, config)
    }

    /// Open `path` if it exists and its geometry matches, otherwise create
    /// it fresh. Fails with [`Error::GeometryMismatch`] rather than silently
    /// adopting whatever is on disk; an existing file's `schema_id` is not
    /// checked (see [`Queue::open_expecting_schema`] for that).
    pub fn open_or_create(path: impl AsRef<Path>, schema_id: u64, capacity: u32, slot_size: u32) -> Result<Self> {
        Self::open_or_create_with_config(path, schema_id, capacity, slot_size, &QueueConfig::default())
    }

    pub fn open_or_create_with_config(
        path: impl AsRef<Path>,
        schema_id: u64,
        capacity: u32,
        slot_size: u32,
        config: &QueueConfig,
    ) -> Result<Self> {
        let container = FileContainer::create_compatible(path, schema_id, capacity, slot_size, config.sync_on_create)?;
        Self::from_container(container, config)
    }

    /// Like [`Queue::open`] but additionally checks the file's `schema_id`
    /// against the caller's expectation, surfacing a mismatch as
    /// [`Error::SchemaMismatch`] (the core itself never enforces this).
    pub fn open_expecting_schema(path: impl AsRef<Path>, schema_id: u64) -> Result<Self> {
        let queue = Self::open(path)?;
        if queue.schema_id() != schema_id {
            return Err(Error::SchemaMismatch {
                expected: schema_id,
                found: queue.schema_id(),
            });
        }
        Ok(queue)
    }

    /// Enqueue raw bytes, which must be exactly [`Queue::slot_size`] long.
    pub fn enqueue(&self, bytes: &[u8]) -> Result<EnqueueOutcome> {
        self.ring.enqueue(bytes)
    }

    /// Encode `value` and enqueue it.
    pub fn enqueue_value<T: ElementCodec>(&self, value: &T) -> Result<EnqueueOutcome> {
        let bytes = value.to_bytes(self.slot_size() as usize)?;
        self.enqueue(&bytes)
    }

    /// Remove and return the oldest element's raw bytes.
    pub fn dequeue(&self) -> Result<DequeueOutcome> {
        self.ring.dequeue()
    }

    /// Remove the oldest element and decode it as `T`.
    pub fn dequeue_value<T: ElementCodec>(&self) -> Result<Option<T>> {
        match self.dequeue()? {
            DequeueOutcome::Some(bytes) => Ok(Some(T::from_bytes(&bytes)?)),
            DequeueOutcome::Empty => Ok(None),
        }
    }

    /// Return the oldest element's raw bytes without removing it.
    pub fn peek(&self) -> Result<DequeueOutcome> {
        self.ring.peek()
    }

    pub fn size(&self) -> u64 {
        self.ring.size()
    }

    pub fn capacity(&self) -> u32 {
        self.ring.capacity()
    }

    pub fn slot_size(&self) -> u32 {
        self.ring.slot_size()
    }

    pub fn schema_id(&self) -> u64 {
        self.container.header().schema_id()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    /// Number of busy-wait spin iterations observed so far, for
    /// diagnosing contention; not part of any correctness guarantee.
    pub fn busy_iterations(&self) -> u64 {
        self.ring.busy_iterations()
    }

    /// Force the mapped region to disk.
    pub fn flush(&self) -> Result<()> {
        self.container.flush()
    }

    /// Flush and drop the queue handle. Equivalent to letting it go out of
    /// scope, spelled out for call sites that want to make the moment of
    /// closing explicit.
    pub fn close(self) -> Result<()> {
        self.container.flush()
    }
}
