/// The concurrent ring-buffer protocol: sequence claiming, slot addressing,
/// publication barriers, and the persisted head/tail/size triple.
///
/// Two pairs of counters exist side by side. `enqueue_sequence` /
/// `dequeue_sequence` are process-local atomics, reset to zero on every
/// open, used purely to claim a slot without contention. `head` / `tail` /
/// `size` live in the mapped control block and are the durable, symmetric
/// truth other processes (and this process, after a crash and reopen) see.
/// `publish_cursor` / `consume_cursor` are the barriers that keep the
/// mapped words advancing in claim order even though slot writes
/// themselves happen out of order across producers.
use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam::utils::Backoff;
use parking_lot::Mutex;
use tracing::trace;

use crate::error::{Error, Result};

const CONTROL_HEAD_OFFSET: usize = 0;
const CONTROL_TAIL_OFFSET: usize = 8;
const CONTROL_SIZE_OFFSET: usize = 16;
pub const CONTROL_BLOCK_LEN: usize = 32;

/// Outcome of an `enqueue` call. `Full` is an ordinary return variant, not
/// an error: the claim is cleanly revoked and the queue is left unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Enqueued,
    Full,
}

/// Outcome of a `dequeue`/`peek` call. `Empty` is an ordinary return
/// variant, mirroring `EnqueueOutcome::Full`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DequeueOutcome {
    Some(Vec<u8>),
    Empty,
}

unsafe fn atomic_u64_at<'a>(ptr: *mut u8, offset: usize) -> &'a AtomicU64 {
    debug_assert_eq!((ptr as usize + offset) % 8, 0, "control block word must be 8-byte aligned");
    &*(ptr.add(offset) as *const AtomicU64)
}

/// The ring buffer's live view over a mapped data region: the 32-byte
/// control block followed by `capacity` slots of `slot_size` bytes.
pub struct RingBuffer {
    data_ptr: *mut u8,
    capacity: u32,
    slot_size: u32,

    initial_head: u64,
    initial_tail: u64,
    initial_size: u64,

    enqueue_sequence: AtomicU64,
    dequeue_sequence: AtomicU64,
    publish_cursor: AtomicU64,
    consume_cursor: AtomicU64,
    busy_iterations: AtomicU64,

    size_cached: AtomicU64,
    size_mutex: Mutex<()>,

    spin_yield: bool,
}

// SAFETY: all mutation through `data_ptr` goes through atomics on the
// control-block words, or through slot byte ranges whose exclusive
// ownership for the duration of the write is established by the claim
// protocol (a given sequence number addresses exactly one slot, and no
// second claim can address it until a consumer has drained it, which the
// admission check in `enqueue` enforces).
unsafe impl Send for RingBuffer {}
unsafe impl Sync for RingBuffer {}

impl RingBuffer {
    /// Construct a ring buffer over an already-mapped data region,
    /// validating the control block against the invariants in the data
    /// model (bounds, alignment, corrupted upper bits).
    pub fn new(data_ptr: *mut u8, data_len: usize, capacity: u32, slot_size: u32, spin_yield: bool) -> Result<Self> {
        let expected_len = CONTROL_BLOCK_LEN as u64 + capacity as u64 * slot_size as u64;
        if data_len as u64 != expected_len {
            return Err(Error::InvalidFormat(format!(
                "data region length {} does not match capacity*slot_size+32 ({})",
                data_len, expected_len
            )));
        }

        let head_word = unsafe { atomic_u64_at(data_ptr, CONTROL_HEAD_OFFSET) };
        let tail_word = unsafe { atomic_u64_at(data_ptr, CONTROL_TAIL_OFFSET) };
        let size_word = unsafe { atomic_u64_at(data_ptr, CONTROL_SIZE_OFFSET) };

        let head_raw = head_word.load(Ordering::Acquire);
        let tail_raw = tail_word.load(Ordering::Acquire);
        let size_raw = size_word.load(Ordering::Acquire);

        for (name, raw) in [("head", head_raw), ("tail", tail_raw), ("size", size_raw)] {
            if raw > u32::MAX as u64 {
                return Err(Error::InvalidFormat(format!(
                    "control block field {} has non-zero upper 32 bits ({:#018x})",
                    name, raw
                )));
            }
        }

        let slot_region_len = capacity as u64 * slot_size as u64;
        let initial_head = if head_raw == 0 { CONTROL_BLOCK_LEN as u64 } else { head_raw };
        let initial_tail = if tail_raw == 0 { CONTROL_BLOCK_LEN as u64 } else { tail_raw };
        let initial_size = size_raw;

        Self::validate_offset("head", initial_head, slot_size, slot_region_len)?;
        Self::validate_offset("tail", initial_tail, slot_size, slot_region_len)?;
        if initial_size > capacity as u64 {
            return Err(Error::InvalidFormat(format!(
                "control block size {} exceeds capacity {}",
                initial_size, capacity
            )));
        }

        Ok(Self {
            data_ptr,
            capacity,
            slot_size,
            initial_head,
            initial_tail,
            initial_size,
            enqueue_sequence: AtomicU64::new(0),
            dequeue_sequence: AtomicU64::new(0),
            publish_cursor: AtomicU64::new(0),
            consume_cursor: AtomicU64::new(0),
            busy_iterations: AtomicU64::new(0),
            size_cached: AtomicU64::new(initial_size),
            size_mutex: Mutex::new(()),
            spin_yield,
        })
    }

    fn validate_offset(name: &'static str, offset: u64, slot_size: u32, slot_region_len: u64) -> Result<()> {
        if offset < CONTROL_BLOCK_LEN as u64 || offset >= CONTROL_BLOCK_LEN as u64 + slot_region_len {
            return Err(Error::InvalidFormat(format!(
                "{} offset {} out of slot region range",
                name, offset
            )));
        }
        if (offset - CONTROL_BLOCK_LEN as u64) % slot_size as u64 != 0 {
            return Err(Error::InvalidFormat(format!("{} offset {} is not slot-aligned", name, offset)));
        }
        Ok(())
    }

    fn head_word(&self) -> &AtomicU64 {
        unsafe { atomic_u64_at(self.data_ptr, CONTROL_HEAD_OFFSET) }
    }

    fn tail_word(&self) -> &AtomicU64 {
        unsafe { atomic_u64_at(self.data_ptr, CONTROL_TAIL_OFFSET) }
    }

    fn size_word(&self) -> &AtomicU64 {
        unsafe { atomic_u64_at(self.data_ptr, CONTROL_SIZE_OFFSET) }
    }

    fn slot_region_len(&self) -> u64 {
        self.capacity as u64 * self.slot_size as u64
    }

    fn producer_slot_offset(&self, claim: u64) -> usize {
        let span = self.slot_region_len();
        let rel = (self.initial_tail - CONTROL_BLOCK_LEN as u64 + (claim - 1) * self.slot_size as u64) % span;
        CONTROL_BLOCK_LEN + rel as usize
    }

    fn consumer_slot_offset(&self, claim: u64) -> usize {
        let span = self.slot_region_len();
        let rel = (self.initial_head - CONTROL_BLOCK_LEN as u64 + (claim - 1) * self.slot_size as u64) % span;
        CONTROL_BLOCK_LEN + rel as usize
    }

    fn wrapped_advance(&self, offset: usize) -> u64 {
        let advanced = offset as u64 + self.slot_size as u64;
        let end = CONTROL_BLOCK_LEN as u64 + self.slot_region_len();
        if advanced >= end {
            CONTROL_BLOCK_LEN as u64
        } else {
            advanced
        }
    }

    fn backoff_spin(&self, backoff: &Backoff) {
        self.busy_iterations.fetch_add(1, Ordering::Relaxed);
        if self.spin_yield {
            backoff.snooze();
        } else {
            backoff.spin();
        }
    }

    /// Writes `bytes` (exactly `slot_size` long) to the next slot, or
    /// returns `Full` if admitting it would overflow capacity.
    pub fn enqueue(&self, bytes: &[u8]) -> Result<EnqueueOutcome> {
        if bytes.len() != self.slot_size as usize {
            return Err(Error::BoundsError(format!(
                "element is {} bytes, slot size is {}",
                bytes.len(),
                self.slot_size
            )));
        }

        let claim = self.enqueue_sequence.fetch_add(1, Ordering::AcqRel) + 1;

        let current_size = self.size_cached.load(Ordering::Acquire) as u128;
        let publish = self.publish_cursor.load(Ordering::Acquire) as u128;
        let in_flight_fill = current_size + claim as u128 - publish;
        if in_flight_fill > self.capacity as u128 {
            self.enqueue_sequence.fetch_sub(1, Ordering::AcqRel);
            trace!(claim, in_flight_fill = %in_flight_fill, capacity = self.capacity, "enqueue rejected: full");
            return Ok(EnqueueOutcome::Full);
        }

        let offset = self.producer_slot_offset(claim);
        let slot = unsafe { std::slice::from_raw_parts_mut(self.data_ptr.add(offset), self.slot_size as usize) };
        slot.copy_from_slice(bytes);

        let backoff = Backoff::new();
        while self.publish_cursor.load(Ordering::Acquire) != claim - 1 {
            self.backoff_spin(&backoff);
        }

        {
            let _guard = self.size_mutex.lock();
            let new_tail = self.wrapped_advance(offset);
            self.tail_word().store(new_tail, Ordering::Release);
            self.size_word().fetch_add(1, Ordering::AcqRel);
            self.size_cached.fetch_add(1, Ordering::AcqRel);
        }

        self.publish_cursor.store(claim, Ordering::Release);
        Ok(EnqueueOutcome::Enqueued)
    }

    /// Removes and returns the oldest element, or `Empty` if none is
    /// available to this claim.
    pub fn dequeue(&self) -> Result<DequeueOutcome> {
        let claim = self.dequeue_sequence.fetch_add(1, Ordering::AcqRel) + 1;

        let publish = self.publish_cursor.load(Ordering::Acquire) as i128;
        let available = publish + self.initial_size as i128 - claim as i128;
        if available < 0 {
            self.dequeue_sequence.fetch_sub(1, Ordering::AcqRel);
            trace!(claim, available, "dequeue rejected: empty");
            return Ok(DequeueOutcome::Empty);
        }

        let offset = self.consumer_slot_offset(claim);
        let slot = unsafe { std::slice::from_raw_parts(self.data_ptr.add(offset), self.slot_size as usize) };
        let bytes = slot.to_vec();

        let backoff = Backoff::new();
        while self.consume_cursor.load(Ordering::Acquire) != claim - 1 {
            self.backoff_spin(&backoff);
        }

        {
            let _guard = self.size_mutex.lock();
            let new_head = self.wrapped_advance(offset);
            self.head_word().store(new_head, Ordering::Release);
            self.size_word().fetch_sub(1, Ordering::AcqRel);
            self.size_cached.fetch_sub(1, Ordering::AcqRel);
        }

        self.consume_cursor.store(claim, Ordering::Release);
        Ok(DequeueOutcome::Some(bytes))
    }

    /// Returns the oldest element without removing it, reading the mapped
    /// head and size live so it reflects concurrent dequeues rather than
    /// any state snapshotted at open.
    pub fn peek(&self) -> Result<DequeueOutcome> {
        if self.size_word().load(Ordering::Acquire) == 0 {
            return Ok(DequeueOutcome::Empty);
        }

        let head_raw = self.head_word().load(Ordering::Acquire);
        let head = if head_raw == 0 { CONTROL_BLOCK_LEN as u64 } else { head_raw };
        let slot = unsafe { std::slice::from_raw_parts(self.data_ptr.add(head as usize), self.slot_size as usize) };
        Ok(DequeueOutcome::Some(slot.to_vec()))
    }

    pub fn size(&self) -> u64 {
        self.size_word().load(Ordering::Acquire)
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn is_full(&self) -> bool {
        self.size() >= self.capacity as u64
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn slot_size(&self) -> u32 {
        self.slot_size
    }

    pub fn busy_iterations(&self) -> u64 {
        self.busy_iterations.load(Ordering::Relaxed)
    }
}
