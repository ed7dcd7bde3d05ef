pub mod codec;
pub mod config;
pub mod container;
pub mod error;
pub mod format;
pub mod ring;

pub use config::QueueConfig;
pub use container::{FileContainer, SharedMapping};
pub use error::{Error, Result};
pub use format::Header;
pub use ring::{DequeueOutcome, EnqueueOutcome, RingBuffer};

#[cfg(test)]
mod proptests {
    use crate::ring::{DequeueOutcome, EnqueueOutcome, RingBuffer, CONTROL_BLOCK_LEN};
    use proptest::prelude::*;

    fn fresh_ring(capacity: u32, slot_size: u32) -> (Vec<u8>, RingBuffer) {
        let len = CONTROL_BLOCK_LEN + capacity as usize * slot_size as usize;
        let mut buf = vec![0u8; len];
        let ring = RingBuffer::new(buf.as_mut_ptr(), buf.len(), capacity, slot_size, true).unwrap();
        (buf, ring)
    }

    fn elem(slot_size: usize, v: u32) -> Vec<u8> {
        let mut b = vec![0u8; slot_size];
        b[..4].copy_from_slice(&v.to_le_bytes());
        b
    }

    proptest! {
        // Property 3: single-threaded FIFO order holds for any sequence
        // that fits within capacity.
        #[test]
        fn fifo_order_holds(values in prop::collection::vec(any::<u32>(), 0..32)) {
            let capacity = 32u32;
            let (_buf, ring) = fresh_ring(capacity, 4);
            prop_assume!(values.len() as u32 <= capacity);

            for &v in &values {
                prop_assert_eq!(ring.enqueue(&elem(4, v)).unwrap(), EnqueueOutcome::Enqueued);
            }
            for &expected in &values {
                match ring.dequeue().unwrap() {
                    DequeueOutcome::Some(bytes) => {
                        prop_assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), expected);
                    }
                    DequeueOutcome::Empty => prop_assert!(false, "unexpected empty"),
                }
            }
        }

        // Property 5: admission soundness -- successful enqueues never
        // push size past capacity, for any interleaving of enqueue/dequeue
        // "coin flips".
        #[test]
        fn admission_never_exceeds_capacity(ops in prop::collection::vec(any::<bool>(), 0..200)) {
            let capacity = 8u32;
            let (_buf, ring) = fresh_ring(capacity, 4);
            let mut v = 0u32;

            for enqueue in ops {
                if enqueue {
                    let _ = ring.enqueue(&elem(4, v)).unwrap();
                    v = v.wrapping_add(1);
                } else {
                    let _ = ring.dequeue().unwrap();
                }
                prop_assert!(ring.size() <= capacity as u64);
            }
        }

        // Property 4: wrap-around never corrupts the queue's notion of
        // emptiness regardless of how many cycles run past capacity.
        #[test]
        fn wrap_around_preserves_emptiness(cycles in 1u32..50, capacity in 1u32..6) {
            let (_buf, ring) = fresh_ring(capacity, 4);
            for i in 0..cycles {
                prop_assert_eq!(ring.enqueue(&elem(4, i)).unwrap(), EnqueueOutcome::Enqueued);
                match ring.dequeue().unwrap() {
                    DequeueOutcome::Some(bytes) => {
                        prop_assert_eq!(u32::from_le_bytes(bytes[..4].try_into().unwrap()), i);
                    }
                    DequeueOutcome::Empty => prop_assert!(false, "unexpected empty"),
                }
            }
            prop_assert_eq!(ring.size(), 0);
            prop_assert!(ring.is_empty());
        }

        // Property 8: peek is idempotent and never mutates size, for any
        // number of consecutive peeks.
        #[test]
        fn peek_is_idempotent(peeks in 1usize..10) {
            let (_buf, ring) = fresh_ring(4, 4);
            ring.enqueue(&elem(4, 42)).unwrap();

            let first = ring.peek().unwrap();
            for _ in 0..peeks {
                prop_assert_eq!(ring.peek().unwrap(), first.clone());
            }
            prop_assert_eq!(ring.size(), 1);
        }
    }
}
