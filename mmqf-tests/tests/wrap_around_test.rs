use mmqf::{DequeueOutcome, EnqueueOutcome, Queue};
use mmqf_test_utils::slot_u32;
use tempfile::TempDir;

/// S2: capacity 2, enough enqueue/dequeue cycles to force the tail to wrap
/// back to its starting offset.
#[test]
fn test_wrap_around_preserves_order_and_offsets() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s2.mmqf");
    let queue = Queue::create(&path, 1, 2, 4, false).unwrap();

    assert_eq!(queue.enqueue(&slot_u32(4, 10)).unwrap(), EnqueueOutcome::Enqueued);
    assert_eq!(queue.enqueue(&slot_u32(4, 20)).unwrap(), EnqueueOutcome::Enqueued);

    assert_eq!(queue.dequeue().unwrap(), DequeueOutcome::Some(slot_u32(4, 10)));
    assert_eq!(queue.enqueue(&slot_u32(4, 30)).unwrap(), EnqueueOutcome::Enqueued);
    assert_eq!(queue.dequeue().unwrap(), DequeueOutcome::Some(slot_u32(4, 20)));
    assert_eq!(queue.dequeue().unwrap(), DequeueOutcome::Some(slot_u32(4, 30)));
    assert_eq!(queue.size(), 0);
}

/// Property 4: many more cycles than capacity never reads outside the
/// slot region and always ends up empty.
#[test]
fn test_many_wrap_cycles_stay_within_bounds() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("s2b.mmqf");
    let capacity = 3u32;
    let queue = Queue::create(&path, 1, capacity, 4, false).unwrap();

    for round in 0..(capacity as u32 * 10) {
        assert_eq!(queue.enqueue(&slot_u32(4, round)).unwrap(), EnqueueOutcome::Enqueued);
        assert_eq!(
            queue.dequeue().unwrap(),
            DequeueOutcome::Some(slot_u32(4, round))
        );
    }
    assert_eq!(queue.size(), 0);
    assert!(queue.is_empty());
}
