//! Deferred mutations queued from any thread, drained only by the owning
//! sequence's own tick.
//!
//! Multi-producer, single-consumer: producers push through a cloneable
//! [`SequenceHandle`]; the update thread drains a bounded snapshot at the
//! start of each tick, so actions enqueued mid-drain wait for the next tick.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use cadence_api_core::TargetId;
use crossbeam::queue::SegQueue;

use crate::unit::BoxedUnit;

/// One deferred mutation of a sequence's queues.
pub enum PendingAction {
    AddPrimary(Vec<BoxedUnit>),
    AddSecondary(Vec<BoxedUnit>),
    CancelAll,
    CancelByTarget(TargetId),
}

/// Lock-free action queue with an incrementally-maintained pending counter.
///
/// Producers push the action first and increment the counter after, so the
/// counter never exceeds the true queue length and a drain bounded by a
/// counter snapshot is guaranteed to find every action it pops for.
pub(crate) struct PendingActionQueue {
    actions: SegQueue<PendingAction>,
    pending: AtomicUsize,
}

impl PendingActionQueue {
    pub(crate) fn new() -> Self {
        Self {
            actions: SegQueue::new(),
            pending: AtomicUsize::new(0),
        }
    }

    pub(crate) fn push(&self, action: PendingAction) {
        self.actions.push(action);
        self.pending.fetch_add(1, Ordering::Release);
    }

    /// Number of actions visible to a drain right now.
    pub(crate) fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Pop up to `snapshot` actions. A pop that comes up empty inside the
    /// snapshot bound means the counter diverged from the queue, which is a
    /// scheduler bug.
    pub(crate) fn drain_snapshot(&self, snapshot: usize) -> Vec<PendingAction> {
        let mut drained = Vec::with_capacity(snapshot);
        for _ in 0..snapshot {
            match self.actions.pop() {
                Some(action) => drained.push(action),
                None => panic!("pending-action counter diverged from queue length"),
            }
        }
        let previous = self.pending.fetch_sub(snapshot, Ordering::AcqRel);
        assert!(
            previous >= snapshot,
            "pending-action counter went negative during drain"
        );
        drained
    }
}

/// Cloneable cross-thread endpoint for deferred sequence mutation.
///
/// This is the only way to mutate a sequence's queues from outside its
/// update thread; the queues themselves have no public accessors.
#[derive(Clone)]
pub struct SequenceHandle {
    queue: Arc<PendingActionQueue>,
}

impl SequenceHandle {
    pub(crate) fn new(queue: Arc<PendingActionQueue>) -> Self {
        Self { queue }
    }

    /// Queue a batch for the primary queue, strictly ordered after any
    /// primary work already in flight.
    pub fn enqueue_add_primary(&self, units: Vec<BoxedUnit>) {
        self.queue.push(PendingAction::AddPrimary(units));
    }

    /// Queue a batch as a new, independently-advancing secondary queue.
    pub fn enqueue_add_secondary(&self, units: Vec<BoxedUnit>) {
        self.queue.push(PendingAction::AddSecondary(units));
    }

    /// Mark every owned unit canceled on the next tick.
    pub fn enqueue_cancel_all(&self) {
        self.queue.push(PendingAction::CancelAll);
    }

    /// Mark every unit animating `target` canceled on the next tick.
    pub fn enqueue_cancel_by_target(&self, target: TargetId) {
        self.queue.push(PendingAction::CancelByTarget(target));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timed::TimedAnimation;
    use std::time::Duration;

    #[test]
    fn drain_is_bounded_by_snapshot() {
        let queue = PendingActionQueue::new();
        queue.push(PendingAction::CancelAll);
        queue.push(PendingAction::CancelAll);
        let snapshot = queue.pending();
        queue.push(PendingAction::CancelAll);
        let drained = queue.drain_snapshot(snapshot);
        assert_eq!(drained.len(), 2);
        assert_eq!(queue.pending(), 1);
    }

    #[test]
    fn handle_is_send_across_threads() {
        let queue = Arc::new(PendingActionQueue::new());
        let handle = SequenceHandle::new(queue.clone());
        let worker = std::thread::spawn(move || {
            for _ in 0..64 {
                handle.enqueue_add_primary(vec![Box::new(TimedAnimation::fixed(
                    None,
                    Duration::from_millis(1),
                ))]);
            }
        });
        worker.join().unwrap();
        assert_eq!(queue.pending(), 64);
    }
}
