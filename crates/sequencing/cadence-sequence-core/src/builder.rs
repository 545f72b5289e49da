//! Fluent accumulator that assembles a batch of units and hands it to a
//! sequence as one atomic pending action.

use std::time::Duration;

use cadence_api_core::TargetId;
use crossbeam::channel::{bounded, Receiver};

use crate::error::BuilderError;
use crate::markers::{callback, delay, Callback, RewindLoop, WaitFinished};
use crate::pending::SequenceHandle;
use crate::unit::{AnimationUnit, BoxedUnit};

/// How a notified batch ended.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BatchOutcome {
    Finished,
    Canceled,
}

/// Completion signal for a batch applied with
/// [`SequenceBuilder::apply_notified`]. A dropped batch counts as canceled.
pub struct BatchSignal {
    rx: Receiver<BatchOutcome>,
}

impl BatchSignal {
    /// Non-blocking check; `None` while the batch is still running.
    pub fn try_outcome(&self) -> Option<BatchOutcome> {
        self.rx.try_recv().ok()
    }

    /// Block until the batch finishes or is canceled.
    pub fn wait(&self) -> BatchOutcome {
        self.rx.recv().unwrap_or(BatchOutcome::Canceled)
    }
}

/// Value accumulator bound to one `(sequence, target)` pair.
///
/// `add` and the `apply*` finalizers error after finalization; a builder
/// detached from any sequence can accumulate but never apply.
pub struct SequenceBuilder {
    handle: Option<SequenceHandle>,
    target: Option<TargetId>,
    units: Vec<BoxedUnit>,
    on_finished: Option<Callback>,
    on_canceled: Option<Callback>,
    ignore_pause: Option<bool>,
    applied: bool,
}

impl SequenceBuilder {
    /// Builder bound to a sequence endpoint and a default target.
    pub fn attached(handle: SequenceHandle, target: Option<TargetId>) -> Self {
        Self {
            handle: Some(handle),
            target,
            units: Vec::new(),
            on_finished: None,
            on_canceled: None,
            ignore_pause: None,
            applied: false,
        }
    }

    /// Builder with no owning sequence; every `apply*` fails with
    /// [`BuilderError::Detached`].
    pub fn detached(target: Option<TargetId>) -> Self {
        Self {
            handle: None,
            target,
            units: Vec::new(),
            on_finished: None,
            on_canceled: None,
            ignore_pause: None,
            applied: false,
        }
    }

    #[inline]
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.units.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Append a unit to the batch.
    pub fn add(&mut self, unit: BoxedUnit) -> Result<&mut Self, BuilderError> {
        if self.applied {
            return Err(BuilderError::AlreadyApplied);
        }
        self.units.push(unit);
        Ok(self)
    }

    /// Append a plain fixed-time delay bound to the builder's target.
    pub fn wait(&mut self, duration: Duration) -> Result<&mut Self, BuilderError> {
        self.add(Box::new(delay(self.target, duration)))
    }

    /// Append a zero-duration step that runs `f` when reached.
    pub fn call(&mut self, f: impl FnOnce() + Send + 'static) -> Result<&mut Self, BuilderError> {
        self.add(Box::new(callback(Some(Box::new(f)), None)))
    }

    /// Run `f` once the whole batch has finished.
    pub fn on_finished(&mut self, f: impl FnOnce() + Send + 'static) -> &mut Self {
        self.on_finished = Some(Box::new(f));
        self
    }

    /// Run `f` if the batch's completion step is canceled.
    pub fn on_canceled(&mut self, f: impl FnOnce() + Send + 'static) -> &mut Self {
        self.on_canceled = Some(Box::new(f));
        self
    }

    /// Stamp every unit in the batch with the given ignore-pause flag at
    /// finalization.
    pub fn ignore_pause(&mut self, ignore: bool) -> &mut Self {
        self.ignore_pause = Some(ignore);
        self
    }

    /// Clone the bound handle for an `apply*` call, guarding against reuse.
    fn handle_for_apply(&self) -> Result<SequenceHandle, BuilderError> {
        if self.applied {
            return Err(BuilderError::AlreadyApplied);
        }
        self.handle.clone().ok_or(BuilderError::Detached)
    }

    /// Finalize the accumulated batch: completion callbacks become a
    /// wait-marker plus a callback step, then the ignore-pause flag is
    /// stamped across everything.
    fn finalize(&mut self) -> Result<Vec<BoxedUnit>, BuilderError> {
        if self.units.is_empty() {
            return Err(BuilderError::Empty);
        }
        self.applied = true;

        let mut units = std::mem::take(&mut self.units);
        let on_finished = self.on_finished.take();
        let on_canceled = self.on_canceled.take();
        if on_finished.is_some() || on_canceled.is_some() {
            units.push(Box::new(WaitFinished::new()));
            units.push(Box::new(callback(on_finished, on_canceled)));
        }
        if let Some(ignore) = self.ignore_pause {
            for unit in &mut units {
                unit.set_ignore_pause_state(ignore);
            }
        }
        Ok(units)
    }

    /// Hand the batch to the sequence's primary queue as one atomic action.
    pub fn apply(&mut self) -> Result<(), BuilderError> {
        let handle = self.handle_for_apply()?;
        let units = self.finalize()?;
        handle.enqueue_add_primary(units);
        Ok(())
    }

    /// Hand the batch to a new secondary queue, advancing in parallel with
    /// the primary queue.
    pub fn apply_as_secondary(&mut self) -> Result<(), BuilderError> {
        let handle = self.handle_for_apply()?;
        let units = self.finalize()?;
        handle.enqueue_add_secondary(units);
        Ok(())
    }

    /// Like [`Self::apply`], additionally returning a completion signal.
    pub fn apply_notified(&mut self) -> Result<BatchSignal, BuilderError> {
        let signal = self.arm_notification();
        self.apply()?;
        Ok(signal)
    }

    /// Like [`Self::apply_as_secondary`], additionally returning a
    /// completion signal.
    pub fn apply_as_secondary_notified(&mut self) -> Result<BatchSignal, BuilderError> {
        let signal = self.arm_notification();
        self.apply_as_secondary()?;
        Ok(signal)
    }

    fn arm_notification(&mut self) -> BatchSignal {
        let (tx, rx) = bounded(1);
        let tx_cancel = tx.clone();
        let user_finished = self.on_finished.take();
        let user_canceled = self.on_canceled.take();
        self.on_finished = Some(Box::new(move || {
            if let Some(f) = user_finished {
                f();
            }
            let _ = tx.send(BatchOutcome::Finished);
        }));
        self.on_canceled = Some(Box::new(move || {
            if let Some(f) = user_canceled {
                f();
            }
            let _ = tx_cancel.send(BatchOutcome::Canceled);
        }));
        BatchSignal { rx }
    }

    /// Submit the batch as an infinite loop: once every unit finishes, the
    /// whole batch is reset to idle and runs again, until the owner enqueues
    /// an explicit cancel. Completion callbacks cannot be attached to a loop
    /// that never completes.
    pub fn apply_and_rewind(&mut self) -> Result<(), BuilderError> {
        let handle = self.handle_for_apply()?;
        if self.on_finished.is_some() || self.on_canceled.is_some() {
            return Err(BuilderError::CallbacksUnsupported);
        }
        if self.units.is_empty() {
            return Err(BuilderError::Empty);
        }
        self.applied = true;

        let units = std::mem::take(&mut self.units);
        let mut looped = RewindLoop::new(units);
        if let Some(ignore) = self.ignore_pause {
            // Propagates to every unit in the captured batch.
            looped.set_ignore_pause_state(ignore);
        }
        handle.enqueue_add_primary(vec![Box::new(looped)]);
        Ok(())
    }
}
