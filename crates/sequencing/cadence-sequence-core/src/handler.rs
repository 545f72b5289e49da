//! Per-owner facade over a sequence.
//!
//! A handler pairs one owner target with a privately-owned
//! [`AnimationSequence`] configured for resilience: a faulty unit is dropped
//! and the rest of the owner's animation keeps running.

use std::time::Duration;

use cadence_api_core::{TargetId, UpdateState};

use crate::builder::SequenceBuilder;
use crate::config::Config;
use crate::error::SequenceError;
use crate::pending::SequenceHandle;
use crate::sequence::{AnimationSequence, FailurePolicy, SequenceEvent};
use crate::unit::UpdateReport;

/// Owns the animation state of a single target.
pub struct AnimationHandler {
    owner: TargetId,
    tag: String,
    sequence: AnimationSequence,
}

impl AnimationHandler {
    /// Handler with a fresh sequence under [`FailurePolicy::RemoveAndContinue`].
    pub fn new(owner: TargetId, tag: impl Into<String>, config: Config) -> Self {
        Self {
            owner,
            tag: tag.into(),
            sequence: AnimationSequence::new(config)
                .with_failure_policy(FailurePolicy::RemoveAndContinue),
        }
    }

    #[inline]
    pub fn owner(&self) -> TargetId {
        self.owner
    }

    /// Human-readable label used in log lines.
    #[inline]
    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Builder pre-bound to this handler's sequence and owner target.
    pub fn builder(&self) -> SequenceBuilder {
        SequenceBuilder::attached(self.sequence.handle(), Some(self.owner))
    }

    /// Cross-thread mutation endpoint for the wrapped sequence.
    pub fn handle(&self) -> SequenceHandle {
        self.sequence.handle()
    }

    pub fn sequence(&self) -> &AnimationSequence {
        &self.sequence
    }

    pub fn sequence_mut(&mut self) -> &mut AnimationSequence {
        &mut self.sequence
    }

    /// Advance the owner's animations by `elapsed`.
    pub fn update(&mut self, elapsed: Duration) -> Result<UpdateReport, SequenceError> {
        let mut state = UpdateState::new(elapsed);
        self.sequence.update(&mut state)
    }

    /// Advance with the global pause flag set.
    pub fn update_paused(&mut self, elapsed: Duration) -> Result<UpdateReport, SequenceError> {
        let mut state = UpdateState::new_paused(elapsed);
        self.sequence.update(&mut state)
    }

    pub fn count_running_animations(&self) -> usize {
        self.sequence.count_running_animations()
    }

    pub fn drain_events(&mut self) -> Vec<SequenceEvent> {
        self.sequence.drain_events()
    }

    /// Cancel everything animating the owner, applied on the next tick.
    pub fn cancel_own(&self) {
        self.sequence.enqueue_cancel_by_target(self.owner);
    }

    /// Cancel every unit in the sequence, applied on the next tick.
    pub fn cancel_all(&self) {
        self.sequence.enqueue_cancel_all();
    }
}
