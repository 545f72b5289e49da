//! The capability contract every schedulable animation implements.
//!
//! Leaves ([`TimedAnimation`](crate::timed::TimedAnimation)) and composites
//! ([`AnimationSequence`](crate::sequence::AnimationSequence)) share this one
//! trait, so sequences nest inside other sequences without a base-class
//! hierarchy.

use std::time::Duration;

use cadence_api_core::{SequencePosition, TargetId, UpdateState};
use serde::{Deserialize, Serialize};

use crate::error::UnitFault;

/// One schedulable, independently-timed mutation.
///
/// `Send` is required because whole batches of units travel through the
/// pending-action queue from producer threads to the update thread.
pub trait AnimationUnit: Send {
    /// Advance the unit by the tick described in `state`.
    ///
    /// Called once per owning-queue tick. Must be a no-op once the unit is
    /// finished or canceled.
    fn update(
        &mut self,
        state: &mut UpdateState,
        pos: &SequencePosition,
    ) -> Result<UpdateReport, UnitFault>;

    /// How long until this unit would next need re-evaluation.
    ///
    /// Forces the start hook first if the unit has not started, because some
    /// units only compute their fixed duration there. Units with no
    /// predictable finish time answer `default_cycle`.
    fn time_till_next_event(&mut self, default_cycle: Duration) -> Result<Duration, UnitFault>;

    /// Return the unit to its idle state so it can run again.
    fn reset(&mut self);

    /// Identity check against the unit's bound target, used by
    /// cancel-by-target. Composites answer true if any child matches.
    fn animates_target(&self, target: TargetId) -> bool;

    /// The unit's bound target, if it has exactly one. Used for failure
    /// reporting; composites and markers answer `None`.
    fn target(&self) -> Option<TargetId> {
        None
    }

    fn is_started(&self) -> bool;

    fn is_finished(&self) -> bool;

    fn is_canceled(&self) -> bool;

    /// Transitioning to `true` fires the canceled hook exactly once.
    fn set_canceled(&mut self, canceled: bool);

    /// A blocking unit must fully finish before later units in the same
    /// queue are advanced.
    fn is_blocking(&self) -> bool;

    fn ignore_pause_state(&self) -> bool;

    fn set_ignore_pause_state(&mut self, ignore: bool);

    /// Complete for scheduling purposes: canceled units count as finished.
    #[inline]
    fn is_complete(&self) -> bool {
        self.is_finished() || self.is_canceled()
    }
}

pub type BoxedUnit = Box<dyn AnimationUnit>;

/// Result of one `update` call.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct UpdateReport {
    /// Units that reached finished/canceled during this call.
    /// Always 0 or 1 for a leaf; composites sum their children.
    pub finished: usize,
}

impl UpdateReport {
    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn finished_one() -> Self {
        Self { finished: 1 }
    }

    #[inline]
    pub fn merge(&mut self, other: UpdateReport) {
        self.finished += other.finished;
    }
}
