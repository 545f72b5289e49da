//! Built-in units the sequence and builder synthesize: ordering markers,
//! delays, callback steps, and the rewind loop.

use std::time::Duration;

use cadence_api_core::{SequencePosition, TargetId, UpdateState};

use crate::error::UnitFault;
use crate::sequence::queue_time_till_next_event;
use crate::timed::{AnimationHooks, TimedAnimation};
use crate::unit::{AnimationUnit, BoxedUnit, UpdateReport};

/// Plain fixed-time no-op unit.
pub fn delay(target: Option<TargetId>, duration: Duration) -> TimedAnimation {
    TimedAnimation::fixed(target, duration)
}

/// Deferred one-shot notification, run from the update thread.
pub type Callback = Box<dyn FnOnce() + Send>;

struct CallbackHooks {
    on_finished: Option<Callback>,
    on_canceled: Option<Callback>,
}

impl AnimationHooks for CallbackHooks {
    fn on_finished(&mut self) {
        if let Some(f) = self.on_finished.take() {
            f();
        }
    }

    fn on_canceled(&mut self) {
        if let Some(f) = self.on_canceled.take() {
            f();
        }
    }
}

/// Zero-duration unit that fires callbacks when it finishes or is canceled.
pub fn callback(on_finished: Option<Callback>, on_canceled: Option<Callback>) -> TimedAnimation {
    TimedAnimation::fixed(None, Duration::ZERO).with_hooks(Box::new(CallbackHooks {
        on_finished,
        on_canceled,
    }))
}

/// Blocking marker that finishes on the first tick where it sits at the front
/// of its queue, i.e. everything queued before it has been popped.
///
/// The sequence interposes one automatically when a primary batch is added
/// while earlier primary work is still in flight, which keeps batches
/// strictly ordered without the caller tracking in-flight state.
pub struct WaitFinished {
    started: bool,
    finished: bool,
    canceled: bool,
    ignore_pause: bool,
}

impl WaitFinished {
    pub fn new() -> Self {
        Self {
            started: false,
            finished: false,
            canceled: false,
            ignore_pause: false,
        }
    }
}

impl Default for WaitFinished {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationUnit for WaitFinished {
    fn update(
        &mut self,
        _state: &mut UpdateState,
        pos: &SequencePosition,
    ) -> Result<UpdateReport, UnitFault> {
        if self.is_complete() {
            return Ok(UpdateReport::empty());
        }
        self.started = true;
        if pos.is_front() {
            self.finished = true;
            return Ok(UpdateReport::finished_one());
        }
        Ok(UpdateReport::empty())
    }

    fn time_till_next_event(&mut self, default_cycle: Duration) -> Result<Duration, UnitFault> {
        if self.is_complete() {
            return Ok(Duration::ZERO);
        }
        self.started = true;
        // Finish time depends on the units ahead of it, not on elapsed time.
        Ok(default_cycle)
    }

    fn reset(&mut self) {
        self.started = false;
        self.finished = false;
        self.canceled = false;
    }

    fn animates_target(&self, _target: TargetId) -> bool {
        false
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn is_finished(&self) -> bool {
        self.finished
    }

    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn set_canceled(&mut self, canceled: bool) {
        self.canceled = canceled;
    }

    fn is_blocking(&self) -> bool {
        true
    }

    fn ignore_pause_state(&self) -> bool {
        self.ignore_pause
    }

    fn set_ignore_pause_state(&mut self, ignore: bool) {
        self.ignore_pause = ignore;
    }
}

/// Infinite loop over a batch of units.
///
/// Owns the batch by value: each cycle advances the units as an inner FIFO
/// queue with the usual blocking truncation, and once every unit completes,
/// resets them all back to idle and starts over. Never finishes on its own;
/// the owner stops it with an explicit cancel.
pub struct RewindLoop {
    units: Vec<BoxedUnit>,
    started: bool,
    canceled: bool,
    ignore_pause: bool,
    cycles: usize,
}

impl RewindLoop {
    pub fn new(units: Vec<BoxedUnit>) -> Self {
        Self {
            units,
            started: false,
            canceled: false,
            ignore_pause: false,
            cycles: 0,
        }
    }

    pub fn with_ignore_pause(mut self, ignore: bool) -> Self {
        self.ignore_pause = ignore;
        self
    }

    /// Completed cycles so far.
    #[inline]
    pub fn cycles(&self) -> usize {
        self.cycles
    }
}

impl AnimationUnit for RewindLoop {
    fn update(
        &mut self,
        state: &mut UpdateState,
        _pos: &SequencePosition,
    ) -> Result<UpdateReport, UnitFault> {
        if self.canceled {
            return Ok(UpdateReport::empty());
        }
        self.started = true;

        let mut report = UpdateReport::empty();
        for (idx, unit) in self.units.iter_mut().enumerate() {
            if unit.is_complete() {
                continue;
            }
            let pos = SequencePosition::at(idx);
            state.ignore_pause_state = unit.ignore_pause_state();
            report.merge(unit.update(state, &pos)?);
            // Never descend past a blocking unit this pass, even if it just
            // finished; later units pick up on the next tick.
            if unit.is_blocking() {
                break;
            }
        }

        if self.units.iter().all(|u| u.is_complete()) {
            for unit in &mut self.units {
                unit.reset();
            }
            self.cycles += 1;
        }
        Ok(report)
    }

    fn time_till_next_event(&mut self, default_cycle: Duration) -> Result<Duration, UnitFault> {
        if self.canceled {
            return Ok(Duration::ZERO);
        }
        let t = queue_time_till_next_event(self.units.iter_mut(), default_cycle)?;
        Ok(t.unwrap_or(default_cycle))
    }

    fn reset(&mut self) {
        for unit in &mut self.units {
            unit.reset();
        }
        self.started = false;
        self.canceled = false;
        self.cycles = 0;
    }

    fn animates_target(&self, target: TargetId) -> bool {
        self.units.iter().any(|u| u.animates_target(target))
    }

    fn is_started(&self) -> bool {
        self.started
    }

    fn is_finished(&self) -> bool {
        false
    }

    fn is_canceled(&self) -> bool {
        self.canceled
    }

    fn set_canceled(&mut self, canceled: bool) {
        if self.canceled == canceled {
            return;
        }
        self.canceled = canceled;
        if canceled {
            for unit in &mut self.units {
                unit.set_canceled(true);
            }
        }
    }

    fn is_blocking(&self) -> bool {
        true
    }

    fn ignore_pause_state(&self) -> bool {
        self.ignore_pause
    }

    fn set_ignore_pause_state(&mut self, ignore: bool) {
        self.ignore_pause = ignore;
        for unit in &mut self.units {
            unit.set_ignore_pause_state(ignore);
        }
    }
}
