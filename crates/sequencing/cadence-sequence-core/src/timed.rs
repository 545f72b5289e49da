//! Leaf animation unit: a single timed mutation with its own state machine.
//!
//! Concrete animations plug in through [`AnimationHooks`]; the state machine
//! here only decides *when* hooks run, never *what* they interpolate.

use std::time::Duration;

use cadence_api_core::{SequencePosition, TargetId, UpdateState};

use crate::error::UnitFault;
use crate::task::{PollableTask, TaskPoll};
use crate::unit::{AnimationUnit, UpdateReport};

/// Timing mode of a leaf unit.
pub enum UnitKind {
    /// Finishes once the accumulated time reaches the duration.
    FixedTime(Duration),
    /// Finishes only when a tick hook calls [`UnitControl::notify_finished`].
    EventDriven,
    /// Finishes when the wrapped task completes or is canceled.
    AsyncCall(Box<dyn PollableTask>),
}

/// Which hook the control handle is currently servicing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum HookPhase {
    Start,
    Tick,
}

/// Handle passed to start/tick hooks.
///
/// Carries the unit's progress snapshot plus the two upward signals a hook
/// may send: finishing an event-driven unit and fixing a duration that is
/// only known at start time (distance-based effects).
pub struct UnitControl {
    phase: HookPhase,
    target: Option<TargetId>,
    position: SequencePosition,
    elapsed: Duration,
    current: Duration,
    fixed: Option<Duration>,
    notify_finished: bool,
    new_fixed_time: Option<Duration>,
}

impl UnitControl {
    #[inline]
    pub fn target(&self) -> Option<TargetId> {
        self.target
    }

    #[inline]
    pub fn position(&self) -> SequencePosition {
        self.position
    }

    /// Effective elapsed time this tick (zero while paused, unless opted out).
    #[inline]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Accumulated time since the unit started.
    #[inline]
    pub fn current_time(&self) -> Duration {
        self.current
    }

    #[inline]
    pub fn fixed_time(&self) -> Option<Duration> {
        self.fixed
    }

    /// Normalized progress in `[0, 1]` for fixed-time units, `None` otherwise.
    pub fn progress(&self) -> Option<f32> {
        let fixed = self.fixed?;
        if fixed.is_zero() {
            return Some(1.0);
        }
        Some((self.current.as_secs_f32() / fixed.as_secs_f32()).clamp(0.0, 1.0))
    }

    /// Mark an event-driven unit finished. No effect on other kinds.
    #[inline]
    pub fn notify_finished(&mut self) {
        self.notify_finished = true;
    }

    /// Fix the unit's duration. Only valid from the start hook; the timing
    /// mode is locked once the unit has begun advancing.
    pub fn set_fixed_time(&mut self, duration: Duration) -> Result<(), UnitFault> {
        if self.phase != HookPhase::Start {
            return Err(UnitFault::TimingLocked);
        }
        self.new_fixed_time = Some(duration);
        Ok(())
    }
}

/// Hook set a concrete animation implements against the leaf state machine.
///
/// All methods default to no-ops, so implementations override only what they
/// need. `on_start` runs once before the first advance and is the place to
/// validate against the target; `on_tick` runs every advancing tick.
pub trait AnimationHooks: Send {
    fn on_start(&mut self, ctl: &mut UnitControl) -> Result<(), UnitFault> {
        let _ = ctl;
        Ok(())
    }

    fn on_tick(&mut self, ctl: &mut UnitControl) -> Result<(), UnitFault> {
        let _ = ctl;
        Ok(())
    }

    fn on_finished(&mut self) {}

    fn on_canceled(&mut self) {}
}

/// Hook set that does nothing; used by plain delays and markers.
pub struct NoHooks;

impl AnimationHooks for NoHooks {}

/// A leaf animation unit.
pub struct TimedAnimation {
    target: Option<TargetId>,
    kind: UnitKind,
    current: Duration,
    started: bool,
    finished: bool,
    canceled: bool,
    blocking: bool,
    ignore_pause: bool,
    task_started: bool,
    hooks: Box<dyn AnimationHooks>,
}

impl TimedAnimation {
    pub fn fixed(target: Option<TargetId>, duration: Duration) -> Self {
        Self::with_kind(target, UnitKind::FixedTime(duration))
    }

    pub fn event_driven(target: Option<TargetId>) -> Self {
        Self::with_kind(target, UnitKind::EventDriven)
    }

    pub fn async_call(target: Option<TargetId>, task: Box<dyn PollableTask>) -> Self {
        Self::with_kind(target, UnitKind::AsyncCall(task))
    }

    pub fn with_kind(target: Option<TargetId>, kind: UnitKind) -> Self {
        Self {
            target,
            kind,
            current: Duration::ZERO,
            started: false,
            finished: false,
            canceled: false,
            blocking: false,
            ignore_pause: false,
            task_started: false,
            hooks: Box::new(NoHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Box<dyn AnimationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    pub fn with_ignore_pause(mut self, ignore: bool) -> Self {
        self.ignore_pause = ignore;
        self
    }

    #[inline]
    pub fn current_time(&self) -> Duration {
        self.current
    }

    pub fn fixed_time(&self) -> Option<Duration> {
        match self.kind {
            UnitKind::FixedTime(d) => Some(d),
            _ => None,
        }
    }

    /// Change the fixed duration before the unit first advances.
    pub fn set_fixed_time(&mut self, duration: Duration) -> Result<(), UnitFault> {
        if self.started {
            return Err(UnitFault::TimingLocked);
        }
        self.kind = UnitKind::FixedTime(duration);
        Ok(())
    }

    fn control(&self, phase: HookPhase, pos: &SequencePosition, elapsed: Duration) -> UnitControl {
        UnitControl {
            phase,
            target: self.target,
            position: *pos,
            elapsed,
            current: self.current,
            fixed: self.fixed_time(),
            notify_finished: false,
            new_fixed_time: None,
        }
    }

    /// Run the start hook and apply a duration it may have fixed.
    fn run_start_hook(&mut self, pos: &SequencePosition) -> Result<(), UnitFault> {
        let mut ctl = self.control(HookPhase::Start, pos, Duration::ZERO);
        self.hooks.on_start(&mut ctl)?;
        if let Some(fixed) = ctl.new_fixed_time {
            if matches!(self.kind, UnitKind::FixedTime(_)) {
                self.kind = UnitKind::FixedTime(fixed);
            }
        }
        self.started = true;
        Ok(())
    }

    fn finish(&mut self) -> UpdateReport {
        self.hooks.on_finished();
        self.finished = true;
        UpdateReport::finished_one()
    }
}

impl AnimationUnit for TimedAnimation {
    fn update(
        &mut self,
        state: &mut UpdateState,
        pos: &SequencePosition,
    ) -> Result<UpdateReport, UnitFault> {
        if self.is_complete() {
            return Ok(UpdateReport::empty());
        }
        if state.paused && !self.ignore_pause {
            return Ok(UpdateReport::empty());
        }
        let elapsed = state.elapsed;
        if !self.started {
            self.run_start_hook(pos)?;
        }
        match &mut self.kind {
            UnitKind::FixedTime(fixed) => {
                let fixed = *fixed;
                if fixed.is_zero() {
                    // Zero-length units finish on their first tick without
                    // otherwise advancing time.
                    return Ok(self.finish());
                }
                self.current += elapsed;
                if self.current >= fixed {
                    self.current = fixed;
                    let mut ctl = self.control(HookPhase::Tick, pos, elapsed);
                    self.hooks.on_tick(&mut ctl)?;
                    Ok(self.finish())
                } else {
                    let mut ctl = self.control(HookPhase::Tick, pos, elapsed);
                    self.hooks.on_tick(&mut ctl)?;
                    Ok(UpdateReport::empty())
                }
            }
            UnitKind::EventDriven => {
                self.current += elapsed;
                let mut ctl = self.control(HookPhase::Tick, pos, elapsed);
                self.hooks.on_tick(&mut ctl)?;
                if ctl.notify_finished {
                    Ok(self.finish())
                } else {
                    Ok(UpdateReport::empty())
                }
            }
            UnitKind::AsyncCall(task) => {
                self.current += elapsed;
                if !self.task_started {
                    task.start();
                    self.task_started = true;
                    return Ok(UpdateReport::empty());
                }
                match task.poll() {
                    TaskPoll::Pending => Ok(UpdateReport::empty()),
                    TaskPoll::Finished | TaskPoll::Canceled => Ok(self.finish()),
                    TaskPoll::Failed { message } => Err(UnitFault::Task { message }),
                }
            }
        }
    }

    fn time_till_next_event(&mut self, default_cycle: Duration) -> Result<Duration, UnitFault> {
        if self.is_complete() {
            return Ok(Duration::ZERO);
        }
        // Some units only learn their duration in the start hook, so force it
        // before answering.
        if !self.started {
            self.run_start_hook(&SequencePosition::default())?;
        }
        match self.kind {
            UnitKind::FixedTime(fixed) => Ok(fixed.saturating_sub(self.current)),
            UnitKind::EventDriven | UnitKind::AsyncCall(_) => Ok(default_cycle),
        }
    }

    fn reset(&mut self) {
        self.current = Duration::ZERO;
        self.started = false;
        self.finished = false;
        self.canceled = false;
        self.task_started = false;
    }

    fn animates_target(&self, target: TargetId) -> bool {
        self.target == Some(target)
    }

    fn target(&self) -> Option<TargetId> {
        self.target
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
        if self.canceled == canceled {
            return;
        }
        self.canceled = canceled;
        if canceled {
            if let UnitKind::AsyncCall(task) = &mut self.kind {
                task.cancel();
            }
            self.hooks.on_canceled();
        }
    }

    fn is_blocking(&self) -> bool {
        self.blocking
    }

    fn ignore_pause_state(&self) -> bool {
        self.ignore_pause
    }

    fn set_ignore_pause_state(&mut self, ignore: bool) {
        self.ignore_pause = ignore;
    }
}
