//! Composite scheduler: ordered primary queue, parallel secondary queues,
//! deferred cross-thread mutation, and the two evaluation strategies
//! (continuous fixed-tick and event-driven).

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use cadence_api_core::{SequencePosition, TargetId, UpdateState};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::{SequenceError, UnitFault};
use crate::markers::WaitFinished;
use crate::pending::{PendingAction, PendingActionQueue, SequenceHandle};
use crate::unit::{AnimationUnit, BoxedUnit, UpdateReport};

/// What a sequence does with a unit that faulted during its tick.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailurePolicy {
    /// Re-raise, aborting the remaining advance for this tick.
    Propagate,
    /// Mark the unit canceled and keep advancing.
    RemoveAndContinue,
}

/// Discrete signals emitted during ticks, drained by the host.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub enum SequenceEvent {
    /// A unit faulted. Raised before the failure policy is consulted.
    AnimationFailed {
        target: Option<TargetId>,
        message: String,
    },
}

/// One jump of the event-driven evaluation.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct EventDrivenStep {
    pub index: usize,
    pub finished: usize,
    pub duration: Duration,
}

/// Full trace of an event-driven evaluation run.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventDrivenReport {
    pub steps: Vec<EventDrivenStep>,
}

impl EventDrivenReport {
    pub fn total_duration(&self) -> Duration {
        self.steps.iter().map(|s| s.duration).sum()
    }

    pub fn total_finished(&self) -> usize {
        self.steps.iter().map(|s| s.finished).sum()
    }

    /// Export as `serde_json::Value` (stable schema for host tooling).
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

type FailureObserver = Box<dyn FnMut(&SequenceEvent) + Send>;

/// Walk a queue front-to-back and answer how long until it next produces an
/// event. Stops at the first blocking unit (its completion always produces
/// an event); with no blocking unit the last unit scanned is what finishes
/// the queue, so its time is used. With several trailing non-blocking units
/// this can overshoot an earlier unit's finish; kept for compatibility with
/// the systems this scheduler hosts.
pub(crate) fn queue_time_till_next_event<'a, I>(
    units: I,
    default_cycle: Duration,
) -> Result<Option<Duration>, UnitFault>
where
    I: Iterator<Item = &'a mut BoxedUnit>,
{
    let mut last: Option<Duration> = None;
    for unit in units {
        if unit.is_complete() {
            continue;
        }
        let t = unit.time_till_next_event(default_cycle)?;
        last = Some(t);
        if unit.is_blocking() {
            return Ok(Some(t));
        }
    }
    Ok(last)
}

/// Debug-only check that `update` is never entered from two threads at once.
/// Nested calls from the same thread are tolerated via the depth counter.
#[cfg(debug_assertions)]
#[derive(Default)]
struct ReentrancyGuard {
    owner: std::sync::Mutex<Option<(std::thread::ThreadId, usize)>>,
}

#[cfg(debug_assertions)]
impl ReentrancyGuard {
    fn enter(&self) {
        let current = std::thread::current().id();
        let mut owner = self.owner.lock().unwrap();
        match owner.as_mut() {
            None => *owner = Some((current, 1)),
            Some((tid, depth)) => {
                assert!(
                    *tid == current,
                    "AnimationSequence::update entered from a second thread while in flight"
                );
                *depth += 1;
            }
        }
    }

    fn exit(&self) {
        let mut owner = self.owner.lock().unwrap();
        if let Some((_, depth)) = owner.as_mut() {
            *depth -= 1;
            if *depth == 0 {
                *owner = None;
            }
        }
    }
}

/// An ordered container of animation units plus independent parallel
/// secondary queues, with a thread-safe inbound action queue for deferred
/// mutation. Implements [`AnimationUnit`] itself, so sequences nest.
pub struct AnimationSequence {
    config: Config,
    primary: VecDeque<BoxedUnit>,
    secondaries: Vec<VecDeque<BoxedUnit>>,
    /// Maintained incrementally; checked against the true size every
    /// reconcile pass.
    primary_len: usize,
    secondary_lens: Vec<usize>,
    pending: Arc<PendingActionQueue>,
    time_till_next_event: Option<Duration>,
    failure_policy: FailurePolicy,
    failure_observer: Option<FailureObserver>,
    events: Vec<SequenceEvent>,
    started: bool,
    canceled: bool,
    blocking: bool,
    ignore_pause: bool,
    #[cfg(debug_assertions)]
    guard: ReentrancyGuard,
}

impl AnimationSequence {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            primary: VecDeque::new(),
            secondaries: Vec::new(),
            primary_len: 0,
            secondary_lens: Vec::new(),
            pending: Arc::new(PendingActionQueue::new()),
            time_till_next_event: None,
            failure_policy: FailurePolicy::Propagate,
            failure_observer: None,
            events: Vec::new(),
            started: false,
            canceled: false,
            blocking: false,
            ignore_pause: false,
            #[cfg(debug_assertions)]
            guard: ReentrancyGuard::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.failure_policy = policy;
    }

    /// Register a callback invoked synchronously for every failure event,
    /// before the failure policy is consulted.
    pub fn set_failure_observer(&mut self, observer: FailureObserver) {
        self.failure_observer = Some(observer);
    }

    /// Cloneable cross-thread endpoint for deferred mutation.
    pub fn handle(&self) -> SequenceHandle {
        SequenceHandle::new(self.pending.clone())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn enqueue_add_primary(&self, units: Vec<BoxedUnit>) {
        self.handle().enqueue_add_primary(units);
    }

    pub fn enqueue_add_secondary(&self, units: Vec<BoxedUnit>) {
        self.handle().enqueue_add_secondary(units);
    }

    pub fn enqueue_cancel_all(&self) {
        self.handle().enqueue_cancel_all();
    }

    pub fn enqueue_cancel_by_target(&self, target: TargetId) {
        self.handle().enqueue_cancel_by_target(target);
    }

    /// Units currently owned across the primary and all secondary queues.
    pub fn count_running_animations(&self) -> usize {
        self.primary_len + self.secondary_lens.iter().sum::<usize>()
    }

    /// Minimum time increment at which some owned unit would change state.
    /// `None` means no owned work (infinitely far away).
    pub fn time_till_next_event(&self) -> Option<Duration> {
        self.time_till_next_event
    }

    /// Take the events accumulated since the last drain.
    pub fn drain_events(&mut self) -> Vec<SequenceEvent> {
        std::mem::take(&mut self.events)
    }

    fn push_event(&mut self, event: SequenceEvent) {
        if self.events.len() < self.config.max_events_per_tick {
            self.events.push(event);
        } else {
            log::debug!("sequence event dropped, per-tick retention cap reached");
        }
    }

    /// Drain the actions visible at entry; actions enqueued during the drain
    /// wait for the next tick.
    fn drain_pending(&mut self) {
        let snapshot = self.pending.pending();
        if snapshot == 0 {
            return;
        }
        let actions = self.pending.drain_snapshot(snapshot);
        for action in actions {
            self.apply_action(action);
        }
    }

    fn apply_action(&mut self, action: PendingAction) {
        match action {
            PendingAction::AddPrimary(units) => {
                if units.is_empty() {
                    return;
                }
                // Order the new batch strictly after in-flight primary work.
                if !self.primary.is_empty() {
                    self.primary.push_back(Box::new(WaitFinished::new()));
                    self.primary_len += 1;
                }
                self.primary_len += units.len();
                self.primary.extend(units);
            }
            PendingAction::AddSecondary(units) => {
                if units.is_empty() {
                    return;
                }
                self.secondary_lens.push(units.len());
                self.secondaries.push(VecDeque::from(units));
            }
            PendingAction::CancelAll => {
                for unit in self
                    .primary
                    .iter_mut()
                    .chain(self.secondaries.iter_mut().flatten())
                {
                    unit.set_canceled(true);
                }
            }
            PendingAction::CancelByTarget(target) => {
                for unit in self
                    .primary
                    .iter_mut()
                    .chain(self.secondaries.iter_mut().flatten())
                {
                    if unit.animates_target(target) {
                        unit.set_canceled(true);
                    }
                }
            }
        }
    }

    /// One scheduling tick. Not reentrant across threads; see the module
    /// docs for the seven-step algorithm.
    pub fn update(&mut self, state: &mut UpdateState) -> Result<UpdateReport, SequenceError> {
        #[cfg(debug_assertions)]
        self.guard.enter();
        let result = self.update_inner(state);
        #[cfg(debug_assertions)]
        self.guard.exit();
        result
    }

    fn update_inner(&mut self, state: &mut UpdateState) -> Result<UpdateReport, SequenceError> {
        self.started = true;

        self.drain_pending();

        if self.primary.is_empty() && self.secondaries.is_empty() {
            self.time_till_next_event = None;
            return Ok(UpdateReport::empty());
        }

        let report = self.advance_queues(state)?;
        // Removal counts completions from earlier ticks that were stuck
        // behind unfinished units, so it triggers a recompute but is not
        // added to the report.
        let removed = self.reconcile();

        if report.finished > 0 || removed > 0 {
            self.time_till_next_event = self.recompute_time_till_next_event()?;
        } else {
            let default_cycle = self.config.default_cycle_time;
            self.time_till_next_event = match self.time_till_next_event {
                Some(t) => Some(t.saturating_sub(state.elapsed).max(default_cycle)),
                None => self.recompute_time_till_next_event()?,
            };
        }

        Ok(report)
    }

    /// Advance the primary queue, then every secondary queue independently.
    fn advance_queues(&mut self, state: &mut UpdateState) -> Result<UpdateReport, SequenceError> {
        let mut report = UpdateReport::empty();
        let policy = self.failure_policy;

        let mut caught = Vec::new();
        let outcome = advance_queue(
            &mut self.primary,
            state,
            policy,
            &mut caught,
            &mut self.failure_observer,
        );
        for event in caught {
            self.push_event(event);
        }
        report.merge(outcome?);

        for i in 0..self.secondaries.len() {
            let mut caught = Vec::new();
            let outcome = advance_queue(
                &mut self.secondaries[i],
                state,
                policy,
                &mut caught,
                &mut self.failure_observer,
            );
            for event in caught {
                self.push_event(event);
            }
            report.merge(outcome?);
        }
        Ok(report)
    }

    /// Pop contiguous complete units from the front of every queue (strict
    /// FIFO; a unit behind an unfinished one is never popped out of order)
    /// and drop secondary queues that became empty. Returns how many units
    /// were removed, which is the count of units that completed this tick.
    fn reconcile(&mut self) -> usize {
        let mut removed = 0;

        while self.primary.front().map(|u| u.is_complete()).unwrap_or(false) {
            self.primary.pop_front();
            self.primary_len -= 1;
            removed += 1;
        }
        assert_eq!(
            self.primary_len,
            self.primary.len(),
            "primary queue counter diverged from queue size"
        );

        for (queue, len) in self.secondaries.iter_mut().zip(self.secondary_lens.iter_mut()) {
            while queue.front().map(|u| u.is_complete()).unwrap_or(false) {
                queue.pop_front();
                *len -= 1;
                removed += 1;
            }
            assert_eq!(
                *len,
                queue.len(),
                "secondary queue counter diverged from queue size"
            );
        }

        let lens = &mut self.secondary_lens;
        let mut keep = lens.iter().map(|l| *l > 0);
        self.secondaries.retain(|_| keep.next().unwrap_or(false));
        lens.retain(|l| *l > 0);

        removed
    }

    fn recompute_time_till_next_event(&mut self) -> Result<Option<Duration>, SequenceError> {
        let default_cycle = self.config.default_cycle_time;
        let mut overall: Option<Duration> = None;

        let mut fold = |candidate: Option<Duration>, overall: &mut Option<Duration>| {
            if let Some(t) = candidate {
                *overall = Some(overall.map_or(t, |o| o.min(t)));
            }
        };

        let primary = queue_time_till_next_event(self.primary.iter_mut(), default_cycle)
            .map_err(|fault| SequenceError::UnitFailed { target: None, fault })?;
        fold(primary, &mut overall);

        for queue in &mut self.secondaries {
            let t = queue_time_till_next_event(queue.iter_mut(), default_cycle)
                .map_err(|fault| SequenceError::UnitFailed { target: None, fault })?;
            fold(t, &mut overall);
        }
        Ok(overall)
    }

    /// Drive `update` with a fixed step until nothing is running. Returns the
    /// number of ticks executed. Deterministic offline evaluation; a rewind
    /// loop or a never-notified event-driven unit will not terminate.
    pub fn calculate_continuous(&mut self, tick: Duration) -> Result<usize, SequenceError> {
        if tick.is_zero() {
            return Err(SequenceError::ZeroTickSize);
        }
        self.drain_pending();
        let mut ticks = 0;
        while self.count_running_animations() > 0 {
            let mut state = UpdateState::new(tick);
            self.update(&mut state)?;
            ticks += 1;
        }
        Ok(ticks)
    }

    /// Drive `update` jumping directly to the next state-changing instant
    /// each iteration. Equivalent end state to [`Self::calculate_continuous`]
    /// in far fewer steps.
    pub fn calculate_event_driven(&mut self) -> Result<EventDrivenReport, SequenceError> {
        self.drain_pending();
        let mut report = EventDrivenReport::default();
        while self.count_running_animations() > 0 {
            let step = match self.time_till_next_event {
                Some(t) => t,
                None => self
                    .recompute_time_till_next_event()?
                    .unwrap_or(self.config.default_cycle_time),
            };
            let mut state = UpdateState::new(step);
            let tick = self.update(&mut state)?;
            report.steps.push(EventDrivenStep {
                index: report.steps.len(),
                finished: tick.finished,
                duration: step,
            });
        }
        Ok(report)
    }

    pub fn set_blocking(&mut self, blocking: bool) {
        self.blocking = blocking;
    }
}

/// Advance one queue in FIFO order, skipping complete units and never
/// descending past a blocking unit. Faults are caught per-unit so one faulty
/// unit cannot abort the whole tick unless the policy says so.
fn advance_queue(
    queue: &mut VecDeque<BoxedUnit>,
    state: &mut UpdateState,
    policy: FailurePolicy,
    events: &mut Vec<SequenceEvent>,
    observer: &mut Option<FailureObserver>,
) -> Result<UpdateReport, SequenceError> {
    let mut report = UpdateReport::empty();
    for (idx, unit) in queue.iter_mut().enumerate() {
        if unit.is_complete() {
            continue;
        }
        let pos = SequencePosition::at(idx);
        state.ignore_pause_state = unit.ignore_pause_state();
        match unit.update(state, &pos) {
            Ok(r) => report.merge(r),
            Err(fault) => {
                let event = SequenceEvent::AnimationFailed {
                    target: unit.target(),
                    message: fault.to_string(),
                };
                log::warn!("animation unit failed: {fault}");
                if let Some(observer) = observer.as_mut() {
                    observer(&event);
                }
                events.push(event);
                match policy {
                    FailurePolicy::RemoveAndContinue => {
                        unit.set_canceled(true);
                        report.finished += 1;
                    }
                    FailurePolicy::Propagate => {
                        return Err(SequenceError::UnitFailed {
                            target: unit.target(),
                            fault,
                        });
                    }
                }
            }
        }
        if unit.is_blocking() {
            break;
        }
    }
    Ok(report)
}

impl AnimationUnit for AnimationSequence {
    fn update(
        &mut self,
        state: &mut UpdateState,
        _pos: &SequencePosition,
    ) -> Result<UpdateReport, UnitFault> {
        AnimationSequence::update(self, state).map_err(|e| UnitFault::Nested(Box::new(e)))
    }

    fn time_till_next_event(&mut self, default_cycle: Duration) -> Result<Duration, UnitFault> {
        match self.recompute_time_till_next_event() {
            Ok(Some(t)) => Ok(t),
            Ok(None) => Ok(default_cycle),
            Err(e) => Err(UnitFault::Nested(Box::new(e))),
        }
    }

    fn reset(&mut self) {
        for unit in self
            .primary
            .iter_mut()
            .chain(self.secondaries.iter_mut().flatten())
        {
            unit.reset();
        }
        self.started = false;
        self.canceled = false;
    }

    fn animates_target(&self, target: TargetId) -> bool {
        self.primary
            .iter()
            .chain(self.secondaries.iter().flatten())
            .any(|u| u.animates_target(target))
    }

    fn is_started(&self) -> bool {
        self.started
    }

    /// A sequence is finished when it has ticked at least once and its
    /// primary queue is drained with no actions waiting; secondary queues
    /// are fire-and-forget and do not gate composite completion. The
    /// started check keeps a nested sequence alive until its first tick
    /// applies the batches queued before nesting.
    fn is_finished(&self) -> bool {
        self.started && self.primary_len == 0 && self.pending.pending() == 0
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
            for unit in self
                .primary
                .iter_mut()
                .chain(self.secondaries.iter_mut().flatten())
            {
                unit.set_canceled(true);
            }
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
