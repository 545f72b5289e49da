//! Shared instrumented units for sequencing tests: hooks that journal every
//! lifecycle transition, hooks that fault on demand, and a hand-cranked
//! pollable task.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cadence_api_core::TargetId;
use cadence_sequence_core::{
    AnimationHooks, PollableTask, TaskPoll, TimedAnimation, UnitControl, UnitFault,
};

/// One recorded lifecycle transition, tagged with the unit's label.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalEntry {
    Started(&'static str),
    Ticked(&'static str),
    Finished(&'static str),
    Canceled(&'static str),
}

/// Shared, thread-safe journal written by [`RecordingHooks`].
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<JournalEntry>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: JournalEntry) {
        self.entries.lock().unwrap().push(entry);
    }

    pub fn entries(&self) -> Vec<JournalEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// The labels of units that finished, in finish order.
    pub fn finish_order(&self) -> Vec<&'static str> {
        self.entries()
            .into_iter()
            .filter_map(|e| match e {
                JournalEntry::Finished(label) => Some(label),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&JournalEntry) -> bool) -> usize {
        self.entries().iter().filter(|e| predicate(e)).count()
    }
}

/// Hooks that record every transition into a shared [`Journal`].
pub struct RecordingHooks {
    label: &'static str,
    journal: Journal,
}

impl RecordingHooks {
    pub fn new(label: &'static str, journal: Journal) -> Self {
        Self { label, journal }
    }
}

impl AnimationHooks for RecordingHooks {
    fn on_start(&mut self, _ctl: &mut UnitControl) -> Result<(), UnitFault> {
        self.journal.push(JournalEntry::Started(self.label));
        Ok(())
    }

    fn on_tick(&mut self, _ctl: &mut UnitControl) -> Result<(), UnitFault> {
        self.journal.push(JournalEntry::Ticked(self.label));
        Ok(())
    }

    fn on_finished(&mut self) {
        self.journal.push(JournalEntry::Finished(self.label));
    }

    fn on_canceled(&mut self) {
        self.journal.push(JournalEntry::Canceled(self.label));
    }
}

/// Fixed-time unit labelled into a journal.
pub fn recording_unit(
    label: &'static str,
    target: Option<TargetId>,
    duration: Duration,
    journal: &Journal,
) -> TimedAnimation {
    TimedAnimation::fixed(target, duration)
        .with_hooks(Box::new(RecordingHooks::new(label, journal.clone())))
}

/// Hooks whose tick hook fails after a set number of successful ticks.
pub struct FailingHooks {
    remaining: usize,
    message: &'static str,
}

impl FailingHooks {
    /// Fail on the very first tick.
    pub fn immediately(message: &'static str) -> Self {
        Self {
            remaining: 0,
            message,
        }
    }

    /// Allow `ticks` successful ticks, then fail.
    pub fn after_ticks(ticks: usize, message: &'static str) -> Self {
        Self {
            remaining: ticks,
            message,
        }
    }
}

impl AnimationHooks for FailingHooks {
    fn on_tick(&mut self, _ctl: &mut UnitControl) -> Result<(), UnitFault> {
        if self.remaining == 0 {
            return Err(UnitFault::hook(self.message));
        }
        self.remaining -= 1;
        Ok(())
    }
}

/// Fixed-time unit that faults on its first tick.
pub fn failing_unit(
    target: Option<TargetId>,
    duration: Duration,
    message: &'static str,
) -> TimedAnimation {
    TimedAnimation::fixed(target, duration).with_hooks(Box::new(FailingHooks::immediately(message)))
}

/// Externally-observable state of a [`ManualTask`].
#[derive(Default)]
pub struct TaskProbe {
    starts: AtomicUsize,
    polls: AtomicUsize,
    cancels: AtomicUsize,
    outcome: Mutex<TaskPoll>,
}

impl TaskProbe {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn polls(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn cancels(&self) -> usize {
        self.cancels.load(Ordering::SeqCst)
    }

    /// Set what the next poll answers.
    pub fn resolve(&self, outcome: TaskPoll) {
        *self.outcome.lock().unwrap() = outcome;
    }
}

/// Pollable task driven entirely by the test through its [`TaskProbe`].
/// Stays pending until the probe resolves it.
pub struct ManualTask {
    probe: Arc<TaskProbe>,
}

impl ManualTask {
    pub fn new() -> (Self, Arc<TaskProbe>) {
        let probe = Arc::new(TaskProbe::default());
        (
            Self {
                probe: probe.clone(),
            },
            probe,
        )
    }
}

impl PollableTask for ManualTask {
    fn start(&mut self) {
        self.probe.starts.fetch_add(1, Ordering::SeqCst);
    }

    fn poll(&mut self) -> TaskPoll {
        self.probe.polls.fetch_add(1, Ordering::SeqCst);
        self.probe.outcome.lock().unwrap().clone()
    }

    fn cancel(&mut self) {
        self.probe.cancels.fetch_add(1, Ordering::SeqCst);
    }
}
