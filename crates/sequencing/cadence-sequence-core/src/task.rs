//! Poll-based wrapper contract for async-call units.
//!
//! The scheduler never awaits inline; an async-call unit starts its task on
//! the first tick and polls it on every later tick, so a slow task never
//! blocks the update thread.

/// State reported by a task poll.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TaskPoll {
    /// Still running; poll again next tick.
    #[default]
    Pending,
    /// Completed successfully.
    Finished,
    /// Cooperatively canceled; the owning unit finishes without error.
    Canceled,
    /// Failed; the owning unit raises a fault.
    Failed { message: String },
}

/// A cancellable background computation driven by the scheduler.
pub trait PollableTask: Send {
    /// Kick off the work. Called exactly once, on the unit's first tick.
    fn start(&mut self);

    /// Non-blocking progress check, called once per subsequent tick.
    fn poll(&mut self) -> TaskPoll;

    /// Request cooperative cancellation. The task may still report
    /// `Pending` on later polls until it winds down.
    fn cancel(&mut self);
}
