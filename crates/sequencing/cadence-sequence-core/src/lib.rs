//! Engine-agnostic animation sequencing and scheduling core.
//!
//! The building block is the [`AnimationUnit`] trait: one schedulable,
//! independently-timed mutation. Leaves are [`TimedAnimation`]s; the
//! [`AnimationSequence`] composite schedules units across an ordered primary
//! queue and parallel secondary queues, and is itself a unit so sequences
//! nest. Batches are assembled with [`SequenceBuilder`] and handed over as
//! atomic pending actions from any thread; the sequence applies them at the
//! start of its next tick.
//!
//! Two evaluation strategies drive a sequence to completion offline:
//! fixed-step ([`AnimationSequence::calculate_continuous`]) and event-driven
//! ([`AnimationSequence::calculate_event_driven`]), which jumps straight to
//! each next state-changing instant.

pub mod builder;
pub mod config;
pub mod error;
pub mod handler;
pub mod markers;
pub mod pending;
pub mod sequence;
pub mod task;
pub mod timed;
pub mod unit;

pub use builder::{BatchOutcome, BatchSignal, SequenceBuilder};
pub use config::Config;
pub use error::{BuilderError, SequenceError, UnitFault};
pub use handler::AnimationHandler;
pub use markers::{callback, delay, Callback, RewindLoop, WaitFinished};
pub use pending::{PendingAction, SequenceHandle};
pub use sequence::{
    AnimationSequence, EventDrivenReport, EventDrivenStep, FailurePolicy, SequenceEvent,
};
pub use task::{PollableTask, TaskPoll};
pub use timed::{AnimationHooks, NoHooks, TimedAnimation, UnitControl, UnitKind};
pub use unit::{AnimationUnit, BoxedUnit, UpdateReport};
