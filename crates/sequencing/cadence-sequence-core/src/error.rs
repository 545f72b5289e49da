//! Error types for the sequencing core.
//!
//! Two recoverable families (unit faults caught per-unit inside the tick, and
//! builder usage errors raised at the call site) plus one unrecoverable
//! family: internal consistency violations, which panic because they indicate
//! a scheduler bug rather than a unit bug.

use cadence_api_core::TargetId;
use thiserror::Error;

/// Failure raised by a single animation unit during a tick.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum UnitFault {
    /// A user hook (start/tick) returned an error.
    #[error("animation hook failed: {message}")]
    Hook { message: String },

    /// The wrapped task of an async-call unit reported a failure.
    #[error("async task failed: {message}")]
    Task { message: String },

    /// Timing parameters may only change before the unit first advances.
    #[error("timing changed after the unit already started")]
    TimingLocked,

    /// A nested sequence failed while being driven as a unit.
    #[error("nested sequence failed")]
    Nested(#[source] Box<SequenceError>),

    /// Opaque failure carried out of user code.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl UnitFault {
    pub fn hook(message: impl Into<String>) -> Self {
        Self::Hook {
            message: message.into(),
        }
    }

    pub fn task(message: impl Into<String>) -> Self {
        Self::Task {
            message: message.into(),
        }
    }
}

/// Failure surfaced by a sequence tick when the failure policy is
/// [`FailurePolicy::Propagate`](crate::sequence::FailurePolicy::Propagate).
///
/// Callers must expect partial-tick application: units before the faulty one
/// have already advanced this tick.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum SequenceError {
    #[error("animation unit failed (target {target:?})")]
    UnitFailed {
        target: Option<TargetId>,
        #[source]
        fault: UnitFault,
    },

    /// Continuous evaluation with a zero step would never advance anything.
    #[error("continuous evaluation needs a non-zero tick size")]
    ZeroTickSize,
}

/// Synchronous usage errors from [`SequenceBuilder`](crate::builder::SequenceBuilder).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BuilderError {
    #[error("builder was already applied")]
    AlreadyApplied,

    #[error("builder is not attached to a sequence")]
    Detached,

    #[error("builder holds no animation units")]
    Empty,

    #[error("completion callbacks cannot be attached to a rewinding batch")]
    CallbacksUnsupported,
}
