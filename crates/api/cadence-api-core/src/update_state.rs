//! Per-tick values exchanged between hosts and the scheduler.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Frame state handed into every scheduling tick.
///
/// Hosts fill in `elapsed` and `paused`; the scheduler toggles
/// `ignore_pause_state` per-unit before delegating, so a unit's hooks can read
/// the effective flag without knowing about its siblings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct UpdateState {
    /// Wall-clock time since the previous tick.
    pub elapsed: Duration,
    /// Whether the surrounding system is paused this tick.
    pub paused: bool,
    /// Set by the scheduler to the currently-advancing unit's flag.
    pub ignore_pause_state: bool,
}

impl UpdateState {
    #[inline]
    pub fn new(elapsed: Duration) -> Self {
        Self {
            elapsed,
            paused: false,
            ignore_pause_state: false,
        }
    }

    #[inline]
    pub fn new_paused(elapsed: Duration) -> Self {
        Self {
            elapsed,
            paused: true,
            ignore_pause_state: false,
        }
    }

    /// Elapsed time as seen by the currently-advancing unit: zero while
    /// paused unless the unit opted out of pausing.
    #[inline]
    pub fn effective_elapsed(&self) -> Duration {
        if self.paused && !self.ignore_pause_state {
            Duration::ZERO
        } else {
            self.elapsed
        }
    }
}

/// Running position of a unit inside the queue currently being advanced.
///
/// Index 0 means everything queued before the unit has already been popped.
/// Units use this for staggered effects and for wait-at-front markers.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SequencePosition {
    pub index: usize,
}

impl SequencePosition {
    #[inline]
    pub fn at(index: usize) -> Self {
        Self { index }
    }

    #[inline]
    pub fn is_front(&self) -> bool {
        self.index == 0
    }
}
