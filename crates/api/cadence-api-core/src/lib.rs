//! cadence-api-core: contract types shared between the sequencing core and
//! host engines (scene graph, renderer).
//!
//! Hosts construct an [`UpdateState`] per frame and hand it to the scheduler;
//! the scheduler hands a [`SequencePosition`] to every unit it advances.
//! Targets are identified by opaque [`TargetId`] handles that the scheduler
//! compares but never dereferences.

pub mod ids;
pub mod update_state;

pub use ids::{TargetId, TargetIdAllocator};
pub use update_state::{SequencePosition, UpdateState};
