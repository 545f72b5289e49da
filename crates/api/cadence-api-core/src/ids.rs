//! Identity handles for animated targets.

use serde::{Deserialize, Serialize};

/// Opaque handle for an object being animated.
///
/// The scheduler compares these by identity only; it never dereferences a
/// target and never extends its lifetime. Hosts decide what the number means
/// (entity index, tagged pointer, slot key).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u64);

/// Monotonic allocator for [`TargetId`]s.
/// Dense handles improve cache locality; the values are opaque externally.
#[derive(Default, Debug)]
pub struct TargetIdAllocator {
    next: u64,
}

impl TargetIdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc(&mut self) -> TargetId {
        let id = TargetId(self.next);
        self.next = self.next.wrapping_add(1);
        id
    }

    #[inline]
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
