//! Identity allocator: process-wide connection ids.
//!
//! Ids start at 1 and only ever increase; a reconnecting client always gets
//! a fresh one. The counter wraps at `u16::MAX`, which is far beyond the
//! connection volume a single relay process sees.

use std::sync::atomic::{AtomicU16, Ordering};

use crate::state::ConnectionId;

#[derive(Debug, Default)]
pub struct IdentityAllocator {
    issued: AtomicU16,
}

impl IdentityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next connection id.
    pub fn next(&self) -> ConnectionId {
        ConnectionId(self.issued.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
