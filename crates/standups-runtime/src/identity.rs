#![forbid(unsafe_code)]

//! Identifier generation for domain entities.
//!
//! Reducers never call `Uuid::new_v4()` directly; they ask the injected
//! [`UuidGenerator`] so tests can predict every id a flow produces.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of fresh [`Uuid`]s.
#[derive(Clone)]
pub struct UuidGenerator {
    source: Arc<dyn Fn() -> Uuid + Send + Sync>,
}

impl UuidGenerator {
    /// Random version 4 UUIDs.
    #[must_use]
    pub fn random() -> Self {
        Self {
            source: Arc::new(Uuid::new_v4),
        }
    }

    /// Sequential UUIDs starting at `00000000-0000-0000-0000-000000000000`.
    ///
    /// Clones share the counter, so ids stay unique across every holder.
    #[must_use]
    pub fn incrementing() -> Self {
        let counter = Arc::new(AtomicU64::new(0));
        Self {
            source: Arc::new(move || {
                let n = counter.fetch_add(1, Ordering::Relaxed);
                Uuid::from_u128(u128::from(n))
            }),
        }
    }

    /// Always returns `uuid`. Only useful when a flow creates a single id.
    #[must_use]
    pub fn constant(uuid: Uuid) -> Self {
        Self {
            source: Arc::new(move || uuid),
        }
    }

    /// Produce the next identifier.
    #[must_use]
    pub fn generate(&self) -> Uuid {
        (self.source)()
    }
}

impl Default for UuidGenerator {
    fn default() -> Self {
        Self::random()
    }
}

impl fmt::Debug for UuidGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UuidGenerator").finish_non_exhaustive()
    }
}
