#![forbid(unsafe_code)]

//! Time capabilities injected into the runtime and the reducers.
//!
//! [`Clock`] is the suspension primitive used by delayed and repeating
//! effects. [`DateGenerator`] supplies wall-clock timestamps to reducers that
//! stamp new records. Both are substitutable: tests use [`ImmediateClock`] or
//! the virtual timeline of [`TestStore`](crate::simulator::TestStore), and
//! [`DateGenerator::constant`].

use crate::cancellation::CancelToken;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;

/// How a [`Clock::sleep`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sleep {
    /// The full duration passed.
    Elapsed,
    /// The token was cancelled before the duration passed.
    Cancelled,
}

/// A cancellable suspension primitive.
pub trait Clock: Send + Sync {
    /// Human-readable name for logging.
    fn name(&self) -> &str;

    /// Suspend the calling thread for `duration` or until `token` is cancelled.
    fn sleep(&self, duration: Duration, token: &CancelToken) -> Sleep;
}

/// Real time, backed by the token's condition variable.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn name(&self) -> &str {
        "SystemClock"
    }

    fn sleep(&self, duration: Duration, token: &CancelToken) -> Sleep {
        if token.wait_timeout(duration) {
            Sleep::Cancelled
        } else {
            Sleep::Elapsed
        }
    }
}

/// A clock whose sleeps finish at once unless the token is already cancelled.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateClock;

impl Clock for ImmediateClock {
    fn name(&self) -> &str {
        "ImmediateClock"
    }

    fn sleep(&self, _duration: Duration, token: &CancelToken) -> Sleep {
        if token.is_cancelled() {
            Sleep::Cancelled
        } else {
            Sleep::Elapsed
        }
    }
}

/// Supplies "now" to reducers.
#[derive(Clone)]
pub struct DateGenerator {
    source: Arc<dyn Fn() -> OffsetDateTime + Send + Sync>,
}

impl DateGenerator {
    /// Current UTC time.
    #[must_use]
    pub fn system() -> Self {
        Self {
            source: Arc::new(OffsetDateTime::now_utc),
        }
    }

    /// Always returns `date`.
    #[must_use]
    pub fn constant(date: OffsetDateTime) -> Self {
        Self {
            source: Arc::new(move || date),
        }
    }

    /// Build from an arbitrary closure.
    pub fn from_fn(f: impl Fn() -> OffsetDateTime + Send + Sync + 'static) -> Self {
        Self {
            source: Arc::new(f),
        }
    }

    /// The current date according to this generator.
    #[must_use]
    pub fn now(&self) -> OffsetDateTime {
        (self.source)()
    }
}

impl Default for DateGenerator {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for DateGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DateGenerator").finish_non_exhaustive()
    }
}
