#![forbid(unsafe_code)]

//! Persistence configuration.
//!
//! # Environment Variables
//!
//! - `STANDUPS_SAVE_DEBOUNCE_MS`: quiescence interval before a save, in
//!   milliseconds. Invalid values are ignored with a warning.

use standups_runtime::StorageKey;
use std::time::Duration;

/// Default quiescence interval before the standups list is written.
pub const DEFAULT_SAVE_DEBOUNCE: Duration = Duration::from_secs(1);

/// Default storage key of the standups document.
pub const STANDUPS_KEY: &str = "standups.json";

/// Configuration for the debounced standups save.
#[derive(Debug, Clone)]
pub struct PersistenceConfig {
    /// Wait after the last change before writing.
    pub debounce: Duration,
    /// Key the standups are stored under.
    pub key: StorageKey,
    /// Whether saves are issued at all.
    pub enabled: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_SAVE_DEBOUNCE,
            key: StorageKey::new(STANDUPS_KEY),
            enabled: true,
        }
    }
}

impl PersistenceConfig {
    /// Configuration that never writes.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = StorageKey::new(key);
        self
    }

    /// Defaults overridden by the environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().apply_debounce_override(std::env::var("STANDUPS_SAVE_DEBOUNCE_MS").ok())
    }

    fn apply_debounce_override(self, value: Option<String>) -> Self {
        let Some(raw) = value else {
            return self;
        };
        match raw.trim().parse::<u64>() {
            Ok(ms) => self.with_debounce(Duration::from_millis(ms)),
            Err(e) => {
                tracing::warn!(value = %raw, error = %e, "ignoring invalid STANDUPS_SAVE_DEBOUNCE_MS");
                self
            }
        }
    }
}
