#![forbid(unsafe_code)]

//! Capabilities injected into the reducers.

use standups_runtime::{
    DateGenerator, IssueReporter, MemoryStorage, StorageBackend, UuidGenerator,
};
use std::fmt;
use std::sync::Arc;
use time::OffsetDateTime;

/// Everything a reducer may not produce on its own: ids, timestamps,
/// storage and the invariant-violation sink.
#[derive(Clone)]
pub struct Dependencies {
    pub uuid: UuidGenerator,
    pub now: DateGenerator,
    pub storage: Arc<dyn StorageBackend>,
    pub issues: IssueReporter,
}

impl Dependencies {
    /// Random ids, the system clock and errors logged.
    #[must_use]
    pub fn live(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            uuid: UuidGenerator::random(),
            now: DateGenerator::system(),
            storage,
            issues: IssueReporter::log(),
        }
    }

    /// Sequential ids, a fixed date, memory storage and recorded issues.
    #[must_use]
    pub fn test() -> Self {
        Self {
            uuid: UuidGenerator::incrementing(),
            now: DateGenerator::constant(OffsetDateTime::UNIX_EPOCH),
            storage: Arc::new(MemoryStorage::new()),
            issues: IssueReporter::recording(),
        }
    }

    #[must_use]
    pub fn with_uuid(mut self, uuid: UuidGenerator) -> Self {
        self.uuid = uuid;
        self
    }

    #[must_use]
    pub fn with_now(mut self, now: DateGenerator) -> Self {
        self.now = now;
        self
    }

    #[must_use]
    pub fn with_storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    #[must_use]
    pub fn with_issues(mut self, issues: IssueReporter) -> Self {
        self.issues = issues;
        self
    }
}

impl fmt::Debug for Dependencies {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dependencies")
            .field("uuid", &self.uuid)
            .field("now", &self.now)
            .field("storage", &self.storage.name())
            .field("issues", &self.issues)
            .finish()
    }
}
