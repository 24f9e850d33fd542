#![forbid(unsafe_code)]

//! Standups Runtime
//!
//! A small Elm/TCA-style runtime: one state tree owned by a store, typed
//! actions reduced by composable [`Reducer`]s, and side effects described as
//! [`Cmd`] values that the store executes.
//!
//! # Key Components
//!
//! - [`Reducer`] - State transition function composed from child reducers
//! - [`Cmd`] - Commands for side effects, including debounced and repeating tasks
//! - [`CancelToken`] / [`CancelScope`] - Cooperative effect cancellation
//! - [`StackState`] / [`ForEachStack`] - Navigation stack with stable element keys
//! - [`IdentifiedVec`] - Ordered collection with unique ids and O(1) lookup
//! - [`StorageBackend`] - Pluggable document storage (memory, file)
//! - [`Store`] - Threaded runtime used by applications
//! - [`TestStore`] - Deterministic virtual-time runtime used by tests
//!
//! # Injected capabilities
//! Reducers never read the wall clock, generate random ids, or touch the
//! file system directly. They receive a [`Clock`], [`DateGenerator`],
//! [`UuidGenerator`], [`StorageBackend`] and [`IssueReporter`] so every flow
//! can be replayed deterministically.

pub mod cancellation;
pub mod clock;
pub mod debug_trace;
pub mod identified;
pub mod identity;
pub mod issue;
pub mod program;
pub mod simulator;
pub mod stack;
pub mod state_persistence;
pub mod store;

pub use cancellation::{CancelScope, CancelToken};
pub use clock::{Clock, DateGenerator, ImmediateClock, Sleep, SystemClock};
pub use identified::{Identifiable, IdentifiedVec};
pub use identity::UuidGenerator;
pub use issue::{Issue, IssueReporter};
pub use program::{Cmd, Reducer, Schedule, Task};
pub use simulator::{CmdRecord, TestStore};
pub use stack::{ForEachStack, StackAction, StackElementId, StackElementState, StackState};
pub use state_persistence::{
    FileStorage, MemoryStorage, StorageBackend, StorageError, StorageKey, StorageResult,
};
pub use store::{Store, StoreConfig};
