#![forbid(unsafe_code)]

//! Standups
//!
//! State and behaviour of a standup meeting timer: a list of standups, a
//! navigation stack of detail, meeting and recording screens, and a
//! debounced save of the list whenever anything changes.
//!
//! # Key Components
//!
//! - [`AppFeature`] - Root reducer composing the list and the path
//! - [`AppState`] / [`AppAction`] - Root state and actions
//! - [`PathState`] / [`PathAction`] - Screens on the navigation stack
//! - [`screens`] - Child features, each with its own delegate actions
//! - [`PersistenceConfig`] - Where and how often the list is saved
//! - [`Dependencies`] - Injected ids, dates, storage and issue reporting
//!
//! # Example
//!
//! ```ignore
//! use standups_app::{bootstrap, AppAction, PersistenceConfig};
//! use standups_app::screens::StandupsListAction;
//!
//! let storage = Arc::new(FileStorage::default_for_app("standups"));
//! let mut store = bootstrap(storage, PersistenceConfig::from_env());
//! store.send(AppAction::StandupsList(StandupsListAction::AddStandupButtonTapped));
//! ```

pub mod app;
pub mod config;
pub mod dependencies;
pub mod model;
pub mod persistence;
pub mod screens;

pub use app::{AppAction, AppFeature, AppStackAction, AppState, PathAction, PathReducer, PathState, PathStateId};
pub use config::{DEFAULT_SAVE_DEBOUNCE, PersistenceConfig, STANDUPS_KEY};
pub use dependencies::Dependencies;
pub use model::{Attendee, AttendeeId, Meeting, MeetingId, Standup, StandupId, Theme};

use standups_runtime::{StorageBackend, Store};
use std::sync::Arc;

/// A threaded store over the saved standups with live dependencies.
pub fn bootstrap(storage: Arc<dyn StorageBackend>, config: PersistenceConfig) -> Store<AppFeature> {
    let state = AppState::load(storage.as_ref(), &config);
    let feature = AppFeature::with_config(Dependencies::live(storage), config);
    Store::new(feature, state)
}
