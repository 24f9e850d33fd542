#![forbid(unsafe_code)]

//! Root feature: the standups list, the navigation path and the glue
//! between them.
//!
//! # Pass order
//!
//! Every action is reduced in four steps:
//!
//! 1. The child reducer that owns the action runs (the list, or the path
//!    element addressed by the action).
//! 2. Delegate actions are interpreted: they edit the list or the path.
//! 3. Effects of path elements that are no longer on the stack are cancelled.
//! 4. A debounced save of the standups list is issued.
//!
//! # Persistence
//!
//! Each pass replaces the pending save in the `save-debounce` scope. The save
//! waits [`PersistenceConfig::debounce`], then writes the standups as they
//! were when the request was issued. Failures are logged and dropped: the
//! in-memory list stays authoritative and the next change retries.

use crate::config::PersistenceConfig;
use crate::dependencies::Dependencies;
use crate::model::{Meeting, MeetingId, Standup, StandupId};
use crate::persistence;
use crate::screens::{
    RecordMeeting, RecordMeetingAction, RecordMeetingDelegate, RecordMeetingState, StandupDetail,
    StandupDetailAction, StandupDetailDelegate, StandupDetailState, StandupsList,
    StandupsListAction, StandupsListState,
};
use standups_runtime::{
    CancelScope, Cmd, ForEachStack, IdentifiedVec, Reducer, StackAction, StackElementId,
    StackElementState, StackState, StorageBackend,
};
use std::sync::Arc;
use tracing::{debug, trace, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Path
// ─────────────────────────────────────────────────────────────────────────────

/// A screen on the navigation stack.
#[derive(Debug, Clone, PartialEq)]
pub enum PathState {
    Detail(StandupDetailState),
    /// Read-only view of a past meeting.
    Meeting { meeting: Meeting, standup: Standup },
    Record(RecordMeetingState),
}

/// Derived identity of a path screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathStateId {
    Detail(StandupId),
    Record(StandupId),
}

impl StackElementState for PathState {
    type StateId = PathStateId;

    /// Meeting screens have no identity of their own and are only
    /// addressable by stack key.
    fn state_id(&self) -> Option<PathStateId> {
        match self {
            PathState::Detail(detail) => Some(PathStateId::Detail(detail.id())),
            PathState::Meeting { .. } => None,
            PathState::Record(record) => Some(PathStateId::Record(record.id())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PathAction {
    Detail(StandupDetailAction),
    Record(RecordMeetingAction),
}

/// Dispatches path actions to the screen they belong to.
pub struct PathReducer {
    detail: StandupDetail,
    record: RecordMeeting,
}

impl PathReducer {
    pub fn new(deps: &Dependencies) -> Self {
        Self {
            detail: StandupDetail::new(deps.uuid.clone()),
            record: RecordMeeting::new(),
        }
    }
}

impl Reducer for PathReducer {
    type State = PathState;
    type Action = PathAction;

    fn reduce(&mut self, state: &mut PathState, action: PathAction) -> Cmd<PathAction> {
        match (state, action) {
            (PathState::Detail(detail), PathAction::Detail(action)) => {
                self.detail.reduce(detail, action).map(PathAction::Detail)
            }
            (PathState::Record(record), PathAction::Record(action)) => {
                self.record.reduce(record, action).map(PathAction::Record)
            }
            (state, action) => {
                trace!(?state, ?action, "path action does not match screen");
                Cmd::none()
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// App
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppState {
    pub path: StackState<PathState>,
    pub standups_list: StandupsListState,
}

impl AppState {
    #[must_use]
    pub fn new(standups: IdentifiedVec<Standup>) -> Self {
        Self {
            path: StackState::new(),
            standups_list: StandupsListState::new(standups),
        }
    }

    /// Start-up state from the saved standups.
    ///
    /// Missing or unreadable data yields an empty list.
    #[must_use]
    pub fn load(storage: &dyn StorageBackend, config: &PersistenceConfig) -> Self {
        match persistence::load_standups(storage, &config.key) {
            Ok(Some(standups)) => {
                debug!(count = standups.len(), backend = storage.name(), "loaded standups");
                Self::new(standups)
            }
            Ok(None) => Self::default(),
            Err(e) => {
                warn!(error = %e, backend = storage.name(), key = %config.key, "failed to load standups, starting empty");
                Self::default()
            }
        }
    }
}

pub type AppStackAction = StackAction<PathState, PathAction>;

#[derive(Debug, Clone, PartialEq)]
pub enum AppAction {
    Path(AppStackAction),
    StandupsList(StandupsListAction),
}

impl AppAction {
    /// Action addressed to the path element `id`.
    #[must_use]
    pub fn element(id: StackElementId, action: PathAction) -> Self {
        AppAction::Path(StackAction::Element { id, action })
    }
}

/// A delegate lifted out of an action before the child consumes it.
enum Delegate {
    Detail(StackElementId, StandupDetailDelegate),
    RecordSave { transcript: String },
}

impl Delegate {
    fn of(action: &AppAction) -> Option<Self> {
        let AppAction::Path(StackAction::Element { id, action }) = action else {
            return None;
        };
        match action {
            PathAction::Detail(StandupDetailAction::Delegate(delegate)) => {
                Some(Delegate::Detail(*id, delegate.clone()))
            }
            PathAction::Record(RecordMeetingAction::Delegate(RecordMeetingDelegate::Save {
                transcript,
            })) => Some(Delegate::RecordSave {
                transcript: transcript.clone(),
            }),
            _ => None,
        }
    }
}

/// The root reducer.
pub struct AppFeature {
    deps: Dependencies,
    config: PersistenceConfig,
    standups_list: StandupsList,
    path: ForEachStack<PathReducer>,
    save_scope: CancelScope,
}

impl AppFeature {
    pub fn new(deps: Dependencies) -> Self {
        Self::with_config(deps, PersistenceConfig::default())
    }

    pub fn with_config(deps: Dependencies, config: PersistenceConfig) -> Self {
        Self {
            standups_list: StandupsList::new(deps.uuid.clone()),
            path: ForEachStack::new(PathReducer::new(&deps)),
            save_scope: CancelScope::new("save-debounce"),
            deps,
            config,
        }
    }

    pub fn dependencies(&self) -> &Dependencies {
        &self.deps
    }

    pub fn config(&self) -> &PersistenceConfig {
        &self.config
    }

    /// Scope holding the pending save, if any.
    pub fn save_scope(&self) -> &CancelScope {
        &self.save_scope
    }

    /// Number of path elements that currently own effects.
    pub fn active_path_scopes(&self) -> usize {
        self.path.active_scopes()
    }

    fn interpret(&self, state: &mut AppState, delegate: Delegate) {
        match delegate {
            Delegate::Detail(id, delegate) => self.interpret_detail(state, id, delegate),
            Delegate::RecordSave { transcript } => self.save_meeting(state, transcript),
        }
    }

    fn interpret_detail(&self, state: &mut AppState, id: StackElementId, delegate: StandupDetailDelegate) {
        let Some(PathState::Detail(detail)) = state.path.get(id) else {
            trace!(element = %id, "detail delegate from missing element ignored");
            return;
        };
        match delegate {
            StandupDetailDelegate::DeleteStandup => {
                let standup_id = detail.id();
                if state.standups_list.standups.remove(&standup_id).is_some() {
                    debug!(standup = %standup_id, "standup deleted");
                }
            }
            StandupDetailDelegate::StandupUpdated(standup) => {
                state.standups_list.standups.upsert(standup);
            }
            StandupDetailDelegate::StartMeeting => {
                let record = RecordMeetingState::new(detail.standup.clone());
                let id = state.path.push(PathState::Record(record));
                debug!(element = %id, "meeting started");
            }
        }
    }

    /// Prepend the meeting to the detail screen below the top of the stack,
    /// then copy that standup into the list.
    fn save_meeting(&self, state: &mut AppState, transcript: String) {
        let Some((detail_id, _)) = state.path.second_to_last() else {
            self.deps.issues.report(
                "record meeting is the only element in the stack; a detail screen should precede it",
            );
            return;
        };
        let Some(PathState::Detail(detail)) = state.path.get_mut(detail_id) else {
            trace!(element = %detail_id, "element below record meeting is not a detail screen");
            return;
        };
        let meeting = Meeting {
            id: MeetingId::new(self.deps.uuid.generate()),
            date: self.deps.now.now(),
            transcript,
        };
        let meeting_id = meeting.id;
        if !detail.standup.meetings.insert(0, meeting) {
            warn!(meeting = %meeting_id, "generated meeting id already in use, meeting dropped");
            return;
        }
        debug!(standup = %detail.standup.id, meeting = %meeting_id, "meeting saved");
        state.standups_list.standups.upsert(detail.standup.clone());
    }

    fn schedule_save(&self, state: &AppState) -> Cmd<AppAction> {
        if !self.config.enabled {
            return Cmd::none();
        }
        let standups = state.standups_list.standups.clone();
        let storage = Arc::clone(&self.deps.storage);
        let key = self.config.key.clone();
        Cmd::debounce(&self.save_scope, "save-standups", self.config.debounce, move || {
            match persistence::save_standups(storage.as_ref(), &key, &standups) {
                Ok(()) => debug!(count = standups.len(), key = %key, "standups saved"),
                Err(e) => warn!(error = %e, key = %key, "failed to save standups"),
            }
            None
        })
    }
}

impl Reducer for AppFeature {
    type State = AppState;
    type Action = AppAction;

    fn reduce(&mut self, state: &mut AppState, action: AppAction) -> Cmd<AppAction> {
        let delegate = Delegate::of(&action);

        let child = match action {
            AppAction::StandupsList(action) => self
                .standups_list
                .reduce(&mut state.standups_list, action)
                .map(AppAction::StandupsList),
            AppAction::Path(action) => self.path.reduce(&mut state.path, action).map(AppAction::Path),
        };

        if let Some(delegate) = delegate {
            self.interpret(state, delegate);
        }

        self.path.reconcile(&state.path);

        // Save first so saves issued by follow-up messages replace it.
        Cmd::batch(vec![self.schedule_save(state), child])
    }
}
