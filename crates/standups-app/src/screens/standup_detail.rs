#![forbid(unsafe_code)]

//! Detail screen of one standup.
//!
//! The screen owns a snapshot of the standup. Whenever a reduction changes
//! that snapshot the screen sends [`StandupDetailDelegate::StandupUpdated`]
//! so the root can copy it back into the list.

use super::standup_form::{StandupForm, StandupFormAction, StandupFormState};
use crate::model::{MeetingId, Standup, StandupId};
use standups_runtime::{Cmd, Reducer, UuidGenerator};

/// Modal content presented over the detail screen.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailDestination {
    ConfirmDeletion,
    Edit(StandupFormState),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandupDetailState {
    pub standup: Standup,
    pub destination: Option<DetailDestination>,
}

impl StandupDetailState {
    #[must_use]
    pub fn new(standup: Standup) -> Self {
        Self {
            standup,
            destination: None,
        }
    }

    #[must_use]
    pub fn id(&self) -> StandupId {
        self.standup.id
    }
}

/// Requests the detail screen makes of its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum StandupDetailDelegate {
    DeleteStandup,
    StandupUpdated(Standup),
    StartMeeting,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StandupDetailAction {
    DeleteButtonTapped,
    ConfirmDeletion,
    DismissDestination,
    DeleteMeetings(Vec<MeetingId>),
    EditButtonTapped,
    Edit(StandupFormAction),
    CancelEditButtonTapped,
    DoneEditingButtonTapped,
    StartMeetingButtonTapped,
    Delegate(StandupDetailDelegate),
}

pub struct StandupDetail {
    uuid: UuidGenerator,
    form: StandupForm,
}

impl StandupDetail {
    pub fn new(uuid: UuidGenerator) -> Self {
        Self {
            form: StandupForm::new(uuid.clone()),
            uuid,
        }
    }

    fn reduce_screen(
        &mut self,
        state: &mut StandupDetailState,
        action: StandupDetailAction,
    ) -> Cmd<StandupDetailAction> {
        match action {
            StandupDetailAction::DeleteButtonTapped => {
                state.destination = Some(DetailDestination::ConfirmDeletion);
                Cmd::none()
            }
            StandupDetailAction::ConfirmDeletion => {
                if state.destination != Some(DetailDestination::ConfirmDeletion) {
                    return Cmd::none();
                }
                state.destination = None;
                Cmd::msg(StandupDetailAction::Delegate(StandupDetailDelegate::DeleteStandup))
            }
            StandupDetailAction::DismissDestination => {
                state.destination = None;
                Cmd::none()
            }
            StandupDetailAction::DeleteMeetings(ids) => {
                state.standup.meetings.remove_all(&ids);
                Cmd::none()
            }
            StandupDetailAction::EditButtonTapped => {
                let form = StandupFormState::new(state.standup.clone(), &self.uuid);
                state.destination = Some(DetailDestination::Edit(form));
                Cmd::none()
            }
            StandupDetailAction::Edit(action) => {
                let Some(DetailDestination::Edit(form)) = state.destination.as_mut() else {
                    tracing::trace!("edit action without an open edit sheet ignored");
                    return Cmd::none();
                };
                self.form.reduce(form, action).map(StandupDetailAction::Edit)
            }
            StandupDetailAction::CancelEditButtonTapped => {
                state.destination = None;
                Cmd::none()
            }
            StandupDetailAction::DoneEditingButtonTapped => {
                let Some(DetailDestination::Edit(form)) = state.destination.take() else {
                    return Cmd::none();
                };
                state.standup = form.standup;
                Cmd::none()
            }
            StandupDetailAction::StartMeetingButtonTapped => {
                Cmd::msg(StandupDetailAction::Delegate(StandupDetailDelegate::StartMeeting))
            }
            StandupDetailAction::Delegate(_) => Cmd::none(),
        }
    }
}

impl Reducer for StandupDetail {
    type State = StandupDetailState;
    type Action = StandupDetailAction;

    fn reduce(&mut self, state: &mut StandupDetailState, action: StandupDetailAction) -> Cmd<StandupDetailAction> {
        if matches!(action, StandupDetailAction::Delegate(_)) {
            return Cmd::none();
        }
        let before = state.standup.clone();
        let cmd = self.reduce_screen(state, action);
        if state.standup == before {
            return cmd;
        }
        Cmd::batch(vec![
            cmd,
            Cmd::msg(StandupDetailAction::Delegate(
                StandupDetailDelegate::StandupUpdated(state.standup.clone()),
            )),
        ])
    }
}
