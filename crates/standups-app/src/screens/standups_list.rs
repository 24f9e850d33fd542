#![forbid(unsafe_code)]

//! Root list of standups with the "new standup" sheet.

use super::standup_form::{StandupForm, StandupFormAction, StandupFormState};
use crate::model::{Attendee, AttendeeId, Standup, StandupId};
use standups_runtime::{Cmd, IdentifiedVec, Reducer, UuidGenerator};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StandupsListState {
    pub standups: IdentifiedVec<Standup>,
    /// Draft shown in the add sheet, if open.
    pub add: Option<StandupFormState>,
}

impl StandupsListState {
    #[must_use]
    pub fn new(standups: IdentifiedVec<Standup>) -> Self {
        Self {
            standups,
            add: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StandupsListAction {
    AddStandupButtonTapped,
    Add(StandupFormAction),
    ConfirmAddStandupButtonTapped,
    DismissAddStandupButtonTapped,
}

pub struct StandupsList {
    uuid: UuidGenerator,
    form: StandupForm,
}

impl StandupsList {
    pub fn new(uuid: UuidGenerator) -> Self {
        Self {
            form: StandupForm::new(uuid.clone()),
            uuid,
        }
    }
}

impl Reducer for StandupsList {
    type State = StandupsListState;
    type Action = StandupsListAction;

    fn reduce(&mut self, state: &mut StandupsListState, action: StandupsListAction) -> Cmd<StandupsListAction> {
        match action {
            StandupsListAction::AddStandupButtonTapped => {
                let standup = Standup::new(StandupId::new(self.uuid.generate()));
                state.add = Some(StandupFormState::new(standup, &self.uuid));
                Cmd::none()
            }
            StandupsListAction::Add(action) => {
                let Some(form) = state.add.as_mut() else {
                    tracing::trace!("form action without an open add sheet ignored");
                    return Cmd::none();
                };
                self.form.reduce(form, action).map(StandupsListAction::Add)
            }
            StandupsListAction::ConfirmAddStandupButtonTapped => {
                let Some(form) = state.add.take() else {
                    return Cmd::none();
                };
                let mut standup = form.standup;
                standup.attendees.retain(|a| !a.name.trim().is_empty());
                if standup.attendees.is_empty() {
                    standup.attendees.push(Attendee {
                        id: AttendeeId::new(self.uuid.generate()),
                        name: String::new(),
                    });
                }
                tracing::debug!(standup = %standup.id, "standup added");
                state.standups.push(standup);
                Cmd::none()
            }
            StandupsListAction::DismissAddStandupButtonTapped => {
                state.add = None;
                Cmd::none()
            }
        }
    }
}
