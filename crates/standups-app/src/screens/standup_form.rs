#![forbid(unsafe_code)]

//! Standup editor shared by the add sheet and the edit sheet.

use crate::model::{Attendee, AttendeeId, Standup, Theme};
use standups_runtime::{Cmd, Reducer, UuidGenerator};
use std::time::Duration;

/// Which input has keyboard focus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Attendee(AttendeeId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StandupFormState {
    pub standup: Standup,
    pub focus: Option<FormField>,
}

impl StandupFormState {
    /// Edit `standup`, adding a blank attendee row if it has none.
    #[must_use]
    pub fn new(mut standup: Standup, uuid: &UuidGenerator) -> Self {
        if standup.attendees.is_empty() {
            standup.attendees.push(blank_attendee(uuid));
        }
        Self {
            standup,
            focus: Some(FormField::Title),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StandupFormAction {
    SetTitle(String),
    SetDuration(Duration),
    SetTheme(Theme),
    SetAttendeeName { id: AttendeeId, name: String },
    AddAttendeeButtonTapped,
    DeleteAttendee(AttendeeId),
    SetFocus(Option<FormField>),
}

pub struct StandupForm {
    uuid: UuidGenerator,
}

impl StandupForm {
    pub fn new(uuid: UuidGenerator) -> Self {
        Self { uuid }
    }
}

impl Reducer for StandupForm {
    type State = StandupFormState;
    type Action = StandupFormAction;

    fn reduce(&mut self, state: &mut StandupFormState, action: StandupFormAction) -> Cmd<StandupFormAction> {
        match action {
            StandupFormAction::SetTitle(title) => state.standup.title = title,
            StandupFormAction::SetDuration(duration) => state.standup.duration = duration,
            StandupFormAction::SetTheme(theme) => state.standup.theme = theme,
            StandupFormAction::SetAttendeeName { id, name } => {
                match state.standup.attendees.get_mut(&id) {
                    Some(attendee) => attendee.name = name,
                    None => tracing::trace!(attendee = %id, "rename of missing attendee ignored"),
                }
            }
            StandupFormAction::AddAttendeeButtonTapped => {
                let attendee = blank_attendee(&self.uuid);
                state.focus = Some(FormField::Attendee(attendee.id));
                state.standup.attendees.push(attendee);
            }
            StandupFormAction::DeleteAttendee(id) => {
                let Some(index) = state.standup.attendees.index_of(&id) else {
                    return Cmd::none();
                };
                state.standup.attendees.remove(&id);
                if state.standup.attendees.is_empty() {
                    state.standup.attendees.push(blank_attendee(&self.uuid));
                }
                let next = index.min(state.standup.attendees.len() - 1);
                state.focus = state
                    .standup
                    .attendees
                    .iter()
                    .nth(next)
                    .map(|a| FormField::Attendee(a.id));
            }
            StandupFormAction::SetFocus(focus) => state.focus = focus,
        }
        Cmd::none()
    }
}

fn blank_attendee(uuid: &UuidGenerator) -> Attendee {
    Attendee {
        id: AttendeeId::new(uuid.generate()),
        name: String::new(),
    }
}
