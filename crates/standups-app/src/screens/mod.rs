#![forbid(unsafe_code)]

//! Screen features.
//!
//! Each screen is a [`Reducer`](standups_runtime::Reducer) over its own state
//! and action types. Screens that need their parent's help (deleting
//! themselves, starting a meeting, saving a transcript) send a `Delegate`
//! action. Delegate actions do nothing inside the screen; the root feature
//! interprets them in the same pass.

pub mod record_meeting;
pub mod standup_detail;
pub mod standup_form;
pub mod standups_list;

pub use record_meeting::{RecordAlert, RecordMeeting, RecordMeetingAction, RecordMeetingDelegate, RecordMeetingState};
pub use standup_detail::{
    DetailDestination, StandupDetail, StandupDetailAction, StandupDetailDelegate,
    StandupDetailState,
};
pub use standup_form::{FormField, StandupForm, StandupFormAction, StandupFormState};
pub use standups_list::{StandupsList, StandupsListAction, StandupsListState};
