#![forbid(unsafe_code)]

//! Meeting recording screen.
//!
//! A one second timer advances the clock and rotates through the attendees.
//! When the last speaker's time is up the meeting ends and the transcript is
//! handed to the parent with [`RecordMeetingDelegate::Save`]. The timer is
//! started from [`RecordMeetingAction::OnAppear`]; when the screen sits on a
//! navigation stack the timer belongs to its stack element and stops when
//! the element is popped. Ending the meeting, by saving or discarding it,
//! stops the timer as well.

use crate::model::{Standup, StandupId};
use standups_runtime::{CancelScope, Cmd, Reducer};
use std::time::Duration;

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordAlert {
    /// Ask whether to end the meeting. `discardable` offers dropping the
    /// transcript instead of saving it.
    EndMeeting { discardable: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordMeetingState {
    pub standup: Standup,
    pub seconds_elapsed: u64,
    pub speaker_index: usize,
    pub transcript: String,
    pub alert: Option<RecordAlert>,
    pub timer_running: bool,
    pub ended: bool,
}

impl RecordMeetingState {
    #[must_use]
    pub fn new(standup: Standup) -> Self {
        Self {
            standup,
            seconds_elapsed: 0,
            speaker_index: 0,
            transcript: String::new(),
            alert: None,
            timer_running: false,
            ended: false,
        }
    }

    #[must_use]
    pub fn id(&self) -> StandupId {
        self.standup.id
    }

    #[must_use]
    pub fn duration_remaining(&self) -> Duration {
        self.standup
            .duration
            .saturating_sub(Duration::from_secs(self.seconds_elapsed))
    }

    fn seconds_per_speaker(&self) -> u64 {
        self.standup.duration_per_attendee().as_secs().max(1)
    }

    fn is_last_speaker(&self) -> bool {
        self.speaker_index + 1 >= self.standup.attendees.len()
    }
}

/// Requests the recording screen makes of its parent.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordMeetingDelegate {
    Save { transcript: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordMeetingAction {
    OnAppear,
    TimerTick,
    NextButtonTapped,
    EndMeetingButtonTapped,
    ConfirmSave,
    ConfirmDiscard,
    DismissAlert,
    TranscriptChanged(String),
    Delegate(RecordMeetingDelegate),
}

/// Only one meeting records at a time: the timer scope is shared by every
/// recording screen this reducer drives.
#[derive(Debug)]
pub struct RecordMeeting {
    timer: CancelScope,
}

impl Default for RecordMeeting {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordMeeting {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timer: CancelScope::new("record-meeting-timer"),
        }
    }

    fn end(&self, state: &mut RecordMeetingState) -> Cmd<RecordMeetingAction> {
        state.ended = true;
        state.alert = None;
        state.timer_running = false;
        Cmd::cancel(&self.timer)
    }

    fn save(&self, state: &mut RecordMeetingState) -> Cmd<RecordMeetingAction> {
        let stop = self.end(state);
        Cmd::batch(vec![
            stop,
            Cmd::msg(RecordMeetingAction::Delegate(RecordMeetingDelegate::Save {
                transcript: state.transcript.clone(),
            })),
        ])
    }
}

impl Reducer for RecordMeeting {
    type State = RecordMeetingState;
    type Action = RecordMeetingAction;

    fn reduce(&mut self, state: &mut RecordMeetingState, action: RecordMeetingAction) -> Cmd<RecordMeetingAction> {
        match action {
            RecordMeetingAction::OnAppear => {
                if state.timer_running || state.ended {
                    return Cmd::none();
                }
                state.timer_running = true;
                Cmd::every_in(&self.timer, "record-meeting-timer", TICK, || {
                    Some(RecordMeetingAction::TimerTick)
                })
            }
            RecordMeetingAction::TimerTick => {
                if state.ended || state.alert.is_some() {
                    return Cmd::none();
                }
                state.seconds_elapsed += 1;
                if state.seconds_elapsed % state.seconds_per_speaker() != 0 {
                    return Cmd::none();
                }
                if state.is_last_speaker() {
                    tracing::debug!(standup = %state.standup.id, "meeting time is up");
                    return self.save(state);
                }
                state.speaker_index += 1;
                Cmd::none()
            }
            RecordMeetingAction::NextButtonTapped => {
                if state.ended {
                    return Cmd::none();
                }
                if state.is_last_speaker() {
                    state.alert = Some(RecordAlert::EndMeeting { discardable: false });
                    return Cmd::none();
                }
                state.speaker_index += 1;
                state.seconds_elapsed = state.speaker_index as u64 * state.seconds_per_speaker();
                Cmd::none()
            }
            RecordMeetingAction::EndMeetingButtonTapped => {
                if !state.ended {
                    state.alert = Some(RecordAlert::EndMeeting { discardable: true });
                }
                Cmd::none()
            }
            RecordMeetingAction::ConfirmSave => {
                if state.alert.is_none() {
                    return Cmd::none();
                }
                self.save(state)
            }
            RecordMeetingAction::ConfirmDiscard => {
                if state.alert != Some(RecordAlert::EndMeeting { discardable: true }) {
                    return Cmd::none();
                }
                tracing::debug!(standup = %state.standup.id, "meeting discarded");
                self.end(state)
            }
            RecordMeetingAction::DismissAlert => {
                state.alert = None;
                Cmd::none()
            }
            RecordMeetingAction::TranscriptChanged(transcript) => {
                state.transcript = transcript;
                Cmd::none()
            }
            RecordMeetingAction::Delegate(_) => Cmd::none(),
        }
    }
}
