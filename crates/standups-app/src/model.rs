#![forbid(unsafe_code)]

//! Domain entities: standups, their attendees and recorded meetings.
//!
//! These are plain serde types. The on-disk format is a JSON array of
//! standups with the meeting date in RFC 3339 and the duration in whole
//! seconds:
//!
//! ```json
//! [{"id":"…","attendees":[{"id":"…","name":"Blob"}],"duration":300,
//!   "meetings":[{"id":"…","date":"2026-01-01T09:00:00Z","transcript":"…"}],
//!   "theme":"bubblegum","title":"Design"}]
//! ```

use serde::{Deserialize, Serialize};
use standups_runtime::{Identifiable, IdentifiedVec};
use std::fmt;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            #[must_use]
            pub const fn new(uuid: Uuid) -> Self {
                Self(uuid)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

entity_id!(
    /// Identity of a [`Standup`].
    StandupId
);
entity_id!(
    /// Identity of an [`Attendee`], unique within its standup.
    AttendeeId
);
entity_id!(
    /// Identity of a [`Meeting`], unique within its standup.
    MeetingId
);

/// Color theme of a standup card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Theme {
    #[default]
    Bubblegum,
    Buttercup,
    Indigo,
    Lavender,
    Magenta,
    Navy,
    Orange,
    Oxblood,
    Periwinkle,
    Poppy,
    Purple,
    Seafoam,
    Sky,
    Tan,
    Teal,
    Yellow,
}

impl Theme {
    pub const ALL: &'static [Theme] = &[
        Theme::Bubblegum,
        Theme::Buttercup,
        Theme::Indigo,
        Theme::Lavender,
        Theme::Magenta,
        Theme::Navy,
        Theme::Orange,
        Theme::Oxblood,
        Theme::Periwinkle,
        Theme::Poppy,
        Theme::Purple,
        Theme::Seafoam,
        Theme::Sky,
        Theme::Tan,
        Theme::Teal,
        Theme::Yellow,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Theme::Bubblegum => "Bubblegum",
            Theme::Buttercup => "Buttercup",
            Theme::Indigo => "Indigo",
            Theme::Lavender => "Lavender",
            Theme::Magenta => "Magenta",
            Theme::Navy => "Navy",
            Theme::Orange => "Orange",
            Theme::Oxblood => "Oxblood",
            Theme::Periwinkle => "Periwinkle",
            Theme::Poppy => "Poppy",
            Theme::Purple => "Purple",
            Theme::Seafoam => "Seafoam",
            Theme::Sky => "Sky",
            Theme::Tan => "Tan",
            Theme::Teal => "Teal",
            Theme::Yellow => "Yellow",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: AttendeeId,
    pub name: String,
}

impl Identifiable for Attendee {
    type Id = AttendeeId;

    fn id(&self) -> AttendeeId {
        self.id
    }
}

/// A recorded meeting. Never edited after it is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: MeetingId,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub transcript: String,
}

impl Identifiable for Meeting {
    type Id = MeetingId;

    fn id(&self) -> MeetingId {
        self.id
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standup {
    pub id: StandupId,
    pub attendees: IdentifiedVec<Attendee>,
    #[serde(with = "duration_seconds")]
    pub duration: Duration,
    pub meetings: IdentifiedVec<Meeting>,
    pub theme: Theme,
    pub title: String,
}

impl Standup {
    /// Default meeting length.
    pub const DEFAULT_DURATION: Duration = Duration::from_secs(5 * 60);

    /// An untitled five minute standup without attendees.
    #[must_use]
    pub fn new(id: StandupId) -> Self {
        Self {
            id,
            attendees: IdentifiedVec::new(),
            duration: Self::DEFAULT_DURATION,
            meetings: IdentifiedVec::new(),
            theme: Theme::default(),
            title: String::new(),
        }
    }

    /// Speaking time of each attendee, zero without attendees.
    #[must_use]
    pub fn duration_per_attendee(&self) -> Duration {
        match u32::try_from(self.attendees.len()) {
            Ok(0) | Err(_) => Duration::ZERO,
            Ok(n) => self.duration / n,
        }
    }
}

impl Identifiable for Standup {
    type Id = StandupId;

    fn id(&self) -> StandupId {
        self.id
    }
}

/// Durations are stored as whole seconds.
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}
