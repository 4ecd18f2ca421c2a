//! Capability codes consumed by the access resolver. The role→capability
//! table itself is computed elsewhere (authorization cache); this engine
//! only reads the resulting string set.

pub const MEETINGS_VIEW: &str = "meetings.view";
pub const MEETINGS_UPDATE: &str = "meetings.update";
pub const MEETINGS_SERVANTS_MANAGE: &str = "meetings.servants.manage";
pub const MEETINGS_COMMITTEES_MANAGE: &str = "meetings.committees.manage";
pub const MEETINGS_ACTIVITIES_MANAGE: &str = "meetings.activities.manage";

pub const MEETINGS_OWN_VIEW: &str = "meetings.own.view";
pub const MEETINGS_MEMBERS_VIEW: &str = "meetings.members.view";
pub const MEETINGS_MEMBERS_NOTE_UPDATE: &str = "meetings.members.note.update";

/// Any of these grants an unrestricted view of every meeting.
pub const MANAGE_CLASS: &[&str] = &[
    MEETINGS_VIEW,
    MEETINGS_UPDATE,
    MEETINGS_SERVANTS_MANAGE,
    MEETINGS_COMMITTEES_MANAGE,
    MEETINGS_ACTIVITIES_MANAGE,
];

/// Weaker class: lets an actor see meetings they belong to, scoped to
/// their own relationship with each meeting.
pub const VIEW_OWN_CLASS: &[&str] = &[
    MEETINGS_OWN_VIEW,
    MEETINGS_MEMBERS_VIEW,
    MEETINGS_MEMBERS_NOTE_UPDATE,
];

/// Wrapper around capability codes with a `has()` check.
#[derive(Debug, Clone, Default)]
pub struct Capabilities(pub Vec<String>);

impl Capabilities {
    pub fn has(&self, code: &str) -> bool {
        self.0.iter().any(|c| c == code)
    }

    pub fn has_any(&self, codes: &[&str]) -> bool {
        codes.iter().any(|code| self.has(code))
    }

    pub fn from_csv(csv: &str) -> Self {
        let codes = csv
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        Capabilities(codes)
    }
}
