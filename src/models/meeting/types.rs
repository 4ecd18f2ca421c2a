use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Reference to a person: either linked to a directory user, or free text.
/// For a linked reference the name mirrors the directory entry; for a
/// freeform reference the name is authoritative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PersonRef {
    Linked { user_id: String, name: String },
    Freeform { name: String },
}

impl PersonRef {
    pub fn user_id(&self) -> Option<&str> {
        match self {
            PersonRef::Linked { user_id, .. } => Some(user_id),
            PersonRef::Freeform { .. } => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PersonRef::Linked { name, .. } => name,
            PersonRef::Freeform { name } => name,
        }
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id() == Some(user_id)
    }
}

/// A named group with its member roster. Group names are unique within one
/// owner (meeting or servant) after case-insensitive, trim-normalized merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupAssignment {
    pub group: String,
    pub served_user_ids: Vec<String>,
}

/// Servant sub-entity, identified by a sub-id unique within the meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServantEntry {
    pub id: String,
    pub person: PersonRef,
    #[serde(default)]
    pub responsibility: String,
    #[serde(default)]
    pub groups_managed: Vec<String>,
    #[serde(default)]
    pub group_assignments: Vec<GroupAssignment>,
    #[serde(default)]
    pub served_user_ids: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Committee {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub member_user_ids: Vec<String>,
    #[serde(default)]
    pub member_names: Vec<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Trip,
    Conference,
    Activity,
    #[default]
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub kind: ActivityKind,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

/// Append-only note attached to a served member. Entries are never edited
/// or deleted; the current note for a member is the most recently updated
/// entry for that member id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberNote {
    pub member_user_id: String,
    pub note: String,
    pub added_by: String,
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Avatar {
    pub url: String,
    pub public_id: Option<String>,
}

/// Meeting aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    pub id: String,
    pub sector_id: String,
    pub name: String,
    pub day: String,
    pub time: String,
    pub avatar: Option<Avatar>,
    pub service_secretary: Option<PersonRef>,
    #[serde(default)]
    pub assistant_secretaries: Vec<PersonRef>,
    #[serde(default)]
    pub servants: Vec<ServantEntry>,
    #[serde(default)]
    pub served_user_ids: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub group_assignments: Vec<GroupAssignment>,
    #[serde(default)]
    pub committees: Vec<Committee>,
    #[serde(default)]
    pub activities: Vec<Activity>,
    #[serde(default)]
    pub member_notes: Vec<MemberNote>,
    #[serde(default)]
    pub notes: String,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    #[serde(default)]
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn new_sub_id() -> String {
    Uuid::new_v4().to_string()
}

// ---------------------------------------------------------------------------
// Write payloads. Lists follow full-replace semantics: submitting a servant
// or committee list replaces the previous one wholesale.
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersonDraft {
    pub user_id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupAssignmentDraft {
    pub group: String,
    #[serde(default)]
    pub served_user_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServantDraft {
    pub user_id: Option<String>,
    pub name: Option<String>,
    #[serde(default)]
    pub responsibility: String,
    #[serde(default)]
    pub groups_managed: Vec<String>,
    #[serde(default)]
    pub group_assignments: Vec<GroupAssignmentDraft>,
    #[serde(default)]
    pub served_user_ids: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitteeDraft {
    pub name: String,
    #[serde(default)]
    pub member_user_ids: Vec<String>,
    #[serde(default)]
    pub member_names: Vec<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ActivityDraft {
    pub name: String,
    #[serde(default)]
    pub kind: ActivityKind,
    pub scheduled_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingDraft {
    pub sector_id: String,
    pub name: String,
    pub day: String,
    pub time: String,
    pub avatar: Option<Avatar>,
    pub service_secretary: Option<PersonDraft>,
    #[serde(default)]
    pub assistant_secretaries: Vec<PersonDraft>,
    #[serde(default)]
    pub servants: Vec<ServantDraft>,
    #[serde(default)]
    pub served_user_ids: Vec<String>,
    #[serde(default)]
    pub groups: Vec<String>,
    #[serde(default)]
    pub group_assignments: Vec<GroupAssignmentDraft>,
    #[serde(default)]
    pub committees: Vec<CommitteeDraft>,
    #[serde(default)]
    pub activities: Vec<ActivityDraft>,
    #[serde(default)]
    pub notes: String,
}

/// Partial update for meeting scalar fields and rosters. `None` leaves the
/// stored value untouched; secretaries use a double Option so the link can
/// be cleared explicitly.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MeetingPatch {
    pub sector_id: Option<String>,
    pub name: Option<String>,
    pub day: Option<String>,
    pub time: Option<String>,
    pub avatar: Option<Option<Avatar>>,
    pub service_secretary: Option<Option<PersonDraft>>,
    pub assistant_secretaries: Option<Vec<PersonDraft>>,
    pub served_user_ids: Option<Vec<String>>,
    pub groups: Option<Vec<String>>,
    pub group_assignments: Option<Vec<GroupAssignmentDraft>>,
    pub notes: Option<String>,
}
