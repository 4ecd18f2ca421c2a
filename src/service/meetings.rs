//! Meeting operations exposed to callers. Every read resolves access and
//! projects the aggregate for the requesting actor; every write passes the
//! same resolver before touching the document.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::access::capabilities::{
    Capabilities, MANAGE_CLASS, MEETINGS_ACTIVITIES_MANAGE, MEETINGS_COMMITTEES_MANAGE,
    MEETINGS_MEMBERS_NOTE_UPDATE, MEETINGS_SERVANTS_MANAGE, MEETINGS_UPDATE,
};
use crate::access::notes;
use crate::access::projector::{project, ProjectedMeeting};
use crate::access::resolver::{resolve_access, AccessContext, AccessLevel};
use crate::access::scope::GroupRosterIndex;
use crate::errors::{AppError, AppResult};
use crate::models::meeting::normalize::{
    apply_roster_invariants, hydrate_activities, hydrate_committees, hydrate_person,
    hydrate_servants, merge_group_assignments, normalize_text, normalize_unique_groups,
};
use crate::models::meeting::queries::{
    self, MeetingListFilter, ResponsibilitySuggestion, ServantHistoryFilter,
};
use crate::models::meeting::types::{
    ActivityDraft, CommitteeDraft, MeetingDraft, MeetingPatch, Meeting, MemberNote, ServantDraft,
};
use crate::models::user::queries as user_queries;
use crate::models::user::types::UserSummary;
use crate::validation::{ensure_id, ensure_optional_id, non_blank};

/// Everything the actor may see about one served member.
#[derive(Debug, Clone, Serialize)]
pub struct MemberView {
    pub member: UserSummary,
    pub groups: Vec<String>,
    pub current_note: Option<MemberNote>,
    pub notes: Vec<MemberNote>,
}

// ---------------------------------------------------------------------------
// Hydration
// ---------------------------------------------------------------------------

fn collect_referenced_user_ids(meeting: &Meeting) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    let mut push = |id: &str| {
        if !id.is_empty() && !ids.iter().any(|existing| existing == id) {
            ids.push(id.to_string());
        }
    };

    if let Some(person) = &meeting.service_secretary {
        if let Some(id) = person.user_id() {
            push(id);
        }
    }
    for person in &meeting.assistant_secretaries {
        if let Some(id) = person.user_id() {
            push(id);
        }
    }
    for id in &meeting.served_user_ids {
        push(id);
    }
    for assignment in &meeting.group_assignments {
        for id in &assignment.served_user_ids {
            push(id);
        }
    }
    for servant in &meeting.servants {
        if let Some(id) = servant.person.user_id() {
            push(id);
        }
        for id in &servant.served_user_ids {
            push(id);
        }
        for assignment in &servant.group_assignments {
            for id in &assignment.served_user_ids {
                push(id);
            }
        }
    }
    for committee in &meeting.committees {
        for id in &committee.member_user_ids {
            push(id);
        }
    }

    ids
}

fn load_user_map(
    conn: &Connection,
    meeting: &Meeting,
) -> AppResult<HashMap<String, UserSummary>> {
    user_queries::find_summaries(conn, &collect_referenced_user_ids(meeting))
}

fn draft_user_ids(
    secretary: Option<&crate::models::meeting::types::PersonDraft>,
    assistants: &[crate::models::meeting::types::PersonDraft],
    servants: &[ServantDraft],
) -> Vec<String> {
    let mut ids = Vec::new();
    let mut push = |id: &Option<String>| {
        if let Some(id) = id {
            let trimmed = id.trim().to_string();
            if !trimmed.is_empty() && !ids.contains(&trimmed) {
                ids.push(trimmed);
            }
        }
    };
    if let Some(person) = secretary {
        push(&person.user_id);
    }
    for person in assistants {
        push(&person.user_id);
    }
    for servant in servants {
        push(&servant.user_id);
    }
    ids
}

// ---------------------------------------------------------------------------
// Access plumbing
// ---------------------------------------------------------------------------

fn resolve_or_forbid(
    meeting: &Meeting,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<AccessContext> {
    resolve_access(meeting, actor_id, capabilities)
        .ok_or_else(|| AppError::forbidden("No access to this meeting"))
}

/// Writes require the named manage capability (trusted internal callers,
/// identified by an absent actor id, bypass this) and a context that
/// resolves to full access.
fn require_write_access(
    meeting: &Meeting,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
    capability: &str,
) -> AppResult<()> {
    if actor_id.is_some() && !capabilities.has(capability) {
        return Err(AppError::forbidden(capability));
    }
    let ctx = resolve_or_forbid(meeting, actor_id, capabilities)?;
    if ctx.level() != AccessLevel::Full {
        return Err(AppError::forbidden("Insufficient access for this update"));
    }
    Ok(())
}

/// Per-section capability enforcement on create: submitting servants,
/// committees, or activities requires the matching manage capability.
fn require_section_capabilities(
    draft: &MeetingDraft,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<()> {
    if actor_id.is_none() {
        return Ok(());
    }
    let sections: [(bool, &str); 3] = [
        (!draft.servants.is_empty(), MEETINGS_SERVANTS_MANAGE),
        (!draft.committees.is_empty(), MEETINGS_COMMITTEES_MANAGE),
        (!draft.activities.is_empty(), MEETINGS_ACTIVITIES_MANAGE),
    ];
    for (present, capability) in sections {
        if present && !capabilities.has(capability) {
            return Err(AppError::forbidden(capability));
        }
    }
    Ok(())
}

fn load_meeting(conn: &Connection, meeting_id: &str) -> AppResult<Meeting> {
    queries::find_by_id(conn, meeting_id)?.ok_or(AppError::NotFound("Meeting"))
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

pub fn get_meeting_by_id(
    conn: &Connection,
    meeting_id: &str,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let meeting = load_meeting(conn, &meeting_id)?;
    let ctx = resolve_or_forbid(&meeting, actor_id, capabilities)?;
    let users = load_user_map(conn, &meeting)?;
    Ok(project(&meeting, &users, &ctx))
}

/// List meetings matching the filter. Each result is independently
/// access-resolved; meetings the actor may not see are dropped, not
/// masked.
pub fn list_meetings(
    conn: &Connection,
    filter: &MeetingListFilter,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<Vec<ProjectedMeeting>> {
    let mut out = Vec::new();
    for meeting in queries::list(conn, filter)? {
        match resolve_access(&meeting, actor_id, capabilities) {
            Some(ctx) => {
                let users = load_user_map(conn, &meeting)?;
                out.push(project(&meeting, &users, &ctx));
            }
            None => continue,
        }
    }
    Ok(out)
}

fn member_view(
    conn: &Connection,
    meeting: &Meeting,
    index: &GroupRosterIndex,
    ctx: &AccessContext,
    member_id: &str,
) -> AppResult<MemberView> {
    let member = user_queries::find_summaries(conn, &[member_id.to_string()])?
        .remove(member_id)
        .unwrap_or_else(|| UserSummary::unresolved(member_id));

    let all_groups = index.groups_of_member(member_id);
    let groups = match ctx {
        AccessContext::Full { .. } => all_groups,
        AccessContext::Servant { scope, .. } => all_groups
            .into_iter()
            .filter(|g| scope.contains_group(g))
            .collect(),
        AccessContext::Member { scope, .. } => all_groups
            .into_iter()
            .filter(|g| scope.scope.contains_group(g))
            .collect(),
    };

    let (current_note, history) = if notes::can_access_notes(ctx, member_id) {
        let history: Vec<MemberNote> = notes::member_notes(meeting, member_id)
            .into_iter()
            .cloned()
            .collect();
        (notes::current_note(meeting, member_id).cloned(), history)
    } else {
        (None, Vec::new())
    };

    Ok(MemberView {
        member,
        groups,
        current_note,
        notes: history,
    })
}

pub fn get_meeting_member(
    conn: &Connection,
    meeting_id: &str,
    member_id: &str,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<MemberView> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let member_id = ensure_id(member_id, "memberId")?;

    let meeting = load_meeting(conn, &meeting_id)?;
    let ctx = resolve_or_forbid(&meeting, actor_id, capabilities)?;

    let index = GroupRosterIndex::build(&meeting);
    if !index.is_served(&member_id) {
        return Err(AppError::NotFound("Meeting member"));
    }

    // A scoped viewer may only look at members inside their own scope.
    let in_scope = match &ctx {
        AccessContext::Full { .. } => true,
        AccessContext::Servant { scope, .. } => scope.contains_member(&member_id),
        AccessContext::Member { scope, .. } => scope.scope.contains_member(&member_id),
    };
    if !in_scope {
        return Err(AppError::forbidden("Member is outside your scope"));
    }

    member_view(conn, &meeting, &index, &ctx, &member_id)
}

pub fn list_responsibility_suggestions(
    conn: &Connection,
    search: Option<&str>,
    limit: i64,
) -> AppResult<Vec<ResponsibilitySuggestion>> {
    queries::list_responsibility_suggestions(conn, search, limit)
}

/// One meeting a servant served in, with their matching entries.
#[derive(Debug, Clone, Serialize)]
pub struct ServantHistoryRecord {
    pub meeting_id: String,
    pub meeting_name: String,
    pub sector_id: String,
    pub day: String,
    pub time: String,
    pub updated_at: DateTime<Utc>,
    pub servant_entries: Vec<ServantHistoryEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServantHistoryEntry {
    pub name: String,
    pub responsibility: String,
    pub groups_managed: Vec<String>,
    pub notes: String,
}

/// Cross-meeting servant history plus the distinct responsibility labels
/// the servant has held.
#[derive(Debug, Clone, Serialize)]
pub struct ServantHistory {
    pub history: Vec<ServantHistoryRecord>,
    pub responsibilities: Vec<String>,
}

/// Look up a servant's history across meetings, matched by linked user id
/// or by name (case-insensitive). At least one criterion is required;
/// external callers need a manage capability.
pub fn get_servant_history(
    conn: &Connection,
    user_id: Option<&str>,
    name: Option<&str>,
    limit: Option<i64>,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ServantHistory> {
    if actor_id.is_some() && !capabilities.has_any(MANAGE_CLASS) {
        return Err(AppError::forbidden("Servant history requires a manage capability"));
    }

    let user_id = ensure_optional_id(user_id, "userId")?;
    let normalized_name = name
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty());
    if user_id.is_none() && normalized_name.is_none() {
        return Err(AppError::validation(
            "userId",
            "A user id or a name is required",
        ));
    }

    let filter = ServantHistoryFilter {
        user_id,
        normalized_name,
        limit,
    };

    let mut history = Vec::new();
    let mut labels: Vec<String> = Vec::new();
    for meeting in queries::servant_history(conn, &filter)? {
        let servant_entries: Vec<ServantHistoryEntry> = meeting
            .servants
            .iter()
            .filter(|s| filter.matches(s))
            .map(|s| ServantHistoryEntry {
                name: s.person.name().to_string(),
                responsibility: s.responsibility.clone(),
                groups_managed: s.groups_managed.clone(),
                notes: s.notes.clone(),
            })
            .collect();
        labels.extend(
            servant_entries
                .iter()
                .map(|e| e.responsibility.clone())
                .filter(|label| !label.is_empty()),
        );
        history.push(ServantHistoryRecord {
            meeting_id: meeting.id,
            meeting_name: meeting.name,
            sector_id: meeting.sector_id,
            day: meeting.day,
            time: meeting.time,
            updated_at: meeting.updated_at,
            servant_entries,
        });
    }

    Ok(ServantHistory {
        history,
        responsibilities: normalize_unique_groups(&labels),
    })
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Append a note to a member's log. Requires the note-update capability and
/// servant- or full-level access with the member in scope; members cannot
/// edit their own notes.
pub fn update_meeting_member_note(
    conn: &Connection,
    meeting_id: &str,
    member_id: &str,
    note: &str,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<MemberView> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let member_id = ensure_id(member_id, "memberId")?;
    let note = non_blank(note, "note")?;
    let actor_id = match actor_id {
        Some(id) => ensure_id(id, "actorId")?,
        None => return Err(AppError::validation("actorId", "Actor is required")),
    };

    if !capabilities.has(MEETINGS_MEMBERS_NOTE_UPDATE) {
        return Err(AppError::forbidden(MEETINGS_MEMBERS_NOTE_UPDATE));
    }

    let mut meeting = load_meeting(conn, &meeting_id)?;
    let ctx = resolve_or_forbid(&meeting, Some(&actor_id), capabilities)?;

    let index = GroupRosterIndex::build(&meeting);
    if !index.is_served(&member_id) {
        return Err(AppError::NotFound("Meeting member"));
    }
    if !notes::can_access_notes(&ctx, &member_id) {
        return Err(AppError::forbidden("Member notes are outside your scope"));
    }

    let now = Utc::now();
    notes::append_note(&mut meeting, &member_id, &note, &actor_id, now);
    meeting.updated_by = Some(actor_id.clone());
    meeting.updated_at = now;
    queries::save(conn, &meeting)?;

    log::info!("Appended member note on meeting {meeting_id} by {actor_id}");
    member_view(conn, &meeting, &index, &ctx, &member_id)
}

pub fn create_meeting(
    conn: &Connection,
    draft: &MeetingDraft,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    if actor_id.is_some() && !capabilities.has(MEETINGS_UPDATE) {
        return Err(AppError::forbidden(MEETINGS_UPDATE));
    }
    require_section_capabilities(draft, actor_id, capabilities)?;

    let sector_id = ensure_id(&draft.sector_id, "sectorId")?;
    let name = non_blank(&draft.name, "name")?;
    let day = non_blank(&draft.day, "day")?;
    let time = non_blank(&draft.time, "time")?;
    let actor = ensure_optional_id(actor_id, "actorId")?;

    let users = user_queries::find_summaries(
        conn,
        &draft_user_ids(
            draft.service_secretary.as_ref(),
            &draft.assistant_secretaries,
            &draft.servants,
        ),
    )?;

    let service_secretary = draft
        .service_secretary
        .as_ref()
        .map(|p| hydrate_person(p, &users))
        .transpose()?;
    let assistant_secretaries = draft
        .assistant_secretaries
        .iter()
        .map(|p| hydrate_person(p, &users))
        .collect::<AppResult<Vec<_>>>()?;
    let servants = hydrate_servants(&draft.servants, &users)?;
    let committees = hydrate_committees(&draft.committees)?;
    let activities = hydrate_activities(&draft.activities)?;

    let now = Utc::now();
    let mut meeting = Meeting {
        id: Uuid::new_v4().to_string(),
        sector_id,
        name,
        day,
        time,
        avatar: draft.avatar.clone(),
        service_secretary,
        assistant_secretaries,
        servants,
        served_user_ids: draft.served_user_ids.clone(),
        groups: normalize_unique_groups(&draft.groups),
        group_assignments: merge_group_assignments(&draft.group_assignments),
        committees,
        activities,
        member_notes: Vec::new(),
        notes: normalize_text(&draft.notes),
        created_by: actor.clone(),
        updated_by: actor.clone(),
        is_deleted: false,
        deleted_at: None,
        deleted_by: None,
        created_at: now,
        updated_at: now,
    };
    apply_roster_invariants(&mut meeting);

    queries::insert(conn, &meeting)?;
    track_responsibilities(conn, &meeting)?;

    log::info!("Created meeting {} in sector {}", meeting.id, meeting.sector_id);
    let ctx = resolve_or_forbid(&meeting, actor_id, capabilities)?;
    let users = load_user_map(conn, &meeting)?;
    Ok(project(&meeting, &users, &ctx))
}

fn track_responsibilities(conn: &Connection, meeting: &Meeting) -> AppResult<()> {
    let labels: Vec<String> = meeting
        .servants
        .iter()
        .map(|s| s.responsibility.clone())
        .filter(|label| !label.is_empty())
        .collect();
    queries::upsert_responsibilities(conn, &normalize_unique_groups(&labels), Utc::now())
}

fn finish_update(
    conn: &Connection,
    mut meeting: Meeting,
    actor: Option<String>,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    meeting.updated_by = actor;
    meeting.updated_at = Utc::now();
    queries::save(conn, &meeting)?;

    let ctx = resolve_or_forbid(&meeting, actor_id, capabilities)?;
    let users = load_user_map(conn, &meeting)?;
    Ok(project(&meeting, &users, &ctx))
}

/// Patch scalar fields and meeting-level rosters. Submitted group
/// assignments are merged by normalized name; derived unions are
/// re-applied afterwards.
pub fn update_meeting_basic(
    conn: &Connection,
    meeting_id: &str,
    patch: &MeetingPatch,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let actor = ensure_optional_id(actor_id, "actorId")?;

    let mut meeting = load_meeting(conn, &meeting_id)?;
    require_write_access(&meeting, actor_id, capabilities, MEETINGS_UPDATE)?;

    if let Some(sector_id) = &patch.sector_id {
        meeting.sector_id = ensure_id(sector_id, "sectorId")?;
    }
    if let Some(name) = &patch.name {
        meeting.name = non_blank(name, "name")?;
    }
    if let Some(day) = &patch.day {
        meeting.day = non_blank(day, "day")?;
    }
    if let Some(time) = &patch.time {
        meeting.time = non_blank(time, "time")?;
    }
    if let Some(avatar) = &patch.avatar {
        meeting.avatar = avatar.clone();
    }

    let secretary_ids = draft_user_ids(
        patch
            .service_secretary
            .as_ref()
            .and_then(|inner| inner.as_ref()),
        patch.assistant_secretaries.as_deref().unwrap_or(&[]),
        &[],
    );
    let users = user_queries::find_summaries(conn, &secretary_ids)?;

    if let Some(secretary) = &patch.service_secretary {
        meeting.service_secretary = secretary
            .as_ref()
            .map(|p| hydrate_person(p, &users))
            .transpose()?;
    }
    if let Some(assistants) = &patch.assistant_secretaries {
        meeting.assistant_secretaries = assistants
            .iter()
            .map(|p| hydrate_person(p, &users))
            .collect::<AppResult<Vec<_>>>()?;
    }
    if let Some(served) = &patch.served_user_ids {
        meeting.served_user_ids = served.clone();
    }
    if let Some(groups) = &patch.groups {
        meeting.groups = normalize_unique_groups(groups);
    }
    if let Some(assignments) = &patch.group_assignments {
        meeting.group_assignments = merge_group_assignments(assignments);
    }
    if let Some(notes) = &patch.notes {
        meeting.notes = normalize_text(notes);
    }
    apply_roster_invariants(&mut meeting);

    finish_update(conn, meeting, actor, actor_id, capabilities)
}

/// Replace the servant list wholesale.
pub fn update_meeting_servants(
    conn: &Connection,
    meeting_id: &str,
    servants: &[ServantDraft],
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let actor = ensure_optional_id(actor_id, "actorId")?;

    let mut meeting = load_meeting(conn, &meeting_id)?;
    require_write_access(&meeting, actor_id, capabilities, MEETINGS_SERVANTS_MANAGE)?;

    let users = user_queries::find_summaries(conn, &draft_user_ids(None, &[], servants))?;
    meeting.servants = hydrate_servants(servants, &users)?;
    track_responsibilities(conn, &meeting)?;

    finish_update(conn, meeting, actor, actor_id, capabilities)
}

/// Replace the committee list wholesale.
pub fn update_meeting_committees(
    conn: &Connection,
    meeting_id: &str,
    committees: &[CommitteeDraft],
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let actor = ensure_optional_id(actor_id, "actorId")?;

    let mut meeting = load_meeting(conn, &meeting_id)?;
    require_write_access(&meeting, actor_id, capabilities, MEETINGS_COMMITTEES_MANAGE)?;

    meeting.committees = hydrate_committees(committees)?;
    finish_update(conn, meeting, actor, actor_id, capabilities)
}

/// Replace the activity list wholesale.
pub fn update_meeting_activities(
    conn: &Connection,
    meeting_id: &str,
    activities: &[ActivityDraft],
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<ProjectedMeeting> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let actor = ensure_optional_id(actor_id, "actorId")?;

    let mut meeting = load_meeting(conn, &meeting_id)?;
    require_write_access(&meeting, actor_id, capabilities, MEETINGS_ACTIVITIES_MANAGE)?;

    meeting.activities = hydrate_activities(activities)?;
    finish_update(conn, meeting, actor, actor_id, capabilities)
}

/// Soft-delete the aggregate. History (including member notes) is kept.
pub fn delete_meeting(
    conn: &Connection,
    meeting_id: &str,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> AppResult<()> {
    let meeting_id = ensure_id(meeting_id, "id")?;
    let actor = ensure_optional_id(actor_id, "actorId")?;

    let mut meeting = load_meeting(conn, &meeting_id)?;
    require_write_access(&meeting, actor_id, capabilities, MEETINGS_UPDATE)?;

    let now = Utc::now();
    meeting.is_deleted = true;
    meeting.deleted_at = Some(now);
    meeting.deleted_by = actor.clone();
    meeting.updated_by = actor;
    meeting.updated_at = now;
    queries::save(conn, &meeting)?;

    log::info!("Soft-deleted meeting {meeting_id}");
    Ok(())
}
