//! Projection of the meeting aggregate into an actor-specific view.
//!
//! One function dispatches on `AccessContext`, so every field of the
//! aggregate is projected consistently across the three levels. The shared
//! rule: never emit an identity outside the computed scope.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::resolver::{AccessContext, AccessLevel};
use super::scope::ScopeSet;
use crate::models::meeting::types::{
    Activity, ActivityKind, Avatar, Committee, GroupAssignment, Meeting, PersonRef, ServantEntry,
};
use crate::models::user::types::UserSummary;

/// Tells the consumer what the actor may see, so UIs can adapt without
/// re-deriving permissions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerContext {
    pub access_level: AccessLevel,
    pub can_view_all_details: bool,
    pub can_view_all_served_users: bool,
    pub can_view_leadership: bool,
    pub can_view_servants: bool,
    pub can_view_committees: bool,
    pub can_view_activities: bool,
}

impl ViewerContext {
    fn for_level(level: AccessLevel) -> Self {
        match level {
            AccessLevel::Full => ViewerContext {
                access_level: AccessLevel::Full,
                can_view_all_details: true,
                can_view_all_served_users: true,
                can_view_leadership: true,
                can_view_servants: true,
                can_view_committees: true,
                can_view_activities: true,
            },
            AccessLevel::Servant => ViewerContext {
                access_level: AccessLevel::Servant,
                can_view_all_details: false,
                can_view_all_served_users: false,
                can_view_leadership: true,
                can_view_servants: true,
                can_view_committees: false,
                can_view_activities: false,
            },
            AccessLevel::Member => ViewerContext {
                access_level: AccessLevel::Member,
                can_view_all_details: false,
                can_view_all_served_users: false,
                can_view_leadership: false,
                can_view_servants: true,
                can_view_committees: true,
                can_view_activities: true,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PersonView {
    pub name: String,
    pub user: Option<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupAssignmentView {
    pub group: String,
    pub served_users: Vec<UserSummary>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ServantView {
    pub id: String,
    pub name: String,
    pub user: Option<UserSummary>,
    pub responsibility: String,
    pub groups_managed: Vec<String>,
    pub group_assignments: Vec<GroupAssignmentView>,
    pub served_users: Vec<UserSummary>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommitteeView {
    pub id: String,
    pub name: String,
    pub members: Vec<UserSummary>,
    pub member_names: Vec<String>,
    pub details: serde_json::Value,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityView {
    pub id: String,
    pub name: String,
    pub kind: ActivityKind,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub notes: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectedMeeting {
    pub id: String,
    pub sector_id: String,
    pub name: String,
    pub day: String,
    pub time: String,
    pub avatar: Option<Avatar>,
    pub service_secretary: Option<PersonView>,
    pub assistant_secretaries: Vec<PersonView>,
    pub servants: Vec<ServantView>,
    pub served_users: Vec<UserSummary>,
    pub groups: Vec<String>,
    pub group_assignments: Vec<GroupAssignmentView>,
    pub committees: Vec<CommitteeView>,
    pub activities: Vec<ActivityView>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub viewer_context: ViewerContext,
}

type UserMap = HashMap<String, UserSummary>;

fn user_view(users: &UserMap, id: &str) -> UserSummary {
    users
        .get(id)
        .cloned()
        .unwrap_or_else(|| UserSummary::unresolved(id))
}

fn users_view(users: &UserMap, ids: &[String]) -> Vec<UserSummary> {
    ids.iter().map(|id| user_view(users, id)).collect()
}

fn person_view(users: &UserMap, person: &PersonRef) -> PersonView {
    PersonView {
        name: person.name().to_string(),
        user: person.user_id().map(|id| user_view(users, id)),
    }
}

/// Filter a roster against a scope. Ids outside the scope's member set are
/// removed, unless the scope has no member ids at all and the owning group
/// is itself visible, in which case the full list passes through. That
/// covers a group whose membership was never recorded at finer granularity.
fn filter_roster(
    users: &UserMap,
    ids: &[String],
    scope: &ScopeSet,
    group_visible: bool,
) -> Vec<UserSummary> {
    if !scope.has_members() && group_visible {
        return users_view(users, ids);
    }
    ids.iter()
        .filter(|id| scope.contains_member(id))
        .map(|id| user_view(users, id))
        .collect()
}

/// Project a list of assignments against a scope. An assignment is dropped
/// only when its group is outside the scope and its filtered roster is
/// empty.
fn filter_assignments(
    users: &UserMap,
    assignments: &[GroupAssignment],
    scope: &ScopeSet,
) -> Vec<GroupAssignmentView> {
    assignments
        .iter()
        .filter_map(|assignment| {
            let group_visible = scope.contains_group(&assignment.group);
            let served_users =
                filter_roster(users, &assignment.served_user_ids, scope, group_visible);
            if group_visible || !served_users.is_empty() {
                Some(GroupAssignmentView {
                    group: assignment.group.clone(),
                    served_users,
                })
            } else {
                None
            }
        })
        .collect()
}

fn full_assignments(users: &UserMap, assignments: &[GroupAssignment]) -> Vec<GroupAssignmentView> {
    assignments
        .iter()
        .map(|a| GroupAssignmentView {
            group: a.group.clone(),
            served_users: users_view(users, &a.served_user_ids),
        })
        .collect()
}

fn full_servant_view(users: &UserMap, servant: &ServantEntry) -> ServantView {
    ServantView {
        id: servant.id.clone(),
        name: servant.person.name().to_string(),
        user: servant.person.user_id().map(|id| user_view(users, id)),
        responsibility: servant.responsibility.clone(),
        groups_managed: servant.groups_managed.clone(),
        group_assignments: full_assignments(users, &servant.group_assignments),
        served_users: users_view(users, &servant.served_user_ids),
        notes: servant.notes.clone(),
    }
}

/// Servant entry as seen through a scope. `redact_notes` applies to member
/// viewers, who get the roster but not servant-only annotations.
fn scoped_servant_view(
    users: &UserMap,
    servant: &ServantEntry,
    scope: &ScopeSet,
    restrict_groups: bool,
    redact_notes: bool,
) -> ServantView {
    let groups_managed = if restrict_groups {
        servant
            .groups_managed
            .iter()
            .filter(|g| scope.contains_group(g))
            .cloned()
            .collect()
    } else {
        servant.groups_managed.clone()
    };

    ServantView {
        id: servant.id.clone(),
        name: servant.person.name().to_string(),
        user: servant.person.user_id().map(|id| user_view(users, id)),
        responsibility: servant.responsibility.clone(),
        groups_managed,
        group_assignments: filter_assignments(users, &servant.group_assignments, scope),
        served_users: servant
            .served_user_ids
            .iter()
            .filter(|id| scope.contains_member(id))
            .map(|id| user_view(users, id))
            .collect(),
        notes: if redact_notes {
            String::new()
        } else {
            servant.notes.clone()
        },
    }
}

fn committee_views(users: &UserMap, committees: &[Committee]) -> Vec<CommitteeView> {
    committees
        .iter()
        .map(|c| CommitteeView {
            id: c.id.clone(),
            name: c.name.clone(),
            members: users_view(users, &c.member_user_ids),
            member_names: c.member_names.clone(),
            details: c.details.clone(),
            notes: c.notes.clone(),
        })
        .collect()
}

fn activity_views(activities: &[Activity]) -> Vec<ActivityView> {
    activities
        .iter()
        .map(|a| ActivityView {
            id: a.id.clone(),
            name: a.name.clone(),
            kind: a.kind,
            scheduled_at: a.scheduled_at,
            notes: a.notes.clone(),
        })
        .collect()
}

fn base_projection(meeting: &Meeting, level: AccessLevel) -> ProjectedMeeting {
    ProjectedMeeting {
        id: meeting.id.clone(),
        sector_id: meeting.sector_id.clone(),
        name: meeting.name.clone(),
        day: meeting.day.clone(),
        time: meeting.time.clone(),
        avatar: meeting.avatar.clone(),
        service_secretary: None,
        assistant_secretaries: Vec::new(),
        servants: Vec::new(),
        served_users: Vec::new(),
        groups: Vec::new(),
        group_assignments: Vec::new(),
        committees: Vec::new(),
        activities: Vec::new(),
        notes: meeting.notes.clone(),
        created_at: meeting.created_at,
        updated_at: meeting.updated_at,
        viewer_context: ViewerContext::for_level(level),
    }
}

/// Project the aggregate for the resolved access context.
pub fn project(meeting: &Meeting, users: &UserMap, ctx: &AccessContext) -> ProjectedMeeting {
    match ctx {
        AccessContext::Full { .. } => {
            let mut view = base_projection(meeting, AccessLevel::Full);
            view.service_secretary = meeting
                .service_secretary
                .as_ref()
                .map(|p| person_view(users, p));
            view.assistant_secretaries = meeting
                .assistant_secretaries
                .iter()
                .map(|p| person_view(users, p))
                .collect();
            view.servants = meeting
                .servants
                .iter()
                .map(|s| full_servant_view(users, s))
                .collect();
            view.served_users = users_view(users, &meeting.served_user_ids);
            view.groups = meeting.groups.clone();
            view.group_assignments = full_assignments(users, &meeting.group_assignments);
            view.committees = committee_views(users, &meeting.committees);
            view.activities = activity_views(&meeting.activities);
            view
        }

        AccessContext::Servant { entry, scope } => {
            let mut view = base_projection(meeting, AccessLevel::Servant);
            // Leadership stays visible to servants; the direct roster,
            // committees and activities do not.
            view.service_secretary = meeting
                .service_secretary
                .as_ref()
                .map(|p| person_view(users, p));
            view.assistant_secretaries = meeting
                .assistant_secretaries
                .iter()
                .map(|p| person_view(users, p))
                .collect();
            view.groups = scope.groups().to_vec();
            view.group_assignments =
                filter_assignments(users, &meeting.group_assignments, scope);
            view.servants = vec![scoped_servant_view(users, entry, scope, false, false)];
            view
        }

        AccessContext::Member { scope, .. } => {
            let mut view = base_projection(meeting, AccessLevel::Member);
            view.groups = scope.scope.groups().to_vec();
            view.group_assignments =
                filter_assignments(users, &meeting.group_assignments, &scope.scope);
            view.servants = meeting
                .servants
                .iter()
                .filter(|s| scope.visible_servant_ids.contains(&s.id))
                .map(|s| scoped_servant_view(users, s, &scope.scope, true, true))
                .collect();
            // Members keep committee and activity visibility; they need to
            // know what exists even without leadership detail.
            view.committees = committee_views(users, &meeting.committees);
            view.activities = activity_views(&meeting.activities);
            view
        }
    }
}
