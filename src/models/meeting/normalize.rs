//! Aggregate normalization: trim/merge group assignments, derive the union
//! invariants, and hydrate write payloads against the user directory.
//!
//! Group names are compared case-insensitively after trimming. When two
//! assignments merge, the first-seen casing stays canonical and the member
//! sets are unioned.

use std::collections::{HashMap, HashSet};

use super::types::*;
use crate::errors::{AppError, AppResult};
use crate::models::user::types::UserSummary;

pub fn normalize_text(value: &str) -> String {
    value.trim().to_string()
}

fn group_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Dedupe a list of strings, trimming each and dropping blanks. For group
/// names the comparison is case-insensitive and the first-seen casing wins.
pub fn normalize_unique_groups(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        let trimmed = normalize_text(value);
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed);
        }
    }
    out
}

/// Dedupe a list of ids preserving first-seen order.
pub fn dedupe_ids(values: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for value in values {
        let trimmed = normalize_text(value);
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.clone()) {
            out.push(trimmed);
        }
    }
    out
}

/// Merge group assignments by normalized group name. Duplicate names are
/// merged by unioning their member sets, never overwritten; blanks are
/// dropped.
pub fn merge_group_assignments(drafts: &[GroupAssignmentDraft]) -> Vec<GroupAssignment> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<GroupAssignment> = Vec::new();

    for draft in drafts {
        let name = normalize_text(&draft.group);
        if name.is_empty() {
            continue;
        }
        let key = group_key(&name);
        let ids = dedupe_ids(&draft.served_user_ids);

        match index.get(&key) {
            Some(&pos) => {
                let existing = &mut merged[pos];
                for id in ids {
                    if !existing.served_user_ids.contains(&id) {
                        existing.served_user_ids.push(id);
                    }
                }
            }
            None => {
                index.insert(key, merged.len());
                merged.push(GroupAssignment {
                    group: name,
                    served_user_ids: ids,
                });
            }
        }
    }

    merged
}

/// Resolve a person draft against the loaded user directory.
///
/// A linked reference takes its name from the directory when the payload
/// left it blank; a link to an unknown user with no fallback name is a
/// validation error. A plain-text reference requires a non-blank name.
pub fn hydrate_person(
    draft: &PersonDraft,
    users: &HashMap<String, UserSummary>,
) -> AppResult<PersonRef> {
    let provided_name = draft.name.as_deref().map(normalize_text).unwrap_or_default();

    match draft.user_id.as_deref().map(normalize_text).filter(|id| !id.is_empty()) {
        Some(user_id) => {
            let directory_name = users
                .get(&user_id)
                .and_then(|u| u.full_name.clone())
                .unwrap_or_default();
            let name = if provided_name.is_empty() {
                directory_name
            } else {
                provided_name
            };
            if name.is_empty() {
                return Err(AppError::validation("user_id", "Linked user was not found"));
            }
            Ok(PersonRef::Linked { user_id, name })
        }
        None => {
            if provided_name.is_empty() {
                return Err(AppError::validation("name", "Person name is required"));
            }
            Ok(PersonRef::Freeform {
                name: provided_name,
            })
        }
    }
}

/// Hydrate a servant list. Derives `groups_managed` as the union of the
/// explicit list and the assignment keys, keeps only assignments for
/// managed groups, and unions direct and grouped served ids.
pub fn hydrate_servants(
    drafts: &[ServantDraft],
    users: &HashMap<String, UserSummary>,
) -> AppResult<Vec<ServantEntry>> {
    drafts
        .iter()
        .map(|draft| {
            let person = hydrate_person(
                &PersonDraft {
                    user_id: draft.user_id.clone(),
                    name: draft.name.clone(),
                },
                users,
            )?;

            let group_assignments = merge_group_assignments(&draft.group_assignments);

            let mut group_names = draft.groups_managed.clone();
            group_names.extend(group_assignments.iter().map(|a| a.group.clone()));
            let groups_managed = normalize_unique_groups(&group_names);

            let managed_keys: HashSet<String> =
                groups_managed.iter().map(|g| group_key(g)).collect();
            let group_assignments: Vec<GroupAssignment> = group_assignments
                .into_iter()
                .filter(|a| managed_keys.contains(&group_key(&a.group)))
                .collect();

            let mut served = dedupe_ids(&draft.served_user_ids);
            for assignment in &group_assignments {
                for id in &assignment.served_user_ids {
                    if !served.contains(id) {
                        served.push(id.clone());
                    }
                }
            }

            Ok(ServantEntry {
                id: new_sub_id(),
                person,
                responsibility: normalize_text(&draft.responsibility),
                groups_managed,
                group_assignments,
                served_user_ids: served,
                notes: normalize_text(&draft.notes),
            })
        })
        .collect()
}

pub fn hydrate_committees(drafts: &[CommitteeDraft]) -> AppResult<Vec<Committee>> {
    drafts
        .iter()
        .map(|draft| {
            let name = normalize_text(&draft.name);
            if name.is_empty() {
                return Err(AppError::validation("name", "Committee name is required"));
            }
            Ok(Committee {
                id: new_sub_id(),
                name,
                member_user_ids: dedupe_ids(&draft.member_user_ids),
                member_names: normalize_unique_groups(&draft.member_names),
                details: if draft.details.is_object() {
                    draft.details.clone()
                } else {
                    serde_json::json!({})
                },
                notes: normalize_text(&draft.notes),
            })
        })
        .collect()
}

pub fn hydrate_activities(drafts: &[ActivityDraft]) -> AppResult<Vec<Activity>> {
    drafts
        .iter()
        .map(|draft| {
            let name = normalize_text(&draft.name);
            if name.is_empty() {
                return Err(AppError::validation("name", "Activity name is required"));
            }
            Ok(Activity {
                id: new_sub_id(),
                name,
                kind: draft.kind,
                scheduled_at: draft.scheduled_at,
                notes: normalize_text(&draft.notes),
            })
        })
        .collect()
}

/// Re-derive the meeting-level union invariants:
/// `groups` covers every assignment key, and `served_user_ids` covers every
/// id appearing in a meeting-level assignment.
pub fn apply_roster_invariants(meeting: &mut Meeting) {
    let mut groups = meeting.groups.clone();
    groups.extend(meeting.group_assignments.iter().map(|a| a.group.clone()));
    meeting.groups = normalize_unique_groups(&groups);

    let mut served = dedupe_ids(&meeting.served_user_ids);
    for assignment in &meeting.group_assignments {
        for id in &assignment.served_user_ids {
            if !served.contains(id) {
                served.push(id.clone());
            }
        }
    }
    meeting.served_user_ids = served;
}
