//! Scope algebra: which groups and which member ids an actor may see.
//!
//! `GroupRosterIndex` flattens one meeting's group-to-member assignments
//! into a queryable structure, rebuilt per request; `ScopeSet` is the pure
//! value type the projector consumes. Group names compare case-insensitively
//! with the first-seen casing kept as canonical.

use std::collections::{BTreeSet, HashMap};

use crate::models::meeting::types::{Meeting, ServantEntry};

fn group_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A set of visible group names plus a set of visible member ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScopeSet {
    groups: Vec<String>,
    group_keys: BTreeSet<String>,
    member_ids: BTreeSet<String>,
}

impl ScopeSet {
    pub fn new() -> Self {
        ScopeSet::default()
    }

    pub fn add_group(&mut self, name: &str) {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return;
        }
        if self.group_keys.insert(group_key(trimmed)) {
            self.groups.push(trimmed.to_string());
        }
    }

    pub fn add_member(&mut self, id: &str) {
        if !id.is_empty() {
            self.member_ids.insert(id.to_string());
        }
    }

    pub fn contains_group(&self, name: &str) -> bool {
        self.group_keys.contains(&group_key(name))
    }

    pub fn contains_member(&self, id: &str) -> bool {
        self.member_ids.contains(id)
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn member_ids(&self) -> &BTreeSet<String> {
        &self.member_ids
    }

    pub fn has_members(&self) -> bool {
        !self.member_ids.is_empty()
    }
}

/// Member-level scope: the base scope plus which servant entries are
/// visible to the member.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberScope {
    pub scope: ScopeSet,
    pub visible_servant_ids: BTreeSet<String>,
}

/// Flattened view of one meeting's rosters.
pub struct GroupRosterIndex {
    /// Meeting-level roster per group key.
    meeting_rosters: HashMap<String, BTreeSet<String>>,
    /// First-seen canonical casing per group key, across meeting-level and
    /// servant-level occurrences.
    canonical: HashMap<String, String>,
    /// Group keys each member appears under (meeting-level and
    /// servant-level assignments both count).
    member_groups: HashMap<String, BTreeSet<String>>,
    /// Every id served anywhere in the aggregate: the direct roster, any
    /// meeting-level assignment, any servant's direct or grouped list.
    served_closure: BTreeSet<String>,
}

impl GroupRosterIndex {
    pub fn build(meeting: &Meeting) -> Self {
        let mut index = GroupRosterIndex {
            meeting_rosters: HashMap::new(),
            canonical: HashMap::new(),
            member_groups: HashMap::new(),
            served_closure: BTreeSet::new(),
        };

        for name in &meeting.groups {
            index.note_canonical(name);
        }

        for assignment in &meeting.group_assignments {
            let key = index.note_canonical(&assignment.group);
            let roster = index.meeting_rosters.entry(key.clone()).or_default();
            for id in &assignment.served_user_ids {
                roster.insert(id.clone());
                index.member_groups.entry(id.clone()).or_default().insert(key.clone());
                index.served_closure.insert(id.clone());
            }
        }

        for id in &meeting.served_user_ids {
            index.served_closure.insert(id.clone());
        }

        for servant in &meeting.servants {
            for name in &servant.groups_managed {
                index.note_canonical(name);
            }
            for id in &servant.served_user_ids {
                index.served_closure.insert(id.clone());
            }
            for assignment in &servant.group_assignments {
                let key = index.note_canonical(&assignment.group);
                for id in &assignment.served_user_ids {
                    index.member_groups.entry(id.clone()).or_default().insert(key.clone());
                    index.served_closure.insert(id.clone());
                }
            }
        }

        index
    }

    fn note_canonical(&mut self, name: &str) -> String {
        let key = group_key(name);
        self.canonical
            .entry(key.clone())
            .or_insert_with(|| name.trim().to_string());
        key
    }

    fn canonical_name<'a>(&'a self, key: &'a str) -> &'a str {
        self.canonical.get(key).map(String::as_str).unwrap_or(key)
    }

    /// The meeting-level roster for a group name, if one was recorded.
    pub fn meeting_roster(&self, name: &str) -> Option<&BTreeSet<String>> {
        self.meeting_rosters.get(&group_key(name))
    }

    /// True if the id appears anywhere in the served-member closure.
    pub fn is_served(&self, id: &str) -> bool {
        self.served_closure.contains(id)
    }

    /// Canonical names of every group this member appears in.
    pub fn groups_of_member(&self, id: &str) -> Vec<String> {
        self.member_groups
            .get(id)
            .map(|keys| {
                keys.iter()
                    .map(|k| self.canonical_name(k).to_string())
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Scope for a servant: the groups they manage plus everyone they serve.
///
/// A servant sees the full meeting-level roster of every group they manage,
/// not just the subset recorded under their own entry.
pub fn servant_scope(index: &GroupRosterIndex, servant: &ServantEntry) -> ScopeSet {
    let mut scope = ScopeSet::new();

    for name in &servant.groups_managed {
        scope.add_group(name);
    }
    for assignment in &servant.group_assignments {
        scope.add_group(&assignment.group);
        for id in &assignment.served_user_ids {
            scope.add_member(id);
        }
    }
    for id in &servant.served_user_ids {
        scope.add_member(id);
    }

    let visible: Vec<String> = scope.groups().to_vec();
    for group in &visible {
        if let Some(roster) = index.meeting_roster(group) {
            for id in roster {
                scope.add_member(id);
            }
        }
    }

    scope
}

/// Scope for a served member: every group that contains them, everyone in
/// the meeting-level rosters of those groups, and themselves. A servant is
/// visible if they manage a visible group or serve the member directly.
pub fn member_scope(
    meeting: &Meeting,
    index: &GroupRosterIndex,
    actor_id: &str,
) -> MemberScope {
    let mut scope = ScopeSet::new();
    scope.add_member(actor_id);

    for group in index.groups_of_member(actor_id) {
        scope.add_group(&group);
        if let Some(roster) = index.meeting_roster(&group) {
            for id in roster {
                scope.add_member(id);
            }
        }
    }

    let mut visible_servant_ids = BTreeSet::new();
    for servant in &meeting.servants {
        let manages_visible = servant
            .groups_managed
            .iter()
            .chain(servant.group_assignments.iter().map(|a| &a.group))
            .any(|g| scope.contains_group(g));
        let serves_directly = servant.served_user_ids.iter().any(|id| id == actor_id)
            || servant
                .group_assignments
                .iter()
                .any(|a| a.served_user_ids.iter().any(|id| id == actor_id));

        if manages_visible || serves_directly {
            visible_servant_ids.insert(servant.id.clone());
        }
    }

    MemberScope {
        scope,
        visible_servant_ids,
    }
}
