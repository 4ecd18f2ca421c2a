//! Access resolution: decide what level of visibility an actor has into a
//! meeting, from their capability set and their relationship to it.
//!
//! Pure over already-loaded data. Denial is a value (`None`), never an
//! error; malformed ids are rejected at the service boundary before this
//! runs.

use serde::Serialize;

use super::capabilities::{Capabilities, MANAGE_CLASS, VIEW_OWN_CLASS};
use super::scope::{member_scope, servant_scope, GroupRosterIndex, MemberScope, ScopeSet};
use crate::models::meeting::types::{Meeting, ServantEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    Full,
    Servant,
    Member,
}

/// Resolved access, dispatched on by the projector.
#[derive(Debug, Clone)]
pub enum AccessContext {
    /// Unrestricted view. `servant_entry` is still matched when the actor
    /// happens to be a named servant, for downstream convenience; it does
    /// not narrow the view.
    Full { servant_entry: Option<ServantEntry> },
    Servant { entry: ServantEntry, scope: ScopeSet },
    Member { actor_id: String, scope: MemberScope },
}

impl AccessContext {
    pub fn level(&self) -> AccessLevel {
        match self {
            AccessContext::Full { .. } => AccessLevel::Full,
            AccessContext::Servant { .. } => AccessLevel::Servant,
            AccessContext::Member { .. } => AccessLevel::Member,
        }
    }
}

fn find_servant_entry(meeting: &Meeting, actor_id: &str) -> Option<ServantEntry> {
    meeting
        .servants
        .iter()
        .find(|s| s.person.is(actor_id))
        .cloned()
}

fn is_leadership(meeting: &Meeting, actor_id: &str) -> bool {
    meeting
        .service_secretary
        .as_ref()
        .map(|p| p.is(actor_id))
        .unwrap_or(false)
        || meeting
            .assistant_secretaries
            .iter()
            .any(|p| p.is(actor_id))
}

/// Resolve the actor's access to a meeting. Returns `None` when access is
/// denied entirely.
///
/// - No actor id means a trusted internal caller: full access.
/// - Any manage-class capability grants full access to every meeting.
/// - Otherwise a view-own capability is required, and the level comes from
///   the actor's relationship: leadership sees everything (leading a
///   meeting implies full visibility of it), a named servant gets servant
///   scope, a served member gets member scope.
pub fn resolve_access(
    meeting: &Meeting,
    actor_id: Option<&str>,
    capabilities: &Capabilities,
) -> Option<AccessContext> {
    let actor_id = match actor_id {
        None => return Some(AccessContext::Full { servant_entry: None }),
        Some(id) => id,
    };

    if capabilities.has_any(MANAGE_CLASS) {
        return Some(AccessContext::Full {
            servant_entry: find_servant_entry(meeting, actor_id),
        });
    }

    if !capabilities.has_any(VIEW_OWN_CLASS) {
        return None;
    }

    if is_leadership(meeting, actor_id) {
        return Some(AccessContext::Full {
            servant_entry: find_servant_entry(meeting, actor_id),
        });
    }

    let index = GroupRosterIndex::build(meeting);

    if let Some(entry) = find_servant_entry(meeting, actor_id) {
        let scope = servant_scope(&index, &entry);
        return Some(AccessContext::Servant { entry, scope });
    }

    if index.is_served(actor_id) {
        let scope = member_scope(meeting, &index, actor_id);
        return Some(AccessContext::Member {
            actor_id: actor_id.to_string(),
            scope,
        });
    }

    None
}
