//! Append-only per-member note log, gated by the same access resolution as
//! the rest of the meeting record.

use chrono::{DateTime, Utc};

use super::resolver::AccessContext;
use crate::models::meeting::types::{MemberNote, Meeting};

/// Note history for one member, newest first. Entry `[0]` is the current
/// note.
pub fn member_notes<'a>(meeting: &'a Meeting, member_id: &str) -> Vec<&'a MemberNote> {
    let mut notes: Vec<(usize, &MemberNote)> = meeting
        .member_notes
        .iter()
        .enumerate()
        .filter(|(_, n)| n.member_user_id == member_id)
        .collect();
    // Equal timestamps fall back to append order, so the later append
    // still wins.
    notes.sort_by(|(ai, a), (bi, b)| b.updated_at.cmp(&a.updated_at).then(bi.cmp(ai)));
    notes.into_iter().map(|(_, n)| n).collect()
}

pub fn current_note<'a>(meeting: &'a Meeting, member_id: &str) -> Option<&'a MemberNote> {
    member_notes(meeting, member_id).into_iter().next()
}

/// Whether the resolved context may read (or write) notes for this member.
/// Member-level access never qualifies: members cannot see or edit their
/// own note history.
pub fn can_access_notes(ctx: &AccessContext, member_id: &str) -> bool {
    match ctx {
        AccessContext::Full { .. } => true,
        AccessContext::Servant { scope, .. } => scope.contains_member(member_id),
        AccessContext::Member { .. } => false,
    }
}

/// Append a note entry. Prior entries are never mutated or removed;
/// "updating" a note means appending a newer entry.
pub fn append_note(
    meeting: &mut Meeting,
    member_id: &str,
    note: &str,
    actor_id: &str,
    now: DateTime<Utc>,
) {
    meeting.member_notes.push(MemberNote {
        member_user_id: member_id.to_string(),
        note: note.to_string(),
        added_by: actor_id.to_string(),
        updated_by: actor_id.to_string(),
        updated_at: now,
    });
}
