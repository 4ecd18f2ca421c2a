use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use serde::Serialize;

use super::types::{Meeting, ServantEntry};
use crate::errors::AppResult;

/// Persist a new meeting aggregate. The full aggregate is serialized into
/// the JSON doc column; scalar columns are mirrored for filtering.
pub fn insert(conn: &Connection, meeting: &Meeting) -> AppResult<()> {
    let doc = serde_json::to_string(meeting)?;
    conn.execute(
        "INSERT INTO meetings \
            (id, sector_id, name, normalized_name, day, time, doc, is_deleted, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            meeting.id,
            meeting.sector_id,
            meeting.name,
            meeting.name.to_lowercase(),
            meeting.day,
            meeting.time,
            doc,
            meeting.is_deleted,
            meeting.created_at.to_rfc3339(),
            meeting.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Replace a stored aggregate wholesale (full-document save semantics;
/// concurrent writers resolve last-write-wins).
pub fn save(conn: &Connection, meeting: &Meeting) -> AppResult<()> {
    let doc = serde_json::to_string(meeting)?;
    conn.execute(
        "UPDATE meetings SET sector_id = ?2, name = ?3, normalized_name = ?4, day = ?5, \
             time = ?6, doc = ?7, is_deleted = ?8, updated_at = ?9 \
         WHERE id = ?1",
        params![
            meeting.id,
            meeting.sector_id,
            meeting.name,
            meeting.name.to_lowercase(),
            meeting.day,
            meeting.time,
            doc,
            meeting.is_deleted,
            meeting.updated_at.to_rfc3339(),
        ],
    )?;
    Ok(())
}

/// Load a meeting by id. Soft-deleted meetings are treated as absent.
pub fn find_by_id(conn: &Connection, id: &str) -> AppResult<Option<Meeting>> {
    let doc: Option<String> = conn
        .query_row(
            "SELECT doc FROM meetings WHERE id = ?1 AND is_deleted = 0",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    match doc {
        Some(doc) => Ok(Some(serde_json::from_str(&doc)?)),
        None => Ok(None),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Listing filter. The cursor pages on creation time in the sort direction.
#[derive(Debug, Clone, Default)]
pub struct MeetingListFilter {
    pub sector_id: Option<String>,
    pub day: Option<String>,
    pub search: Option<String>,
    pub cursor: Option<DateTime<Utc>>,
    pub order: SortOrder,
    pub limit: Option<i64>,
}

/// List meetings matching the filter, soft-deleted excluded.
///
/// Access resolution happens after the fetch, so the limit here is a fetch
/// bound, not a visibility guarantee.
pub fn list(conn: &Connection, filter: &MeetingListFilter) -> AppResult<Vec<Meeting>> {
    let mut clauses: Vec<String> = vec!["is_deleted = 0".to_string()];
    let mut bind: Vec<rusqlite::types::Value> = Vec::new();

    if let Some(sector_id) = &filter.sector_id {
        bind.push(rusqlite::types::Value::Text(sector_id.clone()));
        clauses.push(format!("sector_id = ?{}", bind.len()));
    }
    if let Some(day) = &filter.day {
        bind.push(rusqlite::types::Value::Text(day.trim().to_lowercase()));
        clauses.push(format!("LOWER(day) = ?{}", bind.len()));
    }
    if let Some(search) = &filter.search {
        bind.push(rusqlite::types::Value::Text(format!(
            "%{}%",
            search.trim().to_lowercase()
        )));
        clauses.push(format!("normalized_name LIKE ?{}", bind.len()));
    }
    if let Some(cursor) = &filter.cursor {
        bind.push(rusqlite::types::Value::Text(cursor.to_rfc3339()));
        let op = match filter.order {
            SortOrder::Asc => ">",
            SortOrder::Desc => "<",
        };
        clauses.push(format!("created_at {op} ?{}", bind.len()));
    }

    let dir = match filter.order {
        SortOrder::Asc => "ASC",
        SortOrder::Desc => "DESC",
    };
    let limit = filter.limit.unwrap_or(20).clamp(1, 100);
    bind.push(rusqlite::types::Value::Integer(limit));

    let sql = format!(
        "SELECT doc FROM meetings WHERE {} ORDER BY created_at {dir}, id {dir} LIMIT ?{}",
        clauses.join(" AND "),
        bind.len()
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(bind.iter()), |row| {
        row.get::<_, String>(0)
    })?;

    let mut meetings = Vec::new();
    for row in rows {
        meetings.push(serde_json::from_str(&row?)?);
    }
    Ok(meetings)
}

/// Criteria for matching servant entries across meetings: a linked user
/// id, a normalized (trimmed, lowercased) display name, or both.
#[derive(Debug, Clone, Default)]
pub struct ServantHistoryFilter {
    pub user_id: Option<String>,
    pub normalized_name: Option<String>,
    pub limit: Option<i64>,
}

impl ServantHistoryFilter {
    pub fn matches(&self, servant: &ServantEntry) -> bool {
        if let Some(user_id) = &self.user_id {
            if servant.person.is(user_id) {
                return true;
            }
        }
        if let Some(name) = &self.normalized_name {
            if servant.person.name().trim().to_lowercase() == *name {
                return true;
            }
        }
        false
    }
}

/// Meetings that have at least one servant matching the filter, most
/// recently updated first. The servant lists live inside the JSON doc, so
/// matching happens after deserialization.
pub fn servant_history(
    conn: &Connection,
    filter: &ServantHistoryFilter,
) -> AppResult<Vec<Meeting>> {
    let limit = filter.limit.unwrap_or(10).clamp(1, 100) as usize;

    let mut stmt = conn.prepare(
        "SELECT doc FROM meetings WHERE is_deleted = 0 \
         ORDER BY updated_at DESC, id DESC",
    )?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut matched = Vec::new();
    for row in rows {
        let meeting: Meeting = serde_json::from_str(&row?)?;
        if meeting.servants.iter().any(|s| filter.matches(s)) {
            matched.push(meeting);
            if matched.len() == limit {
                break;
            }
        }
    }
    Ok(matched)
}

/// Track servant responsibility labels for autocomplete. Upserts by
/// normalized label, bumping the usage counter.
pub fn upsert_responsibilities(
    conn: &Connection,
    labels: &[String],
    now: DateTime<Utc>,
) -> AppResult<()> {
    for label in labels {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            continue;
        }
        conn.execute(
            "INSERT INTO meeting_responsibilities (label, normalized_label, usage_count, last_used_at) \
             VALUES (?1, ?2, 1, ?3) \
             ON CONFLICT(normalized_label) DO UPDATE SET \
                 label = excluded.label, \
                 usage_count = usage_count + 1, \
                 last_used_at = excluded.last_used_at",
            params![trimmed, trimmed.to_lowercase(), now.to_rfc3339()],
        )?;
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct ResponsibilitySuggestion {
    pub label: String,
    pub usage_count: i64,
    pub last_used_at: String,
}

/// Responsibility suggestions ordered by usage, most used first.
pub fn list_responsibility_suggestions(
    conn: &Connection,
    search: Option<&str>,
    limit: i64,
) -> AppResult<Vec<ResponsibilitySuggestion>> {
    let limit = limit.clamp(1, 100);
    let pattern = search
        .map(|s| format!("%{}%", s.trim().to_lowercase()))
        .unwrap_or_else(|| "%".to_string());

    let mut stmt = conn.prepare(
        "SELECT label, usage_count, last_used_at FROM meeting_responsibilities \
         WHERE normalized_label LIKE ?1 \
         ORDER BY usage_count DESC, last_used_at DESC, label ASC \
         LIMIT ?2",
    )?;
    let rows = stmt.query_map(params![pattern, limit], |row| {
        Ok(ResponsibilitySuggestion {
            label: row.get(0)?,
            usage_count: row.get(1)?,
            last_used_at: row.get(2)?,
        })
    })?;
    rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
}
