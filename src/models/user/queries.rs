use std::collections::HashMap;

use rusqlite::{params, Connection};

use super::types::UserSummary;
use crate::errors::AppResult;

/// Insert or replace a directory entry.
pub fn upsert(
    conn: &Connection,
    id: &str,
    full_name: &str,
    phone_primary: Option<&str>,
) -> AppResult<()> {
    conn.execute(
        "INSERT INTO users (id, full_name, phone_primary) VALUES (?1, ?2, ?3) \
         ON CONFLICT(id) DO UPDATE SET full_name = excluded.full_name, \
             phone_primary = excluded.phone_primary",
        params![id, full_name, phone_primary],
    )?;
    Ok(())
}

/// Batch directory lookup. Deleted users are skipped, so a stale reference
/// simply resolves to nothing.
pub fn find_summaries(
    conn: &Connection,
    ids: &[String],
) -> AppResult<HashMap<String, UserSummary>> {
    let mut out = HashMap::new();
    if ids.is_empty() {
        return Ok(out);
    }

    let placeholders = (1..=ids.len())
        .map(|n| format!("?{n}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT id, full_name, phone_primary FROM users \
         WHERE is_deleted = 0 AND id IN ({placeholders})"
    );

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(rusqlite::params_from_iter(ids.iter()), |row| {
        Ok(UserSummary {
            id: row.get("id")?,
            full_name: Some(row.get("full_name")?),
            phone_primary: row.get("phone_primary")?,
        })
    })?;

    for row in rows {
        let user = row?;
        out.insert(user.id.clone(), user);
    }
    Ok(out)
}
