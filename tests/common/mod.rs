//! Shared test infrastructure: temp SQLite databases plus fixture helpers
//! for users and meeting drafts.

use r2d2::PooledConnection;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tempfile::TempDir;
use uuid::Uuid;

use shepherd::access::capabilities::Capabilities;
use shepherd::db;
use shepherd::models::meeting::types::{GroupAssignmentDraft, ServantDraft};
use shepherd::models::user::queries as user_queries;

/// Temp database behind the crate's pool, with migrations applied. Keep
/// the TempDir alive for the connection to remain valid.
pub fn setup_test_db() -> (TempDir, PooledConnection<SqliteConnectionManager>) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = dir.path().join("test.db");

    let pool = db::init_pool(db_path.to_str().expect("Temp path is not UTF-8"));
    db::run_migrations(&pool);

    let conn = pool.get().expect("Failed to get DB connection");
    (dir, conn)
}

pub fn uid() -> String {
    Uuid::new_v4().to_string()
}

/// Insert a directory user and return its id.
#[allow(dead_code)]
pub fn add_user(conn: &Connection, full_name: &str) -> String {
    let id = uid();
    user_queries::upsert(conn, &id, full_name, None).expect("Failed to insert user");
    id
}

#[allow(dead_code)]
pub fn caps(csv: &str) -> Capabilities {
    Capabilities::from_csv(csv)
}

#[allow(dead_code)]
pub fn assignment(group: &str, ids: &[&str]) -> GroupAssignmentDraft {
    GroupAssignmentDraft {
        group: group.to_string(),
        served_user_ids: ids.iter().map(|s| s.to_string()).collect(),
    }
}

#[allow(dead_code)]
pub fn servant(user_id: &str, groups: &[&str], assignments: Vec<GroupAssignmentDraft>) -> ServantDraft {
    ServantDraft {
        user_id: Some(user_id.to_string()),
        groups_managed: groups.iter().map(|s| s.to_string()).collect(),
        group_assignments: assignments,
        ..Default::default()
    }
}
