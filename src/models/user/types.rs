use serde::{Deserialize, Serialize};

/// Directory subset of a user, as referenced from meeting records.
/// `full_name` is `None` when the id was referenced but never resolved
/// against the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub full_name: Option<String>,
    pub phone_primary: Option<String>,
}

impl UserSummary {
    /// Placeholder for an id with no directory entry loaded.
    pub fn unresolved(id: &str) -> Self {
        UserSummary {
            id: id.to_string(),
            full_name: None,
            phone_primary: None,
        }
    }
}
