use serde::{Deserialize, Serialize};

/// One observation of a site's status. Rows are never updated, so the table
/// reads back as a history log with repeats for the same site.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::FromRow)]
pub struct StatusRecord {
    pub site_name: String,
    pub status: String,
}

impl StatusRecord {
    pub fn new(site_name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            site_name: site_name.into(),
            status: status.into(),
        }
    }
}
