use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod actions {
    pub const CREATED: &str = "created";
    pub const UPDATED: &str = "updated";
    pub const DELETED: &str = "deleted";

    pub fn all() -> [&'static str; 3] {
        [CREATED, UPDATED, DELETED]
    }
}

/// Placeholder recorded when a mutation carries no acting user.
pub const SYSTEM_USER: &str = "system";

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Contact {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct HistoryEntry {
    pub id: i64,
    pub contact_id: i64,
    pub action: String,
    pub field: Option<String>,
    pub old_value: Option<String>,
    pub new_value: Option<String>,
    pub user_id: String,
    pub created_at: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryWithContact {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    pub contact: Contact,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactWithHistory {
    #[serde(flatten)]
    pub contact: Contact,
    pub histories: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ContactInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
}

impl ContactInput {
    /// Stored values are always the trimmed form of what the caller sent.
    pub fn trimmed(&self) -> Self {
        Self {
            first_name: self.first_name.trim().to_string(),
            last_name: self.last_name.trim().to_string(),
            email: self.email.trim().to_string(),
            phone: self.phone.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub current_page: u32,
    pub last_page: u32,
    pub per_page: u32,
    pub total: i64,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryFilter {
    pub search: Option<String>,
    pub action: Option<String>,
    pub contact_id: Option<i64>,
    pub user_id: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ContactStats {
    pub total_contacts: i64,
    pub recent_updates: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryStats {
    pub total_entries: i64,
    pub created_actions: i64,
    pub updated_actions: i64,
    pub deleted_actions: i64,
    pub recent_activity: i64,
}
