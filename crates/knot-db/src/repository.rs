use std::path::PathBuf;
use std::str::FromStr;

use directories::ProjectDirs;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite, SqlitePool};

use crate::error::{DbError, Result, ValidationErrors};
use crate::history;
use crate::models::{
    Contact, ContactInput, ContactStats, ContactWithHistory, Page, SYSTEM_USER, actions,
};
use crate::schema::SCHEMA;

pub const DEFAULT_PER_PAGE: u32 = 15;
pub(crate) const MAX_PER_PAGE: u32 = 100;
pub(crate) const RECENT_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;
const MAX_FIELD_LEN: usize = 255;

pub struct KnotDb {
    pool: Pool<Sqlite>,
}

impl KnotDb {
    pub async fn new() -> Result<Self> {
        let db_path = Self::default_db_path()?;

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).ok();
        }

        let db = Self::new_with_path(&db_path.display().to_string()).await?;
        tracing::info!("Database initialized at: {}", db_path.display());
        Ok(db)
    }

    pub async fn new_with_path(path: &str) -> Result<Self> {
        // foreign_keys must be on for ON DELETE CASCADE to fire in SQLite
        let options = SqliteConnectOptions::from_str(&format!("sqlite:{path}"))?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePool::connect_with(options).await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Single-connection pool so every query sees the same in-memory database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;

        Ok(Self { pool })
    }

    fn default_db_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("", "", "knot").ok_or(DbError::DataDir)?;
        Ok(dirs.data_dir().join("knot.db"))
    }

    pub(crate) fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn list_contacts(
        &self,
        search: Option<&str>,
        page: u32,
        per_page: u32,
    ) -> Result<Page<Contact>> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);
        let offset = ((page - 1) * per_page) as i64;

        let term = search.map(str::trim).filter(|s| !s.is_empty());

        let (total, items) = match term {
            Some(term) => {
                let pattern = format!("%{term}%");
                let total: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM contacts
                     WHERE first_name LIKE ? OR last_name LIKE ? OR email LIKE ?",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await?;

                let items = sqlx::query_as::<_, Contact>(
                    "SELECT * FROM contacts
                     WHERE first_name LIKE ? OR last_name LIKE ? OR email LIKE ?
                     ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(&pattern)
                .bind(&pattern)
                .bind(&pattern)
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                (total, items)
            }
            None => {
                let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
                    .fetch_one(&self.pool)
                    .await?;

                let items = sqlx::query_as::<_, Contact>(
                    "SELECT * FROM contacts ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                )
                .bind(per_page as i64)
                .bind(offset)
                .fetch_all(&self.pool)
                .await?;

                (total, items)
            }
        };

        Ok(Page {
            items,
            current_page: page,
            last_page: last_page(total, per_page),
            per_page,
            total,
        })
    }

    pub async fn get_contact(&self, id: i64) -> Result<Contact> {
        sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(DbError::ContactNotFound(id))
    }

    pub async fn get_contact_with_history(&self, id: i64) -> Result<ContactWithHistory> {
        let contact = self.get_contact(id).await?;
        let histories = self.history_for_contact(id).await?;
        Ok(ContactWithHistory { contact, histories })
    }

    pub async fn create_contact(
        &self,
        input: &ContactInput,
        user_id: Option<&str>,
    ) -> Result<Contact> {
        let input = input.trimmed();
        self.validate(&input, None).await?;

        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO contacts (first_name, last_name, email, phone, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        let id = result.last_insert_rowid();

        history::log_creation(&mut tx, id, normalize_user(user_id)).await?;

        tx.commit().await?;
        tracing::debug!("created contact {id}");

        self.get_contact(id).await
    }

    pub async fn update_contact(
        &self,
        id: i64,
        input: &ContactInput,
        user_id: Option<&str>,
    ) -> Result<Contact> {
        // Unknown id reports as not-found before any validation complaint.
        self.get_contact(id).await?;

        let input = input.trimmed();
        self.validate(&input, Some(id)).await?;

        let user = normalize_user(user_id);
        let now = unix_timestamp();
        let mut tx = self.pool.begin().await?;

        // Re-read inside the transaction: the delta logged below is against
        // the row state this commit actually overwrites.
        let existing = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::ContactNotFound(id))?;

        sqlx::query(
            "UPDATE contacts SET first_name = ?, last_name = ?, email = ?, phone = ?, updated_at = ?
             WHERE id = ?",
        )
        .bind(&input.first_name)
        .bind(&input.last_name)
        .bind(&input.email)
        .bind(&input.phone)
        .bind(now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        for (field, old_value, new_value) in changed_fields(&existing, &input) {
            history::log_update(&mut tx, id, field, old_value, new_value, user).await?;
        }

        tx.commit().await?;

        self.get_contact(id).await
    }

    pub async fn delete_contact(&self, id: i64, user_id: Option<&str>) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(DbError::ContactNotFound(id))?;

        // The deletion entry needs the contact row to still exist; the row
        // delete below then cascades the contact's entries away.
        history::log_deletion(&mut tx, contact.id, normalize_user(user_id)).await?;

        sqlx::query("DELETE FROM contacts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::debug!("deleted contact {id}");

        Ok(())
    }

    pub async fn contact_stats(&self) -> Result<ContactStats> {
        let total_contacts: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contacts")
            .fetch_one(&self.pool)
            .await?;

        let cutoff = unix_timestamp() - RECENT_WINDOW_SECS;
        let recent_updates: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM contact_histories WHERE action = ? AND created_at >= ?",
        )
        .bind(actions::UPDATED)
        .bind(cutoff)
        .fetch_one(&self.pool)
        .await?;

        Ok(ContactStats {
            total_contacts,
            recent_updates,
        })
    }

    async fn validate(&self, input: &ContactInput, exclude_id: Option<i64>) -> Result<()> {
        let mut errors = ValidationErrors::new();

        check_text(&mut errors, "first_name", &input.first_name, "First name is required");
        check_text(&mut errors, "last_name", &input.last_name, "Last name is required");
        check_text(&mut errors, "email", &input.email, "Email is required");
        check_text(&mut errors, "phone", &input.phone, "Phone number is required");

        if !input.email.is_empty() && !is_valid_email(&input.email) {
            errors
                .entry("email".to_string())
                .or_default()
                .push("Email format is invalid".to_string());
        }

        if !errors.contains_key("email") && self.email_taken(&input.email, exclude_id).await? {
            errors
                .entry("email".to_string())
                .or_default()
                .push("This email is already registered".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(DbError::ValidationFailed(errors))
        }
    }

    async fn email_taken(&self, email: &str, exclude_id: Option<i64>) -> Result<bool> {
        let count: i64 = match exclude_id {
            Some(id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE email = ? AND id != ?")
                    .bind(email)
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM contacts WHERE email = ?")
                    .bind(email)
                    .fetch_one(&self.pool)
                    .await?
            }
        };
        Ok(count > 0)
    }
}

/// Fields whose incoming value differs from the stored one, in the fixed
/// order they are logged: one history entry per element.
pub(crate) fn changed_fields<'a>(
    existing: &'a Contact,
    input: &'a ContactInput,
) -> Vec<(&'static str, &'a str, &'a str)> {
    [
        ("first_name", existing.first_name.as_str(), input.first_name.as_str()),
        ("last_name", existing.last_name.as_str(), input.last_name.as_str()),
        ("email", existing.email.as_str(), input.email.as_str()),
        ("phone", existing.phone.as_str(), input.phone.as_str()),
    ]
    .into_iter()
    .filter(|(_, old_value, new_value)| old_value != new_value)
    .collect()
}

pub(crate) fn normalize_user(user_id: Option<&str>) -> &str {
    match user_id.map(str::trim) {
        Some(user) if !user.is_empty() => user,
        _ => SYSTEM_USER,
    }
}

fn check_text(errors: &mut ValidationErrors, field: &str, value: &str, required_msg: &str) {
    if value.is_empty() {
        errors
            .entry(field.to_string())
            .or_default()
            .push(required_msg.to_string());
    } else if value.len() > MAX_FIELD_LEN {
        errors
            .entry(field.to_string())
            .or_default()
            .push(format!("The {} may not be greater than {MAX_FIELD_LEN} characters", field.replace('_', " ")));
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

pub(crate) fn last_page(total: i64, per_page: u32) -> u32 {
    let pages = (total + per_page as i64 - 1) / per_page as i64;
    pages.max(1) as u32
}

pub(crate) fn unix_timestamp() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
