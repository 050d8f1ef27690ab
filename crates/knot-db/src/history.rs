use chrono::{NaiveDate, NaiveTime};
use sqlx::{QueryBuilder, Sqlite, Transaction};

use crate::error::{DbError, Result};
use crate::models::{Contact, HistoryEntry, HistoryFilter, HistoryStats, HistoryWithContact, Page, actions};
use crate::repository::{KnotDb, MAX_PER_PAGE, RECENT_WINDOW_SECS, last_page, unix_timestamp};

pub(crate) async fn log_creation(
    tx: &mut Transaction<'_, Sqlite>,
    contact_id: i64,
    user_id: &str,
) -> sqlx::Result<()> {
    append(tx, contact_id, actions::CREATED, None, None, None, user_id).await
}

pub(crate) async fn log_update(
    tx: &mut Transaction<'_, Sqlite>,
    contact_id: i64,
    field: &str,
    old_value: &str,
    new_value: &str,
    user_id: &str,
) -> sqlx::Result<()> {
    append(
        tx,
        contact_id,
        actions::UPDATED,
        Some(field),
        Some(old_value),
        Some(new_value),
        user_id,
    )
    .await
}

/// Must run before the contact row is deleted: the entry references the row,
/// and the cascade fired by the delete is what removes the contact's entries.
pub(crate) async fn log_deletion(
    tx: &mut Transaction<'_, Sqlite>,
    contact_id: i64,
    user_id: &str,
) -> sqlx::Result<()> {
    append(tx, contact_id, actions::DELETED, None, None, None, user_id).await
}

async fn append(
    tx: &mut Transaction<'_, Sqlite>,
    contact_id: i64,
    action: &str,
    field: Option<&str>,
    old_value: Option<&str>,
    new_value: Option<&str>,
    user_id: &str,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO contact_histories (contact_id, action, field, old_value, new_value, user_id, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(contact_id)
    .bind(action)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .bind(user_id)
    .bind(unix_timestamp())
    .execute(&mut **tx)
    .await?;
    Ok(())
}

const SELECT_WITH_CONTACT: &str = "SELECT h.id, h.contact_id, h.action, h.field, h.old_value, h.new_value, h.user_id, h.created_at, \
     c.first_name AS c_first_name, c.last_name AS c_last_name, c.email AS c_email, c.phone AS c_phone, \
     c.created_at AS c_created_at, c.updated_at AS c_updated_at \
     FROM contact_histories h JOIN contacts c ON c.id = h.contact_id";

const COUNT_WITH_CONTACT: &str =
    "SELECT COUNT(*) FROM contact_histories h JOIN contacts c ON c.id = h.contact_id";

#[derive(sqlx::FromRow)]
struct HistoryContactRow {
    id: i64,
    contact_id: i64,
    action: String,
    field: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    user_id: String,
    created_at: i64,
    c_first_name: String,
    c_last_name: String,
    c_email: String,
    c_phone: String,
    c_created_at: i64,
    c_updated_at: i64,
}

impl From<HistoryContactRow> for HistoryWithContact {
    fn from(row: HistoryContactRow) -> Self {
        HistoryWithContact {
            entry: HistoryEntry {
                id: row.id,
                contact_id: row.contact_id,
                action: row.action,
                field: row.field,
                old_value: row.old_value,
                new_value: row.new_value,
                user_id: row.user_id,
                created_at: row.created_at,
            },
            contact: Contact {
                id: row.contact_id,
                first_name: row.c_first_name,
                last_name: row.c_last_name,
                email: row.c_email,
                phone: row.c_phone,
                created_at: row.c_created_at,
                updated_at: row.c_updated_at,
            },
        }
    }
}

impl KnotDb {
    pub async fn history_for_contact(&self, contact_id: i64) -> Result<Vec<HistoryEntry>> {
        Ok(sqlx::query_as::<_, HistoryEntry>(
            "SELECT * FROM contact_histories WHERE contact_id = ? ORDER BY created_at DESC, id DESC",
        )
        .bind(contact_id)
        .fetch_all(self.pool())
        .await?)
    }

    pub async fn get_history_entry(&self, id: i64) -> Result<HistoryWithContact> {
        let sql = format!("{SELECT_WITH_CONTACT} WHERE h.id = ?");
        sqlx::query_as::<_, HistoryContactRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await?
            .map(HistoryWithContact::from)
            .ok_or(DbError::HistoryEntryNotFound(id))
    }

    pub async fn list_history(
        &self,
        filter: &HistoryFilter,
        page: u32,
        per_page: u32,
    ) -> Result<Page<HistoryWithContact>> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, MAX_PER_PAGE);

        let mut count = QueryBuilder::<Sqlite>::new(COUNT_WITH_CONTACT);
        push_filters(&mut count, filter);
        let total: i64 = count.build_query_scalar().fetch_one(self.pool()).await?;

        let mut query = QueryBuilder::<Sqlite>::new(SELECT_WITH_CONTACT);
        push_filters(&mut query, filter);
        query.push(" ORDER BY h.created_at DESC, h.id DESC LIMIT ");
        query.push_bind(per_page as i64);
        query.push(" OFFSET ");
        query.push_bind(((page - 1) * per_page) as i64);

        let rows: Vec<HistoryContactRow> =
            query.build_query_as().fetch_all(self.pool()).await?;

        Ok(Page {
            items: rows.into_iter().map(HistoryWithContact::from).collect(),
            current_page: page,
            last_page: last_page(total, per_page),
            per_page,
            total,
        })
    }

    pub async fn history_stats(&self) -> Result<HistoryStats> {
        let total_entries: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM contact_histories")
            .fetch_one(self.pool())
            .await?;

        let mut per_action = [0i64; 3];
        for (slot, action) in per_action.iter_mut().zip(actions::all()) {
            *slot = sqlx::query_scalar("SELECT COUNT(*) FROM contact_histories WHERE action = ?")
                .bind(action)
                .fetch_one(self.pool())
                .await?;
        }

        let cutoff = unix_timestamp() - RECENT_WINDOW_SECS;
        let recent_activity: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM contact_histories WHERE created_at >= ?")
                .bind(cutoff)
                .fetch_one(self.pool())
                .await?;

        Ok(HistoryStats {
            total_entries,
            created_actions: per_action[0],
            updated_actions: per_action[1],
            deleted_actions: per_action[2],
            recent_activity,
        })
    }
}

fn push_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &HistoryFilter) {
    query.push(" WHERE 1 = 1");

    if let Some(term) = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let pattern = format!("%{term}%");
        query.push(" AND (c.first_name LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR c.last_name LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR c.email LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR h.action LIKE ");
        query.push_bind(pattern.clone());
        query.push(" OR h.field LIKE ");
        query.push_bind(pattern);
        query.push(")");
    }

    if let Some(action) = filter.action.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.push(" AND h.action = ");
        query.push_bind(action.to_string());
    }

    if let Some(contact_id) = filter.contact_id {
        query.push(" AND h.contact_id = ");
        query.push_bind(contact_id);
    }

    if let Some(user_id) = filter.user_id.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        query.push(" AND h.user_id = ");
        query.push_bind(user_id.to_string());
    }

    if let Some(from) = filter.date_from {
        query.push(" AND h.created_at >= ");
        query.push_bind(day_start_ts(from));
    }

    // date_to is inclusive: everything before the start of the next day
    if let Some(to) = filter.date_to {
        if let Some(next) = to.succ_opt() {
            query.push(" AND h.created_at < ");
            query.push_bind(day_start_ts(next));
        }
    }
}

fn day_start_ts(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}
