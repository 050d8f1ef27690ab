use std::collections::BTreeMap;

use thiserror::Error;

/// Field name to the list of messages explaining why it was rejected.
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("Contact not found: {0}")]
    ContactNotFound(i64),

    #[error("History entry not found: {0}")]
    HistoryEntryNotFound(i64),

    #[error("Validation failed")]
    ValidationFailed(ValidationErrors),

    #[error("Could not resolve a data directory for the database")]
    DataDir,
}

pub type Result<T> = std::result::Result<T, DbError>;
