mod error;
mod history;
mod models;
mod repository;
mod schema;

pub use error::{DbError, Result, ValidationErrors};
pub use models::*;
pub use repository::{DEFAULT_PER_PAGE, KnotDb};
