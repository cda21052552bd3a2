use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

mod appointments;
mod patients;
mod stats;
mod users;

pub use appointments::*;
pub use patients::*;
pub use stats::*;
pub use users::*;

#[derive(Debug, Clone)]
pub struct Db(pub PgPool);

#[derive(thiserror::Error, Debug)]
pub enum DbError {
    #[error("sqlx error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("duplicate key")]
    Duplicate,
}

pub async fn connect(database_url: &str, max: u32) -> Result<Db, DbError> {
    let pool = PgPoolOptions::new()
        .max_connections(max)
        .connect(database_url)
        .await?;
    Ok(Db(pool))
}

pub async fn migrate(db: &Db) -> Result<(), DbError> {
    sqlx::migrate!("./migrations").run(&db.0).await?;
    Ok(())
}

/// Postgres unique-violation (23505) becomes `DbError::Duplicate` so callers
/// can surface it as a conflict instead of an internal error.
pub(crate) fn map_write_err(e: sqlx::Error) -> DbError {
    if let sqlx::Error::Database(ref d) = e {
        if d.code().as_deref() == Some("23505") {
            return DbError::Duplicate;
        }
    }
    DbError::Sqlx(e)
}
