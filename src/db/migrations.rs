//! Embedded schema migrations for the forum tables.

use std::time::Duration;

use diesel::result::{Error as DieselError, QueryResult};
use diesel_migrations::MigrationHarness;
use thiserror::Error;
use tokio::time::timeout;
use tracing::{debug, info};

use super::connection::{Backend, DbConnection, MIGRATIONS};

/// Upper bound on a single migration run.
const MIGRATION_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
enum SchemaError {
    #[error("migration harness error: {0}")]
    Harness(Box<dyn std::error::Error + Send + Sync>),
    #[error("schema upgrade exceeded {0:?}")]
    Timeout(Duration),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("cannot open migration connection: {0}")]
    Connect(#[from] diesel::result::ConnectionError),
    #[cfg(all(feature = "postgres", not(feature = "sqlite")))]
    #[error("migration task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<SchemaError> for DieselError {
    fn from(e: SchemaError) -> Self { Self::SerializationError(Box::new(e)) }
}

/// Bring the forum schema on `conn` up to date.
fn upgrade(conn: &mut impl MigrationHarness<Backend>) -> QueryResult<()> {
    if matches!(conn.has_pending_migration(MIGRATIONS), Ok(false)) {
        debug!("forum schema is current");
        return Ok(());
    }
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(SchemaError::Harness)?;
    for version in &applied {
        debug!(%version, "migration applied");
    }
    info!(applied = applied.len(), "forum schema upgraded");
    Ok(())
}

/// Run the embedded migrations for the enabled backend.
///
/// `SQLite` upgrades through `conn` itself. PostgreSQL opens a short-lived
/// blocking connection to `database_url` and leaves `conn` untouched.
///
/// Applying migrations to a current schema is a no-op.
///
/// # Errors
/// Returns any error produced by Diesel while migrating, or a serialization
/// error wrapping a harness failure or timeout.
#[cfg(feature = "sqlite")]
pub async fn apply_migrations(conn: &mut DbConnection, _database_url: &str) -> QueryResult<()> {
    timeout(MIGRATION_TIMEOUT, conn.spawn_blocking(|c| upgrade(c)))
        .await
        .map_err(|_| SchemaError::Timeout(MIGRATION_TIMEOUT))?
}

/// Run the embedded migrations for the enabled backend.
///
/// `SQLite` upgrades through `conn` itself. PostgreSQL opens a short-lived
/// blocking connection to `database_url` and leaves `conn` untouched.
///
/// Applying migrations to a current schema is a no-op.
///
/// # Errors
/// Returns any error produced by Diesel while migrating, or a serialization
/// error wrapping a connection failure, harness failure, or timeout.
#[cfg(all(feature = "postgres", not(feature = "sqlite")))]
pub async fn apply_migrations(_conn: &mut DbConnection, database_url: &str) -> QueryResult<()> {
    use diesel::{Connection, pg::PgConnection};

    let url = database_url.to_owned();
    let task = tokio::task::spawn_blocking(move || {
        let mut pg = PgConnection::establish(&url).map_err(SchemaError::from)?;
        upgrade(&mut pg)
    });
    timeout(MIGRATION_TIMEOUT, task)
        .await
        .map_err(|_| SchemaError::Timeout(MIGRATION_TIMEOUT))?
        .map_err(SchemaError::from)?
}
