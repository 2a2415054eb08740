//! Backend feature audits ensure required DB capabilities are available.

use diesel::{QueryableByName, result::Error as DieselError, sql_query, sql_types::Text};
use diesel_async::RunQueryDsl;

use super::connection::DbConnection;

#[derive(QueryableByName)]
struct VersionRow {
    #[diesel(sql_type = Text)]
    version: String,
}

fn unsupported(message: String) -> DieselError {
    DieselError::QueryBuilderError(Box::new(std::io::Error::other(message)))
}

/// Parse the leading `major.minor` pair out of a dotted version string.
fn major_minor(version: &str) -> Option<(u32, u32)> {
    let mut parts = version.split('.');
    let major = parts.next()?.trim().parse().ok()?;
    let minor = parts
        .next()
        .and_then(|m| m.trim().parse().ok())
        .unwrap_or(0);
    Some((major, minor))
}

/// Verify that `SQLite` supports `RETURNING` clauses (3.35 or newer).
///
/// Post insertion reads back generated ids through `RETURNING`, so older
/// libraries are refused at startup rather than failing mid-transaction.
///
/// # Errors
/// Returns any error produced by the version query, or an error when the
/// library is older than 3.35.
#[cfg(feature = "sqlite")]
pub async fn audit_sqlite_features(conn: &mut DbConnection) -> diesel::QueryResult<()> {
    let row: VersionRow = sql_query("SELECT sqlite_version() AS version")
        .get_result(conn)
        .await?;
    match major_minor(&row.version) {
        Some(v) if v >= (3, 35) => Ok(()),
        Some(_) => Err(unsupported(format!(
            "sqlite {} is not supported (require >= 3.35)",
            row.version
        ))),
        None => Err(unsupported(format!(
            "unable to parse sqlite version: {}",
            row.version
        ))),
    }
}

/// Verify that the Postgres server meets application requirements.
///
/// Checks that the connected `PostgreSQL` server version is at least 14.
///
/// # Errors
/// Returns any error produced by the version query or if the version string cannot be parsed.
#[cfg(feature = "postgres")]
pub async fn audit_postgres_features(conn: &mut DbConnection) -> diesel::QueryResult<()> {
    let row: VersionRow = sql_query("SELECT version() AS version").get_result(conn).await?;

    let major = row
        .version
        .split_whitespace()
        .nth(1)
        .and_then(major_minor)
        .map(|(major, _)| major)
        .ok_or_else(|| unsupported(format!("unable to parse postgres version: {}", row.version)))?;

    if major < 14 {
        return Err(unsupported(format!(
            "postgres version {major} is not supported (require >= 14)"
        )));
    }

    Ok(())
}
