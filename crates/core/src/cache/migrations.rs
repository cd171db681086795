//! Database schema migrations.
//!
//! Uses a simple version table approach to track applied migrations.

use std::num::ParseIntError;

use super::Error;
use tokio_rusqlite::{Connection, params};

/// Migration list: (version, SQL).
///
/// Applied in order; every statement is idempotent (CREATE IF NOT EXISTS).
const MIGRATIONS: &[(&str, &str)] = &[("1", include_str!("../../migrations/001_cache_storage.sql"))];

/// Run any pending migrations.
///
/// # Errors
///
/// Returns an error if a migration SQL fails to execute.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| {
                row.get(0)
            })
            .map_err(Error::from)?;

        for (version, sql) in MIGRATIONS {
            let version_num: i64 = version
                .parse()
                .map_err(|e: ParseIntError| Error::MigrationFailed(e.to_string()))?;
            if version_num > current {
                conn.execute_batch(sql)
                    .map_err(|e| Error::MigrationFailed(format!("version {version_num}: {e}")))?;
                conn.execute(
                    "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                    params![version_num, chrono::Utc::now().to_rfc3339()],
                )
                .map_err(Error::from)?;
                tracing::debug!("applied cache migration {}", version_num);
            }
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
