use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::AppResult;

const USER_VERSION: i32 = 2;

#[derive(Debug)]
pub struct MigrationInfo {
    pub version: i32,
    pub description: String,
    pub applied_at: DateTime<Utc>,
}

pub fn run(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS migration_history (
            version INTEGER PRIMARY KEY,
            description TEXT NOT NULL,
            applied_at TEXT NOT NULL
        );
        "#,
    )?;

    let mut current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        info!(target: "app::db", version = current_version, "running migration v1");
        migrate_to_v1(conn)?;
        current_version = 1;
        conn.execute_batch(&format!("PRAGMA user_version = {current_version}"))?;
        record_migration(conn, 1, "Track typography sub-score on progress entries")?;
    }

    if current_version < 2 {
        info!(target: "app::db", version = current_version, "running migration v2");
        migrate_to_v2(conn)?;
        current_version = 2;
        conn.execute_batch(&format!("PRAGMA user_version = {current_version}"))?;
        record_migration(conn, 2, "Index analyses by image digest")?;
    }

    debug_assert_eq!(current_version, USER_VERSION);
    Ok(())
}

fn migrate_to_v1(conn: &Connection) -> AppResult<()> {
    if !column_exists(conn, "progress_entries", "typography_score")? {
        conn.execute_batch("ALTER TABLE progress_entries ADD COLUMN typography_score REAL;")?;
    }
    Ok(())
}

fn migrate_to_v2(conn: &Connection) -> AppResult<()> {
    conn.execute_batch(
        r#"
        CREATE INDEX IF NOT EXISTS idx_design_analyses_digest
            ON design_analyses(user_id, image_digest);
        "#,
    )?;
    Ok(())
}

fn column_exists(conn: &Connection, table: &str, column: &str) -> AppResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM pragma_table_info(?1) WHERE name = ?2",
            [table, column],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

fn record_migration(conn: &Connection, version: i32, description: &str) -> AppResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO migration_history (version, description, applied_at) VALUES (?1, ?2, ?3)",
        (version, description, Utc::now().to_rfc3339()),
    )?;
    Ok(())
}

pub fn history(conn: &Connection) -> AppResult<Vec<MigrationInfo>> {
    let mut stmt = conn.prepare(
        "SELECT version, description, applied_at FROM migration_history ORDER BY version ASC",
    )?;

    let rows = stmt
        .query_map([], |row| {
            let applied_at: String = row.get(2)?;
            Ok((row.get::<_, i32>(0)?, row.get::<_, String>(1)?, applied_at))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(rows
        .into_iter()
        .map(|(version, description, applied_at)| MigrationInfo {
            version,
            description,
            applied_at: DateTime::parse_from_rfc3339(&applied_at)
                .map(|value| value.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(include_str!("schema.sql")).unwrap();

        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i32 = conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
            .unwrap();
        assert_eq!(version, USER_VERSION);
        assert!(column_exists(&conn, "progress_entries", "typography_score").unwrap());
        assert_eq!(history(&conn).unwrap().len(), 2);
    }
}
