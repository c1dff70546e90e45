use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::{Connection, Transaction, TransactionBehavior};
use tracing::{debug, info};

use crate::error::AppResult;

pub mod migrations;

pub mod repositories;

const SCHEMA_SQL: &str = include_str!("schema.sql");

/// Opens a configured SQLite connection per call. Cloning is cheap; every
/// clone points at the same database file.
#[derive(Clone, Debug)]
pub struct DbPool {
    path: PathBuf,
}

impl DbPool {
    pub fn new<P: Into<PathBuf>>(path: P) -> AppResult<Self> {
        let path = path.into();
        info!(target: "app::db", db_path = %path.display(), "initializing database pool");
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent)?;
            }
        }

        let pool = Self { path };
        {
            let conn = pool.open()?;
            conn.execute_batch(SCHEMA_SQL)?;
            migrations::run(&conn)?;
        }

        Ok(pool)
    }

    pub fn get_connection(&self) -> AppResult<Connection> {
        let conn = self.open()?;
        debug!(target: "app::db", db_path = %self.path.display(), "database connection ready");
        Ok(conn)
    }

    pub fn with_connection<F, T>(&self, callback: F) -> AppResult<T>
    where
        F: FnOnce(&Connection) -> AppResult<T>,
    {
        let conn = self.get_connection()?;
        callback(&conn)
    }

    /// Run `callback` inside a transaction that commits only when it succeeds.
    /// The write lock is taken up front so concurrent writers queue on the
    /// busy timeout.
    pub fn with_transaction<F, T>(&self, callback: F) -> AppResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> AppResult<T>,
    {
        let mut conn = self.get_connection()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = callback(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn open(&self) -> AppResult<Connection> {
        let mut conn = Connection::open(&self.path)?;
        configure_connection(&mut conn)?;
        Ok(conn)
    }
}

fn configure_connection(conn: &mut Connection) -> AppResult<()> {
    conn.busy_timeout(Duration::from_secs(5))?;
    conn.pragma_update(None, "foreign_keys", 1)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(())
}
