// src/db/mod.rs

//! SQLite persistence for the product/recipe graph
//!
//! All state lives in a single SQLite database. Structural mutations run in
//! `BEGIN IMMEDIATE` transactions so that validation (including the cycle
//! check) always sees the same edge set that is about to be committed.

pub mod models;
pub mod schema;

use crate::error::{Error, Result};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// How long a connection waits on a locked database before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Create (if needed) and migrate the database at `db_path`
pub fn init(db_path: &str) -> Result<()> {
    info!("Initializing database at {}", db_path);

    if let Some(parent) = Path::new(db_path).parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(())
}

/// Open an existing database
///
/// Fails if the database has not been initialized with [`init`].
pub fn open(db_path: &str) -> Result<Connection> {
    if !Path::new(db_path).exists() {
        return Err(Error::ConfigError(format!(
            "Database not found at {db_path}; run `init` first"
        )));
    }

    let conn = Connection::open(db_path)?;
    configure(&conn)?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Open a fresh, migrated in-memory database
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    schema::migrate(&conn)?;
    Ok(conn)
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;
         PRAGMA journal_mode = WAL;
         PRAGMA synchronous = NORMAL;",
    )?;
    Ok(())
}

/// Run `f` inside a deferred transaction
///
/// Commits when `f` returns `Ok`, rolls back otherwise.
pub fn transaction<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    run_transaction(conn, TransactionBehavior::Deferred, f)
}

/// Run `f` inside an immediate (write-locking) transaction
///
/// Use this for structural mutations whose validation reads the same rows it
/// writes.
pub fn transaction_immediate<T, F>(conn: &mut Connection, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    run_transaction(conn, TransactionBehavior::Immediate, f)
}

fn run_transaction<T, F>(conn: &mut Connection, behavior: TransactionBehavior, f: F) -> Result<T>
where
    F: FnOnce(&Transaction) -> Result<T>,
{
    let tx = conn.transaction_with_behavior(behavior)?;
    match f(&tx) {
        Ok(value) => {
            tx.commit()?;
            Ok(value)
        }
        Err(e) => {
            debug!("Rolling back transaction: {}", e);
            // Dropping the transaction rolls it back; an explicit rollback
            // surfaces errors from the rollback itself in the log.
            if let Err(rollback_err) = tx.rollback() {
                debug!("Rollback failed: {}", rollback_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_and_open() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("recipes.db");
        let path = path.to_str().unwrap();

        init(path).unwrap();
        let conn = open(path).unwrap();
        assert_eq!(
            schema::get_schema_version(&conn).unwrap(),
            schema::SCHEMA_VERSION
        );
    }

    #[test]
    fn test_open_missing_database_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.db");
        assert!(open(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn test_transaction_rolls_back_on_error() {
        let mut conn = open_in_memory().unwrap();

        let result: Result<()> = transaction(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO products (id, name, product_type, unit) VALUES ('flour', 'Flour', 'raw', 'gram')",
                [],
            )?;
            Err(Error::Validation("abort".into()))
        });
        assert!(result.is_err());

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_transaction_commits_on_success() {
        let mut conn = open_in_memory().unwrap();

        transaction_immediate(&mut conn, |tx| {
            tx.execute(
                "INSERT INTO products (id, name, product_type, unit) VALUES ('flour', 'Flour', 'raw', 'gram')",
                [],
            )?;
            Ok(())
        })
        .unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
