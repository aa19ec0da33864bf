//! Schema versioning.
//!
//! The schema version lives in SQLite's `user_version` header field. Step `n`
//! of [`MIGRATIONS`] moves a database from version `n` to `n + 1`, and runs in
//! the same transaction as the version bump.

use anyhow::{bail, Context, Result};
use rusqlite::Connection;

const MIGRATIONS: &[&str] = &[include_str!("migrations/001_initial.sql")];

/// Schema version this build reads and writes.
pub const SCHEMA_VERSION: u32 = MIGRATIONS.len() as u32;

pub fn run_migrations(conn: &Connection) -> Result<()> {
    let current = schema_version(conn)?;

    if current > SCHEMA_VERSION {
        bail!(
            "Database schema version {} is newer than this build supports ({})",
            current,
            SCHEMA_VERSION
        );
    }

    for (step, sql) in MIGRATIONS.iter().enumerate().skip(current as usize) {
        let target = step as u32 + 1;
        tracing::info!("Upgrading roster schema to version {}", target);

        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(sql)
            .with_context(|| format!("Failed to apply schema version {}", target))?;
        tx.pragma_update(None, "user_version", target)?;
        tx.commit()?;
    }

    Ok(())
}

pub fn schema_version(conn: &Connection) -> Result<u32> {
    let version = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn column_names(conn: &Connection, table: &str) -> Vec<String> {
        let mut stmt = conn
            .prepare(&format!("SELECT name FROM pragma_table_info('{}')", table))
            .unwrap();
        let names = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<String>, _>>()
            .unwrap();
        names
    }

    #[test]
    fn test_fresh_db_gets_current_schema() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 0);

        run_migrations(&conn).unwrap();

        for table in ["branches", "ranks", "sub_branches", "members"] {
            assert!(!column_names(&conn, table).is_empty(), "missing table {}", table);
        }
        let columns = column_names(&conn, "branches");
        assert!(columns.contains(&"layout".to_string()));
        assert!(columns.contains(&"special_section".to_string()));
        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();

        assert_eq!(schema_version(&conn).unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn test_newer_schema_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();
        conn.pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();

        let err = run_migrations(&conn).unwrap_err();
        assert!(err.to_string().contains("newer than this build"));
    }

    #[test]
    fn test_layout_is_constrained() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let result = conn.execute(
            "INSERT INTO branches (id, name, layout, created_at) VALUES ('b', 'NAVY', 'navy', '')",
            [],
        );
        assert!(result.is_err());
    }
}
