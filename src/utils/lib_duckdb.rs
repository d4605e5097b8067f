use std::path::{Path, PathBuf};

use duckdb::{params_from_iter, Connection};
use log::warn;

use crate::db::loader::{BatchError, Database, Row, Session};
use crate::error::{DbError, Error};

/// A DuckDB database file.  Credentials do not apply.
#[derive(Debug, Clone)]
pub struct DuckDb {
    pub path: PathBuf,
}

impl DuckDb {
    pub fn new<P: AsRef<Path>>(path: P) -> DuckDb {
        DuckDb {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Open a connection outside of a load, e.g. to create tables or to
    /// inspect what was loaded.
    pub fn open(&self) -> Result<Connection, Error> {
        Connection::open(&self.path).map_err(|e| Error::Connection {
            target: self.target(),
            source: e.into(),
        })
    }
}

impl Database for DuckDb {
    type Session = DuckDbSession;

    fn connect(&self) -> Result<DuckDbSession, Error> {
        Ok(DuckDbSession { conn: self.open()? })
    }

    fn target(&self) -> String {
        format!("duckdb:{}", self.path.display())
    }
}

pub struct DuckDbSession {
    conn: Connection,
}

fn failed_at(row: usize, applied: usize) -> impl FnOnce(duckdb::Error) -> BatchError {
    move |e| BatchError {
        row,
        applied,
        source: e.into(),
    }
}

impl Session for DuckDbSession {
    fn execute_autocommit(&mut self, sql: &str, rows: &[Row]) -> Result<usize, BatchError> {
        let mut stmt = self.conn.prepare(sql).map_err(failed_at(0, 0))?;
        for (i, row) in rows.iter().enumerate() {
            stmt.execute(params_from_iter(row.iter()))
                .map_err(failed_at(i, i))?;
        }
        Ok(rows.len())
    }

    fn execute_transaction(&mut self, sql: &str, rows: &[Row]) -> Result<usize, BatchError> {
        let tx = self.conn.transaction().map_err(failed_at(0, 0))?;
        let mut failure: Option<BatchError> = None;
        {
            match tx.prepare(sql) {
                Ok(mut stmt) => {
                    for (i, row) in rows.iter().enumerate() {
                        if let Err(e) = stmt.execute(params_from_iter(row.iter())) {
                            failure = Some(failed_at(i, 0)(e));
                            break;
                        }
                    }
                }
                Err(e) => failure = Some(failed_at(0, 0)(e)),
            }
        }

        match failure {
            None => {
                tx.commit().map_err(failed_at(rows.len(), 0))?;
                Ok(rows.len())
            }
            Some(e) => {
                if let Err(rb) = tx.rollback() {
                    warn!("Rollback failed: {}", rb);
                }
                Err(e)
            }
        }
    }

    fn execute_batch(&mut self, sql: &str) -> Result<(), DbError> {
        Ok(self.conn.execute_batch(sql)?)
    }

    fn close(self) -> Result<(), DbError> {
        self.conn.close().map_err(|(_, e)| e.into())
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;
    use crate::db::value::Value;

    fn setup(db: &DuckDb) -> Result<(), Box<dyn Error>> {
        let conn = db.open()?;
        conn.execute_batch(
            r"
            CREATE TABLE items (
                id INTEGER PRIMARY KEY,
                label VARCHAR
            );",
        )?;
        Ok(())
    }

    fn count(db: &DuckDb) -> Result<i64, Box<dyn Error>> {
        let conn = db.open()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |row| row.get(0))?;
        Ok(n)
    }

    fn rows(ids: &[i64]) -> Vec<Row> {
        ids.iter()
            .map(|id| vec![Value::Int(*id), Value::Text(format!("item {}", id))])
            .collect()
    }

    const SQL: &str = "INSERT INTO items (id, label) VALUES ($1, $2)";

    #[test]
    fn autocommit_keeps_prefix() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let db = DuckDb::new(dir.path().join("items.duckdb"));
        setup(&db)?;

        let mut session = db.connect()?;
        let err = session
            .execute_autocommit(SQL, &rows(&[0, 1, 1]))
            .expect_err("duplicate key");
        session.close()?;
        assert_eq!(err.row, 2);
        assert_eq!(err.applied, 2);
        assert_eq!(count(&db)?, 2);
        Ok(())
    }

    #[test]
    fn transaction_is_all_or_nothing() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let db = DuckDb::new(dir.path().join("items.duckdb"));
        setup(&db)?;

        let mut session = db.connect()?;
        let err = session
            .execute_transaction(SQL, &rows(&[0, 1, 1]))
            .expect_err("duplicate key");
        assert_eq!(err.row, 2);
        assert_eq!(err.applied, 0);
        // the session is still usable after the rollback
        assert_eq!(session.execute_transaction(SQL, &rows(&[5, 6]))?, 2);
        session.close()?;
        assert_eq!(count(&db)?, 2);
        Ok(())
    }

    #[test]
    fn bad_statement() -> Result<(), Box<dyn Error>> {
        let dir = tempfile::tempdir()?;
        let db = DuckDb::new(dir.path().join("items.duckdb"));
        setup(&db)?;

        let mut session = db.connect()?;
        let err = session
            .execute_transaction("INSERT INTO missing (id) VALUES ($1)", &rows(&[0]))
            .expect_err("no such table");
        assert_eq!(err.row, 0);
        session.close()?;
        Ok(())
    }

    #[test]
    fn unopenable_path() {
        let db = DuckDb::new("/nonexistent/dir/covid.duckdb");
        assert!(matches!(
            db.connect(),
            Err(crate::Error::Connection { .. })
        ));
    }
}
