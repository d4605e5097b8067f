use std::fmt;

use itertools::Itertools;
use log::{debug, error, info, warn};
use thiserror::Error;

use crate::config::CommitMode;
use crate::db::value::Value;
use crate::error::{self, DbError};

pub type Row = Vec<Value>;

/// A record that maps to one row of a destination table.
pub trait TableRow {
    const TABLE: &'static str;
    /// Column names, in the order of [`TableRow::values`].
    const COLUMNS: &'static [&'static str];

    fn values(&self) -> Row;
}

/// A parameterized `INSERT` with one `$n` placeholder per column.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertStatement {
    pub table: String,
    pub columns: Vec<String>,
}

impl InsertStatement {
    pub fn new(table: &str, columns: &[&str]) -> InsertStatement {
        InsertStatement {
            table: table.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }

    pub fn for_table<T: TableRow>() -> InsertStatement {
        InsertStatement::new(T::TABLE, T::COLUMNS)
    }

    pub fn arity(&self) -> usize {
        self.columns.len()
    }

    pub fn sql(&self) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table,
            self.columns.join(", "),
            (1..=self.arity()).map(|i| format!("${}", i)).join(", ")
        )
    }
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sql())
    }
}

/// A batch that stopped part way through.
#[derive(Error, Debug)]
#[error("row {row} failed ({applied} rows applied): {source}")]
pub struct BatchError {
    /// Index of the row the driver rejected.
    pub row: usize,
    /// Rows that are committed in spite of the failure.
    pub applied: usize,
    pub source: DbError,
}

/// An open connection.
pub trait Session: Sized {
    /// Execute `sql` once per row, letting each statement commit on its own.
    fn execute_autocommit(&mut self, sql: &str, rows: &[Row]) -> Result<usize, BatchError>;

    /// Execute `sql` once per row inside a single transaction.  Rolls back
    /// and reports `applied == 0` if any row fails.
    fn execute_transaction(&mut self, sql: &str, rows: &[Row]) -> Result<usize, BatchError>;

    /// Run one or more statements without parameters.
    fn execute_batch(&mut self, sql: &str) -> Result<(), DbError>;

    fn close(self) -> Result<(), DbError>;
}

/// Connection parameters for a database.  Holds no connection itself.
pub trait Database {
    type Session: Session;

    fn connect(&self) -> Result<Self::Session, error::Error>;

    /// Where the rows go, safe to log.
    fn target(&self) -> String;
}

/// Batched inserts into a database, one connection per call.
pub struct Loader<D: Database> {
    pub database: D,
    pub commit_mode: CommitMode,
}

impl<D: Database> Loader<D> {
    pub fn new(database: D, commit_mode: CommitMode) -> Loader<D> {
        Loader {
            database,
            commit_mode,
        }
    }

    /// Insert all the rows.  Return the number of rows inserted.
    ///
    /// The connection is opened here and closed before returning, whatever
    /// the outcome.  With [`CommitMode::Autocommit`] a failure can leave a
    /// prefix of `rows` in the table, see [`error::Error::Load`].
    pub fn load(&self, statement: &InsertStatement, rows: &[Row]) -> Result<usize, error::Error> {
        let mut session = self.database.connect()?;
        debug!("Connected to {} ({} mode)", self.database.target(), self.commit_mode);

        let sql = statement.sql();
        let res = match self.commit_mode {
            CommitMode::Transaction => session.execute_transaction(&sql, rows),
            CommitMode::Autocommit => session.execute_autocommit(&sql, rows),
        };

        if let Err(e) = session.close() {
            warn!("Failed to close connection to {}: {}", self.database.target(), e);
        }
        debug!("Disconnected from {}", self.database.target());

        match res {
            Ok(n) => {
                info!("{} rows inserted into {}", n, statement.table);
                Ok(n)
            }
            Err(e) => {
                error!("Insert into {} failed at row {}: {}", statement.table, e.row, e.source);
                match self.commit_mode {
                    CommitMode::Transaction => {
                        warn!("Rolled back {} rows of {}", e.row, statement.table)
                    }
                    CommitMode::Autocommit => warn!(
                        "Autocommit mode, {} rows of {} stay committed",
                        e.applied, statement.table
                    ),
                }
                Err(error::Error::Load {
                    table: statement.table.clone(),
                    row: e.row,
                    applied: e.applied,
                    source: e.source,
                })
            }
        }
    }

    /// Insert typed records, building the statement from the record type.
    pub fn load_records<T: TableRow>(&self, records: &[T]) -> Result<usize, error::Error> {
        let rows: Vec<Row> = records.iter().map(|r| r.values()).collect();
        self.load(&InsertStatement::for_table::<T>(), &rows)
    }
}
