use thiserror::Error;

/// An error raised by one of the database drivers.
#[derive(Error, Debug)]
pub enum DbError {
    #[error(transparent)]
    DuckDb(#[from] duckdb::Error),
    #[error(transparent)]
    Postgres(#[from] postgres::Error),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error("failed to connect to {target}: {source}")]
    Connection { target: String, source: DbError },

    /// `row` is the 0-based index of the row that failed, `applied` is how
    /// many rows of the batch are still committed in the database.
    #[error("insert into {table} failed at row {row} ({applied} rows applied): {source}")]
    Load {
        table: String,
        row: usize,
        applied: usize,
        source: DbError,
    },

    #[error(transparent)]
    Database(#[from] DbError),
}
