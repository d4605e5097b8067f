use log::warn;
use postgres::{types::ToSql, Client, Config, NoTls};

use crate::config::LoaderConfig;
use crate::db::loader::{BatchError, Database, Row, Session};
use crate::db::value::Value;
use crate::error::{DbError, Error};

/// Connection settings for a Postgres server.
#[derive(Clone)]
pub struct Postgres {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
}

impl From<&LoaderConfig> for Postgres {
    fn from(config: &LoaderConfig) -> Self {
        Postgres {
            host: config.host.clone(),
            port: config.port,
            user: config.user.clone(),
            password: config.password.clone(),
            dbname: config.database.clone(),
        }
    }
}

impl Postgres {
    fn config(&self) -> Config {
        let mut config = Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .user(&self.user)
            .dbname(&self.dbname);
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }

    /// Open a connection outside of a load.
    pub fn open(&self) -> Result<Client, Error> {
        self.config().connect(NoTls).map_err(|e| Error::Connection {
            target: self.target(),
            source: e.into(),
        })
    }
}

impl Database for Postgres {
    type Session = PostgresSession;

    fn connect(&self) -> Result<PostgresSession, Error> {
        Ok(PostgresSession {
            client: self.open()?,
        })
    }

    fn target(&self) -> String {
        format!(
            "postgres://{}@{}:{}/{}",
            self.user, self.host, self.port, self.dbname
        )
    }
}

pub struct PostgresSession {
    client: Client,
}

fn params(row: &[Value]) -> Vec<&(dyn ToSql + Sync)> {
    row.iter().map(|v| v as &(dyn ToSql + Sync)).collect()
}

fn failed_at(row: usize, applied: usize) -> impl FnOnce(postgres::Error) -> BatchError {
    move |e| BatchError {
        row,
        applied,
        source: e.into(),
    }
}

impl Session for PostgresSession {
    /// Outside of an explicit transaction every statement commits on its own.
    fn execute_autocommit(&mut self, sql: &str, rows: &[Row]) -> Result<usize, BatchError> {
        let stmt = self.client.prepare(sql).map_err(failed_at(0, 0))?;
        for (i, row) in rows.iter().enumerate() {
            self.client
                .execute(&stmt, &params(row))
                .map_err(failed_at(i, i))?;
        }
        Ok(rows.len())
    }

    fn execute_transaction(&mut self, sql: &str, rows: &[Row]) -> Result<usize, BatchError> {
        let mut tx = self.client.transaction().map_err(failed_at(0, 0))?;
        let mut failure: Option<BatchError> = None;
        match tx.prepare(sql) {
            Ok(stmt) => {
                for (i, row) in rows.iter().enumerate() {
                    if let Err(e) = tx.execute(&stmt, &params(row)) {
                        failure = Some(failed_at(i, 0)(e));
                        break;
                    }
                }
            }
            Err(e) => failure = Some(failed_at(0, 0)(e)),
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
        Ok(self.client.batch_execute(sql)?)
    }

    fn close(self) -> Result<(), DbError> {
        self.client.close().map_err(|e| e.into())
    }
}
