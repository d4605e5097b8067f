use std::{env, fmt, path::PathBuf, str::FromStr};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    DuckDb,
    Postgres,
}

impl FromStr for Backend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "duckdb" => Ok(Backend::DuckDb),
            "postgres" | "postgresql" => Ok(Backend::Postgres),
            _ => Err(Error::Config(format!("Failed to parse {s} as a database backend"))),
        }
    }
}

/// How a batch of rows is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommitMode {
    /// The whole batch runs in one transaction.  A failure leaves nothing
    /// applied.
    #[default]
    Transaction,
    /// Each row is committed as soon as it is inserted.  A failure leaves the
    /// rows before it in the table.
    Autocommit,
}

impl FromStr for CommitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "transaction" => Ok(CommitMode::Transaction),
            "autocommit" => Ok(CommitMode::Autocommit),
            _ => Err(Error::Config(format!("Failed to parse {s} as a commit mode"))),
        }
    }
}

impl fmt::Display for CommitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommitMode::Transaction => write!(f, "transaction"),
            CommitMode::Autocommit => write!(f, "autocommit"),
        }
    }
}

/// Connection settings and input file for one run.
#[derive(Clone)]
pub struct LoaderConfig {
    pub backend: Backend,
    /// Database name for Postgres, path to the database file for DuckDB.
    pub database: String,
    pub host: String,
    pub user: String,
    pub password: String,
    pub port: u16,
    pub input_path: PathBuf,
    pub commit_mode: CommitMode,
}

// Keep the password out of the logs.
impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("backend", &self.backend)
            .field("database", &self.database)
            .field("host", &self.host)
            .field("user", &self.user)
            .field("password", &"***")
            .field("port", &self.port)
            .field("input_path", &self.input_path)
            .field("commit_mode", &self.commit_mode)
            .finish()
    }
}

impl LoaderConfig {
    /// Read the settings from the process environment.  Call
    /// `dotenvy::from_path` first if they live in an env file.
    pub fn from_env() -> Result<LoaderConfig, Error> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the settings from any key lookup, see the `COVID_*` variables.
    pub fn from_lookup<F>(lookup: F) -> Result<LoaderConfig, Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| Error::Config(format!("{key} is not set")))
        };

        let backend = match lookup("COVID_DB_BACKEND") {
            Some(v) => v.parse()?,
            None => Backend::Postgres,
        };
        let port = match lookup("COVID_DB_PORT") {
            Some(v) => v
                .parse::<u16>()
                .map_err(|_| Error::Config(format!("Failed to parse {v} as a port number")))?,
            None => 5432,
        };
        let commit_mode = match lookup("COVID_COMMIT_MODE") {
            Some(v) => v.parse()?,
            None => CommitMode::default(),
        };

        Ok(LoaderConfig {
            backend,
            database: required("COVID_DB_NAME")?,
            host: lookup("COVID_DB_HOST").unwrap_or_else(|| "localhost".to_string()),
            user: lookup("COVID_DB_USER").unwrap_or_else(|| "postgres".to_string()),
            password: lookup("COVID_DB_PASSWORD").unwrap_or_default(),
            port,
            input_path: PathBuf::from(required("COVID_INPUT_PATH")?),
            commit_mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::error::Error;

    use super::{Backend, CommitMode, LoaderConfig, PathBuf};

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() -> Result<(), Box<dyn Error>> {
        let config = LoaderConfig::from_lookup(lookup_from(&[
            ("COVID_DB_NAME", "grupo_z"),
            ("COVID_INPUT_PATH", "/tmp/caso_full.csv"),
        ]))?;
        assert_eq!(config.backend, Backend::Postgres);
        assert_eq!(config.host, "localhost");
        assert_eq!(config.user, "postgres");
        assert_eq!(config.password, "");
        assert_eq!(config.port, 5432);
        assert_eq!(config.commit_mode, CommitMode::Transaction);
        assert_eq!(config.input_path, PathBuf::from("/tmp/caso_full.csv"));
        Ok(())
    }

    #[test]
    fn all_fields() -> Result<(), Box<dyn Error>> {
        let config = LoaderConfig::from_lookup(lookup_from(&[
            ("COVID_DB_BACKEND", "DuckDB"),
            ("COVID_DB_NAME", "/tmp/covid.duckdb"),
            ("COVID_DB_HOST", "db.local"),
            ("COVID_DB_USER", "etl"),
            ("COVID_DB_PASSWORD", "secret"),
            ("COVID_DB_PORT", "6543"),
            ("COVID_INPUT_PATH", "caso_full.csv.gz"),
            ("COVID_COMMIT_MODE", "autocommit"),
        ]))?;
        assert_eq!(config.backend, Backend::DuckDb);
        assert_eq!(config.host, "db.local");
        assert_eq!(config.port, 6543);
        assert_eq!(config.commit_mode, CommitMode::Autocommit);
        assert!(!format!("{:?}", config).contains("secret"));
        Ok(())
    }

    #[test]
    fn missing_database_name() {
        let res = LoaderConfig::from_lookup(lookup_from(&[("COVID_INPUT_PATH", "x.csv")]));
        assert!(matches!(res, Err(crate::Error::Config(msg)) if msg.contains("COVID_DB_NAME")));
    }

    #[test]
    fn bad_port() {
        let res = LoaderConfig::from_lookup(lookup_from(&[
            ("COVID_DB_NAME", "grupo_z"),
            ("COVID_INPUT_PATH", "x.csv"),
            ("COVID_DB_PORT", "54x"),
        ]));
        assert!(matches!(res, Err(crate::Error::Config(_))));
    }
}
