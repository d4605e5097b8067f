use std::path::{Path, PathBuf};

use log::{error, info};

use crate::config::{Backend, LoaderConfig};
use crate::db::loader::{Database, Loader, Session};
use crate::error::Error;
use crate::utils::{lib_duckdb::DuckDb, lib_postgres::Postgres};

use super::schema::CREATE_TABLES;
use super::source::{open_reader, SourceRecord};
use super::transform::{split, CaseRecord, LocationRecord, Tables, CITIES};

/// Outcome of loading one table.
#[derive(Debug)]
pub struct LoadReport {
    pub table: &'static str,
    /// Rows the transform produced for the table.
    pub rows: usize,
    /// Rows inserted, or why the insert failed.
    pub result: Result<usize, Error>,
}

impl LoadReport {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// The brasil.io case file for the cities of interest.
pub struct CovidCasesArchive {
    pub input_path: PathBuf,
    pub allow_list: &'static [&'static str],
}

impl CovidCasesArchive {
    pub fn new<P: AsRef<Path>>(input_path: P) -> CovidCasesArchive {
        CovidCasesArchive {
            input_path: input_path.as_ref().to_path_buf(),
            allow_list: &CITIES,
        }
    }

    /// Read the file and keep only the rows of the cities of interest.
    /// Records are filtered as they are read, the ids are their positions in
    /// the file.
    pub fn read_tables(&self) -> Result<Tables, Error> {
        let mut rdr = open_reader(&self.input_path)?;
        let mut tables = Tables::default();
        let mut count = 0;
        for (index, result) in rdr.deserialize().enumerate() {
            let record: SourceRecord = result?;
            if let Some((case, location)) = split(index, record, self.allow_list) {
                tables.push(case, location);
            }
            count += 1;
        }
        info!(
            "Kept {} of {} rows from {}",
            tables.len(),
            count,
            self.input_path.display()
        );
        Ok(tables)
    }

    /// Create the destination tables if they don't exist yet.
    pub fn init_schema<D: Database>(&self, database: &D) -> Result<(), Error> {
        let mut session = database.connect()?;
        let res = session.execute_batch(CREATE_TABLES);
        let closed = session.close();
        res?;
        closed?;
        info!("Destination tables are in place in {}", database.target());
        Ok(())
    }

    /// Load `casos_covid`, then `localizacao`.  Both tables are attempted
    /// even if the first one fails.
    pub fn load_tables<D: Database>(&self, loader: &Loader<D>, tables: &Tables) -> Vec<LoadReport> {
        vec![
            LoadReport {
                table: "casos_covid",
                rows: tables.cases.len(),
                result: loader.load_records::<CaseRecord>(&tables.cases),
            },
            LoadReport {
                table: "localizacao",
                rows: tables.locations.len(),
                result: loader.load_records::<LocationRecord>(&tables.locations),
            },
        ]
    }

    /// Read the file and load both tables.  An error is returned only if
    /// the file can't be read or the schema can't be created; load failures
    /// are in the reports.
    pub fn update_db<D: Database>(
        &self,
        loader: &Loader<D>,
        init_schema: bool,
    ) -> Result<Vec<LoadReport>, Error> {
        let tables = self.read_tables()?;
        if init_schema {
            self.init_schema(&loader.database)?;
        }
        let reports = self.load_tables(loader, &tables);
        for report in reports.iter() {
            if let Err(e) = &report.result {
                error!("Failed to load {}: {}", report.table, e);
            }
        }
        Ok(reports)
    }
}

/// Run a full load with the given settings.
pub fn run(config: &LoaderConfig, init_schema: bool) -> Result<Vec<LoadReport>, Error> {
    let archive = CovidCasesArchive::new(&config.input_path);
    match config.backend {
        Backend::DuckDb => {
            let loader = Loader::new(DuckDb::new(&config.database), config.commit_mode);
            archive.update_db(&loader, init_schema)
        }
        Backend::Postgres => {
            let loader = Loader::new(Postgres::from(config), config.commit_mode);
            archive.update_db(&loader, init_schema)
        }
    }
}
