use std::{env, error::Error, path::Path, process::ExitCode};

use clap::Parser;
use covid_loader::{
    config::{CommitMode, LoaderConfig},
    db::covid::cases_archive::{run, LoadReport},
};
use log::{error, info};
use tabled::{builder::Builder, settings::Style};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Environment name, e.g., test, prod
    #[arg(short, long, default_value = "prod")]
    env: String,

    /// Path to the caso_full CSV file (.csv or .csv.gz), overrides COVID_INPUT_PATH
    #[arg(short, long)]
    input: Option<String>,

    /// Commit every row as it is inserted instead of one transaction per table
    #[arg(long, default_value_t = false)]
    autocommit: bool,

    /// Create the destination tables if they don't exist
    #[arg(long, default_value_t = false)]
    init_schema: bool,
}

/// Make an ASCII table from the load reports
fn ascii_table(reports: &[LoadReport]) -> tabled::Table {
    let mut builder = Builder::new();
    builder.push_record(vec!["Table", "Rows", "Inserted", "Status"]);
    for report in reports {
        let (inserted, status) = match &report.result {
            Ok(n) => (n.to_string(), "OK".to_string()),
            Err(e) => ("0".to_string(), e.to_string()),
        };
        builder.push_record(vec![
            report.table.to_string(),
            report.rows.to_string(),
            inserted,
            status,
        ]);
    }
    let mut table = builder.build();
    table.with(Style::sharp());
    table
}

fn main() -> Result<ExitCode, Box<dyn Error>> {
    let args = Args::parse();

    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .init();

    let env_file = format!(".env/{}.env", args.env);
    if Path::new(&env_file).exists() {
        dotenvy::from_path(Path::new(&env_file))?;
    } else {
        info!("No {} file, using the process environment", env_file);
    }

    let mut config = LoaderConfig::from_lookup(|key| match (key, &args.input) {
        ("COVID_INPUT_PATH", Some(path)) => Some(path.clone()),
        _ => env::var(key).ok(),
    })?;
    if args.autocommit {
        config.commit_mode = CommitMode::Autocommit;
    }
    info!("{:?}", config);

    let reports = run(&config, args.init_schema)?;
    println!("{}", ascii_table(&reports));

    match outcome(&reports) {
        Ok(message) => {
            info!("{}", message);
            Ok(ExitCode::SUCCESS)
        }
        Err(message) => {
            error!("{}", message);
            Ok(ExitCode::FAILURE)
        }
    }
}

/// The closing message.  An `Err` as soon as one table failed.
fn outcome(reports: &[LoadReport]) -> Result<String, String> {
    let failed = reports
        .iter()
        .filter(|r| !r.is_ok())
        .map(|r| r.table)
        .collect::<Vec<_>>();
    if failed.is_empty() {
        let inserted: usize = reports.iter().filter_map(|r| r.result.as_ref().ok()).sum();
        Ok(format!(
            "Tables loaded successfully, {} rows inserted",
            inserted
        ))
    } else {
        Err(format!(
            "{} of {} tables failed to load: {}",
            failed.len(),
            reports.len(),
            failed.join(", ")
        ))
    }
}
