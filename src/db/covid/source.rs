use std::fs::File;
use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use jiff::civil::Date;
use serde::{de, Deserialize, Deserializer};

use crate::error::Error;

/// One row of the brasil.io `caso_full` file.  Columns not listed here are
/// ignored.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceRecord {
    /// Empty for state level rows.
    pub city: Option<String>,
    #[serde(deserialize_with = "lenient_int")]
    pub city_ibge_code: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub estimated_population_2019: Option<i64>,
    #[serde(deserialize_with = "lenient_int")]
    pub order_for_place: Option<i64>,
    pub place_type: String,
    pub state: String,
    pub date: Date,
    pub epidemiological_week: i64,
    pub last_available_date: Date,
    #[serde(deserialize_with = "flag")]
    pub is_last: bool,
    #[serde(deserialize_with = "flag")]
    pub is_repeated: bool,
    pub last_available_confirmed: i64,
    pub last_available_confirmed_per_100k_inhabitants: Option<f64>,
    pub last_available_death_rate: Option<f64>,
    pub last_available_deaths: i64,
    pub new_confirmed: i64,
    pub new_deaths: i64,
}

/// Accept `True`/`False` as written by pandas, as well as `true`/`false` and
/// `1`/`0`.
fn flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    match s.as_str() {
        "True" | "true" | "1" => Ok(true),
        "False" | "false" | "0" => Ok(false),
        _ => Err(de::Error::custom(format!("Failed to parse {s} as a flag"))),
    }
}

/// Integer columns sometimes come out of a float column, e.g. `4106902.0`.
fn lenient_int<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s: Option<String> = Option::deserialize(deserializer)?;
    let s = match s {
        Some(s) if !s.trim().is_empty() => s,
        _ => return Ok(None),
    };
    let s = s.trim();
    if let Ok(v) = s.parse::<i64>() {
        return Ok(Some(v));
    }
    // -2^63 is exact as a float, 2^63 is one past i64::MAX
    match s.parse::<f64>() {
        Ok(v) if v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 => {
            Ok(Some(v as i64))
        }
        _ => Err(de::Error::custom(format!("Failed to parse {s} as an integer"))),
    }
}

/// A CSV reader for the file, decompressing it on the fly if the name ends in
/// `.gz`.
pub fn open_reader(path: &Path) -> Result<csv::Reader<Box<dyn Read>>, Error> {
    let file = File::open(path)?;
    let rdr: Box<dyn Read> = match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => Box::new(GzDecoder::new(file)),
        _ => Box::new(file),
    };
    Ok(csv::ReaderBuilder::new().has_headers(true).from_reader(rdr))
}

/// Read all the records of a file, in file order.
pub fn read_file(path: &Path) -> Result<Vec<SourceRecord>, Error> {
    let mut rdr = open_reader(path)?;
    let mut records = Vec::new();
    for result in rdr.deserialize() {
        let record: SourceRecord = result?;
        records.push(record);
    }
    Ok(records)
}
