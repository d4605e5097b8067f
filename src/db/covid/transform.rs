use jiff::civil::Date;

use crate::db::loader::{Row, TableRow};

use super::source::SourceRecord;

/// The cities kept in the destination tables.
pub const CITIES: [&str; 5] = ["Curitiba", "Rio de Janeiro", "Fortaleza", "Maceió", "Recife"];

/// A row of `casos_covid`.
#[derive(Debug, Clone, PartialEq)]
pub struct CaseRecord {
    /// Position of the source record in the file, 0-based.
    pub id: i64,
    pub date: Date,
    pub epidemiological_week: i64,
    /// The source `last_available_date`.
    pub casos_covidcol: Date,
    pub is_last: i64,
    pub is_repeated: i64,
    pub last_available_confirmed: i64,
    pub last_available_confirmed_per_100k_inhabitants: Option<f64>,
    pub last_available_death_rate: Option<String>,
    pub last_available_deaths: String,
    pub new_confirmed: i64,
    pub new_deaths: i64,
}

impl TableRow for CaseRecord {
    const TABLE: &'static str = "casos_covid";
    const COLUMNS: &'static [&'static str] = &[
        "idcasos_covid",
        "date",
        "epidemiological_week",
        "casos_covidcol",
        "is_last",
        "is_repeated",
        "last_available_confirmed",
        "last_available_confirmed_per_100k_inhabitants",
        "last_available_death_rate",
        "last_available_deaths",
        "new_confirmed",
        "new_deaths",
    ];

    fn values(&self) -> Row {
        vec![
            self.id.into(),
            self.date.into(),
            self.epidemiological_week.into(),
            self.casos_covidcol.into(),
            self.is_last.into(),
            self.is_repeated.into(),
            self.last_available_confirmed.into(),
            self.last_available_confirmed_per_100k_inhabitants.into(),
            self.last_available_death_rate.clone().into(),
            self.last_available_deaths.clone().into(),
            self.new_confirmed.into(),
            self.new_deaths.into(),
        ]
    }
}

/// A row of `localizacao`.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub city: String,
    pub city_ibge_code: Option<i64>,
    pub estimated_population_2019: Option<i64>,
    pub order_for_place: Option<i64>,
    pub place_type: String,
    pub state: String,
    /// Same value as [`CaseRecord::id`].
    pub casos_covid_idcasos_covid: i64,
}

impl TableRow for LocationRecord {
    const TABLE: &'static str = "localizacao";
    const COLUMNS: &'static [&'static str] = &[
        "city",
        "city_ibge_code",
        "estimated_population_2019",
        "order_for_place",
        "place_type",
        "state",
        "casos_covid_idcasos_covid",
    ];

    fn values(&self) -> Row {
        vec![
            self.city.as_str().into(),
            self.city_ibge_code.into(),
            self.estimated_population_2019.into(),
            self.order_for_place.into(),
            self.place_type.as_str().into(),
            self.state.as_str().into(),
            self.casos_covid_idcasos_covid.into(),
        ]
    }
}

/// Both destination tables, in source order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Tables {
    pub cases: Vec<CaseRecord>,
    pub locations: Vec<LocationRecord>,
}

impl Tables {
    pub fn push(&mut self, case: CaseRecord, location: LocationRecord) {
        self.cases.push(case);
        self.locations.push(location);
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Split the record at position `index` of the source file into its two
/// destination rows.  Return `None` if the city is not in `allow_list`.
pub fn split(
    index: usize,
    record: SourceRecord,
    allow_list: &[&str],
) -> Option<(CaseRecord, LocationRecord)> {
    let city = record.city?;
    if !allow_list.contains(&city.as_str()) {
        return None;
    }
    let id = index as i64;

    let case = CaseRecord {
        id,
        date: record.date,
        epidemiological_week: record.epidemiological_week,
        casos_covidcol: record.last_available_date,
        is_last: record.is_last as i64,
        is_repeated: record.is_repeated as i64,
        last_available_confirmed: record.last_available_confirmed,
        last_available_confirmed_per_100k_inhabitants: record
            .last_available_confirmed_per_100k_inhabitants,
        last_available_death_rate: record
            .last_available_death_rate
            .map(|v| format!("{:?}", v)),
        last_available_deaths: record.last_available_deaths.to_string(),
        new_confirmed: record.new_confirmed,
        new_deaths: record.new_deaths,
    };
    let location = LocationRecord {
        city,
        city_ibge_code: record.city_ibge_code,
        estimated_population_2019: record.estimated_population_2019,
        order_for_place: record.order_for_place,
        place_type: record.place_type,
        state: record.state,
        casos_covid_idcasos_covid: id,
    };
    Some((case, location))
}

/// Keep the records of the cities in `allow_list` and split each one into
/// a `casos_covid` and a `localizacao` row.  Ids are the positions in
/// `records`, so they have gaps.
pub fn transform<I>(records: I, allow_list: &[&str]) -> Tables
where
    I: IntoIterator<Item = SourceRecord>,
{
    let mut tables = Tables::default();
    for (index, record) in records.into_iter().enumerate() {
        if let Some((case, location)) = split(index, record, allow_list) {
            tables.push(case, location);
        }
    }
    tables
}
