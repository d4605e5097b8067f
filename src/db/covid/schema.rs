/// DDL for the destination tables.  Runs on DuckDB and Postgres, and leaves
/// existing tables alone.
pub const CREATE_TABLES: &str = r"
CREATE TABLE IF NOT EXISTS casos_covid (
    idcasos_covid INTEGER PRIMARY KEY,
    date DATE,
    epidemiological_week INTEGER,
    casos_covidcol DATE,
    is_last INTEGER,
    is_repeated INTEGER,
    last_available_confirmed INTEGER,
    last_available_confirmed_per_100k_inhabitants DOUBLE PRECISION,
    last_available_death_rate VARCHAR,
    last_available_deaths VARCHAR,
    new_confirmed INTEGER,
    new_deaths INTEGER
);
CREATE TABLE IF NOT EXISTS localizacao (
    city VARCHAR,
    city_ibge_code INTEGER,
    estimated_population_2019 INTEGER,
    order_for_place INTEGER,
    place_type VARCHAR,
    state VARCHAR,
    casos_covid_idcasos_covid INTEGER REFERENCES casos_covid (idcasos_covid)
);
";
