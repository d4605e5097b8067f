pub mod lib_duckdb;
pub mod lib_postgres;
