pub mod cases_archive;
pub mod schema;
pub mod source;
pub mod transform;

#[cfg(test)]
pub(crate) fn sample_file() -> &'static std::path::Path {
    std::path::Path::new(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/testdata/caso_full_sample.csv"
    ))
}
