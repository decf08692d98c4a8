//! End to end tests run against a deployed catalogue service.
//! The service address is read from `CATALOGUE_URL`.

#[cfg(all(test, feature = "system_tests"))]
mod system_tests;


#[cfg(test)]
pub(crate) fn catalogue_url() -> String {
    std::env::var("CATALOGUE_URL").unwrap_or_else(|_| "http://127.0.0.1:8080".to_string())
}
