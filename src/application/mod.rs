// Application layer - Data acquisition, caching and fallback use cases
pub mod dashboard_cache;
pub mod dashboard_hook;
pub mod dashboard_service;
pub mod dashboard_source;
pub mod mock_generator;

#[cfg(test)]
pub(crate) mod test_support;
