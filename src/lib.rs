// Citation dashboard data layer - fetch, cache, and fall back to generated data
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
