// Domain layer - Dashboard data shapes and error taxonomy
pub mod dashboard;
pub mod date_range;
pub mod error;
