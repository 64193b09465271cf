// Domain layer - Dashboard, chart, source and filter models
pub mod dashboard;
pub mod error;
pub mod filters;
pub mod last_synced;
pub mod series;
pub mod source;
