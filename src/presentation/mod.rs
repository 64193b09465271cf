// Presentation layer - HTTP surface over the dashboard controllers
pub mod app_state;
pub mod handlers;
