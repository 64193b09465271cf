// Infrastructure layer - External dependencies and adapters
pub mod alert_log;
pub mod chart_canvas;
pub mod config;
pub mod frappe_client;
pub mod http_response;
