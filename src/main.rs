// Main entry point - Dependency injection and server setup
mod application;
mod domain;
mod infrastructure;
mod presentation;

use anyhow::Context;
use axum::{Router, routing::get};
use std::{net::SocketAddr, sync::Arc};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::chart_controller::ChartServices;
use crate::application::chart_data_client::ChartDataClient;
use crate::application::dashboard_controller::DashboardController;
use crate::application::source_registry::SourceRegistry;
use crate::infrastructure::alert_log::AlertLog;
use crate::infrastructure::chart_canvas::ChartCanvas;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::frappe_client::FrappeClient;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    cancel_filters, edit_filters, force_refresh, get_chart, health_check, open_filters,
    save_filters, show_dashboard,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Site client serves both documents and remote calls (infrastructure layer)
    let client = Arc::new(FrappeClient::new(config.site.url.clone(), config.site.token()));

    let registry = Arc::new(SourceRegistry::new(
        client.clone(),
        config.site.settings_method.clone(),
    ));
    for source in &config.sources {
        let settings = source.settings();
        settings.validate(&source.name)?;
        tracing::info!("Registered static source {}", source.name);
        registry.register(source.name.clone(), settings);
    }

    let canvas = Arc::new(ChartCanvas::new());
    let alerts = Arc::new(AlertLog::new());

    // Create controllers (application layer)
    let services = ChartServices {
        registry,
        data_client: ChartDataClient::new(client.clone()),
        store: client,
        renderer: canvas.clone(),
        notifier: alerts.clone(),
        default_color: config.charts.default_color.clone(),
    };

    let state = Arc::new(AppState {
        dashboard: Mutex::new(DashboardController::new(services)),
        canvas,
        alerts,
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/dashboards/:name", get(show_dashboard))
        .route("/dashboards/:name/charts/:chart", get(get_chart))
        .route(
            "/dashboards/:name/charts/:chart/refresh",
            axum::routing::post(force_refresh),
        )
        .route(
            "/dashboards/:name/charts/:chart/filters",
            axum::routing::post(open_filters)
                .patch(edit_filters)
                .put(save_filters)
                .delete(cancel_filters),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind_addr
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind_addr))?;
    tracing::info!("Starting dashboard-charts service on {} for {}", addr, config.site.url);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
