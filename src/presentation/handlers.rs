// HTTP request handlers
use crate::application::chart_controller::{ChartController, ChartView, FilterSaveOutcome};
use crate::application::dashboard_controller::{DashboardView, ShowOutcome};
use crate::application::filter_dialog::FilterDialog;
use crate::infrastructure::alert_log::Alert;
use crate::infrastructure::chart_canvas::RenderedChart;
use crate::infrastructure::http_response::ApiError;
use crate::presentation::app_state::AppState;
use axum::{
    Json,
    extract::{Path, State},
};
use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Serialize)]
pub struct DashboardPage {
    pub dashboard: DashboardView,
    pub alerts: Vec<Alert>,
}

#[derive(Debug, Serialize)]
pub struct ChartPage {
    pub chart: ChartView,
    pub rendered: Option<RenderedChart>,
}

#[derive(Debug, Serialize)]
pub struct FilterSaveResponse {
    pub saved: bool,
    pub chart: ChartPage,
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Activate a dashboard and return it once every chart has finished loading
pub async fn show_dashboard(
    Path(name): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardPage>, ApiError> {
    let mut dashboard = state.dashboard.lock().await;
    let outcome = dashboard
        .show(&format!("dashboard/{}", urlencoding::encode(&name)))
        .await?;
    if let ShowOutcome::Loaded { charts } = outcome {
        tracing::info!("Dashboard {} loaded with {} charts", name, charts);
    }
    dashboard.settle().await;

    Ok(Json(DashboardPage {
        dashboard: dashboard.view(now()).await,
        alerts: state.alerts.recent(),
    }))
}

pub async fn get_chart(
    Path((dashboard, chart)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartPage>, ApiError> {
    let controller = find_chart(&state, &dashboard, &chart).await?;
    let controller = controller.lock().await;
    Ok(Json(chart_page(&state, &controller)))
}

pub async fn force_refresh(
    Path((dashboard, chart)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartPage>, ApiError> {
    let controller = find_chart(&state, &dashboard, &chart).await?;
    let mut controller = controller.lock().await;
    controller.force_refresh().await?;
    Ok(Json(chart_page(&state, &controller)))
}

pub async fn open_filters(
    Path((dashboard, chart)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilterDialog>, ApiError> {
    let controller = find_chart(&state, &dashboard, &chart).await?;
    let mut controller = controller.lock().await;
    let dialog = controller.open_filter_editor()?.clone();
    Ok(Json(dialog))
}

/// Apply field edits to the open filter dialog
pub async fn edit_filters(
    Path((dashboard, chart)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
    Json(values): Json<Map<String, Value>>,
) -> Result<Json<FilterDialog>, ApiError> {
    let controller = find_chart(&state, &dashboard, &chart).await?;
    let mut controller = controller.lock().await;
    controller.set_filter_values(values)?;

    let dialog = controller
        .filter_editor()
        .cloned()
        .ok_or_else(|| ApiError::NotFound(format!("filter editor for chart {}", chart)))?;
    Ok(Json(dialog))
}

pub async fn save_filters(
    Path((dashboard, chart)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<FilterSaveResponse>, ApiError> {
    let controller = find_chart(&state, &dashboard, &chart).await?;
    let mut controller = controller.lock().await;
    let outcome = controller.save_filters().await?;

    Ok(Json(FilterSaveResponse {
        saved: outcome == FilterSaveOutcome::Saved,
        chart: chart_page(&state, &controller),
    }))
}

pub async fn cancel_filters(
    Path((dashboard, chart)): Path<(String, String)>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ChartPage>, ApiError> {
    let controller = find_chart(&state, &dashboard, &chart).await?;
    let mut controller = controller.lock().await;
    controller.cancel_filter_editor();
    Ok(Json(chart_page(&state, &controller)))
}

/// Chart of the active dashboard; other dashboards are not loaded
async fn find_chart(
    state: &AppState,
    dashboard: &str,
    chart: &str,
) -> Result<Arc<Mutex<ChartController>>, ApiError> {
    let controller = state.dashboard.lock().await;
    if controller.name() != Some(dashboard) {
        return Err(ApiError::NotFound(format!("dashboard {}", dashboard)));
    }
    controller
        .chart(chart)
        .ok_or_else(|| ApiError::NotFound(format!("chart {}", chart)))
}

fn chart_page(state: &AppState, controller: &ChartController) -> ChartPage {
    ChartPage {
        chart: controller.view(now()),
        rendered: state.canvas.find(controller.name()),
    }
}
