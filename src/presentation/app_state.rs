// Application state for HTTP handlers
use crate::application::dashboard_controller::DashboardController;
use crate::infrastructure::alert_log::AlertLog;
use crate::infrastructure::chart_canvas::ChartCanvas;
use std::sync::Arc;
use tokio::sync::Mutex;

pub struct AppState {
    pub dashboard: Mutex<DashboardController>,
    pub canvas: Arc<ChartCanvas>,
    pub alerts: Arc<AlertLog>,
}
