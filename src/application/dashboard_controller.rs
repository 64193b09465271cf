// Dashboard controller - Resolves a route to a dashboard and drives its charts
use crate::application::chart_controller::{ChartController, ChartServices, ChartView, Lifetime};
use crate::domain::dashboard::{DASHBOARD_DOCTYPE, DashboardDefinition};
use crate::domain::error::DashboardError;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowOutcome {
    /// Same dashboard as before; nothing was reloaded
    Unchanged,
    Loaded { charts: usize },
}

struct ChartSlot {
    name: String,
    controller: Arc<Mutex<ChartController>>,
    lifetime: Lifetime,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub name: Option<String>,
    pub title: String,
    pub charts: Vec<ChartView>,
}

pub struct DashboardController {
    services: ChartServices,
    dashboard_name: Option<String>,
    title: String,
    slots: Vec<ChartSlot>,
}

impl DashboardController {
    pub fn new(services: ChartServices) -> Self {
        Self {
            services,
            dashboard_name: None,
            title: "Dashboard".to_string(),
            slots: Vec::new(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.dashboard_name.as_deref()
    }

    #[cfg(test)]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Activate the dashboard named by the last route segment. Each chart drives
    /// itself through `show()` on its own task.
    pub async fn show(&mut self, route: &str) -> Result<ShowOutcome, DashboardError> {
        let name = match dashboard_name_from_route(route) {
            Some(name) => name,
            None => {
                let err = DashboardError::DocumentLoad {
                    doctype: DASHBOARD_DOCTYPE.to_string(),
                    name: route.to_string(),
                    reason: "route does not name a dashboard".to_string(),
                };
                return Err(self.report(err));
            }
        };

        if self.dashboard_name.as_deref() == Some(name.as_str()) {
            return Ok(ShowOutcome::Unchanged);
        }

        tracing::info!("Showing dashboard {}", name);
        self.dashboard_name = Some(name.clone());
        self.title = name.clone();
        self.teardown();

        let definition = match self.load_definition(&name).await {
            Ok(definition) => definition,
            Err(e) => {
                self.dashboard_name = None;
                return Err(self.report(e));
            }
        };

        for (slot, chart) in definition.charts.iter().enumerate() {
            let lifetime = Lifetime::default();
            let controller = Arc::new(Mutex::new(ChartController::new(
                chart.clone(),
                slot,
                self.services.clone(),
                lifetime.clone(),
            )));

            let task = {
                let controller = controller.clone();
                let chart_name = chart.name.clone();
                tokio::spawn(async move {
                    if let Err(e) = controller.lock().await.show().await {
                        tracing::debug!("Chart {} did not render: {}", chart_name, e);
                    }
                })
            };

            self.slots.push(ChartSlot {
                name: chart.name.clone(),
                controller,
                lifetime,
                task: Some(task),
            });
        }

        Ok(ShowOutcome::Loaded {
            charts: self.slots.len(),
        })
    }

    async fn load_definition(&self, name: &str) -> Result<DashboardDefinition, DashboardError> {
        let document = self
            .services
            .store
            .get_document(DASHBOARD_DOCTYPE, name)
            .await
            .map_err(|e| DashboardError::DocumentLoad {
                doctype: DASHBOARD_DOCTYPE.to_string(),
                name: name.to_string(),
                reason: format!("{:#}", e),
            })?;

        let (definition, rejected) = DashboardDefinition::from_document(document)?;
        for err in rejected {
            self.report(err);
        }
        Ok(definition)
    }

    /// Wait for every chart's initial `show()` to finish
    pub async fn settle(&mut self) {
        for slot in &mut self.slots {
            if let Some(task) = slot.task.take() {
                if let Err(e) = task.await {
                    tracing::error!("Chart task for {} failed: {}", slot.name, e);
                }
            }
        }
    }

    pub fn chart(&self, name: &str) -> Option<Arc<Mutex<ChartController>>> {
        self.slots
            .iter()
            .find(|slot| slot.name == name)
            .map(|slot| slot.controller.clone())
    }

    #[cfg(test)]
    pub fn chart_names(&self) -> Vec<&str> {
        self.slots.iter().map(|slot| slot.name.as_str()).collect()
    }

    /// Detach every chart. In-flight results are dropped and chart objects are
    /// disposed once their controller is released.
    pub fn teardown(&mut self) {
        for slot in self.slots.drain(..) {
            slot.lifetime.end();
            let controller = slot.controller;
            tokio::spawn(async move {
                controller.lock().await.dispose();
            });
        }
    }

    pub async fn view(&self, now: NaiveDateTime) -> DashboardView {
        let mut charts = Vec::with_capacity(self.slots.len());
        for slot in &self.slots {
            charts.push(slot.controller.lock().await.view(now));
        }
        DashboardView {
            name: self.dashboard_name.clone(),
            title: self.title.clone(),
            charts,
        }
    }

    fn report(&self, error: DashboardError) -> DashboardError {
        tracing::warn!("Dashboard: {}", error);
        self.services.notifier.notify(&error);
        error
    }
}

/// Last non-empty route segment, percent-decoded
pub fn dashboard_name_from_route(route: &str) -> Option<String> {
    let segment = route
        .split(['/', '#'])
        .filter(|s| !s.is_empty())
        .last()?;
    let name = urlencoding::decode(segment)
        .map(|name| name.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    Some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::chart_controller::{ChartState, DEFAULT_CHART_COLOR};
    use crate::application::chart_data_client::ChartDataClient;
    use crate::application::source_registry::SourceRegistry;
    use crate::application::testing::{
        FakeRpc, FakeStore, SALES_METHOD, SETTINGS_METHOD, chart_doc, sales_data, sql_settings,
    };
    use crate::domain::source::SourceSettings;
    use crate::infrastructure::alert_log::AlertLog;
    use crate::infrastructure::chart_canvas::ChartCanvas;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    struct Harness {
        rpc: Arc<FakeRpc>,
        store: Arc<FakeStore>,
        canvas: Arc<ChartCanvas>,
        alerts: Arc<AlertLog>,
        registry: Arc<SourceRegistry>,
        dashboard: DashboardController,
    }

    fn harness(charts: Vec<serde_json::Value>) -> Harness {
        let rpc = FakeRpc::new();
        rpc.reply(SETTINGS_METHOD, sql_settings());
        rpc.reply(SALES_METHOD, sales_data());
        let store = FakeStore::new();
        store.insert(DASHBOARD_DOCTYPE, json!({"name": "Sales", "charts": charts}));
        let canvas = Arc::new(ChartCanvas::new());
        let alerts = Arc::new(AlertLog::new());

        let registry = Arc::new(SourceRegistry::new(rpc.clone(), SETTINGS_METHOD));
        let dashboard = DashboardController::new(ChartServices {
            registry: registry.clone(),
            data_client: ChartDataClient::new(rpc.clone()),
            store: store.clone(),
            renderer: canvas.clone(),
            notifier: alerts.clone(),
            default_color: DEFAULT_CHART_COLOR.to_string(),
        });

        Harness {
            rpc,
            store,
            canvas,
            alerts,
            registry,
            dashboard,
        }
    }

    async fn state_of(dashboard: &DashboardController, chart: &str) -> ChartState {
        dashboard.chart(chart).unwrap().lock().await.state()
    }

    #[test]
    fn test_dashboard_name_from_route() {
        assert_eq!(dashboard_name_from_route("dashboard/Sales").as_deref(), Some("Sales"));
        assert_eq!(dashboard_name_from_route("#dashboard/Sales/").as_deref(), Some("Sales"));
        assert_eq!(
            dashboard_name_from_route("dashboard/Sales%20Overview").as_deref(),
            Some("Sales Overview")
        );
        assert_eq!(dashboard_name_from_route("/"), None);
    }

    #[tokio::test]
    async fn test_show_renders_every_chart() {
        let mut h = harness(vec![chart_doc("c1", "{}")]);

        let outcome = h.dashboard.show("dashboard/Sales").await.unwrap();
        h.dashboard.settle().await;

        assert_eq!(outcome, ShowOutcome::Loaded { charts: 1 });
        assert_eq!(h.dashboard.title(), "Sales");
        assert_eq!(state_of(&h.dashboard, "c1").await, ChartState::Rendered);
        assert_eq!(h.rpc.calls_to(SETTINGS_METHOD), vec![json!({"source_name": "sql"})]);
        assert_eq!(
            h.rpc.calls_to(SALES_METHOD),
            vec![json!({"chart_name": "c1", "filters": {}, "refresh": false})]
        );

        let rendered = h.canvas.find("c1").unwrap();
        assert_eq!(rendered.options.chart_type, "bar");
        assert_eq!(rendered.container.columns, 6);
    }

    #[tokio::test]
    async fn test_reentering_same_route_is_a_no_op() {
        let mut h = harness(vec![chart_doc("c1", "{}")]);
        h.dashboard.show("dashboard/Sales").await.unwrap();
        h.dashboard.settle().await;

        let outcome = h.dashboard.show("dashboard/Sales").await.unwrap();
        h.dashboard.settle().await;

        assert_eq!(outcome, ShowOutcome::Unchanged);
        assert_eq!(h.store.reads().len(), 1);
        assert_eq!(h.canvas.created(), 1);
        assert_eq!(h.rpc.calls_to(SALES_METHOD).len(), 1);
    }

    #[tokio::test]
    async fn test_charts_sharing_a_source_load_settings_once() {
        let mut h = harness(vec![chart_doc("c1", "{}"), chart_doc("c2", "{}")]);

        h.dashboard.show("dashboard/Sales").await.unwrap();
        h.dashboard.settle().await;

        assert_eq!(h.rpc.calls_to(SETTINGS_METHOD).len(), 1);
        assert_eq!(h.rpc.calls_to(SALES_METHOD).len(), 2);
        assert_eq!(h.canvas.live(), 2);
        assert_eq!(h.dashboard.chart_names(), vec!["c1", "c2"]);
    }

    #[tokio::test]
    async fn test_missing_dashboard_renders_nothing() {
        let mut h = harness(vec![chart_doc("c1", "{}")]);

        let err = h.dashboard.show("dashboard/Missing").await.unwrap_err();
        h.dashboard.settle().await;

        assert!(matches!(err, DashboardError::DocumentLoad { ref name, .. } if name == "Missing"));
        assert!(h.dashboard.chart_names().is_empty());
        assert!(h.rpc.calls().is_empty());
        assert_eq!(h.alerts.recent().len(), 1);

        // the failed name is not remembered, so showing it again retries
        assert!(h.dashboard.show("dashboard/Missing").await.is_err());
        assert_eq!(h.store.reads().len(), 2);
    }

    #[tokio::test]
    async fn test_bad_chart_does_not_block_siblings() {
        let mut bad = chart_doc("c2", "{}");
        bad["type"] = json!("Radar");
        let mut other_source = chart_doc("c3", "{}");
        other_source["source"] = json!("broken");
        let mut h = harness(vec![chart_doc("c1", "{}"), bad, other_source]);
        h.registry
            .register("sql", SourceSettings::from_value("sql", sql_settings()).unwrap());
        h.rpc.fail(SETTINGS_METHOD, "no such source");

        h.dashboard.show("dashboard/Sales").await.unwrap();
        h.dashboard.settle().await;

        assert_eq!(h.dashboard.chart_names(), vec!["c1", "c3"]);
        assert_eq!(state_of(&h.dashboard, "c1").await, ChartState::Rendered);
        assert_eq!(state_of(&h.dashboard, "c3").await, ChartState::Uninitialized);
        assert_eq!(h.rpc.calls_to(SETTINGS_METHOD), vec![json!({"source_name": "broken"})]);
        let kinds: Vec<_> = h.alerts.recent().iter().map(|a| a.kind).collect();
        assert!(kinds.contains(&"configuration_error"));
        assert!(kinds.contains(&"settings_load_failure"));
    }

    #[tokio::test]
    async fn test_switching_dashboards_discards_outstanding_fetch() {
        let mut h = harness(vec![chart_doc("c1", "{}")]);
        h.store.insert(
            DASHBOARD_DOCTYPE,
            json!({"name": "Ops", "charts": [chart_doc("o1", "{}")]}),
        );
        let gate = h.rpc.hold(SALES_METHOD);

        h.dashboard.show("dashboard/Sales").await.unwrap();
        while h.rpc.calls_to(SALES_METHOD).is_empty() {
            tokio::task::yield_now().await;
        }
        let old_chart = h.dashboard.chart("c1").unwrap();

        h.dashboard.show("dashboard/Ops").await.unwrap();
        gate.add_permits(10);
        h.dashboard.settle().await;

        // disposal waits for the old chart's in-flight show to release it
        while old_chart.lock().await.state() != ChartState::Disposed {
            tokio::task::yield_now().await;
        }
        assert!(h.dashboard.chart("c1").is_none());
        assert!(h.canvas.find("c1").is_none());
        assert!(h.canvas.find("o1").is_some());
        assert_eq!(h.canvas.created(), 1);
    }

    #[tokio::test]
    async fn test_view_lists_charts() {
        let mut h = harness(vec![chart_doc("c1", "{}")]);
        h.dashboard.show("dashboard/Sales").await.unwrap();
        h.dashboard.settle().await;

        let now =
            NaiveDateTime::parse_from_str("2019-08-20 12:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let view = h.dashboard.view(now).await;

        assert_eq!(view.name.as_deref(), Some("Sales"));
        assert_eq!(view.charts.len(), 1);
        assert_eq!(view.charts[0].state, ChartState::Rendered);
    }
}
