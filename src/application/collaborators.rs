// Ports to the external collaborators: document store, RPC, renderer, notifier
use crate::domain::dashboard::ChartDefinition;
use crate::domain::error::DashboardError;
use crate::domain::series::SeriesData;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Fetch a whole document as JSON
    async fn get_document(&self, doctype: &str, name: &str) -> anyhow::Result<Value>;

    /// Update a single field of a document
    async fn set_value(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
        value: Value,
    ) -> anyhow::Result<()>;
}

#[async_trait]
pub trait RemoteCall: Send + Sync {
    /// Invoke a whitelisted server method and return its `message`
    async fn call(&self, method_path: &str, args: Value) -> anyhow::Result<Value>;
}

/// Opaque reference to a live chart object held by the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ChartHandle(pub u64);

/// Layout slot a chart is drawn into
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartContainer {
    pub slot: usize,
    pub chart: String,
    pub columns: u8,
}

impl ChartContainer {
    pub fn new(slot: usize, chart: &ChartDefinition) -> Self {
        Self {
            slot,
            chart: chart.name.clone(),
            columns: chart.width.columns(),
        }
    }

    pub fn css_class(&self) -> String {
        format!("col-sm-{} chart-column-container", self.columns)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AxisOptions {
    pub x_is_series: bool,
}

/// Arguments used to create a visualization
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartOptions {
    pub title: String,
    pub data: SeriesData,
    #[serde(rename = "type")]
    pub chart_type: &'static str,
    pub colors: Vec<String>,
    pub axis_options: AxisOptions,
}

pub trait ChartRenderer: Send + Sync {
    fn create(&self, container: &ChartContainer, options: ChartOptions)
    -> anyhow::Result<ChartHandle>;

    /// Replace the data of an existing chart in place
    fn update(&self, handle: ChartHandle, data: &SeriesData) -> anyhow::Result<()>;

    fn dispose(&self, handle: ChartHandle);
}

/// Generic user-facing error reporting
pub trait Notifier: Send + Sync {
    fn notify(&self, error: &DashboardError);
}
