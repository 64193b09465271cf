// Chart data client - Remote fetch of a chart's series
use crate::application::collaborators::RemoteCall;
use crate::domain::error::DashboardError;
use crate::domain::filters::FilterSet;
use crate::domain::series::SeriesData;
use crate::domain::source::SourceSettings;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct ChartDataRequest<'a> {
    chart_name: &'a str,
    filters: &'a FilterSet,
    refresh: bool,
}

/// Thin wrapper over the source's data method. Caching belongs to the endpoint;
/// `bypass_cache` is forwarded as `refresh`.
#[derive(Clone)]
pub struct ChartDataClient {
    rpc: Arc<dyn RemoteCall>,
}

impl ChartDataClient {
    pub fn new(rpc: Arc<dyn RemoteCall>) -> Self {
        Self { rpc }
    }

    pub async fn fetch(
        &self,
        settings: &SourceSettings,
        chart_name: &str,
        filters: &FilterSet,
        bypass_cache: bool,
    ) -> Result<SeriesData, DashboardError> {
        let fetch_error = |reason: String| DashboardError::DataFetch {
            chart: chart_name.to_string(),
            reason,
        };

        let args = serde_json::to_value(ChartDataRequest {
            chart_name,
            filters,
            refresh: bypass_cache,
        })
        .map_err(|e| fetch_error(e.to_string()))?;

        tracing::debug!(
            "Fetching data for chart {} via {} (refresh={})",
            chart_name,
            settings.method_path,
            bypass_cache
        );

        let message = self
            .rpc
            .call(&settings.method_path, args)
            .await
            .map_err(|e| fetch_error(format!("{:#}", e)))?;

        let data: SeriesData = serde_json::from_value(message)
            .map_err(|e| fetch_error(format!("unexpected response: {}", e)))?;

        tracing::debug!(
            "Got {} points in {} datasets for chart {}",
            data.point_count(),
            data.datasets.len(),
            chart_name
        );
        Ok(data)
    }
}
