// In-memory chart canvas - Keeps the live chart options per handle
use crate::application::collaborators::{ChartContainer, ChartHandle, ChartOptions, ChartRenderer};
use crate::domain::series::SeriesData;
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Serialize)]
pub struct RenderedChart {
    pub handle: ChartHandle,
    pub container: ChartContainer,
    pub options: ChartOptions,
    /// Bumped on every in-place update
    pub revision: u32,
}

#[derive(Default)]
pub struct ChartCanvas {
    next_handle: AtomicU64,
    created: AtomicU64,
    charts: Mutex<HashMap<ChartHandle, RenderedChart>>,
}

impl ChartCanvas {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn get(&self, handle: ChartHandle) -> Option<RenderedChart> {
        self.charts.lock().get(&handle).cloned()
    }

    /// Live chart drawn into the container of `chart`, if any
    pub fn find(&self, chart: &str) -> Option<RenderedChart> {
        self.charts
            .lock()
            .values()
            .find(|c| c.container.chart == chart)
            .cloned()
    }

    /// Number of charts currently alive
    #[cfg(test)]
    pub fn live(&self) -> usize {
        self.charts.lock().len()
    }

    /// Number of charts ever created
    #[cfg(test)]
    pub fn created(&self) -> u64 {
        self.created.load(Ordering::SeqCst)
    }
}

impl ChartRenderer for ChartCanvas {
    fn create(
        &self,
        container: &ChartContainer,
        options: ChartOptions,
    ) -> anyhow::Result<ChartHandle> {
        let handle = ChartHandle(self.next_handle.fetch_add(1, Ordering::SeqCst) + 1);
        self.created.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            "Creating {} chart {:?} in slot {}",
            options.chart_type,
            handle,
            container.slot
        );

        self.charts.lock().insert(
            handle,
            RenderedChart {
                handle,
                container: container.clone(),
                options,
                revision: 0,
            },
        );
        Ok(handle)
    }

    fn update(&self, handle: ChartHandle, data: &SeriesData) -> anyhow::Result<()> {
        let mut charts = self.charts.lock();
        let chart = charts
            .get_mut(&handle)
            .ok_or_else(|| anyhow::anyhow!("chart {:?} is not on the canvas", handle))?;
        chart.options.data = data.clone();
        chart.revision += 1;
        Ok(())
    }

    fn dispose(&self, handle: ChartHandle) {
        if self.charts.lock().remove(&handle).is_some() {
            tracing::debug!("Disposed chart {:?}", handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::collaborators::AxisOptions;
    use serde_json::json;

    fn data(values: serde_json::Value) -> SeriesData {
        serde_json::from_value(json!({"labels": ["a"], "datasets": [{"values": values}]})).unwrap()
    }

    fn options() -> ChartOptions {
        ChartOptions {
            title: "Sales".to_string(),
            data: data(json!([1.0])),
            chart_type: "bar",
            colors: vec!["light-blue".to_string()],
            axis_options: AxisOptions { x_is_series: false },
        }
    }

    fn container() -> ChartContainer {
        ChartContainer {
            slot: 0,
            chart: "c1".to_string(),
            columns: 6,
        }
    }

    #[test]
    fn test_update_in_place() {
        let canvas = ChartCanvas::new();
        let handle = canvas.create(&container(), options()).unwrap();
        canvas.update(handle, &data(json!([2.0]))).unwrap();

        let chart = canvas.get(handle).unwrap();
        assert_eq!(chart.revision, 1);
        assert_eq!(chart.options.data, data(json!([2.0])));
        assert_eq!(canvas.created(), 1);
        assert_eq!(canvas.find("c1").unwrap().handle, handle);
    }

    #[test]
    fn test_update_after_dispose_fails() {
        let canvas = ChartCanvas::new();
        let handle = canvas.create(&container(), options()).unwrap();
        canvas.dispose(handle);

        assert_eq!(canvas.live(), 0);
        assert!(canvas.update(handle, &data(json!([2.0]))).is_err());
    }

    #[test]
    fn test_serializes_as_renderer_arguments() {
        let canvas = ChartCanvas::new();
        let handle = canvas.create(&container(), options()).unwrap();
        let value = serde_json::to_value(canvas.get(handle).unwrap()).unwrap();

        assert_eq!(value["options"]["type"], json!("bar"));
        assert_eq!(value["options"]["axisOptions"], json!({"xIsSeries": false}));
        assert_eq!(value["container"]["columns"], json!(6));
    }
}
