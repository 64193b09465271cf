// Chart controller - One chart's lifecycle: settings, fetch, render, filters
use crate::application::chart_data_client::ChartDataClient;
use crate::application::collaborators::{
    AxisOptions, ChartContainer, ChartHandle, ChartOptions, ChartRenderer, DocumentStore,
    Notifier,
};
use crate::application::filter_dialog::FilterDialog;
use crate::application::source_registry::SourceRegistry;
use crate::domain::dashboard::{
    CHART_DOCTYPE, ChartDefinition, ChartType, ChartWidth, FILTERS_FIELD,
};
use crate::domain::error::DashboardError;
use crate::domain::filters::FilterSet;
use crate::domain::last_synced::last_synced_text;
use crate::domain::series::SeriesData;
use crate::domain::source::SourceSettings;
use chrono::NaiveDateTime;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_CHART_COLOR: &str = "light-blue";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ChartState {
    Uninitialized,
    ResolvingSettings,
    Ready,
    Fetching,
    Rendered,
    EditingFilters,
    Disposed,
}

impl fmt::Display for ChartState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChartState::Uninitialized => "uninitialized",
            ChartState::ResolvingSettings => "resolving settings",
            ChartState::Ready => "ready",
            ChartState::Fetching => "fetching",
            ChartState::Rendered => "rendered",
            ChartState::EditingFilters => "editing filters",
            ChartState::Disposed => "disposed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartAction {
    SetFilters,
    ForceRefresh,
}

impl ChartAction {
    pub const ALL: [ChartAction; 2] = [ChartAction::SetFilters, ChartAction::ForceRefresh];

    pub fn id(self) -> &'static str {
        match self {
            ChartAction::SetFilters => "set-filters",
            ChartAction::ForceRefresh => "force-refresh",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ChartAction::SetFilters => "Set Filters",
            ChartAction::ForceRefresh => "Force Refresh",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterSaveOutcome {
    /// Values matched the applied filters; nothing was sent
    Unchanged,
    Saved,
}

/// Collaborators shared by every chart on a dashboard
#[derive(Clone)]
pub struct ChartServices {
    pub registry: Arc<SourceRegistry>,
    pub data_client: ChartDataClient,
    pub store: Arc<dyn DocumentStore>,
    pub renderer: Arc<dyn ChartRenderer>,
    pub notifier: Arc<dyn Notifier>,
    pub default_color: String,
}

/// Ended when the owning dashboard view is torn down. Results that arrive
/// afterwards are dropped instead of rendered.
#[derive(Debug, Clone, Default)]
pub struct Lifetime(Arc<AtomicBool>);

impl Lifetime {
    pub fn end(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_over(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// The single live visualization of this chart
#[derive(Debug)]
struct ChartRenderState {
    handle: ChartHandle,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionView {
    pub action: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartView {
    pub name: String,
    pub title: String,
    pub state: ChartState,
    pub source: String,
    pub width: ChartWidth,
    pub container_class: Option<String>,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    pub color: String,
    pub is_time_series: Option<bool>,
    pub filters: FilterSet,
    pub actions: Vec<ActionView>,
    pub last_synced: Option<String>,
    pub data: Option<SeriesData>,
    pub editing_filters: bool,
}

pub struct ChartController {
    chart: ChartDefinition,
    slot: usize,
    services: ChartServices,
    lifetime: Lifetime,
    state: ChartState,
    settings: Option<Arc<SourceSettings>>,
    filters: FilterSet,
    actions: Vec<ChartAction>,
    container: Option<ChartContainer>,
    data: Option<SeriesData>,
    last_synced_on: Option<NaiveDateTime>,
    render_state: Option<ChartRenderState>,
    editor: Option<FilterDialog>,
}

impl ChartController {
    pub fn new(
        chart: ChartDefinition,
        slot: usize,
        services: ChartServices,
        lifetime: Lifetime,
    ) -> Self {
        Self {
            chart,
            slot,
            services,
            lifetime,
            state: ChartState::Uninitialized,
            settings: None,
            filters: FilterSet::default(),
            actions: Vec::new(),
            container: None,
            data: None,
            last_synced_on: None,
            render_state: None,
            editor: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.chart.name
    }

    #[cfg(test)]
    pub fn state(&self) -> ChartState {
        self.state
    }

    #[cfg(test)]
    pub fn filters(&self) -> &FilterSet {
        &self.filters
    }

    #[cfg(test)]
    pub fn data(&self) -> Option<&SeriesData> {
        self.data.as_ref()
    }

    #[cfg(test)]
    pub fn actions(&self) -> &[ChartAction] {
        &self.actions
    }

    #[cfg(test)]
    pub fn last_synced_on(&self) -> Option<NaiveDateTime> {
        self.last_synced_on
    }

    pub fn filter_editor(&self) -> Option<&FilterDialog> {
        self.editor.as_ref()
    }

    /// Resolve settings, prepare filters, actions and container, then fetch and render
    pub async fn show(&mut self) -> Result<(), DashboardError> {
        self.ensure_state("show", &[ChartState::Uninitialized])?;
        self.state = ChartState::ResolvingSettings;

        let settings = match self.services.registry.resolve(&self.chart.source).await {
            Ok(settings) => settings,
            Err(e) => {
                self.state = ChartState::Uninitialized;
                return Err(self.report(e));
            }
        };
        if self.lifetime.is_over() {
            tracing::debug!("Chart {} was torn down while resolving settings", self.chart.name);
            return Ok(());
        }

        let filters = match FilterSet::parse(self.chart.filters_json.as_deref()) {
            Ok(filters) => filters,
            Err(e) => {
                self.state = ChartState::Uninitialized;
                return Err(self.report(e));
            }
        };

        self.settings = Some(settings);
        self.filters = filters;
        self.actions = ChartAction::ALL.to_vec();
        self.container = Some(ChartContainer::new(self.slot, &self.chart));
        self.state = ChartState::Ready;

        self.fetch_and_render().await
    }

    /// Fetch with the applied filters, allowing the endpoint to serve its cache
    async fn fetch_and_render(&mut self) -> Result<(), DashboardError> {
        let settings = self.settings("fetch")?;
        let previous = self.state;
        self.state = ChartState::Fetching;

        let result = self
            .services
            .data_client
            .fetch(&settings, &self.chart.name, &self.filters, false)
            .await;

        let data = match result {
            Ok(data) => data,
            Err(e) => {
                self.state = previous;
                return Err(self.report(e));
            }
        };
        if self.lifetime.is_over() {
            tracing::debug!("Discarding data for torn down chart {}", self.chart.name);
            return Ok(());
        }

        self.commit(self.chart.clone(), self.filters.clone(), data, previous)
    }

    /// Reload the chart document and fetch again with the cache bypassed
    pub async fn force_refresh(&mut self) -> Result<(), DashboardError> {
        self.ensure_state(
            ChartAction::ForceRefresh.id(),
            &[ChartState::Ready, ChartState::Rendered],
        )?;
        self.reload_and_refetch(None).await
    }

    /// Open the filter editor seeded with the applied filters
    pub fn open_filter_editor(&mut self) -> Result<&FilterDialog, DashboardError> {
        self.ensure_state(ChartAction::SetFilters.id(), &[ChartState::Rendered])?;
        let settings = self.settings(ChartAction::SetFilters.id())?;

        self.state = ChartState::EditingFilters;
        Ok(&*self
            .editor
            .insert(FilterDialog::new(&settings.filter_fields, &self.filters)))
    }

    /// Apply dialog edits; nothing is applied when any field name is unknown
    pub fn set_filter_values(&mut self, edits: Map<String, Value>) -> Result<(), DashboardError> {
        let Some(editor) = self.editor.as_mut() else {
            return Err(self.unavailable("set-filter-value"));
        };
        let result = editor.set_values(edits);
        result.map_err(|e| self.report(e))
    }

    pub fn cancel_filter_editor(&mut self) {
        if self.editor.take().is_some() {
            self.state = ChartState::Rendered;
        }
    }

    /// Persist changed filters and refetch. Unchanged values close the editor
    /// without any network call.
    pub async fn save_filters(&mut self) -> Result<FilterSaveOutcome, DashboardError> {
        let submitted = match self.editor.as_ref() {
            Some(editor) if editor.can_save() => editor.values(),
            _ => return Err(self.unavailable("save-filters")),
        };
        let submitted = submitted.map_err(|e| self.report(e))?;
        self.editor = None;
        self.state = ChartState::Rendered;

        if !self.filters.differs_from(&submitted) {
            tracing::debug!("Filters for chart {} unchanged, skipping save", self.chart.name);
            return Ok(FilterSaveOutcome::Unchanged);
        }

        tracing::info!("Saving filters for chart {}: {}", self.chart.name, submitted.to_json());
        let persisted = self
            .services
            .store
            .set_value(
                CHART_DOCTYPE,
                &self.chart.name,
                FILTERS_FIELD,
                Value::String(submitted.to_json()),
            )
            .await;
        if let Err(e) = persisted {
            let err = DashboardError::Persist {
                chart: self.chart.name.clone(),
                reason: format!("{:#}", e),
            };
            return Err(self.report(err));
        }

        self.reload_and_refetch(Some(submitted)).await?;
        Ok(FilterSaveOutcome::Saved)
    }

    /// Reload the document, then fetch with `refresh` set; commit only if both succeed.
    /// Without explicit filters the reloaded document's filters are used.
    async fn reload_and_refetch(
        &mut self,
        filters: Option<FilterSet>,
    ) -> Result<(), DashboardError> {
        let settings = self.settings("refresh")?;
        let previous = self.state;
        self.state = ChartState::Fetching;

        match self.reload_then_fetch(&settings, filters).await {
            Ok((chart, filters, data)) => {
                if self.lifetime.is_over() {
                    tracing::debug!("Discarding refresh for torn down chart {}", self.chart.name);
                    return Ok(());
                }
                self.commit(chart, filters, data, previous)
            }
            Err(e) => {
                self.state = previous;
                Err(self.report(e))
            }
        }
    }

    async fn reload_then_fetch(
        &self,
        settings: &SourceSettings,
        filters: Option<FilterSet>,
    ) -> Result<(ChartDefinition, FilterSet, SeriesData), DashboardError> {
        let document = self
            .services
            .store
            .get_document(CHART_DOCTYPE, &self.chart.name)
            .await
            .map_err(|e| DashboardError::DocumentLoad {
                doctype: CHART_DOCTYPE.to_string(),
                name: self.chart.name.clone(),
                reason: format!("{:#}", e),
            })?;
        let chart = ChartDefinition::from_document(document)?;

        let filters = match filters {
            Some(filters) => filters,
            None => FilterSet::parse(chart.filters_json.as_deref())?,
        };

        let data = self
            .services
            .data_client
            .fetch(settings, &chart.name, &filters, true)
            .await?;

        Ok((chart, filters, data))
    }

    /// Draw `data` and only then adopt it together with the document and filters
    /// it was fetched for. A render failure keeps everything as it was and returns
    /// the chart to `previous`.
    fn commit(
        &mut self,
        chart: ChartDefinition,
        filters: FilterSet,
        data: SeriesData,
        previous: ChartState,
    ) -> Result<(), DashboardError> {
        match self.draw(&chart, &data) {
            Ok(handle) => {
                self.render_state = Some(ChartRenderState { handle });
                self.last_synced_on = chart.last_synced_on;
                self.chart = chart;
                self.filters = filters;
                self.data = Some(data);
                self.state = ChartState::Rendered;
                Ok(())
            }
            Err(e) => {
                self.state = previous;
                let err = DashboardError::Render {
                    chart: self.chart.name.clone(),
                    reason: format!("{:#}", e),
                };
                Err(self.report(err))
            }
        }
    }

    /// Create the chart object once, update it afterwards
    fn draw(&self, chart: &ChartDefinition, data: &SeriesData) -> anyhow::Result<ChartHandle> {
        if let Some(render_state) = &self.render_state {
            self.services.renderer.update(render_state.handle, data)?;
            return Ok(render_state.handle);
        }

        let (Some(container), Some(settings)) = (self.container.as_ref(), self.settings.as_ref())
        else {
            anyhow::bail!("chart {} has no container yet", chart.name);
        };
        let options = ChartOptions {
            title: chart.title().to_string(),
            data: data.clone(),
            chart_type: chart.chart_type.renderer_type(),
            colors: vec![chart.color_or(&self.services.default_color).to_string()],
            axis_options: AxisOptions {
                x_is_series: settings.is_time_series,
            },
        };
        self.services.renderer.create(container, options)
    }

    /// Release the chart object; later results for this chart are ignored
    pub fn dispose(&mut self) {
        self.lifetime.end();
        self.editor = None;
        if let Some(render_state) = self.render_state.take() {
            self.services.renderer.dispose(render_state.handle);
        }
        self.state = ChartState::Disposed;
    }

    pub fn view(&self, now: NaiveDateTime) -> ChartView {
        ChartView {
            name: self.chart.name.clone(),
            title: self.chart.title().to_string(),
            state: self.state,
            source: self.chart.source.clone(),
            width: self.chart.width,
            container_class: self.container.as_ref().map(ChartContainer::css_class),
            chart_type: self.chart.chart_type,
            color: self.chart.color_or(&self.services.default_color).to_string(),
            is_time_series: self.settings.as_ref().map(|s| s.is_time_series),
            filters: self.filters.clone(),
            actions: self
                .actions
                .iter()
                .map(|a| ActionView {
                    action: a.id(),
                    label: a.label(),
                })
                .collect(),
            last_synced: self
                .data
                .as_ref()
                .map(|_| last_synced_text(self.last_synced_on, now)),
            data: self.data.clone(),
            editing_filters: self.editor.is_some(),
        }
    }

    fn settings(&self, action: &'static str) -> Result<Arc<SourceSettings>, DashboardError> {
        self.settings.clone().ok_or_else(|| self.unavailable(action))
    }

    fn ensure_state(
        &self,
        action: &'static str,
        allowed: &[ChartState],
    ) -> Result<(), DashboardError> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(self.unavailable(action))
        }
    }

    fn unavailable(&self, action: &'static str) -> DashboardError {
        self.report(DashboardError::ActionUnavailable {
            chart: self.chart.name.clone(),
            action,
            state: self.state.to_string(),
        })
    }

    fn report(&self, error: DashboardError) -> DashboardError {
        tracing::warn!("Chart {}: {}", self.chart.name, error);
        self.services.notifier.notify(&error);
        error
    }
}
