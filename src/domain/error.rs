// Dashboard error kinds surfaced to the user
use thiserror::Error;

/// Errors raised by the chart lifecycle.
///
/// Cloneable so a failed settings load can be handed to every caller that joined it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DashboardError {
    #[error("failed to load settings for source '{source_name}': {reason}")]
    SettingsLoad { source_name: String, reason: String },

    #[error("failed to fetch data for chart '{chart}': {reason}")]
    DataFetch { chart: String, reason: String },

    #[error("failed to save filters for chart '{chart}': {reason}")]
    Persist { chart: String, reason: String },

    #[error("failed to load {doctype} '{name}': {reason}")]
    DocumentLoad {
        doctype: String,
        name: String,
        reason: String,
    },

    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("failed to render chart '{chart}': {reason}")]
    Render { chart: String, reason: String },

    #[error("action '{action}' is not available while chart '{chart}' is {state}")]
    ActionUnavailable {
        chart: String,
        action: &'static str,
        state: String,
    },

    #[error("chart has no filter field named '{0}'")]
    UnknownFilterField(String),

    #[error("filter '{0}' is required")]
    MissingFilter(String),
}

impl DashboardError {
    /// Short machine-readable kind, used in alerts and API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::SettingsLoad { .. } => "settings_load_failure",
            Self::DataFetch { .. } => "data_fetch_failure",
            Self::Persist { .. } => "persist_failure",
            Self::DocumentLoad { .. } => "document_load_failure",
            Self::Configuration(_) => "configuration_error",
            Self::Render { .. } => "render_failure",
            Self::ActionUnavailable { .. } => "action_unavailable",
            Self::UnknownFilterField(_) => "unknown_filter_field",
            Self::MissingFilter(_) => "missing_filter",
        }
    }

    /// Human title for the notification shown to the user
    pub fn title(&self) -> &'static str {
        match self {
            Self::SettingsLoad { .. } => "Could not load chart source",
            Self::DataFetch { .. } => "Could not fetch chart data",
            Self::Persist { .. } => "Could not save filters",
            Self::DocumentLoad { .. } => "Could not load document",
            Self::Configuration(_) => "Invalid chart configuration",
            Self::Render { .. } => "Could not render chart",
            Self::ActionUnavailable { .. } => "Action not available",
            Self::UnknownFilterField(_) | Self::MissingFilter(_) => "Invalid filters",
        }
    }
}
