// Dashboard and chart definition domain models
use super::error::DashboardError;
use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const DASHBOARD_DOCTYPE: &str = "Dashboard";
pub const CHART_DOCTYPE: &str = "Dashboard Chart";
pub const FILTERS_FIELD: &str = "filters_json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartWidth {
    Half,
    Full,
}

impl ChartWidth {
    /// Grid columns out of 12
    pub fn columns(self) -> u8 {
        match self {
            ChartWidth::Half => 6,
            ChartWidth::Full => 12,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChartType {
    Line,
    Bar,
    Percentage,
    Pie,
    Donut,
    Heatmap,
}

impl ChartType {
    /// Type tag understood by the renderer
    pub fn renderer_type(self) -> &'static str {
        match self {
            ChartType::Line => "line",
            ChartType::Bar => "bar",
            ChartType::Percentage => "percentage",
            ChartType::Pie => "pie",
            ChartType::Donut => "donut",
            ChartType::Heatmap => "heatmap",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChartDefinition {
    pub name: String,
    #[serde(default)]
    pub chart_name: Option<String>,
    pub source: String,
    pub width: ChartWidth,
    #[serde(rename = "type")]
    pub chart_type: ChartType,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub filters_json: Option<String>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub last_synced_on: Option<NaiveDateTime>,
}

impl ChartDefinition {
    /// Build a definition from a stored document, rejecting unknown widths and types
    pub fn from_document(document: Value) -> Result<Self, DashboardError> {
        let label = document
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("<unnamed>")
            .to_string();
        serde_json::from_value(document).map_err(|e| {
            DashboardError::Configuration(format!("chart '{}': {}", label, e))
        })
    }

    pub fn title(&self) -> &str {
        match self.chart_name.as_deref() {
            Some(title) if !title.is_empty() => title,
            _ => &self.name,
        }
    }

    pub fn color_or<'a>(&'a self, default_color: &'a str) -> &'a str {
        match self.color.as_deref() {
            Some(color) if !color.is_empty() => color,
            _ => default_color,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardDefinition {
    pub name: String,
    pub charts: Vec<ChartDefinition>,
}

#[derive(Deserialize)]
struct DashboardDocument {
    name: String,
    #[serde(default)]
    charts: Vec<Value>,
}

impl DashboardDefinition {
    /// Parse a dashboard document. Charts that fail validation are returned
    /// separately so the remaining charts can still be shown.
    pub fn from_document(document: Value) -> Result<(Self, Vec<DashboardError>), DashboardError> {
        let document: DashboardDocument = serde_json::from_value(document)
            .map_err(|e| DashboardError::Configuration(format!("dashboard document: {}", e)))?;

        let mut charts = Vec::new();
        let mut rejected = Vec::new();
        for chart in document.charts {
            match ChartDefinition::from_document(chart) {
                Ok(chart) => charts.push(chart),
                Err(e) => rejected.push(e),
            }
        }

        Ok((
            Self {
                name: document.name,
                charts,
            },
            rejected,
        ))
    }
}

/// Accepts Frappe datetimes (`2019-08-20 12:00:00.000000`) and RFC 3339
fn deserialize_timestamp<'de, D>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw.filter(|s| !s.trim().is_empty()) else {
        return Ok(None);
    };

    parse_timestamp(&raw)
        .map(Some)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp '{}'", raw)))
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_local()))
}
