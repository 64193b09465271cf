// Series dataset handed to the renderer
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Points as sent by the endpoint; numbers, numeric strings or nulls
    #[serde(default)]
    pub values: Vec<Value>,
    #[serde(
        default,
        rename = "chartType",
        skip_serializing_if = "Option::is_none"
    )]
    pub chart_type: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Labels plus one or more numeric series. Keys the controller does not know about
/// (markers, regions) are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesData {
    #[serde(default)]
    pub labels: Vec<Value>,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SeriesData {
    pub fn point_count(&self) -> usize {
        self.datasets.iter().map(|d| d.values.len()).sum()
    }
}
