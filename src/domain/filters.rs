// Filter set applied to a chart's data fetch
use super::error::DashboardError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Mapping from filter field name to its current value.
///
/// Persisted on the chart document as a flat JSON object (`filters_json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FilterSet(BTreeMap<String, Value>);

impl FilterSet {
    /// Parse the persisted payload. Missing, blank and `null` payloads are empty sets.
    pub fn parse(payload: Option<&str>) -> Result<Self, DashboardError> {
        let raw = match payload.map(str::trim) {
            None | Some("") => return Ok(Self::default()),
            Some(raw) => raw,
        };

        match serde_json::from_str::<Value>(raw) {
            Ok(Value::Null) => Ok(Self::default()),
            Ok(Value::Object(map)) => Ok(Self(map.into_iter().collect())),
            Ok(other) => Err(DashboardError::Configuration(format!(
                "filters_json must be a JSON object, got {}",
                other
            ))),
            Err(e) => Err(DashboardError::Configuration(format!(
                "filters_json is not valid JSON: {}",
                e
            ))),
        }
    }

    /// Serialize to the persisted form
    pub fn to_json(&self) -> String {
        let map: Map<String, Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Value::Object(map).to_string()
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when any field of either set has a different value in the other.
    /// A field missing on one side compares as `null`.
    pub fn differs_from(&self, other: &FilterSet) -> bool {
        let differs = |a: &FilterSet, b: &FilterSet| {
            a.0.iter()
                .any(|(field, value)| b.0.get(field).unwrap_or(&Value::Null) != value)
        };
        differs(self, other) || differs(other, self)
    }
}

impl FromIterator<(String, Value)> for FilterSet {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
