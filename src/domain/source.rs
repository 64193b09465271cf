// Data source settings descriptor
use super::error::DashboardError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One input of a source's filter form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub fieldname: String,
    #[serde(default = "default_fieldtype")]
    pub fieldtype: String,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub options: Option<Value>,
    #[serde(default)]
    pub default: Option<Value>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub reqd: bool,
}

fn default_fieldtype() -> String {
    "Data".to_string()
}

/// Frappe sends check flags as either booleans or 0/1
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    })
}

/// Per-source configuration: filter schema, fetch method and axis flag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceSettings {
    #[serde(alias = "method")]
    pub method_path: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub is_time_series: bool,
    #[serde(default, rename = "filters")]
    pub filter_fields: Vec<FieldDescriptor>,
}

impl SourceSettings {
    /// Parse a descriptor returned by the settings method
    pub fn from_value(source_name: &str, value: Value) -> Result<Self, DashboardError> {
        let settings: SourceSettings =
            serde_json::from_value(value).map_err(|e| DashboardError::SettingsLoad {
                source_name: source_name.to_string(),
                reason: format!("malformed settings descriptor: {}", e),
            })?;
        settings.validate(source_name)?;
        Ok(settings)
    }

    pub fn validate(&self, source_name: &str) -> Result<(), DashboardError> {
        if self.method_path.trim().is_empty() {
            return Err(DashboardError::SettingsLoad {
                source_name: source_name.to_string(),
                reason: "settings have an empty method path".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parses_frappe_descriptor() {
        let settings = SourceSettings::from_value(
            "sql",
            json!({
                "method": "app.charts.sales.get",
                "is_time_series": 1,
                "filters": [
                    {"fieldname": "region", "fieldtype": "Select", "options": "APAC\nEMEA", "default": "APAC", "reqd": 1},
                    {"fieldname": "year"}
                ]
            }),
        )
        .unwrap();

        assert_eq!(settings.method_path, "app.charts.sales.get");
        assert!(settings.is_time_series);
        assert_eq!(settings.filter_fields.len(), 2);
        assert!(settings.filter_fields[0].reqd);
        assert_eq!(settings.filter_fields[1].fieldtype, "Data");
        assert!(!settings.filter_fields[1].reqd);
    }

    #[test]
    fn test_rejects_missing_method() {
        let err = SourceSettings::from_value("sql", json!({"method_path": " "})).unwrap_err();
        assert!(matches!(err, DashboardError::SettingsLoad { .. }));

        let err = SourceSettings::from_value("sql", json!({"filters": []})).unwrap_err();
        assert!(matches!(err, DashboardError::SettingsLoad { .. }));
    }
}
