// Filter dialog - Collects and validates filter edits for one chart
use crate::domain::error::DashboardError;
use crate::domain::filters::FilterSet;
use crate::domain::source::FieldDescriptor;
use serde::Serialize;
use serde_json::{Map, Value};

pub const SAVE_ACTION_LABEL: &str = "Save Filters";

#[derive(Debug, Clone, Serialize)]
pub struct FilterDialog {
    title: &'static str,
    fields: Vec<FieldDescriptor>,
    values: FilterSet,
    #[serde(skip)]
    touched: bool,
    primary_action: Option<&'static str>,
}

impl FilterDialog {
    /// Seed the form with the applied filters, falling back to field defaults
    pub fn new(fields: &[FieldDescriptor], applied: &FilterSet) -> Self {
        let values = fields
            .iter()
            .filter_map(|field| {
                applied
                    .get(&field.fieldname)
                    .or(field.default.as_ref())
                    .map(|value| (field.fieldname.clone(), value.clone()))
            })
            .collect();

        Self {
            title: "Set Filters",
            fields: fields.to_vec(),
            values,
            touched: false,
            primary_action: None,
        }
    }

    /// Apply a batch of edits. Every field name is checked before any value is
    /// applied. Any edit enables saving, even one that restores the original value.
    pub fn set_values(&mut self, edits: Map<String, Value>) -> Result<(), DashboardError> {
        if let Some(unknown) = edits
            .keys()
            .find(|name| !self.fields.iter().any(|f| &f.fieldname == *name))
        {
            return Err(DashboardError::UnknownFilterField(unknown.clone()));
        }
        if edits.is_empty() {
            return Ok(());
        }

        for (fieldname, value) in edits {
            self.values.insert(fieldname, value);
        }
        self.touched = true;
        self.primary_action = Some(SAVE_ACTION_LABEL);
        Ok(())
    }

    pub fn can_save(&self) -> bool {
        self.touched
    }

    #[cfg(test)]
    pub fn value(&self, fieldname: &str) -> Option<&Value> {
        self.values.get(fieldname)
    }

    /// Submitted values. Empty optional fields are left out; empty required fields
    /// are an error.
    pub fn values(&self) -> Result<FilterSet, DashboardError> {
        let mut submitted = FilterSet::default();
        for field in &self.fields {
            match self.values.get(&field.fieldname) {
                Some(value) if !is_empty(value) => {
                    submitted.insert(field.fieldname.clone(), value.clone());
                }
                _ if field.reqd => {
                    return Err(DashboardError::MissingFilter(field.fieldname.clone()));
                }
                _ => {}
            }
        }
        Ok(submitted)
    }
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}
