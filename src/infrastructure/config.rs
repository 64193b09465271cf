use crate::application::chart_controller::DEFAULT_CHART_COLOR;
use crate::application::source_registry::DEFAULT_SETTINGS_METHOD;
use crate::domain::source::{FieldDescriptor, SourceSettings};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub site: SiteSettings,
    #[serde(default)]
    pub charts: ChartSettings,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct SiteSettings {
    pub url: String,
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    #[serde(default = "default_settings_method")]
    pub settings_method: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    #[serde(default = "default_color")]
    pub default_color: String,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            default_color: default_color(),
        }
    }
}

/// A source registered at startup instead of being fetched from the site
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub name: String,
    pub method_path: String,
    #[serde(default)]
    pub is_time_series: bool,
    #[serde(default)]
    pub filters: Vec<FieldDescriptor>,
}

impl SourceConfig {
    pub fn settings(&self) -> SourceSettings {
        SourceSettings {
            method_path: self.method_path.clone(),
            is_time_series: self.is_time_series,
            filter_fields: self.filters.clone(),
        }
    }
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_settings_method() -> String {
    DEFAULT_SETTINGS_METHOD.to_string()
}

fn default_color() -> String {
    DEFAULT_CHART_COLOR.to_string()
}

impl SiteSettings {
    /// `key:secret` token for the Authorization header, when both halves are set
    pub fn token(&self) -> Option<String> {
        match (self.api_key.as_deref(), self.api_secret.as_deref()) {
            (Some(key), Some(secret)) if !key.is_empty() && !secret.is_empty() => {
                Some(format!("{}:{}", key, secret))
            }
            _ => None,
        }
    }
}

/// Load `config/dashboard.*`, overridden by `DASHBOARD__SECTION__KEY` variables
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(config::Environment::with_prefix("DASHBOARD").separator("__"))
        .build()?;

    Ok(settings.try_deserialize()?)
}
