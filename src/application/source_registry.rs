// Source registry - Process-wide, lazily loaded source settings
use crate::application::collaborators::RemoteCall;
use crate::domain::error::DashboardError;
use crate::domain::source::SourceSettings;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

pub const DEFAULT_SETTINGS_METHOD: &str = "frappe.core.page.dashboard.dashboard.get_script";

type SettingsResult = Result<Arc<SourceSettings>, DashboardError>;
type PendingSettings = Shared<BoxFuture<'static, SettingsResult>>;

enum Entry {
    Ready(Arc<SourceSettings>),
    Loading(PendingSettings),
}

/// Memoizes one settings load per source.
///
/// Callers that arrive while a load is in flight await the same shared future. The
/// future itself moves its entry to `Ready` on success or removes it on failure, so
/// a failed source is retried from scratch by the next caller.
pub struct SourceRegistry {
    rpc: Arc<dyn RemoteCall>,
    settings_method: String,
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

impl SourceRegistry {
    pub fn new(rpc: Arc<dyn RemoteCall>, settings_method: impl Into<String>) -> Self {
        Self {
            rpc,
            settings_method: settings_method.into(),
            entries: Arc::default(),
        }
    }

    /// Install a statically known source; it will never be fetched remotely
    pub fn register(&self, source_name: impl Into<String>, settings: SourceSettings) {
        self.entries
            .lock()
            .insert(source_name.into(), Entry::Ready(Arc::new(settings)));
    }

    #[cfg(test)]
    pub fn is_cached(&self, source_name: &str) -> bool {
        matches!(self.entries.lock().get(source_name), Some(Entry::Ready(_)))
    }

    pub async fn resolve(&self, source_name: &str) -> SettingsResult {
        let pending = {
            let mut entries = self.entries.lock();
            match entries.get(source_name) {
                Some(Entry::Ready(settings)) => return Ok(settings.clone()),
                Some(Entry::Loading(pending)) => {
                    tracing::debug!("Joining in-flight settings load for source {}", source_name);
                    pending.clone()
                }
                None => {
                    let pending = self.load(source_name);
                    entries.insert(source_name.to_string(), Entry::Loading(pending.clone()));
                    pending
                }
            }
        };

        pending.await
    }

    fn load(&self, source_name: &str) -> PendingSettings {
        let rpc = self.rpc.clone();
        let method = self.settings_method.clone();
        let entries = Arc::clone(&self.entries);
        let source_name = source_name.to_string();

        async move {
            tracing::info!("Loading settings for source {}", source_name);
            let result = fetch_settings(rpc.as_ref(), &method, &source_name).await;

            let mut entries = entries.lock();
            match &result {
                Ok(settings) => {
                    entries.insert(source_name, Entry::Ready(settings.clone()));
                }
                Err(e) => {
                    tracing::warn!("Settings load for source {} failed: {}", source_name, e);
                    entries.remove(&source_name);
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

async fn fetch_settings(
    rpc: &dyn RemoteCall,
    method: &str,
    source_name: &str,
) -> SettingsResult {
    let message = rpc
        .call(method, json!({ "source_name": source_name }))
        .await
        .map_err(|e| DashboardError::SettingsLoad {
            source_name: source_name.to_string(),
            reason: format!("{:#}", e),
        })?;

    SourceSettings::from_value(source_name, message).map(Arc::new)
}
