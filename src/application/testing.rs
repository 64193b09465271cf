// In-memory collaborators for application tests
use crate::application::collaborators::{DocumentStore, RemoteCall};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;

pub const SETTINGS_METHOD: &str = "frappe.core.page.dashboard.dashboard.get_script";
pub const SALES_METHOD: &str = "app.charts.sales.get";

#[derive(Clone)]
enum Reply {
    Ok(Value),
    Err(String),
}

/// Scripted RPC endpoint that records every call
#[derive(Default)]
pub struct FakeRpc {
    replies: Mutex<HashMap<String, Reply>>,
    gates: Mutex<HashMap<String, Arc<Semaphore>>>,
    calls: Mutex<Vec<(String, Value)>>,
}

impl FakeRpc {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn reply(&self, method: &str, value: Value) {
        self.replies
            .lock()
            .insert(method.to_string(), Reply::Ok(value));
    }

    pub fn fail(&self, method: &str, message: &str) {
        self.replies
            .lock()
            .insert(method.to_string(), Reply::Err(message.to_string()));
    }

    /// Calls to `method` block until the returned gate gets permits
    pub fn hold(&self, method: &str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().insert(method.to_string(), gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .lock()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, args)| args.clone())
            .collect()
    }
}

#[async_trait]
impl RemoteCall for FakeRpc {
    async fn call(&self, method_path: &str, args: Value) -> anyhow::Result<Value> {
        self.calls.lock().push((method_path.to_string(), args));
        tokio::task::yield_now().await;

        let gate = self.gates.lock().get(method_path).cloned();
        if let Some(gate) = gate {
            let _permit = gate.acquire().await?;
        }

        let reply = self.replies.lock().get(method_path).cloned();
        match reply {
            Some(Reply::Ok(value)) => Ok(value),
            Some(Reply::Err(message)) => anyhow::bail!("{}", message),
            None => anyhow::bail!("no reply scripted for {}", method_path),
        }
    }
}

/// Document store backed by a map of JSON documents
#[derive(Default)]
pub struct FakeStore {
    documents: Mutex<HashMap<(String, String), Value>>,
    reads: Mutex<Vec<(String, String)>>,
    writes: Mutex<Vec<(String, String, String, Value)>>,
    fail_writes: Mutex<bool>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn insert(&self, doctype: &str, document: Value) {
        let name = document["name"].as_str().unwrap_or_default().to_string();
        self.documents
            .lock()
            .insert((doctype.to_string(), name), document);
    }

    pub fn update_field(&self, doctype: &str, name: &str, field: &str, value: Value) {
        if let Some(doc) = self
            .documents
            .lock()
            .get_mut(&(doctype.to_string(), name.to_string()))
        {
            doc[field] = value;
        }
    }

    pub fn fail_writes(&self) {
        *self.fail_writes.lock() = true;
    }

    pub fn reads(&self) -> Vec<(String, String)> {
        self.reads.lock().clone()
    }

    pub fn writes(&self) -> Vec<(String, String, String, Value)> {
        self.writes.lock().clone()
    }
}

#[async_trait]
impl DocumentStore for FakeStore {
    async fn get_document(&self, doctype: &str, name: &str) -> anyhow::Result<Value> {
        self.reads
            .lock()
            .push((doctype.to_string(), name.to_string()));
        tokio::task::yield_now().await;

        self.documents
            .lock()
            .get(&(doctype.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("{} {} not found", doctype, name))
    }

    async fn set_value(
        &self,
        doctype: &str,
        name: &str,
        field: &str,
        value: Value,
    ) -> anyhow::Result<()> {
        if *self.fail_writes.lock() {
            anyhow::bail!("permission denied");
        }
        self.writes.lock().push((
            doctype.to_string(),
            name.to_string(),
            field.to_string(),
            value.clone(),
        ));
        self.update_field(doctype, name, field, value);
        Ok(())
    }
}

pub fn sql_settings() -> Value {
    json!({
        "method_path": SALES_METHOD,
        "is_time_series": true,
        "filters": [
            {"fieldname": "region", "fieldtype": "Select", "options": "APAC\nEMEA", "default": "APAC"}
        ]
    })
}

pub fn sales_data() -> Value {
    json!({
        "labels": ["Jan", "Feb", "Mar"],
        "datasets": [{"name": "Sales", "values": [10.0, 20.0, 15.0]}]
    })
}

pub fn chart_doc(name: &str, filters_json: &str) -> Value {
    json!({
        "name": name,
        "chart_name": format!("Chart {}", name),
        "source": "sql",
        "width": "Half",
        "type": "Bar",
        "filters_json": filters_json,
        "last_synced_on": "2019-08-20 11:55:00"
    })
}
