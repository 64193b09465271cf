// Frappe site client - Document store and remote method calls over HTTP
use crate::application::collaborators::{DocumentStore, RemoteCall};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone)]
pub struct FrappeClient {
    base_url: String,
    token: Option<String>,
    http_client: Client,
}

#[derive(Debug, Deserialize)]
struct MethodResponse {
    #[serde(default)]
    message: Value,
    #[serde(default)]
    exc_type: Option<String>,
    #[serde(default, rename = "_server_messages")]
    server_messages: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceResponse {
    data: Value,
}

impl FrappeClient {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self::with_http_client(base_url, token, Client::new())
    }

    pub fn with_http_client(
        base_url: impl Into<String>,
        token: Option<String>,
        http_client: Client,
    ) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            http_client,
        }
    }

    fn method_url(&self, method_path: &str) -> String {
        format!("{}/api/method/{}", self.base_url, method_path)
    }

    fn resource_url(&self, doctype: &str, name: &str) -> String {
        format!(
            "{}/api/resource/{}/{}",
            self.base_url,
            urlencoding::encode(doctype),
            urlencoding::encode(name)
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.header("Accept", "application/json");
        match &self.token {
            Some(token) => request.header("Authorization", format!("token {}", token)),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = self
            .authorize(request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", what))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<MethodResponse>(&body)
                .ok()
                .and_then(|r| server_message(&r))
                .unwrap_or(body);
            anyhow::bail!("{} failed with status {}: {}", what, status, detail);
        }

        Ok(response)
    }
}

/// First user-facing message out of Frappe's `_server_messages`, which is a JSON
/// list of JSON-encoded objects
fn server_message(response: &MethodResponse) -> Option<String> {
    let raw = response.server_messages.as_deref()?;
    let messages: Vec<String> = serde_json::from_str(raw).ok()?;
    let first = messages.first()?;
    let message = match serde_json::from_str::<Value>(first) {
        Ok(Value::Object(obj)) => obj
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => Some(first.clone()),
    };
    message.or_else(|| response.exc_type.clone())
}

#[async_trait]
impl RemoteCall for FrappeClient {
    async fn call(&self, method_path: &str, args: Value) -> Result<Value> {
        tracing::debug!("Calling {}", method_path);
        let request = self.http_client.post(self.method_url(method_path)).json(&args);
        let response = self.send(request, method_path).await?;

        let body = response
            .json::<MethodResponse>()
            .await
            .with_context(|| format!("Failed to parse response of {}", method_path))?;

        if let Some(exc_type) = &body.exc_type {
            let detail = server_message(&body).unwrap_or_else(|| exc_type.clone());
            anyhow::bail!("{} raised {}: {}", method_path, exc_type, detail);
        }

        Ok(body.message)
    }
}

#[async_trait]
impl DocumentStore for FrappeClient {
    async fn get_document(&self, doctype: &str, name: &str) -> Result<Value> {
        tracing::debug!("Loading {} {}", doctype, name);
        let request = self.http_client.get(self.resource_url(doctype, name));
        let response = self.send(request, &format!("get {} {}", doctype, name)).await?;

        let body = response
            .json::<ResourceResponse>()
            .await
            .with_context(|| format!("Failed to parse {} {}", doctype, name))?;
        Ok(body.data)
    }

    async fn set_value(&self, doctype: &str, name: &str, field: &str, value: Value) -> Result<()> {
        tracing::debug!("Setting {}.{} on {}", doctype, field, name);
        let mut update = Map::new();
        update.insert(field.to_string(), value);

        let request = self
            .http_client
            .put(self.resource_url(doctype, name))
            .json(&Value::Object(update));
        self.send(request, &format!("update {} {}", doctype, name))
            .await?;
        Ok(())
    }
}
