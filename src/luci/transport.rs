use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::time::Duration;
use url::Url;

use crate::error::{DashError, DashResult};

/// Sends one JSON-RPC request and returns the raw response body
#[allow(async_fn_in_trait)]
pub trait RpcTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> DashResult<String>;
}

/// reqwest backed transport used against real routers
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: HttpClient,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> DashResult<Self> {
        let client = HttpClient::builder()
            .timeout(timeout)
            .no_proxy()
            .build()?;
        Ok(Self { client })
    }
}

impl RpcTransport for HttpTransport {
    async fn post_json(&self, url: &Url, body: &Value) -> DashResult<String> {
        // Request URLs may carry the session token; keep it out of messages.
        let endpoint = endpoint_label(url);

        let response = self
            .client
            .post(url.clone())
            .json(body)
            .send()
            .await
            .map_err(|e| {
                DashError::Network(format!(
                    "Failed to connect to {}: {}",
                    endpoint,
                    e.without_url()
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let hint = if status == StatusCode::NOT_FOUND {
                " (is luci-mod-rpc installed on the router?)"
            } else {
                ""
            };
            return Err(DashError::Network(format!(
                "{} returned {}{} - {}",
                endpoint,
                status,
                hint,
                if body.is_empty() { "No details" } else { &body }
            )));
        }

        response
            .text()
            .await
            .map_err(|e| DashError::Network(format!("Failed to read response: {}", e.without_url())))
    }
}

fn endpoint_label(url: &Url) -> String {
    format!(
        "{}://{}:{}{}",
        url.scheme(),
        url.host_str().unwrap_or_default(),
        url.port_or_known_default().unwrap_or_default(),
        url.path()
    )
}
