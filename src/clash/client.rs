use anyhow::{Context, Result};
use reqwest::Client as HttpClient;
use serde::de::DeserializeOwned;
use std::time::Duration;

use super::types::*;

/// Clash External Controller API client
#[derive(Debug, Clone)]
pub struct ClashClient {
    base_url: String,
    secret: Option<String>,
    client: HttpClient,
}

impl ClashClient {
    /// Create a new Clash client
    pub fn new(base_url: String, secret: Option<String>, timeout: Duration) -> Result<Self> {
        // Controllers live on the LAN; never route them through a system proxy.
        let client = HttpClient::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            secret,
            client,
        })
    }

    /// Build authorization header
    fn auth_header(&self) -> Option<String> {
        self.secret.as_ref().map(|s| format!("Bearer {}", s))
    }

    /// Make a GET request
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);

        if let Some(auth) = self.auth_header() {
            request = request.header("Authorization", auth);
        }

        log::debug!("GET {}", url);
        let response = request
            .send()
            .await
            .context(format!("Failed to connect to Clash API at {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Clash API returned error: {} - {}",
                status,
                if body.is_empty() { "No details" } else { &body }
            );
        }

        response
            .json()
            .await
            .context("Failed to parse Clash API response")
    }

    /// Test connection to Clash API, returning the core version
    pub async fn test_connection(&self) -> Result<VersionResponse> {
        self.get("/version").await
    }

    /// Get Clash configuration
    pub async fn get_config(&self) -> Result<ConfigResponse> {
        self.get("/configs").await
    }

    /// Get rules loaded by the running core
    pub async fn get_rules(&self) -> Result<RulesResponse> {
        self.get("/rules").await
    }
}
