//! Authenticated HTTP client for the ERP REST API
//!
//! Wraps reqwest::Client with bearer injection from the token lifecycle
//! manager; every request asks the manager for a currently-valid token.

use std::sync::Arc;

use anyhow::{bail, Context, Result};

use crate::auth::TokenLifecycleManager;

pub struct ErpClient {
    http: reqwest::Client,
    base_url: String,
    auth: Arc<TokenLifecycleManager>,
}

impl ErpClient {
    pub fn new(base_url: &str, auth: Arc<TokenLifecycleManager>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        }
    }

    /// GET a REST resource with a currently-valid bearer token.
    pub async fn get_json(&self, path: &str) -> Result<serde_json::Value> {
        let token = self
            .auth
            .get_valid_token()
            .await
            .context("Could not obtain a valid ERP access token")?;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("ERP GET {}", url);

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&token.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await
            .with_context(|| format!("ERP GET {} failed", url))?;

        let resp = check_response(resp, &url).await?;
        resp.json()
            .await
            .with_context(|| format!("Invalid JSON from {}", url))
    }
}

/// Check HTTP response status code and return a clear error on failure.
async fn check_response(resp: reqwest::Response, url: &str) -> Result<reqwest::Response> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        bail!(
            "401 Unauthorized for {}. Token may have been revoked -- restart to re-authorize.",
            url
        );
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        bail!("HTTP {} for {}: {}", status.as_u16(), url, body);
    }
    Ok(resp)
}
