use std::time::Duration;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ApiConfig;

/// Per-request timeout applied to every call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retries after a 429 before the error propagates.
const MAX_RATE_LIMIT_RETRIES: u32 = 2;

/// Base backoff after a 429 (doubles each attempt: 1s, 2s).
const RATE_LIMIT_BASE_BACKOFF: Duration = Duration::from_secs(1);

/// Thin wrapper over `reqwest::Client` carrying the backend base URL
/// and an optional bearer token. Built once per run and shared by
/// reference; holds no mutable state.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    auth_token: Option<String>,
}

impl ApiClient {
    pub fn new(api: &ApiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: api.base_url.trim_end_matches('/').to_string(),
            auth_token: api.auth_token.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve a request URL. Absolute URLs (e.g. a `next` link from a
    /// pagination envelope) pass through untouched.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.base_url, path.trim_start_matches('/'))
        }
    }

    /// GET a JSON payload, retrying rate-limited responses with
    /// exponential backoff. Any other failure propagates to the caller,
    /// which applies its own stage-level tolerance.
    pub async fn get_json(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let url = self.url(path);

        let mut attempt: u32 = 0;
        loop {
            let mut req = self.http.get(&url).query(query);
            if let Some(token) = &self.auth_token {
                req = req.bearer_auth(token);
            }

            let resp = req
                .send()
                .await
                .with_context(|| format!("request to {url} failed"))?;
            let status = resp.status();

            if status == reqwest::StatusCode::TOO_MANY_REQUESTS
                && attempt < MAX_RATE_LIMIT_RETRIES
            {
                let backoff = RATE_LIMIT_BASE_BACKOFF * 2u32.pow(attempt);
                warn!(
                    "Rate limited on {url}, backing off {}s (attempt {}/{})",
                    backoff.as_secs(),
                    attempt + 1,
                    MAX_RATE_LIMIT_RETRIES,
                );
                tokio::time::sleep(backoff).await;
                attempt += 1;
                continue;
            }

            if !status.is_success() {
                anyhow::bail!("GET {url} returned {status}");
            }

            debug!("GET {url} -> {status}");
            return resp
                .json()
                .await
                .with_context(|| format!("malformed JSON from {url}"));
        }
    }
}
