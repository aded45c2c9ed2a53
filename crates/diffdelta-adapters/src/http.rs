//! Shared HTTP client for adapter fetches.
//!
//! One GET per adapter per cycle: fixed User-Agent, 20-second total
//! deadline, optional bearer credential resolved from the environment at
//! request time. No retries — a failed fetch is this cycle's answer.

use std::time::Duration;

use anyhow::{Context, Result};

/// User-Agent sent on every upstream request.
pub const USER_AGENT: &str = concat!("diffdelta/", env!("CARGO_PKG_VERSION"));

/// Total per-request deadline.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Send `Accept: application/json`.
    pub accept_json: bool,
    /// Environment variable holding a bearer token.
    pub bearer_env: Option<String>,
}

/// A completed response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Thin wrapper over `reqwest::Client` carrying the engine's transport
/// contract.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("Failed to construct HTTP client")?;
        Ok(Self { client })
    }

    /// Perform one GET. Transport failures come back as `Err` with a
    /// `"<class>: <msg>"` string — the adapter's error-channel format.
    pub async fn get(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> std::result::Result<HttpResponse, String> {
        let mut request = self.client.get(url);

        if options.accept_json {
            request = request.header(reqwest::header::ACCEPT, "application/json");
        }

        if let Some(env_name) = options.bearer_env.as_deref() {
            if let Ok(token) = std::env::var(env_name) {
                if !token.is_empty() {
                    request = request.bearer_auth(token);
                }
            }
        }

        let response = request.send().await.map_err(classify_error)?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(classify_error)?
            .to_vec();

        Ok(HttpResponse { status, body })
    }
}

fn classify_error(err: reqwest::Error) -> String {
    let class = if err.is_timeout() {
        "timeout"
    } else if err.is_connect() {
        "connect"
    } else if err.is_body() || err.is_decode() {
        "body"
    } else {
        "request"
    };
    format!("{class}: {err}")
}
