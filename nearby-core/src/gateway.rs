use async_trait::async_trait;
use reqwest::{Client, Url, redirect};
use std::{fmt::Debug, time::Duration};
use tracing::{debug, info, warn};

use crate::error::FetchError;

/// Query parameters that carry API keys and must not reach the logs.
const SECRET_PARAMS: &[&str] = &["key", "appid", "apikey"];

/// Single-shot GET transport. One attempt per call, no retries.
#[async_trait]
pub trait HttpGateway: Send + Sync + Debug {
    /// Fetch `url` and return the body of a 2xx response.
    async fn fetch(&self, url: &Url) -> Result<String, FetchError>;
}

/// [`HttpGateway`] backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestGateway {
    http: Client,
}

impl ReqwestGateway {
    pub fn new(connect_timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .connect_timeout(connect_timeout)
            .redirect(redirect::Policy::limited(10))
            .user_agent(concat!("nearby/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {e}"))?;

        Ok(Self { http })
    }
}

#[async_trait]
impl HttpGateway for ReqwestGateway {
    async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        let shown = redact(url);
        debug!(url = %shown, "Sending request");

        let res = match self.http.get(url.clone()).send().await {
            Ok(res) => res,
            Err(e) => {
                warn!(url = %shown, error = %e, "Request failed before a response arrived");
                return Err(FetchError::network(shown, e.to_string()));
            }
        };

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| FetchError::network(shown.clone(), e.to_string()))?;

        if !status.is_success() {
            warn!(url = %shown, status = status.as_u16(), "Request returned failure status");
            return Err(FetchError::http_status(shown, status.as_u16(), &body));
        }

        info!(url = %shown, status = status.as_u16(), bytes = body.len(), "Request succeeded");
        Ok(body)
    }
}

/// Render `url` with API key values masked.
pub fn redact(url: &Url) -> String {
    if !url.query_pairs().any(|(k, _)| is_secret(&k)) {
        return url.to_string();
    }

    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(k, v)| {
            let value = if is_secret(&k) {
                "***".to_string()
            } else {
                v.into_owned()
            };
            (k.into_owned(), value)
        })
        .collect();

    let mut shown = url.clone();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

fn is_secret(name: &str) -> bool {
    SECRET_PARAMS.contains(&name)
}
