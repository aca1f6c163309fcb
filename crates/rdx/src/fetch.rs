//! # 📡 THE FETCH CLIENT
//!
//! 🎬 COLD OPEN. INT. GARAGE, 2:13 AM
//!
//! A portal gun hums on the workbench. Someone typed a URL into it. The portal
//! opens onto an HTTP server in another dimension, which may or may not be having
//! a good day. We ask it for JSON. It answers with JSON, a 500, or silence.
//!
//! 🚀 This module does exactly one GET per call and turns every possible outcome into
//! a value: the decoded body, [`FetchError::Http`], or [`FetchError::Network`]. It does
//! not retry. Retry policy belongs to whoever is holding the portal gun. 🦆
//!
//! 🧠 Knowledge graph:
//! - [`JsonFetcher`] is the seam. [`HttpFetcher`] is the real one; tests bring fakes.
//! - Schema validation is NOT done here. The body comes back as raw `serde_json::Value`.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::app_config::HttpConfig;

/// 💀 The two ways a single GET can go wrong.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FetchError {
    /// The server answered, just not with a 2xx.
    #[error("HTTP error! status: {status}")]
    Http { status: u16 },
    /// Connection, timeout, DNS, or a body that wasn't JSON.
    #[error("Network error: {0}")]
    Network(String),
}

/// 📡 Something that can turn a URL into decoded JSON.
#[async_trait]
pub trait JsonFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// 🌐 The real fetcher: one shared `reqwest::Client`, reused across requests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// 🔧 Build the client with the configured connect/request timeouts.
    pub fn new(config: &HttpConfig) -> anyhow::Result<Self> {
        use anyhow::Context;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("💀 The HTTP client refused to be born. Probably a TLS backend having a moment.")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl JsonFetcher for HttpFetcher {
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        debug!(url, "📡 GET");

        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                error!(url, error = %e, "💀 request never made it across the portal");
                return Err(FetchError::Network(e.to_string()));
            }
        };

        let status = response.status();
        if !status.is_success() {
            error!(url, status = status.as_u16(), "💀 API answered with a non-2xx");
            return Err(FetchError::Http {
                status: status.as_u16(),
            });
        }

        // -- 📦 bytes first, then serde, so a bad body reads as a parse failure not a hang-up
        let body = response.bytes().await.map_err(|e| {
            warn!(url, error = %e, "💀 body stream broke mid-flight");
            FetchError::Network(e.to_string())
        })?;
        serde_json::from_slice(&body).map_err(|e| {
            warn!(url, error = %e, "💀 body was not JSON");
            FetchError::Network(e.to_string())
        })
    }
}
