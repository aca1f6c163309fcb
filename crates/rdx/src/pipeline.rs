//! # 🧪 THE TYPED GET PIPELINE
//!
//! *Previously, on Rickdex...*
//!
//! 🎬 A raw JSON body arrives from another dimension. It claims to be a page of
//! characters. It has an `info`. It has `results`. One of the results has no
//! `status`. Nobody knows if it's alive. Nobody knows if it's dead. The pipeline
//! knows exactly which one it is, and it writes that down in the logs.
//!
//! 🚀 Steps, each one short-circuiting the rest:
//! 1. build the URL ([`build_url`])
//! 2. fetch (or reuse a cached body) via the injected [`JsonFetcher`]
//! 3. validate the `{info, results}` envelope
//! 4. validate every result against the endpoint's element schema, and when that
//!    fails, re-check each element on its own to find and log the offenders
//! 5. hand back typed data
//!
//! Every branch returns a `Result`. Nothing here panics, and nothing retries. 🦆

use std::fmt;
use std::marker::PhantomData;
use std::sync::{Arc, LazyLock};
use std::time::Duration;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use crate::app_config::AppConfig;
use crate::cache::{ResponseCache, TtlCache};
use crate::fetch::{FetchError, HttpFetcher, JsonFetcher};
use crate::models::{
    CHARACTER_SCHEMA, Character, ENVELOPE_SCHEMA, EPISODE_SCHEMA, Episode, PageInfo,
};
use crate::schema::{FieldErrors, Schema, Validation, describe, first_error, validate};
use crate::url_builder::{UrlError, build_url};

/// 📍 An endpoint path paired with the schema its elements must satisfy.
pub struct Endpoint<T> {
    pub path: &'static str,
    schema: &'static LazyLock<Schema>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Endpoint<T> {
    pub const fn new(path: &'static str, schema: &'static LazyLock<Schema>) -> Self {
        Self {
            path,
            schema,
            _marker: PhantomData,
        }
    }

    pub fn schema(&self) -> &Schema {
        self.schema
    }
}

impl<T> fmt::Debug for Endpoint<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint").field("path", &self.path).finish()
    }
}

pub static CHARACTER_ENDPOINT: Endpoint<Character> = Endpoint::new("/character", &CHARACTER_SCHEMA);
pub static EPISODE_ENDPOINT: Endpoint<Episode> = Endpoint::new("/episode", &EPISODE_SCHEMA);

/// 📄 A validated page: the envelope's `info` plus typed results.
#[derive(Debug, Clone, PartialEq)]
pub struct Listing<T> {
    pub info: PageInfo,
    pub results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    info: PageInfo,
    results: Vec<Value>,
}

/// 🔎 One array element that failed validation on its own.
#[derive(Debug, Clone, PartialEq)]
pub struct InvalidElement {
    pub index: usize,
    /// First offending field path inside the element, e.g. `"status"`.
    pub path: String,
    pub message: String,
    pub raw: Value,
}

/// 💀 Everything that can go wrong between "give me characters" and typed characters.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Url(#[from] UrlError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The outer `{info, results}` shape is wrong.
    #[error("{}", describe(.field_errors))]
    Envelope { field_errors: FieldErrors },
    /// One or more elements failed the element schema. `raw_results` is the payload
    /// exactly as received so callers can poke at it.
    #[error("{}", describe(.field_errors))]
    Elements {
        field_errors: FieldErrors,
        raw_results: Vec<Value>,
        offenders: Vec<InvalidElement>,
    },
}

/// 🛸 The client every lookup goes through.
#[derive(Debug, Clone)]
pub struct ApiClient {
    root: String,
    fetcher: Arc<dyn JsonFetcher>,
    cache: Option<Arc<dyn ResponseCache>>,
    cache_ttl: Duration,
}

impl ApiClient {
    pub fn new(root: impl Into<String>, fetcher: Arc<dyn JsonFetcher>) -> Self {
        Self {
            root: root.into(),
            fetcher,
            cache: None,
            cache_ttl: Duration::ZERO,
        }
    }

    /// 🗄️ Inject a response cache. Successful bodies live in it for `ttl`.
    pub fn with_cache(mut self, cache: Arc<dyn ResponseCache>, ttl: Duration) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    /// 🔧 The production wiring: reqwest fetcher, optional TTL cache, server-side root.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::wired(config, config.api_root())
    }

    /// 🖥️ Same wiring, pointed at the client-exposed root for client-originated fetches.
    pub fn public_from_config(config: &AppConfig) -> anyhow::Result<Self> {
        Self::wired(config, config.public_api_root())
    }

    fn wired(config: &AppConfig, root: String) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(&config.http)?;
        let client = Self::new(root, Arc::new(fetcher));
        Ok(if config.cache.enabled {
            client.with_cache(
                Arc::new(TtlCache::new()),
                Duration::from_secs(config.cache.ttl_secs),
            )
        } else {
            client
        })
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    /// 📚 GET a paginated list endpoint and validate it end to end.
    pub async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint<T>,
        params: &[(&str, Option<String>)],
    ) -> Result<Listing<T>, ApiError> {
        let url = build_url(&self.root, endpoint.path, params)?;
        let body = self.fetch(&url).await?;

        let envelope = match validate::<RawEnvelope>(&body, &ENVELOPE_SCHEMA) {
            Validation::Valid(envelope) => envelope,
            Validation::Invalid(field_errors) => {
                error!(
                    url = %url,
                    errors = %describe(&field_errors),
                    "💀 response envelope did not match {{info, results}}"
                );
                return Err(ApiError::Envelope { field_errors });
            }
        };

        let results = validate_elements(endpoint, &url, envelope.results)?;
        debug!(url = %url, count = results.len(), "✅ page validated");
        Ok(Listing {
            info: envelope.info,
            results,
        })
    }

    /// 🎯 GET a single bare object, e.g. `/character/1`.
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint<T>,
        id: i64,
    ) -> Result<T, ApiError> {
        let path = format!("{}/{}", endpoint.path, id);
        let url = build_url(&self.root, &path, &[])?;
        let body = self.fetch(&url).await?;

        match validate::<T>(&body, endpoint.schema()) {
            Validation::Valid(item) => Ok(item),
            Validation::Invalid(field_errors) => {
                let offenders = diagnose(endpoint.schema(), std::slice::from_ref(&body));
                log_element_failure(&url, &field_errors, &offenders);
                Err(ApiError::Elements {
                    field_errors,
                    raw_results: vec![body],
                    offenders,
                })
            }
        }
    }

    /// 📚 GET several bare objects by id, e.g. `/episode/1,2,3`.
    ///
    /// The API answers a single id with a bare object instead of a one-element array;
    /// both shapes are accepted. An empty id list never touches the network.
    pub async fn get_many<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint<T>,
        ids: &[i64],
    ) -> Result<Vec<T>, ApiError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let joined = ids
            .iter()
            .map(i64::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let path = format!("{}/{}", endpoint.path, joined);
        let url = build_url(&self.root, &path, &[])?;

        let items = match self.fetch(&url).await? {
            Value::Array(items) => items,
            single => vec![single],
        };
        validate_elements(endpoint, &url, items)
    }

    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        if let Some(cached) = self.cache.as_ref().and_then(|cache| cache.get(url)) {
            debug!(url, "🗄️ served from cache");
            return Ok(cached);
        }
        let body = self.fetcher.fetch_json(url).await?;
        if let Some(cache) = &self.cache {
            cache.set(url, body.clone(), self.cache_ttl);
        }
        Ok(body)
    }
}

fn validate_elements<T: DeserializeOwned>(
    endpoint: &Endpoint<T>,
    url: &str,
    raw: Vec<Value>,
) -> Result<Vec<T>, ApiError> {
    let json = Value::Array(raw);
    match validate::<Vec<T>>(&json, endpoint.schema()) {
        Validation::Valid(items) => Ok(items),
        Validation::Invalid(field_errors) => {
            let raw_results = match json {
                Value::Array(items) => items,
                _ => Vec::new(),
            };
            let offenders = diagnose(endpoint.schema(), &raw_results);
            log_element_failure(url, &field_errors, &offenders);
            Err(ApiError::Elements {
                field_errors,
                raw_results,
                offenders,
            })
        }
    }
}

/// 🔬 Re-check each element independently and keep the first complaint about each
/// one that fails.
fn diagnose(schema: &Schema, raw: &[Value]) -> Vec<InvalidElement> {
    raw.iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let errors = schema.check(item);
            first_error(&errors).map(|(path, message)| InvalidElement {
                index,
                path: path.to_string(),
                message: message.to_string(),
                raw: item.clone(),
            })
        })
        .collect()
}

fn log_element_failure(url: &str, field_errors: &FieldErrors, offenders: &[InvalidElement]) {
    error!(
        url,
        errors = %describe(field_errors),
        invalid = offenders.len(),
        "💀 results failed element validation"
    );
    for offender in offenders {
        error!(
            url,
            index = offender.index,
            path = %offender.path,
            message = %offender.message,
            element = %offender.raw,
            "🔎 invalid element"
        );
    }
}
