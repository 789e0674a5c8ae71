//! Request transport
//!
//! [`Transport`] is the seam between the registry client and a server. The
//! client speaks in endpoint paths and JSON payloads; an implementation
//! decides how they travel. [`HttpTransport`] sends them to a tracking server
//! with `reqwest`. [`crate::memory::InMemoryRegistry`] answers them in process.

use std::fmt;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::ClientConfig;
use crate::context::CallContext;
use crate::error::{ApiError, RegistryError, Result};
use crate::wire::ErrorBody;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Carries one registry request and returns the JSON response body.
///
/// `payload` is always a JSON object. For `GET` its fields become query
/// parameters, otherwise it is the request body. Server errors come back as
/// [`RegistryError::Api`]; an empty success body is returned as `{}`.
#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn call(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        payload: Value,
    ) -> Result<Value>;
}

/// Send a typed request and decode the typed response.
pub async fn request<Req, Resp>(
    transport: &dyn Transport,
    ctx: &CallContext,
    method: Method,
    path: &str,
    body: &Req,
) -> Result<Resp>
where
    Req: Serialize + ?Sized,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_value(body).map_err(|source| RegistryError::Encode {
        what: "request body",
        source,
    })?;
    let value = transport.call(ctx, method, path, payload).await?;
    serde_json::from_value(value).map_err(|source| RegistryError::Decode {
        what: "response body",
        source,
    })
}

/// Flatten a JSON object into query pairs. Arrays repeat their key.
pub fn query_pairs(payload: &Value) -> Vec<(String, String)> {
    fn scalar(value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    let mut pairs = Vec::new();
    if let Value::Object(map) = payload {
        for (key, value) in map {
            match value {
                Value::Array(items) => {
                    pairs.extend(items.iter().filter_map(scalar).map(|v| (key.clone(), v)))
                }
                other => {
                    if let Some(v) = scalar(other) {
                        pairs.push((key.clone(), v));
                    }
                }
            }
        }
    }
    pairs
}

/// Build an [`ApiError`] from an error response body.
///
/// Bodies that are not an MLflow error object become the message verbatim.
pub fn parse_error_body(status: u16, body: &str, request_id: Option<String>) -> ApiError {
    let mut err = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.message.is_empty() || !parsed.error_code.is_empty() => {
            ApiError::new(status, Some(&parsed.error_code), parsed.message)
        }
        _ => {
            let message = if body.trim().is_empty() {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            };
            ApiError::new(status, None, message)
        }
    };
    err.request_id = request_id;
    err
}

/// Transport talking to an MLflow tracking server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
}

impl HttpTransport {
    /// Build a transport from a configuration.
    ///
    /// The configuration is validated first, so a missing or plain-http URI
    /// fails here instead of on the first request.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let config = config.clone().validate()?;

        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| RegistryError::Config("token contains invalid characters".into()))?;
            headers.insert(AUTHORIZATION, value);
        }
        for (name, value) in &config.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|_| RegistryError::Config(format!("invalid header name {:?}", name)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|_| RegistryError::Config(format!("invalid value for header {}", name)))?;
            headers.insert(name, value);
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .danger_accept_invalid_certs(config.insecure)
            .build()?;

        Ok(Self {
            base_url: config.tracking_uri,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn send(&self, method: Method, path: &str, payload: Value) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let started = Instant::now();

        let request = match method {
            Method::Get => self.client.get(&url).query(&query_pairs(&payload)),
            Method::Post => self.client.post(&url).json(&payload),
            Method::Delete => self.client.delete(&url).json(&payload),
        };

        let response = request.send().await?;
        let status = response.status();
        let request_id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        debug!(
            method = %method,
            path,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "mlflow request"
        );

        if !status.is_success() {
            return Err(parse_error_body(status.as_u16(), &body, request_id).into());
        }

        if body.trim().is_empty() {
            return Ok(Value::Object(Map::new()));
        }
        serde_json::from_str(&body).map_err(|source| RegistryError::Decode {
            what: "response body",
            source,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn call(
        &self,
        ctx: &CallContext,
        method: Method,
        path: &str,
        payload: Value,
    ) -> Result<Value> {
        ctx.run(self.send(method, path, payload)).await
    }
}
