// ── HTTP client over a resolved server/version configuration ──
//
// Every verb funnels through `execute`: resolve the base URL, run the
// intercept hook, encode the body (query params for GET, JSON otherwise,
// `_method` tunneling when method override is on), send, then route the
// decoded result through the success/error hooks.

use reqwest::Method;
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::config::ApiConfig;
use crate::encode::query_pairs;
use crate::error::Error;
use crate::request::{ApiRequest, Hooks};
use crate::transport::TransportConfig;

/// Async JSON transport for REST APIs.
///
/// Holds a `reqwest::Client`, the server/version configuration, and the
/// optional request-lifecycle hooks. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    config: ApiConfig,
    hooks: Hooks,
}

impl ApiClient {
    // ── Constructors ─────────────────────────────────────────────────

    pub fn new(config: ApiConfig, transport: &TransportConfig) -> Result<Self, Error> {
        Ok(Self {
            http: transport.build_client()?,
            config,
            hooks: Hooks::default(),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages headers/TLS).
    pub fn from_reqwest(config: ApiConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            config,
            hooks: Hooks::default(),
        }
    }

    /// Attach request-lifecycle hooks.
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    // ── Verbs ────────────────────────────────────────────────────────

    pub async fn get(&self, request: ApiRequest) -> Result<Value, Error> {
        self.execute(ApiRequest {
            method: Method::GET,
            ..request
        })
        .await
    }

    pub async fn post(&self, request: ApiRequest) -> Result<Value, Error> {
        self.execute(ApiRequest {
            method: Method::POST,
            ..request
        })
        .await
    }

    pub async fn patch(&self, request: ApiRequest) -> Result<Value, Error> {
        self.execute(ApiRequest {
            method: Method::PATCH,
            ..request
        })
        .await
    }

    pub async fn put(&self, request: ApiRequest) -> Result<Value, Error> {
        self.execute(ApiRequest {
            method: Method::PUT,
            ..request
        })
        .await
    }

    pub async fn delete(&self, request: ApiRequest) -> Result<Value, Error> {
        self.execute(ApiRequest {
            method: Method::DELETE,
            ..request
        })
        .await
    }

    // ── Core ─────────────────────────────────────────────────────────

    /// Execute one request and decode the response body as JSON.
    pub async fn execute(&self, mut request: ApiRequest) -> Result<Value, Error> {
        if let Some(intercept) = &self.hooks.intercept {
            intercept(&mut request);
        }

        let base = self
            .config
            .resolve(request.server.as_deref(), request.version.as_deref())?;
        let url = Url::parse(&format!("{base}{}", request.path))?;
        debug!(%request, %url, "dispatching");

        let result = self.send(&request, url).await;
        match result {
            Ok(value) => match &self.hooks.on_success {
                Some(hook) => hook(value, &request),
                None => Ok(value),
            },
            Err(err) => match &self.hooks.on_error {
                Some(hook) => hook(err, &request),
                None => Err(err),
            },
        }
    }

    async fn send(&self, request: &ApiRequest, url: Url) -> Result<Value, Error> {
        let overridden = self.config.method_override && request.method != Method::POST;

        let builder = if overridden {
            // Tunnel the real verb as POST with a `_method` body field.
            // GET bodies move from the query string into the JSON body.
            let mut body = json!({ "_method": request.method.as_str() });
            if let (Some(target), Value::Object(source)) = (body.as_object_mut(), &request.body) {
                for (k, v) in source {
                    target.insert(k.clone(), v.clone());
                }
            }
            self.http.post(url).json(&body)
        } else if request.method == Method::GET {
            self.http.get(url).query(&query_pairs(&request.body))
        } else {
            let builder = self.http.request(request.method.clone(), url);
            if request.body.is_null() {
                builder
            } else {
                builder.json(&request.body)
            }
        };

        let response = builder.send().await?;
        self.handle_response(response).await
    }

    // ── Response handling ────────────────────────────────────────────

    async fn handle_response(&self, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();
        let body = resp.text().await?;

        if status.is_success() {
            if body.is_empty() {
                return Ok(Value::Null);
            }
            serde_json::from_str(&body).map_err(|e| {
                let preview: String = body.chars().take(200).collect();
                Error::Deserialization {
                    message: format!("{e} (body preview: {preview:?})"),
                    body,
                }
            })
        } else {
            Err(parse_error(status, body))
        }
    }
}

/// Build an `Error::Api`, preferring a `message` field from the body.
fn parse_error(status: reqwest::StatusCode, body: String) -> Error {
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
        .unwrap_or_else(|| status.to_string());
    Error::Api {
        status: status.as_u16(),
        message,
        body,
    }
}
