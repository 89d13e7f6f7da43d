// ── Request description and hooks ──

use std::fmt;
use std::sync::Arc;

use reqwest::Method;
use serde_json::Value;

use crate::error::Error;

/// One HTTP call, described independently of the underlying client.
///
/// `server`/`version` name entries in the [`ApiConfig`](crate::ApiConfig);
/// `None` means the configured defaults. `path` is relative to the
/// resolved base URL. `body` rides as query parameters for GET and as a
/// JSON body for everything else.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub server: Option<String>,
    pub version: Option<String>,
    pub path: String,
    pub body: Value,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            server: None,
            version: None,
            path: path.into(),
            body: Value::Null,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = body;
        self
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

/// Mutates a request before it is sent.
pub type InterceptHook = Arc<dyn Fn(&mut ApiRequest) + Send + Sync>;

/// Transforms the decoded body of a successful response.
pub type SuccessHook = Arc<dyn Fn(Value, &ApiRequest) -> Result<Value, Error> + Send + Sync>;

/// Inspects a failure; may recover it into a success value.
pub type ErrorHook = Arc<dyn Fn(Error, &ApiRequest) -> Result<Value, Error> + Send + Sync>;

/// Optional request-lifecycle hooks. Unset hooks are identity/propagate.
#[derive(Clone, Default)]
pub struct Hooks {
    pub intercept: Option<InterceptHook>,
    pub on_success: Option<SuccessHook>,
    pub on_error: Option<ErrorHook>,
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("intercept", &self.intercept.is_some())
            .field("on_success", &self.on_success.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}
