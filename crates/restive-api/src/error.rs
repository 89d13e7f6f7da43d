use thiserror::Error;

/// Top-level error type for the `restive-api` crate.
///
/// Covers every failure mode of the transport layer: connection and
/// protocol errors, URL construction, non-2xx API responses, and
/// body decoding. `restive-core` wraps these in its own error type.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ── Configuration ───────────────────────────────────────────────
    /// The configuration itself is unusable (e.g. the default server
    /// is missing). Unknown server/version *names* never produce this;
    /// they fall back to the defaults with a warning.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ── API ─────────────────────────────────────────────────────────
    /// Non-2xx response from the server, with the raw body for debugging.
    #[error("API error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        body: String,
    },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// HTTP status of the failure, if it reached the server.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Returns `true` if this is a transient transport failure.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
