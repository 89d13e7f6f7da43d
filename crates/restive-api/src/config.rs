// ── API configuration ──
//
// Multi-server, multi-version base-URL configuration. Resolution never
// fails on an unknown name: it warns and falls back to the configured
// default server / default version.

use std::collections::HashMap;

use serde::Deserialize;
use tracing::warn;

use crate::error::Error;

/// One logical API server with its versioned path prefixes.
///
/// The full base for a request is `base_url` + `versions[version]`,
/// e.g. `"https://api.example.com"` + `"/v2/"`.
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub base_url: String,
    pub versions: HashMap<String, String>,
    pub default_version: String,
}

/// Transport-level configuration: the known servers, which one to use
/// when a request names none, and whether to tunnel non-POST verbs
/// through POST (`method_override`).
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub servers: HashMap<String, Server>,
    pub default_server: String,
    #[serde(default)]
    pub method_override: bool,
}

impl ApiConfig {
    /// Configuration with a single server exposing one unnamed version
    /// mounted at the base URL itself.
    pub fn single_server(base_url: impl Into<String>) -> Self {
        let mut versions = HashMap::new();
        versions.insert("default".to_owned(), String::new());
        let server = Server {
            base_url: base_url.into(),
            versions,
            default_version: "default".to_owned(),
        };
        let mut servers = HashMap::new();
        servers.insert("default".to_owned(), server);
        Self {
            servers,
            default_server: "default".to_owned(),
            method_override: false,
        }
    }

    /// Resolve a (server, version) pair to a full base URL string.
    ///
    /// Unknown names fall back to the defaults with a diagnostic warning;
    /// only a broken configuration (missing default server/version) is an
    /// error.
    pub fn resolve(&self, server: Option<&str>, version: Option<&str>) -> Result<String, Error> {
        let name = match server {
            Some(s) if self.servers.contains_key(s) => s,
            Some(s) => {
                warn!(
                    server = s,
                    fallback = %self.default_server,
                    "server is not in the configuration, using the default server"
                );
                self.default_server.as_str()
            }
            None => self.default_server.as_str(),
        };

        let srv = self.servers.get(name).ok_or_else(|| Error::Configuration {
            message: format!("default server '{name}' is not in the configuration"),
        })?;

        let version = match version {
            Some(v) if srv.versions.contains_key(v) => v,
            Some(v) => {
                warn!(
                    server = name,
                    version = v,
                    fallback = %srv.default_version,
                    "api version is not in the configuration, using the default version"
                );
                srv.default_version.as_str()
            }
            None => srv.default_version.as_str(),
        };

        let prefix = srv
            .versions
            .get(version)
            .ok_or_else(|| Error::Configuration {
                message: format!("default version '{version}' missing for server '{name}'"),
            })?;

        Ok(format!("{}{}", srv.base_url, prefix))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> ApiConfig {
        let mut versions = HashMap::new();
        versions.insert("v1".to_owned(), "/api/v1/".to_owned());
        versions.insert("v2".to_owned(), "/api/v2/".to_owned());
        let mut servers = HashMap::new();
        servers.insert(
            "main".to_owned(),
            Server {
                base_url: "https://api.example.com".to_owned(),
                versions,
                default_version: "v1".to_owned(),
            },
        );
        ApiConfig {
            servers,
            default_server: "main".to_owned(),
            method_override: false,
        }
    }

    #[test]
    fn resolves_explicit_server_and_version() {
        let url = config().resolve(Some("main"), Some("v2")).unwrap();
        assert_eq!(url, "https://api.example.com/api/v2/");
    }

    #[test]
    fn falls_back_to_defaults_when_unnamed() {
        let url = config().resolve(None, None).unwrap();
        assert_eq!(url, "https://api.example.com/api/v1/");
    }

    #[test]
    fn unknown_server_falls_back_without_error() {
        let url = config().resolve(Some("nope"), None).unwrap();
        assert_eq!(url, "https://api.example.com/api/v1/");
    }

    #[test]
    fn unknown_version_falls_back_without_error() {
        let url = config().resolve(Some("main"), Some("v99")).unwrap();
        assert_eq!(url, "https://api.example.com/api/v1/");
    }

    #[test]
    fn missing_default_server_is_a_configuration_error() {
        let mut cfg = config();
        cfg.default_server = "gone".to_owned();
        let err = cfg.resolve(None, None).unwrap_err();
        assert!(matches!(err, Error::Configuration { .. }));
    }

    #[test]
    fn single_server_mounts_at_base() {
        let cfg = ApiConfig::single_server("http://localhost:8080");
        assert_eq!(cfg.resolve(None, None).unwrap(), "http://localhost:8080");
    }
}
