// ── Route collaborator ──
//
// The resource pipelines pull their filters and entity ids from the
// current route: a query-parameter cell (list filters) and a
// path-parameter cell (e.g. {"user_id": 7}). The embedding application
// owns a `RouteHandle` and pushes updates as navigation happens.

use serde_json::{Map, Value};
use tokio::sync::watch;

/// Read side: latest query and path parameters, as watch receivers the
/// pipelines sample and (for replay) subscribe to.
#[derive(Debug, Clone)]
pub struct Route {
    query: watch::Receiver<Map<String, Value>>,
    params: watch::Receiver<Map<String, Value>>,
    /// Keeps the senders of a [`fixed`](Self::fixed) route alive.
    _keepalive: Option<std::sync::Arc<RouteHandle>>,
}

/// Write side, held by the embedding application.
#[derive(Debug)]
pub struct RouteHandle {
    query: watch::Sender<Map<String, Value>>,
    params: watch::Sender<Map<String, Value>>,
}

impl Route {
    /// A fresh route with empty parameter sets.
    pub fn channel() -> (RouteHandle, Route) {
        let (query_tx, query_rx) = watch::channel(Map::new());
        let (params_tx, params_rx) = watch::channel(Map::new());
        (
            RouteHandle {
                query: query_tx,
                params: params_tx,
            },
            Route {
                query: query_rx,
                params: params_rx,
                _keepalive: None,
            },
        )
    }

    /// A route frozen at the given parameter sets.
    pub fn fixed(query: Map<String, Value>, params: Map<String, Value>) -> Route {
        let (handle, mut route) = Self::channel();
        handle.set_query(query);
        handle.set_params(params);
        route._keepalive = Some(std::sync::Arc::new(handle));
        route
    }

    /// Latest query-parameter set.
    pub fn query(&self) -> Map<String, Value> {
        self.query.borrow().clone()
    }

    /// Latest path-parameter set.
    pub fn params(&self) -> Map<String, Value> {
        self.params.borrow().clone()
    }

    /// A receiver that wakes on query-parameter changes.
    pub fn query_changes(&self) -> watch::Receiver<Map<String, Value>> {
        self.query.clone()
    }

    /// A receiver that wakes on path-parameter changes.
    pub fn param_changes(&self) -> watch::Receiver<Map<String, Value>> {
        self.params.clone()
    }
}

impl RouteHandle {
    pub fn set_query(&self, query: Map<String, Value>) {
        self.query.send_replace(query);
    }

    pub fn set_params(&self, params: Map<String, Value>) {
        self.params.send_replace(params);
    }
}
