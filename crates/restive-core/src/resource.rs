// ── Resource stream orchestration ──
//
// A `Resource` wires the trigger cells (refresher, load-more), the
// route collaborator, and an optional parent resource through fetch,
// normalization, adaptation, and smart-refresh reconciliation into two
// long-lived output cells: the page stream and the model stream.
//
// Switch-to-latest: every refresher tick spawns the fetch chain as a
// task carrying a child CancellationToken; the previous task's token is
// cancelled when a new tick arrives, and every suspension point (parent
// wait, load-more wait, the fetch itself) races the token.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use serde_json::{Map, Value, json};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use restive_api::{ApiClient, ApiRequest};

use crate::adapter::{AdapterMap, FieldAdapter, Operation};
use crate::envelope::{normalize_collection, normalize_item};
use crate::error::CoreError;
use crate::model::{Item, Page, Pagination, Record};
use crate::refresh::SmartRefresh;
use crate::route::Route;
use crate::trigger::Trigger;

/// Per-record hook applied after down-adaptation, before the record is
/// handed to subscribers.
pub type TransformFn = Arc<dyn Fn(&mut Value) + Send + Sync>;

// ── Options ─────────────────────────────────────────────────────────

/// Configuration for [`Resource::init`].
#[derive(Clone, Default)]
pub struct InitOptions {
    /// Source of query parameters (list filters) and path parameters
    /// (the entity id).
    pub route: Option<Route>,
    /// External trigger cell to adopt in place of the resource's own.
    pub refresher: Option<Trigger>,
    /// Allow-list of query-parameter keys forwarded to fetches; `None`
    /// forwards everything.
    pub filters: Option<Vec<String>>,
    /// Name of the route path parameter holding the entity id.
    pub id_parameter: Option<String>,
    /// Field path used as record identity by the smart refresh
    /// (default `"id"`).
    pub unique_id: Option<String>,
    /// Accumulating pagination mode: load-more ticks append pages
    /// instead of replacing them.
    pub loadmore: bool,
    /// Parent resource to nest under (`parent_name/{parent_id}/` path
    /// prefix, resolved from the parent's cached model).
    pub parent: Option<Resource>,
}

// ── Resource ────────────────────────────────────────────────────────

/// A named REST entity type with reactive list/item streams.
///
/// Cheaply cloneable; clones share all state including the trigger
/// cells and output streams.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

struct ResourceInner {
    client: ApiClient,
    name: String,
    accessor: Option<String>,
    server: Option<String>,
    version: Option<String>,
    adapters: AdapterMap,
    transform: Option<TransformFn>,

    /// Persistent filters staged via `where_`.
    filters: Mutex<Map<String, Value>>,
    /// Path prefix contributed by the parent resource, recomputed on
    /// every trigger tick.
    parent_prefix: RwLock<String>,
    /// Swappable so `supervise_refreshers` can alias several resources
    /// onto one cell.
    refresher: Mutex<Trigger>,
    loadmore: Trigger,
    last_page: AtomicBool,

    cached_model: watch::Sender<Option<Item>>,
    page_tx: watch::Sender<Option<Page>>,
    model_tx: watch::Sender<Option<Item>>,
    error_tx: watch::Sender<Option<Arc<CoreError>>>,

    drivers: Mutex<DriverSet>,
}

#[derive(Default)]
struct DriverSet {
    cancel: Option<CancellationToken>,
    handles: Vec<JoinHandle<()>>,
}

/// Mutable pagination state shared by one page driver's cycles.
#[derive(Default)]
struct PageState {
    pagination: Option<Pagination>,
    accumulated: Vec<Record>,
    /// Set at the start of each outer tick in load-more mode; the first
    /// fetch of the tick replaces the accumulation instead of appending.
    reset: bool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Resource {
    pub fn builder(client: ApiClient, name: impl Into<String>) -> ResourceBuilder {
        ResourceBuilder {
            client,
            name: name.into(),
            accessor: None,
            server: None,
            version: None,
            adapters: AdapterMap::new(),
            transform: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    // ── Filters ──────────────────────────────────────────────────────

    /// Stage a persistent filter sent with every subsequent operation.
    pub fn where_(&self, field: impl Into<String>, value: Value) -> &Self {
        lock(&self.inner.filters).insert(field.into(), value);
        self
    }

    // ── One-shot operations ──────────────────────────────────────────

    /// Fetch one page of the collection, merged with the staged filters.
    pub async fn get(&self, extra: Map<String, Value>) -> Result<Page, CoreError> {
        self.inner.get(extra).await
    }

    /// Fetch a single entity. Updates the cached model unconditionally.
    pub async fn find(&self, id: Option<Value>) -> Result<Item, CoreError> {
        self.inner.find(id).await
    }

    /// Create an entity. Returns the raw operation result without
    /// envelope normalization.
    pub async fn create(&self, mut body: Value) -> Result<Value, CoreError> {
        self.inner.adapters.up_adapt(&mut body, Operation::Create);
        self.inner.send(Operation::Create, None, body).await
    }

    /// Update an entity (PATCH). Returns the raw operation result.
    pub async fn update(&self, id: &Value, mut body: Value) -> Result<Value, CoreError> {
        self.inner.adapters.up_adapt(&mut body, Operation::Update);
        self.inner.send(Operation::Update, Some(id), body).await
    }

    /// Delete an entity. Returns the raw operation result.
    pub async fn delete(&self, id: &Value, mut body: Value) -> Result<Value, CoreError> {
        self.inner.adapters.up_adapt(&mut body, Operation::Delete);
        self.inner.send(Operation::Delete, Some(id), body).await
    }

    // ── Triggers ─────────────────────────────────────────────────────

    /// Restart the fetch pipelines (both page and model).
    pub fn refresh(&self) {
        lock(&self.inner.refresher).tick();
    }

    /// Request the next page in load-more mode.
    pub fn load_more(&self) {
        self.inner.loadmore.tick();
    }

    /// Alias the given resources onto this resource's refresher cell,
    /// so one refresh restarts them all. Call before `init`.
    pub fn supervise_refreshers(&self, others: &[&Resource]) -> &Self {
        let shared = lock(&self.inner.refresher).clone();
        for other in others {
            let mut cell = lock(&other.inner.refresher);
            if !cell.same_cell(&shared) {
                *cell = shared.clone();
            }
        }
        self
    }

    /// Whether the most recent fetch landed on the last page.
    pub fn is_last_page(&self) -> bool {
        self.inner.last_page.load(Ordering::Relaxed)
    }

    // ── Output streams ───────────────────────────────────────────────

    /// The list/page stream. Replays the latest page to new subscribers.
    pub fn pages(&self) -> watch::Receiver<Option<Page>> {
        self.inner.page_tx.subscribe()
    }

    /// The single-item stream.
    pub fn models(&self) -> watch::Receiver<Option<Item>> {
        self.inner.model_tx.subscribe()
    }

    /// Latest fetched single item, consumed by child resources to build
    /// nested path prefixes.
    pub fn cached_model(&self) -> watch::Receiver<Option<Item>> {
        self.inner.cached_model.subscribe()
    }

    /// Last stream-terminating fetch error, if any.
    pub fn last_error(&self) -> watch::Receiver<Option<Arc<CoreError>>> {
        self.inner.error_tx.subscribe()
    }

    // ── Stream activation ────────────────────────────────────────────

    /// Activate the page and model streams.
    ///
    /// Spawns the two driver tasks on the current tokio runtime; calling
    /// `init` again tears the previous drivers down first. The adopted
    /// `refresher` (if any) replaces this resource's own trigger cell.
    pub fn init(&self, options: InitOptions) -> Resource {
        if let Some(refresher) = &options.refresher {
            *lock(&self.inner.refresher) = refresher.clone();
        }

        let mut drivers = lock(&self.inner.drivers);
        if let Some(cancel) = drivers.cancel.take() {
            cancel.cancel();
        }
        drivers.handles.clear();

        let cancel = CancellationToken::new();
        drivers.handles.push(tokio::spawn(page_driver(
            Arc::clone(&self.inner),
            options.clone(),
            cancel.child_token(),
        )));
        drivers.handles.push(tokio::spawn(model_driver(
            Arc::clone(&self.inner),
            options,
            cancel.child_token(),
        )));
        drivers.cancel = Some(cancel);

        self.clone()
    }

    /// Tear down the driver tasks spawned by `init`.
    pub fn shutdown(&self) {
        let mut drivers = lock(&self.inner.drivers);
        if let Some(cancel) = drivers.cancel.take() {
            cancel.cancel();
        }
        drivers.handles.clear();
    }
}

impl std::fmt::Debug for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.inner.name)
            .finish_non_exhaustive()
    }
}

// ── Builder ─────────────────────────────────────────────────────────

pub struct ResourceBuilder {
    client: ApiClient,
    name: String,
    accessor: Option<String>,
    server: Option<String>,
    version: Option<String>,
    adapters: AdapterMap,
    transform: Option<TransformFn>,
}

impl ResourceBuilder {
    /// Response key holding the collection when the server doesn't use
    /// `data` (e.g. `"records"`).
    pub fn accessor(mut self, accessor: impl Into<String>) -> Self {
        self.accessor = Some(accessor.into());
        self
    }

    /// Named server from the `ApiConfig` to target.
    pub fn server(mut self, server: impl Into<String>) -> Self {
        self.server = Some(server.into());
        self
    }

    /// Named API version to target.
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Register a bidirectional adapter for a field path.
    pub fn adapter(mut self, path: impl Into<String>, adapter: FieldAdapter) -> Self {
        self.adapters.insert(path, adapter);
        self
    }

    /// Per-record hook applied after down-adaptation.
    pub fn transform(mut self, f: impl Fn(&mut Value) + Send + Sync + 'static) -> Self {
        self.transform = Some(Arc::new(f));
        self
    }

    pub fn build(self) -> Resource {
        let (cached_model, _) = watch::channel(None);
        let (page_tx, _) = watch::channel(None);
        let (model_tx, _) = watch::channel(None);
        let (error_tx, _) = watch::channel(None);

        Resource {
            inner: Arc::new(ResourceInner {
                client: self.client,
                name: self.name,
                accessor: self.accessor,
                server: self.server,
                version: self.version,
                adapters: self.adapters,
                transform: self.transform,
                filters: Mutex::new(Map::new()),
                parent_prefix: RwLock::new(String::new()),
                refresher: Mutex::new(Trigger::new()),
                loadmore: Trigger::new(),
                last_page: AtomicBool::new(false),
                cached_model,
                page_tx,
                model_tx,
                error_tx,
                drivers: Mutex::new(DriverSet::default()),
            }),
        }
    }
}

// ── Fetch plumbing ──────────────────────────────────────────────────

fn render_id(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl ResourceInner {
    fn parent_prefix(&self) -> String {
        self.parent_prefix
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_parent_prefix(&self, prefix: String) {
        *self
            .parent_prefix
            .write()
            .unwrap_or_else(PoisonError::into_inner) = prefix;
    }

    /// Relative path for one operation: collection path for get/create,
    /// entity path for everything else. A missing id leaves the entity
    /// segment empty; the server is expected to reject it.
    fn resource_path(&self, operation: Operation, id: Option<&Value>) -> String {
        match operation {
            Operation::Get | Operation::Create => self.name.clone(),
            _ => format!("{}/{}", self.name, id.map(render_id).unwrap_or_default()),
        }
    }

    fn request(&self, operation: Operation, id: Option<&Value>, body: Value) -> ApiRequest {
        let path = format!("{}{}", self.parent_prefix(), self.resource_path(operation, id));
        let mut request = match operation {
            Operation::Get | Operation::Find => ApiRequest::get(path),
            Operation::Create => ApiRequest::post(path),
            Operation::Update => ApiRequest::patch(path),
            Operation::Delete => ApiRequest::delete(path),
        };
        request.server = self.server.clone();
        request.version = self.version.clone();
        request.body = body;
        request
    }

    async fn send(
        &self,
        operation: Operation,
        id: Option<&Value>,
        body: Value,
    ) -> Result<Value, CoreError> {
        let request = self.request(operation, id, body);
        debug!(resource = %self.name, %operation, path = %request.path, "fetch");
        Ok(self.client.execute(request).await?)
    }

    async fn get(&self, extra: Map<String, Value>) -> Result<Page, CoreError> {
        let mut merged = lock(&self.filters).clone();
        merged.extend(extra);
        let mut body = Value::Object(merged);
        self.adapters.up_adapt(&mut body, Operation::Get);

        let raw = self.send(Operation::Get, None, body).await?;
        Ok(self.page_from(raw))
    }

    async fn find(&self, id: Option<Value>) -> Result<Item, CoreError> {
        let mut body = Value::Object(lock(&self.filters).clone());
        self.adapters.up_adapt(&mut body, Operation::Find);

        let raw = self.send(Operation::Find, id.as_ref(), body).await?;
        let item = self.item_from(raw);
        // `send_replace` stores the value even with no receiver attached;
        // late subscribers must still see the cached item.
        self.cached_model.send_replace(Some(item.clone()));
        Ok(item)
    }

    /// Reshape, down-adapt, and transform a collection response.
    fn page_from(&self, raw: Value) -> Page {
        let raw = normalize_collection(raw, self.accessor.as_deref());
        let data = raw.data.into_iter().map(|v| self.record_from(v)).collect();
        Page {
            data,
            meta: raw.meta,
            extra: raw.extra,
        }
    }

    fn item_from(&self, raw: Value) -> Item {
        let raw = normalize_item(raw);
        Item {
            data: self.record_from(raw.data),
            meta: raw.meta,
            extra: raw.extra,
        }
    }

    fn record_from(&self, mut value: Value) -> Record {
        let adapted = self.adapters.down_adapt(&value);
        if let Some(transform) = &self.transform {
            transform(&mut value);
        }
        Record::with_adapted(value, adapted)
    }

    fn record_failure(&self, err: CoreError) {
        warn!(resource = %self.name, error = %err, "fetch failed; stream terminated");
        self.error_tx.send_replace(Some(Arc::new(err)));
    }
}

// ── Drivers ─────────────────────────────────────────────────────────

/// Wait for the next wakeup on an optional route receiver; pends
/// forever when the resource has no route.
async fn route_changed(rx: Option<&mut watch::Receiver<Map<String, Value>>>) {
    match rx {
        Some(rx) => {
            // A closed route means no further navigation; pend.
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
        None => std::future::pending::<()>().await,
    }
}

async fn page_driver(inner: Arc<ResourceInner>, options: InitOptions, cancel: CancellationToken) {
    let state = Arc::new(Mutex::new(PageState::default()));
    let smart = Arc::new(Mutex::new(SmartRefresh::new(
        options.unique_id.as_deref().unwrap_or("id"),
    )));
    let mut refresh_rx = lock(&inner.refresher).subscribe();
    let mut query_rx = options.route.as_ref().map(Route::query_changes);
    let mut inflight: Option<CancellationToken> = None;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = refresh_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            () = route_changed(query_rx.as_mut()) => {}
        }

        if let Some(previous) = inflight.take() {
            previous.cancel();
        }
        let token = cancel.child_token();
        inflight = Some(token.clone());
        tokio::spawn(page_cycle(
            Arc::clone(&inner),
            options.clone(),
            Arc::clone(&state),
            Arc::clone(&smart),
            token,
            cancel.clone(),
        ));
    }

    if let Some(previous) = inflight {
        previous.cancel();
    }
}

async fn page_cycle(
    inner: Arc<ResourceInner>,
    options: InitOptions,
    state: Arc<Mutex<PageState>>,
    smart: Arc<Mutex<SmartRefresh>>,
    token: CancellationToken,
    driver: CancellationToken,
) {
    if resolve_parent(&inner, &options, &token).await.is_break() {
        return;
    }

    let filters = options.route.as_ref().map(Route::query).unwrap_or_default();

    if options.loadmore {
        {
            let mut st = lock(&state);
            st.reset = true;
            st.pagination = None;
            inner.last_page.store(false, Ordering::Relaxed);
        }
        // Replays immediately: every outer tick starts from page 1.
        let mut more_rx = inner.loadmore.subscribe();
        loop {
            tokio::select! {
                () = token.cancelled() => return,
                changed = more_rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
            if inner.last_page.load(Ordering::Relaxed) {
                continue;
            }
            let page_number = lock(&state).pagination.map_or(0, |p| p.current_page) + 1;
            let mut page_filters = filters.clone();
            page_filters.insert("page".to_owned(), json!(page_number));
            match fetch_and_emit(&inner, &options, &state, &smart, page_filters, &token).await {
                Ok(()) => {}
                Err(Cycle::Superseded) => return,
                Err(Cycle::Failed) => {
                    driver.cancel();
                    return;
                }
            }
        }
    } else {
        match fetch_and_emit(&inner, &options, &state, &smart, filters, &token).await {
            Ok(()) | Err(Cycle::Superseded) => {}
            Err(Cycle::Failed) => driver.cancel(),
        }
    }
}

/// Why a fetch step didn't complete.
enum Cycle {
    /// Cancelled by a newer trigger tick.
    Superseded,
    /// Fetch error: the stream terminates.
    Failed,
}

async fn fetch_and_emit(
    inner: &Arc<ResourceInner>,
    options: &InitOptions,
    state: &Mutex<PageState>,
    smart: &Mutex<SmartRefresh>,
    mut filters: Map<String, Value>,
    token: &CancellationToken,
) -> Result<(), Cycle> {
    if let Some(allow) = &options.filters {
        filters.retain(|key, _| key == "page" || allow.iter().any(|a| a == key));
    }

    // Biased: a superseding tick must win even when the fetch is also
    // ready, so no stale page reaches the reconciler.
    let fetched = tokio::select! {
        biased;
        () = token.cancelled() => return Err(Cycle::Superseded),
        result = inner.get(filters) => result,
    };
    let mut page = match fetched {
        Ok(page) => page,
        Err(err) => {
            inner.record_failure(err);
            return Err(Cycle::Failed);
        }
    };

    let pagination = page.pagination().copied();
    {
        let mut st = lock(state);
        st.pagination = pagination;
        let last = pagination.map_or(options.loadmore, |p| p.is_last_page());
        inner.last_page.store(last, Ordering::Relaxed);

        if options.loadmore {
            if st.reset {
                st.accumulated = page.data.clone();
            } else if let Some(p) = pagination {
                // Append while this page index is still reachable.
                if p.total_pages() >= p.current_page {
                    st.accumulated.extend(page.data.iter().cloned());
                    page.data = st.accumulated.clone();
                }
            }
            st.reset = false;
        }
    }

    if let Some(emitted) = lock(smart).apply(page) {
        inner.page_tx.send_replace(Some(emitted));
    }
    Ok(())
}

async fn model_driver(inner: Arc<ResourceInner>, options: InitOptions, cancel: CancellationToken) {
    let mut refresh_rx = lock(&inner.refresher).subscribe();
    let mut params_rx = options.route.as_ref().map(Route::param_changes);
    let mut inflight: Option<CancellationToken> = None;

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = refresh_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            () = route_changed(params_rx.as_mut()) => {}
        }

        if let Some(previous) = inflight.take() {
            previous.cancel();
        }
        let token = cancel.child_token();
        inflight = Some(token.clone());
        tokio::spawn(model_cycle(
            Arc::clone(&inner),
            options.clone(),
            token,
            cancel.clone(),
        ));
    }

    if let Some(previous) = inflight {
        previous.cancel();
    }
}

async fn model_cycle(
    inner: Arc<ResourceInner>,
    options: InitOptions,
    token: CancellationToken,
    driver: CancellationToken,
) {
    if resolve_parent(&inner, &options, &token).await.is_break() {
        return;
    }

    let params = options.route.as_ref().map(Route::params).unwrap_or_default();
    let id = options
        .id_parameter
        .as_ref()
        .and_then(|key| params.get(key).cloned());

    let fetched = tokio::select! {
        biased;
        () = token.cancelled() => return,
        result = inner.find(id) => result,
    };
    match fetched {
        Ok(item) => {
            inner.model_tx.send_replace(Some(item));
        }
        Err(err) => {
            inner.record_failure(err);
            driver.cancel();
        }
    }
}

/// Resolve the parent path prefix, waiting (cancellably) until the
/// parent's cached model is populated. Without a parent the prefix is
/// cleared. An unresolvable parent suspends the pipeline; it is not a
/// failure.
async fn resolve_parent(
    inner: &Arc<ResourceInner>,
    options: &InitOptions,
    token: &CancellationToken,
) -> ControlFlow<()> {
    let Some(parent) = &options.parent else {
        inner.set_parent_prefix(String::new());
        return ControlFlow::Continue(());
    };

    let mut rx = parent.cached_model();
    loop {
        let cached = rx.borrow().clone();
        if let Some(item) = cached {
            let id = item.data.id().as_ref().map(render_id).unwrap_or_default();
            inner.set_parent_prefix(format!("{}/{}/", parent.name(), id));
            return ControlFlow::Continue(());
        }
        tokio::select! {
            () = token.cancelled() => return ControlFlow::Break(()),
            changed = rx.changed() => {
                if changed.is_err() {
                    return ControlFlow::Break(());
                }
            }
        }
    }
}
