// ── Resource data model ──
//
// `Record` wraps one JSON entity behind a shared handle so the smart
// refresh reconciler can merge fields in place while every subscriber
// keeps the same object. Down-adapted values live in a parallel map
// keyed by field path instead of stringly "<field>[adapted]" siblings.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::path::FieldPath;

// ── Record ──────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct RecordInner {
    value: Value,
    adapted: BTreeMap<String, Value>,
}

/// One domain entity: a JSON value plus its down-adapted field values.
///
/// Clones share the same underlying object (`Arc`), which is what
/// preserves referential stability across smart refreshes: a merge
/// mutates the shared value rather than replacing the handle.
#[derive(Debug, Clone, Default)]
pub struct Record {
    inner: Arc<RwLock<RecordInner>>,
}

impl Record {
    pub fn new(value: Value) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RecordInner {
                value,
                adapted: BTreeMap::new(),
            })),
        }
    }

    pub fn with_adapted(value: Value, adapted: BTreeMap<String, Value>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(RecordInner { value, adapted })),
        }
    }

    /// Snapshot of the raw entity value.
    pub fn value(&self) -> Value {
        self.read().value.clone()
    }

    /// Resolve a field path against the entity (last match).
    pub fn get(&self, path: &FieldPath) -> Option<Value> {
        path.last_match(&self.read().value).cloned()
    }

    /// The entity's `id` field, if any.
    pub fn id(&self) -> Option<Value> {
        self.read().value.get("id").cloned()
    }

    /// Down-adapted value for a field path, if one was produced.
    pub fn adapted(&self, path: &str) -> Option<Value> {
        self.read().adapted.get(path).cloned()
    }

    /// Snapshot of the whole adapted map.
    pub fn adapted_map(&self) -> BTreeMap<String, Value> {
        self.read().adapted.clone()
    }

    /// Deep equality over both the entity value and its adapted values.
    pub fn deep_eq(&self, other: &Record) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        let a = self.read();
        let b = other.read();
        a.value == b.value && a.adapted == b.adapted
    }

    /// Whether two handles refer to the same underlying object.
    pub fn ptr_eq(&self, other: &Record) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Assign `other`'s top-level fields onto this record in place and
    /// adopt its adapted values. The handle (identity) is unchanged.
    pub fn merge_from(&self, other: &Record) {
        if self.ptr_eq(other) {
            return;
        }
        let (other_value, other_adapted) = {
            let o = other.read();
            (o.value.clone(), o.adapted.clone())
        };
        let mut inner = self.write();
        match (&mut inner.value, other_value) {
            (Value::Object(target), Value::Object(source)) => {
                for (k, v) in source {
                    target.insert(k, v);
                }
            }
            (target, source) => *target = source,
        }
        inner.adapted = other_adapted;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, RecordInner> {
        self.inner.read().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, RecordInner> {
        self.inner.write().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.deep_eq(other)
    }
}

impl From<Value> for Record {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

// ── Pagination ──────────────────────────────────────────────────────

/// Server-side pagination block: 1-based page index, page size, and
/// total record count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    pub per_page: u64,
    pub current_page: u64,
    pub total: u64,
}

impl Pagination {
    /// Total number of pages implied by `total` and `per_page`.
    pub fn total_pages(&self) -> u64 {
        if self.per_page == 0 {
            return self.current_page;
        }
        self.total.div_ceil(self.per_page)
    }

    /// `ceil(total / per_page) <= current_page`.
    pub fn is_last_page(&self) -> bool {
        self.total_pages() <= self.current_page
    }
}

/// Response metadata: the pagination block plus arbitrary extra keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Meta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ── Page / Item ─────────────────────────────────────────────────────

/// One collection emission: the records, response metadata, and any
/// leftover top-level response keys.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub data: Vec<Record>,
    pub meta: Option<Meta>,
    pub extra: Map<String, Value>,
}

impl Page {
    pub fn pagination(&self) -> Option<&Pagination> {
        self.meta.as_ref().and_then(|m| m.pagination.as_ref())
    }
}

/// One single-entity emission.
#[derive(Debug, Clone, Default)]
pub struct Item {
    pub data: Record,
    pub meta: Option<Meta>,
    pub extra: Map<String, Value>,
}
