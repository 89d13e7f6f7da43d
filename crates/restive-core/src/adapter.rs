// ── Field adapter engine ──
//
// Bidirectional per-field transforms keyed by field path. `up` rewrites
// outgoing request bodies in place; `down` derives values from incoming
// records into the record's parallel adapted map, leaving the raw
// server value untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::path::FieldPath;

/// The CRUD operation a request belongs to, passed to `up` transforms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Get,
    Find,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Find => "find",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transform applied to an outgoing field: `(value, full_body, operation)`.
/// A missing field arrives as `Value::Null`.
pub type UpFn = Arc<dyn Fn(&Value, &Value, Operation) -> Value + Send + Sync>;

/// Transform applied to an incoming field: `(value, full_record)`.
pub type DownFn = Arc<dyn Fn(&Value, &Value) -> Value + Send + Sync>;

/// A bidirectional transform for one field path.
#[derive(Clone, Default)]
pub struct FieldAdapter {
    pub up: Option<UpFn>,
    pub down: Option<DownFn>,
}

impl FieldAdapter {
    pub fn up(f: impl Fn(&Value, &Value, Operation) -> Value + Send + Sync + 'static) -> Self {
        Self {
            up: Some(Arc::new(f)),
            down: None,
        }
    }

    pub fn down(f: impl Fn(&Value, &Value) -> Value + Send + Sync + 'static) -> Self {
        Self {
            up: None,
            down: Some(Arc::new(f)),
        }
    }

    pub fn with_up(
        mut self,
        f: impl Fn(&Value, &Value, Operation) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.up = Some(Arc::new(f));
        self
    }

    pub fn with_down(mut self, f: impl Fn(&Value, &Value) -> Value + Send + Sync + 'static) -> Self {
        self.down = Some(Arc::new(f));
        self
    }
}

impl fmt::Debug for FieldAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldAdapter")
            .field("up", &self.up.is_some())
            .field("down", &self.down.is_some())
            .finish()
    }
}

/// Insertion-ordered mapping of field paths to adapters. Adapters are
/// applied in insertion order; there is no cross-field ordering
/// guarantee beyond that.
#[derive(Clone, Default)]
pub struct AdapterMap {
    entries: IndexMap<String, FieldAdapter>,
}

impl AdapterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, adapter: FieldAdapter) -> &mut Self {
        self.entries.insert(path.into(), adapter);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rewrite an outgoing body in place. Fields whose path does not
    /// resolve are skipped silently; a resolvable slot with no value is
    /// passed to the transform as `Null` and written back.
    pub fn up_adapt(&self, body: &mut Value, operation: Operation) {
        for (path, adapter) in &self.entries {
            let Some(up) = &adapter.up else { continue };
            let full = body.clone();
            let Some(slot) = FieldPath::parse(path).locate_mut(body) else {
                continue;
            };
            let current = slot.get().cloned().unwrap_or(Value::Null);
            slot.set(up(&current, &full, operation));
        }
    }

    /// Derive adapted values from an incoming record. The record itself
    /// is never mutated; results are keyed by the adapter's path string.
    pub fn down_adapt(&self, record: &Value) -> BTreeMap<String, Value> {
        let mut adapted = BTreeMap::new();
        for (path, adapter) in &self.entries {
            let Some(down) = &adapter.down else { continue };
            if let Some(value) = FieldPath::parse(path).last_match(record) {
                adapted.insert(path.clone(), down(value, record));
            }
        }
        adapted
    }
}

impl fmt::Debug for AdapterMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.entries.keys()).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn up_replaces_the_field_in_place() {
        let mut adapters = AdapterMap::new();
        adapters.insert(
            "address[city]",
            FieldAdapter::up(|v, _body, _op| json!(format!("{}!", v.as_str().unwrap_or("")))),
        );

        let mut body = json!({"address": {"city": "Cairo"}, "name": "Nora"});
        adapters.up_adapt(&mut body, Operation::Create);

        assert_eq!(body, json!({"address": {"city": "Cairo!"}, "name": "Nora"}));
    }

    #[test]
    fn up_sees_the_operation_and_full_body() {
        let mut adapters = AdapterMap::new();
        adapters.insert(
            "name",
            FieldAdapter::up(|v, body, op| {
                json!(format!(
                    "{}:{}:{}",
                    v.as_str().unwrap_or(""),
                    body["id"],
                    op
                ))
            }),
        );

        let mut body = json!({"id": 7, "name": "x"});
        adapters.up_adapt(&mut body, Operation::Update);
        assert_eq!(body["name"], json!("x:7:update"));
    }

    #[test]
    fn up_skips_unresolvable_paths_silently() {
        let mut adapters = AdapterMap::new();
        adapters.insert("missing[deep]", FieldAdapter::up(|_, _, _| json!("boom")));

        let mut body = json!({"name": "Nora"});
        adapters.up_adapt(&mut body, Operation::Get);
        assert_eq!(body, json!({"name": "Nora"}));
    }

    #[test]
    fn down_never_mutates_the_record() {
        let mut adapters = AdapterMap::new();
        adapters.insert(
            "price",
            FieldAdapter::down(|v, _| {
                json!(v.as_str().and_then(|s| s.parse::<f64>().ok()).unwrap_or(0.0))
            }),
        );

        let record = json!({"id": 1, "price": "19.99"});
        let adapted = adapters.down_adapt(&record);

        assert_eq!(record, json!({"id": 1, "price": "19.99"}));
        assert_eq!(adapted.get("price"), Some(&json!(19.99)));
    }

    #[test]
    fn down_only_adapters_add_no_up_effect() {
        let mut adapters = AdapterMap::new();
        adapters.insert("price", FieldAdapter::down(|v, _| v.clone()));

        let mut body = json!({"price": "19.99"});
        adapters.up_adapt(&mut body, Operation::Create);
        assert_eq!(body, json!({"price": "19.99"}));
    }

    #[test]
    fn down_sees_the_full_record() {
        let mut adapters = AdapterMap::new();
        adapters.insert(
            "first_name",
            FieldAdapter::down(|v, record| {
                json!(format!(
                    "{} {}",
                    v.as_str().unwrap_or(""),
                    record["last_name"].as_str().unwrap_or("")
                ))
            }),
        );

        let adapted = adapters.down_adapt(&json!({"first_name": "Nora", "last_name": "Samir"}));
        assert_eq!(adapted.get("first_name"), Some(&json!("Nora Samir")));
    }

    #[test]
    fn adapters_apply_in_insertion_order() {
        let mut adapters = AdapterMap::new();
        adapters.insert("a", FieldAdapter::up(|_, body, _| body["b"].clone()));
        adapters.insert("b", FieldAdapter::up(|_, _, _| json!("late")));

        // "a" runs first and sees the original "b".
        let mut body = json!({"a": 1, "b": "early"});
        adapters.up_adapt(&mut body, Operation::Create);
        assert_eq!(body, json!({"a": "early", "b": "late"}));
    }
}
