// ── Envelope normalization ──
//
// Reshapes arbitrary server responses into the canonical {data, meta}
// envelope. Lenient by design: a body that doesn't match the expected
// shape is wrapped best-effort, never rejected.

use serde_json::{Map, Value};

use crate::model::{Meta, Pagination};

/// A collection response after reshaping, before adaptation.
#[derive(Debug, Default)]
pub struct RawPage {
    pub data: Vec<Value>,
    pub meta: Option<Meta>,
    pub extra: Map<String, Value>,
}

/// A single-item response after reshaping, before adaptation.
#[derive(Debug, Default)]
pub struct RawItem {
    pub data: Value,
    pub meta: Option<Meta>,
    pub extra: Map<String, Value>,
}

/// Normalize a collection response.
///
/// - a `data` key wins as-is;
/// - otherwise the configured accessor key is moved to `data` and the
///   original key removed;
/// - otherwise the whole body becomes the data (an array contributes its
///   elements, anything else a single-element page);
/// - loose top-level pagination fields (`current_page` with no
///   `meta.pagination`) are relocated into `meta.pagination`.
pub fn normalize_collection(raw: Value, accessor: Option<&str>) -> RawPage {
    let mut obj = match raw {
        Value::Object(map) => map,
        Value::Array(items) => {
            return RawPage {
                data: items,
                meta: None,
                extra: Map::new(),
            };
        }
        other => {
            return RawPage {
                data: vec![other],
                meta: None,
                extra: Map::new(),
            };
        }
    };

    let data = if let Some(data) = obj.remove("data") {
        as_elements(data)
    } else if let Some(found) = accessor.and_then(|a| obj.remove(a)) {
        as_elements(found)
    } else {
        let whole = std::mem::take(&mut obj);
        return RawPage {
            data: as_elements(Value::Object(whole)),
            meta: None,
            extra: Map::new(),
        };
    };

    let mut meta = obj.remove("meta").map(parse_meta);

    // Laravel-style responses carry pagination loose at the top level.
    if meta.as_ref().is_none_or(|m| m.pagination.is_none()) && obj.contains_key("current_page") {
        if let Some(pagination) = take_loose_pagination(&mut obj) {
            meta.get_or_insert_with(Meta::default).pagination = Some(pagination);
        }
    }

    RawPage {
        data,
        meta,
        extra: obj,
    }
}

/// Normalize a single-item response: a missing `data` key means the
/// whole body is the item.
pub fn normalize_item(raw: Value) -> RawItem {
    let mut obj = match raw {
        Value::Object(map) => map,
        other => {
            return RawItem {
                data: other,
                meta: None,
                extra: Map::new(),
            };
        }
    };

    let Some(data) = obj.remove("data") else {
        return RawItem {
            data: Value::Object(obj),
            meta: None,
            extra: Map::new(),
        };
    };

    let meta = obj.remove("meta").map(parse_meta);
    RawItem {
        data,
        meta,
        extra: obj,
    }
}

fn as_elements(data: Value) -> Vec<Value> {
    match data {
        Value::Array(items) => items,
        other => vec![other],
    }
}

fn parse_meta(value: Value) -> Meta {
    serde_json::from_value(value).unwrap_or_default()
}

fn take_loose_pagination(obj: &mut Map<String, Value>) -> Option<Pagination> {
    let fields = Value::Object(Map::from_iter([
        ("current_page".to_owned(), obj.get("current_page")?.clone()),
        ("per_page".to_owned(), obj.get("per_page")?.clone()),
        ("total".to_owned(), obj.get("total")?.clone()),
    ]));
    let pagination: Pagination = serde_json::from_value(fields).ok()?;
    obj.remove("current_page");
    obj.remove("per_page");
    obj.remove("total");
    Some(pagination)
}
