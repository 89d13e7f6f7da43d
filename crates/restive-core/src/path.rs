// ── Field-path descriptors ──
//
// An explicit, parsed form of the dot/bracket field syntax used by the
// adapter map and the smart-refresh unique key: "address[city]" and
// "address.city" both mean the segments ["address", "city"]. Resolution
// is pure: it either locates values or reports not-found, never errors.

use serde_json::Value;

/// An ordered sequence of segment keys addressing a field inside a
/// JSON record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse `"a[b][c]"` / `"a.b.c"` (or a mix) into segments.
    /// Empty segments are dropped.
    pub fn parse(raw: &str) -> Self {
        let segments = raw
            .split(['.', '[', ']'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// All values the path resolves to within `root`.
    ///
    /// Objects descend by key; arrays fan out over their elements, so a
    /// path through an array can match more than once. Missing keys and
    /// null intermediates simply contribute nothing.
    pub fn resolve<'a>(&self, root: &'a Value) -> Vec<&'a Value> {
        let mut current = vec![root];
        for segment in &self.segments {
            let mut next = Vec::new();
            for value in current {
                descend(value, segment, &mut next);
            }
            current = next;
        }
        current
    }

    /// The last match of [`resolve`](Self::resolve), used as the
    /// record-identity key by the smart-refresh reconciler.
    pub fn last_match<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.resolve(root).pop()
    }

    /// Locate the mutable slot the final segment addresses: the parent
    /// container plus the final key. `None` when any intermediate is
    /// missing or null, when the path is empty, or when the parent is
    /// not a container.
    pub fn locate_mut<'a>(&self, root: &'a mut Value) -> Option<Slot<'a>> {
        let (last, init) = self.segments.split_last()?;
        let mut pointer = root;
        for segment in init {
            pointer = step_mut(pointer, segment)?;
        }
        match pointer {
            Value::Object(_) | Value::Array(_) => Some(Slot {
                parent: pointer,
                key: last.clone(),
            }),
            _ => None,
        }
    }
}

/// A located mutable slot: the container holding the addressed field
/// and the final segment key. The key is owned so the slot outlives
/// the path it was located through.
pub struct Slot<'a> {
    parent: &'a mut Value,
    key: String,
}

impl Slot<'_> {
    /// Current value at the slot, if present.
    pub fn get(&self) -> Option<&Value> {
        match &*self.parent {
            Value::Object(map) => map.get(self.key.as_str()),
            Value::Array(items) => self.key.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Write `value` into the slot, inserting the key when absent.
    /// Out-of-bounds array indices are ignored.
    pub fn set(self, value: Value) {
        match self.parent {
            Value::Object(map) => {
                map.insert(self.key, value);
            }
            Value::Array(items) => {
                if let Some(target) = self.key.parse::<usize>().ok().and_then(|i| items.get_mut(i))
                {
                    *target = value;
                }
            }
            _ => {}
        }
    }
}

fn descend<'a>(value: &'a Value, segment: &str, out: &mut Vec<&'a Value>) {
    match value {
        Value::Object(map) => {
            if let Some(v) = map.get(segment) {
                if !v.is_null() {
                    out.push(v);
                }
            }
        }
        Value::Array(items) => {
            if let Some(v) = segment.parse::<usize>().ok().and_then(|i| items.get(i)) {
                if !v.is_null() {
                    out.push(v);
                }
            } else {
                // Non-index segment through an array fans out.
                for item in items {
                    descend(item, segment, out);
                }
            }
        }
        _ => {}
    }
}

fn step_mut<'a>(value: &'a mut Value, segment: &str) -> Option<&'a mut Value> {
    match value {
        Value::Object(map) => {
            let next = map.get_mut(segment)?;
            if next.is_null() { None } else { Some(next) }
        }
        Value::Array(items) => {
            let next = segment
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get_mut(i))?;
            if next.is_null() { None } else { Some(next) }
        }
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_bracket_and_dot_syntax() {
        assert_eq!(FieldPath::parse("a[b][c]").segments(), ["a", "b", "c"]);
        assert_eq!(FieldPath::parse("a.b.c").segments(), ["a", "b", "c"]);
        assert_eq!(FieldPath::parse("a[ b ].c").segments(), ["a", "b", "c"]);
    }

    #[test]
    fn resolves_nested_objects() {
        let v = json!({"address": {"city": "Cairo"}});
        let path = FieldPath::parse("address[city]");
        assert_eq!(path.resolve(&v), vec![&json!("Cairo")]);
    }

    #[test]
    fn arrays_fan_out_and_last_match_wins() {
        let v = json!({"roles": [{"id": 1}, {"id": 2}]});
        let path = FieldPath::parse("roles[id]");
        assert_eq!(path.resolve(&v).len(), 2);
        assert_eq!(path.last_match(&v), Some(&json!(2)));
    }

    #[test]
    fn missing_intermediate_resolves_to_nothing() {
        let v = json!({"address": null});
        assert!(FieldPath::parse("address[city]").resolve(&v).is_empty());
        assert!(FieldPath::parse("nowhere[city]").resolve(&v).is_empty());
    }

    #[test]
    fn locate_mut_reads_and_writes_the_slot() {
        let mut v = json!({"address": {"city": "Cairo"}});
        let slot = FieldPath::parse("address[city]").locate_mut(&mut v).unwrap();
        assert_eq!(slot.get(), Some(&json!("Cairo")));
        slot.set(json!("Giza"));
        assert_eq!(v, json!({"address": {"city": "Giza"}}));
    }

    #[test]
    fn slot_outlives_the_path_it_was_located_through() {
        let mut v = json!({"address": {"city": "Cairo"}});
        let slot = {
            let path = FieldPath::parse("address[city]");
            path.locate_mut(&mut v).unwrap()
        };
        assert_eq!(slot.get(), Some(&json!("Cairo")));
        slot.set(json!("Giza"));
        assert_eq!(v["address"]["city"], json!("Giza"));
    }

    #[test]
    fn locate_mut_is_none_for_null_intermediates() {
        let mut v = json!({"address": null});
        assert!(FieldPath::parse("address[city]").locate_mut(&mut v).is_none());
    }

    #[test]
    fn locate_mut_descends_array_indices() {
        let mut v = json!({"tags": ["a", "b"]});
        let slot = FieldPath::parse("tags[1]").locate_mut(&mut v).unwrap();
        assert_eq!(slot.get(), Some(&json!("b")));
        slot.set(json!("c"));
        assert_eq!(v["tags"], json!(["a", "c"]));
    }
}
