// ── Query-string encoding of JSON bodies ──
//
// GET requests carry their "body" as bracket-keyed query parameters:
// {"filter": {"city": "Cairo"}, "tags": ["a", "b"]} becomes
// filter[city]=Cairo&tags[0]=a&tags[1]=b. Nulls are skipped.

use serde_json::Value;

/// Flatten a JSON value into `(key, value)` query pairs.
///
/// Nested objects use bracket syntax (`a[b][c]`), arrays are indexed
/// (`a[0]`), scalars are rendered bare (strings unquoted).
pub fn query_pairs(body: &Value) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    collect(body, String::new(), &mut pairs);
    pairs
}

fn collect(value: &Value, key: String, pairs: &mut Vec<(String, String)>) {
    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (k, v) in map {
                let child = if key.is_empty() {
                    k.clone()
                } else {
                    format!("{key}[{k}]")
                };
                collect(v, child, pairs);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                collect(v, format!("{key}[{i}]"), pairs);
            }
        }
        Value::String(s) => pairs.push((key, s.clone())),
        other => pairs.push((key, other.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn flattens_nested_objects_with_brackets() {
        let pairs = query_pairs(&json!({"filter": {"address": {"city": "Cairo"}}}));
        assert_eq!(
            pairs,
            vec![("filter[address][city]".to_owned(), "Cairo".to_owned())]
        );
    }

    #[test]
    fn indexes_arrays() {
        let pairs = query_pairs(&json!({"tags": ["a", "b"]}));
        assert_eq!(
            pairs,
            vec![
                ("tags[0]".to_owned(), "a".to_owned()),
                ("tags[1]".to_owned(), "b".to_owned()),
            ]
        );
    }

    #[test]
    fn renders_scalars_and_skips_nulls() {
        let pairs = query_pairs(&json!({"page": 2, "active": true, "q": null}));
        assert_eq!(
            pairs,
            vec![
                ("active".to_owned(), "true".to_owned()),
                ("page".to_owned(), "2".to_owned()),
            ]
        );
    }

    #[test]
    fn empty_body_yields_no_pairs() {
        assert!(query_pairs(&Value::Null).is_empty());
        assert!(query_pairs(&json!({})).is_empty());
    }
}
